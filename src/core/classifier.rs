use crate::core::cells::{normalize_code, read_string};
use crate::core::rules::{ExtractionRules, SectionKind};
use crate::domain::model::{Fund, Grid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    Ignored,
    /// 類別小計列，`code` 已去除 `.0`
    Subtotal { code: String },
    FundTotal(Fund),
    SectionHeader(SectionKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ScanningForSection,
    InSection,
    SectionClosed,
}

/// Result of one top-to-bottom pass over a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSheet {
    pub classes: Vec<RowClass>,
    /// Row of the CURRENT EXPENSE header, if any.
    pub section_start: Option<usize>,
    /// First boundary row after the header; `None` if the section runs to the end.
    pub section_end: Option<usize>,
}

impl ClassifiedSheet {
    pub fn in_section(&self, row: usize) -> bool {
        match self.section_start {
            Some(start) => row > start && self.section_end.map_or(true, |end| row < end),
            None => false,
        }
    }

    pub fn first_section_row(&self, kind: SectionKind) -> Option<usize> {
        self.classes
            .iter()
            .position(|class| *class == RowClass::SectionHeader(kind))
    }

    pub fn subtotal_rows(&self) -> impl Iterator<Item = (usize, &str)> {
        self.classes.iter().enumerate().filter_map(|(i, class)| match class {
            RowClass::Subtotal { code } => Some((i, code.as_str())),
            _ => None,
        })
    }
}

/// Classify a single row in isolation, ignoring section context.
pub fn classify_row(grid: &Grid, row: usize, rules: &ExtractionRules) -> RowClass {
    let layout = &rules.layout;

    if let Some(kind) = section_kind(grid, row, rules) {
        return RowClass::SectionHeader(kind);
    }

    let primary = read_string(grid, row, layout.primary_label);
    let description = read_string(grid, row, layout.fund_description);
    let code = read_string(grid, row, layout.code);

    if !primary.is_empty() && code.is_empty() {
        let fund_code = normalize_code(&primary);
        if let Some(rule) = rules
            .funds
            .iter()
            .find(|rule| rule.code == fund_code && rule.matches_description(&description))
        {
            return RowClass::FundTotal(rule.fund);
        }
    }

    let detail = read_string(grid, row, layout.detail_label);
    let charge = read_string(grid, row, layout.charge_type);
    let normalized = normalize_code(&code);

    let is_subtotal = primary.is_empty()
        && description.is_empty()
        && detail.is_empty()
        && charge.is_empty()
        && !normalized.is_empty()
        && normalized != "0";

    if is_subtotal {
        RowClass::Subtotal { code: normalized }
    } else {
        RowClass::Ignored
    }
}

fn section_kind(grid: &Grid, row: usize, rules: &ExtractionRules) -> Option<SectionKind> {
    rules.sections.iter().find_map(|rule| {
        let text = read_string(grid, row, rules.layout.index_of(rule.column));
        rule.matches(&text).then_some(rule.kind)
    })
}

/// 單次線性掃描：只有在 CURRENT EXPENSE 區段內才辨識小計列與基金總計列
pub fn classify(grid: &Grid, rules: &ExtractionRules) -> ClassifiedSheet {
    let mut state = ScanState::ScanningForSection;
    let mut classes = Vec::with_capacity(grid.row_count());
    let mut section_start = None;
    let mut section_end = None;

    for row in 0..grid.row_count() {
        let class = classify_row(grid, row, rules);

        let class = match (state, class) {
            (
                ScanState::ScanningForSection,
                RowClass::SectionHeader(SectionKind::CurrentExpense),
            ) => {
                state = ScanState::InSection;
                section_start = Some(row);
                RowClass::SectionHeader(SectionKind::CurrentExpense)
            }
            (ScanState::InSection, RowClass::SectionHeader(kind)) => {
                state = ScanState::SectionClosed;
                section_end = Some(row);
                RowClass::SectionHeader(kind)
            }
            (ScanState::InSection, class) => class,
            (_, RowClass::SectionHeader(kind)) => RowClass::SectionHeader(kind),
            (_, _) => RowClass::Ignored,
        };

        classes.push(class);
    }

    match state {
        ScanState::ScanningForSection => {
            tracing::warn!("No CURRENT EXPENSE header found; category lists will be empty");
        }
        ScanState::InSection => {
            tracing::debug!("CURRENT EXPENSE section runs to the end of the sheet");
        }
        ScanState::SectionClosed => {}
    }

    ClassifiedSheet {
        classes,
        section_start,
        section_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ExtractionRules {
        ExtractionRules::default()
    }

    #[test]
    fn test_classify_subtotal_row() {
        let grid = Grid::from_text_rows(vec![vec!["", "", "506.0", "", "", "10000", "4000"]]);
        assert_eq!(
            classify_row(&grid, 0, &rules()),
            RowClass::Subtotal {
                code: "506".to_string()
            }
        );
    }

    #[test]
    fn test_sentinel_code_is_not_subtotal() {
        let grid = Grid::from_text_rows(vec![
            vec!["", "", "0.0", "", "", "500"],
            vec!["", "", "", "", "", "500"],
        ]);
        assert_eq!(classify_row(&grid, 0, &rules()), RowClass::Ignored);
        assert_eq!(classify_row(&grid, 1, &rules()), RowClass::Ignored);
    }

    #[test]
    fn test_charge_row_is_not_subtotal() {
        let grid = Grid::from_text_rows(vec![vec![
            "4118",
            "F A UNDERGRAD",
            "506.0",
            "Printmaking",
            "Supplies",
            "0",
            "120",
        ]]);
        assert_eq!(classify_row(&grid, 0, &rules()), RowClass::Ignored);
    }

    #[test]
    fn test_fund_total_rows() {
        let grid = Grid::from_text_rows(vec![
            vec!["4118", "UGRAD FNAR GENERAL", "", "", "", "90000", "30000"],
            vec!["4119", "GRAD FNAR GENERAL", "", "", "", "70000", "20000"],
            vec!["4119", "DEAN RESERVE", "", "", "", "1000", "0"],
            vec!["9999", "UGRAD OTHER", "", "", "", "1000", "0"],
        ]);
        assert_eq!(
            classify_row(&grid, 0, &rules()),
            RowClass::FundTotal(Fund::Undergraduate)
        );
        assert_eq!(
            classify_row(&grid, 1, &rules()),
            RowClass::FundTotal(Fund::Graduate)
        );
        assert_eq!(classify_row(&grid, 2, &rules()), RowClass::Ignored);
        assert_eq!(classify_row(&grid, 3, &rules()), RowClass::Ignored);
    }

    #[test]
    fn test_section_headers() {
        let grid = Grid::from_text_rows(vec![
            vec!["CURRENT EXPENSE"],
            vec!["Subtotal - Current Expense"],
            vec!["TOTAL EXPENDITURES"],
            vec!["", "", "", "", "Academic Salaries"],
            vec!["", "", "", "", "Non-Academic Salaries"],
        ]);
        let kinds: Vec<RowClass> = (0..5).map(|i| classify_row(&grid, i, &rules())).collect();
        assert_eq!(
            kinds,
            vec![
                RowClass::SectionHeader(SectionKind::CurrentExpense),
                RowClass::SectionHeader(SectionKind::CurrentExpenseSubtotal),
                RowClass::SectionHeader(SectionKind::TotalExpenditures),
                RowClass::SectionHeader(SectionKind::AcademicSalaries),
                RowClass::SectionHeader(SectionKind::NonAcademicSalaries),
            ]
        );
    }

    #[test]
    fn test_subtotals_only_inside_section() {
        let grid = Grid::from_text_rows(vec![
            vec!["", "", "101.0", "", "", "10"],
            vec!["CURRENT EXPENSE"],
            vec!["", "", "506.0", "", "", "10"],
            vec!["Subtotal - Current Expense", "", "", "", "", "10"],
            vec!["", "", "507.0", "", "", "10"],
        ]);
        let sheet = classify(&grid, &rules());

        assert_eq!(sheet.section_start, Some(1));
        assert_eq!(sheet.section_end, Some(3));
        assert_eq!(sheet.classes[0], RowClass::Ignored);
        assert_eq!(
            sheet.classes[2],
            RowClass::Subtotal {
                code: "506".to_string()
            }
        );
        assert_eq!(sheet.classes[4], RowClass::Ignored);
        assert_eq!(sheet.subtotal_rows().count(), 1);
        assert!(sheet.in_section(2));
        assert!(!sheet.in_section(3));
    }

    #[test]
    fn test_missing_section_header() {
        let grid = Grid::from_text_rows(vec![
            vec!["", "", "506.0", "", "", "10"],
            vec!["TOTAL EXPENDITURES", "", "", "", "", "100"],
        ]);
        let sheet = classify(&grid, &rules());
        assert_eq!(sheet.section_start, None);
        assert_eq!(sheet.subtotal_rows().count(), 0);
        assert_eq!(
            sheet.first_section_row(SectionKind::TotalExpenditures),
            Some(1)
        );
    }
}
