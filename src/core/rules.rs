//! Declarative description of the tracking sheet layout.
//!
//! Column positions, the section vocabulary, fund codes and the category catalog all
//! live here so the classifier and extractor never hardcode a column index or label.
//! Defaults reproduce the "Monthly Department Summary" layout:
//!
//! | col | A | B | C | D | E | F | G | H | I |
//! |-----|---|---|---|---|---|---|---|---|---|
//! | use | fund code / section title | fund description | section code | category name | charge type | budget | FYTD actuals | committed | available |

use crate::domain::model::Fund;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub primary_label: usize,
    pub fund_description: usize,
    pub code: usize,
    pub detail_label: usize,
    pub charge_type: usize,
    pub budget: usize,
    pub actuals: usize,
    pub committed: usize,
    pub available: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            primary_label: 0,
            fund_description: 1,
            code: 2,
            detail_label: 3,
            charge_type: 4,
            budget: 5,
            actuals: 6,
            committed: 7,
            available: 8,
        }
    }
}

impl ColumnLayout {
    pub fn index_of(&self, column: LabelColumn) -> usize {
        match column {
            LabelColumn::PrimaryLabel => self.primary_label,
            LabelColumn::FundDescription => self.fund_description,
            LabelColumn::Code => self.code,
            LabelColumn::DetailLabel => self.detail_label,
            LabelColumn::ChargeType => self.charge_type,
        }
    }

    pub fn named_columns(&self) -> [(&'static str, usize); 9] {
        [
            ("primary_label", self.primary_label),
            ("fund_description", self.fund_description),
            ("code", self.code),
            ("detail_label", self.detail_label),
            ("charge_type", self.charge_type),
            ("budget", self.budget),
            ("actuals", self.actuals),
            ("committed", self.committed),
            ("available", self.available),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelColumn {
    PrimaryLabel,
    FundDescription,
    Code,
    DetailLabel,
    ChargeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    CurrentExpense,
    CurrentExpenseSubtotal,
    TotalExpenditures,
    AcademicSalaries,
    NonAcademicSalaries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    #[default]
    Contains,
}

/// A labelled row that opens or closes a section of the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRule {
    pub kind: SectionKind,
    pub column: LabelColumn,
    pub label: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl SectionRule {
    pub fn new(kind: SectionKind, column: LabelColumn, label: &str) -> Self {
        Self {
            kind,
            column,
            label: label.to_string(),
            mode: MatchMode::Contains,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let text = text.to_uppercase();
        let label = self.label.to_uppercase();
        match self.mode {
            MatchMode::Exact => text == label,
            MatchMode::Contains => text.contains(&label),
        }
    }
}

/// 基金代碼與說明欄中的識別字
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRule {
    pub fund: Fund,
    pub code: String,
    pub markers: Vec<String>,
}

impl FundRule {
    pub fn matches_description(&self, description: &str) -> bool {
        let upper = description.to_uppercase();
        self.markers
            .iter()
            .any(|marker| upper.contains(&marker.to_uppercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCatalog {
    /// normalized code -> display name
    pub known: BTreeMap<String, String>,
    pub excluded: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        let known = [
            ("50", "Visiting Lectures"),
            ("505", "Drawing/Painting Instructional"),
            ("506", "Printmaking"),
            ("507", "Sculpture Instructional"),
            ("509", "Video Instructional"),
            ("511", "Animation Instructional"),
            ("513", "Digital Design"),
            ("515", "Photography Instructional"),
            ("569", "Photography Consumables"),
            ("592", "Senior Seminar"),
        ]
        .into_iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();

        Self {
            known,
            excluded: vec!["50".to_string(), "503".to_string()],
        }
    }
}

impl CategoryCatalog {
    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.known.get(code).map(String::as_str)
    }

    pub fn is_excluded(&self, code: &str) -> bool {
        self.excluded.iter().any(|c| c == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRules {
    pub layout: ColumnLayout,
    /// 依序比對，較精確的標籤必須排在前面
    pub sections: Vec<SectionRule>,
    /// Undergraduate must precede Graduate: "UNDERGRAD" also contains "GRAD".
    pub funds: Vec<FundRule>,
    pub catalog: CategoryCatalog,
    pub lookback_rows: usize,
}

pub const DEFAULT_LOOKBACK_ROWS: usize = 10;

pub fn default_sections() -> Vec<SectionRule> {
    vec![
        SectionRule::new(
            SectionKind::CurrentExpenseSubtotal,
            LabelColumn::PrimaryLabel,
            "Subtotal - Current Expense",
        ),
        SectionRule::new(
            SectionKind::CurrentExpense,
            LabelColumn::PrimaryLabel,
            "CURRENT EXPENSE",
        ),
        SectionRule::new(
            SectionKind::TotalExpenditures,
            LabelColumn::PrimaryLabel,
            "TOTAL EXPENDITURES",
        ),
        SectionRule::new(
            SectionKind::NonAcademicSalaries,
            LabelColumn::ChargeType,
            "Non-Academic Salaries",
        ),
        SectionRule::new(
            SectionKind::AcademicSalaries,
            LabelColumn::ChargeType,
            "Academic Salaries",
        ),
    ]
}

pub fn default_funds() -> Vec<FundRule> {
    vec![
        FundRule {
            fund: Fund::Undergraduate,
            code: "4118".to_string(),
            markers: vec!["UNDERGRAD".to_string(), "UGRAD".to_string()],
        },
        FundRule {
            fund: Fund::Graduate,
            code: "4119".to_string(),
            markers: vec!["GRAD".to_string()],
        },
    ]
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            layout: ColumnLayout::default(),
            sections: default_sections(),
            funds: default_funds(),
            catalog: CategoryCatalog::default(),
            lookback_rows: DEFAULT_LOOKBACK_ROWS,
        }
    }
}

impl ExtractionRules {
    /// 依說明文字判定基金，先符合者優先
    pub fn fund_for_description(&self, description: &str) -> Option<Fund> {
        if description.is_empty() {
            return None;
        }
        self.funds
            .iter()
            .find(|rule| rule.matches_description(description))
            .map(|rule| rule.fund)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_rule_matching() {
        let rule = SectionRule::new(
            SectionKind::CurrentExpense,
            LabelColumn::PrimaryLabel,
            "CURRENT EXPENSE",
        );
        assert!(rule.matches("current expense"));
        assert!(rule.matches("  CURRENT EXPENSE (4118/4119)"));
        assert!(!rule.matches(""));

        let exact = SectionRule {
            mode: MatchMode::Exact,
            ..rule
        };
        assert!(exact.matches("Current Expense"));
        assert!(!exact.matches("Subtotal - Current Expense"));
    }

    #[test]
    fn test_specific_sections_come_first() {
        let sections = default_sections();
        let first_match = |text: &str| {
            sections
                .iter()
                .find(|rule| rule.matches(text))
                .map(|rule| rule.kind)
        };
        assert_eq!(
            first_match("Subtotal - Current Expense"),
            Some(SectionKind::CurrentExpenseSubtotal)
        );
        assert_eq!(
            first_match("Non-Academic Salaries"),
            Some(SectionKind::NonAcademicSalaries)
        );
        assert_eq!(first_match("Academic Salaries"), Some(SectionKind::AcademicSalaries));
    }

    #[test]
    fn test_fund_for_description() {
        let rules = ExtractionRules::default();
        assert_eq!(
            rules.fund_for_description("F A UNDERGRAD"),
            Some(Fund::Undergraduate)
        );
        assert_eq!(
            rules.fund_for_description("UGRAD FNAR GENERAL"),
            Some(Fund::Undergraduate)
        );
        assert_eq!(rules.fund_for_description("F A GRAD"), Some(Fund::Graduate));
        assert_eq!(rules.fund_for_description("DEAN'S OFFICE"), None);
        assert_eq!(rules.fund_for_description(""), None);
    }

    #[test]
    fn test_catalog_defaults() {
        let catalog = CategoryCatalog::default();
        assert_eq!(catalog.name_for("506"), Some("Printmaking"));
        assert_eq!(catalog.name_for("999"), None);
        assert!(catalog.is_excluded("503"));
        assert!(!catalog.is_excluded("506"));
    }
}
