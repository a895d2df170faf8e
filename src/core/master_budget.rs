//! Master budget workbook extraction.
//!
//! The summary sheet carries one column per fiscal year, found by its label in the
//! header row (`FY26`). Headline figures sit on fixed rows of that column. The
//! breakdown sheet itemises some current-expense categories with its own fixed amount
//! column, and the course list sheet names the courses behind the course/studio lines.

use crate::core::cells::{read_amount, read_string};
use crate::core::course_catalog::{extract_course_catalog, CourseListLayout};
use crate::domain::model::{
    BudgetLine, BudgetReport, BudgetSummary, BudgetWorkbook, ExpenseCategory, Grid,
};
use crate::utils::error::{EtlError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Half-open row range, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpan {
    pub start: usize,
    pub end: usize,
}

impl RowSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn rows(self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSheets {
    pub summary: String,
    pub breakdown: String,
    pub courses: String,
}

impl Default for BudgetSheets {
    fn default() -> Self {
        Self {
            summary: "FA_Summary".to_string(),
            breakdown: "CE_Breakdown".to_string(),
            courses: "Sheet1".to_string(),
        }
    }
}

/// Rows of the summary sheet holding the headline figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryRows {
    pub standing_faculty: usize,
    pub practice_faculty: usize,
    pub adjunct_faculty: usize,
    pub total_academic: usize,
    pub nonacademic_benefits: usize,
    pub total_nonacademic: usize,
    pub total_compensation: usize,
    pub current_expenses: usize,
    pub graduate_total: usize,
    pub undergraduate_total: usize,
    pub grand_total: usize,
}

impl Default for SummaryRows {
    fn default() -> Self {
        Self {
            standing_faculty: 10,
            practice_faculty: 11,
            adjunct_faculty: 12,
            total_academic: 15,
            nonacademic_benefits: 39,
            total_nonacademic: 41,
            total_compensation: 42,
            current_expenses: 110,
            graduate_total: 111,
            undergraduate_total: 112,
            grand_total: 116,
        }
    }
}

impl SummaryRows {
    pub fn named_rows(&self) -> [(&'static str, usize); 11] {
        [
            ("standing_faculty", self.standing_faculty),
            ("practice_faculty", self.practice_faculty),
            ("adjunct_faculty", self.adjunct_faculty),
            ("total_academic", self.total_academic),
            ("nonacademic_benefits", self.nonacademic_benefits),
            ("total_nonacademic", self.total_nonacademic),
            ("total_compensation", self.total_compensation),
            ("current_expenses", self.current_expenses),
            ("graduate_total", self.graduate_total),
            ("undergraduate_total", self.undergraduate_total),
            ("grand_total", self.grand_total),
        ]
    }
}

/// A current-expense category reported on its own.
///
/// `summary_row` reads the amount from the fiscal-year column; without it the amount is
/// the sum of the itemised `breakdown_rows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCategoryRule {
    pub name: String,
    #[serde(default)]
    pub summary_row: Option<usize>,
    #[serde(default)]
    pub breakdown_rows: Option<RowSpan>,
}

impl ExpenseCategoryRule {
    fn new(name: &str, summary_row: Option<usize>, breakdown_rows: Option<RowSpan>) -> Self {
        Self {
            name: name.to_string(),
            summary_row,
            breakdown_rows,
        }
    }
}

pub fn default_expense_categories() -> Vec<ExpenseCategoryRule> {
    vec![
        ExpenseCategoryRule::new("Chair Expenses", None, Some(RowSpan::new(23, 27))),
        ExpenseCategoryRule::new(
            "Course/Studio Expenses",
            Some(66),
            Some(RowSpan::new(29, 40)),
        ),
        ExpenseCategoryRule::new("Department Administrative", Some(74), None),
        ExpenseCategoryRule::new("Departmental Events", Some(78), Some(RowSpan::new(63, 69))),
        ExpenseCategoryRule::new("Promotion of Department", Some(98), None),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownColumns {
    pub name: usize,
    pub amount: usize,
}

impl Default for BreakdownColumns {
    fn default() -> Self {
        Self {
            name: 1,
            amount: 16,
        }
    }
}

/// 總預算活頁簿版面，對應 `layout.toml` 的 `[budget]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterBudgetLayout {
    pub sheets: BudgetSheets,
    /// Row holding the fiscal-year labels.
    pub header_row: usize,
    pub label_column: usize,
    pub rows: SummaryRows,
    pub compensation_rows: RowSpan,
    pub expense_rows: RowSpan,
    pub categories: Vec<ExpenseCategoryRule>,
    pub breakdown: BreakdownColumns,
    pub courses: CourseListLayout,
}

impl Default for MasterBudgetLayout {
    fn default() -> Self {
        Self {
            sheets: BudgetSheets::default(),
            header_row: 4,
            label_column: 1,
            rows: SummaryRows::default(),
            compensation_rows: RowSpan::new(10, 43),
            expense_rows: RowSpan::new(48, 111),
            categories: default_expense_categories(),
            breakdown: BreakdownColumns::default(),
            courses: CourseListLayout::default(),
        }
    }
}

/// Column whose header-row cell equals the fiscal year code.
pub fn find_year_column(grid: &Grid, header_row: usize, fiscal_year: &str) -> Option<usize> {
    let wanted = fiscal_year.trim();
    (0..grid.row_len(header_row))
        .find(|&col| read_string(grid, header_row, col).eq_ignore_ascii_case(wanted))
}

pub fn read_summary(grid: &Grid, col: usize, rows: &SummaryRows) -> BudgetSummary {
    let amount = |row: usize| read_amount(grid, row, col);

    let nonacademic_benefits = amount(rows.nonacademic_benefits);
    let total_nonacademic = amount(rows.total_nonacademic);

    BudgetSummary {
        standing_faculty: amount(rows.standing_faculty),
        practice_faculty: amount(rows.practice_faculty),
        adjunct_faculty: amount(rows.adjunct_faculty),
        total_academic: amount(rows.total_academic),
        nonacademic_benefits,
        total_nonacademic,
        nonacademic_compensation: total_nonacademic - nonacademic_benefits,
        total_compensation: amount(rows.total_compensation),
        current_expenses: amount(rows.current_expenses),
        graduate_total: amount(rows.graduate_total),
        undergraduate_total: amount(rows.undergraduate_total),
        grand_total: amount(rows.grand_total),
    }
}

/// 具名且金額為正的列
pub fn labelled_lines(
    grid: &Grid,
    span: RowSpan,
    label_col: usize,
    amount_col: usize,
) -> Vec<BudgetLine> {
    span.rows()
        .filter_map(|row| {
            let name = read_string(grid, row, label_col);
            let amount = read_amount(grid, row, amount_col);
            (!name.is_empty() && amount > Decimal::ZERO).then_some(BudgetLine { name, amount })
        })
        .collect()
}

fn expense_categories(
    summary: &Grid,
    breakdown: Option<&Grid>,
    col: usize,
    layout: &MasterBudgetLayout,
) -> Vec<ExpenseCategory> {
    layout
        .categories
        .iter()
        .filter_map(|rule| {
            let subcategories = match (breakdown, rule.breakdown_rows) {
                (Some(grid), Some(span)) => {
                    labelled_lines(grid, span, layout.breakdown.name, layout.breakdown.amount)
                }
                _ => Vec::new(),
            };

            let amount = match rule.summary_row {
                Some(row) => read_amount(summary, row, col),
                None => subcategories.iter().map(|line| line.amount).sum(),
            };

            if amount > Decimal::ZERO {
                Some(ExpenseCategory {
                    name: rule.name.clone(),
                    amount,
                    subcategories,
                })
            } else {
                tracing::debug!("Skipping expense category '{}' with no budget", rule.name);
                None
            }
        })
        .collect()
}

/// Build the budget report for one fiscal year.
pub fn extract_master_budget(
    workbook: &BudgetWorkbook,
    fiscal_year: &str,
    layout: &MasterBudgetLayout,
) -> Result<BudgetReport> {
    let col = find_year_column(&workbook.summary, layout.header_row, fiscal_year)
        .ok_or_else(|| EtlError::ColumnNotFound {
            label: fiscal_year.to_string(),
            sheet: layout.sheets.summary.clone(),
        })?;
    tracing::info!("Found {} data in column {}", fiscal_year, col);

    let summary = read_summary(&workbook.summary, col, &layout.rows);
    let compensation_detail = labelled_lines(
        &workbook.summary,
        layout.compensation_rows,
        layout.label_column,
        col,
    );
    let expense_detail =
        labelled_lines(&workbook.summary, layout.expense_rows, layout.label_column, col);

    if workbook.breakdown.is_none() {
        tracing::warn!(
            "No '{}' sheet; expense categories have no subcategories",
            layout.sheets.breakdown
        );
    }
    let expense_categories = expense_categories(
        &workbook.summary,
        workbook.breakdown.as_ref(),
        col,
        layout,
    );

    let course_catalog = workbook
        .courses
        .as_ref()
        .map(|grid| extract_course_catalog(grid, &layout.courses))
        .unwrap_or_default();

    Ok(BudgetReport {
        fiscal_year: fiscal_year.to_string(),
        source_file_name: workbook.file_name.clone(),
        summary,
        compensation_detail,
        expense_detail,
        expense_categories,
        course_catalog,
    })
}
