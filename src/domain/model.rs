use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 試算表中的單一儲存格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// 由文字建立儲存格：空白為 Empty，可解析的有限數值為 Number，其餘為 Text
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(trimmed.to_string()),
        }
    }
}

/// Row-major grid of cells. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|s| Cell::from_text(s.as_ref())).collect())
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }
}

/// 從來源檔案讀出的工作表
#[derive(Debug, Clone)]
pub struct SourceSheet {
    pub file_name: String,
    pub sheet_name: String,
    pub grid: Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Fund {
    Undergraduate,
    Graduate,
}

impl Fund {
    pub fn label(self) -> &'static str {
        match self {
            Fund::Undergraduate => "Undergraduate",
            Fund::Graduate => "Graduate",
        }
    }

    pub fn total_name(self) -> String {
        format!("{} Total", self.label())
    }
}

impl fmt::Display for Fund {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One budget category's financial snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub budget: Decimal,
    pub actuals: Decimal,
    pub committed: Decimal,
    pub available: Decimal,
}

impl LineItem {
    pub fn zero(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            budget: Decimal::ZERO,
            actuals: Decimal::ZERO,
            committed: Decimal::ZERO,
            available: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompensationKind {
    Academic,
    NonAcademic,
}

impl CompensationKind {
    pub fn label(self) -> &'static str {
        match self {
            CompensationKind::Academic => "Academic Salaries",
            CompensationKind::NonAcademic => "Non-Academic Salaries",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationSummary {
    pub kind: CompensationKind,
    #[serde(flatten)]
    pub line: LineItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundGroup {
    #[serde(rename = "fund_label")]
    pub fund: Fund,
    pub total: LineItem,
    pub categories: Vec<LineItem>,
    /// 被排除清單過濾掉的彙總列（非真正的支出類別）
    #[serde(default)]
    pub excluded: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingReport {
    pub period: String,
    pub source_file_name: String,
    pub academic: Option<CompensationSummary>,
    pub nonacademic: Option<CompensationSummary>,
    pub current_expense_total: Option<LineItem>,
    pub total_expenditures: Option<LineItem>,
    pub groups: Vec<FundGroup>,
    /// 無法在回溯範圍內判定基金歸屬的類別
    #[serde(default)]
    pub unclassified: Vec<LineItem>,
}

impl TrackingReport {
    pub fn group(&self, fund: Fund) -> Option<&FundGroup> {
        self.groups.iter().find(|g| g.fund == fund)
    }

    pub fn category_count(&self) -> usize {
        self.groups.iter().map(|g| g.categories.len()).sum()
    }
}

/// 總預算活頁簿：FA_Summary 必備，CE_Breakdown 與課程清單可缺
#[derive(Debug, Clone)]
pub struct BudgetWorkbook {
    pub file_name: String,
    pub summary: Grid,
    pub breakdown: Option<Grid>,
    pub courses: Option<Grid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub name: String,
    pub amount: Decimal,
}

/// Headline figures from one fiscal-year column of the master budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub standing_faculty: Decimal,
    pub practice_faculty: Decimal,
    pub adjunct_faculty: Decimal,
    pub total_academic: Decimal,
    pub nonacademic_benefits: Decimal,
    pub total_nonacademic: Decimal,
    /// Non-academic compensation without benefits.
    pub nonacademic_compensation: Decimal,
    pub total_compensation: Decimal,
    pub current_expenses: Decimal,
    pub graduate_total: Decimal,
    pub undergraduate_total: Decimal,
    pub grand_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub subcategories: Vec<BudgetLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
}

/// A course/studio expense line and the courses it funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseGroup {
    pub category: String,
    pub courses: Vec<Course>,
    /// 非課程代碼的註記，例如金額說明
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub fiscal_year: String,
    pub source_file_name: String,
    pub summary: BudgetSummary,
    pub compensation_detail: Vec<BudgetLine>,
    pub expense_detail: Vec<BudgetLine>,
    pub expense_categories: Vec<ExpenseCategory>,
    #[serde(default)]
    pub course_catalog: Vec<CourseGroup>,
}

impl BudgetReport {
    pub fn category(&self, name: &str) -> Option<&ExpenseCategory> {
        self.expense_categories.iter().find(|c| c.name == name)
    }

    pub fn course_group(&self, category: &str) -> Option<&CourseGroup> {
        self.course_catalog.iter().find(|g| g.category == category)
    }
}
