use crate::core::cells::read_string;
use crate::core::classifier::{classify, ClassifiedSheet};
use crate::core::extractor::{extract_categories, line_item, ExtractedCategories};
use crate::core::rules::{ExtractionRules, SectionKind};
use crate::domain::model::{
    CompensationKind, CompensationSummary, Fund, FundGroup, Grid, LineItem, SourceSheet,
    TrackingReport,
};
use rust_decimal::prelude::*;
use serde::Serialize;

/// Above this share of the budget a category is flagged as a warning.
pub const WARNING_THRESHOLD_PERCENT: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    Warning,
    Over,
}

impl BudgetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetStatus::Ok => "ok",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Over => "over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    NoBudget { spent: Decimal },
    Spent { percent: f64, status: BudgetStatus },
}

/// `actuals / budget * 100`, or `None` for a zero budget.
pub fn percent_of_budget(item: &LineItem) -> Option<f64> {
    if item.budget.is_zero() {
        return None;
    }
    let ratio = item.actuals / item.budget * Decimal::ONE_HUNDRED;
    ratio.to_f64()
}

pub fn progress(item: &LineItem) -> Progress {
    if item.budget <= Decimal::ZERO {
        return Progress::NoBudget {
            spent: item.actuals,
        };
    }

    let percent = percent_of_budget(item).unwrap_or_default();
    let status = if item.actuals > item.budget {
        BudgetStatus::Over
    } else if percent > WARNING_THRESHOLD_PERCENT {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Ok
    };
    Progress::Spent { percent, status }
}

/// 一位小數，無條件捨去，避免顯示值高於實際支出比例
pub fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{:.1}%", (p * 10.0).trunc() / 10.0),
        None => "N/A".to_string(),
    }
}

pub fn over_budget_count(items: &[LineItem]) -> usize {
    items
        .iter()
        .filter(|item| item.budget > Decimal::ZERO && item.actuals > item.budget)
        .count()
}

/// 報告期間：第二列 A 欄，若空白則取第一列
fn period(grid: &Grid, rules: &ExtractionRules) -> String {
    let col = rules.layout.primary_label;
    let second = read_string(grid, 1, col);
    if second.is_empty() {
        read_string(grid, 0, col)
    } else {
        second
    }
}

fn section_line(
    grid: &Grid,
    sheet: &ClassifiedSheet,
    rules: &ExtractionRules,
    kind: SectionKind,
    name: &str,
) -> Option<LineItem> {
    let item = sheet
        .first_section_row(kind)
        .map(|row| line_item(grid, row, rules, name.to_string(), None));
    if item.is_none() {
        tracing::warn!("Row for '{}' not found in sheet", name);
    }
    item
}

fn compensation(
    grid: &Grid,
    sheet: &ClassifiedSheet,
    rules: &ExtractionRules,
    kind: CompensationKind,
) -> Option<CompensationSummary> {
    let section = match kind {
        CompensationKind::Academic => SectionKind::AcademicSalaries,
        CompensationKind::NonAcademic => SectionKind::NonAcademicSalaries,
    };
    section_line(grid, sheet, rules, section, kind.label())
        .map(|line| CompensationSummary { kind, line })
}

fn fund_group(
    fund: Fund,
    extracted: &mut ExtractedCategories,
    rules: &ExtractionRules,
) -> FundGroup {
    let total = extracted.fund_totals.remove(&fund).unwrap_or_else(|| {
        tracing::warn!("No {} fund total row found", fund);
        LineItem::zero(fund.total_name())
    });

    let (excluded, categories): (Vec<LineItem>, Vec<LineItem>) = extracted
        .by_fund
        .remove(&fund)
        .unwrap_or_default()
        .into_iter()
        .partition(|item| {
            item.code
                .as_deref()
                .is_some_and(|code| rules.catalog.is_excluded(code))
        });

    FundGroup {
        fund,
        total,
        categories,
        excluded,
    }
}

/// Compose the structured report from an already classified sheet.
pub fn assemble(
    source: &SourceSheet,
    sheet: &ClassifiedSheet,
    mut extracted: ExtractedCategories,
    rules: &ExtractionRules,
) -> TrackingReport {
    let grid = &source.grid;

    let groups = [Fund::Undergraduate, Fund::Graduate]
        .into_iter()
        .map(|fund| fund_group(fund, &mut extracted, rules))
        .collect();

    TrackingReport {
        period: period(grid, rules),
        source_file_name: source.file_name.clone(),
        academic: compensation(grid, sheet, rules, CompensationKind::Academic),
        nonacademic: compensation(grid, sheet, rules, CompensationKind::NonAcademic),
        current_expense_total: section_line(
            grid,
            sheet,
            rules,
            SectionKind::CurrentExpenseSubtotal,
            "Current Expense Total",
        ),
        total_expenditures: section_line(
            grid,
            sheet,
            rules,
            SectionKind::TotalExpenditures,
            "Total Expenditures",
        ),
        groups,
        unclassified: extracted.unclassified,
    }
}

/// Run the full pass: classify, extract, assemble.
pub fn build_report(source: &SourceSheet, rules: &ExtractionRules) -> TrackingReport {
    let sheet = classify(&source.grid, rules);
    let extracted = extract_categories(&source.grid, &sheet, rules);
    assemble(source, &sheet, extracted, rules)
}
