use crate::core::cells::{normalize_code, read_amount, read_number, read_string, to_amount};
use crate::core::classifier::{ClassifiedSheet, RowClass};
use crate::core::rules::ExtractionRules;
use crate::domain::model::{Fund, Grid, LineItem};
use std::collections::BTreeMap;

/// Categories pulled out of the current-expense section, before the exclusion policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCategories {
    pub by_fund: BTreeMap<Fund, Vec<LineItem>>,
    pub fund_totals: BTreeMap<Fund, LineItem>,
    pub unclassified: Vec<LineItem>,
}

impl ExtractedCategories {
    pub fn categories(&self, fund: Fund) -> &[LineItem] {
        self.by_fund.get(&fund).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// 費用列帶入的類別名稱，綁定其代碼
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCategory {
    code: String,
    name: String,
}

/// Accumulator threaded through the row scan.
#[derive(Debug, Clone, Default)]
struct CategoryFold {
    pending: Option<PendingCategory>,
    out: ExtractedCategories,
}

impl CategoryFold {
    fn step(mut self, grid: &Grid, row: usize, class: &RowClass, rules: &ExtractionRules) -> Self {
        match class {
            RowClass::Subtotal { code } => {
                let inline = self
                    .pending
                    .take()
                    .filter(|pending| pending.code == *code)
                    .map(|pending| pending.name);
                let name = category_name(code, inline, rules);
                let item = line_item(grid, row, rules, name, Some(code.clone()));

                match fund_for_row(grid, row, rules) {
                    Some(fund) => self.out.by_fund.entry(fund).or_default().push(item),
                    None => {
                        tracing::warn!(
                            "Category {} (row {}) has no fund context within {} rows; moved to unclassified",
                            code,
                            row + 1,
                            rules.lookback_rows
                        );
                        self.out.unclassified.push(item);
                    }
                }
            }
            RowClass::FundTotal(fund) => {
                if !self.out.fund_totals.contains_key(fund) {
                    let item = line_item(grid, row, rules, fund.total_name(), None);
                    self.out.fund_totals.insert(*fund, item);
                }
                self.pending = None;
            }
            RowClass::Ignored => {
                // 每一筆具名費用列都覆寫，沒有小計列的區塊不會殘留名稱
                if let Some(pending) = introduced_category(grid, row, rules) {
                    self.pending = Some(pending);
                }
            }
            RowClass::SectionHeader(_) => {}
        }
        self
    }
}

/// 費用列：基金說明、代碼與明細欄皆有值時，明細欄即為類別名稱
fn introduced_category(
    grid: &Grid,
    row: usize,
    rules: &ExtractionRules,
) -> Option<PendingCategory> {
    let layout = &rules.layout;
    let description = read_string(grid, row, layout.fund_description);
    let code = normalize_code(&read_string(grid, row, layout.code));
    let detail = read_string(grid, row, layout.detail_label);

    if description.is_empty() || code.is_empty() || detail.is_empty() {
        return None;
    }
    Some(PendingCategory { code, name: detail })
}

fn category_name(code: &str, inline: Option<String>, rules: &ExtractionRules) -> String {
    if let Some(known) = rules.catalog.name_for(code) {
        return known.to_string();
    }
    inline.unwrap_or_else(|| format!("Section {}", code))
}

/// Fund of the row itself, else of the nearest row above (within `lookback_rows`)
/// whose fund description is non-empty.
pub fn fund_for_row(grid: &Grid, row: usize, rules: &ExtractionRules) -> Option<Fund> {
    let column = rules.layout.fund_description;

    let own = read_string(grid, row, column);
    if !own.is_empty() {
        return rules.fund_for_description(&own);
    }

    let floor = row.saturating_sub(rules.lookback_rows);
    (floor..row)
        .rev()
        .map(|r| read_string(grid, r, column))
        .find(|description| !description.is_empty())
        .and_then(|description| rules.fund_for_description(&description))
}

/// Build a line item from the amount columns of `row`. A blank available cell is
/// derived as budget - actuals - committed.
pub fn line_item(
    grid: &Grid,
    row: usize,
    rules: &ExtractionRules,
    name: String,
    code: Option<String>,
) -> LineItem {
    let layout = &rules.layout;
    let budget = read_amount(grid, row, layout.budget);
    let actuals = read_amount(grid, row, layout.actuals);
    let committed = read_amount(grid, row, layout.committed);
    let available = match read_number(grid, row, layout.available) {
        Some(v) => to_amount(v),
        None => budget - actuals - committed,
    };

    LineItem {
        name,
        code,
        budget,
        actuals,
        committed,
        available,
    }
}

pub fn extract_categories(
    grid: &Grid,
    sheet: &ClassifiedSheet,
    rules: &ExtractionRules,
) -> ExtractedCategories {
    let fold = sheet
        .classes
        .iter()
        .enumerate()
        .filter(|(row, _)| sheet.in_section(*row))
        .fold(CategoryFold::default(), |acc, (row, class)| {
            acc.step(grid, row, class, rules)
        });

    let out = fold.out;
    tracing::debug!(
        "Extracted {} undergraduate, {} graduate, {} unclassified categories",
        out.categories(Fund::Undergraduate).len(),
        out.categories(Fund::Graduate).len(),
        out.unclassified.len()
    );
    out
}
