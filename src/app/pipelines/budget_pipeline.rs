use crate::adapters::workbook::read_budget_workbook;
use crate::app::pipelines::write_outputs;
use crate::config::fiscal_years::BudgetJob;
use crate::config::toml_config::TrackingConfig;
use crate::core::master_budget::extract_master_budget;
use crate::core::{BudgetReport, BudgetWorkbook, ConfigProvider, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

/// Extracts one fiscal year's column of the master budget workbook.
pub struct BudgetPipeline<S: Storage> {
    storage: S,
    job: BudgetJob,
    settings: TrackingConfig,
}

impl<S: Storage> BudgetPipeline<S> {
    pub fn new(storage: S, job: BudgetJob) -> Self {
        Self::with_settings(storage, job, TrackingConfig::default())
    }

    pub fn with_settings(storage: S, job: BudgetJob, settings: TrackingConfig) -> Self {
        Self {
            storage,
            job,
            settings,
        }
    }
}

/// One line of `budget_lines.csv`.
#[derive(Debug, Serialize)]
struct BudgetLineRow<'a> {
    section: &'static str,
    category: &'a str,
    name: &'a str,
    amount: Decimal,
}

pub fn render_budget_lines_csv(report: &BudgetReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for line in &report.compensation_detail {
        writer.serialize(BudgetLineRow {
            section: "compensation",
            category: "",
            name: &line.name,
            amount: line.amount,
        })?;
    }
    for line in &report.expense_detail {
        writer.serialize(BudgetLineRow {
            section: "current_expense",
            category: "",
            name: &line.name,
            amount: line.amount,
        })?;
    }
    for category in &report.expense_categories {
        writer.serialize(BudgetLineRow {
            section: "expense_category",
            category: &category.name,
            name: "",
            amount: category.amount,
        })?;
        for sub in &category.subcategories {
            writer.serialize(BudgetLineRow {
                section: "subcategory",
                category: &category.name,
                name: &sub.name,
                amount: sub.amount,
            })?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

impl<S: Storage> Pipeline for BudgetPipeline<S> {
    type Source = BudgetWorkbook;
    type Report = BudgetReport;

    fn name(&self) -> &str {
        "master budget"
    }

    fn extract(&self) -> Result<BudgetWorkbook> {
        tracing::info!(
            "Reading master budget for {}: {}",
            self.job.fiscal_year,
            self.job.input_path()
        );
        read_budget_workbook(Path::new(self.job.input_path()), &self.settings.budget.sheets)
    }

    fn transform(&self, workbook: BudgetWorkbook) -> Result<BudgetReport> {
        let report =
            extract_master_budget(&workbook, &self.job.fiscal_year, &self.settings.budget)?;
        tracing::info!(
            "{} budget total: {} ({} expense categories, {} course groups)",
            report.fiscal_year,
            report.summary.grand_total,
            report.expense_categories.len(),
            report.course_catalog.len()
        );
        Ok(report)
    }

    fn load(&self, report: &BudgetReport) -> Result<String> {
        let prefix = self.job.report_prefix();
        let mut files = Vec::new();

        if self.settings.writes_format("json") {
            let json = serde_json::to_string_pretty(report)?;
            files.push((format!("{}_budget.json", prefix), json.into_bytes()));
        }
        if self.settings.writes_format("csv") {
            files.push((
                format!("{}_budget_lines.csv", prefix),
                render_budget_lines_csv(report)?,
            ));
        }

        let bundle = (self.job.bundle_outputs() || self.settings.load.bundle)
            .then(|| format!("{}_budget.zip", prefix));
        write_outputs(&self.storage, &files, bundle)
    }
}
