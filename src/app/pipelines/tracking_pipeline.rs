use crate::adapters::workbook::read_sheet;
use crate::app::pipelines::write_outputs;
use crate::config::toml_config::TrackingConfig;
use crate::core::assembler::{build_report, format_percent, percent_of_budget, progress, Progress};
use crate::core::rules::ExtractionRules;
use crate::core::{ConfigProvider, LineItem, Pipeline, SourceSheet, Storage, TrackingReport};
use crate::utils::error::{EtlError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

pub struct TrackingPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) settings: TrackingConfig,
    rules: ExtractionRules,
}

impl<S: Storage, C: ConfigProvider> TrackingPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self::with_settings(storage, config, TrackingConfig::default())
    }

    pub fn with_settings(storage: S, config: C, settings: TrackingConfig) -> Self {
        let rules = settings.rules();
        Self {
            storage,
            config,
            settings,
            rules,
        }
    }

    fn bundle(&self) -> bool {
        self.config.bundle_outputs() || self.settings.load.bundle
    }
}

/// One line of `categories.csv`.
#[derive(Debug, Serialize)]
struct CategoryRow<'a> {
    fund: &'a str,
    code: &'a str,
    name: &'a str,
    budget: Decimal,
    actuals: Decimal,
    committed: Decimal,
    available: Decimal,
    percent_spent: String,
    status: &'static str,
}

impl<'a> CategoryRow<'a> {
    fn new(fund: &'a str, item: &'a LineItem) -> Self {
        let status = match progress(item) {
            Progress::NoBudget { .. } => "no_budget",
            Progress::Spent { status, .. } => status.as_str(),
        };
        Self {
            fund,
            code: item.code.as_deref().unwrap_or(""),
            name: &item.name,
            budget: item.budget,
            actuals: item.actuals,
            committed: item.committed,
            available: item.available,
            percent_spent: format_percent(percent_of_budget(item)),
            status,
        }
    }
}

pub fn render_categories_csv(report: &TrackingReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for group in &report.groups {
        for item in &group.categories {
            writer.serialize(CategoryRow::new(group.fund.label(), item))?;
        }
    }
    for item in &report.unclassified {
        writer.serialize(CategoryRow::new("Unclassified", item))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

impl<S: Storage, C: ConfigProvider> Pipeline for TrackingPipeline<S, C> {
    type Source = SourceSheet;
    type Report = TrackingReport;

    fn name(&self) -> &str {
        "tracking"
    }

    fn extract(&self) -> Result<SourceSheet> {
        tracing::debug!("Reading tracking sheet: {}", self.config.input_path());
        let sheet = read_sheet(
            Path::new(self.config.input_path()),
            &self.settings.input.sheet_names,
        )?;
        tracing::info!(
            "Extracted sheet '{}' from {} ({} rows)",
            sheet.sheet_name,
            sheet.file_name,
            sheet.grid.row_count()
        );
        Ok(sheet)
    }

    fn transform(&self, sheet: SourceSheet) -> Result<TrackingReport> {
        let report = build_report(&sheet, &self.rules);
        tracing::info!(
            "Built report for '{}': {} categories, {} unclassified",
            report.period,
            report.category_count(),
            report.unclassified.len()
        );

        for group in &report.groups {
            tracing::debug!(
                "{}: {} categories, {} excluded, total budget {}",
                group.fund,
                group.categories.len(),
                group.excluded.len(),
                group.total.budget
            );
        }
        if !report.unclassified.is_empty() {
            tracing::warn!(
                "{} categories could not be assigned to a fund",
                report.unclassified.len()
            );
        }

        Ok(report)
    }

    fn load(&self, report: &TrackingReport) -> Result<String> {
        let prefix = self.config.report_prefix();
        let mut files = Vec::new();

        if self.settings.writes_format("json") {
            let json = serde_json::to_string_pretty(report)?;
            files.push((format!("{}_tracking.json", prefix), json.into_bytes()));
        }
        if self.settings.writes_format("csv") {
            files.push((
                format!("{}_categories.csv", prefix),
                render_categories_csv(report)?,
            ));
        }

        let bundle = self.bundle().then(|| format!("{}_tracking.zip", prefix));
        write_outputs(&self.storage, &files, bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::MockStorage;
    use crate::domain::model::{Fund, Grid};
    use std::io::Read;

    struct MockConfig {
        bundle: bool,
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "unused.xlsx"
        }

        fn report_prefix(&self) -> String {
            "fy26".to_string()
        }

        fn bundle_outputs(&self) -> bool {
            self.bundle
        }
    }

    fn sheet() -> SourceSheet {
        SourceSheet {
            file_name: "Feb_2026.xlsx".to_string(),
            sheet_name: "Monthly Department Summary".to_string(),
            grid: Grid::from_text_rows(vec![
                vec!["Fine Arts Department"],
                vec!["February 2026"],
                vec!["CURRENT EXPENSE"],
                vec!["4118", "F A UNDERGRAD", "506.0", "Printmaking", "Paper", "0", "1200"],
                vec!["", "", "506.0", "", "", "10000", "4000"],
                vec!["4118", "F A UNDERGRAD", "888.0", "", "Misc", "0", "50"],
                vec!["", "", "888.0", "", "", "0", "50"],
                vec!["4118", "UGRAD FNAR GENERAL", "", "", "", "10000", "4050"],
                vec!["Subtotal - Current Expense", "", "", "", "", "10000", "4050"],
            ]),
        }
    }

    #[test]
    fn test_transform_builds_report() {
        let pipeline = TrackingPipeline::new(MockStorage::default(), MockConfig { bundle: false });
        let report = pipeline.transform(sheet()).unwrap();

        assert_eq!(report.period, "February 2026");
        let ug = report.group(Fund::Undergraduate).unwrap();
        assert_eq!(ug.categories.len(), 2);
        assert_eq!(ug.categories[1].name, "Section 888");
    }

    #[test]
    fn test_load_writes_json_and_csv() {
        let storage = MockStorage::default();
        let pipeline = TrackingPipeline::new(storage.clone(), MockConfig { bundle: false });
        let report = pipeline.transform(sheet()).unwrap();

        let output = pipeline.load(&report).unwrap();
        assert_eq!(output, "test_output/fy26_tracking.json");

        let json = storage.get_file("fy26_tracking.json").unwrap();
        let parsed: TrackingReport = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, report);

        let csv_text = String::from_utf8(storage.get_file("fy26_categories.csv").unwrap()).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(
            lines[0],
            "fund,code,name,budget,actuals,committed,available,percent_spent,status"
        );
        assert_eq!(lines[1], "Undergraduate,506,Printmaking,10000,4000,0,6000,40.0%,ok");
        assert_eq!(lines[2], "Undergraduate,888,Section 888,0,50,0,-50,N/A,no_budget");
    }

    #[test]
    fn test_load_bundles_into_zip() {
        let storage = MockStorage::default();
        let pipeline = TrackingPipeline::new(storage.clone(), MockConfig { bundle: true });
        let report = pipeline.transform(sheet()).unwrap();

        let output = pipeline.load(&report).unwrap();
        assert_eq!(output, "test_output/fy26_tracking.zip");
        assert!(storage.get_file("fy26_tracking.json").is_none());

        let zip_data = storage.get_file("fy26_tracking.zip").unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut csv_text = String::new();
        archive
            .by_name("fy26_categories.csv")
            .unwrap()
            .read_to_string(&mut csv_text)
            .unwrap();
        assert!(csv_text.contains("Printmaking"));
    }
}
