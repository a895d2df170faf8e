use crate::adapters::workbook::DEFAULT_SHEET_NAMES;
use crate::core::master_budget::{MasterBudgetLayout, RowSpan};
use crate::core::rules::{
    default_funds, default_sections, CategoryCatalog, ColumnLayout, ExtractionRules, FundRule,
    SectionKind, SectionRule, DEFAULT_LOOKBACK_ROWS,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_distinct_columns, validate_non_empty_string, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const VALID_OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

/// 追蹤表版面設定，對應 `layout.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub input: InputConfig,
    pub layout: ColumnLayout,
    pub labels: LabelConfig,
    pub categories: CategoryCatalog,
    pub extract: ExtractConfig,
    pub load: LoadConfig,
    pub budget: MasterBudgetLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// 依序嘗試的工作表名稱
    pub sheet_names: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sheet_names: DEFAULT_SHEET_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub sections: Vec<SectionRule>,
    pub funds: Vec<FundRule>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            funds: default_funds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub lookback_rows: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            lookback_rows: DEFAULT_LOOKBACK_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_formats: Vec<String>,
    pub bundle: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_formats: VALID_OUTPUT_FORMATS.iter().map(|s| s.to_string()).collect(),
            bundle: false,
        }
    }
}

impl TrackingConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BUDGET_SHEET})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn rules(&self) -> ExtractionRules {
        ExtractionRules {
            layout: self.layout.clone(),
            sections: self.labels.sections.clone(),
            funds: self.labels.funds.clone(),
            catalog: self.categories.clone(),
            lookback_rows: self.extract.lookback_rows,
        }
    }

    pub fn writes_format(&self, format: &str) -> bool {
        self.load.output_formats.iter().any(|f| f == format)
    }
}

fn validate_span(field_name: &str, span: RowSpan) -> Result<()> {
    if span.start >= span.end {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", span.start, span.end),
            reason: "start must be below end".to_string(),
        });
    }
    Ok(())
}

/// 總預算版面：資料列必須在年度標題列之下
fn validate_budget_layout(budget: &MasterBudgetLayout) -> Result<()> {
    validate_non_empty_string("budget.sheets.summary", &budget.sheets.summary)?;

    for (name, row) in budget.rows.named_rows() {
        if row <= budget.header_row {
            return Err(EtlError::ConfigValidationError {
                field: format!("budget.rows.{}", name),
                message: format!("Row {} is not below header_row {}", row, budget.header_row),
            });
        }
    }
    validate_span("budget.compensation_rows", budget.compensation_rows)?;
    validate_span("budget.expense_rows", budget.expense_rows)?;

    validate_distinct_columns(
        "budget.breakdown",
        &[
            ("name", budget.breakdown.name),
            ("amount", budget.breakdown.amount),
        ],
    )?;
    validate_distinct_columns(
        "budget.courses",
        &[
            ("category", budget.courses.category),
            ("code", budget.courses.code),
            ("name", budget.courses.name),
        ],
    )?;

    for rule in &budget.categories {
        validate_non_empty_string("budget.categories.name", &rule.name)?;
        if rule.summary_row.is_none() && rule.breakdown_rows.is_none() {
            return Err(EtlError::InvalidConfigValueError {
                field: "budget.categories".to_string(),
                value: rule.name.clone(),
                reason: "Needs a summary_row or breakdown_rows".to_string(),
            });
        }
        if let Some(span) = rule.breakdown_rows {
            validate_span("budget.categories.breakdown_rows", span)?;
        }
    }

    Ok(())
}

impl Validate for TrackingConfig {
    fn validate(&self) -> Result<()> {
        validate_distinct_columns("layout", &self.layout.named_columns())?;
        validate_range("extract.lookback_rows", self.extract.lookback_rows, 1, 100)?;

        if !self
            .labels
            .sections
            .iter()
            .any(|rule| rule.kind == SectionKind::CurrentExpense)
        {
            return Err(EtlError::ConfigValidationError {
                field: "labels.sections".to_string(),
                message: "A current_expense section rule is required".to_string(),
            });
        }
        for rule in &self.labels.sections {
            validate_non_empty_string("labels.sections.label", &rule.label)?;
        }
        for rule in &self.labels.funds {
            validate_non_empty_string("labels.funds.code", &rule.code)?;
            if rule.markers.iter().all(|m| m.trim().is_empty()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "labels.funds.markers".to_string(),
                    value: rule.code.clone(),
                    reason: "At least one non-empty marker is required".to_string(),
                });
            }
        }

        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            if !VALID_OUTPUT_FORMATS.contains(&format.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "load.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_OUTPUT_FORMATS.join(", ")
                    ),
                });
            }
        }

        validate_budget_layout(&self.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{LabelColumn, MatchMode};
    use crate::domain::model::Fund;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = TrackingConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackingConfig::default());
        assert_eq!(config.rules(), ExtractionRules::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_layout_and_labels() {
        let toml_content = r#"
[input]
sheet_names = ["Dept Summary"]

[layout]
code = 3
detail_label = 2

[[labels.sections]]
kind = "current_expense"
column = "primary_label"
label = "CURRENT EXPENSE"
mode = "exact"

[[labels.funds]]
fund = "Graduate"
code = "5119"
markers = ["GRAD"]

[categories]
excluded = ["50"]

[categories.known]
"777" = "Graduate Travel"

[extract]
lookback_rows = 4

[load]
output_formats = ["json"]
bundle = true
"#;

        let config = TrackingConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.input.sheet_names, vec!["Dept Summary".to_string()]);
        assert_eq!(config.layout.code, 3);
        assert_eq!(config.layout.budget, 5);

        let rules = config.rules();
        assert_eq!(rules.sections.len(), 1);
        assert_eq!(rules.sections[0].mode, MatchMode::Exact);
        assert_eq!(rules.sections[0].column, LabelColumn::PrimaryLabel);
        assert_eq!(rules.funds[0].fund, Fund::Graduate);
        assert_eq!(rules.catalog.name_for("777"), Some("Graduate Travel"));
        assert_eq!(rules.catalog.name_for("506"), None);
        assert!(!rules.catalog.is_excluded("503"));
        assert_eq!(rules.lookback_rows, 4);
        assert!(config.load.bundle);
        assert!(config.writes_format("json"));
        assert!(!config.writes_format("csv"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TRACKING_SHEET_NAME", "FY26 Summary");

        let config = TrackingConfig::from_toml_str(
            r#"
[input]
sheet_names = ["${TRACKING_SHEET_NAME}", "${TRACKING_UNSET_SHEET}"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.input.sheet_names,
            vec![
                "FY26 Summary".to_string(),
                "${TRACKING_UNSET_SHEET}".to_string()
            ]
        );

        std::env::remove_var("TRACKING_SHEET_NAME");
    }

    #[test]
    fn test_config_validation() {
        let duplicate = TrackingConfig::from_toml_str("[layout]\nbudget = 6\n").unwrap();
        assert!(duplicate.validate().is_err());

        let lookback = TrackingConfig::from_toml_str("[extract]\nlookback_rows = 0\n").unwrap();
        assert!(lookback.validate().is_err());

        let format = TrackingConfig::from_toml_str("[load]\noutput_formats = [\"tsv\"]\n").unwrap();
        assert!(format.validate().is_err());

        let no_section = TrackingConfig::from_toml_str(
            r#"
[[labels.sections]]
kind = "total_expenditures"
column = "primary_label"
label = "TOTAL EXPENDITURES"
"#,
        )
        .unwrap();
        assert!(no_section.validate().is_err());
    }

    #[test]
    fn test_parse_budget_section() {
        let config = TrackingConfig::from_toml_str(
            r#"
[budget]
header_row = 3
compensation_rows = { start = 8, end = 40 }

[budget.rows]
grand_total = 120

[budget.breakdown]
amount = 17

[budget.courses]
note_prefixes = ["$", "Note:"]

[[budget.categories]]
name = "Visiting Artists"
summary_row = 70

[[budget.categories]]
name = "Chair Expenses"
breakdown_rows = { start = 23, end = 27 }
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let budget = &config.budget;
        assert_eq!(budget.header_row, 3);
        assert_eq!(budget.compensation_rows, RowSpan::new(8, 40));
        assert_eq!(budget.expense_rows, RowSpan::new(48, 111));
        assert_eq!(budget.rows.grand_total, 120);
        assert_eq!(budget.rows.standing_faculty, 10);
        assert_eq!(budget.breakdown.name, 1);
        assert_eq!(budget.breakdown.amount, 17);
        assert_eq!(budget.sheets.summary, "FA_Summary");
        assert_eq!(budget.courses.note_prefixes.len(), 2);
        assert_eq!(budget.categories.len(), 2);
        assert_eq!(budget.categories[0].summary_row, Some(70));
        assert_eq!(budget.categories[1].summary_row, None);
    }

    #[test]
    fn test_budget_validation() {
        let header = TrackingConfig::from_toml_str("[budget]\nheader_row = 20\n").unwrap();
        assert!(header.validate().is_err());

        let span = TrackingConfig::from_toml_str(
            "[budget]\nexpense_rows = { start = 111, end = 48 }\n",
        )
        .unwrap();
        assert!(span.validate().is_err());

        let columns = TrackingConfig::from_toml_str("[budget.breakdown]\namount = 1\n").unwrap();
        assert!(columns.validate().is_err());

        let category = TrackingConfig::from_toml_str(
            r#"
[[budget.categories]]
name = "Orphan"
"#,
        )
        .unwrap();
        assert!(category.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TrackingConfig::from_toml_str("[layout\ncode = 2").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[extract]\nlookback_rows = 12\n")
            .unwrap();

        let config = TrackingConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.extract.lookback_rows, 12);
    }
}
