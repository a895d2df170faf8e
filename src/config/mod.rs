pub mod fiscal_years;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use crate::config::fiscal_years::parse_year_code;
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_file_extension, validate_path, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "budget-etl")]
    #[command(about = "Extract budget tracking data from a monthly department summary")]
    pub struct CliConfig {
        /// Tracking workbook (.xlsx / .csv), or a directory to pick the newest .xlsx from
        pub input: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, help = "TOML file overriding the sheet layout")]
        pub layout: Option<String>,

        #[arg(long, help = "Fiscal year code, e.g. FY26")]
        pub fiscal_year: Option<String>,

        #[arg(long, default_value = "fiscal_years.json")]
        pub registry: String,

        #[arg(long, help = "Bundle outputs into a single ZIP file")]
        pub bundle: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub json_logs: bool,
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn report_prefix(&self) -> String {
            match &self.fiscal_year {
                Some(code) => parse_year_code(code)
                    .map(|info| info.year.to_lowercase())
                    .unwrap_or_else(|_| "latest".to_string()),
                None => "latest".to_string(),
            }
        }

        fn bundle_outputs(&self) -> bool {
            self.bundle
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            validate_path("output_path", &self.output_path)?;

            if !Path::new(&self.input).is_dir() {
                validate_file_extension("input", &self.input, &["xlsx", "xlsm", "csv"])?;
            }
            if let Some(layout) = &self.layout {
                validate_file_extension("layout", layout, &["toml"])?;
            }
            if let Some(code) = &self.fiscal_year {
                parse_year_code(code)?;
            }
            validate_file_extension("registry", &self.registry, &["json"])?;

            Ok(())
        }
    }

}
