pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::storage::LocalStorage;
pub use crate::app::pipelines::{BudgetPipeline, TrackingPipeline};
pub use crate::config::fiscal_years::{BudgetJob, FiscalYearRegistry};
pub use crate::config::toml_config::TrackingConfig;
pub use crate::core::etl::{EtlEngine, EtlRun};
pub use crate::domain::model::{BudgetReport, Fund, FundGroup, LineItem, TrackingReport};
pub use crate::utils::error::{EtlError, Result};
