pub mod assembler;
pub mod cells;
pub mod classifier;
pub mod course_catalog;
pub mod etl;
pub mod extractor;
pub mod master_budget;
pub mod rules;

pub use crate::domain::model::{BudgetReport, BudgetWorkbook, LineItem, SourceSheet, TrackingReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
