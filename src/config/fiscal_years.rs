//! `fiscal_years.json`: the list of fiscal years the department tracks, each tied to
//! its master budget workbook and the latest monthly report processed for it.
//!
//! The file is always read and rewritten whole.

use crate::adapters::storage::write_atomic;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalYearInfo {
    pub year: String,
    pub label: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearEntry {
    pub year: String,
    pub label: String,
    pub period: String,
    pub master_budget_file: String,
    pub latest_report_file: Option<String>,
    pub latest_report_month: Option<String>,
    #[serde(default)]
    pub months_elapsed: u32,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearRegistry {
    #[serde(default)]
    pub fiscal_years: Vec<FiscalYearEntry>,
    #[serde(default)]
    pub current_fiscal_year: String,
}

/// Master budget extraction for one registered fiscal year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetJob {
    pub fiscal_year: String,
    pub budget_file: String,
    pub bundle: bool,
}

impl From<&FiscalYearEntry> for BudgetJob {
    fn from(entry: &FiscalYearEntry) -> Self {
        Self {
            fiscal_year: entry.year.clone(),
            budget_file: entry.master_budget_file.clone(),
            bundle: false,
        }
    }
}

impl ConfigProvider for BudgetJob {
    fn input_path(&self) -> &str {
        &self.budget_file
    }

    fn report_prefix(&self) -> String {
        self.fiscal_year.to_lowercase()
    }

    fn bundle_outputs(&self) -> bool {
        self.bundle
    }
}

fn not_registered(year: &str) -> EtlError {
    EtlError::ConfigValidationError {
        field: "fiscal_year".to_string(),
        message: format!("{} is not in the registry", year),
    }
}

/// 將 `FY26` 轉為完整會計年度資訊（七月一日起算）
pub fn parse_year_code(code: &str) -> Result<FiscalYearInfo> {
    let trimmed = code.trim();
    let digits = trimmed
        .get(..2)
        .filter(|prefix| prefix.eq_ignore_ascii_case("FY"))
        .map(|_| &trimmed[2..])
        .unwrap_or(trimmed);

    let year_num: u32 = digits
        .parse()
        .ok()
        .filter(|n| *n < 100)
        .ok_or_else(|| EtlError::InvalidConfigValueError {
            field: "fiscal_year".to_string(),
            value: code.to_string(),
            reason: "Expected a code like FY26".to_string(),
        })?;

    let full_year = 2000 + year_num;
    Ok(FiscalYearInfo {
        year: format!("FY{}", year_num),
        label: format!("Fiscal Year {}", full_year),
        period: format!("July 1, {} - June 30, {}", full_year - 1, full_year),
    })
}

fn year_number(year: &str) -> u32 {
    year.trim_start_matches("FY").parse().unwrap_or(0)
}

impl FiscalYearRegistry {
    /// 檔案不存在時回傳空的登錄表
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Registry {} not found, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path.as_ref(), json.as_bytes())
    }

    pub fn list(&self) -> &[FiscalYearEntry] {
        &self.fiscal_years
    }

    pub fn get(&self, code: &str) -> Option<&FiscalYearEntry> {
        let year = parse_year_code(code).ok()?.year;
        self.fiscal_years.iter().find(|fy| fy.year == year)
    }

    /// Like [`get`](Self::get), but an invalid or unregistered code is an error.
    pub fn require(&self, code: &str) -> Result<&FiscalYearEntry> {
        let info = parse_year_code(code)?;
        self.get(&info.year).ok_or_else(|| not_registered(&info.year))
    }

    /// `all` 取得所有年度，否則只取得指定年度
    pub fn budget_jobs(&self, target: &str) -> Result<Vec<BudgetJob>> {
        if target.trim().eq_ignore_ascii_case("all") {
            return Ok(self.fiscal_years.iter().map(BudgetJob::from).collect());
        }
        Ok(vec![BudgetJob::from(self.require(target)?)])
    }

    pub fn is_current(&self, entry: &FiscalYearEntry) -> bool {
        entry.year == self.current_fiscal_year
    }

    pub fn add(&mut self, code: &str, budget_file: &str) -> Result<&FiscalYearEntry> {
        self.add_with_date(code, budget_file, Local::now().date_naive())
    }

    /// Insert or replace a fiscal year. A replaced entry keeps its original `added` date.
    pub fn add_with_date(
        &mut self,
        code: &str,
        budget_file: &str,
        today: NaiveDate,
    ) -> Result<&FiscalYearEntry> {
        if !Path::new(budget_file).is_file() {
            return Err(EtlError::MissingInput {
                path: budget_file.to_string(),
            });
        }

        let info = parse_year_code(code)?;
        let today = today.format(DATE_FORMAT).to_string();

        let mut entry = FiscalYearEntry {
            year: info.year.clone(),
            label: info.label,
            period: info.period,
            master_budget_file: budget_file.to_string(),
            latest_report_file: None,
            latest_report_month: None,
            months_elapsed: 0,
            status: "active".to_string(),
            added: Some(today.clone()),
            updated: None,
        };

        match self.fiscal_years.iter().position(|fy| fy.year == info.year) {
            Some(idx) => {
                tracing::warn!("{} already exists. Updating...", info.year);
                let existing = &mut self.fiscal_years[idx];
                entry.added = existing.added.take().or(entry.added);
                entry.updated = Some(today);
                *existing = entry;
            }
            None => self.fiscal_years.push(entry),
        }

        self.fiscal_years
            .sort_by(|a, b| year_number(&b.year).cmp(&year_number(&a.year)));

        if self.current_fiscal_year.is_empty() {
            self.current_fiscal_year = info.year.clone();
        }

        self.fiscal_years
            .iter()
            .find(|fy| fy.year == info.year)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("{} missing after insert", info.year),
            })
    }

    pub fn set_current(&mut self, code: &str) -> Result<()> {
        self.current_fiscal_year = self.require(code)?.year.clone();
        Ok(())
    }

    /// 記錄最新月報；期間與上次不同時累加已過月份
    pub fn record_report(&mut self, code: &str, report_file: &str, period: &str) -> Result<()> {
        let info = parse_year_code(code)?;
        let entry = self
            .fiscal_years
            .iter_mut()
            .find(|fy| fy.year == info.year)
            .ok_or_else(|| not_registered(&info.year))?;

        if entry.latest_report_month.as_deref() != Some(period) {
            entry.months_elapsed += 1;
        }
        entry.latest_report_file = Some(report_file.to_string());
        entry.latest_report_month = Some(period.to_string());
        Ok(())
    }
}
