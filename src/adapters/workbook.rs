//! Loads workbook sheets into [`Grid`]s.
//!
//! `.xlsx` workbooks go through calamine; `.csv` exports of a tracking sheet go through
//! the csv reader. Cell positions are absolute: a sheet whose first used cell is C5
//! still yields a grid whose row 4, column 2 holds that value.

use crate::core::master_budget::BudgetSheets;
use crate::domain::model::{BudgetWorkbook, Cell, Grid, SourceSheet};
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

pub const DEFAULT_SHEET_NAMES: [&str; 1] = ["Monthly Department Summary"];

/// Sheets that mark a master budget workbook. Such a workbook is never read as a
/// tracking sheet.
pub const MASTER_BUDGET_SHEETS: [&str; 2] = ["FA_Summary", "CE_Breakdown"];

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(EtlError::MissingInput {
            path: path.display().to_string(),
        })
    }
}

pub fn read_sheet(path: &Path, sheet_names: &[String]) -> Result<SourceSheet> {
    require_file(path)?;
    let file_name = file_name_of(path);
    let extension = extension_of(path);

    match extension.as_str() {
        "csv" => {
            let grid = read_csv_grid(path)?;
            tracing::debug!("Loaded {} rows from CSV {}", grid.row_count(), file_name);
            Ok(SourceSheet {
                sheet_name: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                file_name,
                grid,
            })
        }
        "xlsx" | "xlsm" => {
            let (sheet_name, grid) = read_xlsx_grid(path, sheet_names)?;
            tracing::debug!(
                "Loaded {} rows from sheet '{}' of {}",
                grid.row_count(),
                sheet_name,
                file_name
            );
            Ok(SourceSheet {
                file_name,
                sheet_name,
                grid,
            })
        }
        other => Err(EtlError::ValidationError {
            message: format!("Unsupported input format '.{}' for {}", other, file_name),
        }),
    }
}

/// 依偏好順序挑選工作表；都不存在時退回第一個工作表，但總預算活頁簿不退回
fn pick_sheet(available: &[String], preferred: &[String]) -> Option<String> {
    if let Some(name) = preferred
        .iter()
        .find(|name| available.iter().any(|a| a == *name))
    {
        return Some(name.clone());
    }

    let is_master_budget = available
        .iter()
        .any(|a| MASTER_BUDGET_SHEETS.contains(&a.as_str()));
    if is_master_budget {
        tracing::warn!("Workbook looks like a master budget, not a tracking report");
        return None;
    }
    available.first().cloned()
}

fn read_xlsx_grid(path: &Path, sheet_names: &[String]) -> Result<(String, Grid)> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let available = workbook.sheet_names();

    let sheet_name = pick_sheet(&available, sheet_names).ok_or_else(|| EtlError::SheetNotFound {
        tried: sheet_names.join(", "),
    })?;

    if !sheet_names.iter().any(|s| s == &sheet_name) {
        tracing::warn!(
            "None of the expected sheets found; falling back to '{}'",
            sheet_name
        );
    }

    let range = workbook.worksheet_range(&sheet_name)?;
    Ok((sheet_name, grid_from_range(&range)))
}

/// Read a master budget workbook. The summary sheet is required; the breakdown and
/// course list sheets are read when present.
pub fn read_budget_workbook(path: &Path, sheets: &BudgetSheets) -> Result<BudgetWorkbook> {
    require_file(path)?;
    let file_name = file_name_of(path);

    if !matches!(extension_of(path).as_str(), "xlsx" | "xlsm") {
        return Err(EtlError::ValidationError {
            message: format!("Master budget {} must be an .xlsx workbook", file_name),
        });
    }

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let available = workbook.sheet_names();

    let summary = optional_sheet(&mut workbook, &available, &sheets.summary)?
        .ok_or_else(|| EtlError::SheetNotFound {
            tried: sheets.summary.clone(),
        })?;
    let breakdown = optional_sheet(&mut workbook, &available, &sheets.breakdown)?;
    let courses = optional_sheet(&mut workbook, &available, &sheets.courses)?;

    tracing::debug!(
        "Loaded master budget {} ({} summary rows)",
        file_name,
        summary.row_count()
    );
    Ok(BudgetWorkbook {
        file_name,
        summary,
        breakdown,
        courses,
    })
}

fn optional_sheet<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
    available: &[String],
    name: &str,
) -> Result<Option<Grid>> {
    if !available.iter().any(|a| a == name) {
        tracing::warn!("Sheet '{}' not found in master budget", name);
        return Ok(None);
    }
    let range = workbook.worksheet_range(name)?;
    Ok(Some(grid_from_range(&range)))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::from_text(s),
        other => Cell::Text(other.to_string()),
    }
}

pub fn grid_from_range(range: &Range<Data>) -> Grid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }
    Grid::new(rows)
}

fn read_csv_grid(path: &Path) -> Result<Grid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(Grid::new(rows))
}

/// Most recently modified `.xlsx` in `dir`, skipping Office lock files (`~$...`).
pub fn find_latest_workbook(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(EtlError::MissingInput {
            path: dir.display().to_string(),
        });
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        let is_lock = entry.file_name().to_string_lossy().starts_with('~');
        if is_xlsx && !is_lock {
            let modified = entry.metadata()?.modified()?;
            candidates.push((modified, path));
        }
    }

    candidates
        .into_iter()
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
        .ok_or_else(|| EtlError::MissingInput {
            path: format!("{}/*.xlsx", dir.display()),
        })
}
