//! Best-effort typed reads over a [`Grid`]. None of these functions fail: missing,
//! out-of-bounds, and non-numeric cells collapse to defaults.

use crate::domain::model::{Cell, Grid};
use rust_decimal::prelude::*;

/// 數值讀取，無法解析時回傳 `None`
pub fn read_number(grid: &Grid, row: usize, col: usize) -> Option<f64> {
    match grid.cell(row, col)? {
        Cell::Number(v) if v.is_finite() => Some(*v),
        Cell::Text(s) => parse_amount(s),
        _ => None,
    }
}

pub fn read_float(grid: &Grid, row: usize, col: usize, default: f64) -> f64 {
    read_number(grid, row, col).unwrap_or(default)
}

/// 金額欄位，四捨五入到分
pub fn read_amount(grid: &Grid, row: usize, col: usize) -> Decimal {
    to_amount(read_float(grid, row, col, 0.0))
}

pub fn to_amount(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp(2)
        .normalize()
}

pub fn read_string(grid: &Grid, row: usize, col: usize) -> String {
    match grid.cell(row, col) {
        Some(Cell::Number(v)) => format_number(*v),
        Some(Cell::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("nan") {
                String::new()
            } else {
                trimmed.to_string()
            }
        }
        Some(Cell::Empty) | None => String::new(),
    }
}

/// `"506.0"` -> `"506"`
pub fn normalize_code(code: &str) -> String {
    let trimmed = code.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

/// 整數值保留一位小數 (`506.0`)，與來源試算表匯出的代碼格式一致
fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return String::new();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// Keeps only digits, `.` and `-` before parsing (`"USD 1,200"` -> 1200). Accounting
/// negatives such as `(250.00)` are also accepted.
fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -value.abs() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(vec![
            vec![
                Cell::Text("February 2026".to_string()),
                Cell::Number(506.0),
                Cell::Text("nan".to_string()),
                Cell::Text("TBD".to_string()),
            ],
            vec![
                Cell::Text("$1,250.50".to_string()),
                Cell::Text("(300)".to_string()),
                Cell::Empty,
                Cell::Number(12.75),
            ],
        ])
    }

    #[test]
    fn test_read_float_defaults() {
        let g = grid();
        assert_eq!(read_float(&g, 0, 1, 0.0), 506.0);
        assert_eq!(read_float(&g, 0, 3, 0.0), 0.0);
        assert_eq!(read_float(&g, 0, 2, -1.0), -1.0);
        assert_eq!(read_float(&g, 1, 2, 7.0), 7.0);
        // out of bounds, both ragged column and missing row
        assert_eq!(read_float(&g, 0, 9, 3.0), 3.0);
        assert_eq!(read_float(&g, 42, 0, 3.0), 3.0);
    }

    #[test]
    fn test_read_float_parses_formatted_text() {
        let g = grid();
        assert_eq!(read_float(&g, 1, 0, 0.0), 1250.5);
        assert_eq!(read_float(&g, 1, 1, 0.0), -300.0);
        assert_eq!(read_float(&g, 1, 3, 0.0), 12.75);
    }

    #[test]
    fn test_read_float_strips_non_numeric_text() {
        let g = Grid::from_text_rows(vec![vec!["USD 1,200", "1200 est.", "-45.5 cr", "n/a"]]);
        assert_eq!(read_float(&g, 0, 0, 0.0), 1200.0);
        assert_eq!(read_float(&g, 0, 1, 0.0), 1200.0);
        assert_eq!(read_float(&g, 0, 2, 0.0), -45.5);
        assert_eq!(read_float(&g, 0, 3, 9.0), 9.0);
    }

    #[test]
    fn test_read_amount_rounds_to_cents() {
        let g = Grid::from_text_rows(vec![vec!["1234.567", "$10,000", ""]]);
        assert_eq!(read_amount(&g, 0, 0), Decimal::new(123457, 2));
        assert_eq!(read_amount(&g, 0, 1), Decimal::from(10000));
        assert_eq!(read_amount(&g, 0, 2), Decimal::ZERO);
    }

    #[test]
    fn test_read_string() {
        let g = grid();
        assert_eq!(read_string(&g, 0, 0), "February 2026");
        assert_eq!(read_string(&g, 0, 1), "506.0");
        assert_eq!(read_string(&g, 0, 2), "");
        assert_eq!(read_string(&g, 1, 2), "");
        assert_eq!(read_string(&g, 1, 3), "12.75");
        assert_eq!(read_string(&g, 5, 5), "");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("506.0"), "506");
        assert_eq!(normalize_code(" 4118 "), "4118");
        assert_eq!(normalize_code("0.0"), "0");
        assert_eq!(normalize_code("12.05"), "12.05");
    }

    #[test]
    fn test_nan_text_is_not_a_number() {
        let g = Grid::from_text_rows(vec![vec!["nan", "inf", "NaN"]]);
        assert_eq!(read_number(&g, 0, 0), None);
        assert_eq!(read_number(&g, 0, 1), None);
        assert_eq!(read_string(&g, 0, 2), "");
    }
}
