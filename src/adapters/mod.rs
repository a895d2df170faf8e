// Adapters layer: readers for the spreadsheet formats the department exports, and
// the local output storage.

pub mod storage;
pub mod workbook;
