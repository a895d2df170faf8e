use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::XlsxError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Input file not found: {path}")]
    MissingInput { path: String },

    #[error("No usable sheet in workbook (tried: {tried})")]
    SheetNotFound { tried: String },

    #[error("Column '{label}' not found in sheet '{sheet}'")]
    ColumnNotFound { label: String, sheet: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Processing,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 依錯誤嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 資料問題
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::MissingInput { .. }
            | EtlError::SheetNotFound { .. }
            | EtlError::ColumnNotFound { .. }
            | EtlError::WorkbookError(_)
            | EtlError::CsvError(_) => ErrorCategory::Input,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ProcessingError { .. } | EtlError::ValidationError { .. } => {
                ErrorCategory::Processing
            }
            EtlError::ZipError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                ErrorCategory::Output
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ValidationError { .. } => ErrorSeverity::Medium,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the workbook exists and still has the expected sheets and columns"
            }
            ErrorCategory::Configuration => {
                "Review the layout TOML and fiscal_years.json for typos or missing fields"
            }
            ErrorCategory::Processing => {
                "The sheet layout may have changed; compare it with the configured columns"
            }
            ErrorCategory::Output => "Check that the output directory is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingInput { path } => format!("找不到輸入檔案: {}", path),
            EtlError::SheetNotFound { tried } => {
                format!("活頁簿中沒有可用的工作表 (嘗試過: {})", tried)
            }
            EtlError::ColumnNotFound { label, sheet } => {
                format!("工作表 {} 中找不到 {} 欄", sheet, label)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_input_error() {
        let err = EtlError::MissingInput {
            path: "tracking/feb.xlsx".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("tracking/feb.xlsx"));
    }

    #[test]
    fn test_missing_fiscal_year_column_is_input_error() {
        let err = EtlError::ColumnNotFound {
            label: "FY27".to_string(),
            sheet: "FA_Summary".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.user_friendly_message().contains("FY27"));
    }

    #[test]
    fn test_io_error_is_critical() {
        let err: EtlError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.category(), ErrorCategory::Output);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().exit_code(), 3);
    }
}
