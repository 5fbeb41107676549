//! Error handling for Escritorio
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for bookkeeping operations
#[derive(Error, Debug)]
pub enum EscritorioError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("access denied for company {0}")]
    AccessDenied(i64),
}

/// Batch-level import failures, raised before any row is persisted
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("the spreadsheet has no data rows")]
    EmptyBatch,

    #[error("could not read spreadsheet {path}: {reason}")]
    UnreadableSheet { path: String, reason: String },

    #[error("unsupported file format: {0}. Supported formats: .xlsx, .xls, .ods, .csv")]
    UnsupportedFormat(String),

    #[error("company name is required")]
    MissingName,
}

/// Result type alias for bookkeeping operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = EscritorioError::ValidationError("unknown regime 'mei'".to_string());
        assert_eq!(err.to_string(), "validation error: unknown regime 'mei'");
    }

    #[test]
    fn test_import_error_messages() {
        assert_eq!(
            ImportError::EmptyBatch.to_string(),
            "the spreadsheet has no data rows"
        );
        let err = ImportError::UnreadableSheet {
            path: "a.xlsx".to_string(),
            reason: "zip error".to_string(),
        };
        assert!(err.to_string().contains("a.xlsx"));
        assert!(ImportError::UnsupportedFormat("pdf".to_string())
            .to_string()
            .starts_with("unsupported file format: pdf"));
    }

    #[test]
    fn test_anyhow_downcast_keeps_import_error() {
        let err: anyhow::Error = ImportError::EmptyBatch.into();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::EmptyBatch)
        ));
    }

    #[test]
    fn test_access_denied_names_company() {
        let err = EscritorioError::AccessDenied(42);
        assert_eq!(err.to_string(), "access denied for company 42");
    }
}
