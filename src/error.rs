//! Custom error types for the expense ledger
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Every variant maps to a short
//! machine-readable reason via [`LedgerError::reason`].

use thiserror::Error;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity absent, or owned by someone else
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Name collision within an owner's scope
    #[error("{entity_type} already exists: {identifier}")]
    Conflict {
        entity_type: &'static str,
        identifier: String,
    },

    /// Attempt to modify a protected record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A store call ran past its deadline
    #[error("{operation} timed out after {budget_ms}ms")]
    Timeout {
        operation: &'static str,
        budget_ms: u64,
    },

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a "not found" error for expenses
    pub fn expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for tags
    pub fn tag_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Tag",
            identifier: identifier.into(),
        }
    }

    /// A sum of stored amounts that does not fit in a `Decimal`
    pub fn total_out_of_range() -> Self {
        Self::Validation("Amount total out of range".into())
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Server-side failures that a caller may retry for reads
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Storage(_))
    }

    /// Short machine-readable reason for the error
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::Timeout { .. } => "timeout",
            Self::Import(_) => "import_error",
            Self::Export(_) => "export_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        Self::Import(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = LedgerError::category_not_found("Groceries");
        assert_eq!(err.to_string(), "Category not found: Groceries");
        assert!(err.is_not_found());
        assert_eq!(err.reason(), "not_found");
    }

    #[test]
    fn test_timeout_is_retryable_and_not_not_found() {
        let err = LedgerError::Timeout {
            operation: "find",
            budget_ms: 5000,
        };
        assert_eq!(err.to_string(), "find timed out after 5000ms");
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
        assert_eq!(err.reason(), "timeout");
    }

    #[test]
    fn test_validation_reason() {
        let err = LedgerError::Validation("Month must be between 1 and 12".into());
        assert!(err.is_validation());
        assert!(!err.is_retryable());
        assert_eq!(err.reason(), "validation_error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let ledger_err: LedgerError = io_err.into();
        assert!(matches!(ledger_err, LedgerError::Io(_)));
    }
}
