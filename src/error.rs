//! Centralized error handling for paystat.
//!
//! Every pipeline stage reports failure as a [`PaystatError`] value rather than
//! printing or panicking, so the caller (CLI or any other shell) decides how to
//! present it:
//!
//! ```
//! use paystat::error::PaystatError;
//!
//! fn describe(err: &PaystatError) -> String {
//!     match err {
//!         PaystatError::Schema { missing_columns } => {
//!             format!("missing: {}", missing_columns.join(", "))
//!         }
//!         PaystatError::EmptyResult => "nothing fetched".to_owned(),
//!         other => other.to_string(),
//!     }
//! }
//! ```

use std::fmt;

/// Main error type for paystat operations.
#[derive(Debug)]
pub enum PaystatError {
    /// Network failure; no page was obtained.
    Transport(String),

    /// The remote source answered with a non-success status.
    Remote { status: u16, body: String },

    /// The remote answered successfully but the body could not be decoded.
    InvalidResponse(String),

    /// Required columns are absent. Fetching or cleaning aborts wholesale.
    Schema { missing_columns: Vec<String> },

    /// A full fetch produced zero rows.
    EmptyResult,

    /// A statistic was requested over a column with no usable values.
    EmptyColumn { column: String },

    /// A malformed user-supplied parameter (bin width, count bound, ...).
    InvalidParameter { name: String, reason: String },

    /// Data processing errors raised by polars
    DataProcessing(String),

    /// I/O errors (export file creation)
    Io(std::io::Error),

    /// Writing an export file failed.
    Export(String),

    /// Configuration errors
    Config(String),
}

impl PaystatError {
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Schema {
            missing_columns: missing.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn empty_column(column: impl Into<String>) -> Self {
        Self::EmptyColumn {
            column: column.into(),
        }
    }
}

impl fmt::Display for PaystatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Request failed: {msg}"),
            Self::Remote { status, body } => {
                write!(f, "Remote source returned status {status}. Response: {body}")
            }
            Self::InvalidResponse(msg) => write!(f, "Invalid response from remote source: {msg}"),
            Self::Schema { missing_columns } => write!(
                f,
                "The following columns are missing: {}",
                missing_columns.join(", ")
            ),
            Self::EmptyResult => write!(f, "No data was loaded from the remote source"),
            Self::EmptyColumn { column } => {
                write!(f, "No valid numeric data in column '{column}'")
            }
            Self::InvalidParameter { name, reason } => {
                write!(f, "Invalid value for {name}: {reason}")
            }
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Export(msg) => write!(f, "Export error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for PaystatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PaystatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<polars::error::PolarsError> for PaystatError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<serde_json::Error> for PaystatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<reqwest::Error> for PaystatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<csv::Error> for PaystatError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for PaystatError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for paystat operations.
pub type Result<T> = std::result::Result<T, PaystatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_columns() {
        let err = PaystatError::schema(["a", "b"]);
        assert_eq!(err.to_string(), "The following columns are missing: a, b");
    }

    #[test]
    fn test_remote_error_keeps_body_verbatim() {
        let err = PaystatError::Remote {
            status: 503,
            body: "{\"message\":\"busy\"}".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Remote source returned status 503. Response: {\"message\":\"busy\"}"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = PaystatError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "results.csv",
        ));
        assert!(err.to_string().starts_with("I/O error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_polars_error_is_data_processing() {
        let err = PaystatError::from(polars::error::PolarsError::ColumnNotFound(
            "amount".into(),
        ));
        assert!(matches!(err, PaystatError::DataProcessing(_)));
        assert!(err.to_string().contains("amount"));
    }
}
