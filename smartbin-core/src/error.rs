use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmartBinError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("History error: {0}")]
    History(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

pub type Result<T> = std::result::Result<T, SmartBinError>;

/// Failure inside the advice formatting pipeline.
///
/// Never escapes [`crate::advice::format_advice`]; only the fallible
/// [`crate::advice::try_format_advice`] surfaces it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Advice text too large: {0} bytes")]
    TooLarge(usize),

    #[error("Rendering panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_smartbin_error_display() {
        let error = SmartBinError::History("db locked".to_string());
        assert_eq!(error.to_string(), "History error: db locked");
    }

    #[test]
    fn test_smartbin_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let error = SmartBinError::from(io_error);

        match error {
            SmartBinError::Io(ref err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_smartbin_error_from_json_error() {
        let json_error = serde_json::from_str::<Vec<u8>>("{not json").unwrap_err();
        let error = SmartBinError::from(json_error);
        assert!(error.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_error_chain_display() {
        let errors = [
            (
                "Invalid record: missing id",
                SmartBinError::InvalidRecord("missing id".to_string()),
            ),
            (
                "Record not found: abc",
                SmartBinError::RecordNotFound("abc".to_string()),
            ),
        ];

        for (expected, error) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_format_error_display() {
        assert_eq!(
            FormatError::TooLarge(1024).to_string(),
            "Advice text too large: 1024 bytes"
        );
        assert_eq!(
            FormatError::Panicked("boom".to_string()).to_string(),
            "Rendering panicked: boom"
        );
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmartBinError>();
        assert_send_sync::<FormatError>();
    }
}
