//! Error types shared across the crate.

use derive_more::{Display, Error};

/// Rejected session transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    #[display("cannot reconfigure while a session is playing")]
    Playing,
}

/// Storage error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("storage error: {} at {}:{}", message, file, line)]
pub struct StorageError {
    pub message: String,
    pub line: u32,
    pub file: &'static str,
}

impl StorageError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    #[track_caller]
    fn from(err: rusqlite::Error) -> Self {
        Self::new(format!("sqlite error: {}", err))
    }
}

impl From<serde_json::Error> for StorageError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("serialization error: {}", err))
    }
}

impl From<std::io::Error> for StorageError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("io error: {}", err))
    }
}

/// Failures of a word source. All of them end in the default word list.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GenerationError {
    #[display("missing api key in ${var}")]
    MissingApiKey { var: String },
    #[display("request failed: {reason}")]
    Request { reason: String },
    #[display("generator answered with status {status}")]
    Status { status: u16 },
    #[display("malformed response: {reason}")]
    Malformed { reason: String },
    #[display("generator returned no words")]
    Empty,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Request {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_records_caller_location() {
        let err = StorageError::new("boom");
        assert_eq!(err.file, file!());
        assert!(err.to_string().starts_with("storage error: boom at"));
    }

    #[test]
    fn test_generation_error_messages() {
        let err = GenerationError::MissingApiKey {
            var: "OPENAI_API_KEY".into(),
        };
        assert_eq!(err.to_string(), "missing api key in $OPENAI_API_KEY");
        assert_eq!(
            GenerationError::Status { status: 503 }.to_string(),
            "generator answered with status 503"
        );
    }
}
