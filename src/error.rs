//! Error types for the idlestop service

use std::fmt;

/// Result type alias for reaper operations
pub type Result<T> = std::result::Result<T, ReaperError>;

/// Errors that can occur while talking to the compute platform or
/// evaluating instances
#[derive(Debug)]
pub enum ReaperError {
    /// Compute platform API returned an error response
    Api(String),
    /// Configuration error
    Configuration(String),
    /// HTTP transport error
    Http(String),
    /// Serialization error
    Serialization(String),
    /// Instance not found
    NotFound(String),
    /// Invalid instance state
    InvalidState(String),
}

impl fmt::Display for ReaperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaperError::Api(msg) => write!(f, "Compute API error: {}", msg),
            ReaperError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ReaperError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ReaperError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ReaperError::NotFound(msg) => write!(f, "Instance not found: {}", msg),
            ReaperError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for ReaperError {}

impl From<reqwest::Error> for ReaperError {
    fn from(err: reqwest::Error) -> Self {
        ReaperError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for ReaperError {
    fn from(err: serde_json::Error) -> Self {
        ReaperError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReaperError::Api("test error".to_string());
        assert!(err.to_string().contains("Compute API error"));
    }

    #[test]
    fn test_error_variants() {
        let errors = vec![
            ReaperError::Api("api".to_string()),
            ReaperError::Configuration("config".to_string()),
            ReaperError::Http("http".to_string()),
            ReaperError::Serialization("serde".to_string()),
            ReaperError::NotFound("instance".to_string()),
            ReaperError::InvalidState("state".to_string()),
        ];

        for err in errors {
            // Ensure Display is implemented
            let _ = format!("{}", err);
        }
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ReaperError = parse_err.into();
        assert!(matches!(err, ReaperError::Serialization(_)));
    }
}
