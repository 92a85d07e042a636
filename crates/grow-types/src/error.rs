//! Error types for the GrowGram search backend.

use thiserror::Error;

/// Errors from loading shared domain state.
#[derive(Debug, Error)]
pub enum GrowError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GrowError::Config("missing db_path".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing db_path");

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = GrowError::from(json_err);
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
