//! Error types for the installer compiler.

use thiserror::Error;

/// Main error type for introspection and compilation.
#[derive(Error, Debug)]
pub enum PressError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The schema source could not be reached or refused authentication
    #[error("Connectivity error: {message}\n  Context: {context}")]
    Connectivity { message: String, context: String },

    /// A catalog query failed for a specific schema object
    #[error("Introspection failed for {object}: {message}")]
    Introspection { object: String, message: String },

    /// A catalog query exceeded the configured timeout
    #[error("Timed out after {seconds}s while {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// The manifest is missing something compilation needs
    #[error("Manifest validation failed: {0}")]
    ManifestValidation(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Introspection was cancelled (SIGINT, caller request, etc.)
    #[error("Operation cancelled")]
    Cancelled,
}

impl PressError {
    /// Create a Connectivity error with context about where it occurred
    pub fn connectivity(message: impl ToString, context: impl Into<String>) -> Self {
        PressError::Connectivity {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create an Introspection error for a schema object
    pub fn introspection(object: impl Into<String>, message: impl ToString) -> Self {
        PressError::Introspection {
            object: object.into(),
            message: message.to_string(),
        }
    }

    /// Create a ManifestValidation error
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        PressError::ManifestValidation(message.into())
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            PressError::Config(_) | PressError::Yaml(_) => 1,
            PressError::Connectivity { .. } => 2,
            PressError::Introspection { .. } => 3,
            PressError::ManifestValidation(_) | PressError::Json(_) => 4,
            PressError::Timeout { .. } => 5,
            PressError::Cancelled => 6,
            PressError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, PressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_category() {
        let errors = [
            PressError::Config("x".into()),
            PressError::connectivity("refused", "connecting"),
            PressError::introspection("wp_orders", "boom"),
            PressError::invalid_manifest("no class"),
            PressError::Timeout {
                operation: "listing tables".into(),
                seconds: 30,
            },
            PressError::Cancelled,
            PressError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
        ];
        let codes: Vec<u8> = errors.iter().map(PressError::exit_code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = PressError::connectivity("access denied", "opening pool");
        let text = err.format_detailed();
        assert!(text.starts_with("Error: Connectivity error: access denied"));
        assert!(text.contains("Context: opening pool"));
    }
}
