//! Error types for the climate toolkit.

use thiserror::Error;

/// Result type alias using ClimateError.
pub type Result<T> = std::result::Result<T, ClimateError>;

/// Primary error type for climatology operations.
///
/// Validation, prerequisite and not-loaded errors are always raised before
/// any computation or output side effect begins.
#[derive(Debug, Error)]
pub enum ClimateError {
    // === Caller Errors ===
    /// Missing input files or missing persisted artifact.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected variable, coordinate or attribute absent from loaded data.
    #[error("schema error: {0}")]
    Schema(String),

    /// Operation invoked before a data source was loaded.
    #[error("data not loaded: {0}")]
    NotLoaded(String),

    /// Out-of-range year bounds, inverted ranges or invalid coordinates.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A dependent stage was requested before its inputs were computed.
    #[error("missing prerequisite '{missing}': {hint}")]
    Prerequisite { missing: String, hint: String },

    // === Infrastructure Errors ===
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote fetch failed: {0}")]
    Remote(String),
}

impl ClimateError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn not_loaded(msg: impl Into<String>) -> Self {
        Self::NotLoaded(msg.into())
    }

    /// Create a Validation error for the named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a Prerequisite error naming the stage that must run first.
    pub fn prerequisite(missing: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Prerequisite {
            missing: missing.into(),
            hint: hint.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Short machine-friendly code for the error category.
    pub fn code(&self) -> &'static str {
        match self {
            ClimateError::NotFound(_) => "NotFoundError",
            ClimateError::Schema(_) => "SchemaError",
            ClimateError::NotLoaded(_) => "NotLoadedError",
            ClimateError::Validation { .. } => "ValidationError",
            ClimateError::Prerequisite { .. } => "PrerequisiteError",
            ClimateError::Storage(_) => "StorageError",
            ClimateError::Io(_) => "IoError",
            ClimateError::Config(_) => "ConfigError",
            ClimateError::Remote(_) => "RemoteError",
        }
    }
}

impl From<std::io::Error> for ClimateError {
    fn from(err: std::io::Error) -> Self {
        ClimateError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClimateError {
    fn from(err: serde_json::Error) -> Self {
        ClimateError::Storage(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = ClimateError::validation("latitude", "100 is outside [-90, 90]");
        assert_eq!(
            err.to_string(),
            "invalid latitude: 100 is outside [-90, 90]"
        );
        assert_eq!(err.code(), "ValidationError");
    }

    #[test]
    fn test_prerequisite_message_names_stage() {
        let err = ClimateError::prerequisite("baseline", "call baseline() first");
        assert!(err.to_string().contains("'baseline'"));
        assert_eq!(err.code(), "PrerequisiteError");
    }

    #[test]
    fn test_io_error_is_infrastructure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ClimateError = io.into();
        assert_eq!(err.code(), "IoError");
    }
}
