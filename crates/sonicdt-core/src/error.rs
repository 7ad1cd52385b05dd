//! Error types for sonicdt

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sonicdt
///
/// `Clone` because a failed model load is cached and handed back to every
/// later caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SonicError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured local artifact does not exist
    #[error("Model file '{}' not found", .0.display())]
    ArtifactNotFound(PathBuf),

    /// The resolved artifact is absent or zero-length
    #[error("Model file '{}' is missing or empty", .0.display())]
    ArtifactCorruptOrMissing(PathBuf),

    /// Fetch, read or every decode attempt failed
    #[error("Error loading model: {cause}")]
    LoadFailed { cause: String },

    /// Prediction requested before a successful load
    #[error("Model is not loaded")]
    ModelNotLoaded,

    /// The model's own inference call failed
    #[error("Error making prediction: {message}")]
    Prediction { message: String },

    /// Rejected user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SonicError {
    pub fn load_failed(cause: impl Into<String>) -> Self {
        SonicError::LoadFailed {
            cause: cause.into(),
        }
    }

    pub fn prediction(message: impl Into<String>) -> Self {
        SonicError::Prediction {
            message: message.into(),
        }
    }

    /// Whether this error halts the workflow (no further predictions)
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            SonicError::ArtifactNotFound(_)
                | SonicError::ArtifactCorruptOrMissing(_)
                | SonicError::LoadFailed { .. }
        )
    }
}

/// Result type for sonicdt operations
pub type SonicResult<T> = Result<T, SonicError>;

impl From<toml::de::Error> for SonicError {
    fn from(err: toml::de::Error) -> Self {
        SonicError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SonicError::ArtifactNotFound(PathBuf::from("model.bin"));
        assert_eq!(err.to_string(), "Model file 'model.bin' not found");

        let err = SonicError::prediction("column mismatch");
        assert_eq!(err.to_string(), "Error making prediction: column mismatch");
    }

    #[test]
    fn test_load_error_classification() {
        assert!(SonicError::ArtifactNotFound(PathBuf::from("a")).is_load_error());
        assert!(SonicError::ArtifactCorruptOrMissing(PathBuf::from("a")).is_load_error());
        assert!(SonicError::load_failed("boom").is_load_error());
        assert!(!SonicError::prediction("boom").is_load_error());
        assert!(!SonicError::ModelNotLoaded.is_load_error());
    }

    #[test]
    fn test_error_from_toml() {
        let err: SonicError = toml::from_str::<toml::Value>("not = [valid")
            .unwrap_err()
            .into();
        assert!(matches!(err, SonicError::Config(_)));
    }
}
