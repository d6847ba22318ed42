//! Error types for voxarch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxarchError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Request validation
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    // Transcription errors
    #[error("Audio source not found: {path}")]
    SourceNotFound { path: String },

    #[error("Transcription engine unavailable: {message}")]
    DependencyUnavailable { message: String },

    #[error("Failed to decode audio: {message}")]
    AudioDecode { message: String },

    #[error("Processing cancelled by user")]
    Cancelled,

    // Generation errors
    #[error("Generative service error: {message}")]
    ApiError { message: String },

    #[error("API credential missing: set GEMINI_API_KEY or generation.api_key")]
    MissingCredential,

    // Persistence errors
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage '{stage}' panicked: {message}")]
    StagePanicked { stage: String, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoxarchError {
    /// True for the user-initiated stop, which is reported as `Cancelled`
    /// rather than as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VoxarchError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, VoxarchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = VoxarchError::ConfigInvalidValue {
            key: "transcription.model".to_string(),
            message: "unknown model 'huge'".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for transcription.model: unknown model 'huge'"
        );
    }

    #[test]
    fn test_source_not_found_display() {
        let error = VoxarchError::SourceNotFound {
            path: "/audio/meeting.wav".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio source not found: /audio/meeting.wav"
        );
    }

    #[test]
    fn test_dependency_unavailable_display() {
        let error = VoxarchError::DependencyUnavailable {
            message: "model ggml-small.bin missing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription engine unavailable: model ggml-small.bin missing"
        );
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(
            VoxarchError::Cancelled.to_string(),
            "Processing cancelled by user"
        );
    }

    #[test]
    fn test_api_error_display() {
        let error = VoxarchError::ApiError {
            message: "HTTP 503".to_string(),
        };
        assert_eq!(error.to_string(), "Generative service error: HTTP 503");
    }

    #[test]
    fn test_missing_credential_mentions_env_var() {
        assert!(
            VoxarchError::MissingCredential
                .to_string()
                .contains("GEMINI_API_KEY")
        );
    }

    #[test]
    fn test_write_failed_keeps_source() {
        let error = VoxarchError::WriteFailed {
            path: "/out/transcript.txt".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to write /out/transcript.txt: read-only"
        );
        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_stage_panicked_display() {
        let error = VoxarchError::StagePanicked {
            stage: "analysis".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "Stage 'analysis' panicked: boom");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(VoxarchError::Cancelled.is_cancelled());
        assert!(!VoxarchError::MissingCredential.is_cancelled());
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxarchError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxarchError>();
        assert_sync::<VoxarchError>();
    }
}
