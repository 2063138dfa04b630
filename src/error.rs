//! Error types for speakerset.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeakersetError {
    // Configuration errors
    #[error("Unsupported dataset '{name}': expected one of timit, rt09, voxceleb")]
    UnsupportedDataset { name: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    // Input errors
    #[error("Speaker list not found at {path}")]
    SpeakerListNotFound { path: String },

    #[error("Failed to traverse {path}: {message}")]
    Traversal { path: String, message: String },

    // Extraction errors
    #[error("Feature extraction failed for {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("Audio decoding failed: {message}")]
    Audio { message: String },

    #[error("Feature buffer is full: capacity is {capacity} rows")]
    CapacityExceeded { capacity: usize },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    // Persistence errors
    #[error("Bundle error: {message}")]
    Bundle { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SpeakersetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unsupported_dataset_display() {
        let error = SpeakersetError::UnsupportedDataset {
            name: "librispeech".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unsupported dataset 'librispeech': expected one of timit, rt09, voxceleb"
        );
    }

    #[test]
    fn test_speaker_list_not_found_display() {
        let error = SpeakersetError::SpeakerListNotFound {
            path: "/lists/speakers_40.txt".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Speaker list not found at /lists/speakers_40.txt"
        );
    }

    #[test]
    fn test_extraction_display() {
        let error = SpeakersetError::Extraction {
            path: "/data/FCJF0/SA1_RIFF.WAV".to_string(),
            message: "truncated header".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Feature extraction failed for /data/FCJF0/SA1_RIFF.WAV: truncated header"
        );
    }

    #[test]
    fn test_capacity_exceeded_display() {
        let error = SpeakersetError::CapacityExceeded { capacity: 800 };
        assert_eq!(
            error.to_string(),
            "Feature buffer is full: capacity is 800 rows"
        );
    }

    #[test]
    fn test_shape_mismatch_display() {
        let error = SpeakersetError::ShapeMismatch {
            expected: "10 labels".to_string(),
            actual: "9 labels".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Shape mismatch: expected 10 labels, got 9 labels"
        );
    }

    #[test]
    fn test_traversal_display() {
        let error = SpeakersetError::Traversal {
            path: "/data/TIMIT".to_string(),
            message: "permission denied".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to traverse /data/TIMIT: permission denied"
        );
    }

    #[test]
    fn test_other_display() {
        let error = SpeakersetError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: SpeakersetError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: SpeakersetError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_from_regex_error() {
        let regex_error = regex::Regex::new("_(\\d{7}\\.wav$").unwrap_err();
        let error: SpeakersetError = regex_error.into();
        assert!(error.to_string().starts_with("Invalid file pattern"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: SpeakersetError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SpeakersetError>();
        assert_sync::<SpeakersetError>();
    }

    #[test]
    fn test_error_debug_format() {
        let error = SpeakersetError::SpeakerListNotFound {
            path: "/test/path".to_string(),
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("SpeakerListNotFound"));
        assert!(debug_str.contains("/test/path"));
    }
}
