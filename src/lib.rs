//! speakerset - Mel-spectrogram datasets for speaker clustering
//!
//! Crawls speech corpora, extracts one mel spectrogram per utterance and
//! persists fixed-shape feature bundles with speaker labels.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod bundle;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod crawler;
pub mod dataset;
pub mod defaults;
pub mod error;
pub mod features;
pub mod job;
pub mod progress;
pub mod split;

// Capability traits (extract → split → observe)
pub use features::FeatureExtractor;
pub use progress::ExtractionObserver;
pub use split::Splitter;

// Extraction
pub use bundle::Bundle;
pub use crawler::{Crawler, SpeakerFiles};
pub use dataset::{Dataset, DatasetProfile};
pub use job::{JobContext, SpeakerJob};

// Error handling
pub use error::{Result, SpeakersetError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            let hash_part = ver.split('+').nth(1).unwrap_or("");
            assert_eq!(hash_part.len(), 7, "Git hash should be 7 chars, got: {}", ver);
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
