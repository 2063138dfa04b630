use crate::error::{Result, SpeakersetError};
use ndarray::Array2;
use std::path::Path;
use std::sync::Arc;

/// Trait for per-utterance acoustic feature extraction.
///
/// This trait allows swapping implementations (real mel spectrogram vs mock).
pub trait FeatureExtractor: Send + Sync {
    /// Extract a feature matrix from one audio file.
    ///
    /// # Arguments
    /// * `path` - Audio file to read
    /// * `max_duration` - Only the first `max_duration` seconds are used, when set
    ///
    /// # Returns
    /// Matrix of shape (frequency bins x time frames)
    fn extract(&self, path: &Path, max_duration: Option<f64>) -> Result<Array2<f32>>;

    /// Number of frequency bins in every returned matrix
    fn frequency_bins(&self) -> usize;
}

/// Implement FeatureExtractor for Arc<T> to allow sharing across jobs.
impl<T: FeatureExtractor> FeatureExtractor for Arc<T> {
    fn extract(&self, path: &Path, max_duration: Option<f64>) -> Result<Array2<f32>> {
        (**self).extract(path, max_duration)
    }

    fn frequency_bins(&self) -> usize {
        (**self).frequency_bins()
    }
}

/// Mock extractor for testing.
///
/// Returns a constant matrix whose value encodes the file name length, so
/// tests can tell rows apart without decoding audio.
#[derive(Debug, Clone)]
pub struct MockFeatureExtractor {
    frequency_bins: usize,
    frames: usize,
    fail_on: Option<String>,
}

impl MockFeatureExtractor {
    /// Create a new mock extractor producing `frequency_bins x frames` matrices
    pub fn new(frequency_bins: usize, frames: usize) -> Self {
        Self {
            frequency_bins,
            frames,
            fail_on: None,
        }
    }

    /// Configure the mock to fail for any path containing `needle`
    pub fn with_failure_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Fill value the mock uses for a given path.
    pub fn fill_value(path: &Path) -> f32 {
        path.file_name()
            .map(|name| name.to_string_lossy().len() as f32)
            .unwrap_or(0.0)
    }
}

impl FeatureExtractor for MockFeatureExtractor {
    fn extract(&self, path: &Path, max_duration: Option<f64>) -> Result<Array2<f32>> {
        if let Some(needle) = &self.fail_on
            && path.to_string_lossy().contains(needle.as_str())
        {
            return Err(SpeakersetError::Extraction {
                path: path.display().to_string(),
                message: "mock extraction failure".to_string(),
            });
        }

        let frames = match max_duration {
            Some(secs) => self
                .frames
                .min((secs * crate::defaults::FRAMES_PER_SECOND).ceil() as usize),
            None => self.frames,
        };
        Ok(Array2::from_elem(
            (self.frequency_bins, frames),
            Self::fill_value(path),
        ))
    }

    fn frequency_bins(&self) -> usize {
        self.frequency_bins
    }
}
