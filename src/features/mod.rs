//! Per-utterance acoustic features.

pub mod buffer;
pub mod extractor;
pub mod mel;

pub use buffer::{FeatureBuffer, trim_zero_padding};
pub use extractor::{FeatureExtractor, MockFeatureExtractor};
pub use mel::MelSpectrogramExtractor;
