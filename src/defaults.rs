//! Default configuration constants for speakerset.
//!
//! Shared between job descriptors, the dataset table and the mel extractor
//! so that array shapes and feature parameters stay consistent.

/// Default number of mel frequency bins per spectrogram.
pub const FREQUENCY_ELEMENTS: usize = 128;

/// Default maximum audio length, in spectrogram frames.
pub const MAX_AUDIO_LENGTH: usize = 800;

/// Default number of utterances per speaker for quota-based datasets.
pub const SENTENCES: usize = 10;

/// Rows reserved per speaker for the TIMIT corpus.
///
/// TIMIT is crawled without a per-speaker quota, so this is the upper bound
/// on rows a single speaker directory may contribute.
pub const TIMIT_ROWS_PER_SPEAKER: usize = 20;

/// Spectrogram frames per second of audio.
///
/// Frame counts are divided by this ratio to obtain the duration ceiling,
/// in seconds, handed to the feature extractor.
pub const FRAMES_PER_SECOND: f64 = 100.0;

/// Fraction of each speaker's utterances held out for the test partition.
pub const TEST_FRACTION: f64 = 0.2;

/// Default audio sample rate in Hz.
pub const SAMPLE_RATE: u32 = 16000;

/// FFT size of the short-time Fourier transform.
pub const N_FFT: usize = 1024;

/// Hop between STFT frames, in samples.
///
/// 160 samples at 16kHz is 10ms, which gives [`FRAMES_PER_SECOND`].
pub const HOP_LENGTH: usize = 160;

/// Dynamic range kept below the loudest bin when converting power to dB.
pub const TOP_DB: f32 = 80.0;

/// Floor applied to power values before taking the logarithm.
pub const POWER_FLOOR: f32 = 1e-10;

/// File extension used for persisted bundles.
pub const BUNDLE_EXTENSION: &str = "bundle";

/// File extension used for speaker list files.
pub const SPEAKER_LIST_EXTENSION: &str = "txt";

/// Convert a frame count into the duration ceiling in seconds.
pub fn frames_to_seconds(frames: usize) -> f64 {
    frames as f64 / FRAMES_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_to_seconds_divides_by_hundred() {
        assert_eq!(frames_to_seconds(800), 8.0);
        assert_eq!(frames_to_seconds(881), 8.81);
        assert_eq!(frames_to_seconds(0), 0.0);
    }

    #[test]
    fn hop_length_matches_frame_rate() {
        assert_eq!(
            SAMPLE_RATE as f64 / HOP_LENGTH as f64,
            FRAMES_PER_SECOND,
            "hop length must produce FRAMES_PER_SECOND frames at SAMPLE_RATE"
        );
    }
}
