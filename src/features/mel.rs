//! Log-power mel spectrogram extraction from WAV files.

use crate::config::FeatureConfig;
use crate::defaults;
use crate::error::{Result, SpeakersetError};
use crate::features::extractor::FeatureExtractor;
use hound::{SampleFormat, WavReader};
use ndarray::Array2;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

/// Mel spectrogram extractor backed by an STFT over the decoded WAV samples.
pub struct MelSpectrogramExtractor {
    config: FeatureConfig,
    n_mels: usize,
    window: Vec<f32>,
    filterbank: Array2<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl MelSpectrogramExtractor {
    pub fn new(config: &FeatureConfig, n_mels: usize) -> Result<Self> {
        if n_mels == 0 {
            return Err(SpeakersetError::ConfigParse {
                message: "number of mel bins must be positive".to_string(),
            });
        }
        config.validate()?;
        let f_max = config.f_max.unwrap_or(config.sample_rate as f32 / 2.0);
        let filterbank = mel_filterbank(
            n_mels,
            config.n_fft,
            config.sample_rate,
            config.f_min,
            f_max,
        );
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.n_fft);

        Ok(Self {
            config: config.clone(),
            n_mels,
            window: hann_window(config.n_fft),
            filterbank,
            fft,
        })
    }

    /// Decode a WAV file to mono f32 samples, keeping at most `max_duration` seconds.
    pub fn load_audio(&self, path: &Path, max_duration: Option<f64>) -> Result<Vec<f32>> {
        let mut reader = WavReader::open(path).map_err(|e| SpeakersetError::Audio {
            message: format!("Failed to open WAV file: {e}"),
        })?;
        let spec = reader.spec();

        if spec.sample_rate != self.config.sample_rate {
            return Err(SpeakersetError::Audio {
                message: format!(
                    "Audio sample rate {} doesn't match expected {}",
                    spec.sample_rate, self.config.sample_rate
                ),
            });
        }

        let channels = spec.channels.max(1) as usize;
        let limit = max_duration
            .map(|secs| (secs * spec.sample_rate as f64).round() as usize * channels)
            .unwrap_or(usize::MAX);

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .take(limit)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SpeakersetError::Audio {
                    message: format!("Failed to read float samples: {e}"),
                })?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .take(limit)
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| SpeakersetError::Audio {
                        message: format!("Failed to read int samples: {e}"),
                    })?
            }
        };

        if channels == 1 {
            return Ok(interleaved);
        }
        Ok(interleaved
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect())
    }

    /// Compute the log-power mel spectrogram (n_mels x frames) of mono samples.
    pub fn spectrogram(&self, audio: &[f32]) -> Result<Array2<f32>> {
        if audio.is_empty() {
            return Err(SpeakersetError::Audio {
                message: "Empty audio data".to_string(),
            });
        }
        let power = self.power_spectrum(audio);
        let mel = self.filterbank.dot(&power);
        Ok(power_to_db(mel, self.config.top_db))
    }

    /// Centered STFT power spectrum, shape (n_fft / 2 + 1) x frames.
    fn power_spectrum(&self, audio: &[f32]) -> Array2<f32> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;

        // Zero padding of n_fft / 2 on both sides centres frame t at sample t * hop
        let pad = n_fft / 2;
        let mut padded = vec![0.0f32; pad];
        padded.extend_from_slice(audio);
        padded.extend(std::iter::repeat_n(0.0, pad));

        let num_frames = padded.len().saturating_sub(n_fft) / hop + 1;
        let freq_bins = n_fft / 2 + 1;
        let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));
        let mut frame = vec![Complex::new(0.0f32, 0.0); n_fft];

        for t in 0..num_frames {
            let start = t * hop;
            for (i, slot) in frame.iter_mut().enumerate() {
                let sample = padded.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }
            self.fft.process(&mut frame);
            for k in 0..freq_bins {
                spectrogram[[k, t]] = frame[k].norm_sqr();
            }
        }

        spectrogram
    }
}

impl FeatureExtractor for MelSpectrogramExtractor {
    fn extract(&self, path: &Path, max_duration: Option<f64>) -> Result<Array2<f32>> {
        let wrap = |e: SpeakersetError| SpeakersetError::Extraction {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let audio = self.load_audio(path, max_duration).map_err(wrap)?;
        self.spectrogram(&audio).map_err(wrap)
    }

    fn frequency_bins(&self) -> usize {
        self.n_mels
    }
}

/// Periodic Hann window of the given length.
fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / length as f32).cos())
        .collect()
}

// Slaney mel scale: linear below 1kHz, logarithmic above
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;

fn hz_to_mel(hz: f64) -> f64 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank with Slaney area normalization, shape n_mels x (n_fft / 2 + 1).
fn mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: u32, f_min: f32, f_max: f32) -> Array2<f32> {
    let freq_bins = n_fft / 2 + 1;
    let mut filterbank = Array2::<f32>::zeros((n_mels, freq_bins));

    let fft_freqs: Vec<f64> = (0..freq_bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let mel_min = hz_to_mel(f_min as f64);
    let mel_max = hz_to_mel(f_max as f64);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();
    let fdiff: Vec<f64> = mel_points.windows(2).map(|w| w[1] - w[0]).collect();

    for m in 0..n_mels {
        let enorm = 2.0 / (mel_points[m + 2] - mel_points[m]);
        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - mel_points[m]) / fdiff[m];
            let upper = (mel_points[m + 2] - freq) / fdiff[m + 1];
            filterbank[[m, k]] = (0.0f64.max(lower.min(upper)) * enorm) as f32;
        }
    }

    filterbank
}

/// Convert power values to decibels, clipped to `top_db` below the peak.
fn power_to_db(mut power: Array2<f32>, top_db: f32) -> Array2<f32> {
    power.mapv_inplace(|p| 10.0 * p.max(defaults::POWER_FLOOR).log10());
    let peak = power.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - top_db;
    power.mapv_inplace(|db| db.max(floor));
    power
}
