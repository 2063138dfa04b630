use crate::dataset::Dataset;
use crate::defaults;
use crate::error::{Result, SpeakersetError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub features: FeatureConfig,
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Root holding one sub-directory per corpus (TIMIT, RT09, VoxCelebV1)
    pub training_dir: PathBuf,
    /// Directory of speaker list files, one `<name>.txt` per list
    pub speaker_list_dir: PathBuf,
    /// Directory receiving persisted bundles
    pub output_dir: PathBuf,
}

/// Mel spectrogram parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub f_min: f32,
    /// Upper mel band edge; Nyquist when unset
    pub f_max: Option<f32>,
    pub top_db: f32,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            training_dir: PathBuf::from("data/training"),
            speaker_list_dir: PathBuf::from("data/speaker_lists"),
            output_dir: PathBuf::from("data/speaker_pickles"),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            n_fft: defaults::N_FFT,
            hop_length: defaults::HOP_LENGTH,
            f_min: 0.0,
            f_max: None,
            top_db: defaults::TOP_DB,
        }
    }
}

impl FeatureConfig {
    /// Reject STFT parameters the mel extractor cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SpeakersetError::ConfigParse {
                message: "features.sample_rate must be positive".to_string(),
            });
        }
        if self.n_fft < 2 || self.hop_length == 0 {
            return Err(SpeakersetError::ConfigParse {
                message: "features.n_fft must be at least 2 and features.hop_length positive"
                    .to_string(),
            });
        }
        if let Some(f_max) = self.f_max
            && f_max <= self.f_min
        {
            return Err(SpeakersetError::ConfigParse {
                message: format!("features.f_max ({f_max}) must exceed f_min ({})", self.f_min),
            });
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only falls back to defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(SpeakersetError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SPEAKERSET_TRAINING_DIR → paths.training_dir
    /// - SPEAKERSET_LIST_DIR → paths.speaker_list_dir
    /// - SPEAKERSET_OUTPUT_DIR → paths.output_dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("SPEAKERSET_TRAINING_DIR")
            && !dir.is_empty()
        {
            self.paths.training_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SPEAKERSET_LIST_DIR")
            && !dir.is_empty()
        {
            self.paths.speaker_list_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SPEAKERSET_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.paths.output_dir = PathBuf::from(dir);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/speakerset/config.toml on Linux, or a relative
    /// `speakerset.toml` when no config directory can be determined.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("speakerset").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("speakerset.toml"))
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SpeakersetError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Reject values the mel extractor cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.features.validate()
    }

    /// Directory crawled for the given corpus.
    pub fn dataset_dir(&self, dataset: Dataset) -> PathBuf {
        self.paths.training_dir.join(dataset.profile().folder)
    }

    /// Path of the speaker list file with the given name.
    pub fn speaker_list_path(&self, name: &str) -> PathBuf {
        self.paths
            .speaker_list_dir
            .join(format!("{name}.{}", defaults::SPEAKER_LIST_EXTENSION))
    }

    /// Path of the persisted bundle with the given output name.
    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.paths
            .output_dir
            .join(format!("{name}.{}", defaults::BUNDLE_EXTENSION))
    }
}
