//! Supported corpora and their extraction parameters.
//!
//! Each corpus is a closed [`Dataset`] variant whose behaviour is described by
//! a static [`DatasetProfile`]: where its recordings live, which file names
//! count as utterances and how the upper-bound array shape is derived.

use crate::defaults;
use crate::error::{Result, SpeakersetError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A corpus supported by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// TIMIT, a fixed-sentence read-speech corpus
    #[default]
    Timit,
    /// RT-09, a short meeting diarization corpus
    Rt09,
    /// VoxCeleb 1, a large-scale in-the-wild corpus
    VoxCeleb,
}

/// How the row count of the feature array is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowBound {
    /// A fixed number of rows per speaker, regardless of the job's sentence count
    PerSpeaker(usize),
    /// The job's sentence count per speaker
    Sentences,
}

/// Static extraction parameters of one corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetProfile {
    pub dataset: Dataset,
    /// Identifier used in configuration and on the command line
    pub name: &'static str,
    /// Directory below the training root holding the corpus
    pub folder: &'static str,
    /// Regular expression a file name must contain to be an utterance
    pub file_pattern: &'static str,
    pub rows: RowBound,
    /// Whether at most `sentences` files are taken per speaker
    pub applies_quota: bool,
    /// Whether audio is cut at the job's maximum length before extraction
    pub applies_duration_ceiling: bool,
    /// Extra time frames reserved beyond the job's maximum length
    pub extra_time_frames: usize,
}

static TIMIT: DatasetProfile = DatasetProfile {
    dataset: Dataset::Timit,
    name: "timit",
    folder: "TIMIT",
    file_pattern: r"_RIFF\.WAV$",
    rows: RowBound::PerSpeaker(defaults::TIMIT_ROWS_PER_SPEAKER),
    applies_quota: false,
    applies_duration_ceiling: false,
    extra_time_frames: 0,
};

static RT09: DatasetProfile = DatasetProfile {
    dataset: Dataset::Rt09,
    name: "rt09",
    folder: "RT09",
    file_pattern: r"_RIFF\.WAV$",
    rows: RowBound::Sentences,
    applies_quota: true,
    applies_duration_ceiling: true,
    extra_time_frames: 0,
};

static VOXCELEB: DatasetProfile = DatasetProfile {
    dataset: Dataset::VoxCeleb,
    name: "voxceleb",
    folder: "VoxCelebV1",
    file_pattern: r"_\d{7}\.wav$",
    rows: RowBound::Sentences,
    applies_quota: true,
    applies_duration_ceiling: true,
    // Mel frames at the duration ceiling round up to one past the limit
    extra_time_frames: 1,
};

/// All supported corpora, in declaration order.
pub static PROFILES: [&DatasetProfile; 3] = [&TIMIT, &RT09, &VOXCELEB];

impl Dataset {
    /// Static parameters of this corpus.
    pub fn profile(self) -> &'static DatasetProfile {
        match self {
            Dataset::Timit => &TIMIT,
            Dataset::Rt09 => &RT09,
            Dataset::VoxCeleb => &VOXCELEB,
        }
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = SpeakersetError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PROFILES
            .iter()
            .find(|p| p.name == wanted)
            .map(|p| p.dataset)
            .ok_or_else(|| SpeakersetError::UnsupportedDataset {
                name: s.to_string(),
            })
    }
}

impl DatasetProfile {
    /// Upper bound on the number of utterance rows a job can produce.
    pub fn row_capacity(&self, max_speakers: usize, sentences: usize) -> usize {
        match self.rows {
            RowBound::PerSpeaker(rows) => max_speakers * rows,
            RowBound::Sentences => max_speakers * sentences,
        }
    }

    /// Size of the time axis of the feature array.
    pub fn time_frames(&self, max_audio_length: usize) -> usize {
        max_audio_length + self.extra_time_frames
    }

    /// Per-speaker file quota, when this corpus applies one.
    pub fn quota(&self, sentences: usize) -> Option<usize> {
        self.applies_quota.then_some(sentences)
    }

    /// Duration ceiling in seconds handed to the feature extractor.
    pub fn duration_ceiling(&self, max_audio_length: usize) -> Option<f64> {
        self.applies_duration_ceiling
            .then(|| defaults::frames_to_seconds(max_audio_length))
    }

    /// Compile the utterance file name pattern.
    pub fn compile_pattern(&self) -> Result<Regex> {
        Ok(Regex::new(self.file_pattern)?)
    }
}
