//! Persisted `(features, labels, speaker_names)` bundles.

use crate::error::{Result, SpeakersetError};
use crate::features::trim_zero_padding;
use ndarray::{Array1, Array4, Axis, s};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Feature tensor `[rows, 1, freq, time]`, speaker labels `[rows]` and the
/// speaker-name table indexed by label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub features: Array4<f32>,
    pub labels: Array1<i32>,
    pub speaker_names: Vec<String>,
}

impl Bundle {
    /// Build a bundle, checking that features and labels have the same row count.
    pub fn new(
        features: Array4<f32>,
        labels: Array1<i32>,
        speaker_names: Vec<String>,
    ) -> Result<Self> {
        if features.len_of(Axis(0)) != labels.len() {
            return Err(SpeakersetError::ShapeMismatch {
                expected: format!("{} labels", features.len_of(Axis(0))),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(Self {
            features,
            labels,
            speaker_names,
        })
    }

    /// Zero-row bundle with the given row shape.
    pub fn empty(frequency_bins: usize, time_frames: usize) -> Self {
        Self {
            features: Array4::zeros((0, 1, frequency_bins, time_frames)),
            labels: Array1::zeros(0),
            speaker_names: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_speakers(&self) -> usize {
        self.speaker_names.len()
    }

    /// Row shape `(frequency_bins, time_frames)`.
    pub fn row_shape(&self) -> (usize, usize) {
        let (_, _, freq, time) = self.features.dim();
        (freq, time)
    }

    /// Number of rows per speaker index, indexed like `speaker_names`.
    pub fn rows_per_speaker(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.speaker_names.len()];
        for &label in &self.labels {
            if let Some(count) = usize::try_from(label).ok().and_then(|i| counts.get_mut(i)) {
                *count += 1;
            }
        }
        counts
    }

    /// Time frames per row once the trailing zero padding is dropped.
    pub fn unpadded_frames(&self) -> Vec<usize> {
        let (freq, _) = self.row_shape();
        self.features
            .outer_iter()
            .map(|row| trim_zero_padding(row.slice(s![0, .., ..]), 0, freq).ncols())
            .collect()
    }

    /// Write the bundle to `path`.
    ///
    /// The bytes go to a temporary sibling first and are renamed into place,
    /// so an interrupted write never leaves a partial bundle at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("partial");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, self).map_err(|e| SpeakersetError::Bundle {
                message: format!("Failed to serialize {}: {e}", path.display()),
            })?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        tracing::info!(path = %path.display(), rows = self.len(), "saved bundle");
        Ok(())
    }

    /// Read a bundle previously written by [`Bundle::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let bundle: Bundle =
            bincode::deserialize_from(reader).map_err(|e| SpeakersetError::Bundle {
                message: format!("Failed to deserialize {}: {e}", path.display()),
            })?;
        Bundle::new(bundle.features, bundle.labels, bundle.speaker_names)
    }
}
