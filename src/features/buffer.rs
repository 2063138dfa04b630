//! Row buffer accumulating fixed-shape feature tensors and their labels.

use crate::error::{Result, SpeakersetError};
use ndarray::{Array1, Array2, Array4, ArrayView2, s};

/// Growable buffer of `(1 x freq x time)` feature rows with an upper-bound capacity.
///
/// Rows are zero-filled and receive the overlapping part of each pushed
/// matrix, so matrices smaller than a row are padded and larger ones trimmed.
#[derive(Debug, Clone)]
pub struct FeatureBuffer {
    data: Vec<f32>,
    labels: Vec<i32>,
    frequency_bins: usize,
    time_frames: usize,
    capacity: usize,
}

impl FeatureBuffer {
    pub fn with_capacity(capacity: usize, frequency_bins: usize, time_frames: usize) -> Self {
        Self {
            data: Vec::new(),
            labels: Vec::new(),
            frequency_bins,
            time_frames,
            capacity,
        }
    }

    /// Append one row. Fails once `capacity` rows have been written.
    pub fn push(&mut self, matrix: ArrayView2<'_, f32>, label: i32) -> Result<()> {
        if self.labels.len() >= self.capacity {
            return Err(SpeakersetError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let row_len = self.frequency_bins * self.time_frames;
        let start = self.data.len();
        self.data.resize(start + row_len, 0.0);

        let freq = matrix.nrows().min(self.frequency_bins);
        let time = matrix.ncols().min(self.time_frames);
        for (i, source) in matrix.slice(s![..freq, ..time]).rows().into_iter().enumerate() {
            let offset = start + i * self.time_frames;
            for (slot, &value) in self.data[offset..offset + time].iter_mut().zip(source) {
                *slot = value;
            }
        }

        self.labels.push(label);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Row shape `(frequency_bins, time_frames)`.
    pub fn row_shape(&self) -> (usize, usize) {
        (self.frequency_bins, self.time_frames)
    }

    /// Consume the buffer into `[rows, 1, freq, time]` features and `[rows]` labels.
    pub fn into_arrays(self) -> Result<(Array4<f32>, Array1<i32>)> {
        let rows = self.labels.len();
        let features = Array4::from_shape_vec(
            (rows, 1, self.frequency_bins, self.time_frames),
            self.data,
        )
        .map_err(|e| SpeakersetError::ShapeMismatch {
            expected: format!(
                "{rows} x 1 x {} x {}",
                self.frequency_bins, self.time_frames
            ),
            actual: e.to_string(),
        })?;
        Ok((features, Array1::from(self.labels)))
    }
}

/// Remove the zero padding at the end of a spectrogram row.
///
/// Trailing frames whose first frequency bin is exactly zero count as
/// padding, but at least `segment_size` frames are kept. Only the first
/// `frequency_elements` bins are returned.
pub fn trim_zero_padding(
    spectrogram: ArrayView2<'_, f32>,
    segment_size: usize,
    frequency_elements: usize,
) -> Array2<f32> {
    if spectrogram.nrows() == 0 {
        return spectrogram.to_owned();
    }
    let frames = spectrogram.ncols();
    let trailing_zeros = spectrogram
        .row(0)
        .iter()
        .rev()
        .take_while(|&&v| v == 0.0)
        .count();
    let keep = (frames - trailing_zeros).max(segment_size.min(frames));
    let bins = frequency_elements.min(spectrogram.nrows());
    spectrogram.slice(s![..bins, ..keep]).to_owned()
}
