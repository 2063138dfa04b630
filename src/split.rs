//! Train/test partitioning of extracted features.

use crate::error::{Result, SpeakersetError};
use ndarray::{Array1, Array4, Axis};
use std::collections::HashMap;

/// Features and labels of both partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub x_train: Array4<f32>,
    pub x_test: Array4<f32>,
    pub y_train: Array1<i32>,
    pub y_test: Array1<i32>,
}

/// Trait for train/test splitting.
pub trait Splitter: Send + Sync {
    /// Partition `features`/`labels` row-wise.
    ///
    /// `group_hint` is the expected number of utterances per speaker, used
    /// to stratify the held-out rows.
    fn split(
        &self,
        features: &Array4<f32>,
        labels: &Array1<i32>,
        group_hint: Option<usize>,
    ) -> Result<SplitResult>;
}

/// Deterministic stratified splitter.
///
/// Rows are grouped by label and, within each group, processed in blocks of
/// `group_hint` rows (or the whole group when no hint is given). A trailing
/// block shorter than the hint is sized by the rows left. The last
/// `round(block * test_fraction)` rows of every block go to the test set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StratifiedSplitter {
    test_fraction: f64,
}

impl StratifiedSplitter {
    pub fn new(test_fraction: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&test_fraction) {
            return Err(SpeakersetError::ConfigParse {
                message: format!("test fraction must be within [0, 1], got {test_fraction}"),
            });
        }
        Ok(Self { test_fraction })
    }

    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Whether the row at `position` within a group of `total` rows is held out.
    fn is_test(&self, position: usize, total: usize, hint: Option<usize>) -> bool {
        let hint = hint.filter(|&h| h > 0).unwrap_or(total).max(1);
        let block_start = position - position % hint;
        let block = hint.min(total - block_start);
        let held_out = ((block as f64 * self.test_fraction).round() as usize).min(block);
        position - block_start >= block - held_out
    }
}

impl Default for StratifiedSplitter {
    fn default() -> Self {
        Self {
            test_fraction: crate::defaults::TEST_FRACTION,
        }
    }
}

impl Splitter for StratifiedSplitter {
    fn split(
        &self,
        features: &Array4<f32>,
        labels: &Array1<i32>,
        group_hint: Option<usize>,
    ) -> Result<SplitResult> {
        let rows = features.len_of(Axis(0));
        if rows != labels.len() {
            return Err(SpeakersetError::ShapeMismatch {
                expected: format!("{rows} labels"),
                actual: format!("{} labels", labels.len()),
            });
        }

        let mut totals: HashMap<i32, usize> = HashMap::new();
        for &label in labels {
            *totals.entry(label).or_default() += 1;
        }

        let mut seen: HashMap<i32, usize> = HashMap::new();
        let mut train = Vec::with_capacity(rows);
        let mut test = Vec::new();
        for (row, &label) in labels.iter().enumerate() {
            let position = seen.entry(label).or_default();
            let total = totals.get(&label).copied().unwrap_or(1);

            if self.is_test(*position, total, group_hint) {
                test.push(row);
            } else {
                train.push(row);
            }
            *position += 1;
        }

        Ok(SplitResult {
            x_train: features.select(Axis(0), &train),
            x_test: features.select(Axis(0), &test),
            y_train: labels.select(Axis(0), &train),
            y_test: labels.select(Axis(0), &test),
        })
    }
}
