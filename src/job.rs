//! Named extraction jobs: crawl one corpus and persist the resulting bundle(s).

use crate::bundle::Bundle;
use crate::config::Config;
use crate::crawler::Crawler;
use crate::dataset::Dataset;
use crate::defaults;
use crate::error::{Result, SpeakersetError};
use crate::features::{FeatureBuffer, FeatureExtractor};
use crate::progress::ExtractionObserver;
use crate::split::Splitter;
use std::fs;
use std::path::{Path, PathBuf};

/// Output suffix of an unsplit job.
pub const CLUSTER_SUFFIX: &str = "_cluster";
/// Output suffix of the training partition.
pub const TRAIN_SUFFIX: &str = "_train";
/// Output suffix of the test partition.
pub const TEST_SUFFIX: &str = "_test";

/// Collaborators a job runs against.
pub struct JobContext<'a> {
    pub config: &'a Config,
    pub extractor: &'a dyn FeatureExtractor,
    pub splitter: &'a dyn Splitter,
    pub observer: &'a dyn ExtractionObserver,
}

/// Declarative description of one extraction job.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerJob {
    split: bool,
    max_speakers: usize,
    speaker_list: String,
    output_name: String,
    sentences: usize,
    frequency_elements: usize,
    max_audio_length: usize,
    dataset: Dataset,
}

impl SpeakerJob {
    /// Create a job reading the speaker list `speaker_list`.
    ///
    /// The output name defaults to the list name.
    pub fn new(split: bool, max_speakers: usize, speaker_list: impl Into<String>) -> Self {
        let speaker_list = speaker_list.into();
        Self {
            split,
            max_speakers,
            output_name: speaker_list.clone(),
            speaker_list,
            sentences: defaults::SENTENCES,
            frequency_elements: defaults::FREQUENCY_ELEMENTS,
            max_audio_length: defaults::MAX_AUDIO_LENGTH,
            dataset: Dataset::default(),
        }
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences;
        self
    }

    pub fn with_frequency_elements(mut self, frequency_elements: usize) -> Self {
        self.frequency_elements = frequency_elements;
        self
    }

    /// Maximum audio length, in spectrogram frames.
    pub fn with_max_audio_length(mut self, max_audio_length: usize) -> Self {
        self.max_audio_length = max_audio_length;
        self
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn split(&self) -> bool {
        self.split
    }

    pub fn max_speakers(&self) -> usize {
        self.max_speakers
    }

    pub fn speaker_list(&self) -> &str {
        &self.speaker_list
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn sentences(&self) -> usize {
        self.sentences
    }

    pub fn frequency_elements(&self) -> usize {
        self.frequency_elements
    }

    pub fn max_audio_length(&self) -> usize {
        self.max_audio_length
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Upper bound on the rows this job can produce.
    pub fn row_capacity(&self) -> usize {
        self.dataset
            .profile()
            .row_capacity(self.max_speakers, self.sentences)
    }

    /// Size of the time axis of every feature row.
    pub fn time_frames(&self) -> usize {
        self.dataset.profile().time_frames(self.max_audio_length)
    }

    /// Names of the bundles this job writes, without extension.
    pub fn output_names(&self) -> Vec<String> {
        let suffixes: &[&str] = if self.split {
            &[TRAIN_SUFFIX, TEST_SUFFIX]
        } else {
            &[CLUSTER_SUFFIX]
        };
        suffixes
            .iter()
            .map(|suffix| format!("{}{suffix}", self.output_name))
            .collect()
    }

    pub fn output_paths(&self, config: &Config) -> Vec<PathBuf> {
        self.output_names()
            .iter()
            .map(|name| config.bundle_path(name))
            .collect()
    }

    /// Whether every output of this job already exists on disk.
    pub fn is_saved(&self, config: &Config) -> bool {
        self.output_paths(config).iter().all(|path| path.exists())
    }

    /// Crawl the corpus and return the unsplit result.
    pub fn extract(&self, ctx: &JobContext<'_>) -> Result<Bundle> {
        let speakers = load_speaker_list(&ctx.config.speaker_list_path(&self.speaker_list))?;
        let profile = self.dataset.profile();

        if ctx.extractor.frequency_bins() != self.frequency_elements {
            tracing::warn!(
                job = %self.output_name,
                extractor = ctx.extractor.frequency_bins(),
                rows = self.frequency_elements,
                "extractor frequency bins differ from job, rows will be trimmed or padded"
            );
        }

        let crawler = Crawler::new(
            ctx.config.dataset_dir(self.dataset),
            profile.compile_pattern()?,
            self.max_speakers,
        )
        .with_valid_speakers(speakers)
        .with_quota(profile.quota(self.sentences))
        .with_max_duration(profile.duration_ceiling(self.max_audio_length));

        let buffer = FeatureBuffer::with_capacity(
            self.row_capacity(),
            self.frequency_elements,
            self.time_frames(),
        );
        crawler.extract(ctx.extractor, buffer, ctx.observer)
    }

    /// Extract, optionally split, and persist. Returns the written paths.
    pub fn run(&self, ctx: &JobContext<'_>) -> Result<Vec<PathBuf>> {
        tracing::info!(
            job = %self.output_name,
            dataset = %self.dataset,
            split = self.split,
            "Extracting {}",
            self.speaker_list
        );

        let bundle = self.extract(ctx)?;
        if bundle.is_empty() {
            tracing::warn!(job = %self.output_name, "extraction produced no rows");
        }

        let outputs = if self.split {
            let parts =
                ctx.splitter
                    .split(&bundle.features, &bundle.labels, Some(self.sentences))?;
            let train = Bundle::new(parts.x_train, parts.y_train, bundle.speaker_names.clone())?;
            let test = Bundle::new(parts.x_test, parts.y_test, bundle.speaker_names)?;
            vec![train, test]
        } else {
            vec![bundle]
        };

        let paths = self.output_paths(ctx.config);
        for (output, path) in outputs.iter().zip(&paths) {
            output.save(path)?;
        }

        tracing::info!(job = %self.output_name, outputs = paths.len(), "Done extracting {}", self.speaker_list);
        Ok(paths)
    }
}

/// Read a speaker list: one identifier per line.
///
/// Lines are decoded lossily, stripped of trailing whitespace and unwrapped
/// from the `b'...'` form older list files were written in. Blank lines are
/// skipped.
pub fn load_speaker_list(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "cannot read speaker list");
        SpeakersetError::SpeakerListNotFound {
            path: path.display().to_string(),
        }
    })?;

    Ok(bytes
        .split(|&b| b == b'\n')
        .map(String::from_utf8_lossy)
        .map(|line| unwrap_byte_literal(line.trim_end()).to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

fn unwrap_byte_literal(line: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = line
            .strip_prefix('b')
            .and_then(|rest| rest.strip_prefix(quote))
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    line
}
