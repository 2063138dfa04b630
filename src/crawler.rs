//! Directory crawling and per-speaker feature extraction.
//!
//! Extraction runs in two passes. [`Crawler::collect_speakers`] walks the
//! base folder in file-name order and groups every matching file under the
//! base name of its directory, keeping first-seen order. [`Crawler::extract`]
//! then assigns speaker indices to the first `max_speakers` groups, applies
//! the per-speaker quota and writes one feature row per accepted file.
//!
//! A speaker name found in more than one directory is merged into its first
//! group (with a warning) instead of being split across several indices.

use crate::bundle::Bundle;
use crate::error::{Result, SpeakersetError};
use crate::features::{FeatureBuffer, FeatureExtractor};
use crate::progress::{ExtractionEvent, ExtractionObserver};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Matching files of one speaker, in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerFiles {
    pub name: String,
    /// Directories contributing files to this speaker, in first-seen order
    pub directories: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Crawl parameters for one extraction.
#[derive(Debug, Clone)]
pub struct Crawler {
    base_folder: PathBuf,
    valid_speakers: HashSet<String>,
    pattern: Regex,
    max_speakers: usize,
    quota: Option<usize>,
    max_duration: Option<f64>,
}

impl Crawler {
    pub fn new(base_folder: impl Into<PathBuf>, pattern: Regex, max_speakers: usize) -> Self {
        Self {
            base_folder: base_folder.into(),
            valid_speakers: HashSet::new(),
            pattern,
            max_speakers,
            quota: None,
            max_duration: None,
        }
    }

    /// Only directories named after one of these speakers contribute files.
    /// An empty set admits every directory.
    pub fn with_valid_speakers<I, S>(mut self, speakers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_speakers = speakers.into_iter().map(Into::into).collect();
        self
    }

    /// Cap the number of files converted per speaker.
    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    /// Duration ceiling, in seconds, passed to the feature extractor.
    pub fn with_max_duration(mut self, max_duration: Option<f64>) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    fn admits(&self, directory_name: &str) -> bool {
        self.valid_speakers.is_empty() || self.valid_speakers.contains(directory_name)
    }

    /// First pass: group matching files by the base name of their directory.
    ///
    /// A missing base folder yields no speakers.
    pub fn collect_speakers(&self) -> Result<Vec<SpeakerFiles>> {
        if !self.base_folder.is_dir() {
            tracing::warn!(
                path = %self.base_folder.display(),
                "base folder does not exist, crawl yields no data"
            );
            return Ok(Vec::new());
        }

        let mut groups: Vec<SpeakerFiles> = Vec::new();
        let mut index_by_name: HashMap<String, usize> = HashMap::new();

        for entry in WalkDir::new(&self.base_folder).sort_by_file_name() {
            let entry = entry.map_err(|e| SpeakersetError::Traversal {
                path: e
                    .path()
                    .unwrap_or(self.base_folder.as_path())
                    .display()
                    .to_string(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let Some(directory) = entry.path().parent() else {
                continue;
            };
            let speaker = directory
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !self.admits(&speaker) {
                continue;
            }
            if !self.pattern.is_match(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let group_index = match index_by_name.get(&speaker) {
                Some(&i) => i,
                None => {
                    index_by_name.insert(speaker.clone(), groups.len());
                    groups.push(SpeakerFiles {
                        name: speaker.clone(),
                        directories: Vec::new(),
                        files: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[group_index];
            if !group.directories.iter().any(|d| d == directory) {
                if let Some(first) = group.directories.first() {
                    tracing::warn!(
                        speaker = %speaker,
                        first = %first.display(),
                        other = %directory.display(),
                        "speaker name appears in several directories, merging"
                    );
                }
                group.directories.push(directory.to_path_buf());
            }
            group.files.push(entry.into_path());
        }

        Ok(groups)
    }

    /// Second pass: extract features for the admitted speakers into `buffer`.
    ///
    /// Speaker indices start at 0 and follow first-seen order. A feature
    /// extraction failure aborts the whole crawl.
    pub fn extract(
        &self,
        extractor: &dyn FeatureExtractor,
        mut buffer: FeatureBuffer,
        observer: &dyn ExtractionObserver,
    ) -> Result<Bundle> {
        let (frequency_bins, time_frames) = buffer.row_shape();
        let groups = self.collect_speakers()?;
        if groups.is_empty() {
            tracing::warn!(
                path = %self.base_folder.display(),
                "no matching files found, producing an empty result"
            );
            observer.on_event(&ExtractionEvent::Finished {
                rows: 0,
                speakers: 0,
            });
            return Ok(Bundle::empty(frequency_bins, time_frames));
        }

        let mut speaker_names: Vec<String> = Vec::new();
        for group in groups {
            if speaker_names.len() >= self.max_speakers {
                break;
            }
            let take = self
                .quota
                .map_or(group.files.len(), |quota| quota.min(group.files.len()));
            if take == 0 {
                continue;
            }

            let index = speaker_names.len();
            let label = i32::try_from(index).map_err(|_| {
                SpeakersetError::Other(format!("speaker index {index} does not fit a label"))
            })?;
            observer.on_event(&ExtractionEvent::SpeakerStarted {
                index,
                max_speakers: self.max_speakers,
                name: group.name.clone(),
            });

            for path in &group.files[..take] {
                let matrix = extractor.extract(path, self.max_duration)?;
                let row = buffer.len();
                buffer.push(matrix.view(), label)?;
                observer.on_event(&ExtractionEvent::UtteranceExtracted {
                    speaker_index: index,
                    row,
                    path: path.clone(),
                });
            }
            speaker_names.push(group.name);
        }

        observer.on_event(&ExtractionEvent::Finished {
            rows: buffer.len(),
            speakers: speaker_names.len(),
        });

        let (features, labels) = buffer.into_arrays()?;
        Bundle::new(features, labels, speaker_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::MockFeatureExtractor;
    use crate::progress::{CollectingObserver, NullObserver};
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    const WAV_PATTERN: &str = r"_RIFF\.WAV$";

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn crawler(root: &Path, max_speakers: usize) -> Crawler {
        Crawler::new(root, Regex::new(WAV_PATTERN).unwrap(), max_speakers)
    }

    fn run(crawler: &Crawler, capacity: usize) -> Bundle {
        crawler
            .extract(
                &MockFeatureExtractor::new(2, 3),
                FeatureBuffer::with_capacity(capacity, 2, 3),
                &NullObserver,
            )
            .unwrap()
    }

    fn abc_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        for speaker in ["A", "B", "C"] {
            touch(dir.path(), &format!("{speaker}/SA1_RIFF.WAV"));
            touch(dir.path(), &format!("{speaker}/SA2_RIFF.WAV"));
        }
        dir
    }

    #[test]
    fn test_valid_speaker_filter_skips_directory() {
        let dir = abc_tree();
        let crawler = crawler(dir.path(), 10).with_valid_speakers(["A", "C"]);

        let bundle = run(&crawler, 200);

        assert_eq!(bundle.speaker_names, vec!["A", "C"]);
        assert_eq!(bundle.labels.to_vec(), vec![0, 0, 1, 1]);
        assert_eq!(bundle.len(), 4);
        assert_eq!(bundle.features.dim(), (4, 1, 2, 3));
    }

    #[test]
    fn test_max_speakers_stops_after_first_speaker() {
        let dir = abc_tree();
        let crawler = crawler(dir.path(), 1);

        let bundle = run(&crawler, 20);

        assert_eq!(bundle.speaker_names, vec!["A"]);
        assert_eq!(bundle.labels.to_vec(), vec![0, 0]);
    }

    #[test]
    fn test_quota_caps_rows_per_speaker() {
        let dir = TempDir::new().unwrap();
        for i in 1..=5 {
            touch(dir.path(), &format!("id10001/clip_000000{i}.wav"));
        }
        let crawler = Crawler::new(dir.path(), Regex::new(r"_\d{7}\.wav$").unwrap(), 5)
            .with_quota(Some(2));

        let bundle = run(&crawler, 10);

        assert_eq!(bundle.speaker_names, vec!["id10001"]);
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.rows_per_speaker(), vec![2]);
    }

    #[test]
    fn test_empty_base_folder_yields_empty_result() {
        let dir = TempDir::new().unwrap();
        let bundle = run(&crawler(dir.path(), 10), 200);

        assert!(bundle.is_empty());
        assert!(bundle.speaker_names.is_empty());
        assert_eq!(bundle.features.dim(), (0, 1, 2, 3));
    }

    #[test]
    fn test_missing_base_folder_yields_empty_result() {
        let bundle = run(&crawler(Path::new("/nonexistent/speakerset/base"), 10), 200);

        assert!(bundle.is_empty());
        assert!(bundle.speaker_names.is_empty());
    }

    #[test]
    fn test_non_matching_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A/SA1_RIFF.WAV");
        touch(dir.path(), "A/SA1.WAV");
        touch(dir.path(), "A/SA1.PHN");
        touch(dir.path(), "DOC/README_RIFF.TXT");

        let bundle = run(&crawler(dir.path(), 10), 200);

        assert_eq!(bundle.speaker_names, vec!["A"]);
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn test_nested_speaker_directories_are_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "TRAIN/DR1/FCJF0/SA1_RIFF.WAV");
        touch(dir.path(), "TRAIN/DR1/MDAB0/SA1_RIFF.WAV");
        touch(dir.path(), "TEST/DR2/FAEM0/SA1_RIFF.WAV");

        let crawler = crawler(dir.path(), 10).with_valid_speakers(["FCJF0", "FAEM0"]);
        let bundle = run(&crawler, 200);

        // TEST sorts before TRAIN
        assert_eq!(bundle.speaker_names, vec!["FAEM0", "FCJF0"]);
    }

    #[test]
    fn test_speaker_spanning_directories_keeps_one_index() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "session1/spk/a_RIFF.WAV");
        touch(dir.path(), "session1/other/a_RIFF.WAV");
        touch(dir.path(), "session2/spk/b_RIFF.WAV");

        let crawler = crawler(dir.path(), 10);
        let groups = crawler.collect_speakers().unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "other");
        assert_eq!(groups[1].name, "spk");
        assert_eq!(groups[1].directories.len(), 2);
        assert_eq!(groups[1].files.len(), 2);
    }

    #[test]
    fn test_labels_have_no_gaps_and_respect_max() {
        let dir = TempDir::new().unwrap();
        for speaker in ["s1", "s2", "s3", "s4", "s5"] {
            for n in 0..3 {
                touch(dir.path(), &format!("{speaker}/u{n}_RIFF.WAV"));
            }
        }

        let bundle = run(&crawler(dir.path(), 3).with_quota(Some(2)), 6);

        let distinct: BTreeSet<i32> = bundle.labels.iter().copied().collect();
        let expected: BTreeSet<i32> = (0..bundle.num_speakers() as i32).collect();
        assert_eq!(distinct, expected);
        assert!(bundle.labels.iter().all(|&l| l <= 2));
        assert!(bundle.labels.windows(2).into_iter().all(|w| w[0] <= w[1]));
        assert!(bundle.rows_per_speaker().iter().all(|&n| n <= 2));
        assert_eq!(bundle.len(), 6);
    }

    #[test]
    fn test_rows_carry_extracted_features() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A/long_name_RIFF.WAV");

        let bundle = run(&crawler(dir.path(), 1), 1);

        let expected = MockFeatureExtractor::fill_value(Path::new("long_name_RIFF.WAV"));
        assert!(bundle.features.iter().all(|&v| v == expected));
    }

    #[test]
    fn test_extraction_failure_aborts_crawl() {
        let dir = abc_tree();
        let crawler = crawler(dir.path(), 10);

        let result = crawler.extract(
            &MockFeatureExtractor::new(2, 3).with_failure_on("B/SA2"),
            FeatureBuffer::with_capacity(20, 2, 3),
            &NullObserver,
        );

        assert!(matches!(result, Err(SpeakersetError::Extraction { .. })));
    }

    #[test]
    fn test_capacity_is_enforced() {
        let dir = abc_tree();
        let result = crawler(dir.path(), 10).extract(
            &MockFeatureExtractor::new(2, 3),
            FeatureBuffer::with_capacity(3, 2, 3),
            &NullObserver,
        );

        assert!(matches!(
            result,
            Err(SpeakersetError::CapacityExceeded { capacity: 3 })
        ));
    }

    #[test]
    fn test_observer_sees_speaker_boundaries() {
        let dir = abc_tree();
        let observer = CollectingObserver::new();

        crawler(dir.path(), 2)
            .extract(
                &MockFeatureExtractor::new(2, 3),
                FeatureBuffer::with_capacity(40, 2, 3),
                &observer,
            )
            .unwrap();

        assert_eq!(observer.speaker_names(), vec!["A", "B"]);
        assert_eq!(
            observer.events().last(),
            Some(&ExtractionEvent::Finished {
                rows: 4,
                speakers: 2
            })
        );
    }

    #[test]
    fn test_crawl_is_idempotent() {
        let dir = abc_tree();
        let crawler = crawler(dir.path(), 10).with_valid_speakers(["A", "B"]);

        assert_eq!(run(&crawler, 40), run(&crawler, 40));
    }
}
