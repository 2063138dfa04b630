//! Progress events emitted while a crawl extracts features.

use std::path::PathBuf;
use std::sync::Mutex;

/// Events reported by the crawler at speaker boundaries and per utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionEvent {
    /// A new speaker index was opened.
    SpeakerStarted {
        index: usize,
        max_speakers: usize,
        name: String,
    },
    /// One utterance was converted and written to row `row`.
    UtteranceExtracted {
        speaker_index: usize,
        row: usize,
        path: PathBuf,
    },
    /// The crawl completed.
    Finished { rows: usize, speakers: usize },
}

/// Trait for observing extraction progress.
pub trait ExtractionObserver: Send + Sync {
    fn on_event(&self, event: &ExtractionEvent);
}

/// Observer that writes progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ExtractionObserver for LogObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::SpeakerStarted {
                index,
                max_speakers,
                name,
            } => {
                tracing::info!(speaker = %name, "Extraction progress: {}/{}", index + 1, max_speakers);
            }
            ExtractionEvent::UtteranceExtracted {
                speaker_index,
                row,
                path,
            } => {
                tracing::debug!(speaker_index, row, path = %path.display(), "extracted utterance");
            }
            ExtractionEvent::Finished { rows, speakers } => {
                tracing::info!(rows, speakers, "extraction finished");
            }
        }
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ExtractionObserver for NullObserver {
    fn on_event(&self, _event: &ExtractionEvent) {}
}

/// Observer that records events for inspection.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<ExtractionEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<ExtractionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of the speakers whose boundaries were reported, in order.
    pub fn speaker_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ExtractionEvent::SpeakerStarted { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }
}

impl ExtractionObserver for CollectingObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Terminal progress bar advancing once per speaker.
#[cfg(feature = "cli")]
pub struct ProgressBarObserver {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl ProgressBarObserver {
    pub fn new(job_name: &str) -> Self {
        let bar = indicatif::ProgressBar::new(0);
        bar.set_style(
            // SAFETY: hardcoded template string, always valid
            #[allow(clippy::expect_used)]
            indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );
        bar.set_prefix(job_name.to_string());
        Self { bar }
    }
}

#[cfg(feature = "cli")]
impl ExtractionObserver for ProgressBarObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::SpeakerStarted {
                index,
                max_speakers,
                name,
            } => {
                self.bar.set_length(*max_speakers as u64);
                self.bar.set_position(*index as u64 + 1);
                self.bar.set_message(name.clone());
            }
            ExtractionEvent::UtteranceExtracted { .. } => self.bar.tick(),
            ExtractionEvent::Finished { rows, speakers } => {
                self.bar
                    .finish_with_message(format!("{rows} rows from {speakers} speakers"));
            }
        }
    }
}
