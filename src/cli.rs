//! Command-line interface for speakerset
//!
//! Provides argument parsing using clap derive macros.

use crate::dataset::Dataset;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Mel-spectrogram dataset preparation for speaker clustering
#[derive(Parser, Debug)]
#[command(
    name = "speakerset",
    version,
    about = "Mel-spectrogram dataset preparation for speaker clustering"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-file progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Report progress through the log instead of a progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog jobs and whether their outputs exist
    Jobs,

    /// Run catalog jobs (all when no name is given)
    Run {
        /// Output names of the jobs to run
        names: Vec<String>,

        /// Re-run jobs whose outputs already exist
        #[arg(long)]
        force: bool,
    },

    /// Run a single job described on the command line
    Extract {
        /// Speaker list name (file `<name>.txt` in the list directory)
        #[arg(long, value_name = "NAME")]
        list: String,

        /// Corpus to crawl (timit, rt09, voxceleb)
        #[arg(long, value_name = "DATASET", default_value = "timit", value_parser = parse_dataset)]
        dataset: Dataset,

        /// Maximum number of speakers to extract
        #[arg(long, value_name = "N")]
        max_speakers: usize,

        /// Write train and test bundles instead of one cluster bundle
        #[arg(long)]
        split: bool,

        /// Utterances per speaker
        #[arg(long, value_name = "N", default_value_t = crate::defaults::SENTENCES)]
        sentences: usize,

        /// Maximum audio length in spectrogram frames (100 per second)
        #[arg(long, value_name = "FRAMES", default_value_t = crate::defaults::MAX_AUDIO_LENGTH)]
        max_audio_length: usize,

        /// Number of mel frequency bins
        #[arg(long, value_name = "N", default_value_t = crate::defaults::FREQUENCY_ELEMENTS)]
        frequency_elements: usize,

        /// Output name (defaults to the list name)
        #[arg(long, value_name = "NAME")]
        output: Option<String>,
    },

    /// Print a summary of a persisted bundle
    Inspect {
        /// Bundle file
        file: PathBuf,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

fn parse_dataset(s: &str) -> Result<Dataset, String> {
    s.parse::<Dataset>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jobs() {
        let cli = Cli::try_parse_from(["speakerset", "jobs"]).unwrap();
        assert!(matches!(cli.command, Commands::Jobs));
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.no_progress);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["speakerset"]).is_err());
    }

    #[test]
    fn test_parse_run_without_names() {
        let cli = Cli::try_parse_from(["speakerset", "run"]).unwrap();
        match cli.command {
            Commands::Run { names, force } => {
                assert!(names.is_empty());
                assert!(!force);
            }
            other => panic!("Expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_with_names_and_force() {
        let cli = Cli::try_parse_from([
            "speakerset",
            "run",
            "speakers_60_clustering",
            "speakers_80_clustering",
            "--force",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { names, force } => {
                assert_eq!(names, vec!["speakers_60_clustering", "speakers_80_clustering"]);
                assert!(force);
            }
            other => panic!("Expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_extract_defaults() {
        let cli = Cli::try_parse_from([
            "speakerset",
            "extract",
            "--list",
            "speakers_40",
            "--max-speakers",
            "40",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                list,
                dataset,
                max_speakers,
                split,
                sentences,
                max_audio_length,
                frequency_elements,
                output,
            } => {
                assert_eq!(list, "speakers_40");
                assert_eq!(dataset, Dataset::Timit);
                assert_eq!(max_speakers, 40);
                assert!(!split);
                assert_eq!(sentences, 10);
                assert_eq!(max_audio_length, 800);
                assert_eq!(frequency_elements, 128);
                assert!(output.is_none());
            }
            other => panic!("Expected Extract, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_extract_voxceleb() {
        let cli = Cli::try_parse_from([
            "speakerset",
            "extract",
            "--list",
            "vox",
            "--dataset",
            "VoxCeleb",
            "--max-speakers",
            "100",
            "--sentences",
            "45",
            "--split",
            "--output",
            "vox_out",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                dataset,
                sentences,
                split,
                output,
                ..
            } => {
                assert_eq!(dataset, Dataset::VoxCeleb);
                assert_eq!(sentences, 45);
                assert!(split);
                assert_eq!(output.as_deref(), Some("vox_out"));
            }
            other => panic!("Expected Extract, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_rejects_unknown_dataset() {
        let result = Cli::try_parse_from([
            "speakerset",
            "extract",
            "--list",
            "l",
            "--dataset",
            "librispeech",
            "--max-speakers",
            "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_requires_list_and_max_speakers() {
        assert!(Cli::try_parse_from(["speakerset", "extract", "--list", "l"]).is_err());
        assert!(Cli::try_parse_from(["speakerset", "extract", "--max-speakers", "3"]).is_err());
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::try_parse_from(["speakerset", "inspect", "out/a_cluster.bundle"]).unwrap();
        match cli.command {
            Commands::Inspect { file } => assert_eq!(file, PathBuf::from("out/a_cluster.bundle")),
            other => panic!("Expected Inspect, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["speakerset", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_config_requires_subcommand() {
        assert!(Cli::try_parse_from(["speakerset", "config"]).is_err());
    }

    #[test]
    fn test_global_options_after_command() {
        let cli = Cli::try_parse_from([
            "speakerset",
            "run",
            "--config",
            "/tmp/c.toml",
            "-vv",
            "--no-progress",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_progress);
    }

    #[test]
    fn test_parse_quiet_short_flag() {
        let cli = Cli::try_parse_from(["speakerset", "-q", "jobs"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["speakerset", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["speakerset", "--version"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }
}
