use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use speakerset::bundle::Bundle;
use speakerset::catalog::{all_jobs, find_jobs};
use speakerset::cli::{Cli, Commands, ConfigAction};
use speakerset::config::Config;
use speakerset::features::MelSpectrogramExtractor;
use speakerset::job::{JobContext, SpeakerJob};
use speakerset::progress::{ExtractionObserver, LogObserver, ProgressBarObserver};
use speakerset::split::StratifiedSplitter;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);
    tracing::debug!(version = %speakerset::version_string(), "starting");

    match cli.command {
        Commands::Jobs => {
            let config = load_config(cli.config.as_deref())?;
            list_jobs(&config);
        }
        Commands::Run { names, force } => {
            let config = load_config(cli.config.as_deref())?;
            let jobs = select_jobs(&names)?;
            let progress = show_progress(cli.quiet, cli.no_progress);
            for job in jobs {
                if !force && job.is_saved(&config) {
                    tracing::info!(job = %job.output_name(), "outputs exist, skipping");
                    continue;
                }
                run_job(&job, &config, progress)?;
            }
        }
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
            let config = load_config(cli.config.as_deref())?;
            let mut job = SpeakerJob::new(split, max_speakers, list)
                .with_dataset(dataset)
                .with_sentences(sentences)
                .with_max_audio_length(max_audio_length)
                .with_frequency_elements(frequency_elements);
            if let Some(output) = output {
                job = job.with_output_name(output);
            }
            run_job(&job, &config, show_progress(cli.quiet, cli.no_progress))?;
        }
        Commands::Inspect { file } => {
            inspect_bundle(&file)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", config.to_toml_string()?);
            }
            ConfigAction::Path => {
                println!("{}", config_path(cli.config.as_deref()).display());
            }
        },
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "speakerset",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the level derived from `-q` / `-v`.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn config_path(custom_path: Option<&Path>) -> PathBuf {
    custom_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path)
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/speakerset/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("loading config {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

fn show_progress(quiet: bool, no_progress: bool) -> bool {
    !quiet && !no_progress && std::io::stderr().is_terminal()
}

fn select_jobs(names: &[String]) -> Result<Vec<SpeakerJob>> {
    if names.is_empty() {
        return Ok(all_jobs());
    }

    let mut jobs = Vec::new();
    for name in names {
        let found = find_jobs(name);
        if found.is_empty() {
            bail!("Unknown job '{name}'. Run `speakerset jobs` to list them.");
        }
        for job in found {
            if !jobs.contains(&job) {
                jobs.push(job);
            }
        }
    }
    Ok(jobs)
}

fn run_job(job: &SpeakerJob, config: &Config, progress: bool) -> Result<()> {
    let extractor = MelSpectrogramExtractor::new(&config.features, job.frequency_elements())?;
    let splitter = StratifiedSplitter::default();
    let observer: Box<dyn ExtractionObserver> = if progress {
        Box::new(ProgressBarObserver::new(job.output_name()))
    } else {
        Box::new(LogObserver)
    };

    let ctx = JobContext {
        config,
        extractor: &extractor,
        splitter: &splitter,
        observer: observer.as_ref(),
    };
    let paths = job
        .run(&ctx)
        .with_context(|| format!("job {} failed", job.output_name()))?;

    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}

fn list_jobs(config: &Config) {
    println!(
        "{:<45} {:<9} {:>8} {:<8} {}",
        "NAME", "DATASET", "SPEAKERS", "OUTPUT", "SAVED"
    );
    for job in all_jobs() {
        println!(
            "{:<45} {:<9} {:>8} {:<8} {}",
            job.output_name(),
            job.dataset().name(),
            job.max_speakers(),
            if job.split() { "split" } else { "cluster" },
            if job.is_saved(config) { "yes" } else { "no" },
        );
    }
}

fn inspect_bundle(path: &Path) -> Result<()> {
    let bundle =
        Bundle::load(path).with_context(|| format!("reading bundle {}", path.display()))?;
    let (frequency_bins, time_frames) = bundle.row_shape();

    println!("File:      {}", path.display());
    println!("Rows:      {}", bundle.len());
    println!("Row shape: 1 x {frequency_bins} x {time_frames}");
    let frames = bundle.unpadded_frames();
    if let (Some(min), Some(max)) = (frames.iter().min(), frames.iter().max()) {
        println!("Frames:    {min}..={max} unpadded");
    }
    println!("Speakers:  {}", bundle.num_speakers());
    for (index, (name, rows)) in bundle
        .speaker_names
        .iter()
        .zip(bundle.rows_per_speaker())
        .enumerate()
    {
        println!("  [{index}] {name} ({rows} rows)");
    }
    Ok(())
}
