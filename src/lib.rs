//! sacmerge - SAC seismic segment consolidation tool.
//!
//! Merges per-day waveform segments into calendar-aligned month or year
//! records, decimates segments to lower sampling rates and computes
//! short-time magnitude spectra.

#![warn(missing_docs)]

pub mod calendar;
pub mod cli;
pub mod config;
pub mod constants;
pub mod decimate;
pub mod error;
pub mod filter;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod segment;
pub mod spectrogram;

use clap::Parser;
use cli::{
    Cli, Command, ConfigAction, DecimateArgs, GlobalArgs, MergeArgs, SpectrogramArgs, ViewArgs,
};
use config::{
    Config, ConfigSource, config_file_path, load_config, render_config, resolve_config_source,
    save_config,
};
use pipeline::{
    BatchSummary, DecimateBatchSettings, DecimationStage, DirectoryMerge, MergeBatchSettings,
    PatternSettings, SpectrogramBatchSettings, decimate_file, merge_directory, output_dir_for,
    run_decimate_batch, run_merge_batch, run_spectrogram_batch, spectrogram_file,
};
use segment::{FileStore, SegmentStore};
use std::path::PathBuf;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the sacmerge CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet);

    // Remove half-written outputs on interrupt
    if let Err(e) = ctrlc::set_handler(|| {
        pipeline::cleanup_all_reservations();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let working_dir = std::env::current_dir()?;
    let source = resolve_config_source(cli.global.config.as_deref(), &working_dir)?;

    if let Command::Config { action } = cli.command {
        return handle_config_command(action, &source);
    }

    let mut config = load_config(&source)?;

    handle_command(cli.command, &cli.global, &source, &mut config, &FileStore)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command<S: SegmentStore>(
    command: Command,
    global: &GlobalArgs,
    source: &ConfigSource,
    config: &mut Config,
    store: &S,
) -> Result<()> {
    match command {
        Command::MergeBatch(args) => {
            args.apply_to(config);
            config::validate_config(config)?;
            let settings = MergeBatchSettings {
                input_dir: args.input_dir,
                output_dir: args.output_dir,
                pattern: PatternSettings {
                    delimiter: config.pattern.delimiter.clone(),
                    grammar: config.pattern.merge_grammar.clone(),
                    extension: config.pattern.extension.clone(),
                },
                station_groups: config.merge.station_groups.clone(),
                year_tokens: config.merge.year_tokens.clone(),
                scale: config.merge.scale,
                label: config.merge.label,
                policy: config.merge.policy(),
                round_unit: config.merge.round_unit(),
                decimation: config
                    .merge_decimation()
                    .map(|(fs_new, options)| DecimationStage { fs_new, options }),
                remove_sources: config.merge.remove_sources,
                output_format: config.merge.output_format,
                show_progress: global.show_progress(),
            };
            let summary = run_merge_batch(store, &settings)?;
            report_summary(&summary);
            Ok(())
        }
        Command::DecimateBatch(args) => {
            args.apply_to(config);
            config::validate_config(config)?;
            let settings = DecimateBatchSettings {
                input_dir: args.input_dir,
                output_dir: args.output_dir,
                pattern: PatternSettings {
                    delimiter: config.pattern.delimiter.clone(),
                    grammar: config.pattern.decimate_grammar.clone(),
                    extension: config.pattern.extension.clone(),
                },
                accepted: config.decimate.accepted.clone(),
                day_range: config.decimate.day_range(),
                fs_new: config.decimate.fs_new,
                options: config.decimate.options(),
                output_format: config.decimate.output_format,
                show_progress: global.show_progress(),
            };
            let summary = run_decimate_batch(store, &settings)?;
            report_summary(&summary);
            Ok(())
        }
        Command::SpectrogramBatch(args) => {
            args.apply_to(config);
            config::validate_config(config)?;
            let settings = SpectrogramBatchSettings {
                input_dir: args.input_dir,
                output_dir: args.output_dir,
                extension: config.pattern.extension.clone(),
                options: config.spectrogram,
                show_progress: global.show_progress(),
            };
            let summary = run_spectrogram_batch(store, &settings)?;
            report_summary(&summary);
            Ok(())
        }
        Command::Spectrogram(args) => handle_spectrogram(&args, config, store),
        Command::Merge(args) => handle_merge(&args, config, store),
        Command::Decimate(args) => handle_decimate(&args, config, store),
        Command::View(args) => handle_view(&args, store),
        Command::Config { action } => handle_config_command(action, source),
    }
}

fn report_summary(summary: &BatchSummary) {
    if summary.failed > 0 {
        warn!("{} unit(s) failed", summary.failed);
    }
}

fn handle_merge<S: SegmentStore>(args: &MergeArgs, config: &mut Config, store: &S) -> Result<()> {
    args.apply_to(config);
    config::validate_config(config)?;
    let job = DirectoryMerge {
        input_dir: args.input_dir.clone(),
        output_dir: args.output_dir.clone(),
        extension: config.pattern.extension.clone(),
        policy: config.merge.policy(),
        round_unit: config.merge.round_unit(),
        format: config.merge.output_format,
    };
    let output = merge_directory(store, &job)?;
    println!("{}", output.display());
    Ok(())
}

fn handle_decimate<S: SegmentStore>(
    args: &DecimateArgs,
    config: &mut Config,
    store: &S,
) -> Result<()> {
    args.apply_to(config);
    config::validate_config(config)?;
    let output_dir = output_dir_for(&args.input, args.output_dir.as_deref());
    let result = decimate_file(
        store,
        &args.input,
        &output_dir,
        config.decimate.fs_new,
        &config.decimate.options(),
        config.decimate.output_format,
    )?;
    if result.report.is_adjusted() {
        info!(
            "Requested {} Hz, wrote {} Hz",
            result.report.requested_rate, result.report.effective_rate
        );
    }
    println!("{}", result.output.display());
    Ok(())
}

fn handle_spectrogram<S: SegmentStore>(
    args: &SpectrogramArgs,
    config: &mut Config,
    store: &S,
) -> Result<()> {
    args.apply_to(config);
    config::validate_config(config)?;
    let output_dir = output_dir_for(&args.input, args.output_dir.as_deref());
    let output = spectrogram_file(store, &args.input, &output_dir, &config.spectrogram)?;
    println!("{}", output.display());
    Ok(())
}

fn handle_view<S: SegmentStore>(args: &ViewArgs, store: &S) -> Result<()> {
    let metadata = store.load_metadata(&args.input)?;
    if args.json {
        println!("{}", output::render_json(&args.input, &metadata)?);
    } else {
        print!("{}", output::render_text(&args.input, &metadata));
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction, source: &ConfigSource) -> Result<()> {
    match action {
        ConfigAction::Init => {
            // A working-directory file is only read, never created implicitly.
            let path: PathBuf = match source {
                ConfigSource::Explicit(path) => path.clone(),
                ConfigSource::Local(_) | ConfigSource::Platform(_) => config_file_path()?,
            };
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", render_config(&load_config(source)?)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", source.path().display());
            Ok(())
        }
    }
}
