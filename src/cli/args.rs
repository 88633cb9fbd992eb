//! CLI argument definitions.

use super::validators::{
    AcceptedSet, parse_accepted_set, parse_day_range, parse_fill_value, parse_rate, parse_seconds,
};
use crate::calendar::{LabelFormat, PeriodScale, RoundUnit};
use crate::config::{Config, DecimateConfig, MergeConfig};
use crate::spectrogram::SpectrogramOptions;
use crate::merge::OverlapMethod;
use crate::segment::SegmentFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Consolidate SAC seismic segments into calendar-aligned continuous records.
#[derive(Debug, Parser)]
#[command(name = "sacmerge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by all commands.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by all commands.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "SACMERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors, and hide progress.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Hide progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

impl GlobalArgs {
    /// Whether progress bars should be drawn.
    pub const fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge station segments into month or year records.
    MergeBatch(MergeBatchArgs),
    /// Decimate every matching segment of a directory.
    DecimateBatch(DecimateBatchArgs),
    /// Merge all segments of one directory into a single record.
    Merge(MergeArgs),
    /// Decimate one segment file.
    Decimate(DecimateArgs),
    /// Compute short-time magnitude spectra of every record of a directory.
    SpectrogramBatch(SpectrogramBatchArgs),
    /// Compute short-time magnitude spectra of one record.
    Spectrogram(SpectrogramArgs),
    /// Print header fields of a segment file.
    View(ViewArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Filename layout overrides.
#[derive(Debug, Args)]
pub struct PatternArgs {
    /// Field delimiter of segment filenames.
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Filename grammar: `s` literal, `x` ignored, `i` integer (e.g. s.x.x.s.i.x).
    #[arg(long)]
    pub grammar: Option<String>,

    /// Extension of segment files.
    #[arg(long)]
    pub extension: Option<String>,
}

/// Overlap and gap handling.
#[derive(Debug, Args)]
pub struct MergeOptionArgs {
    /// Overlap resolution.
    #[arg(long, value_enum, env = "SACMERGE_METHOD")]
    pub method: Option<OverlapMethod>,

    /// Crossfade length in samples (negative: whole overlap).
    #[arg(long, allow_negative_numbers = true)]
    pub interpolation_samples: Option<i64>,

    /// Value for missing samples.
    #[arg(long, value_parser = parse_fill_value, allow_negative_numbers = true,
          conflicts_with = "no_fill", env = "SACMERGE_FILL_VALUE")]
    pub fill_value: Option<f32>,

    /// Leave missing samples unfilled (units with gaps then fail).
    #[arg(long)]
    pub no_fill: bool,

    /// Keep the start time as merged instead of rounding it.
    #[arg(long)]
    pub no_round_time: bool,

    /// Unit the start time is rounded down to.
    #[arg(long, value_enum)]
    pub round_unit: Option<RoundUnit>,
}

impl MergeOptionArgs {
    fn apply_to(&self, merge: &mut MergeConfig) {
        if let Some(method) = self.method {
            merge.method = method;
        }
        if let Some(n) = self.interpolation_samples {
            merge.interpolation_samples = n;
        }
        if let Some(value) = self.fill_value {
            merge.fill_gaps = true;
            merge.fill_value = value;
        }
        if self.no_fill {
            merge.fill_gaps = false;
        }
        if self.no_round_time {
            merge.round_time = false;
        }
        if let Some(unit) = self.round_unit {
            merge.round_unit = unit;
        }
    }
}

/// Arguments for `merge-batch`.
#[derive(Debug, Args)]
pub struct MergeBatchArgs {
    /// Directory with the source segments.
    pub input_dir: PathBuf,

    /// Output directory for merged records and the error log.
    #[arg(short, long, env = "SACMERGE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Station values to merge, one group each (comma-separated).
    #[arg(short, long = "station", value_delimiter = ',')]
    pub stations: Vec<String>,

    /// Year tokens such as EHZ_2015 (comma-separated).
    #[arg(short, long = "year-token", value_delimiter = ',')]
    pub year_tokens: Vec<String>,

    /// Length of one merged record.
    #[arg(long, value_enum)]
    pub scale: Option<PeriodScale>,

    /// Period label in output names.
    #[arg(long, value_enum)]
    pub label: Option<LabelFormat>,

    /// Delete source segments after each successful year record.
    #[arg(long)]
    pub remove_sources: bool,

    /// Decimate each merged record to this rate in Hz before writing.
    #[arg(long, value_parser = parse_rate)]
    pub decimate_to: Option<f64>,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<SegmentFormat>,

    /// Overlap and gap handling.
    #[command(flatten)]
    pub merge: MergeOptionArgs,

    /// Filename layout.
    #[command(flatten)]
    pub pattern: PatternArgs,
}

impl MergeBatchArgs {
    /// Overlay these arguments on `config`.
    pub fn apply_to(&self, config: &mut Config) {
        let merge = &mut config.merge;
        if !self.stations.is_empty() {
            merge.station_groups.clone_from(&self.stations);
        }
        if !self.year_tokens.is_empty() {
            merge.year_tokens.clone_from(&self.year_tokens);
        }
        if let Some(scale) = self.scale {
            merge.scale = scale;
        }
        if let Some(label) = self.label {
            merge.label = label;
        }
        if self.remove_sources {
            merge.remove_sources = true;
        }
        if self.decimate_to.is_some() {
            merge.decimate_to = self.decimate_to;
        }
        if let Some(format) = self.format {
            merge.output_format = format;
        }
        self.merge.apply_to(merge);

        let pattern = &mut config.pattern;
        if let Some(delimiter) = &self.pattern.delimiter {
            pattern.delimiter.clone_from(delimiter);
        }
        if let Some(grammar) = &self.pattern.grammar {
            pattern.merge_grammar.clone_from(grammar);
        }
        if let Some(extension) = &self.pattern.extension {
            pattern.extension.clone_from(extension);
        }
    }
}

/// Decimation options.
#[derive(Debug, Args)]
pub struct DecimateOptionArgs {
    /// Target sampling rate in Hz.
    #[arg(long, value_parser = parse_rate, env = "SACMERGE_FS_NEW")]
    pub fs_new: Option<f64>,

    /// Keep the DC component instead of removing the mean.
    #[arg(long)]
    pub keep_dc: bool,

    /// Round the output start time.
    #[arg(long)]
    pub round_time: bool,

    /// Unit the start time is rounded down to.
    #[arg(long, value_enum)]
    pub round_unit: Option<RoundUnit>,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<SegmentFormat>,
}

impl DecimateOptionArgs {
    fn apply_to(&self, decimate: &mut DecimateConfig) {
        if let Some(fs_new) = self.fs_new {
            decimate.fs_new = fs_new;
        }
        if self.keep_dc {
            decimate.remove_dc = false;
        }
        if self.round_time {
            decimate.round_time = true;
        }
        if let Some(unit) = self.round_unit {
            decimate.round_unit = unit;
        }
        if let Some(format) = self.format {
            decimate.output_format = format;
        }
    }
}

/// Arguments for `decimate-batch`.
#[derive(Debug, Args)]
pub struct DecimateBatchArgs {
    /// Directory with the source segments.
    pub input_dir: PathBuf,

    /// Output directory for decimated files and the error log.
    #[arg(short, long, env = "SACMERGE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Accepted values for one literal field, comma-separated; repeat once
    /// per literal field in grammar order.
    #[arg(short, long = "accept", value_parser = parse_accepted_set)]
    pub accepted: Vec<AcceptedSet>,

    /// Inclusive solar-day range, e.g. 60-90.
    #[arg(long, value_parser = parse_day_range)]
    pub days: Option<[i64; 2]>,

    /// Decimation options.
    #[command(flatten)]
    pub decimate: DecimateOptionArgs,

    /// Filename layout.
    #[command(flatten)]
    pub pattern: PatternArgs,
}

impl DecimateBatchArgs {
    /// Overlay these arguments on `config`.
    pub fn apply_to(&self, config: &mut Config) {
        let decimate = &mut config.decimate;
        if !self.accepted.is_empty() {
            decimate.accepted = self.accepted.iter().map(|set| set.0.clone()).collect();
        }
        if self.days.is_some() {
            decimate.day_range = self.days;
        }
        self.decimate.apply_to(decimate);

        let pattern = &mut config.pattern;
        if let Some(delimiter) = &self.pattern.delimiter {
            pattern.delimiter.clone_from(delimiter);
        }
        if let Some(grammar) = &self.pattern.grammar {
            pattern.decimate_grammar.clone_from(grammar);
        }
        if let Some(extension) = &self.pattern.extension {
            pattern.extension.clone_from(extension);
        }
    }
}

/// Arguments for `merge`.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Directory whose segments are merged.
    pub input_dir: PathBuf,

    /// Output directory (default: the input directory).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Extension of segment files.
    #[arg(long)]
    pub extension: Option<String>,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<SegmentFormat>,

    /// Overlap and gap handling.
    #[command(flatten)]
    pub merge: MergeOptionArgs,
}

impl MergeArgs {
    /// Overlay these arguments on `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(extension) = &self.extension {
            config.pattern.extension.clone_from(extension);
        }
        if let Some(format) = self.format {
            config.merge.output_format = format;
        }
        self.merge.apply_to(&mut config.merge);
    }
}

/// Arguments for `decimate`.
#[derive(Debug, Args)]
pub struct DecimateArgs {
    /// Segment file to decimate.
    pub input: PathBuf,

    /// Output directory (default: next to the input; name gets a serial suffix).
    #[arg(short, long, env = "SACMERGE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Decimation options.
    #[command(flatten)]
    pub decimate: DecimateOptionArgs,
}

impl DecimateArgs {
    /// Overlay these arguments on `config`.
    pub fn apply_to(&self, config: &mut Config) {
        self.decimate.apply_to(&mut config.decimate);
    }
}

/// Spectrogram options.
#[derive(Debug, Args)]
pub struct SpectrogramOptionArgs {
    /// Frame length in seconds (default: one hour).
    #[arg(long, value_parser = parse_seconds)]
    pub frame_seconds: Option<f64>,

    /// Keep raw magnitudes instead of rescaling them to [0, 1].
    #[arg(long)]
    pub no_normalize: bool,
}

impl SpectrogramOptionArgs {
    fn apply_to(&self, spectrogram: &mut SpectrogramOptions) {
        if let Some(seconds) = self.frame_seconds {
            spectrogram.frame_seconds = seconds;
        }
        if self.no_normalize {
            spectrogram.normalize = false;
        }
    }
}

/// Arguments for `spectrogram-batch`.
#[derive(Debug, Args)]
pub struct SpectrogramBatchArgs {
    /// Directory with the records.
    pub input_dir: PathBuf,

    /// Output directory for spectrogram files and the error log.
    #[arg(short, long, env = "SACMERGE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Extension of record files.
    #[arg(long)]
    pub extension: Option<String>,

    /// Spectrogram options.
    #[command(flatten)]
    pub spectrogram: SpectrogramOptionArgs,
}

impl SpectrogramBatchArgs {
    /// Overlay these arguments on `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(extension) = &self.extension {
            config.pattern.extension.clone_from(extension);
        }
        self.spectrogram.apply_to(&mut config.spectrogram);
    }
}

/// Arguments for `spectrogram`.
#[derive(Debug, Args)]
pub struct SpectrogramArgs {
    /// Record to analyse.
    pub input: PathBuf,

    /// Output directory (default: next to the input).
    #[arg(short, long, env = "SACMERGE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Spectrogram options.
    #[command(flatten)]
    pub spectrogram: SpectrogramOptionArgs,
}

impl SpectrogramArgs {
    /// Overlay these arguments on `config`.
    pub fn apply_to(&self, config: &mut Config) {
        self.spectrogram.apply_to(&mut config.spectrogram);
    }
}

/// Arguments for `view`.
#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Segment file to inspect.
    pub input: PathBuf,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_merge_batch() {
        let cli = Cli::try_parse_from([
            "sacmerge",
            "merge-batch",
            "/data/in",
            "-o",
            "/data/out",
            "--station",
            "STA01,STA02",
            "--year-token",
            "EHZ_2015",
            "--scale",
            "year",
            "--label",
            "solarday",
            "--method",
            "keep-last",
            "--interpolation-samples",
            "-1",
            "--decimate-to",
            "0.5",
            "-q",
        ])
        .unwrap();

        assert!(cli.global.quiet);
        assert!(!cli.global.show_progress());
        let Command::MergeBatch(args) = cli.command else {
            panic!("expected merge-batch");
        };
        assert_eq!(args.stations, vec!["STA01", "STA02"]);

        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.merge.station_groups, vec!["STA01", "STA02"]);
        assert_eq!(config.merge.year_tokens, vec!["EHZ_2015"]);
        assert_eq!(config.merge.scale, PeriodScale::Year);
        assert_eq!(config.merge.method, OverlapMethod::KeepLast);
        assert_eq!(config.merge.interpolation_samples, -1);
        assert_eq!(config.merge.decimate_to, Some(0.5));
    }

    #[test]
    fn test_cli_fill_conflicts_with_no_fill() {
        let cli = Cli::try_parse_from([
            "sacmerge", "merge", "/data", "--fill-value", "1", "--no-fill",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_merge_no_fill() {
        let cli = Cli::try_parse_from(["sacmerge", "merge", "/data", "--no-fill"]).unwrap();
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.merge.policy().fill_value, None);
    }

    #[test]
    fn test_cli_parse_decimate_batch() {
        let cli = Cli::try_parse_from([
            "sacmerge",
            "decimate-batch",
            "/data/in",
            "-o",
            "/data/out",
            "--accept",
            "STA01",
            "--accept",
            "TW",
            "--accept",
            "EHZ_2015",
            "--days",
            "60-90",
            "--fs-new",
            "0.5",
            "--keep-dc",
        ])
        .unwrap();

        let Command::DecimateBatch(args) = cli.command else {
            panic!("expected decimate-batch");
        };
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.decimate.accepted.len(), 3);
        assert_eq!(config.decimate.day_range(), Some(60..=90));
        assert_eq!(config.decimate.fs_new, 0.5);
        assert!(!config.decimate.remove_dc);
    }

    #[test]
    fn test_cli_parse_spectrogram() {
        let cli = Cli::try_parse_from([
            "sacmerge",
            "spectrogram",
            "m_STA01.sac",
            "--frame-seconds",
            "600",
            "--no-normalize",
        ])
        .unwrap();
        let Command::Spectrogram(args) = cli.command else {
            panic!("expected spectrogram");
        };
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.spectrogram.frame_seconds, 600.0);
        assert!(!config.spectrogram.normalize);

        let bad = Cli::try_parse_from(["sacmerge", "spectrogram", "a.sac", "--frame-seconds", "-1"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_cli_rejects_bad_rate() {
        let cli = Cli::try_parse_from(["sacmerge", "decimate", "a.sac", "--fs-new", "0"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["sacmerge", "config", "show"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sacmerge", "view", "a.sac", "--json", "-vv"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert!(cli.global.show_progress());
    }
}
