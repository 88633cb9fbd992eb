//! Batch orchestration over station, year and period units.
//!
//! Each unit runs to completion (written, skipped or failed) before the next
//! one starts. A failing unit is logged to the error log and never aborts
//! the batch; settings errors abort before any output is written.

use super::coordinator::{
    collect_segment_files, ensure_output_dir, merged_output_name, output_extension,
    year_from_token,
};
use super::errlog::ErrorLog;
use super::processor::{decimate_file, spectrogram_file};
use super::reservation::OutputReservation;
use crate::calendar::{LabelFormat, PeriodScale, PeriodWindow, RoundUnit};
use crate::decimate::{DecimateOptions, decimate};
use crate::error::{Error, Result};
use crate::filter::{PatternFilter, SegmentDescriptor};
use crate::merge::{MergePolicy, merge};
use crate::output::progress::{
    create_unit_progress, finish_progress, inc_progress, set_progress_message,
};
use crate::segment::{SegmentFormat, SegmentStore};
use crate::spectrogram::SpectrogramOptions;
use chrono::Local;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Filename layout of input segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSettings {
    /// Field delimiter.
    pub delimiter: String,
    /// Positional grammar, e.g. `s.x.x.s.i.x`.
    pub grammar: String,
    /// Extension of candidate files.
    pub extension: String,
}

/// Settings of a merge batch.
#[derive(Debug, Clone)]
pub struct MergeBatchSettings {
    /// Directory with the source segments.
    pub input_dir: PathBuf,
    /// Directory receiving merged records and the error log.
    pub output_dir: PathBuf,
    /// Input filename layout. The grammar needs two literal fields (station,
    /// year token) and an integer solar-day field.
    pub pattern: PatternSettings,
    /// Accepted values of the station field; one group per value.
    pub station_groups: Vec<String>,
    /// Accepted year tokens, e.g. `EHZ_2015`.
    pub year_tokens: Vec<String>,
    /// Length of one merged unit.
    pub scale: PeriodScale,
    /// Period label in output names.
    pub label: LabelFormat,
    /// Overlap and gap handling.
    pub policy: MergePolicy,
    /// Round the start time of each record down to this unit.
    pub round_unit: Option<RoundUnit>,
    /// Decimate each aligned record before it is written.
    pub decimation: Option<DecimationStage>,
    /// Delete contributing sources after a successful year-scale write.
    pub remove_sources: bool,
    /// Output format.
    pub output_format: SegmentFormat,
    /// Show a progress bar.
    pub show_progress: bool,
}

/// Optional downsampling applied to merged records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecimationStage {
    /// Target sampling rate in Hz.
    pub fs_new: f64,
    /// Filter options.
    pub options: DecimateOptions,
}

/// Settings of a decimation batch.
#[derive(Debug, Clone)]
pub struct DecimateBatchSettings {
    /// Directory with the source segments.
    pub input_dir: PathBuf,
    /// Directory receiving decimated files and the error log.
    pub output_dir: PathBuf,
    /// Input filename layout.
    pub pattern: PatternSettings,
    /// One accepted-value set per literal field of the grammar.
    pub accepted: Vec<Vec<String>>,
    /// Inclusive solar-day range.
    pub day_range: Option<RangeInclusive<i64>>,
    /// Target sampling rate in Hz.
    pub fs_new: f64,
    /// Filter options.
    pub options: DecimateOptions,
    /// Output format.
    pub output_format: SegmentFormat,
    /// Show a progress bar.
    pub show_progress: bool,
}

/// Settings of a spectrogram batch.
#[derive(Debug, Clone)]
pub struct SpectrogramBatchSettings {
    /// Directory with the records.
    pub input_dir: PathBuf,
    /// Directory receiving spectrogram files and the error log.
    pub output_dir: PathBuf,
    /// Extension of candidate files.
    pub extension: String,
    /// Frame length and scaling.
    pub options: SpectrogramOptions,
    /// Show a progress bar.
    pub show_progress: bool,
}

/// Counts of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Units with no matching segment.
    pub skipped: usize,
    /// Units that failed and were logged.
    pub failed: usize,
    /// Error log of the run.
    pub error_log: Option<PathBuf>,
}

impl BatchSummary {
    fn log(&self) {
        info!(
            "Batch complete: {} written, {} skipped, {} failed",
            self.written.len(),
            self.skipped,
            self.failed
        );
        if self.failed > 0
            && let Some(path) = &self.error_log
        {
            warn!("See {} for failed units", path.display());
        }
    }
}

/// One station, year token and period window.
#[derive(Debug, Clone)]
pub struct MergeUnit {
    station: String,
    year_token: String,
    window: PeriodWindow,
    filter: PatternFilter,
}

impl MergeUnit {
    /// Station group of the unit.
    pub fn station(&self) -> &str {
        &self.station
    }

    /// Year token of the unit.
    pub fn year_token(&self) -> &str {
        &self.year_token
    }

    /// Calendar window of the unit.
    pub const fn window(&self) -> &PeriodWindow {
        &self.window
    }
}

impl std::fmt::Display for MergeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.station, self.year_token, self.window)
    }
}

/// Validate settings and expand them into the unit cross product.
pub fn plan_merge_units(settings: &MergeBatchSettings) -> Result<Vec<MergeUnit>> {
    if !settings.scale.supports(settings.label) {
        return Err(Error::ConfigValidation {
            message: format!(
                "label '{}' cannot be used with scale '{}'",
                settings.label, settings.scale
            ),
        });
    }
    if settings.remove_sources && settings.scale != PeriodScale::Year {
        return Err(Error::ConfigValidation {
            message: "remove_sources is only allowed with scale 'year'".to_string(),
        });
    }
    if settings.station_groups.is_empty() {
        return Err(Error::ConfigValidation {
            message: "at least one station group is required".to_string(),
        });
    }
    if settings.year_tokens.is_empty() {
        return Err(Error::ConfigValidation {
            message: "at least one year token is required".to_string(),
        });
    }

    let pattern = &settings.pattern;
    let mut units = Vec::new();
    for station in &settings.station_groups {
        for token in &settings.year_tokens {
            let year = year_from_token(token)?;
            for window in settings.scale.windows(year)? {
                let (first, last) = window.solar_day_range();
                let filter = PatternFilter::new(
                    &pattern.delimiter,
                    &pattern.grammar,
                    &[vec![station.as_str()], vec![token.as_str()]],
                )?
                .with_range(i64::from(first)..=i64::from(last))?;
                units.push(MergeUnit {
                    station: station.clone(),
                    year_token: token.clone(),
                    window,
                    filter,
                });
            }
        }
    }
    Ok(units)
}

/// Run a merge batch.
pub fn run_merge_batch<S: SegmentStore>(
    store: &S,
    settings: &MergeBatchSettings,
) -> Result<BatchSummary> {
    let units = plan_merge_units(settings)?;
    let files = collect_segment_files(&settings.input_dir, &settings.pattern.extension)?;
    ensure_output_dir(&settings.output_dir)?;
    let errlog = ErrorLog::create(&settings.output_dir, Local::now())?;

    info!(
        "Merging {} unit(s) from {} candidate file(s) in {}",
        units.len(),
        files.len(),
        settings.input_dir.display()
    );

    let pb = create_unit_progress(units.len(), "units", settings.show_progress);
    let mut summary = BatchSummary {
        error_log: Some(errlog.path().to_path_buf()),
        ..BatchSummary::default()
    };

    for unit in &units {
        set_progress_message(pb.as_ref(), &unit.to_string());
        let selected = unit.filter.select(&files);

        if selected.is_empty() {
            info!("No segments for {unit}, skipping");
            summary.skipped += 1;
        } else {
            debug!("{unit}: {} segment(s)", selected.len());
            match merge_unit(store, settings, unit, &selected) {
                Ok(path) => {
                    info!("Wrote {}", path.display());
                    summary.written.push(path);
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to merge {unit}: {e}");
                    record_failure(&errlog, &e, selected[0].path());
                }
            }
        }
        inc_progress(pb.as_ref());
    }

    finish_progress(pb, "done");
    summary.log();
    Ok(summary)
}

/// Load, merge, align, name and write one unit.
fn merge_unit<S: SegmentStore>(
    store: &S,
    settings: &MergeBatchSettings,
    unit: &MergeUnit,
    selected: &[SegmentDescriptor],
) -> Result<PathBuf> {
    let lead = selected.first().ok_or(Error::EmptyMerge)?;
    let in_unit = |e: Error| e.in_unit(lead.path());

    let mut segments = Vec::with_capacity(selected.len());
    for descriptor in selected {
        let segment = store
            .load(descriptor.path())
            .map_err(|e| e.in_unit(descriptor.path()))?;
        segments.push(segment);
    }

    let merged = merge(segments, &settings.policy).map_err(in_unit)?;
    let window = unit.window();
    let mut record = merged.fit_to(window.start(), window.end(), settings.policy.fill_value);
    if let Some(round) = settings.round_unit {
        record = record.round_start(round);
    }
    if let Some(stage) = &settings.decimation {
        let (decimated, report) = decimate(record, stage.fs_new, &stage.options).map_err(in_unit)?;
        debug!(
            "{unit}: decimated by {} to {} Hz",
            report.factor, report.effective_rate
        );
        record = decimated;
    }

    let label = window.label(settings.label).ok_or_else(|| {
        in_unit(Error::ConfigValidation {
            message: format!("no '{}' label for window {window}", settings.label),
        })
    })?;
    let name = merged_output_name(
        &lead.station_stem(),
        &label,
        &output_extension(lead.extension(), settings.output_format),
    );

    let reservation = OutputReservation::reserve(&settings.output_dir, &name).map_err(in_unit)?;
    store
        .save(reservation.path(), &record, settings.output_format)
        .map_err(in_unit)?;
    let path = reservation.commit();

    if settings.remove_sources && settings.scale == PeriodScale::Year {
        remove_sources(selected);
    }
    Ok(path)
}

fn remove_sources(selected: &[SegmentDescriptor]) {
    for descriptor in selected {
        match std::fs::remove_file(descriptor.path()) {
            Ok(()) => debug!("Removed {}", descriptor.path().display()),
            Err(e) => warn!("Failed to remove {}: {e}", descriptor.path().display()),
        }
    }
}

/// Run a decimation batch.
///
/// An empty match set is an error: there is nothing to do.
pub fn run_decimate_batch<S: SegmentStore>(
    store: &S,
    settings: &DecimateBatchSettings,
) -> Result<BatchSummary> {
    let pattern = &settings.pattern;
    let mut filter = PatternFilter::new(&pattern.delimiter, &pattern.grammar, &settings.accepted)?;
    if let Some(range) = settings.day_range.clone() {
        filter = filter.with_range(range)?;
    }

    let files = collect_segment_files(&settings.input_dir, &pattern.extension)?;
    let selected = filter.select(&files);
    if selected.is_empty() {
        return Err(Error::NoMatchingSegments {
            path: settings.input_dir.clone(),
        });
    }

    ensure_output_dir(&settings.output_dir)?;
    let errlog = ErrorLog::create(&settings.output_dir, Local::now())?;
    info!(
        "Decimating {} file(s) to {} Hz",
        selected.len(),
        settings.fs_new
    );

    let pb = create_unit_progress(selected.len(), "files", settings.show_progress);
    let mut summary = BatchSummary {
        error_log: Some(errlog.path().to_path_buf()),
        ..BatchSummary::default()
    };

    for descriptor in &selected {
        let path = descriptor.path();
        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        set_progress_message(pb.as_ref(), &name);
        match decimate_file(
            store,
            path,
            &settings.output_dir,
            settings.fs_new,
            &settings.options,
            settings.output_format,
        ) {
            Ok(result) => summary.written.push(result.output),
            Err(e) => {
                summary.failed += 1;
                error!("Failed to decimate {}: {e}", path.display());
                record_failure(&errlog, &e.in_unit(path), path);
            }
        }
        inc_progress(pb.as_ref());
    }

    finish_progress(pb, "done");
    summary.log();
    Ok(summary)
}

/// Run a spectrogram batch over every record of a directory.
pub fn run_spectrogram_batch<S: SegmentStore>(
    store: &S,
    settings: &SpectrogramBatchSettings,
) -> Result<BatchSummary> {
    let files = collect_segment_files(&settings.input_dir, &settings.extension)?;
    if files.is_empty() {
        return Err(Error::NoMatchingSegments {
            path: settings.input_dir.clone(),
        });
    }

    ensure_output_dir(&settings.output_dir)?;
    let errlog = ErrorLog::create(&settings.output_dir, Local::now())?;
    info!(
        "Computing spectrograms of {} file(s) with {} s frames",
        files.len(),
        settings.options.frame_seconds
    );

    let pb = create_unit_progress(files.len(), "files", settings.show_progress);
    let mut summary = BatchSummary {
        error_log: Some(errlog.path().to_path_buf()),
        ..BatchSummary::default()
    };

    for path in &files {
        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        set_progress_message(pb.as_ref(), &name);
        match spectrogram_file(store, path, &settings.output_dir, &settings.options) {
            Ok(output) => summary.written.push(output),
            Err(e) => {
                summary.failed += 1;
                error!("Failed to compute spectrogram of {}: {e}", path.display());
                record_failure(&errlog, &e.in_unit(path), path);
            }
        }
        inc_progress(pb.as_ref());
    }

    finish_progress(pb, "done");
    summary.log();
    Ok(summary)
}

/// Append to the error log, attributing the failure to the unit's source file.
fn record_failure(errlog: &ErrorLog, error: &Error, fallback: &Path) {
    let source = match error {
        Error::Unit { path, .. } => path.as_path(),
        _ => fallback,
    };
    if let Err(e) = errlog.append(source, error) {
        warn!("Failed to write error log {}: {e}", errlog.path().display());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::constants::pattern::{DEFAULT_DELIMITER, DEFAULT_MERGE_GRAMMAR};

    fn settings(scale: PeriodScale, label: LabelFormat) -> MergeBatchSettings {
        MergeBatchSettings {
            input_dir: PathBuf::from("/in"),
            output_dir: PathBuf::from("/out"),
            pattern: PatternSettings {
                delimiter: DEFAULT_DELIMITER.to_string(),
                grammar: DEFAULT_MERGE_GRAMMAR.to_string(),
                extension: "sac".to_string(),
            },
            station_groups: vec!["STA01".to_string(), "STA02".to_string()],
            year_tokens: vec!["EHZ_2015".to_string(), "EHZ_2016".to_string()],
            scale,
            label,
            policy: MergePolicy::default(),
            round_unit: None,
            decimation: None,
            remove_sources: false,
            output_format: SegmentFormat::Sac,
            show_progress: false,
        }
    }

    #[test]
    fn test_plan_month_units() {
        let units = plan_merge_units(&settings(PeriodScale::Month, LabelFormat::SolarDay)).unwrap();
        assert_eq!(units.len(), 2 * 2 * 12);
        assert_eq!(units[0].station(), "STA01");
        assert_eq!(units[0].year_token(), "EHZ_2015");
        assert_eq!(units[2].window().solar_day_range(), (60, 90));
        assert_eq!(units[2].to_string(), "STA01 EHZ_2015 2015-03");
    }

    #[test]
    fn test_plan_unit_filters_by_window() {
        let units = plan_merge_units(&settings(PeriodScale::Month, LabelFormat::SolarDay)).unwrap();
        let march = &units[2];
        assert!(march.filter.matches("STA01.TW.00.EHZ_2015.060.sac"));
        assert!(!march.filter.matches("STA01.TW.00.EHZ_2015.091.sac"));
        assert!(!march.filter.matches("STA02.TW.00.EHZ_2015.060.sac"));
        assert!(!march.filter.matches("STA01.TW.00.EHZ_2016.060.sac"));
    }

    #[test]
    fn test_plan_year_units() {
        let units = plan_merge_units(&settings(PeriodScale::Year, LabelFormat::Year)).unwrap();
        assert_eq!(units.len(), 4);
        assert_eq!(units[1].window().solar_day_range(), (1, 366));
    }

    #[test]
    fn test_plan_rejects_label_scale_mismatch() {
        let err = plan_merge_units(&settings(PeriodScale::Year, LabelFormat::Month)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_plan_rejects_remove_sources_for_months() {
        let mut s = settings(PeriodScale::Month, LabelFormat::SolarDay);
        s.remove_sources = true;
        assert!(plan_merge_units(&s).is_err());
    }

    #[test]
    fn test_plan_rejects_bad_year_token() {
        let mut s = settings(PeriodScale::Month, LabelFormat::SolarDay);
        s.year_tokens = vec!["EHZ".to_string()];
        assert!(matches!(
            plan_merge_units(&s),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_plan_rejects_grammar_without_two_literals() {
        let mut s = settings(PeriodScale::Month, LabelFormat::SolarDay);
        s.pattern.grammar = "s.x.x.x.i.x".to_string();
        assert!(matches!(plan_merge_units(&s), Err(Error::Grammar { .. })));
    }
}
