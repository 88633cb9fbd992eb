//! Single file and single directory processing.

use super::coordinator::{collect_segment_files, ensure_output_dir, file_timestamp, rename_for_format};
use super::reservation::OutputReservation;
use crate::calendar::RoundUnit;
use crate::constants::output::SINGLE_MERGE_PREFIX;
use crate::constants::spectrogram::OUTPUT_EXTENSION;
use crate::decimate::{DecimateOptions, DecimationReport, decimate};
use crate::error::{Error, Result};
use crate::merge::{MergePolicy, merge};
use crate::segment::{SegmentFormat, SegmentStore};
use crate::spectrogram::{SpectrogramOptions, spectrogram};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of decimating one file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimateResult {
    /// Written file.
    pub output: PathBuf,
    /// Factor and rates actually used.
    pub report: DecimationReport,
}

/// Decimate `input` into `output_dir`, keeping its file name (serial suffix on
/// collision).
pub fn decimate_file<S: SegmentStore>(
    store: &S,
    input: &Path,
    output_dir: &Path,
    fs_new: f64,
    options: &DecimateOptions,
    format: SegmentFormat,
) -> Result<DecimateResult> {
    debug!("Decimating {}", input.display());
    let segment = store.load(input)?;
    let (decimated, report) = decimate(segment, fs_new, options)?;

    let name = input
        .file_name()
        .map_or_else(|| "decimated.sac".into(), |n| n.to_string_lossy());
    ensure_output_dir(output_dir)?;
    let reservation = OutputReservation::reserve(output_dir, &rename_for_format(&name, format))?;
    store.save(reservation.path(), &decimated, format)?;
    let output = reservation.commit();

    info!(
        "Wrote {} ({} Hz, factor {})",
        output.display(),
        report.effective_rate,
        report.factor
    );
    Ok(DecimateResult { output, report })
}

/// Write the spectrogram of `input` to `<stem>.json` in `output_dir`.
pub fn spectrogram_file<S: SegmentStore>(
    store: &S,
    input: &Path,
    output_dir: &Path,
    options: &SpectrogramOptions,
) -> Result<PathBuf> {
    debug!("Computing spectrogram of {}", input.display());
    let segment = store.load(input)?;
    let spec = spectrogram(&segment, options)?;

    let json =
        serde_json::to_vec_pretty(&spec).map_err(|source| Error::SpectrogramSerialize { source })?;
    let stem = input
        .file_stem()
        .map_or_else(|| "spectrogram".into(), |n| n.to_string_lossy());
    ensure_output_dir(output_dir)?;
    let reservation = OutputReservation::reserve(output_dir, &format!("{stem}.{OUTPUT_EXTENSION}"))?;
    std::fs::write(reservation.path(), json).map_err(|source| Error::SpectrogramWrite {
        path: reservation.path().to_path_buf(),
        source,
    })?;

    let output = reservation.commit();
    info!(
        "Wrote {} ({} frame(s) x {} bin(s))",
        output.display(),
        spec.frame_count(),
        spec.bin_count()
    );
    Ok(output)
}

/// Settings for merging one directory.
#[derive(Debug, Clone)]
pub struct DirectoryMerge {
    /// Directory holding the segments.
    pub input_dir: PathBuf,
    /// Where to write; defaults to `input_dir`.
    pub output_dir: Option<PathBuf>,
    /// Extension of the segment files.
    pub extension: String,
    /// Overlap and gap handling.
    pub policy: MergePolicy,
    /// Round the merged start time down to this unit.
    pub round_unit: Option<RoundUnit>,
    /// Output format.
    pub format: SegmentFormat,
}

/// Merge every segment file of a directory into `merged_<yyMMddHHmm>.<ext>`.
pub fn merge_directory<S: SegmentStore>(store: &S, job: &DirectoryMerge) -> Result<PathBuf> {
    let files = collect_segment_files(&job.input_dir, &job.extension)?;
    if files.is_empty() {
        return Err(Error::NoMatchingSegments {
            path: job.input_dir.clone(),
        });
    }

    let mut segments = Vec::with_capacity(files.len());
    for file in &files {
        debug!("Adding {}", file.display());
        segments.push(store.load(file)?);
    }

    let mut merged = merge(segments, &job.policy)?;
    if let Some(unit) = job.round_unit {
        merged = merged.round_start(unit);
    }

    let output_dir = job.output_dir.as_deref().unwrap_or(&job.input_dir);
    ensure_output_dir(output_dir)?;
    let extension = match job.format {
        SegmentFormat::Sac => job.extension.as_str(),
        other => other.extension(),
    };
    let name = format!(
        "{SINGLE_MERGE_PREFIX}{}.{extension}",
        file_timestamp(Local::now())
    );

    let reservation = OutputReservation::reserve(output_dir, &name)?;
    store.save(reservation.path(), &merged, job.format)?;
    let output = reservation.commit();
    info!(
        "Merged {} file(s) into {} ({} samples)",
        files.len(),
        output.display(),
        merged.sample_count()
    );
    Ok(output)
}
