//! Input discovery and output naming.

use crate::constants::output::{MERGED_PREFIX, TIMESTAMP_FORMAT};
use crate::constants::pattern::YEAR_TOKEN_SEPARATOR;
use crate::error::{Error, Result};
use crate::segment::SegmentFormat;
use chrono::{DateTime, Local};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Files in `dir` (not recursive) with extension `extension`, sorted by path.
pub fn collect_segment_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OsStr::new(extension)))
}

/// Create `dir` and its parents if needed.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::OutputDirCreateFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Determine the output directory for a file.
pub fn output_dir_for(input: &Path, explicit_output_dir: Option<&Path>) -> PathBuf {
    explicit_output_dir.map_or_else(
        || {
            input
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        },
        Path::to_path_buf,
    )
}

/// `m_<station_stem>.<label>.<extension>`.
pub fn merged_output_name(station_stem: &str, label: &str, extension: &str) -> String {
    format!("{MERGED_PREFIX}{station_stem}.{label}.{extension}")
}

/// Extension for an output: the source's own for SAC, the format's otherwise.
pub fn output_extension(source_extension: &str, format: SegmentFormat) -> String {
    match format {
        SegmentFormat::Sac if !source_extension.is_empty() => source_extension.to_string(),
        other => other.extension().to_string(),
    }
}

/// Replace the extension of `file_name` to match `format`.
pub fn rename_for_format(file_name: &str, format: SegmentFormat) -> String {
    match (format, file_name.rsplit_once('.')) {
        (SegmentFormat::Sac, _) => file_name.to_string(),
        (other, Some((stem, _))) => format!("{stem}.{}", other.extension()),
        (other, None) => format!("{file_name}.{}", other.extension()),
    }
}

/// Calendar year encoded after the last separator of a year token, e.g.
/// `EHZ_2015`.
pub fn year_from_token(token: &str) -> Result<i32> {
    token
        .rsplit_once(YEAR_TOKEN_SEPARATOR)
        .and_then(|(_, year)| year.parse().ok())
        .ok_or_else(|| Error::ConfigValidation {
            message: format!(
                "year token '{token}' must end with '{YEAR_TOKEN_SEPARATOR}<year>', e.g. 'EHZ_2015'"
            ),
        })
}

/// Local timestamp embedded in generated file names.
pub fn file_timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}
