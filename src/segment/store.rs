//! Segment persistence.

use super::{ChannelId, WaveformSegment, sac, wav};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk format of a written segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SegmentFormat {
    /// SAC binary.
    #[default]
    Sac,
    /// 32-bit float WAV (write-only).
    Wav,
}

impl SegmentFormat {
    /// Canonical file extension.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Sac => "sac",
            Self::Wav => "wav",
        }
    }
}

impl std::fmt::Display for SegmentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Header fields of a segment file, without samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMetadata {
    /// Channel identity.
    pub channel: ChannelId,
    /// Sampling rate in Hz.
    pub sampling_rate: f64,
    /// Time of the first sample.
    pub start_time: DateTime<Utc>,
    /// Number of samples.
    pub sample_count: usize,
}

impl SegmentMetadata {
    /// Sample interval in seconds.
    pub fn delta(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    /// Time of the last sample.
    pub fn end_time(&self) -> DateTime<Utc> {
        let last = i64::try_from(self.sample_count.saturating_sub(1)).unwrap_or(i64::MAX);
        self.start_time + super::samples_to_duration(last, self.sampling_rate)
    }
}

/// Load and save waveform segments.
pub trait SegmentStore {
    /// Load a whole segment.
    fn load(&self, path: &Path) -> Result<WaveformSegment>;

    /// Load header fields only.
    fn load_metadata(&self, path: &Path) -> Result<SegmentMetadata>;

    /// Write `segment` to `path` in `format`.
    fn save(&self, path: &Path, segment: &WaveformSegment, format: SegmentFormat) -> Result<()>;
}

/// Filesystem store reading SAC and writing SAC or WAV.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl SegmentStore for FileStore {
    fn load(&self, path: &Path) -> Result<WaveformSegment> {
        ensure_readable(path)?;
        sac::read(path)
    }

    fn load_metadata(&self, path: &Path) -> Result<SegmentMetadata> {
        ensure_readable(path)?;
        sac::read_metadata(path)
    }

    fn save(&self, path: &Path, segment: &WaveformSegment, format: SegmentFormat) -> Result<()> {
        match format {
            SegmentFormat::Sac => sac::write(path, segment),
            SegmentFormat::Wav => wav::write(path, segment),
        }
    }
}

fn ensure_readable(path: &Path) -> Result<()> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SegmentFormat::Wav.extension()));
    if is_wav {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: "WAV files can be written but not read back as segments".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use tempfile::TempDir;

    fn segment() -> WaveformSegment {
        WaveformSegment::new(
            ChannelId::new("TW", "STA01", "00", "EHZ"),
            10.0,
            Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap(),
            vec![0.5; 11],
        )
    }

    #[test]
    fn test_file_store_sac_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.sac");
        let store = FileStore;
        store.save(&path, &segment(), SegmentFormat::Sac).unwrap();

        let meta = store.load_metadata(&path).unwrap();
        assert_eq!(meta.sample_count, 11);
        assert_eq!(meta.end_time(), meta.start_time + TimeDelta::seconds(1));
        assert_eq!(store.load(&path).unwrap().samples(), segment().samples());
    }

    #[test]
    fn test_file_store_rejects_reading_wav() {
        let err = FileStore.load(Path::new("clip.wav")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(SegmentFormat::Sac.extension(), "sac");
        assert_eq!(SegmentFormat::Wav.to_string(), "wav");
    }
}
