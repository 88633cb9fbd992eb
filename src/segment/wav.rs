//! WAV export.

use super::WaveformSegment;
use crate::error::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Write a gap-free segment as mono 32-bit float WAV.
///
/// WAV headers store an integer sample rate, so fractional rates are rejected.
pub fn write(path: &Path, segment: &WaveformSegment) -> Result<()> {
    if !segment.is_materialized() {
        return Err(Error::UnmaterializedMask {
            missing: segment.missing_count(),
        });
    }

    let sample_rate = integral_rate(segment.sampling_rate()).ok_or_else(|| {
        Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!(
                "WAV needs an integral sampling rate, segment has {} Hz",
                segment.sampling_rate()
            ),
        }
    })?;

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let wav_err = |e| Error::WavWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let mut writer = WavWriter::create(path, spec).map_err(wav_err)?;
    for &sample in segment.samples() {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral_rate(rate: f64) -> Option<u32> {
    let rounded = rate.round();
    if rounded < 1.0 || rounded > f64::from(u32::MAX) || (rate - rounded).abs() > 1e-9 {
        return None;
    }
    Some(rounded as u32)
}
