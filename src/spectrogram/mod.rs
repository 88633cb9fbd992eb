//! Short-time magnitude spectra of a waveform record.
//!
//! The record is cut into back-to-back frames of equal length (one hour by
//! default). Each frame is Hann-windowed and transformed; the one-sided
//! magnitude is scaled by the window sum and by the record length, then the
//! whole matrix is optionally min-max normalized to `[0, 1]`.

use crate::constants::spectrogram::DEFAULT_FRAME_SECONDS;
use crate::error::{Error, Result};
use crate::segment::{WaveformSegment, samples_to_duration};
use chrono::{DateTime, Utc};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Frame length and scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramOptions {
    /// Frame length in seconds.
    pub frame_seconds: f64,
    /// Rescale all magnitudes to `[0, 1]`.
    pub normalize: bool,
}

impl Default for SpectrogramOptions {
    fn default() -> Self {
        Self {
            frame_seconds: DEFAULT_FRAME_SECONDS,
            normalize: true,
        }
    }
}

/// Magnitude spectra, one row per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrogram {
    /// Channel as `net.sta.loc.cha`.
    pub channel: String,
    /// Sampling rate of the source in Hz.
    pub sampling_rate: f64,
    /// Samples per frame.
    pub frame_samples: usize,
    /// Spacing of the frequency bins in Hz.
    pub frequency_step: f64,
    /// Whether magnitudes were min-max normalized.
    pub normalized: bool,
    /// Start time of each frame.
    pub frame_starts: Vec<DateTime<Utc>>,
    /// Bin frequencies in Hz, from 0 up to Nyquist.
    pub frequencies: Vec<f64>,
    /// `magnitudes[frame][bin]`.
    pub magnitudes: Vec<Vec<f64>>,
}

impl Spectrogram {
    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frame_starts.len()
    }

    /// Number of frequency bins.
    pub fn bin_count(&self) -> usize {
        self.frequencies.len()
    }
}

/// Compute the spectrogram of a materialized segment.
///
/// Trailing samples that do not fill a whole frame are dropped.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn spectrogram(segment: &WaveformSegment, options: &SpectrogramOptions) -> Result<Spectrogram> {
    if !segment.is_materialized() {
        return Err(Error::UnmaterializedMask {
            missing: segment.missing_count(),
        });
    }

    let rate = segment.sampling_rate();
    let frame_len = (options.frame_seconds * rate).floor();
    if !frame_len.is_finite() || frame_len < 2.0 {
        return Err(Error::SpectrogramFrame {
            message: format!(
                "{} s at {rate} Hz gives fewer than 2 samples per frame",
                options.frame_seconds
            ),
        });
    }
    let frame_len = frame_len as usize;
    let samples = segment.samples();
    let frame_count = samples.len() / frame_len;
    if frame_count == 0 {
        return Err(Error::SpectrogramFrame {
            message: format!(
                "record of {} sample(s) is shorter than one frame of {frame_len}",
                samples.len()
            ),
        });
    }
    debug!("Spectrogram: {frame_count} frame(s) of {frame_len} samples");

    let window = hann(frame_len);
    let scale = window.iter().sum::<f64>() * samples.len() as f64;
    let bins = frame_len / 2 + 1;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(frame_len);
    let mut buffer = vec![Complex::new(0.0, 0.0); frame_len];

    let mut magnitudes = Vec::with_capacity(frame_count);
    for frame in samples.chunks_exact(frame_len) {
        for ((slot, &x), &w) in buffer.iter_mut().zip(frame).zip(&window) {
            *slot = Complex::new(f64::from(x) * w, 0.0);
        }
        fft.process(&mut buffer);
        magnitudes.push(buffer[..bins].iter().map(|c| c.norm() / scale).collect());
    }

    if options.normalize {
        normalize(&mut magnitudes);
    }

    let frequency_step = rate / frame_len as f64;
    let start = segment.start_time();
    Ok(Spectrogram {
        channel: segment.channel().to_string(),
        sampling_rate: rate,
        frame_samples: frame_len,
        frequency_step,
        normalized: options.normalize,
        frame_starts: (0..frame_count)
            .map(|i| start + samples_to_duration((i * frame_len) as i64, rate))
            .collect(),
        frequencies: (0..bins).map(|k| k as f64 * frequency_step).collect(),
        magnitudes,
    })
}

/// Symmetric Hann window.
#[allow(clippy::cast_precision_loss)]
fn hann(len: usize) -> Vec<f64> {
    let denom = (len - 1) as f64;
    (0..len)
        .map(|k| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * k as f64 / denom).cos())
        .collect()
}

/// Min-max rescale in place; a flat matrix becomes all zeros.
fn normalize(rows: &mut [Vec<f64>]) {
    let (min, max) = rows
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    for v in rows.iter_mut().flatten() {
        *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;
    use crate::segment::ChannelId;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap()
    }

    fn tone(rate: f64, freq: f64, seconds: usize) -> WaveformSegment {
        let n = (rate as usize) * seconds;
        let samples = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin() as f32)
            .collect();
        WaveformSegment::new(ChannelId::new("TW", "STA01", "00", "EHZ"), rate, t0(), samples)
    }

    fn options(frame_seconds: f64, normalize: bool) -> SpectrogramOptions {
        SpectrogramOptions {
            frame_seconds,
            normalize,
        }
    }

    #[test]
    fn test_frames_and_bins() {
        // 10 s at 16 Hz, 4 s frames: two whole frames, 8 s of data used.
        let spec = spectrogram(&tone(16.0, 2.0, 10), &options(4.0, false)).unwrap();
        assert_eq!(spec.frame_samples, 64);
        assert_eq!(spec.frame_count(), 2);
        assert_eq!(spec.bin_count(), 33);
        assert_eq!(spec.frequency_step, 0.25);
        assert_eq!(spec.frequencies[32], 8.0);
        assert_eq!(spec.frame_starts, vec![t0(), t0() + TimeDelta::seconds(4)]);
    }

    #[test]
    fn test_peak_at_tone_frequency() {
        let spec = spectrogram(&tone(16.0, 2.0, 8), &options(4.0, false)).unwrap();
        for row in &spec.magnitudes {
            let peak = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(k, _)| k)
                .unwrap();
            assert_eq!(spec.frequencies[peak], 2.0);
        }
    }

    #[test]
    fn test_normalized_range() {
        let spec = spectrogram(&tone(16.0, 3.0, 8), &options(4.0, true)).unwrap();
        let all: Vec<f64> = spec.magnitudes.iter().flatten().copied().collect();
        assert_eq!(all.iter().copied().fold(f64::INFINITY, f64::min), 0.0);
        assert_eq!(all.iter().copied().fold(f64::NEG_INFINITY, f64::max), 1.0);
        assert!(spec.normalized);
    }

    #[test]
    fn test_constant_record_normalizes_to_zero() {
        let flat = WaveformSegment::new(ChannelId::new("TW", "STA01", "00", "EHZ"), 4.0, t0(), vec![0.0; 16]);
        let spec = spectrogram(&flat, &options(2.0, true)).unwrap();
        assert!(spec.magnitudes.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_frame_longer_than_record() {
        let err = spectrogram(&tone(16.0, 2.0, 2), &options(4.0, false)).unwrap_err();
        assert!(matches!(err, Error::SpectrogramFrame { .. }));
    }

    #[test]
    fn test_frame_needs_two_samples() {
        // Hourly data with one-hour frames.
        let hourly = WaveformSegment::new(
            ChannelId::new("TW", "STA01", "00", "EHZ"),
            1.0 / 3600.0,
            t0(),
            vec![1.0; 24],
        );
        let err = spectrogram(&hourly, &SpectrogramOptions::default()).unwrap_err();
        assert!(matches!(err, Error::SpectrogramFrame { .. }));
    }

    #[test]
    fn test_gaps_rejected() {
        let gappy = tone(16.0, 2.0, 8).with_gaps(vec![3..5]);
        assert!(matches!(
            spectrogram(&gappy, &options(4.0, false)),
            Err(Error::UnmaterializedMask { missing: 2 })
        ));
    }
}
