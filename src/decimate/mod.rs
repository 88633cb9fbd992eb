//! Integer-factor decimation with an anti-aliasing low-pass.
//!
//! The filter is a zero-phase windowed-sinc FIR, so output samples stay
//! aligned with the input time base and the start time is unchanged.

mod fir;

pub use fir::lowpass_taps;

use crate::calendar::RoundUnit;
use crate::constants::RATE_TOLERANCE;
use crate::error::{Error, Result};
use crate::segment::{SegmentParts, WaveformSegment};
use serde::Serialize;
use tracing::{debug, warn};

/// Decimation settings besides the target rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecimateOptions {
    /// Subtract the mean before filtering.
    pub remove_dc: bool,
    /// Round the output start time down to this unit.
    pub round_unit: Option<RoundUnit>,
}

/// What a decimation actually did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecimationReport {
    /// Integer factor applied.
    pub factor: usize,
    /// Rate the caller asked for.
    pub requested_rate: f64,
    /// Resulting rate, `source_rate / factor`.
    pub effective_rate: f64,
}

impl DecimationReport {
    /// Whether the effective rate differs from the request.
    pub fn is_adjusted(&self) -> bool {
        (self.effective_rate - self.requested_rate).abs()
            > RATE_TOLERANCE * self.requested_rate.abs()
    }
}

/// Integer factor used to reach `fs_new` from `source_rate`.
pub fn decimation_factor(source_rate: f64, fs_new: f64) -> Result<usize> {
    let invalid = || Error::InvalidRate {
        requested: fs_new,
        source_rate,
    };
    if !fs_new.is_finite() || fs_new <= 0.0 || fs_new > source_rate * (1.0 + RATE_TOLERANCE) {
        return Err(invalid());
    }
    let ratio = (source_rate / fs_new * (1.0 + RATE_TOLERANCE)).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let factor = ratio as usize;
    if factor == 0 {
        return Err(invalid());
    }
    Ok(factor)
}

/// Downsample `segment` towards `fs_new`.
///
/// The factor is `floor(source_rate / fs_new)`; the report carries the rate
/// actually produced.
pub fn decimate(
    segment: WaveformSegment,
    fs_new: f64,
    options: &DecimateOptions,
) -> Result<(WaveformSegment, DecimationReport)> {
    if !segment.is_materialized() {
        return Err(Error::UnmaterializedMask {
            missing: segment.missing_count(),
        });
    }

    let source_rate = segment.sampling_rate();
    let factor = decimation_factor(source_rate, fs_new)?;
    #[allow(clippy::cast_precision_loss)]
    let report = DecimationReport {
        factor,
        requested_rate: fs_new,
        effective_rate: source_rate / factor as f64,
    };
    if report.is_adjusted() {
        warn!(
            "Requested {fs_new} Hz is not an integer divisor of {source_rate} Hz; output rate is {} Hz (factor {factor})",
            report.effective_rate
        );
    }

    let SegmentParts {
        channel,
        start_time,
        mut samples,
        provenance,
        ..
    } = segment.into_parts();

    if options.remove_dc {
        remove_mean(&mut samples);
    }

    let samples = if factor == 1 {
        samples
    } else {
        let taps = lowpass_taps(factor);
        debug!("Decimating by {factor} with {} taps", taps.len());
        fir::filter_decimate(&samples, &taps, factor)
    };

    let start_time = options
        .round_unit
        .map_or(start_time, |unit| crate::calendar::round_time(start_time, unit));

    let decimated = WaveformSegment::from_parts(SegmentParts {
        channel,
        sampling_rate: report.effective_rate,
        start_time,
        samples,
        gaps: Vec::new(),
        provenance,
    });
    Ok((decimated, report))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn remove_mean(samples: &mut [f32]) {
    if samples.is_empty() {
        return;
    }
    let mean = samples.iter().map(|&v| f64::from(v)).sum::<f64>() / samples.len() as f64;
    let mean = mean as f32;
    samples.iter_mut().for_each(|v| *v -= mean);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::segment::ChannelId;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap()
    }

    fn seg(rate: f64, samples: Vec<f32>) -> WaveformSegment {
        WaveformSegment::new(ChannelId::new("TW", "STA01", "00", "EHZ"), rate, t0(), samples)
    }

    #[test]
    fn test_factor_is_floored() {
        assert_eq!(decimation_factor(100.0, 30.0).unwrap(), 3);
        assert_eq!(decimation_factor(100.0, 10.0).unwrap(), 10);
        assert_eq!(decimation_factor(100.0, 100.0).unwrap(), 1);
        assert_eq!(decimation_factor(0.1, 0.01).unwrap(), 10);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(matches!(
            decimation_factor(100.0, 200.0),
            Err(Error::InvalidRate { .. })
        ));
        assert!(decimation_factor(100.0, 0.0).is_err());
        assert!(decimation_factor(100.0, -1.0).is_err());
        assert!(decimation_factor(100.0, f64::NAN).is_err());
    }

    #[test]
    fn test_effective_rate_is_reported() {
        let (out, report) = decimate(seg(100.0, vec![1.0; 300]), 30.0, &DecimateOptions::default()).unwrap();
        assert_eq!(report.factor, 3);
        assert_eq!(report.requested_rate, 30.0);
        assert!((report.effective_rate - 100.0 / 3.0).abs() < 1e-12);
        assert!(report.is_adjusted());
        assert_eq!(out.sampling_rate(), report.effective_rate);
        assert_eq!(out.sample_count(), 100);
    }

    #[test]
    fn test_output_length_rounds_up() {
        let (out, _) = decimate(seg(10.0, vec![0.0; 25]), 1.0, &DecimateOptions::default()).unwrap();
        assert_eq!(out.sample_count(), 3);
    }

    #[test]
    fn test_constant_signal_keeps_level() {
        let (out, report) = decimate(seg(100.0, vec![2.0; 1000]), 10.0, &DecimateOptions::default()).unwrap();
        assert!(!report.is_adjusted());
        assert!(out.samples().iter().all(|v| (v - 2.0).abs() < 1e-4));
        assert_eq!(out.start_time(), t0());
    }

    #[test]
    fn test_remove_dc() {
        let options = DecimateOptions {
            remove_dc: true,
            round_unit: None,
        };
        let (out, _) = decimate(seg(100.0, vec![5.0; 500]), 10.0, &options).unwrap();
        assert!(out.samples().iter().all(|v| v.abs() < 1e-4));
    }

    #[test]
    fn test_high_frequency_is_attenuated() {
        // Alternating signal at the source Nyquist frequency.
        let samples: Vec<f32> = (0..2000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let (out, _) = decimate(seg(100.0, samples), 10.0, &DecimateOptions::default()).unwrap();
        let interior = &out.samples()[10..out.sample_count() - 10];
        assert!(interior.iter().all(|v| v.abs() < 1e-2));
    }

    #[test]
    fn test_low_frequency_passes() {
        let rate = 100.0;
        let samples: Vec<f32> = (0..4000)
            .map(|i| (2.0 * std::f64::consts::PI * 0.5 * f64::from(i) / rate).sin() as f32)
            .collect();
        let (out, _) = decimate(seg(rate, samples.clone()), 10.0, &DecimateOptions::default()).unwrap();
        for (m, &v) in out.samples().iter().enumerate().skip(20).take(300) {
            assert!((v - samples[m * 10]).abs() < 0.02, "sample {m}: {v}");
        }
    }

    #[test]
    fn test_round_start_time() {
        let options = DecimateOptions {
            remove_dc: false,
            round_unit: Some(RoundUnit::Minute),
        };
        let s = seg(10.0, vec![0.0; 20]).with_start_time(t0() + TimeDelta::seconds(42));
        let (out, _) = decimate(s, 1.0, &options).unwrap();
        assert_eq!(out.start_time(), t0());
    }

    #[test]
    fn test_twice_vs_once_rates() {
        let s = seg(100.0, vec![0.0; 600]);
        let (once, _) = decimate(s.clone(), 7.0, &DecimateOptions::default()).unwrap();
        let (half, _) = decimate(s, 30.0, &DecimateOptions::default()).unwrap();
        let (twice, _) = decimate(half, 7.0, &DecimateOptions::default()).unwrap();
        assert_eq!(once.sampling_rate(), 100.0 / 14.0);
        assert_eq!(twice.sampling_rate(), 100.0 / 3.0 / 4.0);
        assert!(once.sampling_rate() != twice.sampling_rate());
    }

    #[test]
    fn test_rejects_gaps() {
        let s = seg(10.0, vec![0.0; 20]).with_gaps(vec![0..2]);
        assert!(matches!(
            decimate(s, 1.0, &DecimateOptions::default()),
            Err(Error::UnmaterializedMask { missing: 2 })
        ));
    }
}
