//! Windowed-sinc low-pass FIR.

use crate::constants::decimate::TAPS_PER_FACTOR;
use std::f64::consts::PI;

/// Hamming-windowed sinc taps with cutoff at the decimated Nyquist
/// frequency, normalized to unity DC gain.
///
/// Length is `TAPS_PER_FACTOR * factor + 1`, so the filter is symmetric
/// around its centre tap and introduces no delay.
#[allow(clippy::cast_precision_loss)]
pub fn lowpass_taps(factor: usize) -> Vec<f64> {
    let order = TAPS_PER_FACTOR * factor.max(1);
    let half = (order / 2) as f64;
    let q = factor.max(1) as f64;

    let mut taps: Vec<f64> = (0..=order)
        .map(|k| {
            let x = k as f64 - half;
            let sinc = if x == 0.0 {
                1.0
            } else {
                (PI * x / q).sin() / (PI * x / q)
            };
            let window = 0.46f64.mul_add(-(2.0 * PI * k as f64 / order as f64).cos(), 0.54);
            sinc * window
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t /= sum);
    taps
}

/// Convolve and keep every `factor`-th output, starting at index 0.
///
/// Input beyond either edge counts as absent; each output is renormalized by
/// the taps that landed on real samples.
#[allow(clippy::cast_possible_truncation)]
pub fn filter_decimate(samples: &[f32], taps: &[f64], factor: usize) -> Vec<f32> {
    let half = taps.len() / 2;
    let n = samples.len();

    (0..n)
        .step_by(factor.max(1))
        .map(|centre| {
            let first = centre.saturating_sub(half);
            let last = (centre + half).min(n.saturating_sub(1));
            let (acc, weight) = (first..=last).fold((0.0, 0.0), |(acc, weight), i| {
                let tap = taps[i + half - centre];
                (f64::from(samples[i]).mul_add(tap, acc), weight + tap)
            });
            if weight.abs() > f64::EPSILON {
                (acc / weight) as f32
            } else {
                0.0
            }
        })
        .collect()
}
