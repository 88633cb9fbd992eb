//! Combining segments into one continuous record.
//!
//! Segments are laid out on a common sample grid anchored at the earliest
//! start time and walked in chronological order. Overlaps are resolved by an
//! [`OverlapMethod`]; uncovered stretches become fill samples or explicit gaps.

use crate::constants::RATE_TOLERANCE;
use crate::error::{Error, Result};
use crate::segment::{SegmentParts, WaveformSegment, duration_to_samples};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::debug;

/// How overlapping coverage is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapMethod {
    /// The earlier segment's samples win.
    KeepFirst,
    /// The later segment's samples win.
    KeepLast,
    /// Linear crossfade into the later segment.
    #[default]
    Interpolate,
}

impl std::fmt::Display for OverlapMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepFirst => write!(f, "keep-first"),
            Self::KeepLast => write!(f, "keep-last"),
            Self::Interpolate => write!(f, "interpolate"),
        }
    }
}

/// Merge settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergePolicy {
    /// Overlap resolution.
    pub method: OverlapMethod,
    /// Crossfade length for [`OverlapMethod::Interpolate`]; `None` blends the
    /// whole overlap.
    pub interpolation_samples: Option<usize>,
    /// Value for missing samples; `None` keeps them as explicit gaps.
    pub fill_value: Option<f32>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            method: OverlapMethod::Interpolate,
            interpolation_samples: None,
            fill_value: Some(0.0),
        }
    }
}

/// Merge same-channel, same-rate segments into one.
///
/// The result spans from the earliest start to the latest end. Input order
/// does not affect the output.
pub fn merge(segments: Vec<WaveformSegment>, policy: &MergePolicy) -> Result<WaveformSegment> {
    let mut segments = segments
        .into_iter()
        .map(|s| {
            let source = s.provenance().first().cloned();
            s.materialize(policy.fill_value)
                .map(|m| m.into_inner())
                .map_err(|e| attribute(e, source.as_ref()))
        })
        .collect::<Result<Vec<_>>>()?;
    segments.sort_by(chronological);

    let Some(first) = segments.first() else {
        return Err(Error::EmptyMerge);
    };
    let channel = first.channel().clone();
    let rate = first.sampling_rate();
    let origin = first.start_time();

    let mut placed = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.channel() != &channel {
            let err = Error::ChannelMismatch {
                expected: channel.to_string(),
                found: segment.channel().to_string(),
            };
            return Err(attribute(err, segment.provenance().first()));
        }
        if !rates_match(rate, segment.sampling_rate()) {
            let err = Error::SamplingRateMismatch {
                expected: rate,
                found: segment.sampling_rate(),
            };
            return Err(attribute(err, segment.provenance().first()));
        }
        let offset = usize::try_from(duration_to_samples(segment.start_time() - origin, rate))
            .unwrap_or(0);
        placed.push((offset, segment.into_parts()));
    }

    let total = placed
        .iter()
        .map(|(offset, parts)| offset + parts.samples.len())
        .max()
        .unwrap_or(0);

    let mut samples = vec![policy.fill_value.unwrap_or(0.0); total];
    let mut gaps = Vec::new();
    let mut provenance = Vec::new();
    let mut covered_until = 0;

    for (offset, parts) in placed {
        let SegmentParts {
            samples: source,
            provenance: sources,
            ..
        } = parts;
        let end = offset + source.len();

        if offset > covered_until {
            if policy.fill_value.is_none() {
                gaps.push(covered_until..offset);
            }
            debug!(
                "Gap of {} sample(s) before offset {offset}",
                offset - covered_until
            );
        }

        let overlap_end = covered_until.clamp(offset, end);
        let overlap = overlap_end - offset;
        if overlap > 0 {
            debug!("Overlap of {overlap} sample(s) at offset {offset}");
        }

        let write_from = match policy.method {
            OverlapMethod::KeepFirst => overlap,
            OverlapMethod::KeepLast => 0,
            OverlapMethod::Interpolate => {
                let blend = policy
                    .interpolation_samples
                    .map_or(overlap, |n| n.min(overlap));
                crossfade(&mut samples[offset..offset + blend], &source[..blend]);
                blend
            }
        };
        samples[offset + write_from..end].copy_from_slice(&source[write_from..]);

        covered_until = covered_until.max(end);
        provenance.extend(sources);
    }

    Ok(WaveformSegment::from_parts(SegmentParts {
        channel,
        sampling_rate: rate,
        start_time: origin,
        samples,
        gaps,
        provenance,
    }))
}

/// Blend `incoming` into `existing` with linearly rising weight.
#[allow(clippy::cast_precision_loss)]
fn crossfade(existing: &mut [f32], incoming: &[f32]) {
    let steps = (existing.len() + 1) as f32;
    for (j, (old, &new)) in existing.iter_mut().zip(incoming).enumerate() {
        let w = (j + 1) as f32 / steps;
        *old = (1.0 - w).mul_add(*old, w * new);
    }
}

/// Tie an error to the file the offending segment was read from.
fn attribute(err: Error, source: Option<&PathBuf>) -> Error {
    match source {
        Some(path) => err.in_unit(path),
        None => err,
    }
}

fn rates_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATE_TOLERANCE * a.abs().max(b.abs())
}

/// Total order: start time, then length, then sources, then sample values.
fn chronological(a: &WaveformSegment, b: &WaveformSegment) -> Ordering {
    a.start_time()
        .cmp(&b.start_time())
        .then_with(|| a.sample_count().cmp(&b.sample_count()))
        .then_with(|| a.provenance().cmp(b.provenance()))
        .then_with(|| a.sampling_rate().total_cmp(&b.sampling_rate()))
        .then_with(|| {
            a.samples()
                .iter()
                .zip(b.samples())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::segment::ChannelId;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap()
    }

    fn seg(start_s: i64, samples: Vec<f32>) -> WaveformSegment {
        WaveformSegment::new(
            ChannelId::new("TW", "STA01", "00", "EHZ"),
            1.0,
            t0() + TimeDelta::seconds(start_s),
            samples,
        )
    }

    fn policy(method: OverlapMethod, fill: Option<f32>) -> MergePolicy {
        MergePolicy {
            method,
            interpolation_samples: None,
            fill_value: fill,
        }
    }

    #[test]
    fn test_concatenation_is_order_independent() {
        let a = seg(0, vec![1.0, 2.0, 3.0]);
        let b = seg(3, vec![4.0, 5.0]);
        let c = seg(5, vec![6.0]);
        let p = MergePolicy::default();

        let forward = merge(vec![a.clone(), b.clone(), c.clone()], &p).unwrap();
        let shuffled = merge(vec![c, a, b], &p).unwrap();

        assert_eq!(forward, shuffled);
        assert_eq!(forward.samples(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(forward.sample_count(), 6);
        assert_eq!(forward.start_time(), t0());
        assert!(forward.is_materialized());
    }

    #[test]
    fn test_interpolated_overlaps_ignore_input_order() {
        let a = seg(0, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = seg(3, vec![10.0, 20.0, 30.0, 40.0]);
        let c = seg(6, vec![-1.0, -2.0, -3.0]);
        let d = seg(11, vec![7.0, 8.0]);
        let p = MergePolicy {
            method: OverlapMethod::Interpolate,
            interpolation_samples: None,
            fill_value: Some(0.0),
        };

        let reference = merge(vec![a.clone(), b.clone(), c.clone(), d.clone()], &p).unwrap();
        let orders = [
            vec![d.clone(), c.clone(), b.clone(), a.clone()],
            vec![b.clone(), d.clone(), a.clone(), c.clone()],
            vec![c.clone(), a.clone(), d.clone(), b.clone()],
            vec![a.clone(), c.clone(), b.clone(), d.clone()],
        ];
        for order in orders {
            assert_eq!(merge(order, &p).unwrap(), reference);
        }

        // a/b overlap at 3..5 (weights 1/3, 2/3), b/c at 6 (weight 1/2), gap at 9..11.
        assert_eq!(reference.sample_count(), 13);
        let expected = [
            1.0,
            2.0,
            3.0,
            (2.0 / 3.0_f32).mul_add(4.0, 10.0 / 3.0),
            (1.0 / 3.0_f32).mul_add(5.0, (2.0 / 3.0) * 20.0),
            30.0,
            0.5_f32.mul_add(40.0, 0.5 * -1.0),
            -2.0,
            -3.0,
            0.0,
            0.0,
            7.0,
            8.0,
        ];
        for (got, want) in reference.samples().iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} != {want}");
        }
    }

    #[test]
    fn test_keep_last_overlap_takes_later_samples() {
        let a = seg(0, vec![1.0; 5]);
        let b = seg(3, vec![9.0; 4]);
        let merged = merge(vec![b, a], &policy(OverlapMethod::KeepLast, None)).unwrap();
        assert_eq!(merged.samples(), &[1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_keep_first_overlap_takes_earlier_samples() {
        let a = seg(0, vec![1.0; 5]);
        let b = seg(3, vec![9.0; 4]);
        let merged = merge(vec![b, a], &policy(OverlapMethod::KeepFirst, None)).unwrap();
        assert_eq!(merged.samples(), &[1.0, 1.0, 1.0, 1.0, 1.0, 9.0, 9.0]);
    }

    #[test]
    fn test_interpolate_blends_whole_overlap() {
        let a = seg(0, vec![0.0; 4]);
        let b = seg(1, vec![3.0; 4]);
        let merged = merge(vec![a, b], &policy(OverlapMethod::Interpolate, None)).unwrap();
        // Overlap of 3 samples, weights 1/4, 2/4, 3/4.
        assert_eq!(merged.samples(), &[0.0, 0.75, 1.5, 2.25, 3.0]);
    }

    #[test]
    fn test_interpolate_limited_samples() {
        let a = seg(0, vec![0.0; 4]);
        let b = seg(1, vec![2.0; 4]);
        let p = MergePolicy {
            method: OverlapMethod::Interpolate,
            interpolation_samples: Some(1),
            fill_value: None,
        };
        let merged = merge(vec![a, b], &p).unwrap();
        assert_eq!(merged.samples(), &[0.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_gap_filled_with_fill_value() {
        let a = seg(0, vec![1.0; 2]);
        let b = seg(4, vec![2.0; 2]);
        let merged = merge(vec![a, b], &policy(OverlapMethod::KeepFirst, Some(-1.0))).unwrap();
        assert_eq!(merged.samples(), &[1.0, 1.0, -1.0, -1.0, 2.0, 2.0]);
        assert!(merged.is_materialized());
    }

    #[test]
    fn test_gap_left_explicit_without_fill() {
        let a = seg(0, vec![1.0; 2]);
        let b = seg(4, vec![2.0; 2]);
        let merged = merge(vec![a, b], &policy(OverlapMethod::KeepFirst, None)).unwrap();
        assert_eq!(merged.gaps(), &[2..4]);
        assert_eq!(merged.value_at(2), None);
    }

    #[test]
    fn test_contained_segment_keep_first() {
        let a = seg(0, vec![1.0; 6]);
        let b = seg(2, vec![5.0; 2]);
        let merged = merge(vec![a, b], &policy(OverlapMethod::KeepFirst, None)).unwrap();
        assert_eq!(merged.samples(), &[1.0; 6]);
    }

    #[test]
    fn test_rate_mismatch() {
        let a = seg(0, vec![1.0; 2]);
        let b = WaveformSegment::new(a.channel().clone(), 2.0, t0(), vec![1.0]);
        let err = merge(vec![a, b], &MergePolicy::default()).unwrap_err();
        assert!(matches!(err, Error::SamplingRateMismatch { .. }));
    }

    #[test]
    fn test_rate_mismatch_names_offending_source() {
        let a = seg(0, vec![1.0; 2]).with_source(std::path::Path::new("day060.sac"));
        let b = WaveformSegment::new(a.channel().clone(), 2.0, t0() + TimeDelta::days(1), vec![1.0])
            .with_source(std::path::Path::new("day061.sac"));
        let err = merge(vec![b, a], &MergePolicy::default()).unwrap_err();
        match err {
            Error::Unit { path, source } => {
                assert_eq!(path, std::path::PathBuf::from("day061.sac"));
                assert!(matches!(*source, Error::SamplingRateMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unfilled_gap_names_its_source() {
        let a = seg(0, vec![1.0; 3]).with_source(std::path::Path::new("gappy.sac"));
        let a = a.with_gaps(vec![0..1]);
        let err = merge(vec![a], &policy(OverlapMethod::KeepFirst, None)).unwrap_err();
        assert!(matches!(err, Error::Unit { ref path, .. } if path.ends_with("gappy.sac")));
    }

    #[test]
    fn test_channel_mismatch() {
        let a = seg(0, vec![1.0; 2]);
        let b = WaveformSegment::new(ChannelId::new("TW", "STA02", "00", "EHZ"), 1.0, t0(), vec![1.0]);
        let err = merge(vec![a, b], &MergePolicy::default()).unwrap_err();
        assert!(matches!(err, Error::ChannelMismatch { .. }));
    }

    #[test]
    fn test_unmaterialized_input_rejected_without_fill() {
        let a = seg(0, vec![1.0; 3]).with_gaps(vec![1..2]);
        let err = merge(vec![a], &policy(OverlapMethod::KeepLast, None)).unwrap_err();
        assert!(matches!(err, Error::UnmaterializedMask { missing: 1 }));
    }

    #[test]
    fn test_unmaterialized_input_filled_before_merge() {
        let a = seg(0, vec![1.0; 3]).with_gaps(vec![1..2]);
        let merged = merge(vec![a], &policy(OverlapMethod::KeepLast, Some(7.0))).unwrap();
        assert_eq!(merged.samples(), &[1.0, 7.0, 1.0]);
    }

    #[test]
    fn test_empty_merge() {
        assert!(matches!(
            merge(Vec::new(), &MergePolicy::default()),
            Err(Error::EmptyMerge)
        ));
    }

    #[test]
    fn test_identical_starts_are_deterministic() {
        let a = seg(0, vec![1.0; 3]);
        let b = seg(0, vec![2.0; 3]);
        let p = policy(OverlapMethod::KeepLast, None);
        let ab = merge(vec![a.clone(), b.clone()], &p).unwrap();
        let ba = merge(vec![b, a], &p).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_provenance_is_chronological() {
        let a = seg(0, vec![1.0]).with_source(std::path::Path::new("a.sac"));
        let b = seg(1, vec![1.0]).with_source(std::path::Path::new("b.sac"));
        let merged = merge(vec![b, a], &MergePolicy::default()).unwrap();
        assert_eq!(
            merged.provenance(),
            &[std::path::PathBuf::from("a.sac"), std::path::PathBuf::from("b.sac")]
        );
    }

    #[test]
    fn test_many_segments_length_property() {
        let parts: Vec<WaveformSegment> = (0..10)
            .rev()
            .map(|i| seg(i * 3, vec![i as f32; 3]))
            .collect();
        let merged = merge(parts, &MergePolicy::default()).unwrap();
        assert_eq!(merged.sample_count(), 30);
        assert_eq!(merged.samples()[29], 9.0);
    }
}
