//! Waveform segments and their storage.
//!
//! A [`WaveformSegment`] is an immutable value: every pipeline stage takes it
//! by value and returns a rebuilt segment. Missing samples are tracked as
//! explicit gap ranges and are never silently zeroed.

mod sac;
mod store;
mod wav;

pub use store::{FileStore, SegmentFormat, SegmentMetadata, SegmentStore};

use crate::calendar::{RoundUnit, round_time};
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Identity of a recording channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    /// Network code.
    pub network: String,
    /// Station code.
    pub station: String,
    /// Location code.
    pub location: String,
    /// Channel code.
    pub channel: String,
}

impl ChannelId {
    /// Build a channel identity.
    pub fn new(network: &str, station: &str, location: &str, channel: &str) -> Self {
        Self {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

/// One contiguous, evenly sampled waveform for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSegment {
    channel: ChannelId,
    sampling_rate: f64,
    start_time: DateTime<Utc>,
    samples: Vec<f32>,
    gaps: Vec<Range<usize>>,
    provenance: Vec<PathBuf>,
}

impl WaveformSegment {
    /// Build a fully materialized segment.
    pub fn new(
        channel: ChannelId,
        sampling_rate: f64,
        start_time: DateTime<Utc>,
        samples: Vec<f32>,
    ) -> Self {
        Self {
            channel,
            sampling_rate,
            start_time,
            samples,
            gaps: Vec::new(),
            provenance: Vec::new(),
        }
    }

    /// Mark sample index ranges as missing. Placeholder values in those ranges
    /// are ignored.
    #[must_use]
    pub fn with_gaps(mut self, gaps: Vec<Range<usize>>) -> Self {
        self.gaps = normalize_gaps(gaps, self.samples.len());
        self
    }

    /// Record a source file this segment was built from.
    #[must_use]
    pub fn with_source(mut self, path: &Path) -> Self {
        self.provenance.push(path.to_path_buf());
        self
    }

    /// Replace the start time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Round the start time down to `unit`.
    #[must_use]
    pub fn round_start(self, unit: RoundUnit) -> Self {
        let start = round_time(self.start_time, unit);
        self.with_start_time(start)
    }

    /// Channel identity.
    pub const fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Sampling rate in Hz.
    pub const fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Sample interval in seconds.
    pub fn delta(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    /// Time of the first sample.
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Time of the last sample (equal to the start for empty segments).
    pub fn end_time(&self) -> DateTime<Utc> {
        let last = self.samples.len().saturating_sub(1);
        #[allow(clippy::cast_possible_wrap)]
        let offset = samples_to_duration(last as i64, self.sampling_rate);
        self.start_time + offset
    }

    /// Number of samples, including missing ones.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Raw sample buffer. Values inside [`gaps`](Self::gaps) are placeholders.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample value, or `None` if the index is missing or out of bounds.
    pub fn value_at(&self, index: usize) -> Option<f32> {
        if self.gaps.iter().any(|g| g.contains(&index)) {
            return None;
        }
        self.samples.get(index).copied()
    }

    /// Sorted, disjoint ranges of missing samples.
    pub fn gaps(&self) -> &[Range<usize>] {
        &self.gaps
    }

    /// Number of missing samples.
    pub fn missing_count(&self) -> usize {
        self.gaps.iter().map(|g| g.end - g.start).sum()
    }

    /// Whether every sample carries a value.
    pub fn is_materialized(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Source files this segment was built from.
    pub fn provenance(&self) -> &[PathBuf] {
        &self.provenance
    }

    /// Fill every missing sample, consuming the segment.
    ///
    /// Fails with [`Error::UnmaterializedMask`] when gaps exist and no fill
    /// value is given.
    pub fn materialize(self, fill_value: Option<f32>) -> Result<MaterializedSegment> {
        if self.gaps.is_empty() {
            return Ok(MaterializedSegment {
                segment: self,
                filled: 0,
            });
        }

        let Some(value) = fill_value else {
            return Err(Error::UnmaterializedMask {
                missing: self.missing_count(),
            });
        };

        let mut segment = self;
        let filled = segment.missing_count();
        for gap in std::mem::take(&mut segment.gaps) {
            segment.samples[gap].fill(value);
        }
        Ok(MaterializedSegment { segment, filled })
    }

    /// Trim or pad to exactly cover `[start, end)`.
    ///
    /// The first kept sample is the one nearest to `start`; padded samples
    /// take `fill_value`, or become gaps when none is given. The result
    /// starts exactly at `start`, so a sub-sample misalignment of the source
    /// grid (at most half a sample) is absorbed rather than carried over.
    #[must_use]
    pub fn fit_to(self, start: DateTime<Utc>, end: DateTime<Utc>, fill_value: Option<f32>) -> Self {
        let rate = self.sampling_rate;
        let target = usize::try_from(duration_to_samples(end - start, rate)).unwrap_or(0);
        let offset = duration_to_samples(start - self.start_time, rate);
        let len = i64::try_from(self.samples.len()).unwrap_or(i64::MAX);

        let mut samples = vec![fill_value.unwrap_or(0.0); target];
        let mut gaps = Vec::new();
        let mut padded = Vec::new();

        // Destination index range receiving source data.
        let dst_from = (-offset).clamp(0, i64::try_from(target).unwrap_or(i64::MAX));
        let dst_to = (len - offset).clamp(dst_from, i64::try_from(target).unwrap_or(i64::MAX));
        let to_usize = |v: i64| usize::try_from(v).unwrap_or(0);

        if dst_from > 0 {
            padded.push(0..to_usize(dst_from));
        }
        if dst_to > dst_from {
            let src_from = to_usize(dst_from + offset);
            let src_to = to_usize(dst_to + offset);
            samples[to_usize(dst_from)..to_usize(dst_to)]
                .copy_from_slice(&self.samples[src_from..src_to]);
            for gap in &self.gaps {
                let g_start = i64::try_from(gap.start).unwrap_or(i64::MAX) - offset;
                let g_end = i64::try_from(gap.end).unwrap_or(i64::MAX) - offset;
                let from = g_start.max(dst_from);
                let to = g_end.min(dst_to);
                if from < to {
                    gaps.push(to_usize(from)..to_usize(to));
                }
            }
        }
        if to_usize(dst_to) < target {
            padded.push(to_usize(dst_to.max(dst_from))..target);
        }
        if fill_value.is_none() {
            gaps.extend(padded);
        }

        Self {
            start_time: start,
            gaps: normalize_gaps(gaps, target),
            samples,
            ..self
        }
    }

    /// Split into channel, rate, start, samples, gaps and provenance.
    pub(crate) fn into_parts(self) -> SegmentParts {
        SegmentParts {
            channel: self.channel,
            sampling_rate: self.sampling_rate,
            start_time: self.start_time,
            samples: self.samples,
            gaps: self.gaps,
            provenance: self.provenance,
        }
    }

    /// Rebuild from parts, normalizing gap ranges.
    pub(crate) fn from_parts(parts: SegmentParts) -> Self {
        let len = parts.samples.len();
        Self {
            channel: parts.channel,
            sampling_rate: parts.sampling_rate,
            start_time: parts.start_time,
            samples: parts.samples,
            gaps: normalize_gaps(parts.gaps, len),
            provenance: parts.provenance,
        }
    }
}

/// Owned fields of a segment, used by stages that rebuild it.
#[derive(Debug)]
pub(crate) struct SegmentParts {
    pub channel: ChannelId,
    pub sampling_rate: f64,
    pub start_time: DateTime<Utc>,
    pub samples: Vec<f32>,
    pub gaps: Vec<Range<usize>>,
    pub provenance: Vec<PathBuf>,
}

/// A segment with no missing samples, plus how many were filled to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedSegment {
    segment: WaveformSegment,
    filled: usize,
}

impl MaterializedSegment {
    /// The gap-free segment.
    pub const fn segment(&self) -> &WaveformSegment {
        &self.segment
    }

    /// Number of samples replaced by the fill value.
    pub const fn filled_samples(&self) -> usize {
        self.filled
    }

    /// Unwrap the segment.
    pub fn into_inner(self) -> WaveformSegment {
        self.segment
    }
}

/// Number of samples spanning `duration` at `rate`, rounded to nearest.
#[allow(clippy::cast_possible_truncation)]
pub fn duration_to_samples(duration: TimeDelta, rate: f64) -> i64 {
    (seconds(duration) * rate).round() as i64
}

/// Duration spanned by `count` sample intervals at `rate`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn samples_to_duration(count: i64, rate: f64) -> TimeDelta {
    TimeDelta::nanoseconds((count as f64 / rate * 1e9).round() as i64)
}

#[allow(clippy::cast_precision_loss)]
fn seconds(duration: TimeDelta) -> f64 {
    duration.num_seconds() as f64 + f64::from(duration.subsec_nanos()) * 1e-9
}

/// Sort, clip to `len`, drop empty ranges and coalesce overlapping or adjacent ones.
fn normalize_gaps(mut gaps: Vec<Range<usize>>, len: usize) -> Vec<Range<usize>> {
    gaps.iter_mut().for_each(|g| *g = g.start.min(len)..g.end.min(len));
    gaps.retain(|g| g.start < g.end);
    gaps.sort_by_key(|g| g.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(gaps.len());
    for gap in gaps {
        match merged.last_mut() {
            Some(last) if gap.start <= last.end => last.end = last.end.max(gap.end),
            _ => merged.push(gap),
        }
    }
    merged
}
