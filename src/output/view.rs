//! Header rendering for the `view` command.

use crate::error::{Error, Result};
use crate::segment::SegmentMetadata;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Header fields of one file, as printed by `view --json`.
#[derive(Debug, Serialize)]
pub struct HeaderView<'a> {
    /// Source file name.
    pub file: String,
    /// Network code.
    pub network: &'a str,
    /// Station code.
    pub station: &'a str,
    /// Location code.
    pub location: &'a str,
    /// Channel code.
    pub channel: &'a str,
    /// Time of the first sample.
    pub start_time: DateTime<Utc>,
    /// Time of the last sample.
    pub end_time: DateTime<Utc>,
    /// Sampling rate in Hz.
    pub sampling_rate: f64,
    /// Sample interval in seconds.
    pub delta: f64,
    /// Number of samples.
    pub npts: usize,
}

impl<'a> HeaderView<'a> {
    /// Build a view of `metadata` read from `path`.
    pub fn new(path: &Path, metadata: &'a SegmentMetadata) -> Self {
        Self {
            file: path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            network: &metadata.channel.network,
            station: &metadata.channel.station,
            location: &metadata.channel.location,
            channel: &metadata.channel.channel,
            start_time: metadata.start_time,
            end_time: metadata.end_time(),
            sampling_rate: metadata.sampling_rate,
            delta: metadata.delta(),
            npts: metadata.sample_count,
        }
    }
}

/// Render header fields as aligned `key: value` lines.
pub fn render_text(path: &Path, metadata: &SegmentMetadata) -> String {
    let view = HeaderView::new(path, metadata);
    let rows = [
        ("file", view.file.clone()),
        ("network", view.network.to_string()),
        ("station", view.station.to_string()),
        ("location", view.location.to_string()),
        ("channel", view.channel.to_string()),
        (
            "starttime",
            view.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        (
            "endtime",
            view.end_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        ("sampling_rate", view.sampling_rate.to_string()),
        ("delta", view.delta.to_string()),
        ("npts", view.npts.to_string()),
    ];

    let mut out = String::new();
    for (key, value) in rows {
        let _ = writeln!(out, "{key:>14}: {value}");
    }
    out
}

/// Render header fields as pretty JSON.
pub fn render_json(path: &Path, metadata: &SegmentMetadata) -> Result<String> {
    serde_json::to_string_pretty(&HeaderView::new(path, metadata))
        .map_err(|source| Error::MetadataSerialize { source })
}
