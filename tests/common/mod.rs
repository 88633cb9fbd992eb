//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use chrono::{DateTime, NaiveDate, Utc};
use sacmerge::segment::{ChannelId, FileStore, SegmentFormat, SegmentStore, WaveformSegment};
use std::path::{Path, PathBuf};

/// One sample per hour.
pub const HOURLY: f64 = 1.0 / 3600.0;

pub fn channel(station: &str) -> ChannelId {
    ChannelId::new("TW", station, "00", "EHZ")
}

/// Midnight UTC of solar day `day` of `year`.
pub fn day_start(year: i32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_yo_opt(year, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Write one day of hourly samples, all equal to `value`, named
/// `<station>.TW.00.EHZ_<year>.<ddd>.sac`.
pub fn write_day(dir: &Path, station: &str, year: i32, day: u32, value: f32) -> PathBuf {
    let segment = WaveformSegment::new(channel(station), HOURLY, day_start(year, day), vec![value; 24]);
    let path = dir.join(format!("{station}.TW.00.EHZ_{year}.{day:03}.sac"));
    FileStore.save(&path, &segment, SegmentFormat::Sac).unwrap();
    path
}

/// Write a 100 Hz, 0.5 Hz sine segment with a DC offset of 3, lasting `seconds`.
pub fn write_sine(dir: &Path, name: &str, station: &str, start: DateTime<Utc>, seconds: usize) -> PathBuf {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let samples = (0..seconds * 100)
        .map(|i| (2.0 * std::f64::consts::PI * 0.5 * i as f64 / 100.0).sin() as f32 + 3.0)
        .collect();
    let segment = WaveformSegment::new(channel(station), 100.0, start, samples);
    let path = dir.join(name);
    FileStore.save(&path, &segment, SegmentFormat::Sac).unwrap();
    path
}

