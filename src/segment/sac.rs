//! SAC binary codec.
//!
//! Layout: 70 float words, 40 integer/logical words and 24 eight-byte string
//! slots (632 bytes), followed by `npts` 32-bit float samples.

use super::{ChannelId, SegmentMetadata, WaveformSegment};
use crate::constants::sac::{
    FLOAT_WORDS, HEADER_BYTES, HEADER_VERSION, IFTYPE_TIME, INT_WORDS, STRING_OFFSET,
    UNDEFINED_FLOAT, UNDEFINED_INT, UNDEFINED_STRING,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

// Float word indices.
const DELTA: usize = 0;
const DEPMIN: usize = 1;
const DEPMAX: usize = 2;
const B: usize = 5;
const E: usize = 6;
const DEPMEN: usize = 56;

// Integer word indices (relative to the integer block).
const NZYEAR: usize = 0;
const NZJDAY: usize = 1;
const NZHOUR: usize = 2;
const NZMIN: usize = 3;
const NZSEC: usize = 4;
const NZMSEC: usize = 5;
const NVHDR: usize = 6;
const NPTS: usize = 9;
const IFTYPE: usize = 15;
const LEVEN: usize = 35;
const LOVROK: usize = 37;

// String byte offsets (relative to the string block).
const KSTNM: usize = 0;
const KEVNM: usize = 8;
const KHOLE: usize = 24;
const KCMPNM: usize = 160;
const KNETWK: usize = 168;
const STRING_BYTES: usize = HEADER_BYTES - STRING_OFFSET;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

/// Decoded header words.
struct RawHeader {
    floats: [f32; FLOAT_WORDS],
    ints: [i32; INT_WORDS],
    strings: [u8; STRING_BYTES],
    endian: Endian,
}

impl RawHeader {
    fn blank() -> Self {
        let mut strings = [b' '; STRING_BYTES];
        for slot in (0..STRING_BYTES).step_by(8) {
            // kevnm is one 16-byte slot; its second half stays blank.
            if slot == KEVNM + 8 {
                continue;
            }
            strings[slot..slot + UNDEFINED_STRING.len()].copy_from_slice(UNDEFINED_STRING.as_bytes());
        }
        Self {
            floats: [UNDEFINED_FLOAT; FLOAT_WORDS],
            ints: [UNDEFINED_INT; INT_WORDS],
            strings,
            endian: Endian::Little,
        }
    }

    fn parse(bytes: &[u8], path: &Path) -> Result<Self> {
        if bytes.len() < HEADER_BYTES {
            return Err(Error::SegmentFormat {
                path: path.to_path_buf(),
                message: format!("header is {} bytes, expected {HEADER_BYTES}", bytes.len()),
            });
        }

        let version_word = word(bytes, FLOAT_WORDS + NVHDR);
        let endian = if (1..=20).contains(&i32::from_le_bytes(version_word)) {
            Endian::Little
        } else if (1..=20).contains(&i32::from_be_bytes(version_word)) {
            Endian::Big
        } else {
            return Err(Error::SegmentFormat {
                path: path.to_path_buf(),
                message: "unrecognized header version".to_string(),
            });
        };

        let mut floats = [0.0; FLOAT_WORDS];
        for (i, value) in floats.iter_mut().enumerate() {
            *value = decode_f32(word(bytes, i), endian);
        }
        let mut ints = [0; INT_WORDS];
        for (i, value) in ints.iter_mut().enumerate() {
            *value = decode_i32(word(bytes, FLOAT_WORDS + i), endian);
        }
        let mut strings = [0; STRING_BYTES];
        strings.copy_from_slice(&bytes[STRING_OFFSET..HEADER_BYTES]);

        Ok(Self {
            floats,
            ints,
            strings,
            endian,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_BYTES);
        for value in &self.floats {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for value in &self.ints {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&self.strings);
        out
    }

    fn string(&self, offset: usize) -> String {
        let raw = String::from_utf8_lossy(&self.strings[offset..offset + 8]);
        let value = raw.trim_end_matches(['\0', ' ']).trim();
        if value == UNDEFINED_STRING {
            String::new()
        } else {
            value.to_string()
        }
    }

    fn set_string(&mut self, offset: usize, value: &str) {
        let value = if value.is_empty() { UNDEFINED_STRING } else { value };
        let slot = &mut self.strings[offset..offset + 8];
        slot.fill(b' ');
        let bytes = value.as_bytes();
        let n = bytes.len().min(8);
        slot[..n].copy_from_slice(&bytes[..n]);
    }

    fn npts(&self, path: &Path) -> Result<usize> {
        usize::try_from(self.ints[NPTS]).map_err(|_| Error::SegmentFormat {
            path: path.to_path_buf(),
            message: format!("invalid npts {}", self.ints[NPTS]),
        })
    }

    fn sampling_rate(&self, path: &Path) -> Result<f64> {
        let raw = self.floats[DELTA];
        // Shortest decimal form of the stored f32, so 0.01 reads back as 100 Hz.
        let delta: f64 = raw.to_string().parse().unwrap_or_else(|_| f64::from(raw));
        if delta <= 0.0 || !delta.is_finite() || self.floats[DELTA] == UNDEFINED_FLOAT {
            return Err(Error::SegmentFormat {
                path: path.to_path_buf(),
                message: format!("invalid delta {delta}"),
            });
        }
        Ok(1.0 / delta)
    }

    fn channel(&self) -> ChannelId {
        ChannelId {
            network: self.string(KNETWK),
            station: self.string(KSTNM),
            location: self.string(KHOLE),
            channel: self.string(KCMPNM),
        }
    }

    /// Reference time plus the `b` offset.
    fn start_time(&self, path: &Path) -> Result<DateTime<Utc>> {
        let reference = if self.ints[NZYEAR] == UNDEFINED_INT {
            DateTime::UNIX_EPOCH
        } else {
            let field = |i: usize| {
                u32::try_from(self.ints[i])
                    .ok()
                    .filter(|_| self.ints[i] != UNDEFINED_INT)
                    .unwrap_or(0)
            };
            NaiveDate::from_yo_opt(self.ints[NZYEAR], field(NZJDAY))
                .and_then(|d| d.and_hms_milli_opt(field(NZHOUR), field(NZMIN), field(NZSEC), field(NZMSEC)))
                .map(|dt| dt.and_utc())
                .ok_or_else(|| Error::SegmentFormat {
                    path: path.to_path_buf(),
                    message: "invalid reference time".to_string(),
                })?
        };

        let b = if self.floats[B] == UNDEFINED_FLOAT {
            0.0
        } else {
            f64::from(self.floats[B])
        };
        #[allow(clippy::cast_possible_truncation)]
        let offset = TimeDelta::nanoseconds((b * 1e9).round() as i64);
        Ok(reference + offset)
    }

    fn metadata(&self, path: &Path) -> Result<SegmentMetadata> {
        Ok(SegmentMetadata {
            channel: self.channel(),
            sampling_rate: self.sampling_rate(path)?,
            start_time: self.start_time(path)?,
            sample_count: self.npts(path)?,
        })
    }
}

fn word(bytes: &[u8], index: usize) -> [u8; 4] {
    let mut w = [0; 4];
    w.copy_from_slice(&bytes[index * 4..index * 4 + 4]);
    w
}

fn decode_f32(bytes: [u8; 4], endian: Endian) -> f32 {
    match endian {
        Endian::Little => f32::from_le_bytes(bytes),
        Endian::Big => f32::from_be_bytes(bytes),
    }
}

fn decode_i32(bytes: [u8; 4], endian: Endian) -> i32 {
    match endian {
        Endian::Little => i32::from_le_bytes(bytes),
        Endian::Big => i32::from_be_bytes(bytes),
    }
}

/// Read header fields only.
pub fn read_metadata(path: &Path) -> Result<SegmentMetadata> {
    let file = File::open(path).map_err(|e| Error::SegmentRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut bytes = Vec::with_capacity(HEADER_BYTES);
    file.take(HEADER_BYTES as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::SegmentRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    RawHeader::parse(&bytes, path)?.metadata(path)
}

/// Read a whole SAC file.
pub fn read(path: &Path) -> Result<WaveformSegment> {
    let bytes = std::fs::read(path).map_err(|e| Error::SegmentRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let header = RawHeader::parse(&bytes, path)?;
    let meta = header.metadata(path)?;

    let data = &bytes[HEADER_BYTES..];
    let expected = meta.sample_count * 4;
    if data.len() < expected {
        return Err(Error::SegmentFormat {
            path: path.to_path_buf(),
            message: format!(
                "data section is {} bytes, header declares {} samples",
                data.len(),
                meta.sample_count
            ),
        });
    }

    let samples = data[..expected]
        .chunks_exact(4)
        .map(|c| decode_f32([c[0], c[1], c[2], c[3]], header.endian))
        .collect();

    Ok(
        WaveformSegment::new(meta.channel, meta.sampling_rate, meta.start_time, samples)
            .with_source(path),
    )
}

/// Write a gap-free segment as little-endian SAC.
pub fn write(path: &Path, segment: &WaveformSegment) -> Result<()> {
    if !segment.is_materialized() {
        return Err(Error::UnmaterializedMask {
            missing: segment.missing_count(),
        });
    }

    let header = build_header(segment, path)?;
    let file = File::create(path).map_err(|e| Error::SegmentWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let write_err = |e| Error::SegmentWrite {
        path: path.to_path_buf(),
        source: e,
    };
    writer.write_all(&header.to_bytes()).map_err(write_err)?;
    for sample in segment.samples() {
        writer.write_all(&sample.to_le_bytes()).map_err(write_err)?;
    }
    writer.flush().map_err(write_err)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
fn build_header(segment: &WaveformSegment, path: &Path) -> Result<RawHeader> {
    let npts = i32::try_from(segment.sample_count()).map_err(|_| Error::SegmentFormat {
        path: path.to_path_buf(),
        message: format!("{} samples exceed the SAC limit", segment.sample_count()),
    })?;

    let start = segment.start_time();
    let millis = start.timestamp_subsec_millis().min(999);
    let reference = start
        .with_nanosecond(millis * 1_000_000)
        .unwrap_or(start);
    let b = (start - reference).num_nanoseconds().unwrap_or(0) as f64 * 1e-9;
    let delta = segment.delta();

    let mut header = RawHeader::blank();
    header.floats[DELTA] = delta as f32;
    header.floats[B] = b as f32;
    header.floats[E] = (b + f64::from(npts.saturating_sub(1)) * delta) as f32;

    let samples = segment.samples();
    if !samples.is_empty() {
        let (min, max, sum) = samples.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0.0_f64),
            |(lo, hi, sum), &v| (lo.min(v), hi.max(v), sum + f64::from(v)),
        );
        header.floats[DEPMIN] = min;
        header.floats[DEPMAX] = max;
        header.floats[DEPMEN] = (sum / samples.len() as f64) as f32;
    }

    header.ints[NZYEAR] = reference.year();
    header.ints[NZJDAY] = reference.ordinal() as i32;
    header.ints[NZHOUR] = reference.hour() as i32;
    header.ints[NZMIN] = reference.minute() as i32;
    header.ints[NZSEC] = reference.second() as i32;
    header.ints[NZMSEC] = millis as i32;
    header.ints[NVHDR] = HEADER_VERSION;
    header.ints[NPTS] = npts;
    header.ints[IFTYPE] = IFTYPE_TIME;
    header.ints[LEVEN] = 1;
    header.ints[LOVROK] = 1;

    let channel = segment.channel();
    header.set_string(KSTNM, &channel.station);
    header.set_string(KHOLE, &channel.location);
    header.set_string(KCMPNM, &channel.channel);
    header.set_string(KNETWK, &channel.network);

    Ok(header)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_segment() -> WaveformSegment {
        let start = Utc.with_ymd_and_hms(2015, 3, 2, 4, 5, 6).unwrap() + TimeDelta::milliseconds(250);
        WaveformSegment::new(
            ChannelId::new("TW", "STA01", "00", "EHZ"),
            100.0,
            start,
            vec![1.0, -2.5, 3.25, 0.0],
        )
    }

    #[test]
    fn test_write_then_read_preserves_header_and_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("STA01.sac");
        let segment = sample_segment();

        write(&path, &segment).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            (HEADER_BYTES + 4 * 4) as u64
        );

        let read_back = read(&path).unwrap();
        assert_eq!(read_back.channel(), segment.channel());
        assert_eq!(read_back.start_time(), segment.start_time());
        assert_eq!(read_back.samples(), segment.samples());
        assert!((read_back.sampling_rate() - 100.0).abs() < 1e-3);
        assert_eq!(read_back.provenance(), &[path]);
    }

    #[test]
    fn test_read_metadata_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("STA01.sac");
        write(&path, &sample_segment()).unwrap();

        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta.sample_count, 4);
        assert_eq!(meta.channel.station, "STA01");
        assert_eq!(meta.channel.network, "TW");
    }

    #[test]
    fn test_write_rejects_gaps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gappy.sac");
        let segment = sample_segment().with_gaps(vec![1..2]);
        let err = write(&path, &segment).unwrap_err();
        assert!(matches!(err, Error::UnmaterializedMask { missing: 1 }));
    }

    #[test]
    fn test_read_big_endian() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("be.sac");

        let mut header = RawHeader::blank();
        header.floats[DELTA] = 0.5;
        header.floats[B] = 0.0;
        header.ints[NZYEAR] = 2014;
        header.ints[NZJDAY] = 32;
        header.ints[NZHOUR] = 0;
        header.ints[NZMIN] = 0;
        header.ints[NZSEC] = 0;
        header.ints[NZMSEC] = 0;
        header.ints[NVHDR] = HEADER_VERSION;
        header.ints[NPTS] = 2;
        header.set_string(KSTNM, "BE01");

        let mut bytes = Vec::new();
        for v in &header.floats {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        for v in &header.ints {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.extend_from_slice(&header.strings);
        bytes.extend_from_slice(&1.5_f32.to_be_bytes());
        bytes.extend_from_slice(&(-1.5_f32).to_be_bytes());
        std::fs::write(&path, bytes).unwrap();

        let segment = read(&path).unwrap();
        assert_eq!(segment.samples(), &[1.5, -1.5]);
        assert_eq!(segment.sampling_rate(), 2.0);
        assert_eq!(segment.channel().station, "BE01");
        assert_eq!(segment.channel().network, "");
        assert_eq!(
            segment.start_time(),
            Utc.with_ymd_and_hms(2014, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_read_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.sac");
        std::fs::write(&path, [0_u8; 100]).unwrap();
        assert!(matches!(read(&path), Err(Error::SegmentFormat { .. })));
    }

    #[test]
    fn test_read_metadata_stops_at_header() {
        let dir = TempDir::new().unwrap();
        let full = dir.path().join("full.sac");
        write(&full, &sample_segment()).unwrap();

        let header_only = dir.path().join("header_only.sac");
        let bytes = std::fs::read(&full).unwrap();
        std::fs::write(&header_only, &bytes[..HEADER_BYTES]).unwrap();
        let meta = read_metadata(&header_only).unwrap();
        assert_eq!(meta.sample_count, 4);

        let short = dir.path().join("short_header.sac");
        std::fs::write(&short, &bytes[..HEADER_BYTES - 1]).unwrap();
        assert!(matches!(
            read_metadata(&short),
            Err(Error::SegmentFormat { .. })
        ));
    }
}
