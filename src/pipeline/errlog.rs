//! Append-only log of failed batch units.

use super::coordinator::file_timestamp;
use crate::constants::output::ERROR_LOG_PREFIX;
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One line per failed unit: `<source_basename>: <message>`.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<File>,
    entries: Mutex<usize>,
}

impl ErrorLog {
    /// Open `_errlog_<yyMMddHHmm>.txt` in `dir`, appending to a log left by
    /// a run in the same minute.
    pub fn create(dir: &Path, now: DateTime<Local>) -> Result<Self> {
        let path = dir.join(format!("{ERROR_LOG_PREFIX}{}.txt", file_timestamp(now)));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::ErrorLogOpen {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            entries: Mutex::new(0),
        })
    }

    /// Log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written so far.
    pub fn entries(&self) -> usize {
        self.entries.lock().map_or(0, |n| *n)
    }

    /// Record a failure attributed to `source`.
    pub fn append(&self, source: &Path, error: &Error) -> Result<()> {
        let name = source
            .file_name()
            .map_or_else(|| source.to_string_lossy(), |n| n.to_string_lossy());
        let line = format!("{name}: {}\n", error_chain(error));

        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("error log lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        if let Ok(mut n) = self.entries.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// Messages of `error` and its sources, joined by `": "`.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        let message = cause.to_string();
        if messages.last() != Some(&message) {
            messages.push(message);
        }
        current = cause.source();
    }
    messages.join(": ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_log_name_and_lines() {
        let dir = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2015, 3, 4, 5, 6, 7).unwrap();
        let log = ErrorLog::create(dir.path(), now).unwrap();
        assert_eq!(log.path(), dir.path().join("_errlog_1503040506.txt"));

        log.append(Path::new("/data/STA01.TW.00.EHZ_2015.060.sac"), &Error::EmptyMerge)
            .unwrap();
        let err = Error::SamplingRateMismatch {
            expected: 1.0,
            found: 2.0,
        }
        .in_unit("/data/b.sac");
        log.append(Path::new("/data/b.sac"), &err).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            contents,
            "STA01.TW.00.EHZ_2015.060.sac: no segments to merge\n\
             b.sac: sampling rate mismatch: expected 1 Hz, found 2 Hz\n"
        );
        assert_eq!(log.entries(), 2);
    }

    #[test]
    fn test_error_chain_includes_io_cause() {
        let err = Error::SegmentRead {
            path: PathBuf::from("a.sac"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error_chain(&err), "failed to read segment file 'a.sac': gone");
    }
}
