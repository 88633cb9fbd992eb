//! Collision-free output file names.

use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use tracing::debug;

/// RAII claim on an output path.
///
/// The file is created exclusively, so two writers never receive the same
/// name. Dropping an uncommitted reservation removes the placeholder.
#[derive(Debug)]
pub struct OutputReservation {
    path: PathBuf,
    committed: bool,
}

impl OutputReservation {
    /// Claim `dir/file_name`, or `dir/<stem>_<n>.<ext>` with the smallest free
    /// `n >= 1` if it is taken.
    pub fn reserve(dir: &Path, file_name: &str) -> Result<Self> {
        for serial in 0_u64.. {
            let candidate = dir.join(serial_name(file_name, serial));
            let created = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate);

            match created {
                Ok(_) => {
                    register_reservation(&candidate);
                    debug!("Reserved {}", candidate.display());
                    return Ok(Self {
                        path: candidate,
                        committed: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(Error::OutputReserve {
                        path: candidate,
                        source: e,
                    });
                }
            }
        }
        Err(Error::OutputReserve {
            path: dir.join(file_name),
            source: std::io::Error::other("no free serial number"),
        })
    }

    /// Reserved path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file and return its path.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        unregister_reservation(&self.path);
        std::mem::take(&mut self.path)
    }
}

impl Drop for OutputReservation {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
            unregister_reservation(&self.path);
        }
    }
}

/// `name` for serial 0, else `<stem>_<serial>.<ext>` split at the last dot.
pub fn serial_name(name: &str, serial: u64) -> String {
    if serial == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{serial}.{ext}"),
        None => format!("{name}_{serial}"),
    }
}

/// Paths reserved but not yet committed, removed on Ctrl+C.
static ACTIVE_RESERVATIONS: LazyLock<Mutex<Vec<PathBuf>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn register_reservation(path: &Path) {
    if let Ok(mut active) = ACTIVE_RESERVATIONS.lock() {
        active.push(path.to_path_buf());
    }
}

fn unregister_reservation(path: &Path) {
    if let Ok(mut active) = ACTIVE_RESERVATIONS.lock() {
        active.retain(|p| p != path);
    }
}

/// Remove every uncommitted reservation. Called on signal.
pub fn cleanup_all_reservations() {
    if let Ok(active) = ACTIVE_RESERVATIONS.lock() {
        for path in active.iter() {
            let _ = fs::remove_file(path);
        }
    }
}
