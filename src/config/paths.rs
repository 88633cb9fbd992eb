//! Where configuration is looked up.
//!
//! A run reads at most one file: the one given with `--config` (or
//! `SACMERGE_CONFIG`), else `sacmerge.toml` in the working directory, else
//! the file in the platform configuration directory.

use crate::constants::APP_NAME;
use crate::constants::config::{FILE_NAME, LOCAL_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// The configuration file chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given on the command line or through the environment.
    Explicit(PathBuf),
    /// `sacmerge.toml` found in the working directory.
    Local(PathBuf),
    /// Per-user file in the platform configuration directory.
    Platform(PathBuf),
}

impl ConfigSource {
    /// Path of the chosen file; it may not exist.
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Local(path) | Self::Platform(path) => path,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(path) => write!(f, "{}", path.display()),
            Self::Local(path) => write!(f, "{} (working directory)", path.display()),
            Self::Platform(path) => write!(f, "{} (user)", path.display()),
        }
    }
}

/// Platform configuration directory, e.g. `~/.config/sacmerge/` on Linux.
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Per-user configuration file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(FILE_NAME))
}

/// Pick the configuration file for a run started in `working_dir`.
pub fn resolve_config_source(explicit: Option<&Path>, working_dir: &Path) -> Result<ConfigSource> {
    if let Some(path) = explicit {
        return Ok(ConfigSource::Explicit(path.to_path_buf()));
    }
    let local = working_dir.join(LOCAL_FILE_NAME);
    if local.is_file() {
        return Ok(ConfigSource::Local(local));
    }
    config_file_path().map(ConfigSource::Platform)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_platform_path_names_app() {
        let path = config_file_path().unwrap();
        assert!(path.to_string_lossy().contains(APP_NAME));
        assert!(path.ends_with(FILE_NAME));
    }

    #[test]
    fn test_explicit_path_wins_over_local_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(LOCAL_FILE_NAME), "").unwrap();
        let explicit = dir.path().join("survey.toml");

        let source = resolve_config_source(Some(&explicit), dir.path()).unwrap();
        assert_eq!(source, ConfigSource::Explicit(explicit));
    }

    #[test]
    fn test_local_file_next_to_data() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join(LOCAL_FILE_NAME);
        std::fs::write(&local, "").unwrap();

        let source = resolve_config_source(None, dir.path()).unwrap();
        assert_eq!(source, ConfigSource::Local(local));
    }

    #[test]
    fn test_falls_back_to_platform_file() {
        let dir = TempDir::new().unwrap();
        let source = resolve_config_source(None, dir.path()).unwrap();
        assert!(matches!(source, ConfigSource::Platform(_)));
        assert!(source.path().ends_with(FILE_NAME));
    }
}
