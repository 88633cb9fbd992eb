//! Reading and writing sacmerge configuration files.

use super::paths::ConfigSource;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::merge::OverlapMethod;
use std::path::Path;
use tracing::{debug, warn};

/// Comment block written above `config init` output.
const TEMPLATE_HEADER: &str = "\
# sacmerge configuration
#
# [pattern]   Filename grammar tokens: s = literal field, x = ignored, i = integer
#             (solar day). Merge grammars need two literals: station, year token.
# [merge]     method: keep-first | keep-last | interpolate
#             interpolation_samples: crossfade length, negative blends the whole overlap
#             fill_gaps = false keeps missing samples as gaps; such units fail to write
#             round_unit: second | minute | hour | day | month | year
#             decimate_to = <Hz> downsamples each merged record before it is written
# [decimate]  fs_new is a request; the written rate is source / floor(source / fs_new)
# [spectrogram] frame_seconds: frame length (3600 = hourly spectra)
#             normalize = true rescales all magnitudes to [0, 1]
";

/// Load the configuration chosen by `source`.
///
/// A missing file yields the defaults. Settings that cannot affect the
/// output are reported as warnings.
pub fn load_config(source: &ConfigSource) -> Result<Config> {
    let path = source.path();
    if !path.exists() {
        debug!("No configuration at {source}, using defaults");
        return Ok(Config::default());
    }

    debug!("Loading configuration from {source}");
    let config = load_config_file(path)?;
    for note in ineffective_settings(&config) {
        warn!("{}: {note}", path.display());
    }
    Ok(config)
}

/// Parse one TOML file. A missing file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Settings that are present but have no effect given the others.
pub fn ineffective_settings(config: &Config) -> Vec<String> {
    let merge = &config.merge;
    let defaults = Config::default();
    let mut notes = Vec::new();

    if merge.method != OverlapMethod::Interpolate
        && merge.interpolation_samples != defaults.merge.interpolation_samples
    {
        notes.push(format!(
            "merge.interpolation_samples is ignored with method '{}'",
            merge.method
        ));
    }
    if !merge.fill_gaps && merge.fill_value != defaults.merge.fill_value {
        notes.push("merge.fill_value is ignored while merge.fill_gaps = false".to_string());
    }
    if !merge.round_time && merge.round_unit != defaults.merge.round_unit {
        notes.push("merge.round_unit is ignored while merge.round_time = false".to_string());
    }
    if !config.decimate.round_time && config.decimate.round_unit != defaults.decimate.round_unit {
        notes.push("decimate.round_unit is ignored while decimate.round_time = false".to_string());
    }
    notes
}

/// Render `config` as annotated TOML.
pub fn render_config(config: &Config) -> Result<String> {
    let body = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;
    Ok(format!("{TEMPLATE_HEADER}\n{body}"))
}

/// Write `config` to `path`, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(path, render_config(config)?).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::calendar::{PeriodScale, RoundUnit};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_missing_file_yields_defaults() {
        let source = ConfigSource::Explicit("/nonexistent/path/config.toml".into());
        assert_eq!(load_config(&source).unwrap(), Config::default());
    }

    #[test]
    fn test_load_merge_and_decimate_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[merge]
scale = "year"
method = "keep-first"
fill_value = -1.0
round_unit = "hour"
decimate_to = 0.5
year_tokens = ["EHZ_2014"]

[decimate]
fs_new = 0.5
"#
        )
        .unwrap();

        let config = load_config(&ConfigSource::Local(file.path().to_path_buf())).unwrap();
        assert_eq!(config.merge.scale, PeriodScale::Year);
        assert_eq!(config.merge.method, OverlapMethod::KeepFirst);
        assert_eq!(config.merge.policy().fill_value, Some(-1.0));
        assert_eq!(config.merge.round_unit(), Some(RoundUnit::Hour));
        assert_eq!(config.merge.decimate_to, Some(0.5));
        assert_eq!(config.merge.year_tokens, vec!["EHZ_2014"]);
        assert_eq!(config.decimate.fs_new, 0.5);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[merge\nmethod = ").unwrap();
        let err = load_config_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_ineffective_settings() {
        assert!(ineffective_settings(&Config::default()).is_empty());

        let mut config = Config::default();
        config.merge.method = OverlapMethod::KeepLast;
        config.merge.interpolation_samples = 10;
        config.merge.fill_gaps = false;
        config.merge.fill_value = -1.0;
        let notes = ineffective_settings(&config);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("keep-last"));
        assert!(notes[1].contains("fill_value"));
    }

    #[test]
    fn test_saved_template_is_annotated_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sacmerge.toml");
        let mut config = Config::default();
        config.merge.station_groups = vec!["STA01".to_string(), "STA02".to_string()];
        config.merge.decimate_to = Some(0.1);
        config.decimate.day_range = Some([1, 31]);

        save_config(&config, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# sacmerge configuration"));
        assert!(text.contains("keep-first | keep-last | interpolate"));
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
