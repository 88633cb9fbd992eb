//! Configuration type definitions.

use crate::calendar::{LabelFormat, PeriodScale, RoundUnit};
use crate::constants::decimate::DEFAULT_FS_NEW;
use crate::constants::pattern::{
    DEFAULT_DECIMATE_GRAMMAR, DEFAULT_DELIMITER, DEFAULT_EXTENSION, DEFAULT_MERGE_GRAMMAR,
};
use crate::decimate::DecimateOptions;
use crate::merge::{MergePolicy, OverlapMethod};
use crate::segment::SegmentFormat;
use crate::spectrogram::SpectrogramOptions;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input filename layout.
    pub pattern: PatternConfig,

    /// Merge settings.
    pub merge: MergeConfig,

    /// Decimation settings.
    pub decimate: DecimateConfig,

    /// Spectrogram settings.
    pub spectrogram: SpectrogramOptions,
}

/// Filename layout of segment files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Field delimiter.
    pub delimiter: String,

    /// Grammar for merge inputs (station, year token, solar day).
    pub merge_grammar: String,

    /// Grammar for decimation inputs.
    pub decimate_grammar: String,

    /// Extension of segment files.
    pub extension: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            merge_grammar: DEFAULT_MERGE_GRAMMAR.to_string(),
            decimate_grammar: DEFAULT_DECIMATE_GRAMMAR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// Merge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Length of one merged unit.
    pub scale: PeriodScale,

    /// Period label in output names.
    pub label: LabelFormat,

    /// Overlap resolution.
    pub method: OverlapMethod,

    /// Crossfade length in samples; negative blends the whole overlap.
    pub interpolation_samples: i64,

    /// Fill missing samples with `fill_value`. When false, gaps stay
    /// unmaterialized and the affected units fail.
    pub fill_gaps: bool,

    /// Value for missing samples.
    pub fill_value: f32,

    /// Round the start time of merged records.
    pub round_time: bool,

    /// Unit used when rounding.
    pub round_unit: RoundUnit,

    /// Delete sources after a successful year-scale write.
    pub remove_sources: bool,

    /// Decimate merged records to this rate in Hz before writing. The
    /// filter options come from the `[decimate]` section.
    pub decimate_to: Option<f64>,

    /// Output format.
    pub output_format: SegmentFormat,

    /// Station values, one merge group each.
    pub station_groups: Vec<String>,

    /// Year tokens such as `EHZ_2015`.
    pub year_tokens: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            scale: PeriodScale::Month,
            label: LabelFormat::SolarDay,
            method: OverlapMethod::Interpolate,
            interpolation_samples: -1,
            fill_gaps: true,
            fill_value: 0.0,
            round_time: true,
            round_unit: RoundUnit::Second,
            remove_sources: false,
            decimate_to: None,
            output_format: SegmentFormat::Sac,
            station_groups: Vec::new(),
            year_tokens: Vec::new(),
        }
    }
}

impl MergeConfig {
    /// Merge policy described by these settings.
    pub fn policy(&self) -> MergePolicy {
        MergePolicy {
            method: self.method,
            interpolation_samples: usize::try_from(self.interpolation_samples).ok(),
            fill_value: self.fill_gaps.then_some(self.fill_value),
        }
    }

    /// Rounding unit, if rounding is enabled.
    pub fn round_unit(&self) -> Option<RoundUnit> {
        self.round_time.then_some(self.round_unit)
    }
}

impl Config {
    /// Decimation applied at the end of a merge batch, if enabled.
    pub fn merge_decimation(&self) -> Option<(f64, DecimateOptions)> {
        self.merge
            .decimate_to
            .map(|fs_new| (fs_new, self.decimate.options()))
    }
}

/// Decimation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimateConfig {
    /// Target sampling rate in Hz.
    pub fs_new: f64,

    /// Subtract the mean before filtering.
    pub remove_dc: bool,

    /// Round the output start time.
    pub round_time: bool,

    /// Unit used when rounding.
    pub round_unit: RoundUnit,

    /// Accepted values per literal field of the decimate grammar.
    pub accepted: Vec<Vec<String>>,

    /// Inclusive solar-day range `[first, last]`.
    pub day_range: Option<[i64; 2]>,

    /// Output format.
    pub output_format: SegmentFormat,
}

impl Default for DecimateConfig {
    fn default() -> Self {
        Self {
            fs_new: DEFAULT_FS_NEW,
            remove_dc: true,
            round_time: false,
            round_unit: RoundUnit::Second,
            accepted: Vec::new(),
            day_range: None,
            output_format: SegmentFormat::Sac,
        }
    }
}

impl DecimateConfig {
    /// Filter options described by these settings.
    pub fn options(&self) -> DecimateOptions {
        DecimateOptions {
            remove_dc: self.remove_dc,
            round_unit: self.round_time.then_some(self.round_unit),
        }
    }

    /// Solar-day range as an inclusive range.
    pub fn day_range(&self) -> Option<RangeInclusive<i64>> {
        self.day_range.map(|[first, last]| first..=last)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_defaults() {
        let merge = MergeConfig::default();
        let policy = merge.policy();
        assert_eq!(policy.method, OverlapMethod::Interpolate);
        assert_eq!(policy.interpolation_samples, None);
        assert_eq!(policy.fill_value, Some(0.0));
        assert_eq!(merge.round_unit(), Some(RoundUnit::Second));
    }

    #[test]
    fn test_merge_policy_without_fill() {
        let merge = MergeConfig {
            fill_gaps: false,
            interpolation_samples: 5,
            ..MergeConfig::default()
        };
        let policy = merge.policy();
        assert_eq!(policy.fill_value, None);
        assert_eq!(policy.interpolation_samples, Some(5));
    }

    #[test]
    fn test_merge_decimation_uses_decimate_options() {
        let mut config: Config = toml::from_str(
            r#"
[merge]
decimate_to = 0.5

[decimate]
remove_dc = false
round_time = true
round_unit = "minute"
"#,
        )
        .unwrap();
        let (fs_new, options) = config.merge_decimation().unwrap();
        assert_eq!(fs_new, 0.5);
        assert!(!options.remove_dc);
        assert_eq!(options.round_unit, Some(RoundUnit::Minute));

        config.merge.decimate_to = None;
        assert!(config.merge_decimation().is_none());
    }

    #[test]
    fn test_decimate_defaults() {
        let decimate = DecimateConfig::default();
        assert_eq!(decimate.fs_new, 1.0);
        assert!(decimate.options().remove_dc);
        assert_eq!(decimate.options().round_unit, None);
        assert_eq!(decimate.day_range(), None);
    }

    #[test]
    fn test_config_toml_sections() {
        let config: Config = toml::from_str(
            r#"
[merge]
scale = "year"
label = "year"
method = "keep-last"
station_groups = ["STA01"]

[decimate]
day_range = [60, 90]
accepted = [["STA01"], ["TW"], ["EHZ_2015"]]
"#,
        )
        .unwrap();
        assert_eq!(config.merge.scale, PeriodScale::Year);
        assert_eq!(config.merge.label, LabelFormat::Year);
        assert_eq!(config.merge.method, OverlapMethod::KeepLast);
        assert_eq!(config.decimate.day_range(), Some(60..=90));
        assert_eq!(config.decimate.accepted.len(), 3);
        assert_eq!(config.pattern, PatternConfig::default());
    }
}
