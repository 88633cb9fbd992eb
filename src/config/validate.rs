//! Configuration validation.

use crate::config::{Config, DecimateConfig, MergeConfig, PatternConfig};
use crate::error::{Error, Result};
use crate::filter::Grammar;
use crate::spectrogram::SpectrogramOptions;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_pattern(&config.pattern)?;
    validate_merge(&config.merge)?;
    validate_decimate(&config.decimate)?;
    validate_spectrogram(&config.spectrogram)?;
    Ok(())
}

/// Validate filename layout settings.
fn validate_pattern(pattern: &PatternConfig) -> Result<()> {
    if pattern.extension.is_empty() {
        return Err(Error::ConfigValidation {
            message: "pattern.extension must not be empty".to_string(),
        });
    }

    let merge = Grammar::parse(&pattern.merge_grammar, &pattern.delimiter)?;
    if merge.literal_count() != 2 || merge.integer_count() == 0 {
        return Err(Error::ConfigValidation {
            message: format!(
                "pattern.merge_grammar '{}' needs two literal fields (station, year token) and an integer field",
                pattern.merge_grammar
            ),
        });
    }

    Grammar::parse(&pattern.decimate_grammar, &pattern.delimiter)?;
    Ok(())
}

/// Validate merge settings.
fn validate_merge(merge: &MergeConfig) -> Result<()> {
    if !merge.scale.supports(merge.label) {
        return Err(Error::ConfigValidation {
            message: format!(
                "merge.label '{}' cannot be used with merge.scale '{}'",
                merge.label, merge.scale
            ),
        });
    }

    if !merge.fill_value.is_finite() {
        return Err(Error::ConfigValidation {
            message: format!("merge.fill_value must be finite, got {}", merge.fill_value),
        });
    }

    if let Some(rate) = merge.decimate_to
        && (!rate.is_finite() || rate <= 0.0)
    {
        return Err(Error::ConfigValidation {
            message: format!("merge.decimate_to must be positive, got {rate}"),
        });
    }

    Ok(())
}

/// Validate decimation settings.
fn validate_decimate(decimate: &DecimateConfig) -> Result<()> {
    if !decimate.fs_new.is_finite() || decimate.fs_new <= 0.0 {
        return Err(Error::ConfigValidation {
            message: format!("decimate.fs_new must be positive, got {}", decimate.fs_new),
        });
    }

    if let Some([first, last]) = decimate.day_range
        && first > last
    {
        return Err(Error::ConfigValidation {
            message: format!("decimate.day_range start {first} is after end {last}"),
        });
    }

    Ok(())
}

/// Validate spectrogram settings.
fn validate_spectrogram(spectrogram: &SpectrogramOptions) -> Result<()> {
    if !spectrogram.frame_seconds.is_finite() || spectrogram.frame_seconds <= 0.0 {
        return Err(Error::ConfigValidation {
            message: format!(
                "spectrogram.frame_seconds must be positive, got {}",
                spectrogram.frame_seconds
            ),
        });
    }
    Ok(())
}
