//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

/// Values accepted for one literal field of a filename grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSet(pub Vec<String>);

/// Parse a comma-separated accepted-value set, e.g. `STA01,STA02`.
pub fn parse_accepted_set(s: &str) -> Result<AcceptedSet, String> {
    let values: Vec<String> = s
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    if values.is_empty() {
        return Err(format!("'{s}' contains no values"));
    }

    Ok(AcceptedSet(values))
}

/// Parse an inclusive solar-day range `first-last`, e.g. `60-90`.
pub fn parse_day_range(s: &str) -> Result<[i64; 2], String> {
    let (first, last) = s
        .split_once('-')
        .ok_or_else(|| format!("'{s}' is not a range like 60-90"))?;
    let first: i64 = first
        .trim()
        .parse()
        .map_err(|_| format!("'{first}' is not a valid day"))?;
    let last: i64 = last
        .trim()
        .parse()
        .map_err(|_| format!("'{last}' is not a valid day"))?;

    if first > last {
        return Err(format!("range start {first} is after end {last}"));
    }

    Ok([first, last])
}

/// Parse and validate a positive sampling rate in Hz.
pub fn parse_rate(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(format!("sampling rate must be positive, got {value}"));
    }

    Ok(value)
}

/// Parse a positive duration in seconds.
pub fn parse_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(format!("duration must be positive, got {value} s"));
    }

    Ok(value)
}

/// Parse a finite fill value.
pub fn parse_fill_value(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !value.is_finite() {
        return Err(format!("fill value must be finite, got {value}"));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_set() {
        assert_eq!(
            parse_accepted_set("STA01, STA02").unwrap(),
            AcceptedSet(vec!["STA01".to_string(), "STA02".to_string()])
        );
        assert!(parse_accepted_set(" , ").is_err());
    }

    #[test]
    fn test_parse_day_range_valid() {
        assert_eq!(parse_day_range("60-90").ok(), Some([60, 90]));
        assert_eq!(parse_day_range("1-1").ok(), Some([1, 1]));
    }

    #[test]
    fn test_parse_day_range_invalid() {
        assert!(parse_day_range("90-60").is_err());
        assert!(parse_day_range("60").is_err());
        assert!(parse_day_range("a-b").is_err());
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("0.5").ok(), Some(0.5));
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("-1").is_err());
        assert!(parse_rate("inf").is_err());
        assert!(parse_rate("abc").is_err());
    }

    #[test]
    fn test_parse_fill_value() {
        assert_eq!(parse_fill_value("-1.5").ok(), Some(-1.5));
        assert!(parse_fill_value("NaN").is_err());
    }
}
