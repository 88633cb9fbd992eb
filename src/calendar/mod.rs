//! Calendar alignment: solar days, period boundaries and timestamp rounding.
//!
//! A *solar day* is the 1-indexed ordinal day of the year used in segment
//! filenames and SAC headers (`nzjday`).

mod period;

pub use period::{LabelFormat, PeriodScale, PeriodWindow};

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Whether `year` is a Gregorian leap year.
pub const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a year.
pub const fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Number of days in `month` of `year`.
pub fn days_in_month(month: u32, year: i32) -> Result<u32> {
    let (first, last) = solar_day_range_of_month(month, year)?;
    Ok(last - first + 1)
}

/// Ordinal day of year (1-based) for a calendar date.
///
/// # Examples
///
/// ```
/// use sacmerge::calendar::solar_day;
///
/// assert_eq!(solar_day(1, 3, 2016).ok(), Some(61));
/// assert_eq!(solar_day(1, 3, 2015).ok(), Some(60));
/// ```
pub fn solar_day(day: u32, month: u32, year: i32) -> Result<u32> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.ordinal())
        .ok_or(Error::InvalidDate { year, month, day })
}

/// Inclusive solar-day bounds of a month.
pub fn solar_day_range_of_month(month: u32, year: i32) -> Result<(u32, u32)> {
    let first = solar_day(1, month, year)?;
    let last = if month == 12 {
        days_in_year(year)
    } else {
        solar_day(1, month + 1, year)? - 1
    };
    Ok((first, last))
}

/// Inclusive solar-day bounds of a year.
pub const fn solar_day_range_of_year(year: i32) -> (u32, u32) {
    (1, days_in_year(year))
}

/// Solar day used as the inclusive closing label of a period ending at `end`.
///
/// An exclusive end at `YYYY-01-01T00:00:00` labels the last day of the
/// preceding year (365 or 366) instead of day 1.
pub fn closing_solar_day(end: DateTime<Utc>) -> u32 {
    let ordinal = end.ordinal();
    let at_midnight = end.time() == NaiveTime::MIN;
    if ordinal == 1 && at_midnight {
        days_in_year(end.year() - 1)
    } else {
        ordinal
    }
}

/// Calendar unit a timestamp can be rounded down to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RoundUnit {
    /// Drop sub-second fractions.
    #[default]
    Second,
    /// Start of the minute.
    Minute,
    /// Start of the hour.
    Hour,
    /// Midnight of the day.
    Day,
    /// Midnight of the first day of the month.
    Month,
    /// Midnight of January 1.
    Year,
}

impl std::fmt::Display for RoundUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Second => write!(f, "second"),
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

/// Round `timestamp` down to the start of `unit`.
///
/// Idempotent: rounding an already rounded timestamp returns it unchanged.
pub fn round_time(timestamp: DateTime<Utc>, unit: RoundUnit) -> DateTime<Utc> {
    // Components are taken from a valid timestamp, so the floor always exists.
    floor_to(timestamp, unit).unwrap_or(timestamp)
}

fn floor_to(ts: DateTime<Utc>, unit: RoundUnit) -> Option<DateTime<Utc>> {
    let date = ts.date_naive();
    let (date, time) = match unit {
        RoundUnit::Second => (
            date,
            NaiveTime::from_hms_opt(ts.hour(), ts.minute(), ts.second())?,
        ),
        RoundUnit::Minute => (date, NaiveTime::from_hms_opt(ts.hour(), ts.minute(), 0)?),
        RoundUnit::Hour => (date, NaiveTime::from_hms_opt(ts.hour(), 0, 0)?),
        RoundUnit::Day => (date, NaiveTime::MIN),
        RoundUnit::Month => (date.with_day(1)?, NaiveTime::MIN),
        RoundUnit::Year => (NaiveDate::from_ymd_opt(ts.year(), 1, 1)?, NaiveTime::MIN),
    };
    Some(date.and_time(time).and_utc())
}

/// Midnight UTC of a calendar date.
pub(crate) fn midnight(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or(Error::InvalidDate { year, month, day })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_solar_day_first_of_year() {
        for year in [1900, 2000, 2014, 2016] {
            assert_eq!(solar_day(1, 1, year).unwrap(), 1);
        }
    }

    #[test]
    fn test_solar_day_last_of_year() {
        assert_eq!(solar_day(31, 12, 2015).unwrap(), 365);
        assert_eq!(solar_day(31, 12, 2016).unwrap(), 366);
        assert_eq!(solar_day(31, 12, 1900).unwrap(), 365);
        assert_eq!(solar_day(31, 12, 2000).unwrap(), 366);
    }

    #[test]
    fn test_solar_day_invalid_date() {
        assert!(solar_day(29, 2, 2015).is_err());
        assert!(solar_day(1, 13, 2015).is_err());
        assert!(solar_day(0, 1, 2015).is_err());
    }

    #[test]
    fn test_solar_day_range_of_month() {
        assert_eq!(solar_day_range_of_month(1, 2015).unwrap(), (1, 31));
        assert_eq!(solar_day_range_of_month(2, 2015).unwrap(), (32, 59));
        assert_eq!(solar_day_range_of_month(2, 2016).unwrap(), (32, 60));
        assert_eq!(solar_day_range_of_month(3, 2015).unwrap(), (60, 90));
        assert_eq!(solar_day_range_of_month(12, 2016).unwrap(), (336, 366));
    }

    #[test]
    fn test_solar_day_range_of_year() {
        assert_eq!(solar_day_range_of_year(2014), (1, 365));
        assert_eq!(solar_day_range_of_year(2012), (1, 366));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2, 2015).unwrap(), 28);
        assert_eq!(days_in_month(2, 2016).unwrap(), 29);
        assert_eq!(days_in_month(4, 2016).unwrap(), 30);
        assert!(days_in_month(0, 2016).is_err());
    }

    #[test]
    fn test_closing_solar_day_year_end_override() {
        let end = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(closing_solar_day(end), 365);
        let end = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(closing_solar_day(end), 366);
    }

    #[test]
    fn test_closing_solar_day_regular() {
        let end = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 1).unwrap();
        assert_eq!(closing_solar_day(end), 1);
        let end = Utc.with_ymd_and_hms(2014, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(closing_solar_day(end), 64);
    }

    #[test]
    fn test_round_time_month() {
        let ts = Utc.with_ymd_and_hms(2015, 3, 17, 13, 45, 12).unwrap();
        let rounded = round_time(ts, RoundUnit::Month);
        assert_eq!(rounded, Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_round_time_second_drops_fraction() {
        let ts = Utc.with_ymd_and_hms(2015, 3, 17, 13, 45, 12).unwrap()
            + chrono::TimeDelta::milliseconds(999);
        let rounded = round_time(ts, RoundUnit::Second);
        assert_eq!(rounded, Utc.with_ymd_and_hms(2015, 3, 17, 13, 45, 12).unwrap());
    }

    #[test]
    fn test_round_time_each_unit() {
        let ts = Utc.with_ymd_and_hms(2016, 7, 9, 8, 7, 6).unwrap();
        let expect = |y, mo, d, h, mi, s| Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        assert_eq!(round_time(ts, RoundUnit::Minute), expect(2016, 7, 9, 8, 7, 0));
        assert_eq!(round_time(ts, RoundUnit::Hour), expect(2016, 7, 9, 8, 0, 0));
        assert_eq!(round_time(ts, RoundUnit::Day), expect(2016, 7, 9, 0, 0, 0));
        assert_eq!(round_time(ts, RoundUnit::Year), expect(2016, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_round_time_idempotent() {
        let units = [
            RoundUnit::Second,
            RoundUnit::Minute,
            RoundUnit::Hour,
            RoundUnit::Day,
            RoundUnit::Month,
            RoundUnit::Year,
        ];
        let base = Utc.with_ymd_and_hms(2012, 2, 29, 23, 59, 59).unwrap();
        for offset_ms in [0_i64, 1, 499, 86_399_999, 3_000_000_000] {
            let ts = base + chrono::TimeDelta::milliseconds(offset_ms);
            for unit in units {
                let once = round_time(ts, unit);
                assert_eq!(round_time(once, unit), once, "unit {unit} at {ts}");
                assert!(once <= ts);
            }
        }
    }
}
