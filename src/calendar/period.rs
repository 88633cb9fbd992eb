//! Calendar period windows for merged units.

use super::{closing_solar_day, midnight, solar_day, solar_day_range_of_month};
use crate::error::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Duration covered by one merged unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PeriodScale {
    /// One calendar month.
    Month,
    /// One calendar year.
    Year,
}

impl PeriodScale {
    /// All windows of this scale within `year`, in chronological order.
    pub fn windows(self, year: i32) -> Result<Vec<PeriodWindow>> {
        match self {
            Self::Month => (1..=12)
                .map(|month| PeriodWindow::month(month, year))
                .collect(),
            Self::Year => Ok(vec![PeriodWindow::year(year)?]),
        }
    }

    /// Whether output names of this scale can carry `format`.
    pub const fn supports(self, format: LabelFormat) -> bool {
        matches!(
            (self, format),
            (_, LabelFormat::SolarDay) | (Self::Month, LabelFormat::Month) | (Self::Year, LabelFormat::Year)
        )
    }
}

impl std::fmt::Display for PeriodScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

/// How a period is rendered in output filenames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelFormat {
    /// Inclusive solar-day range, e.g. `60-90`.
    #[default]
    #[serde(rename = "solarday")]
    #[value(name = "solarday")]
    SolarDay,
    /// Zero-padded month number, e.g. `03`.
    Month,
    /// Bare year, e.g. `2015`.
    Year,
}

impl std::fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SolarDay => write!(f, "solarday"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

/// Exact calendar interval `[start, end)` one merged unit must span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    year: i32,
    month: Option<u32>,
    first_day: u32,
    last_day: u32,
}

impl PeriodWindow {
    /// Window covering `month` of `year`.
    pub fn month(month: u32, year: i32) -> Result<Self> {
        let (first_day, last_day) = solar_day_range_of_month(month, year)?;
        let start = midnight(year, month, 1)?;
        let end = if month == 12 {
            midnight(year + 1, 1, 1)?
        } else {
            midnight(year, month + 1, 1)?
        };
        Ok(Self {
            start,
            end,
            year,
            month: Some(month),
            first_day,
            last_day,
        })
    }

    /// Window covering the whole of `year`.
    pub fn year(year: i32) -> Result<Self> {
        let start = midnight(year, 1, 1)?;
        let end = midnight(year + 1, 1, 1)?;
        Ok(Self {
            start,
            end,
            year,
            month: None,
            first_day: solar_day(1, 1, year)?,
            last_day: closing_solar_day(end),
        })
    }

    /// Inclusive start of the window.
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end of the window.
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Calendar year of the window.
    pub const fn calendar_year(&self) -> i32 {
        self.year
    }

    /// Month of the window, if it is a month window.
    pub const fn calendar_month(&self) -> Option<u32> {
        self.month
    }

    /// Inclusive solar-day bounds used as labels.
    pub const fn solar_day_range(&self) -> (u32, u32) {
        (self.first_day, self.last_day)
    }

    /// Render the label for output filenames.
    ///
    /// Returns `None` for a month label on a year window.
    pub fn label(&self, format: LabelFormat) -> Option<String> {
        match format {
            LabelFormat::SolarDay => Some(format!("{}-{}", self.first_day, self.last_day)),
            LabelFormat::Month => self.month.map(|m| format!("{m:02}")),
            LabelFormat::Year => Some(self.year.to_string()),
        }
    }
}

impl std::fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.month {
            Some(month) => write!(f, "{}-{month:02}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}
