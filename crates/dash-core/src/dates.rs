//! Date-range presets for the DateRange input
//!
//! Presets resolve to concrete inclusive ISO `YYYY-MM-DD` bounds relative
//! to a reference day. Resolution is a pure function of that day so it can
//! be pinned in tests.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// The fixed set of date-range preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRangePreset {
    Last7Days,
    Last30Days,
    Last3Months,
    Last6Months,
    Last12Months,
    MonthToDate,
    YearToDate,
    LastYear,
    AllTime,
}

/// Fallback when an input declares no default (or an unknown one).
pub const DEFAULT_PRESET: DateRangePreset = DateRangePreset::Last6Months;

impl DateRangePreset {
    /// Ordered option list for UI rendering.
    pub const ALL: [DateRangePreset; 9] = [
        DateRangePreset::Last7Days,
        DateRangePreset::Last30Days,
        DateRangePreset::Last3Months,
        DateRangePreset::Last6Months,
        DateRangePreset::Last12Months,
        DateRangePreset::MonthToDate,
        DateRangePreset::YearToDate,
        DateRangePreset::LastYear,
        DateRangePreset::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRangePreset::Last7Days => "last-7-days",
            DateRangePreset::Last30Days => "last-30-days",
            DateRangePreset::Last3Months => "last-3-months",
            DateRangePreset::Last6Months => "last-6-months",
            DateRangePreset::Last12Months => "last-12-months",
            DateRangePreset::MonthToDate => "month-to-date",
            DateRangePreset::YearToDate => "year-to-date",
            DateRangePreset::LastYear => "last-year",
            DateRangePreset::AllTime => "all-time",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == key)
    }

    /// Display label for option lists.
    pub fn label(&self) -> &'static str {
        match self {
            DateRangePreset::Last7Days => "Last 7 Days",
            DateRangePreset::Last30Days => "Last 30 Days",
            DateRangePreset::Last3Months => "Last 3 Months",
            DateRangePreset::Last6Months => "Last 6 Months",
            DateRangePreset::Last12Months => "Last 12 Months",
            DateRangePreset::MonthToDate => "Month to Date",
            DateRangePreset::YearToDate => "Year to Date",
            DateRangePreset::LastYear => "Last Year",
            DateRangePreset::AllTime => "All Time",
        }
    }

    /// Resolve to inclusive `(start, end)` ISO bounds relative to `today`.
    pub fn resolve(&self, today: NaiveDate) -> (String, String) {
        let (start, end) = match self {
            DateRangePreset::Last7Days => (today - Duration::days(6), today),
            DateRangePreset::Last30Days => (today - Duration::days(29), today),
            DateRangePreset::Last3Months => (months_back(today, 3), today),
            DateRangePreset::Last6Months => (months_back(today, 6), today),
            DateRangePreset::Last12Months => (year_back(today), today),
            DateRangePreset::MonthToDate => (first_of_month(today), today),
            DateRangePreset::YearToDate => (first_of_year(today), today),
            DateRangePreset::LastYear => {
                let y = today.year() - 1;
                (ymd(y, 1, 1), ymd(y, 12, 31))
            }
            DateRangePreset::AllTime => (ymd(2000, 1, 1), today),
        };
        (iso(start), iso(end))
    }

    /// Resolve against the local calendar day.
    pub fn resolve_today(&self) -> (String, String) {
        self.resolve(Local::now().date_naive())
    }
}

fn iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // Only called with in-range constants.
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    ymd(d.year(), d.month(), 1)
}

fn first_of_year(d: NaiveDate) -> NaiveDate {
    ymd(d.year(), 1, 1)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    (ymd(next_y, next_m, 1) - Duration::days(1)).day()
}

/// Step back a number of calendar months, clamping the day-of-month to the
/// target month's length (Jan 31 minus one month is Dec 31, Mar 31 minus
/// one month is Feb 28/29).
fn months_back(d: NaiveDate, months: u32) -> NaiveDate {
    let total = d.year() * 12 + d.month0() as i32 - months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = d.day().min(days_in_month(year, month));
    ymd(year, month, day)
}

/// Same month and day one year earlier; Feb 29 rolls to Mar 1.
fn year_back(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year() - 1, d.month(), d.day())
        .unwrap_or_else(|| ymd(d.year() - 1, 3, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_round_trip() {
        for preset in DateRangePreset::ALL {
            assert_eq!(DateRangePreset::parse(preset.as_str()), Some(preset));
        }
        assert_eq!(DateRangePreset::parse("fortnight"), None);
    }

    #[test]
    fn test_simple_ranges() {
        let today = day("2024-06-15");
        assert_eq!(
            DateRangePreset::Last7Days.resolve(today),
            ("2024-06-09".to_string(), "2024-06-15".to_string())
        );
        assert_eq!(
            DateRangePreset::MonthToDate.resolve(today),
            ("2024-06-01".to_string(), "2024-06-15".to_string())
        );
        assert_eq!(
            DateRangePreset::YearToDate.resolve(today),
            ("2024-01-01".to_string(), "2024-06-15".to_string())
        );
        assert_eq!(
            DateRangePreset::LastYear.resolve(today),
            ("2023-01-01".to_string(), "2023-12-31".to_string())
        );
        assert_eq!(
            DateRangePreset::AllTime.resolve(today),
            ("2000-01-01".to_string(), "2024-06-15".to_string())
        );
    }

    #[test]
    fn test_month_end_clamping() {
        // Mar 31 minus 3 months lands on Dec 31; minus 6 lands on Sep 30.
        let today = day("2024-03-31");
        assert_eq!(
            DateRangePreset::Last3Months.resolve(today).0,
            "2023-12-31".to_string()
        );
        assert_eq!(
            DateRangePreset::Last6Months.resolve(today).0,
            "2023-09-30".to_string()
        );
    }

    #[test]
    fn test_leap_day_year_back() {
        let today = day("2024-02-29");
        assert_eq!(
            DateRangePreset::Last12Months.resolve(today).0,
            "2023-03-01".to_string()
        );
    }
}
