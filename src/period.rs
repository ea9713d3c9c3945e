// 📅 Period Filter - Year / month selection over contract creation dates
//
// Dates are stored as `YYYY-MM-DD` strings and read as local calendar dates:
// no time zone is ever attached, so "2024-05-01" is May 1st everywhere.
//
// Year and month are independently optional and conjunctive when both are
// set. A value that does not parse means "no filter" rather than an error.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored date as a calendar date.
///
/// Accepts the plain `YYYY-MM-DD` form, and also tolerates a trailing time
/// part (`2024-05-01T00:00:00`) by reading only the date prefix.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok().or_else(|| {
        trimmed
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
    })
}

// ============================================================================
// FILTER VALUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthFilter {
    #[default]
    All,
    /// 1 = January ... 12 = December
    Month(u32),
}

impl YearFilter {
    /// "all", empty, or anything non-numeric means no filter
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<i32>() {
            Ok(year) => YearFilter::Year(year),
            Err(_) => YearFilter::All,
        }
    }

    pub fn matches(&self, year: i32) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => *y == year,
        }
    }
}

impl MonthFilter {
    /// Out-of-range months fall back to no filter as well
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<u32>() {
            Ok(month) => MonthFilter::from_number(month),
            Err(_) => MonthFilter::All,
        }
    }

    pub fn from_number(month: u32) -> Self {
        if (1..=12).contains(&month) {
            MonthFilter::Month(month)
        } else {
            MonthFilter::All
        }
    }

    pub fn matches(&self, month: u32) -> bool {
        match self {
            MonthFilter::All => true,
            MonthFilter::Month(m) => *m == month,
        }
    }
}

// ============================================================================
// DATE FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateFilter {
    pub year: YearFilter,
    pub month: MonthFilter,
}

impl DateFilter {
    /// No filtering at all
    pub fn all() -> Self {
        DateFilter::default()
    }

    pub fn new(year: Option<i32>, month: Option<u32>) -> Self {
        DateFilter {
            year: year.map_or(YearFilter::All, YearFilter::Year),
            month: month.map_or(MonthFilter::All, MonthFilter::from_number),
        }
    }

    /// Build from raw control values such as `("2024", "5")` or `("all", "all")`
    pub fn parse(year: &str, month: &str) -> Self {
        DateFilter {
            year: YearFilter::parse(year),
            month: MonthFilter::parse(month),
        }
    }

    pub fn is_all(&self) -> bool {
        self.year == YearFilter::All && self.month == MonthFilter::All
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.year.matches(date.year()) && self.month.matches(date.month())
    }

    /// Match a stored date string.
    ///
    /// An unparseable date only passes the unrestricted filter.
    pub fn matches(&self, value: &str) -> bool {
        if self.is_all() {
            return true;
        }

        match parse_date(value) {
            Some(date) => self.matches_date(date),
            None => {
                tracing::warn!(date = value, "unparseable date excluded by period filter");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_plain_and_with_time() {
        assert_eq!(parse_date("2024-05-01"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_date(" 2024-05-01 "), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(
            parse_date("2024-12-31T23:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        assert_eq!(parse_date("01/05/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_first_of_month_stays_in_month() {
        // A UTC parse would shift this to April 30th west of Greenwich
        let date = parse_date("2024-05-01").unwrap();
        assert_eq!(date.month(), 5);
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_malformed_values_mean_all() {
        assert_eq!(DateFilter::parse("all", "all"), DateFilter::all());
        assert_eq!(DateFilter::parse("", "13"), DateFilter::all());
        assert_eq!(DateFilter::parse("twenty", "0"), DateFilter::all());
        assert_eq!(
            DateFilter::parse("2024", "5"),
            DateFilter::new(Some(2024), Some(5))
        );
        assert_eq!(DateFilter::new(None, Some(42)).month, MonthFilter::All);
    }

    #[test]
    fn test_year_and_month_are_conjunctive() {
        let filter = DateFilter::new(Some(2024), Some(5));

        assert!(filter.matches("2024-05-01"));
        assert!(!filter.matches("2024-06-01"));
        assert!(!filter.matches("2023-05-01"));
    }

    #[test]
    fn test_independent_year_or_month() {
        let year_only = DateFilter::new(Some(2023), None);
        assert!(year_only.matches("2023-01-15"));
        assert!(year_only.matches("2023-11-15"));
        assert!(!year_only.matches("2024-01-15"));

        let month_only = DateFilter::new(None, Some(3));
        assert!(month_only.matches("2021-03-09"));
        assert!(month_only.matches("2025-03-30"));
        assert!(!month_only.matches("2025-04-01"));
    }

    #[test]
    fn test_unparseable_date_only_passes_unrestricted_filter() {
        assert!(DateFilter::all().matches("not a date"));
        assert!(!DateFilter::new(Some(2024), None).matches("not a date"));
    }
}
