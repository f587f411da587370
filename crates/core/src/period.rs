//! Pay periods and calendar ranges.

use core::fmt;
use core::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A calendar month of payroll.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct PayPeriod {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for PayPeriod {
    type Error = DomainError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        PayPeriod::new(raw.year, raw.month)
    }
}

impl PayPeriod {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(2000..=2100).contains(&year) {
            return Err(DomainError::validation(format!("year {year} out of range 2000..=2100")));
        }
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!("month {month} out of range 1..=12")));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructor guarantees a valid year/month.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or_default()
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    /// Monday..Friday count; public holidays are not modelled.
    pub fn weekdays(&self) -> u32 {
        self.first_day()
            .iter_days()
            .take_while(|d| *d <= self.last_day())
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u32
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn as_range(&self) -> DateRange {
        DateRange {
            from: self.first_day(),
            to: self.last_day(),
        }
    }

    /// All twelve months of a year, January first.
    pub fn months_of(year: i32) -> DomainResult<Vec<PayPeriod>> {
        (1..=12).map(|m| PayPeriod::new(year, m)).collect()
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PayPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| DomainError::validation(format!("period '{s}' must be YYYY-MM")))?;
        let year = y
            .parse::<i32>()
            .map_err(|_| DomainError::validation(format!("invalid year in '{s}'")))?;
        let month = m
            .parse::<u32>()
            .map_err(|_| DomainError::validation(format!("invalid month in '{s}'")))?;
        PayPeriod::new(year, month)
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Deserialize)]
struct RawRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl TryFrom<RawRange> for DateRange {
    type Error = DomainError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.from, raw.to)
    }
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> DomainResult<Self> {
        if from > to {
            return Err(DomainError::validation(format!(
                "range start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_bounds() {
        let feb = PayPeriod::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert_eq!(PayPeriod::new(2025, 12).unwrap().last_day(), date(2025, 12, 31));
        assert!(PayPeriod::new(2025, 13).is_err());
        assert!(PayPeriod::new(1999, 1).is_err());
    }

    #[test]
    fn weekdays_exclude_weekends() {
        // March 2025 starts on a Saturday: 31 days, 10 weekend days.
        assert_eq!(PayPeriod::new(2025, 3).unwrap().weekdays(), 21);
    }

    #[test]
    fn parses_and_displays_iso_month() {
        let p: PayPeriod = "2025-03".parse().unwrap();
        assert_eq!(p.to_string(), "2025-03");
        assert!("2025/03".parse::<PayPeriod>().is_err());
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let r = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert!(r.contains(date(2025, 1, 31)));
        assert!(!r.contains(date(2025, 2, 1)));
        assert!(DateRange::new(date(2025, 2, 1), date(2025, 1, 1)).is_err());
    }

    #[test]
    fn deserializing_checks_bounds() {
        let p: PayPeriod = serde_json::from_str(r#"{"year":2025,"month":3}"#).unwrap();
        assert_eq!(p, PayPeriod::new(2025, 3).unwrap());
        assert!(serde_json::from_str::<PayPeriod>(r#"{"year":2025,"month":13}"#).is_err());
        assert!(serde_json::from_str::<PayPeriod>(r#"{"year":1999,"month":1}"#).is_err());
        assert!(
            serde_json::from_str::<DateRange>(r#"{"from":"2025-02-01","to":"2025-01-01"}"#).is_err()
        );
    }
}
