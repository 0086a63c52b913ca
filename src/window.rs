//! Calendar helpers: month keys, scoring windows, quarter and fiscal-year bounds
//!
//! Every output row is keyed by a `Month` ("YYYY-MM"). Scoring windows are
//! half-open `[start, end)` datetime ranges derived from the configured
//! range mode.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar month used to key every per-RM output row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        assert!((1..=12).contains(&month), "month out of range: {}", month);
        Self { year, month }
    }

    /// Month containing the given date
    pub fn from_date(d: NaiveDate) -> Self {
        Self { year: d.year(), month: d.month() }
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self::from_date(dt.date())
    }

    /// Linear index used by the inactivity gate (year*12 + month)
    pub fn index(&self) -> i64 {
        self.year as i64 * 12 + self.month as i64
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid first day")
    }

    /// First day of the following month (exclusive window end)
    pub fn next_first_day(&self) -> NaiveDate {
        self.next().first_day()
    }

    /// Half-open datetime window covering exactly this month
    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.first_day().and_time(NaiveTime::MIN);
        let end = self.next_first_day().and_time(NaiveTime::MIN);
        (start, end)
    }

    /// All months from `start` through `end` inclusive, ascending
    pub fn range_inclusive(start: Month, end: Month) -> Vec<Month> {
        let mut out = Vec::new();
        let mut cur = start;
        while cur <= end {
            out.push(cur);
            cur = cur.next();
        }
        out
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(2, '-');
        let year: i32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| format!("bad month key: {}", s))?;
        let month: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| format!("bad month key: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in key: {}", s));
        }
        Ok(Month { year, month })
    }
}

impl TryFrom<String> for Month {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Month> for String {
    fn from(m: Month) -> String {
        m.to_string()
    }
}

/// Fiscal-year convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FyMode {
    /// Indian fiscal year, April through March
    #[default]
    #[serde(rename = "FY_APR")]
    FyApr,
    /// Calendar year, January through December
    #[serde(rename = "CAL")]
    Cal,
}

/// Scoring window selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// Exactly the current month
    #[default]
    Month,
    /// 5-day lookback spanning the previous month boundary when needed
    Last5,
    /// Current fiscal year to date
    Fy,
    /// From a named month through the current month
    Since,
}

/// Quarter containing `m`, as (first month, last month, label)
pub fn quarter_bounds(m: Month, fy_mode: FyMode) -> (Month, Month, String) {
    match fy_mode {
        FyMode::FyApr => {
            let (qs, qe, qn, fy_start_year) = match m.month {
                4..=6 => (4, 6, 1, m.year),
                7..=9 => (7, 9, 2, m.year),
                10..=12 => (10, 12, 3, m.year),
                _ => (1, 3, 4, m.year - 1),
            };
            let start_year = if qn == 4 { fy_start_year + 1 } else { m.year };
            let label = format!(
                "Q{} FY{}-{:02}",
                qn,
                fy_start_year,
                (fy_start_year + 1) % 100
            );
            (
                Month::new(start_year, qs),
                Month::new(start_year, qe),
                label,
            )
        }
        FyMode::Cal => {
            let (qs, qe, qn) = match m.month {
                1..=3 => (1, 3, 1),
                4..=6 => (4, 6, 2),
                7..=9 => (7, 9, 3),
                _ => (10, 12, 4),
            };
            (
                Month::new(m.year, qs),
                Month::new(m.year, qe),
                format!("Q{} {}", qn, m.year),
            )
        }
    }
}

/// Fiscal year containing `m`, as (first month, last month, label)
pub fn fy_bounds(m: Month, fy_mode: FyMode) -> (Month, Month, String) {
    match fy_mode {
        FyMode::FyApr => {
            let start_year = if m.month < 4 { m.year - 1 } else { m.year };
            (
                Month::new(start_year, 4),
                Month::new(start_year + 1, 3),
                format!("FY {}-{:02}", start_year, (start_year + 1) % 100),
            )
        }
        FyMode::Cal => (
            Month::new(m.year, 1),
            Month::new(m.year, 12),
            format!("CY {}", m.year),
        ),
    }
}

/// Whether `m` is the last month of its fiscal quarter
pub fn is_quarter_end(m: Month, fy_mode: FyMode) -> bool {
    quarter_bounds(m, fy_mode).1 == m
}

/// Windows for `last5`: a 5-day lookback that may straddle the month boundary.
/// Returns one or two full-precision `[start, end)` windows, each confined to
/// a single month so monthly rollups stay keyed correctly.
pub fn last5_windows(today: NaiveDate) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let lookback = today - chrono::Duration::days(5);
    let this_month = Month::from_date(today);
    let end = (today + chrono::Duration::days(1)).and_time(NaiveTime::MIN);

    if Month::from_date(lookback) != this_month {
        let prev = this_month.prev();
        vec![
            (
                prev.first_day().and_time(NaiveTime::MIN),
                this_month.first_day().and_time(NaiveTime::MIN),
            ),
            (this_month.first_day().and_time(NaiveTime::MIN), end),
        ]
    } else {
        vec![(this_month.first_day().and_time(NaiveTime::MIN), end)]
    }
}

/// Resolve the configured range mode into concrete month-aligned windows.
/// `since` is required for `RangeMode::Since` and ignored otherwise.
pub fn resolve_windows(
    mode: RangeMode,
    fy_mode: FyMode,
    today: NaiveDate,
    since: Option<Month>,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let current = Month::from_date(today);
    match mode {
        RangeMode::Month => vec![current.window()],
        RangeMode::Last5 => last5_windows(today),
        RangeMode::Fy => {
            let (fs, _, _) = fy_bounds(current, fy_mode);
            Month::range_inclusive(fs, current)
                .into_iter()
                .map(|m| m.window())
                .collect()
        }
        RangeMode::Since => {
            let start = since.unwrap_or(current);
            Month::range_inclusive(start, current)
                .into_iter()
                .map(|m| m.window())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_roundtrip() {
        let m: Month = "2025-09".parse().unwrap();
        assert_eq!(m, Month::new(2025, 9));
        assert_eq!(m.to_string(), "2025-09");
        assert_eq!(m.next(), Month::new(2025, 10));
        assert_eq!(Month::new(2025, 12).next(), Month::new(2026, 1));
        assert_eq!(Month::new(2026, 1).prev(), Month::new(2025, 12));
    }

    #[test]
    fn test_month_index_spacing() {
        let a = Month::new(2025, 3);
        let b = Month::new(2025, 9);
        assert_eq!(b.index() - a.index(), 6);
    }

    #[test]
    fn test_quarter_bounds_fy_apr() {
        let (qs, qe, label) = quarter_bounds(Month::new(2025, 8), FyMode::FyApr);
        assert_eq!(qs, Month::new(2025, 7));
        assert_eq!(qe, Month::new(2025, 9));
        assert_eq!(label, "Q2 FY2025-26");

        // Jan-Mar belongs to the FY that started the previous April
        let (qs, qe, label) = quarter_bounds(Month::new(2026, 2), FyMode::FyApr);
        assert_eq!(qs, Month::new(2026, 1));
        assert_eq!(qe, Month::new(2026, 3));
        assert_eq!(label, "Q4 FY2025-26");
    }

    #[test]
    fn test_fy_bounds() {
        let (fs, fe, label) = fy_bounds(Month::new(2026, 2), FyMode::FyApr);
        assert_eq!(fs, Month::new(2025, 4));
        assert_eq!(fe, Month::new(2026, 3));
        assert_eq!(label, "FY 2025-26");

        let (fs, fe, _) = fy_bounds(Month::new(2026, 2), FyMode::Cal);
        assert_eq!(fs, Month::new(2026, 1));
        assert_eq!(fe, Month::new(2026, 12));
    }

    #[test]
    fn test_quarter_end_detection() {
        assert!(is_quarter_end(Month::new(2025, 9), FyMode::FyApr));
        assert!(!is_quarter_end(Month::new(2025, 8), FyMode::FyApr));
        assert!(is_quarter_end(Month::new(2025, 3), FyMode::FyApr));
        assert!(is_quarter_end(Month::new(2025, 12), FyMode::Cal));
    }

    #[test]
    fn test_last5_windows_straddles_boundary() {
        // 3rd of the month: lookback reaches into the previous month
        let today = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        let windows = last5_windows(today);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].0.date(), NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        assert_eq!(windows[1].0.date(), NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());

        // Mid-month: single window
        let today = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
        assert_eq!(last5_windows(today).len(), 1);
    }

    #[test]
    fn test_resolve_since_windows() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let windows = resolve_windows(
            RangeMode::Since,
            FyMode::FyApr,
            today,
            Some(Month::new(2025, 9)),
        );
        assert_eq!(windows.len(), 3); // Sep, Oct, Nov
    }
}
