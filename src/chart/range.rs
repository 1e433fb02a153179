use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::FindashError;
use crate::models::BalancePoint;

/// Symbolic time window, resolved against the series' own last point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeToken {
    #[default]
    All,
    SixMonths,
    OneMonth,
}

impl RangeToken {
    pub fn key(&self) -> &'static str {
        match self {
            RangeToken::All => "all",
            RangeToken::SixMonths => "6m",
            RangeToken::OneMonth => "1m",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangeToken::All => "All time",
            RangeToken::SixMonths => "Past 6 Months",
            RangeToken::OneMonth => "Recent Month",
        }
    }

    fn months_back(&self) -> Option<u32> {
        match self {
            RangeToken::All => None,
            RangeToken::SixMonths => Some(6),
            RangeToken::OneMonth => Some(1),
        }
    }

    /// Start of the trailing window ending at `end`. Month subtraction is
    /// calendar based and clamps to the last day of the target month
    /// (Mar 31 - 1 month = Feb 29 in a leap year).
    pub fn window_start(&self, first: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
        match self.months_back() {
            None => first,
            Some(n) => end
                .checked_sub_months(Months::new(n))
                .map_or(first, |start| start.max(first)),
        }
    }
}

impl FromStr for RangeToken {
    type Err = FindashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RangeToken::All),
            "6m" => Ok(RangeToken::SixMonths),
            "1m" => Ok(RangeToken::OneMonth),
            other => Err(FindashError::InvalidRange(other.to_string())),
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Either a symbolic token or explicit bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeWindow {
    Token(RangeToken),
    /// Half-open `[start, end)`.
    Explicit {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl RangeWindow {
    /// Calendar month `YYYY-MM` as an explicit window.
    pub fn month(month: &str) -> Result<Self, FindashError> {
        let invalid = || FindashError::Other(format!("invalid month '{month}' (expected YYYY-MM)"));
        let start = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
            .map_err(|_| invalid())?;
        let end = start.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
        Ok(RangeWindow::Explicit {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(NaiveTime::MIN),
        })
    }
}

impl From<RangeToken> for RangeWindow {
    fn from(token: RangeToken) -> Self {
        RangeWindow::Token(token)
    }
}

/// Contiguous sub-slice of an ascending series inside the window. Token
/// windows are inclusive on both ends and end at the last point.
///
/// The series must already be sorted by timestamp; the bounds are located
/// by binary search.
pub fn slice_by_range(series: &[BalancePoint], window: RangeWindow) -> &[BalancePoint] {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return &series[..0];
    };
    let (lo, hi) = match window {
        RangeWindow::Token(token) => {
            let start = token.window_start(first.timestamp, last.timestamp);
            let end = last.timestamp;
            (
                series.partition_point(|p| p.timestamp < start),
                series.partition_point(|p| p.timestamp <= end),
            )
        }
        RangeWindow::Explicit { start, end } => (
            series.partition_point(|p| p.timestamp < start),
            series.partition_point(|p| p.timestamp < end),
        ),
    };
    if lo >= hi {
        return &series[..0];
    }
    &series[lo..hi]
}
