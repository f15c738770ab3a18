//! Input records handed over by the extraction layer.
//!
//! Two shapes arrive from upstream: a daily count series (one row per
//! calendar day that had at least one accident) and a spatial event table
//! (one row per accident with region, route and kilometre marker).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::ModesError;

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, ModesError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ModesError::InvalidDate(format!("{s:?}: {e}")))
}

/// Count of events observed on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Daily count series with strictly increasing dates.
///
/// Missing days are legal and simply absent; call
/// [`DailySeries::resample_daily`] to obtain uniform calendar coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySeries {
    points: Vec<DailyCount>,
}

impl DailySeries {
    /// Build a series from already-parsed points.
    pub fn new(points: Vec<DailyCount>) -> Result<Self, ModesError> {
        if points.is_empty() {
            return Err(ModesError::EmptyInput("daily series has no points".into()));
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ModesError::InvalidParameter(format!(
                    "dates must be strictly increasing, got {} after {}",
                    pair[1].date, pair[0].date
                )));
            }
        }
        Ok(Self { points })
    }

    /// Build a series from `(ISO date, count)` rows.
    pub fn from_rows<S: AsRef<str>>(rows: &[(S, u64)]) -> Result<Self, ModesError> {
        let points = rows
            .iter()
            .map(|(date, count)| {
                Ok(DailyCount {
                    date: parse_date(date.as_ref())?,
                    count: *count,
                })
            })
            .collect::<Result<Vec<_>, ModesError>>()?;
        Self::new(points)
    }

    pub fn points(&self) -> &[DailyCount] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Counts as floating-point values, in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.count as f64).collect()
    }

    /// Fill every missing calendar day between the first and last date with
    /// a zero count.
    pub fn resample_daily(&self) -> DailySeries {
        let mut points = Vec::with_capacity(self.points.len());
        let mut iter = self.points.iter().peekable();
        let first = self.points[0].date;
        let last = self.points[self.points.len() - 1].date;

        for date in first.iter_days().take_while(|d| *d <= last) {
            match iter.peek() {
                Some(p) if p.date == date => {
                    points.push(**p);
                    iter.next();
                }
                _ => points.push(DailyCount { date, count: 0 }),
            }
        }
        DailySeries { points }
    }
}

/// Calendar month used as a column label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Number of months from `self` to `other` (negative if `other` is earlier).
    pub fn months_until(self, other: YearMonth) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + other.month as i64 - self.month as i64
    }

    /// Contiguous months from `first` to `last`, inclusive.
    pub fn range_inclusive(first: YearMonth, last: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut current = first;
        while current <= last {
            months.push(current);
            current = current.succ();
        }
        months
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Position along a federal route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Route number (e.g. 101 for BR-101).
    pub route: u32,
    /// Kilometre marker along the route.
    pub position_km: f64,
}

/// A single observed accident. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub date: NaiveDate,
    /// Region (state) code, e.g. "SC".
    pub region: Option<String>,
    pub location: Option<Location>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl EventRecord {
    /// Build a record from one row of the spatial event table.
    pub fn from_row(
        date: &str,
        region: &str,
        route: u32,
        position_km: f64,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ModesError> {
        Ok(Self {
            date: parse_date(date)?,
            region: Some(region.to_string()),
            location: Some(Location { route, position_km }),
            latitude: Some(latitude),
            longitude: Some(longitude),
        })
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

/// Events of one route within one region that carry a kilometre marker.
pub fn filter_route(events: &[EventRecord], region: &str, route: u32) -> Vec<EventRecord> {
    events
        .iter()
        .filter(|e| e.region.as_deref() == Some(region))
        .filter(|e| matches!(e.location, Some(loc) if loc.route == route))
        .cloned()
        .collect()
}
