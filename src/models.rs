//! Data models for calendar events, fetch windows, and candle tables.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`CalendarEvent`]: one normalized economic-calendar entry
//! - [`Impact`]: ordinal severity assigned to an event by the source
//! - [`WeekWindow`]: the Monday-anchored 7-day fetch/cache unit
//! - [`Candle`] / [`TaggedCandle`]: price candles before and after the news join
//! - [`RunReport`]: structured outcome of a scrape campaign
//!
//! All persisted rows are serde-derived so the `csv` crate round-trips them
//! without hand-written column plumbing. Timestamps are written in
//! `%Y-%m-%d %H:%M:%S` form to stay byte-compatible across weekly tables,
//! the merged calendar, and candle exports.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp format shared by every CSV surface in the pipeline.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serde adapter serializing [`NaiveDateTime`] as `%Y-%m-%d %H:%M:%S`.
pub mod ts_serde {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Ordinal severity of an economic event.
///
/// The source spells severity several ways ("High Impact Expected" in script
/// state, `impact-high` CSS classes, bare title attributes). All of them
/// normalize into this enum at parse time so no two extraction strategies can
/// disagree in the persisted schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Impact {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
}

impl Impact {
    /// Normalize a free-text severity label from the source.
    ///
    /// Matches on keywords anywhere in the label, case-insensitively, so
    /// `"High Impact Expected"`, `"impact-high"`, and `"High"` all map to
    /// [`Impact::High`]. Unrecognized labels (holidays, "Non-Economic")
    /// become [`Impact::Unknown`].
    pub fn from_source_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("high") {
            Impact::High
        } else if lower.contains("medium") {
            Impact::Medium
        } else if lower.contains("low") {
            Impact::Low
        } else {
            Impact::Unknown
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Impact::Low => "Low",
            Impact::Medium => "Medium",
            Impact::High => "High",
            Impact::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Impact::Low),
            "medium" => Ok(Impact::Medium),
            "high" => Ok(Impact::High),
            "unknown" => Ok(Impact::Unknown),
            other => Err(format!("unrecognized impact: {other}")),
        }
    }
}

/// One normalized economic-calendar entry.
///
/// `actual`, `forecast`, and `previous` are free-text numeric-or-blank fields
/// that legitimately change as the real-world data point is revised after
/// publication. The identity key therefore never incorporates them; two
/// scrapes of the same calendar slot hash identically even when the revision
/// differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Scheduled instant; all-day events carry midnight.
    #[serde(with = "ts_serde")]
    pub timestamp: NaiveDateTime,
    /// 3-letter currency code the event affects.
    pub currency: String,
    pub impact: Impact,
    /// Human-readable event title; may be empty.
    pub name: String,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
    /// Raw day heading as shown by the source. Kept for traceability only.
    pub day_label: String,
    /// Stable content hash over {timestamp, currency, name-or-fallback}.
    pub identity_key: String,
}

/// A Monday-anchored 7-day period, the unit of fetch/cache granularity.
///
/// Immutable once created; a week is "satisfied" once a persisted table
/// exists for it, which is checked before any network activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekWindow {
    anchor: NaiveDate,
}

impl WeekWindow {
    /// The week containing `date`, rolled back to its Monday.
    pub fn containing(date: NaiveDate) -> Self {
        let back = i64::from(date.weekday().num_days_from_monday());
        WeekWindow {
            anchor: date - Duration::days(back),
        }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Anchor year, supplied to day/time assembly because the source omits it.
    pub fn year(&self) -> i32 {
        self.anchor.year()
    }

    /// `YYYYMMDD` form of the anchor; keys weekly tables and debug artifacts.
    pub fn tag(&self) -> String {
        self.anchor.format("%Y%m%d").to_string()
    }

    /// Query form of the anchor as the source expects it, e.g. `Jul01.2024`.
    pub fn query_tag(&self) -> String {
        self.anchor.format("%b%d.%Y").to_string()
    }

    /// Iterate week windows covering `[start, end]` inclusive, stepping by
    /// exactly 7 days. A final partial week is included.
    pub fn iter(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = WeekWindow> {
        let mut current = WeekWindow::containing(start);
        std::iter::from_fn(move || {
            if current.anchor > end {
                return None;
            }
            let week = current;
            current = WeekWindow {
                anchor: current.anchor + Duration::days(7),
            };
            Some(week)
        })
    }
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.anchor.format("%Y-%m-%d"))
    }
}

/// One OHLCV price candle as exported by the market-data connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(with = "ts_serde")]
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub tick_volume: u64,
    #[serde(default)]
    pub spread: i64,
    #[serde(default)]
    pub real_volume: u64,
}

/// A candle with the nearest in-window news event attached, plus the
/// forward-looking label filled in by the labeling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedCandle {
    #[serde(with = "ts_serde")]
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub tick_volume: u64,
    #[serde(default)]
    pub spread: i64,
    #[serde(default)]
    pub real_volume: u64,
    pub news_impact: Option<Impact>,
    pub news_event: Option<String>,
    pub news_currency: Option<String>,
    /// Signed whole minutes, `candle time - event time`. Negative when the
    /// candle precedes the event.
    pub minutes_from_news: Option<i64>,
    /// 1 = up, -1 = down, 0 = flat. Empty for the final `horizon` rows.
    pub label: Option<i32>,
}

impl TaggedCandle {
    /// A candle with no news attached yet.
    pub fn untagged(candle: &Candle) -> Self {
        TaggedCandle {
            time: candle.time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            tick_volume: candle.tick_volume,
            spread: candle.spread,
            real_volume: candle.real_volume,
            news_impact: None,
            news_event: None,
            news_currency: None,
            minutes_from_news: None,
            label: None,
        }
    }
}

/// Structured outcome of one scrape campaign.
///
/// Returned by the campaign runner so callers and tests can assert on
/// outcomes instead of log text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Weeks that needed network activity.
    pub weeks_attempted: usize,
    /// Weeks skipped because a persisted table already existed.
    pub weeks_skipped: usize,
    pub weeks_succeeded: usize,
    pub weeks_failed: usize,
    /// `YYYYMMDD` tags of weeks that exhausted all retries.
    pub failed_weeks: Vec<String>,
    /// Row count of the merged calendar; 0 when no weekly tables existed.
    pub events_merged: usize,
}
