//! Windowed nearest-neighbor join between price candles and news events.
//!
//! For each candle, the nearest event whose timestamp falls inside
//! `candle time ± window` gets its impact, name, and currency attached,
//! along with the signed minute offset `candle time - event time`. Ties on
//! absolute distance go to the earliest candidate in scan order, which also
//! means each event is attributed to whichever candle it is genuinely
//! nearest to — never an arbitrary one.
//!
//! Events are sorted once and candidates are located by binary search, so
//! the join is `O((n + m) log m)` instead of a per-candle linear scan.

use crate::models::{CalendarEvent, Candle, TaggedCandle};
use chrono::Duration;
use tracing::{info, instrument};

/// Attach the nearest in-window event to each candle.
#[instrument(level = "info", skip_all, fields(candles = candles.len(), events = events.len(), window_minutes))]
pub fn tag_candles(
    candles: &[Candle],
    events: &[CalendarEvent],
    window_minutes: i64,
) -> Vec<TaggedCandle> {
    let mut events: Vec<&CalendarEvent> = events.iter().collect();
    events.sort_by_key(|e| e.timestamp);

    let mut candles: Vec<&Candle> = candles.iter().collect();
    candles.sort_by_key(|c| c.time);

    let window = Duration::minutes(window_minutes);
    let mut tagged = Vec::with_capacity(candles.len());
    let mut matched = 0usize;

    for candle in candles {
        let mut row = TaggedCandle::untagged(candle);

        let window_start = candle.time - window;
        let window_end = candle.time + window;
        let lo = events.partition_point(|e| e.timestamp < window_start);
        let hi = events.partition_point(|e| e.timestamp <= window_end);

        if let Some(closest) = events[lo..hi]
            .iter()
            .min_by_key(|e| (candle.time - e.timestamp).num_seconds().abs())
        {
            row.news_impact = Some(closest.impact);
            row.news_event = Some(closest.name.clone());
            row.news_currency = Some(closest.currency.clone());
            row.minutes_from_news = Some((candle.time - closest.timestamp).num_minutes());
            matched += 1;
        }

        tagged.push(row);
    }

    info!(matched, "tagged candles with news events");
    tagged
}
