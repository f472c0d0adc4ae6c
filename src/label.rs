//! Rule-based filtering and forward-looking labeling over tagged candles.
//!
//! A row survives filtering when its news impact is in the allowed set, its
//! news offset is inside the max-minutes bound, its high-low range clears
//! the volatility floor, and its news currency matches one of the two
//! currencies implied by the traded symbol. Surviving rows are then labeled
//! by comparing each close to the close `horizon` candles ahead: above the
//! threshold is up (1), below its negation is down (-1), otherwise flat (0).
//! The final `horizon` rows stay unlabeled since no future candle exists.

use crate::config::{FilterSettings, LabelSettings};
use crate::models::TaggedCandle;
use tracing::{info, instrument, warn};

/// The base and quote currencies implied by a traded symbol, e.g.
/// `"EURUSDm"` → `("EUR", "USD")`. Symbols shorter than six letters have no
/// derivable pair.
pub fn symbol_currencies(symbol: &str) -> Option<(String, String)> {
    let upper: Vec<char> = symbol.to_ascii_uppercase().chars().collect();
    if upper.len() < 6 {
        return None;
    }
    let base: String = upper[..3].iter().collect();
    let quote: String = upper[3..6].iter().collect();
    Some((base, quote))
}

fn is_news_relevant(row: &TaggedCandle, base: &str, quote: &str, filters: &FilterSettings) -> bool {
    let Some(currency) = row.news_currency.as_deref() else {
        return false;
    };
    let Some(impact) = row.news_impact else {
        return false;
    };
    let Some(minutes) = row.minutes_from_news else {
        return false;
    };
    filters.allowed_impacts.contains(&impact)
        && minutes.abs() <= filters.max_minutes_from_news
        && (currency == base || currency == quote)
}

fn is_candle_volatile(row: &TaggedCandle, filters: &FilterSettings) -> bool {
    (row.high - row.low).abs() >= filters.min_candle_range
}

/// Keep only rows with relevant news and enough volatility.
#[instrument(level = "info", skip_all, fields(symbol, rows = rows.len()))]
pub fn apply_filters(
    rows: &[TaggedCandle],
    symbol: &str,
    filters: &FilterSettings,
) -> Vec<TaggedCandle> {
    let Some((base, quote)) = symbol_currencies(symbol) else {
        warn!(symbol, "symbol too short to derive a currency pair; keeping nothing");
        return Vec::new();
    };

    let kept: Vec<TaggedCandle> = rows
        .iter()
        .filter(|row| is_news_relevant(row, &base, &quote, filters) && is_candle_volatile(row, filters))
        .cloned()
        .collect();
    info!(kept = kept.len(), total = rows.len(), "applied filters");
    kept
}

/// Fill in forward-looking labels; the final `horizon` rows stay `None`.
#[instrument(level = "info", skip_all, fields(rows = rows.len(), horizon = settings.horizon))]
pub fn generate_labels(rows: &mut [TaggedCandle], settings: &LabelSettings) {
    let horizon = settings.horizon;
    let len = rows.len();

    for i in 0..len {
        rows[i].label = if i + horizon < len {
            let delta = rows[i + horizon].close - rows[i].close;
            if delta > settings.threshold {
                Some(1)
            } else if delta < -settings.threshold {
                Some(-1)
            } else {
                Some(0)
            }
        } else {
            None
        };
    }
}
