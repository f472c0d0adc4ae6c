//! Embedded-state JSON extraction strategy.
//!
//! The calendar page embeds its component state as a script literal bound to
//! a recognizable global, in two known shapes:
//!
//! ```text
//! window.calendarComponentStates = { ... };
//! calendarComponentStates[1] = { ... };
//! ```
//!
//! Because the object is a native JS literal rather than strict JSON, keys
//! may be unquoted, strings may be single-quoted, and trailing commas appear.
//! [`normalize_relaxed_json`] rewrites those constructs into strict JSON
//! before handing the blob to `serde_json`.
//!
//! The decoded structure must contain a `days` collection, either directly or
//! under the `"1"` component key. Each event needs a numeric `dateline` epoch;
//! events missing it are skipped with a warning, never fatally.

use super::ExtractStrategy;
use crate::identity::{identity_key, name_or_fallback};
use crate::models::{CalendarEvent, Impact, WeekWindow};
use crate::utils::{strip_tags, truncate_for_log};
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static STATE_INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)calendarComponentStates\s*\[\s*1\s*\]\s*=\s*(\{.*?\});").unwrap());
static STATE_WINDOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)window\.calendarComponentStates\s*=\s*(\{.*?\});").unwrap());

pub struct StateJson;

impl ExtractStrategy for StateJson {
    fn name(&self) -> &'static str {
        "state-json"
    }

    fn attempt(&self, raw: &str, week: &WeekWindow) -> Option<Vec<CalendarEvent>> {
        let blob = locate_state_blob(raw)?;
        let normalized = normalize_relaxed_json(blob);

        let root: Value = match serde_json::from_str(&normalized) {
            Ok(v) => v,
            Err(e) => {
                // A malformed state blob must not raise past the parser
                // boundary; the DOM strategies get their turn instead.
                warn!(
                    error = %e,
                    blob_preview = %truncate_for_log(blob, 200),
                    "calendar state blob did not decode; falling through"
                );
                return None;
            }
        };

        let days = root
            .get("days")
            .or_else(|| root.get("1").and_then(|component| component.get("days")))?
            .as_array()?;

        let mut events = Vec::new();
        let mut skipped = 0usize;
        for day in days {
            let day_label = strip_tags(day.get("date").and_then(Value::as_str).unwrap_or(""));
            let Some(day_events) = day.get("events").and_then(Value::as_array) else {
                continue;
            };
            for event in day_events {
                let Some(dateline) = event.get("dateline").and_then(Value::as_i64) else {
                    warn!(
                        day = %day_label,
                        event = %truncate_for_log(&event.to_string(), 200),
                        "skipping state event without a numeric epoch"
                    );
                    skipped += 1;
                    continue;
                };
                let Some(utc) = DateTime::from_timestamp(dateline, 0) else {
                    warn!(dateline, "skipping state event with out-of-range epoch");
                    skipped += 1;
                    continue;
                };
                let timestamp = utc.naive_utc();

                let name = text_field(event, "name");
                let currency = text_field(event, "currency");
                let impact = Impact::from_source_label(&text_field(event, "impactTitle"));
                let actual = text_field(event, "actual");
                let forecast = text_field(event, "forecast");
                let previous = text_field(event, "previous");

                let identity = identity_key(
                    &timestamp,
                    &currency,
                    &name_or_fallback(&name, &actual, &forecast, &previous),
                );

                events.push(CalendarEvent {
                    timestamp,
                    currency,
                    impact,
                    name,
                    actual,
                    forecast,
                    previous,
                    day_label: day_label.clone(),
                    identity_key: identity,
                });
            }
        }

        debug!(week = %week.tag(), count = events.len(), skipped, "state-json extraction complete");
        Some(events)
    }
}

/// Find the embedded state object in either known script shape.
fn locate_state_blob(raw: &str) -> Option<&str> {
    STATE_INDEX_RE
        .captures(raw)
        .or_else(|| STATE_WINDOW_RE.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rewrite a relaxed JS object literal into strict JSON.
///
/// Handles the three relaxations the source actually emits: unquoted
/// identifier keys, single-quoted strings, and trailing commas. Everything
/// else is copied through untouched, including escapes inside double-quoted
/// strings.
pub fn normalize_relaxed_json(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    out.push(c);
                    i += 1;
                    if c == '\\' && i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    i += 1;
                    if c == '\\' && i < chars.len() {
                        let escaped = chars[i];
                        i += 1;
                        if escaped == '\'' {
                            out.push('\'');
                        } else {
                            out.push('\\');
                            out.push(escaped);
                        }
                    } else if c == '\'' {
                        break;
                    } else if c == '"' {
                        out.push('\\');
                        out.push('"');
                    } else {
                        out.push(c);
                    }
                }
                out.push('"');
            }
            ',' => {
                // Drop a trailing comma before a closing bracket.
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    i += 1;
                } else {
                    out.push(',');
                    i += 1;
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if next_significant_is_colon(&chars, i) {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    // Bare value: true, false, null, or similar.
                    out.push_str(&ident);
                }
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                // Numeric object keys ({1: ...}) must be quoted; numeric
                // values pass through.
                if next_significant_is_colon(&chars, i) {
                    out.push('"');
                    out.push_str(&digits);
                    out.push('"');
                } else {
                    out.push_str(&digits);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn next_significant_is_colon(chars: &[char], mut i: usize) -> bool {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i < chars.len() && chars[i] == ':'
}

/// Trimmed string field of a JSON object; missing or non-string becomes "".
fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn week() -> WeekWindow {
        WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
    }

    #[test]
    fn test_normalize_unquoted_keys() {
        assert_eq!(
            normalize_relaxed_json(r#"{days: [], count: 2}"#),
            r#"{"days": [], "count": 2}"#
        );
    }

    #[test]
    fn test_normalize_keeps_bare_literals() {
        assert_eq!(
            normalize_relaxed_json(r#"{ok: true, missing: null}"#),
            r#"{"ok": true, "missing": null}"#
        );
    }

    #[test]
    fn test_normalize_single_quotes_and_trailing_commas() {
        assert_eq!(
            normalize_relaxed_json(r#"{name: 'CPI "core" m/m', tags: ['a', 'b',],}"#),
            r#"{"name": "CPI \"core\" m/m", "tags": ["a", "b"]}"#
        );
    }

    #[test]
    fn test_normalize_numeric_keys_and_values() {
        assert_eq!(
            normalize_relaxed_json(r#"{1: {count: 42, rate: 1.5}}"#),
            r#"{"1": {"count": 42, "rate": 1.5}}"#
        );
    }

    #[test]
    fn test_normalize_leaves_strict_json_alone() {
        let strict = r#"{"days": [{"date": "Mon", "events": []}]}"#;
        assert_eq!(normalize_relaxed_json(strict), strict);
    }

    fn page(assignment: &str) -> String {
        format!(
            "<html><script>var x = 1; {assignment} other();</script></html>"
        )
    }

    const STATE: &str = r#"{days: [
        {date: '<span>Mon</span> <span>Jul 1</span>', events: [
            {dateline: 1719822600, name: 'Final Manufacturing PMI', currency: 'USD',
             impactTitle: 'High Impact Expected', actual: '51.6', forecast: '51.7', previous: '51.7',},
            {dateline: 1719826200, name: 'ISM Manufacturing PMI', currency: 'USD',
             impactTitle: 'Medium Impact Expected', actual: '', forecast: '49.2', previous: '48.7'},
        ]},
    ]}"#;

    #[test]
    fn test_extracts_all_well_formed_events() {
        let raw = page(&format!("window.calendarComponentStates = {STATE};"));
        let events = StateJson.attempt(&raw, &week()).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.currency == "USD"));
        assert_eq!(events[0].impact, Impact::High);
        assert_eq!(events[0].day_label, "Mon Jul 1");
        assert_eq!(events[0].name, "Final Manufacturing PMI");
    }

    #[test]
    fn test_indexed_assignment_variant() {
        let raw = page(&format!("calendarComponentStates[1] = {STATE};"));
        let events = StateJson.attempt(&raw, &week()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_days_under_component_key() {
        let raw = page(
            r#"window.calendarComponentStates = {1: {days: [
                {date: 'Mon Jul 1', events: [
                    {dateline: 1719822600, name: 'X', currency: 'EUR', impactTitle: 'Low Impact Expected'}
                ]}
            ]}};"#,
        );
        let events = StateJson.attempt(&raw, &week()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].currency, "EUR");
        assert_eq!(events[0].impact, Impact::Low);
    }

    #[test]
    fn test_event_without_epoch_is_skipped_not_fatal() {
        let raw = page(
            r#"window.calendarComponentStates = {days: [
                {date: 'Mon Jul 1', events: [
                    {name: 'no epoch', currency: 'USD'},
                    {dateline: 1719822600, name: 'has epoch', currency: 'USD'}
                ]}
            ]};"#,
        );
        let events = StateJson.attempt(&raw, &week()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "has epoch");
    }

    #[test]
    fn test_missing_anchor_returns_none() {
        assert!(StateJson.attempt("<html><body>nothing here</body></html>", &week()).is_none());
    }

    #[test]
    fn test_undecodable_blob_returns_none() {
        let raw = page("window.calendarComponentStates = {days: [{{{};");
        assert!(StateJson.attempt(&raw, &week()).is_none());
    }

    #[test]
    fn test_unnamed_event_identity_uses_value_fallback() {
        let raw = page(
            r#"window.calendarComponentStates = {days: [
                {date: 'Mon Jul 1', events: [
                    {dateline: 1719822600, currency: 'USD', actual: '1%', forecast: '2%', previous: '3%'}
                ]}
            ]};"#,
        );
        let events = StateJson.attempt(&raw, &week()).unwrap();
        let expected = identity_key(
            &events[0].timestamp,
            "USD",
            "actual:1%|forecast:2%|previous:3%",
        );
        assert_eq!(events[0].identity_key, expected);
    }
}
