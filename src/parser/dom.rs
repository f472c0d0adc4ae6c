//! DOM-table extraction strategy.
//!
//! Walks rows tagged as calendar rows in document order. The source groups
//! several events under one date heading, so most rows omit their own date
//! cell and inherit the most recently seen one; an explicit `current_day`
//! accumulator carries that inheritance through the scan. Impact comes from
//! the impact cell's `title` attribute here — the class-based derivation
//! belongs to the looser table fallback.

use super::ExtractStrategy;
use crate::identity::{identity_key, name_or_fallback};
use crate::models::{CalendarEvent, Impact, WeekWindow};
use crate::parser::daydate::assemble_timestamp;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

pub struct DomTable;

impl ExtractStrategy for DomTable {
    fn name(&self) -> &'static str {
        "dom-table"
    }

    fn attempt(&self, raw: &str, week: &WeekWindow) -> Option<Vec<CalendarEvent>> {
        let document = Html::parse_document(raw);
        let row_selector = Selector::parse("tr.calendar__row").unwrap();
        let time_selector = Selector::parse("td.calendar_cell.calendar_time").unwrap();
        let date_selector = Selector::parse("td.calendar_cell.calendar_date").unwrap();
        let currency_selector = Selector::parse("td.calendar_cell.calendar_currency").unwrap();
        let impact_selector = Selector::parse("td.calendar_cell.calendar_impact").unwrap();
        let title_selector = Selector::parse("span.calendar__event-title").unwrap();
        let actual_selector = Selector::parse("td.calendar_cell.calendar_actual").unwrap();
        let forecast_selector = Selector::parse("td.calendar_cell.calendar_forecast").unwrap();
        let previous_selector = Selector::parse("td.calendar_cell.calendar_previous").unwrap();

        let mut events = Vec::new();
        let mut current_day = String::new();
        let mut saw_row = false;
        let mut skipped = 0usize;

        for row in document.select(&row_selector) {
            saw_row = true;

            if let Some(date_cell) = row.select(&date_selector).next() {
                let label = cell_text(&date_cell);
                if !label.is_empty() {
                    current_day = label;
                }
            }

            let time_str = row
                .select(&time_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();

            if current_day.is_empty() {
                // Neither an own date cell nor an inherited one: nothing to
                // anchor a timestamp on.
                continue;
            }

            let currency = row
                .select(&currency_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();
            let name = row
                .select(&title_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();
            let actual = row
                .select(&actual_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();
            let forecast = row
                .select(&forecast_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();
            let previous = row
                .select(&previous_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();

            // Day-breaker heading rows carry a date cell but no event
            // payload at all; they are not events.
            if currency.is_empty() && name.is_empty() && actual.is_empty() && forecast.is_empty() {
                continue;
            }

            let Some(timestamp) = assemble_timestamp(week, &current_day, &time_str) else {
                warn!(
                    day = %current_day,
                    time = %time_str,
                    "skipping row with unparseable date"
                );
                skipped += 1;
                continue;
            };

            let impact = row
                .select(&impact_selector)
                .next()
                .and_then(|c| c.value().attr("title"))
                .map(Impact::from_source_label)
                .unwrap_or(Impact::Unknown);

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
                day_label: current_day.clone(),
                identity_key: identity,
            });
        }

        if !saw_row {
            return None;
        }
        debug!(week = %week.tag(), count = events.len(), skipped, "dom-table extraction complete");
        Some(events)
    }
}

fn cell_text(cell: &ElementRef) -> String {
    crate::utils::collapse_ws(&cell.text().collect::<Vec<_>>().join(" "))
}
