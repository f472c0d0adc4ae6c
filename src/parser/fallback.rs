//! Loose HTML-table fallback strategy.
//!
//! Last resort when neither the embedded state nor the tagged calendar rows
//! are present: walk every `tr` under the broader calendar table selector,
//! substitute empty strings for missing cells, and keep whatever still
//! assembles into a dated, currency-bearing record. Impact is derived from
//! CSS class names first and a nested `span[title]` second — the class is
//! authoritative when both are present. Rows are deduplicated by identity
//! key within this single pass.

use super::ExtractStrategy;
use crate::identity::{identity_key, name_or_fallback};
use crate::models::{CalendarEvent, Impact, WeekWindow};
use crate::parser::daydate::assemble_timestamp;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Time substituted for rows whose time cell is missing entirely.
const DEFAULT_TIME: &str = "12:00am";

pub struct TableFallback;

impl ExtractStrategy for TableFallback {
    fn name(&self) -> &'static str {
        "table-fallback"
    }

    fn attempt(&self, raw: &str, week: &WeekWindow) -> Option<Vec<CalendarEvent>> {
        let document = Html::parse_document(raw);
        let table_selector = Selector::parse("table.calendar__table").unwrap();
        let row_selector = Selector::parse("tr").unwrap();
        let date_selector = Selector::parse("td.calendar_cell.calendar_date").unwrap();
        let time_selector = Selector::parse("td.calendar_cell.calendar_time").unwrap();
        let currency_selector = Selector::parse("td.calendar_cell.calendar_currency").unwrap();
        let impact_selector = Selector::parse("td.calendar_cell.calendar_impact").unwrap();
        let event_selector = Selector::parse("td.calendar_cell.calendar_event").unwrap();
        let title_selector = Selector::parse("span.calendar__event-title").unwrap();
        let span_selector = Selector::parse("span[title]").unwrap();
        let actual_selector = Selector::parse("td.calendar_cell.calendar_actual").unwrap();
        let forecast_selector = Selector::parse("td.calendar_cell.calendar_forecast").unwrap();
        let previous_selector = Selector::parse("td.calendar_cell.calendar_previous").unwrap();

        let table = document.select(&table_selector).next()?;

        let mut events = Vec::new();
        let mut seen = HashSet::new();
        let mut current_date = String::new();
        let mut skipped = 0usize;

        for tr in table.select(&row_selector) {
            if let Some(date_cell) = tr.select(&date_selector).next() {
                let label = cell_text(&date_cell);
                if !label.is_empty() {
                    current_date = label;
                }
            }

            let Some(currency_cell) = tr.select(&currency_selector).next() else {
                continue;
            };
            if current_date.is_empty() {
                continue;
            }

            let currency = cell_text(&currency_cell);
            if currency.is_empty() {
                continue;
            }

            let time_str = tr
                .select(&time_selector)
                .next()
                .map(|c| cell_text(&c))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TIME.to_string());

            let impact = tr
                .select(&impact_selector)
                .next()
                .map(|cell| impact_from_cell(&cell, &span_selector))
                .unwrap_or(Impact::Unknown);

            let name = tr
                .select(&event_selector)
                .next()
                .and_then(|cell| cell.select(&title_selector).next())
                .map(|span| cell_text(&span))
                .unwrap_or_default();
            let actual = tr
                .select(&actual_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();
            let forecast = tr
                .select(&forecast_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();
            let previous = tr
                .select(&previous_selector)
                .next()
                .map(|c| cell_text(&c))
                .unwrap_or_default();

            let Some(timestamp) = assemble_timestamp(week, &current_date, &time_str) else {
                warn!(
                    day = %current_date,
                    time = %time_str,
                    "skipping fallback row with unparseable date"
                );
                skipped += 1;
                continue;
            };

            let identity = identity_key(
                &timestamp,
                &currency,
                &name_or_fallback(&name, &actual, &forecast, &previous),
            );
            if !seen.insert(identity.clone()) {
                continue;
            }

            events.push(CalendarEvent {
                timestamp,
                currency,
                impact,
                name,
                actual,
                forecast,
                previous,
                day_label: current_date.clone(),
                identity_key: identity,
            });
        }

        debug!(week = %week.tag(), count = events.len(), skipped, "table-fallback extraction complete");
        Some(events)
    }
}

/// Impact from CSS class names, with a nested `span[title]` as the fallback.
fn impact_from_cell(cell: &ElementRef, span_selector: &Selector) -> Impact {
    for class in cell.value().classes() {
        match class {
            "impact-high" => return Impact::High,
            "impact-medium" => return Impact::Medium,
            "impact-low" => return Impact::Low,
            _ => {}
        }
    }
    cell.select(span_selector)
        .next()
        .and_then(|span| span.value().attr("title"))
        .map(Impact::from_source_label)
        .unwrap_or(Impact::Unknown)
}

fn cell_text(cell: &ElementRef) -> String {
    crate::utils::collapse_ws(&cell.text().collect::<Vec<_>>().join(" "))
}
