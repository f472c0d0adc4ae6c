//! Multi-strategy calendar extraction.
//!
//! The source returns the same underlying data in at least three shapes: an
//! inline JSON state blob, a second inline-script variant of the same blob,
//! and raw DOM markup. Each shape gets its own extraction strategy behind
//! the [`ExtractStrategy`] capability, and [`EventParser`] tries them in
//! fixed priority order, short-circuiting on the first strategy that yields
//! a non-empty result:
//!
//! 1. [`state_json::StateJson`] — embedded script-state decode
//! 2. [`dom::DomTable`] — tagged calendar rows
//! 3. [`fallback::TableFallback`] — loose pass over the broad table selector
//!
//! A strategy that cannot find its anchor structure (or finds it but yields
//! nothing) falls through to the next; only when every strategy comes up
//! empty does the page fail with
//! [`ParseError::StructureNotFound`](crate::errors::ParseError). Record-level
//! problems inside a strategy are logged and skipped, never fatal.

pub mod daydate;
pub mod dom;
pub mod fallback;
pub mod state_json;

use crate::errors::ParseError;
use crate::models::{CalendarEvent, WeekWindow};
use tracing::{debug, info, instrument};

/// One way of extracting calendar events from raw page content.
///
/// `attempt` returns `None` when the strategy's anchor structure is absent;
/// an empty `Some` means the anchor was present but held no events. Both
/// cause the chain to fall through.
pub trait ExtractStrategy {
    fn name(&self) -> &'static str;
    fn attempt(&self, raw: &str, week: &WeekWindow) -> Option<Vec<CalendarEvent>>;
}

/// Ordered chain of extraction strategies.
pub struct EventParser {
    strategies: Vec<Box<dyn ExtractStrategy + Send + Sync>>,
}

impl EventParser {
    pub fn new() -> Self {
        EventParser {
            strategies: vec![
                Box::new(state_json::StateJson),
                Box::new(dom::DomTable),
                Box::new(fallback::TableFallback),
            ],
        }
    }

    /// Extract all events from one page of raw content.
    ///
    /// Never returns an empty list: the result is either at least one event
    /// or [`ParseError::StructureNotFound`].
    #[instrument(level = "info", skip_all, fields(week = %week.tag()))]
    pub fn parse(
        &self,
        raw: &str,
        week: &WeekWindow,
    ) -> Result<Vec<CalendarEvent>, ParseError> {
        for strategy in &self.strategies {
            match strategy.attempt(raw, week) {
                Some(events) if !events.is_empty() => {
                    info!(
                        strategy = strategy.name(),
                        count = events.len(),
                        "calendar extracted"
                    );
                    return Ok(events);
                }
                Some(_) => {
                    debug!(strategy = strategy.name(), "anchor found but no events; falling through");
                }
                None => {
                    debug!(strategy = strategy.name(), "anchor not found; falling through");
                }
            }
        }
        Err(ParseError::StructureNotFound)
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn week() -> WeekWindow {
        WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
    }

    const GOOD_STATE_PAGE: &str = r#"<html><script>
        window.calendarComponentStates = {days: [
            {date: 'Mon Jul 1', events: [
                {dateline: 1719822600, name: 'NFP', currency: 'USD',
                 impactTitle: 'High Impact Expected'}
            ]}
        ]};
    </script></html>"#;

    const DOM_ONLY_PAGE: &str = concat!(
        "<html><script>window.calendarComponentStates = {days: [{{{};</script>",
        "<table class=\"calendar__table\">",
        "<tr class=\"calendar__row\">",
        "<td class=\"calendar_cell calendar_date\">Mon Jul 1</td>",
        "<td class=\"calendar_cell calendar_time\">8:30am</td>",
        "<td class=\"calendar_cell calendar_currency\">USD</td>",
        "<td class=\"calendar_cell calendar_impact\" title=\"High Impact Expected\"></td>",
        "<td class=\"calendar_cell calendar_event\">",
        "<span class=\"calendar__event-title\">NFP</span></td>",
        "</tr></table></html>"
    );

    #[test]
    fn test_state_json_wins_when_present() {
        let parser = EventParser::new();
        let events = parser.parse(GOOD_STATE_PAGE, &week()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "NFP");
    }

    #[test]
    fn test_malformed_state_falls_through_to_dom() {
        // The broken JSON branch must not raise past the parser boundary.
        let parser = EventParser::new();
        let events = parser.parse(DOM_ONLY_PAGE, &week()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].currency, "USD");
        assert_eq!(
            events[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 7, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_structure_not_found_when_every_anchor_is_absent() {
        let parser = EventParser::new();
        let err = parser
            .parse("<html><body><p>maintenance page</p></body></html>", &week())
            .unwrap_err();
        assert!(matches!(err, ParseError::StructureNotFound));
    }

    #[test]
    fn test_empty_anchors_fall_all_the_way_through() {
        // A calendar table with no usable rows anchors strategies 2 and 3
        // but yields nothing, which still counts as structure-not-found.
        let page = "<html><table class=\"calendar__table\"><tr><td>header</td></tr></table></html>";
        let parser = EventParser::new();
        assert!(matches!(
            parser.parse(page, &week()),
            Err(ParseError::StructureNotFound)
        ));
    }
}
