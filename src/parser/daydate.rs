//! Day-heading repair and timestamp assembly.
//!
//! The source prints day headings without a year ("Mon Jul 1") and sometimes
//! fuses the weekday and month with no separator ("MonJul1"). Time cells may
//! be a clock time ("8:30am"), "All Day", "Tentative", or blank. This module
//! turns those three fragments — day heading, time string, week anchor year —
//! into an absolute timestamp, falling back to a date-only (midnight)
//! timestamp when no intraday time applies.

use crate::models::WeekWindow;
use crate::utils::collapse_ws;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Insert the missing separator into a fused day heading.
///
/// Heuristic: a 3-letter weekday abbreviation immediately followed by a
/// non-space character means the source dropped the separator, e.g.
/// "MonJul01" becomes "Mon Jul01". Headings shorter than 6 characters are
/// left alone; so are already-separated ones.
pub fn repair_fused_day(day: &str) -> String {
    let chars: Vec<char> = day.chars().collect();
    if chars.len() >= 6 && !chars[3].is_whitespace() {
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[3..].iter().collect();
        format!("{head} {tail}")
    } else {
        day.to_string()
    }
}

/// Combine a day heading and time string with the week's anchor year into an
/// absolute timestamp.
///
/// Returns `None` when even the date-only form cannot be parsed, which the
/// calling strategy treats as a skipped record, never a page failure.
pub fn assemble_timestamp(week: &WeekWindow, day: &str, time: &str) -> Option<NaiveDateTime> {
    let day = repair_fused_day(&collapse_ws(day));
    let time = time.trim();
    let year = week.year();

    if !time.is_empty() {
        let full = format!("{day} {year} {time}");
        if let Ok(ts) = NaiveDateTime::parse_from_str(&full, "%a %b %d %Y %I:%M%p") {
            return Some(ts);
        }
    }

    // "All Day", "Tentative", or blank: a date-only timestamp at midnight.
    let date_only = format!("{day} {year}");
    NaiveDate::parse_from_str(&date_only, "%a %b %d %Y")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn week() -> WeekWindow {
        WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
    }

    fn expect(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_repair_fused_day() {
        assert_eq!(repair_fused_day("MonJul01"), "Mon Jul01");
        assert_eq!(repair_fused_day("Mon Jul 1"), "Mon Jul 1");
        // Too short to be a fused heading.
        assert_eq!(repair_fused_day("Mon"), "Mon");
        assert_eq!(repair_fused_day(""), "");
    }

    #[test]
    fn test_fused_day_parses_like_separated_day() {
        let fused = assemble_timestamp(&week(), "MonJul01", "");
        let separated = assemble_timestamp(&week(), "Mon Jul01", "");
        assert_eq!(fused, separated);
        assert_eq!(fused, Some(expect(2024, 7, 1, 0, 0)));
    }

    #[test]
    fn test_clock_time() {
        assert_eq!(
            assemble_timestamp(&week(), "Mon Jul 1", "8:30am"),
            Some(expect(2024, 7, 1, 8, 30))
        );
        assert_eq!(
            assemble_timestamp(&week(), "Tue Jul 2", "2:00pm"),
            Some(expect(2024, 7, 2, 14, 0))
        );
    }

    #[test]
    fn test_all_day_and_blank_map_to_midnight() {
        assert_eq!(
            assemble_timestamp(&week(), "Wed Jul 3", "All Day"),
            Some(expect(2024, 7, 3, 0, 0))
        );
        assert_eq!(
            assemble_timestamp(&week(), "Wed Jul 3", "Tentative"),
            Some(expect(2024, 7, 3, 0, 0))
        );
        assert_eq!(
            assemble_timestamp(&week(), "Wed Jul 3", ""),
            Some(expect(2024, 7, 3, 0, 0))
        );
    }

    #[test]
    fn test_garbage_day_returns_none() {
        assert_eq!(assemble_timestamp(&week(), "not a day", "8:30am"), None);
        assert_eq!(assemble_timestamp(&week(), "", ""), None);
    }

    #[test]
    fn test_messy_whitespace_in_heading() {
        assert_eq!(
            assemble_timestamp(&week(), "  Mon   Jul 1 ", "8:30am"),
            Some(expect(2024, 7, 1, 8, 30))
        );
    }
}
