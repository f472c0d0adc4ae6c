//! Tabular persistence for events and candles.
//!
//! Weekly tables are written exactly once per successful week and treated as
//! immutable, append-only artifacts afterwards; the idempotent skip in the
//! week controller keys off their existence. All row types are serde-derived,
//! so readers and writers stay schema-free here.

use crate::errors::WeekError;
use crate::models::{CalendarEvent, Candle, TaggedCandle, WeekWindow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Path of one week's persisted table: `{dir}/week_{YYYYMMDD}.csv`.
pub fn week_table_path(dir: &Path, week: &WeekWindow) -> PathBuf {
    dir.join(format!("week_{}.csv", week.tag()))
}

/// Whether a persisted table already satisfies this week.
pub fn week_table_exists(dir: &Path, week: &WeekWindow) -> bool {
    week_table_path(dir, week).is_file()
}

/// Write one week's normalized table.
#[instrument(level = "info", skip_all, fields(week = %week.tag(), count = events.len()))]
pub fn write_week_table(
    dir: &Path,
    week: &WeekWindow,
    events: &[CalendarEvent],
) -> Result<PathBuf, WeekError> {
    fs::create_dir_all(dir)?;
    let path = week_table_path(dir, week);
    write_events(&path, events)?;
    info!(path = %path.display(), "saved weekly table");
    Ok(path)
}

/// All weekly tables under `dir`, in ascending `YYYYMMDD` filename order.
///
/// The ordering matters: the merge keeps the last-seen revision of a
/// duplicated identity key, so later-scraped weeks must come later.
pub fn list_week_tables(dir: &Path) -> Result<Vec<PathBuf>, WeekError> {
    let mut paths = Vec::new();
    if !dir.is_dir() {
        return Ok(paths);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("week_") && name.ends_with(".csv") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Write events to a CSV file.
pub fn write_events(path: &Path, events: &[CalendarEvent]) -> Result<(), WeekError> {
    let mut writer = csv::Writer::from_path(path)?;
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read events back from a CSV file.
pub fn read_events(path: &Path) -> Result<Vec<CalendarEvent>, WeekError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut events = Vec::new();
    for row in reader.deserialize() {
        events.push(row?);
    }
    Ok(events)
}

pub fn read_candles(path: &Path) -> Result<Vec<Candle>, WeekError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles = Vec::new();
    for row in reader.deserialize() {
        candles.push(row?);
    }
    Ok(candles)
}

pub fn write_tagged(path: &Path, rows: &[TaggedCandle]) -> Result<(), WeekError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_tagged(path: &Path) -> Result<Vec<TaggedCandle>, WeekError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
