//! Campaign orchestration across a date range.
//!
//! The runner iterates Monday-anchored weeks over `[start, end]`, delegates
//! each unsatisfied week to the controller, and merges every persisted weekly
//! table into one sorted, deduplicated calendar at the end. It is the only
//! component that holds the page-fetching resource across weeks, and it
//! assumes the resource decays: every top-level retry disposes the old
//! fetcher and builds a fresh one from the factory before backing off.
//!
//! One bad week never aborts the campaign; exhausted weeks are recorded in
//! the [`RunReport`] and the loop moves on.

use crate::errors::{CampaignError, FetchError, WeekError};
use crate::fetch::PageFetcher;
use crate::models::{CalendarEvent, RunReport, WeekWindow};
use crate::controller::{WeekFetchController, WeekOutcome};
use crate::outputs::csv;
use crate::utils::jittered_sleep;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

/// Top-level attempts per week; each retry gets a fresh fetcher.
pub const WEEK_ATTEMPTS: usize = 3;

const RETRY_MIN_MS: u64 = 3_000;
const RETRY_MAX_MS: u64 = 6_000;
const PAUSE_MIN_MS: u64 = 2_000;
const PAUSE_MAX_MS: u64 = 4_000;

/// Where a campaign reads and writes its artifacts.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
    pub data_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub merged_out: PathBuf,
}

pub struct CampaignRunner<P, F>
where
    P: PageFetcher,
    F: Fn() -> Result<P, FetchError>,
{
    config: CampaignConfig,
    make_fetcher: F,
    controller: WeekFetchController,
}

impl<P, F> CampaignRunner<P, F>
where
    P: PageFetcher,
    F: Fn() -> Result<P, FetchError>,
{
    pub fn new(config: CampaignConfig, make_fetcher: F) -> Self {
        let controller =
            WeekFetchController::new(config.data_dir.clone(), config.debug_dir.clone());
        CampaignRunner {
            config,
            make_fetcher,
            controller,
        }
    }

    /// Run the campaign and return its structured report.
    ///
    /// The only fatal conditions are failing to construct the page-fetching
    /// resource and an I/O failure during the final merge.
    #[instrument(level = "info", skip_all, fields(start = %self.config.start, end = %self.config.end))]
    pub async fn run(&self) -> Result<RunReport, CampaignError> {
        let mut report = RunReport::default();
        let mut fetcher = (self.make_fetcher)()?;

        for week in WeekWindow::iter(self.config.start, self.config.end) {
            if csv::week_table_exists(&self.config.data_dir, &week) {
                info!(week = %week, "already scraped; skipping");
                report.weeks_skipped += 1;
                continue;
            }
            report.weeks_attempted += 1;

            let mut saved = None;
            for attempt in 1..=WEEK_ATTEMPTS {
                let outcome = self.controller.run(&fetcher, &week).await;
                match outcome {
                    Ok(WeekOutcome::Saved(count)) => {
                        saved = Some(count);
                        break;
                    }
                    Ok(WeekOutcome::Skipped) => {
                        saved = Some(0);
                        break;
                    }
                    Err(e) => {
                        error!(
                            attempt,
                            max = WEEK_ATTEMPTS,
                            week = %week,
                            error = %e,
                            "week attempt failed"
                        );
                        if attempt < WEEK_ATTEMPTS {
                            info!(week = %week, "recreating page-fetching resource");
                            // Dispose the possibly-poisoned fetcher before
                            // building its replacement.
                            drop(fetcher);
                            fetcher = (self.make_fetcher)()?;
                            jittered_sleep(RETRY_MIN_MS, RETRY_MAX_MS).await;
                        }
                    }
                }
            }

            match saved {
                Some(count) => {
                    info!(week = %week, events = count, "week complete");
                    report.weeks_succeeded += 1;
                }
                None => {
                    error!(week = %week, attempts = WEEK_ATTEMPTS, "failed all retries for week");
                    report.weeks_failed += 1;
                    report.failed_weeks.push(week.tag());
                }
            }

            jittered_sleep(PAUSE_MIN_MS, PAUSE_MAX_MS).await;
        }

        report.events_merged = self.merge_weeks()?;
        info!(
            attempted = report.weeks_attempted,
            skipped = report.weeks_skipped,
            succeeded = report.weeks_succeeded,
            failed = report.weeks_failed,
            merged = report.events_merged,
            "campaign complete"
        );
        Ok(report)
    }

    /// Merge all persisted weekly tables into the combined calendar.
    ///
    /// Rows are deduplicated by identity key with last-seen-wins semantics:
    /// the tables are visited in ascending filename order, so a revised
    /// event keeps its latest observed actual/forecast values. The result is
    /// sorted ascending by timestamp.
    fn merge_weeks(&self) -> Result<usize, WeekError> {
        let files = csv::list_week_tables(&self.config.data_dir)?;
        if files.is_empty() {
            warn!("no weekly tables found to merge");
            return Ok(0);
        }

        let mut by_key: HashMap<String, CalendarEvent> = HashMap::new();
        for file in &files {
            for event in csv::read_events(file)? {
                by_key.insert(event.identity_key.clone(), event);
            }
        }

        let mut events: Vec<CalendarEvent> = by_key.into_values().collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        if let Some(parent) = self.config.merged_out.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        csv::write_events(&self.config.merged_out, &events)?;
        info!(
            files = files.len(),
            events = events.len(),
            path = %self.config.merged_out.display(),
            "merged weekly tables"
        );
        Ok(events.len())
    }
}
