//! Per-week fetch/parse/save state machine.
//!
//! One controller invocation owns the lifecycle of a single week's raw
//! payload and its parse attempt; it retains no state across weeks. The
//! state machine is `Pending → Fetching → Parsing → {Saved | Failed}`:
//!
//! - `Pending → Fetching` happens only when no persisted table exists yet,
//!   which makes a restarted campaign resume exactly where it stopped
//!   without touching the network for satisfied weeks.
//! - `Fetching` retries transient failures up to [`FETCH_ATTEMPTS`] times
//!   with a jittered multi-second backoff. Every retry is a fresh page load;
//!   failures are usually incomplete renders, not parser bugs, so re-parsing
//!   stale bytes would be pointless.
//! - `Parsing` failure captures the raw page as a debug artifact before the
//!   week transitions to `Failed` with the wrapped error.

use crate::errors::{FetchError, WeekError};
use crate::fetch::PageFetcher;
use crate::models::WeekWindow;
use crate::outputs::{csv, debug};
use crate::parser::EventParser;
use crate::utils::jittered_sleep;
use std::path::PathBuf;
use tracing::{debug as debug_log, info, instrument, warn};

/// Fetch attempts per week before the whole week is declared failed.
pub const FETCH_ATTEMPTS: usize = 3;

const BACKOFF_MIN_MS: u64 = 3_000;
const BACKOFF_MAX_MS: u64 = 6_000;

/// Result of one week's controller run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekOutcome {
    /// A persisted table already satisfied the week; nothing was fetched.
    Skipped,
    /// The week was fetched, parsed, and saved with this many events.
    Saved(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeekState {
    Pending,
    Fetching,
    Parsing,
    Saved,
    Failed,
}

pub struct WeekFetchController {
    data_dir: PathBuf,
    debug_dir: PathBuf,
    parser: EventParser,
}

impl WeekFetchController {
    pub fn new(data_dir: PathBuf, debug_dir: PathBuf) -> Self {
        WeekFetchController {
            data_dir,
            debug_dir,
            parser: EventParser::new(),
        }
    }

    /// Run the state machine for one week against the given fetcher.
    #[instrument(level = "info", skip_all, fields(week = %week.tag()))]
    pub async fn run<F>(&self, fetcher: &F, week: &WeekWindow) -> Result<WeekOutcome, WeekError>
    where
        F: PageFetcher,
    {
        let mut state = WeekState::Pending;

        if csv::week_table_exists(&self.data_dir, week) {
            info!(week = %week, "already scraped; skipping");
            return Ok(WeekOutcome::Skipped);
        }

        self.transition(week, &mut state, WeekState::Fetching);
        let body = match self.fetch_with_retry(fetcher, week).await {
            Ok(body) => body,
            Err(source) => {
                self.transition(week, &mut state, WeekState::Failed);
                return Err(WeekError::Fetch {
                    week: week.tag(),
                    source,
                });
            }
        };

        self.transition(week, &mut state, WeekState::Parsing);
        match self.parser.parse(&body, week) {
            Ok(events) => {
                csv::write_week_table(&self.data_dir, week, &events)?;
                self.transition(week, &mut state, WeekState::Saved);
                Ok(WeekOutcome::Saved(events.len()))
            }
            Err(source) => {
                debug::capture_raw_page(&self.debug_dir, week, &body).await;
                self.transition(week, &mut state, WeekState::Failed);
                Err(WeekError::Parse {
                    week: week.tag(),
                    source,
                })
            }
        }
    }

    async fn fetch_with_retry<F>(
        &self,
        fetcher: &F,
        week: &WeekWindow,
    ) -> Result<String, FetchError>
    where
        F: PageFetcher,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match fetcher.fetch(week).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < FETCH_ATTEMPTS => {
                    warn!(
                        attempt,
                        max = FETCH_ATTEMPTS,
                        error = %e,
                        "fetch attempt failed; backing off before a fresh page load"
                    );
                    jittered_sleep(BACKOFF_MIN_MS, BACKOFF_MAX_MS).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn transition(&self, week: &WeekWindow, state: &mut WeekState, next: WeekState) {
        debug_log!(week = %week.tag(), from = ?state, to = ?next, "week state transition");
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseError;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const GOOD_PAGE: &str = r#"<html><script>
        window.calendarComponentStates = {days: [
            {date: 'Mon Jul 1', events: [
                {dateline: 1719822600, name: 'NFP', currency: 'USD',
                 impactTitle: 'High Impact Expected'}
            ]}
        ]};
    </script></html>"#;

    const GARBAGE_PAGE: &str = "<html><body>checking your browser</body></html>";

    /// Scripted fetcher: pops the next canned response per call.
    struct ScriptedFetcher {
        script: Mutex<Vec<Result<String, FetchError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<String, FetchError>>) -> Self {
            ScriptedFetcher {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _week: &WeekWindow) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(FetchError::IncompleteRender);
            }
            script.remove(0)
        }
    }

    fn scratch_dirs(label: &str) -> (PathBuf, PathBuf) {
        let mut base = std::env::temp_dir();
        base.push(format!("fxnews-controller-{label}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);
        (base.join("calendar"), base.join("debug"))
    }

    fn week() -> WeekWindow {
        WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
    }

    #[tokio::test]
    async fn test_happy_path_saves_week_table() {
        let (data_dir, debug_dir) = scratch_dirs("happy");
        let controller = WeekFetchController::new(data_dir.clone(), debug_dir);
        let fetcher = ScriptedFetcher::new(vec![Ok(GOOD_PAGE.to_string())]);

        let outcome = controller.run(&fetcher, &week()).await.unwrap();
        assert_eq!(outcome, WeekOutcome::Saved(1));
        assert!(csv::week_table_exists(&data_dir, &week()));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_week_makes_zero_fetch_calls() {
        let (data_dir, debug_dir) = scratch_dirs("cached");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("week_20240701.csv"), "cached").unwrap();

        let controller = WeekFetchController::new(data_dir, debug_dir);
        let fetcher = ScriptedFetcher::new(vec![Ok(GOOD_PAGE.to_string())]);

        let outcome = controller.run(&fetcher, &week()).await.unwrap();
        assert_eq!(outcome, WeekOutcome::Skipped);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_fetch_failures_are_retried() {
        let (data_dir, debug_dir) = scratch_dirs("retry");
        let controller = WeekFetchController::new(data_dir, debug_dir);
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::IncompleteRender),
            Err(FetchError::IncompleteRender),
            Ok(GOOD_PAGE.to_string()),
        ]);

        let outcome = controller.run(&fetcher, &week()).await.unwrap();
        assert_eq!(outcome, WeekOutcome::Saved(1));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_exhaustion_fails_the_week() {
        let (data_dir, debug_dir) = scratch_dirs("exhaust");
        let controller = WeekFetchController::new(data_dir.clone(), debug_dir);
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::IncompleteRender),
            Err(FetchError::IncompleteRender),
            Err(FetchError::IncompleteRender),
        ]);

        let err = controller.run(&fetcher, &week()).await.unwrap_err();
        assert!(matches!(err, WeekError::Fetch { .. }));
        assert_eq!(fetcher.calls(), FETCH_ATTEMPTS);
        assert!(!csv::week_table_exists(&data_dir, &week()));
    }

    #[tokio::test]
    async fn test_structural_parse_failure_captures_debug_artifact() {
        let (data_dir, debug_dir) = scratch_dirs("artifact");
        let controller = WeekFetchController::new(data_dir.clone(), debug_dir.clone());
        let fetcher = ScriptedFetcher::new(vec![Ok(GARBAGE_PAGE.to_string())]);

        let err = controller.run(&fetcher, &week()).await.unwrap_err();
        assert!(matches!(
            err,
            WeekError::Parse {
                source: ParseError::StructureNotFound,
                ..
            }
        ));

        let artifact = debug::artifact_path(&debug_dir, &week());
        assert_eq!(std::fs::read_to_string(artifact).unwrap(), GARBAGE_PAGE);
        assert!(!csv::week_table_exists(&data_dir, &week()));
    }
}
