//! Page-fetching capability for weekly calendar pages.
//!
//! The pipeline treats "get me one week's page" as an opaque capability:
//! [`PageFetcher`] is the seam, and [`HttpPageFetcher`] is the default
//! implementation. The source actively penalizes automated access, so a
//! fetcher instance is assumed to drift into a poisoned/detected state over
//! time — the campaign runner recreates it from scratch between retries
//! rather than nursing one instance along. Construction is therefore cheap
//! and carries the per-instance randomness (user agent) with it.

use crate::errors::FetchError;
use crate::models::WeekWindow;
use rand::Rng;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Base URL of the weekly calendar.
pub const CALENDAR_URL: &str = "https://www.forexfactory.com/calendar";

/// Marker that distinguishes a fully rendered calendar page from an
/// interstitial or partial render.
pub const RENDER_MARKER: &str = "calendar__table";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:106.0) Gecko/20100101 Firefox/106.0",
];

/// Capability of fetching one week's raw page content.
///
/// Implementations may retry internally; the retry logic in the week
/// controller is additive on top.
pub trait PageFetcher {
    async fn fetch(&self, week: &WeekWindow) -> Result<String, FetchError>;
}

/// Build the calendar URL for one week, e.g. `...?week=Jul01.2024`.
pub fn week_url(week: &WeekWindow) -> Result<Url, FetchError> {
    Ok(Url::parse_with_params(
        CALENDAR_URL,
        &[("week", week.query_tag())],
    )?)
}

/// Plain-HTTP implementation of [`PageFetcher`].
///
/// Each instance picks one user agent from a small desktop pool at
/// construction time, so recreating the fetcher also rotates the agent.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    user_agent: &'static str,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let user_agent = {
            let mut rng = rand::rng();
            USER_AGENTS[rng.random_range(0..USER_AGENTS.len())]
        };
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        info!(user_agent, "page fetcher created");
        Ok(HttpPageFetcher { client, user_agent })
    }

    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }
}

impl PageFetcher for HttpPageFetcher {
    #[instrument(level = "info", skip_all, fields(week = %week.tag()))]
    async fn fetch(&self, week: &WeekWindow) -> Result<String, FetchError> {
        let url = week_url(week)?;
        info!(%url, "fetching calendar week");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus { status });
        }

        let body = response.text().await?;
        if !body.contains(RENDER_MARKER) {
            warn!(bytes = body.len(), "page arrived without the calendar table");
            return Err(FetchError::IncompleteRender);
        }
        Ok(body)
    }
}
