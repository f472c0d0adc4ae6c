//! Error taxonomy for the calendar harvest pipeline.
//!
//! Propagation policy:
//! - Record-level problems inside a parse strategy are logged and counted,
//!   never raised. A bad record must not abort its page.
//! - [`FetchError`] and [`ParseError`] escalate to the per-week retry loop.
//! - [`WeekError`] exhaustion becomes a logged terminal failure for that week
//!   only; the campaign continues.
//! - The only campaign-fatal condition is failing to construct the
//!   page-fetching resource at all ([`CampaignError::Resource`]) or an I/O
//!   failure during the final merge.

use reqwest::StatusCode;
use thiserror::Error;

/// Transient, retry-eligible failures of the page-fetching capability.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    HttpStatus { status: StatusCode },
    /// The page arrived but without the calendar table — the usual symptom
    /// of an incomplete render or an anti-automation interstitial.
    #[error("page rendered without a calendar table")]
    IncompleteRender,
    #[error("invalid calendar url: {0}")]
    Url(#[from] url::ParseError),
}

/// Page-level parse failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// No extraction strategy located its anchor structure. Fatal for the
    /// page, as opposed to a missing field in an otherwise-located record.
    #[error("no calendar structure found in page")]
    StructureNotFound,
}

/// Failure of one week's fetch-parse-save attempt.
#[derive(Debug, Error)]
pub enum WeekError {
    #[error("fetch failed for week {week}: {source}")]
    Fetch {
        week: String,
        #[source]
        source: FetchError,
    },
    #[error("parse failed for week {week}: {source}")]
    Parse {
        week: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Campaign-fatal failures.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("cannot create page-fetching resource: {0}")]
    Resource(#[from] FetchError),
    #[error(transparent)]
    Week(#[from] WeekError),
}
