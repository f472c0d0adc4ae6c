//! # FX News Harvest
//!
//! A pipeline that harvests the weekly economic calendar from Forex Factory,
//! normalizes it into canonical event records, and joins it against price
//! candles for feature labeling.
//!
//! ## Features
//!
//! - Multi-strategy page extraction: embedded script-state decode with a DOM
//!   fallback and a loose HTML-table fallback for when the source shifts shape
//! - Stable, duplicate-free event identities that survive revisions to
//!   actual/forecast/previous values
//! - Idempotent per-week caching: already-scraped weeks are never refetched
//! - Bounded retries with jittered backoff, recreating the page-fetching
//!   resource between attempts
//! - Windowed candle/news alignment and rule-based forward labeling
//!
//! ## Usage
//!
//! ```sh
//! fx-news-harvest scrape --start 2024-07-01 --end 2025-07-11
//! fx-news-harvest align --symbol EURUSDm --timeframe M15 --news-file calendar/fx_news.csv
//! fx-news-harvest label --symbol EURUSDm --input cc/EURUSDm_M15_tagged.csv
//! ```
//!
//! ## Architecture
//!
//! The scrape follows a pipeline architecture:
//! 1. **Iteration**: walk Monday-anchored week windows across the date range
//! 2. **Fetching**: load each unsatisfied week's page, with bounded retries
//! 3. **Parsing**: run the extraction strategy chain over the raw content
//! 4. **Persistence**: one immutable CSV per week, merged and deduplicated
//!    into a single sorted calendar at the end

use chrono::NaiveDate;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod campaign;
mod cli;
mod config;
mod controller;
mod errors;
mod fetch;
mod identity;
mod join;
mod label;
mod models;
mod outputs;
mod parser;
mod utils;

use campaign::{CampaignConfig, CampaignRunner};
use cli::{Cli, Commands};
use config::Settings;
use fetch::HttpPageFetcher;
use models::Impact;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("fx_news_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.command {
        Commands::Scrape {
            start,
            end,
            data_dir,
            debug_dir,
            merged_out,
        } => run_scrape(start, end, data_dir, debug_dir, merged_out).await?,
        Commands::Align {
            symbol,
            timeframe,
            news_file,
            candles_dir,
            out_dir,
            window,
            config,
        } => run_align(symbol, timeframe, news_file, candles_dir, out_dir, window, config)?,
        Commands::Label {
            symbol,
            input,
            output,
            impact,
            max_minutes,
            min_range,
            horizon,
            threshold,
            config,
        } => run_label(
            symbol,
            input,
            output,
            impact,
            max_minutes,
            min_range,
            horizon,
            threshold,
            config,
        )?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Run the scrape campaign and report its outcome.
#[instrument(level = "info", skip_all, fields(%start, %end))]
async fn run_scrape(
    start: NaiveDate,
    end: NaiveDate,
    data_dir: PathBuf,
    debug_dir: PathBuf,
    merged_out: PathBuf,
) -> Result<(), Box<dyn Error>> {
    ensure_writable_dir(&data_dir).await?;

    let config = CampaignConfig {
        start,
        end,
        data_dir,
        debug_dir,
        merged_out,
    };
    let runner = CampaignRunner::new(config, HttpPageFetcher::new);
    let report = runner.run().await?;

    info!(
        attempted = report.weeks_attempted,
        skipped = report.weeks_skipped,
        succeeded = report.weeks_succeeded,
        failed = report.weeks_failed,
        merged = report.events_merged,
        "scrape campaign finished"
    );
    if !report.failed_weeks.is_empty() {
        warn!(failed_weeks = ?report.failed_weeks, "some weeks exhausted all retries");
    }
    Ok(())
}

/// Join candles against the merged calendar.
#[instrument(level = "info", skip_all, fields(%symbol, %timeframe))]
fn run_align(
    symbol: String,
    timeframe: String,
    news_file: PathBuf,
    candles_dir: PathBuf,
    out_dir: PathBuf,
    window: Option<i64>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load_or_default(config.as_deref())?;
    let window = window.unwrap_or(settings.join.window_minutes);

    let candles_path = candles_dir.join(format!("{symbol}_{timeframe}.csv"));
    info!(path = %candles_path.display(), "loading candles");
    let candles = outputs::csv::read_candles(&candles_path)?;
    info!(path = %news_file.display(), "loading news");
    let events = outputs::csv::read_events(&news_file)?;

    let tagged = join::tag_candles(&candles, &events, window);

    let out_path = out_dir.join(format!("{symbol}_{timeframe}_tagged.csv"));
    outputs::csv::write_tagged(&out_path, &tagged)?;
    info!(path = %out_path.display(), rows = tagged.len(), "saved tagged candles");
    Ok(())
}

/// Filter a tagged table and attach forward-looking labels.
#[allow(clippy::too_many_arguments)]
#[instrument(level = "info", skip_all, fields(%symbol))]
fn run_label(
    symbol: String,
    input: PathBuf,
    output: Option<PathBuf>,
    impact: Vec<Impact>,
    max_minutes: Option<i64>,
    min_range: Option<f64>,
    horizon: Option<usize>,
    threshold: Option<f64>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::load_or_default(config.as_deref())?;
    if !impact.is_empty() {
        settings.filter.allowed_impacts = impact;
    }
    if let Some(minutes) = max_minutes {
        settings.filter.max_minutes_from_news = minutes;
    }
    if let Some(range) = min_range {
        settings.filter.min_candle_range = range;
    }
    if let Some(h) = horizon {
        settings.label.horizon = h;
    }
    if let Some(t) = threshold {
        settings.label.threshold = t;
    }

    info!(path = %input.display(), "loading tagged candles");
    let rows = outputs::csv::read_tagged(&input)?;

    let mut kept = label::apply_filters(&rows, &symbol, &settings.filter);
    info!(kept = kept.len(), total = rows.len(), "rows after filtering");
    label::generate_labels(&mut kept, &settings.label);

    let out_path = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tagged");
        PathBuf::from("labeled").join(format!("{stem}_labeled.csv"))
    });
    outputs::csv::write_tagged(&out_path, &kept)?;
    info!(path = %out_path.display(), rows = kept.len(), "saved labeled candles");
    Ok(())
}
