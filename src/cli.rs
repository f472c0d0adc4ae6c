//! Command-line interface definitions.
//!
//! Three subcommands mirror the pipeline stages: `scrape` harvests and
//! merges the weekly calendar, `align` joins the merged calendar against a
//! candle table, and `label` filters and labels the joined table.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Impact;

/// Command-line arguments for the calendar harvest pipeline.
///
/// # Examples
///
/// ```sh
/// fx-news-harvest scrape --start 2024-07-01 --end 2025-07-11
/// fx-news-harvest align --symbol EURUSDm --timeframe M15 --news-file calendar/fx_news.csv
/// fx-news-harvest label --symbol EURUSDm --input cc/EURUSDm_M15_tagged.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape the weekly economic calendar across a date range and merge it
    Scrape {
        /// Start date (YYYY-MM-DD); rolled back to its Monday
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        end: NaiveDate,

        /// Directory for weekly tables and the merged calendar
        #[arg(long, default_value = "calendar")]
        data_dir: PathBuf,

        /// Directory for raw-page artifacts captured on parse failure
        #[arg(long, default_value = "debug")]
        debug_dir: PathBuf,

        /// Path of the merged calendar output
        #[arg(long, default_value = "calendar/fx_news.csv")]
        merged_out: PathBuf,
    },

    /// Join candles against the merged calendar within a minute window
    Align {
        /// Traded symbol, e.g. EURUSDm
        #[arg(long)]
        symbol: String,

        /// Candle timeframe, e.g. M15
        #[arg(long)]
        timeframe: String,

        /// Path to the merged news CSV
        #[arg(long)]
        news_file: PathBuf,

        /// Directory holding `{symbol}_{timeframe}.csv` candle exports
        #[arg(long, default_value = "candles")]
        candles_dir: PathBuf,

        /// Directory for the tagged output
        #[arg(long, default_value = "cc")]
        out_dir: PathBuf,

        /// ±Window in minutes (overrides the settings file)
        #[arg(long)]
        window: Option<i64>,

        /// Optional YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Filter a tagged candle table and attach forward-looking labels
    Label {
        /// Traded symbol, e.g. EURUSDm; determines relevant currencies
        #[arg(long)]
        symbol: String,

        /// Path to the tagged candle CSV produced by `align`
        #[arg(long)]
        input: PathBuf,

        /// Output path; defaults to `labeled/{input stem}_labeled.csv`
        #[arg(long)]
        output: Option<PathBuf>,

        /// Allowed news impacts (overrides the settings file)
        #[arg(long, num_args = 1..)]
        impact: Vec<Impact>,

        /// Max |minutes_from_news| to keep (overrides the settings file)
        #[arg(long)]
        max_minutes: Option<i64>,

        /// Minimum candle high-low range to keep (overrides the settings file)
        #[arg(long)]
        min_range: Option<f64>,

        /// Candles ahead to compare against (overrides the settings file)
        #[arg(long)]
        horizon: Option<usize>,

        /// Close-delta significance threshold (overrides the settings file)
        #[arg(long)]
        threshold: Option<f64>,

        /// Optional YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
