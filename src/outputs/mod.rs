//! Persistence surfaces for the pipeline.
//!
//! # Submodules
//!
//! - [`csv`]: weekly event tables, the merged calendar, and candle /
//!   tagged-candle I/O
//! - [`debug`]: raw-page artifacts captured on structural parse failure
//!
//! # Layout
//!
//! ```text
//! data_dir/
//! ├── week_20240701.csv     # one immutable table per satisfied week
//! ├── week_20240708.csv
//! └── fx_news.csv           # merged, deduplicated, timestamp-sorted
//!
//! debug_dir/
//! └── raw_html_20240701.html  # page content of a failed parse
//! ```

pub mod csv;
pub mod debug;
