//! Raw-page debug artifacts.
//!
//! When a page defeats every extraction strategy, the raw content is the only
//! evidence left for a post-mortem. Capture is best-effort: a failed write is
//! logged but never masks the parse error that triggered it.

use crate::models::WeekWindow;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Artifact path for one week: `{debug_dir}/raw_html_{YYYYMMDD}.html`.
pub fn artifact_path(debug_dir: &Path, week: &WeekWindow) -> PathBuf {
    debug_dir.join(format!("raw_html_{}.html", week.tag()))
}

/// Persist raw page content for post-mortem inspection.
#[instrument(level = "info", skip_all, fields(week = %week.tag()))]
pub async fn capture_raw_page(debug_dir: &Path, week: &WeekWindow, body: &str) {
    if let Err(e) = fs::create_dir_all(debug_dir).await {
        error!(dir = %debug_dir.display(), error = %e, "cannot create debug dir");
        return;
    }
    let path = artifact_path(debug_dir, week);
    match fs::write(&path, body).await {
        Ok(()) => info!(path = %path.display(), bytes = body.len(), "captured raw page"),
        Err(e) => error!(path = %path.display(), error = %e, "failed to capture raw page"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_capture_writes_artifact_keyed_by_week() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("fxnews-debug-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let week = WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        capture_raw_page(&dir, &week, "<html>broken</html>").await;

        let path = artifact_path(&dir, &week);
        assert_eq!(path.file_name().unwrap(), "raw_html_20240701.html");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>broken</html>");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
