//! Utility functions for markup stripping, backoff sleeps, and file system
//! checks.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip HTML tags from a fragment and collapse the remaining whitespace.
///
/// Day headings arrive as nested spans (`<span>Mon</span><span>Jul 1</span>`);
/// downstream date parsing wants the bare text.
pub fn strip_tags(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, " ");
    collapse_ws(&text)
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Sleep for a uniformly random duration inside `[min_ms, max_ms]`.
///
/// The jitter is deliberate backpressure against a source that penalizes
/// rapid automated access, not incidental politeness.
pub async fn jittered_sleep(min_ms: u64, max_ms: u64) {
    let delay_ms = {
        let mut rng = rand::rng();
        rng.random_range(min_ms..=max_ms)
    };
    debug!(delay_ms, "backing off");
    sleep(Duration::from_millis(delay_ms)).await;
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if missing, then performs a write test by creating
/// and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Small sync write; simpler error surface than the async variant.
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<span>Mon</span> <span>Jul 1</span>"), "Mon Jul 1");
        assert_eq!(strip_tags("no markup here"), "no markup here");
        assert_eq!(strip_tags("<td class=\"x\">Tue<br/>Jul 2</td>"), "Tue Jul 2");
        assert_eq!(strip_tags(""), "");
    }

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  Mon   Jul\n1 "), "Mon Jul 1");
        assert_eq!(collapse_ws("one"), "one");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("fxnews-utils-{}", std::process::id()));
        let _ = stdfs::remove_dir_all(&dir);
        ensure_writable_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
        let _ = stdfs::remove_dir_all(&dir);
    }
}
