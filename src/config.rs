//! Settings for the join and label passes.
//!
//! Defaults live in code; a YAML file passed via `--config` overrides them,
//! and individual CLI flags override the file. Example:
//!
//! ```yaml
//! join:
//!   window_minutes: 45
//! filter:
//!   allowed_impacts: [Medium, High]
//!   max_minutes_from_news: 60
//!   min_candle_range: 0.0003
//! label:
//!   horizon: 3
//!   threshold: 0.0005
//! ```

use crate::models::Impact;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinSettings {
    /// Half-width of the news window around each candle, in minutes.
    pub window_minutes: i64,
}

impl Default for JoinSettings {
    fn default() -> Self {
        JoinSettings { window_minutes: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub allowed_impacts: Vec<Impact>,
    pub max_minutes_from_news: i64,
    /// Minimum high-low range a candle must span, in price units
    /// (~3 pips for EURUSD at the default).
    pub min_candle_range: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            allowed_impacts: vec![Impact::Medium, Impact::High],
            max_minutes_from_news: 60,
            min_candle_range: 0.0003,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    /// How many candles ahead to look.
    pub horizon: usize,
    /// Close-price delta considered a significant move (5 pips by default).
    pub threshold: f64,
}

impl Default for LabelSettings {
    fn default() -> Self {
        LabelSettings {
            horizon: 3,
            threshold: 0.0005,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub join: JoinSettings,
    pub filter: FilterSettings,
    pub label: LabelSettings,
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&text)?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Settings from an optional `--config` flag, defaults when absent.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Settings::default()),
        }
    }
}
