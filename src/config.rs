use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GlossaryError;

fn default_first_occurrence_only() -> bool {
    true
}

fn default_locale() -> String {
    "de".to_string()
}

fn default_cache_capacity() -> usize {
    64
}

fn default_open_delay_ms() -> u64 {
    200
}

fn default_close_delay_ms() -> u64 {
    150
}

fn default_margin() -> f64 {
    20.0
}

fn default_gutter() -> f64 {
    8.0
}

fn default_edge_padding() -> f64 {
    16.0
}

fn default_fallback_width() -> f64 {
    320.0
}

fn default_fallback_height() -> f64 {
    200.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryConfig {
    pub highlight: HighlightConfig,
    pub tooltip: TooltipConfig,
}

impl GlossaryConfig {
    pub fn from_json_str(input: &str) -> Result<Self, GlossaryError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GlossaryError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Highlight each term only at its first occurrence within one pass.
    #[serde(default = "default_first_occurrence_only")]
    pub first_occurrence_only: bool,
    /// Surface forms never highlighted (case-insensitive).
    #[serde(default)]
    pub excluded_terms: Vec<String>,
    /// Locale whose labels are used when a requested locale has none.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Entries kept per memo cache (dictionaries and annotated content).
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            first_occurrence_only: default_first_occurrence_only(),
            excluded_terms: Vec::new(),
            default_locale: default_locale(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Hover timing and overlay geometry, in milliseconds and CSS pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    #[serde(default = "default_open_delay_ms")]
    pub open_delay_ms: u64,
    #[serde(default = "default_close_delay_ms")]
    pub close_delay_ms: u64,
    /// Extra room required below the anchor before the overlay flips above it.
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Distance between anchor and overlay.
    #[serde(default = "default_gutter")]
    pub gutter: f64,
    /// Minimum distance between overlay and the left/right viewport edges.
    #[serde(default = "default_edge_padding")]
    pub edge_padding: f64,
    #[serde(default = "default_fallback_width")]
    pub fallback_width: f64,
    #[serde(default = "default_fallback_height")]
    pub fallback_height: f64,
}

impl TooltipConfig {
    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            open_delay_ms: default_open_delay_ms(),
            close_delay_ms: default_close_delay_ms(),
            margin: default_margin(),
            gutter: default_gutter(),
            edge_padding: default_edge_padding(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
        }
    }
}
