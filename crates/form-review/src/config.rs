//! Engine options, loadable from a TOML file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// How far the field matcher may go beyond literal path comparison when
/// deciding whether a field is in the invalid set. `Loose` reproduces the
/// historical behavior (bare suffix matching, at the risk of flagging a
/// sibling field that shares a terminal key); `AnchoredOnly` requires a
/// matching `name[N]` row anchor; `Off` disables every fallback.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuffixFallback {
    Off,
    AnchoredOnly,
    Loose,
}

impl Default for SuffixFallback {
    fn default() -> Self {
        Self::Loose
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MatcherOptions {
    pub suffix_fallback: SuffixFallback,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidateOptions {
    pub include_warnings: bool,
    pub show_errors: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            include_warnings: false,
            show_errors: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Inline style applied to the label of an invalid field.
    pub highlight_style: String,
    pub mask_char: char,
    pub empty_grid_text: String,
    pub date_format: String,
    pub time_format: String,
    pub datetime_format: String,
    pub currency_symbol: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            highlight_style: "color:#d9534f;font-weight:bold".to_string(),
            mask_char: '\u{2022}',
            empty_grid_text: "No data to display".to_string(),
            date_format: "%m/%d/%Y".to_string(),
            time_format: "%I:%M %p".to_string(),
            datetime_format: "%m/%d/%Y %I:%M %p".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReviewOptions {
    pub matcher: MatcherOptions,
    pub validation: ValidateOptions,
    pub render: RenderOptions,
}

impl ReviewOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
        let opts: Self = toml::from_str(&data)
            .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;
        Ok(opts)
    }
}
