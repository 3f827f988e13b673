//! Configuration for the streaming pane and demo binary
//!
//! Configuration is loaded in order of precedence:
//! 1. CLI flags (highest priority, applied by the binary)
//! 2. Config file (~/.config/streampane/config.toml)
//! 3. Built-in defaults (lowest priority)

use crate::render::ContentType;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timing and threshold knobs for one pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneConfig {
    /// Transform applied by the content renderer
    pub content_type: ContentType,
    /// Whether the pane manages scroll position at all
    pub auto_scroll: bool,
    /// Trailing-edge throttle window for rebinding while streaming
    pub rebind_window: Duration,
    /// Bottom proximity threshold for manual-scroll detection, in scroll units
    pub scroll_threshold: usize,
    /// How long the copy-confirmation flash lasts
    pub copy_confirm: Duration,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::Markdown,
            auto_scroll: true,
            rebind_window: crate::rebind::DEFAULT_REBIND_WINDOW,
            scroll_threshold: crate::scroll::DEFAULT_BOTTOM_THRESHOLD,
            copy_confirm: crate::highlight::DEFAULT_COPY_CONFIRM,
        }
    }
}

/// Effective application configuration (pane + demo settings)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pane: PaneConfig,
    /// Delay between scripted demo chunks
    pub chunk_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pane: PaneConfig::default(),
            chunk_delay: Duration::from_millis(150),
        }
    }
}

/// Raw config file shape; every field optional so a partial file merges
/// over the defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    content_type: Option<String>,
    auto_scroll: Option<bool>,
    rebind_window_ms: Option<u64>,
    scroll_threshold: Option<usize>,
    copy_confirm_ms: Option<u64>,
    chunk_delay_ms: Option<u64>,
}

impl Config {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("streampane").join("config.toml"))
    }

    /// Load configuration: explicit path, else the default location,
    /// else built-in defaults. A malformed file or an unrecognized
    /// content-type label is an error (fail closed rather than render
    /// with the wrong transform).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_path().filter(|p| p.exists()),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and merge a TOML document over the defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(raw).context("Failed to parse TOML")?;
        let mut config = Self::default();

        if let Some(label) = file.content_type {
            config.pane.content_type = label.parse()?;
        }
        if let Some(auto_scroll) = file.auto_scroll {
            config.pane.auto_scroll = auto_scroll;
        }
        if let Some(ms) = file.rebind_window_ms {
            config.pane.rebind_window = Duration::from_millis(ms);
        }
        if let Some(threshold) = file.scroll_threshold {
            config.pane.scroll_threshold = threshold;
        }
        if let Some(ms) = file.copy_confirm_ms {
            config.pane.copy_confirm = Duration::from_millis(ms);
        }
        if let Some(ms) = file.chunk_delay_ms {
            config.chunk_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }
}
