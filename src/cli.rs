// CLI for the demo binary
//
// The demo streams a scripted markdown conversation into a pane. Flags
// override the config file, which overrides built-in defaults.

use crate::config::{Config, VERSION};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Streaming text pane demo
#[derive(Debug, Parser)]
#[command(name = "streampane")]
#[command(version = VERSION)]
#[command(about = "Streaming text pane demo", long_about = None)]
pub struct Cli {
    /// Content type for the demo pane: markdown, semi-markdown, html, text
    #[arg(long)]
    pub content_type: Option<String>,

    /// Delay between demo chunks in milliseconds
    #[arg(long)]
    pub chunk_delay_ms: Option<u64>,

    /// Path to a config file (default: ~/.config/streampane/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run the demo without a terminal UI, printing lifecycle events
    #[arg(long)]
    pub headless: bool,
}

impl Cli {
    /// Load the config file and fold the CLI overrides into it
    pub fn effective_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(label) = &self.content_type {
            config.pane.content_type = label.parse()?;
        }
        if let Some(ms) = self.chunk_delay_ms {
            config.chunk_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ContentType;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "streampane",
            "--content-type",
            "text",
            "--chunk-delay-ms",
            "5",
        ]);
        let config = cli.effective_config().unwrap();
        assert_eq!(config.pane.content_type, ContentType::Text);
        assert_eq!(config.chunk_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_bad_content_type_flag_fails_closed() {
        let cli = Cli::parse_from(["streampane", "--content-type", "rtf"]);
        assert!(cli.effective_config().is_err());
    }
}
