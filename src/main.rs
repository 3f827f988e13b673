// streampane demo binary
//
// Wires the CLI, config file and logging together, then streams the
// scripted demo conversation into a pane - through the TUI by default,
// or headless with --headless.

use anyhow::Result;
use clap::Parser;
use streampane::cli::Cli;
use streampane::{demo, logging, tui};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;
    let _log_guard = logging::init()?;

    if cli.headless {
        demo::run_headless(&config).await
    } else {
        tui::run(&config)
    }
}
