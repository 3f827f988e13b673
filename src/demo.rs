// Demo mode: stream a scripted markdown conversation into a pane
//
// The script is chunked mid-word and mid-construct on purpose - fences
// and headings arrive split across chunks, the way model output does,
// so the full-replace render path is exercised on partial markup.

use crate::clipboard::MemoryClipboard;
use crate::config::Config;
use crate::message::{PaneRouter, RawMessage};
use crate::pane::StreamPane;
use anyhow::Result;
use serde_json::Value;
use std::time::Instant;
use tokio::time::sleep;

/// Pane id used by both the TUI and headless demo
pub const DEMO_PANE: &str = "demo";

/// The scripted chunk sequence
pub fn script() -> &'static [&'static str] {
    &[
        "# streampane demo\n\n",
        "Content arrives in **chunks**, ",
        "and every chunk re-renders the whole document.\n\n",
        "While streaming, rebinding is throttled and the ",
        "indicator stays pinned to the bottom.\n\n",
        "## A code block\n\n```json\n{\n",
        "  \"streaming\": true,\n",
        "  \"window_ms\": 200\n",
        "}\n```\n\n",
        "- scroll up to stop following\n",
        "- scroll back down to resume\n",
        "- press `c` to copy the code block\n\n",
        "> The pane never overrides a manual scroll mid-stream.\n\n",
        "```rust\nfn follow(bottom: bool) -> &'static str {\n",
        "    if bottom { \"pinned\" } else { \"reading\" }\n",
        "}\n```\n\n",
        "Docs: [content lifecycle](https://example.com/lifecycle)\n\n",
        "That's the stream. ",
        "Ending now.\n",
    ]
}

/// Run the demo without a terminal: print lifecycle events to stdout.
/// Useful on machines without a TTY and for eyeballing the message flow.
pub async fn run_headless(config: &Config) -> Result<()> {
    let pane = StreamPane::new(DEMO_PANE, &config.pane)
        .with_clipboard(Box::new(MemoryClipboard::default()))
        .on_content_change(Box::new(|content| {
            println!("content changed: {} bytes", content.len());
            Ok(())
        }))
        .on_stream_end(Box::new(|| {
            println!("stream ended");
            Ok(())
        }));
    let mut router = PaneRouter::new();
    router.register(pane);

    router.dispatch(
        &RawMessage::new(DEMO_PANE, "streaming", Value::Bool(true)),
        Instant::now(),
    )?;

    for chunk in script() {
        let now = Instant::now();
        router.dispatch(
            &RawMessage::new(DEMO_PANE, "append", Value::String((*chunk).into())),
            now,
        )?;
        router.poll(now);
        sleep(config.chunk_delay).await;
    }

    // Let the last throttle window elapse before ending the stream
    sleep(config.pane.rebind_window).await;
    let now = Instant::now();
    router.poll(now);
    router.dispatch(
        &RawMessage::new(DEMO_PANE, "streaming", Value::Bool(false)),
        now,
    )?;

    let pane = router.get(DEMO_PANE).expect("demo pane registered");
    println!(
        "done: {} nodes, {} bind calls, last bound revision {:?}",
        pane.document().nodes.len(),
        pane.bind_calls(),
        pane.last_bound_revision(),
    );
    router.clear();
    Ok(())
}
