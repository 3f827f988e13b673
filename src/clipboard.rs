//! Clipboard collaborator for the copy affordance
//!
//! The post-render pipeline copies code regions through a `ClipboardSink`
//! so tests and headless hosts can substitute an in-memory sink. The
//! system implementation uses `arboard` for cross-platform support
//! (Windows, macOS, Linux); the clipboard is created fresh each time to
//! avoid holding resources.

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Collaborator contract: copy text, report success or failure
pub trait ClipboardSink {
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// System clipboard backed by `arboard`
///
/// Common failure cases: no display server (headless Linux), permission
/// denied. Failures are reported, never panicked on.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
        clipboard
            .set_text(text)
            .context("Failed to set clipboard text")?;
        Ok(())
    }
}

/// In-memory sink for tests and headless demo runs
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    /// Every text copied, in order
    pub copied: Vec<String>,
}

impl ClipboardSink for MemoryClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        self.copied.push(text.to_string());
        Ok(())
    }
}
