// Post-render pipeline - per-code-block highlighting and copy affordance
//
// Runs after every document replace. Each code block is handed to the
// external highlighter at most once over the pane's lifetime, guarded by
// an explicit processed set keyed by region identity (a content hash).
// The guard is re-checked on every run rather than assumed: a full
// replace recreates identical blocks, and the highlighter itself is not
// assumed to be idempotent.
//
// The copy affordance copies a region's code through the clipboard
// collaborator; a successful copy puts the region into a transient
// "confirmed" state for a fixed duration so the UI can acknowledge it.

use crate::clipboard::ClipboardSink;
use crate::document::{CodeBlock, Document, RegionId};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::warn;

/// Copy-confirmation flash duration of the reference implementation
pub const DEFAULT_COPY_CONFIRM: Duration = Duration::from_secs(2);

/// Collaborator contract: render a code block's display lines.
///
/// Not assumed idempotent - the pipeline's processed set is the only
/// thing preventing double highlighting.
pub trait Highlighter {
    fn highlight(&self, block: &mut CodeBlock) -> Result<()>;
}

/// Highlighter that leaves code as plain lines
#[derive(Debug, Default)]
pub struct NoopHighlighter;

impl Highlighter for NoopHighlighter {
    fn highlight(&self, block: &mut CodeBlock) -> Result<()> {
        block.rendered = Some(block.code.lines().map(String::from).collect());
        Ok(())
    }
}

/// Post-render state for one pane
#[derive(Debug)]
pub struct PostRenderPipeline {
    /// Regions highlighted at some point in this pane's lifetime
    processed: HashSet<RegionId>,
    /// Regions currently showing the copy confirmation, with expiry
    confirmed: HashMap<RegionId, Instant>,
    confirm_for: Duration,
}

impl PostRenderPipeline {
    pub fn new(confirm_for: Duration) -> Self {
        Self {
            processed: HashSet::new(),
            confirmed: HashMap::new(),
            confirm_for,
        }
    }

    /// Process every unprocessed code block in the freshly rendered
    /// document. A highlighter failure is logged and skips only that
    /// block's rendering; the block is still marked processed (no
    /// retries) and the remaining blocks still run.
    pub fn run(&mut self, doc: &mut Document, highlighter: &dyn Highlighter) {
        for block in doc.code_blocks_mut() {
            let region = block.region_id();
            if self.processed.contains(&region) {
                continue;
            }
            if let Err(e) = highlighter.highlight(block) {
                warn!(region = %region, error = %e, "highlighter failed for code block");
            }
            self.processed.insert(region);
        }
    }

    /// Copy a region's code to the clipboard. On success the region is
    /// confirmed until `now + confirm_for`.
    pub fn copy(
        &mut self,
        doc: &Document,
        region: &str,
        clipboard: &mut dyn ClipboardSink,
        now: Instant,
    ) -> Result<()> {
        let block = doc
            .code_block(region)
            .ok_or_else(|| anyhow!("no code region {region} in current document"))?;
        clipboard.copy(&block.code)?;
        self.confirmed
            .insert(region.to_string(), now + self.confirm_for);
        Ok(())
    }

    /// Whether the copy confirmation is still showing for a region
    pub fn is_confirmed(&self, region: &str, now: Instant) -> bool {
        self.confirmed.get(region).is_some_and(|until| now < *until)
    }

    /// Expire elapsed copy confirmations
    pub fn poll(&mut self, now: Instant) {
        self.confirmed.retain(|_, until| now < *until);
    }

    /// Whether a region has ever been highlighted
    pub fn is_processed(&self, region: &str) -> bool {
        self.processed.contains(region)
    }
}

impl Default for PostRenderPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_CONFIRM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::document::Node;
    use anyhow::bail;
    use std::cell::Cell;

    /// Highlighter double that counts invocations
    struct CountingHighlighter {
        calls: Cell<usize>,
        fail_lang: Option<&'static str>,
    }

    impl CountingHighlighter {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                fail_lang: None,
            }
        }
    }

    impl Highlighter for CountingHighlighter {
        fn highlight(&self, block: &mut CodeBlock) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_lang.is_some() && block.lang.as_deref() == self.fail_lang {
                bail!("tokenizer choked");
            }
            block.rendered = Some(vec![format!("hl:{}", block.code)]);
            Ok(())
        }
    }

    fn doc_with(blocks: &[(&str, &str)]) -> Document {
        let nodes = blocks
            .iter()
            .map(|(lang, code)| {
                Node::Code(CodeBlock::new(Some(lang.to_string()), code.to_string()))
            })
            .collect();
        Document::new(1, nodes)
    }

    #[test]
    fn test_each_region_highlighted_at_most_once() {
        let mut pipeline = PostRenderPipeline::default();
        let hl = CountingHighlighter::new();
        let mut doc = doc_with(&[("rust", "a"), ("rust", "b")]);

        pipeline.run(&mut doc, &hl);
        assert_eq!(hl.calls.get(), 2);

        // Same subtree again (full replace recreating identical blocks)
        let mut doc2 = doc_with(&[("rust", "a"), ("rust", "b")]);
        pipeline.run(&mut doc2, &hl);
        assert_eq!(hl.calls.get(), 2);

        // A genuinely new block still gets processed
        let mut doc3 = doc_with(&[("rust", "a"), ("rust", "c")]);
        pipeline.run(&mut doc3, &hl);
        assert_eq!(hl.calls.get(), 3);
    }

    #[test]
    fn test_highlighter_failure_does_not_stop_other_blocks() {
        let mut pipeline = PostRenderPipeline::default();
        let hl = CountingHighlighter {
            calls: Cell::new(0),
            fail_lang: Some("bad"),
        };
        let mut doc = doc_with(&[("bad", "x"), ("rust", "y")]);

        pipeline.run(&mut doc, &hl);
        let blocks: Vec<_> = doc.code_blocks().collect();
        assert!(blocks[0].rendered.is_none()); // failed, degrades silently
        assert!(blocks[1].rendered.is_some());

        // Failed block is still marked processed: no retries
        let failed_id = blocks[0].region_id();
        assert!(pipeline.is_processed(&failed_id));
    }

    #[test]
    fn test_copy_confirms_then_expires() {
        let mut pipeline = PostRenderPipeline::new(Duration::from_secs(2));
        let hl = NoopHighlighter;
        let mut doc = doc_with(&[("json", "{\"k\":1}")]);
        pipeline.run(&mut doc, &hl);

        let region = doc.code_blocks().next().unwrap().region_id();
        let mut clipboard = MemoryClipboard::default();
        let t0 = Instant::now();

        pipeline.copy(&doc, &region, &mut clipboard, t0).unwrap();
        assert_eq!(clipboard.copied, vec!["{\"k\":1}"]);
        assert!(pipeline.is_confirmed(&region, t0 + Duration::from_secs(1)));

        // Confirmation reverts after the flash duration
        let later = t0 + Duration::from_secs(3);
        assert!(!pipeline.is_confirmed(&region, later));
        pipeline.poll(later);
        assert!(!pipeline.is_confirmed(&region, t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_copy_unknown_region_is_an_error() {
        let mut pipeline = PostRenderPipeline::default();
        let doc = doc_with(&[("rust", "a")]);
        let mut clipboard = MemoryClipboard::default();
        let err = pipeline
            .copy(&doc, "deadbeefdeadbeef", &mut clipboard, Instant::now())
            .unwrap_err();
        assert!(err.to_string().contains("deadbeef"));
        assert!(clipboard.copied.is_empty());
    }
}
