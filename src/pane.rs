// Content lifecycle controller - the core of the streaming pane
//
// A StreamPane owns the observable state (content, content type,
// streaming flag, auto-scroll flag) and orchestrates every content
// change through a fixed sequence:
//
//   unbind -> transform -> render -> post-render -> indicator
//          -> rebind -> scroll -> callbacks
//
// The transform is the only fatal step: if the renderer rejects the
// input, the update is abandoned and the previously displayed document
// stays untouched. Everything else (bridge calls, highlighter, the
// registered callbacks) fails locally: caught, logged, and the rest of
// the sequence still runs. A single malformed code block or a transient
// binding failure must never corrupt or freeze the stream.
//
// The streaming flag is an independent axis: Off->On appends the
// indicator immediately, On->Off removes it, forces an unthrottled bind
// and fires on_stream_end once. Setting it to its current value is a
// no-op.

use crate::bridge::{FrameworkBridge, NoopBridge};
use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::config::PaneConfig;
use crate::document::Document;
use crate::highlight::{Highlighter, NoopHighlighter, PostRenderPipeline};
use crate::message::Operation;
use crate::rebind::RebindScheduler;
use crate::render::{ContentRenderer, ContentType, DefaultRenderer};
use crate::scroll::{ScrollTracker, SharedRegion};
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::warn;

/// Invoked after every applied content update, with the new raw content.
/// An error is logged, never propagated.
pub type ContentChangeCallback = Box<dyn FnMut(&str) -> Result<()>>;

/// Invoked once per streaming true->false transition.
pub type StreamEndCallback = Box<dyn FnMut() -> Result<()>>;

/// One streaming content pane
pub struct StreamPane {
    id: String,
    content: String,
    content_type: ContentType,
    streaming: bool,
    auto_scroll: bool,
    document: Document,
    revision: u64,

    renderer: Box<dyn ContentRenderer>,
    highlighter: Box<dyn Highlighter>,
    bridge: Box<dyn FrameworkBridge>,
    clipboard: Box<dyn ClipboardSink>,

    scheduler: RebindScheduler,
    pipeline: PostRenderPipeline,
    tracker: ScrollTracker,
    ancestors: Vec<SharedRegion>,

    on_content_change: Option<ContentChangeCallback>,
    on_stream_end: Option<StreamEndCallback>,
}

impl StreamPane {
    pub fn new(id: impl Into<String>, config: &PaneConfig) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            content_type: config.content_type,
            streaming: false,
            auto_scroll: config.auto_scroll,
            document: Document::default(),
            revision: 0,
            renderer: Box::new(DefaultRenderer),
            highlighter: Box::new(NoopHighlighter),
            bridge: Box::new(NoopBridge),
            clipboard: Box::new(SystemClipboard),
            scheduler: RebindScheduler::new(config.rebind_window),
            pipeline: PostRenderPipeline::new(config.copy_confirm),
            tracker: ScrollTracker::new(config.scroll_threshold),
            ancestors: Vec::new(),
            on_content_change: None,
            on_stream_end: None,
        }
    }

    // Collaborator injection, builder style

    pub fn with_renderer(mut self, renderer: Box<dyn ContentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_highlighter(mut self, highlighter: Box<dyn Highlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn with_bridge(mut self, bridge: Box<dyn FrameworkBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn on_content_change(mut self, callback: ContentChangeCallback) -> Self {
        self.on_content_change = Some(callback);
        self
    }

    pub fn on_stream_end(mut self, callback: StreamEndCallback) -> Self {
        self.on_stream_end = Some(callback);
        self
    }

    /// Register the host's ancestor chain for scroll tracking, nearest
    /// first. Resolution walks this on every content update.
    pub fn set_scroll_ancestors(&mut self, ancestors: Vec<SharedRegion>) {
        self.ancestors = ancestors;
    }

    /// Apply one inbound control operation
    pub fn apply(&mut self, op: Operation, now: Instant) -> Result<()> {
        match op {
            Operation::Replace(text) => {
                self.content = text;
                self.update(now)
            }
            Operation::Append(chunk) => {
                self.content.push_str(&chunk);
                self.update(now)
            }
            Operation::SetStreaming(on) => {
                self.set_streaming(on, now);
                Ok(())
            }
            Operation::SetContentType(ty) => {
                if ty != self.content_type {
                    self.content_type = ty;
                    self.update(now)
                } else {
                    Ok(())
                }
            }
            Operation::SetAutoScroll(on) => {
                self.auto_scroll = on;
                // Takes effect immediately: tears down tracking when off,
                // re-resolves on the next update when on
                self.tracker.resolve(&self.ancestors, on);
                Ok(())
            }
        }
    }

    /// Run the content-update lifecycle against the current content.
    ///
    /// Fatal only if the renderer rejects the input; the error names the
    /// pane and the prior document is left untouched.
    fn update(&mut self, now: Instant) -> Result<()> {
        // 1. Content is being added: scroll events are ours, not the user's
        self.tracker.begin_content_update();

        // 2. Stale bindings must come off before the subtree is replaced
        if let Err(e) = self.bridge.unbind(&self.document) {
            warn!(pane = %self.id, error = %e, "bridge unbind failed");
        }

        // 3. Transform (the only fatal step)
        let nodes = match self
            .renderer
            .render(&self.content, self.content_type)
            .with_context(|| format!("content update rejected for pane {:?}", self.id))
        {
            Ok(nodes) => nodes,
            Err(e) => {
                self.tracker.end_content_update();
                return Err(e);
            }
        };

        // 4. Full replace, not a diff
        self.revision += 1;
        self.document = Document::new(self.revision, nodes);

        // 5. Highlight new code regions, at most once per region ever
        self.pipeline.run(&mut self.document, &*self.highlighter);

        // 6. The indicator is lost on every full replace; re-add it
        //    while streaming
        if self.streaming {
            self.document.set_indicator(true);
        }

        // 7. Rebind: throttled while streaming, immediate otherwise
        self.scheduler
            .request(&mut *self.bridge, &self.document, self.streaming, now);

        // 8. Re-resolve the scrollable ancestor and follow the bottom
        self.tracker.resolve(&self.ancestors, self.auto_scroll);
        self.tracker.maybe_scroll(self.streaming);

        // 9. Done; the callback may not break the pane
        self.tracker.end_content_update();
        if let Some(mut callback) = self.on_content_change.take() {
            if let Err(e) = callback(&self.content) {
                warn!(pane = %self.id, error = %e, "on_content_change callback failed");
            }
            self.on_content_change = Some(callback);
        }
        Ok(())
    }

    /// Toggle the streaming flag. Same-value sets are no-ops; there is
    /// no meaningful On->On transition.
    fn set_streaming(&mut self, on: bool, now: Instant) {
        if on == self.streaming {
            return;
        }
        self.streaming = on;
        if on {
            // Show the indicator right away, no content update required
            self.document.set_indicator(true);
            return;
        }

        self.document.set_indicator(false);
        // The first bind after streaming stops is always exact
        self.scheduler
            .request(&mut *self.bridge, &self.document, false, now);
        if let Some(mut callback) = self.on_stream_end.take() {
            if let Err(e) = callback() {
                warn!(pane = %self.id, error = %e, "on_stream_end callback failed");
            }
            self.on_stream_end = Some(callback);
        }
    }

    /// Drive deferred work: the trailing rebind call and copy-confirm
    /// expiry. The host calls this on its tick.
    pub fn poll(&mut self, now: Instant) {
        self.scheduler
            .poll(&mut *self.bridge, &self.document, now);
        self.pipeline.poll(now);
    }

    /// A scroll event arrived on the tracked ancestor
    pub fn handle_scroll(&mut self) {
        self.tracker.handle_scroll();
    }

    /// Copy a code region's text to the clipboard; success starts the
    /// transient confirmation
    pub fn copy_code_block(&mut self, region: &str, now: Instant) -> Result<()> {
        self.pipeline
            .copy(&self.document, region, &mut *self.clipboard, now)
            .with_context(|| format!("copy failed for pane {:?}", self.id))
    }

    /// Tear down scroll tracking; the pane is going away.
    /// No listener survives this call.
    pub fn destroy(&mut self) {
        self.tracker.detach();
    }

    // Observable state

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scrolled_away(&self) -> bool {
        self.tracker.scrolled_away()
    }

    pub fn is_copy_confirmed(&self, region: &str, now: Instant) -> bool {
        self.pipeline.is_confirmed(region, now)
    }

    /// Revision the last executed bind ran against (None before any bind)
    pub fn last_bound_revision(&self) -> Option<u64> {
        self.scheduler.last_executed()
    }

    pub fn bind_calls(&self) -> u64 {
        self.scheduler.bind_calls()
    }
}

impl std::fmt::Debug for StreamPane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPane")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("streaming", &self.streaming)
            .field("auto_scroll", &self.auto_scroll)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::document::Node;
    use crate::scroll::tests::{shared, MockRegion};
    use anyhow::bail;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Bridge double shared with the pane through interior counters
    #[derive(Debug, Default)]
    struct CountingBridge {
        unbinds: Rc<Cell<u64>>,
        binds: Rc<Cell<u64>>,
    }

    impl FrameworkBridge for CountingBridge {
        fn unbind(&mut self, _doc: &Document) -> Result<()> {
            self.unbinds.set(self.unbinds.get() + 1);
            Ok(())
        }
        fn bind_all(&mut self, _doc: &Document) -> Result<()> {
            self.binds.set(self.binds.get() + 1);
            Ok(())
        }
    }

    /// Renderer double that always rejects the input
    struct RejectingRenderer;

    impl ContentRenderer for RejectingRenderer {
        fn render(&self, _text: &str, _ty: ContentType) -> Result<Vec<Node>> {
            bail!("renderer rejected input")
        }
    }

    fn pane() -> StreamPane {
        StreamPane::new("pane-1", &PaneConfig::default())
    }

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn test_replace_then_append_concatenates() {
        let mut p = pane();
        let now = t0();
        p.apply(Operation::Replace("abc".into()), now).unwrap();
        p.apply(Operation::Append("def".into()), now).unwrap();
        assert_eq!(p.content(), "abcdef");
    }

    #[test]
    fn test_replace_overwrites() {
        let mut p = pane();
        let now = t0();
        p.apply(Operation::Replace("abc".into()), now).unwrap();
        p.apply(Operation::Replace("xyz".into()), now).unwrap();
        assert_eq!(p.content(), "xyz");
    }

    #[test]
    fn test_update_renders_document_and_bumps_revision() {
        let mut p = pane();
        let now = t0();
        p.apply(Operation::Replace("# Hi".into()), now).unwrap();
        assert_eq!(p.document().revision, 1);
        assert_eq!(
            p.document().nodes[0],
            Node::Heading {
                level: 1,
                text: "Hi".into()
            }
        );

        p.apply(Operation::Append("\n\nmore".into()), now).unwrap();
        assert_eq!(p.document().revision, 2);
    }

    #[test]
    fn test_rejected_transform_leaves_prior_document() {
        let mut p = pane();
        let now = t0();
        p.apply(Operation::Replace("good".into()), now).unwrap();
        let before = p.document().clone();

        let mut broken = StreamPane::new("pane-1", &PaneConfig::default())
            .with_renderer(Box::new(RejectingRenderer));
        // Same scenario against a rejecting renderer: update fails,
        // displayed document is untouched
        broken.apply(Operation::Replace("good".into()), now).unwrap_err();
        assert_eq!(broken.document().revision, 0);
        assert!(broken.document().nodes.is_empty());

        // And the healthy pane still shows its document
        assert_eq!(p.document(), &before);
    }

    #[test]
    fn test_rejected_transform_error_names_the_pane() {
        let mut p = StreamPane::new("chat-output", &PaneConfig::default())
            .with_renderer(Box::new(RejectingRenderer));
        let err = p
            .apply(Operation::Replace("x".into()), t0())
            .unwrap_err();
        assert!(format!("{err:#}").contains("chat-output"));
    }

    #[test]
    fn test_indicator_follows_streaming_flag() {
        let mut p = pane();
        let now = t0();

        // Off->On shows the indicator without a content update
        p.apply(Operation::SetStreaming(true), now).unwrap();
        assert!(p.document().has_indicator());

        // Present after each update while streaming
        p.apply(Operation::Replace("text".into()), now).unwrap();
        assert!(p.document().has_indicator());
        p.apply(Operation::Append(" more".into()), now).unwrap();
        assert!(p.document().has_indicator());

        // On->Off removes it
        p.apply(Operation::SetStreaming(false), now).unwrap();
        assert!(!p.document().has_indicator());
    }

    #[test]
    fn test_stream_end_fires_exactly_once() {
        let ends = Rc::new(Cell::new(0u32));
        let ends_cb = ends.clone();
        let mut p = pane().on_stream_end(Box::new(move || {
            ends_cb.set(ends_cb.get() + 1);
            Ok(())
        }));
        let now = t0();

        p.apply(Operation::SetStreaming(false), now).unwrap(); // false->false: nothing
        assert_eq!(ends.get(), 0);

        p.apply(Operation::SetStreaming(true), now).unwrap();
        p.apply(Operation::SetStreaming(true), now).unwrap(); // true->true: no-op
        p.apply(Operation::SetStreaming(false), now).unwrap();
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn test_callback_errors_are_swallowed() {
        let mut p = pane()
            .on_content_change(Box::new(|_| bail!("observer broke")))
            .on_stream_end(Box::new(|| bail!("observer broke")));
        let now = t0();

        // Neither callback failure surfaces to the caller
        p.apply(Operation::Replace("x".into()), now).unwrap();
        p.apply(Operation::SetStreaming(true), now).unwrap();
        p.apply(Operation::SetStreaming(false), now).unwrap();
        assert_eq!(p.content(), "x");
    }

    #[test]
    fn test_content_change_fires_once_per_update() {
        let changes = Rc::new(Cell::new(0u32));
        let changes_cb = changes.clone();
        let mut p = pane().on_content_change(Box::new(move |_| {
            changes_cb.set(changes_cb.get() + 1);
            Ok(())
        }));
        let now = t0();

        p.apply(Operation::Replace("a".into()), now).unwrap();
        p.apply(Operation::Append("b".into()), now).unwrap();
        assert_eq!(changes.get(), 2);

        // Streaming toggles are not content updates
        p.apply(Operation::SetStreaming(true), now).unwrap();
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn test_unbind_precedes_every_render() {
        let bridge = CountingBridge::default();
        let unbinds = bridge.unbinds.clone();
        let mut p = pane().with_bridge(Box::new(bridge));
        let now = t0();

        p.apply(Operation::Replace("a".into()), now).unwrap();
        p.apply(Operation::Append("b".into()), now).unwrap();
        assert_eq!(unbinds.get(), 2);
    }

    #[test]
    fn test_bind_immediate_when_not_streaming() {
        let bridge = CountingBridge::default();
        let binds = bridge.binds.clone();
        let mut p = pane().with_bridge(Box::new(bridge));

        p.apply(Operation::Replace("a".into()), t0()).unwrap();
        assert_eq!(binds.get(), 1);
        assert_eq!(p.last_bound_revision(), Some(1));
    }

    #[test]
    fn test_auto_scroll_follows_streamed_content() {
        let region = MockRegion::new(1, 10, 100);
        let mut p = pane();
        p.set_scroll_ancestors(vec![shared(&region)]);
        let now = t0();

        p.apply(Operation::SetStreaming(true), now).unwrap();
        p.apply(Operation::Replace("text".into()), now).unwrap();

        let r = region.borrow();
        assert_eq!(r.scrolls.len(), 1);
        assert_eq!(r.position, 90); // pinned to bottom
    }

    #[test]
    fn test_auto_scroll_off_is_inert() {
        let region = MockRegion::new(1, 10, 100);
        let config = PaneConfig {
            auto_scroll: false,
            ..PaneConfig::default()
        };
        let mut p = StreamPane::new("pane-1", &config);
        p.set_scroll_ancestors(vec![shared(&region)]);

        p.apply(Operation::Replace("text".into()), t0()).unwrap();
        assert!(region.borrow().scrolls.is_empty());
        assert!(!region.borrow().attached);
    }

    #[test]
    fn test_destroy_detaches_the_listener() {
        let region = MockRegion::new(1, 10, 100);
        let mut p = pane();
        p.set_scroll_ancestors(vec![shared(&region)]);
        p.apply(Operation::Replace("text".into()), t0()).unwrap();
        assert!(region.borrow().attached);

        p.destroy();
        assert!(!region.borrow().attached);
    }

    #[test]
    fn test_copy_code_block_through_injected_clipboard() {
        let mut p = pane().with_clipboard(Box::new(MemoryClipboard::default()));
        let now = t0();
        p.apply(
            Operation::Replace("```rust\nfn f() {}\n```".into()),
            now,
        )
        .unwrap();

        let region = p.document().code_blocks().next().unwrap().region_id();
        p.copy_code_block(&region, now).unwrap();
        assert!(p.is_copy_confirmed(&region, now + Duration::from_secs(1)));
        assert!(!p.is_copy_confirmed(&region, now + Duration::from_secs(3)));
    }

    /// The full streaming scenario: rapid appends collapse into one
    /// trailing bind; stream end is exact.
    #[test]
    fn test_end_to_end_streaming_scenario() {
        let bridge = CountingBridge::default();
        let binds = bridge.binds.clone();
        let ends = Rc::new(Cell::new(0u32));
        let ends_cb = ends.clone();

        let mut p = pane()
            .with_bridge(Box::new(bridge))
            .on_stream_end(Box::new(move || {
                ends_cb.set(ends_cb.get() + 1);
                Ok(())
            }));
        let t0 = Instant::now();

        p.apply(Operation::SetStreaming(true), t0).unwrap();

        // Three rapid chunks, 10 ms apart
        for (chunk, ms) in [("# Hi", 0u64), ("\n\nWorld", 10), (" !", 20)] {
            let now = t0 + Duration::from_millis(ms);
            p.apply(Operation::Append(chunk.into()), now).unwrap();
            p.poll(now);
            assert!(p.document().has_indicator());
        }
        assert_eq!(p.content(), "# Hi\n\nWorld !");
        assert_eq!(binds.get(), 0); // throttled, nothing yet

        // Trailing edge: exactly one bind, against the latest revision
        p.poll(t0 + Duration::from_millis(200));
        assert_eq!(binds.get(), 1);
        assert_eq!(p.last_bound_revision(), Some(3));

        // Stream end: indicator removed, immediate bind, one callback
        p.apply(
            Operation::SetStreaming(false),
            t0 + Duration::from_millis(230),
        )
        .unwrap();
        assert!(!p.document().has_indicator());
        assert_eq!(binds.get(), 2);
        assert_eq!(ends.get(), 1);

        // Nothing left pending
        p.poll(t0 + Duration::from_secs(1));
        assert_eq!(binds.get(), 2);
    }
}
