// Scroll tracker - keeps the nearest scrollable ancestor pinned to the
// bottom while content streams in, unless the user scrolled away
//
// The host supplies an ordered ancestor chain of ScrollRegion handles.
// After every content update the tracker re-resolves which ancestor is
// "the" scrollable one (the first whose scrollable extent exceeds its
// visible extent), re-associates its scroll listener if that changed,
// and decides whether to scroll to the bottom.
//
// The user's position wins: once a manual scroll leaves the bottom
// proximity threshold, updates stop auto-scrolling until the user
// returns within the threshold or the pane is destroyed. Scroll events
// that arrive while the pane itself is mutating content are ignored so
// programmatic scrolls are never mistaken for the user.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Bottom proximity threshold of the reference implementation, in scroll
/// units (rows in the demo TUI, pixels in a GUI host)
pub const DEFAULT_BOTTOM_THRESHOLD: usize = 50;

/// How a scroll-to-bottom should be performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump straight to the bottom (used while streaming, so the view
    /// never lags a fast stream)
    Instant,
    /// Animate to the bottom (used for one-off updates)
    Smooth,
}

/// A host scroll container the pane can track.
///
/// Extents and positions share one unit; `position` is the offset of the
/// top of the viewport within the scrollable extent. `attach_listener` /
/// `detach_listener` mark this region as the one whose scroll events the
/// host must forward to `ScrollTracker::handle_scroll`.
pub trait ScrollRegion {
    /// Stable identity, used to detect re-association
    fn id(&self) -> u64;
    fn viewport_extent(&self) -> usize;
    fn scroll_extent(&self) -> usize;
    fn position(&self) -> usize;
    fn scroll_to_bottom(&mut self, behavior: ScrollBehavior);
    fn attach_listener(&mut self);
    fn detach_listener(&mut self);
}

/// Shared handle to a host scroll region (single-threaded pane model)
pub type SharedRegion = Rc<RefCell<dyn ScrollRegion>>;

/// Per-pane scroll tracking state
#[derive(Default)]
pub struct ScrollTracker {
    /// Currently associated region; owns the one active listener
    tracked: Option<SharedRegion>,
    /// User manually scrolled away from the bottom
    scrolled_away: bool,
    /// Content mutation in progress; scroll events are not the user's
    content_updating: bool,
    threshold: usize,
}

impl ScrollTracker {
    pub fn new(threshold: usize) -> Self {
        Self {
            tracked: None,
            scrolled_away: false,
            content_updating: false,
            threshold,
        }
    }

    /// Re-resolve the scrollable ancestor.
    ///
    /// Walks `ancestors` in order and associates the first one whose
    /// scroll extent exceeds its viewport extent. Recomputed on every
    /// content update rather than cached. With `auto_scroll` off the
    /// tracker is inert: any existing association is torn down.
    ///
    /// Invariant: the old region's listener is detached before the new
    /// one is attached, so at most one listener is ever active.
    pub fn resolve(&mut self, ancestors: &[SharedRegion], auto_scroll: bool) {
        if !auto_scroll {
            self.detach();
            return;
        }

        let next = ancestors
            .iter()
            .find(|r| {
                let r = r.borrow();
                r.scroll_extent() > r.viewport_extent()
            })
            .cloned();

        let next_id = next.as_ref().map(|r| r.borrow().id());
        let current_id = self.tracked.as_ref().map(|r| r.borrow().id());
        if next_id == current_id {
            return;
        }

        if let Some(old) = self.tracked.take() {
            old.borrow_mut().detach_listener();
        }
        if let Some(region) = next {
            debug!(region = ?next_id, "scroll tracker re-associated");
            region.borrow_mut().attach_listener();
            self.tracked = Some(region);
        }
    }

    /// A scroll event arrived on the tracked region.
    ///
    /// Ignored while content is being added (those scrolls are ours, not
    /// the user's). Otherwise the distance from the bottom decides:
    /// beyond the threshold marks the user as away, within it clears the
    /// mark - the user scrolling back re-enables auto-scroll.
    pub fn handle_scroll(&mut self) {
        if self.content_updating {
            return;
        }
        let Some(region) = &self.tracked else {
            return;
        };
        let region = region.borrow();
        let bottom = region.scroll_extent();
        let seen = region.position() + region.viewport_extent();
        let distance = bottom.saturating_sub(seen);
        let away = distance > self.threshold;
        if away != self.scrolled_away {
            trace!(distance, away, "manual scroll state changed");
        }
        self.scrolled_away = away;
    }

    /// After an update: scroll the tracked region to its bottom unless
    /// the user is away. Instant while streaming, smooth otherwise.
    pub fn maybe_scroll(&mut self, streaming: bool) {
        if self.scrolled_away {
            return;
        }
        if let Some(region) = &self.tracked {
            let behavior = if streaming {
                ScrollBehavior::Instant
            } else {
                ScrollBehavior::Smooth
            };
            region.borrow_mut().scroll_to_bottom(behavior);
        }
    }

    /// Suppress manual-scroll detection for the duration of an update
    pub fn begin_content_update(&mut self) {
        self.content_updating = true;
    }

    pub fn end_content_update(&mut self) {
        self.content_updating = false;
    }

    /// Tear down the association and reset tracking state.
    /// Called on destroy and when auto-scroll is disabled.
    pub fn detach(&mut self) {
        if let Some(region) = self.tracked.take() {
            region.borrow_mut().detach_listener();
        }
        self.scrolled_away = false;
    }

    pub fn scrolled_away(&self) -> bool {
        self.scrolled_away
    }

    pub fn tracked_id(&self) -> Option<u64> {
        self.tracked.as_ref().map(|r| r.borrow().id())
    }
}

impl std::fmt::Debug for ScrollTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollTracker")
            .field("tracked", &self.tracked_id())
            .field("scrolled_away", &self.scrolled_away)
            .field("content_updating", &self.content_updating)
            .field("threshold", &self.threshold)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scroll region double that counts listener churn
    #[derive(Debug)]
    pub(crate) struct MockRegion {
        pub id: u64,
        pub viewport: usize,
        pub extent: usize,
        pub position: usize,
        pub attached: bool,
        pub attach_count: usize,
        pub detach_count: usize,
        pub scrolls: Vec<ScrollBehavior>,
    }

    impl MockRegion {
        pub fn new(id: u64, viewport: usize, extent: usize) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                id,
                viewport,
                extent,
                position: 0,
                attached: false,
                attach_count: 0,
                detach_count: 0,
                scrolls: Vec::new(),
            }))
        }
    }

    impl ScrollRegion for MockRegion {
        fn id(&self) -> u64 {
            self.id
        }
        fn viewport_extent(&self) -> usize {
            self.viewport
        }
        fn scroll_extent(&self) -> usize {
            self.extent
        }
        fn position(&self) -> usize {
            self.position
        }
        fn scroll_to_bottom(&mut self, behavior: ScrollBehavior) {
            self.position = self.extent.saturating_sub(self.viewport);
            self.scrolls.push(behavior);
        }
        fn attach_listener(&mut self) {
            self.attached = true;
            self.attach_count += 1;
        }
        fn detach_listener(&mut self) {
            self.attached = false;
            self.detach_count += 1;
        }
    }

    pub(crate) fn shared(region: &Rc<RefCell<MockRegion>>) -> SharedRegion {
        region.clone()
    }

    #[test]
    fn test_resolution_picks_first_overflowing_ancestor() {
        let flat = MockRegion::new(1, 10, 10); // no overflow
        let tall = MockRegion::new(2, 10, 100);
        let taller = MockRegion::new(3, 10, 200);
        let chain = vec![shared(&flat), shared(&tall), shared(&taller)];

        let mut tracker = ScrollTracker::new(DEFAULT_BOTTOM_THRESHOLD);
        tracker.resolve(&chain, true);
        assert_eq!(tracker.tracked_id(), Some(2));
        assert!(tall.borrow().attached);
        assert!(!taller.borrow().attached);
    }

    #[test]
    fn test_auto_scroll_off_means_no_association() {
        let tall = MockRegion::new(1, 10, 100);
        let chain = vec![shared(&tall)];

        let mut tracker = ScrollTracker::new(DEFAULT_BOTTOM_THRESHOLD);
        tracker.resolve(&chain, true);
        assert_eq!(tracker.tracked_id(), Some(1));

        // Turning auto-scroll off tears the association down
        tracker.resolve(&chain, false);
        assert_eq!(tracker.tracked_id(), None);
        assert!(!tall.borrow().attached);
    }

    #[test]
    fn test_listener_exclusivity_across_reassociation() {
        let a = MockRegion::new(1, 10, 100);
        let b = MockRegion::new(2, 10, 100);
        let mut tracker = ScrollTracker::new(DEFAULT_BOTTOM_THRESHOLD);

        tracker.resolve(&[shared(&a), shared(&b)], true);
        assert!(a.borrow().attached);

        // `a` stops overflowing; tracking must move to `b`
        a.borrow_mut().extent = 10;
        tracker.resolve(&[shared(&a), shared(&b)], true);
        assert!(!a.borrow().attached);
        assert!(b.borrow().attached);

        // Never more than one listener across all ever-associated regions
        let active =
            usize::from(a.borrow().attached) + usize::from(b.borrow().attached);
        assert_eq!(active, 1);
        assert_eq!(a.borrow().attach_count, 1);
        assert_eq!(a.borrow().detach_count, 1);
    }

    #[test]
    fn test_stable_resolution_does_not_rattle_the_listener() {
        let tall = MockRegion::new(1, 10, 100);
        let chain = vec![shared(&tall)];
        let mut tracker = ScrollTracker::new(DEFAULT_BOTTOM_THRESHOLD);

        for _ in 0..5 {
            tracker.resolve(&chain, true);
        }
        // Same ancestor every time: attached once, never detached
        assert_eq!(tall.borrow().attach_count, 1);
        assert_eq!(tall.borrow().detach_count, 0);
    }

    #[test]
    fn test_manual_scroll_away_and_back() {
        let tall = MockRegion::new(1, 10, 200);
        let chain = vec![shared(&tall)];
        let mut tracker = ScrollTracker::new(50);
        tracker.resolve(&chain, true);

        // Way above the bottom: away
        tall.borrow_mut().position = 0;
        tracker.handle_scroll();
        assert!(tracker.scrolled_away());

        // Auto-scroll suppressed while away
        tracker.maybe_scroll(true);
        assert!(tall.borrow().scrolls.is_empty());

        // Back within the threshold: distance 200 - (150+10) = 40 <= 50
        tall.borrow_mut().position = 150;
        tracker.handle_scroll();
        assert!(!tracker.scrolled_away());

        tracker.maybe_scroll(true);
        assert_eq!(tall.borrow().scrolls, vec![ScrollBehavior::Instant]);
    }

    #[test]
    fn test_scroll_events_during_update_are_ignored() {
        let tall = MockRegion::new(1, 10, 200);
        let chain = vec![shared(&tall)];
        let mut tracker = ScrollTracker::new(50);
        tracker.resolve(&chain, true);

        tracker.begin_content_update();
        tall.borrow_mut().position = 0; // would look like a scroll away
        tracker.handle_scroll();
        assert!(!tracker.scrolled_away());
        tracker.end_content_update();

        tracker.handle_scroll();
        assert!(tracker.scrolled_away());
    }

    #[test]
    fn test_away_persists_across_updates() {
        let tall = MockRegion::new(1, 10, 200);
        let chain = vec![shared(&tall)];
        let mut tracker = ScrollTracker::new(50);
        tracker.resolve(&chain, true);

        tall.borrow_mut().position = 0;
        tracker.handle_scroll();
        assert!(tracker.scrolled_away());

        // Several update cycles later the flag still holds
        for _ in 0..3 {
            tracker.begin_content_update();
            tracker.resolve(&chain, true);
            tracker.maybe_scroll(true);
            tracker.end_content_update();
        }
        assert!(tracker.scrolled_away());
        assert!(tall.borrow().scrolls.is_empty());
    }

    #[test]
    fn test_smooth_scroll_when_not_streaming() {
        let tall = MockRegion::new(1, 10, 200);
        let chain = vec![shared(&tall)];
        let mut tracker = ScrollTracker::new(50);
        tracker.resolve(&chain, true);

        tracker.maybe_scroll(false);
        assert_eq!(tall.borrow().scrolls, vec![ScrollBehavior::Smooth]);
    }

    #[test]
    fn test_detach_clears_state() {
        let tall = MockRegion::new(1, 10, 200);
        let chain = vec![shared(&tall)];
        let mut tracker = ScrollTracker::new(50);
        tracker.resolve(&chain, true);

        tall.borrow_mut().position = 0;
        tracker.handle_scroll();
        assert!(tracker.scrolled_away());

        tracker.detach();
        assert_eq!(tracker.tracked_id(), None);
        assert!(!tall.borrow().attached);
        assert!(!tracker.scrolled_away());
    }
}
