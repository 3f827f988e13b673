// Rebind scheduler - throttles the expensive bind step while streaming
//
// Bind (initialize-inputs then bind-all) walks the whole document, and
// chunks can arrive arbitrarily fast during a stream, so repeated bind
// requests inside a fixed window collapse into a single trailing-edge
// call. Unbind is never handled here: it is cheap and must run before
// every document replace, so the lifecycle calls it directly.
//
// The asymmetry is the point: unbind must be exact immediately (no stale
// bindings on discarded nodes), bind tolerates bounded staleness while
// streaming and becomes exact again the moment streaming ends - the
// first request with streaming off always executes unthrottled and
// cancels any pending trailing call.
//
// All state is explicit (deadline, pending revision, last executed) so
// the throttle is deterministic under test: time is passed in, never
// read from a clock.

use crate::bridge::FrameworkBridge;
use crate::document::Document;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Throttle window of the reference implementation
pub const DEFAULT_REBIND_WINDOW: Duration = Duration::from_millis(200);

/// Trailing-edge throttle for the framework bridge's bind step
#[derive(Debug)]
pub struct RebindScheduler {
    window: Duration,
    /// When the pending trailing call fires; None when idle
    deadline: Option<Instant>,
    /// Revision requested by the most recent throttled request
    pending_revision: Option<u64>,
    /// Revision the last executed bind ran against
    last_executed: Option<u64>,
    /// Total bind executions (throttle-bound property is asserted on this)
    bind_calls: u64,
}

impl RebindScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            pending_revision: None,
            last_executed: None,
            bind_calls: 0,
        }
    }

    /// Request a bind against `doc`.
    ///
    /// Not streaming: executes immediately and cancels any pending
    /// trailing call (it would bind the same document again).
    ///
    /// Streaming: the first request while idle arms the trailing
    /// deadline; later requests inside the window only update the
    /// pending revision. The window is fixed, not sliding - a continuous
    /// stream still binds once per window.
    pub fn request(
        &mut self,
        bridge: &mut dyn FrameworkBridge,
        doc: &Document,
        streaming: bool,
        now: Instant,
    ) {
        if !streaming {
            self.deadline = None;
            self.pending_revision = None;
            self.execute(bridge, doc);
            return;
        }

        self.pending_revision = Some(doc.revision);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
            debug!(revision = doc.revision, "rebind throttled, trailing call armed");
        }
    }

    /// Fire the trailing call if its window has elapsed.
    ///
    /// Binds against `doc` as it is now, not as it was when the request
    /// was made - the last requested revision within a window is always
    /// superseded by the latest document.
    pub fn poll(&mut self, bridge: &mut dyn FrameworkBridge, doc: &Document, now: Instant) {
        let Some(deadline) = self.deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        self.deadline = None;
        self.pending_revision = None;
        self.execute(bridge, doc);
    }

    /// Whether a trailing call is armed
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Revision the last executed bind ran against
    pub fn last_executed(&self) -> Option<u64> {
        self.last_executed
    }

    /// Total number of executed bind calls
    pub fn bind_calls(&self) -> u64 {
        self.bind_calls
    }

    /// Run both bind phases, catching and reporting each failure.
    /// A failed first phase does not skip the second; neither failure
    /// aborts the caller.
    fn execute(&mut self, bridge: &mut dyn FrameworkBridge, doc: &Document) {
        if let Err(e) = bridge.initialize_inputs(doc) {
            warn!(revision = doc.revision, error = %e, "bridge initialize_inputs failed");
        }
        if let Err(e) = bridge.bind_all(doc) {
            warn!(revision = doc.revision, error = %e, "bridge bind_all failed");
        }
        self.last_executed = Some(doc.revision);
        self.bind_calls += 1;
    }
}

impl Default for RebindScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REBIND_WINDOW)
    }
}
