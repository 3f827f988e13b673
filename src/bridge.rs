//! Framework bridge collaborator
//!
//! Hosts that hang reactive bindings off the rendered document implement
//! this trait. All three hooks are optional: the default bodies are
//! no-ops, so a unit struct is a valid bridge. The lifecycle catches and
//! logs every failure from these calls; a broken bridge can never stall
//! or corrupt the stream.
//!
//! Call discipline (owned by the lifecycle, not the bridge):
//! - `unbind` runs synchronously before every document replace, so stale
//!   bindings are never left attached to discarded nodes.
//! - `initialize_inputs` then `bind_all` run as one bind step after
//!   render: immediately when not streaming, trailing-edge throttled
//!   while streaming (see `rebind`).

use crate::document::Document;
use anyhow::Result;

/// Collaborator contract for host-framework (re)binding
pub trait FrameworkBridge {
    /// Release bindings attached to the current document
    fn unbind(&mut self, _doc: &Document) -> Result<()> {
        Ok(())
    }

    /// First bind phase: prepare inputs on the new document
    fn initialize_inputs(&mut self, _doc: &Document) -> Result<()> {
        Ok(())
    }

    /// Second bind phase: attach all bindings to the new document
    fn bind_all(&mut self, _doc: &Document) -> Result<()> {
        Ok(())
    }
}

/// A bridge that binds nothing
#[derive(Debug, Default)]
pub struct NoopBridge;

impl FrameworkBridge for NoopBridge {}
