// Inbound control messages and the pane router
//
// Hosts drive panes with small addressed messages: a target element id,
// an operation name, and a value. The wire shape is JSON-friendly
// (serde), but parsing to the typed Operation happens here at the
// boundary; the lifecycle core only ever sees typed operations.
//
// The router replaces any process-wide dispatch: it owns panes keyed by
// element id and can be driven directly in tests. An unrecognized
// operation or target is fatal for that message only - it is reported
// with the offending name and the addressed pane's displayed content is
// left untouched.

use crate::pane::StreamPane;
use crate::render::ContentType;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Wire form of a control message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Element id of the addressed pane
    pub target: String,
    /// Operation name: replace | append | streaming | content-type | auto-scroll
    pub op: String,
    /// Operation argument; string or boolean depending on the operation
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A parsed, typed control operation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Set content to the given string
    Replace(String),
    /// Concatenate the given chunk onto the current content
    Append(String),
    /// Toggle the streaming flag, independent of content
    SetStreaming(bool),
    /// Switch the renderer transform; re-renders current content
    SetContentType(ContentType),
    /// Enable or disable scroll management
    SetAutoScroll(bool),
}

impl RawMessage {
    pub fn new(target: impl Into<String>, op: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            target: target.into(),
            op: op.into(),
            value,
        }
    }

    /// Parse the wire operation. Fails closed on anything outside the
    /// declared operation set, naming the bad operation.
    pub fn parse(&self) -> Result<Operation> {
        match self.op.as_str() {
            "replace" => Ok(Operation::Replace(self.string_value()?)),
            "append" => Ok(Operation::Append(self.string_value()?)),
            "streaming" => Ok(Operation::SetStreaming(self.bool_value()?)),
            "content-type" => Ok(Operation::SetContentType(
                self.string_value()?.parse::<ContentType>()?,
            )),
            "auto-scroll" => Ok(Operation::SetAutoScroll(self.bool_value()?)),
            other => bail!("unrecognized operation {other:?} for element {:?}", self.target),
        }
    }

    fn string_value(&self) -> Result<String> {
        self.value
            .as_str()
            .map(String::from)
            .ok_or_else(|| anyhow!("operation {:?} requires a string value", self.op))
    }

    fn bool_value(&self) -> Result<bool> {
        self.value
            .as_bool()
            .ok_or_else(|| anyhow!("operation {:?} requires a boolean value", self.op))
    }
}

/// Owns panes by element id and routes messages to them
#[derive(Debug, Default)]
pub struct PaneRouter {
    panes: HashMap<String, StreamPane>,
}

impl PaneRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pane under its element id. Replacing an existing
    /// registration destroys the old pane first (its scroll listener
    /// must not dangle).
    pub fn register(&mut self, pane: StreamPane) {
        let id = pane.id().to_string();
        if let Some(mut old) = self.panes.insert(id, pane) {
            old.destroy();
        }
    }

    /// Remove and destroy a pane
    pub fn remove(&mut self, id: &str) -> bool {
        match self.panes.remove(id) {
            Some(mut pane) => {
                pane.destroy();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&StreamPane> {
        self.panes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut StreamPane> {
        self.panes.get_mut(id)
    }

    /// Parse and deliver one message to its addressed pane
    pub fn dispatch(&mut self, message: &RawMessage, now: Instant) -> Result<()> {
        let op = message.parse()?;
        let pane = self
            .panes
            .get_mut(&message.target)
            .ok_or_else(|| anyhow!("no pane registered for element {:?}", message.target))?;
        pane.apply(op, now)
            .with_context(|| format!("message {:?} failed", message.op))
    }

    /// Drive deferred work on every pane
    pub fn poll(&mut self, now: Instant) {
        for pane in self.panes.values_mut() {
            pane.poll(now);
        }
    }

    /// Destroy all panes (host teardown)
    pub fn clear(&mut self) {
        for (_, mut pane) in self.panes.drain() {
            pane.destroy();
        }
    }
}
