//! streampane - a streaming text pane
//!
//! Renders incrementally arriving text (markdown, semi-markdown, HTML or
//! plain text) into a live document, the way chat-style UIs display
//! model output while it is still being generated.
//!
//! The interesting part is the content-update lifecycle: how chunks are
//! merged into the displayed document, how auto-scroll behaves while
//! content is still growing, and how expensive post-render work
//! (framework rebinding, code highlighting, copy affordances) is
//! scheduled so it does not run on every chunk of a rapid stream.
//!
//! Architecture:
//! - [`pane::StreamPane`]: the lifecycle controller; owns content,
//!   content type, streaming and auto-scroll state and runs
//!   unbind -> transform -> render -> post-render -> rebind -> scroll
//!   on every content change
//! - [`rebind::RebindScheduler`]: trailing-edge throttle for the
//!   framework bridge's bind step while streaming
//! - [`scroll::ScrollTracker`]: nearest-scrollable-ancestor resolution,
//!   manual-scroll detection and the auto-scroll decision
//! - [`highlight::PostRenderPipeline`]: at-most-once code highlighting
//!   and the copy-to-clipboard affordance
//! - [`message::PaneRouter`]: addressed control-message dispatch
//!
//! Collaborators (renderer, highlighter, framework bridge, clipboard)
//! sit behind traits with working defaults; hosts inject their own.
//! Time is passed in explicitly (`Instant`), deferred work runs from
//! `poll`, so every timing behavior is deterministic under test.

pub mod bridge;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod demo;
pub mod document;
pub mod highlight;
pub mod logging;
pub mod message;
pub mod pane;
pub mod rebind;
pub mod render;
pub mod scroll;
pub mod tui;

pub use config::{Config, PaneConfig};
pub use document::{Document, Node};
pub use message::{Operation, PaneRouter, RawMessage};
pub use pane::StreamPane;
pub use render::ContentType;
