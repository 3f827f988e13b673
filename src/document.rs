// Rendered output model for the streaming pane
//
// A Document is the pane's displayed subtree: an ordered list of nodes
// produced by the content renderer, plus an optional streaming indicator
// as the final node. Every content update rebuilds the whole document
// (full replace, not a diff) and bumps the revision counter, which is
// what the rebind scheduler reports binds against.

use sha2::{Digest, Sha256};

/// Stable identity for a code region, derived from its content.
///
/// Keyed by a hash of language + code rather than position, so a region
/// that reappears verbatim after a full-document replace keeps the same
/// identity and is not re-processed.
pub type RegionId = String;

/// A fenced code block in the rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag from the fence, if any (e.g. "rust", "json")
    pub lang: Option<String>,
    /// Raw code text, exactly as it will be copied to the clipboard
    pub code: String,
    /// Display lines produced by the highlighter; None until processed
    pub rendered: Option<Vec<String>>,
}

impl CodeBlock {
    pub fn new(lang: Option<String>, code: String) -> Self {
        Self {
            lang,
            code,
            rendered: None,
        }
    }

    /// Content-derived identity for the post-render processed set
    pub fn region_id(&self) -> RegionId {
        let mut hasher = Sha256::new();
        hasher.update(self.lang.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]); // separator so ("rs","x") != ("", "rsx")
        hasher.update(self.code.as_bytes());
        let digest = hasher.finalize();
        // First 8 bytes are plenty for identity within one pane
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// One rendered node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Heading with level 1-6
    Heading { level: u8, text: String },
    /// Flowing text paragraph (inline markup already flattened)
    Paragraph(String),
    /// Fenced code block, processed once by the post-render pipeline
    Code(CodeBlock),
    /// Blockquote content
    Quote(String),
    /// Horizontal rule
    Rule,
    /// Sanitized passthrough markup (html content type, embedded HTML)
    Raw(String),
    /// Streaming indicator marker; present iff the pane is streaming
    Indicator,
}

/// The pane's displayed subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Monotonic revision, bumped on every full replace
    pub revision: u64,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(revision: u64, nodes: Vec<Node>) -> Self {
        Self { revision, nodes }
    }

    /// Whether the streaming indicator is currently present
    pub fn has_indicator(&self) -> bool {
        matches!(self.nodes.last(), Some(Node::Indicator))
    }

    /// Add or remove the streaming indicator as the last node.
    ///
    /// Idempotent per direction: appending twice keeps one indicator,
    /// removing from a document without one is a no-op.
    pub fn set_indicator(&mut self, on: bool) {
        match (on, self.has_indicator()) {
            (true, false) => self.nodes.push(Node::Indicator),
            (false, true) => {
                self.nodes.pop();
            }
            _ => {}
        }
    }

    /// Iterate code blocks immutably
    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Code(block) => Some(block),
            _ => None,
        })
    }

    /// Iterate code blocks mutably (post-render pipeline)
    pub fn code_blocks_mut(&mut self) -> impl Iterator<Item = &mut CodeBlock> {
        self.nodes.iter_mut().filter_map(|n| match n {
            Node::Code(block) => Some(block),
            _ => None,
        })
    }

    /// Find a code block by region identity
    pub fn code_block(&self, region: &str) -> Option<&CodeBlock> {
        self.code_blocks().find(|b| b.region_id() == region)
    }
}
