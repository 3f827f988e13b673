// Content renderer - turns raw streamed text into rendered document nodes
//
// This is the transform step of the content lifecycle. The renderer is a
// collaborator behind a trait so hosts can swap it out; the default
// implementation parses markdown with pulldown-cmark and flattens inline
// markup into plain block text (the pane's document model is block-level).
//
// Content types and their fixed effects:
// - markdown:      full render, raw embedded HTML passes through (sanitized)
// - semi-markdown: full render, raw embedded HTML escaped to visible text
// - html:          sanitize only
// - text:          verbatim passthrough, no markup interpretation

use crate::document::{CodeBlock, Node};
use anyhow::{bail, Result};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which transform the content renderer applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// Render markdown, pass raw embedded HTML through
    #[default]
    Markdown,
    /// Render markdown, escape raw embedded HTML
    SemiMarkdown,
    /// Sanitize only
    Html,
    /// Plain text passthrough
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Markdown => "markdown",
            ContentType::SemiMarkdown => "semi-markdown",
            ContentType::Html => "html",
            ContentType::Text => "text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    /// Parse a wire label. Fails closed: any label outside the four
    /// declared types is an error naming the bad value.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "markdown" => Ok(ContentType::Markdown),
            "semi-markdown" => Ok(ContentType::SemiMarkdown),
            "html" => Ok(ContentType::Html),
            "text" => Ok(ContentType::Text),
            other => bail!("unrecognized content type: {other:?}"),
        }
    }
}

/// Collaborator contract: `(text, type) -> rendered nodes`.
///
/// Must be total over the four declared content types. An `Err` from this
/// trait is the one fatal condition in the content lifecycle: the update
/// is abandoned and the previously displayed document stays untouched.
pub trait ContentRenderer {
    fn render(&self, text: &str, content_type: ContentType) -> Result<Vec<Node>>;
}

/// Default renderer backed by pulldown-cmark
#[derive(Debug, Default)]
pub struct DefaultRenderer;

impl ContentRenderer for DefaultRenderer {
    fn render(&self, text: &str, content_type: ContentType) -> Result<Vec<Node>> {
        Ok(match content_type {
            ContentType::Markdown => render_markdown(text, HtmlPolicy::Sanitize),
            ContentType::SemiMarkdown => render_markdown(text, HtmlPolicy::Escape),
            ContentType::Html => vec![Node::Raw(sanitize_html(text))],
            ContentType::Text => vec![Node::Paragraph(text.to_string())],
        })
    }
}

/// What to do with raw HTML embedded in markdown input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlPolicy {
    Sanitize,
    Escape,
}

/// Parse markdown into block-level document nodes.
///
/// Inline markup (bold, italic, links, inline code) is flattened into the
/// enclosing block's text; the block structure (headings, paragraphs,
/// code fences, quotes, lists, rules, tables) is preserved.
fn render_markdown(markdown: &str, html_policy: HtmlPolicy) -> Vec<Node> {
    let mut nodes = Vec::new();

    // Block accumulation state
    let mut paragraph = String::new();
    let mut heading: Option<u8> = None;
    let mut heading_text = String::new();
    let mut code_lang: Option<String> = None;
    let mut code_text = String::new();
    let mut in_code = false;
    let mut quote_depth: usize = 0;
    let mut quote_text = String::new();
    // List tracking: stack of (ordered, next_number)
    let mut list_stack: Vec<(bool, u64)> = Vec::new();
    // Link state: text collected between start and end
    let mut link_url: Option<String> = None;
    let mut link_text = String::new();
    // Table state: cells of the current row
    let mut table_row: Vec<String> = Vec::new();
    let mut table_cell = String::new();
    let mut in_table_cell = false;

    // Enable extensions: strikethrough (~~text~~) and tables (| col | col |)
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;

    // Route flattened inline text to whichever block is open
    macro_rules! push_text {
        ($s:expr) => {{
            let s: &str = $s;
            if in_code {
                code_text.push_str(s);
            } else if link_url.is_some() {
                link_text.push_str(s);
            } else if in_table_cell {
                table_cell.push_str(s);
            } else if heading.is_some() {
                heading_text.push_str(s);
            } else if quote_depth > 0 {
                quote_text.push_str(s);
            } else {
                paragraph.push_str(s);
            }
        }};
    }

    // Flush a pending paragraph buffer into a node
    macro_rules! flush_paragraph {
        () => {
            if !paragraph.is_empty() {
                nodes.push(Node::Paragraph(std::mem::take(&mut paragraph)));
            }
        };
    }

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_paragraph!();
                heading = Some(match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    HeadingLevel::H3 => 3,
                    HeadingLevel::H4 => 4,
                    HeadingLevel::H5 => 5,
                    HeadingLevel::H6 => 6,
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = heading.take() {
                    nodes.push(Node::Heading {
                        level,
                        text: std::mem::take(&mut heading_text),
                    });
                }
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                flush_paragraph!();
                in_code = true;
                code_lang = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        // First token only: "rust,ignore" -> "rust"
                        let lang = lang.split([',', ' ']).next().unwrap_or("").trim();
                        if lang.is_empty() {
                            None
                        } else {
                            Some(lang.to_string())
                        }
                    }
                    CodeBlockKind::Indented => None,
                };
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code = false;
                let code = std::mem::take(&mut code_text);
                let code = code.strip_suffix('\n').unwrap_or(&code).to_string();
                nodes.push(Node::Code(CodeBlock::new(code_lang.take(), code)));
            }

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if quote_depth > 0 {
                    quote_text.push('\n');
                } else {
                    flush_paragraph!();
                }
            }

            Event::Start(Tag::BlockQuote) => {
                flush_paragraph!();
                quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote) => {
                quote_depth = quote_depth.saturating_sub(1);
                if quote_depth == 0 {
                    let text = std::mem::take(&mut quote_text);
                    nodes.push(Node::Quote(text.trim_end().to_string()));
                }
            }

            Event::Start(Tag::List(first_number)) => {
                flush_paragraph!();
                list_stack.push((first_number.is_some(), first_number.unwrap_or(1)));
            }
            Event::End(TagEnd::List(_)) => {
                list_stack.pop();
            }
            Event::Start(Tag::Item) => {
                let depth = list_stack.len().saturating_sub(1);
                let marker = match list_stack.last_mut() {
                    Some((true, number)) => {
                        let m = format!("{number}. ");
                        *number += 1;
                        m
                    }
                    _ => "- ".to_string(),
                };
                push_text!(&format!("{}{marker}", "  ".repeat(depth)));
            }
            Event::End(TagEnd::Item) => {
                if quote_depth > 0 {
                    quote_text.push('\n');
                } else {
                    flush_paragraph!();
                }
            }

            Event::Rule => {
                flush_paragraph!();
                nodes.push(Node::Rule);
            }

            // Inline markup flattens to text; delimiters are dropped except
            // inline code, which keeps its backticks for readability
            Event::Code(code) => push_text!(&format!("`{code}`")),
            Event::Text(text) => push_text!(&text),
            Event::SoftBreak | Event::HardBreak => push_text!("\n"),
            Event::Start(Tag::Emphasis | Tag::Strong | Tag::Strikethrough) => {}
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough) => {}

            Event::Start(Tag::Link { dest_url, .. }) => {
                link_url = Some(dest_url.to_string());
                link_text.clear();
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_url.take() {
                    let text = std::mem::take(&mut link_text);
                    let flat = if text == url || text.is_empty() {
                        url
                    } else {
                        format!("{text} ({url})")
                    };
                    push_text!(&flat);
                }
            }

            Event::Start(Tag::Table(_)) | Event::Start(Tag::TableHead) => {}
            Event::Start(Tag::TableRow) => table_row.clear(),
            Event::Start(Tag::TableCell) => {
                in_table_cell = true;
                table_cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                in_table_cell = false;
                table_row.push(std::mem::take(&mut table_cell));
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                if !table_row.is_empty() {
                    nodes.push(Node::Paragraph(table_row.join(" | ")));
                    table_row.clear();
                }
            }
            Event::End(TagEnd::Table) => {}

            // Raw embedded HTML: policy decides pass-through vs escape
            Event::Html(html) => match html_policy {
                HtmlPolicy::Sanitize => {
                    flush_paragraph!();
                    let clean = sanitize_html(&html);
                    if !clean.trim().is_empty() {
                        nodes.push(Node::Raw(clean.trim_end().to_string()));
                    }
                }
                HtmlPolicy::Escape => push_text!(&escape_html(&html)),
            },
            Event::InlineHtml(html) => match html_policy {
                HtmlPolicy::Sanitize => push_text!(&sanitize_html(&html)),
                HtmlPolicy::Escape => push_text!(&escape_html(&html)),
            },

            _ => {}
        }
    }

    flush_paragraph!();
    nodes
}

/// Strip the obviously dangerous constructs from raw markup.
///
/// Not a full HTML parser: removes script/style elements, inline event
/// handlers, and javascript: URLs, which is what the pane's collaborator
/// contract requires from "sanitized markup".
pub fn sanitize_html(html: &str) -> String {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static STYLE: OnceLock<Regex> = OnceLock::new();
    static HANDLERS: OnceLock<Regex> = OnceLock::new();
    static JS_URL: OnceLock<Regex> = OnceLock::new();

    let script = SCRIPT.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap()
    });
    let style = STYLE.get_or_init(|| {
        Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap()
    });
    let handlers = HANDLERS.get_or_init(|| {
        Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
    });
    let js_url = JS_URL.get_or_init(|| Regex::new(r"(?i)javascript\s*:").unwrap());

    let out = script.replace_all(html, "");
    let out = style.replace_all(&out, "");
    let out = handlers.replace_all(&out, "");
    js_url.replace_all(&out, "").into_owned()
}

/// Escape markup so it displays as literal text
pub fn escape_html(html: &str) -> String {
    html.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
