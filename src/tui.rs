// Demo terminal UI
//
// Streams the scripted demo conversation into a StreamPane and shows
// the live document in a scrollable viewport. The viewport implements
// ScrollRegion, so the pane's scroll tracker drives it exactly the way
// it would drive a host GUI's scroll container: auto-follow while
// streaming, hands off the moment the user scrolls up, hands back when
// they return to the bottom.
//
// Keys: q / Esc quit, Up/Down scroll, c copies the first code block.

use crate::config::Config;
use crate::demo;
use crate::document::Node;
use crate::message::{PaneRouter, RawMessage};
use crate::pane::StreamPane;
use crate::scroll::{ScrollBehavior, ScrollRegion};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

const PANE_ID: &str = "demo";

/// Scroll container for the demo pane.
///
/// Offsets are in display rows. Terminal scrolling has no animation, so
/// Smooth degrades to the same jump as Instant.
#[derive(Debug)]
pub struct PaneViewport {
    offset: usize,
    viewport: usize,
    content: usize,
    listener_attached: bool,
}

impl PaneViewport {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            offset: 0,
            viewport: 0,
            content: 0,
            listener_attached: false,
        }))
    }

    /// Called each frame with the current content and viewport sizes
    pub fn set_extents(&mut self, content: usize, viewport: usize) {
        self.content = content;
        self.viewport = viewport;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.offset = (self.offset + 1).min(self.max_offset());
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn max_offset(&self) -> usize {
        self.content.saturating_sub(self.viewport)
    }
}

impl ScrollRegion for PaneViewport {
    fn id(&self) -> u64 {
        1
    }

    fn viewport_extent(&self) -> usize {
        self.viewport
    }

    fn scroll_extent(&self) -> usize {
        self.content
    }

    fn position(&self) -> usize {
        self.offset
    }

    fn scroll_to_bottom(&mut self, _behavior: ScrollBehavior) {
        self.offset = self.max_offset();
    }

    fn attach_listener(&mut self) {
        self.listener_attached = true;
    }

    fn detach_listener(&mut self) {
        self.listener_attached = false;
    }
}

/// Flatten the pane's document into styled display lines
pub fn document_lines(pane: &StreamPane, width: usize, now: Instant) -> Vec<Line<'static>> {
    let width = width.max(10);
    let mut lines = Vec::new();

    for node in &pane.document().nodes {
        match node {
            Node::Heading { level, text } => {
                let style = Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD);
                let prefix = "#".repeat(usize::from(*level));
                for wrapped in wrap_text(&format!("{prefix} {text}"), width) {
                    lines.push(Line::from(Span::styled(wrapped, style)));
                }
                lines.push(Line::default());
            }
            Node::Paragraph(text) => {
                for raw in text.lines() {
                    for wrapped in wrap_text(raw, width) {
                        lines.push(Line::from(wrapped));
                    }
                }
                lines.push(Line::default());
            }
            Node::Code(block) => {
                let region = block.region_id();
                let label = match (pane.is_copy_confirmed(&region, now), &block.lang) {
                    (true, _) => "copied!".to_string(),
                    (false, Some(lang)) => format!("{lang} · c to copy"),
                    (false, None) => "c to copy".to_string(),
                };
                lines.push(Line::from(Span::styled(
                    format!("┌─ {label}"),
                    Style::default().fg(Color::DarkGray),
                )));
                let body = Style::default().fg(Color::Green);
                let rendered;
                let display: &[String] = match &block.rendered {
                    Some(lines) => lines,
                    None => {
                        // Highlighter failed for this block: degrade to raw code
                        rendered = block.code.lines().map(String::from).collect::<Vec<_>>();
                        &rendered
                    }
                };
                for code_line in display {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", Style::default().fg(Color::DarkGray)),
                        Span::styled(code_line.clone(), body),
                    ]));
                }
                lines.push(Line::from(Span::styled(
                    "└─".to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::default());
            }
            Node::Quote(text) => {
                for raw in text.lines() {
                    for wrapped in wrap_text(raw, width.saturating_sub(2)) {
                        lines.push(Line::from(vec![
                            Span::styled("▌ ", Style::default().fg(Color::Yellow)),
                            Span::raw(wrapped),
                        ]));
                    }
                }
                lines.push(Line::default());
            }
            Node::Rule => {
                lines.push(Line::from(Span::styled(
                    "─".repeat(width),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::default());
            }
            Node::Raw(markup) => {
                for raw in markup.lines() {
                    for wrapped in wrap_text(raw, width) {
                        lines.push(Line::from(Span::styled(
                            wrapped,
                            Style::default().fg(Color::Magenta),
                        )));
                    }
                }
                lines.push(Line::default());
            }
            Node::Indicator => {
                lines.push(Line::from(Span::styled(
                    "▍",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::SLOW_BLINK),
                )));
            }
        }
    }

    // Drop the trailing spacer so the bottom hugs the indicator
    if matches!(lines.last(), Some(line) if line.spans.is_empty()) {
        lines.pop();
    }
    lines
}

/// Greedy word wrap honoring display width (emojis, CJK)
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if text.width() <= width {
        return vec![text.to_string()];
    }
    let mut out = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let need = if line.is_empty() {
            word.width()
        } else {
            line.width() + 1 + word.width()
        };
        if need > width && !line.is_empty() {
            out.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        // A single overlong word is split hard at the width
        if word.width() > width {
            let mut piece = String::new();
            for ch in word.chars() {
                if piece.width() + 1 > width {
                    out.push(std::mem::take(&mut piece));
                }
                piece.push(ch);
            }
            line.push_str(&piece);
        } else {
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn draw(f: &mut Frame, pane: &StreamPane, viewport: &Rc<RefCell<PaneViewport>>, now: Instant) {
    let area: Rect = f.area();
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    let lines = document_lines(pane, inner_width, now);
    viewport
        .borrow_mut()
        .set_extents(lines.len(), inner_height);
    let offset = viewport.borrow().offset();

    let mut title = if pane.streaming() {
        " streampane · streaming ".to_string()
    } else {
        " streampane ".to_string()
    };
    if pane.scrolled_away() {
        title.push_str("[scroll] ");
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
        .scroll((offset as u16, 0));
    f.render_widget(paragraph, area);
}

/// Run the demo TUI until the user quits
pub fn run(config: &Config) -> Result<()> {
    let viewport = PaneViewport::new();

    let mut pane = StreamPane::new(PANE_ID, &config.pane);
    pane.set_scroll_ancestors(vec![viewport.clone()]);
    let mut router = PaneRouter::new();
    router.register(pane);

    let script = demo::script();
    let mut next_chunk = 0usize;
    // Short lead-in so the first frame renders before content arrives
    let mut next_send = Instant::now() + Duration::from_millis(500);

    router.dispatch(
        &RawMessage::new(PANE_ID, "streaming", serde_json::Value::Bool(true)),
        Instant::now(),
    )?;

    let mut terminal = ratatui::init();
    let result = (|| -> Result<()> {
        loop {
            let now = Instant::now();

            // Feed the next scripted chunk when due
            if next_chunk < script.len() && now >= next_send {
                let chunk = script[next_chunk];
                router.dispatch(
                    &RawMessage::new(PANE_ID, "append", serde_json::Value::String(chunk.into())),
                    now,
                )?;
                next_chunk += 1;
                next_send = now + config.chunk_delay;
                if next_chunk == script.len() {
                    router.dispatch(
                        &RawMessage::new(PANE_ID, "streaming", serde_json::Value::Bool(false)),
                        now,
                    )?;
                }
            }

            // Trailing rebinds and copy-confirm expiry
            router.poll(now);

            {
                let pane = router.get(PANE_ID).expect("demo pane registered");
                terminal.draw(|f| draw(f, pane, &viewport, now))?;
            }

            if event::poll(Duration::from_millis(30))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let pane = router.get_mut(PANE_ID).expect("demo pane registered");
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Up => {
                            viewport.borrow_mut().scroll_up();
                            pane.handle_scroll();
                        }
                        KeyCode::Down => {
                            viewport.borrow_mut().scroll_down();
                            pane.handle_scroll();
                        }
                        KeyCode::Char('c') => {
                            let region = pane
                                .document()
                                .code_blocks()
                                .next()
                                .map(|b| b.region_id());
                            if let Some(region) = region {
                                if let Err(e) = pane.copy_code_block(&region, now) {
                                    tracing::warn!(error = %e, "copy failed");
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    })();
    ratatui::restore();

    router.clear();
    result
}
