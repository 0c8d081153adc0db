//! Screen state and rendering

use super::input::InputBuffer;
use crate::runtime::ChatUpdate;
use crate::transcript::{Message, Sender};
use chrono::Local;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const KEY_HINTS: &str = "Enter send | Ctrl+L reset | Esc quit | /health /forget";
const TAB: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// Everything the screen shows
#[derive(Debug)]
pub struct ChatView {
    pub messages: Vec<Message>,
    pub pending: bool,
    pub input: InputBuffer,
    pub notice: Option<Notice>,
    backend: String,
}

impl ChatView {
    pub fn new(backend: &str) -> Self {
        Self {
            messages: Vec::new(),
            pending: false,
            input: InputBuffer::default(),
            notice: None,
            backend: backend.to_string(),
        }
    }

    pub fn apply(&mut self, update: ChatUpdate) {
        match update {
            ChatUpdate::Transcript { messages, pending } => {
                self.messages = messages;
                self.pending = pending;
            }
            ChatUpdate::Notice { text, is_error } => self.set_notice(text, is_error),
        }
    }

    pub fn set_notice(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error,
        });
    }
}

pub fn draw(frame: &mut Frame, view: &ChatView) {
    let [header_area, body_area, notice_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    let header = Line::from(vec![
        Span::from(" JENNIE ").bold().fg(Color::Cyan),
        Span::from(format!(" {} ", view.backend)).dim(),
        Span::from(KEY_HINTS).dim(),
    ]);
    frame.render_widget(Paragraph::new(header), header_area);

    let block = Block::bordered().title(" Conversation ");
    let inner = block.inner(body_area);
    let lines = transcript_lines(
        &view.messages,
        view.pending,
        usize::from(inner.width.saturating_sub(2)),
    );
    // Keep the newest lines in view
    let overflow = lines.len().saturating_sub(usize::from(inner.height));
    let scroll = u16::try_from(overflow).unwrap_or(u16::MAX);
    frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), body_area);

    if let Some(notice) = &view.notice {
        let style = if notice.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };
        frame.render_widget(
            Paragraph::new(Line::styled(format!(" {}", notice.text), style)),
            notice_area,
        );
    }

    let (title, style) = if view.pending {
        (
            " Waiting for JENNIE... ",
            Style::default().add_modifier(Modifier::DIM),
        )
    } else {
        (" Message ", Style::default())
    };
    // One column stays free for the cursor
    let room = usize::from(input_area.width.saturating_sub(3));
    let (visible, visible_width) = if view.input.width() <= room {
        (view.input.as_str().to_string(), view.input.width())
    } else {
        input_tail(view.input.as_str(), room)
    };
    frame.render_widget(
        Paragraph::new(visible)
            .style(style)
            .block(Block::bordered().title(title).border_style(style)),
        input_area,
    );

    if !view.pending {
        let offset = u16::try_from(visible_width).unwrap_or(u16::MAX);
        frame.set_cursor_position((
            input_area.x.saturating_add(1).saturating_add(offset),
            input_area.y + 1,
        ));
    }
}

fn transcript_lines(messages: &[Message], pending: bool, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        let (label, color) = match message.sender {
            Sender::User => ("You", Color::Green),
            Sender::Bot => ("JENNIE", Color::Cyan),
        };
        let time = message
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::from(format!("  {time}")).dim(),
        ]));

        let body_style = if message.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        for row in wrap(&message.text, width) {
            lines.push(Line::styled(format!("  {row}"), body_style));
        }
        lines.push(Line::default());
    }

    if pending {
        lines.push(Line::from(
            Span::from("JENNIE is typing...").italic().dim(),
        ));
    }
    lines
}

/// Cut the tail of `text` that fits in `max_width` columns.
/// Returns the tail and its width.
fn input_tail(text: &str, max_width: usize) -> (String, usize) {
    let mut tail = Vec::new();
    let mut width = 0;
    for c in text.chars().rev() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        tail.push(c);
    }
    (tail.into_iter().rev().collect(), width)
}

/// Split a line into alternating runs of whitespace and non-whitespace
fn runs(line: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut in_space = false;
    for c in line.chars() {
        let space = c.is_whitespace();
        if !current.is_empty() && space != in_space {
            runs.push(std::mem::take(&mut current));
        }
        in_space = space;
        current.push(c);
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Push a row ended by a soft break; the gap at the break is not kept
fn push_soft_row(rows: &mut Vec<String>, row: &mut String) {
    let mut done = std::mem::take(row);
    let kept = done.trim_end().len();
    if kept > 0 {
        done.truncate(kept);
    }
    rows.push(done);
}

/// Greedy word wrap by display width. Whitespace inside a row is kept as
/// sent, so indentation survives; runs longer than a row are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r').replace('\t', TAB);
        let mut row = String::new();
        let mut row_width = 0;

        for run in runs(&line) {
            let run_width = run.width();
            if row_width + run_width <= width {
                row.push_str(&run);
                row_width += run_width;
                continue;
            }

            if row_width > 0 {
                push_soft_row(&mut rows, &mut row);
                row_width = 0;
                if run.starts_with(char::is_whitespace) {
                    continue;
                }
            }

            for c in run.chars() {
                let w = c.width().unwrap_or(0);
                if row_width + w > width && row_width > 0 {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(c);
                row_width += w;
            }
        }
        rows.push(row);
    }
    rows
}
