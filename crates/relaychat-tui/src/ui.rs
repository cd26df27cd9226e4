//! Rendering functions for the TUI layout.
//!
//! Three vertically stacked areas:
//!
//! 1. **Header** (1 line) -- app name, backend, status and key hints.
//! 2. **Messages** (fills remaining space) -- scrollable conversation.
//! 3. **Input** (3 lines) -- bordered text input; the title shows a staged file.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use relaychat_core::{MessageKind, MessageView};

use crate::app::TuiApp;

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // messages
            Constraint::Length(3), // input
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_messages(frame, app, chunks[1]);
    draw_input(frame, app, chunks[2]);
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

fn draw_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let status = if app.is_waiting() {
        Span::styled(" Typing... ", Style::default().fg(Color::Yellow))
    } else if app.is_busy() {
        Span::styled(" Replying ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" Ready ", Style::default().fg(Color::Green))
    };

    let header = Line::from(vec![
        Span::styled(
            concat!(" relaychat v", env!("CARGO_PKG_VERSION"), " "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::styled(app.backend_label(), Style::default().fg(Color::White)),
        Span::raw(" |"),
        status,
        Span::raw("| Ctrl+S stop | Esc quit "),
    ]);

    frame.render_widget(
        Paragraph::new(header).style(Style::default().bg(Color::DarkGray)),
        area,
    );
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Prefix and style for a message kind.
fn style_for(kind: MessageKind) -> (&'static str, Style) {
    match kind {
        MessageKind::User => ("[You] ", Style::default().fg(Color::Cyan)),
        MessageKind::Model => ("[AI]  ", Style::default().fg(Color::Green)),
        MessageKind::Error => ("[!] ", Style::default().fg(Color::Red)),
        MessageKind::Notice => (
            "[-] ",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::DIM),
        ),
    }
}

/// Lines for one message, attachment label first.
fn message_lines(entry: &MessageView) -> Vec<Line<'static>> {
    let (prefix, mut style) = style_for(entry.kind);
    if entry.loading {
        style = style.add_modifier(Modifier::ITALIC);
    }
    let indent = " ".repeat(prefix.len());

    let mut body: Vec<String> = Vec::new();
    if let Some(label) = &entry.attachment {
        body.push(label.clone());
    }
    if !entry.text.is_empty() || body.is_empty() {
        body.extend(entry.text.split('\n').map(str::to_owned));
    }

    body.into_iter()
        .enumerate()
        .map(|(i, text)| {
            let lead = if i == 0 {
                Span::styled(prefix, style)
            } else {
                Span::raw(indent.clone())
            };
            Line::from(vec![lead, Span::styled(text, style)])
        })
        .collect()
}

fn draw_messages(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let mut lines: Vec<Line<'_>> = Vec::new();
    for entry in app.entries() {
        lines.extend(message_lines(entry));
        lines.push(Line::from(""));
    }

    // Show the bottom by default; the offset scrolls back up.
    let total_lines = lines.len() as u16;
    let visible_height = area.height.saturating_sub(2);
    let max_scroll = total_lines.saturating_sub(visible_height);
    let effective_scroll = max_scroll.saturating_sub(app.scroll_offset());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Chat ")
        .border_style(Style::default().fg(Color::DarkGray));

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((effective_scroll, 0)),
        area,
    );
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn input_title(app: &TuiApp) -> String {
    match (app.is_busy(), app.attachment_label()) {
        (true, _) => " Input (waiting...) ".to_owned(),
        (false, Some(label)) => format!(" Input {label} "),
        (false, None) => " Input ".to_owned(),
    }
}

fn draw_input(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let border = if app.is_busy() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(input_title(app))
        .border_style(border);

    frame.render_widget(
        Paragraph::new(app.input())
            .block(block)
            .style(Style::default().fg(Color::White)),
        area,
    );

    if !app.is_busy() {
        // +1 for the border on each axis.
        let cursor_x = area.x + 1 + app.cursor_pos() as u16;
        frame.set_cursor_position(Position::new(cursor_x, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_label_precedes_text() {
        let view = MessageView {
            attachment: Some("[image: cat.png]".into()),
            ..MessageView::new(MessageKind::User, "what is this?")
        };
        let lines = message_lines(&view);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[1].content, "[image: cat.png]");
        assert_eq!(lines[1].spans[1].content, "what is this?");
    }

    #[test]
    fn attachment_only_message_has_one_line() {
        let view = MessageView {
            attachment: Some("[file: a.pdf]".into()),
            ..MessageView::new(MessageKind::User, "")
        };
        assert_eq!(message_lines(&view).len(), 1);
    }

    #[test]
    fn multiline_text_is_indented() {
        let lines = message_lines(&MessageView::new(MessageKind::Model, "a\nb"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].content, "      ");
    }

    #[test]
    fn every_kind_has_a_prefix() {
        for kind in [
            MessageKind::User,
            MessageKind::Model,
            MessageKind::Error,
            MessageKind::Notice,
        ] {
            assert!(!style_for(kind).0.is_empty());
        }
    }
}
