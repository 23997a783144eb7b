use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::audio::TransportState;
use crate::shared::DisplayState;

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // status bar
            Constraint::Min(8),    // code editor
            Constraint::Length(4), // key help
        ])
        .split(area);

    draw_status(frame, sections[0], state);
    draw_code(frame, sections[1], state);
    draw_help(frame, sections[2], state);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let transport = match state.transport {
        TransportState::Started => Span::styled("PLAYING", Style::default().fg(Color::Green)),
        TransportState::Paused => Span::styled("PAUSED", Style::default().fg(Color::Yellow)),
        TransportState::Stopped => Span::styled("STOPPED", Style::default().fg(Color::DarkGray)),
    };

    let mut spans = vec![
        transport,
        Span::raw("  mode:"),
        Span::raw(state.mode.label()),
        Span::raw("  lang:"),
        Span::raw(state.language),
        Span::raw(format!("  complexity:{:.2}", state.complexity)),
        Span::raw(format!("  events:{}", state.event_count)),
        Span::raw("  break:"),
        Span::raw(state.line_break.label()),
    ];
    if state.live_active {
        spans.push(Span::styled("  LIVE", Style::default().fg(Color::Cyan)));
    }
    if state.capturing {
        spans.push(Span::styled("  REC", Style::default().fg(Color::Red)));
    }

    let status = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("codetone"));
    frame.render_widget(status, area);
}

// draw the code buffer, highlighting the character whose event is sounding
fn draw_code(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let highlight = if state.current_index >= 0 {
        Some(state.current_index as usize)
    } else {
        None
    };

    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<Span> = Vec::new();
    for (i, c) in state.code.chars().enumerate() {
        if c == '\n' {
            lines.push(Line::from(std::mem::take(&mut current)));
            continue;
        }
        let span = if highlight == Some(i) {
            Span::styled(
                c.to_string(),
                Style::default()
                    .bg(Color::Green)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw(c.to_string())
        };
        current.push(span);
    }
    lines.push(Line::from(current));

    let editor = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("code"));
    frame.render_widget(editor, area);
}

fn draw_help(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let keys = Line::from(vec![Span::raw(
        "^G gen  ^B chars  ^P play  ^O pause  ^T stop  ^R reset  \
         ^W rec  ^L live  ^N break  ^S save  ^E export  Esc quit",
    )]);
    let message = Line::from(Span::styled(
        state.message.clone(),
        Style::default().fg(Color::Yellow),
    ));

    let help = Paragraph::new(vec![keys, message])
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, area);
}
