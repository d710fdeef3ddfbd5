//! Frame composition for the chat view.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use tui_textarea::TextArea;

use crate::core::app::App;
use crate::core::message::Role;
use crate::core::session::ViewState;

pub fn draw(frame: &mut Frame, app: &App, textarea: &TextArea) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_title(frame, app, chunks[0]);
    draw_transcript(frame, app, chunks[1]);
    draw_status(frame, app, chunks[2]);
    if app.quota_exhausted() {
        draw_sign_in_prompt(frame, chunks[3]);
    } else {
        frame.render_widget(textarea, chunks[3]);
    }
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::styled("patter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" — "),
        Span::styled(
            app.session.base_url.clone(),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn draw_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for message in &app.messages {
        match message.role {
            Role::User => push_labeled(&mut lines, "You", Color::Cyan, &message.content),
            Role::Assistant => push_labeled(&mut lines, "Assistant", Color::Green, &message.content),
            Role::AppInfo => {
                for text in message.content.lines() {
                    lines.push(Line::from(Span::styled(
                        text.to_string(),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    )));
                }
            }
        }
        lines.push(Line::default());
    }

    if let Some(shown) = app.pending_reveal() {
        let mut content = shown.to_string();
        if app.is_revealing() {
            content.push('▌');
        }
        push_labeled(&mut lines, "Assistant", Color::Green, &content);
    }

    // Pin the tail of the conversation to the bottom of the pane.
    let scroll = (lines.len() as u16).saturating_sub(area.height);
    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(transcript, area);
}

fn push_labeled(lines: &mut Vec<Line>, label: &str, color: Color, content: &str) {
    let mut first = true;
    for text in content.lines() {
        if first {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{label}: "),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(text.to_string()),
            ]));
            first = false;
        } else {
            lines.push(Line::from(Span::raw(text.to_string())));
        }
    }
    if first {
        // Empty content still gets its label line.
        lines.push(Line::from(Span::styled(
            format!("{label}: "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.is_revealing() {
        "Streaming… Esc reveals everything at once".to_string()
    } else {
        match app.view_state {
            ViewState::Onboarding => "Ask anything to get started".to_string(),
            ViewState::Ready => "Press Enter to send".to_string(),
            ViewState::Chatting => match app.remaining_sends() {
                Some(remaining) => format!("{remaining} free messages left this session"),
                None => String::new(),
            },
        }
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}

fn draw_sign_in_prompt(frame: &mut Frame, area: Rect) {
    let prompt = Paragraph::new(
        "Free messages used up — restart with --token <token> to keep chatting.",
    )
    .style(Style::default().fg(Color::Yellow))
    .block(Block::default().borders(Borders::ALL).title("Sign in"));
    frame.render_widget(prompt, area);
}
