//! Main chat event loop.
//!
//! One loop iteration draws a frame, drains pending delivery updates,
//! advances the reveal animation, and handles at most one input event. The
//! loop's cadence is the frame clock: every armed reveal engine gets its
//! tick here.

use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tui_textarea::TextArea;

use crate::core::app::{App, SubmitOutcome};
use crate::core::chat_stream::HttpChatTransport;
use crate::core::config::Config;
use crate::core::frame_clock::TickFrameClock;
use crate::core::runner::{TurnRunner, TurnUpdate};
use crate::core::session::{MemorySessionStore, SessionContext};
use crate::core::turn::TurnController;
use crate::ui::renderer;
use crate::utils::logging::LoggingState;

const MAX_FPS: u64 = 60;

type Backend = CrosstermBackend<io::Stdout>;

/// Build the pipeline from configuration and run the interactive session.
pub async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let base_url = config.resolved_base_url();
    let token = config.token.clone();
    let logging = LoggingState::new(config.log_file.clone())?;

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let transport = Arc::new(HttpChatTransport::new(
        client.clone(),
        base_url.clone(),
        token.clone(),
    ));
    let runner = TurnRunner::new(transport, update_tx);
    let controller = TurnController::new(Box::new(TickFrameClock::new()), config.reveal());
    let session = SessionContext::new(client, base_url, token, logging);
    let store = Box::new(MemorySessionStore::new(config.send_limit()));
    let mut app = App::new(session, store, runner, controller);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut textarea = new_input();
    let result = run_loop(&mut terminal, &mut app, &mut textarea, &mut update_rx).await;

    // Leaving the loop supersedes the turn with nothing: cancel the read
    // and tear the engine down before giving the terminal back.
    app.cancel_active_turn();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_loop(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    textarea: &mut TextArea<'static>,
    update_rx: &mut mpsc::UnboundedReceiver<(TurnUpdate, u64)>,
) -> Result<(), Box<dyn Error>> {
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);

    loop {
        terminal.draw(|frame| renderer::draw(frame, app, textarea))?;

        // Drain all delivery updates before the next frame.
        while let Ok((update, turn_id)) = update_rx.try_recv() {
            app.handle_update(update, turn_id);
        }

        app.on_frame(Instant::now());

        if event::poll(Duration::from_millis(10))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(());
                    }
                    KeyCode::Enter => {
                        let text = textarea.lines().join("\n");
                        if app.submit(&text) == SubmitOutcome::Dispatched {
                            *textarea = new_input();
                        }
                    }
                    KeyCode::Esc => {
                        // First Esc catches the display up; a second one
                        // cancels the in-flight turn.
                        if app.has_hidden_text() {
                            app.skip_reveal();
                        } else {
                            app.cancel_active_turn();
                        }
                    }
                    _ => {
                        app.on_input_focus();
                        textarea.input(key);
                    }
                }
            }
        }

        tokio::time::sleep(frame_duration).await;
    }
}

fn new_input() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_placeholder_text("Type your message and press Enter");
    textarea.set_cursor_line_style(Style::default());
    textarea.set_block(Block::default().borders(Borders::ALL).title("Message"));
    textarea
}
