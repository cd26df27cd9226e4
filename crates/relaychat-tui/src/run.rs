//! Main event loop for the terminal UI.
//!
//! Sets up the terminal in raw mode with an alternate screen, runs the
//! draw-and-poll loop, and restores the terminal on exit.

use std::io;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use relaychat_core::Dispatcher;
use relaychat_store::{StoreError, TranscriptStore};

use crate::app::{AppAction, TuiApp, TuiSettings};
use crate::error::Result;
use crate::ui;

/// Run the terminal UI until the user quits.
///
/// With a `transcript`, the saved conversation is restored first and kept
/// up to date.  A saved record that cannot be decoded is skipped with a
/// notice rather than aborting startup.
///
/// # Errors
///
/// Returns a [`TuiError`](crate::error::TuiError) if terminal setup, drawing,
/// event handling, or reading the database fails.
pub async fn run_tui(
    dispatcher: Dispatcher,
    settings: TuiSettings,
    transcript: Option<TranscriptStore>,
) -> Result<()> {
    let mut app = TuiApp::new(dispatcher, settings);
    if let Some(store) = transcript {
        match store.load().await {
            Ok(turns) => {
                tracing::info!(turns = turns.len(), "restored saved conversation");
                app = app.with_history(turns);
            }
            Err(StoreError::Json(e)) => {
                tracing::warn!(error = %e, "saved conversation is unreadable");
                app.push_notice("The saved conversation could not be read and was skipped.");
            }
            Err(e) => return Err(e.into()),
        }
        app = app.with_transcript(store);
    }

    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    tracing::info!(backend = %app.backend_label(), "TUI event loop started");

    let result = event_loop(&mut terminal, &mut app).await;
    app.flush_transcript().await;

    // Restore the terminal regardless of whether the loop succeeded.
    crossterm::terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("TUI event loop ended");

    result
}

/// The inner event loop, separated so terminal cleanup always runs.
async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Short poll so replies and reveal frames are picked up promptly.
        if event::poll(std::time::Duration::from_millis(20))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && app.handle_key(key) == AppAction::Quit
        {
            break;
        }

        app.check_responses();
        // Let spawned request and reveal tasks make progress.
        tokio::task::yield_now().await;
    }

    Ok(())
}
