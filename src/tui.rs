//! Terminal front end
//!
//! Terminal events are read on a blocking thread and forwarded over a channel.
//! The UI loop selects over those and the runtime's update stream, redrawing
//! after each one.

mod input;
mod view;

use crate::runtime::{ChatHandle, ChatUpdate, RunningChat};
use crate::state_machine::Event;
use crossterm::event::Event as TermEvent;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use input::Action;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use view::ChatView;

type Term = Terminal<CrosstermBackend<Stdout>>;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Restores the terminal when dropped, including on early return
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<(Self, Term)> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let guard = Self;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok((guard, terminal))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// Spawn the blocking reader thread. It exits on read error or once the
/// receiver is gone (checked on the next event).
fn spawn_terminal_reader() -> mpsc::Receiver<io::Result<TermEvent>> {
    let (tx, rx) = mpsc::channel(64);
    std::thread::spawn(move || loop {
        let event = crossterm::event::read();
        let failed = event.is_err();
        if tx.blocking_send(event).is_err() || failed {
            break;
        }
    });
    rx
}

/// Run the UI until the user quits or the runtime stops
pub async fn run(chat: RunningChat, backend: &str) -> io::Result<()> {
    let RunningChat {
        handle,
        updates,
        task,
    } = chat;

    let result = {
        let (_guard, mut terminal) = TerminalGuard::enter()?;
        event_loop(&mut terminal, &handle, updates, backend).await
    };

    handle.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
        tracing::warn!("Runtime did not stop in time");
    }

    tracing::info!("UI closed");
    result
}

async fn event_loop(
    terminal: &mut Term,
    handle: &ChatHandle,
    mut updates: broadcast::Receiver<ChatUpdate>,
    backend: &str,
) -> io::Result<()> {
    let mut term_events = spawn_terminal_reader();
    let mut view = ChatView::new(backend);

    // Report backend reachability up front
    handle.send(Event::CheckHealth).await;

    loop {
        terminal.draw(|frame| view::draw(frame, &view))?;

        tokio::select! {
            event = term_events.recv() => {
                match event {
                    Some(Ok(TermEvent::Key(key))) => {
                        let action = view.input.handle_key(key, view.pending);
                        if !dispatch(action, handle, &mut view).await {
                            return Ok(());
                        }
                    }
                    // Resize and the rest just trigger a redraw
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => return Ok(()),
                }
            }

            update = updates.recv() => {
                match update {
                    Ok(update) => view.apply(update),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "UI lagged behind runtime updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

/// Act on a key action. Returns false when the UI should exit.
async fn dispatch(action: Action, handle: &ChatHandle, view: &mut ChatView) -> bool {
    let event = match action {
        Action::None => return true,
        Action::Quit => return false,
        Action::Unknown(text) => {
            view.set_notice(text, true);
            return true;
        }
        Action::Submit(input) => {
            // A fresh submission supersedes any stale notice
            view.notice = None;
            Event::submit(input)
        }
        Action::Reset => {
            view.notice = None;
            Event::Reset
        }
        Action::CheckHealth => Event::CheckHealth,
        Action::Forget => Event::ForgetRemoteHistory,
    };
    handle.send(event).await
}
