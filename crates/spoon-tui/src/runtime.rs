//! Async runtime
//!
//! Event loop that owns the terminal. Uses `tokio::select!` over terminal
//! events, render notifications from the sync feed, and results of
//! background sends. The store is re-read in full on every draw.

use std::{
    io::{self, Stdout, stdout},
    sync::Arc,
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use spoon_app::{RenderNotifier, Session, Transport};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    input::KeyInput,
    ui::{self, StatusInfo},
    view::{UiAction, View},
};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O error from terminal or log file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Log subscriber could not be installed.
    #[error("cannot initialise logging: {0}")]
    Logging(String),
}

/// Account shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Fully qualified user ID.
    pub user_id: String,
    /// Homeserver URL.
    pub homeserver: String,
}

/// Terminal event loop over a running [`Session`].
///
/// Entering raw mode and the alternate screen happens in [`Runtime::new`];
/// both are undone when the runtime is dropped.
pub struct Runtime<T: Transport> {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    session: Arc<Session<T>>,
    notifier: RenderNotifier,
    account: Account,
    view: View,
    status_tx: mpsc::UnboundedSender<String>,
    status_rx: mpsc::UnboundedReceiver<String>,
}

impl<T: Transport> Runtime<T> {
    /// Take over the terminal.
    pub fn new(
        session: Arc<Session<T>>,
        notifier: RenderNotifier,
        account: Account,
    ) -> Result<Self, RuntimeError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        let (status_tx, status_rx) = mpsc::unbounded_channel();

        Ok(Self { terminal, session, notifier, account, view: View::new(), status_tx, status_rx })
    }

    /// Run until the user quits or `cancel` fires. Quitting cancels `cancel`.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), RuntimeError> {
        let mut events = EventStream::new();
        let notifier = self.notifier.clone();
        self.render()?;

        let result = loop {
            tokio::select! {
                () = cancel.cancelled() => break Ok(()),

                maybe_event = events.next() => match maybe_event {
                    Some(Ok(event)) => match self.handle_terminal_event(event) {
                        Ok(true) => break Ok(()),
                        Ok(false) => {},
                        Err(e) => break Err(e),
                    },
                    Some(Err(e)) => break Err(RuntimeError::Io(e)),
                    None => break Ok(()),
                },

                () = notifier.notified() => {
                    if let Err(e) = self.render() {
                        break Err(e);
                    }
                },

                Some(status) = self.status_rx.recv() => {
                    self.view.set_status(status);
                    if let Err(e) = self.render() {
                        break Err(e);
                    }
                },
            }
        };

        tracing::info!("terminal UI stopped");
        cancel.cancel();
        result
    }

    /// Handle a terminal event and return whether to quit.
    fn handle_terminal_event(&mut self, event: Event) -> Result<bool, RuntimeError> {
        let actions = match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match convert_key(key) {
                Some(key) => self.view.handle_key(key, self.session.store()),
                None => return Ok(false),
            },
            Event::Resize(..) => vec![UiAction::Render],
            _ => return Ok(false),
        };

        self.process_actions(actions)
    }

    fn process_actions(&mut self, actions: Vec<UiAction>) -> Result<bool, RuntimeError> {
        for action in actions {
            match action {
                UiAction::Render => self.render()?,
                UiAction::Quit => return Ok(true),
                UiAction::Send { room_id, body } => {
                    let session = Arc::clone(&self.session);
                    let status = self.status_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = session.send_message(&room_id, &body).await {
                            tracing::warn!(room_id = %room_id, error = %e, "send failed");
                            let _ = status.send(format!("Send failed: {e}"));
                        }
                    });
                },
            }
        }
        Ok(false)
    }

    fn render(&mut self) -> Result<(), RuntimeError> {
        let info = StatusInfo {
            session: self.session.state(),
            user_id: &self.account.user_id,
            homeserver: &self.account.homeserver,
        };
        let store = self.session.store();
        let view = &self.view;

        self.terminal.draw(|frame| store.read(|state| ui::render(frame, state, view, &info)))?;
        Ok(())
    }
}

impl<T: Transport> Drop for Runtime<T> {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

/// Convert a crossterm key event to `KeyInput`.
fn convert_key(key: KeyEvent) -> Option<KeyInput> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c' | 'C')).then_some(KeyInput::Interrupt);
    }

    match key.code {
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Delete => Some(KeyInput::Delete),
        KeyCode::Tab => Some(KeyInput::Tab),
        KeyCode::Esc => Some(KeyInput::Esc),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Right => Some(KeyInput::Right),
        KeyCode::Up => Some(KeyInput::Up),
        KeyCode::Down => Some(KeyInput::Down),
        KeyCode::Home => Some(KeyInput::Home),
        KeyCode::End => Some(KeyInput::End),
        _ => None,
    }
}
