//! Terminal frontend built on ratatui and crossterm.

mod app;
mod ui;

pub use app::{App, KeyOutcome, MenuItem};

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use duel_board::Symbol;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::{ConnectionStatus, GameOutcome, GameView, Status, UiRequest, View};
use crate::error::ErrorKind;
use crate::network::Transport;
use crate::room::RoomCode;
use crate::runtime::{Frontend, Runtime};
use crate::DuelConfig;

/// How often the input thread checks whether the frontend is gone.
const INPUT_POLL: Duration = Duration::from_millis(100);

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Runs the game in the terminal until the player quits.
#[instrument(skip_all)]
pub async fn run_terminal(config: &DuelConfig, transport: Arc<dyn Transport>) -> Result<()> {
    info!("Starting terminal frontend");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let frontend = TerminalFrontend::new(terminal, spawn_input_thread());
    let res = Runtime::new(config, transport, frontend).run().await;

    disable_raw_mode()?;
    match res {
        Ok(mut frontend) => {
            execute!(frontend.terminal.backend_mut(), LeaveAlternateScreen)?;
            frontend.terminal.show_cursor()?;
            Ok(())
        }
        Err(err) => {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            error!(error = ?err, "Runtime error");
            Err(err)
        }
    }
}

/// Reads terminal events on a blocking thread.
fn spawn_input_thread() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to poll terminal");
                    break;
                }
            }
        }
        debug!("Input thread stopped");
    });
    rx
}

/// [`App`] bound to a real terminal.
pub struct TerminalFrontend {
    app: App,
    terminal: CrosstermTerminal,
    input: mpsc::UnboundedReceiver<Event>,
}

impl TerminalFrontend {
    fn new(terminal: CrosstermTerminal, input: mpsc::UnboundedReceiver<Event>) -> Self {
        Self {
            app: App::new(),
            terminal,
            input,
        }
    }

    fn redraw(&mut self) {
        if let Err(e) = self.present() {
            warn!(error = %e, "Redraw failed");
        }
    }
}

#[async_trait]
impl Frontend for TerminalFrontend {
    async fn next_request(&mut self) -> Option<UiRequest> {
        loop {
            let key = match self.input.recv().await? {
                Event::Key(key) if key.kind == KeyEventKind::Press => key,
                Event::Resize(..) => {
                    self.redraw();
                    continue;
                }
                _ => continue,
            };
            match self.app.handle_key(key) {
                KeyOutcome::Request(request) => return Some(request),
                KeyOutcome::Redraw => self.redraw(),
                KeyOutcome::Ignored => {}
                KeyOutcome::Quit => {
                    info!("Player quit");
                    return None;
                }
            }
        }
    }

    fn present(&mut self) -> Result<()> {
        self.terminal.draw(|frame| ui::draw(frame, &self.app))?;
        Ok(())
    }
}

impl GameView for TerminalFrontend {
    fn on_cell_updated(&mut self, index: usize, symbol: Symbol) {
        self.app.on_cell_updated(index, symbol);
    }

    fn on_board_cleared(&mut self) {
        self.app.on_board_cleared();
    }

    fn on_status_changed(&mut self, status: Status) {
        self.app.on_status_changed(status);
    }

    fn on_score_changed(&mut self, wins_x: u32, wins_o: u32) {
        self.app.on_score_changed(wins_x, wins_o);
    }

    fn on_game_ended(&mut self, outcome: GameOutcome) {
        self.app.on_game_ended(outcome);
    }

    fn on_room_ready(&mut self, code: &RoomCode) {
        self.app.on_room_ready(code);
    }

    fn on_connection_status(&mut self, status: ConnectionStatus) {
        self.app.on_connection_status(status);
    }

    fn on_disconnected(&mut self) {
        self.app.on_disconnected();
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        self.app.on_error(kind, message);
    }

    fn on_view_changed(&mut self, view: View) {
        self.app.on_view_changed(view);
    }
}
