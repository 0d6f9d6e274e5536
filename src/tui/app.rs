//! Screen state and key handling for the terminal frontend.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use duel_board::{CELL_COUNT, Position, Step, Symbol, WinLine};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::controller::{ConnectionStatus, GameOutcome, GameView, Mode, Status, UiRequest, View};
use crate::error::ErrorKind;
use crate::room::{ROOM_CODE_LEN, RoomCode};

/// Longest join input accepted; longer than a code so typos reach validation.
const JOIN_INPUT_MAX: usize = ROOM_CODE_LEN * 2;

/// Main menu entries, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum MenuItem {
    /// Local two-player game.
    #[strum(to_string = "2 Players (same keyboard)")]
    TwoPlayer,
    /// Game against the CPU.
    #[strum(to_string = "Play vs CPU")]
    VsCpu,
    /// Host an online game.
    #[strum(to_string = "Host Game")]
    Host,
    /// Join an online game.
    #[strum(to_string = "Join Game")]
    Join,
    /// Leave.
    #[strum(to_string = "Quit")]
    Quit,
}

/// Result of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Send to the controller.
    Request(UiRequest),
    /// Local change only; redraw.
    Redraw,
    /// Key has no meaning here.
    Ignored,
    /// Leave the program.
    Quit,
}

/// Everything the frontend draws.
#[derive(Debug, Clone)]
pub struct App {
    screen: View,
    board: [Option<Symbol>; CELL_COUNT],
    winning_line: Option<WinLine>,
    cursor: Position,
    status: Option<Status>,
    score: (u32, u32),
    room_code: Option<RoomCode>,
    connection: Option<ConnectionStatus>,
    notice: Option<String>,
    join_input: String,
    menu_index: usize,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Starts on the main menu.
    pub fn new() -> Self {
        Self {
            screen: View::Menu,
            board: [None; CELL_COUNT],
            winning_line: None,
            cursor: Position::default(),
            status: None,
            score: (0, 0),
            room_code: None,
            connection: None,
            notice: None,
            join_input: String::new(),
            menu_index: 0,
        }
    }

    /// Visible screen.
    pub fn screen(&self) -> View {
        self.screen
    }

    /// Symbol in each cell.
    pub fn board(&self) -> &[Option<Symbol>; CELL_COUNT] {
        &self.board
    }

    /// Whether `index` belongs to the highlighted winning line.
    pub fn is_winning_cell(&self, index: usize) -> bool {
        self.winning_line.is_some_and(|line| line.contains(index))
    }

    /// Board cursor.
    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Status line, once a game started.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Room code while hosting.
    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room_code.as_ref()
    }

    /// Connection progress.
    pub fn connection(&self) -> Option<ConnectionStatus> {
        self.connection
    }

    /// Pending error or disconnect notice.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Text typed into the join view.
    pub fn join_input(&self) -> &str {
        &self.join_input
    }

    /// Highlighted menu entry.
    pub fn selected_menu_item(&self) -> MenuItem {
        MenuItem::iter().nth(self.menu_index).unwrap_or(MenuItem::Quit)
    }

    /// Score labels with counts, e.g. `("X (You)", 2)`.
    pub fn score_lines(&self) -> [(String, u32); 2] {
        let label = |symbol: Symbol| match self.screen {
            View::Game {
                mode: Mode::LocalVsCpu,
                ..
            } => match symbol {
                Symbol::X => "X (You)".to_string(),
                Symbol::O => "O (CPU)".to_string(),
            },
            View::Game {
                my_symbol: Some(mine),
                ..
            } if mine == symbol => format!("{} (You)", symbol),
            View::Game {
                my_symbol: Some(_),
                ..
            } => format!("{} (Opponent)", symbol),
            _ => symbol.to_string(),
        };
        [
            (label(Symbol::X), self.score.0),
            (label(Symbol::O), self.score.1),
        ]
    }

    /// Maps a key press to what it means on the visible screen.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }
        let had_notice = self.notice.take().is_some();
        let outcome = match self.screen {
            View::Menu => self.menu_key(key.code),
            View::Hosting => match key.code {
                KeyCode::Esc | KeyCode::Char('m') => KeyOutcome::Request(UiRequest::ReturnToMenu),
                KeyCode::Char('q') => KeyOutcome::Quit,
                _ => KeyOutcome::Ignored,
            },
            View::Joining => self.join_key(key.code),
            View::Game { .. } => self.game_key(key.code),
        };
        debug!(code = ?key.code, ?outcome, "Key handled");
        match outcome {
            KeyOutcome::Ignored if had_notice => KeyOutcome::Redraw,
            other => other,
        }
    }

    fn menu_key(&mut self, code: KeyCode) -> KeyOutcome {
        let items = MenuItem::iter().count();
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_index = (self.menu_index + items - 1) % items;
                KeyOutcome::Redraw
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.menu_index = (self.menu_index + 1) % items;
                KeyOutcome::Redraw
            }
            KeyCode::Enter => match self.selected_menu_item() {
                MenuItem::TwoPlayer => KeyOutcome::Request(UiRequest::Start(Mode::LocalTwoPlayer)),
                MenuItem::VsCpu => KeyOutcome::Request(UiRequest::Start(Mode::LocalVsCpu)),
                MenuItem::Host => KeyOutcome::Request(UiRequest::Host),
                MenuItem::Join => KeyOutcome::Request(UiRequest::OpenJoin),
                MenuItem::Quit => KeyOutcome::Quit,
            },
            KeyCode::Char('q') => KeyOutcome::Quit,
            _ => KeyOutcome::Ignored,
        }
    }

    fn join_key(&mut self, code: KeyCode) -> KeyOutcome {
        match code {
            KeyCode::Esc => KeyOutcome::Request(UiRequest::ReturnToMenu),
            KeyCode::Enter => KeyOutcome::Request(UiRequest::Join(self.join_input.clone())),
            KeyCode::Backspace => {
                self.join_input.pop();
                KeyOutcome::Redraw
            }
            KeyCode::Char(c) if !c.is_control() && self.join_input.len() < JOIN_INPUT_MAX => {
                self.join_input.push(c);
                KeyOutcome::Redraw
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn game_key(&mut self, code: KeyCode) -> KeyOutcome {
        let step = match code {
            KeyCode::Up => Some(Step::Up),
            KeyCode::Down => Some(Step::Down),
            KeyCode::Left => Some(Step::Left),
            KeyCode::Right => Some(Step::Right),
            _ => None,
        };
        if let Some(step) = step {
            self.cursor = self.cursor.step(step);
            return KeyOutcome::Redraw;
        }
        match code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                KeyOutcome::Request(UiRequest::LocalMove(self.cursor.to_index()))
            }
            KeyCode::Char(c) if c.is_ascii_digit() => match Position::from_digit(c) {
                Some(position) => {
                    self.cursor = position;
                    KeyOutcome::Request(UiRequest::LocalMove(position.to_index()))
                }
                None => KeyOutcome::Ignored,
            },
            KeyCode::Char('r') => KeyOutcome::Request(UiRequest::Restart),
            KeyCode::Esc | KeyCode::Char('m') => KeyOutcome::Request(UiRequest::ReturnToMenu),
            KeyCode::Char('q') => KeyOutcome::Quit,
            _ => KeyOutcome::Ignored,
        }
    }
}

impl GameView for App {
    fn on_cell_updated(&mut self, index: usize, symbol: Symbol) {
        if let Some(cell) = self.board.get_mut(index) {
            *cell = Some(symbol);
        }
    }

    fn on_board_cleared(&mut self) {
        self.board = [None; CELL_COUNT];
        self.winning_line = None;
    }

    fn on_status_changed(&mut self, status: Status) {
        self.status = Some(status);
    }

    fn on_score_changed(&mut self, wins_x: u32, wins_o: u32) {
        self.score = (wins_x, wins_o);
    }

    fn on_game_ended(&mut self, outcome: GameOutcome) {
        self.winning_line = match outcome {
            GameOutcome::Won { line, .. } => Some(line),
            GameOutcome::Draw => None,
        };
    }

    fn on_room_ready(&mut self, code: &RoomCode) {
        self.room_code = Some(code.clone());
    }

    fn on_connection_status(&mut self, status: ConnectionStatus) {
        self.connection = Some(status);
    }

    fn on_disconnected(&mut self) {
        self.notice = Some(ErrorKind::PeerDisconnected.user_message(""));
    }

    fn on_error(&mut self, _kind: ErrorKind, message: &str) {
        self.notice = Some(message.to_string());
    }

    fn on_view_changed(&mut self, view: View) {
        match view {
            View::Menu => {
                self.room_code = None;
                self.connection = None;
                self.status = None;
            }
            View::Hosting => self.room_code = None,
            View::Joining => {
                self.join_input.clear();
                self.connection = None;
            }
            View::Game { .. } => {
                self.connection = None;
                self.cursor = Position::default();
            }
        }
        self.screen = view;
    }
}
