//! Game session controller.
//!
//! A pure state machine: every input goes through [`GameSessionController::handle`],
//! which mutates the board and score and returns the [`Effect`]s the runtime
//! must carry out. No I/O happens here, so the whole game can be driven from
//! tests without a transport or a terminal.

mod event;
mod session;
mod view;

use std::time::Duration;

use duel_board::{CpuStrategy, Dice, Evaluation, Symbol};
use tracing::{debug, info, instrument, warn};

pub use event::{ControllerEvent, Effect, UiRequest};
pub use session::{Mode, Session, TurnControl};
pub use view::{ConnectionStatus, GameOutcome, GameView, Status, View, ViewUpdate};

use crate::config::CpuConfig;
use crate::error::ErrorKind;
use crate::network::{ConnectionState, NetworkError, NetworkEvent, NetworkEventKind, Role};
use crate::protocol::PeerMessage;
use crate::room::RoomCode;
use crate::score::ScoreTracker;

/// The CPU always plays O.
pub const CPU_SYMBOL: Symbol = Symbol::O;

/// What the controller knows about the current network session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkInfo {
    generation: u64,
    role: Role,
    state: ConnectionState,
    handshake_done: bool,
}

/// Owns the score, the live [`Session`] and the view of the connection.
#[derive(Debug)]
pub struct GameSessionController<D> {
    score: ScoreTracker,
    session: Option<Session>,
    link: Option<LinkInfo>,
    epoch: u64,
    next_generation: u64,
    cpu: CpuStrategy,
    cpu_delay: Duration,
    dice: D,
    outbox: Vec<Effect>,
}

impl<D: Dice> GameSessionController<D> {
    /// Creates a controller with the given CPU opponent settings.
    pub fn new(cpu: CpuStrategy, cpu_delay: Duration, dice: D) -> Self {
        Self {
            score: ScoreTracker::new(),
            session: None,
            link: None,
            epoch: 0,
            next_generation: 1,
            cpu,
            cpu_delay,
            dice,
            outbox: Vec::new(),
        }
    }

    /// Creates a controller from the `[cpu]` config section.
    pub fn from_config(config: &CpuConfig, dice: D) -> Self {
        let cpu = CpuStrategy::new(CPU_SYMBOL).with_mistake_rate(*config.mistake_rate());
        Self::new(cpu, config.delay(), dice)
    }

    /// Current score.
    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    /// The live game, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Role in the current network session.
    pub fn role(&self) -> Option<Role> {
        self.link.map(|link| link.role)
    }

    /// Last connection state reported by the current network session.
    pub fn connection_state(&self) -> ConnectionState {
        self.link.map_or(ConnectionState::Idle, |link| link.state)
    }

    /// Feeds one event through the state machine.
    #[instrument(skip(self))]
    pub fn handle(&mut self, event: ControllerEvent) -> Vec<Effect> {
        match event {
            ControllerEvent::Ui(request) => self.handle_request(request),
            ControllerEvent::Network(event) => self.handle_network_event(event),
            ControllerEvent::CpuTurn { ticket } => self.cpu_turn(ticket),
        }
        self.take_effects()
    }

    /// Drains the effects produced so far.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    fn handle_request(&mut self, request: UiRequest) {
        match request {
            UiRequest::Start(Mode::Networked) => {
                warn!("Networked games start through the handshake, ignoring request");
            }
            UiRequest::Start(mode) => {
                self.drop_link();
                self.start(mode);
            }
            UiRequest::LocalMove(index) => self.handle_local_move(index),
            UiRequest::Restart => self.restart(false),
            UiRequest::Host => self.request_host(),
            UiRequest::OpenJoin => self.request_open_join(),
            UiRequest::Join(input) => self.request_join(&input),
            UiRequest::ReturnToMenu => self.return_to_menu(),
        }
    }

    fn view(&mut self, update: ViewUpdate) {
        self.outbox.push(update.into());
    }

    fn send(&mut self, message: PeerMessage) {
        self.outbox.push(Effect::Send(message));
    }

    fn publish_score(&mut self) {
        self.view(ViewUpdate::ScoreChanged {
            wins_x: *self.score.wins_x(),
            wins_o: *self.score.wins_o(),
        });
    }

    fn publish_status(&mut self) {
        if let Some(status) = self.session.as_ref().map(Session::status) {
            self.view(ViewUpdate::StatusChanged(status));
        }
    }

    /// Starts a fresh game. Networked mode requires a connection and takes
    /// its symbol from the connection's role.
    #[instrument(skip(self))]
    pub fn start(&mut self, mode: Mode) {
        let control = match mode {
            Mode::LocalTwoPlayer => TurnControl::Alternating { cpu: None },
            Mode::LocalVsCpu => TurnControl::Alternating {
                cpu: Some(self.cpu.symbol()),
            },
            Mode::Networked => {
                let Some(link) = self.link else {
                    warn!("Cannot start a networked game without a connection");
                    return;
                };
                let my_symbol = link.role.symbol();
                TurnControl::Networked {
                    my_symbol,
                    is_my_turn: my_symbol == Symbol::X,
                }
            }
        };
        let session = Session::new(control);
        info!(%mode, "Game started");
        self.view(ViewUpdate::ViewChanged(View::Game {
            mode,
            my_symbol: session.my_symbol(),
        }));
        self.session = Some(session);
        self.publish_score();
        self.restart(true);
    }

    /// Plays a cell for this device. Silently ignored when there is no
    /// active game, the cell is taken or it is not this side's turn.
    #[instrument(skip(self))]
    pub fn handle_local_move(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            debug!("No game in progress, ignoring move");
            return;
        };
        if !session.accepts_local_input() {
            debug!(active = session.active(), "Not accepting local input");
            return;
        }
        let symbol = session.local_symbol();
        if let Err(e) = session.board_mut().apply_move(index, symbol) {
            debug!(error = %e, "Ignoring invalid move");
            return;
        }
        let networked = session.mode() == Mode::Networked;
        if networked {
            session.set_my_turn(false);
        }
        self.view(ViewUpdate::CellUpdated { index, symbol });
        if networked {
            self.send(PeerMessage::Move { index });
        }
        self.resolve_after_move(symbol);
    }

    /// Applies the peer's move. Control returns to this side unless the
    /// move ended the game.
    #[instrument(skip(self))]
    pub fn handle_remote_move(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            warn!("Remote move without a game");
            return;
        };
        if !*session.active() {
            warn!("Remote move after game over");
            return;
        }
        let Some(my_symbol) = session.my_symbol() else {
            warn!("Remote move in a local game");
            return;
        };
        if session.is_my_turn() == Some(true) {
            warn!("Remote move while it is our turn, ignoring");
            return;
        }
        let symbol = my_symbol.opponent();
        if let Err(e) = session.board_mut().apply_move(index, symbol) {
            warn!(error = %e, "Ignoring invalid remote move");
            return;
        }
        session.set_my_turn(true);
        self.view(ViewUpdate::CellUpdated { index, symbol });
        self.resolve_after_move(symbol);
    }

    /// Clears the board for a new game. Unless `is_initial`, a networked
    /// restart is announced to the peer.
    #[instrument(skip(self))]
    pub fn restart(&mut self, is_initial: bool) {
        let Some(session) = self.session.as_mut() else {
            debug!("No game to restart");
            return;
        };
        session.reset();
        let networked = session.mode() == Mode::Networked;
        self.epoch += 1;
        self.view(ViewUpdate::BoardCleared);
        self.publish_status();
        if networked && !is_initial {
            self.send(PeerMessage::Restart);
        }
        self.schedule_cpu_if_due();
    }

    /// Evaluates the board after `just_moved` played.
    #[instrument(skip(self))]
    pub fn resolve_after_move(&mut self, just_moved: Symbol) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.board().evaluate() {
            Evaluation::Won { symbol, line } => {
                session.finish(Some(line));
                self.score.record_win(symbol);
                info!(winner = %symbol, "Game won");
                self.publish_score();
                self.view(ViewUpdate::GameEnded(GameOutcome::Won {
                    winner: symbol,
                    line,
                }));
                self.publish_status();
            }
            Evaluation::Draw => {
                session.finish(None);
                info!("Game drawn");
                self.view(ViewUpdate::GameEnded(GameOutcome::Draw));
                self.publish_status();
            }
            Evaluation::Ongoing => {
                debug_assert_eq!(session.current_player(), &just_moved);
                session.advance_turn();
                self.publish_status();
                self.schedule_cpu_if_due();
            }
        }
    }

    fn schedule_cpu_if_due(&mut self) {
        if self.session.as_ref().is_some_and(Session::is_cpu_turn) {
            debug!(ticket = self.epoch, "Scheduling CPU move");
            self.outbox.push(Effect::ScheduleCpuMove {
                ticket: self.epoch,
                delay: self.cpu_delay,
            });
        }
    }

    /// Plays the CPU's move if `ticket` still refers to the current game.
    #[instrument(skip(self))]
    pub fn cpu_turn(&mut self, ticket: u64) {
        if ticket != self.epoch {
            debug!(current = self.epoch, "Stale CPU ticket");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.is_cpu_turn() {
            debug!("Not the CPU's turn anymore");
            return;
        }
        let symbol = self.cpu.symbol();
        let Some(index) = self.cpu.choose_move(session.board(), &mut self.dice) else {
            return;
        };
        if let Err(e) = session.board_mut().apply_move(index, symbol) {
            warn!(error = %e, "CPU chose an unplayable cell");
            return;
        }
        self.view(ViewUpdate::CellUpdated { index, symbol });
        self.resolve_after_move(symbol);
    }

    /// Opens a new room, discarding any previous connection.
    #[instrument(skip(self))]
    pub fn request_host(&mut self) {
        self.drop_link();
        self.session = None;
        self.epoch += 1;
        let generation = self.open_link(Role::Host);
        self.view(ViewUpdate::ViewChanged(View::Hosting));
        self.view(ViewUpdate::ConnectionStatus(ConnectionStatus::CreatingRoom));
        self.outbox.push(Effect::OpenHost { generation });
    }

    /// Shows the room code entry.
    #[instrument(skip(self))]
    pub fn request_open_join(&mut self) {
        self.drop_link();
        self.session = None;
        self.epoch += 1;
        self.view(ViewUpdate::ViewChanged(View::Joining));
    }

    /// Validates `input` and dials the room. Malformed codes never reach
    /// the network.
    #[instrument(skip(self))]
    pub fn request_join(&mut self, input: &str) {
        let code = match RoomCode::parse(input) {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "Rejected room code");
                self.error(ErrorKind::InvalidRoomCode, "");
                return;
            }
        };
        self.drop_link();
        self.session = None;
        self.epoch += 1;
        let generation = self.open_link(Role::Joiner);
        self.view(ViewUpdate::ConnectionStatus(ConnectionStatus::Connecting));
        self.outbox.push(Effect::OpenJoin { generation, code });
    }

    /// Leaves to the menu: discards the game and the connection, resets the score.
    #[instrument(skip(self))]
    pub fn return_to_menu(&mut self) {
        self.drop_link();
        self.session = None;
        self.epoch += 1;
        self.score.reset();
        self.publish_score();
        self.view(ViewUpdate::ViewChanged(View::Menu));
    }

    fn open_link(&mut self, role: Role) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.link = Some(LinkInfo {
            generation,
            role,
            state: ConnectionState::Idle,
            handshake_done: false,
        });
        generation
    }

    fn drop_link(&mut self) {
        if self.link.take().is_some() {
            self.outbox.push(Effect::CloseNetwork);
        }
    }

    fn error(&mut self, kind: ErrorKind, detail: &str) {
        self.view(ViewUpdate::Error {
            kind,
            message: kind.user_message(detail),
        });
    }

    #[instrument(skip(self, event), fields(generation = event.generation))]
    fn handle_network_event(&mut self, event: NetworkEvent) {
        let Some(link) = self.link.as_mut() else {
            debug!("Network event without a connection, ignoring");
            return;
        };
        if link.generation != event.generation {
            warn!(current = link.generation, "Stale network event, ignoring");
            return;
        }
        match event.kind {
            NetworkEventKind::StateChanged(state) => {
                link.state = state;
                let role = link.role;
                self.handle_state_change(role, state);
            }
            NetworkEventKind::RoomReady(code) => {
                info!(%code, "Room ready");
                self.view(ViewUpdate::RoomReady(code));
            }
            NetworkEventKind::Message(message) => self.handle_remote_message(message),
            NetworkEventKind::Closed => self.handle_disconnect(),
            NetworkEventKind::Failed(error) => self.handle_network_error(error),
        }
    }

    fn handle_state_change(&mut self, role: Role, state: ConnectionState) {
        if state != ConnectionState::DataChannelOpen {
            return;
        }
        match role {
            Role::Host => {
                self.view(ViewUpdate::ConnectionStatus(ConnectionStatus::GuestConnected));
            }
            Role::Joiner => {
                self.view(ViewUpdate::ConnectionStatus(ConnectionStatus::Established));
                self.send(PeerMessage::Ready);
            }
        }
    }

    /// Dispatches a message from the peer. Nothing but the handshake is
    /// accepted until `ready`/`init` has been exchanged.
    #[instrument(skip(self))]
    pub fn handle_remote_message(&mut self, message: PeerMessage) {
        let Some(link) = self.link.as_mut() else {
            warn!("Message without a connection");
            return;
        };
        let awaiting_handshake =
            !link.handshake_done && link.state == ConnectionState::DataChannelOpen;
        match message {
            PeerMessage::Ready if link.role == Role::Host && awaiting_handshake => {
                link.handshake_done = true;
                info!("Guest ready, starting game");
                self.view(ViewUpdate::ConnectionStatus(ConnectionStatus::GuestReady));
                self.send(PeerMessage::Init);
                self.start(Mode::Networked);
            }
            PeerMessage::Init if link.role == Role::Joiner && awaiting_handshake => {
                link.handshake_done = true;
                info!("Host acknowledged, starting game");
                self.start(Mode::Networked);
            }
            PeerMessage::Ready | PeerMessage::Init => {
                warn!(%message, role = %link.role, "Unexpected handshake message");
            }
            _ if !link.handshake_done => {
                warn!(%message, "Message before handshake, ignoring");
            }
            PeerMessage::Move { index } => self.handle_remote_move(index),
            PeerMessage::Restart => self.restart(true),
        }
    }

    /// The peer closed the channel: one notice, then back to the menu.
    #[instrument(skip(self))]
    pub fn handle_disconnect(&mut self) {
        info!("Peer disconnected");
        self.view(ViewUpdate::Disconnected);
        self.return_to_menu();
    }

    fn handle_network_error(&mut self, error: NetworkError) {
        let kind = ErrorKind::from(error.kind);
        warn!(%kind, error = %error, "Network error");
        if kind.is_recoverable() {
            self.drop_link();
            self.error(kind, &error.message);
        } else {
            self.error(kind, &error.message);
            self.return_to_menu();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Never errs, always picks the first candidate.
    #[derive(Debug, Default)]
    struct CarefulDice {
        picks: VecDeque<usize>,
    }

    impl Dice for CarefulDice {
        fn chance(&mut self, _probability: f64) -> bool {
            false
        }

        fn pick(&mut self, len: usize) -> usize {
            self.picks.pop_front().unwrap_or(0) % len
        }
    }

    fn controller() -> GameSessionController<CarefulDice> {
        GameSessionController::new(
            CpuStrategy::new(CPU_SYMBOL),
            Duration::ZERO,
            CarefulDice::default(),
        )
    }

    fn ui(c: &mut GameSessionController<CarefulDice>, request: UiRequest) -> Vec<Effect> {
        c.handle(ControllerEvent::Ui(request))
    }

    fn statuses(effects: &[Effect]) -> Vec<Status> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::View(ViewUpdate::StatusChanged(s)) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn cpu_ticket(effects: &[Effect]) -> Option<u64> {
        effects.iter().find_map(|e| match e {
            Effect::ScheduleCpuMove { ticket, .. } => Some(*ticket),
            _ => None,
        })
    }

    #[test]
    fn test_start_local_game() {
        let mut c = controller();
        let effects = ui(&mut c, UiRequest::Start(Mode::LocalTwoPlayer));
        assert_eq!(
            effects[0],
            Effect::View(ViewUpdate::ViewChanged(View::Game {
                mode: Mode::LocalTwoPlayer,
                my_symbol: None
            }))
        );
        assert!(effects.contains(&Effect::View(ViewUpdate::BoardCleared)));
        assert_eq!(statuses(&effects), vec![Status::Turn(Symbol::X)]);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Send(_))));
        let session = c.session().unwrap();
        assert!(*session.active());
        assert_eq!(*session.current_player(), Symbol::X);
    }

    #[test]
    fn test_local_moves_alternate_and_occupied_is_ignored() {
        let mut c = controller();
        ui(&mut c, UiRequest::Start(Mode::LocalTwoPlayer));
        let effects = ui(&mut c, UiRequest::LocalMove(4));
        assert_eq!(statuses(&effects), vec![Status::Turn(Symbol::O)]);

        assert!(ui(&mut c, UiRequest::LocalMove(4)).is_empty());
        assert!(ui(&mut c, UiRequest::LocalMove(9)).is_empty());
        assert_eq!(*c.session().unwrap().current_player(), Symbol::O);
    }

    #[test]
    fn test_local_win_updates_score_and_stops_input() {
        let mut c = controller();
        ui(&mut c, UiRequest::Start(Mode::LocalTwoPlayer));
        for index in [0, 3, 1, 4] {
            ui(&mut c, UiRequest::LocalMove(index));
        }
        let effects = ui(&mut c, UiRequest::LocalMove(2));
        assert!(effects.contains(&Effect::View(ViewUpdate::ScoreChanged {
            wins_x: 1,
            wins_o: 0
        })));
        assert!(effects.contains(&Effect::View(ViewUpdate::GameEnded(GameOutcome::Won {
            winner: Symbol::X,
            line: duel_board::WIN_LINES[0],
        }))));
        assert_eq!(statuses(&effects), vec![Status::Winner(Symbol::X)]);
        assert!(ui(&mut c, UiRequest::LocalMove(8)).is_empty());

        ui(&mut c, UiRequest::Restart);
        assert_eq!(c.score().wins(Symbol::X), 1);
        assert!(*c.session().unwrap().active());
    }

    #[test]
    fn test_cpu_move_is_scheduled_and_played() {
        let mut c = controller();
        ui(&mut c, UiRequest::Start(Mode::LocalVsCpu));
        let effects = ui(&mut c, UiRequest::LocalMove(0));
        let ticket = cpu_ticket(&effects).expect("cpu move scheduled");

        // Human input is blocked while the CPU thinks.
        assert!(ui(&mut c, UiRequest::LocalMove(1)).is_empty());

        let effects = c.handle(ControllerEvent::CpuTurn { ticket });
        assert_eq!(
            effects[0],
            Effect::View(ViewUpdate::CellUpdated {
                index: 4,
                symbol: Symbol::O
            })
        );
        assert_eq!(*c.session().unwrap().current_player(), Symbol::X);
    }

    #[test]
    fn test_restart_invalidates_pending_cpu_move() {
        let mut c = controller();
        ui(&mut c, UiRequest::Start(Mode::LocalVsCpu));
        let ticket = cpu_ticket(&ui(&mut c, UiRequest::LocalMove(0))).unwrap();
        ui(&mut c, UiRequest::Restart);

        assert!(c.handle(ControllerEvent::CpuTurn { ticket }).is_empty());
        assert_eq!(c.session().unwrap().board().empty_cells().len(), 9);
    }

    #[test]
    fn test_menu_resets_score() {
        let mut c = controller();
        ui(&mut c, UiRequest::Start(Mode::LocalTwoPlayer));
        for index in [0, 3, 1, 4, 2] {
            ui(&mut c, UiRequest::LocalMove(index));
        }
        let effects = ui(&mut c, UiRequest::ReturnToMenu);
        assert!(effects.contains(&Effect::View(ViewUpdate::ViewChanged(View::Menu))));
        assert_eq!(*c.score(), ScoreTracker::new());
        assert!(c.session().is_none());
    }

    #[test]
    fn test_invalid_room_code_stays_local() {
        let mut c = controller();
        let effects = ui(&mut c, UiRequest::Join("12a45".to_string()));
        assert_eq!(
            effects,
            vec![Effect::View(ViewUpdate::Error {
                kind: ErrorKind::InvalidRoomCode,
                message: "Please enter a valid 6-digit code.".to_string(),
            })]
        );
        assert_eq!(c.role(), None);
    }

    #[test]
    fn test_networked_start_requires_handshake() {
        let mut c = controller();
        assert!(ui(&mut c, UiRequest::Start(Mode::Networked)).is_empty());
        assert!(c.session().is_none());
    }

    #[test]
    fn test_stale_generation_ignored() {
        let mut c = controller();
        let effects = ui(&mut c, UiRequest::Host);
        assert!(effects.contains(&Effect::OpenHost { generation: 1 }));
        let effects = ui(&mut c, UiRequest::Host);
        assert!(effects.contains(&Effect::CloseNetwork));
        assert!(effects.contains(&Effect::OpenHost { generation: 2 }));

        let stale = NetworkEvent::new(1, NetworkEventKind::Closed);
        assert!(c.handle(ControllerEvent::Network(stale)).is_empty());
        assert_eq!(c.role(), Some(Role::Host));
    }
}
