//! Two controllers wired back to back, without a transport.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tictactoe_duel::config::CpuConfig;
use tictactoe_duel::network::{ConnectionState, NetworkError, NetworkEvent, NetworkEventKind, Role};
use tictactoe_duel::{
    ConnectionStatus, ControllerEvent, Effect, ErrorKind, GameOutcome, GameSessionController,
    Mode, PeerMessage, RoomCode, Status, Symbol, UiRequest, View, ViewUpdate,
};

type Controller = GameSessionController<StdRng>;

/// One side of a networked game plus the generation of its open session.
struct Peer {
    controller: Controller,
    generation: u64,
}

impl Peer {
    fn new() -> Self {
        Self {
            controller: GameSessionController::from_config(
                &CpuConfig::default(),
                StdRng::seed_from_u64(11),
            ),
            generation: 0,
        }
    }

    fn ui(&mut self, request: UiRequest) -> Vec<Effect> {
        let effects = self.controller.handle(ControllerEvent::Ui(request));
        for effect in &effects {
            match effect {
                Effect::OpenHost { generation } | Effect::OpenJoin { generation, .. } => {
                    self.generation = *generation
                }
                _ => {}
            }
        }
        effects
    }

    fn network(&mut self, kind: NetworkEventKind) -> Vec<Effect> {
        let event = NetworkEvent::new(self.generation, kind);
        self.controller.handle(ControllerEvent::Network(event))
    }

    fn state(&mut self, state: ConnectionState) -> Vec<Effect> {
        self.network(NetworkEventKind::StateChanged(state))
    }

    fn receive(&mut self, message: PeerMessage) -> Vec<Effect> {
        self.network(NetworkEventKind::Message(message))
    }

    /// Delivers every message in `effects` to this peer, in order.
    fn deliver(&mut self, effects: &[Effect]) -> Vec<Effect> {
        sent(effects)
            .into_iter()
            .flat_map(|message| self.receive(message))
            .collect()
    }

    fn board(&self) -> [Option<Symbol>; 9] {
        let session = self.controller.session().expect("game in progress");
        session.board().cells().map(|cell| cell.symbol())
    }

    fn is_my_turn(&self) -> Option<bool> {
        self.controller.session().and_then(|s| s.is_my_turn())
    }
}

fn sent(effects: &[Effect]) -> Vec<PeerMessage> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(message) => Some(*message),
            _ => None,
        })
        .collect()
}

fn has_view(effects: &[Effect], update: ViewUpdate) -> bool {
    effects.contains(&Effect::View(update))
}

/// Host and joiner through the full ready/init handshake.
fn connected_pair() -> (Peer, Peer) {
    let mut host = Peer::new();
    let mut joiner = Peer::new();

    let effects = host.ui(UiRequest::Host);
    assert!(has_view(&effects, ViewUpdate::ViewChanged(View::Hosting)));
    assert!(has_view(
        &effects,
        ViewUpdate::ConnectionStatus(ConnectionStatus::CreatingRoom)
    ));
    host.state(ConnectionState::Connecting);
    host.state(ConnectionState::PeerOpen);
    let code = RoomCode::parse("123456").unwrap();
    let effects = host.network(NetworkEventKind::RoomReady(code.clone()));
    assert!(has_view(&effects, ViewUpdate::RoomReady(code.clone())));

    joiner.ui(UiRequest::OpenJoin);
    let effects = joiner.ui(UiRequest::Join(" 123456 ".to_string()));
    assert!(effects.iter().any(|e| matches!(e, Effect::OpenJoin { code: c, .. } if *c == code)));
    joiner.state(ConnectionState::Connecting);

    let effects = host.state(ConnectionState::DataChannelOpen);
    assert!(has_view(
        &effects,
        ViewUpdate::ConnectionStatus(ConnectionStatus::GuestConnected)
    ));
    let ready = joiner.state(ConnectionState::DataChannelOpen);
    assert_eq!(sent(&ready), vec![PeerMessage::Ready]);

    // Neither side has a game before the handshake completes.
    assert!(host.controller.session().is_none());
    assert!(joiner.controller.session().is_none());

    let init = host.deliver(&ready);
    assert_eq!(sent(&init), vec![PeerMessage::Init]);
    assert!(has_view(
        &init,
        ViewUpdate::ViewChanged(View::Game {
            mode: Mode::Networked,
            my_symbol: Some(Symbol::X)
        })
    ));
    host.state(ConnectionState::Ready);

    let effects = joiner.deliver(&init);
    assert!(sent(&effects).is_empty());
    assert!(has_view(
        &effects,
        ViewUpdate::ViewChanged(View::Game {
            mode: Mode::Networked,
            my_symbol: Some(Symbol::O)
        })
    ));
    joiner.state(ConnectionState::Ready);

    (host, joiner)
}

#[test]
fn test_handshake_assigns_roles_and_turns() {
    let (host, joiner) = connected_pair();
    assert_eq!(host.controller.role(), Some(Role::Host));
    assert_eq!(joiner.controller.role(), Some(Role::Joiner));

    let host_session = host.controller.session().unwrap();
    assert_eq!(host_session.my_symbol(), Some(Symbol::X));
    assert_eq!(host.is_my_turn(), Some(true));
    assert_eq!(host_session.status(), Status::YourTurn);

    let joiner_session = joiner.controller.session().unwrap();
    assert_eq!(joiner_session.my_symbol(), Some(Symbol::O));
    assert_eq!(joiner.is_my_turn(), Some(false));
    assert_eq!(joiner_session.status(), Status::OpponentTurn);
}

#[test]
fn test_moves_before_handshake_are_ignored() {
    let mut host = Peer::new();
    host.ui(UiRequest::Host);
    host.state(ConnectionState::DataChannelOpen);

    assert!(host.receive(PeerMessage::Move { index: 4 }).is_empty());
    assert!(host.receive(PeerMessage::Restart).is_empty());
    assert!(host.receive(PeerMessage::Init).is_empty());
    assert!(host.controller.session().is_none());
}

#[test]
fn test_host_move_is_relayed_to_joiner() {
    let (mut host, mut joiner) = connected_pair();

    let effects = host.ui(UiRequest::LocalMove(4));
    assert_eq!(sent(&effects), vec![PeerMessage::Move { index: 4 }]);
    assert_eq!(host.is_my_turn(), Some(false));

    let effects = joiner.deliver(&effects);
    assert!(has_view(
        &effects,
        ViewUpdate::CellUpdated {
            index: 4,
            symbol: Symbol::X
        }
    ));
    assert_eq!(
        joiner.board(),
        [None, None, None, None, Some(Symbol::X), None, None, None, None]
    );
    assert_eq!(joiner.is_my_turn(), Some(true));
    assert!(*joiner.controller.session().unwrap().active());
}

#[test]
fn test_local_input_rejected_out_of_turn() {
    let (mut host, mut joiner) = connected_pair();

    assert!(joiner.ui(UiRequest::LocalMove(0)).is_empty());
    host.ui(UiRequest::LocalMove(0));
    assert!(host.ui(UiRequest::LocalMove(1)).is_empty());
    assert_eq!(joiner.controller.session().unwrap().board().empty_cells().len(), 9);
}

#[test]
fn test_out_of_turn_remote_move_is_ignored() {
    let (mut host, _joiner) = connected_pair();
    assert!(host.receive(PeerMessage::Move { index: 0 }).is_empty());
    assert!(host.receive(PeerMessage::Move { index: 42 }).is_empty());
    assert_eq!(host.board(), [None; 9]);
}

#[test]
fn test_networked_game_to_win_and_restart() {
    let (mut host, mut joiner) = connected_pair();

    // X: 0, 1, 2 wins the top row; O: 3, 4.
    for (index, host_moves) in [(0, true), (3, false), (1, true), (4, false)] {
        let (mover, receiver) = if host_moves {
            (&mut host, &mut joiner)
        } else {
            (&mut joiner, &mut host)
        };
        let effects = mover.ui(UiRequest::LocalMove(index));
        receiver.deliver(&effects);
    }
    let last = host.ui(UiRequest::LocalMove(2));
    assert_eq!(sent(&last), vec![PeerMessage::Move { index: 2 }]);
    assert!(has_view(&last, ViewUpdate::StatusChanged(Status::YouWin)));

    let effects = joiner.deliver(&last);
    assert!(has_view(&effects, ViewUpdate::StatusChanged(Status::OpponentWins)));
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::View(ViewUpdate::GameEnded(GameOutcome::Won { winner: Symbol::X, .. }))
    )));
    assert_eq!(host.controller.score().wins(Symbol::X), 1);
    assert_eq!(joiner.controller.score().wins(Symbol::X), 1);
    assert!(!*joiner.controller.session().unwrap().active());

    // Restart from the joiner side; the host mirrors without echoing.
    let restart = joiner.ui(UiRequest::Restart);
    assert_eq!(sent(&restart), vec![PeerMessage::Restart]);
    let effects = host.deliver(&restart);
    assert!(sent(&effects).is_empty());

    for peer in [&host, &joiner] {
        let session = peer.controller.session().unwrap();
        assert!(*session.active());
        assert_eq!(*session.current_player(), Symbol::X);
        assert_eq!(peer.board(), [None; 9]);
        assert_eq!(peer.controller.score().wins(Symbol::X), 1);
        assert_eq!(peer.controller.score().wins(Symbol::O), 0);
    }
    assert_eq!(host.is_my_turn(), Some(true));
    assert_eq!(joiner.is_my_turn(), Some(false));
}

#[test]
fn test_draw_sequence() {
    let (mut host, mut joiner) = connected_pair();
    // X: 0, 1, 5, 6, 8; O: 2, 3, 4, 7
    let moves = [0, 2, 1, 3, 5, 4, 6, 7, 8];
    let mut last = Vec::new();
    for (turn, index) in moves.into_iter().enumerate() {
        let (mover, receiver) = if turn % 2 == 0 {
            (&mut host, &mut joiner)
        } else {
            (&mut joiner, &mut host)
        };
        let effects = mover.ui(UiRequest::LocalMove(index));
        assert_eq!(sent(&effects), vec![PeerMessage::Move { index }]);
        last = receiver.deliver(&effects);
    }
    assert!(has_view(&last, ViewUpdate::GameEnded(GameOutcome::Draw)));
    assert!(has_view(&last, ViewUpdate::StatusChanged(Status::Draw)));
    assert_eq!(*joiner.controller.score(), *host.controller.score());
    assert_eq!(host.controller.score().wins(Symbol::X), 0);
}

#[test]
fn test_disconnect_returns_to_menu_once() {
    let (mut host, _joiner) = connected_pair();
    host.ui(UiRequest::LocalMove(4));

    let effects = host.network(NetworkEventKind::Closed);
    let notices = effects
        .iter()
        .filter(|e| matches!(e, Effect::View(ViewUpdate::Disconnected)))
        .count();
    assert_eq!(notices, 1);
    assert!(has_view(&effects, ViewUpdate::ViewChanged(View::Menu)));
    assert!(effects.contains(&Effect::CloseNetwork));
    assert!(host.controller.session().is_none());

    // The same session cannot report anything anymore.
    assert!(host.network(NetworkEventKind::Closed).is_empty());
}

#[test]
fn test_room_not_found_keeps_join_view() {
    let mut joiner = Peer::new();
    joiner.ui(UiRequest::OpenJoin);
    joiner.ui(UiRequest::Join("654321".to_string()));
    joiner.state(ConnectionState::Connecting);

    let effects = joiner.network(NetworkEventKind::Failed(NetworkError::room_not_found(
        "Could not connect to peer tictactoe-654321",
    )));
    assert!(has_view(
        &effects,
        ViewUpdate::Error {
            kind: ErrorKind::RoomNotFound,
            message: "Room not found. Check the code.".to_string()
        }
    ));
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::View(ViewUpdate::ViewChanged(_)))));
    assert_eq!(joiner.controller.role(), None);

    // The player can retry straight away.
    let retry = joiner.ui(UiRequest::Join("654322".to_string()));
    assert!(retry.iter().any(|e| matches!(e, Effect::OpenJoin { .. })));
}

#[test]
fn test_room_code_in_use_returns_to_menu() {
    let mut host = Peer::new();
    host.ui(UiRequest::Host);
    let effects = host.network(NetworkEventKind::Failed(NetworkError::room_code_in_use(
        "ID is taken",
    )));
    assert!(has_view(
        &effects,
        ViewUpdate::Error {
            kind: ErrorKind::RoomCodeInUse,
            message: "This room code is already in use. Please try hosting again.".to_string()
        }
    ));
    assert!(has_view(&effects, ViewUpdate::ViewChanged(View::Menu)));
    assert_eq!(host.controller.role(), None);
}

#[test]
fn test_transport_error_message_is_surfaced() {
    let mut joiner = Peer::new();
    joiner.ui(UiRequest::Join("111111".to_string()));
    let effects = joiner.network(NetworkEventKind::Failed(NetworkError::other("socket reset")));
    assert!(has_view(
        &effects,
        ViewUpdate::Error {
            kind: ErrorKind::PeerTransportError,
            message: "An error occurred: socket reset. Returning to menu.".to_string()
        }
    ));
    assert!(has_view(&effects, ViewUpdate::ViewChanged(View::Menu)));
}

#[test]
fn test_rehosting_discards_previous_room() {
    let mut host = Peer::new();
    host.ui(UiRequest::Host);
    let first = host.generation;
    let effects = host.ui(UiRequest::Host);
    assert!(effects.contains(&Effect::CloseNetwork));
    assert!(host.generation > first);

    let stale = NetworkEvent::new(first, NetworkEventKind::Message(PeerMessage::Ready));
    assert!(host.controller.handle(ControllerEvent::Network(stale)).is_empty());
}

#[test]
fn test_vs_cpu_full_game_never_overwrites() {
    let mut controller: Controller = GameSessionController::from_config(
        &CpuConfig::default().with_mistake_rate(0.0),
        StdRng::seed_from_u64(5),
    );
    controller.handle(ControllerEvent::Ui(UiRequest::Start(Mode::LocalVsCpu)));

    let mut pending = None;
    for _ in 0..20 {
        if !controller.session().is_some_and(|s| *s.active()) {
            break;
        }
        let effects = match pending.take() {
            Some(ticket) => controller.handle(ControllerEvent::CpuTurn { ticket }),
            None => {
                let index = controller.session().unwrap().board().empty_cells()[0];
                controller.handle(ControllerEvent::Ui(UiRequest::LocalMove(index)))
            }
        };
        pending = effects.iter().find_map(|e| match e {
            Effect::ScheduleCpuMove { ticket, .. } => Some(*ticket),
            _ => None,
        });
    }
    let session = controller.session().unwrap();
    assert!(!*session.active());
    // A CPU that never errs cannot lose to a player filling cells in order.
    assert_eq!(controller.score().wins(Symbol::X), 0);
}

#[test]
fn test_opening_join_view_ends_local_game() {
    let mut controller: Controller = GameSessionController::from_config(
        &CpuConfig::default().with_mistake_rate(0.0),
        StdRng::seed_from_u64(6),
    );
    controller.handle(ControllerEvent::Ui(UiRequest::Start(Mode::LocalVsCpu)));
    let effects = controller.handle(ControllerEvent::Ui(UiRequest::LocalMove(0)));
    let ticket = effects
        .iter()
        .find_map(|e| match e {
            Effect::ScheduleCpuMove { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("cpu move scheduled");

    let effects = controller.handle(ControllerEvent::Ui(UiRequest::OpenJoin));
    assert!(has_view(&effects, ViewUpdate::ViewChanged(View::Joining)));
    assert!(controller.session().is_none());

    // Neither the board nor the pending CPU reply survive.
    let effects = controller.handle(ControllerEvent::Ui(UiRequest::LocalMove(1)));
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::View(ViewUpdate::CellUpdated { .. }))));
    assert!(controller.handle(ControllerEvent::CpuTurn { ticket }).is_empty());
}
