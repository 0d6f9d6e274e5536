//! Event loop wiring the controller to a frontend, the network and the CPU timer.

use std::sync::Arc;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::config::{DuelConfig, TransportKind};
use crate::controller::{ControllerEvent, Effect, GameSessionController, GameView, UiRequest};
use crate::network::{MemoryTransport, NetworkEvent, NetworkSession, TcpTransport, Transport};
use crate::room::NetworkIdentity;

/// A frontend renders view updates and produces player requests.
#[async_trait]
pub trait Frontend: GameView + Send {
    /// Next player request, `None` when the player quits.
    async fn next_request(&mut self) -> Option<UiRequest>;

    /// Flushes accumulated view updates to the screen.
    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Builds the transport selected in the config.
pub fn transport_from_config(config: &DuelConfig) -> Arc<dyn Transport> {
    match config.network().transport() {
        TransportKind::Tcp => Arc::new(TcpTransport::new(config.network())),
        TransportKind::Memory => Arc::new(MemoryTransport::new()),
    }
}

/// Runs one player's side of the game until the frontend quits.
pub struct Runtime<F> {
    controller: GameSessionController<StdRng>,
    frontend: F,
    transport: Arc<dyn Transport>,
    peer_prefix: String,
    rng: StdRng,
    network: Option<NetworkSession>,
    network_tx: mpsc::UnboundedSender<NetworkEvent>,
    network_rx: mpsc::UnboundedReceiver<NetworkEvent>,
    cpu_tx: mpsc::UnboundedSender<u64>,
    cpu_rx: mpsc::UnboundedReceiver<u64>,
}

impl<F: Frontend> Runtime<F> {
    /// Creates a runtime seeded from the OS.
    pub fn new(config: &DuelConfig, transport: Arc<dyn Transport>, frontend: F) -> Self {
        Self::with_rng(config, transport, frontend, StdRng::from_os_rng())
    }

    /// Creates a runtime with a fixed random source for CPU moves and room codes.
    pub fn with_rng(
        config: &DuelConfig,
        transport: Arc<dyn Transport>,
        frontend: F,
        mut rng: StdRng,
    ) -> Self {
        let dice = StdRng::from_rng(&mut rng);
        let (network_tx, network_rx) = mpsc::unbounded_channel();
        let (cpu_tx, cpu_rx) = mpsc::unbounded_channel();
        Self {
            controller: GameSessionController::from_config(config.cpu(), dice),
            frontend,
            transport,
            peer_prefix: config.network().peer_prefix().clone(),
            rng,
            network: None,
            network_tx,
            network_rx,
            cpu_tx,
            cpu_rx,
        }
    }

    /// Processes events until the frontend stops producing requests, then
    /// hands the frontend back.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> anyhow::Result<F> {
        info!("Runtime started");
        self.frontend.present()?;
        loop {
            let event = tokio::select! {
                request = self.frontend.next_request() => match request {
                    Some(request) => ControllerEvent::Ui(request),
                    None => break,
                },
                Some(event) = self.network_rx.recv() => ControllerEvent::Network(event),
                Some(ticket) = self.cpu_rx.recv() => ControllerEvent::CpuTurn { ticket },
            };
            let effects = self.controller.handle(event);
            self.apply(effects);
            self.frontend.present()?;
        }
        info!("Runtime stopped");
        Ok(self.frontend)
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::View(update) => update.apply_to(&mut self.frontend),
                Effect::Send(message) => match &self.network {
                    Some(network) => {
                        if let Err(e) = network.send(message) {
                            warn!(error = %e, %message, "Could not queue peer message");
                        }
                    }
                    None => warn!(%message, "No connection for outbound message"),
                },
                Effect::ScheduleCpuMove { ticket, delay } => {
                    let tx = self.cpu_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(ticket);
                    });
                }
                Effect::OpenHost { generation } => {
                    let identity = NetworkIdentity::generate(&self.peer_prefix, &mut self.rng);
                    debug!(generation, room = %identity.room_code(), "Hosting");
                    self.network = Some(NetworkSession::host(
                        generation,
                        Arc::clone(&self.transport),
                        identity,
                        self.network_tx.clone(),
                    ));
                }
                Effect::OpenJoin { generation, code } => {
                    let identity = NetworkIdentity::new(&self.peer_prefix, code);
                    debug!(generation, "Joining");
                    self.network = Some(NetworkSession::join(
                        generation,
                        Arc::clone(&self.transport),
                        identity,
                        self.network_tx.clone(),
                    ));
                }
                Effect::CloseNetwork => {
                    if let Some(network) = self.network.take() {
                        network.close();
                    }
                }
            }
        }
    }
}
