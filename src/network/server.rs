//! WebSocket Duel Server
//!
//! Async WebSocket transport for the duel coordinator.
//! Accepts connections, parses events off the wire, and funnels them
//! into a single coordinator task that owns all game state.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, broadcast};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::game::coordinator::{GameCoordinator, GameError, Outcome, Route, TimerDirective};
use crate::game::rng::derive_session_seed;
use crate::game::session::ParticipantId;
use crate::network::port::{bind_first_available, ProbeError};
use crate::network::protocol::{ClientEvent, ServerEvent};
use crate::{DEFAULT_START_PORT, WAIT_WINDOW};

/// Sent to a connection whose last frame could not be parsed.
const INVALID_MESSAGE: &str = "Invalid message format.";

/// Sent to the event's origin when a handler faults.
const HANDLER_FAULT: &str = "An error occurred while processing your request.";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// First port to try; the probe walks forward from here.
    pub start_port: u16,
    /// How long a lone ready participant waits for an opponent.
    pub wait_window: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            start_port: DEFAULT_START_PORT,
            wait_window: WAIT_WINDOW,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a config from `DUEL_HOST`, `DUEL_START_PORT` and
    /// `DUEL_WAIT_WINDOW_MS`. Unset or unparseable values fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("DUEL_HOST").unwrap_or(defaults.host);
        let start_port = std::env::var("DUEL_START_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.start_port);
        let wait_window = std::env::var("DUEL_WAIT_WINDOW_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.wait_window);

        Self { host, start_port, wait_window, version: defaults.version }
    }
}

/// Duel server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// No listening socket could be produced.
    #[error("Port probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Commands funneled into the coordinator task.
///
/// Connection tasks and the wait timer never touch game state directly;
/// everything goes through this channel and is applied one command at a
/// time, each to completion.
#[derive(Debug)]
enum CoordinatorCommand {
    /// A freshly accepted connection and its outbound channel.
    Connect {
        id: ParticipantId,
        sender: mpsc::Sender<ServerEvent>,
    },
    /// A parsed event from a connection.
    Client { id: ParticipantId, event: ClientEvent },
    /// A connection closed.
    Disconnect { id: ParticipantId },
    /// The wait window ran out.
    WaitElapsed,
}

/// The duel server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new duel server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self { config, shutdown_tx }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let (listener, port) =
            bind_first_available(&self.config.host, self.config.start_port).await?;
        info!("Duel server v{} listening on port {}", self.config.version, port);

        let (command_tx, command_rx) = mpsc::channel::<CoordinatorCommand>(256);

        // Spawn the coordinator task
        let coordinator = GameCoordinator::new(derive_session_seed());
        let wait_window = self.config.wait_window;
        let loop_tx = command_tx.clone();
        let coordinator_task = tokio::spawn(async move {
            run_coordinator(coordinator, command_rx, loop_tx, wait_window).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, command_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        coordinator_task.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        command_tx: mpsc::Sender<CoordinatorCommand>,
    ) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let id = ParticipantId::generate();
            let short = hex::encode(&id.as_bytes()[..4]);

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(64);

            // Spawn event sender task
            let sender_task = tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    let text = match event.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            if command_tx
                .send(CoordinatorCommand::Connect { id, sender: event_tx.clone() })
                .await
                .is_err()
            {
                sender_task.abort();
                return;
            }

            // Handle incoming events
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let event = match ClientEvent::from_json(&text) {
                                    Ok(e) => e,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", short, e);
                                        let _ = event_tx
                                            .send(ServerEvent::error(INVALID_MESSAGE))
                                            .await;
                                        continue;
                                    }
                                };

                                if command_tx
                                    .send(CoordinatorCommand::Client { id, event })
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Some(Ok(Message::Ping(_))) => {
                                // tungstenite queues the pong itself; nothing to do
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", short);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", short, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            let _ = command_tx.send(CoordinatorCommand::Disconnect { id }).await;
            sender_task.abort();

            info!("Client {} cleaned up", short);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Drive the coordinator from the command channel.
///
/// This task is the only owner of game state, so handlers run one at a
/// time in arrival order and never interleave.
async fn run_coordinator(
    mut coordinator: GameCoordinator,
    mut command_rx: mpsc::Receiver<CoordinatorCommand>,
    command_tx: mpsc::Sender<CoordinatorCommand>,
    wait_window: Duration,
) {
    let mut senders: BTreeMap<ParticipantId, mpsc::Sender<ServerEvent>> = BTreeMap::new();
    let mut wait_timer: Option<JoinHandle<()>> = None;

    while let Some(command) = command_rx.recv().await {
        match command {
            CoordinatorCommand::Connect { id, sender } => {
                senders.insert(id, sender);
                let outcome = coordinator.connect(id);
                apply(outcome, Some(id), &senders, &mut wait_timer, &command_tx, wait_window)
                    .await;

                // A declined connection keeps its socket but is never
                // routed to again.
                if !coordinator.session().is_participant(&id) {
                    senders.remove(&id);
                    debug!("Connection {} not seated, table full", hex::encode(&id.as_bytes()[..4]));
                }
            }
            CoordinatorCommand::Client { id, event } => {
                let outcome = match event {
                    ClientEvent::Ready(payload) => coordinator.ready(id, &payload.name),
                    ClientEvent::SubmitSecret(submission) => {
                        coordinator.submit_secret(id, &submission.number)
                    }
                    ClientEvent::MakeGuess(submission) => {
                        coordinator.guess(id, &submission.guess)
                    }
                    ClientEvent::PlayAgain => coordinator.play_again(id),
                };
                apply(outcome, Some(id), &senders, &mut wait_timer, &command_tx, wait_window)
                    .await;
            }
            CoordinatorCommand::Disconnect { id } => {
                senders.remove(&id);
                let outcome = coordinator.disconnect(id);
                apply(outcome, None, &senders, &mut wait_timer, &command_tx, wait_window).await;
            }
            CoordinatorCommand::WaitElapsed => {
                let outcome = coordinator.wait_window_elapsed();
                apply(outcome, None, &senders, &mut wait_timer, &command_tx, wait_window).await;
            }
        }
    }

    if let Some(timer) = wait_timer.take() {
        timer.abort();
    }
}

/// Execute one outcome: fan the deliveries out and adjust the timer.
///
/// A handler fault is logged and reported only to `origin`; nothing else
/// leaves the coordinator for that event.
async fn apply(
    outcome: Result<Outcome, GameError>,
    origin: Option<ParticipantId>,
    senders: &BTreeMap<ParticipantId, mpsc::Sender<ServerEvent>>,
    wait_timer: &mut Option<JoinHandle<()>>,
    command_tx: &mpsc::Sender<CoordinatorCommand>,
    wait_window: Duration,
) {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Handler fault: {}", e);
            if let Some(sender) = origin.and_then(|id| senders.get(&id)) {
                let _ = sender.send(ServerEvent::error(HANDLER_FAULT)).await;
            }
            return;
        }
    };

    for delivery in outcome.deliveries {
        match delivery.route {
            Route::To(id) => {
                if let Some(sender) = senders.get(&id) {
                    let _ = sender.send(delivery.event).await;
                }
            }
            Route::All => {
                for sender in senders.values() {
                    let _ = sender.send(delivery.event.clone()).await;
                }
            }
            Route::AllExcept(excluded) => {
                for (id, sender) in senders.iter() {
                    if *id == excluded {
                        continue;
                    }
                    let _ = sender.send(delivery.event.clone()).await;
                }
            }
        }
    }

    match outcome.timer {
        TimerDirective::None => {}
        TimerDirective::Arm => {
            if let Some(old) = wait_timer.take() {
                old.abort();
            }
            debug!("Wait window armed for {:?}", wait_window);
            let tx = command_tx.clone();
            *wait_timer = Some(tokio::spawn(async move {
                sleep(wait_window).await;
                let _ = tx.send(CoordinatorCommand::WaitElapsed).await;
            }));
        }
        TimerDirective::Cancel => {
            if let Some(timer) = wait_timer.take() {
                timer.abort();
                debug!("Wait window cancelled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::coordinator::NOT_ENOUGH_PLAYERS;
    use crate::network::protocol::{ReadyPayload, RosterUpdate};
    use tokio::time::timeout;

    fn spawn_coordinator(wait_window: Duration) -> mpsc::Sender<CoordinatorCommand> {
        let (command_tx, command_rx) = mpsc::channel(256);
        let loop_tx = command_tx.clone();
        tokio::spawn(async move {
            run_coordinator(GameCoordinator::new(7), command_rx, loop_tx, wait_window).await;
        });
        command_tx
    }

    /// Seat a connection on a running coordinator task.
    async fn seat(
        command_tx: &mpsc::Sender<CoordinatorCommand>,
    ) -> (ParticipantId, mpsc::Receiver<ServerEvent>) {
        let id = ParticipantId::generate();
        let (tx, rx) = mpsc::channel(64);
        command_tx
            .send(CoordinatorCommand::Connect { id, sender: tx })
            .await
            .unwrap();
        (id, rx)
    }

    async fn ready(command_tx: &mpsc::Sender<CoordinatorCommand>, id: ParticipantId, name: &str) {
        command_tx
            .send(CoordinatorCommand::Client {
                id,
                event: ClientEvent::Ready(ReadyPayload { name: name.to_string() }),
            })
            .await
            .unwrap();
    }

    async fn next_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("no event within 1s")
            .expect("channel closed")
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.start_port, 3010);
        assert_eq!(config.wait_window, Duration::from_secs(5));
    }

    #[test]
    fn test_server_config_from_env() {
        std::env::set_var("DUEL_START_PORT", "4500");
        std::env::set_var("DUEL_WAIT_WINDOW_MS", "250");
        let config = ServerConfig::from_env();
        assert_eq!(config.start_port, 4500);
        assert_eq!(config.wait_window, Duration::from_millis(250));

        // Unparseable values fall back.
        std::env::set_var("DUEL_START_PORT", "not-a-port");
        let config = ServerConfig::from_env();
        assert_eq!(config.start_port, 3010);

        std::env::remove_var("DUEL_START_PORT");
        std::env::remove_var("DUEL_WAIT_WINDOW_MS");
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = GameServer::new(ServerConfig::default());
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_actor_announces_joins() {
        let command_tx = spawn_coordinator(Duration::from_secs(5));
        let (_a, mut rx_a) = seat(&command_tx).await;
        let (_b, mut rx_b) = seat(&command_tx).await;

        assert!(matches!(
            next_event(&mut rx_a).await,
            ServerEvent::PlayerJoined(RosterUpdate { player_count: 1 })
        ));
        assert!(matches!(
            next_event(&mut rx_a).await,
            ServerEvent::PlayerJoined(RosterUpdate { player_count: 2 })
        ));
        assert!(matches!(
            next_event(&mut rx_b).await,
            ServerEvent::PlayerJoined(RosterUpdate { player_count: 2 })
        ));
    }

    #[tokio::test]
    async fn test_wait_window_expires_into_notice() {
        let command_tx = spawn_coordinator(Duration::from_millis(20));
        let (a, mut rx_a) = seat(&command_tx).await;
        let (_b, _rx_b) = seat(&command_tx).await;
        ready(&command_tx, a, "ann").await;

        // Both joins, the waiting notice, then the expiry notice.
        next_event(&mut rx_a).await;
        next_event(&mut rx_a).await;
        next_event(&mut rx_a).await;
        match next_event(&mut rx_a).await {
            ServerEvent::Waiting(notice) => assert_eq!(notice.message, NOT_ENOUGH_PLAYERS),
            other => panic!("expected expiry notice, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_ready_cancels_wait_window() {
        let command_tx = spawn_coordinator(Duration::from_millis(100));
        let (a, mut rx_a) = seat(&command_tx).await;
        let (b, _rx_b) = seat(&command_tx).await;
        ready(&command_tx, a, "ann").await;
        ready(&command_tx, b, "ben").await;

        // Joins, waiting, then the stage signal.
        let mut saw_stage = false;
        for _ in 0..4 {
            if matches!(next_event(&mut rx_a).await, ServerEvent::GuessStage) {
                saw_stage = true;
                break;
            }
        }
        assert!(saw_stage);

        // Past the window with no expiry notice: the timer was cancelled.
        sleep(Duration::from_millis(150)).await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_extra_connection_is_not_routed() {
        let command_tx = spawn_coordinator(Duration::from_secs(5));
        let (a, mut rx_a) = seat(&command_tx).await;
        let (_b, _rx_b) = seat(&command_tx).await;
        let (_c, mut rx_c) = seat(&command_tx).await;
        ready(&command_tx, a, "ann").await;

        // The first seat hears two joins and a waiting notice; no third
        // join is ever announced.
        for count in [1usize, 2] {
            match next_event(&mut rx_a).await {
                ServerEvent::PlayerJoined(update) => assert_eq!(update.player_count, count),
                other => panic!("expected join announcement, got {:?}", other),
            }
        }
        assert!(matches!(next_event(&mut rx_a).await, ServerEvent::Waiting(_)));

        // The declined connection hears nothing at all.
        assert!(rx_c.try_recv().is_err());
    }
}
