//! Server network layer handling WebSocket sessions and game loop coordination

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::game::GameState;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientPacket, ServerPacket};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        client_id: u32,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Message>,
    },
    PacketReceived {
        client_id: u32,
        packet: ClientPacket,
    },
    Disconnected {
        client_id: u32,
    },
    Shutdown,
}

/// Outbound packets produced by the game state
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    SendPacket {
        packet: ServerPacket,
        client_id: u32,
    },
    BroadcastPacket {
        packet: ServerPacket,
        exclude: Option<u32>,
    },
}

/// Cloneable handle for stopping a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Shutdown requested for a server that already stopped");
        }
    }
}

/// Main server coordinating networking and game simulation
///
/// Connection tasks only decode frames and forward them here; the registry,
/// the connection set and the tick all live on the single `run` loop.
pub struct Server {
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    game_state: GameState,
    tick_duration: Duration,
    next_client_id: Arc<AtomicU32>,
    acceptor: Option<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Arc::new(listener),
            local_addr,
            clients: ClientManager::new(config.network.max_clients),
            game_state: GameState::new(&config),
            tick_duration: config.tick_duration(),
            next_client_id: Arc::new(AtomicU32::new(1)),
            acceptor: None,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that accepts connections and hands out client ids
    fn spawn_acceptor(&mut self) {
        let listener = Arc::clone(&self.listener);
        let server_tx = self.server_tx.clone();
        let next_client_id = Arc::clone(&self.next_client_id);

        self.acceptor = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let client_id = next_client_id.fetch_add(1, Ordering::Relaxed);
                        let server_tx = server_tx.clone();

                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, addr, client_id, server_tx).await
                            {
                                warn!("Connection {} from {} failed: {}", client_id, addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    fn dispatch(&self, messages: impl IntoIterator<Item = GameMessage>) {
        for message in messages {
            let result = match message {
                GameMessage::SendPacket { packet, client_id } => {
                    self.clients.send_to(client_id, &packet)
                }
                GameMessage::BroadcastPacket { packet, exclude } => {
                    self.clients.broadcast(&packet, exclude).map(|_| ())
                }
            };

            if let Err(e) = result {
                error!("Failed to deliver packet: {}", e);
            }
        }
    }

    /// Processes one event from a connection task. Returns false once the loop should stop.
    fn handle_server_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Connected {
                client_id,
                addr,
                sender,
            } => {
                // Dropping the sender on rejection closes the connection
                if !self.clients.add_client(client_id, addr, sender) {
                    warn!("Rejecting client {} from {}: server full", client_id, addr);
                }
            }
            ServerMessage::PacketReceived { client_id, packet } => {
                if !self.clients.contains(&client_id) {
                    debug!("Dropping packet from unadmitted client {}", client_id);
                    return true;
                }
                let outbound = self.game_state.handle_packet(client_id, packet);
                self.dispatch(outbound);
            }
            ServerMessage::Disconnected { client_id } => {
                if !self.clients.remove_client(&client_id) {
                    return true;
                }
                let leave = self.game_state.remove_player(client_id);
                self.dispatch(leave);
            }
            ServerMessage::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    /// Advances the simulation one tick and broadcasts the snapshot
    fn run_tick(&mut self) {
        let started = Instant::now();

        self.game_state.advance_tick();

        if !self.clients.is_empty() {
            let snapshot = self.game_state.snapshot();
            self.dispatch([GameMessage::BroadcastPacket {
                packet: snapshot,
                exclude: None,
            }]);
        }

        let elapsed = started.elapsed();
        if elapsed > self.tick_duration {
            warn!(
                "Tick {} took {:?}, longer than the {:?} tick interval",
                self.game_state.tick, elapsed, self.tick_duration
            );
        }

        // Periodic performance monitoring
        if self.game_state.tick % 60 == 0 && !self.clients.is_empty() {
            debug!(
                "Tick {}: {} connections, {} players, {:?} per tick",
                self.game_state.tick,
                self.clients.len(),
                self.game_state.registry().len(),
                elapsed
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_acceptor();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Server started ({:?} authority, {:?} per tick)",
            self.game_state.authority(),
            self.tick_duration
        );

        loop {
            tokio::select! {
                // Handle connection events
                message = self.server_rx.recv() => {
                    let Some(message) = message else {
                        info!("Server channel closed, shutting down");
                        break;
                    };
                    if !self.handle_server_message(message) {
                        break;
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => self.run_tick(),
            }
        }

        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
        }

        Ok(())
    }
}

/// Runs one WebSocket session until the peer goes away
///
/// The writer half lives in its own task and exits once the main loop drops
/// this connection's sender.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    client_id: u32,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();

    server_tx
        .send(ServerMessage::Connected {
            client_id,
            addr,
            sender,
        })
        .map_err(|_| ServerError::ChannelClosed)?;

    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = write.send(message).await {
                debug!("Failed to write to client {}: {}", client_id, e);
                return;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientPacket::decode(text.as_str()) {
                Ok(packet) => {
                    if server_tx
                        .send(ServerMessage::PacketReceived { client_id, packet })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => debug!("Dropping malformed packet from client {}: {}", client_id, e),
            },
            Ok(Message::Binary(_)) => debug!("Dropping binary frame from client {}", client_id),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error from client {}: {}", client_id, e);
                break;
            }
        }
    }

    // Ignored if the server loop has already stopped
    let _ = server_tx.send(ServerMessage::Disconnected { client_id });
    Ok(())
}
