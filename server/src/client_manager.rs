//! Live WebSocket connection tracking and outbound fan-out
//!
//! This module owns the set of open connections, including:
//! - Connection admission against the configured capacity
//! - Per-connection outbound channels feeding each writer task
//! - Broadcast with optional sender exclusion
//!
//! Sends never block: each connection has an unbounded queue drained by its
//! own writer task. A connection whose writer has gone away is skipped.

use log::{debug, info};
use shared::ServerPacket;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::error::ServerError;

/// Represents one open connection
#[derive(Debug)]
pub struct Client {
    /// Connection id, also used as the player id
    pub id: u32,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Queue drained by the connection's writer task
    sender: mpsc::UnboundedSender<Message>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self { id, addr, sender }
    }

    /// Whether the writer task has shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queues a text frame. Returns false if the connection is already closed.
    fn send_text(&self, text: &str) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sender.send(Message::text(text)).is_ok()
    }
}

/// Manages all open connections
pub struct ClientManager {
    clients: BTreeMap<u32, Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients,
        }
    }

    /// Admits a connection under an id handed out by the acceptor.
    ///
    /// Returns false when the server is full or the id is already taken; the
    /// caller then drops the sender, which closes the connection.
    pub fn add_client(
        &mut self,
        id: u32,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Message>,
    ) -> bool {
        if self.clients.len() >= self.max_clients || self.clients.contains_key(&id) {
            return false;
        }

        info!("Client {} connected from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr, sender));
        true
    }

    /// Returns true if the client was present.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.addr);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, client_id: &u32) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Sends a packet to one connection. Unknown or closed connections are skipped.
    pub fn send_to(&self, client_id: u32, packet: &ServerPacket) -> Result<(), ServerError> {
        let Some(client) = self.clients.get(&client_id) else {
            debug!("Dropping packet for unknown client {}", client_id);
            return Ok(());
        };

        let text = packet.encode()?;
        if !client.send_text(&text) {
            debug!("Skipping closed client {}", client_id);
        }
        Ok(())
    }

    /// Serializes once and queues the packet for every connection except `exclude`.
    ///
    /// Returns the number of connections the packet was queued for.
    pub fn broadcast(
        &self,
        packet: &ServerPacket,
        exclude: Option<u32>,
    ) -> Result<usize, ServerError> {
        if self.clients.is_empty() {
            return Ok(0);
        }

        let text = packet.encode()?;
        let mut delivered = 0;

        for (client_id, client) in &self.clients {
            if Some(*client_id) == exclude {
                continue;
            }

            if client.send_text(&text) {
                delivered += 1;
            } else {
                debug!("Skipping closed client {}", client_id);
            }
        }

        Ok(delivered)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
