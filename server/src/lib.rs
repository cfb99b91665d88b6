//! # Platformer Game Server Library
//!
//! This library provides the authoritative server for a small multiplayer
//! 2D platformer. Clients connect over WebSocket, send JSON packets, and
//! receive a full snapshot of the world on every tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! By default the server owns every player's position. Clients only report
//! which movement keys are held; gravity, jumping and landing on platforms
//! are computed here and broadcast back.
//!
//! ### Session Management
//! Each WebSocket connection gets a process-unique id from a monotonic
//! counter. A player is created when the connection sends `join` and is
//! removed, with a `leave` notice to everyone else, when it disconnects.
//!
//! ### State Broadcasting
//! A fixed-rate tick advances the physics and sends a `state` snapshot
//! (players plus platforms) to every open connection. Late ticks are
//! skipped rather than queued.
//!
//! ## Architecture Design
//!
//! ### Single Dispatch Loop
//! Connection tasks decode frames and forward them over a channel to one
//! loop that also drives the tick. The player registry and the connection
//! set are owned by that loop, so no state is shared between tasks.
//!
//! ### Trust Models
//! The `authority` setting selects between the authoritative model above
//! and a trust-client model in which clients send positions that the server
//! only relays. A deployment runs exactly one of them.
//!
//! ## Module Organization
//!
//! - `client_manager`: open connections and outbound fan-out
//! - `config`: defaults, TOML loading and validation
//! - `game`: packet handling and per-tick world updates
//! - `network`: WebSocket transport and the dispatch loop
//! - `physics`: the per-player platformer step
//! - `registry`: connection id to player state
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let mut server = Server::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod physics;
pub mod registry;
mod utils;
