//! Authoritative game state and the session protocol semantics
//!
//! `GameState` turns decoded client packets into registry mutations and
//! returns the packets that should go out as a result. It performs no I/O,
//! so the dispatch loop in `network` decides how they are delivered.

use crate::config::{Authority, ServerConfig};
use crate::network::GameMessage;
use crate::physics::{self, PhysicsSettings};
use crate::registry::PlayerRegistry;
use crate::utils::{display_color, display_name};
use log::{debug, info};
use shared::{ClientPacket, Inputs, Platform, PlayerState, ServerPacket};

#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    registry: PlayerRegistry,
    platforms: Vec<Platform>,
    settings: PhysicsSettings,
    authority: Authority,
    spawn: (f32, f32),
    player_size: (f32, f32),
}

impl GameState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            tick: 0,
            registry: PlayerRegistry::new(),
            platforms: config.platforms.clone(),
            settings: config.physics_settings(),
            authority: config.game.authority,
            spawn: (config.player.spawn_x, config.player.spawn_y),
            player_size: (config.player.width, config.player.height),
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Applies one inbound packet from `client_id` and returns the resulting outbound packets.
    pub fn handle_packet(&mut self, client_id: u32, packet: ClientPacket) -> Vec<GameMessage> {
        match packet {
            ClientPacket::Join { name, color } => {
                self.add_player(client_id, name.as_deref(), color.as_deref())
            }
            ClientPacket::Input { inputs } => {
                self.update_player_input(client_id, inputs);
                Vec::new()
            }
            ClientPacket::Move {
                x,
                y,
                vx,
                vy,
                on_ground,
            } => self.move_player(client_id, x, y, vx, vy, on_ground),
        }
    }

    fn add_player(
        &mut self,
        client_id: u32,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Vec<GameMessage> {
        if self.registry.contains(&client_id) {
            debug!("Client {} sent join twice, ignoring", client_id);
            return Vec::new();
        }

        // Spawn point is server-chosen; only cosmetic fields come from the client
        let (spawn_x, spawn_y) = self.spawn;
        let (width, height) = self.player_size;
        let player = PlayerState::new(
            client_id,
            display_name(client_id, name),
            display_color(client_id, color),
            spawn_x,
            spawn_y,
        )
        .with_size(width, height);

        let announce = ServerPacket::Join {
            id: client_id,
            x: player.x,
            y: player.y,
            name: player.name.clone(),
        };

        if let Err(e) = self.registry.register(client_id, player) {
            debug!("Join from client {} rejected: {}", client_id, e);
            return Vec::new();
        }

        vec![
            GameMessage::SendPacket {
                packet: ServerPacket::Init {
                    id: client_id,
                    players: self.registry.snapshot(),
                },
                client_id,
            },
            GameMessage::BroadcastPacket {
                packet: announce,
                exclude: Some(client_id),
            },
        ]
    }

    fn update_player_input(&mut self, client_id: u32, inputs: Inputs) {
        if self.authority != Authority::Server {
            debug!("Ignoring input from client {} in client-authority mode", client_id);
            return;
        }

        match self.registry.get_mut(&client_id) {
            Some(player) => player.inputs = inputs,
            None => debug!("Input from client {} without a player", client_id),
        }
    }

    fn move_player(
        &mut self,
        client_id: u32,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        on_ground: bool,
    ) -> Vec<GameMessage> {
        if self.authority != Authority::Client {
            debug!("Ignoring move from client {} in server-authority mode", client_id);
            return Vec::new();
        }

        if [x, y, vx, vy].iter().any(|n| !n.is_finite()) {
            debug!("Dropping move with non-finite values from client {}", client_id);
            return Vec::new();
        }

        let Some(player) = self.registry.get_mut(&client_id) else {
            debug!("Move from client {} without a player", client_id);
            return Vec::new();
        };

        player.x = x;
        player.y = y;
        player.vx = vx;
        player.vy = vy;
        player.grounded = on_ground;

        vec![GameMessage::BroadcastPacket {
            packet: ServerPacket::Move { id: client_id, x, y },
            exclude: Some(client_id),
        }]
    }

    /// Drops the player owned by `client_id`, returning the leave notice if one existed.
    pub fn remove_player(&mut self, client_id: u32) -> Option<GameMessage> {
        self.registry.unregister(&client_id).map(|player| {
            info!("Player {} ({}) left", client_id, player.name);
            GameMessage::BroadcastPacket {
                packet: ServerPacket::Leave { id: client_id },
                exclude: Some(client_id),
            }
        })
    }

    /// Runs the physics step for every player. Positions are left alone when clients own them.
    pub fn update_physics(&mut self) {
        if self.authority != Authority::Server {
            return;
        }

        let platforms = &self.platforms;
        let settings = &self.settings;
        self.registry
            .for_each(|player| physics::step(player, platforms, settings));
    }

    pub fn advance_tick(&mut self) {
        self.update_physics();
        self.tick += 1;
    }

    pub fn snapshot(&self) -> ServerPacket {
        ServerPacket::State {
            tick: self.tick,
            players: self.registry.snapshot(),
            map: self.platforms.clone(),
        }
    }
}
