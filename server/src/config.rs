//! Server configuration
//!
//! Every value has a default, so the server runs without a config file. A
//! TOML file may override any subset of fields; command-line flags are
//! applied on top by the binary.

use crate::error::ServerError;
use crate::physics::{JumpMode, PhysicsSettings, WorldBounds};
use log::info;
use serde::{Deserialize, Serialize};
use shared::{Platform, DEFAULT_PORT, DEFAULT_TICK_RATE};
use std::path::Path;
use std::time::Duration;

/// Highest tick rate the dispatch loop is allowed to run at.
pub const MAX_TICK_RATE: u32 = 1000;

/// Who decides where a player is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Clients send input intents and the server simulates positions.
    #[default]
    Server,
    /// Clients send positions and the server only relays them.
    Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default = "shared::default_map")]
    pub platforms: Vec<Platform>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            game: GameConfig::default(),
            physics: PhysicsConfig::default(),
            world: WorldConfig::default(),
            player: PlayerConfig::default(),
            platforms: shared::default_map(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    /// Ticks per second.
    pub tick_rate: u32,
    pub max_clients: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            tick_rate: DEFAULT_TICK_RATE,
            max_clients: 32,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub authority: Authority,
    pub jump_mode: JumpMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_speed: f32,
    pub terminal_velocity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: shared::GRAVITY,
            move_speed: shared::MOVE_SPEED,
            jump_speed: shared::JUMP_SPEED,
            terminal_velocity: shared::TERMINAL_VELOCITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Keep players inside `[0, width] x [.., height]`; off for an open world.
    pub clamp_to_bounds: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: shared::WORLD_WIDTH,
            height: shared::WORLD_HEIGHT,
            clamp_to_bounds: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    pub spawn_x: f32,
    pub spawn_y: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: shared::PLAYER_SIZE,
            height: shared::PLAYER_SIZE,
            spawn_x: shared::SPAWN_X,
            spawn_y: shared::SPAWN_Y,
        }
    }
}

impl ServerConfig {
    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                let config = Self::from_toml(&contents)?;
                info!("Loaded config from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ServerError> {
        Ok(toml::from_str(contents)?)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        let invalid = |msg: String| Err(ServerError::InvalidConfig(msg));

        if self.network.tick_rate == 0 || self.network.tick_rate > MAX_TICK_RATE {
            return invalid(format!("tick_rate must be between 1 and {}", MAX_TICK_RATE));
        }
        if self.network.max_clients == 0 {
            return invalid("max_clients must be greater than 0".to_string());
        }
        let numbers = [
            self.physics.gravity,
            self.physics.move_speed,
            self.physics.jump_speed,
            self.physics.terminal_velocity,
            self.world.width,
            self.world.height,
            self.player.width,
            self.player.height,
            self.player.spawn_x,
            self.player.spawn_y,
        ];
        if numbers.iter().any(|n| !n.is_finite()) {
            return invalid("physics, world and player values must be finite".to_string());
        }
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            return invalid("world dimensions must be positive".to_string());
        }
        if self.player.width <= 0.0 || self.player.height <= 0.0 {
            return invalid("player dimensions must be positive".to_string());
        }
        if self.physics.terminal_velocity < 0.0 {
            return invalid("terminal_velocity must not be negative".to_string());
        }
        if let Some(i) = self
            .platforms
            .iter()
            .position(|p| {
                [p.x, p.y, p.width, p.height].iter().any(|n| !n.is_finite())
                    || p.width <= 0.0
                    || p.height <= 0.0
            })
        {
            return invalid(format!("platform {} has invalid dimensions", i));
        }

        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.network.host, self.network.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.network.tick_rate))
    }

    pub fn physics_settings(&self) -> PhysicsSettings {
        PhysicsSettings {
            gravity: self.physics.gravity,
            move_speed: self.physics.move_speed,
            jump_speed: self.physics.jump_speed,
            terminal_velocity: self.physics.terminal_velocity,
            jump_mode: self.game.jump_mode,
            bounds: self.world.clamp_to_bounds.then_some(WorldBounds {
                width: self.world.width,
                height: self.world.height,
            }),
        }
    }
}
