//! Data model and JSON wire protocol shared between the game server and its clients.

use serde::{Deserialize, Serialize};

pub const GRAVITY: f32 = 0.5;
pub const MOVE_SPEED: f32 = 4.0;
pub const JUMP_SPEED: f32 = 10.0;
pub const TERMINAL_VELOCITY: f32 = 15.0;
pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_SIZE: f32 = 20.0;
pub const SPAWN_X: f32 = 100.0;
pub const SPAWN_Y: f32 = 100.0;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TICK_RATE: u32 = 60;
pub const MAX_NAME_LEN: usize = 16;

/// Static, walkable-on-top rectangle in world coordinates (y grows downward).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Platform {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Ground plus two floating platforms.
pub fn default_map() -> Vec<Platform> {
    vec![
        Platform::new(0.0, 400.0, 800.0, 20.0),
        Platform::new(200.0, 300.0, 200.0, 20.0),
        Platform::new(500.0, 200.0, 150.0, 20.0),
    ]
}

/// Movement intent reported by a client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inputs {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: u32,
    pub name: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub width: f32,
    pub height: f32,
    pub grounded: bool,
    pub inputs: Inputs,
}

impl PlayerState {
    pub fn new(id: u32, name: String, color: String, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            color,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            width: PLAYER_SIZE,
            height: PLAYER_SIZE,
            grounded: false,
            inputs: Inputs::default(),
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Returns `(left, top, right, bottom)`.
    pub fn get_bounds(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Strict AABB overlap; touching edges do not count.
    pub fn overlaps(&self, platform: &Platform) -> bool {
        let (x1, y1, x2, y2) = self.get_bounds();
        x2 > platform.x
            && x1 < platform.x + platform.width
            && y2 > platform.y
            && y1 < platform.y + platform.height
    }
}

/// Messages sent by clients. Anything that does not parse into one of these is dropped.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPacket {
    #[serde(alias = "login")]
    Join {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
    Input {
        #[serde(alias = "keys")]
        inputs: Inputs,
    },
    #[serde(alias = "update")]
    Move {
        x: f32,
        y: f32,
        #[serde(default)]
        vx: f32,
        #[serde(default)]
        vy: f32,
        #[serde(rename = "onGround", default)]
        on_ground: bool,
    },
}

/// Messages sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPacket {
    Init {
        id: u32,
        players: Vec<PlayerState>,
    },
    Join {
        id: u32,
        x: f32,
        y: f32,
        name: String,
    },
    State {
        tick: u64,
        players: Vec<PlayerState>,
        map: Vec<Platform>,
    },
    Move {
        id: u32,
        x: f32,
        y: f32,
    },
    Leave {
        id: u32,
    },
}

impl ClientPacket {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerPacket {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
