//! Per-tick platformer physics.
//!
//! All quantities are expressed per tick: velocities in pixels/tick and
//! gravity in pixels/tick². The y axis grows downward, so gravity is
//! positive and jumping sets a negative vertical velocity.

use serde::{Deserialize, Serialize};
use shared::{Platform, PlayerState, GRAVITY, JUMP_SPEED, MOVE_SPEED, TERMINAL_VELOCITY};

/// How a held jump input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum JumpMode {
    /// A jump request is consumed by the first step that sees it,
    /// whether or not the player could jump.
    #[default]
    Edge,
    /// The jump flag stays set; a held jump re-triggers whenever grounded.
    Level,
}

/// Rectangle the players are kept inside when the bounds clamp is enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsSettings {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_speed: f32,
    pub terminal_velocity: f32,
    pub jump_mode: JumpMode,
    /// `None` for an open world.
    pub bounds: Option<WorldBounds>,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            move_speed: MOVE_SPEED,
            jump_speed: JUMP_SPEED,
            terminal_velocity: TERMINAL_VELOCITY,
            jump_mode: JumpMode::Edge,
            bounds: Some(WorldBounds {
                width: shared::WORLD_WIDTH,
                height: shared::WORLD_HEIGHT,
            }),
        }
    }
}

/// Advances one player by a single tick against the static platforms.
pub fn step(player: &mut PlayerState, platforms: &[Platform], settings: &PhysicsSettings) {
    // Horizontal movement has no acceleration or friction
    player.vx = if player.inputs.left {
        -settings.move_speed
    } else if player.inputs.right {
        settings.move_speed
    } else {
        0.0
    };

    if player.inputs.jump && player.grounded {
        player.vy = -settings.jump_speed;
        player.grounded = false;
    }
    if settings.jump_mode == JumpMode::Edge {
        player.inputs.jump = false;
    }

    // Only the downward direction is clamped
    player.vy = (player.vy + settings.gravity).min(settings.terminal_velocity);

    player.x += player.vx;
    player.y += player.vy;

    player.grounded = false;
    for platform in platforms {
        if player.overlaps(platform) && lands_on(player, platform) {
            player.y = platform.y - player.height;
            player.vy = 0.0;
            player.grounded = true;
        }
    }

    if let Some(bounds) = settings.bounds {
        player.x = player.x.max(0.0).min(bounds.width - player.width);

        if player.y > bounds.height - player.height {
            player.y = bounds.height - player.height;
            player.vy = 0.0;
            player.grounded = true;
        }
    }
}

/// Runs `ticks` consecutive steps.
pub fn advance(
    player: &mut PlayerState,
    platforms: &[Platform],
    settings: &PhysicsSettings,
    ticks: u32,
) {
    for _ in 0..ticks {
        step(player, platforms, settings);
    }
}

/// Platforms are solid from above only: the player must be falling and its
/// bottom edge must have been at or above the platform top before this tick.
fn lands_on(player: &PlayerState, platform: &Platform) -> bool {
    player.vy > 0.0 && player.y + player.height - player.vy <= platform.y
}
