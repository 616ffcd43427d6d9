//! Breakout Link - a breakout paddle driven by an external controller
//!
//! Core modules:
//! - `sim`: Field geometry, swept-circle casting, trajectory prediction, headless arena
//! - `telemetry`: Binary TCP link to a single controller
//! - `control`: The tick that ties physics, prediction and the link together
//! - `settings`: Data-driven configuration

pub mod control;
pub mod error;
pub mod settings;
pub mod sim;
pub mod telemetry;

pub use control::{ControlLoop, Simulation};
pub use settings::Settings;
pub use telemetry::{TelemetryFrame, TelemetryState};

/// Arena configuration constants (field units, y up)
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Half the distance between the inner faces of the side walls
    pub const ARENA_HALF_WIDTH: f32 = 8.0;
    /// Inner face of the ceiling
    pub const ARENA_TOP: f32 = 6.0;
    pub const WALL_THICKNESS: f32 = 1.0;

    /// Paddle center line
    pub const PADDLE_Y: f32 = -5.0;
    pub const PADDLE_WIDTH: f32 = 2.0;
    pub const PADDLE_HEIGHT: f32 = 0.3;
    pub const BASELINE_THICKNESS: f32 = 0.5;

    pub const BALL_DIAMETER: f32 = 0.3;

    pub const BRICK_WIDTH: f32 = 1.2;
    pub const BRICK_HEIGHT: f32 = 0.4;
    /// Gap between neighbouring bricks
    pub const BRICK_MARGIN: f32 = 0.25;

    /// Cast segments the arena resolves within one step
    pub const MAX_BOUNCES_PER_STEP: u32 = 4;
}
