//! Controller link: shared telemetry state, wire codec and TCP server
//!
//! The simulation thread and the server thread meet in [`TelemetryState`].
//! The simulation publishes a whole [`TelemetryFrame`] once per tick; the
//! server publishes a whole [`ControlCommand`] once per received command.
//! Each record is swapped under its own lock, so a reader never sees half of
//! one update and half of another.

pub mod client;
pub mod server;
pub mod wire;

pub use client::ControllerClient;
pub use server::{ServerConfig, SessionEnd, TelemetryServer};
pub use wire::FrameLayout;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Values sent to the controller each cycle, normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Paddle position: 1 at the left edge, 0 at the right edge
    pub paddle_actual_pos: f32,
    /// Paddle position that would intercept the ball
    pub paddle_desired_pos: f32,
    /// Ball distance to the paddle contact point, over the field diagonal
    pub distance: f32,
    /// 1 at the paddle plane, falling to 0 at the deadband height and above
    pub inverse_deadband_distance: f32,
}

impl TelemetryFrame {
    /// Paddle centered, ball far away
    pub const NEUTRAL: Self = Self {
        paddle_actual_pos: 0.5,
        paddle_desired_pos: 0.5,
        distance: 0.5,
        inverse_deadband_distance: 0.0,
    };

    /// Every field clamped to [0, 1]
    pub fn clamped(&self) -> Self {
        Self {
            paddle_actual_pos: clamp01(self.paddle_actual_pos),
            paddle_desired_pos: clamp01(self.paddle_desired_pos),
            distance: clamp01(self.distance),
            inverse_deadband_distance: clamp01(self.inverse_deadband_distance),
        }
    }

    /// Fields in wire order
    pub fn fields(&self) -> [f32; 4] {
        [
            self.paddle_actual_pos,
            self.paddle_desired_pos,
            self.distance,
            self.inverse_deadband_distance,
        ]
    }
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Clamp to [0, 1]; NaN maps to the neutral 0.5
#[inline]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Paddle command from the controller, normalized to [0, 1]
///
/// 0 drives the paddle right at full force, 1 drives it left, 0.5 holds it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ControlCommand(f32);

impl ControlCommand {
    pub const HOLD: Self = Self(0.5);

    /// Clamps into range
    pub fn new(value: f32) -> Self {
        Self(clamp01(value))
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.0
    }
}

/// Telemetry server lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    /// No listener
    Idle = 0,
    /// Listener bound, waiting for a controller
    Listening = 1,
    /// A controller session is running
    ClientConnected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Listening,
            2 => ConnectionState::ClientConnected,
            _ => ConnectionState::Idle,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Listening => write!(f, "listening"),
            ConnectionState::ClientConnected => write!(f, "client connected"),
        }
    }
}

/// Cross-thread meeting point of the simulation and the telemetry server
#[derive(Debug)]
pub struct TelemetryState {
    frame: Mutex<TelemetryFrame>,
    command: Mutex<Option<ControlCommand>>,
    connection: AtomicU8,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryState {
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(TelemetryFrame::NEUTRAL),
            command: Mutex::new(None),
            connection: AtomicU8::new(ConnectionState::Idle as u8),
        }
    }

    /// Replace the telemetry frame (simulation thread)
    pub fn publish_frame(&self, frame: TelemetryFrame) {
        // Records are Copy and replaced whole, so a poisoned lock still holds
        // a consistent value.
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = frame;
    }

    /// Latest telemetry frame (server thread)
    pub fn frame(&self) -> TelemetryFrame {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the paddle command (server thread)
    pub fn publish_command(&self, command: ControlCommand) {
        *self.command.lock().unwrap_or_else(PoisonError::into_inner) = Some(command);
    }

    /// Forget the last command once its controller is gone
    pub fn clear_command(&self) {
        *self.command.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Latest paddle command, if a controller has sent one (simulation thread)
    pub fn command(&self) -> Option<ControlCommand> {
        *self.command.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connection(&self) -> ConnectionState {
        ConnectionState::from_u8(self.connection.load(Ordering::Acquire))
    }

    pub(crate) fn set_connection(&self, state: ConnectionState) {
        self.connection.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_client_connected(&self) -> bool {
        self.connection() == ConnectionState::ClientConnected
    }
}
