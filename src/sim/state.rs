//! Ball and paddle snapshots consumed by the predictor
//!
//! The physics step owns the live values; the predictor only ever sees a copy
//! taken after the step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Ball snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

impl BallState {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self { pos, vel, radius }
    }

    /// True between respawn and launch
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.vel == Vec2::ZERO
    }
}

/// Paddle snapshot
///
/// The paddle only moves horizontally; `y` and `height` describe the box it
/// occupies so the predictor can find the point the ball touches its top face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleState {
    /// Center x
    pub x: f32,
    /// Center y
    pub y: f32,
    /// Full height
    pub height: f32,
}

impl PaddleState {
    pub fn new(x: f32, y: f32, height: f32) -> Self {
        Self { x, y, height }
    }

    /// Y of the paddle's top face
    #[inline]
    pub fn top(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Where the ball center sits when resting on the middle of the paddle
    #[inline]
    pub fn contact_point(&self, ball_radius: f32) -> Vec2 {
        Vec2::new(self.x, self.top() + ball_radius)
    }
}
