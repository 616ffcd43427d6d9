//! Ball trajectory prediction
//!
//! Follows the ball's straight-line path from bounce to bounce until it
//! reaches the paddle plane, and turns the crossing point into the paddle
//! position that would intercept it. Runs once per simulation tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cast::{CircleCast, reflect};
use super::field::FieldGeometry;
use super::state::{BallState, PaddleState};
use crate::telemetry::TelemetryFrame;

/// Distance a reflected cast starts from the surface it bounced off
pub const CAST_CLEARANCE: f32 = 0.015;
/// Distance reported when no intercept is known
pub const NEUTRAL_DISTANCE: f32 = 0.5;
/// Desired position reported when the reflection budget runs out (mid-field)
pub const FALLBACK_DESIRED_POS: f32 = 0.5;

/// Predictor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Casts per prediction before giving up
    pub max_iterations: u32,
    /// Deadband height as a fraction of the field height
    pub distance_deadband_fraction: f32,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            distance_deadband_fraction: 0.5,
        }
    }
}

/// How the last prediction was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The path reaches the paddle plane after `bounces` reflections
    Intercept { bounces: u32 },
    /// The ball is not moving
    Stationary,
    /// No paddle-plane hit within the reflection budget
    Exhausted,
    /// A cast hit nothing; the previous frame was kept
    NoHit,
}

/// Paddle x mapped to [1, 0] from the left edge to the right edge.
///
/// A plain affine map: inputs outside the field give values outside [0, 1].
#[inline]
pub fn normalized_paddle_pos(x: f32, field: &FieldGeometry) -> f32 {
    1.0 - (x / field.width + 0.5)
}

/// 1 at the paddle plane, falling linearly to 0 at `dead_height` and staying
/// 0 above it.
#[inline]
pub fn inverse_deadband_distance(vertical_distance: f32, dead_height: f32) -> f32 {
    if vertical_distance >= dead_height {
        0.0
    } else {
        1.0 - vertical_distance.max(0.0) / dead_height
    }
}

/// Stateful predictor; remembers the last frame for ticks it cannot resolve
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
    field: FieldGeometry,
    last_frame: TelemetryFrame,
    last_outcome: Option<Outcome>,
}

impl Predictor {
    pub fn new(config: PredictorConfig, field: FieldGeometry) -> Self {
        Self {
            config,
            field,
            last_frame: TelemetryFrame::NEUTRAL,
            last_outcome: None,
        }
    }

    /// Replace the field after a resize
    pub fn set_field(&mut self, field: FieldGeometry) {
        self.field = field;
    }

    pub fn field(&self) -> &FieldGeometry {
        &self.field
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn last_frame(&self) -> TelemetryFrame {
        self.last_frame
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Compute this tick's telemetry frame
    pub fn predict<C>(&mut self, ball: &BallState, paddle: &PaddleState, caster: &C) -> TelemetryFrame
    where
        C: CircleCast + ?Sized,
    {
        let field = self.field;
        let actual = normalized_paddle_pos(paddle.x, &field);
        let contact = paddle.contact_point(ball.radius);
        let dead_height = self.config.distance_deadband_fraction * field.height;
        let inverse = inverse_deadband_distance(ball.pos.y - contact.y, dead_height);

        let Some(mut dir) = ball.vel.try_normalize() else {
            return self.finish(
                Outcome::Stationary,
                TelemetryFrame {
                    paddle_actual_pos: actual,
                    paddle_desired_pos: actual,
                    distance: NEUTRAL_DISTANCE,
                    inverse_deadband_distance: inverse,
                },
            );
        };

        let mut origin = ball.pos;

        for bounces in 0..self.config.max_iterations {
            let Some(hit) = caster.cast(origin, ball.radius, dir, field.diagonal) else {
                log::warn!(
                    "Trajectory cast from {origin} along {dir} hit nothing; keeping previous telemetry"
                );
                self.last_outcome = Some(Outcome::NoHit);
                return self.last_frame;
            };

            if hit.obstacle.is_paddle_plane() {
                let x_hit = field.clamp_x(hit.point.x);
                return self.finish(
                    Outcome::Intercept { bounces },
                    TelemetryFrame {
                        paddle_actual_pos: actual,
                        paddle_desired_pos: normalized_paddle_pos(x_hit, &field),
                        distance: ball.pos.distance(contact) / field.diagonal,
                        inverse_deadband_distance: inverse,
                    },
                );
            }

            dir = bounce_direction(dir, hit.normal);
            origin = hit.point + CAST_CLEARANCE * dir;
        }

        log::debug!(
            "No paddle intercept within {} reflections",
            self.config.max_iterations
        );
        self.finish(
            Outcome::Exhausted,
            TelemetryFrame {
                paddle_actual_pos: actual,
                paddle_desired_pos: FALLBACK_DESIRED_POS,
                distance: NEUTRAL_DISTANCE,
                inverse_deadband_distance: inverse,
            },
        )
    }

    fn finish(&mut self, outcome: Outcome, frame: TelemetryFrame) -> TelemetryFrame {
        self.last_outcome = Some(outcome);
        self.last_frame = frame;
        frame
    }
}

/// Direction after one bounce, renormalized
#[inline]
pub fn bounce_direction(dir: Vec2, normal: Vec2) -> Vec2 {
    reflect(dir, normal).normalize_or(dir)
}
