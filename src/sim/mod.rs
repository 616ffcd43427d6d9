//! Field geometry, swept-circle casting, trajectory prediction and the
//! headless arena the predictor runs against.
//!
//! Nothing here touches the network; the predictor's output is handed to the
//! telemetry layer by [`crate::control::ControlLoop`].

pub mod arena;
pub mod cast;
pub mod field;
pub mod predictor;
pub mod state;

pub use arena::{Arena, BallPhase};
pub use cast::{BoxWorld, CircleCast, HitResult, Obstacle, ObstacleKind, reflect};
pub use field::{Bounds, FieldGeometry, FieldObstacles};
pub use predictor::{
    Outcome, Predictor, PredictorConfig, bounce_direction, inverse_deadband_distance,
    normalized_paddle_pos,
};
pub use state::{BallState, PaddleState};
