//! The closed control loop
//!
//! ```text
//! controller --command--> paddle --physics--> ball --predict--> telemetry --> controller
//! ```
//!
//! [`ControlLoop`] owns the predictor and the telemetry server. The physics
//! step is injected through [`Simulation`], so the loop runs the same against
//! the headless arena or any other engine that can cast a circle.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{ServerError, SettingsError};
use crate::settings::Settings;
use crate::sim::{BallState, CircleCast, FieldGeometry, PaddleState, Predictor};
use crate::telemetry::{ServerConfig, TelemetryFrame, TelemetryServer, TelemetryState};

/// Physics the control loop drives once per tick
pub trait Simulation: CircleCast {
    /// Advance by `dt` seconds with the paddle moving at `paddle_velocity`
    /// (field units per second, positive to the right)
    fn step(&mut self, dt: f32, paddle_velocity: f32);
    fn ball(&self) -> BallState;
    fn paddle(&self) -> PaddleState;
}

pub struct ControlLoop {
    predictor: Predictor,
    telemetry: Arc<TelemetryState>,
    server: TelemetryServer,
    paddle_speed: f32,
    paddle_force: f32,
}

impl ControlLoop {
    pub fn new(settings: &Settings, field: FieldGeometry) -> Result<Self, SettingsError> {
        settings.validate()?;
        let telemetry = Arc::new(TelemetryState::new());
        let server = TelemetryServer::new(ServerConfig::from_settings(settings)?, telemetry.clone());
        Ok(Self {
            predictor: Predictor::new(settings.predictor_config(), field),
            telemetry,
            server,
            paddle_speed: settings.paddle_speed,
            paddle_force: settings.paddle_force,
        })
    }

    /// Start accepting a controller
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        self.server.start()
    }

    /// Stop the telemetry server; the loop keeps ticking on local input
    pub fn stop(&mut self) -> Result<(), ServerError> {
        self.server.stop()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn telemetry(&self) -> &Arc<TelemetryState> {
        &self.telemetry
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Apply a field resize
    pub fn set_field(&mut self, field: FieldGeometry) {
        self.predictor.set_field(field);
    }

    /// Paddle velocity for this tick.
    ///
    /// With a controller connected its command `c` maps linearly onto
    /// `[+force, -force]` (0 drives right, 1 drives left). Otherwise the
    /// local axis in [-1, 1] is used.
    pub fn paddle_velocity(&self, local_axis: f32) -> f32 {
        let drive = match self.telemetry.command() {
            Some(command) if self.telemetry.is_client_connected() => {
                self.paddle_force * (1.0 - 2.0 * command.value())
            }
            _ => 2.0 * local_axis.clamp(-1.0, 1.0),
        };
        drive * self.paddle_speed
    }

    /// One simulation tick: actuate, step physics, predict, publish
    pub fn tick<S: Simulation>(&mut self, sim: &mut S, dt: f32, local_axis: f32) -> TelemetryFrame {
        let velocity = self.paddle_velocity(local_axis);
        sim.step(dt, velocity);
        let frame = self.predictor.predict(&sim.ball(), &sim.paddle(), &*sim);
        self.telemetry.publish_frame(frame);
        frame
    }

    /// One-line link status
    pub fn status(&self) -> String {
        match self.telemetry.command() {
            Some(command) if self.telemetry.is_client_connected() => {
                let drive = self.paddle_force * (1.0 - 2.0 * command.value());
                format!("Command = {drive:+.1}")
            }
            _ if self.telemetry.is_client_connected() => "Client connected.".to_string(),
            _ => "No client connected.".to_string(),
        }
    }
}
