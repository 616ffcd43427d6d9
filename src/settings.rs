//! Runtime settings
//!
//! Loaded from an optional JSON file; any field left out keeps its default.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::sim::PredictorConfig;

/// Control-loop and gameplay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Controller link ===
    /// Address the telemetry server listens on
    pub tcp_address: String,
    /// Port the telemetry server listens on (0 picks a free port)
    pub tcp_port: u16,
    /// Sleep between command/telemetry exchanges
    pub tcp_read_write_interval_ms: u64,
    /// Idle accept-poll interval, as a multiple of the exchange interval
    pub idle_poll_multiplier: u32,
    /// Send the inverse-deadband distance as a 4th telemetry field
    pub include_deadband_field: bool,

    // === Predictor ===
    /// Reflection budget per prediction
    pub max_iterations: u32,
    /// Deadband height as a fraction of the field height (0, 1]
    pub distance_deadband_fraction: f32,

    // === Gameplay ===
    /// Paddle speed scale (field units per second per unit of input)
    pub paddle_speed: f32,
    /// Gain applied to the remote paddle command
    pub paddle_force: f32,
    /// Ball launch speed (field units per second)
    pub ball_speed: f32,
    /// Launch aperture either side of vertical, in degrees
    pub ball_start_max_angle_deg: f32,
    /// Time the ball rests above the paddle before launching
    pub respawn_delay_secs: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tcp_address: "127.0.0.1".to_string(),
            tcp_port: 60000,
            // same rate the external controller writes at
            tcp_read_write_interval_ms: 25,
            idle_poll_multiplier: 5,
            include_deadband_field: true,

            max_iterations: 15,
            distance_deadband_fraction: 0.5,

            paddle_speed: 10.0,
            paddle_force: 2.0,
            ball_speed: 10.0,
            ball_start_max_angle_deg: 10.0,
            respawn_delay_secs: 1.5,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file and validate them
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject values the control loop cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |reason: &str| Err(SettingsError::Invalid(reason.to_string()));

        if self.tcp_read_write_interval_ms == 0 {
            return invalid("tcp_read_write_interval_ms must be non-zero");
        }
        if self.idle_poll_multiplier == 0 {
            return invalid("idle_poll_multiplier must be non-zero");
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be non-zero");
        }
        if !(self.distance_deadband_fraction > 0.0 && self.distance_deadband_fraction <= 1.0) {
            return invalid("distance_deadband_fraction must be in (0, 1]");
        }
        if !(self.paddle_speed > 0.0 && self.ball_speed > 0.0) {
            return invalid("paddle_speed and ball_speed must be positive");
        }
        if self.respawn_delay_secs < 0.0 {
            return invalid("respawn_delay_secs must not be negative");
        }
        Ok(())
    }

    /// Resolve the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        (self.tcp_address.as_str(), self.tcp_port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                SettingsError::Invalid(format!("cannot resolve {}", self.tcp_address))
            })
    }

    /// Exchange interval of the telemetry server
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.tcp_read_write_interval_ms)
    }

    /// Predictor parameters
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            max_iterations: self.max_iterations,
            distance_deadband_fraction: self.distance_deadband_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cycle_interval(), Duration::from_millis(25));
        assert_eq!(settings.predictor_config().max_iterations, 15);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "tcp_port": 61000, "max_iterations": 8 }"#).unwrap();
        assert_eq!(settings.tcp_port, 61000);
        assert_eq!(settings.max_iterations, 8);
        assert_eq!(settings.tcp_address, "127.0.0.1");
        assert_eq!(settings.tcp_read_write_interval_ms, 25);
    }

    #[test]
    fn test_validate_rejects_bad_deadband() {
        let settings = Settings {
            distance_deadband_fraction: 0.0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

        let settings = Settings {
            distance_deadband_fraction: 1.5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let settings = Settings {
            tcp_read_write_interval_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let settings = Settings {
            tcp_port: 0,
            ..Default::default()
        };
        let addr = settings.socket_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load("/nonexistent/breakout-link.json");
        assert!(matches!(result, Err(SettingsError::Io(_))));
    }
}
