//! Error types for field setup, settings and the telemetry server

use std::{error::Error, fmt::Display, io};

/// Field geometry could not be derived from the scene obstacles
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A required obstacle was not supplied
    MissingObstacle(&'static str),
    /// The obstacles leave no usable play area
    NonPositiveDimension { width: f32, height: f32 },
}

impl Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::MissingObstacle(name) => write!(f, "missing field obstacle: {name}"),
            GeometryError::NonPositiveDimension { width, height } => {
                write!(f, "field dimensions must be positive (width {width}, height {height})")
            }
        }
    }
}

impl Error for GeometryError {}

/// Settings file could not be loaded or holds unusable values
#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(err) => write!(f, "failed to read settings: {err}"),
            SettingsError::Parse(err) => write!(f, "failed to parse settings: {err}"),
            SettingsError::Invalid(reason) => write!(f, "invalid settings: {reason}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SettingsError::Io(source) => Some(source),
            SettingsError::Parse(source) => Some(source),
            SettingsError::Invalid(_) => None,
        }
    }
}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        SettingsError::Io(err)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Parse(err)
    }
}

/// Socket-level fault in the telemetry server. Fatal for the server instance.
#[derive(Debug)]
pub enum ServerError {
    /// The listener could not be bound
    Bind { addr: String, source: io::Error },
    /// `start` was called while the serve thread is alive
    AlreadyRunning,
    /// The serve thread could not be spawned
    Spawn(io::Error),
    /// Accept, read or write failed outside a normal disconnect
    Io(io::Error),
}

impl ServerError {
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        ServerError::Bind {
            addr: addr.into(),
            source,
        }
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
            ServerError::AlreadyRunning => f.write_str("telemetry server already running"),
            ServerError::Spawn(err) => write!(f, "failed to spawn serve thread: {err}"),
            ServerError::Io(err) => write!(f, "telemetry socket fault: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServerError::Bind { source, .. } => Some(source),
            ServerError::Spawn(source) | ServerError::Io(source) => Some(source),
            ServerError::AlreadyRunning => None,
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::Io(err)
    }
}

