//! Controller-side end of the link
//!
//! Speaks the same cadence the server expects: write one command, read one
//! frame.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use super::TelemetryFrame;
use super::wire::{self, DISCONNECT_SENTINEL, FrameLayout};

pub struct ControllerClient {
    stream: TcpStream,
    layout: FrameLayout,
}

impl ControllerClient {
    pub fn connect(addr: SocketAddr, layout: FrameLayout) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream, layout })
    }

    /// Bound how long `exchange` waits for a frame
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Send a command and wait for the telemetry frame that answers it
    pub fn exchange(&mut self, command: f32) -> io::Result<TelemetryFrame> {
        self.stream.write_all(&wire::encode_command(command))?;
        let mut buf = vec![0u8; self.layout.frame_len()];
        self.stream.read_exact(&mut buf)?;
        wire::decode_frame(&buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    /// Ask the server to end the session; no frame follows
    pub fn disconnect(mut self) -> io::Result<()> {
        self.stream.write_all(&wire::encode_command(DISCONNECT_SENTINEL))?;
        self.stream.flush()
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}
