//! Single-controller telemetry server
//!
//! Runs on its own thread, independent of the simulation rate:
//!
//! ```text
//! Idle --start--> Listening --accept--> ClientConnected
//!                     ^                        |
//!                     +---- EOF / sentinel ----+
//! Listening --stop--> Idle
//! ```
//!
//! The listener is polled rather than blocked on, so only one controller is
//! served at a time; a second one waits in the backlog until the first leaves.
//! Each session is a strict exchange: read one command, write one frame,
//! sleep one cycle.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, Builder, JoinHandle};
use std::time::Duration;

use super::wire::{self, COMMAND_LEN, Command, FrameLayout};
use super::{ConnectionState, TelemetryState};
use crate::error::{ServerError, SettingsError};
use crate::settings::Settings;

/// How many cycle intervals `stop` waits for the serve thread
pub const JOIN_TIMEOUT_CYCLES: u32 = 10;

/// Server parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub cycle_interval: Duration,
    pub idle_poll_multiplier: u32,
    pub layout: FrameLayout,
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        Ok(Self {
            addr: settings.socket_addr()?,
            cycle_interval: settings.cycle_interval(),
            idle_poll_multiplier: settings.idle_poll_multiplier,
            layout: FrameLayout::from_settings(settings.include_deadband_field),
        })
    }

    fn idle_poll_interval(&self) -> Duration {
        self.cycle_interval * self.idle_poll_multiplier.max(1)
    }
}

/// Why a controller session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The controller closed its stream
    Eof,
    /// The controller sent the disconnect sentinel
    Sentinel,
    /// The stream ended partway through a command
    ProtocolViolation { received: usize },
    /// The connection was reset or broken mid-exchange
    Disconnected(ErrorKind),
    /// The server is stopping
    Cancelled,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Eof => write!(f, "stream closed"),
            SessionEnd::Sentinel => write!(f, "disconnect requested"),
            SessionEnd::ProtocolViolation { received } => {
                write!(f, "short command ({received} of {COMMAND_LEN} bytes)")
            }
            SessionEnd::Disconnected(kind) => write!(f, "connection lost ({kind})"),
            SessionEnd::Cancelled => write!(f, "server stopping"),
        }
    }
}

/// State shared between the owner and the serve thread
struct Shared {
    config: ServerConfig,
    telemetry: Arc<TelemetryState>,
    cancel: AtomicBool,
    /// Taken and dropped by `stop` whether or not the thread joins
    listener: Mutex<Option<TcpListener>>,
    /// Clone of the live client stream so `stop` can unblock a pending read
    active_client: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn new(
        config: ServerConfig,
        telemetry: Arc<TelemetryState>,
        listener: Option<TcpListener>,
    ) -> Self {
        Self {
            config,
            telemetry,
            cancel: AtomicBool::new(false),
            listener: Mutex::new(listener),
            active_client: Mutex::new(None),
        }
    }

    fn release_listener(&self) {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Telemetry server with an explicit start/stop lifecycle
pub struct TelemetryServer {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
    done: Option<mpsc::Receiver<()>>,
    local_addr: Option<SocketAddr>,
}

impl TelemetryServer {
    pub fn new(config: ServerConfig, telemetry: Arc<TelemetryState>) -> Self {
        Self {
            shared: Arc::new(Shared::new(config, telemetry, None)),
            handle: None,
            done: None,
            local_addr: None,
        }
    }

    /// Bind the listener and spawn the serve thread. Returns the bound address.
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }
        // reap a thread that ended on its own
        if let Some(handle) = self.handle.take() {
            reap(handle);
        }

        let addr = self.shared.config.addr;
        let listener =
            TcpListener::bind(addr).map_err(|err| ServerError::bind(addr.to_string(), err))?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        // a fresh record per run, so a detached thread from an earlier run
        // never sees this listener or a reset cancel flag
        self.shared = Arc::new(Shared::new(
            self.shared.config.clone(),
            self.shared.telemetry.clone(),
            Some(listener),
        ));
        self.shared.telemetry.set_connection(ConnectionState::Listening);
        log::info!("Telemetry server listening on {local_addr}");

        let (done_tx, done_rx) = mpsc::channel();
        let shared = self.shared.clone();
        let handle = Builder::new()
            .name("telemetry-server".to_string())
            .spawn(move || {
                let result = serve(&shared);
                shared.release_listener();
                if let Err(err) = &result {
                    log::error!("Telemetry server aborted: {err}");
                }
                shared.telemetry.set_connection(ConnectionState::Idle);
                let _ = done_tx.send(());
                result
            })
            .map_err(|err| {
                self.shared.release_listener();
                self.shared.telemetry.set_connection(ConnectionState::Idle);
                ServerError::Spawn(err)
            })?;

        self.handle = Some(handle);
        self.done = Some(done_rx);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Signal cancellation, unblock any pending read and wait a bounded time
    /// for the serve thread. Returns the fault that ended the thread, if any.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.shared.cancel.store(true, Ordering::SeqCst);
        if let Some(stream) = self
            .shared
            .active_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = stream.shutdown(Shutdown::Both);
        }

        let timeout = self.shared.config.cycle_interval * JOIN_TIMEOUT_CYCLES;
        let finished = match self.done.take() {
            Some(done) => !matches!(done.recv_timeout(timeout), Err(RecvTimeoutError::Timeout)),
            None => true,
        };

        self.local_addr = None;
        // release the port even if the thread is still winding down
        self.shared.release_listener();
        if !finished {
            // The client stream is shut down and the listener is gone, so the
            // thread exits on its next cancellation check.
            log::warn!("Telemetry server did not stop within {timeout:?}; detaching");
            self.shared.telemetry.set_connection(ConnectionState::Idle);
            return Ok(());
        }

        match handle.join() {
            Ok(result) => result,
            Err(_) => {
                log::error!("Telemetry server thread panicked");
                self.shared.telemetry.set_connection(ConnectionState::Idle);
                Ok(())
            }
        }
    }

    /// True while the serve thread is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn telemetry(&self) -> &Arc<TelemetryState> {
        &self.shared.telemetry
    }
}

impl Drop for TelemetryServer {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::warn!("Telemetry server ended with error: {err}");
        }
    }
}

/// Accept-poll loop. Returns on cancellation; socket faults are fatal.
fn serve(shared: &Shared) -> Result<(), ServerError> {
    let idle_poll = shared.config.idle_poll_interval();

    while !shared.cancelled() {
        let accepted = {
            let listener = shared
                .listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match listener.as_ref() {
                Some(listener) => listener.accept(),
                None => break,
            }
        };
        match accepted {
            Ok((stream, peer)) => {
                log::info!("Controller connected from {peer}");
                let end = run_session(stream, shared)?;
                match end {
                    SessionEnd::ProtocolViolation { .. } => {
                        log::warn!("Controller {peer} dropped: {end}")
                    }
                    _ => log::info!("Controller {peer} disconnected: {end}"),
                }
                shared.telemetry.set_connection(ConnectionState::Listening);
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(idle_poll),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            // the peer gave up before we got to it
            Err(err) if is_disconnect(&err) => {
                log::debug!("Pending controller vanished before accept: {err}")
            }
            Err(err) => return Err(err.into()),
        }
    }

    log::info!("Telemetry server stopped");
    Ok(())
}

/// Drive one controller until it leaves. Only socket faults are errors.
fn run_session(stream: TcpStream, shared: &Shared) -> Result<SessionEnd, ServerError> {
    // accepted sockets may inherit the listener's non-blocking mode
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;

    {
        let mut active = shared
            .active_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if shared.cancelled() {
            return Ok(SessionEnd::Cancelled);
        }
        *active = Some(stream.try_clone()?);
    }
    shared.telemetry.set_connection(ConnectionState::ClientConnected);

    let mut stream = stream;
    let result = exchange(&mut stream, shared);

    shared
        .active_client
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    shared.telemetry.clear_command();
    result
}

fn exchange(stream: &mut TcpStream, shared: &Shared) -> Result<SessionEnd, ServerError> {
    let mut buf = [0u8; COMMAND_LEN];

    loop {
        match read_command(stream, &mut buf) {
            // `stop` shuts the stream down, which reads as a clean close
            Ok(0) if shared.cancelled() => return Ok(SessionEnd::Cancelled),
            Ok(0) => return Ok(SessionEnd::Eof),
            Ok(COMMAND_LEN) => {}
            Ok(received) => return Ok(SessionEnd::ProtocolViolation { received }),
            Err(err) if is_disconnect(&err) => return Ok(SessionEnd::Disconnected(err.kind())),
            // shutdown from `stop` can surface as an error on some platforms
            Err(_) if shared.cancelled() => return Ok(SessionEnd::Cancelled),
            Err(err) => return Err(err.into()),
        }

        match wire::decode_command(buf) {
            Command::Disconnect => return Ok(SessionEnd::Sentinel),
            Command::Set(command) => {
                log::trace!("Controller command {}", command.value());
                shared.telemetry.publish_command(command);
            }
        }

        // One write_all per frame: the frame goes out whole or the session ends.
        let frame = wire::encode_frame(&shared.telemetry.frame(), shared.config.layout);
        match stream.write_all(&frame) {
            Ok(()) => {}
            Err(err) if is_disconnect(&err) => return Ok(SessionEnd::Disconnected(err.kind())),
            Err(_) if shared.cancelled() => return Ok(SessionEnd::Cancelled),
            Err(err) => return Err(err.into()),
        }

        thread::sleep(shared.config.cycle_interval);
        if shared.cancelled() {
            return Ok(SessionEnd::Cancelled);
        }
    }
}

/// Read one command with a single read. Returns the byte count: 0 on a clean
/// close; anything short of `COMMAND_LEN` is a protocol violation. Only
/// interrupted reads are retried.
fn read_command(stream: &mut impl Read, buf: &mut [u8; COMMAND_LEN]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            result => return result,
        }
    }
}

/// Join a serve thread that already finished. Its fault was logged on exit.
fn reap(handle: JoinHandle<Result<(), ServerError>>) {
    match handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::debug!("Previous telemetry server run ended with: {err}"),
        Err(_) => log::warn!("Previous telemetry server thread panicked"),
    }
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}
