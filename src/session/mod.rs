//! The [`RspSession`] type, which serves a single [`Target`] to GDB clients
//! over TCP using the Remote Serial Protocol.
//!
//! Clients are served one at a time. When a client goes away the session
//! returns to listening; only a failure of the listening socket itself ends
//! [`RspSession::run`].

use std::io;
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use log::{error, info, warn};

use crate::conn::ConnectionExt;
use crate::protocol::RecvPacketBlocking;
use crate::target::{Interrupt, Target};
use crate::trace::TraceFlags;

mod core_impl;
mod error;
mod state;

pub use error::SessionError;
pub use state::SessionState;

use core_impl::{SessionImpl, State};

/// Tunables for an [`RspSession`].
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Budget handed to each `Continue` call. Between slices the session
    /// checks for a client interrupt.
    pub resume_slice: Duration,
    /// Largest packet accepted from, and advertised to, the client.
    pub packet_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            resume_slice: Duration::from_millis(100),
            packet_buffer_size: 4096,
        }
    }
}

/// Describes why a client session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// GDB issued a detach (`D`)
    Disconnect,
    /// GDB issued a kill (`k`)
    Kill,
    /// The program exited with the given status
    TargetExited(u8),
    /// The connection was closed or reset by the client
    ConnectionClosed,
}

/// Serves a [`Target`] to GDB over TCP.
pub struct RspSession {
    port: u16,
    target: Box<dyn Target>,
    inner: SessionImpl,
    interrupt: Interrupt,
}

impl RspSession {
    /// Create a session that will listen on `port` once [`run`](Self::run)
    /// is called.
    pub fn new(port: u16, target: Box<dyn Target>, flags: TraceFlags) -> RspSession {
        let interrupt = Interrupt::new();
        RspSession {
            port,
            target,
            inner: SessionImpl::new(flags, SessionConfig::default(), interrupt.clone()),
            interrupt,
        }
    }

    /// Replace the default [`SessionConfig`].
    pub fn with_config(mut self, config: SessionConfig) -> RspSession {
        self.inner = SessionImpl::new(self.inner.flags(), config, self.interrupt.clone());
        self
    }

    /// A handle which can preempt a running `Continue` from another thread.
    /// The client sees the same `S02` stop it would get from Ctrl-C.
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Bind to `0.0.0.0:<port>` and serve clients until the listener fails.
    pub fn run(&mut self) -> Result<(), SessionError> {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).map_err(|source| {
            SessionError::Bind {
                port: self.port,
                source,
            }
        })?;
        self.run_with_listener(listener)
    }

    /// Serve clients accepted from an already bound `listener`.
    pub fn run_with_listener(&mut self, listener: TcpListener) -> Result<(), SessionError> {
        let flags = self.inner.flags();
        if !flags.silent() {
            match listener.local_addr() {
                Ok(addr) => info!("{}: listening for RSP on {}", self.target.name(), addr),
                Err(_) => info!("{}: listening for RSP on port {}", self.target.name(), self.port),
            }
        }

        loop {
            self.inner.transition(SessionState::Listening);
            let (mut stream, addr) = listener.accept().map_err(SessionError::Accept)?;
            self.inner.transition(SessionState::Connected);
            if !flags.silent() {
                info!("debugger connected from {}", addr);
            }

            match self.serve(&mut stream) {
                Ok(reason) => {
                    if !flags.silent() {
                        info!("debugger disconnected: {:?}", reason);
                    }
                }
                Err(e) => error!("session ended with an error: {}", e),
            }
            self.inner.transition(SessionState::Disconnected);
            close(stream);
        }
    }

    /// Run the packet loop for a single client until it disconnects.
    pub fn serve<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        conn: &mut C,
    ) -> Result<DisconnectReason, SessionError> {
        match self.serve_inner(conn) {
            Err(e) if e.is_disconnect() => Ok(DisconnectReason::ConnectionClosed),
            res => res,
        }
    }

    fn serve_inner<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        conn: &mut C,
    ) -> Result<DisconnectReason, SessionError> {
        conn.on_session_start()
            .map_err(SessionError::ConnectionInit)?;
        self.inner.begin_connection();

        let mut recv = RecvPacketBlocking::new(self.inner.config().packet_buffer_size);
        let mut packet_buffer = Vec::with_capacity(self.inner.config().packet_buffer_size);

        loop {
            let pkt = match self.inner.recv_packet(&mut recv, &mut packet_buffer, conn)? {
                Some(pkt) => pkt,
                None => continue,
            };

            match self.inner.handle_packet(&mut *self.target, conn, pkt)? {
                State::Pump => {}
                State::Disconnect(reason) => return Ok(reason),
            }
        }
    }
}

fn close(stream: TcpStream) {
    if let Err(e) = stream.shutdown(std::net::Shutdown::Both) {
        // the client usually got there first
        if e.kind() != io::ErrorKind::NotConnected {
            warn!("failed to shut down client socket: {}", e);
        }
    }
}
