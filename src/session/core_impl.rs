use std::io;
use std::time::Duration;

use log::{debug, info, trace, warn};

use super::error::SessionError;
use super::state::{SessionState, StateTracker};
use super::{DisconnectReason, SessionConfig};
use crate::conn::ConnectionExt;
use crate::protocol::commands::Command;
use crate::protocol::{
    Packet, PacketParseError, RecvPacketBlocking, RecvPacketError, ResponseWriter,
    ResponseWriterError,
};
use crate::target::{Interrupt, ResumeResult, Target};
use crate::trace::TraceFlags;

/// Common imports used by the handler modules.
mod prelude {
    pub(super) use crate::conn::ConnectionExt;
    pub(super) use crate::protocol::ResponseWriter;
    pub(super) use crate::session::core_impl::{HandlerStatus, InternalError as Error, SessionImpl};
    pub(super) use crate::target::Target;
    pub(super) use std::io;
}

mod base;
mod breakpoints;
mod file_io;
mod monitor_cmd;
mod resume;

/// Generic failure.
pub(crate) const E_GENERIC: u8 = 0x01;
/// Bad address (`EFAULT`), used for short memory transfers.
pub(crate) const E_FAULT: u8 = 0x0e;

/// Errors raised while handling a single command.
#[derive(Debug)]
pub(crate) enum InternalError {
    Fatal(SessionError),
    /// Reply `E<code>` and carry on.
    NonFatal(u8),
}

impl From<SessionError> for InternalError {
    fn from(e: SessionError) -> Self {
        InternalError::Fatal(e)
    }
}

impl From<ResponseWriterError<io::Error>> for InternalError {
    fn from(e: ResponseWriterError<io::Error>) -> Self {
        InternalError::Fatal(e.into())
    }
}

pub(crate) enum HandlerStatus {
    Handled,
    NeedsOk,
    /// Send nothing back, not even an empty packet.
    NoReply,
    Disconnect(DisconnectReason),
}

pub(crate) enum State {
    Pump,
    Disconnect(DisconnectReason),
}

/// Protocol state that outlives a single packet.
pub(crate) struct SessionImpl {
    flags: TraceFlags,
    config: SessionConfig,
    interrupt: Interrupt,
    state: StateTracker,

    /// Length of each `Continue` slice. Starts at `config.resume_slice`, and
    /// can be changed for the current connection with `monitor timeout`.
    resume_slice: Duration,
    no_ack_mode: bool,
    /// The last frame sent, kept for retransmission.
    last_frame: Vec<u8>,
    /// Cleared when a reset fails, until one succeeds.
    target_usable: bool,
}

impl SessionImpl {
    pub fn new(flags: TraceFlags, config: SessionConfig, interrupt: Interrupt) -> SessionImpl {
        SessionImpl {
            flags,
            config,
            interrupt,
            state: StateTracker::new(flags.trace_conn()),
            resume_slice: config.resume_slice,
            no_ack_mode: false,
            last_frame: Vec::new(),
            target_usable: true,
        }
    }

    pub fn flags(&self) -> TraceFlags {
        self.flags
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn transition(&mut self, next: SessionState) {
        self.state.transition(next)
    }

    /// Reset per-connection protocol state.
    pub fn begin_connection(&mut self) {
        self.no_ack_mode = false;
        self.last_frame.clear();
        self.resume_slice = self.config.resume_slice;
        self.interrupt.take();
        self.transition(SessionState::Idle);
    }

    fn response_writer<'a, C: ConnectionExt<Error = io::Error>>(
        &self,
        conn: &'a mut C,
    ) -> ResponseWriter<'a, C> {
        ResponseWriter::new(conn, self.flags.trace_rsp())
    }

    /// Reset the target, tracking whether it is still usable.
    fn reset_target(&mut self, target: &mut dyn Target) -> ResumeResult {
        let res = target.reset();
        self.target_usable = res == ResumeResult::Success;
        if !self.target_usable {
            warn!(
                "{}: reset failed, refusing target commands until a reset succeeds",
                target.name()
            );
        }
        res
    }

    fn ensure_usable(&self) -> Result<(), InternalError> {
        match self.target_usable {
            true => Ok(()),
            false => Err(InternalError::NonFatal(E_GENERIC)),
        }
    }

    fn ack<C: ConnectionExt<Error = io::Error>>(&self, conn: &mut C) -> Result<(), SessionError> {
        if !self.no_ack_mode {
            conn.write(b'+').map_err(SessionError::ConnectionWrite)?;
            conn.flush().map_err(SessionError::ConnectionWrite)?;
        }
        Ok(())
    }

    fn nack<C: ConnectionExt<Error = io::Error>>(&self, conn: &mut C) -> Result<(), SessionError> {
        if !self.no_ack_mode {
            conn.write(b'-').map_err(SessionError::ConnectionWrite)?;
            conn.flush().map_err(SessionError::ConnectionWrite)?;
        }
        Ok(())
    }

    fn retransmit<C: ConnectionExt<Error = io::Error>>(
        &self,
        conn: &mut C,
    ) -> Result<(), SessionError> {
        if self.last_frame.is_empty() {
            debug!("client NAK'd, but nothing has been sent yet");
            return Ok(());
        }

        if self.flags.trace_rsp() {
            trace!("--> {} (retransmit)", String::from_utf8_lossy(&self.last_frame));
        }
        conn.write_all(&self.last_frame)
            .map_err(SessionError::ConnectionWrite)?;
        conn.flush().map_err(SessionError::ConnectionWrite)
    }

    /// Read the next packet from `conn`. A packet too big for the packet
    /// buffer gets an empty reply and yields `None`.
    pub fn recv_packet<'b, C: ConnectionExt<Error = io::Error>>(
        &mut self,
        recv: &mut RecvPacketBlocking,
        buf: &'b mut Vec<u8>,
        conn: &mut C,
    ) -> Result<Option<&'b mut [u8]>, SessionError> {
        match recv.recv(buf, || conn.read()) {
            Ok(pkt) => Ok(Some(pkt)),
            Err(RecvPacketError::Capacity(n)) => {
                warn!("packet too big for the {} byte packet buffer, discarding", n);
                self.ack(conn)?;
                self.last_frame = self.response_writer(conn).flush()?;
                Ok(None)
            }
            Err(RecvPacketError::Connection(e)) => Err(SessionError::ConnectionRead(e)),
        }
    }

    /// Parse and act on a single raw packet.
    pub fn handle_packet<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        target: &mut dyn Target,
        conn: &mut C,
        pkt: &mut [u8],
    ) -> Result<State, SessionError> {
        if self.flags.trace_rsp() {
            trace!("<-- {}", String::from_utf8_lossy(pkt));
        }

        let packet = match Packet::from_buf(pkt) {
            Ok(packet) => packet,
            Err(e) => {
                self.handle_parse_error(conn, e)?;
                return Ok(State::Pump);
            }
        };

        match packet {
            Packet::Ack => Ok(State::Pump),
            Packet::Nack => {
                self.retransmit(conn)?;
                Ok(State::Pump)
            }
            Packet::Interrupt => {
                debug!("<-- interrupt packet while stopped, ignoring");
                Ok(State::Pump)
            }
            Packet::Command(command) => self.respond(target, conn, command),
        }
    }

    fn handle_parse_error<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        conn: &mut C,
        e: PacketParseError,
    ) -> Result<(), SessionError> {
        if e.is_framing_error() {
            warn!("damaged packet: {:?}", e);
            return self.nack(conn);
        }

        match e {
            PacketParseError::MalformedCommand(e) => {
                info!("malformed command: {:?}", e);
                self.ack(conn)?;
                self.last_frame = self.response_writer(conn).flush()?;
            }
            e => debug!("discarding unexpected input: {:?}", e),
        }
        Ok(())
    }

    /// Acknowledge `command`, run it, and send its reply.
    fn respond<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        target: &mut dyn Target,
        conn: &mut C,
        command: Command<'_>,
    ) -> Result<State, SessionError> {
        self.ack(conn)?;

        let mut res = self.response_writer(conn);
        let disconnect_reason = match self.handle_command(&mut res, target, command) {
            Ok(HandlerStatus::Handled) => None,
            Ok(HandlerStatus::NeedsOk) => {
                res.write_str("OK")?;
                None
            }
            Ok(HandlerStatus::NoReply) => return Ok(State::Pump),
            Ok(HandlerStatus::Disconnect(reason)) => Some(reason),
            Err(InternalError::NonFatal(code)) => {
                res.write_str("E")?;
                res.write_num(code)?;
                None
            }
            Err(InternalError::Fatal(e)) => return Err(e),
        };

        // a kill packet gets no reply
        if disconnect_reason != Some(DisconnectReason::Kill) {
            self.last_frame = res.flush()?;
        }

        Ok(match disconnect_reason {
            Some(reason) => State::Disconnect(reason),
            None => State::Pump,
        })
    }

    fn handle_command<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        command: Command<'_>,
    ) -> Result<HandlerStatus, InternalError> {
        match command {
            Command::qRcmd(cmd) => self.handle_monitor_cmd(res, target, cmd),
            Command::Z(cmd) => self.handle_insert_matchpoint(target, cmd.0),
            Command::z(cmd) => self.handle_remove_matchpoint(target, cmd.0),

            Command::c(cmd) => self.handle_continue(res, target, cmd.addr),
            Command::C(cmd) => {
                debug!("C{:02x}: signals are not delivered, continuing", cmd.sig);
                self.handle_continue(res, target, cmd.addr)
            }
            Command::s(cmd) => self.handle_step(res, target, cmd.addr),
            Command::S(cmd) => {
                debug!("S{:02x}: signals are not delivered, stepping", cmd.sig);
                self.handle_step(res, target, cmd.addr)
            }
            Command::vCont(cmd) => self.handle_vcont(res, target, cmd),

            Command::F(_) => {
                debug!("File-I/O reply with no request outstanding");
                Ok(HandlerStatus::Handled)
            }
            Command::Unknown(cmd) => {
                info!("Unknown command: {}", String::from_utf8_lossy(cmd));
                Ok(HandlerStatus::Handled)
            }

            command => self.handle_base(res, target, command),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conn::Connection;
    use std::collections::VecDeque;

    /// An in-memory connection. Reads drain `input`, writes append to
    /// `output`, and reading past the end reports a closed connection.
    #[derive(Default)]
    pub(crate) struct MockConnection {
        pub input: VecDeque<u8>,
        pub output: Vec<u8>,
    }

    impl MockConnection {
        pub fn new(input: &[u8]) -> MockConnection {
            MockConnection {
                input: input.iter().copied().collect(),
                output: Vec::new(),
            }
        }

        /// The payloads of every `$...#xx` packet written so far.
        pub fn replies(&self) -> Vec<String> {
            let out = String::from_utf8_lossy(&self.output).into_owned();
            out.split('$')
                .skip(1)
                .map(|s| s.split('#').next().unwrap_or("").to_string())
                .collect()
        }
    }

    impl Connection for MockConnection {
        type Error = io::Error;

        fn write(&mut self, byte: u8) -> io::Result<()> {
            self.output.push(byte);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ConnectionExt for MockConnection {
        fn read(&mut self) -> io::Result<u8> {
            self.input
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
        }

        fn peek(&mut self) -> io::Result<Option<u8>> {
            Ok(self.input.front().copied())
        }
    }

    /// Frame `body` as a packet, computing its checksum.
    pub(crate) fn packet(body: &str) -> Vec<u8> {
        crate::protocol::frame(body.as_bytes())
    }
}
