use std::time::Instant;

use log::{debug, info};

use super::file_io::SyscallOutcome;
use super::prelude::*;
use super::E_GENERIC;
use crate::protocol::commands::_vCont::{vCont, VContKind};
use crate::session::error::SessionError;
use crate::session::state::SessionState;
use crate::session::DisconnectReason;
use crate::target::{ResumeKind, ResumeRequest, ResumeResult, SyscallInfo, PC_REGNUM};

const SIGINT: u8 = 2;
const SIGTRAP: u8 = 5;

/// How a resume finished, from the client's point of view.
enum StopReason {
    Signal(u8),
    Exited(u8),
}

impl SessionImpl {
    pub(super) fn handle_continue<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        addr: Option<u32>,
    ) -> Result<HandlerStatus, Error> {
        self.resume_at(res, target, ResumeKind::Continue, addr)
    }

    pub(super) fn handle_step<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        addr: Option<u32>,
    ) -> Result<HandlerStatus, Error> {
        self.resume_at(res, target, ResumeKind::Step, addr)
    }

    pub(super) fn handle_vcont<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        cmd: vCont<'_>,
    ) -> Result<HandlerStatus, Error> {
        // Single threaded: the first action that applies wins, and with only
        // one thread the first action always applies.
        let action = match cmd.actions.into_iter().next() {
            Some(Some(action)) => action,
            _ => return Err(Error::NonFatal(E_GENERIC)),
        };

        let kind = match action.kind {
            VContKind::Continue | VContKind::ContinueWithSig(_) => ResumeKind::Continue,
            VContKind::Step | VContKind::StepWithSig(_) => ResumeKind::Step,
            VContKind::Stop => {
                // the target is already stopped
                res.write_str("S")?;
                res.write_num(SIGINT)?;
                return Ok(HandlerStatus::Handled);
            }
        };

        self.resume_at(res, target, kind, None)
    }

    fn resume_at<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        kind: ResumeKind,
        addr: Option<u32>,
    ) -> Result<HandlerStatus, Error> {
        self.ensure_usable()?;

        if let Some(addr) = addr {
            target
                .write_register(PC_REGNUM, addr)
                .ok_or(Error::NonFatal(E_GENERIC))?;
        }

        self.transition(SessionState::Executing);
        let stop = self.run_target(res, target, kind);
        self.transition(SessionState::Idle);

        match stop? {
            StopReason::Signal(sig) => {
                res.write_str("S")?;
                res.write_num(sig)?;
                Ok(HandlerStatus::Handled)
            }
            StopReason::Exited(code) => {
                info!("target exited with status {}", code);
                res.write_str("W")?;
                res.write_num(code)?;
                target.terminate();
                self.reset_target(target);
                Ok(HandlerStatus::Disconnect(DisconnectReason::TargetExited(code)))
            }
        }
    }

    /// Drive the target until it stops, servicing interrupts and host
    /// syscalls along the way.
    fn run_target<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        kind: ResumeKind,
    ) -> Result<StopReason, Error> {
        let mut slice_start = Instant::now();

        loop {
            let mut syscall = SyscallInfo::new();
            let request = ResumeRequest::new(kind)
                .with_timeout(self.resume_slice)
                .with_syscall(&mut syscall)
                .with_interrupt(&self.interrupt);

            let result = target.resume(request);
            if self.flags.trace_exec() {
                debug!("resume({:?}) -> {:?}", kind, result);
            }

            match result {
                ResumeResult::Timeout if kind == ResumeKind::Step => {
                    return Ok(StopReason::Signal(SIGTRAP))
                }
                ResumeResult::Timeout => {
                    if self.interrupt.take() {
                        return Ok(self.stop_target(target));
                    }
                    if slice_start.elapsed() >= self.resume_slice {
                        slice_start = Instant::now();
                        if self.poll_ctrl_c(res.as_conn())? {
                            return Ok(self.stop_target(target));
                        }
                    }
                }
                ResumeResult::Interrupted => {
                    let request = match syscall.take() {
                        Some(request) => request,
                        None => return Ok(StopReason::Signal(SIGTRAP)),
                    };

                    match self.handle_syscall(res, target, request)? {
                        SyscallOutcome::Resume if kind == ResumeKind::Step => {
                            return Ok(StopReason::Signal(SIGTRAP))
                        }
                        SyscallOutcome::Resume => {}
                        SyscallOutcome::Interrupted => return Ok(self.stop_target(target)),
                        SyscallOutcome::Exited(code) => return Ok(StopReason::Exited(code)),
                    }
                }
                ResumeResult::None | ResumeResult::Success => {
                    return Ok(StopReason::Signal(SIGTRAP))
                }
                ResumeResult::Failure => return Err(Error::NonFatal(E_GENERIC)),
            }
        }
    }

    fn stop_target(&mut self, target: &mut dyn Target) -> StopReason {
        let result = target.resume(ResumeRequest::stop());
        if self.flags.trace_exec() {
            debug!("resume(Stop) -> {:?}", result);
        }
        StopReason::Signal(SIGINT)
    }

    /// Consume a pending `0x03` from the client, if there is one. Stray acks
    /// in front of it are discarded.
    fn poll_ctrl_c<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        conn: &mut C,
    ) -> Result<bool, Error> {
        loop {
            match conn.peek().map_err(SessionError::ConnectionRead)? {
                Some(b @ (0x03 | b'+')) => {
                    conn.read().map_err(SessionError::ConnectionRead)?;
                    if b == 0x03 {
                        debug!("<-- interrupt packet");
                        return Ok(true);
                    }
                }
                Some(b) => {
                    debug!("unexpected byte {:#04x} while running, leaving it queued", b);
                    return Ok(false);
                }
                None => return Ok(false),
            }
        }
    }
}
