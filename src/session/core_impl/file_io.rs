use log::{debug, info, warn};

use super::prelude::*;
use crate::protocol::commands::Command;
use crate::protocol::{Packet, RecvPacketBlocking};
use crate::target::{SyscallRequest, A0_REGNUM};

const SYS_CLOSE: u32 = 57;
const SYS_LSEEK: u32 = 62;
const SYS_READ: u32 = 63;
const SYS_WRITE: u32 = 64;
const SYS_EXIT: u32 = 93;
const SYS_OPEN: u32 = 1024;
const SYS_UNLINK: u32 = 1026;

// newlib errno values
const EFAULT: u32 = 14;
const ENOSYS: u32 = 88;

/// Longest path (including the terminating NUL) passed to `open` / `unlink`.
const MAX_PATH_LEN: u32 = 4096;

/// What to do once a host syscall has been serviced.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum SyscallOutcome {
    /// The result is in `a0`, carry on executing.
    Resume,
    /// The client was interrupted while servicing the request.
    Interrupted,
    /// The program called `exit`.
    Exited(u8),
}

/// Argument formats of the `F` request, in protocol order.
enum Arg {
    Int(u32),
    /// A NUL terminated string in target memory, sent as `ptr/len`.
    Str(u32),
}

impl SessionImpl {
    /// Forward `request` to the client as a File-I/O `F` packet, serve its
    /// memory accesses, and write the result back into `a0`.
    pub(super) fn handle_syscall<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        request: SyscallRequest,
    ) -> Result<SyscallOutcome, Error> {
        let [a0, a1, a2, a3, ..] = request.args;

        let (name, args) = match request.number {
            SYS_EXIT => return Ok(SyscallOutcome::Exited(a0 as u8)),
            SYS_CLOSE => ("close", vec![Arg::Int(a0)]),
            SYS_LSEEK => ("lseek", vec![Arg::Int(a0), Arg::Int(a1), Arg::Int(a2)]),
            SYS_READ => ("read", vec![Arg::Int(a0), Arg::Int(a1), Arg::Int(a2)]),
            SYS_WRITE => ("write", vec![Arg::Int(a0), Arg::Int(a1), Arg::Int(a2)]),
            SYS_OPEN => ("open", vec![Arg::Str(a0), Arg::Int(a1), Arg::Int(a2)]),
            SYS_UNLINK => ("unlink", vec![Arg::Str(a0)]),
            number => {
                warn!(
                    "unsupported syscall {} (args {:#x} {:#x} {:#x} {:#x})",
                    number, a0, a1, a2, a3
                );
                set_result(target, ENOSYS.wrapping_neg());
                return Ok(SyscallOutcome::Resume);
            }
        };

        if self.flags.trace_exec() {
            debug!("syscall {} ({})", name, request.number);
        }

        let conn = res.as_conn();
        let mut req = self.response_writer(conn);
        req.write_str("F")?;
        req.write_str(name)?;
        for arg in args {
            req.write_str(",")?;
            match arg {
                Arg::Int(val) => req.write_num(val)?,
                Arg::Str(ptr) => {
                    let len = match c_str_len(target, ptr) {
                        Some(len) => len,
                        None => {
                            debug!("{}: bad path pointer {:#010x}", name, ptr);
                            set_result(target, EFAULT.wrapping_neg());
                            return Ok(SyscallOutcome::Resume);
                        }
                    };
                    req.write_num(ptr)?;
                    req.write_str("/")?;
                    req.write_num(len)?;
                }
            }
        }
        self.last_frame = req.flush()?;

        self.await_file_io_reply(conn, target)
    }

    /// Pump packets until the client answers the outstanding `F` request.
    fn await_file_io_reply<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        conn: &mut C,
        target: &mut dyn Target,
    ) -> Result<SyscallOutcome, Error> {
        let mut recv = RecvPacketBlocking::new(self.config.packet_buffer_size);
        let mut buf = Vec::new();

        loop {
            let pkt = match self.recv_packet(&mut recv, &mut buf, conn)? {
                Some(pkt) => pkt,
                None => continue,
            };

            let packet = match Packet::from_buf(pkt) {
                Ok(packet) => packet,
                Err(e) => {
                    self.handle_parse_error(conn, e)?;
                    continue;
                }
            };

            let command = match packet {
                Packet::Ack => continue,
                Packet::Nack => {
                    self.retransmit(conn)?;
                    continue;
                }
                Packet::Interrupt => {
                    // GDB reports Ctrl-C through the `F` reply itself
                    debug!("<-- interrupt packet during File-I/O, ignoring");
                    continue;
                }
                Packet::Command(command) => command,
            };

            match command {
                Command::F(reply) => {
                    self.ack(conn)?;
                    let result = match reply.errno {
                        Some(errno) if reply.retcode < 0 => errno.wrapping_neg(),
                        _ => reply.retcode as u32,
                    };
                    set_result(target, result);

                    if reply.ctrl_c {
                        info!("client interrupted File-I/O request");
                        return Ok(SyscallOutcome::Interrupted);
                    }
                    return Ok(SyscallOutcome::Resume);
                }
                command @ (Command::m(_)
                | Command::M(_)
                | Command::X(_)
                | Command::g(_)
                | Command::G(_)
                | Command::p(_)
                | Command::P(_)) => {
                    self.respond(target, conn, command)?;
                }
                command => {
                    debug!("{:?} while a File-I/O request is outstanding", command);
                    self.ack(conn)?;
                    self.last_frame = self.response_writer(conn).flush()?;
                }
            }
        }
    }
}

fn set_result(target: &mut dyn Target, val: u32) {
    if target.write_register(A0_REGNUM, val).is_none() {
        warn!("{}: could not write syscall result to a0", target.name());
    }
}

/// Length of the string at `ptr` including its NUL, as File-I/O expects.
fn c_str_len(target: &dyn Target, ptr: u32) -> Option<u32> {
    let mut b = [0];
    for offset in 0..MAX_PATH_LEN {
        if target.read(ptr.checked_add(offset)?, &mut b) != 1 {
            return None;
        }
        if b[0] == 0 {
            return Some(offset + 1);
        }
    }
    None
}
