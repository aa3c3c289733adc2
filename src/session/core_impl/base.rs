use super::prelude::*;
use super::{E_FAULT, E_GENERIC};
use crate::protocol::commands::Command;
use crate::session::DisconnectReason;
use crate::target::{RegValue, NUM_REGS};

use log::{debug, info};

impl SessionImpl {
    pub(super) fn handle_base<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        command: Command<'_>,
    ) -> Result<HandlerStatus, Error> {
        let handler_status = match command {
            // ------------------ Handshaking and Queries ------------------- //
            Command::qSupported(cmd) => {
                for feature in cmd.features.into_iter() {
                    debug!("client feature: {:?}", feature);
                }

                res.write_str("PacketSize=")?;
                res.write_num(self.config.packet_buffer_size as u32)?;
                res.write_str(";QStartNoAckMode+;vContSupported+")?;
                HandlerStatus::Handled
            }
            Command::QStartNoAckMode(_) => {
                self.no_ack_mode = true;
                HandlerStatus::NeedsOk
            }
            Command::H(cmd) => {
                debug!("H{}: single thread, ignoring thread-id", cmd.op as char);
                HandlerStatus::NeedsOk
            }
            Command::T(_) => HandlerStatus::NeedsOk,
            Command::qAttached(_) => {
                res.write_str("1")?;
                HandlerStatus::Handled
            }
            Command::qC(_) => {
                res.write_str("QC1")?;
                HandlerStatus::Handled
            }
            Command::qfThreadInfo(_) => {
                res.write_str("m1")?;
                HandlerStatus::Handled
            }
            Command::qsThreadInfo(_) => {
                res.write_str("l")?;
                HandlerStatus::Handled
            }
            Command::qOffsets(_) => {
                res.write_str("Text=0;Data=0;Bss=0")?;
                HandlerStatus::Handled
            }
            Command::vContQuestionMark(_) => {
                res.write_str("vCont;c;C;s;S")?;
                HandlerStatus::Handled
            }
            Command::QuestionMark(_) => {
                res.write_str("S05")?;
                HandlerStatus::Handled
            }

            // --------------------- Registers ------------------------------ //
            Command::g(_) => {
                self.ensure_usable()?;
                for reg in 0..NUM_REGS {
                    match target.read_register(reg) {
                        Some(val) => res.write_hex_buf(&val.to_le_bytes().collect::<Vec<_>>())?,
                        // register not available
                        None => res.write_str("xxxxxxxx")?,
                    }
                }
                HandlerStatus::Handled
            }
            Command::G(cmd) => {
                self.ensure_usable()?;
                if cmd.vals.len() % 4 != 0 || cmd.vals.len() > NUM_REGS * 4 {
                    return Err(Error::NonFatal(E_GENERIC));
                }

                for (reg, val) in cmd.vals.chunks_exact(4).enumerate() {
                    let val = u32::from_le_bytes([val[0], val[1], val[2], val[3]]);
                    if target.write_register(reg, val).is_none() {
                        return Err(Error::NonFatal(E_GENERIC));
                    }
                }
                HandlerStatus::NeedsOk
            }
            Command::p(cmd) => {
                self.ensure_usable()?;
                let val: RegValue = target
                    .read_register(cmd.reg_id)
                    .ok_or(Error::NonFatal(E_GENERIC))?;
                res.write_hex_buf(&val.to_le_bytes().collect::<Vec<_>>())?;
                HandlerStatus::Handled
            }
            Command::P(cmd) => {
                self.ensure_usable()?;
                if cmd.val.is_empty() || cmd.val.len() > 4 {
                    return Err(Error::NonFatal(E_GENERIC));
                }

                let mut bytes = [0; 4];
                bytes[..cmd.val.len()].copy_from_slice(cmd.val);
                target
                    .write_register(cmd.reg_id, u32::from_le_bytes(bytes))
                    .ok_or(Error::NonFatal(E_GENERIC))?;
                HandlerStatus::NeedsOk
            }

            // ----------------------- Memory ------------------------------- //
            Command::m(cmd) => {
                self.ensure_usable()?;
                // each byte takes two characters, plus room for the framing
                let max_len = self.config.packet_buffer_size.saturating_sub(4) / 2;
                let mut buf = vec![0; cmd.len.min(max_len)];
                let n = target.read(cmd.addr, &mut buf);
                if n < buf.len() {
                    debug!(
                        "short read at {:#010x}: {} of {} bytes",
                        cmd.addr,
                        n,
                        buf.len()
                    );
                    return Err(Error::NonFatal(E_FAULT));
                }
                res.write_hex_buf(&buf)?;
                HandlerStatus::Handled
            }
            Command::M(cmd) => {
                self.ensure_usable()?;
                self.write_memory(target, cmd.addr, cmd.len, cmd.val)?
            }
            Command::X(cmd) => {
                self.ensure_usable()?;
                self.write_memory(target, cmd.addr, cmd.len, cmd.val)?
            }

            // -------------------- Session control ------------------------- //
            Command::D(_) => {
                info!("client detached");
                res.write_str("OK")?;
                HandlerStatus::Disconnect(DisconnectReason::Disconnect)
            }
            Command::k(_) => {
                info!("client sent kill request");
                target.terminate();
                self.reset_target(target);
                HandlerStatus::Disconnect(DisconnectReason::Kill)
            }
            Command::R(_) => {
                info!("client requested restart");
                target.terminate();
                self.reset_target(target);
                HandlerStatus::NoReply
            }

            // everything else is routed elsewhere by `handle_command`
            _ => HandlerStatus::Handled,
        };

        Ok(handler_status)
    }

    fn write_memory(
        &mut self,
        target: &mut dyn Target,
        addr: u32,
        len: usize,
        val: &[u8],
    ) -> Result<HandlerStatus, Error> {
        if val.len() != len {
            debug!(
                "memory write length mismatch: header says {}, got {} bytes",
                len,
                val.len()
            );
            return Err(Error::NonFatal(E_GENERIC));
        }

        let n = target.write(addr, val);
        if n < val.len() {
            debug!("short write at {:#010x}: {} of {} bytes", addr, n, len);
            return Err(Error::NonFatal(E_FAULT));
        }
        Ok(HandlerStatus::NeedsOk)
    }
}
