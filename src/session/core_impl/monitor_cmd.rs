use core::fmt::Write;
use std::time::Duration;

use log::{debug, info};

use super::prelude::*;
use crate::protocol::commands::_qRcmd::qRcmd;
use crate::target::ResumeResult;

const HELP: &str = "\
session commands:
  help            show this text
  reset           reset the target
  cyclecount      cycles executed since the last reset
  instrcount      instructions retired since the last reset
  echo <text>     print <text>
  timeout [<ms>]  show or set the continue time slice
  trace           show the active trace flags
anything else is passed to the target.
";

impl SessionImpl {
    pub(super) fn handle_monitor_cmd<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        res: &mut ResponseWriter<'_, C>,
        target: &mut dyn Target,
        cmd: qRcmd<'_>,
    ) -> Result<HandlerStatus, Error> {
        let cmd = match core::str::from_utf8(cmd.hex_cmd) {
            Ok(cmd) => cmd.trim(),
            Err(_) => {
                debug!("monitor command is not valid UTF-8");
                return Ok(HandlerStatus::Handled);
            }
        };
        info!("monitor command: {:?}", cmd);

        let mut out = String::new();
        if !self.session_command(target, cmd, &mut out) {
            self.ensure_usable()?;
            if !target.command(cmd, &mut out) {
                return Ok(HandlerStatus::Handled);
            }
        }

        self.console_output(res.as_conn(), &out)?;
        Ok(HandlerStatus::NeedsOk)
    }

    /// Commands implemented by the session itself. Returns `false` if `cmd`
    /// is not one of them.
    fn session_command(&mut self, target: &mut dyn Target, cmd: &str, out: &mut String) -> bool {
        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (cmd, ""),
        };

        // writing to a String cannot fail
        let _ = match name {
            "help" => out.write_str(HELP),
            "reset" => match self.reset_target(target) {
                ResumeResult::Success => writeln!(out, "{}: reset", target.name()),
                _ => writeln!(out, "{}: reset failed", target.name()),
            },
            "cyclecount" => match target.cycle_count() {
                Some(n) => writeln!(out, "{}", n),
                None => writeln!(out, "cycle count not supported by {}", target.name()),
            },
            "instrcount" => match target.instr_count() {
                Some(n) => writeln!(out, "{}", n),
                None => writeln!(out, "instruction count not supported by {}", target.name()),
            },
            "echo" => writeln!(out, "{}", arg),
            "timeout" if arg.is_empty() => {
                writeln!(out, "timeout: {} ms", self.resume_slice.as_millis())
            }
            "timeout" => match arg.parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    self.resume_slice = Duration::from_millis(ms);
                    writeln!(out, "timeout: {} ms", ms)
                }
                _ => writeln!(out, "invalid timeout {:?}: expected milliseconds > 0", arg),
            },
            "trace" => writeln!(out, "trace: {}", self.flags),
            _ => return false,
        };
        true
    }

    /// Send `text` to the client console as one or more `O` packets.
    fn console_output<C: ConnectionExt<Error = io::Error>>(
        &mut self,
        conn: &mut C,
        text: &str,
    ) -> Result<(), Error> {
        // `O`, two hex digits per byte, and the framing
        let chunk_len = (self.config.packet_buffer_size.saturating_sub(5) / 2).max(1);
        for chunk in text.as_bytes().chunks(chunk_len) {
            let mut res = self.response_writer(conn);
            res.write_str("O")?;
            res.write_hex_buf(chunk)?;
            self.last_frame = res.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PicoRv32, Ri5cy};
    use crate::session::core_impl::tests::{packet, MockConnection};
    use crate::session::SessionConfig;
    use crate::target::Interrupt;
    use crate::trace::TraceFlags;

    fn hex(s: &str) -> String {
        s.bytes().map(|b| format!("{:02x}", b)).collect()
    }

    fn monitor(session: &mut SessionImpl, target: &mut dyn Target, cmd: &str) -> Vec<String> {
        let mut conn = MockConnection::default();
        let mut pkt = packet(&format!("qRcmd,{}", hex(cmd)));
        session.handle_packet(target, &mut conn, &mut pkt).unwrap();
        conn.replies()
    }

    fn session() -> SessionImpl {
        let mut session = SessionImpl::new(
            TraceFlags::RSP | TraceFlags::EXEC,
            SessionConfig::default(),
            Interrupt::new(),
        );
        session.begin_connection();
        session
    }

    #[test]
    fn echo_is_sent_as_console_output() {
        let mut target = PicoRv32::new().unwrap();
        let replies = monitor(&mut session(), &mut target, "echo hi there");
        assert_eq!(replies, [format!("O{}", hex("hi there\n")), "OK".to_string()]);
    }

    #[test]
    fn timeout_adjusts_the_resume_slice() {
        let mut session = session();
        let mut target = PicoRv32::new().unwrap();
        monitor(&mut session, &mut target, "timeout 250");
        assert_eq!(session.resume_slice, Duration::from_millis(250));

        let replies = monitor(&mut session, &mut target, "timeout 0");
        let expected = hex("invalid timeout \"0\": expected milliseconds > 0\n");
        assert_eq!(replies[0], format!("O{}", expected));
        assert_eq!(session.resume_slice, Duration::from_millis(250));

        // a new connection starts from the configured slice again
        session.begin_connection();
        assert_eq!(session.resume_slice, SessionConfig::default().resume_slice);
    }

    #[test]
    fn counters_report_unsupported() {
        let mut target = PicoRv32::new().unwrap();
        let replies = monitor(&mut session(), &mut target, "cyclecount");
        assert_eq!(
            replies[0],
            format!("O{}", hex("cycle count not supported by PicoRV32\n"))
        );

        let mut target = Ri5cy::new().unwrap();
        let replies = monitor(&mut session(), &mut target, "instrcount");
        assert_eq!(replies, [format!("O{}", hex("0\n")), "OK".to_string()]);
    }

    #[test]
    fn unknown_commands_fall_through_to_the_target() {
        let mut target = Ri5cy::new().unwrap();
        let replies = monitor(&mut session(), &mut target, "hwbreak");
        assert_eq!(
            replies,
            [format!("O{}", hex("hw0: free\nhw1: free\n")), "OK".to_string()]
        );

        let replies = monitor(&mut session(), &mut target, "frobnicate");
        assert_eq!(replies, [""]);

        let mut target = PicoRv32::new().unwrap();
        let replies = monitor(&mut session(), &mut target, "info");
        assert_eq!(replies, [""]);
    }

    #[test]
    fn long_output_is_split() {
        let mut session = SessionImpl::new(
            TraceFlags::empty(),
            SessionConfig {
                packet_buffer_size: 25,
                ..SessionConfig::default()
            },
            Interrupt::new(),
        );
        session.begin_connection();
        let mut target = PicoRv32::new().unwrap();

        // 10 bytes of payload per packet
        let replies = monitor(&mut session, &mut target, "echo 0123456789abcdef");
        assert_eq!(
            replies,
            [
                format!("O{}", hex("0123456789")),
                format!("O{}", hex("abcdef\n")),
                "OK".to_string()
            ]
        );
    }
}
