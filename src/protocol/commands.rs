use crate::protocol::packet::PacketBuf;

/// Common imports used by most command parsers.
mod prelude {
    pub use super::ParseCommand;
    pub use crate::protocol::common::hex::{decode_bin_buf, decode_hex, decode_hex_buf};
    pub use crate::protocol::packet::PacketBuf;
}

/// Parse a command out of the body of a packet (with its name already
/// trimmed off).
pub trait ParseCommand<'a>: Sized {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self>;
}

macro_rules! commands {
    ($($name:literal => $mod:ident::$command:ident$(<$lifetime:lifetime>)?,)*) => {
        $(
            #[allow(non_snake_case, non_camel_case_types)]
            pub mod $mod;
        )*
        $(pub use $mod::$command;)*

        /// GDB commands
        #[allow(non_camel_case_types)]
        #[derive(Debug)]
        pub enum Command<'a> {
            $($command($command<$($lifetime)?>),)*
            Unknown(&'a [u8]),
        }

        impl<'a> Command<'a> {
            /// Prefixes are tried in declaration order, so a command whose
            /// name is a prefix of another must be declared after it.
            pub fn from_packet(buf: PacketBuf<'a>) -> Result<Command<'a>, CommandParseError> {
                if buf.as_body().is_empty() {
                    return Err(CommandParseError::Empty);
                }

                $(
                    if buf.as_body().starts_with($name.as_bytes()) {
                        let buf = buf.trim_start_body_bytes($name.len());
                        let cmd = $command::from_packet(buf)
                            .ok_or(CommandParseError::MalformedCommand($name))?;
                        return Ok(Command::$command(cmd));
                    }
                )*

                Ok(Command::Unknown(buf.into_body()))
            }
        }
    };
}

/// Command parse error
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParseError {
    Empty,
    MalformedCommand(&'static str),
}

commands! {
    "?" => question_mark::QuestionMark,
    "c" => _c::c,
    "C" => _c_upcase::C,
    "D" => _d_upcase::D,
    "F" => _f_upcase::F,
    "g" => _g::g,
    "G" => _g_upcase::G<'a>,
    "H" => _h_upcase::H,
    "k" => _k::k,
    "m" => _m::m,
    "M" => _m_upcase::M<'a>,
    "p" => _p::p,
    "P" => _p_upcase::P<'a>,
    "qAttached" => _qAttached::qAttached,
    "qC" => _qC::qC,
    "qfThreadInfo" => _qfThreadInfo::qfThreadInfo,
    "qsThreadInfo" => _qsThreadInfo::qsThreadInfo,
    "qOffsets" => _qOffsets::qOffsets,
    "qRcmd" => _qRcmd::qRcmd<'a>,
    "qSupported" => _qSupported::qSupported<'a>,
    "QStartNoAckMode" => _QStartNoAckMode::QStartNoAckMode,
    "R" => _r_upcase::R,
    "s" => _s::s,
    "S" => _s_upcase::S,
    "T" => _t_upcase::T,
    "X" => _x_upcase::X<'a>,
    "z" => _z::z,
    "Z" => _z_upcase::Z,

    // Order Matters (because of prefix matching)
    "vCont?" => vCont_question_mark::vContQuestionMark,
    "vCont" => _vCont::vCont<'a>,
}

pub mod breakpoint;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &[u8]) -> Result<Command<'_>, CommandParseError> {
        // leak a copy so the parsed command can borrow from it
        let buf = Box::leak(body.to_vec().into_boxed_slice());
        Command::from_packet(PacketBuf::new_with_raw_body(buf))
    }

    #[test]
    fn longest_prefix_wins() {
        assert!(matches!(
            parse(b"vCont?"),
            Ok(Command::vContQuestionMark(_))
        ));
        assert!(matches!(parse(b"vCont;c"), Ok(Command::vCont(_))));
        assert!(matches!(parse(b"qC"), Ok(Command::qC(_))));
    }

    #[test]
    fn unknown_commands_pass_through() {
        match parse(b"qXfer:features:read:target.xml:0,fff") {
            Ok(Command::Unknown(body)) => assert!(body.starts_with(b"qXfer")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(parse(b"vMustReplyEmpty"), Ok(Command::Unknown(_))));
    }

    #[test]
    fn malformed_and_empty() {
        assert_eq!(
            parse(b"mzz,4").unwrap_err(),
            CommandParseError::MalformedCommand("m")
        );
        assert_eq!(parse(b"").unwrap_err(), CommandParseError::Empty);
    }
}
