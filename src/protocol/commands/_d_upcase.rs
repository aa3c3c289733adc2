use super::prelude::*;

/// Detach. The optional `;pid` suffix is accepted and ignored.
#[derive(Debug)]
pub struct D;

impl<'a> ParseCommand<'a> for D {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        match buf.as_body() {
            [] | [b';', ..] => Some(D),
            _ => None,
        }
    }
}
