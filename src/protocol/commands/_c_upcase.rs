use super::prelude::*;

/// Resume with a signal. Signals cannot be delivered to a bare-metal core,
/// so the signal number is parsed but otherwise ignored.
#[derive(Debug)]
pub struct C {
    pub sig: u8,
    pub addr: Option<u32>,
}

impl<'a> ParseCommand<'a> for C {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let mut body = buf.as_body().split(|&b| b == b';');
        let sig = decode_hex(body.next()?).ok()?;
        let addr = match body.next() {
            Some(addr) => Some(decode_hex(addr).ok()?),
            None => None,
        };
        Some(C { sig, addr })
    }
}
