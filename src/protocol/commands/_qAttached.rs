use super::prelude::*;

#[derive(Debug)]
pub struct qAttached;

impl<'a> ParseCommand<'a> for qAttached {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        if !buf.as_body().is_empty() {
            return None;
        }
        Some(qAttached)
    }
}
