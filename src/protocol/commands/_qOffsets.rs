use super::prelude::*;

#[derive(Debug)]
pub struct qOffsets;

impl<'a> ParseCommand<'a> for qOffsets {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        if !buf.as_body().is_empty() {
            return None;
        }
        Some(qOffsets)
    }
}
