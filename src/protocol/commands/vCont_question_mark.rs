use super::prelude::*;

#[derive(Debug)]
pub struct vContQuestionMark;

impl<'a> ParseCommand<'a> for vContQuestionMark {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        if !buf.as_body().is_empty() {
            return None;
        }
        Some(vContQuestionMark)
    }
}
