use super::prelude::*;

#[derive(Debug)]
pub struct QuestionMark;

impl<'a> ParseCommand<'a> for QuestionMark {
    fn from_packet(_buf: PacketBuf<'a>) -> Option<Self> {
        Some(QuestionMark)
    }
}
