use super::_h_upcase::is_thread_id;
use super::prelude::*;

#[derive(Debug)]
pub struct T;

impl<'a> ParseCommand<'a> for T {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        if !is_thread_id(buf.as_body()) {
            return None;
        }
        Some(T)
    }
}
