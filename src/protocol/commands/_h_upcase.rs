use super::prelude::*;

/// Set the thread for subsequent operations. There is only ever one thread,
/// so the thread-id is checked for syntax and otherwise ignored.
#[derive(Debug)]
pub struct H {
    pub op: u8,
}

impl<'a> ParseCommand<'a> for H {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        match buf.as_body() {
            [op @ (b'c' | b'g' | b'm'), thread @ ..] if is_thread_id(thread) => {
                Some(H { op: *op })
            }
            _ => None,
        }
    }
}

/// Accepts `-1`, `0`, or a hex thread number, optionally `p`-prefixed.
pub(super) fn is_thread_id(s: &[u8]) -> bool {
    let s = s.strip_prefix(b"p").unwrap_or(s);
    match s {
        b"-1" => true,
        _ => s.split(|b| *b == b'.').all(|part| {
            part == b"-1" || (!part.is_empty() && part.iter().all(u8::is_ascii_hexdigit))
        }),
    }
}
