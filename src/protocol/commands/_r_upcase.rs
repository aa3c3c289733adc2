use super::prelude::*;

#[derive(Debug)]
pub struct R;

impl<'a> ParseCommand<'a> for R {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        // Technically speaking, the `R` packet includes a hex-encoded byte as
        // well, but it is unused. Accept it without parsing it.
        match buf.as_body().len() {
            0 | 2 => Some(R),
            _ => None,
        }
    }
}
