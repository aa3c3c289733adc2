use super::prelude::*;

#[derive(Debug)]
pub struct X<'a> {
    pub addr: u32,
    pub len: usize,
    pub val: &'a [u8],
}

impl<'a> ParseCommand<'a> for X<'a> {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let body = buf.into_body();

        // the binary payload may itself contain ',' or ':' bytes
        let mut body = body.splitn_mut(3, |&b| b == b',' || b == b':');
        let addr = decode_hex(body.next()?).ok()?;
        let len = decode_hex(body.next()?).ok()?;
        let val = decode_bin_buf(body.next()?)?;

        Some(X { addr, len, val })
    }
}
