use crate::protocol::commands::{Command, CommandParseError};
use crate::protocol::common::hex::decode_hex;

/// Packet parse error.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketParseError {
    ChecksumMismatched { checksum: u8, calculated: u8 },
    EmptyBuf,
    MissingChecksum,
    MalformedChecksum,
    MalformedCommand(CommandParseError),
    UnexpectedHeader(u8),
}

impl PacketParseError {
    /// Whether the client should be asked to retransmit (i.e: the packet was
    /// damaged in transit, as opposed to being well-formed but unparseable).
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            PacketParseError::ChecksumMismatched { .. }
                | PacketParseError::MissingChecksum
                | PacketParseError::MalformedChecksum
        )
    }
}

/// Top-Level GDB packet
#[derive(Debug)]
pub enum Packet<'a> {
    Ack,
    Nack,
    Interrupt,
    Command(Command<'a>),
}

/// A validated packet body, backed by the (mutable) receive buffer so that
/// commands can decode hex and binary payloads in place.
pub struct PacketBuf<'a> {
    buf: &'a mut [u8],
    body_range: core::ops::Range<usize>,
}

impl<'a> PacketBuf<'a> {
    /// Validate the contents of the raw packet buffer, checking for checksum
    /// consistency and structural correctness.
    ///
    /// The body is _not_ required to be ASCII, since `X` packets carry binary
    /// data.
    pub fn new(pkt_buf: &'a mut [u8]) -> Result<PacketBuf<'a>, PacketParseError> {
        if pkt_buf.is_empty() {
            return Err(PacketParseError::EmptyBuf);
        }

        let hash = pkt_buf
            .iter()
            .rposition(|b| *b == b'#')
            .ok_or(PacketParseError::MissingChecksum)?;

        let checksum = pkt_buf
            .get(hash + 1..hash + 3)
            .ok_or(PacketParseError::MalformedChecksum)?;
        let checksum = decode_hex(checksum).map_err(|_| PacketParseError::MalformedChecksum)?;

        let body = &pkt_buf[1..hash];
        let calculated = body.iter().fold(0u8, |a, x| a.wrapping_add(*x));
        if calculated != checksum {
            return Err(PacketParseError::ChecksumMismatched {
                checksum,
                calculated,
            });
        }

        Ok(PacketBuf {
            buf: pkt_buf,
            body_range: 1..hash,
        })
    }

    /// (used for tests) Create a packet buffer from a raw body buffer, skipping
    /// the header/checksum trimming stage.
    #[cfg(test)]
    pub fn new_with_raw_body(body: &'a mut [u8]) -> PacketBuf<'a> {
        let len = body.len();
        PacketBuf {
            buf: body,
            body_range: 0..len,
        }
    }

    pub fn trim_start_body_bytes(self, n: usize) -> Self {
        PacketBuf {
            buf: self.buf,
            body_range: (self.body_range.start + n)..self.body_range.end,
        }
    }

    pub fn as_body(&self) -> &[u8] {
        &self.buf[self.body_range.clone()]
    }

    /// Return a mut reference to slice of the packet buffer corresponding to
    /// the current body.
    pub fn into_body(self) -> &'a mut [u8] {
        &mut self.buf[self.body_range]
    }

    /// Return the current body as a `&str`, if it is valid UTF-8.
    pub fn into_body_str(self) -> Option<&'a str> {
        core::str::from_utf8(self.into_body()).ok()
    }
}

impl<'a> Packet<'a> {
    pub fn from_buf(buf: &'a mut [u8]) -> Result<Packet<'a>, PacketParseError> {
        // cannot have empty packet
        if buf.is_empty() {
            return Err(PacketParseError::EmptyBuf);
        }

        match buf[0] {
            b'$' => Ok(Packet::Command(
                Command::from_packet(PacketBuf::new(buf)?)
                    .map_err(PacketParseError::MalformedCommand)?,
            )),
            b'+' => Ok(Packet::Ack),
            b'-' => Ok(Packet::Nack),
            0x03 => Ok(Packet::Interrupt),
            _ => Err(PacketParseError::UnexpectedHeader(buf[0])),
        }
    }
}
