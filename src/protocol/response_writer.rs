use log::trace;
use num_traits::{PrimInt, Unsigned};

use crate::conn::Connection;

/// Newtype around a Connection error.
#[derive(Debug, Clone)]
pub struct Error<C>(pub C);

/// Accumulates a single reply packet, then frames it with its checksum and
/// sends it over a [`Connection`].
pub struct ResponseWriter<'a, C: Connection> {
    inner: &'a mut C,
    msg: Vec<u8>,
    trace: bool,
}

impl<'a, C: Connection + 'a> ResponseWriter<'a, C> {
    /// Creates a new ResponseWriter. If `trace` is set, every outgoing packet
    /// is logged.
    pub fn new(inner: &'a mut C, trace: bool) -> Self {
        Self {
            inner,
            msg: Vec::new(),
            trace,
        }
    }

    /// Consumes self, sending `$<body>#<checksum>` and returning the complete
    /// frame (so it can be retransmitted if the client NAKs it).
    pub fn flush(self) -> Result<Vec<u8>, Error<C::Error>> {
        let frame = frame(&self.msg);

        if self.trace {
            trace!("--> {}", String::from_utf8_lossy(&frame));
        }

        self.inner.write_all(&frame).map_err(Error)?;
        self.inner.flush().map_err(Error)?;

        Ok(frame)
    }

    /// Get a mutable reference to the underlying connection.
    pub fn as_conn(&mut self) -> &mut C {
        self.inner
    }

    fn write(&mut self, byte: u8) -> Result<(), Error<C::Error>> {
        self.msg.push(byte);
        Ok(())
    }

    /// Write an entire string over the connection.
    pub fn write_str(&mut self, s: &str) -> Result<(), Error<C::Error>> {
        for b in s.as_bytes().iter() {
            self.write(*b)?;
        }
        Ok(())
    }

    /// Write a single byte as a hex string (two ascii chars)
    fn write_hex(&mut self, byte: u8) -> Result<(), Error<C::Error>> {
        for digit in [(byte & 0xf0) >> 4, byte & 0x0f] {
            self.write(hex_digit(digit))?;
        }
        Ok(())
    }

    /// Write a byte-buffer as a hex string (i.e: two ascii chars / byte).
    pub fn write_hex_buf(&mut self, data: &[u8]) -> Result<(), Error<C::Error>> {
        for b in data.iter() {
            self.write_hex(*b)?;
        }
        Ok(())
    }

    /// Write a number as a big-endian hex string using the most compact
    /// representation possible (i.e: trimming leading zero bytes).
    pub fn write_num<D: PrimInt + Unsigned>(&mut self, digit: D) -> Result<(), Error<C::Error>> {
        if digit.is_zero() {
            return self.write_hex(0);
        }

        let nbytes = core::mem::size_of::<D>();
        let mask = D::max_value() >> (8 * (nbytes - 1));
        let bytes = (0..nbytes)
            .rev()
            .map(|i| ((digit >> (8 * i)) & mask).to_u8().unwrap_or(0));
        for b in bytes.skip_while(|&b| b == 0) {
            self.write_hex(b)?
        }
        Ok(())
    }
}

fn hex_digit(nibble: u8) -> u8 {
    match nibble {
        0..=9 => b'0' + nibble,
        _ => b'a' + nibble - 10,
    }
}

/// Wrap `body` in RSP packet framing.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let checksum = body.iter().fold(0u8, |a, x| a.wrapping_add(*x));
    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.push(b'$');
    frame.extend_from_slice(body);
    frame.push(b'#');
    frame.push(hex_digit(checksum >> 4));
    frame.push(hex_digit(checksum & 0xf));
    frame
}
