//! Byte-wise transport used by the RSP session.

mod impls;

/// Serial, in-order output to a debugger.
///
/// [`TcpStream`](std::net::TcpStream) is the only transport the server
/// listens on. Unit tests drive the session through an in-memory
/// implementation instead.
pub trait Connection {
    type Error;

    /// Write a single byte.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Write every byte of `buf`. Defaults to one `write` per byte; override
    /// it when the transport has a bulk write.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        buf.iter().try_for_each(|b| self.write(*b))
    }

    /// Push out anything the transport is holding on to.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Hook run once per client, before the first packet is read.
    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Input half of a [`Connection`].
pub trait ConnectionExt: Connection {
    /// Block until a byte arrives, and consume it.
    fn read(&mut self) -> Result<u8, Self::Error>;

    /// Look at the next byte without consuming it or blocking. `None` means
    /// nothing is waiting. Repeated peeks see the same byte until it is read.
    ///
    /// The session uses this between `Continue` slices to spot the `0x03`
    /// interrupt byte.
    fn peek(&mut self) -> Result<Option<u8>, Self::Error>;
}
