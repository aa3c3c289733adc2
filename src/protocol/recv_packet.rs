/// Error while receiving a packet.
#[derive(Debug)]
pub enum RecvPacketError<C> {
    /// The packet did not fit in the configured buffer size.
    Capacity(usize),
    Connection(C),
}

/// Receives a packet by pulling data from a callback (typically backed by a
/// blocking `ConnectionExt::read`).
pub struct RecvPacketBlocking {
    capacity: usize,
}

impl RecvPacketBlocking {
    pub fn new(capacity: usize) -> Self {
        RecvPacketBlocking { capacity }
    }

    /// Read a single packet (or single-byte `+` / `-` / `0x03` message) into
    /// `packet_buffer`, returning the filled slice.
    ///
    /// A packet that does not fit is still read through its checksum before
    /// `Capacity` is returned, so the stream stays in sync.
    pub fn recv<'b, C>(
        &mut self,
        packet_buffer: &'b mut Vec<u8>,
        mut get_byte: impl FnMut() -> Result<u8, C>,
    ) -> Result<&'b mut [u8], RecvPacketError<C>> {
        let capacity = self.capacity;
        let mut overflow = false;
        let mut push = |buf: &mut Vec<u8>, byte: u8| {
            if buf.len() >= capacity {
                overflow = true;
            } else {
                buf.push(byte);
            }
        };

        packet_buffer.clear();

        let header_byte = get_byte().map_err(RecvPacketError::Connection)?;
        push(packet_buffer, header_byte);
        if header_byte == b'$' {
            // read the packet body
            loop {
                let c = get_byte().map_err(RecvPacketError::Connection)?;
                push(packet_buffer, c);
                if c == b'#' {
                    break;
                }
            }
            // read the checksum as well
            for _ in 0..2 {
                push(
                    packet_buffer,
                    get_byte().map_err(RecvPacketError::Connection)?,
                );
            }
        }

        if overflow {
            return Err(RecvPacketError::Capacity(capacity));
        }
        Ok(packet_buffer.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feeder(data: &[u8]) -> impl FnMut() -> Result<u8, &'static str> + '_ {
        let mut iter = data.iter();
        move || iter.next().copied().ok_or("eof")
    }

    #[test]
    fn reads_whole_packet() {
        let mut buf = Vec::new();
        let mut recv = RecvPacketBlocking::new(64);
        let pkt = recv.recv(&mut buf, feeder(b"$m0,4#fd+")).unwrap();
        assert_eq!(pkt, b"$m0,4#fd");
    }

    #[test]
    fn single_byte_messages() {
        let mut buf = Vec::new();
        let mut recv = RecvPacketBlocking::new(64);
        let mut get = feeder(b"+\x03");
        assert_eq!(recv.recv(&mut buf, &mut get).unwrap(), b"+");
        assert_eq!(recv.recv(&mut buf, &mut get).unwrap(), b"\x03");
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let mut buf = Vec::new();
        let mut recv = RecvPacketBlocking::new(4);
        assert!(matches!(
            recv.recv(&mut buf, feeder(b"$qSupported#37")),
            Err(RecvPacketError::Capacity(4))
        ));
    }

    #[test]
    fn oversized_packet_is_drained() {
        let mut buf = Vec::new();
        let mut recv = RecvPacketBlocking::new(4);
        let mut get = feeder(b"$qSupported#37$g#67");
        assert!(matches!(
            recv.recv(&mut buf, &mut get),
            Err(RecvPacketError::Capacity(4))
        ));
        let mut recv = RecvPacketBlocking::new(64);
        assert_eq!(recv.recv(&mut buf, &mut get).unwrap(), b"$g#67");
    }

    #[test]
    fn connection_errors_propagate() {
        let mut buf = Vec::new();
        let mut recv = RecvPacketBlocking::new(64);
        assert!(matches!(
            recv.recv(&mut buf, feeder(b"$g#6")),
            Err(RecvPacketError::Connection("eof"))
        ));
    }
}
