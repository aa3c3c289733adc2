use std::io::{self, Read, Write};
use std::net::TcpStream;

use crate::conn::{Connection, ConnectionExt};

impl Connection for TcpStream {
    type Error = io::Error;

    fn write(&mut self, byte: u8) -> io::Result<()> {
        Write::write_all(self, &[byte])
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Write::write_all(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }

    fn on_session_start(&mut self) -> io::Result<()> {
        // RSP is chatty with tiny packets; Nagle makes it crawl
        self.set_nodelay(true)
    }
}

impl ConnectionExt for TcpStream {
    fn read(&mut self) -> io::Result<u8> {
        let mut buf = [0];
        Read::read_exact(self, &mut buf)?;
        Ok(buf[0])
    }

    /// Briefly switches the socket to non-blocking mode. A peer that has
    /// closed its end reads as `UnexpectedEof`, so a client that vanishes
    /// mid-`Continue` ends the session instead of spinning forever.
    fn peek(&mut self) -> io::Result<Option<u8>> {
        self.set_nonblocking(true)?;

        let mut buf = [0];
        let res = match TcpStream::peek(self, &mut buf) {
            Ok(0) => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        };

        self.set_nonblocking(false)?;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn peek_does_not_consume() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        assert_eq!(ConnectionExt::peek(&mut server).unwrap(), None);

        Write::write_all(&mut client, &[0x03]).unwrap();
        Write::flush(&mut client).unwrap();

        // the byte may take a moment to arrive
        let mut peeked = None;
        for _ in 0..100 {
            peeked = ConnectionExt::peek(&mut server).unwrap();
            if peeked.is_some() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(peeked, Some(0x03));
        assert_eq!(ConnectionExt::read(&mut server).unwrap(), 0x03);
    }

    #[test]
    fn peek_reports_closed_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();
        drop(client);

        let mut res = Ok(None);
        for _ in 0..100 {
            res = ConnectionExt::peek(&mut server);
            if !matches!(res, Ok(None)) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(res.is_err());
    }
}
