use super::prelude::*;

/// The client's reply to a File-I/O request: `Fretcode[,errno[,C]]`.
#[derive(Debug, PartialEq, Eq)]
pub struct F {
    pub retcode: i64,
    pub errno: Option<u32>,
    /// The client was interrupted (Ctrl-C) while servicing the request.
    pub ctrl_c: bool,
}

impl<'a> ParseCommand<'a> for F {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let mut body = buf.as_body().split(|&b| b == b',');

        let retcode = match body.next()? {
            [b'-', digits @ ..] => -decode_hex::<i64>(digits).ok()?,
            digits => decode_hex::<i64>(digits).ok()?,
        };
        let errno = match body.next() {
            Some(errno) => Some(decode_hex(errno).ok()?),
            None => None,
        };
        let ctrl_c = match body.next() {
            Some(b"C") => true,
            Some(_) => return None,
            None => false,
        };

        Some(F {
            retcode,
            errno,
            ctrl_c,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &[u8]) -> Option<F> {
        let mut buf = body.to_vec();
        F::from_packet(PacketBuf::new_with_raw_body(&mut buf))
    }

    #[test]
    fn file_io_replies() {
        assert_eq!(
            parse(b"5"),
            Some(F {
                retcode: 5,
                errno: None,
                ctrl_c: false
            })
        );
        assert_eq!(
            parse(b"-1,9"),
            Some(F {
                retcode: -1,
                errno: Some(9),
                ctrl_c: false
            })
        );
        assert_eq!(parse(b"-1,4,C").map(|f| f.ctrl_c), Some(true));
        assert_eq!(parse(b"1,0,Q"), None);
        assert_eq!(parse(b""), None);
    }
}
