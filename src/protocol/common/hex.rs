use num_traits::{CheckedAdd, CheckedMul, FromPrimitive, Zero};

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeHexError {
    NotAscii,
    Empty,
    Overflow,
    InvalidOutput,
}

/// Decode a GDB hex string into the specified integer.
///
/// GDB hex strings may include "xx", which represent "missing" data. This
/// method simply treats "xx" as 0x00.
pub fn decode_hex<I>(buf: &[u8]) -> Result<I, DecodeHexError>
where
    I: FromPrimitive + Zero + CheckedAdd + CheckedMul,
{
    use DecodeHexError::*;

    let radix = I::from_u8(16).ok_or(InvalidOutput)?;

    if buf.is_empty() {
        return Err(Empty);
    }

    let mut result = I::zero();

    for &digit in buf {
        let x = I::from_u8(ascii2byte(digit).ok_or(NotAscii)?).ok_or(InvalidOutput)?;
        result = result.checked_mul(&radix).ok_or(Overflow)?;
        result = result.checked_add(&x).ok_or(Overflow)?
    }

    Ok(result)
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeHexBufError {
    NotAscii,
}

fn ascii2byte(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'x' | b'X' => Some(0),
        _ => None,
    }
}

/// Decode a GDB hex string into a byte slice _in place_.
///
/// An odd-length string is treated as having an implicit leading `0`.
pub fn decode_hex_buf(base_buf: &mut [u8]) -> Result<&mut [u8], DecodeHexBufError> {
    use DecodeHexBufError::*;

    let odd_adjust = base_buf.len() % 2;
    if odd_adjust != 0 {
        base_buf[0] = ascii2byte(base_buf[0]).ok_or(NotAscii)?;
    }

    let decoded_len = (base_buf.len() - odd_adjust) / 2;
    for i in 0..decoded_len {
        let hi = ascii2byte(base_buf[odd_adjust + i * 2]).ok_or(NotAscii)?;
        let lo = ascii2byte(base_buf[odd_adjust + i * 2 + 1]).ok_or(NotAscii)?;
        base_buf[odd_adjust + i] = hi << 4 | lo;
    }

    Ok(&mut base_buf[..decoded_len + odd_adjust])
}

/// Decode GDB escaped binary bytes into a byte slice _in place_.
///
/// Each `}` is followed by the original byte XORed with `0x20`. Returns
/// `None` if the buffer ends in a dangling escape.
pub fn decode_bin_buf(buf: &mut [u8]) -> Option<&mut [u8]> {
    let mut i = 0;
    let mut j = 0;
    let len = buf.len();
    while i < len {
        if buf[i] == b'}' {
            buf[j] = *buf.get(i + 1)? ^ 0x20;
            i += 2;
        } else {
            buf[j] = buf[i];
            i += 1;
        }
        j += 1;
    }

    Some(&mut buf[..j])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_simple() {
        assert_eq!(decode_hex::<u32>(b"1000"), Ok(0x1000));
        assert_eq!(decode_hex::<u8>(b"fF"), Ok(0xff));
        assert_eq!(decode_hex::<u8>(b"100"), Err(DecodeHexError::Overflow));
        assert_eq!(decode_hex::<u32>(b""), Err(DecodeHexError::Empty));
        assert_eq!(decode_hex::<u32>(b"1g"), Err(DecodeHexError::NotAscii));
    }

    #[test]
    fn decode_hex_buf_even() {
        let mut payload = *b"deadbeef";
        let res = decode_hex_buf(&mut payload).unwrap();
        assert_eq!(res, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn decode_hex_buf_odd() {
        let mut payload = *b"ead";
        let res = decode_hex_buf(&mut payload).unwrap();
        assert_eq!(res, [0x0e, 0xad]);
    }

    #[test]
    fn decode_hex_buf_bad_digit() {
        let mut payload = *b"zz";
        assert_eq!(
            decode_hex_buf(&mut payload).unwrap_err(),
            DecodeHexBufError::NotAscii
        );
    }

    #[test]
    fn decode_bin_buf_escapes() {
        let mut payload = *b"a}\x03b}]";
        let res = decode_bin_buf(&mut payload).unwrap();
        assert_eq!(res, b"a#b}");

        let mut dangling = *b"ab}";
        assert!(decode_bin_buf(&mut dangling).is_none());
    }
}
