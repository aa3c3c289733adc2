use crate::protocol::common::hex::decode_hex;

// Breakpoint packets are split up like this:
//
// Z0,addr,kind[;cond_list…][;cmds:persist,cmd_list…]
//  \_________/
//       |
//     BasicBreakpoint
//
// Conditions and commands are not supported and are ignored if present.

#[derive(Debug, PartialEq, Eq)]
pub struct BasicBreakpoint {
    pub type_: u8,
    pub addr: u32,
    /// architecture dependent
    pub kind: usize,
}

impl BasicBreakpoint {
    pub fn from_slice(body: &[u8]) -> Option<BasicBreakpoint> {
        let mut body = body.splitn(4, |b| matches!(*b, b',' | b';'));
        let type_ = decode_hex(body.next()?).ok()?;
        let addr = decode_hex(body.next()?).ok()?;
        let kind = decode_hex(body.next()?).ok()?;

        Some(BasicBreakpoint { type_, addr, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic() {
        assert_eq!(
            BasicBreakpoint::from_slice(b"1,80001000,4"),
            Some(BasicBreakpoint {
                type_: 1,
                addr: 0x8000_1000,
                kind: 4
            })
        );
        assert_eq!(
            BasicBreakpoint::from_slice(b"0,100,2;X2,0a00").map(|bp| bp.addr),
            Some(0x100)
        );
        assert_eq!(BasicBreakpoint::from_slice(b"0,100"), None);
    }
}
