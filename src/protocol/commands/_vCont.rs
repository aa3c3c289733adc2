use super::_h_upcase::is_thread_id;
use super::prelude::*;

#[derive(Debug)]
pub struct vCont<'a> {
    pub actions: Actions<'a>,
}

impl<'a> ParseCommand<'a> for vCont<'a> {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let body = buf.into_body_str()?;
        if !body.starts_with(';') {
            return None;
        }
        Some(vCont {
            actions: Actions(body),
        })
    }
}

/// A lazily evaluated iterator over the actions specified in a vCont packet.
#[derive(Debug)]
pub struct Actions<'a>(&'a str);

impl<'a> Actions<'a> {
    pub fn into_iter(self) -> impl Iterator<Item = Option<VContAction>> + 'a {
        self.0.split(';').skip(1).map(|act| {
            let mut s = act.split(':');
            let kind = VContKind::from_str(s.next()?)?;
            if let Some(thread) = s.next() {
                if !is_thread_id(thread.as_bytes()) {
                    return None;
                }
            }
            Some(VContAction { kind })
        })
    }
}

#[derive(PartialEq, Eq, Debug)]
pub struct VContAction {
    pub kind: VContKind,
}

#[derive(PartialEq, Eq, Debug)]
pub enum VContKind {
    Continue,
    ContinueWithSig(u8),
    Step,
    StepWithSig(u8),
    Stop,
}

impl VContKind {
    fn from_str(s: &str) -> Option<VContKind> {
        use self::VContKind::*;

        let res = match s.as_bytes() {
            b"c" => Continue,
            [b'C', sig @ ..] => ContinueWithSig(decode_hex(sig).ok()?),
            b"s" => Step,
            [b'S', sig @ ..] => StepWithSig(decode_hex(sig).ok()?),
            b"t" => Stop,
            _ => return None,
        };

        Some(res)
    }
}
