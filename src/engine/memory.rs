/// Flat little-endian RAM starting at address 0.
#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Memory {
        Memory {
            bytes: vec![0; size],
        }
    }

    pub fn r8(&self, addr: u32) -> Option<u8> {
        self.bytes.get(addr as usize).copied()
    }

    pub fn w8(&mut self, addr: u32, val: u8) -> bool {
        match self.bytes.get_mut(addr as usize) {
            Some(b) => {
                *b = val;
                true
            }
            None => false,
        }
    }

    pub fn r16(&self, addr: u32) -> Option<u16> {
        let lo = self.r8(addr)?;
        let hi = self.r8(addr.checked_add(1)?)?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    pub fn r32(&self, addr: u32) -> Option<u32> {
        let start = addr as usize;
        let bytes = self.bytes.get(start..start.checked_add(4)?)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Store the low `len` bytes of `val`. Nothing is written unless the
    /// whole range is in bounds.
    pub fn write_le(&mut self, addr: u32, val: u32, len: usize) -> bool {
        let start = addr as usize;
        let end = match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => end,
            _ => return false,
        };
        self.bytes[start..end].copy_from_slice(&val.to_le_bytes()[..len]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_access() {
        let mut mem = Memory::new(16);
        assert!(mem.write_le(4, 0xdead_beef, 4));
        assert_eq!(mem.r8(4), Some(0xef));
        assert_eq!(mem.r16(6), Some(0xdead));
        assert_eq!(mem.r32(4), Some(0xdead_beef));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut mem = Memory::new(8);
        assert_eq!(mem.r8(8), None);
        assert_eq!(mem.r32(6), None);
        assert!(!mem.w8(8, 1));
        assert!(!mem.write_le(6, 0xffff_ffff, 4));
        // a rejected store leaves memory untouched
        assert_eq!(mem.r16(6), Some(0));
    }
}
