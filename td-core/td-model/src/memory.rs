//! Memory access widths

/// Width of one memory access, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    /// Width from an operator-supplied byte count (1, 2 or 4)
    pub fn from_bytes(bytes: usize) -> Option<Width> {
        match bytes {
            1 => Some(Width::Byte),
            2 => Some(Width::Half),
            4 => Some(Width::Word),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
        }
    }

    /// Round `addr` down to a multiple of this width
    pub fn align_down(self, addr: u64) -> u64 {
        addr & !(self.bytes() as u64 - 1)
    }

    pub fn is_aligned(self, addr: u64) -> bool {
        addr & (self.bytes() as u64 - 1) == 0
    }

    /// Mask covering the value bits of this width
    pub fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xff,
            Width::Half => 0xffff,
            Width::Word => 0xffff_ffff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_down() {
        assert_eq!(Width::Word.align_down(0x1003), 0x1000);
        assert_eq!(Width::Half.align_down(0x1003), 0x1002);
        assert_eq!(Width::Byte.align_down(0x1003), 0x1003);
        assert!(!Width::Word.is_aligned(0x1003));
        assert!(Width::Word.is_aligned(0x1000));
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(Width::from_bytes(2), Some(Width::Half));
        assert_eq!(Width::from_bytes(3), None);
        assert_eq!(Width::from_bytes(0), None);
    }
}
