//! Z80 flag register bits.

/// Sign flag (bit 7).
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6).
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5), usually a copy of result bit 5.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4).
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3), usually a copy of result bit 3.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2).
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1).
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0).
pub const CF: u8 = 0b0000_0001;

/// Sign, zero and the two undocumented bits for `value`.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let zero = if value == 0 { ZF } else { 0 };
    (value & (SF | YF | XF)) | zero
}

/// As [`sz53`], plus even parity in PF.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let parity = if value.count_ones() % 2 == 0 { PF } else { 0 };
    sz53(value) | parity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sz53p_examples() {
        assert_eq!(sz53p(0x00), ZF | PF);
        assert_eq!(sz53p(0x80), SF);
        assert_eq!(sz53p(0x28), YF | XF | PF);
        assert_eq!(sz53(0x01), 0);
    }
}
