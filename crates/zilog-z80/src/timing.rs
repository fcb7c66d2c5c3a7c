//! Z80 T-state tables.

/// T-states per unprefixed opcode.
///
/// Conditional jumps, calls and returns list their not-taken cost. The
/// prefix bytes (CB, DD, ED, FD) list the four T-states of their own M1
/// cycle.
#[rustfmt::skip]
pub static CYCLES: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4, // 0x
    8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4, // 1x
    7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4, // 2x
    7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4, // 3x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 4x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 5x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 6x
    7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4, // 7x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 8x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 9x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // Ax
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // Bx
    5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  4, 10, 17,  7, 11, // Cx
    5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  4,  7, 11, // Dx
    5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  4,  7, 11, // Ex
    5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  4,  7, 11, // Fx
];

/// T-states per ED-prefixed opcode, prefix included.
///
/// Repeating block instructions list the cost of their final iteration.
/// Undefined entries cost eight (two M1 cycles).
#[rustfmt::skip]
pub static CYCLES_ED: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 0x
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 1x
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 2x
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 3x
   12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9, // 4x
   12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9, // 5x
   12, 12, 15, 20,  8, 14,  8, 18, 12, 12, 15, 20,  8, 14,  8, 18, // 6x
   12, 12, 15, 20,  8, 14,  8,  8, 12, 12, 15, 20,  8, 14,  8,  8, // 7x
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 8x
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 9x
   16, 16, 16, 16,  8,  8,  8,  8, 16, 16, 16, 16,  8,  8,  8,  8, // Ax
   16, 16, 16, 16,  8,  8,  8,  8, 16, 16, 16, 16,  8,  8,  8,  8, // Bx
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Cx
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Dx
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Ex
    8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Fx
];

/// Extra T-states for a taken `JR cc` or `DJNZ`.
pub const JR_TAKEN: u32 = 5;

/// Extra T-states for a taken `CALL cc`.
pub const CALL_TAKEN: u32 = 7;

/// Extra T-states for a taken `RET cc`.
pub const RET_TAKEN: u32 = 6;

/// Extra T-states for a block instruction iteration that repeats.
pub const BLOCK_REPEAT: u32 = 5;

/// Extra T-states when a DD/FD prefix turns `(HL)` into `(IX+d)`.
///
/// The displacement fetch and address add cost eight; `LD (IX+d),n`
/// overlaps the add with the immediate read and only pays five.
#[must_use]
pub const fn indexed_extra(op: u8) -> u32 {
    match op {
        0x36 => 5,
        0x34 | 0x35 | 0x70..=0x75 | 0x77 => 8,
        0x40..=0xBF if op & 7 == 6 && op != 0x76 => 8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_check_documented_costs() {
        assert_eq!(CYCLES[0x3C], 4); // INC A
        assert_eq!(CYCLES[0x34], 11); // INC (HL)
        assert_eq!(CYCLES[0xCD], 17); // CALL
        assert_eq!(CYCLES[0xE3], 19); // EX (SP),HL
        assert_eq!(CYCLES_ED[0xB0], 16); // LDIR, last iteration
        assert_eq!(CYCLES_ED[0x6F], 18); // RLD
    }

    #[test]
    fn indexed_memory_forms() {
        // LD r,(IX+d) is 19 with the prefix.
        assert_eq!(4 + u32::from(CYCLES[0x7E]) + indexed_extra(0x7E), 19);
        // INC (IX+d) is 23.
        assert_eq!(4 + u32::from(CYCLES[0x34]) + indexed_extra(0x34), 23);
        // LD (IX+d),n is 19.
        assert_eq!(4 + u32::from(CYCLES[0x36]) + indexed_extra(0x36), 19);
        // LD A,IXH is 8.
        assert_eq!(4 + u32::from(CYCLES[0x7C]) + indexed_extra(0x7C), 8);
        assert_eq!(indexed_extra(0x76), 0);
    }
}
