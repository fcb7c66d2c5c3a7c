//! 8080 instruction timing.

/// Base cycle cost per opcode.
///
/// Conditional calls and returns list their not-taken cost; taking the
/// branch adds six cycles. Undefined opcodes cost four, like NOP.
#[rustfmt::skip]
pub static CYCLES: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 10,  7,  5,  5,  5,  7,  4,  4, 10,  7,  5,  5,  5,  7,  4, // 0x
    4, 10,  7,  5,  5,  5,  7,  4,  4, 10,  7,  5,  5,  5,  7,  4, // 1x
    4, 10, 16,  5,  5,  5,  7,  4,  4, 10, 16,  5,  5,  5,  7,  4, // 2x
    4, 10, 13,  5, 10, 10, 10,  4,  4, 10, 13,  5,  5,  5,  7,  4, // 3x
    5,  5,  5,  5,  5,  5,  7,  5,  5,  5,  5,  5,  5,  5,  7,  5, // 4x
    5,  5,  5,  5,  5,  5,  7,  5,  5,  5,  5,  5,  5,  5,  7,  5, // 5x
    5,  5,  5,  5,  5,  5,  7,  5,  5,  5,  5,  5,  5,  5,  7,  5, // 6x
    7,  7,  7,  7,  7,  7,  7,  7,  5,  5,  5,  5,  5,  5,  7,  5, // 7x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 8x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 9x
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // Ax
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // Bx
    5, 10, 10, 10, 11, 11,  7, 11,  5, 10, 10,  4, 11, 17,  7, 11, // Cx
    5, 10, 10, 10, 11, 11,  7, 11,  5,  4, 10, 10, 11,  4,  7, 11, // Dx
    5, 10, 10, 18, 11, 11,  7, 11,  5,  5, 10,  4, 11,  4,  7, 11, // Ex
    5, 10, 10,  4, 11, 11,  7, 11,  5,  5, 10,  4, 11,  4,  7, 11, // Fx
];

/// Extra cycles when a conditional call or return is taken.
pub const BRANCH_TAKEN: u32 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_check_documented_costs() {
        assert_eq!(CYCLES[0x00], 4); // NOP
        assert_eq!(CYCLES[0x3C], 5); // INR A
        assert_eq!(CYCLES[0x34], 10); // INR M
        assert_eq!(CYCLES[0x76], 7); // HLT
        assert_eq!(CYCLES[0x80], 4); // ADD B
        assert_eq!(CYCLES[0xCD], 17); // CALL
        assert_eq!(CYCLES[0xE3], 18); // XTHL
        assert_eq!(CYCLES[0xFF], 11); // RST 7
    }
}
