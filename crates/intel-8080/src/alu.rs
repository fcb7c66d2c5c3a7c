//! ALU operations for the 8080.
//!
//! Every function returns the result and the complete set of flags the
//! operation defines. Callers merge in any flags the instruction preserves
//! (INR/DCR keep CY, rotates keep everything but CY).

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use crate::flags::{szp, AC, ALWAYS_ONE, CY};

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// ADD/ADC/ADI/ACI.
#[must_use]
pub fn add(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let sum = u16::from(a) + u16::from(b) + u16::from(c);
    let value = sum as u8;

    let mut flags = szp(value) | ALWAYS_ONE;
    if (a & 0x0F) + (b & 0x0F) + c > 0x0F {
        flags |= AC;
    }
    if sum > 0xFF {
        flags |= CY;
    }
    AluResult { value, flags }
}

/// SUB/SBB/SUI/SBI/CMP/CPI.
///
/// The 8080 subtracts by adding the one's complement of the operand with an
/// inverted borrow as carry-in. AC is the carry out of bit 3 of that
/// addition, which is the inverse of a nibble borrow.
#[must_use]
pub fn sub(a: u8, b: u8, borrow: bool) -> AluResult {
    let carry_in = u8::from(!borrow);
    let value = a.wrapping_sub(b).wrapping_sub(u8::from(borrow));

    let mut flags = szp(value) | ALWAYS_ONE;
    if (a & 0x0F) + (!b & 0x0F) + carry_in > 0x0F {
        flags |= AC;
    }
    if u16::from(a) < u16::from(b) + u16::from(borrow) {
        flags |= CY;
    }
    AluResult { value, flags }
}

/// ANA/ANI. AC reflects bit 3 of the OR of the operands.
#[must_use]
pub fn and(a: u8, b: u8) -> AluResult {
    let value = a & b;
    let mut flags = szp(value) | ALWAYS_ONE;
    if (a | b) & 0x08 != 0 {
        flags |= AC;
    }
    AluResult { value, flags }
}

/// XRA/XRI. Clears AC and CY.
#[must_use]
pub fn xor(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult {
        value,
        flags: szp(value) | ALWAYS_ONE,
    }
}

/// ORA/ORI. Clears AC and CY.
#[must_use]
pub fn or(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult {
        value,
        flags: szp(value) | ALWAYS_ONE,
    }
}

/// INR. CY is not affected; the returned flags never include it.
#[must_use]
pub fn inr(a: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let mut flags = szp(value) | ALWAYS_ONE;
    if value & 0x0F == 0 {
        flags |= AC;
    }
    AluResult { value, flags }
}

/// DCR. CY is not affected; the returned flags never include it.
#[must_use]
pub fn dcr(a: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let mut flags = szp(value) | ALWAYS_ONE;
    if value & 0x0F != 0x0F {
        flags |= AC;
    }
    AluResult { value, flags }
}

/// DAA.
///
/// Low nibble first: add 6 if it exceeds 9 or AC is set. Then the high
/// nibble: add 0x60 if it exceeds 9 (or is 9 with a low nibble that will
/// carry into it) or CY is set. CY is only ever set, never cleared; AC is the
/// nibble carry of the correcting addition.
#[must_use]
pub fn daa(a: u8, flags: u8) -> AluResult {
    let lsb = a & 0x0F;
    let msb = a >> 4;
    let mut correction = 0u8;
    let mut carry = flags & CY != 0;

    if flags & AC != 0 || lsb > 9 {
        correction |= 0x06;
    }
    if carry || msb > 9 || (msb >= 9 && lsb > 9) {
        correction |= 0x60;
        carry = true;
    }

    let sum = add(a, correction, false);
    AluResult {
        value: sum.value,
        flags: (sum.flags & !CY) | if carry { CY } else { 0 },
    }
}

/// DAD. Only CY is affected.
#[must_use]
pub fn dad(hl: u16, value: u16) -> (u16, bool) {
    let (result, carry) = hl.overflowing_add(value);
    (result, carry)
}

/// RLC: bit 7 to CY and bit 0.
#[must_use]
pub const fn rlc(a: u8) -> (u8, bool) {
    (a.rotate_left(1), a & 0x80 != 0)
}

/// RRC: bit 0 to CY and bit 7.
#[must_use]
pub const fn rrc(a: u8) -> (u8, bool) {
    (a.rotate_right(1), a & 0x01 != 0)
}

/// RAL: rotate left through carry.
#[must_use]
pub const fn ral(a: u8, carry: bool) -> (u8, bool) {
    ((a << 1) | carry as u8, a & 0x80 != 0)
}

/// RAR: rotate right through carry.
#[must_use]
pub const fn rar(a: u8, carry: bool) -> (u8, bool) {
    ((a >> 1) | ((carry as u8) << 7), a & 0x01 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{P, S, Z};

    #[test]
    fn add_to_zero_sets_carry_and_aux() {
        let r = add(0x3A, 0xC6, false);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, Z | AC | P | CY | ALWAYS_ONE);
    }

    #[test]
    fn sub_aux_is_inverted_borrow() {
        // 0x10 - 0x01: nibble borrow, so AC is clear.
        let r = sub(0x10, 0x01, false);
        assert_eq!(r.value, 0x0F);
        assert_eq!(r.flags & AC, 0);
        // 0x11 - 0x01: no nibble borrow, so AC is set.
        let r = sub(0x11, 0x01, false);
        assert_ne!(r.flags & AC, 0);
    }

    #[test]
    fn sub_with_borrow_underflows() {
        let r = sub(0x00, 0x00, true);
        assert_eq!(r.value, 0xFF);
        assert_ne!(r.flags & CY, 0);
        assert_ne!(r.flags & S, 0);
    }

    #[test]
    fn and_aux_from_operand_bit_three() {
        assert_ne!(and(0x08, 0x00).flags & AC, 0);
        assert_eq!(and(0xF0, 0xF0).flags & AC, 0);
    }

    #[test]
    fn inr_wraps_with_aux() {
        let r = inr(0xFF);
        assert_eq!(r.value, 0);
        assert_eq!(r.flags & (Z | AC), Z | AC);
        assert_eq!(r.flags & CY, 0);
    }

    #[test]
    fn dcr_aux_clear_on_nibble_borrow() {
        assert_eq!(dcr(0x10).flags & AC, 0);
        assert_ne!(dcr(0x11).flags & AC, 0);
    }

    #[test]
    fn daa_corrects_both_nibbles() {
        let r = daa(0x9A, ALWAYS_ONE);
        assert_eq!(r.value, 0x00);
        assert_ne!(r.flags & CY, 0);
        assert_ne!(r.flags & AC, 0);
        assert_ne!(r.flags & Z, 0);
    }

    #[test]
    fn daa_after_bcd_add() {
        // 0x15 + 0x27 = 0x3C -> 0x42
        let sum = add(0x15, 0x27, false);
        let r = daa(sum.value, sum.flags);
        assert_eq!(r.value, 0x42);
        assert_eq!(r.flags & CY, 0);
    }

    #[test]
    fn rotates_through_carry() {
        assert_eq!(ral(0x80, false), (0x00, true));
        assert_eq!(rar(0x01, true), (0x80, true));
        assert_eq!(rlc(0x81), (0x03, true));
        assert_eq!(rrc(0x02), (0x01, false));
    }
}
