//! 8080 flag register bits.
//!
//! Layout: `S Z 0 AC 0 P 1 CY`. Bit 1 always reads as 1; bits 3 and 5 always
//! read as 0, whatever is popped into PSW.

/// Sign flag (bit 7).
pub const S: u8 = 0b1000_0000;

/// Zero flag (bit 6).
pub const Z: u8 = 0b0100_0000;

/// Auxiliary carry (bit 4): carry out of bit 3.
pub const AC: u8 = 0b0001_0000;

/// Parity flag (bit 2): set on even parity.
pub const P: u8 = 0b0000_0100;

/// Carry flag (bit 0).
pub const CY: u8 = 0b0000_0001;

/// Bit that always reads as 1.
pub const ALWAYS_ONE: u8 = 0b0000_0010;

/// Bits that can ever be set in F.
pub const DEFINED: u8 = S | Z | AC | P | CY | ALWAYS_ONE;

/// Even-parity lookup, indexed by byte value.
pub static PARITY: [bool; 256] = build_parity();

const fn build_parity() -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() % 2 == 0;
        i += 1;
    }
    table
}

/// Sign, zero and parity flags for a result byte.
#[must_use]
pub fn szp(value: u8) -> u8 {
    let mut f = value & S;
    if value == 0 {
        f |= Z;
    }
    if PARITY[value as usize] {
        f |= P;
    }
    f
}

/// Normalise a byte popped into PSW.
#[must_use]
pub const fn normalise(f: u8) -> u8 {
    (f & DEFINED) | ALWAYS_ONE
}
