//! Instruction-stepped Intel 8080 CPU emulator.
//!
//! Each call to `step()` executes one complete instruction and returns its
//! documented cycle cost (one cycle = one clock state, 0.5 µs at 2 MHz).

mod alu;
mod cpu;
mod flags;
mod registers;
mod timing;

pub use cpu::{HALT_SLICE, I8080};
pub use flags::{AC, CY, P, S, Z};
pub use registers::Registers;
pub use timing::CYCLES;
