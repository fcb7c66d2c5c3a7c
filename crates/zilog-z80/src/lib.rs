//! Instruction-stepped Z80 CPU emulator.
//!
//! Each call to `step()` executes one instruction (or one DD/FD prefix byte)
//! and returns the T-states it took. All undocumented behaviour that test
//! suites check is modelled: XF/YF, MEMPTR (WZ), Q, SLL, IXH/IXL and the
//! DDCB register side effects.

mod alu;
mod cpu;
mod flags;
mod registers;
mod timing;

pub use cpu::{HALT_SLICE, Z80};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
pub use timing::{CYCLES, CYCLES_ED};
