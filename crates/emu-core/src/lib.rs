//! Core traits and types for cycle-accurate 8-bit CPU emulation.
//!
//! Time is measured in CPU clock cycles. Every component that needs a sense
//! of time (timers, serial ports, disk rotation) derives it from the cycle
//! count the CPU reports after each instruction. No exceptions.

mod bus;
mod clock;
mod cpu;
mod observable;
mod status;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use status::{BusCycle, BusObserver, Status};
pub use ticks::Ticks;
