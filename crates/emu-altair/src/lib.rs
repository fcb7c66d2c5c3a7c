//! Altair 8800 core: CPU board, cycle clock, timers, interrupts and bus.
//!
//! Everything runs on one thread in one time base. The CPU reports the
//! cycles each instruction took; the scheduler advances the clock by that
//! amount and fires any timers that came due; the interrupt controller is
//! consulted only between instructions. Peripherals plug in through
//! [`PortHandler`] and schedule work through [`Scheduler`].

mod altair;
pub mod bus;
pub mod clock;
mod config;
mod error;
pub mod irq;
pub mod memory;
mod processor;
pub mod timer;

pub use altair::{Altair, AuxSwitch};
pub use bus::{AltairBus, IoContext, PortHandler, TimerCommand};
pub use clock::{CycleClock, TIMER_CLOCK};
pub use config::{AltairConfig, CpuVariant};
pub use error::{AltairError, TimerError};
pub use irq::InterruptController;
pub use memory::Memory;
pub use processor::{CpuKind, I8080_CLOCK, Processor, ProcessorRegisters, Z80_CLOCK};
pub use timer::{MAX_TIMERS, Scheduler, TimerCallback};
