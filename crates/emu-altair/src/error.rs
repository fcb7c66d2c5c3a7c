//! Setup and configuration errors.
//!
//! Running the machine never fails: illegal opcodes and dropped writes are
//! absorbed and counted. Only wiring the machine together can go wrong.

use thiserror::Error;

use crate::timer::MAX_TIMERS;

/// Timer slot binding failures, reported by `Scheduler::setup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer id {id} out of range (max {max})", max = MAX_TIMERS - 1)]
    OutOfRange { id: usize },

    #[error("timer {id} already has a callback")]
    AlreadyBound { id: usize },
}

/// Machine configuration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AltairError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("ROM of {len} bytes at {address:#06X} runs past the top of memory")]
    RomTooLarge { address: u16, len: usize },

    #[error("ports {first:#04X}..={last:#04X} overlap an existing handler at {port:#04X}")]
    PortInUse { first: u8, last: u8, port: u8 },

    #[error("vector level {level} out of range (0-7)")]
    VectorLevel { level: u8 },

    #[error("processor is fixed to {0:?}; select a switchable configuration")]
    FixedProcessor(crate::CpuKind),
}
