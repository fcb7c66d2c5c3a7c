//! CPU clock rate.

use crate::Ticks;

/// CPU clock configuration.
///
/// All timing derives from this frequency. Peripherals express their periods
/// in microseconds and convert to cycles through the active clock, so a
/// processor swap that changes the clock rate keeps real-time behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Clock frequency in Hz (e.g., `2_000_000` for the Altair 8080 board).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Cycles elapsed in `micros` microseconds.
    #[must_use]
    pub const fn cycles_from_micros(&self, micros: u64) -> Ticks {
        Ticks::new(micros * self.frequency_hz / 1_000_000)
    }

    /// Microseconds represented by `ticks` cycles (truncating).
    #[must_use]
    pub const fn micros_from_cycles(&self, ticks: Ticks) -> u64 {
        ticks.get() * 1_000_000 / self.frequency_hz
    }
}
