//! Cycle clock: the time base shared by the CPU and every peripheral.
//!
//! A 32-bit counter accumulates the cycles reported after each instruction.
//! Rebasing folds part of the counter into a 64-bit offset so the counter
//! (and the timer deadlines measured against it) never overflow, while
//! `now() = offset + counter` never changes as a result.

use emu_core::{MasterClock, Ticks};

/// Default counter value above which the scheduler rebases on its own.
pub const DEFAULT_REBASE_THRESHOLD: u32 = 1 << 30;

/// Timer time base: one cycle is 0.5 µs whichever CPU board is fitted.
pub const TIMER_CLOCK: MasterClock = MasterClock::new(2_000_000);

/// Monotonic cycle counter with rebasing.
#[derive(Debug, Clone)]
pub struct CycleClock {
    counter: u32,
    offset: u64,
    rate: MasterClock,
}

impl CycleClock {
    #[must_use]
    pub const fn new(rate: MasterClock) -> Self {
        Self {
            counter: 0,
            offset: 0,
            rate,
        }
    }

    /// Total cycles since power-on.
    #[must_use]
    pub const fn now(&self) -> Ticks {
        Ticks::new(self.offset + self.counter as u64)
    }

    /// Cycles accumulated since the last rebase.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    #[must_use]
    pub const fn rate(&self) -> MasterClock {
        self.rate
    }

    /// Add elapsed cycles.
    ///
    /// The caller rebases well before the counter nears `u32::MAX`. If it
    /// does not, the whole count moves into the offset and the counter
    /// restarts at 0, so `now()` stays exact.
    pub fn advance(&mut self, cycles: u32) {
        match self.counter.checked_add(cycles) {
            Some(counter) => self.counter = counter,
            None => {
                self.offset += u64::from(self.counter) + u64::from(cycles);
                self.counter = 0;
                tracing::warn!("cycle counter overflowed before rebase; deadlines shifted");
            }
        }
    }

    /// Move `amount` cycles from the counter into the offset.
    pub fn rebase(&mut self, amount: u32) {
        let amount = amount.min(self.counter);
        self.counter -= amount;
        self.offset += u64::from(amount);
    }

    /// Convert a period in microseconds to cycles, saturating at
    /// `u32::MAX`.
    #[must_use]
    pub fn cycles_from_micros(&self, micros: u32) -> u32 {
        let cycles = self.rate.cycles_from_micros(u64::from(micros)).get();
        u32::try_from(cycles).unwrap_or_else(|_| {
            tracing::warn!("period of {micros} µs exceeds the cycle counter; clamped");
            u32::MAX
        })
    }
}
