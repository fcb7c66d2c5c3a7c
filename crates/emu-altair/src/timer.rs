//! Timer scheduler.
//!
//! Peripherals schedule time-based events (serial baud ticks, disk
//! rotation, the real-time clock) against the same cycle count the CPU
//! produces. There are a fixed number of slots, bound once at setup and
//! started or stopped freely afterwards.
//!
//! Running timers sit in a short queue sorted by deadline. Deadlines are
//! stored relative to the cycle counter's base, and every queue edit first
//! rebases so the counter and the deadlines stay small.
//!
//! Callbacks receive the scheduler and a caller-supplied context (the
//! machine's bus) so they can restart themselves or raise interrupts.

use emu_core::{MasterClock, Ticks};

use crate::clock::{CycleClock, DEFAULT_REBASE_THRESHOLD};
use crate::error::TimerError;

/// Number of timer slots.
pub const MAX_TIMERS: usize = 16;

/// A timer's expiry action.
pub type TimerCallback<C> = Box<dyn FnMut(&mut Scheduler<C>, &mut C)>;

struct Slot<C> {
    callback: Option<TimerCallback<C>>,
    bound: bool,
    running: bool,
    periodic: bool,
    default_period_us: u32,
    period_us: u32,
    period_cycles: u32,
    /// Expiry, relative to the clock counter's base.
    deadline: u32,
}

impl<C> Slot<C> {
    const fn unbound() -> Self {
        Self {
            callback: None,
            bound: false,
            running: false,
            periodic: false,
            default_period_us: 0,
            period_us: 0,
            period_cycles: 0,
            deadline: 0,
        }
    }
}

/// Cycle clock plus the sorted queue of running timers.
pub struct Scheduler<C> {
    clock: CycleClock,
    slots: [Slot<C>; MAX_TIMERS],
    /// Running timer ids, earliest deadline first.
    queue: [u8; MAX_TIMERS],
    queued: usize,
    rebase_threshold: u32,
}

impl<C> Scheduler<C> {
    #[must_use]
    pub fn new(rate: MasterClock) -> Self {
        Self {
            clock: CycleClock::new(rate),
            slots: std::array::from_fn(|_| Slot::unbound()),
            queue: [0; MAX_TIMERS],
            queued: 0,
            rebase_threshold: DEFAULT_REBASE_THRESHOLD,
        }
    }

    /// Bind `callback` to slot `id`. The timer is not started.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not a valid slot or the slot is already bound.
    pub fn setup<F>(&mut self, id: usize, default_period_us: u32, callback: F) -> Result<(), TimerError>
    where
        F: FnMut(&mut Scheduler<C>, &mut C) + 'static,
    {
        let slot = self
            .slots
            .get_mut(id)
            .ok_or(TimerError::OutOfRange { id })?;
        if slot.bound {
            return Err(TimerError::AlreadyBound { id });
        }
        slot.bound = true;
        slot.callback = Some(Box::new(callback));
        slot.default_period_us = default_period_us;
        slot.period_us = default_period_us;
        Ok(())
    }

    /// Start (or restart) timer `id`.
    ///
    /// A `period_us` of 0 selects the default period given at setup. The
    /// deadline is `now + period`. Starting an unbound slot does nothing.
    pub fn start(&mut self, id: usize, period_us: u32, recurring: bool) {
        let Some(slot) = self.slots.get(id) else {
            tracing::warn!("start of timer {id}: no such slot");
            return;
        };
        if !slot.bound {
            tracing::warn!("start of timer {id}: no callback bound");
            return;
        }

        self.remove(id);
        self.rebase();

        let period_us = if period_us == 0 {
            self.slots[id].default_period_us
        } else {
            period_us
        };
        let mut period_cycles = self.clock.cycles_from_micros(period_us);
        if recurring {
            period_cycles = period_cycles.max(1);
        }

        let deadline = self.clock.counter().saturating_add(period_cycles);
        let slot = &mut self.slots[id];
        slot.running = true;
        slot.periodic = recurring;
        slot.period_us = period_us;
        slot.period_cycles = period_cycles;
        slot.deadline = deadline;
        self.insert(id);
    }

    /// Stop timer `id`. Stopping a stopped timer is a no-op.
    pub fn stop(&mut self, id: usize) {
        if self.remove(id) {
            self.rebase();
        }
        if let Some(slot) = self.slots.get_mut(id) {
            slot.running = false;
        }
    }

    #[must_use]
    pub fn running(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(|slot| slot.running)
    }

    /// Period in microseconds of the last start, or the default period if
    /// the timer was never started.
    #[must_use]
    pub fn period(&self, id: usize) -> Option<u32> {
        self.slots
            .get(id)
            .filter(|slot| slot.bound)
            .map(|slot| slot.period_us)
    }

    /// Cycles until timer `id` fires (0 if overdue), or `None` if stopped.
    #[must_use]
    pub fn remaining(&self, id: usize) -> Option<u32> {
        let slot = self.slots.get(id).filter(|slot| slot.running)?;
        Some(slot.deadline.saturating_sub(self.clock.counter()))
    }

    /// Absolute cycle count of the earliest deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Ticks> {
        let head = self.head()?;
        let base = self.clock.now().get() - u64::from(self.clock.counter());
        Some(Ticks::new(base + u64::from(self.slots[head].deadline)))
    }

    /// Number of running timers.
    #[must_use]
    pub fn active(&self) -> usize {
        self.queued
    }

    /// Total cycles since power-on.
    #[must_use]
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    #[must_use]
    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    /// Counter value above which `tick` rebases even with no queue edits.
    pub fn set_rebase_threshold(&mut self, threshold: u32) {
        self.rebase_threshold = threshold.max(1);
    }

    /// Account for `cycles` elapsed and fire every timer whose deadline has
    /// been reached, earliest first.
    pub fn tick(&mut self, cycles: u32, context: &mut C) {
        self.clock.advance(cycles);

        while let Some(id) = self.head() {
            let deadline = self.slots[id].deadline;
            if deadline > self.clock.counter() {
                break;
            }

            // Pop and move the base up to this deadline.
            self.remove(id);
            self.shift(deadline);

            let slot = &mut self.slots[id];
            if slot.periodic {
                slot.deadline = slot.period_cycles;
                self.insert(id);
            } else {
                slot.running = false;
            }

            tracing::trace!(timer = id, at = self.clock.now().get(), "timer fired");
            if let Some(mut callback) = self.slots[id].callback.take() {
                callback(self, context);
                if self.slots[id].callback.is_none() {
                    self.slots[id].callback = Some(callback);
                }
            }
        }

        if self.clock.counter() >= self.rebase_threshold {
            self.rebase();
        }
    }

    fn head(&self) -> Option<usize> {
        (self.queued > 0).then(|| usize::from(self.queue[0]))
    }

    /// Fold consumed cycles into the clock offset without reordering
    /// overdue timers: never move the base past the earliest deadline.
    fn rebase(&mut self) {
        let amount = match self.head() {
            Some(head) => self.clock.counter().min(self.slots[head].deadline),
            None => self.clock.counter(),
        };
        self.shift(amount);
    }

    fn shift(&mut self, amount: u32) {
        if amount == 0 {
            return;
        }
        self.clock.rebase(amount);
        for &id in &self.queue[..self.queued] {
            let slot = &mut self.slots[usize::from(id)];
            slot.deadline = slot.deadline.saturating_sub(amount);
        }
    }

    /// Insert after any timer with an equal deadline.
    fn insert(&mut self, id: usize) {
        let deadline = self.slots[id].deadline;
        let at = self.queue[..self.queued]
            .iter()
            .position(|&other| self.slots[usize::from(other)].deadline > deadline)
            .unwrap_or(self.queued);
        self.queue.copy_within(at..self.queued, at + 1);
        self.queue[at] = id as u8;
        self.queued += 1;
    }

    fn remove(&mut self, id: usize) -> bool {
        let Some(at) = self.queue[..self.queued]
            .iter()
            .position(|&other| usize::from(other) == id)
        else {
            return false;
        };
        self.queue.copy_within(at + 1..self.queued, at);
        self.queued -= 1;
        true
    }
}

impl<C> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("clock", &self.clock)
            .field("queue", &&self.queue[..self.queued])
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler<Vec<usize>> {
        Scheduler::new(MasterClock::new(2_000_000))
    }

    #[test]
    fn setup_rejects_bad_slots() {
        let mut timers = scheduler();
        assert_eq!(
            timers.setup(MAX_TIMERS, 100, |_, _| {}),
            Err(TimerError::OutOfRange { id: MAX_TIMERS })
        );
        assert!(timers.setup(3, 100, |_, _| {}).is_ok());
        assert_eq!(
            timers.setup(3, 100, |_, _| {}),
            Err(TimerError::AlreadyBound { id: 3 })
        );
    }

    #[test]
    fn default_period_applies_when_override_is_zero() {
        let mut timers = scheduler();
        timers.setup(0, 250, |_, _| {}).unwrap();
        assert_eq!(timers.period(0), Some(250));
        timers.start(0, 0, false);
        assert_eq!(timers.remaining(0), Some(500));
        timers.start(0, 100, false);
        assert_eq!(timers.period(0), Some(100));
        assert_eq!(timers.remaining(0), Some(200));
    }

    #[test]
    fn unbound_start_is_ignored() {
        let mut timers = scheduler();
        timers.start(5, 100, true);
        assert!(!timers.running(5));
        assert_eq!(timers.active(), 0);
    }

    #[test]
    fn queue_stays_sorted_and_stop_is_idempotent() {
        let mut timers = scheduler();
        for id in 0..3 {
            timers.setup(id, 0, |_, _| {}).unwrap();
        }
        timers.start(0, 300, false);
        timers.start(1, 100, false);
        timers.start(2, 200, false);
        assert_eq!(&timers.queue[..3], &[1, 2, 0]);
        timers.stop(2);
        timers.stop(2);
        assert_eq!(&timers.queue[..timers.active()], &[1, 0]);
        assert!(!timers.running(2));
    }

    #[test]
    fn overdue_timers_fire_in_deadline_order() {
        let mut timers = scheduler();
        for id in 0..2 {
            timers
                .setup(id, 0, move |_, fired: &mut Vec<usize>| fired.push(id))
                .unwrap();
        }
        timers.start(0, 50, false); // 100 cycles
        timers.start(1, 25, false); // 50 cycles
        let mut fired = Vec::new();
        timers.tick(150, &mut fired);
        assert_eq!(fired, [1, 0]);
        assert_eq!(timers.now(), Ticks::new(150));
    }

    #[test]
    fn periodic_catches_up_inside_one_tick() {
        let mut timers = scheduler();
        timers
            .setup(0, 50, |_, fired: &mut Vec<usize>| fired.push(0))
            .unwrap();
        timers.start(0, 0, true); // every 100 cycles
        let mut fired = Vec::new();
        timers.tick(350, &mut fired);
        assert_eq!(fired.len(), 3);
        assert_eq!(timers.remaining(0), Some(50));
    }

    #[test]
    fn callback_can_restart_itself() {
        let mut timers = scheduler();
        timers
            .setup(0, 10, |sched: &mut Scheduler<Vec<usize>>, fired: &mut Vec<usize>| {
                fired.push(0);
                if fired.len() < 3 {
                    sched.start(0, 0, false);
                }
            })
            .unwrap();
        timers.start(0, 0, false);
        let mut fired = Vec::new();
        for _ in 0..10 {
            timers.tick(20, &mut fired);
        }
        assert_eq!(fired.len(), 3);
        assert!(!timers.running(0));
    }

    #[test]
    fn threshold_rebase_keeps_time_and_deadlines() {
        let mut timers = scheduler();
        timers.set_rebase_threshold(64);
        timers.setup(0, 0, |_, _| {}).unwrap();
        timers.start(0, 500, false); // 1000 cycles
        let mut ctx = Vec::new();
        timers.tick(100, &mut ctx);
        assert_eq!(timers.now(), Ticks::new(100));
        assert_eq!(timers.clock().counter(), 0);
        assert_eq!(timers.remaining(0), Some(900));
        assert_eq!(timers.next_deadline(), Some(Ticks::new(1000)));
    }
}
