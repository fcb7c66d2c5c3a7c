//! CPU core trait.

use crate::{Bus, Ticks};

/// An instruction-stepped CPU core.
///
/// The bus is passed in, not owned, so the machine can share it with timer
/// callbacks and the front panel between instructions. Every call completes
/// exactly one instruction (or one halted wait slice) and reports the cycles
/// it consumed, which the caller feeds to its cycle clock.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction and return its cycle cost.
    ///
    /// While halted, no instruction is fetched: the call burns a short wait
    /// slice so the caller's clock (and its timers) keep moving.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Service a granted maskable interrupt.
    ///
    /// The caller has already decided delivery is allowed. The CPU runs an
    /// interrupt acknowledge cycle, executes the opcode the bus supplies in
    /// place of a memory fetch, and clears its interrupt enable. Returns the
    /// cycles consumed.
    fn interrupt<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Current program counter.
    fn pc(&self) -> u16;

    /// Snapshot of all registers.
    fn registers(&self) -> Self::Registers;

    /// True while the CPU is in the halt wait state.
    fn is_halted(&self) -> bool;

    /// State of the interrupt enable flip-flop (INTE / IFF1).
    fn interrupts_enabled(&self) -> bool;

    /// Total cycles consumed since reset.
    fn total_cycles(&self) -> Ticks;

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
