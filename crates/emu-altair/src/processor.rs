//! CPU board selection.
//!
//! The Altair ships with an 8080 at 2 MHz; Z80 boards run at 4 MHz. Both
//! cores sit behind one `Cpu` implementation so the machine loop does not
//! care which is fitted, and a switchable machine can change boards at
//! reset.

use emu_core::{Bus, Cpu, MasterClock, Observable, Ticks, Value};
use intel_8080::I8080;
use zilog_z80::Z80;

/// 8080 board clock.
pub const I8080_CLOCK: MasterClock = MasterClock::new(2_000_000);
/// Z80 board clock.
pub const Z80_CLOCK: MasterClock = MasterClock::new(4_000_000);

/// Which core is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CpuKind {
    I8080,
    Z80,
}

impl CpuKind {
    /// CPU crystal. Timers always count at [`crate::TIMER_CLOCK`].
    #[must_use]
    pub const fn clock(self) -> MasterClock {
        match self {
            Self::I8080 => I8080_CLOCK,
            Self::Z80 => Z80_CLOCK,
        }
    }
}

/// Register snapshot from whichever core is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorRegisters {
    I8080(intel_8080::Registers),
    Z80(zilog_z80::Registers),
}

/// The fitted CPU.
pub enum Processor {
    I8080(I8080),
    Z80(Z80),
}

impl Processor {
    #[must_use]
    pub fn new(kind: CpuKind) -> Self {
        match kind {
            CpuKind::I8080 => Self::I8080(I8080::new()),
            CpuKind::Z80 => Self::Z80(Z80::new()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CpuKind {
        match self {
            Self::I8080(_) => CpuKind::I8080,
            Self::Z80(_) => CpuKind::Z80,
        }
    }

    /// Undefined opcodes executed since reset.
    #[must_use]
    pub const fn illegal_opcodes(&self) -> u64 {
        match self {
            Self::I8080(cpu) => cpu.illegal_opcodes(),
            Self::Z80(cpu) => cpu.illegal_opcodes(),
        }
    }

    /// True between a Z80 DD/FD prefix and the opcode it modifies.
    #[must_use]
    pub fn mid_instruction(&self) -> bool {
        match self {
            Self::I8080(_) => false,
            Self::Z80(cpu) => cpu.prefix_pending(),
        }
    }
}

impl Cpu for Processor {
    type Registers = ProcessorRegisters;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        match self {
            Self::I8080(cpu) => cpu.step(bus),
            Self::Z80(cpu) => cpu.step(bus),
        }
    }

    fn interrupt<B: Bus>(&mut self, bus: &mut B) -> u32 {
        match self {
            Self::I8080(cpu) => cpu.interrupt(bus),
            Self::Z80(cpu) => cpu.interrupt(bus),
        }
    }

    fn pc(&self) -> u16 {
        match self {
            Self::I8080(cpu) => cpu.pc(),
            Self::Z80(cpu) => cpu.pc(),
        }
    }

    fn registers(&self) -> ProcessorRegisters {
        match self {
            Self::I8080(cpu) => ProcessorRegisters::I8080(cpu.registers()),
            Self::Z80(cpu) => ProcessorRegisters::Z80(cpu.registers()),
        }
    }

    fn is_halted(&self) -> bool {
        match self {
            Self::I8080(cpu) => cpu.is_halted(),
            Self::Z80(cpu) => cpu.is_halted(),
        }
    }

    fn interrupts_enabled(&self) -> bool {
        match self {
            Self::I8080(cpu) => cpu.interrupts_enabled(),
            Self::Z80(cpu) => cpu.interrupts_enabled(),
        }
    }

    fn total_cycles(&self) -> Ticks {
        match self {
            Self::I8080(cpu) => cpu.total_cycles(),
            Self::Z80(cpu) => cpu.total_cycles(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::I8080(cpu) => cpu.reset(),
            Self::Z80(cpu) => cpu.reset(),
        }
    }
}

impl Observable for Processor {
    fn query(&self, path: &str) -> Option<Value> {
        match self {
            Self::I8080(cpu) => cpu.query(path),
            Self::Z80(cpu) => cpu.query(path),
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        match self {
            Self::I8080(cpu) => cpu.query_paths(),
            Self::Z80(cpu) => cpu.query_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    #[test]
    fn both_cores_run_behind_one_interface() {
        for kind in [CpuKind::I8080, CpuKind::Z80] {
            let mut cpu = Processor::new(kind);
            let mut bus = SimpleBus::new();
            bus.load(0x0000, &[0x3C]); // INR A / INC A
            let cycles = cpu.step(&mut bus);
            assert_eq!(cpu.pc(), 1);
            assert_eq!(cpu.kind(), kind);
            let expected = if kind == CpuKind::I8080 { 5 } else { 4 };
            assert_eq!(cycles, expected);
        }
    }

    #[test]
    fn clock_rates_follow_the_board() {
        assert_eq!(CpuKind::I8080.clock().frequency_hz, 2_000_000);
        assert_eq!(CpuKind::Z80.clock().frequency_hz, 4_000_000);
    }
}
