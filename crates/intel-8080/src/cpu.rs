//! 8080 CPU core with per-instruction execution.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use emu_core::{Bus, Cpu, Observable, Ticks, Value};

use crate::flags::{AC, CY, P, S, Z};
use crate::registers::Registers;

/// Cycles burned per `step()` while halted.
pub const HALT_SLICE: u32 = 4;

/// Intel 8080 CPU.
///
/// The CPU does not own the bus. The bus is passed to `step()` for each
/// instruction so the machine can share it with timers and the front panel.
pub struct I8080 {
    /// Register file.
    pub regs: Registers,

    /// True while executing an opcode supplied by interrupt acknowledge.
    /// Operand bytes then come from the data bus instead of memory at PC.
    acknowledging: bool,

    /// Address/opcode pairs executed silently as NOP even though the opcode
    /// is undefined.
    quiet_undefined: Vec<(u16, u8)>,

    /// Undefined opcodes executed since reset.
    illegal_opcodes: u64,

    /// Total cycles elapsed since reset.
    total_cycles: Ticks,
}

impl I8080 {
    /// Create a new 8080 in its power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            acknowledging: false,
            quiet_undefined: Vec::new(),
            illegal_opcodes: 0,
            total_cycles: Ticks::ZERO,
        }
    }

    /// Execute `opcode` at `address` as a silent NOP.
    ///
    /// Some BASIC interpreters contain an undefined opcode that the real
    /// chip happens to treat as a NOP; registering it here suppresses the
    /// diagnostic for that one location.
    pub fn allow_undefined(&mut self, address: u16, opcode: u8) {
        if !self.quiet_undefined.contains(&(address, opcode)) {
            self.quiet_undefined.push((address, opcode));
        }
    }

    /// Number of undefined opcodes executed since reset.
    #[must_use]
    pub const fn illegal_opcodes(&self) -> u64 {
        self.illegal_opcodes
    }

    /// Read the next instruction byte.
    fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        if self.acknowledging {
            return bus.interrupt_acknowledge();
        }
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Read the next instruction word (little-endian).
    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus);
        let hi = self.fetch_byte(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    fn read_word<B: Bus>(bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from(lo) | (u16::from(hi) << 8)
    }

    fn write_word<B: Bus>(bus: &mut B, addr: u16, value: u16) {
        bus.write(addr, value as u8);
        bus.write(addr.wrapping_add(1), (value >> 8) as u8);
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.stack_write(self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.stack_write(self.regs.sp, value as u8);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.stack_read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = bus.stack_read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Register by 3-bit encoding; 6 is memory at HL.
    fn get_reg8<B: Bus>(&self, bus: &mut B, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => bus.read(self.regs.hl()),
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    fn set_reg8<B: Bus>(&mut self, bus: &mut B, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => bus.write(self.regs.hl(), value),
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }

    /// Register pair by 2-bit encoding (B, D, H, SP).
    fn get_rp(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    fn set_rp(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    /// Evaluate a condition code (NZ, Z, NC, C, PO, PE, P, M).
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & Z == 0,
            1 => f & Z != 0,
            2 => f & CY == 0,
            3 => f & CY != 0,
            4 => f & P == 0,
            5 => f & P != 0,
            6 => f & S == 0,
            7 => f & S != 0,
            _ => unreachable!(),
        }
    }

    fn set_inte<B: Bus>(&mut self, bus: &mut B, enabled: bool) {
        self.regs.inte = enabled;
        bus.interrupt_enable(enabled);
    }

    /// Log an undefined opcode unless it is registered as quiet.
    fn undefined(&mut self, op: u8) {
        let addr = self.regs.pc.wrapping_sub(1);
        if self.quiet_undefined.contains(&(addr, op)) {
            return;
        }
        self.illegal_opcodes += 1;
        tracing::warn!("Unknown 8080 opcode: 0x{:02X} at PC 0x{:04X}", op, addr);
    }
}

// Instruction execution split into separate file for readability
mod execute;

impl Default for I8080 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for I8080 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let cycles = if self.regs.halted {
            HALT_SLICE
        } else {
            let op = bus.fetch(self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            self.execute(bus, op)
        };
        self.total_cycles += cycles;
        cycles
    }

    fn interrupt<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.regs.halted = false;
        self.set_inte(bus, false);
        self.acknowledging = true;
        let op = bus.interrupt_acknowledge();
        let cycles = self.execute(bus, op);
        self.acknowledging = false;
        self.total_cycles += cycles;
        cycles
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn interrupts_enabled(&self) -> bool {
        self.regs.inte
    }

    fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }

    fn reset(&mut self) {
        // RESET clears PC, INTE and the halt latch; the 8080 leaves the other
        // registers as they were.
        self.regs.pc = 0;
        self.regs.inte = false;
        self.regs.halted = false;
        self.acknowledging = false;
        self.illegal_opcodes = 0;
        self.total_cycles = Ticks::ZERO;
    }
}

/// All query paths supported by the 8080.
const I8080_QUERY_PATHS: &[&str] = &[
    "a", "f", "b", "c", "d", "e", "h", "l",
    "psw", "bc", "de", "hl", "sp", "pc",
    "flags.s", "flags.z", "flags.ac", "flags.p", "flags.cy",
    "inte", "halted", "cycles", "illegal",
];

impl Observable for I8080 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        match path {
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "b" => Some(r.b.into()),
            "c" => Some(r.c.into()),
            "d" => Some(r.d.into()),
            "e" => Some(r.e.into()),
            "h" => Some(r.h.into()),
            "l" => Some(r.l.into()),
            "psw" => Some(r.psw().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "flags.s" => Some((r.f & S != 0).into()),
            "flags.z" => Some((r.f & Z != 0).into()),
            "flags.ac" => Some((r.f & AC != 0).into()),
            "flags.p" => Some((r.f & P != 0).into()),
            "flags.cy" => Some((r.f & CY != 0).into()),
            "inte" => Some(r.inte.into()),
            "halted" => Some(r.halted.into()),
            "cycles" => Some(self.total_cycles.get().into()),
            "illegal" => Some(self.illegal_opcodes.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        I8080_QUERY_PATHS
    }
}
