//! Z80 CPU core with per-instruction execution.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.

use emu_core::{Bus, Cpu, Observable, Ticks, Value};

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::registers::Registers;

/// T-states burned per `step()` while halted (one internal NOP).
pub const HALT_SLICE: u32 = 4;

/// Register substituted for HL by a DD/FD prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Index {
    Hl,
    Ix,
    Iy,
}

/// Zilog Z80 CPU.
///
/// The CPU does not own the bus. The bus is passed to `step()` for each
/// instruction so the machine can share it with timers and the front panel.
///
/// DD and FD prefixes are executed as separate 4 T-state steps, the way the
/// silicon fetches them. A chain of prefixes therefore never stalls the
/// caller, and maskable interrupts are held off until the prefixed opcode
/// has run.
pub struct Z80 {
    /// Register file.
    pub regs: Registers,

    /// Prefix latched by the previous DD/FD step.
    prefix: Index,
    /// Index register in effect for the instruction being executed.
    index: Index,

    /// Flags written by the current instruction (0 if it left F alone).
    q: u8,
    /// Q of the previous instruction, read by SCF/CCF.
    prev_q: u8,

    /// True while executing an IM 0 opcode supplied by interrupt acknowledge.
    acknowledging: bool,

    /// Undefined ED opcodes executed since reset.
    illegal_opcodes: u64,

    /// Total T-states elapsed since reset.
    total_cycles: Ticks,
}

impl Z80 {
    /// Create a new Z80 in its power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            prefix: Index::Hl,
            index: Index::Hl,
            q: 0,
            prev_q: 0,
            acknowledging: false,
            illegal_opcodes: 0,
            total_cycles: Ticks::ZERO,
        }
    }

    /// Number of undefined ED opcodes executed since reset.
    #[must_use]
    pub const fn illegal_opcodes(&self) -> u64 {
        self.illegal_opcodes
    }

    /// Flags written by the last instruction, or 0 if it left F alone.
    #[must_use]
    pub const fn q(&self) -> u8 {
        self.q
    }

    /// Preset Q, for harnesses that restore a captured CPU state.
    pub fn set_q(&mut self, q: u8) {
        self.q = q;
    }

    /// True between a DD/FD prefix and the opcode it modifies.
    #[must_use]
    pub fn prefix_pending(&self) -> bool {
        self.prefix != Index::Hl
    }

    /// Non-maskable interrupt: push PC and jump to 0x0066.
    ///
    /// IFF1 is cleared and IFF2 keeps the pre-NMI state so `RETN` can
    /// restore it. Returns the T-states consumed.
    pub fn nmi<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.prefix_pending() {
            return self.step(bus);
        }
        self.regs.halted = false;
        self.regs.iff1 = false;
        bus.interrupt_enable(false);
        self.inc_r();
        self.prev_q = self.q;
        self.q = 0;
        self.push(bus, self.regs.pc);
        self.regs.pc = 0x0066;
        self.regs.wz = 0x0066;
        self.total_cycles += 11;
        11
    }

    /// Increment the lower 7 bits of R (every M1 cycle).
    fn inc_r(&mut self) {
        self.regs.r = (self.regs.r & 0x80) | (self.regs.r.wrapping_add(1) & 0x7F);
    }

    /// Opcode fetch (M1): increments R.
    fn fetch_m1<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.inc_r();
        if self.acknowledging {
            return bus.interrupt_acknowledge();
        }
        let op = bus.fetch(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        op
    }

    /// Read the next instruction byte (operand, displacement).
    fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        if self.acknowledging {
            return bus.interrupt_acknowledge();
        }
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

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

    /// Write F and record it as this instruction's Q.
    fn set_f(&mut self, value: u8) {
        self.regs.f = value;
        self.q = value;
    }

    /// HL, IX or IY depending on the active prefix.
    fn index_reg(&self) -> u16 {
        match self.index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index_reg(&mut self, value: u16) {
        match self.index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// Address of the `(HL)` operand: HL itself, or IX/IY plus a signed
    /// displacement fetched from the instruction stream.
    fn memory_operand<B: Bus>(&mut self, bus: &mut B) -> u16 {
        if self.index == Index::Hl {
            return self.regs.hl();
        }
        let d = self.fetch_byte(bus) as i8;
        let addr = self.index_reg().wrapping_add_signed(i16::from(d));
        self.regs.wz = addr;
        addr
    }

    /// 8-bit register by 3-bit encoding, with H/L replaced by the high/low
    /// half of IX/IY under a prefix. Encoding 6 (memory) is never passed.
    fn get_reg8(&self, r: u8) -> u8 {
        match (r & 7, self.index) {
            (4, Index::Ix) => (self.regs.ix >> 8) as u8,
            (5, Index::Ix) => self.regs.ix as u8,
            (4, Index::Iy) => (self.regs.iy >> 8) as u8,
            (5, Index::Iy) => self.regs.iy as u8,
            (r, _) => self.get_reg8_plain(r),
        }
    }

    fn set_reg8(&mut self, r: u8, value: u8) {
        match (r & 7, self.index) {
            (4, Index::Ix) => self.regs.ix = (self.regs.ix & 0x00FF) | (u16::from(value) << 8),
            (5, Index::Ix) => self.regs.ix = (self.regs.ix & 0xFF00) | u16::from(value),
            (4, Index::Iy) => self.regs.iy = (self.regs.iy & 0x00FF) | (u16::from(value) << 8),
            (5, Index::Iy) => self.regs.iy = (self.regs.iy & 0xFF00) | u16::from(value),
            (r, _) => self.set_reg8_plain(r, value),
        }
    }

    /// 8-bit register ignoring any prefix (B, C, D, E, H, L, -, A).
    fn get_reg8_plain(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    fn set_reg8_plain(&mut self, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }

    /// Register pair by 2-bit encoding (BC, DE, HL/IX/IY, SP).
    fn get_rp(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    fn set_rp(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    /// Register pair for PUSH/POP (BC, DE, HL/IX/IY, AF).
    fn get_rp_af(&self, rp: u8) -> u16 {
        if rp & 3 == 3 { self.regs.af() } else { self.get_rp(rp) }
    }

    fn set_rp_af(&mut self, rp: u8, value: u16) {
        if rp & 3 == 3 {
            self.regs.set_af(value);
        } else {
            self.set_rp(rp, value);
        }
    }

    /// Evaluate a condition code (NZ, Z, NC, C, PO, PE, P, M).
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            7 => f & SF != 0,
            _ => unreachable!(),
        }
    }

    /// Set both interrupt flip-flops (EI/DI) and report INTE to the bus.
    fn set_iff<B: Bus>(&mut self, bus: &mut B, enabled: bool) {
        self.regs.iff1 = enabled;
        self.regs.iff2 = enabled;
        bus.interrupt_enable(enabled);
    }

    /// Count and log an undefined ED opcode.
    fn undefined_ed(&mut self, op: u8) {
        self.illegal_opcodes += 1;
        tracing::warn!(
            "Unknown Z80 opcode: 0xED 0x{:02X} at PC 0x{:04X}",
            op,
            self.regs.pc.wrapping_sub(2)
        );
    }
}

// Instruction execution split into separate files for readability
mod cb;
mod ed;
mod execute;

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let cycles = if self.regs.halted {
            // HALT re-executes NOPs internally; R keeps counting.
            self.inc_r();
            HALT_SLICE
        } else {
            self.index = std::mem::replace(&mut self.prefix, Index::Hl);
            let op = self.fetch_m1(bus);
            if !matches!(op, 0xDD | 0xFD) {
                self.prev_q = self.q;
                self.q = 0;
            }
            self.execute(bus, op)
        };
        self.total_cycles += cycles;
        cycles
    }

    fn interrupt<B: Bus>(&mut self, bus: &mut B) -> u32 {
        // Not sampled between a prefix and its opcode.
        if self.prefix_pending() {
            return self.step(bus);
        }
        self.regs.halted = false;
        self.set_iff(bus, false);
        self.prev_q = self.q;
        self.q = 0;

        let cycles = match self.regs.im {
            0 => {
                // The device drives an opcode onto the bus (normally RST).
                self.index = Index::Hl;
                self.acknowledging = true;
                let op = self.fetch_m1(bus);
                let cycles = self.execute(bus, op);
                self.acknowledging = false;
                cycles + 2
            }
            1 => {
                self.inc_r();
                self.push(bus, self.regs.pc);
                self.regs.pc = 0x0038;
                self.regs.wz = 0x0038;
                13
            }
            _ => {
                self.inc_r();
                let vector = bus.interrupt_acknowledge();
                let table = (u16::from(self.regs.i) << 8) | u16::from(vector);
                self.push(bus, self.regs.pc);
                self.regs.pc = Self::read_word(bus, table);
                self.regs.wz = self.regs.pc;
                19
            }
        };
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
        self.regs.iff1
    }

    fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }

    fn reset(&mut self) {
        self.regs.pc = 0;
        self.regs.i = 0;
        self.regs.r = 0;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.regs.im = 0;
        self.regs.halted = false;
        self.regs.a = 0xFF;
        self.regs.f = 0xFF;
        self.regs.sp = 0xFFFF;
        self.regs.wz = 0;
        self.prefix = Index::Hl;
        self.index = Index::Hl;
        self.q = 0;
        self.prev_q = 0;
        self.acknowledging = false;
        self.illegal_opcodes = 0;
        self.total_cycles = Ticks::ZERO;
    }
}

/// All query paths supported by the Z80.
const Z80_QUERY_PATHS: &[&str] = &[
    "a", "f", "b", "c", "d", "e", "h", "l",
    "af", "bc", "de", "hl", "ix", "iy", "sp", "pc",
    "i", "r", "wz", "iff1", "iff2", "im", "halted",
    "flags.s", "flags.z", "flags.y", "flags.h", "flags.x",
    "flags.p", "flags.n", "flags.c",
    "cycles", "illegal",
];

impl Observable for Z80 {
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
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),
            "wz" => Some(r.wz.into()),
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "im" => Some(r.im.into()),
            "halted" => Some(r.halted.into()),
            "flags.s" => Some((r.f & SF != 0).into()),
            "flags.z" => Some((r.f & ZF != 0).into()),
            "flags.y" => Some((r.f & YF != 0).into()),
            "flags.h" => Some((r.f & HF != 0).into()),
            "flags.x" => Some((r.f & XF != 0).into()),
            "flags.p" => Some((r.f & PF != 0).into()),
            "flags.n" => Some((r.f & NF != 0).into()),
            "flags.c" => Some((r.f & CF != 0).into()),
            "cycles" => Some(self.total_cycles.get().into()),
            "illegal" => Some(self.illegal_opcodes.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
