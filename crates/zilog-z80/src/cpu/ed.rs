//! ED-prefixed instructions: 16-bit arithmetic, interrupt control, I/O and
//! the block transfer/search/I/O group.

#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;

use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};
use crate::timing::{BLOCK_REPEAT, CYCLES_ED};

use super::Z80;

impl Z80 {
    /// Execute the opcode after an ED prefix. Returns the full T-states,
    /// prefix included.
    pub(super) fn execute_ed<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let op = self.fetch_m1(bus);
        let mut cycles = u32::from(CYCLES_ED[op as usize]);

        match op {
            // IN r,(C); 0x70 sets flags only
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let value = bus.port_in(self.regs.c);
                self.regs.wz = self.regs.bc().wrapping_add(1);
                let r = (op >> 3) & 7;
                if r != 6 {
                    self.set_reg8_plain(r, value);
                }
                self.set_f(sz53p(value) | (self.regs.f & CF));
            }

            // OUT (C),r; 0x71 outputs zero
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let r = (op >> 3) & 7;
                let value = if r == 6 { 0 } else { self.get_reg8_plain(r) };
                bus.port_out(self.regs.c, value);
                self.regs.wz = self.regs.bc().wrapping_add(1);
            }

            // SBC HL,rr
            0x42 | 0x52 | 0x62 | 0x72 => {
                let hl = self.regs.hl();
                let (value, flags) = alu::sbc16(hl, self.get_rp(op >> 4), self.regs.f & CF != 0);
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(value);
                self.set_f(flags);
            }

            // ADC HL,rr
            0x4A | 0x5A | 0x6A | 0x7A => {
                let hl = self.regs.hl();
                let (value, flags) = alu::adc16(hl, self.get_rp(op >> 4), self.regs.f & CF != 0);
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(value);
                self.set_f(flags);
            }

            // LD (nn),rr
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.fetch_word(bus);
                Self::write_word(bus, addr, self.get_rp(op >> 4));
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD rr,(nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.fetch_word(bus);
                let value = Self::read_word(bus, addr);
                self.set_rp(op >> 4, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // NEG (and mirrors)
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let result = alu::sub8(0, self.regs.a, false);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }

            // RETN / RETI (and mirrors): IFF1 restored from IFF2
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
                if self.regs.iff1 != self.regs.iff2 {
                    self.regs.iff1 = self.regs.iff2;
                    bus.interrupt_restore(self.regs.iff1);
                }
            }

            // IM 0/1/2 (and mirrors)
            0x46 | 0x4E | 0x66 | 0x6E => self.regs.im = 0,
            0x56 | 0x76 => self.regs.im = 1,
            0x5E | 0x7E => self.regs.im = 2,

            // LD I,A / LD R,A
            0x47 => self.regs.i = self.regs.a,
            0x4F => self.regs.r = self.regs.a,

            // LD A,I / LD A,R: PF reports IFF2
            0x57 | 0x5F => {
                self.regs.a = if op == 0x57 { self.regs.i } else { self.regs.r };
                self.set_f(
                    sz53(self.regs.a)
                        | (self.regs.f & CF)
                        | if self.regs.iff2 { PF } else { 0 },
                );
            }

            // RRD / RLD
            0x67 | 0x6F => {
                let addr = self.regs.hl();
                let mem = bus.read(addr);
                let a = self.regs.a;
                let (new_a, new_mem) = if op == 0x67 {
                    ((a & 0xF0) | (mem & 0x0F), (a << 4) | (mem >> 4))
                } else {
                    ((a & 0xF0) | (mem >> 4), (mem << 4) | (a & 0x0F))
                };
                bus.write(addr, new_mem);
                self.regs.a = new_a;
                self.regs.wz = addr.wrapping_add(1);
                self.set_f(sz53p(new_a) | (self.regs.f & CF));
            }

            // LDI / LDD / LDIR / LDDR
            0xA0 | 0xA8 | 0xB0 | 0xB8 => cycles += self.block_load(bus, op),

            // CPI / CPD / CPIR / CPDR
            0xA1 | 0xA9 | 0xB1 | 0xB9 => cycles += self.block_compare(bus, op),

            // INI / IND / INIR / INDR
            0xA2 | 0xAA | 0xB2 | 0xBA => cycles += self.block_in(bus, op),

            // OUTI / OUTD / OTIR / OTDR
            0xA3 | 0xAB | 0xB3 | 0xBB => cycles += self.block_out(bus, op),

            _ => self.undefined_ed(op),
        }

        cycles
    }

    /// Step direction for a block opcode (bit 3 selects decrement).
    fn block_step(op: u8) -> u16 {
        if op & 0x08 == 0 { 1 } else { 0xFFFF }
    }

    /// Rewind PC to the ED prefix for another iteration. XF/YF then come
    /// from the high byte of PC.
    fn repeat_block(&mut self) -> u8 {
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        ((self.regs.pc >> 8) as u8) & (YF | XF)
    }

    fn block_load<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Self::block_step(op);
        let value = bus.read(self.regs.hl());
        bus.write(self.regs.de(), value);
        self.regs.set_hl(self.regs.hl().wrapping_add(step));
        self.regs.set_de(self.regs.de().wrapping_add(step));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));

        let base = self.regs.f & (SF | ZF | CF);
        if op & 0x10 != 0 && self.regs.bc() != 0 {
            let xy = self.repeat_block();
            self.set_f(base | PF | xy);
            return BLOCK_REPEAT;
        }

        // XF is bit 3 and YF is bit 1 of A + value.
        let n = value.wrapping_add(self.regs.a);
        self.set_f(
            base | (n & XF)
                | ((n << 4) & YF)
                | if self.regs.bc() != 0 { PF } else { 0 },
        );
        0
    }

    fn block_compare<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Self::block_step(op);
        let value = bus.read(self.regs.hl());
        let result = self.regs.a.wrapping_sub(value);
        let half = self.regs.a & 0x0F < value & 0x0F;
        self.regs.set_hl(self.regs.hl().wrapping_add(step));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
        self.regs.wz = self.regs.wz.wrapping_add(step);

        let base = (self.regs.f & CF)
            | NF
            | (result & SF)
            | if result == 0 { ZF } else { 0 }
            | if half { HF } else { 0 }
            | if self.regs.bc() != 0 { PF } else { 0 };

        if op & 0x10 != 0 && self.regs.bc() != 0 && result != 0 {
            let xy = self.repeat_block();
            self.set_f(base | xy);
            return BLOCK_REPEAT;
        }

        // XF/YF from A - value - HF.
        let n = result.wrapping_sub(u8::from(half));
        self.set_f(base | (n & XF) | ((n << 4) & YF));
        0
    }

    fn block_in<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Self::block_step(op);
        let value = bus.port_in(self.regs.c);
        self.regs.wz = self.regs.bc().wrapping_add(step);
        bus.write(self.regs.hl(), value);
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.set_hl(self.regs.hl().wrapping_add(step));

        let k = u16::from(value) + u16::from(self.regs.c.wrapping_add(step as u8));
        self.block_io_finish(op, value, k)
    }

    fn block_out<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let step = Self::block_step(op);
        let value = bus.read(self.regs.hl());
        self.regs.b = self.regs.b.wrapping_sub(1);
        bus.port_out(self.regs.c, value);
        self.regs.wz = self.regs.bc().wrapping_add(step);
        self.regs.set_hl(self.regs.hl().wrapping_add(step));

        let k = u16::from(value) + u16::from(self.regs.l);
        self.block_io_finish(op, value, k)
    }

    /// Flags and repeat handling shared by INI/IND/OUTI/OUTD and their
    /// repeating forms. `k` is the byte transferred plus C±1 (input) or L
    /// (output).
    fn block_io_finish(&mut self, op: u8, value: u8, k: u16) -> u32 {
        let b = self.regs.b;
        let carry = k > 0xFF;
        let negative = value & 0x80 != 0;
        let p = (k as u8 & 7) ^ b;

        let mut flags = if negative { NF } else { 0 };
        if carry {
            flags |= CF;
        }

        if op & 0x10 != 0 && b != 0 {
            // A repeating iteration adjusts HF and PF as if B were already
            // moving to its next value.
            let xy = self.repeat_block();
            let (half, parity) = if carry {
                if negative {
                    (b & 0x0F == 0, p ^ (b.wrapping_sub(1) & 7))
                } else {
                    (b & 0x0F == 0x0F, p ^ (b.wrapping_add(1) & 7))
                }
            } else {
                (false, p ^ (b & 7))
            };
            flags |= (b & SF) | xy | (sz53p(parity) & PF);
            if half {
                flags |= HF;
            }
            self.set_f(flags);
            return BLOCK_REPEAT;
        }

        flags |= sz53(b) | (sz53p(p) & PF);
        if carry {
            flags |= HF;
        }
        self.set_f(flags);
        0
    }
}
