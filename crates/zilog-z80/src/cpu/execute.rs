//! Unprefixed and DD/FD-prefixed instruction execution.
//!
//! Under a DD/FD prefix the same decoder runs with HL replaced by IX/IY,
//! H/L by IXH/IXL (or IYH/IYL) and `(HL)` by `(IX+d)`. When an instruction
//! has both a memory operand and an H/L register, the register is the real
//! H or L.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use emu_core::Bus;

use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::timing::{CALL_TAKEN, CYCLES, JR_TAKEN, RET_TAKEN, indexed_extra};

use super::{Index, Z80};

impl Z80 {
    /// Execute one opcode (already fetched) and return its T-states.
    ///
    /// Under a prefix the returned count excludes the prefix's own 4.
    pub(super) fn execute<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let mut cycles = u32::from(CYCLES[op as usize]);
        if self.index != Index::Hl {
            cycles += indexed_extra(op);
        }

        match op {
            // NOP
            0x00 => {}

            // LD rr, nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.set_rp(op >> 4, value);
            }

            // LD (BC),A / LD (DE),A
            0x02 | 0x12 => {
                let addr = if op == 0x02 { self.regs.bc() } else { self.regs.de() };
                bus.write(addr, self.regs.a);
                self.regs.wz = (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
            }

            // LD A,(BC) / LD A,(DE)
            0x0A | 0x1A => {
                let addr = if op == 0x0A { self.regs.bc() } else { self.regs.de() };
                self.regs.a = bus.read(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // INC rr
            0x03 | 0x13 | 0x23 | 0x33 => {
                let value = self.get_rp(op >> 4).wrapping_add(1);
                self.set_rp(op >> 4, value);
            }

            // DEC rr
            0x0B | 0x1B | 0x2B | 0x3B => {
                let value = self.get_rp(op >> 4).wrapping_sub(1);
                self.set_rp(op >> 4, value);
            }

            // INC r / INC (HL)
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let carry = self.regs.f & CF;
                let r = (op >> 3) & 7;
                if r == 6 {
                    let addr = self.memory_operand(bus);
                    let result = alu::inc8(bus.read(addr));
                    bus.write(addr, result.value);
                    self.set_f(result.flags | carry);
                } else {
                    let result = alu::inc8(self.get_reg8(r));
                    self.set_reg8(r, result.value);
                    self.set_f(result.flags | carry);
                }
            }

            // DEC r / DEC (HL)
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let carry = self.regs.f & CF;
                let r = (op >> 3) & 7;
                if r == 6 {
                    let addr = self.memory_operand(bus);
                    let result = alu::dec8(bus.read(addr));
                    bus.write(addr, result.value);
                    self.set_f(result.flags | carry);
                } else {
                    let result = alu::dec8(self.get_reg8(r));
                    self.set_reg8(r, result.value);
                    self.set_f(result.flags | carry);
                }
            }

            // LD r,n / LD (HL),n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let r = (op >> 3) & 7;
                if r == 6 {
                    // Displacement precedes the immediate.
                    let addr = self.memory_operand(bus);
                    let value = self.fetch_byte(bus);
                    bus.write(addr, value);
                } else {
                    let value = self.fetch_byte(bus);
                    self.set_reg8(r, value);
                }
            }

            // RLCA / RRCA / RLA / RRA
            0x07 | 0x0F | 0x17 | 0x1F => {
                let a = self.regs.a;
                let carry_in = self.regs.f & CF != 0;
                let (value, carry_out) = match op {
                    0x07 => (a.rotate_left(1), a & 0x80 != 0),
                    0x0F => (a.rotate_right(1), a & 1 != 0),
                    0x17 => ((a << 1) | u8::from(carry_in), a & 0x80 != 0),
                    _ => ((a >> 1) | (u8::from(carry_in) << 7), a & 1 != 0),
                };
                self.regs.a = value;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (value & (YF | XF))
                        | if carry_out { CF } else { 0 },
                );
            }

            // EX AF,AF'
            0x08 => self.regs.swap_af(),

            // ADD HL,rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                let hl = self.index_reg();
                let (value, flags) = alu::add16(hl, self.get_rp(op >> 4));
                self.regs.wz = hl.wrapping_add(1);
                self.set_index_reg(value);
                self.set_f((self.regs.f & (SF | ZF | PF)) | flags);
            }

            // DJNZ e
            0x10 => {
                let d = self.fetch_byte(bus) as i8;
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.jump_relative(d);
                    cycles += JR_TAKEN;
                }
            }

            // JR e
            0x18 => {
                let d = self.fetch_byte(bus) as i8;
                self.jump_relative(d);
            }

            // JR cc,e (NZ, Z, NC, C)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let d = self.fetch_byte(bus) as i8;
                if self.condition((op >> 3) & 3) {
                    self.jump_relative(d);
                    cycles += JR_TAKEN;
                }
            }

            // LD (nn),HL
            0x22 => {
                let addr = self.fetch_word(bus);
                Self::write_word(bus, addr, self.index_reg());
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD HL,(nn)
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = Self::read_word(bus, addr);
                self.set_index_reg(value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // DAA
            0x27 => {
                let result = alu::daa(self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }

            // CPL
            0x2F => {
                self.regs.a = !self.regs.a;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF | CF)) | HF | NF | (self.regs.a & (YF | XF)),
                );
            }

            // LD (nn),A
            0x32 => {
                let addr = self.fetch_word(bus);
                bus.write(addr, self.regs.a);
                self.regs.wz = (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
            }

            // LD A,(nn)
            0x3A => {
                let addr = self.fetch_word(bus);
                self.regs.a = bus.read(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // SCF: XF/YF from (previous Q ^ F) | A
            0x37 => {
                let xy = (self.prev_q ^ self.regs.f) | self.regs.a;
                self.set_f((self.regs.f & (SF | ZF | PF)) | CF | (xy & (YF | XF)));
            }

            // CCF: HF takes the old carry
            0x3F => {
                let xy = (self.prev_q ^ self.regs.f) | self.regs.a;
                let old_carry = self.regs.f & CF != 0;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (xy & (YF | XF))
                        | if old_carry { HF } else { CF },
                );
            }

            // HALT
            0x76 => {
                self.regs.halted = true;
                bus.halt_acknowledge();
            }

            // LD r,r' / LD r,(HL) / LD (HL),r
            0x40..=0x7F => {
                let dst = (op >> 3) & 7;
                let src = op & 7;
                if src == 6 {
                    let addr = self.memory_operand(bus);
                    let value = bus.read(addr);
                    self.set_reg8_plain(dst, value);
                } else if dst == 6 {
                    let addr = self.memory_operand(bus);
                    bus.write(addr, self.get_reg8_plain(src));
                } else {
                    let value = self.get_reg8(src);
                    self.set_reg8(dst, value);
                }
            }

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP r
            0x80..=0xBF => {
                let src = op & 7;
                let value = if src == 6 {
                    let addr = self.memory_operand(bus);
                    bus.read(addr)
                } else {
                    self.get_reg8(src)
                };
                self.alu_a(op >> 3, value);
            }

            // ALU A,n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch_byte(bus);
                self.alu_a(op >> 3, value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(op >> 3) {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    cycles += RET_TAKEN;
                }
            }

            // RET
            0xC9 => {
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
            }

            // POP rr
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop(bus);
                self.set_rp_af(op >> 4, value);
            }

            // PUSH rr
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let value = self.get_rp_af(op >> 4);
                self.push(bus, value);
            }

            // JP cc,nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition(op >> 3) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // CALL cc,nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition(op >> 3) {
                    self.push(bus, self.regs.pc);
                    self.regs.pc = addr;
                    cycles += CALL_TAKEN;
                }
            }

            // CALL nn
            0xCD => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                self.push(bus, self.regs.pc);
                self.regs.pc = addr;
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push(bus, self.regs.pc);
                self.regs.pc = u16::from(op & 0x38);
                self.regs.wz = self.regs.pc;
            }

            // CB prefix (DDCB/FDCB under an index prefix)
            0xCB => cycles += self.execute_cb(bus),

            // OUT (n),A
            0xD3 => {
                let port = self.fetch_byte(bus);
                bus.port_out(port, self.regs.a);
                self.regs.wz =
                    (u16::from(self.regs.a) << 8) | u16::from(port.wrapping_add(1));
            }

            // IN A,(n)
            0xDB => {
                let port = self.fetch_byte(bus);
                self.regs.wz = ((u16::from(self.regs.a) << 8) | u16::from(port)).wrapping_add(1);
                self.regs.a = bus.port_in(port);
            }

            // EXX
            0xD9 => self.regs.exx(),

            // EX (SP),HL
            0xE3 => {
                let sp = self.regs.sp;
                let lo = bus.stack_read(sp);
                let hi = bus.stack_read(sp.wrapping_add(1));
                let old = self.index_reg();
                bus.stack_write(sp, old as u8);
                bus.stack_write(sp.wrapping_add(1), (old >> 8) as u8);
                let value = u16::from(lo) | (u16::from(hi) << 8);
                self.set_index_reg(value);
                self.regs.wz = value;
            }

            // JP (HL)
            0xE9 => self.regs.pc = self.index_reg(),

            // EX DE,HL (never affected by a prefix)
            0xEB => {
                let de = self.regs.de();
                self.regs.set_de(self.regs.hl());
                self.regs.set_hl(de);
            }

            // ED prefix (a preceding DD/FD is dropped)
            0xED => {
                self.index = Index::Hl;
                cycles = self.execute_ed(bus);
            }

            // DI / EI
            0xF3 => self.set_iff(bus, false),
            0xFB => self.set_iff(bus, true),

            // LD SP,HL
            0xF9 => self.regs.sp = self.index_reg(),

            // DD / FD: latch for the next step; the last prefix in a chain wins
            0xDD => self.prefix = Index::Ix,
            0xFD => self.prefix = Index::Iy,
        }

        cycles
    }

    fn jump_relative(&mut self, d: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d));
        self.regs.wz = self.regs.pc;
    }

    /// Accumulator ALU group selected by bits 5-3.
    fn alu_a(&mut self, group: u8, value: u8) {
        let a = self.regs.a;
        let carry = self.regs.f & CF != 0;
        let result = match group & 7 {
            0 => alu::add8(a, value, false),
            1 => alu::add8(a, value, carry),
            2 => alu::sub8(a, value, false),
            3 => alu::sub8(a, value, carry),
            4 => alu::and8(a, value),
            5 => alu::xor8(a, value),
            6 => alu::or8(a, value),
            7 => alu::cp8(a, value),
            _ => unreachable!(),
        };
        self.regs.a = result.value;
        self.set_f(result.flags);
    }
}

#[cfg(test)]
mod tests {
    use emu_core::{Cpu, SimpleBus};

    use super::*;

    #[test]
    fn jr_taken_and_not_taken() {
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0x20, 0x10, 0x28, 0x10]); // JR NZ,+16 ; JR Z,+16
        let mut cpu = Z80::new();
        cpu.regs.f = ZF;
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 2);
        assert_eq!(cpu.step(&mut bus), 12);
        assert_eq!(cpu.regs.pc, 0x14);
    }

    #[test]
    fn ld_h_from_indexed_memory_uses_real_h() {
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xDD, 0x66, 0x02]); // LD H,(IX+2)
        bus.load(0x1002, &[0x5A]);
        let mut cpu = Z80::new();
        cpu.regs.ix = 0x1000;
        let total = cpu.step(&mut bus) + cpu.step(&mut bus);
        assert_eq!(total, 19);
        assert_eq!(cpu.regs.h, 0x5A);
        assert_eq!(cpu.regs.ix, 0x1000);
    }
}
