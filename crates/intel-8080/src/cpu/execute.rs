//! Instruction execution for the 8080.
//!
//! One dense match over the opcode byte; the compiler lowers it to a jump
//! table. Regular encodings (MOV, ALU ops, register-pair ops, conditional
//! branches, RST) decode their operand fields from the opcode bits.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;

use crate::alu::{self, AluResult};
use crate::flags::{normalise, CY};
use crate::timing::{BRANCH_TAKEN, CYCLES};

use super::I8080;

impl I8080 {
    /// Execute one opcode whose byte has already been fetched. Returns the
    /// cycle cost.
    pub(super) fn execute<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let mut cycles = u32::from(CYCLES[op as usize]);

        match op {
            // NOP
            0x00 => {}

            // Undefined: NOP aliases on silicon, diagnosed here
            0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 | 0xCB | 0xD9 | 0xDD | 0xED | 0xFD => {
                self.undefined(op);
            }

            // LXI rp, d16
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.set_rp(op >> 4, value);
            }

            // STAX B / STAX D
            0x02 | 0x12 => {
                let addr = self.get_rp(op >> 4);
                bus.write(addr, self.regs.a);
            }

            // LDAX B / LDAX D
            0x0A | 0x1A => {
                let addr = self.get_rp(op >> 4);
                self.regs.a = bus.read(addr);
            }

            // INX rp
            0x03 | 0x13 | 0x23 | 0x33 => {
                let rp = op >> 4;
                self.set_rp(rp, self.get_rp(rp).wrapping_add(1));
            }

            // DCX rp
            0x0B | 0x1B | 0x2B | 0x3B => {
                let rp = op >> 4;
                self.set_rp(rp, self.get_rp(rp).wrapping_sub(1));
            }

            // INR r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let r = op >> 3;
                let value = self.get_reg8(bus, r);
                let result = alu::inr(value);
                self.set_reg8(bus, r, result.value);
                self.regs.f = (self.regs.f & CY) | result.flags;
            }

            // DCR r
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let r = op >> 3;
                let value = self.get_reg8(bus, r);
                let result = alu::dcr(value);
                self.set_reg8(bus, r, result.value);
                self.regs.f = (self.regs.f & CY) | result.flags;
            }

            // MVI r, d8
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let value = self.fetch_byte(bus);
                self.set_reg8(bus, op >> 3, value);
            }

            // DAD rp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let (result, carry) = alu::dad(self.regs.hl(), self.get_rp(op >> 4));
                self.regs.set_hl(result);
                self.set_carry(carry);
            }

            // RLC
            0x07 => {
                let (value, carry) = alu::rlc(self.regs.a);
                self.regs.a = value;
                self.set_carry(carry);
            }

            // RRC
            0x0F => {
                let (value, carry) = alu::rrc(self.regs.a);
                self.regs.a = value;
                self.set_carry(carry);
            }

            // RAL
            0x17 => {
                let (value, carry) = alu::ral(self.regs.a, self.regs.f & CY != 0);
                self.regs.a = value;
                self.set_carry(carry);
            }

            // RAR
            0x1F => {
                let (value, carry) = alu::rar(self.regs.a, self.regs.f & CY != 0);
                self.regs.a = value;
                self.set_carry(carry);
            }

            // SHLD a16
            0x22 => {
                let addr = self.fetch_word(bus);
                Self::write_word(bus, addr, self.regs.hl());
            }

            // LHLD a16
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = Self::read_word(bus, addr);
                self.regs.set_hl(value);
            }

            // DAA
            0x27 => {
                let result = alu::daa(self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }

            // CMA
            0x2F => self.regs.a = !self.regs.a,

            // STA a16
            0x32 => {
                let addr = self.fetch_word(bus);
                bus.write(addr, self.regs.a);
            }

            // LDA a16
            0x3A => {
                let addr = self.fetch_word(bus);
                self.regs.a = bus.read(addr);
            }

            // STC
            0x37 => self.regs.f |= CY,

            // CMC
            0x3F => self.regs.f ^= CY,

            // HLT
            0x76 => {
                self.regs.halted = true;
                bus.halt_acknowledge();
            }

            // MOV r, r'
            0x40..=0x7F => {
                let value = self.get_reg8(bus, op);
                self.set_reg8(bus, op >> 3, value);
            }

            // ADD/ADC/SUB/SBB/ANA/XRA/ORA/CMP r
            0x80..=0xBF => {
                let value = self.get_reg8(bus, op);
                self.alu_op(op >> 3, value);
            }

            // ADI/ACI/SUI/SBI/ANI/XRI/ORI/CPI d8
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch_byte(bus);
                self.alu_op(op >> 3, value);
            }

            // Rcc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(op >> 3) {
                    self.regs.pc = self.pop(bus);
                    cycles += BRANCH_TAKEN;
                }
            }

            // RET
            0xC9 => self.regs.pc = self.pop(bus),

            // POP rp (PSW for 0xF1)
            0xC1 | 0xD1 | 0xE1 => {
                let value = self.pop(bus);
                self.set_rp((op >> 4) & 3, value);
            }
            0xF1 => {
                let value = self.pop(bus);
                self.regs.a = (value >> 8) as u8;
                self.regs.f = normalise(value as u8);
            }

            // PUSH rp (PSW for 0xF5)
            0xC5 | 0xD5 | 0xE5 => {
                let value = self.get_rp((op >> 4) & 3);
                self.push(bus, value);
            }
            0xF5 => {
                let psw = (u16::from(self.regs.a) << 8) | u16::from(normalise(self.regs.f));
                self.push(bus, psw);
            }

            // Jcc a16 (operand is always read)
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.fetch_word(bus);
                if self.condition(op >> 3) {
                    self.regs.pc = addr;
                }
            }

            // JMP a16
            0xC3 => self.regs.pc = self.fetch_word(bus),

            // Ccc a16
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.fetch_word(bus);
                if self.condition(op >> 3) {
                    self.push(bus, self.regs.pc);
                    self.regs.pc = addr;
                    cycles += BRANCH_TAKEN;
                }
            }

            // CALL a16
            0xCD => {
                let addr = self.fetch_word(bus);
                self.push(bus, self.regs.pc);
                self.regs.pc = addr;
            }

            // RST n
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push(bus, self.regs.pc);
                self.regs.pc = u16::from(op & 0x38);
            }

            // OUT d8
            0xD3 => {
                let port = self.fetch_byte(bus);
                bus.port_out(port, self.regs.a);
            }

            // IN d8
            0xDB => {
                let port = self.fetch_byte(bus);
                self.regs.a = bus.port_in(port);
            }

            // XTHL
            0xE3 => {
                let lo = bus.stack_read(self.regs.sp);
                let hi = bus.stack_read(self.regs.sp.wrapping_add(1));
                bus.stack_write(self.regs.sp, self.regs.l);
                bus.stack_write(self.regs.sp.wrapping_add(1), self.regs.h);
                self.regs.l = lo;
                self.regs.h = hi;
            }

            // PCHL
            0xE9 => self.regs.pc = self.regs.hl(),

            // XCHG
            0xEB => {
                let de = self.regs.de();
                self.regs.set_de(self.regs.hl());
                self.regs.set_hl(de);
            }

            // DI
            0xF3 => self.set_inte(bus, false),

            // SPHL
            0xF9 => self.regs.sp = self.regs.hl(),

            // EI
            0xFB => self.set_inte(bus, true),
        }

        cycles
    }

    /// Accumulator ALU group selected by bits 5-3.
    fn alu_op(&mut self, group: u8, value: u8) {
        let a = self.regs.a;
        let carry = self.regs.f & CY != 0;
        let AluResult { value: result, flags } = match group & 7 {
            0 => alu::add(a, value, false),
            1 => alu::add(a, value, carry),
            2 => alu::sub(a, value, false),
            3 => alu::sub(a, value, carry),
            4 => alu::and(a, value),
            5 => alu::xor(a, value),
            6 => alu::or(a, value),
            7 => {
                // CMP: flags only
                let r = alu::sub(a, value, false);
                self.regs.f = r.flags;
                return;
            }
            _ => unreachable!(),
        };
        self.regs.a = result;
        self.regs.f = flags;
    }

    fn set_carry(&mut self, carry: bool) {
        self.regs.f = (self.regs.f & !CY) | if carry { CY } else { 0 };
    }
}
