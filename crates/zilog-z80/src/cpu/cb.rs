//! CB-prefixed bit instructions, including the DDCB/FDCB indexed forms.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use emu_core::Bus;

use crate::alu;
use crate::flags::{CF, HF, PF, SF, XF, YF, ZF};

use super::{Index, Z80};

impl Z80 {
    /// Execute the opcode after a CB prefix. Returns the T-states beyond the
    /// prefix byte's own four.
    pub(super) fn execute_cb<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.index != Index::Hl {
            return self.execute_indexed_cb(bus);
        }

        let op = self.fetch_m1(bus);
        let r = op & 7;
        if r == 6 {
            let addr = self.regs.hl();
            let value = bus.read(addr);
            if op & 0xC0 == 0x40 {
                // BIT n,(HL): XF/YF leak from MEMPTR.
                self.bit(op, value, (self.regs.wz >> 8) as u8);
                8
            } else {
                let result = self.cb_transform(op, value);
                bus.write(addr, result);
                11
            }
        } else {
            let value = self.get_reg8_plain(r);
            if op & 0xC0 == 0x40 {
                self.bit(op, value, value);
            } else {
                let result = self.cb_transform(op, value);
                self.set_reg8_plain(r, result);
            }
            4
        }
    }

    /// DDCB d op / FDCB d op.
    ///
    /// Neither the displacement nor the final opcode byte is an M1 cycle.
    /// Non-BIT forms also copy the result into register `op & 7` unless it
    /// encodes `(HL)`.
    fn execute_indexed_cb<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let d = self.fetch_byte(bus) as i8;
        let op = self.fetch_byte(bus);
        let addr = self.index_reg().wrapping_add_signed(i16::from(d));
        self.regs.wz = addr;
        let value = bus.read(addr);

        if op & 0xC0 == 0x40 {
            self.bit(op, value, (addr >> 8) as u8);
            return 12;
        }

        let result = self.cb_transform(op, value);
        bus.write(addr, result);
        let r = op & 7;
        if r != 6 {
            self.set_reg8_plain(r, result);
        }
        15
    }

    /// Rotate/shift, RES or SET. Only the rotate group touches flags.
    fn cb_transform(&mut self, op: u8, value: u8) -> u8 {
        let n = (op >> 3) & 7;
        match op >> 6 {
            0 => {
                let result = alu::shift(n, value, self.regs.f & CF != 0);
                self.set_f(result.flags);
                result.value
            }
            2 => value & !(1 << n),
            3 => value | (1 << n),
            _ => unreachable!(),
        }
    }

    /// BIT n: ZF and PF report a clear bit, SF reports a set bit 7. XF/YF
    /// come from `xy_source`, which differs by addressing mode.
    fn bit(&mut self, op: u8, value: u8, xy_source: u8) {
        let n = (op >> 3) & 7;
        let set = value & (1 << n) != 0;
        let mut flags = (self.regs.f & CF) | HF | (xy_source & (YF | XF));
        if !set {
            flags |= ZF | PF;
        } else if n == 7 {
            flags |= SF;
        }
        self.set_f(flags);
    }
}

#[cfg(test)]
mod tests {
    use emu_core::{Cpu, SimpleBus};

    use super::*;

    #[test]
    fn ddcb_rotate_stores_to_register() {
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xDD, 0xCB, 0x01, 0x00]); // RLC (IX+1),B
        bus.load(0x2001, &[0x81]);
        let mut cpu = Z80::new();
        cpu.regs.ix = 0x2000;

        let total = cpu.step(&mut bus) + cpu.step(&mut bus);

        assert_eq!(total, 23);
        assert_eq!(bus.peek(0x2001), 0x03);
        assert_eq!(cpu.regs.b, 0x03);
        assert_ne!(cpu.regs.f & CF, 0);
        assert_eq!(cpu.regs.r & 0x7F, 2, "DD and CB are the only M1 cycles");
    }

    #[test]
    fn bit_hl_takes_xy_from_memptr() {
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xCB, 0x46]); // BIT 0,(HL)
        bus.load(0x4000, &[0x01]);
        let mut cpu = Z80::new();
        cpu.regs.set_hl(0x4000);
        cpu.regs.wz = 0x2800;

        assert_eq!(cpu.step(&mut bus), 12);
        assert_eq!(cpu.regs.f & (YF | XF), YF | XF);
        assert_eq!(cpu.regs.f & ZF, 0);
    }
}
