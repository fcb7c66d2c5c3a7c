//! Unit tests for individual Z80 instructions.

use emu_core::{Bus, Cpu, SimpleBus};
use zilog_z80::{CF, HF, NF, PF, SF, XF, YF, Z80, ZF};

fn cpu_with(program: &[u8]) -> (Z80, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, program);
    let mut cpu = Z80::new();
    cpu.regs.f = 0;
    (cpu, bus)
}

/// Run until HALT, return the total T-states consumed.
fn run_until_halt(cpu: &mut Z80, bus: &mut SimpleBus) -> u64 {
    let mut steps = 0;
    while !cpu.is_halted() && steps < 10_000 {
        cpu.step(bus);
        steps += 1;
    }
    cpu.total_cycles().get()
}

#[test]
fn test_inc_a_wraps_to_zero() {
    let (mut cpu, mut bus) = cpu_with(&[0x3C]); // INC A
    cpu.regs.a = 0xFF;
    cpu.regs.f = CF;

    let cycles = cpu.step(&mut bus);

    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.a, 0x00);
    assert_eq!(cpu.regs.f, ZF | HF | CF, "carry preserved");
}

#[test]
fn test_add_overflow_sets_pv() {
    // LD A,7Fh; ADD A,01h; HALT
    let (mut cpu, mut bus) = cpu_with(&[0x3E, 0x7F, 0xC6, 0x01, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x80);
    assert_eq!(cpu.regs.f, SF | HF | PF);
}

#[test]
fn test_cp_undocumented_bits_from_operand() {
    // LD A,10h; CP 28h
    let (mut cpu, mut bus) = cpu_with(&[0x3E, 0x10, 0xFE, 0x28]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x10);
    assert_eq!(cpu.regs.f & (YF | XF), YF | XF);
    assert_ne!(cpu.regs.f & (NF | CF), 0);
}

#[test]
fn test_scf_xy_depends_on_previous_q() {
    // XOR A leaves F = ZF|PF and Q = F, so (Q ^ F) | A = 0 for SCF.
    let (mut cpu, mut bus) = cpu_with(&[0xAF, 0x37]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.f, ZF | PF | CF);

    // After an instruction that leaves F alone, Q is 0 and F leaks in.
    let (mut cpu, mut bus) = cpu_with(&[0x00, 0x37]);
    cpu.regs.f = YF | XF;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.f & (YF | XF | CF), YF | XF | CF);
}

#[test]
fn test_add_hl_xy_from_high_byte() {
    let (mut cpu, mut bus) = cpu_with(&[0x09]); // ADD HL,BC
    cpu.regs.set_hl(0x2000);
    cpu.regs.set_bc(0x0800);
    cpu.regs.f = SF | ZF | PF;

    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.regs.hl(), 0x2800);
    assert_eq!(cpu.regs.f, SF | ZF | PF | YF | XF);
    assert_eq!(cpu.regs.wz, 0x2001);
}

#[test]
fn test_djnz_loop_timing() {
    // LD B,3; DJNZ -2 (to itself); HALT
    let (mut cpu, mut bus) = cpu_with(&[0x06, 0x03, 0x10, 0xFE, 0x76]);
    let total = run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.b, 0);
    assert_eq!(total, 7 + 13 + 13 + 8 + 4);
}

#[test]
fn test_conditional_call_and_return_timing() {
    // 0000: LD SP,8000h    10
    // 0003: CALL NZ,0010h  17 (Z clear)
    // 0006: HALT            4
    // 0010: RET Z           5 (not taken)
    // 0011: RET            10
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0x31, 0x00, 0x80, 0xC4, 0x10, 0x00, 0x76]);
    bus.load(0x0010, &[0xC8, 0xC9]);
    let mut cpu = Z80::new();
    cpu.regs.f = 0;

    let total = run_until_halt(&mut cpu, &mut bus);

    assert_eq!(total, 10 + 17 + 5 + 10 + 4);
    assert_eq!(cpu.regs.sp, 0x8000);
}

#[test]
fn test_undocumented_ixh_load() {
    // LD IX,1234h; LD A,IXH; DD LD IXL,A ... via LD IXL,56h
    let (mut cpu, mut bus) = cpu_with(&[0xDD, 0x21, 0x34, 0x12, 0xDD, 0x7C, 0xDD, 0x2E, 0x56]);
    let mut total = 0;
    for _ in 0..6 {
        total += cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.a, 0x12);
    assert_eq!(cpu.regs.ix, 0x1256);
    assert_eq!(cpu.regs.h, 0, "H untouched by IXH/IXL forms");
    assert_eq!(total, 14 + 8 + 11);
}

#[test]
fn test_prefix_chain_last_prefix_wins() {
    // DD FD 21 nn nn: the DD is a 4 T-state no-op, LD IY,nn executes.
    let (mut cpu, mut bus) = cpu_with(&[0xDD, 0xFD, 0x21, 0xCD, 0xAB]);
    assert_eq!(cpu.step(&mut bus), 4);
    assert!(cpu.prefix_pending());
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.step(&mut bus), 10);
    assert!(!cpu.prefix_pending());
    assert_eq!(cpu.regs.iy, 0xABCD);
    assert_eq!(cpu.regs.ix, 0);
    assert_eq!(cpu.regs.hl(), 0);
    assert_eq!(cpu.regs.r & 0x7F, 3);
}

#[test]
fn test_neg() {
    let (mut cpu, mut bus) = cpu_with(&[0xED, 0x44]);
    cpu.regs.a = 0x01;
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.a, 0xFF);
    assert_ne!(cpu.regs.f & NF, 0);
    assert_ne!(cpu.regs.f & CF, 0);
}

#[test]
fn test_cpir_finds_byte() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0xED, 0xB1, 0x76]); // CPIR; HALT
    bus.load(0x3000, &[0x11, 0x22, 0x33, 0x44]);
    let mut cpu = Z80::new();
    cpu.regs.a = 0x33;
    cpu.regs.set_hl(0x3000);
    cpu.regs.set_bc(4);

    let total = run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.hl(), 0x3003);
    assert_eq!(cpu.regs.bc(), 1);
    assert_ne!(cpu.regs.f & ZF, 0);
    assert_ne!(cpu.regs.f & PF, 0, "BC not exhausted");
    assert_eq!(total, 21 + 21 + 16 + 4);
}

#[test]
fn test_in_uses_low_byte_port() {
    let (mut cpu, mut bus) = cpu_with(&[0xDB, 0x10, 0xED, 0x78]); // IN A,(10h); IN A,(C)
    bus.set_port(0x10, 0x5A);
    bus.set_port(0x20, 0x80);
    cpu.regs.set_bc(0xFF20);

    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.regs.a, 0x5A);
    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(cpu.regs.a, 0x80);
    assert_eq!(cpu.regs.f & (SF | ZF), SF);
}

#[test]
fn test_im1_interrupt() {
    // IM 1; EI; HALT
    let (mut cpu, mut bus) = cpu_with(&[0xED, 0x56, 0xFB, 0x76]);
    cpu.regs.sp = 0x8000;
    run_until_halt(&mut cpu, &mut bus);
    assert!(bus.inte());

    assert_eq!(cpu.interrupt(&mut bus), 13);
    assert_eq!(cpu.pc(), 0x0038);
    assert!(!cpu.is_halted());
    assert!(!cpu.regs.iff1);
    assert!(!bus.inte());
    assert_eq!(bus.peek(0x7FFE), 0x04);
}

#[test]
fn test_im0_executes_bus_opcode() {
    let (mut cpu, mut bus) = cpu_with(&[0xFB]);
    cpu.regs.sp = 0x8000;
    cpu.step(&mut bus);

    // Floating data bus reads as RST 38h.
    assert_eq!(cpu.interrupt(&mut bus), 13);
    assert_eq!(cpu.pc(), 0x0038);
    assert_eq!(bus.peek(0x7FFE), 0x01);
}

#[test]
fn test_im2_reads_vector_table() {
    let (mut cpu, mut bus) = cpu_with(&[0xED, 0x5E, 0xFB]);
    cpu.regs.sp = 0x8000;
    cpu.regs.i = 0x40;
    bus.load(0x4020, &[0x00, 0x90]);
    bus.set_vector(0x20);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.interrupt(&mut bus), 19);
    assert_eq!(cpu.pc(), 0x9000);
}

#[test]
fn test_nmi_preserves_iff2_for_retn() {
    // EI; NOP ... NMI handler at 0066h: RETN
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0xFB, 0x00]);
    bus.load(0x0066, &[0xED, 0x45]);
    let mut cpu = Z80::new();
    cpu.regs.sp = 0x8000;
    cpu.step(&mut bus);

    assert_eq!(cpu.nmi(&mut bus), 11);
    assert_eq!(cpu.pc(), 0x0066);
    assert!(!cpu.regs.iff1);
    assert!(cpu.regs.iff2);

    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.pc(), 0x0001);
    assert!(cpu.regs.iff1);
    assert!(bus.inte());
}

#[test]
fn test_interrupt_waits_for_prefixed_opcode() {
    let (mut cpu, mut bus) = cpu_with(&[0xFB, 0xDD, 0x23]); // EI; INC IX
    cpu.regs.im = 1;
    cpu.regs.sp = 0x8000;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.prefix_pending());

    // The request finishes the prefixed instruction instead.
    assert_eq!(cpu.interrupt(&mut bus), 6);
    assert_eq!(cpu.regs.ix, 1);
    assert_eq!(cpu.pc(), 3);
    assert!(cpu.regs.iff1);
}

#[test]
fn test_halt_increments_r() {
    let (mut cpu, mut bus) = cpu_with(&[0x76]);
    cpu.step(&mut bus);
    for _ in 0..5 {
        assert_eq!(cpu.step(&mut bus), zilog_z80::HALT_SLICE);
    }
    assert_eq!(cpu.regs.r, 6);
    assert_eq!(cpu.pc(), 1);
}

#[test]
fn test_memptr_after_ld_a_nn() {
    let (mut cpu, mut bus) = cpu_with(&[0x3A, 0xFF, 0x40]); // LD A,(40FFh)
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.wz, 0x4100);
}

#[test]
fn test_bus_hooks_see_stack_traffic() {
    struct Counting {
        inner: SimpleBus,
        stack_writes: usize,
    }
    impl Bus for Counting {
        fn read(&mut self, address: u16) -> u8 {
            self.inner.read(address)
        }
        fn write(&mut self, address: u16, value: u8) {
            self.inner.write(address, value);
        }
        fn port_in(&mut self, port: u8) -> u8 {
            self.inner.port_in(port)
        }
        fn port_out(&mut self, port: u8, value: u8) {
            self.inner.port_out(port, value);
        }
        fn stack_write(&mut self, address: u16, value: u8) {
            self.stack_writes += 1;
            self.inner.write(address, value);
        }
    }

    let mut bus = Counting { inner: SimpleBus::new(), stack_writes: 0 };
    bus.inner.load(0x0000, &[0xC5, 0xFF]); // PUSH BC; RST 38h
    let mut cpu = Z80::new();
    cpu.regs.sp = 0x8000;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(bus.stack_writes, 4);
}
