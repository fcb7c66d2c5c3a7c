//! Minimal CP/M harness for ZEXDOC/ZEXALL.
//!
//! CP/M memory layout:
//! - 0x0000: Warm boot (we use HALT)
//! - 0x0005: BDOS entry (we intercept CALL 5)
//! - 0x0006-0x0007: Top of TPA (programs read this for stack init)
//! - 0x0100: Program load address (TPA start)

use std::io::Write;

use emu_core::{Cpu, SimpleBus};
use zilog_z80::Z80;

fn run_zex(binary: &[u8]) -> bool {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut bus = SimpleBus::new();
    bus.load(0x0100, binary);
    bus.load(0x0000, &[0x76]); // HALT
    bus.load(0x0005, &[0xC9]); // RET
    bus.load(0x0006, &[0x00, 0xFE]); // 0xFE00

    let mut cpu = Z80::new();
    cpu.regs.pc = 0x0100;

    let mut output = String::new();
    let mut instructions: u64 = 0;

    loop {
        let pc = cpu.pc();
        let at_boundary = !cpu.prefix_pending();

        if at_boundary {
            instructions += 1;
            if instructions % 10_000_000 == 0 {
                eprintln!("[{instructions} instructions]");
            }
        }

        if cpu.is_halted() || (pc == 0x0000 && at_boundary) {
            eprintln!("\nWarm boot at instruction {instructions}");
            break;
        }

        // BDOS intercept; the RET at 0x0005 then returns normally.
        if pc == 0x0005 && at_boundary {
            match cpu.regs.c {
                2 => {
                    let ch = cpu.regs.e as char;
                    eprint!("{ch}");
                    output.push(ch);
                }
                9 => {
                    let mut addr = cpu.regs.de();
                    loop {
                        let ch = bus.peek(addr);
                        if ch == b'$' {
                            break;
                        }
                        eprint!("{}", ch as char);
                        output.push(ch as char);
                        addr = addr.wrapping_add(1);
                    }
                }
                func => eprintln!("\nUnknown BDOS function: {func}"),
            }
            let _ = std::io::stderr().flush();
        }

        cpu.step(&mut bus);
    }

    eprintln!("Output length: {} chars", output.len());

    // ZEXDOC outputs "ERROR" on failure
    !output.contains("ERROR")
}

#[test]
#[ignore]
fn zexdoc() {
    let binary = std::fs::read("tests/data/zexdoc.com").expect("tests/data/zexdoc.com not found");
    assert!(run_zex(&binary), "ZEXDOC failed");
}

#[test]
#[ignore]
fn zexall() {
    let binary = std::fs::read("tests/data/zexall.com").expect("tests/data/zexall.com not found");
    assert!(run_zex(&binary), "ZEXALL failed");
}
