//! Memory and I/O bus interface.

use std::collections::HashMap;

/// Memory and I/O port bus interface.
///
/// CPUs reach memory and peripherals only through this trait. The bus owns
/// address decoding, write protection and port routing.
///
/// Only the four primitives are required. The remaining methods identify
/// the bus phase (opcode fetch, stack access, halt, interrupt acknowledge)
/// so a front-panel status word can be driven; their defaults forward to the
/// plain primitives.
pub trait Bus {
    /// Read a byte from memory.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to memory.
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte from an I/O port (`IN`).
    fn port_in(&mut self, port: u8) -> u8;

    /// Write a byte to an I/O port (`OUT`).
    fn port_out(&mut self, port: u8, value: u8);

    /// Opcode fetch (M1 cycle).
    fn fetch(&mut self, address: u16) -> u8 {
        self.read(address)
    }

    /// Read from the stack (POP, RET, XTHL).
    fn stack_read(&mut self, address: u16) -> u8 {
        self.read(address)
    }

    /// Write to the stack (PUSH, CALL, RST, XTHL).
    fn stack_write(&mut self, address: u16, value: u8) {
        self.write(address, value);
    }

    /// The CPU has entered the halt state.
    fn halt_acknowledge(&mut self) {}

    /// Interrupt acknowledge cycle: the opcode placed on the data bus by the
    /// interrupting hardware.
    ///
    /// With nothing driving the bus the data lines float high, which the CPU
    /// decodes as `RST 7`.
    fn interrupt_acknowledge(&mut self) -> u8 {
        0xFF
    }

    /// INTE output changed (EI, DI, interrupt acknowledge).
    fn interrupt_enable(&mut self, _enabled: bool) {}

    /// INTE restored from saved state (Z80 RETN/RETI). Unlike EI this takes
    /// effect immediately, with no one-instruction delay.
    fn interrupt_restore(&mut self, enabled: bool) {
        self.interrupt_enable(enabled);
    }
}

/// Flat 64 KB RAM bus for tests and simple harnesses.
///
/// Port reads return the value latched with [`SimpleBus::set_port`] (0xFF if
/// none); port writes are recorded in order.
pub struct SimpleBus {
    memory: Box<[u8; 0x1_0000]>,
    ports: HashMap<u8, u8>,
    port_writes: Vec<(u8, u8)>,
    vector: u8,
    inte: bool,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x1_0000]),
            ports: HashMap::new(),
            port_writes: Vec::new(),
            vector: 0xFF,
            inte: false,
        }
    }

    /// Copy `data` into memory starting at `address` (wraps at 64 KB).
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read memory without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    /// Set the value returned by `IN port`.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.ports.insert(port, value);
    }

    /// Port writes seen so far, oldest first.
    #[must_use]
    pub fn port_writes(&self) -> &[(u8, u8)] {
        &self.port_writes
    }

    /// Set the opcode supplied during interrupt acknowledge.
    pub fn set_vector(&mut self, opcode: u8) {
        self.vector = opcode;
    }

    /// Last INTE level reported by the CPU.
    #[must_use]
    pub fn inte(&self) -> bool {
        self.inte
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }

    fn port_in(&mut self, port: u8) -> u8 {
        self.ports.get(&port).copied().unwrap_or(0xFF)
    }

    fn port_out(&mut self, port: u8, value: u8) {
        self.port_writes.push((port, value));
    }

    fn interrupt_acknowledge(&mut self) -> u8 {
        self.vector
    }

    fn interrupt_enable(&mut self, enabled: bool) {
        self.inte = enabled;
    }
}
