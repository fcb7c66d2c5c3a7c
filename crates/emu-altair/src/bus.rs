//! Altair bus: memory, I/O port routing and the front-panel status word.
//!
//! The CPU reaches everything through `emu_core::Bus`. Each bus hook
//! identifies its phase (opcode fetch, stack access, port cycle, halt,
//! interrupt acknowledge), so the bus can latch the matching status word
//! and hand the finished transaction to an optional observer. Lights and
//! bus monitors hang off that observer; nothing on the timing path depends
//! on it.
//!
//! Port handlers are registered per port range. A port with no handler
//! floats high and reads 0xFF; writes to it vanish.

use std::ops::RangeInclusive;

use emu_core::{Bus, BusCycle, BusObserver, Status};

use crate::error::AltairError;
use crate::irq::InterruptController;
use crate::memory::Memory;

/// Deferred scheduler operation requested from a port handler.
///
/// Handlers run inside an instruction, while the scheduler is busy being
/// the machine's clock. Requests are applied as soon as the instruction
/// completes, before its cycles are accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start {
        id: usize,
        period_us: u32,
        recurring: bool,
    },
    Stop {
        id: usize,
    },
}

/// What a port handler may touch besides its own state.
pub struct IoContext<'a> {
    pub irq: &'a mut InterruptController,
    timers: &'a mut Vec<TimerCommand>,
}

impl IoContext<'_> {
    /// Start timer `id` once the current instruction completes.
    pub fn start_timer(&mut self, id: usize, period_us: u32, recurring: bool) {
        self.timers.push(TimerCommand::Start {
            id,
            period_us,
            recurring,
        });
    }

    /// Stop timer `id` once the current instruction completes.
    pub fn stop_timer(&mut self, id: usize) {
        self.timers.push(TimerCommand::Stop { id });
    }
}

/// A peripheral's I/O ports.
pub trait PortHandler {
    /// `IN port`.
    fn port_in(&mut self, port: u8, io: &mut IoContext<'_>) -> u8;

    /// `OUT port`.
    fn port_out(&mut self, port: u8, value: u8, io: &mut IoContext<'_>);

    /// Front-panel CLR pulsed the bus reset line.
    fn clear(&mut self, _io: &mut IoContext<'_>) {}
}

/// The Altair bus, implementing `emu_core::Bus`.
pub struct AltairBus {
    pub memory: Memory,
    pub irq: InterruptController,
    handlers: Vec<Box<dyn PortHandler>>,
    ports: [Option<usize>; 256],
    timer_commands: Vec<TimerCommand>,
    last: BusCycle,
    observer: Option<Box<dyn BusObserver>>,
}

impl AltairBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            irq: InterruptController::new(),
            handlers: Vec::new(),
            ports: [None; 256],
            timer_commands: Vec::new(),
            last: BusCycle {
                status: Status::EMPTY,
                address: 0,
                data: 0,
            },
            observer: None,
        }
    }

    /// Route `ports` to `handler`.
    ///
    /// # Errors
    ///
    /// Fails if any port in the range already has a handler.
    pub fn register<H>(&mut self, ports: RangeInclusive<u8>, handler: H) -> Result<(), AltairError>
    where
        H: PortHandler + 'static,
    {
        let (first, last) = (*ports.start(), *ports.end());
        if let Some(port) = ports.clone().find(|&p| self.ports[usize::from(p)].is_some()) {
            return Err(AltairError::PortInUse { first, last, port });
        }
        let index = self.handlers.len();
        self.handlers.push(Box::new(handler));
        for port in ports {
            self.ports[usize::from(port)] = Some(index);
        }
        tracing::debug!("ports 0x{first:02X}..=0x{last:02X} registered");
        Ok(())
    }

    /// Subscribe to completed bus transactions.
    pub fn set_observer<O: BusObserver + 'static>(&mut self, observer: O) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// The most recent transaction (what the front-panel lights show).
    #[must_use]
    pub const fn last_cycle(&self) -> BusCycle {
        self.last
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.last.status
    }

    /// Pulse CLR to every registered peripheral.
    pub fn clear_devices(&mut self) {
        let mut io = IoContext {
            irq: &mut self.irq,
            timers: &mut self.timer_commands,
        };
        for handler in &mut self.handlers {
            handler.clear(&mut io);
        }
    }

    /// Scheduler requests made by handlers since the last call.
    pub fn take_timer_commands(&mut self) -> Vec<TimerCommand> {
        std::mem::take(&mut self.timer_commands)
    }

    pub(crate) fn has_timer_commands(&self) -> bool {
        !self.timer_commands.is_empty()
    }

    fn complete(&mut self, phase: Status, address: u16, data: u8) {
        let mut status = phase;
        status.set(Status::INTE, self.irq.is_enabled());
        self.last = BusCycle {
            status,
            address,
            data,
        };
        if let Some(observer) = &mut self.observer {
            observer.observe(&self.last);
        }
    }

    fn memory_cycle(&mut self, phase: Status, address: u16, data: u8) {
        let mut phase = phase;
        phase.set(Status::PROT, self.memory.is_protected(address));
        self.complete(phase, address, data);
    }
}

impl Default for AltairBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for AltairBus {
    fn read(&mut self, address: u16) -> u8 {
        let data = self.memory.read(address);
        self.memory_cycle(Status::MEMR, address, data);
        data
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory.write(address, value);
        self.memory_cycle(Status::WO, address, value);
    }

    fn port_in(&mut self, port: u8) -> u8 {
        let data = match self.ports[usize::from(port)] {
            Some(index) => {
                let mut io = IoContext {
                    irq: &mut self.irq,
                    timers: &mut self.timer_commands,
                };
                self.handlers[index].port_in(port, &mut io)
            }
            None => 0xFF,
        };
        self.complete(Status::INP, u16::from_le_bytes([port, port]), data);
        data
    }

    fn port_out(&mut self, port: u8, value: u8) {
        if let Some(index) = self.ports[usize::from(port)] {
            let mut io = IoContext {
                irq: &mut self.irq,
                timers: &mut self.timer_commands,
            };
            self.handlers[index].port_out(port, value, &mut io);
        }
        // WO is active-high in Status, so output cycles set it.
        self.complete(Status::OUT | Status::WO, u16::from_le_bytes([port, port]), value);
    }

    fn fetch(&mut self, address: u16) -> u8 {
        let data = self.memory.read(address);
        self.memory_cycle(Status::M1 | Status::MEMR, address, data);
        data
    }

    fn stack_read(&mut self, address: u16) -> u8 {
        let data = self.memory.read(address);
        self.memory_cycle(Status::STACK | Status::MEMR, address, data);
        data
    }

    fn stack_write(&mut self, address: u16, value: u8) {
        self.memory.write(address, value);
        self.memory_cycle(Status::STACK | Status::WO, address, value);
    }

    fn halt_acknowledge(&mut self) {
        let address = self.last.address;
        let data = self.memory.read(address);
        self.memory_cycle(Status::HLTA | Status::MEMR, address, data);
    }

    fn interrupt_acknowledge(&mut self) -> u8 {
        let opcode = self.irq.acknowledge_opcode();
        self.complete(Status::INT | Status::M1, self.last.address, opcode);
        opcode
    }

    fn interrupt_enable(&mut self, enabled: bool) {
        if enabled {
            self.irq.enable();
        } else {
            self.irq.disable();
        }
    }

    fn interrupt_restore(&mut self, enabled: bool) {
        self.irq.restore(enabled);
    }
}
