//! Top-level Altair 8800 system.
//!
//! Owns the CPU, the bus and the timer scheduler, and runs the
//! fetch/execute loop that ties them to one cycle count:
//!
//! 1. Service any front-panel switch request (STOP, RESET, CLR, AUX2).
//! 2. Execute one instruction (or one halted wait slice).
//! 3. Apply timer requests made by port handlers, then advance the clock
//!    and fire every timer whose deadline has passed.
//! 4. If the interrupt controller grants delivery, run the acknowledge
//!    cycle and account its cycles the same way.

use emu_core::{Cpu, Observable, Ticks, Value};

use crate::bus::{AltairBus, TimerCommand};
use crate::clock::TIMER_CLOCK;
use crate::config::{AltairConfig, CpuVariant};
use crate::error::AltairError;
use crate::irq::{self, SWITCH_MASK};
use crate::processor::{CpuKind, Processor};
use crate::timer::Scheduler;

/// AUX2 toggle direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxSwitch {
    Up,
    Down,
}

type AuxHandler = Box<dyn FnMut(AuxSwitch, &mut AltairBus)>;

/// The Altair 8800 system.
pub struct Altair {
    cpu: Processor,
    bus: AltairBus,
    scheduler: Scheduler<AltairBus>,
    variant: CpuVariant,
    /// Board to fit at the next reset (switchable machines only).
    selected: CpuKind,
    quiet_opcodes: Vec<(u16, u8)>,
    stopped: bool,
    aux: Option<AuxHandler>,
}

impl Altair {
    #[must_use]
    pub fn new(config: &AltairConfig) -> Self {
        let kind = config.cpu.initial();

        let mut bus = AltairBus::new();
        bus.memory.set_protect_boundary(config.protect_boundary);
        for region in 0..32u8 {
            if config.protected_regions & (1 << region) != 0 {
                bus.memory.protect_region(region, true);
            }
        }
        bus.irq.set_vector_board(config.vector_board);

        let mut scheduler = Scheduler::new(TIMER_CLOCK);
        scheduler.set_rebase_threshold(config.rebase_threshold);

        let mut altair = Self {
            cpu: Processor::new(kind),
            bus,
            scheduler,
            variant: config.cpu,
            selected: kind,
            quiet_opcodes: config.quiet_opcodes.clone(),
            stopped: false,
            aux: None,
        };
        altair.apply_quiet_opcodes();
        altair
    }

    /// Execute one instruction and return the cycles it consumed,
    /// including any interrupt acknowledge that followed it.
    ///
    /// Returns 0 without executing while the machine is stopped.
    pub fn step(&mut self) -> u32 {
        if self.bus.irq.pending() & SWITCH_MASK != 0 {
            self.service_switches();
        }
        if self.stopped {
            return 0;
        }

        let mut cycles = self.cpu.step(&mut self.bus);
        self.account(cycles);

        // Never between a prefix and its opcode.
        if !self.cpu.mid_instruction() && self.bus.irq.poll() {
            let acknowledge = self.cpu.interrupt(&mut self.bus);
            self.account(acknowledge);
            cycles += acknowledge;
        }
        cycles
    }

    /// Run until at least `cycles` cycles have elapsed or the machine
    /// stops. Returns the cycles actually run.
    pub fn run_cycles(&mut self, cycles: u64) -> u64 {
        let mut elapsed = 0u64;
        while elapsed < cycles {
            elapsed += u64::from(self.step());
            if self.stopped {
                break;
            }
        }
        elapsed
    }

    /// Pulse the Z80 NMI line. Returns the cycles taken, or 0 on an 8080
    /// board, which has no NMI input.
    pub fn nmi(&mut self) -> u32 {
        if self.stopped {
            return 0;
        }
        let Processor::Z80(cpu) = &mut self.cpu else {
            tracing::debug!("NMI ignored: no NMI input on the 8080 board");
            return 0;
        };
        let cycles = cpu.nmi(&mut self.bus);
        self.account(cycles);
        cycles
    }

    /// RESET: CPU registers and INTE return to their power-on state; memory
    /// and peripherals are untouched. A switchable machine fits the board
    /// chosen with [`Altair::select_cpu`] here.
    pub fn reset(&mut self) {
        if self.selected != self.cpu.kind() {
            tracing::debug!("switching CPU board to {:?}", self.selected);
            self.cpu = Processor::new(self.selected);
            self.apply_quiet_opcodes();
        }
        self.cpu.reset();
        self.bus.irq.disable();
        tracing::debug!("reset");
    }

    /// Choose the board fitted at the next reset.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is switchable or `kind` is the board
    /// already fitted.
    pub fn select_cpu(&mut self, kind: CpuKind) -> Result<(), AltairError> {
        if self.variant != CpuVariant::Switchable && kind != self.cpu.kind() {
            return Err(AltairError::FixedProcessor(self.cpu.kind()));
        }
        self.selected = kind;
        Ok(())
    }

    /// Handle AUX2 switch requests.
    pub fn set_aux_handler<F>(&mut self, handler: F)
    where
        F: FnMut(AuxSwitch, &mut AltairBus) + 'static,
    {
        self.aux = Some(Box::new(handler));
    }

    /// Load a program into RAM, ignoring write protection.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        self.bus.memory.load(address, data);
    }

    /// Load a ROM image and write-protect the regions it covers.
    ///
    /// # Errors
    ///
    /// Fails if the image runs past the top of memory.
    pub fn load_rom(&mut self, address: u16, data: &[u8]) -> Result<(), AltairError> {
        self.bus.memory.load_rom(address, data)
    }

    /// Continue after STOP.
    pub fn resume(&mut self) {
        self.stopped = false;
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    #[must_use]
    pub fn cpu(&self) -> &Processor {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Processor {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &AltairBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut AltairBus {
        &mut self.bus
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<AltairBus> {
        &self.scheduler
    }

    /// Timer setup for peripherals.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<AltairBus> {
        &mut self.scheduler
    }

    /// Cycles since power-on.
    #[must_use]
    pub fn now(&self) -> Ticks {
        self.scheduler.now()
    }

    fn account(&mut self, cycles: u32) {
        if self.bus.has_timer_commands() {
            for command in self.bus.take_timer_commands() {
                match command {
                    TimerCommand::Start {
                        id,
                        period_us,
                        recurring,
                    } => self.scheduler.start(id, period_us, recurring),
                    TimerCommand::Stop { id } => self.scheduler.stop(id),
                }
            }
        }
        self.scheduler.tick(cycles, &mut self.bus);
    }

    fn service_switches(&mut self) {
        let irq = &mut self.bus.irq;
        let switches = irq.pending() & SWITCH_MASK;
        irq.request(switches, false);

        if switches & irq::STOP != 0 {
            tracing::debug!("STOP at PC 0x{:04X}", self.cpu.pc());
            self.stopped = true;
        }
        if switches & irq::CLR != 0 {
            self.reset();
            self.bus.clear_devices();
            self.bus.irq.clear();
        } else if switches & irq::RESET != 0 {
            self.reset();
        }
        for (bit, direction) in [(irq::AUX2_UP, AuxSwitch::Up), (irq::AUX2_DOWN, AuxSwitch::Down)] {
            if switches & bit != 0 {
                match &mut self.aux {
                    Some(handler) => handler(direction, &mut self.bus),
                    None => tracing::debug!("AUX2 {direction:?} ignored: no handler"),
                }
            }
        }
    }

    fn apply_quiet_opcodes(&mut self) {
        if let Processor::I8080(cpu) = &mut self.cpu {
            for &(address, opcode) in &self.quiet_opcodes {
                cpu.allow_undefined(address, opcode);
            }
        }
    }
}

impl Observable for Altair {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            addr.map(|a| Value::U8(self.bus.memory.peek(a)))
        } else if let Some(rest) = path.strip_prefix("timers.") {
            match rest {
                "next" => self.scheduler.next_deadline().map(|t| t.get().into()),
                "active" => Some((self.scheduler.active() as u8).into()),
                _ => None,
            }
        } else {
            match path {
                "cycles" => Some(self.now().get().into()),
                "cpu" => Some(format!("{:?}", self.cpu.kind()).into()),
                "cpu_clock" => Some(self.cpu.kind().clock().frequency_hz.into()),
                "stopped" => Some(self.stopped.into()),
                "status" => Some(self.bus.status().bits().into()),
                "irq.pending" => Some(self.bus.irq.pending().into()),
                "irq.enabled" => Some(self.bus.irq.is_enabled().into()),
                "memory.dropped" => Some(self.bus.memory.dropped_writes().into()),
                "illegal" => Some(self.cpu.illegal_opcodes().into()),
                _ => self.cpu.query(path),
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<cpu_paths>",
            "memory.<address>",
            "timers.next",
            "timers.active",
            "cycles",
            "cpu",
            "cpu_clock",
            "stopped",
            "status",
            "irq.pending",
            "irq.enabled",
            "memory.dropped",
            "illegal",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn altair() -> Altair {
        Altair::new(&AltairConfig::default())
    }

    #[test]
    fn clock_follows_cpu_cycles() {
        let mut sys = altair();
        sys.load(0x0000, &[0x00, 0x00, 0xC3, 0x00, 0x00]); // NOP; NOP; JMP 0
        assert_eq!(sys.step(), 4);
        assert_eq!(sys.step(), 4);
        assert_eq!(sys.step(), 10);
        assert_eq!(sys.now(), Ticks::new(18));
        assert_eq!(sys.now(), sys.cpu().total_cycles());
    }

    #[test]
    fn stop_halts_run_cycles_until_resumed() {
        let mut sys = altair();
        sys.bus_mut().irq.request(irq::STOP, true);
        assert_eq!(sys.run_cycles(100), 0);
        assert!(sys.is_stopped());
        assert!(!sys.bus().irq.is_active(irq::STOP));
        sys.resume();
        assert!(sys.run_cycles(100) >= 100);
    }

    #[test]
    fn memory_queries_parse_hex_and_decimal() {
        let mut sys = altair();
        sys.load(0x0010, &[0xAB]);
        assert_eq!(sys.query("memory.0x0010"), Some(Value::U8(0xAB)));
        assert_eq!(sys.query("memory.16"), Some(Value::U8(0xAB)));
        assert_eq!(sys.query("cpu"), Some(Value::String("I8080".into())));
        assert_eq!(sys.query("pc"), Some(Value::U16(0)));
    }
}
