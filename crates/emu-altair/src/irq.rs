//! Interrupt controller.
//!
//! One 32-bit word aggregates every interrupt source. Device requests sit in
//! the low 24 bits; front-panel switch requests sit in the top byte so the
//! machine loop can service both from a single test. The INTE gate follows
//! the CPU's EI/DI, and an EI shadow holds delivery off until the
//! instruction after EI has completed.
//!
//! The controller never clears a request on its own. Each peripheral drops
//! its bit by its own protocol, typically when its status port is read.
//!
//! With a vectored-interrupt board fitted, device bits are grouped into
//! eight priority levels and acknowledge places `RST n` for the highest
//! active level on the data bus. Without one the data bus floats to 0xFF,
//! which the CPU executes as `RST 7`.

use crate::error::AltairError;

/// First serial port (88-SIO).
pub const SIO: u32 = 1 << 0;
/// Audio cassette interface (88-ACR).
pub const ACR: u32 = 1 << 1;
/// 88-2SIO port A, receive.
pub const SIO2_A_RX: u32 = 1 << 2;
/// 88-2SIO port A, transmit.
pub const SIO2_A_TX: u32 = 1 << 3;
/// 88-2SIO port B, receive.
pub const SIO2_B_RX: u32 = 1 << 4;
/// 88-2SIO port B, transmit.
pub const SIO2_B_TX: u32 = 1 << 5;
/// Second 88-2SIO bank, port A.
pub const SIO2_2_A: u32 = 1 << 6;
/// Second 88-2SIO bank, port B.
pub const SIO2_2_B: u32 = 1 << 7;
/// Floppy disk controller.
pub const DRIVE: u32 = 1 << 8;
/// Real-time clock.
pub const RTC: u32 = 1 << 9;
/// Printer.
pub const PRINTER: u32 = 1 << 10;
/// Hard disk controller.
pub const HDSK: u32 = 1 << 11;
/// Light pen / vector graphics device.
pub const VECTOR: u32 = 1 << 12;

/// Front panel STOP.
pub const STOP: u32 = 1 << 31;
/// Front panel RESET.
pub const RESET: u32 = 1 << 30;
/// Front panel CLR (reset plus bus-wide clear).
pub const CLR: u32 = 1 << 29;
/// AUX2 switch pushed up.
pub const AUX2_UP: u32 = 1 << 28;
/// AUX2 switch pushed down.
pub const AUX2_DOWN: u32 = 1 << 27;

/// Bits delivered to the CPU.
pub const DEVICE_MASK: u32 = 0x00FF_FFFF;
/// Bits serviced by the machine loop regardless of INTE.
pub const SWITCH_MASK: u32 = 0xFF00_0000;

/// Vector board priority levels.
pub const VECTOR_LEVELS: usize = 8;

/// Opcode the floating data bus presents during acknowledge.
pub const FLOATING_BUS: u8 = 0xFF;

/// Pending-request word plus the INTE gate.
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    pending: u32,
    enabled: bool,
    /// Set by EI, cleared by the next delivery check.
    shadow: bool,
    vector_board: bool,
    levels: [u32; VECTOR_LEVELS],
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert (`set`) or deassert the given request bits.
    pub fn request(&mut self, bits: u32, set: bool) {
        if set {
            self.pending |= bits;
        } else {
            self.pending &= !bits;
        }
    }

    /// True if any of `bits` is pending.
    #[must_use]
    pub const fn is_active(&self, bits: u32) -> bool {
        self.pending & bits != 0
    }

    #[must_use]
    pub const fn pending(&self) -> u32 {
        self.pending
    }

    /// Open the INTE gate. Delivery waits until one more instruction has run.
    pub fn enable(&mut self) {
        self.enabled = true;
        self.shadow = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.shadow = false;
    }

    /// Set the INTE gate with no EI shadow (Z80 RETN restoring IFF1).
    pub fn restore(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.shadow = false;
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Delivery check, made once per completed instruction.
    ///
    /// Consumes the EI shadow, so the instruction completing just after EI
    /// is never interrupted but the one after it can be.
    pub fn poll(&mut self) -> bool {
        if self.shadow {
            self.shadow = false;
            return false;
        }
        self.enabled && self.pending & DEVICE_MASK != 0
    }

    /// Fit or remove the vectored-interrupt board.
    pub fn set_vector_board(&mut self, fitted: bool) {
        self.vector_board = fitted;
    }

    #[must_use]
    pub const fn has_vector_board(&self) -> bool {
        self.vector_board
    }

    /// Route device `bits` to vector `level` (0 is highest priority).
    ///
    /// # Errors
    ///
    /// Fails if `level` is not 0-7.
    pub fn assign_level(&mut self, level: u8, bits: u32) -> Result<(), AltairError> {
        let slot = self
            .levels
            .get_mut(usize::from(level))
            .ok_or(AltairError::VectorLevel { level })?;
        *slot |= bits & DEVICE_MASK;
        Ok(())
    }

    /// Opcode driven onto the data bus during interrupt acknowledge.
    #[must_use]
    pub fn acknowledge_opcode(&self) -> u8 {
        if !self.vector_board {
            return FLOATING_BUS;
        }
        self.levels
            .iter()
            .position(|&bits| self.pending & bits != 0)
            .map_or(FLOATING_BUS, |level| 0xC7 | ((level as u8) << 3))
    }

    /// Drop device requests and close the gate (front-panel CLR).
    pub fn clear(&mut self) {
        self.pending &= SWITCH_MASK;
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_set_and_clear_bits() {
        let mut irq = InterruptController::new();
        irq.request(SIO | RTC, true);
        assert!(irq.is_active(RTC));
        irq.request(SIO, false);
        assert!(!irq.is_active(SIO));
        assert_eq!(irq.pending(), RTC);
    }

    #[test]
    fn enable_shadows_one_check() {
        let mut irq = InterruptController::new();
        irq.request(DRIVE, true);
        assert!(!irq.poll());
        irq.enable();
        assert!(!irq.poll());
        assert!(irq.poll());
        irq.disable();
        assert!(!irq.poll());
    }

    #[test]
    fn restore_opens_the_gate_without_a_shadow() {
        let mut irq = InterruptController::new();
        irq.request(DRIVE, true);
        irq.restore(true);
        assert!(irq.is_enabled());
        assert!(irq.poll());
        irq.restore(false);
        assert!(!irq.poll());
    }

    #[test]
    fn switches_are_not_delivered_to_the_cpu() {
        let mut irq = InterruptController::new();
        irq.enable();
        irq.poll();
        irq.request(STOP, true);
        assert!(!irq.poll());
    }

    #[test]
    fn vector_board_selects_highest_level() {
        let mut irq = InterruptController::new();
        irq.request(RTC | SIO, true);
        assert_eq!(irq.acknowledge_opcode(), 0xFF);

        irq.set_vector_board(true);
        irq.assign_level(3, SIO).unwrap();
        irq.assign_level(1, RTC).unwrap();
        assert_eq!(irq.acknowledge_opcode(), 0xCF); // RST 1
        irq.request(RTC, false);
        assert_eq!(irq.acknowledge_opcode(), 0xDF); // RST 3
        assert_eq!(
            irq.assign_level(8, SIO),
            Err(AltairError::VectorLevel { level: 8 })
        );
    }

    #[test]
    fn clear_keeps_switch_bits() {
        let mut irq = InterruptController::new();
        irq.enable();
        irq.request(SIO | CLR, true);
        irq.clear();
        assert_eq!(irq.pending(), CLR);
        assert!(!irq.is_enabled());
    }
}
