//! Front-panel status word and bus transaction observation.
//!
//! The low byte mirrors the status byte the 8080 places on the data bus at
//! the start of every machine cycle (the Altair latches it onto the front
//! panel LEDs). The high byte carries machine-level signals that are not part
//! of that byte.
//!
//! Every bit is active-high. `WO` is therefore the inverse of the 8080's
//! active-low WO̅ line: set during memory writes and port output, the
//! cycles in which the LED reads "write".

use std::fmt;

/// Bus status word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status(pub u16);

impl Status {
    /// Interrupt acknowledge in progress.
    pub const INT: Self = Self(0x0001);
    /// Memory write or port output in progress (inverted WO̅).
    pub const WO: Self = Self(0x0002);
    /// Address bus holds the stack pointer.
    pub const STACK: Self = Self(0x0004);
    /// Halt acknowledged.
    pub const HLTA: Self = Self(0x0008);
    /// Port output in progress.
    pub const OUT: Self = Self(0x0010);
    /// Opcode fetch (machine cycle 1).
    pub const M1: Self = Self(0x0020);
    /// Port input in progress.
    pub const INP: Self = Self(0x0040);
    /// Memory read in progress.
    pub const MEMR: Self = Self(0x0080);
    /// Addressed memory is write protected.
    pub const PROT: Self = Self(0x0100);
    /// Interrupts enabled.
    pub const INTE: Self = Self(0x0200);
    /// Hold acknowledged (DMA owns the bus).
    pub const HLDA: Self = Self(0x0400);
    /// CPU in a wait state.
    pub const WAIT: Self = Self(0x0800);

    /// Bits that describe a single bus phase; cleared at the start of each
    /// transaction. PROT, INTE, HLDA and WAIT persist.
    pub const PHASE: Self = Self(0x00FF);

    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl core::ops::BitOr for Status {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = [
            "INT", "WO", "STACK", "HLTA", "OUT", "M1", "INP", "MEMR", "PROT", "INTE", "HLDA",
            "WAIT",
        ];
        write!(f, "Status(")?;
        let mut first = true;
        for (bit, name) in NAMES.iter().enumerate() {
            if self.0 & (1 << bit) != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

/// One completed bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCycle {
    /// Status word during the transaction.
    pub status: Status,
    /// Address bus (port number in both bytes for I/O cycles).
    pub address: u16,
    /// Data bus.
    pub data: u8,
}

/// Subscriber notified after every bus transaction.
///
/// Display concerns (front-panel LEDs, bus monitors) hang off this hook so
/// bus timing stays independent of them. Observers must not assume they see
/// a transaction before the CPU acts on its data.
pub trait BusObserver {
    fn observe(&mut self, cycle: &BusCycle);
}

impl<F: FnMut(&BusCycle)> BusObserver for F {
    fn observe(&mut self, cycle: &BusCycle) {
        self(cycle);
    }
}
