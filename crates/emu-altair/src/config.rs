//! Machine configuration.

use crate::clock::DEFAULT_REBASE_THRESHOLD;
use crate::processor::CpuKind;

/// CPU board fitted to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CpuVariant {
    /// 8080 only.
    #[default]
    I8080,
    /// Z80 only.
    Z80,
    /// Both boards; `Altair::select_cpu` picks one, applied at the next
    /// reset. Starts on the 8080.
    Switchable,
}

impl CpuVariant {
    /// Core active at power-on.
    #[must_use]
    pub const fn initial(self) -> CpuKind {
        match self {
            Self::I8080 | Self::Switchable => CpuKind::I8080,
            Self::Z80 => CpuKind::Z80,
        }
    }
}

/// Configuration for creating an Altair instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AltairConfig {
    pub cpu: CpuVariant,
    /// Addresses below this are write-protected. 0 for none.
    pub protect_boundary: u16,
    /// Bit n write-protects the 2 KB region starting at `n * 0x800`.
    pub protected_regions: u32,
    /// 88-VI vectored-interrupt board fitted.
    pub vector_board: bool,
    /// `(address, opcode)` pairs run silently as NOPs on the 8080.
    pub quiet_opcodes: Vec<(u16, u8)>,
    /// Cycle counter value that forces a rebase.
    pub rebase_threshold: u32,
}

impl Default for AltairConfig {
    fn default() -> Self {
        Self {
            cpu: CpuVariant::default(),
            protect_boundary: 0,
            protected_regions: 0,
            vector_board: false,
            quiet_opcodes: Vec::new(),
            rebase_threshold: DEFAULT_REBASE_THRESHOLD,
        }
    }
}
