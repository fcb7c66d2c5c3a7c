//! 64 KB main memory with write protection.
//!
//! Two mechanisms drop writes: a protect boundary (every address below it
//! is read-only) and a mask of protected 2 KB regions, which ROM loading
//! sets for the regions it covers. Dropped writes are counted, not
//! reported.

use crate::error::AltairError;

/// Size of one protectable region.
pub const REGION_SIZE: usize = 0x0800;

const MEMORY_SIZE: usize = 0x1_0000;

pub struct Memory {
    ram: Box<[u8]>,
    /// Addresses below this are read-only. 0 disables the boundary.
    protect_boundary: u16,
    /// Bit n protects `n * REGION_SIZE ..< (n + 1) * REGION_SIZE`.
    protected_regions: u32,
    dropped_writes: u64,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: vec![0; MEMORY_SIZE].into_boxed_slice(),
            protect_boundary: 0,
            protected_regions: 0,
            dropped_writes: 0,
        }
    }

    #[must_use]
    pub fn read(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Store a byte unless the address is protected. Returns whether the
    /// write landed.
    pub fn write(&mut self, address: u16, value: u8) -> bool {
        if self.is_protected(address) {
            self.dropped_writes += 1;
            tracing::trace!("write of 0x{value:02X} to protected 0x{address:04X} dropped");
            return false;
        }
        self.ram[usize::from(address)] = value;
        true
    }

    /// Read memory without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.read(address)
    }

    /// Copy `data` into memory, ignoring protection (wraps at 64 KB).
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[usize::from(addr)] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Load a ROM image and protect every region it touches.
    ///
    /// # Errors
    ///
    /// Fails if the image would run past 0xFFFF.
    pub fn load_rom(&mut self, address: u16, data: &[u8]) -> Result<(), AltairError> {
        let start = usize::from(address);
        let end = start + data.len();
        if end > MEMORY_SIZE {
            return Err(AltairError::RomTooLarge {
                address,
                len: data.len(),
            });
        }
        self.ram[start..end].copy_from_slice(data);
        if !data.is_empty() {
            for region in start / REGION_SIZE..=(end - 1) / REGION_SIZE {
                self.protected_regions |= 1 << region;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_protected(&self, address: u16) -> bool {
        address < self.protect_boundary
            || self.protected_regions & (1 << (usize::from(address) / REGION_SIZE)) != 0
    }

    pub fn set_protect_boundary(&mut self, boundary: u16) {
        self.protect_boundary = boundary;
    }

    /// Protect or unprotect the 2 KB region `region` (0-31).
    pub fn protect_region(&mut self, region: u8, on: bool) {
        let bit = 1u32 << (region & 31);
        if on {
            self.protected_regions |= bit;
        } else {
            self.protected_regions &= !bit;
        }
    }

    #[must_use]
    pub const fn protected_regions(&self) -> u32 {
        self.protected_regions
    }

    /// Writes dropped by protection since power-on.
    #[must_use]
    pub const fn dropped_writes(&self) -> u64 {
        self.dropped_writes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_protects_low_memory() {
        let mut mem = Memory::new();
        mem.set_protect_boundary(0x1000);
        assert!(!mem.write(0x0FFF, 0xAA));
        assert!(mem.write(0x1000, 0xAA));
        assert_eq!(mem.peek(0x0FFF), 0);
        assert_eq!(mem.peek(0x1000), 0xAA);
        assert_eq!(mem.dropped_writes(), 1);
    }

    #[test]
    fn rom_protects_covered_regions() {
        let mut mem = Memory::new();
        mem.load_rom(0xFF00, &[0x3E, 0x01]).unwrap();
        assert_eq!(mem.protected_regions(), 1 << 31);
        assert!(!mem.write(0xF800, 0x55));
        assert!(mem.write(0xF7FF, 0x55));

        mem.load_rom(0x07FF, &[0; 2]).unwrap();
        assert!(mem.is_protected(0x0000));
        assert!(mem.is_protected(0x0FFF));
        assert!(!mem.is_protected(0x1000));
    }

    #[test]
    fn rom_past_the_top_is_rejected() {
        let mut mem = Memory::new();
        assert_eq!(
            mem.load_rom(0xFFFF, &[1, 2]),
            Err(AltairError::RomTooLarge {
                address: 0xFFFF,
                len: 2
            })
        );
        assert_eq!(mem.protected_regions(), 0);
    }

    #[test]
    fn load_ignores_protection() {
        let mut mem = Memory::new();
        mem.protect_region(0, true);
        mem.load(0x0000, &[0xC3]);
        assert_eq!(mem.peek(0), 0xC3);
        mem.protect_region(0, false);
        assert!(mem.write(0x0000, 0x00));
    }
}
