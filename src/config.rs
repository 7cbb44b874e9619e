//! Firmware configuration.
//!
//! Everything here is fixed at build time - the CM7 has no configuration
//! store of its own.  [`FirmwareConfig::DEFAULT`] matches the hardware.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::port::MmioMailboxIo;
use crate::{Error, Result};

/// Region of persistent storage the peer may write through the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageWindow {
    /// First writable address
    pub start: u32,
    /// One past the last writable address
    pub end: u32,
    /// Writes must be strictly shorter than this, in bytes
    pub max_write_len: u32,
}

impl StorageWindow {
    /// The 4MB ReRAM array.
    pub const DEFAULT: Self = Self {
        start: 0x6000_0000,
        end: 0x6040_0000,
        max_write_len: 4088,
    };

    /// Check a write of `len` bytes at `addr` lies wholly inside the window
    /// and is under the maximum length.
    pub fn validate(&self, addr: u32, len: u32) -> Result<()> {
        if addr < self.start || addr >= self.end || len >= self.max_write_len {
            return Err(Error::ValidationFailure);
        }
        match addr.checked_add(len) {
            Some(last) if last <= self.end => Ok(()),
            _ => Err(Error::ValidationFailure),
        }
    }
}

/// Placement of the memory shared with the peer, which the image generator
/// may write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    pub base: u32,
    pub size: u32,
}

impl ArenaConfig {
    /// Lower 1MB of the shared SRAM.  The CM7's own text starts at
    /// `0x6110_0000`.
    pub const DEFAULT: Self = Self {
        base: 0x6100_0000,
        size: 0x10_0000,
    };
}

/// Firmware configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareConfig {
    /// Mailbox register block base
    pub mbox_base: u32,
    /// Priority of both mailbox interrupts.  Lower is more urgent.
    pub mbox_irq_priority: u8,
    pub storage: StorageWindow,
    pub arena: ArenaConfig,
}

impl FirmwareConfig {
    pub const DEFAULT: Self = Self {
        mbox_base: MmioMailboxIo::DEFAULT_BASE,
        mbox_irq_priority: 1,
        storage: StorageWindow::DEFAULT,
        arena: ArenaConfig::DEFAULT,
    };
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
