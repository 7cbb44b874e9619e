//! Memory mapped mailbox registers - used on the CM7.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::Result;
use crate::port::{MailboxIo, Register};

/// Mailbox I/O implementation using direct register access
#[derive(Clone, Copy)]
pub struct MmioMailboxIo {
    base: u32,
}

impl MmioMailboxIo {
    /// Register block base on the CM7.
    pub const DEFAULT_BASE: u32 = 0x4001_3000;

    /// Create a new MmioMailboxIo instance.
    ///
    /// ```rust
    /// use cm7_mbox::port::MmioMailboxIo;
    ///
    /// static mut MBOX_IO: MmioMailboxIo = MmioMailboxIo::new(MmioMailboxIo::DEFAULT_BASE);
    /// ```
    pub const fn new(base: u32) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> u32 {
        self.base
    }
}

impl MailboxIo for MmioMailboxIo {
    fn read_reg(&mut self, reg: Register) -> Result<u32> {
        Ok(unsafe { core::ptr::read_volatile(reg.address(self.base) as *const u32) })
    }

    fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
        unsafe { core::ptr::write_volatile(reg.address(self.base) as *mut u32, value) };
        Ok(())
    }

    // Waits for outstanding writes to complete, not just to be ordered
    fn barrier(&mut self) {
        cortex_m::asm::dsb();
    }
}
