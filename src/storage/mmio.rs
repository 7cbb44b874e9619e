//! ReRAM array programmed through its memory mapped command interface.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::storage::{PAGE_SIZE, PageDevice};
use crate::{Error, Result};

const CMD_MODE_REG: u32 = 0x4000_0000;
const CMD_MODE_ON: u16 = 0x2;
const CMD_MODE_OFF: u16 = 0x0;
const CMD_LOAD: u32 = 0x5200;
const CMD_WRITE: u32 = 0x9528;

/// On-chip ReRAM
#[derive(Clone, Copy)]
pub struct MmioReram {
    start: u32,
    end: u32,
}

impl MmioReram {
    pub const START: u32 = 0x6000_0000;
    pub const SIZE: u32 = 0x40_0000;

    /// The whole array.
    pub const fn new() -> Self {
        Self {
            start: Self::START,
            end: Self::START + Self::SIZE,
        }
    }

    // Writes made while in command mode are interpreted as commands for the
    // page containing the written address.
    fn command(&mut self, addr: u32, cmd: u32) {
        unsafe {
            core::ptr::write_volatile(CMD_MODE_REG as *mut u16, CMD_MODE_ON);
            cortex_m::asm::dsb();
            core::ptr::write_volatile(addr as *mut u32, cmd);
            cortex_m::asm::dsb();
            core::ptr::write_volatile(CMD_MODE_REG as *mut u16, CMD_MODE_OFF);
            cortex_m::asm::dsb();
        }
    }

    fn check(&self, addr: u32, len: usize) -> Result<()> {
        match addr.checked_add(len as u32) {
            Some(last) if addr >= self.start && last <= self.end => Ok(()),
            _ => Err(Error::Storage),
        }
    }
}

impl Default for MmioReram {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDevice for MmioReram {
    fn range(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.check(addr, buf.len())?;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { core::ptr::read_volatile((addr + i as u32) as *const u8) };
        }
        Ok(())
    }

    fn load_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> Result<()> {
        self.check(addr, PAGE_SIZE)?;
        if addr as usize % PAGE_SIZE != 0 {
            return Err(Error::Storage);
        }

        // The array buffers double word writes
        for (i, chunk) in page.chunks_exact(8).enumerate() {
            let mut dword = [0u8; 8];
            dword.copy_from_slice(chunk);
            unsafe {
                core::ptr::write_volatile(
                    (addr + (i as u32 * 8)) as *mut u64,
                    u64::from_le_bytes(dword),
                )
            };
            cortex_m::asm::dsb();
        }

        self.command(addr, CMD_LOAD);
        Ok(())
    }

    fn commit(&mut self, addr: u32) -> Result<()> {
        self.check(addr, PAGE_SIZE)?;
        self.command(addr, CMD_WRITE);
        Ok(())
    }
}
