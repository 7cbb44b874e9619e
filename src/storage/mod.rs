//! Persistent storage writes.
//!
//! The mailbox handler only sees [`StorageWriter`].  [`ReramWriter`] is the
//! implementation for the ReRAM array, which can only be programmed a whole
//! page at a time:
//! - a page is loaded into the array's buffer with a load command
//! - loaded pages are programmed with a write (commit) command
//!
//! Up to a block's worth of pages may be loaded before a single commit, but
//! a batch never crosses a block boundary.
//!
//! Writes which don't start or end on a page boundary read the existing page
//! back and merge the new bytes in.  Nothing makes the sequence atomic - a
//! fault between pages leaves the earlier pages updated and the later ones
//! not.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod mmio;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use mmio::MmioReram;
#[cfg(any(test, feature = "sim"))]
pub use sim::SimReram;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{Error, Result};

/// Smallest programmable unit, in bytes.
pub const PAGE_SIZE: usize = 32;

/// Most pages which may be loaded ahead of one commit.
pub const BLOCK_PAGES: usize = 32;

/// Block size, in bytes.
pub const BLOCK_SIZE: usize = PAGE_SIZE * BLOCK_PAGES;

/// Writes bytes to persistent storage.
pub trait StorageWriter {
    /// Write `data` at `addr`.  Any alignment and length.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;
}

/// Page programmable storage device.
pub trait PageDevice {
    /// Address range `[start, end)` covered by the device.
    fn range(&self) -> (u32, u32);

    /// Read bytes at any address.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Load one page at page aligned `addr`, ready to be committed.
    fn load_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Program every page loaded since the last commit.  `addr` is the first
    /// of them.
    fn commit(&mut self, addr: u32) -> Result<()>;
}

/// Page aligned, cross-page safe writer over a [`PageDevice`].
pub struct ReramWriter<D: PageDevice> {
    dev: D,
}

impl<D: PageDevice> ReramWriter<D> {
    pub fn new(dev: D) -> Self {
        Self { dev }
    }

    pub fn device(&mut self) -> &mut D {
        &mut self.dev
    }

    pub fn into_inner(self) -> D {
        self.dev
    }

    // Read-modify-write of one page, committed immediately.
    fn merge_page(&mut self, page_addr: u32, offset: usize, data: &[u8]) -> Result<()> {
        let mut page = [0u8; PAGE_SIZE];
        self.dev.read(page_addr, &mut page)?;
        page[offset..offset + data.len()].copy_from_slice(data);
        self.dev.load_page(page_addr, &page)?;
        self.dev.commit(page_addr)
    }
}

impl<D: PageDevice> StorageWriter for ReramWriter<D> {
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let (start, end) = self.dev.range();
        let last = addr
            .checked_add(data.len() as u32)
            .ok_or(Error::Storage)?;
        if addr < start || last > end {
            warn!("Storage write {addr:#010X}+{} outside device", data.len());
            return Err(Error::Storage);
        }

        // Leading page, possibly partial
        let offset = addr as usize % PAGE_SIZE;
        let first_len = (PAGE_SIZE - offset).min(data.len());
        let mut page_addr = addr - offset as u32;
        self.merge_page(page_addr, offset, &data[..first_len])?;
        let mut rest = &data[first_len..];
        page_addr += PAGE_SIZE as u32;

        // Whole middle pages, batched per block
        let mut batch_start = None;
        let mut in_block = (page_addr as usize % BLOCK_SIZE) / PAGE_SIZE;
        while rest.len() > PAGE_SIZE {
            let (chunk, tail) = rest.split_at(PAGE_SIZE);
            let mut page = [0u8; PAGE_SIZE];
            page.copy_from_slice(chunk);
            self.dev.load_page(page_addr, &page)?;
            let first = *batch_start.get_or_insert(page_addr);

            in_block += 1;
            if in_block == BLOCK_PAGES {
                self.dev.commit(first)?;
                batch_start = None;
                in_block = 0;
            }

            rest = tail;
            page_addr += PAGE_SIZE as u32;
        }
        if let Some(first) = batch_start {
            self.dev.commit(first)?;
        }

        // Trailing page
        if !rest.is_empty() {
            self.merge_page(page_addr, 0, rest)?;
        }

        debug!("Stored {} bytes at {addr:#010X}", data.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const BASE: u32 = 0x6000_0000;

    fn writer(size: usize) -> ReramWriter<SimReram> {
        ReramWriter::new(SimReram::new(BASE, size))
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn within_one_page() {
        let mut w = writer(BLOCK_SIZE);
        w.device().fill(0xEE);
        w.write(BASE + 5, &[1, 2, 3]).unwrap();

        let dev = w.into_inner();
        assert_eq!(&dev.contents()[4..9], &[0xEE, 1, 2, 3, 0xEE]);
        assert_eq!(dev.commits(), 1);
        assert_eq!(dev.staged(), 0);
    }

    #[test]
    fn crossing_pages_preserves_neighbours() {
        let mut w = writer(4 * BLOCK_SIZE);
        w.device().fill(0xEE);
        let data = pattern(300);
        w.write(BASE + 20, &data).unwrap();

        let dev = w.into_inner();
        let contents = dev.contents();
        assert!(contents[..20].iter().all(|&b| b == 0xEE));
        assert_eq!(&contents[20..320], &data[..]);
        assert!(contents[320..].iter().all(|&b| b == 0xEE));
        assert_eq!(dev.staged(), 0);
    }

    #[test]
    fn batches_stop_at_block_boundary() {
        let mut w = writer(4 * BLOCK_SIZE);
        // Starts on a page boundary just before the end of block 0
        let start = BASE + (BLOCK_SIZE - 2 * PAGE_SIZE) as u32;
        let data = pattern(BLOCK_SIZE + 3 * PAGE_SIZE + 5);
        w.write(start, &data).unwrap();

        let dev = w.into_inner();
        let offset = (start - BASE) as usize;
        assert_eq!(&dev.contents()[offset..offset + data.len()], &data[..]);
        // Leading page, last page of block 0, all of block 1, one page
        // batch in block 2, trailing partial page
        assert_eq!(dev.commits(), 5);
        assert!(dev.largest_batch() <= BLOCK_PAGES);
    }

    #[test]
    fn outside_device_rejected() {
        let mut w = writer(BLOCK_SIZE);
        assert_eq!(w.write(BASE - 1, &[0]), Err(Error::Storage));
        assert_eq!(w.write(BASE + BLOCK_SIZE as u32 - 2, &[0; 4]), Err(Error::Storage));
        assert_eq!(w.into_inner().commits(), 0);
    }

    #[test]
    fn empty_write_is_noop() {
        let mut w = writer(BLOCK_SIZE);
        w.write(BASE, &[]).unwrap();
        assert_eq!(w.into_inner().commits(), 0);
    }
}
