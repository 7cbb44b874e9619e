//! RAM backed page device, used for testing.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec;
use alloc::vec::Vec;

use crate::storage::{PAGE_SIZE, PageDevice};
use crate::{Error, Result};

/// Simulated page programmable storage.
///
/// Loaded pages only become visible on commit, and a commit must name the
/// first page loaded since the previous one.
#[derive(Debug)]
pub struct SimReram {
    base: u32,
    mem: Vec<u8>,
    staged: Vec<(u32, [u8; PAGE_SIZE])>,
    commits: usize,
    largest_batch: usize,
}

impl SimReram {
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            mem: vec![0; size],
            staged: Vec::new(),
            commits: 0,
            largest_batch: 0,
        }
    }

    pub fn fill(&mut self, value: u8) {
        self.mem.fill(value);
    }

    /// Committed contents
    pub fn contents(&self) -> &[u8] {
        &self.mem
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Pages loaded but not yet committed
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    pub fn largest_batch(&self) -> usize {
        self.largest_batch
    }

    fn offset(&self, addr: u32, len: usize) -> Result<usize> {
        let offset = addr.checked_sub(self.base).ok_or(Error::Storage)? as usize;
        if offset + len > self.mem.len() {
            return Err(Error::Storage);
        }
        Ok(offset)
    }
}

impl PageDevice for SimReram {
    fn range(&self) -> (u32, u32) {
        (self.base, self.base + self.mem.len() as u32)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let offset = self.offset(addr, buf.len())?;
        buf.copy_from_slice(&self.mem[offset..offset + buf.len()]);
        Ok(())
    }

    fn load_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> Result<()> {
        if addr as usize % PAGE_SIZE != 0 {
            return Err(Error::Storage);
        }
        self.offset(addr, PAGE_SIZE)?;
        self.staged.push((addr, *page));
        Ok(())
    }

    fn commit(&mut self, addr: u32) -> Result<()> {
        match self.staged.first() {
            Some(&(first, _)) if first == addr => (),
            _ => return Err(Error::Storage),
        }
        let batch = core::mem::take(&mut self.staged);
        self.largest_batch = self.largest_batch.max(batch.len());
        for (page_addr, page) in batch.iter() {
            let offset = self.offset(*page_addr, PAGE_SIZE)?;
            self.mem[offset..offset + PAGE_SIZE].copy_from_slice(page);
        }
        self.commits += 1;
        Ok(())
    }
}
