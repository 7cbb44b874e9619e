//! Memory shared with the peer.
//!
//! The peer names buffers by their address in the CM7's memory map.  Rather
//! than write through whatever address arrives, handlers go through a
//! [`SharedArena`], which owns the one region both cores agreed to share and
//! hands out sub-slices of it only after a bounds check.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::config::ArenaConfig;
use crate::{Error, Result};

/// Registered region of memory shared with the peer.
pub struct SharedArena<'a> {
    base: u32,
    mem: &'a mut [u8],
}

impl<'a> SharedArena<'a> {
    /// Register `mem` as the shared arena, as seen by the peer at `base`.
    pub fn new(base: u32, mem: &'a mut [u8]) -> Self {
        debug!("Shared arena at {base:#010X} size {} bytes", mem.len());
        Self { base, mem }
    }

    /// Register the arena described by `config` in place.
    ///
    /// # Safety
    ///
    /// `config` must describe memory which is valid for reads and writes
    /// for `'a`, and nothing else on the CM7 may reference it for that
    /// lifetime.
    pub unsafe fn from_config(config: &ArenaConfig) -> Self {
        let mem = unsafe {
            core::slice::from_raw_parts_mut(config.base as *mut u8, config.size as usize)
        };
        Self::new(config.base, mem)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    /// Whether `len` bytes at `addr` lie wholly inside the arena.
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        self.offset_of(addr, len).is_ok()
    }

    /// Borrow `len` bytes at peer address `addr`.
    ///
    /// Returns [`Error::OutsideArena`] unless the whole range is inside.
    pub fn region_mut(&mut self, addr: u32, len: usize) -> Result<&mut [u8]> {
        let offset = self.offset_of(addr, len)?;
        Ok(&mut self.mem[offset..offset + len])
    }

    fn offset_of(&self, addr: u32, len: usize) -> Result<usize> {
        let offset = addr.checked_sub(self.base).ok_or(Error::OutsideArena)? as usize;
        match offset.checked_add(len) {
            Some(end) if end <= self.mem.len() => Ok(offset),
            _ => Err(Error::OutsideArena),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_bounds() {
        let mut backing = [0u8; 64];
        let mut arena = SharedArena::new(0x6100_0000, &mut backing);

        assert!(arena.contains(0x6100_0000, 64));
        assert!(arena.contains(0x6100_0030, 16));
        assert!(!arena.contains(0x6100_0031, 16));
        assert!(!arena.contains(0x60FF_FFFF, 1));
        assert!(!arena.contains(0xFFFF_FFFF, usize::MAX));

        let region = arena.region_mut(0x6100_0010, 4).unwrap();
        region.copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(arena.region_mut(0x6100_0040, 1), Err(Error::OutsideArena));
        drop(arena);
        assert_eq!(&backing[0x10..0x14], &[1, 2, 3, 4]);
    }
}
