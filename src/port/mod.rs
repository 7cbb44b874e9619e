//! Mailbox port - register level access to the mailbox shared with the
//! companion core.
//!
//! The hardware is reached through [`MailboxIo`], which reads and writes
//! individual registers.  [`Mailbox`] builds the port operations on top of
//! it: flow-controlled word transfers, packet completion and the abort
//! handshake.
//!
//! Status flags are never cached - every check re-reads
//! [`Register::Status`].
//!
//! As with the transport built on it, a [`Mailbox`] is intended to be
//! short-lived - create, use, drop - borrowing the [`MailboxIo`] for the
//! duration of one exchange.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[cfg(feature = "async")]
pub mod futures;
pub mod mmio;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(feature = "async")]
pub use futures::{AsyncMailbox, AsyncMailboxIo, ReaderWriterMailboxIo};
pub use mmio::MmioMailboxIo;
#[cfg(any(test, feature = "sim"))]
pub use sim::SimMailboxIo;

use bitflags::bitflags;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{Error, Result};

/// Mailbox registers, as byte offsets from the register block base.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Write data - next word to the peer
    Wdata = 0x00,
    /// Read data - next word from the peer
    Rdata = 0x04,
    /// Status flags, see [`Status`]
    Status = 0x08,
    /// Write 1 to acknowledge (or, from the peer, request) an abort
    Abort = 0x18,
    /// Write 1 to signal the packet just written is complete
    Done = 0x1C,
}

impl Register {
    pub const fn offset(self) -> u32 {
        self as u32
    }

    pub const fn address(self, base: u32) -> u32 {
        base + self.offset()
    }
}

bitflags! {
    /// Contents of [`Register::Status`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        const RX_AVAILABLE = 1 << 0;
        const TX_AVAILABLE = 1 << 1;
        const ABORT_IN_PROGRESS = 1 << 2;
        const ABORT_ACKNOWLEDGED = 1 << 3;
        const TX_ERROR = 1 << 4;
        const RX_ERROR = 1 << 5;
    }
}

/// Trait for accessing the mailbox registers.
///
/// Sync version, used on the CM7 for direct register access, and by the
/// software double.
pub trait MailboxIo {
    /// Read a register
    fn read_reg(&mut self, reg: Register) -> Result<u32>;

    /// Write a register
    fn write_reg(&mut self, reg: Register, value: u32) -> Result<()>;

    /// Completion barrier - all prior register writes have landed before
    /// this returns.
    fn barrier(&mut self) {}
}

/// Mailbox port
pub struct Mailbox<'a, I: MailboxIo> {
    io: &'a mut I,
}

impl<'a, I: MailboxIo> Mailbox<'a, I> {
    /// Wrap a [`MailboxIo`] for the duration of an exchange.
    pub fn new(io: &'a mut I) -> Self {
        Self { io }
    }

    /// Read the status register.  Unknown bits are retained.
    pub fn status(&mut self) -> Result<Status> {
        let raw = self.io.read_reg(Register::Status)?;
        Ok(Status::from_bits_retain(raw))
    }

    /// Whether the peer has a word waiting for us.
    pub fn rx_available(&mut self) -> Result<bool> {
        Ok(self.status()?.contains(Status::RX_AVAILABLE))
    }

    /// Whether there is room to write a word to the peer.
    pub fn tx_available(&mut self) -> Result<bool> {
        Ok(self.status()?.contains(Status::TX_AVAILABLE))
    }

    /// Write one word to the peer.
    ///
    /// Returns [`Error::ChannelNotReady`], without writing, if
    /// `TX_AVAILABLE` is clear.
    pub fn write_word(&mut self, value: u32) -> Result<()> {
        if !self.tx_available()? {
            return Err(Error::ChannelNotReady);
        }
        self.io.write_reg(Register::Wdata, value)?;
        self.io.barrier();
        trace!("Tx {value:#010X}");
        Ok(())
    }

    /// Read one word from the peer.
    ///
    /// Returns [`Error::ChannelNotReady`], without reading, if
    /// `RX_AVAILABLE` is clear.
    pub fn read_word(&mut self) -> Result<u32> {
        if !self.rx_available()? {
            return Err(Error::ChannelNotReady);
        }
        self.read_word_ungated()
    }

    /// Read one word from the peer without checking `RX_AVAILABLE` first.
    ///
    /// If nothing is waiting the hardware returns an undefined value and
    /// raises `RX_ERROR`.
    pub fn read_word_ungated(&mut self) -> Result<u32> {
        let value = self.io.read_reg(Register::Rdata)?;
        trace!("Rx {value:#010X}");
        Ok(value)
    }

    /// Tell the peer the packet just written is complete.  Every previously
    /// written word lands before the signal.
    pub fn signal_done(&mut self) -> Result<()> {
        self.io.barrier();
        self.io.write_reg(Register::Done, 1)?;
        self.io.barrier();
        Ok(())
    }

    /// Whether the peer has an abort outstanding.
    pub fn is_abort_pending(&mut self) -> Result<bool> {
        Ok(self.status()?.contains(Status::ABORT_IN_PROGRESS))
    }

    /// Acknowledge the peer's abort request.
    pub fn acknowledge_abort(&mut self) -> Result<()> {
        self.io.write_reg(Register::Abort, 1)?;
        self.io.barrier();
        Ok(())
    }

    /// Raise an abort towards the CM7.  Used by the peer - the same
    /// register acknowledges on one side and requests on the other.
    pub fn request_abort(&mut self) -> Result<()> {
        self.acknowledge_abort()
    }

    /// Any latched transfer error flags.
    pub fn errors(&mut self) -> Result<Status> {
        Ok(self.status()? & (Status::TX_ERROR | Status::RX_ERROR))
    }
}
