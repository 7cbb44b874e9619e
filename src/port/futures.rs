//! Asynchronous mailbox port - typically used by a remote host.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::boxed::Box;
use async_trait::async_trait;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::{Reader, Writer};
use crate::port::{Register, Status};
use crate::{Error, Result};

/// Trait for accessing the mailbox registers.
///
/// Async version, typically used for accessing the registers over SWD or
/// other asynchronous protocols.
#[async_trait(?Send)]
pub trait AsyncMailboxIo {
    /// Read a register
    async fn read_reg(&mut self, reg: Register) -> Result<u32>;

    /// Write a register.  Completes once the write has landed.
    async fn write_reg(&mut self, reg: Register, value: u32) -> Result<()>;
}

/// Asynchronous mailbox port
pub struct AsyncMailbox<'a, I: AsyncMailboxIo> {
    io: &'a mut I,
}

impl<'a, I: AsyncMailboxIo> AsyncMailbox<'a, I> {
    pub fn new(io: &'a mut I) -> Self {
        Self { io }
    }

    pub async fn status(&mut self) -> Result<Status> {
        let raw = self.io.read_reg(Register::Status).await?;
        Ok(Status::from_bits_retain(raw))
    }

    pub async fn rx_available(&mut self) -> Result<bool> {
        Ok(self.status().await?.contains(Status::RX_AVAILABLE))
    }

    pub async fn tx_available(&mut self) -> Result<bool> {
        Ok(self.status().await?.contains(Status::TX_AVAILABLE))
    }

    /// See [`crate::port::Mailbox::write_word`]
    pub async fn write_word(&mut self, value: u32) -> Result<()> {
        if !self.tx_available().await? {
            return Err(Error::ChannelNotReady);
        }
        self.io.write_reg(Register::Wdata, value).await?;
        trace!("Tx {value:#010X}");
        Ok(())
    }

    /// See [`crate::port::Mailbox::read_word`]
    pub async fn read_word(&mut self) -> Result<u32> {
        if !self.rx_available().await? {
            return Err(Error::ChannelNotReady);
        }
        self.read_word_ungated().await
    }

    /// See [`crate::port::Mailbox::read_word_ungated`]
    pub async fn read_word_ungated(&mut self) -> Result<u32> {
        let value = self.io.read_reg(Register::Rdata).await?;
        trace!("Rx {value:#010X}");
        Ok(value)
    }

    pub async fn signal_done(&mut self) -> Result<()> {
        self.io.write_reg(Register::Done, 1).await
    }

    pub async fn is_abort_pending(&mut self) -> Result<bool> {
        Ok(self.status().await?.contains(Status::ABORT_IN_PROGRESS))
    }

    /// Raise an abort towards the CM7.
    pub async fn request_abort(&mut self) -> Result<()> {
        self.io.write_reg(Register::Abort, 1).await
    }
}

/// Mailbox I/O implementation using [`crate::io::Reader`] and
/// [`crate::io::Writer`] traits.
pub struct ReaderWriterMailboxIo<'a, R: Reader, W: Writer> {
    reader: &'a mut R,
    writer: &'a mut W,
    base: u32,
}

impl<'a, R: Reader, W: Writer> ReaderWriterMailboxIo<'a, R, W> {
    /// Create new instance
    ///
    /// Arguments:
    /// - `reader` - Reads target memory
    /// - `writer` - Writes target memory
    /// - `base` - Mailbox register block base address in the target's map
    pub fn new(reader: &'a mut R, writer: &'a mut W, base: u32) -> Self {
        Self {
            reader,
            writer,
            base,
        }
    }
}

#[async_trait(?Send)]
impl<R: Reader, W: Writer> AsyncMailboxIo for ReaderWriterMailboxIo<'_, R, W> {
    async fn read_reg(&mut self, reg: Register) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.reader
            .read(reg.address(self.base), &mut buf)
            .await
            .map_err(|_| Error::Io)?;
        Ok(u32::from_le_bytes(buf))
    }

    async fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
        self.writer
            .write(reg.address(self.base), &value.to_le_bytes())
            .await
            .map_err(|_| Error::Io)
    }
}

#[cfg(any(test, feature = "sim"))]
#[async_trait(?Send)]
impl AsyncMailboxIo for crate::port::SimMailboxIo {
    async fn read_reg(&mut self, reg: Register) -> Result<u32> {
        crate::port::MailboxIo::read_reg(self, reg)
    }

    async fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
        crate::port::MailboxIo::write_reg(self, reg, value)
    }
}
