//! Asynchronous transport - typically used by a remote host.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{Error, Result};
use crate::packet::{Packet, decode_header};
use crate::port::{AsyncMailbox, AsyncMailboxIo};
use crate::transport::{DRAIN_LIMIT, check_arg_len};

/// Asynchronous packet transport over an [`AsyncMailbox`].
pub struct AsyncTransport<'a, I: AsyncMailboxIo> {
    mbox: AsyncMailbox<'a, I>,
}

impl<'a, I: AsyncMailboxIo> AsyncTransport<'a, I> {
    pub fn new(io: &'a mut I) -> Self {
        Self {
            mbox: AsyncMailbox::new(io),
        }
    }

    pub fn mailbox(&mut self) -> &mut AsyncMailbox<'a, I> {
        &mut self.mbox
    }

    /// See [`crate::transport::Transport::transmit`]
    pub async fn transmit(&mut self, packet: &Packet) -> Result<usize> {
        let len = check_arg_len(packet.arg_len)?;

        self.mbox.write_word(packet.version).await?;
        self.mbox.write_word(packet.header_word()).await?;
        for &word in packet.data[..len].iter() {
            self.mbox.write_word(word).await?;
        }
        self.mbox.signal_done().await?;

        debug!("Sent opcode {} with {len} words", packet.opcode);
        Ok(len)
    }

    /// See [`crate::transport::Transport::receive`]
    pub async fn receive(&mut self, packet: &mut Packet) -> Result<usize> {
        packet.version = self.mbox.read_word_ungated().await?;

        let header = self.mbox.read_word().await?;
        let (opcode, arg_len) = decode_header(header);
        packet.opcode = opcode;
        let len = match check_arg_len(arg_len) {
            Ok(len) => len,
            Err(e) => {
                warn!("Rx opcode {opcode} declared {arg_len} words, too long");
                return Err(e);
            }
        };
        packet.arg_len = arg_len;

        for word in packet.data[..len].iter_mut() {
            *word = self.mbox.read_word().await?;
        }

        self.drain().await?;

        debug!("Received opcode {opcode} with {len} words");
        Ok(len)
    }

    async fn drain(&mut self) -> Result<()> {
        let mut drained = 0;
        while self.mbox.rx_available().await? {
            if drained == DRAIN_LIMIT {
                error!("Rx still available after draining {drained} extra words");
                return Err(Error::Timeout);
            }
            let extra = self.mbox.read_word_ungated().await?;
            warn!("Extra Rx: {extra:#010X}");
            drained += 1;
        }
        Ok(())
    }
}
