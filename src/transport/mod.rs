//! Packet transport - moves one bounded [`crate::packet::Packet`] across
//! the mailbox, a word at a time.
//!
//! Transmit writes the version word, the header word and then each
//! argument word, every one gated on `TX_AVAILABLE`, and finally signals
//! `DONE`.  Receive mirrors it.  Both return on the first word the mailbox
//! isn't ready for, with [`crate::Error::ChannelNotReady`]:
//! - A transmit which fails part way leaves a partial packet with the peer.
//!   It is not rolled back, and `DONE` is not signalled.
//! - A receive which finds a declared length over [`crate::MAX_PKT_LEN`]
//!   fails with [`crate::Error::InvalidLength`] and leaves the declared
//!   argument words in the mailbox.
//!
//! After the declared words are read any words beyond them are drained and
//! discarded, so a misbehaving peer doesn't leave the next packet
//! misaligned.  If `RX_AVAILABLE` is still set after [`DRAIN_LIMIT`] words
//! the receive fails with [`crate::Error::Timeout`].
//!
//! The version word is read without first checking `RX_AVAILABLE`.  The
//! peer always writes it ahead of the header, so this has not caused a
//! problem, but a receive entered with an empty mailbox latches `RX_ERROR`
//! before failing on the header.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[cfg(feature = "async")]
pub mod futures;
pub mod sync;

#[cfg(feature = "async")]
pub use futures::AsyncTransport;
pub use sync::Transport;

use crate::{Error, MAX_PKT_LEN, Result};

/// Most surplus words drained after a packet before the receive fails.
pub const DRAIN_LIMIT: usize = 4 * MAX_PKT_LEN;

// Helper functions

fn check_arg_len(arg_len: u16) -> Result<usize> {
    let len = arg_len as usize;
    if len > MAX_PKT_LEN {
        Err(Error::InvalidLength)
    } else {
        Ok(len)
    }
}
