//! Software mailbox, used to exercise the transport and dispatcher without
//! hardware.
//!
//! Models each direction as a word queue and derives the status flags from
//! them:
//! - `RX_AVAILABLE` while words are queued towards us
//! - `TX_AVAILABLE` while the outbound queue is below its depth
//! - `TX_ERROR`/`RX_ERROR` latch on a write to a full queue or a read from
//!   an empty one
//!
//! The abort handshake follows the hardware: a write to
//! [`Register::Abort`] while an abort is in progress acknowledges it,
//! otherwise it raises one.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::port::{MailboxIo, Register, Status};
use crate::{MAX_PKT_LEN, Result};

/// In-memory mailbox with simulated flow control.
#[derive(Debug)]
pub struct SimMailboxIo {
    rx: VecDeque<u32>,
    tx: Vec<u32>,
    tx_depth: usize,
    abort_in_progress: bool,
    abort_acknowledged: bool,
    peer_completes_abort: bool,
    tx_error: bool,
    rx_error: bool,
    done_count: usize,
    register_writes: usize,
    barriers: usize,
}

impl SimMailboxIo {
    /// Outbound queue deep enough for the largest packet.
    pub const DEFAULT_TX_DEPTH: usize = MAX_PKT_LEN + 2;

    pub fn new() -> Self {
        Self::with_tx_depth(Self::DEFAULT_TX_DEPTH)
    }

    /// Create with an outbound queue which refuses words once `depth` are
    /// waiting.
    pub fn with_tx_depth(depth: usize) -> Self {
        Self {
            rx: VecDeque::new(),
            tx: Vec::new(),
            tx_depth: depth,
            abort_in_progress: false,
            abort_acknowledged: false,
            peer_completes_abort: true,
            tx_error: false,
            rx_error: false,
            done_count: 0,
            register_writes: 0,
            barriers: 0,
        }
    }

    /// Queue words from the peer.
    pub fn push_rx(&mut self, words: &[u32]) {
        self.rx.extend(words.iter().copied());
    }

    /// Words still queued towards us.
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Words written towards the peer and not yet taken.
    pub fn sent(&self) -> &[u32] {
        &self.tx
    }

    /// Take everything written towards the peer, freeing the outbound queue.
    pub fn take_sent(&mut self) -> Vec<u32> {
        core::mem::take(&mut self.tx)
    }

    /// Move everything written towards the peer into `peer`'s inbound queue.
    pub fn deliver_to(&mut self, peer: &mut SimMailboxIo) {
        let words = self.take_sent();
        peer.push_rx(&words);
    }

    pub fn set_tx_depth(&mut self, depth: usize) {
        self.tx_depth = depth;
    }

    /// Peer raises an abort.
    pub fn raise_abort(&mut self) {
        self.abort_in_progress = true;
        self.abort_acknowledged = false;
    }

    /// Whether an abort this side raises is acknowledged straight away by
    /// the simulated far side.
    pub fn set_peer_completes_abort(&mut self, completes: bool) {
        self.peer_completes_abort = completes;
    }

    /// Number of times [`Register::Done`] was written.
    pub fn done_count(&self) -> usize {
        self.done_count
    }

    /// Number of register writes of any kind.
    pub fn register_writes(&self) -> usize {
        self.register_writes
    }

    /// Number of completion barriers issued.
    pub fn barriers(&self) -> usize {
        self.barriers
    }

    fn status(&self) -> Status {
        let mut status = Status::empty();
        status.set(Status::RX_AVAILABLE, !self.rx.is_empty());
        status.set(Status::TX_AVAILABLE, self.tx.len() < self.tx_depth);
        status.set(Status::ABORT_IN_PROGRESS, self.abort_in_progress);
        status.set(Status::ABORT_ACKNOWLEDGED, self.abort_acknowledged);
        status.set(Status::TX_ERROR, self.tx_error);
        status.set(Status::RX_ERROR, self.rx_error);
        status
    }
}

impl Default for SimMailboxIo {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxIo for SimMailboxIo {
    fn read_reg(&mut self, reg: Register) -> Result<u32> {
        match reg {
            Register::Rdata => match self.rx.pop_front() {
                Some(word) => Ok(word),
                None => {
                    self.rx_error = true;
                    Ok(0)
                }
            },
            Register::Status => Ok(self.status().bits()),
            Register::Wdata | Register::Abort | Register::Done => Ok(0),
        }
    }

    fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
        self.register_writes += 1;
        match reg {
            Register::Wdata => {
                if self.tx.len() < self.tx_depth {
                    self.tx.push(value);
                } else {
                    self.tx_error = true;
                }
            }
            Register::Done => {
                if value & 1 != 0 {
                    self.done_count += 1;
                }
            }
            Register::Abort => {
                if value & 1 != 0 {
                    if self.abort_in_progress {
                        self.abort_in_progress = false;
                        self.abort_acknowledged = true;
                    } else if self.peer_completes_abort {
                        self.abort_acknowledged = true;
                    } else {
                        self.abort_in_progress = true;
                        self.abort_acknowledged = false;
                    }
                }
            }
            Register::Rdata | Register::Status => (),
        }
        Ok(())
    }

    fn barrier(&mut self) {
        self.barriers += 1;
    }
}
