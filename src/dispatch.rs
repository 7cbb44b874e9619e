//! Command dispatcher.
//!
//! Runs one dispatch cycle each time the mailbox-available interrupt fires:
//!
//! ```text
//! Idle -> Receiving -> Dispatching -> Responding -> Idle
//! ```
//!
//! - receive failure: logged, back to `Idle`, no response
//! - `Invalid` or unknown opcode: logged, back to `Idle`, no response
//! - transmit failure: logged, never retried
//!
//! Request and response packets are created zeroed on every cycle and
//! dropped at the end of it, so nothing carries over from one request to the
//! next.  Whatever the outcome, the interrupt's pending indicator is cleared
//! exactly once, as the last action of the cycle.  A request arriving while
//! a cycle is in progress is therefore seen once the cycle returns.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Error;
use crate::handler::CommandSet;
use crate::irq::{InterruptController, IrqSource};
use crate::packet::{Packet, ToCm7Op};
use crate::port::MailboxIo;
use crate::transport::Transport;

/// Where the dispatcher is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Receiving,
    Dispatching,
    Responding,
}

/// Result of one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The request could not be received
    RxFailed(Error),
    /// The request's opcode has no handler, nothing was sent
    Ignored(u16),
    /// A response was sent
    Responded { opcode: u16, len: usize },
    /// The response could not be sent
    TxFailed(Error),
}

/// Runs dispatch cycles against a [`CommandSet`].
pub struct Dispatcher<H: CommandSet> {
    handlers: H,
    state: DispatchState,
    cycles: u32,
}

impl<H: CommandSet> Dispatcher<H> {
    pub fn new(handlers: H) -> Self {
        Self {
            handlers,
            state: DispatchState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Number of cycles run.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn handlers(&mut self) -> &mut H {
        &mut self.handlers
    }

    /// Service the mailbox-available interrupt.
    pub fn on_mailbox_available<I, C>(&mut self, io: &mut I, controller: &mut C) -> DispatchOutcome
    where
        I: MailboxIo,
        C: InterruptController,
    {
        self.cycles = self.cycles.wrapping_add(1);
        let outcome = self.cycle(io);
        self.state = DispatchState::Idle;

        controller.clear_pending(IrqSource::MboxAvailable);
        outcome
    }

    fn cycle<I: MailboxIo>(&mut self, io: &mut I) -> DispatchOutcome {
        self.state = DispatchState::Receiving;
        let mut transport = Transport::new(io);
        let mut request = Packet::empty();
        if let Err(e) = transport.receive(&mut request) {
            error!("Rx failure: {e:?}");
            return DispatchOutcome::RxFailed(e);
        }
        debug!("Rx opcode {} with {} words", request.opcode, request.arg_len);

        self.state = DispatchState::Dispatching;
        let response = match request.request_op() {
            Ok(ToCm7Op::Knock) => self.handlers.knock(&request),
            Ok(ToCm7Op::OffloadTransform) => self.handlers.offload_transform(&request),
            Ok(ToCm7Op::SharedMemoryCompute) => self.handlers.shared_memory_compute(&request),
            Ok(ToCm7Op::PersistentWrite) => self.handlers.persistent_write(&request),
            Ok(ToCm7Op::Invalid) => {
                warn!("Rx invalid opcode, ignoring");
                return DispatchOutcome::Ignored(request.opcode);
            }
            Err(_) => {
                warn!("Rx unknown opcode {}, ignoring", request.opcode);
                return DispatchOutcome::Ignored(request.opcode);
            }
        };

        self.state = DispatchState::Responding;
        match transport.transmit(&response) {
            Ok(len) => DispatchOutcome::Responded {
                opcode: response.opcode,
                len,
            },
            Err(e) => {
                error!("Tx of opcode {} failed: {e:?}", response.opcode);
                DispatchOutcome::TxFailed(e)
            }
        }
    }
}
