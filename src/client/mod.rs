//! Client for the companion core's side of the mailbox:
//! - send a request packet
//! - wait, with a bounded number of polls, for the CM7's response
//! - receive the response and check its opcode
//! - raise an abort
//!
//! [`MboxClient`] is used where the mailbox registers are directly
//! accessible.  See [`AsyncMboxClient`] for async client usage, for example
//! on a host driving the registers over a debug probe.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[cfg(feature = "async")]
pub mod futures;

#[cfg(feature = "async")]
pub use futures::{AsyncDelay, AsyncMboxClient};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::packet::{Packet, ToCm7Op, ToRvOp};
use crate::port::{Mailbox, MailboxIo};
use crate::transport::Transport;
use crate::{Error, Result};

/// Configuration for a mailbox client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Status polls to wait for a response before giving up
    pub poll_limit: u32,
    /// Status polls to wait for the CM7 to complete an abort
    pub abort_limit: u32,
}

impl ClientConfig {
    pub const DEFAULT: Self = Self {
        poll_limit: 100_000,
        abort_limit: 1_000,
    };
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The response opcode the CM7 answers `op` with.  `None` for requests it
/// never answers.
pub fn expected_response(op: ToCm7Op) -> Option<ToRvOp> {
    match op {
        ToCm7Op::Invalid => None,
        ToCm7Op::Knock => Some(ToRvOp::RetKnock),
        ToCm7Op::OffloadTransform => Some(ToRvOp::RetOffloadTransform),
        ToCm7Op::SharedMemoryCompute => Some(ToRvOp::RetSharedMemoryCompute),
        ToCm7Op::PersistentWrite => Some(ToRvOp::RetPersistentWrite),
    }
}

// A response must carry a real response opcode, and the right one if we
// know what was asked.
fn check_response(response: &Packet, request_op: Option<u16>) -> Result<()> {
    let op = match response.response_op() {
        Ok(ToRvOp::Invalid) | Err(_) => {
            warn!("Response with invalid opcode {}", response.opcode);
            return Err(Error::InvalidOpcode);
        }
        Ok(op) => op,
    };

    let expected = request_op
        .and_then(|raw| ToCm7Op::try_from(raw).ok())
        .and_then(expected_response);
    match expected {
        Some(expected) if expected != op => {
            warn!("Expected response {expected:?}, got {op:?}");
            Err(Error::InvalidOpcode)
        }
        _ => Ok(()),
    }
}

/// Synchronous mailbox client.
///
/// Example usage:
///
/// ```rust,ignore
/// let mut client = MboxClient::new(&mut io, ClientConfig::DEFAULT);
/// let request = Packet::with_args(ToCm7Op::Knock as u16, &[1, 2, 3])?;
/// let response = client.request(&request)?;
/// assert_eq!(response.args(), &[0]);
/// ```
pub struct MboxClient<'a, I: MailboxIo> {
    io: &'a mut I,
    config: ClientConfig,
}

impl<'a, I: MailboxIo> MboxClient<'a, I> {
    pub fn new(io: &'a mut I, config: ClientConfig) -> Self {
        Self { io, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request.  Returns the number of argument words sent.
    pub fn send(&mut self, request: &Packet) -> Result<usize> {
        Transport::new(self.io).transmit(request)
    }

    /// Whether a response is waiting.
    pub fn poll_ready(&mut self) -> Result<bool> {
        Mailbox::new(self.io).rx_available()
    }

    /// Receive a response.
    ///
    /// Returns [`Error::InvalidOpcode`] if it doesn't carry a response
    /// opcode.
    pub fn recv(&mut self) -> Result<Packet> {
        self.recv_for(None)
    }

    fn recv_for(&mut self, request_op: Option<u16>) -> Result<Packet> {
        let mut response = Packet::empty();
        Transport::new(self.io).receive(&mut response)?;
        check_response(&response, request_op)?;
        Ok(response)
    }

    /// Send a request and wait for its response.
    ///
    /// Returns [`Error::Timeout`] if no response arrived within
    /// [`ClientConfig::poll_limit`] polls, or [`Error::InvalidOpcode`] if
    /// the response doesn't answer the request.
    pub fn request(&mut self, request: &Packet) -> Result<Packet> {
        debug!("Starting request, opcode {}", request.opcode);
        self.send(request)?;

        let mut polls = 0;
        while !self.poll_ready()? {
            polls += 1;
            if polls >= self.config.poll_limit {
                warn!("No response after {polls} polls");
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }

        let response = self.recv_for(Some(request.opcode))?;
        debug!("Request completed after {polls} polls");
        Ok(response)
    }

    /// Abort the CM7's current work, and wait for it to complete the
    /// handshake.
    ///
    /// Returns [`Error::AbortFailed`] if the abort was still in progress
    /// after [`ClientConfig::abort_limit`] polls.
    pub fn abort(&mut self) -> Result<()> {
        let mut mbox = Mailbox::new(self.io);
        mbox.request_abort()?;
        for _ in 0..self.config.abort_limit {
            if !mbox.is_abort_pending()? {
                info!("Abort completed");
                return Ok(());
            }
            core::hint::spin_loop();
        }
        warn!("Abort still in progress after {} polls", self.config.abort_limit);
        Err(Error::AbortFailed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::dispatch::Dispatcher;
    use crate::handler::{self, CommandSet};
    use crate::irq::{InterruptController, IrqSource, SimNvic};
    use crate::port::{Register, SimMailboxIo};

    /// Answers knocks, and every other request with an empty response.
    pub(crate) struct KnockOnly;

    impl CommandSet for KnockOnly {
        fn knock(&mut self, request: &Packet) -> Packet {
            handler::knock(request)
        }

        fn offload_transform(&mut self, _request: &Packet) -> Packet {
            Packet::response(ToRvOp::RetOffloadTransform)
        }

        fn shared_memory_compute(&mut self, _request: &Packet) -> Packet {
            Packet::response(ToRvOp::RetSharedMemoryCompute)
        }

        fn persistent_write(&mut self, _request: &Packet) -> Packet {
            Packet::response(ToRvOp::RetPersistentWrite)
        }
    }

    /// Client end of a mailbox, with the CM7 running a dispatch cycle after
    /// the client has polled for a while.
    pub(crate) struct Linked {
        pub(crate) near: SimMailboxIo,
        far: SimMailboxIo,
        nvic: SimNvic,
        dispatcher: Dispatcher<KnockOnly>,
        /// Status polls before the CM7 answers, `None` to never answer
        pub(crate) reply_after: Option<u32>,
        awaiting: bool,
        polls: u32,
    }

    impl Linked {
        pub(crate) fn new(reply_after: Option<u32>) -> Self {
            crate::init_test_logging();
            Self {
                near: SimMailboxIo::new(),
                far: SimMailboxIo::new(),
                nvic: SimNvic::new(),
                dispatcher: Dispatcher::new(KnockOnly),
                reply_after,
                awaiting: false,
                polls: 0,
            }
        }

        pub(crate) fn cycles(&self) -> u32 {
            self.dispatcher.cycles()
        }

        fn tick(&mut self) {
            if !self.awaiting {
                return;
            }
            self.polls += 1;
            if self.reply_after.is_some_and(|after| self.polls > after) {
                self.nvic.trigger(IrqSource::MboxAvailable);
                self.dispatcher
                    .on_mailbox_available(&mut self.far, &mut self.nvic);
                self.far.deliver_to(&mut self.near);
                self.awaiting = false;
            }
        }
    }

    impl MailboxIo for Linked {
        fn read_reg(&mut self, reg: Register) -> Result<u32> {
            if reg == Register::Status {
                self.tick();
            }
            self.near.read_reg(reg)
        }

        fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
            self.near.write_reg(reg, value)?;
            if reg == Register::Done {
                self.near.deliver_to(&mut self.far);
                self.awaiting = true;
                self.polls = 0;
            }
            Ok(())
        }

        fn barrier(&mut self) {
            self.near.barrier();
        }
    }

    #[test]
    fn knock_request() {
        let mut link = Linked::new(Some(5));
        let mut client = MboxClient::new(&mut link, ClientConfig::DEFAULT);
        let request = Packet::with_args(ToCm7Op::Knock as u16, &[0xFFFF_FFFF, 1]).unwrap();
        let response = client.request(&request).unwrap();
        assert_eq!(response.response_op(), Ok(ToRvOp::RetKnock));
        assert_eq!(response.args(), &[0xFFFF_FFFE]);
        assert_eq!(link.cycles(), 1);
    }

    #[test]
    fn poll_then_recv() {
        let mut link = Linked::new(Some(0));
        let mut client = MboxClient::new(&mut link, ClientConfig::DEFAULT);
        let request = Packet::with_args(ToCm7Op::Knock as u16, &[7]).unwrap();
        assert_eq!(client.send(&request), Ok(1));
        assert_eq!(client.poll_ready(), Ok(true));
        assert_eq!(client.recv().unwrap().args(), &[7]);
        assert_eq!(client.poll_ready(), Ok(false));
    }

    #[test]
    fn no_response_times_out() {
        let mut link = Linked::new(None);
        let config = ClientConfig {
            poll_limit: 20,
            ..ClientConfig::DEFAULT
        };
        let mut client = MboxClient::new(&mut link, config);
        let request = Packet::with_args(ToCm7Op::Knock as u16, &[1]).unwrap();
        assert_eq!(client.request(&request), Err(Error::Timeout));
        assert_eq!(link.cycles(), 0);
    }

    #[test]
    fn invalid_request_never_answered() {
        let mut link = Linked::new(Some(0));
        let config = ClientConfig {
            poll_limit: 10,
            ..ClientConfig::DEFAULT
        };
        let mut client = MboxClient::new(&mut link, config);
        let request = Packet::request(ToCm7Op::Invalid);
        assert_eq!(client.request(&request), Err(Error::Timeout));
        assert_eq!(link.cycles(), 1);
    }

    #[test]
    fn response_opcode_checked() {
        let mut io = SimMailboxIo::new();
        // Request opcode where a response opcode belongs
        io.push_rx(&[0, ToCm7Op::Knock as u32]);
        let mut client = MboxClient::new(&mut io, ClientConfig::DEFAULT);
        assert_eq!(client.recv(), Err(Error::InvalidOpcode));

        let wrong = Packet::response(ToRvOp::RetPersistentWrite);
        assert_eq!(check_response(&wrong, Some(ToCm7Op::Knock as u16)), Err(Error::InvalidOpcode));
        assert_eq!(check_response(&wrong, Some(ToCm7Op::PersistentWrite as u16)), Ok(()));
        assert_eq!(check_response(&wrong, None), Ok(()));
    }

    #[test]
    fn abort_completes() {
        let mut io = SimMailboxIo::new();
        let mut client = MboxClient::new(&mut io, ClientConfig::DEFAULT);
        assert_eq!(client.abort(), Ok(()));
    }

    #[test]
    fn abort_never_completed() {
        let mut io = SimMailboxIo::new();
        io.set_peer_completes_abort(false);
        let config = ClientConfig {
            abort_limit: 3,
            ..ClientConfig::DEFAULT
        };
        let mut client = MboxClient::new(&mut io, config);
        assert_eq!(client.abort(), Err(Error::AbortFailed));
    }

    #[test]
    fn oversized_request_refused() {
        let mut io = SimMailboxIo::new();
        let mut request = Packet::request(ToCm7Op::Knock);
        request.arg_len = 129;
        let mut client = MboxClient::new(&mut io, ClientConfig::DEFAULT);
        assert_eq!(client.request(&request), Err(Error::InvalidLength));
        assert_eq!(io.register_writes(), 0);
    }
}
