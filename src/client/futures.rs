//! Asynchronous Client - typically used by a Host.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::client::{ClientConfig, check_response};
use crate::io::{Reader, Writer};
use crate::packet::Packet;
use crate::port::{AsyncMailbox, AsyncMailboxIo, ReaderWriterMailboxIo};
use crate::transport::AsyncTransport;
use crate::{Error, Result};

/// Yield delay for async polling loops.
///
/// Application must provide an implementation of this trait in order for the
/// async client to be able to yield, waiting for a response from the CM7.
///
/// This trait keeps `cm7-mbox` free of any specific async runtime.
///
/// Example:
///
/// ```rust,ignore
/// use embassy_time::{Duration, Timer};
/// struct Delay;
/// impl AsyncDelay for Delay {
///     async fn delay() {
///         Timer::after(Duration::from_millis(1)).await;
///     }
/// }
/// ```
pub trait AsyncDelay {
    fn delay() -> impl Future<Output = ()>;
}

/// Async mailbox client.
///
/// See [`AsyncDelay`] for required delay trait.
///
/// Example usage:
///
/// ```rust,ignore
/// use cm7_mbox::client::{AsyncMboxClient, ClientConfig};
/// use cm7_mbox::packet::{Packet, ToCm7Op};
/// use cm7_mbox::port::MmioMailboxIo;
///
/// let mut reader = ...; // implement Reader trait
/// let mut writer = ...; // implement Writer trait
/// let mut client = AsyncMboxClient::<_, Delay>::with_reader_writer(
///     &mut reader,
///     &mut writer,
///     MmioMailboxIo::DEFAULT_BASE,
///     ClientConfig::DEFAULT,
/// );
/// let request = Packet::with_args(ToCm7Op::Knock as u16, &[1, 2, 3])?;
/// let response = client.request(&request).await?;
/// // Process response...
/// ```
pub struct AsyncMboxClient<I: AsyncMailboxIo, D: AsyncDelay> {
    io: I,
    config: ClientConfig,
    _delay: core::marker::PhantomData<D>,
}

impl<'a, R: Reader, W: Writer, D: AsyncDelay> AsyncMboxClient<ReaderWriterMailboxIo<'a, R, W>, D> {
    /// Create a client driving the mailbox registers through `reader` and
    /// `writer`.
    ///
    /// Arguments:
    /// - `reader`: Reader object to read from target
    /// - `writer`: Writer object to write to target
    /// - `base`: Mailbox register block base, in the target's memory map
    /// - `config`: Polling limits
    pub fn with_reader_writer(
        reader: &'a mut R,
        writer: &'a mut W,
        base: u32,
        config: ClientConfig,
    ) -> Self {
        Self::new(ReaderWriterMailboxIo::new(reader, writer, base), config)
    }
}

impl<I: AsyncMailboxIo, D: AsyncDelay> AsyncMboxClient<I, D> {
    pub fn new(io: I, config: ClientConfig) -> Self {
        Self {
            io,
            config,
            _delay: core::marker::PhantomData,
        }
    }

    pub fn io(&mut self) -> &mut I {
        &mut self.io
    }

    /// See [`crate::client::MboxClient::send`]
    pub async fn send(&mut self, request: &Packet) -> Result<usize> {
        AsyncTransport::new(&mut self.io).transmit(request).await
    }

    /// See [`crate::client::MboxClient::poll_ready`]
    pub async fn poll_ready(&mut self) -> Result<bool> {
        AsyncMailbox::new(&mut self.io).rx_available().await
    }

    /// See [`crate::client::MboxClient::recv`]
    pub async fn recv(&mut self) -> Result<Packet> {
        self.recv_for(None).await
    }

    async fn recv_for(&mut self, request_op: Option<u16>) -> Result<Packet> {
        let mut response = Packet::empty();
        AsyncTransport::new(&mut self.io)
            .receive(&mut response)
            .await?;
        check_response(&response, request_op)?;
        Ok(response)
    }

    /// Perform a request by sending it and waiting for the response,
    /// yielding with [`AsyncDelay::delay`] between polls.
    ///
    /// Returns:
    /// - `Ok(response)`: Response packet received from the CM7
    /// - `Err(Error::Timeout)`: No response within the poll limit
    /// - `Err(error)`: Other error occurred during request
    pub async fn request(&mut self, request: &Packet) -> Result<Packet> {
        debug!("Starting request, opcode {}", request.opcode);
        self.send(request).await?;

        let mut polls = 0;
        while !self.poll_ready().await? {
            polls += 1;
            if polls >= self.config.poll_limit {
                warn!("No response after {polls} polls");
                return Err(Error::Timeout);
            }

            // Yield with reasonable delay to avoid spinning too fast
            D::delay().await;
        }

        let response = self.recv_for(Some(request.opcode)).await?;
        debug!("Request completed after {polls} polls");
        Ok(response)
    }

    /// See [`crate::client::MboxClient::abort`]
    pub async fn abort(&mut self) -> Result<()> {
        let limit = self.config.abort_limit;
        let mut mbox = AsyncMailbox::new(&mut self.io);
        mbox.request_abort().await?;
        for _ in 0..limit {
            if !mbox.is_abort_pending().await? {
                info!("Abort completed");
                return Ok(());
            }
            D::delay().await;
        }
        warn!("Abort still in progress after {limit} polls");
        Err(Error::AbortFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;

    use alloc::boxed::Box;
    use alloc::vec::Vec;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use crate::client::tests::Linked;
    use crate::packet::{ToCm7Op, ToRvOp};
    use crate::port::{MailboxIo, Register, SimMailboxIo};

    struct NoDelay;

    impl AsyncDelay for NoDelay {
        async fn delay() {}
    }

    #[async_trait(?Send)]
    impl AsyncMailboxIo for Linked {
        async fn read_reg(&mut self, reg: Register) -> Result<u32> {
            MailboxIo::read_reg(self, reg)
        }

        async fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
            MailboxIo::write_reg(self, reg, value)?;
            MailboxIo::barrier(self);
            Ok(())
        }
    }

    /// Target memory holding just the mailbox registers, as a debug probe
    /// would see it.
    struct Target {
        base: u32,
        io: SimMailboxIo,
    }

    impl Target {
        fn register(&self, addr: u32) -> core::result::Result<Register, &'static str> {
            [
                Register::Wdata,
                Register::Rdata,
                Register::Status,
                Register::Abort,
                Register::Done,
            ]
            .into_iter()
            .find(|reg| reg.address(self.base) == addr)
            .ok_or("not a mailbox register")
        }
    }

    #[derive(Clone)]
    struct SwdLink(Arc<Mutex<Target>>);

    impl Reader for SwdLink {
        type Error = &'static str;

        async fn read(&mut self, addr: u32, buf: &mut [u8]) -> core::result::Result<(), Self::Error> {
            let mut target = self.0.lock().map_err(|_| "poisoned")?;
            let reg = target.register(addr)?;
            let value = MailboxIo::read_reg(&mut target.io, reg).map_err(|_| "read failed")?;
            buf.copy_from_slice(&value.to_le_bytes());
            Ok(())
        }
    }

    impl Writer for SwdLink {
        type Error = &'static str;

        async fn write(&mut self, addr: u32, data: &[u8]) -> core::result::Result<(), Self::Error> {
            let mut target = self.0.lock().map_err(|_| "poisoned")?;
            let reg = target.register(addr)?;
            let bytes: [u8; 4] = data.try_into().map_err(|_| "not a word")?;
            MailboxIo::write_reg(&mut target.io, reg, u32::from_le_bytes(bytes))
                .map_err(|_| "write failed")
        }
    }

    #[tokio::test]
    async fn knock_request() {
        let link = Linked::new(Some(3));
        let mut client = AsyncMboxClient::<_, NoDelay>::new(link, ClientConfig::DEFAULT);
        let request = Packet::with_args(ToCm7Op::Knock as u16, &[1, 2, 3]).unwrap();
        let response = client.request(&request).await.unwrap();
        assert_eq!(response.response_op(), Ok(ToRvOp::RetKnock));
        assert_eq!(response.args(), &[0]);
        assert_eq!(client.io().cycles(), 1);
    }

    #[tokio::test]
    async fn no_response_times_out() {
        let config = ClientConfig {
            poll_limit: 5,
            ..ClientConfig::DEFAULT
        };
        let mut client = AsyncMboxClient::<_, NoDelay>::new(Linked::new(None), config);
        let request = Packet::request(ToCm7Op::Knock);
        assert_eq!(client.request(&request).await, Err(Error::Timeout));
    }

    #[tokio::test]
    async fn abort_never_completed() {
        let mut io = SimMailboxIo::new();
        io.set_peer_completes_abort(false);
        let config = ClientConfig {
            abort_limit: 2,
            ..ClientConfig::DEFAULT
        };
        let mut client = AsyncMboxClient::<_, NoDelay>::new(io, config);
        assert_eq!(client.abort().await, Err(Error::AbortFailed));
    }

    #[tokio::test]
    async fn over_reader_writer() {
        const BASE: u32 = 0x4001_3000;
        let target = Arc::new(Mutex::new(Target {
            base: BASE,
            io: SimMailboxIo::new(),
        }));
        let mut reader = SwdLink(target.clone());
        let mut writer = SwdLink(target.clone());
        let mut client = AsyncMboxClient::<_, NoDelay>::with_reader_writer(
            &mut reader,
            &mut writer,
            BASE,
            ClientConfig::DEFAULT,
        );

        let request = Packet::with_args(ToCm7Op::Knock as u16, &[5, 6]).unwrap();
        assert_eq!(client.send(&request).await, Ok(2));
        assert_eq!(client.poll_ready().await, Ok(false));

        let sent: Vec<u32> = target.lock().unwrap().io.take_sent();
        assert_eq!(sent, [0, ToCm7Op::Knock as u32 | (2 << 16), 5, 6]);
        assert_eq!(target.lock().unwrap().io.done_count(), 1);

        let mut rsp = Packet::response(ToRvOp::RetKnock);
        rsp.data[0] = 3;
        rsp.arg_len = 1;
        target
            .lock()
            .unwrap()
            .io
            .push_rx(&[0, rsp.header_word(), 3]);
        assert_eq!(client.recv().await, Ok(rsp));
    }
}
