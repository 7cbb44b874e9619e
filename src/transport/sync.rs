//! Synchronous transport - used by the CM7 and the sync client.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::packet::{Packet, decode_header};
use crate::port::{Mailbox, MailboxIo};
use crate::transport::{DRAIN_LIMIT, check_arg_len};
use crate::{Error, Result};

/// Synchronous packet transport over a [`Mailbox`].
pub struct Transport<'a, I: MailboxIo> {
    mbox: Mailbox<'a, I>,
}

impl<'a, I: MailboxIo> Transport<'a, I> {
    /// Create a transport for one exchange.
    pub fn new(io: &'a mut I) -> Self {
        Self {
            mbox: Mailbox::new(io),
        }
    }

    /// Access the underlying mailbox port.
    pub fn mailbox(&mut self) -> &mut Mailbox<'a, I> {
        &mut self.mbox
    }

    /// Transmit a packet.
    ///
    /// Returns the number of argument words sent.  Nothing is written if
    /// the packet's `arg_len` is too large.
    pub fn transmit(&mut self, packet: &Packet) -> Result<usize> {
        let len = check_arg_len(packet.arg_len)?;

        self.mbox.write_word(packet.version)?;
        self.mbox.write_word(packet.header_word())?;
        for &word in packet.data[..len].iter() {
            self.mbox.write_word(word)?;
        }

        // Only now is the whole packet with the peer
        self.mbox.signal_done()?;

        debug!("Sent opcode {} with {len} words", packet.opcode);
        Ok(len)
    }

    /// Receive a packet into `packet`, which should be freshly zeroed.
    ///
    /// Returns the number of argument words received.  On
    /// [`crate::Error::InvalidLength`] the argument words are left untouched and
    /// `arg_len` is not updated.
    pub fn receive(&mut self, packet: &mut Packet) -> Result<usize> {
        packet.version = self.mbox.read_word_ungated()?;

        let header = self.mbox.read_word()?;
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
            *word = self.mbox.read_word()?;
        }

        self.drain()?;

        debug!("Received opcode {opcode} with {len} words");
        Ok(len)
    }

    /// Discard any words the peer sent beyond the declared packet, up to
    /// [`DRAIN_LIMIT`].
    fn drain(&mut self) -> Result<()> {
        let mut drained = 0;
        while self.mbox.rx_available()? {
            if drained == DRAIN_LIMIT {
                error!("Rx still available after draining {drained} extra words");
                return Err(Error::Timeout);
            }
            let extra = self.mbox.read_word_ungated()?;
            warn!("Extra Rx: {extra:#010X}");
            drained += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    use crate::packet::{ToCm7Op, ToRvOp, encode_header};
    use crate::port::{SimMailboxIo, Status};
    use crate::transport::tests::StuckRx;
    use crate::{MAX_PKT_LEN, MBOX_PROTOCOL_REV};

    fn patterned(opcode: u16, len: usize) -> Packet {
        let args: Vec<u32> = (0..len as u32)
            .map(|i| i.wrapping_mul(0x9E37_79B9) ^ 0xA5A5_0000)
            .collect();
        Packet::with_args(opcode, &args).unwrap()
    }

    #[test]
    fn round_trip_every_length() {
        crate::init_test_logging();
        for len in 0..=MAX_PKT_LEN {
            let sent = patterned(ToRvOp::RetKnock as u16, len);

            let mut cm7 = SimMailboxIo::new();
            assert_eq!(Transport::new(&mut cm7).transmit(&sent), Ok(len));
            assert_eq!(cm7.done_count(), 1);

            let mut peer = SimMailboxIo::new();
            cm7.deliver_to(&mut peer);
            let mut received = Packet::empty();
            assert_eq!(Transport::new(&mut peer).receive(&mut received), Ok(len));

            assert_eq!(received.version, sent.version);
            assert_eq!(received.opcode, sent.opcode);
            assert_eq!(received.arg_len, sent.arg_len);
            assert_eq!(received.args(), sent.args());
        }
    }

    #[test]
    fn wire_layout() {
        let sent = Packet::with_args(ToCm7Op::PersistentWrite as u16, &[0x6000_0000, 8]).unwrap();
        let mut io = SimMailboxIo::new();
        Transport::new(&mut io).transmit(&sent).unwrap();
        assert_eq!(io.sent(), &[MBOX_PROTOCOL_REV, 0x0002_0004, 0x6000_0000, 8]);
    }

    #[test]
    fn transmit_oversized_touches_nothing() {
        let mut packet = Packet::response(ToRvOp::RetKnock);
        packet.arg_len = MAX_PKT_LEN as u16 + 1;
        let mut io = SimMailboxIo::new();
        assert_eq!(Transport::new(&mut io).transmit(&packet), Err(Error::InvalidLength));
        assert_eq!(io.register_writes(), 0);
        assert_eq!(io.done_count(), 0);
    }

    #[test]
    fn transmit_stops_at_first_full() {
        let sent = patterned(ToRvOp::RetOffloadTransform as u16, 32);
        let mut io = SimMailboxIo::with_tx_depth(5);
        assert_eq!(Transport::new(&mut io).transmit(&sent), Err(Error::ChannelNotReady));
        // Partial packet left in place, no DONE
        assert_eq!(io.sent().len(), 5);
        assert_eq!(io.done_count(), 0);
        assert!(!Mailbox::new(&mut io).status().unwrap().contains(Status::TX_ERROR));
    }

    #[test]
    fn receive_oversized_length() {
        let mut io = SimMailboxIo::new();
        io.push_rx(&[MBOX_PROTOCOL_REV, encode_header(ToCm7Op::Knock as u16, 200)]);
        io.push_rx(&[0xDEAD_BEEF; 200]);

        let mut packet = Packet::empty();
        assert_eq!(Transport::new(&mut io).receive(&mut packet), Err(Error::InvalidLength));
        assert!(packet.data.iter().all(|&w| w == 0));
        assert_eq!(packet.arg_len, 0);
        // Declared words are not drained
        assert_eq!(io.rx_pending(), 200);
    }

    #[test]
    fn receive_short_packet() {
        let mut io = SimMailboxIo::new();
        io.push_rx(&[MBOX_PROTOCOL_REV, encode_header(ToCm7Op::Knock as u16, 4), 1, 2]);
        let mut packet = Packet::empty();
        assert_eq!(Transport::new(&mut io).receive(&mut packet), Err(Error::ChannelNotReady));
    }

    #[test]
    fn receive_missing_header() {
        let mut io = SimMailboxIo::new();
        io.push_rx(&[MBOX_PROTOCOL_REV]);
        let mut packet = Packet::empty();
        assert_eq!(Transport::new(&mut io).receive(&mut packet), Err(Error::ChannelNotReady));
    }

    #[test]
    fn receive_from_empty_mailbox_reads_version_anyway() {
        let mut io = SimMailboxIo::new();
        let mut packet = Packet::empty();
        let mut transport = Transport::new(&mut io);
        assert_eq!(transport.receive(&mut packet), Err(Error::ChannelNotReady));
        assert_eq!(transport.mailbox().errors(), Ok(Status::RX_ERROR));
    }

    #[test]
    fn receive_drains_extra_words() {
        crate::init_test_logging();
        let mut io = SimMailboxIo::new();
        io.push_rx(&[MBOX_PROTOCOL_REV, encode_header(ToCm7Op::Knock as u16, 2), 5, 6]);
        io.push_rx(&[7, 8, 9]);
        let mut packet = Packet::empty();
        assert_eq!(Transport::new(&mut io).receive(&mut packet), Ok(2));
        assert_eq!(packet.args(), &[5, 6]);
        assert_eq!(io.rx_pending(), 0);
    }

    #[test]
    fn receive_fails_when_rx_never_clears() {
        crate::init_test_logging();
        let mut io = StuckRx::new(&[MBOX_PROTOCOL_REV, encode_header(ToCm7Op::Knock as u16, 1), 7]);
        let mut packet = Packet::empty();
        assert_eq!(Transport::new(&mut io).receive(&mut packet), Err(Error::Timeout));
        // Version, header, one argument, then the drain limit
        assert_eq!(io.reads, 3 + DRAIN_LIMIT);
    }
}
