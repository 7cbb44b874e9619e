//! Mailbox packet and opcodes.
//!
//! A [`Packet`] is a value type, created zeroed for each exchange and
//! dropped at the end of it.  Only the first `arg_len` words of
//! [`Packet::data`] carry meaning, anything beyond is unspecified.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::{Error, MAX_PKT_LEN, MBOX_PROTOCOL_REV};

/// Opcodes sent by the companion core to the CM7.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToCm7Op {
    Invalid = 0,
    Knock = 1,
    OffloadTransform = 2,
    SharedMemoryCompute = 3,
    PersistentWrite = 4,
}

impl TryFrom<u16> for ToCm7Op {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ToCm7Op::Invalid),
            1 => Ok(ToCm7Op::Knock),
            2 => Ok(ToCm7Op::OffloadTransform),
            3 => Ok(ToCm7Op::SharedMemoryCompute),
            4 => Ok(ToCm7Op::PersistentWrite),
            _ => Err(Error::InvalidOpcode),
        }
    }
}

/// Opcodes sent by the CM7 back to the companion core.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToRvOp {
    Invalid = 0,
    RetKnock = 128,
    RetOffloadTransform = 129,
    RetSharedMemoryCompute = 130,
    RetPersistentWrite = 131,
}

impl TryFrom<u16> for ToRvOp {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ToRvOp::Invalid),
            128 => Ok(ToRvOp::RetKnock),
            129 => Ok(ToRvOp::RetOffloadTransform),
            130 => Ok(ToRvOp::RetSharedMemoryCompute),
            131 => Ok(ToRvOp::RetPersistentWrite),
            _ => Err(Error::InvalidOpcode),
        }
    }
}

/// One mailbox packet.
///
/// The opcode is kept as the raw wire value, so that a packet carrying an
/// unknown opcode can still be received and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Protocol revision
    pub version: u32,
    /// Raw opcode, see [`ToCm7Op`] and [`ToRvOp`]
    pub opcode: u16,
    /// Number of valid words in `data`
    pub arg_len: u16,
    /// Argument words.  Only `data[..arg_len]` is meaningful.
    pub data: [u32; MAX_PKT_LEN],
}

impl Packet {
    /// Create a zeroed packet with the current protocol revision and the
    /// given opcode.
    pub const fn new(opcode: u16) -> Self {
        Self {
            version: MBOX_PROTOCOL_REV,
            opcode,
            arg_len: 0,
            data: [0; MAX_PKT_LEN],
        }
    }

    /// Create a zeroed request packet.
    pub const fn request(op: ToCm7Op) -> Self {
        Self::new(op as u16)
    }

    /// Create a zeroed response packet.
    pub const fn response(op: ToRvOp) -> Self {
        Self::new(op as u16)
    }

    /// Create a zeroed packet with every field, including version, cleared.
    /// Used as the receive buffer.
    pub const fn empty() -> Self {
        Self {
            version: 0,
            opcode: ToCm7Op::Invalid as u16,
            arg_len: 0,
            data: [0; MAX_PKT_LEN],
        }
    }

    /// Create a packet carrying `args`.
    ///
    /// Returns [`Error::InvalidLength`] if `args` doesn't fit.
    pub fn with_args(opcode: u16, args: &[u32]) -> crate::Result<Self> {
        if args.len() > MAX_PKT_LEN {
            return Err(Error::InvalidLength);
        }
        let mut packet = Self::new(opcode);
        packet.data[..args.len()].copy_from_slice(args);
        packet.arg_len = args.len() as u16;
        Ok(packet)
    }

    /// The meaningful argument words.
    ///
    /// Clamped to the buffer, so a packet built by hand with an oversized
    /// `arg_len` never indexes out of bounds.
    pub fn args(&self) -> &[u32] {
        let len = (self.arg_len as usize).min(MAX_PKT_LEN);
        &self.data[..len]
    }

    /// Encode the header word: opcode in the low half, argument length in
    /// the high half.
    pub fn header_word(&self) -> u32 {
        encode_header(self.opcode, self.arg_len)
    }

    /// The opcode as a request, if it is one.
    pub fn request_op(&self) -> crate::Result<ToCm7Op> {
        ToCm7Op::try_from(self.opcode)
    }

    /// The opcode as a response, if it is one.
    pub fn response_op(&self) -> crate::Result<ToRvOp> {
        ToRvOp::try_from(self.opcode)
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Combine opcode and argument length into the second word of a packet.
pub const fn encode_header(opcode: u16, arg_len: u16) -> u32 {
    (opcode as u32) | ((arg_len as u32) << 16)
}

/// Split the second word of a packet into opcode and argument length.
pub const fn decode_header(word: u32) -> (u16, u16) {
    ((word & 0xFFFF) as u16, ((word >> 16) & 0xFFFF) as u16)
}
