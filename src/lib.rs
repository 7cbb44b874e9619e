//! Mailbox transport and command dispatch for a Cortex-M7 co-processor core.
//!
//! This crate is the firmware core for a CM7 which sits alongside a companion
//! compute core, sharing physical memory and a small block of mailbox
//! registers with it.  The companion core sends the CM7 a command packet
//! through the mailbox, the CM7 performs the work and replies with a response
//! packet through the same registers.
//!
//! `no_std`.  Requires `alloc` for the `async` and `sim` features, which are
//! typically only used off-target.
//!
//! ## Architecture
//!
//! Leaves first:
//!
//! - **Mailbox port** ([`port`]) - register level access: read or write one
//!   word, observe the flow-control and abort status bits, signal packet
//!   completion.  The hardware is reached through the [`port::MailboxIo`]
//!   trait, so that everything above it can be driven by a software double.
//! - **Packet transport** ([`transport`]) - serializes and deserializes one
//!   bounded [`packet::Packet`] over the mailbox, enforcing the length limit
//!   and flow control.
//! - **Command dispatcher** ([`dispatch`]) - receives a packet when the
//!   mailbox-available interrupt fires, selects the handler by opcode and
//!   transmits the handler's response.
//! - **Abort channel** ([`abort`]) - independent interrupt which acknowledges
//!   cancel requests from the peer.  It does not stop a handler which is
//!   already running.
//! - **Command handlers** ([`handler`]) - the fixed set of opcodes: knock,
//!   8x8 transform offload, shared memory image generation and persistent
//!   storage writes.
//!
//! Interrupt wiring is built once at start of day as a priority ordered
//! [`irq::VectorTable`], see [`runtime`].
//!
//! ## Wire format
//!
//! Everything on the mailbox is a 32-bit little endian word:
//!
//! | Word | Contents |
//! |------|----------|
//! | 0 | protocol version |
//! | 1 | opcode (low 16 bits), argument length in words (high 16 bits) |
//! | 2.. | argument words, at most [`MAX_PKT_LEN`] |
//!
//! The transmitter writes [`port::Register::Done`] once every word has been
//! written, so the receiver knows the packet is complete.
//!
//! ## Peer side
//!
//! [`client`] contains the companion core's side of the protocol - send a
//! request, wait for and read the response, and raise an abort.  The async
//! version drives the mailbox registers remotely, using [`io::Reader`] and
//! [`io::Writer`] implementations, for example over a debug probe.
//!
//! ## Features
//!
//! Default features:
//! - `async` - Enable async mailbox access and the async client (requires
//!   `alloc`).
//!
//! Optional features:
//! - `sim` - Software mailbox, interrupt controller and storage doubles,
//!   used to exercise the transport and dispatcher off-target (requires
//!   `alloc`).
//!
//! Compile with `--no-default-features` for the CM7 target.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![no_std]

#[cfg(any(test, feature = "async", feature = "sim"))]
extern crate alloc;

pub mod abort;
pub mod arena;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod io;
pub mod irq;
pub mod kernel;
pub mod packet;
pub mod port;
pub mod runtime;
pub mod storage;
pub mod transport;

/// Maximum number of argument words in a packet.  Limited by the memory
/// available on the CM7 side.
pub const MAX_PKT_LEN: usize = 128;

/// Protocol revision carried in the first word of every packet.
pub const MBOX_PROTOCOL_REV: u32 = 0;

/// Mailbox errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A flow-control bit was clear when a word transfer was attempted
    ChannelNotReady,
    /// Declared argument length exceeds [`MAX_PKT_LEN`]
    InvalidLength,
    /// Request arguments failed validation
    ValidationFailure,
    /// Address range lies outside the shared arena
    OutsideArena,
    /// Bounded poll exhausted
    Timeout,
    /// Peer did not complete an abort in time
    AbortFailed,
    /// I/O error accessing the mailbox registers
    Io,
    /// Persistent storage rejected a write
    Storage,
    /// No room left in the vector table
    VectorTableFull,
    /// Interrupt source already has a vector
    DuplicateVector,
    /// Unrecognised opcode
    InvalidOpcode,
}

/// Type to represent the result of a mailbox operation
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
