//! Async I/O traits for reaching the CM7's address space remotely.
//!
//! A host which is not the companion core itself - for example a debug
//! probe attached over SWD - can still play the peer's part of the mailbox
//! protocol by reading and writing the mailbox registers through these
//! traits.  See [`crate::port::ReaderWriterMailboxIo`].
//!
//! # Address Space
//!
//! Addresses are absolute, as they appear in the CM7's memory map.  The
//! mailbox register block sits at `0x4001_3000`, and the shared SRAM the
//! image generator writes into starts at `0x6100_0000`.
//!
//! Implementations translate these addresses into whatever their transport
//! requires (SWD AP transactions, file offsets for a memory dump, etc.).

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

/// Reader trait.
pub trait Reader {
    /// The error type returned by read operations.
    ///
    /// This allows implementations to use their own error types
    /// (e.g., `std::io::Error` for file I/O, custom errors for SWD).
    type Error: core::fmt::Debug;

    /// Read bytes from the target at the specified absolute address.
    ///
    /// # Arguments
    ///
    /// * `addr` - The absolute address to read from (e.g., `0x40013008`)
    /// * `buf` - Buffer to fill with the read data
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not reachable or the underlying
    /// transport fails.
    ///
    /// Mailbox register reads are always exactly 4 bytes and word aligned.
    /// Reading [`crate::port::Register::Rdata`] pops a word, so
    /// implementations must not retry or prefetch around it.
    fn read(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>> + Send;
}

/// Writer trait.
pub trait Writer {
    /// The error type returned by write operations.
    type Error: core::fmt::Debug;

    /// Write bytes to the target at the specified absolute address.
    ///
    /// # Arguments
    ///
    /// * `addr` - The absolute address to write to (e.g., `0x40013000`)
    /// * `data` - Data to write
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not reachable or the underlying
    /// transport fails.
    ///
    /// The write must have completed at the target before the returned
    /// future resolves, as the protocol orders [`crate::port::Register::Done`]
    /// after the data words.
    fn write(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>> + Send;
}
