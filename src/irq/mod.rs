//! Interrupt wiring.
//!
//! The firmware services two interrupt sources, both raised by the mailbox.
//! Vectors are described once, at start of day, in a [`VectorTable`] kept
//! in priority order, and installed into an [`InterruptController`].
//!
//! [`VectorTable::service_next`] and [`VectorTable::service_pending`] model
//! exception entry for off-target use: the highest priority source which is
//! both enabled and pending is acknowledged and its handler run to
//! completion.  As on the hardware, it is up to the handler to clear the
//! pending indicator.  A handler which never does is reported as
//! [`Error::Timeout`] rather than serviced forever.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod nvic;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use nvic::Nvic;
#[cfg(any(test, feature = "sim"))]
pub use sim::SimNvic;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{Error, Result};

/// Interrupt sources, by their external interrupt number.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqSource {
    /// The peer has finished writing a packet to us
    MboxAvailable = 18,
    /// The peer has raised an abort
    MboxAbort = 19,
}

impl IrqSource {
    pub const fn number(self) -> u16 {
        self as u16
    }
}

/// Interrupt controller primitives used by the firmware.
pub trait InterruptController {
    /// Enable delivery of `source`.
    fn enable(&mut self, source: IrqSource);

    /// Whether `source` is enabled.
    fn is_enabled(&mut self, source: IrqSource) -> bool;

    /// Set the priority of `source`.  Lower is more urgent.
    fn set_priority(&mut self, source: IrqSource, priority: u8);

    /// Mark `source` pending, as if raised by its peripheral.
    fn trigger(&mut self, source: IrqSource);

    /// Whether `source` is pending.
    fn is_pending(&mut self, source: IrqSource) -> bool;

    /// Clear the pending indicator for `source`.
    fn clear_pending(&mut self, source: IrqSource);

    /// Called on entry to the handler for `source`.  Hardware does this
    /// itself.
    fn acknowledge(&mut self, _source: IrqSource) {}
}

/// Gives a vector handler access to the interrupt controller it was
/// dispatched from.
pub trait InterruptContext {
    type Controller: InterruptController;

    fn controller(&mut self) -> &mut Self::Controller;
}

/// Interrupt service routine operating on the firmware context `T`.
pub type Handler<T> = fn(&mut T);

/// One entry in a [`VectorTable`].
pub struct Vector<T> {
    pub source: IrqSource,
    pub priority: u8,
    pub handler: Handler<T>,
}

// Manual impls, derive would require T: Clone
impl<T> Clone for Vector<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Vector<T> {}

impl<T> core::fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Vector")
            .field("source", &self.source)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Most vectors a table can hold.
pub const MAX_VECTORS: usize = 8;

/// Priority ordered set of interrupt vectors.
///
/// Equal priorities are ordered by interrupt number, lowest first, matching
/// the NVIC's own tie-break.
pub struct VectorTable<T> {
    vectors: [Option<Vector<T>>; MAX_VECTORS],
    len: usize,
}

impl<T> VectorTable<T> {
    pub const fn new() -> Self {
        Self {
            vectors: [None; MAX_VECTORS],
            len: 0,
        }
    }

    /// Add a vector.
    ///
    /// Returns [`Error::DuplicateVector`] if `source` already has one, or
    /// [`Error::VectorTableFull`].
    pub fn register(&mut self, source: IrqSource, priority: u8, handler: Handler<T>) -> Result<()> {
        if self.iter().any(|v| v.source == source) {
            return Err(Error::DuplicateVector);
        }
        if self.len == MAX_VECTORS {
            return Err(Error::VectorTableFull);
        }

        let key = (priority, source.number());
        let pos = self
            .iter()
            .position(|v| (v.priority, v.source.number()) > key)
            .unwrap_or(self.len);
        self.vectors[pos..=self.len].rotate_right(1);
        self.vectors[pos] = Some(Vector {
            source,
            priority,
            handler,
        });
        self.len += 1;
        Ok(())
    }

    /// Vectors, most urgent first.
    pub fn iter(&self) -> impl Iterator<Item = &Vector<T>> {
        self.vectors[..self.len].iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the priority of, and enable, every vector's source.
    pub fn install<C: InterruptController>(&self, controller: &mut C) {
        for vector in self.iter() {
            controller.set_priority(vector.source, vector.priority);
            controller.enable(vector.source);
            info!(
                "IRQ {} installed at priority {}",
                vector.source.number(),
                vector.priority
            );
        }
    }
}

impl<T: InterruptContext> VectorTable<T> {
    /// Run the handler for the most urgent enabled and pending source.
    ///
    /// Returns the source serviced, if any.
    pub fn service_next(&self, ctx: &mut T) -> Option<IrqSource> {
        let vector = *self.iter().find(|v| {
            let controller = ctx.controller();
            controller.is_enabled(v.source) && controller.is_pending(v.source)
        })?;

        trace!("Servicing IRQ {}", vector.source.number());
        ctx.controller().acknowledge(vector.source);
        (vector.handler)(ctx);
        Some(vector.source)
    }

    /// Service interrupts until none are pending.
    ///
    /// Returns the number of handlers run, or [`Error::Timeout`] if sources
    /// were still pending after `limit` of them.
    pub fn service_pending(&self, ctx: &mut T, limit: usize) -> Result<usize> {
        for serviced in 0..limit {
            if self.service_next(ctx).is_none() {
                return Ok(serviced);
            }
        }
        match self.service_next(ctx) {
            None => Ok(limit),
            Some(source) => {
                error!("IRQ {} still pending after {limit} handlers", source.number());
                Err(Error::Timeout)
            }
        }
    }
}

impl<T> Default for VectorTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
