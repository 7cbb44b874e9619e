//! Abort channel.
//!
//! The peer raises an abort on its own interrupt line.  The CM7 acknowledges
//! it and clears the pending indicator, nothing more: a handler which is
//! already running is neither pre-empted nor cancelled, and the dispatcher's
//! state is not consulted.  To the peer an abort is a notification that the
//! CM7 is alive, not a guarantee that work stopped.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Result;
use crate::irq::{InterruptController, IrqSource};
use crate::port::{Mailbox, MailboxIo};

/// Service the abort interrupt.
///
/// The pending indicator is cleared even if the acknowledgement could not be
/// written.
pub fn on_abort<I, C>(io: &mut I, controller: &mut C) -> Result<()>
where
    I: MailboxIo,
    C: InterruptController,
{
    let result = Mailbox::new(io).acknowledge_abort();
    match result {
        Ok(()) => info!("Abort acknowledged"),
        Err(e) => error!("Failed to acknowledge abort: {e:?}"),
    }

    controller.clear_pending(IrqSource::MboxAbort);
    result
}
