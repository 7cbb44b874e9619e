//! Firmware runtime.
//!
//! [`Firmware`] bundles everything the interrupt handlers need: the mailbox,
//! the interrupt controller and the dispatcher with its command handlers.
//! Start of day is:
//!
//! ```rust,ignore
//! let mut fw = unsafe { runtime::target(&FirmwareConfig::DEFAULT) };
//! let table = runtime::vector_table(&FirmwareConfig::DEFAULT)?;
//! fw.init(&table);
//! ```
//!
//! after which the application's exception stubs for the two mailbox
//! interrupts call [`Firmware::service`], and the main loop idles.
//! Off-target, [`VectorTable::service_pending`] runs the same handlers
//! against a [`crate::irq::SimNvic`].

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Result;
use crate::abort::on_abort;
use crate::arena::SharedArena;
use crate::config::FirmwareConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::handler::{CommandSet, Handlers};
use crate::irq::{InterruptContext, InterruptController, IrqSource, Nvic, VectorTable};
use crate::kernel::{Clifford, NaiveDct};
use crate::port::{MailboxIo, MmioMailboxIo};
use crate::storage::{MmioReram, ReramWriter};

/// Firmware context, shared by the interrupt handlers.
pub struct Firmware<I: MailboxIo, C: InterruptController, H: CommandSet> {
    mbox: I,
    controller: C,
    dispatcher: Dispatcher<H>,
    last_outcome: Option<DispatchOutcome>,
    last_abort: Option<Result<()>>,
    aborts: u32,
}

/// The firmware as built for the CM7.
pub type TargetFirmware<'a> =
    Firmware<MmioMailboxIo, Nvic, Handlers<'a, ReramWriter<MmioReram>, NaiveDct, Clifford>>;

impl<I: MailboxIo, C: InterruptController, H: CommandSet> Firmware<I, C, H> {
    pub fn new(mbox: I, controller: C, handlers: H) -> Self {
        Self {
            mbox,
            controller,
            dispatcher: Dispatcher::new(handlers),
            last_outcome: None,
            last_abort: None,
            aborts: 0,
        }
    }

    /// Install `table` into the interrupt controller.  Call once, before
    /// enabling interrupts globally.
    pub fn init(&mut self, table: &VectorTable<Self>) {
        table.install(&mut self.controller);
        info!("Firmware ready, {} vectors installed", table.len());
    }

    /// Run the handler for `source`.  For exception stubs, which already
    /// know which interrupt fired.
    pub fn service(&mut self, source: IrqSource) {
        match source {
            IrqSource::MboxAvailable => mbox_available(self),
            IrqSource::MboxAbort => mbox_abort(self),
        }
    }

    pub fn mailbox(&mut self) -> &mut I {
        &mut self.mbox
    }

    pub fn dispatcher(&mut self) -> &mut Dispatcher<H> {
        &mut self.dispatcher
    }

    /// Outcome of the most recent dispatch cycle.
    pub fn last_outcome(&self) -> Option<DispatchOutcome> {
        self.last_outcome
    }

    /// Result of the most recent abort acknowledgement.
    pub fn last_abort(&self) -> Option<Result<()>> {
        self.last_abort
    }

    /// Number of aborts serviced.
    pub fn aborts(&self) -> u32 {
        self.aborts
    }
}

impl<I: MailboxIo, C: InterruptController, H: CommandSet> InterruptContext for Firmware<I, C, H> {
    type Controller = C;

    fn controller(&mut self) -> &mut C {
        &mut self.controller
    }
}

/// Mailbox-available vector.
pub fn mbox_available<I, C, H>(fw: &mut Firmware<I, C, H>)
where
    I: MailboxIo,
    C: InterruptController,
    H: CommandSet,
{
    let outcome = fw
        .dispatcher
        .on_mailbox_available(&mut fw.mbox, &mut fw.controller);
    fw.last_outcome = Some(outcome);
}

/// Abort vector.
pub fn mbox_abort<I, C, H>(fw: &mut Firmware<I, C, H>)
where
    I: MailboxIo,
    C: InterruptController,
    H: CommandSet,
{
    fw.last_abort = Some(on_abort(&mut fw.mbox, &mut fw.controller));
    fw.aborts = fw.aborts.wrapping_add(1);
}

/// Build the firmware's vector table.  Both mailbox interrupts share the
/// configured priority.
pub fn vector_table<I, C, H>(config: &FirmwareConfig) -> Result<VectorTable<Firmware<I, C, H>>>
where
    I: MailboxIo,
    C: InterruptController,
    H: CommandSet,
{
    let mut table = VectorTable::new();
    table.register(
        IrqSource::MboxAvailable,
        config.mbox_irq_priority,
        mbox_available,
    )?;
    table.register(IrqSource::MboxAbort, config.mbox_irq_priority, mbox_abort)?;
    Ok(table)
}

/// Build the firmware for the CM7 from `config`.
///
/// # Safety
///
/// Must be called at most once, and nothing else may hold the core's NVIC.
/// `config` must describe the real mailbox registers, storage array and
/// shared arena of the part being run on, and nothing else may access the
/// shared arena through the CM7 for the life of the returned context.
pub unsafe fn target(config: &FirmwareConfig) -> TargetFirmware<'static> {
    let arena = unsafe { SharedArena::from_config(&config.arena) };
    let handlers = Handlers::new(
        ReramWriter::new(MmioReram::new()),
        config.storage,
        NaiveDct,
        Clifford::default(),
        arena,
    );
    let nvic = Nvic::new(unsafe { cortex_m::Peripherals::steal() }.NVIC);
    Firmware::new(MmioMailboxIo::new(config.mbox_base), nvic, handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    use crate::Error;
    use crate::irq::SimNvic;
    use crate::packet::{Packet, ToCm7Op, ToRvOp};
    use crate::port::{Mailbox, Register, SimMailboxIo, Status};
    use crate::storage::{BLOCK_SIZE, SimReram};
    use crate::transport::Transport;

    type SimHandlers<'a> = Handlers<'a, ReramWriter<SimReram>, NaiveDct, Clifford>;
    type SimFirmware<'a> = Firmware<SimMailboxIo, SimNvic, SimHandlers<'a>>;

    fn firmware(arena: &mut [u8]) -> SimFirmware<'_> {
        crate::init_test_logging();
        let config = FirmwareConfig::DEFAULT;
        let handlers = Handlers::new(
            ReramWriter::new(SimReram::new(config.storage.start, BLOCK_SIZE)),
            config.storage,
            NaiveDct,
            Clifford::new(10),
            SharedArena::new(config.arena.base, arena),
        );
        Firmware::new(SimMailboxIo::new(), SimNvic::new(), handlers)
    }

    #[test]
    fn table_has_both_vectors_at_configured_priority() {
        let table = vector_table::<SimMailboxIo, SimNvic, SimHandlers>(&FirmwareConfig::DEFAULT)
            .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|v| v.priority == 1));
        assert_eq!(table.iter().next().unwrap().source, IrqSource::MboxAvailable);
    }

    #[test]
    fn init_enables_both() {
        let mut arena = vec![0u8; 16];
        let mut fw = firmware(&mut arena);
        let table = vector_table(&FirmwareConfig::DEFAULT).unwrap();
        fw.init(&table);
        let nvic = fw.controller();
        assert!(nvic.is_enabled(IrqSource::MboxAvailable));
        assert!(nvic.is_enabled(IrqSource::MboxAbort));
        assert_eq!(nvic.priority(IrqSource::MboxAbort), 1);
    }

    #[test]
    fn knock_then_abort() {
        let mut arena = vec![0u8; 16];
        let mut fw = firmware(&mut arena);
        let table = vector_table(&FirmwareConfig::DEFAULT).unwrap();
        fw.init(&table);

        let mut peer = SimMailboxIo::new();
        let request = Packet::with_args(ToCm7Op::Knock as u16, &[0xFFFF_FFFF, 1]).unwrap();
        Transport::new(&mut peer).transmit(&request).unwrap();
        peer.deliver_to(fw.mailbox());
        fw.controller().trigger(IrqSource::MboxAvailable);
        fw.mailbox().raise_abort();
        fw.controller().trigger(IrqSource::MboxAbort);

        assert_eq!(table.service_pending(&mut fw, 4), Ok(2));
        assert_eq!(
            fw.last_outcome(),
            Some(DispatchOutcome::Responded {
                opcode: ToRvOp::RetKnock as u16,
                len: 1
            })
        );
        assert_eq!(fw.aborts(), 1);
        let status = Mailbox::new(fw.mailbox()).status().unwrap();
        assert!(status.contains(Status::ABORT_ACKNOWLEDGED));

        fw.mailbox().deliver_to(&mut peer);
        let mut response = Packet::empty();
        Transport::new(&mut peer).receive(&mut response).unwrap();
        assert_eq!(response.args(), &[0xFFFF_FFFE]);
    }

    #[test]
    fn service_by_source() {
        let mut arena = vec![0u8; 16];
        let mut fw = firmware(&mut arena);
        fw.mailbox().raise_abort();
        fw.service(IrqSource::MboxAbort);
        assert_eq!(fw.aborts(), 1);
        assert_eq!(fw.last_abort(), Some(Ok(())));
        assert_eq!(fw.controller().cleared(IrqSource::MboxAbort), 1);
        assert_eq!(fw.last_outcome(), None);
    }

    /// Mailbox whose abort register can't be written.
    struct AbortStuck(SimMailboxIo);

    impl MailboxIo for AbortStuck {
        fn read_reg(&mut self, reg: Register) -> Result<u32> {
            self.0.read_reg(reg)
        }

        fn write_reg(&mut self, reg: Register, value: u32) -> Result<()> {
            match reg {
                Register::Abort => Err(Error::Io),
                _ => self.0.write_reg(reg, value),
            }
        }
    }

    #[test]
    fn failed_abort_recorded() {
        crate::init_test_logging();
        let mut arena = vec![0u8; 16];
        let config = FirmwareConfig::DEFAULT;
        let handlers = Handlers::new(
            ReramWriter::new(SimReram::new(config.storage.start, BLOCK_SIZE)),
            config.storage,
            NaiveDct,
            Clifford::new(10),
            SharedArena::new(config.arena.base, &mut arena),
        );
        let mut fw = Firmware::new(AbortStuck(SimMailboxIo::new()), SimNvic::new(), handlers);
        fw.mailbox().0.raise_abort();
        fw.controller().trigger(IrqSource::MboxAbort);

        fw.service(IrqSource::MboxAbort);
        assert_eq!(fw.last_abort(), Some(Err(Error::Io)));
        assert_eq!(fw.aborts(), 1);
        assert!(!fw.controller().is_pending(IrqSource::MboxAbort));
    }
}
