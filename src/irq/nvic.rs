//! Cortex-M7 NVIC.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;

use crate::irq::{InterruptController, IrqSource};

/// Priority bits implemented by this part, held in the top of each byte.
const PRIO_BITS: u8 = 4;

// SAFETY: the discriminants are this part's external interrupt numbers.
unsafe impl InterruptNumber for IrqSource {
    fn number(self) -> u16 {
        self as u16
    }
}

fn to_hw_priority(priority: u8) -> u8 {
    priority << (8 - PRIO_BITS)
}

fn from_hw_priority(raw: u8) -> u8 {
    raw >> (8 - PRIO_BITS)
}

/// The core's NVIC.
pub struct Nvic {
    nvic: NVIC,
}

impl Nvic {
    pub fn new(nvic: NVIC) -> Self {
        Self { nvic }
    }

    /// Current priority of `source`.
    pub fn priority(&self, source: IrqSource) -> u8 {
        from_hw_priority(NVIC::get_priority(source))
    }
}

impl InterruptController for Nvic {
    fn enable(&mut self, source: IrqSource) {
        unsafe { NVIC::unmask(source) };
        cortex_m::asm::dsb();
    }

    fn is_enabled(&mut self, source: IrqSource) -> bool {
        NVIC::is_enabled(source)
    }

    fn set_priority(&mut self, source: IrqSource, priority: u8) {
        unsafe { self.nvic.set_priority(source, to_hw_priority(priority)) };
        cortex_m::asm::dsb();
    }

    fn trigger(&mut self, source: IrqSource) {
        NVIC::pend(source);
    }

    fn is_pending(&mut self, source: IrqSource) -> bool {
        NVIC::is_pending(source)
    }

    fn clear_pending(&mut self, source: IrqSource) {
        NVIC::unpend(source);
        cortex_m::asm::dsb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_in_top_bits() {
        assert_eq!(to_hw_priority(1), 0x10);
        assert_eq!(to_hw_priority(15), 0xF0);
        assert_eq!(from_hw_priority(0x10), 1);
        assert_eq!(from_hw_priority(to_hw_priority(7)), 7);
    }

    #[test]
    fn interrupt_numbers() {
        assert_eq!(InterruptNumber::number(IrqSource::MboxAvailable), 18);
        assert_eq!(InterruptNumber::number(IrqSource::MboxAbort), 19);
    }
}
