//! Software interrupt controller, used to drive the vector table off-target.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::irq::{InterruptController, IrqSource};

const SOURCES: usize = 2;

#[derive(Debug, Default, Clone, Copy)]
struct Line {
    enabled: bool,
    pending: bool,
    priority: u8,
    acknowledged: usize,
    cleared: usize,
}

/// Simulated controller for the mailbox interrupt sources.
///
/// Unlike the hardware, entering a handler does not clear its pending
/// indicator, so a handler which forgets to is caught by the service loop.
#[derive(Debug, Default)]
pub struct SimNvic {
    lines: [Line; SOURCES],
}

impl SimNvic {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, source: IrqSource) -> &Line {
        &self.lines[index(source)]
    }

    fn line_mut(&mut self, source: IrqSource) -> &mut Line {
        &mut self.lines[index(source)]
    }

    pub fn priority(&self, source: IrqSource) -> u8 {
        self.line(source).priority
    }

    /// Number of handler entries for `source`.
    pub fn acknowledged(&self, source: IrqSource) -> usize {
        self.line(source).acknowledged
    }

    /// Number of times `source`'s pending indicator was cleared.
    pub fn cleared(&self, source: IrqSource) -> usize {
        self.line(source).cleared
    }
}

fn index(source: IrqSource) -> usize {
    match source {
        IrqSource::MboxAvailable => 0,
        IrqSource::MboxAbort => 1,
    }
}

impl InterruptController for SimNvic {
    fn enable(&mut self, source: IrqSource) {
        self.line_mut(source).enabled = true;
    }

    fn is_enabled(&mut self, source: IrqSource) -> bool {
        self.line(source).enabled
    }

    fn set_priority(&mut self, source: IrqSource, priority: u8) {
        self.line_mut(source).priority = priority;
    }

    fn trigger(&mut self, source: IrqSource) {
        self.line_mut(source).pending = true;
    }

    fn is_pending(&mut self, source: IrqSource) -> bool {
        self.line(source).pending
    }

    fn clear_pending(&mut self, source: IrqSource) {
        let line = self.line_mut(source);
        line.pending = false;
        line.cleared += 1;
    }

    fn acknowledge(&mut self, source: IrqSource) {
        self.line_mut(source).acknowledged += 1;
    }
}
