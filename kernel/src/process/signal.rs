//! Signal kinds, per-process signal state, and delivery bookkeeping.
//!
//! Signals are set by exception handlers, device collaborators, or the
//! periodic alarm accumulator, and delivered exactly once, at the next
//! kernel-to-user return boundary (`Kernel::deliver_pending_signal`).

use bitflags::bitflags;

use crate::process::UserAddr;

/// Signal kinds in fixed ascending delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Signal {
    DivideByZero = 0,
    SegmentationFault = 1,
    KeyboardInterrupt = 2,
    Alarm = 3,
    User = 4,
}

/// Number of signal kinds.
pub const SIGNAL_KINDS: usize = 5;

impl Signal {
    pub fn from_index(index: usize) -> Option<Signal> {
        match index {
            0 => Some(Signal::DivideByZero),
            1 => Some(Signal::SegmentationFault),
            2 => Some(Signal::KeyboardInterrupt),
            3 => Some(Signal::Alarm),
            4 => Some(Signal::User),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Fault-class kinds terminate the process when no handler is
    /// registered; the rest are silently discarded.
    pub fn fatal_by_default(self) -> bool {
        matches!(
            self,
            Signal::DivideByZero | Signal::SegmentationFault | Signal::KeyboardInterrupt
        )
    }

    fn bit(self) -> SignalSet {
        SignalSet::from_bits_truncate(1 << self.index())
    }
}

bitflags! {
    /// Pending-signal bitmask, one bit per kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SignalSet: u8 {
        const DIVIDE_BY_ZERO = 1 << 0;
        const SEGMENTATION_FAULT = 1 << 1;
        const KEYBOARD_INTERRUPT = 1 << 2;
        const ALARM = 1 << 3;
        const USER = 1 << 4;
    }
}

/// Per-process signal state: pending mask plus handler table.
#[derive(Debug, Clone, Default)]
pub struct SignalState {
    pending: SignalSet,
    handlers: [Option<UserAddr>; SIGNAL_KINDS],
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a kind pending. Idempotent until delivered.
    pub fn raise(&mut self, signal: Signal) {
        self.pending |= signal.bit();
    }

    /// Lowest pending kind, removed from the mask. Clearing happens here
    /// and nowhere else: exactly once per delivery.
    pub fn take_next_pending(&mut self) -> Option<Signal> {
        if self.pending.is_empty() {
            return None;
        }
        let signal = Signal::from_index(self.pending.bits().trailing_zeros() as usize)?;
        self.pending -= signal.bit();
        Some(signal)
    }

    pub fn pending(&self) -> SignalSet {
        self.pending
    }

    /// Register or clear (None) a handler for a kind.
    pub fn set_handler(&mut self, signal: Signal, handler: Option<UserAddr>) {
        self.handlers[signal.index()] = handler;
    }

    pub fn handler(&self, signal: Signal) -> Option<UserAddr> {
        self.handlers[signal.index()]
    }
}
