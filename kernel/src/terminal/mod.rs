//! Virtual terminal slots.
//!
//! A fixed number of virtual consoles. Each slot owns at most one active
//! pid; the scheduler treats an empty slot as "needs its default shell
//! spawned". Line buffering, echo, and rendering live in the terminal
//! collaborator ([`TerminalPort`](crate::platform::TerminalPort)); only
//! the scheduling-relevant state is kept here.

use bitflags::bitflags;

use crate::config::TERMINAL_COUNT;
use crate::process::table::Pid;

bitflags! {
    /// Display-mode flags for one terminal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TermFlags: u8 {
        /// Input characters are echoed back.
        const ECHO = 1 << 0;
        /// Canonical (line-buffered) input mode.
        const CANONICAL = 1 << 1;
    }
}

impl Default for TermFlags {
    fn default() -> Self {
        TermFlags::ECHO | TermFlags::CANONICAL
    }
}

/// One virtual console.
#[derive(Debug, Default)]
pub struct TerminalSlot {
    /// Process currently bound to this slot, if any.
    pub active_pid: Option<Pid>,
    /// Whether the bound process has been granted the user video
    /// window via `vidmap`. Cleared when the process ends.
    pub video_granted: bool,
    /// Display-mode flags.
    pub flags: TermFlags,
}

/// All terminal slots plus the foreground selection.
#[derive(Debug)]
pub struct Terminals {
    slots: [TerminalSlot; TERMINAL_COUNT],
    foreground: usize,
}

impl Terminals {
    pub fn new() -> Self {
        Terminals {
            slots: Default::default(),
            foreground: 0,
        }
    }

    pub fn slot(&self, index: usize) -> &TerminalSlot {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut TerminalSlot {
        &mut self.slots[index]
    }

    /// Index of the terminal currently shown on the live display.
    pub fn foreground(&self) -> usize {
        self.foreground
    }

    pub fn set_foreground(&mut self, index: usize) {
        debug_assert!(index < TERMINAL_COUNT);
        self.foreground = index;
    }
}

impl Default for Terminals {
    fn default() -> Self {
        Self::new()
    }
}
