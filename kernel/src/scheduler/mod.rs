//! Round-robin scheduling over the terminal slots.
//!
//! The timer collaborator fires every [`TICK_PERIOD_MS`] milliseconds;
//! each tick hands the CPU to the next terminal's active process. A
//! terminal with no process yet gets its default shell spawned lazily on
//! its first turn, so all terminals come alive without the embedder
//! spawning anything beyond the bootstrap shell.

pub mod context;

use log::warn;

use crate::config::{kernel_stack_base, DEFAULT_SHELL, TERMINAL_COUNT};
use crate::kernel::{Kernel, Transition};
use crate::memory;
use crate::platform::Platform;
use crate::process::table::Pid;
use crate::process::SpawnTarget;
use context::{context_switch, SavedContext};

/// Scheduler state: the terminal rotor plus the executing pid.
///
/// `current` is the single source of truth for "whose kernel stack is
/// active"; nothing else in the core tracks it.
#[derive(Debug)]
pub struct Scheduler {
    rotor: usize,
    current: Pid,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            rotor: 0,
            current: Pid::ROOT,
        }
    }

    pub fn current(&self) -> Pid {
        self.current
    }

    pub(crate) fn set_current(&mut self, pid: Pid) {
        self.current = pid;
    }

    /// Advance the rotor one terminal slot and return the new slot.
    pub(crate) fn advance(&mut self) -> usize {
        self.rotor = (self.rotor + 1) % TERMINAL_COUNT;
        self.rotor
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// What the arch shim does after a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Same process keeps the CPU; plain interrupt return.
    Stay,
    /// A shell was just spawned for an idle terminal; enter it.
    Launch(Transition),
    /// Resume a previously suspended kernel context.
    Switch(SavedContext),
}

impl<P: Platform> Kernel<P> {
    /// Timer tick entry point.
    ///
    /// `interrupted` is the kernel context captured at the interrupt
    /// boundary; when the tick switches away it is stored in the
    /// outgoing PCB so a later tick (or halt) can resume it. The timer
    /// is acknowledged first: the switched-to context must keep
    /// receiving ticks.
    pub fn on_tick(&mut self, interrupted: SavedContext) -> TickOutcome {
        self.platform.ack_timer();

        let slot = self.scheduler.advance();
        let Some(next) = self.terminals.slot(slot).active_pid else {
            // First turn for an idle terminal: bring up its shell.
            let caller = interrupted;
            return match self.spawn(DEFAULT_SHELL, SpawnTarget::Terminal(slot), caller) {
                Ok(transition) => TickOutcome::Launch(transition),
                Err(err) => {
                    warn!("terminal {} shell spawn failed: {:?}", slot, err);
                    TickOutcome::Stay
                }
            };
        };

        let prev = self.scheduler.current();
        if next == prev {
            return TickOutcome::Stay;
        }

        let foreground = self.terminals.foreground();
        memory::activate(&mut self.platform, next, slot, foreground);
        self.platform.set_kernel_stack(kernel_stack_base(next));
        self.scheduler.set_current(next);

        let resume_from = self.pcbs[next.index()]
            .as_ref()
            .expect("scheduled pid has no PCB")
            .saved;
        let save_slot = &mut self.pcbs[prev.index()]
            .as_mut()
            .expect("outgoing pid has no PCB")
            .saved;
        TickOutcome::Switch(context_switch(save_slot, interrupted, &resume_from))
    }
}
