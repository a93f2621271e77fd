//! The process core aggregate.
//!
//! [`Kernel`] owns every piece of process-management state: the pid
//! table, the PCBs, the terminal slots, scheduler state, and the alarm
//! accumulators. There are no globals; the embedder owns exactly one
//! `Kernel`, wrapped in an [`IrqCell`](crate::sync::IrqCell) so every
//! entry point runs inside an interrupt-masked critical section.
//!
//! Control transfers out of the core are expressed as [`Transition`]
//! values the arch shim applies, instead of inline privilege switches.

use core::array;

use log::warn;

use crate::config::MAX_PROCESSES;
use crate::memory;
use crate::platform::Platform;
use crate::process::signal::Signal;
use crate::process::table::{Pid, ProcessTable};
use crate::process::{Pcb, UserAddr};
use crate::scheduler::context::{SavedContext, TrapContext, TRAP_CONTEXT_WORDS};
use crate::scheduler::Scheduler;
use crate::terminal::Terminals;
use crate::time::AlarmClock;

/// Exit status reported when a process dies to an unhandled fault
/// signal. One above the largest voluntary status byte.
pub const SIGNAL_EXIT_STATUS: i32 = 256;

/// A one-way control transfer for the arch shim to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Drop to user privilege at `entry` on a fresh user stack. Produced
    /// by spawn and by a root shell re-executing itself.
    EnterUser {
        pid: Pid,
        entry: UserAddr,
        user_stack: UserAddr,
    },
    /// Resume a suspended kernel context, making its suspended call
    /// return `status`. Produced by halt; this is the only way a spawn
    /// call site ever resumes.
    ResumeKernel {
        context: SavedContext,
        status: i32,
    },
}

/// The process-management core.
///
/// # Panics
///
/// Methods panic only on broken core invariants (a current pid without a
/// PCB, a live parent without a PCB). Such a state has no meaningful
/// process to blame and is a true kernel panic, not a recoverable error.
pub struct Kernel<P: Platform> {
    pub(crate) platform: P,
    pub(crate) table: ProcessTable,
    pub(crate) pcbs: [Option<Pcb>; MAX_PROCESSES],
    pub(crate) terminals: Terminals,
    pub(crate) scheduler: Scheduler,
    pub(crate) alarm: AlarmClock,
}

impl<P: Platform> Kernel<P> {
    pub fn new(platform: P) -> Self {
        Kernel {
            platform,
            table: ProcessTable::new(),
            pcbs: array::from_fn(|_| None),
            terminals: Terminals::new(),
            scheduler: Scheduler::new(),
            alarm: AlarmClock::new(),
        }
    }

    /// Pid of the process whose kernel stack is active.
    pub fn current_pid(&self) -> Pid {
        self.scheduler.current()
    }

    pub fn pcb(&self, pid: Pid) -> Option<&Pcb> {
        self.pcbs[pid.index()].as_ref()
    }

    pub(crate) fn current_pcb(&self) -> &Pcb {
        self.pcbs[self.current_pid().index()]
            .as_ref()
            .expect("current pid has no PCB")
    }

    pub(crate) fn current_pcb_mut(&mut self) -> &mut Pcb {
        let pid = self.current_pid();
        self.pcbs[pid.index()]
            .as_mut()
            .expect("current pid has no PCB")
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn terminals(&self) -> &Terminals {
        &self.terminals
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Bring a different terminal onto the live display. The current
    /// process's video window is remapped to match its new
    /// foreground/background standing.
    pub fn set_foreground_terminal(&mut self, index: usize) {
        self.terminals.set_foreground(index);
        let pid = self.current_pid();
        let terminal = self.current_pcb().terminal;
        memory::activate(&mut self.platform, pid, terminal, index);
    }

    /// Mark a signal pending on a process. Delivery happens at that
    /// process's next return to user mode.
    pub fn raise_signal(&mut self, pid: Pid, signal: Signal) {
        if let Some(pcb) = self.pcbs[pid.index()].as_mut() {
            pcb.signals.raise(signal);
        }
    }

    /// Convert a hardware fault on the current process into a pending
    /// signal. Vector 0 is the divide-error; every other fault class is
    /// folded into the segmentation fault kind.
    pub fn raise_exception(&mut self, vector: u32, error_code: u32) {
        warn!(
            "exception: vector {} error {:#x} on pid {}",
            vector,
            error_code,
            self.current_pid()
        );
        let signal = if vector == 0 {
            Signal::DivideByZero
        } else {
            Signal::SegmentationFault
        };
        self.current_pcb_mut().signals.raise(signal);
    }

    /// One firing of the real-time-clock line: advance the alarm
    /// accumulators at the currently programmed frequency.
    pub fn on_rtc_tick(&mut self) {
        let Kernel {
            platform,
            pcbs,
            alarm,
            ..
        } = self;
        alarm.on_tick(platform.frequency(), |pid| {
            if let Some(pcb) = pcbs[pid.index()].as_mut() {
                pcb.signals.raise(Signal::Alarm);
            }
        });
    }

    /// Deliver at most one pending signal at the kernel-to-user return
    /// boundary.
    ///
    /// Must be called exactly once per trap/interrupt return path, after
    /// all other work. A trap that is not about to drop back to user
    /// privilege delivers nothing. Unregistered fault-class kinds
    /// terminate the process: the returned transition replaces the
    /// normal trap return. Other unregistered kinds are discarded.
    pub fn deliver_pending_signal(&mut self, trap: &mut TrapContext) -> Option<Transition> {
        if !trap.from_user() {
            return None;
        }
        loop {
            let signal = self.current_pcb_mut().signals.take_next_pending()?;
            let handler = self.current_pcb().signals.handler(signal);
            if let Some(handler) = handler {
                return self.push_signal_frame(trap, signal, handler);
            }
            if signal.fatal_by_default() {
                return Some(self.halt(SIGNAL_EXIT_STATUS));
            }
            // No handler, not fatal: discard and keep scanning.
        }
    }

    /// Synthesize a user-mode activation of `handler`: the interrupted
    /// context snapshot, the signal kind, and the trampoline return
    /// address are pushed below the user stack pointer, then the trap
    /// frame is redirected into the handler.
    fn push_signal_frame(
        &mut self,
        trap: &mut TrapContext,
        signal: Signal,
        handler: UserAddr,
    ) -> Option<Transition> {
        let words = trap.to_words();
        let mut bytes = [0u8; TRAP_CONTEXT_WORDS * 4];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        // The whole frame must fit below the user stack pointer.
        let Some(ret_addr) = trap
            .user_stack_ptr
            .checked_sub((TRAP_CONTEXT_WORDS as u32) * 4 + 8)
        else {
            warn!("no room for signal frame on pid {}", self.current_pid());
            return Some(self.halt(SIGNAL_EXIT_STATUS));
        };
        let kind_addr = ret_addr + 4;
        let frame_addr = kind_addr + 4;
        let trampoline = self.platform.sigreturn_trampoline();

        let pushed = self
            .platform
            .write_user(frame_addr, &bytes)
            .and_then(|_| {
                self.platform
                    .write_user(kind_addr, &(signal.index() as u32).to_le_bytes())
            })
            .and_then(|_| self.platform.write_user(ret_addr, &trampoline.to_le_bytes()));
        if pushed.is_err() {
            // User stack is gone; same outcome as an unhandled fault.
            warn!("signal frame push faulted on pid {}", self.current_pid());
            return Some(self.halt(SIGNAL_EXIT_STATUS));
        }

        trap.user_stack_ptr = ret_addr;
        trap.instruction_ptr = handler;
        None
    }
}
