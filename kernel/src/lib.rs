//! Trion process core.
//!
//! The process-management heart of a single-CPU multitasking kernel:
//! process lifecycle, round-robin scheduling across virtual terminals,
//! per-process address-space switching, signals, per-process heaps, and
//! the system-call surface. Hardware and drivers sit behind the
//! collaborator traits in [`platform`], which is what lets the whole
//! core run hosted under `cargo test`.
//!
//! The embedding arch shim owns exactly one [`Kernel`] inside an
//! [`sync::IrqCell`] and applies the [`Transition`] values the core
//! hands back.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod kernel;
pub mod loader;
pub mod memory;
pub mod platform;
pub mod process;
pub mod scheduler;
pub mod sync;
pub mod syscall;
pub mod terminal;
pub mod time;

pub use kernel::{Kernel, Transition, SIGNAL_EXIT_STATUS};
pub use process::{Pcb, Pid, ProcessError, Signal, SpawnTarget};
pub use scheduler::context::{SavedContext, TrapContext};
pub use scheduler::TickOutcome;
pub use syscall::{SyscallNumber, SyscallOutcome};
