//! Process management: PCBs, pid table, lifecycle, and signals.

pub mod lifecycle;
pub mod signal;
pub mod table;

pub use lifecycle::SpawnTarget;
pub use signal::{Signal, SignalSet, SignalState, SIGNAL_KINDS};
pub use table::{Pid, ProcessTable};

use alloc::string::String;

use crate::config::MAX_OPEN_FILES;
use crate::memory::BlockAllocator;
use crate::scheduler::context::SavedContext;

/// A user-space virtual address.
pub type UserAddr = u32;

/// Process-management failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Every process slot is in use.
    NoFreeProcessSlot,
    /// Executable name did not resolve.
    NotFound,
    /// Missing or malformed executable magic.
    BadExecutableFormat,
    /// Entry point below the image load base, or image escapes the
    /// mapped region.
    AddressOutOfRange,
}

/// What an open descriptor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdKind {
    /// Terminal input of the owning terminal (descriptor 0).
    Stdin,
    /// Terminal output of the owning terminal (descriptor 1).
    Stdout,
    /// Regular file; `inode` identifies it to the filesystem driver.
    File,
    /// Directory; `pos` indexes entries.
    Directory,
    /// Virtualized RTC stream; `inode` holds the collaborator token.
    Rtc,
}

/// One open descriptor: dispatch kind plus cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub kind: FdKind,
    pub inode: u32,
    pub pos: u32,
}

impl OpenFile {
    pub fn new(kind: FdKind, inode: u32) -> Self {
        OpenFile {
            kind,
            inode,
            pos: 0,
        }
    }
}

/// Process control block: the kernel-side record of one process.
///
/// Addressed deterministically from its pid in the kernel's PCB table.
/// Exactly one PCB is current at any instant.
#[derive(Debug)]
pub struct Pcb {
    pub pid: Pid,
    /// Spawning process, or `None` for a terminal's root shell. The
    /// parent is referenced, never owned: its lifetime is independent.
    pub parent: Option<Pid>,
    /// Terminal slot this process was spawned onto. Descriptor 0/1 I/O
    /// routes here for the process's whole life, regardless of which
    /// terminal is later foregrounded.
    pub terminal: usize,
    /// Fixed descriptor table. Slots 0/1 are the owning terminal's
    /// input/output and are installed at construction.
    pub files: [Option<OpenFile>; MAX_OPEN_FILES],
    /// Executable name this process was spawned from (root shells
    /// re-execute it on halt).
    pub command: String,
    /// Raw argument remainder captured at spawn, if any.
    pub args: Option<String>,
    /// Validated entry point of the loaded image.
    pub entry_point: UserAddr,
    /// Suspended stack/frame pointers. Valid only while this process is
    /// not the one executing.
    pub saved: SavedContext,
    /// Pending-signal mask and handler table.
    pub signals: SignalState,
    /// This process's private heap. One allocator instance per process;
    /// nothing is shared between heaps.
    pub heap: BlockAllocator,
}

impl Pcb {
    pub fn new(
        pid: Pid,
        parent: Option<Pid>,
        terminal: usize,
        command: String,
        args: Option<String>,
        entry_point: UserAddr,
    ) -> Self {
        let mut files = [None; MAX_OPEN_FILES];
        files[0] = Some(OpenFile::new(FdKind::Stdin, 0));
        files[1] = Some(OpenFile::new(FdKind::Stdout, 0));
        Pcb {
            pid,
            parent,
            terminal,
            files,
            command,
            args,
            entry_point,
            saved: SavedContext::default(),
            signals: SignalState::new(),
            heap: BlockAllocator::new(),
        }
    }

    pub fn file(&self, fd: usize) -> Option<&OpenFile> {
        self.files.get(fd)?.as_ref()
    }

    pub fn file_mut(&mut self, fd: usize) -> Option<&mut OpenFile> {
        self.files.get_mut(fd)?.as_mut()
    }

    /// Lowest free dynamic descriptor slot (0/1 are reserved).
    pub fn free_slot(&self) -> Option<usize> {
        (2..MAX_OPEN_FILES).find(|&fd| self.files[fd].is_none())
    }

    /// Remove and return a dynamic descriptor. Descriptors 0/1 stay
    /// bound for the process's whole life.
    pub fn take_file(&mut self, fd: usize) -> Option<OpenFile> {
        if fd < 2 || fd >= MAX_OPEN_FILES {
            return None;
        }
        self.files[fd].take()
    }
}
