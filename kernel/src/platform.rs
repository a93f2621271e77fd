//! Collaborator interfaces to hardware and external drivers.
//!
//! The process core never touches hardware directly. Paging, the
//! privilege-transition stack register, the filesystem driver, the
//! terminal line discipline, and the virtualized real-time clock are all
//! reached through the traits below. The arch shim implements them on real
//! hardware; tests implement them with a scripted mock.

use crate::process::UserAddr;

/// Attempted user-memory access outside the mapped user region.
///
/// On hardware such a reference faults and is converted into a
/// segmentation-fault signal; kernel-side copies surface it as this error
/// so syscalls can fail with -1 instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessViolation;

/// Where the user-visible video window should resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoTarget {
    /// The live display frame (process's terminal is foregrounded).
    Live,
    /// The private off-screen buffer of the given terminal slot.
    BackBuffer(usize),
}

/// Page-table remap operations for the two reusable user-space slots.
///
/// Construction of the paging structures is the arch shim's job; only the
/// per-process remap is driven from here. Callers must hold interrupts
/// masked across `map_*` + `flush_tlb`.
pub trait PagingPort {
    /// Retarget the single user-page slot at the given physical frame.
    fn map_user_slot(&mut self, frame: usize);

    /// Retarget the user video-memory window.
    fn map_video_slot(&mut self, target: VideoTarget);

    /// Flush the translation cache by reloading the page-table base.
    fn flush_tlb(&mut self);
}

/// CPU-level operations owned by the arch shim.
pub trait CpuPort {
    /// Point the privilege-transition stack register at a kernel stack.
    fn set_kernel_stack(&mut self, stack_base: u32);

    /// Acknowledge the scheduler timer interrupt. Must be called before
    /// any blocking work in the tick path or subsequent ticks are lost.
    fn ack_timer(&mut self);

    /// Re-enable interrupts, halt until the next one fires, and mask
    /// again before returning. This is the only blocking primitive; all
    /// waits are spin-waits around it.
    fn idle_until_interrupt(&mut self);

    /// Address of the fixed user-mode code sequence a signal handler
    /// returns into (it issues the context-restore syscall).
    fn sigreturn_trampoline(&self) -> UserAddr;
}

/// Byte access to the currently mapped user frame.
pub trait UserMemory {
    /// Copy `bytes` into user memory at `addr`.
    fn write_user(&mut self, addr: UserAddr, bytes: &[u8]) -> Result<(), AccessViolation>;

    /// Copy user memory at `addr` into `buf`.
    fn read_user(&self, addr: UserAddr, buf: &mut [u8]) -> Result<(), AccessViolation>;
}

/// Kind of a filesystem node, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Regular,
    Directory,
    Rtc,
}

/// Name-lookup result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub inode: u32,
}

/// Read-only filesystem driver.
pub trait FileSystem {
    /// Resolve a name to a node.
    fn lookup(&mut self, name: &str) -> Option<NodeInfo>;

    /// Read up to `buf.len()` bytes of `inode` starting at `pos`.
    /// Returns the number of bytes produced; 0 means end of file. Data
    /// always arrives in bounded chunks, never as one call.
    fn read_file(&mut self, inode: u32, pos: u32, buf: &mut [u8]) -> usize;

    /// Copy the name of the `index`-th directory entry into `buf`.
    /// Returns the name length, or 0 past the last entry.
    fn read_dir_entry(&mut self, index: u32, buf: &mut [u8]) -> usize;
}

/// Terminal line discipline and renderer.
///
/// Line buffering, echo, and VT100 rendering live behind this trait; the
/// process core only routes descriptor 0/1 traffic to the terminal slot
/// recorded at spawn time.
pub trait TerminalPort {
    /// Blocking canonical-mode read of one input line for `terminal`.
    /// Spin-waits via [`CpuPort::idle_until_interrupt`] internally.
    fn read_line(&mut self, terminal: usize, buf: &mut [u8]) -> usize;

    /// Write bytes to `terminal`'s display (live or back buffer).
    fn write(&mut self, terminal: usize, bytes: &[u8]) -> usize;
}

/// Virtualized real-time clock.
pub trait RtcPort {
    /// Open a virtual RTC stream; returns an opaque token.
    fn open(&mut self) -> u32;

    /// Block until the stream's next virtual tick.
    fn wait_tick(&mut self, token: u32);

    /// Set the stream's virtual frequency. Returns false for unsupported
    /// rates.
    fn set_rate(&mut self, token: u32, hz: u32) -> bool;

    /// Release a stream token.
    fn close(&mut self, token: u32);

    /// Currently programmed hardware frequency in Hz, used to keep the
    /// alarm period frequency-independent.
    fn frequency(&self) -> u32;
}

/// Everything the process core needs from the embedding environment.
pub trait Platform:
    PagingPort + CpuPort + UserMemory + FileSystem + TerminalPort + RtcPort
{
}

impl<T> Platform for T where
    T: PagingPort + CpuPort + UserMemory + FileSystem + TerminalPort + RtcPort
{
}
