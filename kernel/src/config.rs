//! Kernel configuration constants.
//!
//! This module contains compile-time configuration for the process core.
//! Values here affect memory layout, limits, and timing.

use crate::process::table::Pid;

/// Maximum number of concurrent processes (fixed ceiling).
pub const MAX_PROCESSES: usize = 10;

/// Number of virtual terminal slots.
pub const TERMINAL_COUNT: usize = 3;

/// Open-file-descriptor table size per process.
/// Slots 0 and 1 are always the owning terminal's input and output.
pub const MAX_OPEN_FILES: usize = 8;

/// Command executed when an idle terminal slot is first scheduled.
pub const DEFAULT_SHELL: &str = "shell";

/// Terminal input line capacity; also bounds command lines and other
/// NUL-terminated strings passed in from user space.
pub const TERMINAL_LINE_MAX: usize = 128;

/// Magic signature at the start of every supported executable.
pub const EXEC_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Byte offset of the little-endian entry-point address in the header.
pub const ENTRY_POINT_OFFSET: usize = 24;

/// Chunk size for header reads and image streaming.
pub const EXEC_CHUNK_SIZE: usize = 256;

/// Base of the user-visible 4 MB page every process is mapped into.
pub const USER_PAGE_BASE: u32 = 0x0800_0000;

/// Exclusive end of the user page; also the initial user stack pointer.
pub const USER_PAGE_END: u32 = 0x0840_0000;

/// Virtual address user images are loaded at. Entry points below this
/// address are rejected.
pub const IMAGE_LOAD_BASE: u32 = 0x0804_8000;

/// Virtual address of the per-process video-memory window granted by
/// `vidmap`. One 4 KB page directly above the user page.
pub const USER_VIDEO_BASE: u32 = USER_PAGE_END;

/// Page-table frame index backing pid 0. Process `p` owns frame
/// `PROCESS_FRAME_BASE + p`.
pub const PROCESS_FRAME_BASE: usize = 2;

/// Kernel stacks grow down from here, one slab per pid.
pub const KERNEL_STACKS_TOP: u32 = 0x0080_0000;

/// Kernel stack slab size (8 KB).
pub const KERNEL_STACK_SIZE: u32 = 0x2000;

/// Scheduler timer period in milliseconds.
pub const TICK_PERIOD_MS: u32 = 30;

/// Highest frequency the real-time-clock collaborator virtualizes, in Hz.
pub const MAX_RTC_FREQ: u32 = 8192;

/// Wall-clock period of the alarm signal in seconds, independent of the
/// configured clock frequency.
pub const ALARM_PERIOD_SECS: u32 = 10;

/// Base user virtual address of the per-process heap.
pub const USER_HEAP_BASE: u32 = USER_PAGE_BASE + 0x2000;

/// Per-process heap size in bytes (256 KB).
pub const USER_HEAP_SIZE: usize = 256 * 1024;

/// Heap allocation granule in bytes.
pub const HEAP_BLOCK_SIZE: usize = 32;

/// Capacity of the per-process heap record table.
pub const HEAP_MAX_RECORDS: usize = 2048;

/// Initial stack pointer loaded when entering a fresh user program.
pub const USER_STACK_TOP: u32 = USER_PAGE_END;

/// Address loaded into the privilege-transition kernel-stack register
/// while `pid` runs: the high end of its private kernel stack slab.
pub const fn kernel_stack_base(pid: Pid) -> u32 {
    KERNEL_STACKS_TOP - KERNEL_STACK_SIZE * pid.as_u8() as u32
}
