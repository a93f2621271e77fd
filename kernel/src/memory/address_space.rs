//! Per-process address-space switching.
//!
//! One reusable page-table slot maps whichever process is current into
//! the fixed user page; a second slot maps the user-visible video window.
//! `activate` retargets both and reloads the page-table base. The
//! collaborator owns the actual paging structures.

use crate::config::PROCESS_FRAME_BASE;
use crate::platform::{PagingPort, VideoTarget};
use crate::process::table::Pid;

/// Physical frame index dedicated to `pid`'s private user page.
pub const fn frame_for(pid: Pid) -> usize {
    PROCESS_FRAME_BASE + pid.index()
}

/// Make `pid`'s frame the one user-mode references resolve into.
///
/// The video window follows the foreground rule: a process whose terminal
/// is foregrounded sees the live display frame, every other process sees
/// its terminal's off-screen buffer.
///
/// Must run with interrupts masked (or be immediately followed by
/// resuming on `pid`'s own context): a tick firing mid-update would
/// schedule against a half-switched mapping. After `activate` returns
/// there is no further bounds checking; user references outside the
/// mapped region fault and become a segmentation-fault signal on the
/// now-current process.
pub fn activate<P: PagingPort>(port: &mut P, pid: Pid, terminal: usize, foreground: usize) {
    port.map_user_slot(frame_for(pid));
    let video = if terminal == foreground {
        VideoTarget::Live
    } else {
        VideoTarget::BackBuffer(terminal)
    };
    port.map_video_slot(video);
    port.flush_tlb();
}
