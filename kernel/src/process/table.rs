//! Process table: pid allocation and liveness.

use crate::config::MAX_PROCESSES;
use crate::process::ProcessError;

/// Process identifier, unique among live processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u8);

impl Pid {
    /// Pid of terminal 0's default shell. Reserved: never handed out by
    /// the allocator and never released.
    pub const ROOT: Pid = Pid(0);

    /// Build a pid from a table index. The index must be below
    /// [`MAX_PROCESSES`].
    pub const fn from_index(index: usize) -> Self {
        Pid(index as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for Pid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity liveness bitmap over pids.
///
/// A pid stays marked in-use for the whole interval between a successful
/// spawn and the matching halt; it is never reused inside that interval.
#[derive(Debug)]
pub struct ProcessTable {
    in_use: [bool; MAX_PROCESSES],
}

impl ProcessTable {
    /// Fresh table with only the reserved root slot occupied.
    pub const fn new() -> Self {
        let mut in_use = [false; MAX_PROCESSES];
        in_use[Pid::ROOT.index()] = true;
        ProcessTable { in_use }
    }

    /// First-fit scan above the reserved slot; lowest free pid wins.
    pub fn allocate(&mut self) -> Result<Pid, ProcessError> {
        for index in 1..MAX_PROCESSES {
            if !self.in_use[index] {
                self.in_use[index] = true;
                return Ok(Pid::from_index(index));
            }
        }
        Err(ProcessError::NoFreeProcessSlot)
    }

    /// Mark `pid` free. The caller must already have torn down every
    /// resource the pid owned. The reserved root slot is never released.
    pub fn release(&mut self, pid: Pid) {
        debug_assert_ne!(pid, Pid::ROOT);
        if pid != Pid::ROOT {
            self.in_use[pid.index()] = false;
        }
    }

    pub fn is_live(&self, pid: Pid) -> bool {
        self.in_use[pid.index()]
    }

    pub fn live_count(&self) -> usize {
        self.in_use.iter().filter(|&&u| u).count()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_slot_is_reserved() {
        let mut table = ProcessTable::new();
        assert!(table.is_live(Pid::ROOT));
        let pid = table.allocate().unwrap();
        assert_ne!(pid, Pid::ROOT);
    }

    #[test]
    fn test_lowest_free_pid_wins() {
        let mut table = ProcessTable::new();
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        let c = table.allocate().unwrap();
        assert_eq!((a.index(), b.index(), c.index()), (1, 2, 3));

        table.release(b);
        assert_eq!(table.allocate().unwrap(), b);
        assert!(table.is_live(a) && table.is_live(c));
    }

    #[test]
    fn test_exhaustion() {
        let mut table = ProcessTable::new();
        for _ in 1..MAX_PROCESSES {
            table.allocate().unwrap();
        }
        assert!(matches!(
            table.allocate(),
            Err(ProcessError::NoFreeProcessSlot)
        ));
    }

    #[test]
    fn test_release_reopens_exact_slot() {
        let mut table = ProcessTable::new();
        let pids: alloc::vec::Vec<_> = (1..MAX_PROCESSES)
            .map(|_| table.allocate().unwrap())
            .collect();
        table.release(pids[4]);
        assert_eq!(table.allocate().unwrap(), pids[4]);
    }
}
