//! Process creation and teardown.
//!
//! Spawn and halt are the only two ways a process comes into or leaves
//! existence. Both are one-way at the hardware level; here they return a
//! [`Transition`] describing the privilege switch for the arch shim to
//! apply after the critical section ends.

use log::info;

use crate::config::{kernel_stack_base, EXEC_CHUNK_SIZE, USER_STACK_TOP};
use crate::kernel::{Kernel, Transition};
use crate::loader;
use crate::memory;
use crate::platform::{NodeKind, Platform};
use crate::memory::BlockAllocator;
use crate::process::signal::SignalState;
use crate::process::table::Pid;
use crate::process::{FdKind, Pcb, ProcessError, UserAddr};
use crate::scheduler::context::SavedContext;

use alloc::string::ToString;

/// Where a new process lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTarget {
    /// Child of the current process, on the current process's terminal.
    InheritCurrent,
    /// Parentless root shell for the given terminal slot.
    Terminal(usize),
}

/// Split a command line into the executable name and the trimmed
/// argument remainder. An empty remainder is no remainder.
pub(crate) fn split_command(line: &str) -> (&str, Option<&str>) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => {
            let rest = rest.trim();
            (name, (!rest.is_empty()).then_some(rest))
        }
        None => (line, None),
    }
}

impl<P: Platform> Kernel<P> {
    /// Create the very first process: terminal 0's root shell, on the
    /// reserved pid. Called once, before interrupts are opened.
    pub fn bootstrap(&mut self, command_line: &str) -> Result<Transition, ProcessError> {
        let (inode, entry, first_chunk, chunk_len) = self.load_header(command_line)?;
        let foreground = self.terminals.foreground();
        memory::activate(&mut self.platform, Pid::ROOT, 0, foreground);
        loader::load_image(&mut self.platform, inode, &first_chunk[..chunk_len])?;

        let (name, args) = split_command(command_line);
        self.pcbs[Pid::ROOT.index()] = Some(Pcb::new(
            Pid::ROOT,
            None,
            0,
            name.to_string(),
            args.map(ToString::to_string),
            entry,
        ));
        self.terminals.slot_mut(0).active_pid = Some(Pid::ROOT);
        self.platform.set_kernel_stack(kernel_stack_base(Pid::ROOT));
        self.alarm.reset(Pid::ROOT);
        self.scheduler.set_current(Pid::ROOT);
        info!("bootstrap: pid {} running {:?}", Pid::ROOT, name);
        Ok(Transition::EnterUser {
            pid: Pid::ROOT,
            entry,
            user_stack: USER_STACK_TOP,
        })
    }

    /// Create a process from a command line.
    ///
    /// `caller` is the spawning kernel context, captured at the syscall
    /// boundary; it is stored in the calling process's PCB so halt can
    /// resume it later. On any error the pid allocation is rolled back
    /// and the caller's state is untouched.
    pub fn spawn(
        &mut self,
        command_line: &str,
        target: SpawnTarget,
        caller: SavedContext,
    ) -> Result<Transition, ProcessError> {
        let pid = self.table.allocate()?;
        match self.spawn_inner(pid, command_line, target, caller) {
            Ok(transition) => Ok(transition),
            Err(err) => {
                self.table.release(pid);
                Err(err)
            }
        }
    }

    fn spawn_inner(
        &mut self,
        pid: Pid,
        command_line: &str,
        target: SpawnTarget,
        caller: SavedContext,
    ) -> Result<Transition, ProcessError> {
        let (inode, entry, first_chunk, chunk_len) = self.load_header(command_line)?;
        let (terminal, parent) = match target {
            SpawnTarget::InheritCurrent => (self.current_pcb().terminal, Some(self.current_pid())),
            SpawnTarget::Terminal(index) => (index, None),
        };

        // Past this point the caller's user frame is unmapped, so a
        // load failure must restore it before reporting.
        let foreground = self.terminals.foreground();
        memory::activate(&mut self.platform, pid, terminal, foreground);
        if let Err(err) = loader::load_image(&mut self.platform, inode, &first_chunk[..chunk_len]) {
            let cur = self.current_pcb();
            let (cur_pid, cur_term) = (cur.pid, cur.terminal);
            memory::activate(&mut self.platform, cur_pid, cur_term, foreground);
            return Err(err);
        }

        let (name, args) = split_command(command_line);
        self.current_pcb_mut().saved = caller;
        self.pcbs[pid.index()] = Some(Pcb::new(
            pid,
            parent,
            terminal,
            name.to_string(),
            args.map(ToString::to_string),
            entry,
        ));
        self.terminals.slot_mut(terminal).active_pid = Some(pid);
        self.platform.set_kernel_stack(kernel_stack_base(pid));
        self.alarm.reset(pid);
        self.scheduler.set_current(pid);
        info!("spawn: pid {} running {:?} on terminal {}", pid, name, terminal);
        Ok(Transition::EnterUser {
            pid,
            entry,
            user_stack: USER_STACK_TOP,
        })
    }

    /// Resolve the executable, read its first chunk, and validate the
    /// header. Touches nothing but the filesystem, so failures here
    /// leave the caller fully intact.
    fn load_header(
        &mut self,
        command_line: &str,
    ) -> Result<(u32, UserAddr, [u8; EXEC_CHUNK_SIZE], usize), ProcessError> {
        let (name, _) = split_command(command_line);
        let node = self.platform.lookup(name).ok_or(ProcessError::NotFound)?;
        if node.kind != NodeKind::Regular {
            return Err(ProcessError::NotFound);
        }
        let mut chunk = [0u8; EXEC_CHUNK_SIZE];
        let n = self.platform.read_file(node.inode, 0, &mut chunk);
        let entry = loader::parse_header(&chunk[..n])?;
        Ok((node.inode, entry, chunk, n))
    }

    /// End the current process with `status`.
    ///
    /// A parentless root shell never leaves the table: its stored image
    /// entry point is re-entered on a fresh user stack instead, so every
    /// terminal always has a shell. Any other process is torn down and
    /// its parent's suspended spawn call resumes with `status`.
    pub fn halt(&mut self, status: i32) -> Transition {
        let pid = self.current_pid();
        let Some(parent) = self.current_pcb().parent else {
            // Root shells restart in place: same pid, same image, same
            // spawn-time arguments, fresh descriptor/signal/heap state,
            // fresh user stack.
            let mut closed = [None; crate::config::MAX_OPEN_FILES];
            let entry = {
                let pcb = self.current_pcb_mut();
                for fd in 2..pcb.files.len() {
                    closed[fd] = pcb.files[fd].take();
                }
                pcb.signals = SignalState::new();
                pcb.heap = BlockAllocator::new();
                pcb.entry_point
            };
            let terminal = self.current_pcb().terminal;
            self.terminals.slot_mut(terminal).video_granted = false;
            for file in closed.iter().flatten() {
                if file.kind == FdKind::Rtc {
                    self.platform.close(file.inode);
                }
            }
            info!("halt: root shell pid {} restarting (status {})", pid, status);
            return Transition::EnterUser {
                pid,
                entry,
                user_stack: USER_STACK_TOP,
            };
        };

        let pcb = self.pcbs[pid.index()].take().expect("current pid has no PCB");
        // Run the close capability of every dynamic descriptor.
        for file in pcb.files.iter().skip(2).flatten() {
            if file.kind == FdKind::Rtc {
                self.platform.close(file.inode);
            }
        }
        self.table.release(pid);

        let parent_pcb = self.pcbs[parent.index()]
            .as_ref()
            .expect("live parent has no PCB");
        let parent_saved = parent_pcb.saved;
        let parent_terminal = parent_pcb.terminal;
        let foreground = self.terminals.foreground();
        memory::activate(&mut self.platform, parent, parent_terminal, foreground);
        self.platform.set_kernel_stack(kernel_stack_base(parent));
        let slot = self.terminals.slot_mut(pcb.terminal);
        slot.active_pid = Some(parent);
        slot.video_granted = false;
        self.scheduler.set_current(parent);
        info!("halt: pid {} -> parent {} (status {})", pid, parent, status);
        Transition::ResumeKernel {
            context: parent_saved,
            status,
        }
    }
}
