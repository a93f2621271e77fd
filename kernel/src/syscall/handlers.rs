//! Individual system-call implementations.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::config::{
    EXEC_CHUNK_SIZE, TERMINAL_LINE_MAX, USER_HEAP_BASE, USER_HEAP_SIZE, USER_PAGE_BASE,
    USER_PAGE_END, USER_VIDEO_BASE,
};
use crate::kernel::{Kernel, Transition};
use crate::platform::{NodeKind, Platform};
use crate::process::signal::Signal;
use crate::process::{FdKind, OpenFile, Pcb, SpawnTarget, UserAddr};
use crate::scheduler::context::{SavedContext, TrapContext, TRAP_CONTEXT_WORDS};
use crate::syscall::SyscallError;

/// Directory entry names fit in this many bytes.
const DIR_ENTRY_MAX: usize = 64;

impl<P: Platform> Kernel<P> {
    /// Split borrow: the hardware collaborators and the current PCB,
    /// usable simultaneously.
    fn ctx(&mut self) -> (&mut P, &mut Pcb) {
        let pid = self.scheduler.current();
        (
            &mut self.platform,
            self.pcbs[pid.index()]
                .as_mut()
                .expect("current pid has no PCB"),
        )
    }

    /// Copy a NUL-terminated string out of user memory, bounded by the
    /// terminal line capacity.
    fn read_user_cstr(&self, addr: UserAddr) -> Result<String, SyscallError> {
        if addr == 0 {
            return Err(SyscallError::BadAddress);
        }
        let mut bytes = Vec::new();
        for i in 0..TERMINAL_LINE_MAX as u32 {
            let mut byte = [0u8; 1];
            self.platform.read_user(addr + i, &mut byte)?;
            if byte[0] == 0 {
                return core::str::from_utf8(&bytes)
                    .map(ToString::to_string)
                    .map_err(|_| SyscallError::BadArgument);
            }
            bytes.push(byte[0]);
        }
        // Unterminated within the bound.
        Err(SyscallError::BadArgument)
    }

    pub(super) fn sys_execute(
        &mut self,
        command_addr: u32,
        caller: SavedContext,
    ) -> Result<Transition, SyscallError> {
        let command = self.read_user_cstr(command_addr)?;
        Ok(self.spawn(&command, SpawnTarget::InheritCurrent, caller)?)
    }

    pub(super) fn sys_read(&mut self, fd: u32, buf: u32, len: u32) -> Result<isize, SyscallError> {
        if buf == 0 {
            return Err(SyscallError::BadAddress);
        }
        let (platform, pcb) = self.ctx();
        let terminal = pcb.terminal;
        let file = *pcb
            .file(fd as usize)
            .ok_or(SyscallError::BadDescriptor)?;
        match file.kind {
            FdKind::Stdin => {
                let mut line = [0u8; TERMINAL_LINE_MAX];
                let want = (len as usize).min(TERMINAL_LINE_MAX);
                let n = platform.read_line(terminal, &mut line[..want]);
                platform.write_user(buf, &line[..n])?;
                Ok(n as isize)
            }
            FdKind::Stdout => Err(SyscallError::BadDescriptor),
            FdKind::File => {
                let mut copied: usize = 0;
                let mut chunk = [0u8; EXEC_CHUNK_SIZE];
                while copied < len as usize {
                    let want = (len as usize - copied).min(EXEC_CHUNK_SIZE);
                    let n = platform.read_file(file.inode, file.pos + copied as u32, &mut chunk[..want]);
                    if n == 0 {
                        break;
                    }
                    platform.write_user(buf + copied as u32, &chunk[..n])?;
                    copied += n;
                }
                pcb.file_mut(fd as usize)
                    .ok_or(SyscallError::BadDescriptor)?
                    .pos += copied as u32;
                Ok(copied as isize)
            }
            FdKind::Directory => {
                let mut name = [0u8; DIR_ENTRY_MAX];
                let n = platform.read_dir_entry(file.pos, &mut name);
                if n == 0 {
                    return Ok(0);
                }
                let copied = n.min(len as usize);
                platform.write_user(buf, &name[..copied])?;
                pcb.file_mut(fd as usize)
                    .ok_or(SyscallError::BadDescriptor)?
                    .pos += 1;
                Ok(copied as isize)
            }
            FdKind::Rtc => {
                // Blocks until the stream's next virtual tick.
                platform.wait_tick(file.inode);
                Ok(0)
            }
        }
    }

    pub(super) fn sys_write(&mut self, fd: u32, buf: u32, len: u32) -> Result<isize, SyscallError> {
        if buf == 0 {
            return Err(SyscallError::BadAddress);
        }
        let (platform, pcb) = self.ctx();
        let terminal = pcb.terminal;
        let file = *pcb
            .file(fd as usize)
            .ok_or(SyscallError::BadDescriptor)?;
        match file.kind {
            FdKind::Stdout => {
                let mut written: usize = 0;
                let mut chunk = [0u8; TERMINAL_LINE_MAX];
                while written < len as usize {
                    let want = (len as usize - written).min(TERMINAL_LINE_MAX);
                    platform.read_user(buf + written as u32, &mut chunk[..want])?;
                    let n = platform.write(terminal, &chunk[..want]);
                    written += n;
                    if n < want {
                        break;
                    }
                }
                Ok(written as isize)
            }
            FdKind::Rtc => {
                // The payload is the requested virtual frequency in Hz.
                if len != 4 {
                    return Err(SyscallError::BadArgument);
                }
                let mut raw = [0u8; 4];
                platform.read_user(buf, &mut raw)?;
                let hz = u32::from_le_bytes(raw);
                if platform.set_rate(file.inode, hz) {
                    Ok(0)
                } else {
                    Err(SyscallError::BadArgument)
                }
            }
            // The filesystem is read-only; stdin has no output side.
            FdKind::Stdin | FdKind::File | FdKind::Directory => {
                Err(SyscallError::BadDescriptor)
            }
        }
    }

    pub(super) fn sys_open(&mut self, name_addr: u32) -> Result<isize, SyscallError> {
        let name = self.read_user_cstr(name_addr)?;
        let (platform, pcb) = self.ctx();
        let node = platform.lookup(&name).ok_or(SyscallError::BadArgument)?;
        let file = match node.kind {
            NodeKind::Regular => OpenFile::new(FdKind::File, node.inode),
            NodeKind::Directory => OpenFile::new(FdKind::Directory, node.inode),
            NodeKind::Rtc => OpenFile::new(FdKind::Rtc, platform.open()),
        };
        match pcb.free_slot() {
            Some(fd) => {
                pcb.files[fd] = Some(file);
                Ok(fd as isize)
            }
            None => {
                // Roll back the driver-side open before failing.
                if file.kind == FdKind::Rtc {
                    platform.close(file.inode);
                }
                Err(SyscallError::BadDescriptor)
            }
        }
    }

    pub(super) fn sys_close(&mut self, fd: u32) -> Result<isize, SyscallError> {
        let (platform, pcb) = self.ctx();
        let file = pcb
            .take_file(fd as usize)
            .ok_or(SyscallError::BadDescriptor)?;
        if file.kind == FdKind::Rtc {
            platform.close(file.inode);
        }
        Ok(0)
    }

    pub(super) fn sys_getargs(&mut self, buf: u32, len: u32) -> Result<isize, SyscallError> {
        if buf == 0 {
            return Err(SyscallError::BadAddress);
        }
        let (platform, pcb) = self.ctx();
        let args = pcb.args.as_ref().ok_or(SyscallError::BadArgument)?;
        // The terminating NUL must fit too; a partial copy would be a
        // silent truncation, so refuse instead.
        if args.len() + 1 > len as usize {
            return Err(SyscallError::BadArgument);
        }
        platform.write_user(buf, args.as_bytes())?;
        platform.write_user(buf + args.len() as u32, &[0])?;
        Ok(0)
    }

    pub(super) fn sys_vidmap(&mut self, target_addr: u32) -> Result<isize, SyscallError> {
        // The out-pointer itself must sit inside the user page.
        let end = target_addr
            .checked_add(4)
            .ok_or(SyscallError::BadAddress)?;
        if target_addr < USER_PAGE_BASE || end > USER_PAGE_END {
            return Err(SyscallError::BadAddress);
        }
        self.platform
            .write_user(target_addr, &USER_VIDEO_BASE.to_le_bytes())?;
        let terminal = self.current_pcb().terminal;
        self.terminals.slot_mut(terminal).video_granted = true;
        Ok(USER_VIDEO_BASE as isize)
    }

    pub(super) fn sys_set_handler(
        &mut self,
        signum: u32,
        handler: u32,
    ) -> Result<isize, SyscallError> {
        let signal =
            Signal::from_index(signum as usize).ok_or(SyscallError::BadArgument)?;
        let handler = (handler != 0).then_some(handler);
        self.current_pcb_mut().signals.set_handler(signal, handler);
        Ok(0)
    }

    /// Restore the pre-signal context from the frame `deliver_pending_signal`
    /// pushed. The trampoline has already popped the kind argument, so the
    /// user stack pointer aims straight at the snapshot.
    pub(super) fn sys_sigreturn(&mut self, trap: &mut TrapContext) -> Result<isize, SyscallError> {
        let mut bytes = [0u8; TRAP_CONTEXT_WORDS * 4];
        self.platform.read_user(trap.user_stack_ptr, &mut bytes)?;
        let mut words = [0u32; TRAP_CONTEXT_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let saved = TrapContext::from_words(&words);
        // Segment selectors stay as they are; taking them from user
        // memory would let a process escalate its privilege.
        trap.regs = saved.regs;
        trap.flags = saved.flags;
        trap.instruction_ptr = saved.instruction_ptr;
        trap.user_stack_ptr = saved.user_stack_ptr;
        // The dispatcher's return value lands in the return-value
        // register slot; reporting the restored one keeps the resumed
        // context intact.
        Ok(saved.regs[0] as i32 as isize)
    }

    pub(super) fn sys_malloc(&mut self, size: u32) -> Result<isize, SyscallError> {
        let (_, pcb) = self.ctx();
        // Exhaustion is a null return, not a failure code.
        match pcb.heap.allocate(size as usize) {
            Ok(offset) => Ok((USER_HEAP_BASE + offset) as isize),
            Err(_) => Ok(0),
        }
    }

    pub(super) fn sys_free(&mut self, addr: u32) -> Result<isize, SyscallError> {
        if addr == 0 {
            return Ok(0);
        }
        if addr < USER_HEAP_BASE || addr >= USER_HEAP_BASE + USER_HEAP_SIZE as u32 {
            return Err(SyscallError::BadAddress);
        }
        let (_, pcb) = self.ctx();
        pcb.heap.free(addr - USER_HEAP_BASE)?;
        Ok(0)
    }
}
