//! Scripted platform mock shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use trion_kernel::config::{
    EXEC_MAGIC, ENTRY_POINT_OFFSET, USER_PAGE_BASE, USER_PAGE_END,
};
use trion_kernel::platform::{
    AccessViolation, CpuPort, FileSystem, NodeInfo, NodeKind, PagingPort, RtcPort, TerminalPort,
    VideoTarget,
};
use trion_kernel::scheduler::context::{SavedContext, TrapContext, USER_CODE_SEGMENT};
use trion_kernel::Kernel;

/// Fixed user address of the signal-return trampoline in the mock.
pub const TRAMPOLINE: u32 = 0x0800_0100;

/// Default entry point baked into generated executables.
pub const ENTRY: u32 = 0x0804_8030;

/// Build a minimal valid executable image with the given entry point.
pub fn exec_image(entry: u32) -> Vec<u8> {
    let mut image = vec![0u8; 0x400];
    image[..4].copy_from_slice(&EXEC_MAGIC);
    image[ENTRY_POINT_OFFSET..ENTRY_POINT_OFFSET + 4].copy_from_slice(&entry.to_le_bytes());
    image
}

#[derive(Clone)]
struct MockNode {
    name: String,
    kind: NodeKind,
    data: Vec<u8>,
}

/// In-memory stand-in for every hardware collaborator.
///
/// User memory is tracked per mapped frame, so address-space switches
/// behave like the real thing: a write lands in whichever frame the
/// paging port currently targets.
pub struct MockPlatform {
    // Paging.
    pub mapped_frame: usize,
    pub video: VideoTarget,
    pub flushes: u32,
    frames: HashMap<usize, HashMap<u32, u8>>,
    // CPU.
    pub kernel_stacks: Vec<u32>,
    pub timer_acks: u32,
    // Filesystem.
    nodes: Vec<MockNode>,
    // Terminals.
    pub input: Vec<VecDeque<Vec<u8>>>,
    pub output: Vec<Vec<u8>>,
    // RTC.
    next_token: u32,
    pub open_tokens: Vec<u32>,
    pub rates: HashMap<u32, u32>,
    pub tick_waits: Vec<u32>,
    pub hw_frequency: u32,
}

impl MockPlatform {
    pub fn new() -> Self {
        let mut mock = MockPlatform {
            mapped_frame: 0,
            video: VideoTarget::Live,
            flushes: 0,
            frames: HashMap::new(),
            kernel_stacks: Vec::new(),
            timer_acks: 0,
            nodes: Vec::new(),
            input: vec![VecDeque::new(); 3],
            output: vec![Vec::new(); 3],
            next_token: 1,
            open_tokens: Vec::new(),
            rates: HashMap::new(),
            tick_waits: Vec::new(),
            hw_frequency: 1024,
        };
        mock.add_node(".", NodeKind::Directory, Vec::new());
        mock.add_node("rtc", NodeKind::Rtc, Vec::new());
        mock.add_node("shell", NodeKind::Regular, exec_image(ENTRY));
        mock
    }

    pub fn add_node(&mut self, name: &str, kind: NodeKind, data: Vec<u8>) -> u32 {
        self.nodes.push(MockNode {
            name: name.into(),
            kind,
            data,
        });
        (self.nodes.len() - 1) as u32
    }

    pub fn add_program(&mut self, name: &str, entry: u32) -> u32 {
        self.add_node(name, NodeKind::Regular, exec_image(entry))
    }

    pub fn push_input(&mut self, terminal: usize, line: &[u8]) {
        self.input[terminal].push_back(line.to_vec());
    }

    /// Write into the currently mapped frame, bypassing validity checks.
    /// Tests use this to stage syscall arguments in user memory.
    pub fn poke_user(&mut self, addr: u32, bytes: &[u8]) {
        let frame = self.frames.entry(self.mapped_frame).or_default();
        for (i, &b) in bytes.iter().enumerate() {
            frame.insert(addr + i as u32, b);
        }
    }

    pub fn peek_user(&self, addr: u32, len: usize) -> Vec<u8> {
        let frame = self.frames.get(&self.mapped_frame);
        (0..len as u32)
            .map(|i| {
                frame
                    .and_then(|f| f.get(&(addr + i)))
                    .copied()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn peek_word(&self, addr: u32) -> u32 {
        let b = self.peek_user(addr, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn user_range_ok(addr: u32, len: usize) -> bool {
        addr >= USER_PAGE_BASE && addr.saturating_add(len as u32) <= USER_PAGE_END
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PagingPort for MockPlatform {
    fn map_user_slot(&mut self, frame: usize) {
        self.mapped_frame = frame;
    }

    fn map_video_slot(&mut self, target: VideoTarget) {
        self.video = target;
    }

    fn flush_tlb(&mut self) {
        self.flushes += 1;
    }
}

impl CpuPort for MockPlatform {
    fn set_kernel_stack(&mut self, stack_base: u32) {
        self.kernel_stacks.push(stack_base);
    }

    fn ack_timer(&mut self) {
        self.timer_acks += 1;
    }

    fn idle_until_interrupt(&mut self) {}

    fn sigreturn_trampoline(&self) -> u32 {
        TRAMPOLINE
    }
}

impl trion_kernel::platform::UserMemory for MockPlatform {
    fn write_user(&mut self, addr: u32, bytes: &[u8]) -> Result<(), AccessViolation> {
        if !Self::user_range_ok(addr, bytes.len()) {
            return Err(AccessViolation);
        }
        self.poke_user(addr, bytes);
        Ok(())
    }

    fn read_user(&self, addr: u32, buf: &mut [u8]) -> Result<(), AccessViolation> {
        if !Self::user_range_ok(addr, buf.len()) {
            return Err(AccessViolation);
        }
        let bytes = self.peek_user(addr, buf.len());
        buf.copy_from_slice(&bytes);
        Ok(())
    }
}

impl FileSystem for MockPlatform {
    fn lookup(&mut self, name: &str) -> Option<NodeInfo> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeInfo {
                kind: self.nodes[i].kind,
                inode: i as u32,
            })
    }

    fn read_file(&mut self, inode: u32, pos: u32, buf: &mut [u8]) -> usize {
        let Some(node) = self.nodes.get(inode as usize) else {
            return 0;
        };
        let pos = pos as usize;
        if pos >= node.data.len() {
            return 0;
        }
        let n = buf.len().min(node.data.len() - pos);
        buf[..n].copy_from_slice(&node.data[pos..pos + n]);
        n
    }

    fn read_dir_entry(&mut self, index: u32, buf: &mut [u8]) -> usize {
        let Some(node) = self.nodes.get(index as usize) else {
            return 0;
        };
        let name = node.name.as_bytes();
        let n = name.len().min(buf.len());
        buf[..n].copy_from_slice(&name[..n]);
        n
    }
}

impl TerminalPort for MockPlatform {
    fn read_line(&mut self, terminal: usize, buf: &mut [u8]) -> usize {
        let Some(line) = self.input[terminal].pop_front() else {
            return 0;
        };
        let n = line.len().min(buf.len());
        buf[..n].copy_from_slice(&line[..n]);
        n
    }

    fn write(&mut self, terminal: usize, bytes: &[u8]) -> usize {
        self.output[terminal].extend_from_slice(bytes);
        bytes.len()
    }
}

impl RtcPort for MockPlatform {
    fn open(&mut self) -> u32 {
        let token = self.next_token;
        self.next_token += 1;
        self.open_tokens.push(token);
        self.rates.insert(token, 2);
        token
    }

    fn wait_tick(&mut self, token: u32) {
        self.tick_waits.push(token);
    }

    fn set_rate(&mut self, token: u32, hz: u32) -> bool {
        if !hz.is_power_of_two() || hz < 2 || hz > 1024 {
            return false;
        }
        self.rates.insert(token, hz);
        true
    }

    fn close(&mut self, token: u32) {
        self.open_tokens.retain(|&t| t != token);
        self.rates.remove(&token);
    }

    fn frequency(&self) -> u32 {
        self.hw_frequency
    }
}

/// A booted kernel with terminal 0's shell entered.
pub fn booted_kernel() -> Kernel<MockPlatform> {
    let mut kernel = Kernel::new(MockPlatform::new());
    kernel.bootstrap("shell").expect("bootstrap failed");
    kernel
}

/// A distinctive suspended kernel context for spawn call sites.
pub fn caller_context(tag: u32) -> SavedContext {
    SavedContext::new(0x0070_0000 + tag * 0x100, 0x0070_0040 + tag * 0x100)
}

/// A trap frame as the entry stub would build it for a user-mode trap.
pub fn user_trap() -> TrapContext {
    TrapContext {
        regs: [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA],
        vector: 0x80,
        error_code: 0,
        instruction_ptr: ENTRY + 0x40,
        code_segment: USER_CODE_SEGMENT,
        flags: 0x202,
        user_stack_ptr: USER_PAGE_END - 16,
        data_segment: 0x2B,
    }
}
