//! Saved execution contexts and the switch primitive.
//!
//! Preservation contract: the trap entry stub pushes a full
//! [`TrapContext`] (every general register plus the privilege frame) onto
//! the interrupted kernel stack before calling into the core, and pops it
//! on the way out. The scheduler and the halt return path therefore only
//! need to preserve the two values the stub cannot: the kernel stack
//! pointer and frame pointer at the point of suspension. Those two live in
//! [`SavedContext`].

/// Suspended kernel execution state of one process.
///
/// Valid only while the owning process is not the one executing. Written
/// by the scheduler on a tick switch and by `spawn` on behalf of its
/// caller; consumed by the scheduler and by `halt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedContext {
    /// Kernel stack pointer at suspension.
    pub stack_ptr: u32,
    /// Kernel frame pointer at suspension.
    pub frame_ptr: u32,
}

impl SavedContext {
    pub const fn new(stack_ptr: u32, frame_ptr: u32) -> Self {
        SavedContext {
            stack_ptr,
            frame_ptr,
        }
    }
}

/// Context-switch primitive: park the interrupted context in the outgoing
/// process's save slot and hand back the context to resume.
///
/// The caller (the arch shim) loads the returned value into the live
/// stack/frame registers.
pub fn context_switch(
    save_slot: &mut SavedContext,
    interrupted: SavedContext,
    resume_from: &SavedContext,
) -> SavedContext {
    *save_slot = interrupted;
    *resume_from
}

/// Number of 32-bit words in a serialized [`TrapContext`].
pub const TRAP_CONTEXT_WORDS: usize = 17;

/// Hardware register snapshot pushed by the trap entry stub.
///
/// Layout mirrors the stub's push order: ten general registers, the
/// vector and error code, then the privilege frame. The same layout is
/// copied verbatim onto the user stack when a signal handler is
/// synthesized, and read back by `sigreturn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapContext {
    /// General registers in stub push order. `regs[0]` is the
    /// return-value register.
    pub regs: [u32; 10],
    /// Interrupt/exception vector number.
    pub vector: u32,
    /// Hardware error code (0 where none is pushed).
    pub error_code: u32,
    /// Instruction pointer to resume at.
    pub instruction_ptr: u32,
    /// Code segment of the interrupted context.
    pub code_segment: u32,
    /// Saved flags.
    pub flags: u32,
    /// User stack pointer (valid when `code_segment` is the user one).
    pub user_stack_ptr: u32,
    /// Data segment of the interrupted context.
    pub data_segment: u32,
}

/// Ring-3 code segment selector. A trapped context with this selector was
/// executing user code, which is the only boundary signals are delivered
/// across.
pub const USER_CODE_SEGMENT: u32 = 0x23;

impl TrapContext {
    /// Whether this trap interrupted user-mode execution.
    pub fn from_user(&self) -> bool {
        self.code_segment == USER_CODE_SEGMENT
    }

    /// Serialize for the synthesized signal frame on the user stack.
    pub fn to_words(&self) -> [u32; TRAP_CONTEXT_WORDS] {
        let mut words = [0u32; TRAP_CONTEXT_WORDS];
        words[..10].copy_from_slice(&self.regs);
        words[10] = self.vector;
        words[11] = self.error_code;
        words[12] = self.instruction_ptr;
        words[13] = self.code_segment;
        words[14] = self.flags;
        words[15] = self.user_stack_ptr;
        words[16] = self.data_segment;
        words
    }

    /// Rebuild a snapshot from a signal frame.
    pub fn from_words(words: &[u32; TRAP_CONTEXT_WORDS]) -> Self {
        let mut regs = [0u32; 10];
        regs.copy_from_slice(&words[..10]);
        TrapContext {
            regs,
            vector: words[10],
            error_code: words[11],
            instruction_ptr: words[12],
            code_segment: words[13],
            flags: words[14],
            user_stack_ptr: words[15],
            data_segment: words[16],
        }
    }
}
