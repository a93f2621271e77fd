//! System-call surface.
//!
//! Every kernel service user programs can reach, dispatched from a single
//! numbered entry point. Handlers validate every user-supplied pointer and
//! descriptor; all failures, whatever their internal cause, flatten to the
//! single user-visible failure value -1.

mod handlers;

use log::trace;

use crate::kernel::{Kernel, Transition};
use crate::memory::AllocError;
use crate::platform::{AccessViolation, Platform};
use crate::process::ProcessError;
use crate::scheduler::context::{SavedContext, TrapContext};

/// The user-visible failure value.
pub const FAILURE: isize = -1;

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallNumber {
    Halt = 1,
    Execute = 2,
    Read = 3,
    Write = 4,
    Open = 5,
    Close = 6,
    GetArgs = 7,
    VidMap = 8,
    SetHandler = 9,
    SigReturn = 10,
    Malloc = 11,
    Free = 12,
}

impl TryFrom<u32> for SyscallNumber {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SyscallNumber::Halt),
            2 => Ok(SyscallNumber::Execute),
            3 => Ok(SyscallNumber::Read),
            4 => Ok(SyscallNumber::Write),
            5 => Ok(SyscallNumber::Open),
            6 => Ok(SyscallNumber::Close),
            7 => Ok(SyscallNumber::GetArgs),
            8 => Ok(SyscallNumber::VidMap),
            9 => Ok(SyscallNumber::SetHandler),
            10 => Ok(SyscallNumber::SigReturn),
            11 => Ok(SyscallNumber::Malloc),
            12 => Ok(SyscallNumber::Free),
            _ => Err(()),
        }
    }
}

/// Internal syscall failure. Never surfaces to user space directly;
/// the dispatcher flattens every variant to [`FAILURE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Descriptor out of range, unopened, or wrong direction.
    BadDescriptor,
    /// Null, unmapped, or out-of-region user pointer.
    BadAddress,
    /// Argument value outside its valid domain.
    BadArgument,
    /// Spawn failure (resolution, format, or table exhaustion).
    Process(ProcessError),
}

impl From<ProcessError> for SyscallError {
    fn from(err: ProcessError) -> Self {
        SyscallError::Process(err)
    }
}

impl From<AccessViolation> for SyscallError {
    fn from(_: AccessViolation) -> Self {
        SyscallError::BadAddress
    }
}

impl From<AllocError> for SyscallError {
    fn from(_: AllocError) -> Self {
        SyscallError::BadArgument
    }
}

/// What the arch shim does after a syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Plain return to the caller with this value.
    Return(isize),
    /// The call replaced the current execution flow.
    Transition(Transition),
}

impl<P: Platform> Kernel<P> {
    /// Syscall entry point.
    ///
    /// `trap` is the caller's trap frame (redirected by `sigreturn`);
    /// `caller` is the suspended kernel context captured at the syscall
    /// boundary, consumed by `execute`.
    pub fn syscall(
        &mut self,
        number: u32,
        a: u32,
        b: u32,
        c: u32,
        trap: &mut TrapContext,
        caller: SavedContext,
    ) -> SyscallOutcome {
        let Ok(call) = SyscallNumber::try_from(number) else {
            return SyscallOutcome::Return(FAILURE);
        };
        trace!("syscall {:?} from pid {}", call, self.current_pid());

        let result = match call {
            SyscallNumber::Halt => {
                // Voluntary exit reports the low status byte only;
                // values above 255 are reserved for fault exits.
                return SyscallOutcome::Transition(self.halt((a & 0xFF) as i32));
            }
            SyscallNumber::Execute => {
                return match self.sys_execute(a, caller) {
                    Ok(transition) => SyscallOutcome::Transition(transition),
                    Err(_) => SyscallOutcome::Return(FAILURE),
                };
            }
            SyscallNumber::Read => self.sys_read(a, b, c),
            SyscallNumber::Write => self.sys_write(a, b, c),
            SyscallNumber::Open => self.sys_open(a),
            SyscallNumber::Close => self.sys_close(a),
            SyscallNumber::GetArgs => self.sys_getargs(a, b),
            SyscallNumber::VidMap => self.sys_vidmap(a),
            SyscallNumber::SetHandler => self.sys_set_handler(a, b),
            SyscallNumber::SigReturn => self.sys_sigreturn(trap),
            SyscallNumber::Malloc => self.sys_malloc(a),
            SyscallNumber::Free => self.sys_free(a),
        };
        SyscallOutcome::Return(result.unwrap_or(FAILURE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_mapping() {
        assert_eq!(SyscallNumber::try_from(1), Ok(SyscallNumber::Halt));
        assert_eq!(SyscallNumber::try_from(12), Ok(SyscallNumber::Free));
        assert_eq!(SyscallNumber::try_from(0), Err(()));
        assert_eq!(SyscallNumber::try_from(13), Err(()));
    }
}
