//! The [`Target`] trait: the capability contract every core backend
//! implements, along with the request/result types passed across it.
//!
//! The session loop only ever talks to a `Box<dyn Target>`. Nothing in the
//! protocol layer knows which backend it is driving, so adding a backend
//! means implementing this trait and registering a constructor in
//! [`crate::backend`].
//!
//! ### Unsupported capabilities
//!
//! Backends are allowed to leave parts of this contract unimplemented, but
//! must say so explicitly:
//!
//! - matchpoint and monitor methods return `false`
//! - counter methods return `None`
//! - register accessors return `None`
//! - memory accessors return a short transfer count
//!
//! None of these are fatal. The session turns them into the matching RSP
//! "unsupported" or error reply and carries on.

use core::fmt;
use core::time::Duration;

mod interrupt;

pub use interrupt::Interrupt;

/// Register index of the program counter in the flat register namespace.
pub const PC_REGNUM: usize = 32;

/// Number of registers exposed through `g` / `G` (x0..x31 followed by pc).
pub const NUM_REGS: usize = 33;

/// Register index of `a0`, where syscall results are returned.
pub const A0_REGNUM: usize = 10;

/// Register index of `a7`, which carries the syscall number.
pub const A7_REGNUM: usize = 17;

/// How a call to [`Target::resume`] should advance execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeKind {
    /// Execute exactly one instruction.
    Step,
    /// Run until a stopping condition, the timeout, or an interrupt.
    Continue,
    /// Request that the target stop. A no-op on an already stopped target.
    Stop,
}

/// Outcome of a control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeResult {
    /// The operation was a no-op given the current state.
    None,
    /// A control operation (e.g: reset) completed.
    Success,
    /// A control operation (e.g: reset) failed.
    Failure,
    /// Execution did not reach a stopping condition within its budget.
    Timeout,
    /// Execution stopped on an observable event: a breakpoint, a trap, or a
    /// host syscall request.
    Interrupted,
}

/// Breakpoint and watchpoint kinds, numbered as in the `Z`/`z` packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchType {
    Break,
    BreakHw,
    WatchWrite,
    WatchRead,
    WatchAccess,
}

impl MatchType {
    pub fn from_rsp(type_: u8) -> Option<MatchType> {
        let kind = match type_ {
            0 => MatchType::Break,
            1 => MatchType::BreakHw,
            2 => MatchType::WatchWrite,
            3 => MatchType::WatchRead,
            4 => MatchType::WatchAccess,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchType::Break => "software breakpoint",
            MatchType::BreakHw => "hardware breakpoint",
            MatchType::WatchWrite => "write watchpoint",
            MatchType::WatchRead => "read watchpoint",
            MatchType::WatchAccess => "access watchpoint",
        };
        f.write_str(s)
    }
}

/// A register value together with its width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegValue {
    pub value: u32,
    pub width: usize,
}

impl RegValue {
    pub fn new(value: u32, width: usize) -> RegValue {
        RegValue { value, width }
    }

    /// The value in target (little endian) byte order, truncated to `width`.
    pub fn to_le_bytes(&self) -> impl Iterator<Item = u8> {
        self.value
            .to_le_bytes()
            .into_iter()
            .take(self.width.min(4))
    }
}

/// A host system call requested by the program being debugged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    /// Syscall number (the value of `a7`).
    pub number: u32,
    /// Arguments `a0`..`a5`.
    pub args: [u32; 6],
}

/// Out-parameter populated by [`Target::resume`] when execution stopped on a
/// host syscall request. Lives for the duration of one resume call.
#[derive(Debug, Default)]
pub struct SyscallInfo {
    request: Option<SyscallRequest>,
}

impl SyscallInfo {
    pub fn new() -> SyscallInfo {
        SyscallInfo::default()
    }

    /// Record a syscall request. Called by backends.
    pub fn set(&mut self, number: u32, args: [u32; 6]) {
        self.request = Some(SyscallRequest { number, args });
    }

    pub fn take(&mut self) -> Option<SyscallRequest> {
        self.request.take()
    }
}

/// Parameters of a single [`Target::resume`] call.
#[derive(Debug)]
pub struct ResumeRequest<'a> {
    pub kind: ResumeKind,
    pub timeout: Option<Duration>,
    pub syscall: Option<&'a mut SyscallInfo>,
    pub interrupt: Option<&'a Interrupt>,
}

impl<'a> ResumeRequest<'a> {
    pub fn new(kind: ResumeKind) -> ResumeRequest<'a> {
        ResumeRequest {
            kind,
            timeout: None,
            syscall: None,
            interrupt: None,
        }
    }

    pub fn step() -> ResumeRequest<'a> {
        ResumeRequest::new(ResumeKind::Step)
    }

    pub fn cont() -> ResumeRequest<'a> {
        ResumeRequest::new(ResumeKind::Continue)
    }

    pub fn stop() -> ResumeRequest<'a> {
        ResumeRequest::new(ResumeKind::Stop)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_syscall(mut self, syscall: &'a mut SyscallInfo) -> Self {
        self.syscall = Some(syscall);
        self
    }

    pub fn with_interrupt(mut self, interrupt: &'a Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// True if a cooperative interrupt has been requested for this call.
    pub fn interrupted(&self) -> bool {
        self.interrupt.map(Interrupt::is_set).unwrap_or(false)
    }
}

/// The capability contract a CPU core backend must satisfy.
///
/// All methods are synchronous. Every outcome, including "this backend
/// cannot do that", is expressed in the return value.
pub trait Target {
    /// Human readable backend name (e.g: `"PicoRV32"`).
    fn name(&self) -> &'static str;

    /// Advance execution as described by `request`.
    ///
    /// `Step` and `Continue` return `Timeout` when execution is still
    /// runnable (no stopping condition hit within the budget) and
    /// `Interrupted` when an observable event stopped it. If the event was a
    /// host syscall and `request.syscall` is present, it is populated.
    /// `Stop` on a stopped target returns `None`.
    fn resume(&mut self, request: ResumeRequest<'_>) -> ResumeResult;

    /// Release anything held by an in-progress resume. Idempotent.
    fn terminate(&mut self) -> ResumeResult;

    /// Discard the execution engine and construct a fresh one.
    ///
    /// Returns `Success` or `Failure`. After a failure the target must not
    /// be assumed usable until a later reset succeeds.
    fn reset(&mut self) -> ResumeResult;

    /// Read a register. `None` if the index is not part of this target's
    /// register file.
    fn read_register(&self, reg: usize) -> Option<RegValue>;

    /// Write a register, returning its width in bytes.
    fn write_register(&mut self, reg: usize, value: u32) -> Option<usize>;

    /// Read `buf.len()` bytes starting at `addr`. Returns the number of bytes
    /// transferred; fewer than requested indicates a fault at
    /// `addr + returned`.
    fn read(&self, addr: u32, buf: &mut [u8]) -> usize;

    /// Write `data` starting at `addr`. Returns the number of bytes
    /// transferred.
    fn write(&mut self, addr: u32, data: &[u8]) -> usize;

    /// Insert a matchpoint. `false` if the type is unsupported or the
    /// matchpoint could not be applied.
    fn insert_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool;

    /// Remove a matchpoint. `false` if the type is unsupported or no such
    /// matchpoint was set.
    fn remove_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool;

    /// Handle a backend specific monitor command, writing any output to
    /// `out`. `false` if the command is not recognised.
    fn command(&mut self, cmd: &str, out: &mut dyn fmt::Write) -> bool;

    /// Cycles since the last reset, or `None` if not tracked.
    fn cycle_count(&self) -> Option<u64>;

    /// Retired instructions since the last reset, or `None` if not tracked.
    fn instr_count(&self) -> Option<u64>;
}

impl<T: Target + ?Sized> Target for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resume(&mut self, request: ResumeRequest<'_>) -> ResumeResult {
        (**self).resume(request)
    }

    fn terminate(&mut self) -> ResumeResult {
        (**self).terminate()
    }

    fn reset(&mut self) -> ResumeResult {
        (**self).reset()
    }

    fn read_register(&self, reg: usize) -> Option<RegValue> {
        (**self).read_register(reg)
    }

    fn write_register(&mut self, reg: usize, value: u32) -> Option<usize> {
        (**self).write_register(reg, value)
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> usize {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> usize {
        (**self).write(addr, data)
    }

    fn insert_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool {
        (**self).insert_matchpoint(addr, kind)
    }

    fn remove_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool {
        (**self).remove_matchpoint(addr, kind)
    }

    fn command(&mut self, cmd: &str, out: &mut dyn fmt::Write) -> bool {
        (**self).command(cmd, out)
    }

    fn cycle_count(&self) -> Option<u64> {
        (**self).cycle_count()
    }

    fn instr_count(&self) -> Option<u64> {
        (**self).instr_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_numbering() {
        assert_eq!(MatchType::from_rsp(0), Some(MatchType::Break));
        assert_eq!(MatchType::from_rsp(1), Some(MatchType::BreakHw));
        assert_eq!(MatchType::from_rsp(4), Some(MatchType::WatchAccess));
        assert_eq!(MatchType::from_rsp(5), None);
    }

    #[test]
    fn reg_value_bytes_are_little_endian() {
        let bytes: Vec<u8> = RegValue::new(0x1234_5678, 4).to_le_bytes().collect();
        assert_eq!(bytes, [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn syscall_info_is_single_shot() {
        let mut info = SyscallInfo::new();
        assert!(info.take().is_none());
        info.set(64, [1, 0x1000, 5, 0, 0, 0]);
        assert_eq!(info.take().map(|r| r.number), Some(64));
        assert!(info.take().is_none());
    }

    #[test]
    fn resume_request_reports_interrupt() {
        let interrupt = Interrupt::new();
        let req = ResumeRequest::cont().with_interrupt(&interrupt);
        assert!(!req.interrupted());
        interrupt.raise();
        assert!(req.interrupted());
        assert!(!ResumeRequest::step().interrupted());
    }
}
