//! Adapter for the PicoRV32 core model.
//!
//! The model is driven one instruction at a time. It has no notion of run
//! budgets, debug triggers or performance counters, so most of the optional
//! parts of the [`Target`] contract are reported as unsupported.

use core::fmt;

use log::warn;

use super::slot::EngineSlot;
use crate::engine::{EngineConfig, EngineError, Rv32Core, StepEvent};
use crate::target::{
    MatchType, RegValue, ResumeKind, ResumeRequest, ResumeResult, Target, PC_REGNUM,
};

pub const NAME: &str = "PicoRV32";

const CONFIG: EngineConfig = EngineConfig {
    mem_size: 128 * 1024,
    reset_pc: 0x0000_0000,
};

#[derive(Debug)]
pub struct PicoRv32 {
    core: EngineSlot<Rv32Core>,
}

impl PicoRv32 {
    pub fn new() -> Result<PicoRv32, EngineError> {
        Ok(PicoRv32 {
            core: EngineSlot::new(Rv32Core::new(CONFIG)?),
        })
    }
}

impl Target for PicoRv32 {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Executes exactly one instruction for both `Step` and `Continue`. The
    /// timeout and interrupt token are accepted but not consulted, since the
    /// call always returns at the next instruction boundary.
    fn resume(&mut self, request: ResumeRequest<'_>) -> ResumeResult {
        let core = match self.core.get_mut() {
            Some(core) => core,
            None => return ResumeResult::Failure,
        };

        match request.kind {
            ResumeKind::Stop => ResumeResult::None,
            ResumeKind::Step | ResumeKind::Continue => match core.step() {
                StepEvent::Retired => ResumeResult::Timeout,
                StepEvent::Ebreak | StepEvent::Ecall | StepEvent::Fault(_) => {
                    ResumeResult::Interrupted
                }
            },
        }
    }

    fn terminate(&mut self) -> ResumeResult {
        ResumeResult::Success
    }

    fn reset(&mut self) -> ResumeResult {
        match self.core.rebuild(|| Rv32Core::new(CONFIG)) {
            Ok(()) => ResumeResult::Success,
            Err(e) => {
                warn!("{}: reset failed: {}", NAME, e);
                ResumeResult::Failure
            }
        }
    }

    fn read_register(&self, reg: usize) -> Option<RegValue> {
        let core = self.core.get()?;
        match reg {
            0..=31 => Some(RegValue::new(core.reg(reg), 4)),
            PC_REGNUM => Some(RegValue::new(core.pc(), 4)),
            _ => None,
        }
    }

    fn write_register(&mut self, reg: usize, value: u32) -> Option<usize> {
        let core = self.core.get_mut()?;
        match reg {
            0..=31 => core.set_reg(reg, value),
            PC_REGNUM => core.set_pc(value),
            _ => return None,
        }
        Some(4)
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> usize {
        let core = match self.core.get() {
            Some(core) => core,
            None => return 0,
        };

        let mut n = 0;
        for (offset, b) in buf.iter_mut().enumerate() {
            match addr
                .checked_add(offset as u32)
                .and_then(|a| core.mem().r8(a))
            {
                Some(val) => *b = val,
                None => break,
            }
            n += 1;
        }
        n
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> usize {
        let core = match self.core.get_mut() {
            Some(core) => core,
            None => return 0,
        };

        let mut n = 0;
        for (offset, b) in data.iter().enumerate() {
            let ok = match addr.checked_add(offset as u32) {
                Some(a) => core.mem_mut().w8(a, *b),
                None => false,
            };
            if !ok {
                break;
            }
            n += 1;
        }
        n
    }

    fn insert_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool {
        warn!("{}: cannot insert {} at {:#010x}: not supported", NAME, kind, addr);
        false
    }

    fn remove_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool {
        warn!("{}: cannot remove {} at {:#010x}: not supported", NAME, kind, addr);
        false
    }

    fn command(&mut self, cmd: &str, _out: &mut dyn fmt::Write) -> bool {
        warn!("{}: monitor command {:?} not supported", NAME, cmd);
        false
    }

    fn cycle_count(&self) -> Option<u64> {
        warn!("{}: cycle count not supported", NAME);
        None
    }

    fn instr_count(&self) -> Option<u64> {
        warn!("{}: instruction count not supported", NAME);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_round_trip() {
        let mut target = PicoRv32::new().unwrap();
        for reg in (1..=31).chain(Some(PC_REGNUM)) {
            let val = 0x1000_0000 | reg as u32;
            assert_eq!(target.write_register(reg, val), Some(4));
            assert_eq!(target.read_register(reg), Some(RegValue::new(val, 4)));
        }
        assert_eq!(target.read_register(33), None);
        assert_eq!(target.write_register(64, 0), None);
    }

    #[test]
    fn memory_is_byte_granular_and_bounded() {
        let mut target = PicoRv32::new().unwrap();
        assert_eq!(target.write(0x1000, &[1, 2, 3, 4]), 4);
        let mut buf = [0; 4];
        assert_eq!(target.read(0x1000, &mut buf), 4);
        assert_eq!(buf, [1, 2, 3, 4]);

        // last two bytes of RAM, then off the end
        let mut buf = [0; 4];
        assert_eq!(target.read(0x1fffe, &mut buf), 2);
        assert_eq!(target.write(0x1fffe, &[9; 4]), 2);
        assert_eq!(target.write(0xffff_ffff, &[9; 4]), 0);
    }

    #[test]
    fn continue_runs_a_single_instruction() {
        let mut target = PicoRv32::new().unwrap();
        // addi a0, zero, 1 ; addi a0, a0, 1
        target.write(0, &0x0010_0513u32.to_le_bytes());
        target.write(4, &0x0015_0513u32.to_le_bytes());

        assert_eq!(target.resume(ResumeRequest::cont()), ResumeResult::Timeout);
        assert_eq!(target.read_register(PC_REGNUM).unwrap().value, 4);
        assert_eq!(target.resume(ResumeRequest::step()), ResumeResult::Timeout);
        assert_eq!(target.read_register(10).unwrap().value, 2);

        // zeroed memory is an illegal instruction
        assert_eq!(target.resume(ResumeRequest::step()), ResumeResult::Interrupted);
        assert_eq!(target.resume(ResumeRequest::stop()), ResumeResult::None);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut target = PicoRv32::new().unwrap();
        target.write_register(5, 0xdead_beef);
        target.write_register(PC_REGNUM, 0x40);
        target.write(0x100, &[0xaa; 8]);

        assert_eq!(target.reset(), ResumeResult::Success);
        assert_eq!(target.read_register(5).unwrap().value, 0);
        assert_eq!(target.read_register(PC_REGNUM).unwrap().value, 0);
        let mut buf = [0xff; 8];
        target.read(0x100, &mut buf);
        assert_eq!(buf, [0; 8]);
    }

    #[test]
    fn optional_capabilities_are_unsupported() {
        let mut target = PicoRv32::new().unwrap();
        assert!(!target.insert_matchpoint(0x10, MatchType::Break));
        assert!(!target.remove_matchpoint(0x10, MatchType::Break));
        assert!(!target.command("info", &mut String::new()));
        assert_eq!(target.cycle_count(), None);
        assert_eq!(target.instr_count(), None);
        assert_eq!(target.terminate(), ResumeResult::Success);
        assert_eq!(target.terminate(), ResumeResult::Success);
    }
}
