//! Adapter for the RI5CY core model.
//!
//! RI5CY runs whole time slices per `Continue`, checking its matchpoints, the
//! cooperative interrupt token and the deadline between instructions. It
//! exposes the engine's performance counters and reports `ecall` as a host
//! syscall request.

use core::fmt;
use std::collections::BTreeSet;
use std::time::Instant;

use log::{debug, warn};

use super::slot::EngineSlot;
use crate::engine::{EngineConfig, EngineError, Rv32Core, StepEvent};
use crate::target::{
    MatchType, RegValue, ResumeKind, ResumeRequest, ResumeResult, Target, A0_REGNUM, A7_REGNUM,
    PC_REGNUM,
};

pub const NAME: &str = "RI5CY";

const CONFIG: EngineConfig = EngineConfig {
    mem_size: 1024 * 1024,
    reset_pc: 0x0000_0080,
};

/// Number of hardware breakpoint comparators.
pub const NUM_HW_BREAKPOINTS: usize = 2;

/// Instructions executed between deadline checks.
const DEADLINE_POLL_INTERVAL: u32 = 1024;

enum Event {
    Retired,
    Stopped,
}

#[derive(Debug)]
pub struct Ri5cy {
    core: EngineSlot<Rv32Core>,
    sw_breakpoints: BTreeSet<u32>,
    hw_breakpoints: [Option<u32>; NUM_HW_BREAKPOINTS],
}

impl Ri5cy {
    pub fn new() -> Result<Ri5cy, EngineError> {
        Ok(Ri5cy {
            core: EngineSlot::new(Rv32Core::new(CONFIG)?),
            sw_breakpoints: BTreeSet::new(),
            hw_breakpoints: [None; NUM_HW_BREAKPOINTS],
        })
    }

    fn breakpoint_at(&self, pc: u32) -> bool {
        self.sw_breakpoints.contains(&pc) || self.hw_breakpoints.contains(&Some(pc))
    }

    /// Execute one instruction, filling in `request.syscall` on `ecall`.
    fn step_once(core: &mut Rv32Core, request: &mut ResumeRequest<'_>) -> Event {
        match core.step() {
            StepEvent::Retired => Event::Retired,
            StepEvent::Ecall => {
                if let Some(syscall) = request.syscall.as_deref_mut() {
                    let mut args = [0; 6];
                    for (i, arg) in args.iter_mut().enumerate() {
                        *arg = core.reg(A0_REGNUM + i);
                    }
                    syscall.set(core.reg(A7_REGNUM), args);
                }
                Event::Stopped
            }
            StepEvent::Ebreak => Event::Stopped,
            StepEvent::Fault(fault) => {
                debug!("{}: {:x?}", NAME, fault);
                Event::Stopped
            }
        }
    }

    fn run(&mut self, mut request: ResumeRequest<'_>) -> ResumeResult {
        let deadline = request.timeout.map(|t| Instant::now() + t);
        let mut first = true;
        let mut since_poll = 0;

        loop {
            let pc = match self.core.get() {
                Some(core) => core.pc(),
                None => return ResumeResult::Failure,
            };

            // a breakpoint at the resume address must not re-trigger
            if !first && self.breakpoint_at(pc) {
                return ResumeResult::Interrupted;
            }
            first = false;

            if request.interrupted() {
                return ResumeResult::Timeout;
            }

            since_poll += 1;
            if since_poll >= DEADLINE_POLL_INTERVAL {
                since_poll = 0;
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return ResumeResult::Timeout;
                }
            }

            let core = match self.core.get_mut() {
                Some(core) => core,
                None => return ResumeResult::Failure,
            };
            if let Event::Stopped = Ri5cy::step_once(core, &mut request) {
                return ResumeResult::Interrupted;
            }
        }
    }
}

impl Target for Ri5cy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn resume(&mut self, mut request: ResumeRequest<'_>) -> ResumeResult {
        match request.kind {
            ResumeKind::Stop => ResumeResult::None,
            ResumeKind::Continue => self.run(request),
            ResumeKind::Step => {
                let core = match self.core.get_mut() {
                    Some(core) => core,
                    None => return ResumeResult::Failure,
                };
                match Ri5cy::step_once(core, &mut request) {
                    Event::Retired => ResumeResult::Timeout,
                    Event::Stopped => ResumeResult::Interrupted,
                }
            }
        }
    }

    fn terminate(&mut self) -> ResumeResult {
        ResumeResult::Success
    }

    fn reset(&mut self) -> ResumeResult {
        self.sw_breakpoints.clear();
        self.hw_breakpoints = [None; NUM_HW_BREAKPOINTS];
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
        for (b, offset) in buf.iter_mut().zip(0u32..) {
            match addr.checked_add(offset).and_then(|a| core.mem().r8(a)) {
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

        data.iter()
            .zip(0u32..)
            .take_while(|(b, offset)| match addr.checked_add(*offset) {
                Some(a) => core.mem_mut().w8(a, **b),
                None => false,
            })
            .count()
    }

    fn insert_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool {
        match kind {
            MatchType::Break => {
                self.sw_breakpoints.insert(addr);
                true
            }
            MatchType::BreakHw => {
                if self.hw_breakpoints.contains(&Some(addr)) {
                    return true;
                }
                match self.hw_breakpoints.iter_mut().find(|slot| slot.is_none()) {
                    Some(slot) => {
                        *slot = Some(addr);
                        true
                    }
                    None => {
                        warn!(
                            "{}: no free hardware breakpoint for {:#010x} ({} in use)",
                            NAME, addr, NUM_HW_BREAKPOINTS
                        );
                        false
                    }
                }
            }
            MatchType::WatchWrite | MatchType::WatchRead | MatchType::WatchAccess => {
                warn!("{}: {} not supported", NAME, kind);
                false
            }
        }
    }

    fn remove_matchpoint(&mut self, addr: u32, kind: MatchType) -> bool {
        match kind {
            MatchType::Break => self.sw_breakpoints.remove(&addr),
            MatchType::BreakHw => match self
                .hw_breakpoints
                .iter_mut()
                .find(|slot| **slot == Some(addr))
            {
                Some(slot) => {
                    *slot = None;
                    true
                }
                None => false,
            },
            MatchType::WatchWrite | MatchType::WatchRead | MatchType::WatchAccess => {
                warn!("{}: {} not supported", NAME, kind);
                false
            }
        }
    }

    fn command(&mut self, cmd: &str, out: &mut dyn fmt::Write) -> bool {
        let res = match cmd.trim() {
            "info" => {
                let pc = self.core.get().map(Rv32Core::pc);
                (|| {
                    writeln!(out, "core:       {}", NAME)?;
                    writeln!(out, "memory:     {:#x} bytes", CONFIG.mem_size)?;
                    writeln!(out, "reset pc:   {:#010x}", CONFIG.reset_pc)?;
                    match pc {
                        Some(pc) => writeln!(out, "pc:         {:#010x}", pc)?,
                        None => writeln!(out, "pc:         <no engine>")?,
                    }
                    writeln!(out, "sw breaks:  {}", self.sw_breakpoints.len())
                })()
            }
            "hwbreak" => (|| {
                for (i, slot) in self.hw_breakpoints.iter().enumerate() {
                    match slot {
                        Some(addr) => writeln!(out, "hw{}: {:#010x}", i, addr)?,
                        None => writeln!(out, "hw{}: free", i)?,
                    }
                }
                Ok(())
            })(),
            _ => return false,
        };

        if res.is_err() {
            warn!("{}: failed to write monitor output", NAME);
        }
        true
    }

    fn cycle_count(&self) -> Option<u64> {
        self.core.get().map(Rv32Core::cycles)
    }

    fn instr_count(&self) -> Option<u64> {
        self.core.get().map(Rv32Core::instret)
    }
}
