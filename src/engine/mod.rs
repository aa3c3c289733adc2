//! A compact RV32I execution engine.
//!
//! Backends treat [`Rv32Core`] as an opaque engine: they construct it, step
//! it, poke at its registers and memory, and throw it away on reset. It does
//! not model any particular core's pipeline. The cycle counter uses a fixed
//! per-class cost so that it advances at least as fast as the retired
//! instruction counter.

use thiserror::Error;

mod decode;
mod memory;

use decode::*;
pub use memory::Memory;

/// Construction parameters for an [`Rv32Core`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Size of RAM (mapped at address 0) in bytes.
    pub mem_size: usize,
    /// Program counter after construction.
    pub reset_pc: u32,
}

/// Engine construction failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("memory size must be a non-zero multiple of 4 no larger than 4 GiB (got {0:#x})")]
    BadMemorySize(usize),
    #[error("reset vector {reset_pc:#010x} lies outside {mem_size:#x} bytes of memory")]
    ResetVectorOutOfRange { reset_pc: u32, mem_size: usize },
}

/// Reason an instruction could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    IllegalInstruction { pc: u32, instr: u32 },
    FetchMisaligned(u32),
    FetchFault(u32),
    LoadFault(u32),
    StoreFault(u32),
}

/// Outcome of a single [`Rv32Core::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// The instruction retired normally.
    Retired,
    /// `ebreak` was executed. The pc still points at it.
    Ebreak,
    /// `ecall` was executed. It has retired and the pc points past it.
    Ecall,
    /// The instruction faulted. The pc still points at it.
    Fault(Fault),
}

const CYCLES_ALU: u64 = 1;
const CYCLES_MEM: u64 = 2;
const CYCLES_TAKEN: u64 = 3;

#[derive(Debug, Clone)]
pub struct Rv32Core {
    regs: [u32; 32],
    pc: u32,
    mem: Memory,
    cycles: u64,
    instret: u64,
}

impl Rv32Core {
    pub fn new(config: EngineConfig) -> Result<Rv32Core, EngineError> {
        if config.mem_size == 0
            || config.mem_size % 4 != 0
            || config.mem_size as u64 > u64::from(u32::MAX) + 1
        {
            return Err(EngineError::BadMemorySize(config.mem_size));
        }

        if config.reset_pc as usize >= config.mem_size {
            return Err(EngineError::ResetVectorOutOfRange {
                reset_pc: config.reset_pc,
                mem_size: config.mem_size,
            });
        }

        Ok(Rv32Core {
            regs: [0; 32],
            pc: config.reset_pc,
            mem: Memory::new(config.mem_size),
            cycles: 0,
            instret: 0,
        })
    }

    pub fn reg(&self, idx: usize) -> u32 {
        match idx {
            0 => 0,
            1..=31 => self.regs[idx],
            _ => 0,
        }
    }

    /// Writes to x0 (and out-of-range indices) are discarded.
    pub fn set_reg(&mut self, idx: usize, val: u32) {
        if let 1..=31 = idx {
            self.regs[idx] = val;
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn mem(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn instret(&self) -> u64 {
        self.instret
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> StepEvent {
        let pc = self.pc;

        if pc % 4 != 0 {
            self.cycles += CYCLES_ALU;
            return StepEvent::Fault(Fault::FetchMisaligned(pc));
        }

        let instr = match self.mem.r32(pc) {
            Some(instr) => instr,
            None => {
                self.cycles += CYCLES_ALU;
                return StepEvent::Fault(Fault::FetchFault(pc));
            }
        };

        match self.execute(pc, instr) {
            Ok((next_pc, cost, event)) => {
                self.pc = next_pc;
                self.cycles += cost;
                self.instret += 1;
                event
            }
            Err(event) => {
                self.cycles += CYCLES_ALU;
                event
            }
        }
    }

    /// Execute `instr` located at `pc`, returning the next pc, the cycle cost
    /// and the event to report. Non-retiring outcomes are returned as `Err`.
    fn execute(&mut self, pc: u32, instr: u32) -> Result<(u32, u64, StepEvent), StepEvent> {
        let illegal = StepEvent::Fault(Fault::IllegalInstruction { pc, instr });
        let next = pc.wrapping_add(4);
        let rs1_val = self.reg(rs1(instr));
        let rs2_val = self.reg(rs2(instr));

        let (next_pc, cost, event) = match opcode(instr) {
            OPCODE_LUI => {
                self.set_reg(rd(instr), u_imm(instr) as u32);
                (next, CYCLES_ALU, StepEvent::Retired)
            }
            OPCODE_AUIPC => {
                self.set_reg(rd(instr), pc.wrapping_add(u_imm(instr) as u32));
                (next, CYCLES_ALU, StepEvent::Retired)
            }
            OPCODE_JAL => {
                self.set_reg(rd(instr), next);
                let target = pc.wrapping_add(j_imm(instr) as u32);
                (target, CYCLES_TAKEN, StepEvent::Retired)
            }
            OPCODE_JALR if funct3(instr) == 0 => {
                let target = rs1_val.wrapping_add(i_imm(instr) as u32) & !1;
                self.set_reg(rd(instr), next);
                (target, CYCLES_TAKEN, StepEvent::Retired)
            }
            OPCODE_BRANCH => {
                let taken = match funct3(instr) {
                    0 => rs1_val == rs2_val,
                    1 => rs1_val != rs2_val,
                    4 => (rs1_val as i32) < (rs2_val as i32),
                    5 => (rs1_val as i32) >= (rs2_val as i32),
                    6 => rs1_val < rs2_val,
                    7 => rs1_val >= rs2_val,
                    _ => return Err(illegal),
                };
                if taken {
                    let target = pc.wrapping_add(b_imm(instr) as u32);
                    (target, CYCLES_TAKEN, StepEvent::Retired)
                } else {
                    (next, CYCLES_ALU, StepEvent::Retired)
                }
            }
            OPCODE_LOAD => {
                let addr = rs1_val.wrapping_add(i_imm(instr) as u32);
                let fault = StepEvent::Fault(Fault::LoadFault(addr));
                let val = match funct3(instr) {
                    0 => self.mem.r8(addr).ok_or(fault)? as i8 as i32 as u32,
                    1 => self.mem.r16(addr).ok_or(fault)? as i16 as i32 as u32,
                    2 => self.mem.r32(addr).ok_or(fault)?,
                    4 => u32::from(self.mem.r8(addr).ok_or(fault)?),
                    5 => u32::from(self.mem.r16(addr).ok_or(fault)?),
                    _ => return Err(illegal),
                };
                self.set_reg(rd(instr), val);
                (next, CYCLES_MEM, StepEvent::Retired)
            }
            OPCODE_STORE => {
                let addr = rs1_val.wrapping_add(s_imm(instr) as u32);
                let len = match funct3(instr) {
                    0 => 1,
                    1 => 2,
                    2 => 4,
                    _ => return Err(illegal),
                };
                if !self.mem.write_le(addr, rs2_val, len) {
                    return Err(StepEvent::Fault(Fault::StoreFault(addr)));
                }
                (next, CYCLES_MEM, StepEvent::Retired)
            }
            OPCODE_OP_IMM => {
                let imm = i_imm(instr);
                let shamt = (imm as u32) & 0x1f;
                let val = match (funct3(instr), funct7(instr)) {
                    (0, _) => rs1_val.wrapping_add(imm as u32),
                    (2, _) => ((rs1_val as i32) < imm) as u32,
                    (3, _) => (rs1_val < imm as u32) as u32,
                    (4, _) => rs1_val ^ imm as u32,
                    (6, _) => rs1_val | imm as u32,
                    (7, _) => rs1_val & imm as u32,
                    (1, 0x00) => rs1_val << shamt,
                    (5, 0x00) => rs1_val >> shamt,
                    (5, 0x20) => ((rs1_val as i32) >> shamt) as u32,
                    _ => return Err(illegal),
                };
                self.set_reg(rd(instr), val);
                (next, CYCLES_ALU, StepEvent::Retired)
            }
            OPCODE_OP => {
                let shamt = rs2_val & 0x1f;
                let val = match (funct3(instr), funct7(instr)) {
                    (0, 0x00) => rs1_val.wrapping_add(rs2_val),
                    (0, 0x20) => rs1_val.wrapping_sub(rs2_val),
                    (1, 0x00) => rs1_val << shamt,
                    (2, 0x00) => ((rs1_val as i32) < (rs2_val as i32)) as u32,
                    (3, 0x00) => (rs1_val < rs2_val) as u32,
                    (4, 0x00) => rs1_val ^ rs2_val,
                    (5, 0x00) => rs1_val >> shamt,
                    (5, 0x20) => ((rs1_val as i32) >> shamt) as u32,
                    (6, 0x00) => rs1_val | rs2_val,
                    (7, 0x00) => rs1_val & rs2_val,
                    _ => return Err(illegal),
                };
                self.set_reg(rd(instr), val);
                (next, CYCLES_ALU, StepEvent::Retired)
            }
            OPCODE_MISC_MEM => (next, CYCLES_ALU, StepEvent::Retired),
            OPCODE_SYSTEM => match instr {
                INSTR_ECALL => (next, CYCLES_ALU, StepEvent::Ecall),
                INSTR_EBREAK => return Err(StepEvent::Ebreak),
                _ => return Err(illegal),
            },
            _ => return Err(illegal),
        };

        Ok((next_pc, cost, event))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_CONFIG: EngineConfig = EngineConfig {
        mem_size: 0x1000,
        reset_pc: 0,
    };

    pub(crate) fn load(core: &mut Rv32Core, addr: u32, program: &[u32]) {
        for (i, instr) in program.iter().enumerate() {
            assert!(core.mem_mut().write_le(addr + 4 * i as u32, *instr, 4));
        }
    }

    #[test]
    fn rejects_bad_configs() {
        let bad_size = EngineConfig {
            mem_size: 6,
            reset_pc: 0,
        };
        assert_eq!(
            Rv32Core::new(bad_size).unwrap_err(),
            EngineError::BadMemorySize(6)
        );

        let bad_pc = EngineConfig {
            mem_size: 0x100,
            reset_pc: 0x100,
        };
        assert!(matches!(
            Rv32Core::new(bad_pc),
            Err(EngineError::ResetVectorOutOfRange { .. })
        ));
    }

    #[test]
    fn arithmetic_and_counters() {
        let mut core = Rv32Core::new(TEST_CONFIG).unwrap();
        load(
            &mut core,
            0,
            &[
                0x0050_0513, // addi a0, zero, 5
                0x0070_0593, // addi a1, zero, 7
                0x00b5_0633, // add  a2, a0, a1
                0x40a6_06b3, // sub  a3, a2, a0
            ],
        );

        for _ in 0..4 {
            assert_eq!(core.step(), StepEvent::Retired);
        }
        assert_eq!(core.reg(12), 12);
        assert_eq!(core.reg(13), 7);
        assert_eq!(core.pc(), 16);
        assert_eq!(core.instret(), 4);
        assert!(core.cycles() >= core.instret());
    }

    #[test]
    fn loads_and_stores() {
        let mut core = Rv32Core::new(TEST_CONFIG).unwrap();
        load(
            &mut core,
            0,
            &[
                0x8000_0513, // addi a0, zero, -2048 (0xfffff800)
                0x2000_0593, // addi a1, zero, 512
                0x00a5_a023, // sw   a0, 0(a1)
                0x0005_c603, // lbu  a2, 0(a1)
                0x0005_9683, // lh   a3, 0(a1)
            ],
        );

        for _ in 0..5 {
            assert_eq!(core.step(), StepEvent::Retired);
        }
        assert_eq!(core.mem().r32(512), Some(0xffff_f800));
        assert_eq!(core.reg(12), 0x00);
        assert_eq!(core.reg(13), 0xffff_f800);
    }

    #[test]
    fn branches_loop_until_equal() {
        let mut core = Rv32Core::new(TEST_CONFIG).unwrap();
        load(
            &mut core,
            0,
            &[
                0x0030_0513, // addi a0, zero, 3
                0xfff5_0513, // addi a0, a0, -1
                0xfe05_1ee3, // bne  a0, zero, -4
                0x0010_0073, // ebreak
            ],
        );

        let mut steps = 0;
        let event = loop {
            match core.step() {
                StepEvent::Retired => steps += 1,
                other => break other,
            }
        };
        assert_eq!(event, StepEvent::Ebreak);
        assert_eq!(steps, 7);
        assert_eq!(core.pc(), 12);
        assert_eq!(core.reg(10), 0);
    }

    #[test]
    fn ecall_retires_and_advances() {
        let mut core = Rv32Core::new(TEST_CONFIG).unwrap();
        load(&mut core, 0, &[0x0000_0073]);
        assert_eq!(core.step(), StepEvent::Ecall);
        assert_eq!(core.pc(), 4);
        assert_eq!(core.instret(), 1);
    }

    #[test]
    fn faults_leave_pc_in_place() {
        let mut core = Rv32Core::new(TEST_CONFIG).unwrap();
        // all-zero memory decodes as an illegal instruction
        assert_eq!(
            core.step(),
            StepEvent::Fault(Fault::IllegalInstruction { pc: 0, instr: 0 })
        );
        assert_eq!(core.pc(), 0);
        assert_eq!(core.instret(), 0);
        assert_eq!(core.cycles(), 1);

        core.set_pc(0x2000);
        assert_eq!(core.step(), StepEvent::Fault(Fault::FetchFault(0x2000)));

        core.set_pc(2);
        assert_eq!(core.step(), StepEvent::Fault(Fault::FetchMisaligned(2)));
    }

    #[test]
    fn x0_is_hardwired() {
        let mut core = Rv32Core::new(TEST_CONFIG).unwrap();
        core.set_reg(0, 0xffff_ffff);
        assert_eq!(core.reg(0), 0);
        core.set_reg(5, 42);
        assert_eq!(core.reg(5), 42);
    }
}
