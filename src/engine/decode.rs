//! Instruction field extraction for 32-bit RISC-V encodings.

pub const OPCODE_LOAD: u32 = 0x03;
pub const OPCODE_MISC_MEM: u32 = 0x0f;
pub const OPCODE_OP_IMM: u32 = 0x13;
pub const OPCODE_AUIPC: u32 = 0x17;
pub const OPCODE_STORE: u32 = 0x23;
pub const OPCODE_OP: u32 = 0x33;
pub const OPCODE_LUI: u32 = 0x37;
pub const OPCODE_BRANCH: u32 = 0x63;
pub const OPCODE_JALR: u32 = 0x67;
pub const OPCODE_JAL: u32 = 0x6f;
pub const OPCODE_SYSTEM: u32 = 0x73;

pub const INSTR_ECALL: u32 = 0x0000_0073;
pub const INSTR_EBREAK: u32 = 0x0010_0073;

#[inline]
pub fn opcode(instr: u32) -> u32 {
    instr & 0x7f
}

#[inline]
pub fn rd(instr: u32) -> usize {
    ((instr >> 7) & 0x1f) as usize
}

#[inline]
pub fn rs1(instr: u32) -> usize {
    ((instr >> 15) & 0x1f) as usize
}

#[inline]
pub fn rs2(instr: u32) -> usize {
    ((instr >> 20) & 0x1f) as usize
}

#[inline]
pub fn funct3(instr: u32) -> u32 {
    (instr >> 12) & 0x7
}

#[inline]
pub fn funct7(instr: u32) -> u32 {
    (instr >> 25) & 0x7f
}

/// I-type immediate, bits [31:20] sign-extended.
#[inline]
pub fn i_imm(instr: u32) -> i32 {
    (instr as i32) >> 20
}

/// S-type immediate, bits [31:25] | [11:7] sign-extended.
#[inline]
pub fn s_imm(instr: u32) -> i32 {
    let imm = ((instr >> 25) << 5) | ((instr >> 7) & 0x1f);
    ((imm as i32) << 20) >> 20
}

/// B-type immediate, sign-extended from 13 bits.
#[inline]
pub fn b_imm(instr: u32) -> i32 {
    let imm = (((instr >> 31) & 0x1) << 12)
        | (((instr >> 7) & 0x1) << 11)
        | (((instr >> 25) & 0x3f) << 5)
        | (((instr >> 8) & 0xf) << 1);
    ((imm as i32) << 19) >> 19
}

/// U-type immediate, bits [31:12] << 12.
#[inline]
pub fn u_imm(instr: u32) -> i32 {
    (instr & 0xffff_f000) as i32
}

/// J-type immediate, sign-extended from 21 bits.
#[inline]
pub fn j_imm(instr: u32) -> i32 {
    let imm = (((instr >> 31) & 0x1) << 20)
        | (((instr >> 12) & 0xff) << 12)
        | (((instr >> 20) & 0x1) << 11)
        | (((instr >> 21) & 0x3ff) << 1);
    ((imm as i32) << 11) >> 11
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addi_fields() {
        // addi a0, zero, -1
        let instr = 0xfff0_0513;
        assert_eq!(opcode(instr), OPCODE_OP_IMM);
        assert_eq!(rd(instr), 10);
        assert_eq!(rs1(instr), 0);
        assert_eq!(funct3(instr), 0);
        assert_eq!(i_imm(instr), -1);
    }

    #[test]
    fn branch_and_jump_offsets() {
        // beq zero, zero, -8
        assert_eq!(b_imm(0xfe00_0ce3), -8);
        // jal zero, 16
        assert_eq!(j_imm(0x0100_006f), 16);
        // sw a1, 12(a0)
        assert_eq!(s_imm(0x00b5_2623), 12);
        // lui a0, 0x12345
        assert_eq!(u_imm(0x1234_5537), 0x1234_5000);
    }
}
