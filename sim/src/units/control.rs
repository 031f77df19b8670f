//! Control decoders and the forwarding unit.

use super::StepContext;
use crate::{
    error::SimError,
    framework::Ports,
    isa::{alu_code, define_code, funct_code, op_code},
};

define_code! {
    @mod main_control;
    @type u8;
    OPCODE = 0;
    BRANCH = 1;
    MEM_TO_REG = 2;
    MEM_READ = 3;
    ALU_OP = 4;
    MEM_WRITE = 5;
    ALU_SRC = 6;
    REG_WRITE = 7;
    REG_DST = 8;
}

define_code! {
    @mod pipe_control;
    @type u8;
    OPCODE = 0;
    WB = 1;
    MEM = 2;
    EX = 3;
}

define_code! {
    @mod alu_control;
    @type u8;
    ALU_OP = 0;
    FUNCT = 1;
    OUT = 2;
}

define_code! {
    @mod forwarding;
    @type u8;
    READ_REG2 = 0;
    READ_REG1 = 1;
    MEMWB_REG = 2;
    EXMEM_REG = 3;
    MUX_B = 4;
    MUX_A = 5;
}

// selector values produced by the forwarding unit
define_code! {
    @mod forward_src;
    @type u32;
    REGISTER = 0;
    MEM_WB = 1;
    EX_MEM = 2;
}

/// Control signals decoded from the opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlBundle {
    pub reg_dst: u32,
    pub branch: u32,
    pub mem_to_reg: u32,
    pub mem_read: u32,
    /// 2 bits
    pub alu_op: u32,
    pub mem_write: u32,
    pub alu_src: u32,
    pub reg_write: u32,
}

impl ControlBundle {
    pub fn lookup(opcode: u32) -> Option<Self> {
        // (RegDst, Branch, MemToReg, MemRead, ALUOp, MemWrite, ALUSrc, RegWrite)
        let t = match opcode {
            op_code::RTYPE => (1, 0, 0, 0, 2, 0, 0, 1),
            op_code::BEQ => (0, 1, 0, 0, 1, 0, 0, 0),
            op_code::ADDI => (0, 0, 0, 0, 0, 0, 1, 1),
            op_code::LW => (0, 0, 1, 1, 0, 0, 1, 1),
            op_code::SW => (0, 0, 0, 0, 0, 1, 1, 0),
            _ => return None,
        };
        Some(Self {
            reg_dst: t.0,
            branch: t.1,
            mem_to_reg: t.2,
            mem_read: t.3,
            alu_op: t.4,
            mem_write: t.5,
            alu_src: t.6,
            reg_write: t.7,
        })
    }

    // The three packings below and the unpack functions must change together.

    /// `RegWrite * 2 + MemToReg`
    pub fn pack_wb(&self) -> u32 {
        self.reg_write * 2 + self.mem_to_reg
    }

    /// `MemRead * 4 + MemWrite * 2 + Branch`
    pub fn pack_mem(&self) -> u32 {
        self.mem_read * 4 + self.mem_write * 2 + self.branch
    }

    /// `RegDst * 8 + ALUOp * 2 + ALUSrc`
    pub fn pack_ex(&self) -> u32 {
        self.reg_dst * 8 + self.alu_op * 2 + self.alu_src
    }
}

/// `(RegDst, ALUOp, ALUSrc)`
pub fn unpack_ex(ex: u32) -> (u32, u32, u32) {
    ((ex >> 3) & 1, (ex >> 1) & 3, ex & 1)
}

/// `(MemRead, MemWrite, Branch)`
pub fn unpack_mem(mem: u32) -> (u32, u32, u32) {
    ((mem >> 2) & 1, (mem >> 1) & 1, mem & 1)
}

/// `(RegWrite, MemToReg)`
pub fn unpack_wb(wb: u32) -> (u32, u32) {
    ((wb >> 1) & 1, wb & 1)
}

fn decode(io: &Ports<'_>, ctx: &StepContext, opcode: u32) -> Result<ControlBundle, SimError> {
    match ControlBundle::lookup(opcode) {
        Some(bundle) => Ok(bundle),
        None => {
            ctx.recover(SimError::UnknownOpcode {
                component: io.id().index(),
                opcode,
            })?;
            Ok(ControlBundle::default())
        }
    }
}

pub fn step_main_control(io: &mut Ports<'_>, ctx: &StepContext) -> Result<(), SimError> {
    use main_control::*;
    let b = decode(io, ctx, io.get(OPCODE))?;
    io.set(BRANCH, b.branch);
    io.set(MEM_TO_REG, b.mem_to_reg);
    io.set(MEM_READ, b.mem_read);
    io.set(ALU_OP, b.alu_op);
    io.set(MEM_WRITE, b.mem_write);
    io.set(ALU_SRC, b.alu_src);
    io.set(REG_WRITE, b.reg_write);
    io.set(REG_DST, b.reg_dst);
    Ok(())
}

pub fn step_pipe_control(io: &mut Ports<'_>, ctx: &StepContext) -> Result<(), SimError> {
    use pipe_control::*;
    let b = decode(io, ctx, io.get(OPCODE))?;
    io.set(WB, b.pack_wb());
    io.set(MEM, b.pack_mem());
    io.set(EX, b.pack_ex());
    Ok(())
}

/// ALU operation for a register-format function code. Codes outside the
/// table (the all-zero `NOP` among them) select AND.
fn funct_to_alu(funct: u32) -> u32 {
    match funct {
        funct_code::ADD => alu_code::ADD,
        funct_code::SUB => alu_code::SUB,
        funct_code::AND => alu_code::AND,
        funct_code::OR => alu_code::OR,
        funct_code::SLT => alu_code::SLT,
        _ => alu_code::AND,
    }
}

pub fn step_alu_control(io: &mut Ports<'_>, ctx: &StepContext) -> Result<(), SimError> {
    use alu_control::*;
    let alu_op = io.get(ALU_OP);
    let code = match alu_op {
        0 => alu_code::ADD,
        1 => alu_code::SUB,
        2 => funct_to_alu(io.get(FUNCT)),
        _ => {
            ctx.recover(SimError::InvalidAluOp {
                component: io.id().index(),
                alu_op,
            })?;
            alu_code::AND
        }
    };
    io.set(OUT, code);
    Ok(())
}

/// Forwarding source for one read register. Register 0 is never forwarded;
/// a match in EX/MEM wins over MEM/WB.
pub fn forward_select(read: u32, exmem: u32, memwb: u32) -> u32 {
    if read == 0 {
        forward_src::REGISTER
    } else if read == exmem {
        forward_src::EX_MEM
    } else if read == memwb {
        forward_src::MEM_WB
    } else {
        forward_src::REGISTER
    }
}

pub fn step_forwarding(io: &mut Ports<'_>) {
    use forwarding::*;
    let exmem = io.get(EXMEM_REG);
    let memwb = io.get(MEMWB_REG);
    let a = forward_select(io.get(READ_REG1), exmem, memwb);
    let b = forward_select(io.get(READ_REG2), exmem, memwb);
    io.set(MUX_A, a);
    io.set(MUX_B, b);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_select() {
        assert_eq!(forward_select(5, 5, 3), 2);
        assert_eq!(forward_select(0, 0, 0), 0);
        assert_eq!(forward_select(3, 5, 3), 1);
        assert_eq!(forward_select(4, 4, 4), 2);
        assert_eq!(forward_select(7, 5, 3), 0);
    }

    #[test]
    fn test_lookup_table() {
        let r = ControlBundle::lookup(op_code::RTYPE).unwrap();
        assert_eq!((r.reg_dst, r.alu_op, r.reg_write), (1, 2, 1));
        let lw = ControlBundle::lookup(op_code::LW).unwrap();
        assert_eq!((lw.mem_to_reg, lw.mem_read, lw.alu_src), (1, 1, 1));
        let sw = ControlBundle::lookup(op_code::SW).unwrap();
        assert_eq!((sw.mem_write, sw.reg_write), (1, 0));
        let beq = ControlBundle::lookup(op_code::BEQ).unwrap();
        assert_eq!((beq.branch, beq.alu_op), (1, 1));
        assert_eq!(ControlBundle::lookup(2), None);
    }

    /// Packing and unpacking are coupled: every opcode must survive the trip
    /// through the latches.
    #[test]
    fn test_pack_unpack_lockstep() {
        for op in [op_code::RTYPE, op_code::BEQ, op_code::ADDI, op_code::LW, op_code::SW] {
            let b = ControlBundle::lookup(op).unwrap();
            assert_eq!(unpack_ex(b.pack_ex()), (b.reg_dst, b.alu_op, b.alu_src));
            assert_eq!(
                unpack_mem(b.pack_mem()),
                (b.mem_read, b.mem_write, b.branch)
            );
            assert_eq!(unpack_wb(b.pack_wb()), (b.reg_write, b.mem_to_reg));
        }
        let r = ControlBundle::lookup(op_code::RTYPE).unwrap();
        assert_eq!((r.pack_wb(), r.pack_mem(), r.pack_ex()), (2, 0, 12));
        let lw = ControlBundle::lookup(op_code::LW).unwrap();
        assert_eq!((lw.pack_wb(), lw.pack_mem(), lw.pack_ex()), (3, 4, 1));
    }

    #[test]
    fn test_funct_table() {
        assert_eq!(funct_to_alu(funct_code::SLT), alu_code::SLT);
        assert_eq!(funct_to_alu(funct_code::OR), alu_code::OR);
        assert_eq!(funct_to_alu(0), alu_code::AND);
    }
}
