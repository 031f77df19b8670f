//! Single-cycle datapath: one instruction per clock, no latches.

use super::{Builder, KeyUnits};
use crate::{
    error::SimError,
    isa::field,
    units::{
        clocked::pc,
        control::{alu_control, main_control},
        logic::{alu, and_gate, mux, unary},
        memory::{dmem, imem, regfile},
        ProgramCounter, Unit,
    },
};

pub(super) fn build(b: &mut Builder) -> Result<KeyUnits, SimError> {
    let t = b.timing;
    let (imem_unit, regs_unit, dmem_unit) = b.memories();

    // stage 0: fetch
    let pc_unit = ProgramCounter::new(t.pc_delay, t.pc_store, t.pc_update);
    let pc = b.unit("PC", Unit::ProgramCounter(pc_unit), 0, (6, 67), (5, 8));
    let im = b.unit("Instruction Memory", imem_unit, 0, (23, 59), (25, 25));
    let pc_src = b.unit("MUX", Unit::Mux, 0, (75, 47), (5, 15));
    let add4 = b.adder(0, (30, 137), Some(4))?;

    // stage 1: decode
    let control = b.unit("Control", Unit::MainControl, 1, (69, 90), (16, 34));
    let regs = b.unit("Registers", regs_unit, 1, (91, 59), (25, 25));
    let sign_ext = b.unit("Sign Extend", Unit::SignExtend, 1, (107, 35), (9, 15));

    // stage 2: execute
    let alu_src = b.unit("MUX", Unit::Mux, 2, (141, 42), (5, 15));
    let shift = b.unit("Shift Left 2", Unit::ShiftLeft2, 2, (129, 127), (9, 15));
    let branch_add = b.adder(2, (155, 129), None)?;
    let alu = b.unit("ALU", Unit::Alu, 2, (152, 44), (10, 25));
    let alu_ctl = b.unit("ALU Control", Unit::AluControl, 2, (153, 22), (9, 15));
    let reg_dst = b.unit("MUX", Unit::Mux, 2, (183, 137), (5, 15));

    // stage 3: memory
    let dm = b.unit("Data Memory", dmem_unit, 3, (178, 36), (25, 25));
    let gate = b.unit("AND", Unit::AndGate, 3, (177, 118), (8, 5));

    // stage 4: write back
    let mem_to_reg = b.unit("MUX", Unit::Mux, 4, (212, 52), (5, 15));

    b.wire(pc, pc::ADDR, im, imem::ADDR)?;
    b.wire(pc, pc::ADDR, add4, alu::A)?;
    b.wire(add4, alu::RESULT, pc_src, mux::IN0)?;
    b.wire(add4, alu::RESULT, branch_add, alu::A)?;

    let inst = b.junction(im, imem::INST, 0)?;
    b.wire(inst, unary::OUT, control, main_control::OPCODE)?;
    b.wire(inst, unary::OUT, regs, regfile::READ_REG1)?;
    b.wire(inst, unary::OUT, regs, regfile::READ_REG2)?;
    b.wire_field(inst, unary::OUT, reg_dst, mux::IN0, field::RT)?;
    b.wire_field(inst, unary::OUT, reg_dst, mux::IN1, field::RD)?;
    b.wire(inst, unary::OUT, sign_ext, unary::IN)?;
    b.wire(inst, unary::OUT, alu_ctl, alu_control::FUNCT)?;

    b.wire(control, main_control::REG_DST, reg_dst, mux::CTRL)?;
    b.wire(control, main_control::BRANCH, gate, and_gate::IN0)?;
    b.wire(control, main_control::MEM_TO_REG, mem_to_reg, mux::CTRL)?;
    b.wire(control, main_control::MEM_READ, dm, dmem::MEM_READ)?;
    b.wire(control, main_control::ALU_OP, alu_ctl, alu_control::ALU_OP)?;
    b.wire(control, main_control::MEM_WRITE, dm, dmem::MEM_WRITE)?;
    b.wire(control, main_control::ALU_SRC, alu_src, mux::CTRL)?;
    b.wire(control, main_control::REG_WRITE, regs, regfile::REG_WRITE)?;

    b.wire(reg_dst, mux::OUT, regs, regfile::WRITE_REG)?;
    b.wire(regs, regfile::READ_DATA1, alu, alu::A)?;
    b.wire(regs, regfile::READ_DATA2, alu_src, mux::IN0)?;
    b.wire(regs, regfile::READ_DATA2, dm, dmem::WRITE_DATA)?;
    b.wire(sign_ext, unary::OUT, alu_src, mux::IN1)?;
    b.wire(sign_ext, unary::OUT, shift, unary::IN)?;
    b.wire(shift, unary::OUT, branch_add, alu::B)?;

    b.wire(alu_src, mux::OUT, alu, alu::B)?;
    b.wire(alu_ctl, alu_control::OUT, alu, alu::CTRL)?;
    b.wire(alu, alu::RESULT, dm, dmem::ADDR)?;
    b.wire(alu, alu::RESULT, mem_to_reg, mux::IN0)?;
    b.wire(alu, alu::ZERO, gate, and_gate::IN1)?;

    b.wire(dm, dmem::READ_DATA, mem_to_reg, mux::IN1)?;
    b.wire(mem_to_reg, mux::OUT, regs, regfile::WRITE_DATA)?;

    b.wire(branch_add, alu::RESULT, pc_src, mux::IN1)?;
    b.wire(gate, and_gate::OUT, pc_src, mux::CTRL)?;
    b.wire(pc_src, mux::OUT, pc, pc::NEXT)?;

    Ok(KeyUnits {
        pc,
        imem: im,
        regs,
        dmem: dm,
        branch_gate: gate,
        if_id: None,
    })
}
