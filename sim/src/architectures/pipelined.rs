//! Five-stage pipelined datapath without forwarding. The forwarding layout
//! reuses [`build_stages`] and only differs in how the ALU operands reach the
//! execute stage.

use super::{Builder, KeyUnits};
use crate::{
    error::SimError,
    framework::ComponentId,
    units::{
        clocked::{ex_mem, id_ex, if_id, mem_wb, pc},
        control::{alu_control, pipe_control},
        logic::{alu, and_gate, mux, unary},
        memory::{dmem, imem, regfile},
        LatchKind, PipelineLatch, ProgramCounter, Unit,
    },
};

type Rect = ((u32, u32), (u32, u32));

/// Screen placement of every unit of a pipelined layout.
pub(super) struct Geometry {
    pub pc: (u32, u32),
    pub imem: (u32, u32),
    pub pc_src: (u32, u32),
    pub control: (u32, u32),
    pub add4: (u32, u32),
    pub regs: (u32, u32),
    pub sign_ext: (u32, u32),
    pub alu_src: (u32, u32),
    pub shift: (u32, u32),
    pub branch_add: (u32, u32),
    pub alu: (u32, u32),
    pub alu_ctl: (u32, u32),
    pub dmem: (u32, u32),
    pub gate: (u32, u32),
    pub reg_dst: (u32, u32),
    pub mem_to_reg: (u32, u32),
    pub if_id: Rect,
    pub id_ex: Rect,
    pub ex_mem: Rect,
    pub mem_wb: Rect,
}

const GEOMETRY: Geometry = Geometry {
    pc: (8, 66),
    imem: (21, 58),
    pc_src: (132, 13),
    control: (74, 119),
    add4: (29, 101),
    regs: (82, 60),
    sign_ext: (97, 30),
    alu_src: (133, 55),
    shift: (139, 91),
    branch_add: (153, 93),
    alu: (150, 57),
    alu_ctl: (151, 33),
    dmem: (189, 49),
    gate: (193, 91),
    reg_dst: (54, 149),
    mem_to_reg: (236, 65),
    if_id: ((54, 11), (5, 120)),
    id_ex: ((117, 10), (5, 140)),
    ex_mem: ((174, 10), (5, 140)),
    mem_wb: ((221, 10), (5, 120)),
};

/// Units whose operand wiring is left to the caller.
pub(super) struct Stages {
    pub keys: KeyUnits,
    pub inst: ComponentId,
    pub id_ex: ComponentId,
    pub ex_mem: ComponentId,
    pub mem_wb: ComponentId,
    pub alu: ComponentId,
    pub alu_src: ComponentId,
    pub mem_to_reg: ComponentId,
}

/// Build and wire all five stages except the ALU's first operand, the
/// ALUSrc mux's register input and the store data input of EX/MEM.
pub(super) fn build_stages(b: &mut Builder, g: &Geometry) -> Result<Stages, SimError> {
    let t = b.timing;
    let (imem_unit, regs_unit, dmem_unit) = b.memories();
    let latch = |kind| Unit::Latch(PipelineLatch::new(kind, t.latch_delay));

    let pc_unit = ProgramCounter::new(t.pc_delay, t.pc_store, t.pc_update);
    let pc = b.unit("PC", Unit::ProgramCounter(pc_unit), 0, g.pc, (5, 8));
    let im = b.unit("Instruction Memory", imem_unit, 0, g.imem, (25, 25));
    let pc_src = b.unit("MUX", Unit::Mux, 0, g.pc_src, (5, 15));
    let add4 = b.adder(0, g.add4, Some(4))?;

    let (pos, size) = g.if_id;
    let if_id = b.unit("IF/ID", latch(LatchKind::IfId), 1, pos, size);
    let control = b.unit("Control", Unit::PipelinedControl, 1, g.control, (16, 34));
    let regs = b.unit("Registers", regs_unit, 1, g.regs, (25, 25));
    let sign_ext = b.unit("Sign Extend", Unit::SignExtend, 1, g.sign_ext, (9, 15));

    let (pos, size) = g.id_ex;
    let id_ex = b.unit("ID/EX", latch(LatchKind::IdEx), 2, pos, size);
    let alu_src = b.unit("MUX", Unit::Mux, 2, g.alu_src, (5, 15));
    let shift = b.unit("Shift Left 2", Unit::ShiftLeft2, 2, g.shift, (9, 15));
    let branch_add = b.adder(2, g.branch_add, None)?;
    let alu = b.unit("ALU", Unit::Alu, 2, g.alu, (10, 25));
    let alu_ctl = b.unit("ALU Control", Unit::AluControl, 2, g.alu_ctl, (9, 15));
    let reg_dst = b.unit("MUX", Unit::Mux, 2, g.reg_dst, (5, 15));

    let (pos, size) = g.ex_mem;
    let ex_mem = b.unit("EX/MEM", latch(LatchKind::ExMem), 3, pos, size);
    let dm = b.unit("Data Memory", dmem_unit, 3, g.dmem, (25, 25));
    let gate = b.unit("AND", Unit::AndGate, 3, g.gate, (8, 5));

    let (pos, size) = g.mem_wb;
    let mem_wb = b.unit("MEM/WB", latch(LatchKind::MemWb), 4, pos, size);
    let mem_to_reg = b.unit("MUX", Unit::Mux, 4, g.mem_to_reg, (5, 15));

    // fetch
    b.wire(pc, pc::ADDR, im, imem::ADDR)?;
    b.wire(pc, pc::ADDR, add4, alu::A)?;
    b.wire(add4, alu::RESULT, pc_src, mux::IN0)?;
    b.wire(add4, alu::RESULT, if_id, if_id::PC4_IN)?;
    b.wire(im, imem::INST, if_id, if_id::INST_IN)?;
    b.wire(ex_mem, ex_mem::BRANCH_TARGET, pc_src, mux::IN1)?;
    b.wire(gate, and_gate::OUT, pc_src, mux::CTRL)?;
    b.wire(pc_src, mux::OUT, pc, pc::NEXT)?;

    // decode
    let inst = b.junction(if_id, if_id::INST, 1)?;
    b.wire(inst, unary::OUT, regs, regfile::READ_REG1)?;
    b.wire(inst, unary::OUT, regs, regfile::READ_REG2)?;
    b.wire(inst, unary::OUT, control, pipe_control::OPCODE)?;
    b.wire(inst, unary::OUT, sign_ext, unary::IN)?;
    b.wire(inst, unary::OUT, id_ex, id_ex::RT_IN)?;
    b.wire(inst, unary::OUT, id_ex, id_ex::RD_IN)?;
    b.wire(if_id, if_id::PC4, id_ex, id_ex::PC4_IN)?;
    b.wire(regs, regfile::READ_DATA1, id_ex, id_ex::READ_DATA1_IN)?;
    b.wire(regs, regfile::READ_DATA2, id_ex, id_ex::READ_DATA2_IN)?;
    b.wire(sign_ext, unary::OUT, id_ex, id_ex::IMM_IN)?;
    b.wire(control, pipe_control::WB, id_ex, id_ex::WB_IN)?;
    b.wire(control, pipe_control::MEM, id_ex, id_ex::MEM_IN)?;
    b.wire(control, pipe_control::EX, id_ex, id_ex::EX_IN)?;

    // execute
    b.wire(id_ex, id_ex::RT, reg_dst, mux::IN0)?;
    b.wire(id_ex, id_ex::RD, reg_dst, mux::IN1)?;
    b.wire(id_ex, id_ex::REG_DST, reg_dst, mux::CTRL)?;
    b.wire(reg_dst, mux::OUT, ex_mem, ex_mem::WRITE_REG_IN)?;
    b.wire(id_ex, id_ex::IMM, alu_ctl, alu_control::FUNCT)?;
    b.wire(id_ex, id_ex::IMM, shift, unary::IN)?;
    b.wire(id_ex, id_ex::IMM, alu_src, mux::IN1)?;
    b.wire(id_ex, id_ex::PC4, branch_add, alu::A)?;
    b.wire(shift, unary::OUT, branch_add, alu::B)?;
    b.wire(branch_add, alu::RESULT, ex_mem, ex_mem::BRANCH_TARGET_IN)?;
    b.wire(id_ex, id_ex::ALU_SRC, alu_src, mux::CTRL)?;
    b.wire(id_ex, id_ex::ALU_OP, alu_ctl, alu_control::ALU_OP)?;
    b.wire(alu_ctl, alu_control::OUT, alu, alu::CTRL)?;
    b.wire(alu_src, mux::OUT, alu, alu::B)?;
    b.wire(alu, alu::RESULT, ex_mem, ex_mem::ALU_RESULT_IN)?;
    b.wire(alu, alu::ZERO, ex_mem, ex_mem::ZERO_IN)?;
    b.wire(id_ex, id_ex::MEM, ex_mem, ex_mem::MEM_IN)?;
    b.wire(id_ex, id_ex::WB, ex_mem, ex_mem::WB_IN)?;

    // memory
    b.wire(ex_mem, ex_mem::WRITE_REG, mem_wb, mem_wb::WRITE_REG_IN)?;
    b.wire(ex_mem, ex_mem::WRITE_DATA, dm, dmem::WRITE_DATA)?;
    b.wire(ex_mem, ex_mem::ZERO, gate, and_gate::IN1)?;
    b.wire(ex_mem, ex_mem::BRANCH, gate, and_gate::IN0)?;
    b.wire(ex_mem, ex_mem::ALU_RESULT, dm, dmem::ADDR)?;
    b.wire(ex_mem, ex_mem::ALU_RESULT, mem_wb, mem_wb::ALU_RESULT_IN)?;
    b.wire(ex_mem, ex_mem::MEM_WRITE, dm, dmem::MEM_WRITE)?;
    b.wire(ex_mem, ex_mem::MEM_READ, dm, dmem::MEM_READ)?;
    b.wire(ex_mem, ex_mem::WB, mem_wb, mem_wb::WB_IN)?;
    b.wire(dm, dmem::READ_DATA, mem_wb, mem_wb::READ_DATA_IN)?;

    // write back
    b.wire(mem_wb, mem_wb::WRITE_REG, regs, regfile::WRITE_REG)?;
    b.wire(mem_wb, mem_wb::REG_WRITE, regs, regfile::REG_WRITE)?;
    b.wire(mem_wb, mem_wb::READ_DATA, mem_to_reg, mux::IN1)?;
    b.wire(mem_wb, mem_wb::ALU_RESULT, mem_to_reg, mux::IN0)?;
    b.wire(mem_wb, mem_wb::MEM_TO_REG, mem_to_reg, mux::CTRL)?;
    b.wire(mem_to_reg, mux::OUT, regs, regfile::WRITE_DATA)?;

    Ok(Stages {
        keys: KeyUnits {
            pc,
            imem: im,
            regs,
            dmem: dm,
            branch_gate: gate,
            if_id: Some(if_id),
        },
        inst,
        id_ex,
        ex_mem,
        mem_wb,
        alu,
        alu_src,
        mem_to_reg,
    })
}

pub(super) fn build(b: &mut Builder) -> Result<KeyUnits, SimError> {
    let s = build_stages(b, &GEOMETRY)?;
    b.wire(s.id_ex, id_ex::READ_DATA1, s.alu, alu::A)?;
    b.wire(s.id_ex, id_ex::READ_DATA2, s.alu_src, mux::IN0)?;
    b.wire(s.id_ex, id_ex::READ_DATA2, s.ex_mem, ex_mem::WRITE_DATA_IN)?;
    Ok(s.keys)
}
