//! Pipelined datapath with a forwarding unit feeding both ALU operands.

use super::{
    pipelined::{build_stages, Geometry},
    Builder, KeyUnits,
};
use crate::{
    error::SimError,
    units::{
        clocked::{ex_mem, id_ex, mem_wb},
        control::forwarding,
        logic::{alu, mux, mux3, unary},
        Unit,
    },
};

const GEOMETRY: Geometry = Geometry {
    pc: (7, 74),
    imem: (19, 66),
    pc_src: (125, 19),
    control: (77, 130),
    add4: (26, 115),
    regs: (67, 68),
    sign_ext: (84, 39),
    alu_src: (147, 63),
    shift: (133, 105),
    branch_add: (147, 107),
    alu: (157, 65),
    alu_ctl: (158, 36),
    dmem: (192, 57),
    gate: (194, 107),
    reg_dst: (51, 145),
    mem_to_reg: (238, 73),
    if_id: ((50, 18), (5, 120)),
    id_ex: ((103, 18), (5, 140)),
    ex_mem: ((177, 18), (5, 140)),
    mem_wb: ((224, 18), (5, 120)),
};

pub(super) fn build(b: &mut Builder) -> Result<KeyUnits, SimError> {
    let s = build_stages(b, &GEOMETRY)?;
    let fwd = b.unit("Forwarding Unit", Unit::Forwarding, 2, (132, 9), (30, 10));
    let mux_b = b.unit("MUX", Unit::Mux3, 2, (132, 49), (5, 15));
    let mux_a = b.unit("MUX", Unit::Mux3, 2, (132, 78), (5, 15));

    b.wire(s.inst, unary::OUT, s.id_ex, id_ex::RS_IN)?;
    b.wire(s.id_ex, id_ex::RS, fwd, forwarding::READ_REG1)?;
    b.wire(s.id_ex, id_ex::RT, fwd, forwarding::READ_REG2)?;
    b.wire(s.ex_mem, ex_mem::WRITE_REG, fwd, forwarding::EXMEM_REG)?;
    b.wire(s.mem_wb, mem_wb::WRITE_REG, fwd, forwarding::MEMWB_REG)?;

    for (m, reg_data, select) in [
        (mux_a, id_ex::READ_DATA1, forwarding::MUX_A),
        (mux_b, id_ex::READ_DATA2, forwarding::MUX_B),
    ] {
        b.wire(s.id_ex, reg_data, m, mux3::IN0)?;
        b.wire(s.mem_to_reg, mux::OUT, m, mux3::IN1)?;
        b.wire(s.ex_mem, ex_mem::ALU_RESULT, m, mux3::IN2)?;
        b.wire(fwd, select, m, mux3::CTRL)?;
    }
    b.wire(mux_a, mux3::OUT, s.alu, alu::A)?;
    b.wire(mux_b, mux3::OUT, s.alu_src, mux::IN0)?;
    b.wire(mux_b, mux3::OUT, s.ex_mem, ex_mem::WRITE_DATA_IN)?;
    Ok(s.keys)
}
