//! Combinational units: multiplexers, ALU, AND gate, sign extender and
//! shifter.

use super::StepContext;
use crate::{
    error::SimError,
    framework::Ports,
    isa::{arithmetic_compute, define_code, sign_extend},
};

define_code! {
    @mod mux;
    @type u8;
    IN0 = 0;
    IN1 = 1;
    CTRL = 2;
    OUT = 3;
}

define_code! {
    @mod mux3;
    @type u8;
    IN0 = 0;
    IN1 = 1;
    IN2 = 2;
    CTRL = 3;
    OUT = 4;
}

define_code! {
    @mod alu;
    @type u8;
    A = 0;
    B = 1;
    CTRL = 2;
    RESULT = 3;
    ZERO = 4;
}

define_code! {
    @mod and_gate;
    @type u8;
    IN0 = 0;
    IN1 = 1;
    OUT = 2;
}

// sign extend, shift left 2 and the junction share this shape
define_code! {
    @mod unary;
    @type u8;
    IN = 0;
    OUT = 1;
}

pub fn step_mux(io: &mut Ports<'_>) {
    let out = if io.get(mux::CTRL) != 0 {
        io.get(mux::IN1)
    } else {
        io.get(mux::IN0)
    };
    io.set(mux::OUT, out);
}

/// Invalid selectors leave the output as it was.
pub fn step_mux3(io: &mut Ports<'_>, ctx: &StepContext) -> Result<(), SimError> {
    let selector = io.get(mux3::CTRL);
    match selector {
        0..=2 => {
            let v = io.get(mux3::IN0 + selector as u8);
            io.set(mux3::OUT, v);
            Ok(())
        }
        _ => ctx.recover(SimError::InvalidSelector {
            component: io.id().index(),
            selector,
        }),
    }
}

/// Unknown operation codes leave both outputs as they were.
pub fn step_alu(io: &mut Ports<'_>, ctx: &StepContext) -> Result<(), SimError> {
    let code = io.get(alu::CTRL);
    match arithmetic_compute(io.get(alu::A), io.get(alu::B), code) {
        Some(e) => {
            io.set(alu::RESULT, e);
            io.set(alu::ZERO, (e == 0) as u32);
            Ok(())
        }
        None => ctx.recover(SimError::UnknownAluCode {
            component: io.id().index(),
            code,
        }),
    }
}

pub fn step_and_gate(io: &mut Ports<'_>) {
    let v = io.get(and_gate::IN0) & io.get(and_gate::IN1);
    io.set(and_gate::OUT, v);
}

pub fn step_sign_extend(io: &mut Ports<'_>) {
    let v = sign_extend(io.get(unary::IN));
    io.set(unary::OUT, v);
}

pub fn step_shift_left2(io: &mut Ports<'_>) {
    let v = io.get(unary::IN).wrapping_shl(2);
    io.set(unary::OUT, v);
}
