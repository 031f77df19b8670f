//! The closed set of datapath components.
//!
//! Each variant carries its own private state and is evaluated through
//! [`Unit::step`], which recomputes its outputs from the input values
//! currently stored in its links.
pub mod clocked;
pub mod control;
pub mod logic;
pub mod memory;

use std::fmt::Display;

pub use clocked::{LatchKind, PipelineLatch, ProgramCounter};
pub use control::ControlBundle;
pub use memory::{DataMemory, Memory, RegisterFile};

use crate::{
    config::ErrorPolicy,
    error::SimError,
    framework::{Direction, Ports},
    isa::{field, BitField},
};

/// Settings a unit needs while stepping.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub policy: ErrorPolicy,
}

impl StepContext {
    /// Apply the error policy to a recoverable control-input error.
    pub fn recover(&self, err: SimError) -> Result<(), SimError> {
        match self.policy {
            ErrorPolicy::Strict => Err(err),
            ErrorPolicy::Permissive => {
                tracing::warn!("{err}, keeping fallback output");
                Ok(())
            }
        }
    }
}

/// Type tag of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum UnitKind {
    Mux,
    Mux3,
    MainControl,
    PipelinedControl,
    AluControl,
    SignExtend,
    ShiftLeft2,
    InstructionMemory,
    RegisterFile,
    DataMemory,
    Alu,
    AndGate,
    ProgramCounter,
    Latch(LatchKind),
    Forwarding,
    Junction,
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Latch(kind) => write!(f, "Latch({})", kind.name()),
            _ => write!(f, "{self:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Unit {
    Mux,
    Mux3,
    MainControl,
    PipelinedControl,
    AluControl,
    SignExtend,
    ShiftLeft2,
    InstructionMemory(Memory),
    RegisterFile(RegisterFile),
    DataMemory(DataMemory),
    Alu,
    AndGate,
    ProgramCounter(ProgramCounter),
    Latch(PipelineLatch),
    Forwarding,
    /// Zero-delay fan-out point. Never stepped; its output reads straight
    /// through to its source.
    Junction,
}

/// One link slot of a unit.
#[derive(Debug, Clone, Copy)]
pub struct Port {
    pub slot: u8,
    pub direction: Direction,
    /// default bit field for inputs that only look at part of a word
    pub field: Option<BitField>,
}

const fn i(slot: u8) -> Port {
    Port {
        slot,
        direction: Direction::Input,
        field: None,
    }
}

const fn i_field(slot: u8, field: BitField) -> Port {
    Port {
        slot,
        direction: Direction::Input,
        field: Some(field),
    }
}

const fn o(slot: u8) -> Port {
    Port {
        slot,
        direction: Direction::Output,
        field: None,
    }
}

const MUX_PORTS: [Port; 4] = [i(0), i(1), i(2), o(3)];
const MUX3_PORTS: [Port; 5] = [i(0), i(1), i(2), i(3), o(4)];
const MAIN_CONTROL_PORTS: [Port; 9] = [
    i_field(0, field::OPCODE),
    o(1),
    o(2),
    o(3),
    o(4),
    o(5),
    o(6),
    o(7),
    o(8),
];
const PIPE_CONTROL_PORTS: [Port; 4] = [i_field(0, field::OPCODE), o(1), o(2), o(3)];
const ALU_CONTROL_PORTS: [Port; 3] = [i(0), i_field(1, field::FUNCT), o(2)];
const SIGN_EXTEND_PORTS: [Port; 2] = [i_field(0, field::IMM), o(1)];
const UNARY_PORTS: [Port; 2] = [i(0), o(1)];
const REGISTER_PORTS: [Port; 7] = [
    i(0),
    i(1),
    i_field(2, field::RS),
    i_field(3, field::RT),
    i(4),
    o(5),
    o(6),
];
const DATA_MEMORY_PORTS: [Port; 5] = [i(0), i(1), i(2), i(3), o(4)];
const ALU_PORTS: [Port; 5] = [i(0), i(1), i(2), o(3), o(4)];
const AND_PORTS: [Port; 3] = [i(0), i(1), o(2)];
const IF_ID_PORTS: [Port; 4] = [i(0), i(1), o(2), o(3)];
const ID_EX_PORTS: [Port; 22] = [
    i_field(0, field::RD),
    i_field(1, field::RT),
    i(2),
    i(3),
    i(4),
    i(5),
    i(6),
    i(7),
    i(8),
    o(9),
    o(10),
    o(11),
    o(12),
    o(13),
    o(14),
    o(15),
    o(16),
    o(17),
    o(18),
    o(19),
    i_field(20, field::RS),
    o(21),
];
const EX_MEM_PORTS: [Port; 16] = [
    i(0),
    i(1),
    i(2),
    i(3),
    i(4),
    i(5),
    i(6),
    o(7),
    o(8),
    o(9),
    o(10),
    o(11),
    o(12),
    o(13),
    o(14),
    o(15),
];
const MEM_WB_PORTS: [Port; 9] = [i(0), i(1), i(2), i(3), o(4), o(5), o(6), o(7), o(8)];
const FORWARDING_PORTS: [Port; 6] = [i(0), i(1), i(2), i(3), o(4), o(5)];

impl Unit {
    pub fn kind(&self) -> UnitKind {
        match self {
            Unit::Mux => UnitKind::Mux,
            Unit::Mux3 => UnitKind::Mux3,
            Unit::MainControl => UnitKind::MainControl,
            Unit::PipelinedControl => UnitKind::PipelinedControl,
            Unit::AluControl => UnitKind::AluControl,
            Unit::SignExtend => UnitKind::SignExtend,
            Unit::ShiftLeft2 => UnitKind::ShiftLeft2,
            Unit::InstructionMemory(_) => UnitKind::InstructionMemory,
            Unit::RegisterFile(_) => UnitKind::RegisterFile,
            Unit::DataMemory(_) => UnitKind::DataMemory,
            Unit::Alu => UnitKind::Alu,
            Unit::AndGate => UnitKind::AndGate,
            Unit::ProgramCounter(_) => UnitKind::ProgramCounter,
            Unit::Latch(latch) => UnitKind::Latch(latch.kind),
            Unit::Forwarding => UnitKind::Forwarding,
            Unit::Junction => UnitKind::Junction,
        }
    }

    pub fn ports(&self) -> &'static [Port] {
        match self.kind() {
            UnitKind::Mux => &MUX_PORTS,
            UnitKind::Mux3 => &MUX3_PORTS,
            UnitKind::MainControl => &MAIN_CONTROL_PORTS,
            UnitKind::PipelinedControl => &PIPE_CONTROL_PORTS,
            UnitKind::AluControl => &ALU_CONTROL_PORTS,
            UnitKind::SignExtend => &SIGN_EXTEND_PORTS,
            UnitKind::ShiftLeft2 | UnitKind::InstructionMemory | UnitKind::ProgramCounter => {
                &UNARY_PORTS
            }
            UnitKind::Junction => &UNARY_PORTS,
            UnitKind::RegisterFile => &REGISTER_PORTS,
            UnitKind::DataMemory => &DATA_MEMORY_PORTS,
            UnitKind::Alu => &ALU_PORTS,
            UnitKind::AndGate => &AND_PORTS,
            UnitKind::Latch(LatchKind::IfId) => &IF_ID_PORTS,
            UnitKind::Latch(LatchKind::IdEx) => &ID_EX_PORTS,
            UnitKind::Latch(LatchKind::ExMem) => &EX_MEM_PORTS,
            UnitKind::Latch(LatchKind::MemWb) => &MEM_WB_PORTS,
            UnitKind::Forwarding => &FORWARDING_PORTS,
        }
    }

    /// Inputs that decide whether the unit turns active. `None` means all of
    /// them.
    pub fn activation_slots(&self) -> Option<&'static [u8]> {
        use memory::regfile;
        match self.kind() {
            UnitKind::RegisterFile => Some(&[regfile::READ_REG1, regfile::READ_REG2]),
            UnitKind::Mux3 => Some(&[logic::mux3::IN0, logic::mux3::CTRL]),
            UnitKind::Forwarding => Some(&[
                control::forwarding::READ_REG1,
                control::forwarding::READ_REG2,
            ]),
            _ => None,
        }
    }

    /// Whether some of the unit's inputs are sampled on a clock rather than
    /// used combinationally. Edges into these inputs do not count towards the
    /// settle depth.
    pub fn is_clocked_input(&self, slot: u8) -> bool {
        use memory::regfile;
        match self.kind() {
            UnitKind::ProgramCounter | UnitKind::Latch(_) => true,
            UnitKind::RegisterFile => matches!(
                slot,
                regfile::REG_WRITE | regfile::WRITE_DATA | regfile::WRITE_REG
            ),
            _ => false,
        }
    }

    /// Recompute outputs from the stored inputs.
    pub fn step(&mut self, io: &mut Ports<'_>, ctx: &StepContext) -> Result<(), SimError> {
        match self {
            Unit::Mux => logic::step_mux(io),
            Unit::Mux3 => logic::step_mux3(io, ctx)?,
            Unit::MainControl => control::step_main_control(io, ctx)?,
            Unit::PipelinedControl => control::step_pipe_control(io, ctx)?,
            Unit::AluControl => control::step_alu_control(io, ctx)?,
            Unit::SignExtend => logic::step_sign_extend(io),
            Unit::ShiftLeft2 => logic::step_shift_left2(io),
            Unit::InstructionMemory(mem) => memory::step_instruction_memory(mem, io),
            Unit::RegisterFile(regs) => regs.step(io),
            Unit::DataMemory(mem) => mem.step(io),
            Unit::Alu => logic::step_alu(io, ctx)?,
            Unit::AndGate => logic::step_and_gate(io),
            Unit::ProgramCounter(pc) => pc.step(io),
            Unit::Latch(latch) => latch.step(io),
            Unit::Forwarding => control::step_forwarding(io),
            Unit::Junction => {}
        }
        Ok(())
    }
}
