//! The three datapath layouts and the builder used to wire them.
mod forwarding;
mod pipelined;
mod single_cycle;

use std::{fmt::Display, str::FromStr};

use crate::{
    error::SimError,
    framework::{Circuit, ComponentId},
    isa::{alu_code, BitField},
    units::{
        logic::{alu, unary},
        DataMemory, Memory, RegisterFile, Unit,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Layout {
    #[default]
    SingleCycle,
    Pipelined,
    Forwarding,
}

impl Layout {
    pub const ALL: [Layout; 3] = [Layout::SingleCycle, Layout::Pipelined, Layout::Forwarding];

    pub fn name(self) -> &'static str {
        match self {
            Layout::SingleCycle => "single",
            Layout::Pipelined => "pipelined",
            Layout::Forwarding => "forwarding",
        }
    }

    pub fn is_pipelined(self) -> bool {
        self != Layout::SingleCycle
    }

    pub fn timing(self) -> Timing {
        match self {
            Layout::SingleCycle => Timing::SINGLE_CYCLE,
            Layout::Pipelined | Layout::Forwarding => Timing::PIPELINED,
        }
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .into_iter()
            .find(|l| l.name() == s)
            .ok_or_else(|| format!("unknown layout {s:?}, expected one of {:?}", arch_names()))
    }
}

/// Get all layout names
pub fn arch_names() -> Vec<&'static str> {
    Layout::ALL.iter().map(|l| l.name()).collect()
}

/// Timing constants of a layout, all counted in settle iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// inner iterations per visible step
    pub settle_iterations: u32,
    /// visible steps per machine clock
    pub clock_steps: u32,
    pub pc_delay: u32,
    /// countdown value at which the PC samples its next address
    pub pc_store: u32,
    /// countdown value at which the PC drives the new address
    pub pc_update: u32,
    pub latch_delay: u32,
    pub reg_period: u32,
    /// iteration within the period on which a register write commits
    pub reg_phase: u32,
    pub mem_delay: u32,
    /// first iteration within the period on which memory writes land
    pub mem_wait: u32,
}

impl Timing {
    pub const SINGLE_CYCLE: Timing = Timing {
        settle_iterations: 1,
        clock_steps: 7,
        pc_delay: 7,
        pc_store: 0,
        pc_update: 0,
        latch_delay: 6,
        reg_period: 7,
        reg_phase: 0,
        mem_delay: 7,
        mem_wait: 5,
    };

    pub const PIPELINED: Timing = Timing {
        settle_iterations: 6,
        clock_steps: 1,
        pc_delay: 6,
        pc_store: 2,
        pc_update: 1,
        latch_delay: 6,
        reg_period: 6,
        reg_phase: 2,
        mem_delay: 6,
        mem_wait: 2,
    };

    /// Settle iterations in one machine clock.
    pub fn iterations_per_clock(&self) -> u32 {
        self.settle_iterations * self.clock_steps
    }
}

/// Components the driver needs to reach directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUnits {
    pub pc: ComponentId,
    pub imem: ComponentId,
    pub regs: ComponentId,
    pub dmem: ComponentId,
    /// the AND gate deciding whether a branch is taken
    pub branch_gate: ComponentId,
    /// fetch/decode latch, pipelined layouts only
    pub if_id: Option<ComponentId>,
}

pub(crate) struct Builder {
    pub(crate) circuit: Circuit,
    pub(crate) timing: Timing,
}

impl Builder {
    fn new(timing: Timing) -> Self {
        Self {
            circuit: Circuit::default(),
            timing,
        }
    }

    fn unit(
        &mut self,
        name: &'static str,
        unit: Unit,
        stage: u8,
        position: (u32, u32),
        size: (u32, u32),
    ) -> ComponentId {
        self.circuit.add(name, unit, stage, position, size)
    }

    fn wire(
        &mut self,
        from: ComponentId,
        out: u8,
        to: ComponentId,
        to_slot: u8,
    ) -> Result<(), SimError> {
        self.circuit.connect(from, out, to, to_slot, None)
    }

    /// Wire only the bits `field` of the output into the input.
    fn wire_field(
        &mut self,
        from: ComponentId,
        out: u8,
        to: ComponentId,
        to_slot: u8,
        field: BitField,
    ) -> Result<(), SimError> {
        self.circuit.connect(from, out, to, to_slot, Some(field))
    }

    fn constant(&mut self, to: ComponentId, slot: u8, value: u32) -> Result<(), SimError> {
        self.circuit.set_constant(to, slot, value)
    }

    /// A fan-out point fed by `(from, out)`.
    fn junction(&mut self, from: ComponentId, out: u8, stage: u8) -> Result<ComponentId, SimError> {
        let j = self.unit("Junction", Unit::Junction, stage, (0, 0), (0, 0));
        self.wire(from, out, j, unary::IN)?;
        Ok(j)
    }

    /// An ALU used as a plain adder. `b` is tied to a constant when given.
    fn adder(
        &mut self,
        stage: u8,
        position: (u32, u32),
        b: Option<u32>,
    ) -> Result<ComponentId, SimError> {
        let add = self.unit("Add", Unit::Alu, stage, position, (10, 25));
        self.constant(add, alu::CTRL, alu_code::ADD)?;
        if let Some(b) = b {
            self.constant(add, alu::B, b)?;
        }
        Ok(add)
    }

    fn memories(&self) -> (Unit, Unit, Unit) {
        let t = &self.timing;
        (
            Unit::InstructionMemory(Memory::default()),
            Unit::RegisterFile(RegisterFile::new(t.reg_period, t.reg_phase)),
            Unit::DataMemory(DataMemory::new(t.mem_delay, t.mem_wait)),
        )
    }
}

/// Build the circuit of a layout.
pub fn build(layout: Layout) -> Result<(Circuit, KeyUnits), SimError> {
    let mut b = Builder::new(layout.timing());
    let keys = match layout {
        Layout::SingleCycle => single_cycle::build(&mut b)?,
        Layout::Pipelined => pipelined::build(&mut b)?,
        Layout::Forwarding => forwarding::build(&mut b)?,
    };
    Ok((b.circuit, keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::propagate::settle_depth;

    #[test]
    fn test_layout_names() {
        assert_eq!(arch_names(), vec!["single", "pipelined", "forwarding"]);
        assert_eq!("forwarding".parse::<Layout>(), Ok(Layout::Forwarding));
        assert!("multicycle".parse::<Layout>().is_err());
        assert_eq!(Layout::Pipelined.to_string(), "pipelined");
    }

    #[test]
    fn test_settle_iterations_cover_depth() {
        for layout in Layout::ALL {
            let (circuit, _) = build(layout).unwrap();
            let depth = settle_depth(&circuit).unwrap();
            assert!(
                depth < layout.timing().iterations_per_clock(),
                "{layout}: depth {depth}"
            );
        }
    }

    #[test]
    fn test_single_cycle_depth() {
        let (circuit, _) = build(Layout::SingleCycle).unwrap();
        assert_eq!(settle_depth(&circuit), Some(6));
    }
}
