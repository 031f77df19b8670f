//! The component/link engine and the simulation driver.
//!
//! A [`DatapathSim`] owns exactly one circuit, built for the current
//! [`Layout`]. One visible step runs the settle loop a fixed number of times:
//! every component recomputes its outputs from the inputs it holds, then every
//! input pulls the value of the output driving it, then pending activity is
//! confirmed. Values therefore move one component further per iteration.
mod circuit;
mod link;
pub(crate) mod propagate;

pub use circuit::{Circuit, Component, Ports};
pub use link::{ComponentId, Direction, Link, LinkId};
pub use propagate::{settle_depth, topo};

use crate::{
    architectures::{self, KeyUnits, Layout, Timing},
    config::SimConfig,
    error::SimError,
    isa::{Mnemonic, MAX_DATA, MAX_INSTRUCTIONS, MAX_REGISTERS},
    object::Program,
    units::{clocked::pc, logic::and_gate, StepContext, Unit},
};

/// Number of instructions that can be in flight at once.
pub const IN_FLIGHT_SLOTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Instruction,
    Register,
    Data,
}

impl MemoryKind {
    fn name(self) -> &'static str {
        match self {
            MemoryKind::Instruction => "instruction memory",
            MemoryKind::Register => "register file",
            MemoryKind::Data => "data memory",
        }
    }

    fn limit(self) -> u32 {
        match self {
            MemoryKind::Instruction => MAX_INSTRUCTIONS,
            MemoryKind::Register => MAX_REGISTERS as u32,
            MemoryKind::Data => MAX_DATA,
        }
    }
}

/// The instruction occupying one in-flight slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InFlight {
    pub mnemonic: Option<Mnemonic>,
    pub address: u32,
}

/// Per-run state shared with the presentation side. Reset on every rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimContext {
    pub(crate) pipeline_cycle: u32,
    pub(crate) in_flight: [InFlight; IN_FLIGHT_SLOTS],
    pub(crate) highlighted: Option<u32>,
}

impl SimContext {
    /// Rotating stage index, `(c + 4) % 5` per step on pipelined layouts.
    pub fn pipeline_cycle(&self) -> u32 {
        self.pipeline_cycle
    }

    /// Slot 0 is the instruction at the PC after the latest step; older
    /// entries shift towards slot 4.
    pub fn in_flight(&self) -> &[InFlight; IN_FLIGHT_SLOTS] {
        &self.in_flight
    }

    pub fn highlighted(&self) -> Option<u32> {
        self.highlighted
    }
}

/// Serialisable summary of the machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SimSnapshot {
    pub layout: Layout,
    pub pc: u32,
    pub steps: u64,
    pub clocks: u64,
    pub registers: Vec<(u8, u32)>,
    /// non-zero data words as `(address, value)`
    pub data: Vec<(u32, u32)>,
    pub in_flight: Vec<InFlight>,
}

/// Datapath simulator.
pub struct DatapathSim {
    layout: Layout,
    config: SimConfig,
    circuit: Circuit,
    keys: KeyUnits,
    program: Program,
    context: SimContext,
    settle_depth: Option<u32>,
    step_count: u64,
}

impl DatapathSim {
    /// Build a simulator for `layout` with empty memories.
    pub fn new(layout: Layout, config: SimConfig) -> Result<Self, SimError> {
        Self::with_program(layout, config, Program::default())
    }

    pub fn with_program(
        layout: Layout,
        config: SimConfig,
        program: Program,
    ) -> Result<Self, SimError> {
        let (circuit, keys) = architectures::build(layout)?;
        let mut sim = Self {
            layout,
            config,
            circuit,
            keys,
            program,
            context: SimContext::default(),
            settle_depth: None,
            step_count: 0,
        };
        sim.rebuild(layout)?;
        Ok(sim)
    }

    /// Discard the current circuit and build `layout` from scratch, loading
    /// the held program into it.
    pub fn rebuild(&mut self, layout: Layout) -> Result<(), SimError> {
        let (circuit, keys) = architectures::build(layout)?;
        self.layout = layout;
        self.circuit = circuit;
        self.keys = keys;
        self.context = SimContext::default();
        self.step_count = 0;
        self.settle_depth = settle_depth(&self.circuit);

        let words: Vec<_> = self.program.words().collect();
        for (addr, word) in words {
            self.set_memory_word(MemoryKind::Instruction, addr, word)?;
        }
        let data: Vec<_> = self
            .program
            .data_segment()
            .iter()
            .enumerate()
            .filter(|(_, word)| **word != 0)
            .map(|(addr, word)| (addr as u32, *word))
            .collect();
        for (addr, word) in data {
            self.set_memory_word(MemoryKind::Data, addr, word)?;
        }

        if layout.is_pipelined() {
            self.circuit.set_all_active(true);
        } else {
            self.circuit.component_mut(self.keys.pc)?.active = true;
        }

        tracing::debug!(
            "built {} layout: {} components, {} links, settle depth {:?}",
            layout,
            self.circuit.components.len(),
            self.circuit.links.len(),
            self.settle_depth
        );
        Ok(())
    }

    /// Replace the held program and rebuild the current layout around it.
    pub fn load_program(&mut self, program: Program) -> Result<(), SimError> {
        self.program = program;
        self.rebuild(self.layout)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Timing of the current layout with the configured settle override
    /// applied.
    pub fn timing(&self) -> Timing {
        let mut timing = self.layout.timing();
        if let Some(n) = self.config.settle_iterations() {
            timing.settle_iterations = n;
        }
        timing
    }

    /// Longest combinational path of the current circuit.
    pub fn settle_depth(&self) -> Option<u32> {
        self.settle_depth
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Completed machine clocks.
    pub fn clock_count(&self) -> u64 {
        self.step_count / self.timing().clock_steps.max(1) as u64
    }

    /// Advance one visible step.
    pub fn step(&mut self) -> Result<(), SimError> {
        let ctx = StepContext {
            policy: self.config.error_policy(),
        };
        for _ in 0..self.timing().settle_iterations {
            self.circuit.step_all(&ctx)?;
            self.circuit.update_pending();
            self.circuit.pull_inputs();
            self.circuit.confirm_active();
        }

        if self.layout.is_pipelined() {
            let taken = self.link_value(self.keys.branch_gate, and_gate::OUT)? == 1;
            if let (true, Some(if_id)) = (taken, self.keys.if_id) {
                tracing::debug!("branch taken, flushing IF/ID");
                self.circuit.clear_outputs(if_id)?;
            }
            self.circuit.set_all_active(true);
        } else if self.circuit.inputs_active(self.keys.pc) {
            let pc = self.keys.pc;
            for (i, c) in self.circuit.components.iter_mut().enumerate() {
                if i != pc.index() && !matches!(c.unit, Unit::Junction) {
                    c.active = false;
                    c.pending_active = false;
                }
            }
        }

        let pc = self.pc();
        let slots = &mut self.context.in_flight;
        slots.rotate_right(1);
        slots[0] = InFlight {
            mnemonic: self.program.mnemonic(pc),
            address: pc,
        };
        if self.layout.is_pipelined() {
            self.context.pipeline_cycle = (self.context.pipeline_cycle + 4) % 5;
        }
        self.step_count += 1;
        tracing::trace!(
            "step {}: pc = {:#x}, pipeline cycle {}",
            self.step_count,
            pc,
            self.context.pipeline_cycle
        );
        Ok(())
    }

    /// Advance one machine clock.
    pub fn clock(&mut self) -> Result<(), SimError> {
        for _ in 0..self.timing().clock_steps {
            self.step()?;
        }
        Ok(())
    }

    pub fn run(&mut self, clocks: u64) -> Result<(), SimError> {
        for _ in 0..clocks {
            self.clock()?;
        }
        Ok(())
    }

    /// Mark every component inactive. Stored values are kept.
    pub fn reset_activity(&mut self) {
        self.circuit.set_all_active(false);
    }

    /// Address currently driven by the program counter.
    pub fn pc(&self) -> u32 {
        self.circuit
            .link(self.keys.pc, pc::ADDR)
            .map(|l| l.value())
            .unwrap_or_default()
    }

    pub fn key_units(&self) -> &KeyUnits {
        &self.keys
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component, SimError> {
        self.circuit.component(id)
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.circuit
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId(i), c))
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Value of a link as its owner sees it.
    pub fn link_value(&self, id: ComponentId, slot: u8) -> Result<u32, SimError> {
        Ok(self.circuit.link(id, slot)?.value())
    }

    pub fn set_link_value(
        &mut self,
        id: ComponentId,
        slot: u8,
        value: u32,
    ) -> Result<(), SimError> {
        let link = self.circuit.link_id(id, slot)?;
        self.circuit.links[link.0].value = value;
        Ok(())
    }

    pub fn link_active(&self, id: ComponentId, slot: u8) -> Result<bool, SimError> {
        Ok(self.circuit.link_active(self.circuit.link_id(id, slot)?))
    }

    pub fn set_link_active(
        &mut self,
        id: ComponentId,
        slot: u8,
        active: bool,
    ) -> Result<(), SimError> {
        let link = self.circuit.link_id(id, slot)?;
        self.circuit.set_link_active(link, active);
        Ok(())
    }

    fn check_address(kind: MemoryKind, address: u32) -> Result<(), SimError> {
        if address < kind.limit() {
            Ok(())
        } else {
            Err(SimError::AddressOutOfRange {
                memory: kind.name(),
                address,
            })
        }
    }

    fn memory_unit(&self, kind: MemoryKind) -> ComponentId {
        match kind {
            MemoryKind::Instruction => self.keys.imem,
            MemoryKind::Register => self.keys.regs,
            MemoryKind::Data => self.keys.dmem,
        }
    }

    /// Word stored at `address` of one of the three memories. Registers are
    /// addressed by index.
    pub fn memory_word(&self, kind: MemoryKind, address: u32) -> Result<u32, SimError> {
        Self::check_address(kind, address)?;
        let word = match &self.circuit.component(self.memory_unit(kind))?.unit {
            Unit::InstructionMemory(mem) => mem.read(address),
            Unit::DataMemory(dm) => dm.mem.read(address),
            Unit::RegisterFile(regs) => regs.get(address as usize).unwrap_or_default(),
            _ => 0,
        };
        Ok(word)
    }

    pub fn set_memory_word(
        &mut self,
        kind: MemoryKind,
        address: u32,
        value: u32,
    ) -> Result<(), SimError> {
        Self::check_address(kind, address)?;
        let id = self.memory_unit(kind);
        match &mut self.circuit.component_mut(id)?.unit {
            Unit::InstructionMemory(mem) => mem.write(address, value),
            Unit::DataMemory(dm) => dm.mem.write(address, value),
            Unit::RegisterFile(regs) => {
                regs.set(address as usize, value);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn register(&self, index: u8) -> Result<u32, SimError> {
        self.memory_word(MemoryKind::Register, index as u32)
    }

    /// Every register as `(index, value)`.
    pub fn registers(&self) -> Vec<(u8, u32)> {
        (0..MAX_REGISTERS as u8)
            .map(|i| (i, self.register(i).unwrap_or_default()))
            .collect()
    }

    /// Non-zero words of the data memory.
    pub fn data_words(&self) -> Vec<(u32, u32)> {
        match self.circuit.component(self.keys.dmem).map(|c| &c.unit) {
            Ok(Unit::DataMemory(dm)) => dm.mem.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Initial data word held by the program (not the live data memory).
    pub fn parser_data(&self, index: u32) -> Result<u32, SimError> {
        self.program
            .data(index)
            .ok_or(SimError::AddressOutOfRange {
                memory: "data segment",
                address: index,
            })
    }

    pub fn set_parser_data(&mut self, index: u32, value: u32) -> Result<(), SimError> {
        if self.program.set_data(index, value) {
            Ok(())
        } else {
            Err(SimError::AddressOutOfRange {
                memory: "data segment",
                address: index,
            })
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    /// Select the instruction address to highlight, `None` to clear.
    pub fn set_highlighted(&mut self, address: Option<u32>) {
        self.context.highlighted = address;
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            layout: self.layout,
            pc: self.pc(),
            steps: self.step_count,
            clocks: self.clock_count(),
            registers: self.registers(),
            data: self.data_words(),
            in_flight: self.context.in_flight.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asm::{parse, ParseOption},
        units::{clocked::if_id, logic::mux3, LatchKind, UnitKind},
    };
    use std::collections::HashSet;

    fn sim_for(layout: Layout, src: &str) -> DatapathSim {
        let report = parse(src, ParseOption::default());
        assert!(report.is_ok(), "{:?}", report.errors);
        DatapathSim::with_program(layout, SimConfig::default(), report.program).unwrap()
    }

    fn find(sim: &DatapathSim, kind: UnitKind) -> ComponentId {
        sim.components()
            .find(|(_, c)| c.kind() == kind)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn test_memory_bounds() {
        let mut sim = DatapathSim::new(Layout::SingleCycle, SimConfig::default()).unwrap();
        sim.set_memory_word(MemoryKind::Data, 511, 7).unwrap();
        assert_eq!(sim.memory_word(MemoryKind::Data, 511), Ok(7));
        assert_eq!(sim.data_words(), vec![(511, 7)]);
        assert!(sim.memory_word(MemoryKind::Data, 512).is_err());
        assert!(sim.set_memory_word(MemoryKind::Register, 32, 1).is_err());
        assert!(sim.memory_word(MemoryKind::Instruction, 512).is_err());
        assert!(sim.set_parser_data(512, 1).is_err());
        sim.set_parser_data(3, 9).unwrap();
        assert_eq!(sim.parser_data(3), Ok(9));
    }

    #[test]
    fn test_load_program_fills_memories() {
        let mut sim = DatapathSim::new(Layout::Pipelined, SimConfig::default()).unwrap();
        let report = parse("LW $1, 2($0)\nNOP\nData:\n0, 0, 5", ParseOption::default());
        assert!(report.is_ok());
        sim.set_memory_word(MemoryKind::Data, 9, 1).unwrap();
        sim.load_program(report.program).unwrap();
        assert_eq!(sim.memory_word(MemoryKind::Instruction, 0), Ok(0x8c01_0002));
        assert_eq!(sim.memory_word(MemoryKind::Instruction, 4), Ok(0));
        // the old circuit is gone with its data
        assert_eq!(sim.data_words(), vec![(2, 5)]);
        assert_eq!(sim.parser_data(2), Ok(5));
    }

    #[test]
    fn test_kinds_of_layout() {
        let sim = DatapathSim::new(Layout::Forwarding, SimConfig::default()).unwrap();
        let kinds: HashSet<UnitKind> = sim.components().map(|(_, c)| c.kind()).collect();
        for kind in [LatchKind::IfId, LatchKind::IdEx, LatchKind::ExMem, LatchKind::MemWb] {
            assert!(kinds.contains(&UnitKind::Latch(kind)), "missing {kind:?}");
        }
        assert!(kinds.contains(&UnitKind::Forwarding));
        assert!(kinds.contains(&UnitKind::Mux3));

        let single = DatapathSim::new(Layout::SingleCycle, SimConfig::default()).unwrap();
        assert!(single
            .components()
            .all(|(_, c)| !matches!(c.kind(), UnitKind::Latch(_) | UnitKind::Forwarding)));
    }

    #[test]
    fn test_single_cycle_activity() {
        let mut sim = DatapathSim::new(Layout::SingleCycle, SimConfig::default()).unwrap();
        let pc = sim.key_units().pc;
        let imem = sim.key_units().imem;
        assert!(sim.component(pc).unwrap().is_active());
        assert!(!sim.component(imem).unwrap().is_active());
        sim.step().unwrap();
        assert!(sim.component(imem).unwrap().is_active());
        let regs = sim.key_units().regs;
        assert!(!sim.component(regs).unwrap().is_active());

        sim.reset_activity();
        assert!(sim.components().all(|(_, c)| !c.is_active()));
    }

    #[test]
    fn test_single_cycle_clock_is_seven_steps() {
        let mut sim = sim_for(Layout::SingleCycle, "ADDI $1, $0, 5\n");
        for _ in 0..6 {
            sim.step().unwrap();
            assert_eq!(sim.pc(), 0);
        }
        sim.step().unwrap();
        assert_eq!(sim.pc(), 4);
        assert_eq!(sim.register(1), Ok(5));
        assert_eq!(sim.clock_count(), 1);
        assert_eq!(sim.context().in_flight()[0].address, 4);
        assert_eq!(sim.context().in_flight()[1].mnemonic, Some(Mnemonic::Addi));
    }

    #[test]
    fn test_pipeline_cycle_rotates() {
        let mut sim = DatapathSim::new(Layout::Pipelined, SimConfig::default()).unwrap();
        let cycles: Vec<u32> = (0..5)
            .map(|_| {
                sim.step().unwrap();
                sim.context().pipeline_cycle()
            })
            .collect();
        assert_eq!(cycles, vec![4, 3, 2, 1, 0]);
        assert!(sim.components().all(|(_, c)| c.is_active()
            || c.kind() == UnitKind::Junction));
    }

    #[test]
    fn test_flush_on_forced_branch() {
        let mut sim = sim_for(Layout::Forwarding, "ADDI $1, $0, 5\n");
        let if_id_latch = sim.key_units().if_id.unwrap();
        let gate = sim.key_units().branch_gate;
        // hold the gate's inputs high through the whole step
        for slot in [and_gate::IN0, and_gate::IN1] {
            let link = sim.circuit.link_id(gate, slot).unwrap();
            sim.circuit.links[link.0].source = None;
            sim.circuit.set_constant(gate, slot, 1).unwrap();
        }
        sim.step().unwrap();
        assert_eq!(sim.link_value(gate, and_gate::OUT), Ok(1));
        assert_eq!(sim.link_value(if_id_latch, if_id::INST), Ok(0));
        assert_eq!(sim.link_value(if_id_latch, if_id::PC4), Ok(0));
    }

    #[test]
    fn test_strict_policy_stops_step() {
        let config = SimConfig::default().set_error_policy(crate::ErrorPolicy::Strict);
        let mut sim = DatapathSim::new(Layout::Forwarding, config).unwrap();
        let fwd = find(&sim, UnitKind::Forwarding);
        let mux = sim
            .circuit
            .links
            .iter()
            .find(|l| l.source().is_some_and(|s| sim.circuit.links[s.0].owner == fwd))
            .map(|l| l.owner())
            .unwrap();
        let link = sim.circuit.link_id(mux, mux3::CTRL).unwrap();
        sim.circuit.links[link.0].source = None;
        sim.circuit.set_constant(mux, mux3::CTRL, 3).unwrap();
        assert_eq!(
            sim.step(),
            Err(SimError::InvalidSelector {
                component: mux.index(),
                selector: 3
            })
        );

        let mut lenient = DatapathSim::new(Layout::Forwarding, SimConfig::default()).unwrap();
        let link = lenient.circuit.link_id(mux, mux3::CTRL).unwrap();
        lenient.circuit.links[link.0].source = None;
        lenient.circuit.set_constant(mux, mux3::CTRL, 3).unwrap();
        lenient.set_link_value(mux, mux3::OUT, 77).unwrap();
        lenient.step().unwrap();
        assert_eq!(lenient.link_value(mux, mux3::OUT), Ok(77));
    }
}
