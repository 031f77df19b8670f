//! Instruction memory, register file and data memory.

use std::collections::BTreeMap;

use crate::{
    framework::Ports,
    isa::{define_code, MAX_REGISTERS},
};

define_code! {
    @mod imem;
    @type u8;
    ADDR = 0;
    INST = 1;
}

define_code! {
    @mod regfile;
    @type u8;
    REG_WRITE = 0;
    WRITE_DATA = 1;
    READ_REG1 = 2;
    READ_REG2 = 3;
    WRITE_REG = 4;
    READ_DATA1 = 5;
    READ_DATA2 = 6;
}

define_code! {
    @mod dmem;
    @type u8;
    MEM_WRITE = 0;
    MEM_READ = 1;
    ADDR = 2;
    WRITE_DATA = 3;
    READ_DATA = 4;
}

/// Sparse word store. Absent addresses read as 0.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    pub(crate) words: BTreeMap<u32, u32>,
}

impl Memory {
    pub fn read(&self, address: u32) -> u32 {
        self.words.get(&address).copied().unwrap_or_default()
    }

    pub fn write(&mut self, address: u32, value: u32) {
        if value == 0 {
            self.words.remove(&address);
        } else {
            self.words.insert(address, value);
        }
    }

    /// Non-zero words in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.words.iter().map(|(a, w)| (*a, *w))
    }
}

pub fn step_instruction_memory(mem: &Memory, io: &mut Ports<'_>) {
    let word = mem.read(io.get(imem::ADDR));
    io.set(imem::INST, word);
}

/// Register file with combinational reads and a delayed write.
///
/// The write counter advances every settle iteration; a pending write is
/// committed only on the iteration where it equals `phase`, before the read
/// ports are evaluated. Register 0 is never written.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    pub(crate) regs: [u32; MAX_REGISTERS],
    counter: u32,
    period: u32,
    phase: u32,
}

impl RegisterFile {
    pub fn new(period: u32, phase: u32) -> Self {
        Self {
            regs: [0; MAX_REGISTERS],
            counter: 0,
            period: period.max(1),
            phase: phase % period.max(1),
        }
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.regs.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: u32) -> bool {
        match self.regs.get_mut(index) {
            Some(r) => {
                *r = value;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.regs = [0; MAX_REGISTERS];
        self.counter = 0;
    }

    pub fn step(&mut self, io: &mut Ports<'_>) {
        use regfile::*;
        self.counter = (self.counter + 1) % self.period;
        if self.counter == self.phase && io.get(REG_WRITE) != 0 {
            let dst = io.get(WRITE_REG) as usize;
            let value = io.get(WRITE_DATA);
            if dst != 0 && dst < MAX_REGISTERS {
                tracing::info!("write back: ${dst} = {value:#x}");
                self.regs[dst] = value;
            }
        }
        let rd1 = self.get(io.get(READ_REG1) as usize).unwrap_or_default();
        let rd2 = self.get(io.get(READ_REG2) as usize).unwrap_or_default();
        io.set(READ_DATA1, rd1);
        io.set(READ_DATA2, rd2);
    }
}

/// Word-addressed data memory. Reads are combinational when MemRead is set;
/// writes are accepted once the write counter has reached `wait` within each
/// period of `delay` iterations.
#[derive(Debug, Clone)]
pub struct DataMemory {
    pub(crate) mem: Memory,
    counter: u32,
    delay: u32,
    wait: u32,
}

impl DataMemory {
    pub fn new(delay: u32, wait: u32) -> Self {
        Self {
            mem: Memory::default(),
            counter: 0,
            delay: delay.max(1),
            wait,
        }
    }

    pub fn step(&mut self, io: &mut Ports<'_>) {
        use dmem::*;
        self.counter = (self.counter + 1) % self.delay;
        let address = io.get(ADDR);
        if io.get(MEM_WRITE) != 0 && self.counter >= self.wait {
            let value = io.get(WRITE_DATA);
            if self.mem.read(address) != value {
                tracing::info!("memory write: [{address:#x}] = {value:#x}");
            }
            self.mem.write(address, value);
        }
        if io.get(MEM_READ) != 0 {
            io.set(READ_DATA, self.mem.read(address));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ErrorPolicy,
        framework::{Circuit, ComponentId},
        units::{StepContext, Unit},
    };

    const CTX: StepContext = StepContext {
        policy: ErrorPolicy::Permissive,
    };

    fn stored(c: &Circuit, id: ComponentId, address: u32) -> u32 {
        match &c.component(id).unwrap().unit {
            Unit::DataMemory(dm) => dm.mem.read(address),
            Unit::RegisterFile(rf) => rf.get(address as usize).unwrap(),
            _ => unreachable!(),
        }
    }

    fn data_memory(delay: u32, wait: u32) -> (Circuit, ComponentId) {
        let mut c = Circuit::default();
        let id = c.add(
            "Data Memory",
            Unit::DataMemory(DataMemory::new(delay, wait)),
            3,
            (0, 0),
            (1, 1),
        );
        c.set_constant(id, dmem::MEM_WRITE, 1).unwrap();
        c.set_constant(id, dmem::MEM_READ, 0).unwrap();
        c.set_constant(id, dmem::ADDR, 6).unwrap();
        c.set_constant(id, dmem::WRITE_DATA, 0x55).unwrap();
        (c, id)
    }

    #[test]
    fn test_data_write_waits() {
        for (delay, wait) in [(7, 5), (6, 2)] {
            let (mut c, id) = data_memory(delay, wait);
            for _ in 1..wait {
                c.step_all(&CTX).unwrap();
                assert_eq!(stored(&c, id, 6), 0, "early write with wait {wait}");
            }
            c.step_all(&CTX).unwrap();
            assert_eq!(stored(&c, id, 6), 0x55);
        }
    }

    #[test]
    fn test_data_write_needs_mem_write() {
        let (mut c, id) = data_memory(7, 5);
        c.set_constant(id, dmem::MEM_WRITE, 0).unwrap();
        c.set_constant(id, dmem::MEM_READ, 1).unwrap();
        for _ in 0..14 {
            c.step_all(&CTX).unwrap();
        }
        assert_eq!(stored(&c, id, 6), 0);
        assert_eq!(c.link(id, dmem::READ_DATA).unwrap().value(), 0);
    }

    #[test]
    fn test_register_commit_phase() {
        for (period, phase) in [(7, 0), (6, 2)] {
            let mut c = Circuit::default();
            let id = c.add(
                "Registers",
                Unit::RegisterFile(RegisterFile::new(period, phase)),
                1,
                (0, 0),
                (1, 1),
            );
            c.set_constant(id, regfile::REG_WRITE, 1).unwrap();
            c.set_constant(id, regfile::WRITE_REG, 3).unwrap();
            c.set_constant(id, regfile::WRITE_DATA, 9).unwrap();
            // read ports take the instruction word: rs = 3, rt = 0
            c.set_constant(id, regfile::READ_REG1, 3 << 21).unwrap();
            c.set_constant(id, regfile::READ_REG2, 3 << 21).unwrap();

            // the counter starts at 0 and advances before the check
            let commit_at = if phase == 0 { period } else { phase };
            for i in 1..commit_at {
                c.step_all(&CTX).unwrap();
                assert_eq!(stored(&c, id, 3), 0, "iteration {i} of period {period}");
                assert_eq!(c.link(id, regfile::READ_DATA1).unwrap().value(), 0);
            }
            c.step_all(&CTX).unwrap();
            assert_eq!(stored(&c, id, 3), 9);
            // committed before the read ports are evaluated
            assert_eq!(c.link(id, regfile::READ_DATA1).unwrap().value(), 9);
        }
    }

    #[test]
    fn test_register_zero_stays_zero() {
        let mut c = Circuit::default();
        let id = c.add(
            "Registers",
            Unit::RegisterFile(RegisterFile::new(1, 0)),
            1,
            (0, 0),
            (1, 1),
        );
        c.set_constant(id, regfile::REG_WRITE, 1).unwrap();
        c.set_constant(id, regfile::WRITE_REG, 0).unwrap();
        c.set_constant(id, regfile::WRITE_DATA, 9).unwrap();
        c.step_all(&CTX).unwrap();
        assert_eq!(stored(&c, id, 0), 0);
    }

    #[test]
    fn test_sparse_memory() {
        let mut mem = Memory::default();
        mem.write(8, 3);
        mem.write(4, 0);
        assert_eq!(mem.read(8), 3);
        assert_eq!(mem.read(12), 0);
        assert_eq!(mem.iter().collect::<Vec<_>>(), vec![(8, 3)]);
        mem.write(8, 0);
        assert_eq!(mem.iter().count(), 0);
    }

    #[test]
    fn test_register_bounds() {
        let mut rf = RegisterFile::new(7, 0);
        assert!(rf.set(31, 9));
        assert!(!rf.set(32, 9));
        assert_eq!(rf.get(31), Some(9));
        rf.reset();
        assert_eq!(rf.get(31), Some(0));
    }
}
