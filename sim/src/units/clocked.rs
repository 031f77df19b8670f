//! Clocked units: the program counter and the four pipeline latches.
//!
//! Both count down once per settle iteration and wrap to their delay when the
//! countdown reaches 0, so they act once per machine clock.

use super::control::{unpack_ex, unpack_mem, unpack_wb};
use crate::{framework::Ports, isa::define_code};

define_code! {
    @mod pc;
    @type u8;
    NEXT = 0;
    ADDR = 1;
}

define_code! {
    @mod if_id;
    @type u8;
    INST_IN = 0;
    PC4_IN = 1;
    INST = 2;
    PC4 = 3;
}

define_code! {
    @mod id_ex;
    @type u8;
    RD_IN = 0;
    RT_IN = 1;
    IMM_IN = 2;
    READ_DATA2_IN = 3;
    READ_DATA1_IN = 4;
    PC4_IN = 5;
    EX_IN = 6;
    MEM_IN = 7;
    WB_IN = 8;
    RD = 9;
    RT = 10;
    IMM = 11;
    READ_DATA2 = 12;
    READ_DATA1 = 13;
    PC4 = 14;
    ALU_SRC = 15;
    ALU_OP = 16;
    REG_DST = 17;
    MEM = 18;
    WB = 19;
    RS_IN = 20;
    RS = 21;
}

define_code! {
    @mod ex_mem;
    @type u8;
    WRITE_REG_IN = 0;
    WRITE_DATA_IN = 1;
    ZERO_IN = 2;
    ALU_RESULT_IN = 3;
    BRANCH_TARGET_IN = 4;
    MEM_IN = 5;
    WB_IN = 6;
    WRITE_REG = 7;
    WRITE_DATA = 8;
    ZERO = 9;
    ALU_RESULT = 10;
    BRANCH_TARGET = 11;
    BRANCH = 12;
    MEM_WRITE = 13;
    MEM_READ = 14;
    WB = 15;
}

define_code! {
    @mod mem_wb;
    @type u8;
    WRITE_REG_IN = 0;
    READ_DATA_IN = 1;
    ALU_RESULT_IN = 2;
    WB_IN = 3;
    WRITE_REG = 4;
    READ_DATA = 5;
    ALU_RESULT = 6;
    MEM_TO_REG = 7;
    REG_WRITE = 8;
}

/// Program counter. The next address is sampled when the countdown reaches
/// `store_step` and becomes visible when it reaches `update_step`.
#[derive(Debug, Clone)]
pub struct ProgramCounter {
    delay: u32,
    countdown: u32,
    store_step: u32,
    update_step: u32,
    next: u32,
}

impl ProgramCounter {
    pub fn new(delay: u32, store_step: u32, update_step: u32) -> Self {
        Self {
            delay,
            countdown: delay,
            store_step,
            update_step,
            next: 0,
        }
    }

    pub fn step(&mut self, io: &mut Ports<'_>) {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == self.store_step {
            self.next = io.get(pc::NEXT);
        }
        if self.countdown == self.update_step {
            io.set(pc::ADDR, self.next);
        }
        if self.countdown == 0 {
            self.countdown = self.delay;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LatchKind {
    IfId,
    IdEx,
    ExMem,
    MemWb,
}

impl LatchKind {
    /// Fields copied unchanged on capture, as `(input, output)`.
    fn copies(self) -> &'static [(u8, u8)] {
        match self {
            LatchKind::IfId => &[(if_id::INST_IN, if_id::INST), (if_id::PC4_IN, if_id::PC4)],
            LatchKind::IdEx => &[
                (id_ex::RD_IN, id_ex::RD),
                (id_ex::RT_IN, id_ex::RT),
                (id_ex::IMM_IN, id_ex::IMM),
                (id_ex::READ_DATA2_IN, id_ex::READ_DATA2),
                (id_ex::READ_DATA1_IN, id_ex::READ_DATA1),
                (id_ex::PC4_IN, id_ex::PC4),
                (id_ex::MEM_IN, id_ex::MEM),
                (id_ex::WB_IN, id_ex::WB),
                (id_ex::RS_IN, id_ex::RS),
            ],
            LatchKind::ExMem => &[
                (ex_mem::WRITE_REG_IN, ex_mem::WRITE_REG),
                (ex_mem::WRITE_DATA_IN, ex_mem::WRITE_DATA),
                (ex_mem::ZERO_IN, ex_mem::ZERO),
                (ex_mem::ALU_RESULT_IN, ex_mem::ALU_RESULT),
                (ex_mem::BRANCH_TARGET_IN, ex_mem::BRANCH_TARGET),
                (ex_mem::WB_IN, ex_mem::WB),
            ],
            LatchKind::MemWb => &[
                (mem_wb::WRITE_REG_IN, mem_wb::WRITE_REG),
                (mem_wb::READ_DATA_IN, mem_wb::READ_DATA),
                (mem_wb::ALU_RESULT_IN, mem_wb::ALU_RESULT),
            ],
        }
    }

    /// Control bundles split into individual signals on capture.
    fn unpack(self, io: &mut Ports<'_>) {
        match self {
            LatchKind::IfId => {}
            LatchKind::IdEx => {
                let (reg_dst, alu_op, alu_src) = unpack_ex(io.get(id_ex::EX_IN));
                io.set(id_ex::REG_DST, reg_dst);
                io.set(id_ex::ALU_OP, alu_op);
                io.set(id_ex::ALU_SRC, alu_src);
            }
            LatchKind::ExMem => {
                let (mem_read, mem_write, branch) = unpack_mem(io.get(ex_mem::MEM_IN));
                io.set(ex_mem::MEM_READ, mem_read);
                io.set(ex_mem::MEM_WRITE, mem_write);
                io.set(ex_mem::BRANCH, branch);
            }
            LatchKind::MemWb => {
                let (reg_write, mem_to_reg) = unpack_wb(io.get(mem_wb::WB_IN));
                io.set(mem_wb::REG_WRITE, reg_write);
                io.set(mem_wb::MEM_TO_REG, mem_to_reg);
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LatchKind::IfId => "IF/ID",
            LatchKind::IdEx => "ID/EX",
            LatchKind::ExMem => "EX/MEM",
            LatchKind::MemWb => "MEM/WB",
        }
    }
}

/// Pipeline register. Outputs change only on the iteration where the
/// countdown equals 1.
#[derive(Debug, Clone)]
pub struct PipelineLatch {
    pub(crate) kind: LatchKind,
    delay: u32,
    countdown: u32,
}

impl PipelineLatch {
    pub fn new(kind: LatchKind, delay: u32) -> Self {
        Self {
            kind,
            delay,
            countdown: delay,
        }
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn step(&mut self, io: &mut Ports<'_>) {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 1 {
            for &(from, to) in self.kind.copies() {
                let v = io.get(from);
                io.set(to, v);
            }
            self.kind.unpack(io);
        }
        if self.countdown == 0 {
            self.countdown = self.delay;
        }
    }
}
