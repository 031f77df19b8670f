// Run short programs through every layout and check the architectural state

use std::collections::HashMap;

use interpolator::{format, Formattable};
use mips_sim::{
    assemble,
    isa::{alu_code, arithmetic_compute},
    units::logic::and_gate,
    units::clocked::if_id,
    parse, DatapathSim, ErrorPolicy, Layout, MemoryKind, ParseOption, SimConfig, SimError,
};

#[allow(non_upper_case_globals)]
const vals: [(i32, i32); 4] = [(5, 7), (-3, 9), (12, 10), (-32768, 32767)];

fn make_sim(layout: Layout, src: &str) -> anyhow::Result<DatapathSim> {
    let program = assemble(src, ParseOption::default())?;
    Ok(DatapathSim::with_program(
        layout,
        SimConfig::default(),
        program,
    )?)
}

#[test]
fn test_sum_single_cycle() -> anyhow::Result<()> {
    let mut sim = make_sim(
        Layout::SingleCycle,
        "ADDI $1, $0, 5\nADDI $2, $0, 7\nADD $3, $1, $2\n",
    )?;
    sim.run(3)?;
    anyhow::ensure!(sim.register(3)? == 12, "got {}", sim.register(3)?);
    anyhow::ensure!(sim.pc() == 12);
    anyhow::ensure!(sim.step_count() == 21);
    Ok(())
}

#[test]
fn test_load_word_every_layout() -> anyhow::Result<()> {
    for layout in Layout::ALL {
        let mut sim = make_sim(layout, "LW $1, 0($0)\nData:\n42,")?;
        sim.run(8)?;
        anyhow::ensure!(sim.register(1)? == 42, "load failed on {layout}");
        anyhow::ensure!(sim.memory_word(MemoryKind::Data, 0)? == 42);
    }
    Ok(())
}

#[test]
fn test_pipelined_load_lands_on_fifth_clock() -> anyhow::Result<()> {
    let mut sim = make_sim(Layout::Pipelined, "LW $1, 0($0)\nData:\n42,")?;
    sim.run(4)?;
    anyhow::ensure!(sim.register(1)? == 0);
    sim.clock()?;
    anyhow::ensure!(sim.register(1)? == 42);
    Ok(())
}

#[test]
fn test_reg_op() -> anyhow::Result<()> {
    let insts = [
        ("add", alu_code::ADD),
        ("sub", alu_code::SUB),
        ("and", alu_code::AND),
        ("or", alu_code::OR),
        ("slt", alu_code::SLT),
    ];
    let source = r#"
        addi $1, $0, {vala}
        addi $2, $0, {valb}
        {inst} $3, $1, $2
    "#;

    for layout in [Layout::SingleCycle, Layout::Forwarding] {
        for (inst, code) in insts {
            for (a, b) in vals {
                let args = &[
                    ("vala", Formattable::display(&a)),
                    ("valb", Formattable::display(&b)),
                    ("inst", Formattable::display(&inst)),
                ]
                .into_iter()
                .collect::<HashMap<_, _>>();

                let src = format(source, args)?;
                let mut sim = make_sim(layout, &src)?;
                sim.run(8)?;
                let expect = arithmetic_compute(a as u32, b as u32, code)
                    .ok_or(anyhow::anyhow!("no ALU operation {code}"))?;
                let got = sim.register(3)?;
                anyhow::ensure!(
                    got == expect,
                    "op-{inst}-{a}-{b} on {layout}: expect {expect:#x}, got {got:#x}"
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_pipelined_needs_gaps_without_forwarding() -> anyhow::Result<()> {
    let src = "ADDI $1, $0, 5\nADD $2, $1, $1\n";
    let mut plain = make_sim(Layout::Pipelined, src)?;
    plain.run(10)?;
    anyhow::ensure!(plain.register(1)? == 5);
    anyhow::ensure!(plain.register(2)? == 0, "stale read expected");

    let mut fwd = make_sim(Layout::Forwarding, src)?;
    fwd.run(10)?;
    anyhow::ensure!(fwd.register(2)? == 10);

    let padded = "ADDI $1, $0, 5\nADDI $2, $0, 7\nNOP\nNOP\nNOP\nADD $3, $1, $2\n";
    let mut plain = make_sim(Layout::Pipelined, padded)?;
    plain.run(12)?;
    anyhow::ensure!(plain.register(3)? == 12);
    Ok(())
}

#[test]
fn test_store_word() -> anyhow::Result<()> {
    let src = "ADDI $1, $0, 9\nSW $1, 3($0)\n";
    let mut single = make_sim(Layout::SingleCycle, src)?;
    single.run(2)?;
    anyhow::ensure!(single.memory_word(MemoryKind::Data, 3)? == 9);
    anyhow::ensure!(single.data_words() == vec![(3, 9)]);

    let mut fwd = make_sim(Layout::Forwarding, src)?;
    fwd.run(8)?;
    anyhow::ensure!(fwd.memory_word(MemoryKind::Data, 3)? == 9);
    Ok(())
}

#[test]
fn test_branch_flush() -> anyhow::Result<()> {
    let src = "BEQ $0, $0, 2\nADDI $1, $0, 1\nADDI $2, $0, 2\nADDI $3, $0, 3\nADDI $4, $0, 4\n";
    let mut sim = make_sim(Layout::Forwarding, src)?;
    let gate = sim.key_units().branch_gate;
    let latch = sim
        .key_units()
        .if_id
        .ok_or(anyhow::anyhow!("no IF/ID latch"))?;

    let mut taken_at = None;
    for clock in 1..=10 {
        sim.clock()?;
        if sim.link_value(gate, and_gate::OUT)? == 1 {
            anyhow::ensure!(sim.link_value(latch, if_id::INST)? == 0);
            anyhow::ensure!(sim.link_value(latch, if_id::PC4)? == 0);
            taken_at = Some(clock);
            break;
        }
    }
    anyhow::ensure!(taken_at == Some(3), "branch taken at {taken_at:?}");

    sim.run(10)?;
    let regs: Vec<u32> = (1..=4).map(|i| sim.register(i)).collect::<Result<_, _>>()?;
    anyhow::ensure!(regs == vec![1, 0, 3, 4], "registers {regs:?}");
    Ok(())
}

#[test]
fn test_strict_policy_unknown_opcode() -> anyhow::Result<()> {
    let strict = SimConfig::default().set_error_policy(ErrorPolicy::Strict);
    let mut sim = DatapathSim::new(Layout::SingleCycle, strict)?;
    sim.set_memory_word(MemoryKind::Instruction, 0, 0xfc00_0000)?;
    let err = sim.run(1).unwrap_err();
    anyhow::ensure!(
        matches!(err, SimError::UnknownOpcode { opcode: 63, .. }),
        "unexpected {err}"
    );

    let mut sim = DatapathSim::new(Layout::SingleCycle, SimConfig::default())?;
    sim.set_memory_word(MemoryKind::Instruction, 0, 0xfc00_0000)?;
    sim.run(2)?;
    anyhow::ensure!(sim.registers().iter().all(|(_, v)| *v == 0));
    anyhow::ensure!(sim.pc() == 8);
    Ok(())
}

#[test]
fn test_rebuild_keeps_program() -> anyhow::Result<()> {
    let mut sim = make_sim(Layout::SingleCycle, "ADDI $5, $0, 3\n")?;
    sim.run(1)?;
    anyhow::ensure!(sim.register(5)? == 3);
    sim.rebuild(Layout::Forwarding)?;
    anyhow::ensure!(sim.register(5)? == 0);
    anyhow::ensure!(sim.memory_word(MemoryKind::Instruction, 0)? == 0x2005_0003);
    sim.run(6)?;
    anyhow::ensure!(sim.register(5)? == 3);
    Ok(())
}

#[test]
fn test_saved_program_runs_the_same() -> anyhow::Result<()> {
    let program = assemble(
        "addi $1, $0, 3\nlw $2, 1($1)\nadd $3, $2, $1\nData:\n0, 0, 0, 0, 11",
        ParseOption::default(),
    )?;
    let file = tempfile::NamedTempFile::new()?;
    std::fs::write(file.path(), program.to_string())?;
    let text = std::fs::read_to_string(file.path())?;
    let report = parse(&text, ParseOption::default().set_require_data_tag(true));
    anyhow::ensure!(report.is_ok(), "saved program has errors: {:?}", report.errors);
    anyhow::ensure!(report.program == program);

    let mut sim =
        DatapathSim::with_program(Layout::SingleCycle, SimConfig::default(), report.program)?;
    sim.run(3)?;
    anyhow::ensure!(sim.register(2)? == 11);
    anyhow::ensure!(sim.register(3)? == 14);
    Ok(())
}
