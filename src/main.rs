use ansi_term::Colour;
use anyhow::{Context, Result};
use binutils::{clap, verbose};
use clap::{error::ErrorKind, CommandFactory, Parser};
use mips_sim::{
    arch_names, format_reg_val, mem_diff, parse, DatapathSim, ErrorPolicy, Layout, ParseOption,
    SimConfig,
};

// MIPS datapath assembler and simulator written in rust
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Path to the assembly source
    input: String,

    /// Datapath layout to run on
    #[arg(short = 'l', long, default_value = "single", value_parser = arch_names())]
    layout: String,

    /// Number of machine clocks to run. Nothing is simulated without it.
    #[arg(short = 'c', long)]
    clocks: Option<u64>,

    /// Stop on malformed control input instead of falling back
    #[arg(long)]
    strict: bool,

    /// Write the normalised program text to this file
    ///
    /// Conflicts with `clocks`.
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,

    /// Write logs as JSON lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<String>,

    /// Print logs during simulation
    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = binutils::verbose_level_to_trace(args.verbose.log_level());
    match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("could not create log file `{}`", path))?;
            binutils::logging_setup(log_level, Some(file));
        }
        None => binutils::logging_setup(log_level, None::<&std::fs::File>),
    }

    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read file `{}`", &args.input))?;
    let report = parse(&content, ParseOption::default());
    for err in &report.errors {
        eprintln!("{} {}", Colour::Red.bold().paint("error:"), err);
        eprintln!("    {}", err.text);
    }
    anyhow::ensure!(
        report.is_ok(),
        "{} error(s) in `{}`",
        report.error_count(),
        &args.input
    );
    let program = report.program;

    let Some(clocks) = args.clocks else {
        let output_path = match &args.output {
            Some(path) => path.clone(),
            None => {
                let mut path = std::path::PathBuf::from(&args.input);
                path.set_extension("mips");
                path.to_string_lossy().to_string()
            }
        };
        std::fs::write(&output_path, program.to_string())
            .with_context(|| format!("could not write file `{}`", &output_path))?;
        println!("writing to file `{}`", &output_path);
        return Ok(());
    };

    if args.output.is_some() {
        let mut cmd = Args::command();
        cmd.error(
            ErrorKind::ArgumentConflict,
            "Can't both specify output and clocks",
        )
        .exit();
    }

    let layout: Layout = args
        .layout
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let policy = if args.strict {
        ErrorPolicy::Strict
    } else {
        ErrorPolicy::Permissive
    };
    let config = SimConfig::default().set_error_policy(policy);
    let initial_data = program.data_segment().to_vec();
    let mut sim = DatapathSim::with_program(layout, config, program)
        .context("could not build the datapath")?;
    sim.run(clocks)
        .with_context(|| format!("simulation stopped at pc {:#x}", sim.pc()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
        return Ok(());
    }

    println!(
        "{} layout, {} clocks, pc = {:#x}",
        Colour::Cyan.bold().paint(layout.name()),
        sim.clock_count(),
        sim.pc()
    );
    for (index, value) in sim.registers() {
        if value != 0 {
            println!(
                "{} {}",
                Colour::Green.bold().paint(format!("${index:<2}")),
                format_reg_val(value)
            );
        }
    }
    for (addr, before, after) in mem_diff(&initial_data, &sim.data_words()) {
        println!(
            "{} {} -> {}",
            Colour::Yellow.paint(format!("[{addr:#05x}]")),
            before,
            Colour::Yellow.bold().paint(after.to_string())
        );
    }
    Ok(())
}
