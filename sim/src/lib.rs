//! Simulator of a MIPS-subset datapath in three layouts: single-cycle,
//! five-stage pipelined, and pipelined with forwarding.
//!
//! ```no_run
//! use mips_sim::{assemble, DatapathSim, Layout, ParseOption, SimConfig};
//!
//! let program = assemble("ADDI $1, $0, 5\n", ParseOption::default()).unwrap();
//! let mut sim =
//!     DatapathSim::with_program(Layout::SingleCycle, SimConfig::default(), program).unwrap();
//! sim.run(1).unwrap();
//! assert_eq!(sim.register(1), Ok(5));
//! ```
pub mod architectures;
pub mod asm;
mod config;
mod error;
pub mod framework;
pub mod isa;
mod object;
pub mod units;
mod utils;

pub use architectures::{arch_names, KeyUnits, Layout, Timing};
pub use asm::{assemble, parse, ParseError, ParseErrorKind, ParseOption, ParseReport};
pub use config::{ErrorPolicy, SimConfig};
pub use error::SimError;
pub use framework::{DatapathSim, InFlight, MemoryKind, SimContext, SimSnapshot};
pub use object::{Program, SourceInfo};
pub use utils::{format_reg_val, mem_diff};
