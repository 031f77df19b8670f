//! Assembler for the MIPS subset: a hand-written scanner and a recursive
//! descent parser producing a [`Program`].
mod error;
mod parser;
mod scanner;

pub use error::{ParseError, ParseErrorKind};
pub use parser::Parser;
pub use scanner::{Scanner, Token};

use crate::object::Program;

#[derive(Debug, Clone, Default)]
pub struct ParseOption {
    require_data_tag: bool,
}

impl ParseOption {
    /// Report [`ParseErrorKind::NoDataTag`] when the source has no `Data:`
    /// section.
    pub fn set_require_data_tag(mut self, require: bool) -> Self {
        self.require_data_tag = require;
        self
    }
}

/// Result of a parse pass: the program (bad lines included as raw text) and
/// every error in source order.
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

impl ParseReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Parse a whole program.
pub fn parse(src: &str, option: ParseOption) -> ParseReport {
    let (program, errors) = Parser::new(src, option).parse();
    ParseReport { program, errors }
}

/// Parse a program and fail if any line is bad.
pub fn assemble(src: &str, option: ParseOption) -> anyhow::Result<Program> {
    let report = parse(src, option);
    if let Some(first) = report.errors.first() {
        let listing: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        tracing::debug!("parse errors:\n{}", listing.join("\n"));
        anyhow::bail!(
            "{} error(s) in program, first at {}",
            report.error_count(),
            first
        );
    }
    Ok(report.program)
}

#[cfg(test)]
pub mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::isa::Mnemonic;

    pub const SUM_ASM: &str = "ADDI $1, $0, 5
ADDI $2, $0, 7
ADD $3, $1, $2
";

    #[test]
    fn test_parse_ok() {
        let report = parse(SUM_ASM, ParseOption::default());
        assert!(report.is_ok());
        let p = &report.program;
        assert_eq!(p.len(), 3);
        assert_eq!(p.word(0), 0x2001_0005);
        assert_eq!(p.word(4), 0x2002_0007);
        assert_eq!(p.word(8), 0x0022_1820);
        assert_eq!(p.mnemonic(8), Some(Mnemonic::Add));
        assert_eq!(p.source(4).map(|s| s.text.as_str()), Some("ADDI $2, $0, 7"));
    }

    #[test]
    fn test_missing_operand() {
        let report = parse("ADD $1, $2", ParseOption::default());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].kind, ParseErrorKind::Comma);
        assert_eq!(report.errors[0].line, 1);
        assert_eq!(report.program.words().count(), 0);
        let info = report.program.source(0).unwrap();
        assert!(info.err);
        assert_eq!(info.text, "ADD $1, $2");
    }

    #[test]
    fn test_error_recovery() {
        let src = "lw $1, 4($2\nfoo $1\nsw $40, 0($0)\nadd $1 $2, $3\nnop\naddi $1, $2, 40000\n";
        let report = parse(src, ParseOption::default());
        let kinds: Vec<_> = report.errors.iter().map(|e| (e.line, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (1, ParseErrorKind::RBracket),
                (2, ParseErrorKind::Instruction),
                (3, ParseErrorKind::RegisterOutOfRange),
                (4, ParseErrorKind::Comma),
                (6, ParseErrorKind::ImmediateOutOfRange),
            ]
        );
        // bad lines still take an address
        assert_eq!(report.program.len(), 6);
        assert_eq!(report.program.source(16).map(|s| s.err), Some(false));
        assert_eq!(report.program.words().collect::<Vec<_>>(), vec![(16, 0)]);
        assert_eq!(report.program.mnemonic(4), None);
        assert_eq!(report.program.mnemonic(8), Some(Mnemonic::Sw));
    }

    #[test]
    fn test_trailing_tokens() {
        let report = parse("nop nop\n", ParseOption::default());
        assert_eq!(report.errors[0].kind, ParseErrorKind::Eol);
        let report = parse("beq $1, $2 -3\n", ParseOption::default());
        assert_eq!(report.errors[0].kind, ParseErrorKind::Comma);
        let report = parse("lw $1, ($2)\n", ParseOption::default());
        assert_eq!(report.errors[0].kind, ParseErrorKind::Offset);
        let report = parse("and 1, $2, $3\n", ParseOption::default());
        assert_eq!(report.errors[0].kind, ParseErrorKind::Dollar);
        let report = parse("or $, $2, $3\n", ParseOption::default());
        assert_eq!(report.errors[0].kind, ParseErrorKind::Register);
    }

    #[test]
    fn test_assemble_rejects_bad_program() {
        let err = assemble("ADD $1, $2\nNOP\nfoo\n", ParseOption::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "2 error(s) in program, first at line 1: ',' is required."
        );
        assert!(assemble(SUM_ASM, ParseOption::default()).is_ok());
    }

    #[test]
    fn test_data_section() {
        let report = parse("LW $1, 0($0)\nData:\n42, -1,\n, 7", ParseOption::default());
        assert!(report.is_ok());
        let data = report.program.data_segment();
        assert_eq!(&data[..4], &[42, u32::MAX, 0, 7]);
    }

    #[test]
    fn test_data_words_out_of_range_or_unseparated() {
        let report = parse(
            "nop\nData:\n4294967297, -2147483649, 4294967295, -2147483648, 7",
            ParseOption::default(),
        );
        assert!(report.is_ok());
        assert_eq!(
            &report.program.data_segment()[..5],
            &[0, 0, u32::MAX, 0x8000_0000, 7]
        );

        // a word in place of the comma is lost and its slot reads as empty
        let report = parse("nop\nData:\n42 43, 44", ParseOption::default());
        assert!(report.is_ok());
        assert_eq!(&report.program.data_segment()[..4], &[42, 0, 44, 0]);
    }

    #[test]
    fn test_data_tag() {
        let option = ParseOption::default().set_require_data_tag(true);
        let report = parse("nop\n", option.clone());
        assert_eq!(report.errors[0].kind, ParseErrorKind::NoDataTag);
        let report = parse("nop\ndata", option);
        assert_eq!(report.errors[0].kind, ParseErrorKind::NoColon);
    }

    #[test]
    fn test_save_format_reparses() {
        let src = "sub $4, $3, $2\nslt $5, $4, $0\nbeq $5, $0, -2\nsw $4, 8($0)\nData:\n3, 4\n";
        let first = parse(src, ParseOption::default());
        assert!(first.is_ok());
        let second = parse(&first.program.to_string(), ParseOption::default());
        assert!(second.is_ok());
        assert_eq!(first.program, second.program);
    }
}
