//! Recursive-descent parser turning assembly text into a [`Program`].
//!
//! Errors are per instruction line: the first error on a line is recorded,
//! the rest of the line is skipped and parsing resumes on the next line.

use super::{
    error::{ParseError, ParseErrorKind},
    scanner::{Scanner, Token},
    ParseOption,
};
use crate::{
    isa::{Format, Inst, Mnemonic, MAX_DATA},
    object::{Program, SourceInfo},
};

pub struct Parser<'a> {
    src: &'a str,
    scanner: Scanner<'a>,
    option: ParseOption,
    cur: Token,
    address: u32,
    /// errors recorded for the instruction being read
    inst_errors: usize,
    errors: Vec<ParseError>,
    program: Program,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, option: ParseOption) -> Self {
        Self {
            src,
            scanner: Scanner::new(src),
            option,
            cur: Token::Eol,
            address: 0,
            inst_errors: 0,
            errors: Vec::new(),
            program: Program::default(),
        }
    }

    fn advance(&mut self) -> Token {
        self.cur = self.scanner.next_token();
        self.cur
    }

    fn line_text(&self, line: usize) -> String {
        self.src
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim_end()
            .to_string()
    }

    fn invalid(&mut self, kind: ParseErrorKind) {
        let line = self.scanner.line();
        self.errors.push(ParseError {
            kind,
            line,
            text: self.line_text(line),
        });
        while !matches!(self.cur, Token::Eol | Token::Eof) {
            self.advance();
        }
        self.inst_errors += 1;
    }

    pub fn parse(mut self) -> (Program, Vec<ParseError>) {
        while !matches!(self.cur, Token::Eof | Token::Data) {
            self.read_line();
        }
        if self.cur == Token::Data {
            self.read_data_section();
        } else if self.option.require_data_tag {
            self.invalid(ParseErrorKind::NoDataTag);
        }
        tracing::debug!(
            "parsed {} instruction lines, {} errors",
            self.program.len(),
            self.errors.len()
        );
        (self.program, self.errors)
    }

    fn read_line(&mut self) {
        self.inst_errors = 0;
        match self.advance() {
            Token::Keyword(mnemonic) => self.read_instruction(mnemonic),
            Token::Eol | Token::Eof | Token::Data => {}
            _ => {
                let line = self.scanner.line();
                self.invalid(ParseErrorKind::Instruction);
                self.record_bad(line);
            }
        }
    }

    fn record_bad(&mut self, line: usize) {
        let text = self.line_text(line);
        self.program
            .source
            .insert(self.address, SourceInfo { text, err: true });
        self.address += 4;
    }

    fn read_instruction(&mut self, mnemonic: Mnemonic) {
        let line = self.scanner.line();
        self.program.symbols.insert(self.address, mnemonic);
        let inst = match mnemonic.format() {
            Format::LoadStore => {
                let rt = self.read_register();
                self.read_punct(Token::Comma, ParseErrorKind::Comma);
                let offset =
                    self.read_num(ParseErrorKind::Offset, ParseErrorKind::OffsetOutOfRange);
                self.read_punct(Token::LBracket, ParseErrorKind::LBracket);
                let rs = self.read_register();
                self.read_punct(Token::RBracket, ParseErrorKind::RBracket);
                Inst::LoadStore {
                    mnemonic,
                    rt,
                    offset,
                    rs,
                }
            }
            Format::Immediate => {
                let rt = self.read_register();
                self.read_punct(Token::Comma, ParseErrorKind::Comma);
                let rs = self.read_register();
                self.read_punct(Token::Comma, ParseErrorKind::Comma);
                let imm = self.read_num(
                    ParseErrorKind::Immediate,
                    ParseErrorKind::ImmediateOutOfRange,
                );
                Inst::Immediate {
                    mnemonic,
                    rt,
                    rs,
                    imm,
                }
            }
            Format::Register => {
                let rd = self.read_register();
                self.read_punct(Token::Comma, ParseErrorKind::Comma);
                let rs = self.read_register();
                self.read_punct(Token::Comma, ParseErrorKind::Comma);
                let rt = self.read_register();
                Inst::Register {
                    mnemonic,
                    rd,
                    rs,
                    rt,
                }
            }
            Format::Nop => Inst::Nop,
        };
        self.read_eol();

        if self.inst_errors == 0 {
            self.program.words.insert(self.address, inst.encode());
            self.program.source.insert(
                self.address,
                SourceInfo {
                    text: inst.to_string(),
                    err: false,
                },
            );
            self.address += 4;
        } else {
            self.record_bad(line);
        }
    }

    fn read_register(&mut self) -> u8 {
        if self.inst_errors > 0 {
            return 0;
        }
        if self.advance() != Token::Dollar {
            self.invalid(ParseErrorKind::Dollar);
            return 0;
        }
        match self.advance() {
            Token::Num(n @ 0..=31) => n as u8,
            Token::Num(_) => {
                self.invalid(ParseErrorKind::RegisterOutOfRange);
                0
            }
            _ => {
                self.invalid(ParseErrorKind::Register);
                0
            }
        }
    }

    fn read_punct(&mut self, expected: Token, kind: ParseErrorKind) {
        if self.inst_errors > 0 {
            return;
        }
        if self.advance() != expected {
            self.invalid(kind);
        }
    }

    fn read_num(&mut self, missing: ParseErrorKind, out_of_range: ParseErrorKind) -> i16 {
        if self.inst_errors > 0 {
            return 0;
        }
        match self.advance() {
            Token::Num(n) => match i16::try_from(n) {
                Ok(v) => v,
                Err(_) => {
                    self.invalid(out_of_range);
                    0
                }
            },
            _ => {
                self.invalid(missing);
                0
            }
        }
    }

    fn read_eol(&mut self) {
        if self.inst_errors > 0 {
            return;
        }
        if !matches!(self.advance(), Token::Eol | Token::Eof) {
            self.invalid(ParseErrorKind::Eol);
        }
    }

    fn read_data_section(&mut self) {
        while !matches!(self.advance(), Token::Colon | Token::Eof) {}
        if self.cur == Token::Eof {
            self.invalid(ParseErrorKind::NoColon);
            return;
        }
        let mut index = 0u32;
        while self.cur != Token::Eof {
            self.read_memory_word(index);
            index += 1;
        }
    }

    /// Read one comma-terminated entry. An empty entry leaves the word as is.
    fn read_memory_word(&mut self, index: u32) {
        while !matches!(self.advance(), Token::Num(_) | Token::Comma | Token::Eof) {}
        let Token::Num(n) = self.cur else {
            return;
        };
        if !(i32::MIN as i64..=u32::MAX as i64).contains(&n) {
            tracing::warn!("data word {index} = {n} does not fit in 32 bits, dropped");
        } else if index < MAX_DATA {
            // negative values are stored in two's complement
            self.program.set_data(index, n as u32);
        } else {
            tracing::warn!("data word {index} is outside the data segment, dropped");
        }
        if !matches!(self.advance(), Token::Comma | Token::Eol | Token::Eof) {
            tracing::warn!("data word {index} is not followed by ',', skipping to the next one");
        }
    }
}
