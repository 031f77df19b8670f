//! Line-oriented lexer for the assembly source.

use std::{iter::Peekable, str::Chars};

use crate::isa::Mnemonic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Decimal literal, optionally negative. Saturates at the `i64` bounds.
    Num(i64),
    Keyword(Mnemonic),
    /// The `data` keyword opening the data section.
    Data,
    Colon,
    Dollar,
    Comma,
    LBracket,
    RBracket,
    Eol,
    Eof,
    /// Anything else: unknown names, stray punctuation, a lone `-`.
    Bad,
}

pub struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    /// 1-based line of the next character
    line: usize,
    /// line on which the last returned token started
    token_line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            token_line: 1,
        }
    }

    /// Line of the most recently returned token. For [`Token::Eol`] this is
    /// the line it terminates.
    pub fn line(&self) -> usize {
        self.token_line
    }

    fn skip_spaces(&mut self) {
        while self
            .chars
            .next_if(|c| c.is_whitespace() && *c != '\n')
            .is_some()
        {}
    }

    /// Accumulate decimal digits onto `acc`, saturating.
    fn read_digits(&mut self, mut acc: Option<i64>) -> Option<i64> {
        while let Some(d) = self.chars.next_if(char::is_ascii_digit) {
            let d = d.to_digit(10).unwrap_or_default() as i64;
            acc = Some(acc.unwrap_or(0).saturating_mul(10).saturating_add(d));
        }
        acc
    }

    fn read_name(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while let Some(c) = self.chars.next_if(char::is_ascii_alphanumeric) {
            name.push(c);
        }
        if name.eq_ignore_ascii_case("data") {
            Token::Data
        } else if let Some(m) = Mnemonic::from_keyword(&name) {
            Token::Keyword(m)
        } else {
            Token::Bad
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_spaces();
        self.token_line = self.line;
        let Some(c) = self.chars.next() else {
            return Token::Eof;
        };
        match c {
            '\n' => {
                self.line += 1;
                Token::Eol
            }
            '-' => match self.read_digits(None) {
                Some(n) => Token::Num(-n),
                None => Token::Bad,
            },
            '0'..='9' => {
                let first = c.to_digit(10).unwrap_or_default() as i64;
                Token::Num(self.read_digits(Some(first)).unwrap_or(first))
            }
            c if c.is_ascii_alphabetic() => self.read_name(c),
            ':' => Token::Colon,
            ',' => Token::Comma,
            '$' => Token::Dollar,
            '(' => Token::LBracket,
            ')' => Token::RBracket,
            _ => Token::Bad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(src);
        let mut out = Vec::new();
        loop {
            let tok = scanner.next_token();
            out.push(tok);
            if tok == Token::Eof {
                return out;
            }
        }
    }

    #[test]
    fn test_load_line() {
        use Token::*;
        assert_eq!(
            tokens("lw $1, -16($29)\n"),
            vec![
                Keyword(Mnemonic::Lw),
                Dollar,
                Num(1),
                Comma,
                Num(-16),
                LBracket,
                Dollar,
                Num(29),
                RBracket,
                Eol,
                Eof
            ]
        );
    }

    #[test]
    fn test_keywords_and_bad() {
        use Token::*;
        assert_eq!(
            tokens("AddI Data: mul - ;"),
            vec![Keyword(Mnemonic::Addi), Data, Colon, Bad, Bad, Bad, Eof]
        );
        assert_eq!(tokens("99999999999999999999999")[0], Num(i64::MAX));
    }

    #[test]
    fn test_line_tracking() {
        let mut scanner = Scanner::new("nop\r\n\n  add");
        assert_eq!(scanner.next_token(), Token::Keyword(Mnemonic::Nop));
        assert_eq!(scanner.line(), 1);
        assert_eq!(scanner.next_token(), Token::Eol);
        assert_eq!(scanner.line(), 1);
        assert_eq!(scanner.next_token(), Token::Eol);
        assert_eq!(scanner.line(), 2);
        assert_eq!(scanner.next_token(), Token::Keyword(Mnemonic::Add));
        assert_eq!(scanner.line(), 3);
    }
}
