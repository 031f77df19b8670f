use thiserror::Error;

/// Structured parse error codes. The messages are the ones shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParseErrorKind {
    #[error("Instruction is required.")]
    Instruction,
    #[error("'$' is required.")]
    Dollar,
    #[error("Register number is required.")]
    Register,
    #[error("Register number was outside allowable bounds (0-31).")]
    RegisterOutOfRange,
    #[error("',' is required.")]
    Comma,
    #[error("Offset number is required.")]
    Offset,
    #[error("Offset number was outside allowable bounds (-32768-32767).")]
    OffsetOutOfRange,
    #[error("'(' is required.")]
    LBracket,
    #[error("')' is required.")]
    RBracket,
    #[error("Immediate number is required.")]
    Immediate,
    #[error("Immediate number was outside allowable bounds (-32768-32767).")]
    ImmediateOutOfRange,
    #[error("End of line required after instruction.")]
    Eol,
    #[error("'Data' label is required.")]
    NoDataTag,
    #[error("':' is required.")]
    NoColon,
}

/// One parse error with the line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based source line
    pub line: usize,
    pub text: String,
}
