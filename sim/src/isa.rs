//! Instruction set of the MIPS subset executed by the datapath.
//!
//! Words are 32 bits. Register-format words carry `op | rs | rt | rd | shamt | funct`,
//! immediate-format words carry `op | rs | rt | imm16`.

use std::fmt::Display;

macro_rules! define_code {
    {
        @mod $modname:ident;
        @type $typ:ty;
        $( $cname:ident = $cval:expr; )*
    } => {
        pub mod $modname {
            $(pub const $cname : $typ = $cval; )*
            #[allow(unused)]
            pub fn name_of(code: $typ) -> &'static str {
                match code {
                    $($cname => stringify!($cname), )*
                    _ => "no name"
                }
            }
        }
    };
}
pub(crate) use define_code;

define_code! {
    @mod op_code;
    @type u32;
    RTYPE = 0;
    BEQ = 4;
    ADDI = 8;
    LW = 35;
    SW = 43;
}

define_code! {
    @mod funct_code;
    @type u32;
    ADD = 32;
    SUB = 34;
    AND = 36;
    OR = 37;
    SLT = 42;
}

// 3-bit operation selector consumed by the ALU
define_code! {
    @mod alu_code;
    @type u32;
    AND = 0;
    OR = 1;
    ADD = 2;
    SUB = 6;
    SLT = 7;
}

/// Size in bytes of the instruction address space (128 words).
pub const MAX_INSTRUCTIONS: u32 = 512;
pub const MAX_REGISTERS: usize = 32;
/// Number of words in the data segment.
pub const MAX_DATA: u32 = 512;

/// Bit position of each field inside an instruction word.
pub mod field {
    use super::BitField;

    pub const OPCODE: BitField = BitField::new(26, 6);
    pub const RS: BitField = BitField::new(21, 5);
    pub const RT: BitField = BitField::new(16, 5);
    pub const RD: BitField = BitField::new(11, 5);
    pub const FUNCT: BitField = BitField::new(0, 6);
    pub const IMM: BitField = BitField::new(0, 16);
    /// shamt and funct together, as shown in the field view
    pub const LOW11: BitField = BitField::new(0, 11);
}

/// A contiguous run of bits inside a 32-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BitField {
    pub start: u8,
    pub len: u8,
}

impl BitField {
    pub const fn new(start: u8, len: u8) -> Self {
        Self { start, len }
    }

    pub fn mask(self) -> u32 {
        if self.len >= 32 {
            u32::MAX
        } else {
            ((1u32 << self.len) - 1) << self.start
        }
    }

    pub fn extract(self, value: u32) -> u32 {
        (value & self.mask()) >> self.start
    }

    pub fn insert(self, value: u32, field: u32) -> u32 {
        (value & !self.mask()) | ((field << self.start) & self.mask())
    }
}

pub fn arithmetic_compute(a: u32, b: u32, code: u32) -> Option<u32> {
    use alu_code::*;
    match code {
        AND => Some(a & b),
        OR => Some(a | b),
        ADD => Some(a.wrapping_add(b)),
        SUB => Some(a.wrapping_sub(b)),
        SLT => Some(set_less_than(a, b) as u32),
        _ => None,
    }
}

/// Signed comparison of two words read as two's complement.
pub fn set_less_than(a: u32, b: u32) -> bool {
    (a as i32) < (b as i32)
}

/// Replicate bit 15 of the low half-word into bits 16..32.
pub fn sign_extend(value: u32) -> u32 {
    value as u16 as i16 as i32 as u32
}

/// Two's complement encoding of a signed 16-bit immediate.
pub fn encode_imm(value: i16) -> u32 {
    value as u16 as u32
}

/// Instruction layout as written in assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `OP $rd, $rs, $rt`
    Register,
    /// `OP $rt, $rs, imm`
    Immediate,
    /// `OP $rt, offset($rs)`
    LoadStore,
    Nop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Mnemonic {
    Lw,
    Sw,
    Add,
    Sub,
    Slt,
    Addi,
    Or,
    And,
    Beq,
    Nop,
}

impl Mnemonic {
    pub const ALL: [Mnemonic; 10] = [
        Self::Lw,
        Self::Sw,
        Self::Add,
        Self::Sub,
        Self::Slt,
        Self::Addi,
        Self::Or,
        Self::And,
        Self::Beq,
        Self::Nop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Lw => "LW",
            Self::Sw => "SW",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Slt => "SLT",
            Self::Addi => "ADDI",
            Self::Or => "OR",
            Self::And => "AND",
            Self::Beq => "BEQ",
            Self::Nop => "NOP",
        }
    }

    /// Case-insensitive lookup of an assembly keyword.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(word))
    }

    pub fn format(self) -> Format {
        match self {
            Self::Lw | Self::Sw => Format::LoadStore,
            Self::Addi | Self::Beq => Format::Immediate,
            Self::Add | Self::Sub | Self::Slt | Self::Or | Self::And => Format::Register,
            Self::Nop => Format::Nop,
        }
    }

    pub fn opcode(self) -> u32 {
        match self {
            Self::Lw => op_code::LW,
            Self::Sw => op_code::SW,
            Self::Addi => op_code::ADDI,
            Self::Beq => op_code::BEQ,
            _ => op_code::RTYPE,
        }
    }

    /// Function field of register-format instructions.
    pub fn funct(self) -> Option<u32> {
        match self {
            Self::Add => Some(funct_code::ADD),
            Self::Sub => Some(funct_code::SUB),
            Self::And => Some(funct_code::AND),
            Self::Or => Some(funct_code::OR),
            Self::Slt => Some(funct_code::SLT),
            _ => None,
        }
    }
}

impl Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded instruction with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    Register {
        mnemonic: Mnemonic,
        rd: u8,
        rs: u8,
        rt: u8,
    },
    Immediate {
        mnemonic: Mnemonic,
        rt: u8,
        rs: u8,
        imm: i16,
    },
    LoadStore {
        mnemonic: Mnemonic,
        rt: u8,
        offset: i16,
        rs: u8,
    },
    Nop,
}

impl Inst {
    pub fn mnemonic(&self) -> Mnemonic {
        match *self {
            Inst::Register { mnemonic, .. }
            | Inst::Immediate { mnemonic, .. }
            | Inst::LoadStore { mnemonic, .. } => mnemonic,
            Inst::Nop => Mnemonic::Nop,
        }
    }

    pub fn encode(&self) -> u32 {
        use field::*;
        match *self {
            Inst::Register {
                mnemonic,
                rd,
                rs,
                rt,
            } => {
                let word = OPCODE.insert(0, mnemonic.opcode());
                let word = RS.insert(word, rs as u32);
                let word = RT.insert(word, rt as u32);
                let word = RD.insert(word, rd as u32);
                FUNCT.insert(word, mnemonic.funct().unwrap_or_default())
            }
            Inst::Immediate {
                mnemonic,
                rt,
                rs,
                imm: value,
            }
            | Inst::LoadStore {
                mnemonic,
                rt,
                offset: value,
                rs,
            } => {
                let word = OPCODE.insert(0, mnemonic.opcode());
                let word = RS.insert(word, rs as u32);
                let word = RT.insert(word, rt as u32);
                IMM.insert(word, encode_imm(value))
            }
            Inst::Nop => 0,
        }
    }

    /// Decode a word. The all-zero word is `NOP`; words with an opcode or
    /// function code outside the supported set decode to `None`.
    pub fn decode(word: u32) -> Option<Self> {
        use field::*;
        if word == 0 {
            return Some(Inst::Nop);
        }
        let rs = RS.extract(word) as u8;
        let rt = RT.extract(word) as u8;
        let imm = IMM.extract(word) as u16 as i16;
        let inst = match OPCODE.extract(word) {
            op_code::RTYPE => {
                let funct = FUNCT.extract(word);
                let mnemonic = Mnemonic::ALL
                    .into_iter()
                    .find(|m| m.funct() == Some(funct))?;
                Inst::Register {
                    mnemonic,
                    rd: RD.extract(word) as u8,
                    rs,
                    rt,
                }
            }
            op_code::ADDI => Inst::Immediate {
                mnemonic: Mnemonic::Addi,
                rt,
                rs,
                imm,
            },
            op_code::BEQ => Inst::Immediate {
                mnemonic: Mnemonic::Beq,
                rt,
                rs,
                imm,
            },
            op_code::LW => Inst::LoadStore {
                mnemonic: Mnemonic::Lw,
                rt,
                offset: imm,
                rs,
            },
            op_code::SW => Inst::LoadStore {
                mnemonic: Mnemonic::Sw,
                rt,
                offset: imm,
                rs,
            },
            _ => return None,
        };
        Some(inst)
    }
}

impl Display for Inst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inst::Register {
                mnemonic,
                rd,
                rs,
                rt,
            } => write!(f, "{mnemonic} ${rd}, ${rs}, ${rt}"),
            Inst::Immediate {
                mnemonic,
                rt,
                rs,
                imm,
            } => write!(f, "{mnemonic} ${rt}, ${rs}, {imm}"),
            Inst::LoadStore {
                mnemonic,
                rt,
                offset,
                rs,
            } => write!(f, "{mnemonic} ${rt}, {offset}(${rs})"),
            Inst::Nop => write!(f, "NOP"),
        }
    }
}

/// An instruction word split into the fields that are meaningful for its
/// format. Absent fields are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstFields {
    pub opcode: u32,
    pub rs: Option<u32>,
    pub rt: Option<u32>,
    pub rd: Option<u32>,
    pub shamt_funct: Option<u32>,
    pub imm: Option<i16>,
}

impl InstFields {
    pub fn split(word: u32, format: Format) -> Self {
        use field::*;
        let opcode = OPCODE.extract(word);
        match format {
            Format::Nop => Self {
                opcode,
                ..Default::default()
            },
            Format::Register => Self {
                opcode,
                rs: Some(RS.extract(word)),
                rt: Some(RT.extract(word)),
                rd: Some(RD.extract(word)),
                shamt_funct: Some(LOW11.extract(word)),
                imm: None,
            },
            Format::Immediate | Format::LoadStore => Self {
                opcode,
                rs: Some(RS.extract(word)),
                rt: Some(RT.extract(word)),
                rd: None,
                shamt_funct: None,
                imm: Some(IMM.extract(word) as u16 as i16),
            },
        }
    }
}

impl Display for InstFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = vec![self.opcode.to_string()];
        for v in [self.rs, self.rt, self.rd, self.shamt_funct].into_iter().flatten() {
            parts.push(v.to_string());
        }
        if let Some(imm) = self.imm {
            parts.push(imm.to_string());
        }
        write!(f, "{}", parts.join(", "))
    }
}
