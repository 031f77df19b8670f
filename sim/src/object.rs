//! The assembled program: instruction words, their display strings and the
//! initial data segment.

use std::{collections::BTreeMap, fmt::Display};

use crate::isa::{Format, InstFields, Mnemonic, MAX_DATA, MAX_INSTRUCTIONS};

/// Display form of one instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SourceInfo {
    /// Normalised instruction text, or the raw source line if it failed to parse.
    pub text: String,
    pub err: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// address -> word, only for lines that parsed cleanly
    pub(crate) words: BTreeMap<u32, u32>,
    /// address -> mnemonic of the line at that address (also for bad lines
    /// that started with a mnemonic)
    pub(crate) symbols: BTreeMap<u32, Mnemonic>,
    pub(crate) source: BTreeMap<u32, SourceInfo>,
    pub(crate) data: Vec<u32>,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            words: Default::default(),
            symbols: Default::default(),
            source: Default::default(),
            data: vec![0; MAX_DATA as usize],
        }
    }
}

impl Program {
    /// Instruction word at `address`; unassembled addresses read as `NOP`.
    pub fn word(&self, address: u32) -> u32 {
        self.words.get(&address).copied().unwrap_or_default()
    }

    /// Every assembled `(address, word)` pair inside the instruction memory.
    pub fn words(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.words
            .range(..MAX_INSTRUCTIONS)
            .map(|(addr, word)| (*addr, *word))
    }

    pub fn mnemonic(&self, address: u32) -> Option<Mnemonic> {
        self.symbols.get(&address).copied()
    }

    pub fn source(&self, address: u32) -> Option<&SourceInfo> {
        self.source.get(&address)
    }

    /// Number of instruction lines, including bad ones.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Instruction fields for the field view. Bad or empty addresses only
    /// show the opcode.
    pub fn fields(&self, address: u32) -> InstFields {
        let format = match self.mnemonic(address) {
            Some(m) if self.words.contains_key(&address) => m.format(),
            _ => Format::Nop,
        };
        InstFields::split(self.word(address), format)
    }

    pub fn data(&self, index: u32) -> Option<u32> {
        self.data.get(index as usize).copied()
    }

    pub fn set_data(&mut self, index: u32, value: u32) -> bool {
        match self.data.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn data_segment(&self) -> &[u32] {
        &self.data
    }
}

/// Save format: one instruction per line, then the `Data:` section with
/// 16 words per line.
impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for info in self.source.values() {
            writeln!(f, "{}", info.text)?;
        }
        writeln!(f, "Data:")?;
        for row in self.data.chunks(16) {
            for word in row {
                write!(f, "{word}, ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
