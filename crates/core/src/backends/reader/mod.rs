mod elf;
mod memory;

pub use elf::ElfReader;
pub use memory::MemoryReader;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SymtabError;
use crate::model::Address;

/// Bytes per word in the code and data word sequences.
pub const WORD_SIZE: u64 = 4;

/// Instruction-set architecture of an object file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Sparc,
    X86,
    X86_64,
    Arm,
    Arm64,
    Unknown,
}

impl Arch {
    /// Parse a user-supplied architecture hint.
    pub fn from_hint(hint: &str) -> Self {
        match hint.to_lowercase().as_str() {
            "sparc" | "sparcv8" | "sparc32" => Arch::Sparc,
            "x86" | "i386" => Arch::X86,
            "x86_64" | "amd64" => Arch::X86_64,
            "arm" | "armv7" => Arch::Arm,
            "arm64" | "aarch64" => Arch::Arm64,
            _ => Arch::Unknown,
        }
    }
}

/// Classification of a raw symbol record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Object,
    Other,
}

/// One symbol as the object reader reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSymbol {
    pub name: String,
    pub address: Address,
    pub size: u64,
    pub kind: SymbolKind,
    /// Source file the symbol belongs to, when the object file says so.
    pub module: Option<String>,
}

impl RawSymbol {
    pub fn function(name: impl Into<String>, address: Address, size: u64) -> Self {
        Self { name: name.into(), address, size, kind: SymbolKind::Function, module: None }
    }

    pub fn object(name: impl Into<String>, address: Address, size: u64) -> Self {
        Self { name: name.into(), address, size, kind: SymbolKind::Object, module: None }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

/// Everything the engine needs from one object file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFile {
    pub arch: Arch,
    pub little_endian: bool,
    pub code_base: Address,
    pub code: Vec<u8>,
    pub data_base: Address,
    pub data: Vec<u8>,
    /// Symbols in symbol-table order.
    pub symbols: Vec<RawSymbol>,
}

impl ObjectFile {
    pub fn code_words(&self) -> u64 {
        (self.code.len() as u64).div_ceil(WORD_SIZE)
    }

    pub fn data_words(&self) -> u64 {
        (self.data.len() as u64).div_ceil(WORD_SIZE)
    }
}

/// Source of raw symbol records and code/data bytes.
pub trait ObjectReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<ObjectFile, SymtabError>;
    fn name(&self) -> &'static str;
}
