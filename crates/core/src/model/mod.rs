//! Core data model for images: modules, functions, instrumentation points.
//!
//! Modules and functions live in arenas owned by their `Image`; everything
//! else refers to them through `ModuleId` / `FuncId` handles. A handle never
//! outlives the image that issued it.

mod function;
mod module;
mod point;

pub use function::Function;
pub use module::{LineTable, Module};
pub use point::{InstPoint, Instruction, PointKind};

use serde::{Deserialize, Serialize};

/// Absolute address inside an image.
pub type Address = u64;

/// Contents of the line-number field when the line is unknown.
pub const UNKNOWN_LINE: u32 = 0;

/// Pseudo-module for functions inside the dynamic-runtime range.
pub const DYN_MODULE: &str = "DYN_MODULE";
/// Pseudo-module for functions that live in the data segment.
pub const EXTRA_MODULE: &str = "EXTRA_MODULE";
/// Pseudo-module for unannotated functions inside the declared user range.
pub const USER_MODULE: &str = "USER_MODULE";
/// Pseudo-module for everything else.
pub const LIBRARY_MODULE: &str = "LIBRARY_MODULE";

/// Handle of a function inside its image's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a module inside its image's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Classification bits attached to a function.
///
/// Tags are an independent axis from module placement: a function in a user
/// module may still carry `LIB_FUNC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(u32);

impl Tags {
    pub const NONE: Tags = Tags(0);
    pub const LIB_FUNC: Tags = Tags(0x1);
    pub const IO_OUT: Tags = Tags(0x2);
    pub const IO_IN: Tags = Tags(0x4);
    pub const MSG_SEND: Tags = Tags(0x8);
    pub const MSG_RECV: Tags = Tags(0x10);
    pub const SYNC_FUNC: Tags = Tags(0x20);
    /// The function blocks waiting for an external event.
    pub const CPU_STATE: Tags = Tags(0x40);
    pub const MSG_FILT: Tags = Tags(0x80);

    pub const fn from_bits(bits: u32) -> Self {
        Tags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Tags) -> Self {
        Tags(self.0 | other.0)
    }

    /// True if any bit of `mask` is set.
    pub const fn intersects(self, mask: Tags) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn insert(&mut self, other: Tags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Tags) {
        self.0 &= !other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Tags {
    type Output = Tags;

    fn bitor(self, rhs: Tags) -> Tags {
        self.union(rhs)
    }
}

/// Source language of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Unknown,
    Assembly,
    C,
    CPlusPlus,
    GnuCPlusPlus,
    Fortran,
    CMFortran,
}

impl Language {
    /// Guess the language from a source file name.
    pub fn from_file_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Language::Unknown;
        };
        match ext {
            "s" | "S" | "asm" => Language::Assembly,
            "c" | "h" => Language::C,
            "C" | "cc" | "cpp" | "cxx" | "hpp" => Language::CPlusPlus,
            "f" | "F" | "for" | "f77" | "f90" => Language::Fortran,
            "fcm" => Language::CMFortran,
            _ => Language::Unknown,
        }
    }
}

/// Produce the human-readable form of a symbol name.
///
/// Rust and Itanium C++ manglings are recognized; anything else is returned
/// unchanged.
pub fn pretty_name(symbol: &str) -> String {
    if let Ok(demangled) = rustc_demangle::try_demangle(symbol) {
        return format!("{demangled:#}");
    }
    if symbol.starts_with("_Z") {
        if let Ok(sym) = cpp_demangle::Symbol::new(symbol) {
            if let Ok(text) = sym.demangle(&cpp_demangle::DemangleOptions::default()) {
                return text;
            }
        }
    }
    symbol.to_string()
}
