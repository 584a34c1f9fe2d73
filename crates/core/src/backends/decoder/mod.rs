#[cfg(feature = "capstone-backend")]
mod capstone;
mod sparc;

#[cfg(feature = "capstone-backend")]
pub use self::capstone::CapstoneDecoder;
pub use sparc::SparcDecoder;

use crate::backends::reader::Arch;
use crate::model::Address;

/// Where a call instruction transfers control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Direct(Address),
    /// Target is computed at run time.
    Indirect,
    /// Neither provably direct nor provably indirect; treated as indirect.
    Unknown,
}

/// Control-flow shape of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsnClass {
    Call(CallTarget),
    Return,
    /// Any other control transfer (jumps, conditional branches).
    Branch,
    /// Marks that the preceding call returns an aggregate (SPARC `unimp`).
    AggregateMarker,
    /// Instruction that precedes the logical entry point (x86 `endbr64`).
    Prologue,
    Other,
}

impl InsnClass {
    pub fn is_control_transfer(self) -> bool {
        matches!(self, InsnClass::Call(_) | InsnClass::Return | InsnClass::Branch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInsn {
    pub len: usize,
    pub class: InsnClass,
}

/// Classifies instructions just enough to find entry, return and call sites.
pub trait InstructionDecoder {
    fn name(&self) -> &'static str;

    /// Control transfers are followed by a delay slot.
    fn has_delay_slots(&self) -> bool;

    /// Decode the instruction at the start of `bytes`, located at `addr`.
    fn decode(&self, bytes: &[u8], addr: Address) -> Option<DecodedInsn>;
}

/// Pick the decoder for an architecture, if one is available.
pub fn decoder_for(arch: Arch, little_endian: bool) -> Option<Box<dyn InstructionDecoder>> {
    match arch {
        Arch::Sparc => Some(Box::new(SparcDecoder::new(little_endian))),
        #[cfg(feature = "capstone-backend")]
        Arch::X86 | Arch::X86_64 | Arch::Arm | Arch::Arm64 => {
            match CapstoneDecoder::new(arch) {
                Ok(decoder) => Some(Box::new(decoder)),
                Err(err) => {
                    log::warn!("capstone unavailable for {arch:?}: {err}");
                    None
                }
            }
        }
        _ => None,
    }
}
