use serde::{Deserialize, Serialize};

use crate::model::{Address, FuncId};

/// Raw bytes of one machine instruction as found in the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub addr: Address,
    pub bytes: Vec<u8>,
}

impl Instruction {
    pub fn new(addr: Address, bytes: impl Into<Vec<u8>>) -> Self {
        Self { addr, bytes: bytes.into() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The instruction as a 32-bit word, for fixed-width architectures.
    pub fn word(&self, little_endian: bool) -> Option<u32> {
        let raw: [u8; 4] = self.bytes.get(..4)?.try_into().ok()?;
        Some(if little_endian { u32::from_le_bytes(raw) } else { u32::from_be_bytes(raw) })
    }
}

/// What an instrumentation point marks inside its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Entry,
    Return,
    Call,
}

/// One address considered for instrumentation.
///
/// Points are produced by call-point discovery and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstPoint {
    pub kind: PointKind,
    pub addr: Address,
    pub original: Instruction,
    /// Instruction in the delay slot following `original`, if the architecture has them.
    pub delay_slot: Option<Instruction>,
    /// Extra instruction that must move with the call when it returns an aggregate.
    pub aggregate: Option<Instruction>,
    /// `original` itself sits in the delay slot of the preceding instruction.
    pub in_delay_slot: bool,
    /// `original` is a delayed control transfer.
    pub is_delayed: bool,
    /// Call target is computed at run time.
    pub call_indirect: bool,
    pub call_aggregate: bool,
    pub callee: Option<FuncId>,
    pub func: FuncId,
}

impl InstPoint {
    pub(crate) fn new(kind: PointKind, func: FuncId, original: Instruction) -> Self {
        Self {
            kind,
            addr: original.addr,
            original,
            delay_slot: None,
            aggregate: None,
            in_delay_slot: false,
            is_delayed: false,
            call_indirect: false,
            call_aggregate: false,
            callee: None,
            func,
        }
    }

    pub fn is_call(&self) -> bool {
        self.kind == PointKind::Call
    }
}
