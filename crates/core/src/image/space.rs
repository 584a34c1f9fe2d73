use serde::{Deserialize, Serialize};

use crate::backends::reader::{ObjectFile, WORD_SIZE};
use crate::config::AddrRange;
use crate::error::SymtabError;
use crate::model::Address;

/// Code and data extents of one image.
///
/// Lengths are in words. An address is valid for instruction access only if
/// it is word-aligned and falls in the code or the data range; some code ends
/// up in the data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpace {
    code_offset: Address,
    code_len: u64,
    data_offset: Address,
    data_len: u64,
}

impl AddressSpace {
    pub fn new(code_offset: Address, code_len: u64, data_offset: Address, data_len: u64) -> Self {
        Self { code_offset, code_len, data_offset, data_len }
    }

    /// Build from an object file, rejecting overlapping code and data.
    pub fn from_object(object: &ObjectFile) -> Result<Self, SymtabError> {
        let space =
            Self::new(object.code_base, object.code_words(), object.data_base, object.data_words());
        let (code, data) = (space.code_range(), space.data_range());
        let overlap = code.start < code.end
            && data.start < data.end
            && code.start < data.end
            && data.start < code.end;
        if overlap {
            return Err(SymtabError::OverlappingSegments {
                code_start: code.start,
                code_end: code.end,
                data_start: data.start,
                data_end: data.end,
            });
        }
        Ok(space)
    }

    pub fn code_offset(&self) -> Address {
        self.code_offset
    }

    pub fn code_len(&self) -> u64 {
        self.code_len
    }

    pub fn data_offset(&self) -> Address {
        self.data_offset
    }

    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    pub fn code_range(&self) -> AddrRange {
        let end = self.code_offset.saturating_add(self.code_len.saturating_mul(WORD_SIZE));
        AddrRange::new(self.code_offset, end)
    }

    pub fn data_range(&self) -> AddrRange {
        let end = self.data_offset.saturating_add(self.data_len.saturating_mul(WORD_SIZE));
        AddrRange::new(self.data_offset, end)
    }

    pub fn is_code(&self, addr: Address) -> bool {
        self.code_range().contains(addr)
    }

    pub fn is_data(&self, addr: Address) -> bool {
        self.data_range().contains(addr)
    }

    pub fn is_valid(&self, addr: Address) -> bool {
        addr % WORD_SIZE == 0 && (self.is_code(addr) || self.is_data(addr))
    }
}
