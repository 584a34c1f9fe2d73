use super::{CallTarget, DecodedInsn, InsnClass, InstructionDecoder};
use crate::model::Address;

const REG_G0: u32 = 0;
const REG_O7: u32 = 15;
const REG_I7: u32 = 31;

const OP3_JMPL: u32 = 0x38;
const OP3_RETT: u32 = 0x39;

/// Word-level SPARC classifier.
///
/// Every control transfer has a delay slot. `call` is direct, `jmpl` into
/// `%o7` is an indirect call, `jmpl %i7+8` / `%o7+8` are `ret` / `retl`
/// (`+12` when the caller expects an aggregate), and `unimp` after a call's
/// delay slot marks an aggregate return.
#[derive(Debug, Clone, Copy)]
pub struct SparcDecoder {
    little_endian: bool,
}

impl SparcDecoder {
    pub fn new(little_endian: bool) -> Self {
        Self { little_endian }
    }

    pub fn classify(word: u32, addr: Address) -> InsnClass {
        let op = word >> 30;
        match op {
            1 => {
                let disp = ((word << 2) as i32) as i64;
                InsnClass::Call(CallTarget::Direct(addr.wrapping_add(disp as u64)))
            }
            0 => match (word >> 22) & 0x7 {
                0 => InsnClass::AggregateMarker,
                1 | 2 | 3 | 5 | 6 | 7 => InsnClass::Branch,
                _ => InsnClass::Other,
            },
            2 => {
                let op3 = (word >> 19) & 0x3f;
                let rd = (word >> 25) & 0x1f;
                let rs1 = (word >> 14) & 0x1f;
                let imm = (word >> 13) & 1 == 1;
                let simm13 = (((word & 0x1fff) << 19) as i32) >> 19;
                match op3 {
                    OP3_JMPL if rd == REG_O7 => {
                        if rs1 == REG_G0 && imm {
                            // Constant target reached through jmpl.
                            InsnClass::Call(CallTarget::Unknown)
                        } else {
                            InsnClass::Call(CallTarget::Indirect)
                        }
                    }
                    OP3_JMPL
                        if rd == REG_G0
                            && imm
                            && (rs1 == REG_I7 || rs1 == REG_O7)
                            && (simm13 == 8 || simm13 == 12) =>
                    {
                        InsnClass::Return
                    }
                    OP3_JMPL => InsnClass::Branch,
                    OP3_RETT => InsnClass::Return,
                    _ => InsnClass::Other,
                }
            }
            _ => InsnClass::Other,
        }
    }
}

impl InstructionDecoder for SparcDecoder {
    fn name(&self) -> &'static str {
        "sparc"
    }

    fn has_delay_slots(&self) -> bool {
        true
    }

    fn decode(&self, bytes: &[u8], addr: Address) -> Option<DecodedInsn> {
        let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        let word = if self.little_endian { u32::from_le_bytes(raw) } else { u32::from_be_bytes(raw) };
        Some(DecodedInsn { len: 4, class: Self::classify(word, addr) })
    }
}
