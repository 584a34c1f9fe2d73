use capstone::arch::{self, ArchOperand};
use capstone::prelude::*;
use capstone::{Capstone, InsnDetail, InsnGroupId, InsnGroupType};

use super::{CallTarget, DecodedInsn, InsnClass, InstructionDecoder};
use crate::backends::reader::Arch;
use crate::model::Address;

/// Capstone-backed decoder for architectures without delay slots.
pub struct CapstoneDecoder {
    cs: Capstone,
}

fn make_cs(target: Arch) -> Result<Capstone, capstone::Error> {
    match target {
        Arch::X86 => Capstone::new().x86().mode(arch::x86::ArchMode::Mode32).detail(true).build(),
        Arch::Arm => Capstone::new().arm().mode(arch::arm::ArchMode::Arm).detail(true).build(),
        Arch::Arm64 => {
            Capstone::new().arm64().mode(arch::arm64::ArchMode::Arm).detail(true).build()
        }
        _ => Capstone::new().x86().mode(arch::x86::ArchMode::Mode64).detail(true).build(),
    }
}

fn has_group(detail: &InsnDetail, group: u8) -> bool {
    detail.groups().iter().any(|g| *g == InsnGroupId(group))
}

/// Classify a call by its operands: an immediate is a direct target,
/// registers or memory mean the target is computed.
fn call_target(detail: &InsnDetail) -> CallTarget {
    let operands = detail.arch_detail().operands();
    if operands.is_empty() {
        return CallTarget::Unknown;
    }
    let direct = operands.iter().find_map(|op| match op {
        ArchOperand::X86Operand(op) => match op.op_type {
            arch::x86::X86OperandType::Imm(imm) => Some(imm as u64),
            _ => None,
        },
        ArchOperand::ArmOperand(op) => match op.op_type {
            arch::arm::ArmOperandType::Imm(imm) => Some(imm as u64),
            _ => None,
        },
        ArchOperand::Arm64Operand(op) => match op.op_type {
            arch::arm64::Arm64OperandType::Imm(imm) => Some(imm as u64),
            _ => None,
        },
        _ => None,
    });
    match direct {
        Some(target) => CallTarget::Direct(target),
        None => CallTarget::Indirect,
    }
}

impl CapstoneDecoder {
    pub fn new(target: Arch) -> Result<Self, capstone::Error> {
        Ok(Self { cs: make_cs(target)? })
    }

    pub fn version() -> String {
        let (major, minor) = Capstone::lib_version();
        format!("{major}.{minor}")
    }
}

impl InstructionDecoder for CapstoneDecoder {
    fn name(&self) -> &'static str {
        "capstone"
    }

    fn has_delay_slots(&self) -> bool {
        false
    }

    fn decode(&self, bytes: &[u8], addr: Address) -> Option<DecodedInsn> {
        let insns = self.cs.disasm_count(bytes, addr, 1).ok()?;
        let insn = insns.iter().next()?;
        let len = insn.bytes().len();
        let mnemonic = insn.mnemonic().unwrap_or("");
        if mnemonic == "endbr64" || mnemonic == "endbr32" {
            return Some(DecodedInsn { len, class: InsnClass::Prologue });
        }
        let Ok(detail) = self.cs.insn_detail(&insn) else {
            return Some(DecodedInsn { len, class: InsnClass::Other });
        };
        let class = if has_group(&detail, InsnGroupType::CS_GRP_CALL as u8) {
            InsnClass::Call(call_target(&detail))
        } else if has_group(&detail, InsnGroupType::CS_GRP_RET as u8) {
            InsnClass::Return
        } else if has_group(&detail, InsnGroupType::CS_GRP_JUMP as u8) {
            InsnClass::Branch
        } else {
            InsnClass::Other
        };
        Some(DecodedInsn { len, class })
    }
}
