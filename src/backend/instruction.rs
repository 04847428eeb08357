//! Elements of the flat instruction stream the backend exposes per method body.
//!
//! A [`ForeignInstruction`] pairs a byte offset with an opcode form and its already-parsed
//! operand. The backend owns all byte-level parsing; this crate only ever sees streams of
//! these structured elements and hands equally structured streams back for serialization.

use std::fmt;

use crate::backend::{
    opcodes::{Op, OperandKind},
    token::Token,
};

/// An operand value as handed out (or accepted) by the module backend.
///
/// The variant must agree with the [`OperandKind`] of the carrying opcode; the codec
/// validates this agreement and treats mismatches as malformed input.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignOperand {
    /// No operand present
    None,
    /// Signed 8-bit immediate (`ldc.i4.s`)
    Int8(i8),
    /// Unsigned 8-bit index (`ldarg.s`, `unaligned.`)
    UInt8(u8),
    /// Unsigned 16-bit index (`ldarg`, `stloc`)
    UInt16(u16),
    /// Signed 32-bit immediate
    Int32(i32),
    /// Signed 64-bit immediate
    Int64(i64),
    /// 32-bit float immediate
    Float32(f32),
    /// 64-bit float immediate
    Float64(f64),
    /// Metadata token
    Token(Token),
    /// Pre-resolved string literal (`ldstr`)
    String(String),
    /// Branch target as an absolute byte offset within the body
    Target(u32),
    /// Switch table of absolute byte offsets within the body
    Switch(Vec<u32>),
}

impl ForeignOperand {
    /// Whether this operand value is admissible for the given shape.
    ///
    /// Branch displacements are carried as absolute offsets regardless of the encoded
    /// displacement width, so both target shapes accept [`ForeignOperand::Target`].
    #[must_use]
    pub fn matches(&self, kind: OperandKind) -> bool {
        matches!(
            (self, kind),
            (ForeignOperand::None, OperandKind::None)
                | (ForeignOperand::Int8(_), OperandKind::Int8)
                | (ForeignOperand::UInt8(_), OperandKind::UInt8)
                | (ForeignOperand::UInt16(_), OperandKind::UInt16)
                | (ForeignOperand::Int32(_), OperandKind::Int32)
                | (ForeignOperand::Int64(_), OperandKind::Int64)
                | (ForeignOperand::Float32(_), OperandKind::Float32)
                | (ForeignOperand::Float64(_), OperandKind::Float64)
                | (ForeignOperand::Token(_), OperandKind::Token)
                | (ForeignOperand::String(_), OperandKind::String)
                | (ForeignOperand::Target(_), OperandKind::Target8)
                | (ForeignOperand::Target(_), OperandKind::Target32)
                | (ForeignOperand::Switch(_), OperandKind::Switch)
        )
    }
}

/// One instruction of a foreign method body: offset, opcode form, operand.
///
/// The offset is the instruction's identity within its body; branch operands reference
/// other instructions by their offsets.
///
/// # Examples
///
/// ```rust
/// use cilbridge::backend::{ForeignInstruction, ForeignOperand, Op};
///
/// let instr = ForeignInstruction::new(0, Op::LdcI4S, ForeignOperand::Int8(42));
/// assert_eq!(instr.size(), 2);
/// assert_eq!(instr.next_offset(), 2);
/// ```
#[derive(Clone, PartialEq)]
pub struct ForeignInstruction {
    /// Byte offset of this instruction within its method body
    pub offset: u32,
    /// The opcode form
    pub op: Op,
    /// The operand value
    pub operand: ForeignOperand,
}

impl ForeignInstruction {
    /// Creates an instruction from its parts.
    #[must_use]
    pub fn new(offset: u32, op: Op, operand: ForeignOperand) -> Self {
        ForeignInstruction { offset, op, operand }
    }

    /// Creates an operand-less instruction.
    #[must_use]
    pub fn simple(offset: u32, op: Op) -> Self {
        ForeignInstruction::new(offset, op, ForeignOperand::None)
    }

    /// Total encoded size in bytes: opcode bytes plus operand bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        let operand_size = match (&self.operand, self.op.info().operand.size()) {
            (_, Some(size)) => size,
            // Switch: 4-byte count + 4 bytes per target
            (ForeignOperand::Switch(targets), None) => 4 + targets.len() * 4,
            (_, None) => 4,
        };
        #[allow(clippy::cast_possible_truncation)]
        let total = (self.op.opcode_size() + operand_size) as u32;
        total
    }

    /// Byte offset of the instruction following this one.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size()
    }

    /// Branch target offsets of this instruction, empty for non-branching forms.
    #[must_use]
    pub fn targets(&self) -> Vec<u32> {
        match &self.operand {
            ForeignOperand::Target(target) if self.op.is_branch() => vec![*target],
            ForeignOperand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for ForeignInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} - {:<12}", self.offset, self.op.mnemonic())?;
        match &self.operand {
            ForeignOperand::None => Ok(()),
            ForeignOperand::Target(target) => write!(f, " -> 0x{target:08X}"),
            ForeignOperand::Token(token) => write!(f, " token:{token}"),
            ForeignOperand::String(value) => write!(f, " {value:?}"),
            ForeignOperand::Switch(targets) => {
                write!(f, " switch[{}]", targets.len())
            }
            other => write!(f, " {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_sizes_include_operands() {
        assert_eq!(ForeignInstruction::simple(0, Op::Nop).size(), 1);
        assert_eq!(
            ForeignInstruction::new(0, Op::LdcI4, ForeignOperand::Int32(7)).size(),
            5
        );
        assert_eq!(
            ForeignInstruction::new(0, Op::Ceq, ForeignOperand::None).size(),
            2
        );
        assert_eq!(
            ForeignInstruction::new(0, Op::Switch, ForeignOperand::Switch(vec![8, 12])).size(),
            1 + 4 + 8
        );
    }

    #[test]
    fn branch_targets_only_for_branches() {
        let branch = ForeignInstruction::new(0, Op::BrS, ForeignOperand::Target(10));
        assert_eq!(branch.targets(), vec![10]);

        let call = ForeignInstruction::new(0, Op::Call, ForeignOperand::Token(Token::new(0)));
        assert!(call.targets().is_empty());
    }

    #[test]
    fn operand_shape_agreement() {
        assert!(ForeignOperand::Target(4).matches(OperandKind::Target8));
        assert!(ForeignOperand::Target(4).matches(OperandKind::Target32));
        assert!(!ForeignOperand::Int8(1).matches(OperandKind::Int32));
    }
}
