//! The canonical, opcode-family-independent instruction set.
//!
//! Around 180 concrete foreign opcode forms collapse onto the closed [`CodeOp`] union;
//! implicit-operand shorthand variants normalize onto one kind with an explicit operand,
//! and overflow/signedness survive as flags instead of separate opcodes. Every
//! instruction carries the byte offset that identifies it within its body; branches
//! reference other instructions symbolically by those offsets.
//!
//! Two invariants hold for every well-formed body:
//! - offsets are unique and strictly increasing in code order
//! - every branch target offset matches the offset of some instruction in the same body

use std::fmt;

use crate::model::symbol::{
    ArrayShape, FieldSymbolRc, MethodSignature, MethodSymbolRc, TypeSymbolRc,
};

/// Primitive operations that need no symbol operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BasicOp {
    Nop,
    Break,
    Dup,
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Neg,
    Not,
    /// Push 1 if the two top values compare equal
    CompareEqual,
    /// Push 1 if the deeper value compares greater
    CompareGreater,
    /// Push 1 if the deeper value compares less
    CompareLess,
    /// Push the length of the array on top of the stack
    LoadLength,
    Return,
    Throw,
    Rethrow,
    CheckFinite,
    LocalAlloc,
    ArgumentList,
    EndFilter,
    EndFinally,
    CopyBlock,
    InitBlock,
}

/// Overflow and signedness flags derived from opcode suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpFlags {
    /// Arithmetic raises on overflow (`.ovf` suffix)
    pub overflow_check: bool,
    /// Operands are treated as unsigned (`.un` suffix)
    pub unsigned_operands: bool,
}

impl OpFlags {
    /// No overflow check, signed operands.
    pub const NONE: OpFlags = OpFlags {
        overflow_check: false,
        unsigned_operands: false,
    };

    /// Overflow-checked, signed operands.
    pub const OVERFLOW: OpFlags = OpFlags {
        overflow_check: true,
        unsigned_operands: false,
    };

    /// Unsigned operands without overflow check.
    pub const UNSIGNED: OpFlags = OpFlags {
        overflow_check: false,
        unsigned_operands: true,
    };

    /// Overflow-checked, unsigned operands.
    pub const OVERFLOW_UNSIGNED: OpFlags = OpFlags {
        overflow_check: true,
        unsigned_operands: true,
    };
}

/// A constant embedded in the instruction stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// 32-bit integer
    I4(i32),
    /// 64-bit integer
    I8(i64),
    /// 32-bit float
    R4(f32),
    /// 64-bit float
    R8(f64),
    /// Null reference
    Null,
    /// String literal
    String(String),
}

/// Which variable table a slot addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// A local variable slot
    Local,
    /// A parameter slot; on instance methods slot 0 is `this`
    Argument,
}

/// One variable slot of a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableSlot {
    /// The addressed table
    pub kind: SlotKind,
    /// Zero-based slot index
    pub index: u16,
}

impl VariableSlot {
    /// A local slot.
    #[must_use]
    pub fn local(index: u16) -> Self {
        VariableSlot {
            kind: SlotKind::Local,
            index,
        }
    }

    /// An argument slot.
    #[must_use]
    pub fn argument(index: u16) -> Self {
        VariableSlot {
            kind: SlotKind::Argument,
            index,
        }
    }
}

/// Whether an access yields the content of a location or its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Load the value stored at the location
    Content,
    /// Load the address of the location
    Address,
}

/// Conditions a branch can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCondition {
    /// Transfer unconditionally
    Always,
    /// Transfer if the popped value is non-zero/non-null
    True,
    /// Transfer if the popped value is zero/null
    False,
    /// Transfer if the two popped values are equal
    Equal,
    /// Transfer if the two popped values differ (unordered for floats)
    NotEqual,
    /// Transfer if the deeper value is greater
    Greater,
    /// Transfer if the deeper value is greater or equal
    GreaterOrEqual,
    /// Transfer if the deeper value is less
    Less,
    /// Transfer if the deeper value is less or equal
    LessOrEqual,
}

impl BranchCondition {
    /// Number of stack values the condition test consumes.
    #[must_use]
    pub fn operand_count(&self) -> usize {
        match self {
            BranchCondition::Always => 0,
            BranchCondition::True | BranchCondition::False => 1,
            _ => 2,
        }
    }

    /// The condition testing the opposite outcome.
    #[must_use]
    pub fn inverted(&self) -> BranchCondition {
        match self {
            BranchCondition::Always => BranchCondition::Always,
            BranchCondition::True => BranchCondition::False,
            BranchCondition::False => BranchCondition::True,
            BranchCondition::Equal => BranchCondition::NotEqual,
            BranchCondition::NotEqual => BranchCondition::Equal,
            BranchCondition::Greater => BranchCondition::LessOrEqual,
            BranchCondition::GreaterOrEqual => BranchCondition::Less,
            BranchCondition::Less => BranchCondition::GreaterOrEqual,
            BranchCondition::LessOrEqual => BranchCondition::Greater,
        }
    }
}

/// Targets a numeric conversion can narrow or widen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum NumericTarget {
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    /// Native-width signed integer
    I,
    /// Native-width unsigned integer
    U,
    /// Float result of an unsigned integer conversion
    RUnsigned,
}

/// Conversion sub-modes: numeric narrowing/widening, boxing and casting.
#[derive(Debug, Clone)]
pub enum Conversion {
    /// Numeric conversion with overflow/signedness flags
    Numeric {
        /// The conversion target
        target: NumericTarget,
        /// Overflow and signedness flags
        flags: OpFlags,
    },
    /// Box a value of the given type
    Box(TypeSymbolRc),
    /// Unbox to a controlled-mutability pointer
    Unbox(TypeSymbolRc),
    /// Unbox or cast to the given type, yielding a value
    UnboxAny(TypeSymbolRc),
    /// Cast, raising on failure
    Cast(TypeSymbolRc),
    /// Type test, yielding null on failure
    IsInstance(TypeSymbolRc),
}

/// Target of a token load.
#[derive(Debug, Clone)]
pub enum MemberToken {
    /// A type handle
    Type(TypeSymbolRc),
    /// A method handle
    Method(MethodSymbolRc),
    /// A field handle
    Field(FieldSymbolRc),
}

/// The closed canonical operation union.
///
/// Every decoded instruction is exactly one of these kinds; the decode table maps each
/// concrete foreign form here, and the encode table lowers each kind back to one or more
/// foreign instructions.
#[derive(Debug, Clone)]
pub enum CodeOp {
    /// An arithmetic, stack or control primitive
    Basic {
        /// The primitive operation
        op: BasicOp,
        /// Overflow and signedness flags
        flags: OpFlags,
    },
    /// Push a constant
    LoadConstant(Constant),
    /// Load a variable's content or address
    LoadVariable {
        /// The addressed slot
        slot: VariableSlot,
        /// Content or address
        mode: AccessMode,
    },
    /// Pop a value into a variable
    StoreVariable {
        /// The addressed slot
        slot: VariableSlot,
    },
    /// Load a field's content or address
    LoadField {
        /// The resolved field
        field: FieldSymbolRc,
        /// Whether the access needs no instance
        is_static: bool,
        /// Content or address
        mode: AccessMode,
    },
    /// Pop a value into a field
    StoreField {
        /// The resolved field
        field: FieldSymbolRc,
        /// Whether the access needs no instance
        is_static: bool,
    },
    /// Load through a pointer
    LoadIndirect {
        /// The pointee type
        ty: TypeSymbolRc,
    },
    /// Store through a pointer
    StoreIndirect {
        /// The pointee type
        ty: TypeSymbolRc,
    },
    /// Load an array element's content or address
    LoadElement {
        /// The element type
        element: TypeSymbolRc,
        /// Array rank; 1 for vectors
        rank: u8,
        /// Content or address
        mode: AccessMode,
    },
    /// Store into an array element
    StoreElement {
        /// The element type
        element: TypeSymbolRc,
        /// Array rank; 1 for vectors
        rank: u8,
    },
    /// Conditional or unconditional transfer
    Branch {
        /// The tested condition
        condition: BranchCondition,
        /// Unsigned/unordered comparison semantics
        unsigned: bool,
        /// Offset of the target instruction in the same body
        target: u32,
    },
    /// Exit a protected region towards the target
    Leave {
        /// Offset of the target instruction in the same body
        target: u32,
    },
    /// Multi-way transfer over an ordered target list
    Switch {
        /// Offsets of the target instructions, in selector order
        targets: Vec<u32>,
    },
    /// Invoke a method
    Call {
        /// The resolved callee
        method: MethodSymbolRc,
        /// Dispatch through the vtable
        virtual_dispatch: bool,
        /// Tail-call the callee
        tail: bool,
    },
    /// Invoke through a function pointer popped from the stack
    CallIndirect {
        /// The call-site signature
        signature: MethodSignature,
    },
    /// Allocate and construct an object
    CreateObject {
        /// The resolved constructor
        constructor: MethodSymbolRc,
    },
    /// Allocate an array
    CreateArray {
        /// The element type
        element: TypeSymbolRc,
        /// The array shape; rank 1 without bounds for vectors
        shape: ArrayShape,
    },
    /// Convert, box, unbox or cast the top of the stack
    Convert {
        /// The conversion sub-mode
        conversion: Conversion,
    },
    /// Constrain the following virtual call to a type
    Constrained {
        /// The constraining type
        ty: TypeSymbolRc,
    },
    /// Initialize a value-type location to its default value
    InitObject {
        /// The value type
        ty: TypeSymbolRc,
    },
    /// Push the size in bytes of a type
    Sizeof {
        /// The measured type
        ty: TypeSymbolRc,
    },
    /// Push a runtime handle for a member
    LoadToken {
        /// The referenced member
        member: MemberToken,
    },
    /// Push a pointer to a method
    LoadFunction {
        /// The referenced method
        method: MethodSymbolRc,
        /// Resolve through the vtable of the popped instance
        virtual_dispatch: bool,
    },
    /// Offset-preserving placeholder for an unrecognized foreign form.
    ///
    /// Never dropped: branch-target resolution indexes instructions by offset, and
    /// removing one would corrupt every branch targeting it.
    Unrecognized {
        /// Mnemonic of the form that was not recognized
        mnemonic: &'static str,
    },
}

/// One canonical instruction: its identity (the byte offset) plus its operation.
#[derive(Clone)]
pub struct CodeInstruction {
    /// Byte offset within the body; unique and code-order-monotonic
    pub offset: u32,
    /// The operation
    pub op: CodeOp,
}

impl CodeInstruction {
    /// Creates an instruction at the given offset.
    #[must_use]
    pub fn new(offset: u32, op: CodeOp) -> Self {
        CodeInstruction { offset, op }
    }

    /// Whether this instruction transfers control away unconditionally.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match &self.op {
            CodeOp::Basic { op, .. } => matches!(
                op,
                BasicOp::Return | BasicOp::Throw | BasicOp::Rethrow | BasicOp::EndFinally
            ),
            CodeOp::Branch { condition, .. } => *condition == BranchCondition::Always,
            CodeOp::Leave { .. } | CodeOp::Switch { .. } => true,
            _ => false,
        }
    }

    /// The symbolic branch targets of this instruction, empty for non-branching kinds.
    #[must_use]
    pub fn targets(&self) -> Vec<u32> {
        match &self.op {
            CodeOp::Branch { target, .. } | CodeOp::Leave { target } => vec![*target],
            CodeOp::Switch { targets } => targets.clone(),
            _ => Vec::new(),
        }
    }

    /// Stack slots this instruction pops and pushes.
    ///
    /// Signature-dependent kinds (calls, return) resolve their effect against the
    /// involved signature; `ret` accounts for the returned value at the call site of
    /// the simulation instead, so it reports no pops here.
    #[must_use]
    pub fn stack_effect(&self) -> (usize, usize) {
        match &self.op {
            CodeOp::Basic { op, .. } => match op {
                BasicOp::Nop
                | BasicOp::Break
                | BasicOp::Return
                | BasicOp::Rethrow
                | BasicOp::EndFinally => (0, 0),
                BasicOp::Dup => (1, 2),
                BasicOp::Pop | BasicOp::Throw | BasicOp::EndFilter => (1, 0),
                BasicOp::Add
                | BasicOp::Sub
                | BasicOp::Mul
                | BasicOp::Div
                | BasicOp::Rem
                | BasicOp::And
                | BasicOp::Or
                | BasicOp::Xor
                | BasicOp::Shl
                | BasicOp::Shr
                | BasicOp::CompareEqual
                | BasicOp::CompareGreater
                | BasicOp::CompareLess => (2, 1),
                BasicOp::Neg | BasicOp::Not | BasicOp::CheckFinite | BasicOp::LocalAlloc
                | BasicOp::LoadLength => (1, 1),
                BasicOp::ArgumentList => (0, 1),
                BasicOp::CopyBlock | BasicOp::InitBlock => (3, 0),
            },
            CodeOp::LoadConstant(_) => (0, 1),
            CodeOp::LoadVariable { .. } => (0, 1),
            CodeOp::StoreVariable { .. } => (1, 0),
            CodeOp::LoadField { is_static, .. } => (usize::from(!is_static), 1),
            CodeOp::StoreField { is_static, .. } => (1 + usize::from(!is_static), 0),
            CodeOp::LoadIndirect { .. } => (1, 1),
            CodeOp::StoreIndirect { .. } => (2, 0),
            CodeOp::LoadElement { rank, .. } => (1 + usize::from(*rank), 1),
            CodeOp::StoreElement { rank, .. } => (2 + usize::from(*rank), 0),
            CodeOp::Branch { condition, .. } => (condition.operand_count(), 0),
            CodeOp::Leave { .. } => (0, 0),
            CodeOp::Switch { .. } => (1, 0),
            CodeOp::Call {
                method,
                virtual_dispatch: _,
                ..
            } => {
                let signature = &method.signature;
                (
                    signature.argument_slots(),
                    usize::from(signature.returns_value()),
                )
            }
            CodeOp::CallIndirect { signature } => (
                signature.argument_slots() + 1,
                usize::from(signature.returns_value()),
            ),
            CodeOp::CreateObject { constructor } => {
                (constructor.signature.params.len(), 1)
            }
            CodeOp::CreateArray { shape, .. } => (usize::from(shape.rank), 1),
            CodeOp::Convert { .. } => (1, 1),
            CodeOp::Constrained { .. } => (0, 0),
            CodeOp::InitObject { .. } => (1, 0),
            CodeOp::Sizeof { .. } => (0, 1),
            CodeOp::LoadToken { .. } => (0, 1),
            CodeOp::LoadFunction {
                virtual_dispatch, ..
            } => (usize::from(*virtual_dispatch), 1),
            CodeOp::Unrecognized { .. } => (0, 0),
        }
    }
}

impl fmt::Debug for CodeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} - ", self.offset)?;
        match &self.op {
            CodeOp::Basic { op, flags } => {
                write!(f, "{op:?}")?;
                if flags.overflow_check {
                    write!(f, ".ovf")?;
                }
                if flags.unsigned_operands {
                    write!(f, ".un")?;
                }
                Ok(())
            }
            CodeOp::LoadConstant(constant) => write!(f, "const {constant:?}"),
            CodeOp::Branch {
                condition,
                unsigned,
                target,
            } => {
                write!(f, "branch.{condition:?}")?;
                if *unsigned {
                    write!(f, ".un")?;
                }
                write!(f, " -> 0x{target:08X}")
            }
            CodeOp::Switch { targets } => write!(f, "switch[{}]", targets.len()),
            CodeOp::Call { method, .. } => write!(f, "call {}", method.name),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_inversion_round_trips() {
        let all = [
            BranchCondition::Always,
            BranchCondition::True,
            BranchCondition::False,
            BranchCondition::Equal,
            BranchCondition::NotEqual,
            BranchCondition::Greater,
            BranchCondition::GreaterOrEqual,
            BranchCondition::Less,
            BranchCondition::LessOrEqual,
        ];
        for condition in all {
            assert_eq!(condition.inverted().inverted(), condition);
        }
    }

    #[test]
    fn terminal_classification() {
        let ret = CodeInstruction::new(
            0,
            CodeOp::Basic {
                op: BasicOp::Return,
                flags: OpFlags::NONE,
            },
        );
        assert!(ret.is_terminal());

        let conditional = CodeInstruction::new(
            0,
            CodeOp::Branch {
                condition: BranchCondition::True,
                unsigned: false,
                target: 8,
            },
        );
        assert!(!conditional.is_terminal());
        assert_eq!(conditional.targets(), vec![8]);

        let unconditional = CodeInstruction::new(
            0,
            CodeOp::Branch {
                condition: BranchCondition::Always,
                unsigned: false,
                target: 8,
            },
        );
        assert!(unconditional.is_terminal());
    }

    #[test]
    fn element_access_scales_with_rank() {
        use crate::model::platform::PlatformKind;
        use crate::model::symbol::TypeSymbol;
        use std::sync::Arc;

        let int32 = Arc::new(TypeSymbol::platform(PlatformKind::I4));
        let vector_load = CodeOp::LoadElement {
            element: int32.clone(),
            rank: 1,
            mode: AccessMode::Content,
        };
        assert_eq!(
            CodeInstruction::new(0, vector_load).stack_effect(),
            (2, 1)
        );

        let planar_store = CodeOp::StoreElement {
            element: int32,
            rank: 2,
        };
        assert_eq!(
            CodeInstruction::new(0, planar_store).stack_effect(),
            (4, 0)
        );
    }
}
