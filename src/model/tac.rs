//! The three-address body form consumed by the stack-reconstruction assembler.
//!
//! Three-address code names every operand and result variable explicitly; there is no
//! implicit evaluation stack between statements. The one exception is the raw
//! stack-transfer family ([`TacStatement::Push`], [`TacStatement::PopStack`],
//! [`TacStatement::DupStack`]), the spill representation the external stack-to-variable
//! transform emits when a value stays conceptually live on the operand stack across
//! statements - these are the only statements with a nonzero stack effect at statement
//! boundaries, and therefore the only source of nonzero block-entry depths.
//!
//! Branch targets are statement indices into the owning body, not byte offsets; the
//! assembler translates them during lowering.

use crate::model::{
    instruction::{BranchCondition, Constant, NumericTarget, OpFlags, VariableSlot},
    symbol::{FieldSymbolRc, MethodSymbolRc, TypeSymbolRc},
};

/// An operand of a three-address statement: a variable or an embedded constant.
#[derive(Debug, Clone)]
pub enum TacValue {
    /// Read a variable slot
    Variable(VariableSlot),
    /// Use a constant
    Constant(Constant),
}

impl TacValue {
    /// Shorthand for a local-variable operand.
    #[must_use]
    pub fn local(index: u16) -> Self {
        TacValue::Variable(VariableSlot::local(index))
    }

    /// Shorthand for an argument operand.
    #[must_use]
    pub fn argument(index: u16) -> Self {
        TacValue::Variable(VariableSlot::argument(index))
    }

    /// Shorthand for a 32-bit integer constant operand.
    #[must_use]
    pub fn i4(value: i32) -> Self {
        TacValue::Constant(Constant::I4(value))
    }
}

/// Binary operators over two variable/constant operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TacBinaryOp {
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
}

/// Unary operators over one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TacUnaryOp {
    Neg,
    Not,
}

/// Relations the comparison statement can evaluate into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TacRelation {
    Equal,
    Greater,
    Less,
}

/// One statement of a three-address body.
///
/// Every statement consumes its operands from variables (or embedded constants) and
/// deposits its result into a variable; the assembler owns the transient stack traffic
/// this implies. The raw stack-transfer statements are exempt by design.
#[derive(Debug, Clone)]
pub enum TacStatement {
    /// No effect
    Nop,
    /// `dest = value`
    Assign {
        /// Destination slot
        dest: VariableSlot,
        /// Source operand
        value: TacValue,
    },
    /// `dest = op operand`
    Unary {
        /// Destination slot
        dest: VariableSlot,
        /// The operator
        op: TacUnaryOp,
        /// The operand
        operand: TacValue,
    },
    /// `dest = left op right`
    Binary {
        /// Destination slot
        dest: VariableSlot,
        /// The operator
        op: TacBinaryOp,
        /// Overflow and signedness flags
        flags: OpFlags,
        /// Left operand
        left: TacValue,
        /// Right operand
        right: TacValue,
    },
    /// `dest = left relation right` as 0/1
    Compare {
        /// Destination slot
        dest: VariableSlot,
        /// The evaluated relation
        relation: TacRelation,
        /// Unsigned/unordered semantics
        unsigned: bool,
        /// Left operand
        left: TacValue,
        /// Right operand
        right: TacValue,
    },
    /// `dest = convert(operand)`
    Convert {
        /// Destination slot
        dest: VariableSlot,
        /// The numeric target
        target: NumericTarget,
        /// Overflow and signedness flags
        flags: OpFlags,
        /// The operand
        operand: TacValue,
    },
    /// Unconditional transfer to a statement index
    Branch {
        /// Target statement index
        target: usize,
    },
    /// Conditional transfer to a statement index
    BranchIf {
        /// The tested condition; `True`/`False` use only `left`
        condition: BranchCondition,
        /// Unsigned/unordered semantics
        unsigned: bool,
        /// First operand
        left: TacValue,
        /// Second operand for two-operand conditions
        right: Option<TacValue>,
        /// Target statement index
        target: usize,
    },
    /// Multi-way transfer over an ordered target list
    Switch {
        /// Selector operand
        selector: TacValue,
        /// Target statement indices, in selector order
        targets: Vec<usize>,
    },
    /// `dest? = method(args...)`
    Call {
        /// Destination slot; `None` discards a returned value
        dest: Option<VariableSlot>,
        /// The resolved callee
        method: MethodSymbolRc,
        /// Dispatch through the vtable
        virtual_dispatch: bool,
        /// Arguments, including the instance for instance methods
        args: Vec<TacValue>,
    },
    /// `dest = new constructor(args...)`
    CreateObject {
        /// Destination slot
        dest: VariableSlot,
        /// The resolved constructor
        constructor: MethodSymbolRc,
        /// Constructor arguments, excluding the allocated instance
        args: Vec<TacValue>,
    },
    /// `dest = new element[length]`
    CreateArray {
        /// Destination slot
        dest: VariableSlot,
        /// Element type
        element: TypeSymbolRc,
        /// Vector length
        length: TacValue,
    },
    /// `dest = object.field` / `dest = Type.field`
    LoadField {
        /// Destination slot
        dest: VariableSlot,
        /// The resolved field
        field: FieldSymbolRc,
        /// The instance, absent for static access
        object: Option<TacValue>,
    },
    /// `object.field = value` / `Type.field = value`
    StoreField {
        /// The resolved field
        field: FieldSymbolRc,
        /// The instance, absent for static access
        object: Option<TacValue>,
        /// The stored value
        value: TacValue,
    },
    /// `dest = array[index]`
    LoadElement {
        /// Destination slot
        dest: VariableSlot,
        /// Element type
        element: TypeSymbolRc,
        /// The array
        array: TacValue,
        /// The index
        index: TacValue,
    },
    /// `array[index] = value`
    StoreElement {
        /// Element type
        element: TypeSymbolRc,
        /// The array
        array: TacValue,
        /// The index
        index: TacValue,
        /// The stored value
        value: TacValue,
    },
    /// Raw stack transfer: push an operand, leaving it live across statements
    Push {
        /// The pushed operand
        value: TacValue,
    },
    /// Raw stack transfer: pop the top of stack, optionally into a variable
    PopStack {
        /// Destination slot; `None` discards the value
        dest: Option<VariableSlot>,
    },
    /// Raw stack transfer: duplicate the top of stack
    DupStack,
    /// Return, with an optional returned operand
    Return {
        /// The returned operand for value-returning methods
        value: Option<TacValue>,
    },
}

impl TacStatement {
    /// Target statement indices, empty for non-branching statements.
    #[must_use]
    pub fn targets(&self) -> Vec<usize> {
        match self {
            TacStatement::Branch { target } | TacStatement::BranchIf { target, .. } => {
                vec![*target]
            }
            TacStatement::Switch { targets, .. } => targets.clone(),
            _ => Vec::new(),
        }
    }

    /// Whether control never falls through to the next statement.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TacStatement::Branch { .. } | TacStatement::Return { .. }
        )
    }

    /// Net stack effect at the statement boundary.
    ///
    /// Zero for every statement except the raw stack transfers.
    #[must_use]
    pub fn boundary_stack_effect(&self) -> i32 {
        match self {
            TacStatement::Push { .. } | TacStatement::DupStack => 1,
            TacStatement::PopStack { .. } => -1,
            _ => 0,
        }
    }
}

/// A method body in three-address form.
#[derive(Debug, Clone, Default)]
pub struct TacBody {
    /// The statements, index-addressed
    pub statements: Vec<TacStatement>,
    /// Local variable types, in slot order; includes transform-introduced temporaries
    pub locals: Vec<TypeSymbolRc>,
    /// Parameter types, in slot order, including `this` where present
    pub params: Vec<TypeSymbolRc>,
}

impl TacBody {
    /// A body over the given statements with no locals or parameters.
    #[must_use]
    pub fn from_statements(statements: Vec<TacStatement>) -> Self {
        TacBody {
            statements,
            ..TacBody::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_effects_are_zero_outside_raw_transfers() {
        let assign = TacStatement::Assign {
            dest: VariableSlot::local(0),
            value: TacValue::i4(1),
        };
        assert_eq!(assign.boundary_stack_effect(), 0);
        assert_eq!(TacStatement::Push { value: TacValue::i4(1) }.boundary_stack_effect(), 1);
        assert_eq!(TacStatement::PopStack { dest: None }.boundary_stack_effect(), -1);
        assert_eq!(TacStatement::DupStack.boundary_stack_effect(), 1);
    }

    #[test]
    fn branch_targets_surface_for_cfg_building() {
        let statement = TacStatement::BranchIf {
            condition: BranchCondition::True,
            unsigned: false,
            left: TacValue::local(0),
            right: None,
            target: 5,
        };
        assert_eq!(statement.targets(), vec![5]);
        assert!(!statement.is_terminal());
        assert!(TacStatement::Branch { target: 2 }.is_terminal());
        assert!(TacStatement::Return { value: None }.is_terminal());
    }
}
