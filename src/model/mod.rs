//! The canonical object model: platform types, symbols, instructions and bodies.
//!
//! Everything downstream of the resolver works in terms of these types. The model is
//! deliberately independent of any opcode family: the codec maps foreign forms onto the
//! closed [`CodeOp`] union, and the assembler consumes the variable-based
//! [`TacBody`] form produced by the external transform.
//!
//! # Key Types
//! - [`PlatformTypes`] - the fixed catalogue of primitive/platform types
//! - [`TypeSymbol`]/[`MethodSymbol`]/[`FieldSymbol`] - interned, identity-compared symbols
//! - [`CodeInstruction`]/[`CodeOp`] - the canonical instruction set
//! - [`TacBody`]/[`TacStatement`] - the three-address body form
//! - [`MethodBody`]/[`BodyCode`] - the body lifecycle container

mod body;
mod instruction;
mod platform;
pub(crate) mod symbol;
mod tac;

pub use body::{BodyCode, ExceptionRegion, MethodBody, RegionHandler};
pub use instruction::{
    AccessMode, BasicOp, BranchCondition, CodeInstruction, CodeOp, Constant, Conversion,
    MemberToken, NumericTarget, OpFlags, SlotKind, VariableSlot,
};
pub use platform::{PlatformKind, PlatformTypes};
pub use symbol::{
    ArrayShape, FieldSymbol, FieldSymbolList, FieldSymbolRc, MethodSignature, MethodSymbol,
    MethodSymbolList, MethodSymbolRc, SymbolScope, TypeFlavor, TypeLink, TypeSymbol,
    TypeSymbolList, TypeSymbolRc,
};
pub use tac::{
    TacBinaryOp, TacBody, TacRelation, TacStatement, TacUnaryOp, TacValue,
};
