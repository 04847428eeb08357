//! # cilbridge Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and
//! traits from the cilbridge library. Import this module to get quick access to the
//! essential types for loading, transforming and regenerating modules.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilbridge operations
pub use crate::Error;

/// The result type used throughout cilbridge
pub use crate::Result;

// ================================================================================================
// Module Backend
// ================================================================================================

/// Service interface to the external module reader/writer
pub use crate::backend::ModuleBackend;

/// In-process backend for tests and programmatic module building
pub use crate::backend::MemoryBackend;

/// The structured row model of a foreign module
pub use crate::backend::ForeignModule;

/// Table-tagged metadata handles
pub use crate::backend::{TableKind, Token};

/// The foreign instruction stream
pub use crate::backend::{ForeignBody, ForeignInstruction, ForeignOperand, Op};

// ================================================================================================
// Object Model
// ================================================================================================

/// The platform type catalogue
pub use crate::model::{PlatformKind, PlatformTypes};

/// Interned, identity-compared symbols
pub use crate::model::{
    FieldSymbol, FieldSymbolRc, MethodSignature, MethodSymbol, MethodSymbolRc, SymbolScope,
    TypeFlavor, TypeSymbol, TypeSymbolRc,
};

/// The canonical instruction set
pub use crate::model::{BasicOp, BranchCondition, CodeInstruction, CodeOp, Constant, OpFlags};

/// The three-address body form
pub use crate::model::{TacBody, TacStatement, TacValue, VariableSlot};

/// The body lifecycle container
pub use crate::model::{BodyCode, MethodBody};

// ================================================================================================
// Resolution, Codec, Assembler
// ================================================================================================

/// The pass-scoped reference resolver and interner
pub use crate::resolve::ResolveSession;

/// Instruction codec entry points
pub use crate::codec::{compute_max_stack, decode_body, decode_stream, encode_stream};

/// Generation-side symbol → token emission
pub use crate::codec::ReferenceSink;

/// Stack-reconstruction assembly
pub use crate::assemble::{assemble, assemble_body};

// ================================================================================================
// Pipelines
// ================================================================================================

/// Module extraction into the object model
pub use crate::pipeline::{extract_module, ModuleModel};

/// Module generation from the object model
pub use crate::pipeline::{generate_module, write_module, Emitter};
