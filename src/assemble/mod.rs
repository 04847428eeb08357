//! The stack-reconstruction assembler: three-address bodies → bytecode bodies.
//!
//! The assembler bridges the two execution models: three-address statements name every
//! operand and result variable explicitly, while the target is a stack machine with an
//! implicit evaluation stack. Lowering is local - each statement loads its operands,
//! performs its operation and stores its result - and the assembler owns the transient
//! stack traffic this implies, simulating the operand stack across the whole body.
//!
//! The simulation doubles as verification: a valid three-address control-flow graph has
//! exactly one consistent stack depth at every block entry, and the assembler proves
//! depth agreement at every merge point instead of repairing disagreements. Bodies that
//! leave values conceptually live on the stack at a return are balanced with explicit
//! pops before the return instruction.
//!
//! # Key Types
//! - [`TacGraph`]/[`TacBlock`] - the non-exceptional control-flow graph
//! - [`assemble`]/[`assemble_body`] - the lowering entry points

mod assembler;
mod cfg;

pub use assembler::{assemble, assemble_body};
pub use cfg::{TacBlock, TacGraph};
