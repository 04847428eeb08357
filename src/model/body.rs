//! Method body lifecycle container.
//!
//! A body is created empty by extraction, filled with canonical bytecode by the decoder,
//! optionally replaced by a three-address form through the external transform, refilled
//! by the assembler and finally consumed by the encoder during generation. The
//! [`BodyCode`] tag records which side of that lifecycle the body is on.

use crate::model::{
    instruction::CodeInstruction,
    symbol::TypeSymbolRc,
    tac::TacBody,
};

/// Classification of an exception-region handler over resolved symbols.
#[derive(Debug, Clone)]
pub enum RegionHandler {
    /// Catch handler filtered by exception type
    Catch(TypeSymbolRc),
    /// Filter handler with the filter expression at the given byte offset
    Filter(u32),
    /// Finally handler
    Finally,
    /// Fault handler
    Fault,
}

/// One exception-protected region, as byte-offset ranges into the body.
#[derive(Debug, Clone)]
pub struct ExceptionRegion {
    /// Handler classification
    pub handler: RegionHandler,
    /// Start of the protected range
    pub try_offset: u32,
    /// Length of the protected range
    pub try_length: u32,
    /// Start of the handler range
    pub handler_offset: u32,
    /// Length of the handler range
    pub handler_length: u32,
}

/// The code of a body, in whichever form it currently carries.
#[derive(Debug, Clone)]
pub enum BodyCode {
    /// Canonical stack-machine instructions
    Bytecode(Vec<CodeInstruction>),
    /// Variable-based three-address statements
    ThreeAddressCode(TacBody),
}

/// One method's body: code, locals, regions and the stack requirement.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// The code, tagged by form
    pub code: BodyCode,
    /// Local variable types, in slot order
    pub locals: Vec<TypeSymbolRc>,
    /// Whether locals are zero-initialized on entry
    pub init_locals: bool,
    /// Maximum operand stack depth the body requires
    pub max_stack: u16,
    /// Exception-protected regions, byte-offset ranges
    pub regions: Vec<ExceptionRegion>,
}

impl MethodBody {
    /// A bytecode-form body over the given instructions.
    #[must_use]
    pub fn bytecode(instructions: Vec<CodeInstruction>) -> Self {
        MethodBody {
            code: BodyCode::Bytecode(instructions),
            locals: Vec::new(),
            init_locals: true,
            max_stack: 0,
            regions: Vec::new(),
        }
    }

    /// A three-address-form body.
    #[must_use]
    pub fn three_address(tac: TacBody) -> Self {
        let locals = tac.locals.clone();
        MethodBody {
            code: BodyCode::ThreeAddressCode(tac),
            locals,
            init_locals: true,
            max_stack: 0,
            regions: Vec::new(),
        }
    }

    /// The canonical instructions, if the body is in bytecode form.
    #[must_use]
    pub fn instructions(&self) -> Option<&[CodeInstruction]> {
        match &self.code {
            BodyCode::Bytecode(instructions) => Some(instructions),
            BodyCode::ThreeAddressCode(_) => None,
        }
    }

    /// Whether the body carries exception-protected regions.
    #[must_use]
    pub fn has_regions(&self) -> bool {
        !self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::instruction::{BasicOp, CodeOp, OpFlags};

    #[test]
    fn form_tag_tracks_the_lifecycle() {
        let bytecode = MethodBody::bytecode(vec![CodeInstruction::new(
            0,
            CodeOp::Basic {
                op: BasicOp::Return,
                flags: OpFlags::NONE,
            },
        )]);
        assert!(bytecode.instructions().is_some());

        let tac = MethodBody::three_address(TacBody::default());
        assert!(tac.instructions().is_none());
    }
}
