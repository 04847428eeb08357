//! Canonical instruction encoding back into foreign instruction streams.
//!
//! The encoder mirrors the decode table: each canonical kind lowers to one or more
//! foreign instructions. Physical-instruction identity is assigned up front - lowering
//! walks the body once in order, fixing final byte offsets as it goes and recording
//! which physical instruction begins each canonical offset; a second pass then patches
//! every branch and switch operand from that map. A branch whose symbolic target was
//! never emitted is a fatal lookup miss.
//!
//! Branches are always emitted in long form so sizes are final on the first pass.
//! Symbol operands are turned into tokens through a [`ReferenceSink`], the
//! generation-side mirror of the resolver.

use std::collections::HashMap;

use crate::{
    backend::{ElementKind, ForeignInstruction, ForeignOperand, Op, Token},
    model::{
        AccessMode, ArrayShape, BasicOp, BranchCondition, CodeInstruction, CodeOp, Constant,
        Conversion, MemberToken, MethodSignature, MethodSymbolRc, NumericTarget, OpFlags,
        SlotKind, TypeSymbolRc,
    },
    Result,
};

/// Accessors and the constructor of a faux-array symbol, as encode lowers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayAccessor {
    /// Element getter
    Get,
    /// Element setter
    Set,
    /// Element address
    Address,
    /// Rank-shaped constructor
    Constructor,
}

/// The generation-side reference emitter: canonical symbols in, foreign tokens out.
///
/// Implementations memoize per pass, mirroring the resolver's interning in reverse;
/// they also materialize the member references a faux-array lowering needs.
pub trait ReferenceSink {
    /// Returns the token for a type symbol, materializing rows on demand.
    fn type_token(&mut self, ty: &TypeSymbolRc) -> Result<Token>;

    /// Returns the token for a method symbol, materializing rows on demand.
    fn method_token(&mut self, method: &MethodSymbolRc) -> Result<Token>;

    /// Returns the token for a field symbol, materializing rows on demand.
    fn field_token(&mut self, field: &crate::model::FieldSymbolRc) -> Result<Token>;

    /// Returns a token carrying a bare call-site signature (for indirect calls).
    fn signature_token(&mut self, signature: &MethodSignature) -> Result<Token>;

    /// Returns the member-reference token for a faux-array accessor or constructor.
    fn array_accessor_token(
        &mut self,
        element: &TypeSymbolRc,
        shape: &ArrayShape,
        accessor: ArrayAccessor,
    ) -> Result<Token>;
}

/// Encodes a canonical instruction stream into foreign instructions.
///
/// Returns the stream with final byte offsets assigned and all branch operands patched
/// to physical target offsets.
///
/// # Errors
///
/// Fails on kinds without a foreign lowering for their flag combination, on branch
/// targets that match no instruction offset in the body, and on sink failures.
pub fn encode_stream(
    instructions: &[CodeInstruction],
    sink: &mut dyn ReferenceSink,
) -> Result<Vec<ForeignInstruction>> {
    let mut encoder = Encoder::new(sink);
    for instruction in instructions {
        encoder.lower(instruction)?;
    }
    encoder.patch()
}

/// Recomputes the maximum operand stack depth of a canonical bytecode body.
///
/// Walks the body with a work-list over instruction offsets, propagating the simulated
/// depth across fall-through and branch edges. Used by generation to verify and refresh
/// the stack requirement recorded in a body header.
///
/// # Errors
///
/// Fails if two edges reach the same instruction at different depths or if a branch
/// targets a non-existent offset.
pub fn compute_max_stack(instructions: &[CodeInstruction]) -> Result<u16> {
    if instructions.is_empty() {
        return Ok(0);
    }

    let index_of: HashMap<u32, usize> = instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| (instruction.offset, index))
        .collect();

    let mut entry_depth: HashMap<usize, i64> = HashMap::new();
    let mut work = vec![0usize];
    entry_depth.insert(0, 0);
    let mut max_depth: i64 = 0;

    while let Some(index) = work.pop() {
        let mut depth = entry_depth[&index];
        let mut cursor = index;
        loop {
            let instruction = &instructions[cursor];
            let (pops, pushes) = instruction.stack_effect();
            depth -= pops as i64;
            if depth < 0 {
                return Err(malformed_error!(
                    "operand stack underflows at offset {:#x}",
                    instruction.offset
                ));
            }
            depth += pushes as i64;
            max_depth = max_depth.max(depth);

            for target in instruction.targets() {
                let target_index = *index_of.get(&target).ok_or_else(|| {
                    lookup_miss!("branch target {:#x} matches no instruction offset", target)
                })?;
                match entry_depth.get(&target_index) {
                    Some(existing) if *existing != depth => {
                        return Err(crate::Error::StackConsistencyViolation {
                            offset: target,
                            expected: usize::try_from(*existing).unwrap_or(0),
                            actual: usize::try_from(depth).unwrap_or(0),
                        })
                    }
                    Some(_) => {}
                    None => {
                        entry_depth.insert(target_index, depth);
                        work.push(target_index);
                    }
                }
            }

            if instruction.is_terminal() {
                break;
            }
            let next = cursor + 1;
            if next >= instructions.len() {
                break;
            }
            cursor = next;
            match entry_depth.get(&cursor) {
                Some(existing) if *existing != depth => {
                    return Err(crate::Error::StackConsistencyViolation {
                        offset: instructions[cursor].offset,
                        expected: usize::try_from(*existing).unwrap_or(0),
                        actual: usize::try_from(depth).unwrap_or(0),
                    })
                }
                Some(_) => break,
                None => {
                    entry_depth.insert(cursor, depth);
                }
            }
        }
    }

    Ok(u16::try_from(max_depth).unwrap_or(u16::MAX))
}

struct PendingBranch {
    /// Index of the emitted foreign instruction carrying the operand
    emitted: usize,
    /// Symbolic canonical target offsets, in operand order
    targets: Vec<u32>,
}

struct Encoder<'s> {
    sink: &'s mut dyn ReferenceSink,
    emitted: Vec<ForeignInstruction>,
    /// First physical instruction index for each canonical offset
    first_physical: HashMap<u32, usize>,
    pending: Vec<PendingBranch>,
    cursor: u32,
}

impl<'s> Encoder<'s> {
    fn new(sink: &'s mut dyn ReferenceSink) -> Self {
        Encoder {
            sink,
            emitted: Vec::new(),
            first_physical: HashMap::new(),
            pending: Vec::new(),
            cursor: 0,
        }
    }

    fn push(&mut self, op: Op, operand: ForeignOperand) -> usize {
        let instruction = ForeignInstruction::new(self.cursor, op, operand);
        self.cursor = instruction.next_offset();
        self.emitted.push(instruction);
        self.emitted.len() - 1
    }

    fn lower(&mut self, instruction: &CodeInstruction) -> Result<()> {
        let start = self.emitted.len();

        match &instruction.op {
            CodeOp::Basic { op, flags } => {
                let foreign = basic_form(*op, *flags).ok_or_else(|| {
                    unsupported_error!(
                        "no encoding for {:?} with flags {:?} at offset {:#x}",
                        op,
                        flags,
                        instruction.offset
                    )
                })?;
                self.push(foreign, ForeignOperand::None);
            }
            CodeOp::LoadConstant(constant) => match constant {
                Constant::I4(value) => {
                    self.push(Op::LdcI4, ForeignOperand::Int32(*value));
                }
                Constant::I8(value) => {
                    self.push(Op::LdcI8, ForeignOperand::Int64(*value));
                }
                Constant::R4(value) => {
                    self.push(Op::LdcR4, ForeignOperand::Float32(*value));
                }
                Constant::R8(value) => {
                    self.push(Op::LdcR8, ForeignOperand::Float64(*value));
                }
                Constant::Null => {
                    self.push(Op::Ldnull, ForeignOperand::None);
                }
                Constant::String(value) => {
                    self.push(Op::Ldstr, ForeignOperand::String(value.clone()));
                }
            },
            CodeOp::LoadVariable { slot, mode } => {
                let op = match (slot.kind, mode) {
                    (SlotKind::Local, AccessMode::Content) => Op::Ldloc,
                    (SlotKind::Local, AccessMode::Address) => Op::Ldloca,
                    (SlotKind::Argument, AccessMode::Content) => Op::Ldarg,
                    (SlotKind::Argument, AccessMode::Address) => Op::Ldarga,
                };
                self.push(op, ForeignOperand::UInt16(slot.index));
            }
            CodeOp::StoreVariable { slot } => {
                let op = match slot.kind {
                    SlotKind::Local => Op::Stloc,
                    SlotKind::Argument => Op::Starg,
                };
                self.push(op, ForeignOperand::UInt16(slot.index));
            }
            CodeOp::LoadField {
                field,
                is_static,
                mode,
            } => {
                let token = self.sink.field_token(field)?;
                let op = match (is_static, mode) {
                    (false, AccessMode::Content) => Op::Ldfld,
                    (false, AccessMode::Address) => Op::Ldflda,
                    (true, AccessMode::Content) => Op::Ldsfld,
                    (true, AccessMode::Address) => Op::Ldsflda,
                };
                self.push(op, ForeignOperand::Token(token));
            }
            CodeOp::StoreField { field, is_static } => {
                let token = self.sink.field_token(field)?;
                let op = if *is_static { Op::Stsfld } else { Op::Stfld };
                self.push(op, ForeignOperand::Token(token));
            }
            CodeOp::LoadIndirect { ty } => match element_form(ty) {
                Some(element) => {
                    self.push(load_indirect_form(element), ForeignOperand::None);
                }
                None => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::Ldobj, ForeignOperand::Token(token));
                }
            },
            CodeOp::StoreIndirect { ty } => match element_form(ty).and_then(store_indirect_form)
            {
                Some(op) => {
                    self.push(op, ForeignOperand::None);
                }
                None => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::Stobj, ForeignOperand::Token(token));
                }
            },
            CodeOp::LoadElement {
                element,
                rank,
                mode,
            } => {
                if *rank > 1 {
                    let shape = ArrayShape::with_rank(*rank);
                    let accessor = match mode {
                        AccessMode::Content => ArrayAccessor::Get,
                        AccessMode::Address => ArrayAccessor::Address,
                    };
                    let token = self.sink.array_accessor_token(element, &shape, accessor)?;
                    self.push(Op::Call, ForeignOperand::Token(token));
                } else {
                    match mode {
                        AccessMode::Address => {
                            let token = self.sink.type_token(element)?;
                            self.push(Op::Ldelema, ForeignOperand::Token(token));
                        }
                        AccessMode::Content => match element_form(element)
                            .and_then(load_element_form)
                        {
                            Some(op) => {
                                self.push(op, ForeignOperand::None);
                            }
                            None => {
                                let token = self.sink.type_token(element)?;
                                self.push(Op::Ldelem, ForeignOperand::Token(token));
                            }
                        },
                    }
                }
            }
            CodeOp::StoreElement { element, rank } => {
                if *rank > 1 {
                    let shape = ArrayShape::with_rank(*rank);
                    let token = self.sink.array_accessor_token(
                        element,
                        &shape,
                        ArrayAccessor::Set,
                    )?;
                    self.push(Op::Call, ForeignOperand::Token(token));
                } else {
                    match element_form(element).and_then(store_element_form) {
                        Some(op) => {
                            self.push(op, ForeignOperand::None);
                        }
                        None => {
                            let token = self.sink.type_token(element)?;
                            self.push(Op::Stelem, ForeignOperand::Token(token));
                        }
                    }
                }
            }
            CodeOp::Branch {
                condition,
                unsigned,
                target,
            } => {
                let op = branch_form(*condition, *unsigned).ok_or_else(|| {
                    unsupported_error!(
                        "no encoding for branch condition {:?} (unsigned: {}) at offset {:#x}",
                        condition,
                        unsigned,
                        instruction.offset
                    )
                })?;
                let emitted = self.push(op, ForeignOperand::Target(0));
                self.pending.push(PendingBranch {
                    emitted,
                    targets: vec![*target],
                });
            }
            CodeOp::Leave { target } => {
                let emitted = self.push(Op::Leave, ForeignOperand::Target(0));
                self.pending.push(PendingBranch {
                    emitted,
                    targets: vec![*target],
                });
            }
            CodeOp::Switch { targets } => {
                let emitted = self.push(
                    Op::Switch,
                    ForeignOperand::Switch(vec![0; targets.len()]),
                );
                self.pending.push(PendingBranch {
                    emitted,
                    targets: targets.clone(),
                });
            }
            CodeOp::Call {
                method,
                virtual_dispatch,
                tail,
            } => {
                let token = self.sink.method_token(method)?;
                if *tail {
                    self.push(Op::TailPrefix, ForeignOperand::None);
                }
                let op = if *virtual_dispatch { Op::Callvirt } else { Op::Call };
                self.push(op, ForeignOperand::Token(token));
            }
            CodeOp::CallIndirect { signature } => {
                let token = self.sink.signature_token(signature)?;
                self.push(Op::Calli, ForeignOperand::Token(token));
            }
            CodeOp::CreateObject { constructor } => {
                let token = self.sink.method_token(constructor)?;
                self.push(Op::Newobj, ForeignOperand::Token(token));
            }
            CodeOp::CreateArray { element, shape } => {
                if shape.rank > 1 || !shape.lower_bounds.is_empty() || !shape.sizes.is_empty() {
                    // Non-vector construction lowers to the rank-shaped constructor
                    // call on the faux-array symbol.
                    let token = self.sink.array_accessor_token(
                        element,
                        shape,
                        ArrayAccessor::Constructor,
                    )?;
                    self.push(Op::Newobj, ForeignOperand::Token(token));
                } else {
                    let token = self.sink.type_token(element)?;
                    self.push(Op::Newarr, ForeignOperand::Token(token));
                }
            }
            CodeOp::Convert { conversion } => match conversion {
                Conversion::Numeric { target, flags } => {
                    let op = conversion_form(*target, *flags).ok_or_else(|| {
                        unsupported_error!(
                            "no encoding for conversion to {:?} with flags {:?} at offset {:#x}",
                            target,
                            flags,
                            instruction.offset
                        )
                    })?;
                    self.push(op, ForeignOperand::None);
                }
                Conversion::Box(ty) => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::Box, ForeignOperand::Token(token));
                }
                Conversion::Unbox(ty) => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::Unbox, ForeignOperand::Token(token));
                }
                Conversion::UnboxAny(ty) => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::UnboxAny, ForeignOperand::Token(token));
                }
                Conversion::Cast(ty) => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::Castclass, ForeignOperand::Token(token));
                }
                Conversion::IsInstance(ty) => {
                    let token = self.sink.type_token(ty)?;
                    self.push(Op::Isinst, ForeignOperand::Token(token));
                }
            },
            CodeOp::Constrained { ty } => {
                let token = self.sink.type_token(ty)?;
                self.push(Op::ConstrainedPrefix, ForeignOperand::Token(token));
            }
            CodeOp::InitObject { ty } => {
                let token = self.sink.type_token(ty)?;
                self.push(Op::Initobj, ForeignOperand::Token(token));
            }
            CodeOp::Sizeof { ty } => {
                let token = self.sink.type_token(ty)?;
                self.push(Op::Sizeof, ForeignOperand::Token(token));
            }
            CodeOp::LoadToken { member } => {
                let token = match member {
                    MemberToken::Type(ty) => self.sink.type_token(ty)?,
                    MemberToken::Method(method) => self.sink.method_token(method)?,
                    MemberToken::Field(field) => self.sink.field_token(field)?,
                };
                self.push(Op::Ldtoken, ForeignOperand::Token(token));
            }
            CodeOp::LoadFunction {
                method,
                virtual_dispatch,
            } => {
                let token = self.sink.method_token(method)?;
                let op = if *virtual_dispatch {
                    Op::Ldvirtftn
                } else {
                    Op::Ldftn
                };
                self.push(op, ForeignOperand::Token(token));
            }
            // The placeholder stands in for a form this codec does not model; a no-op
            // keeps the offset landscape intact.
            CodeOp::Unrecognized { .. } => {
                self.push(Op::Nop, ForeignOperand::None);
            }
        }

        self.first_physical.insert(instruction.offset, start);
        Ok(())
    }

    fn patch(mut self) -> Result<Vec<ForeignInstruction>> {
        for pending in &self.pending {
            let resolved = pending
                .targets
                .iter()
                .map(|target| {
                    self.first_physical
                        .get(target)
                        .map(|index| self.emitted[*index].offset)
                        .ok_or_else(|| {
                            lookup_miss!(
                                "branch target {:#x} matches no instruction offset in this body",
                                target
                            )
                        })
                })
                .collect::<Result<Vec<u32>>>()?;

            let operand = &mut self.emitted[pending.emitted].operand;
            match operand {
                ForeignOperand::Target(slot) => *slot = resolved[0],
                ForeignOperand::Switch(slots) => slots.clone_from(&resolved),
                _ => {
                    return Err(malformed_error!(
                        "pending branch fixup points at a non-branch operand"
                    ))
                }
            }
        }
        Ok(self.emitted)
    }
}

// ── Lowering tables ────────────────────────────────────────────────────────

fn basic_form(op: BasicOp, flags: OpFlags) -> Option<Op> {
    match (op, flags.overflow_check, flags.unsigned_operands) {
        (BasicOp::Nop, false, false) => Some(Op::Nop),
        (BasicOp::Break, false, false) => Some(Op::Break),
        (BasicOp::Dup, false, false) => Some(Op::Dup),
        (BasicOp::Pop, false, false) => Some(Op::Pop),
        (BasicOp::Add, false, false) => Some(Op::Add),
        (BasicOp::Add, true, false) => Some(Op::AddOvf),
        (BasicOp::Add, true, true) => Some(Op::AddOvfUn),
        (BasicOp::Sub, false, false) => Some(Op::Sub),
        (BasicOp::Sub, true, false) => Some(Op::SubOvf),
        (BasicOp::Sub, true, true) => Some(Op::SubOvfUn),
        (BasicOp::Mul, false, false) => Some(Op::Mul),
        (BasicOp::Mul, true, false) => Some(Op::MulOvf),
        (BasicOp::Mul, true, true) => Some(Op::MulOvfUn),
        (BasicOp::Div, false, false) => Some(Op::Div),
        (BasicOp::Div, false, true) => Some(Op::DivUn),
        (BasicOp::Rem, false, false) => Some(Op::Rem),
        (BasicOp::Rem, false, true) => Some(Op::RemUn),
        (BasicOp::And, false, false) => Some(Op::And),
        (BasicOp::Or, false, false) => Some(Op::Or),
        (BasicOp::Xor, false, false) => Some(Op::Xor),
        (BasicOp::Shl, false, false) => Some(Op::Shl),
        (BasicOp::Shr, false, false) => Some(Op::Shr),
        (BasicOp::Shr, false, true) => Some(Op::ShrUn),
        (BasicOp::Neg, false, false) => Some(Op::Neg),
        (BasicOp::Not, false, false) => Some(Op::Not),
        (BasicOp::CompareEqual, false, false) => Some(Op::Ceq),
        (BasicOp::CompareGreater, false, false) => Some(Op::Cgt),
        (BasicOp::CompareGreater, false, true) => Some(Op::CgtUn),
        (BasicOp::CompareLess, false, false) => Some(Op::Clt),
        (BasicOp::CompareLess, false, true) => Some(Op::CltUn),
        (BasicOp::LoadLength, false, false) => Some(Op::Ldlen),
        (BasicOp::Return, false, false) => Some(Op::Ret),
        (BasicOp::Throw, false, false) => Some(Op::Throw),
        (BasicOp::Rethrow, false, false) => Some(Op::Rethrow),
        (BasicOp::CheckFinite, false, false) => Some(Op::Ckfinite),
        (BasicOp::LocalAlloc, false, false) => Some(Op::Localloc),
        (BasicOp::ArgumentList, false, false) => Some(Op::Arglist),
        (BasicOp::EndFilter, false, false) => Some(Op::Endfilter),
        (BasicOp::EndFinally, false, false) => Some(Op::Endfinally),
        (BasicOp::CopyBlock, false, false) => Some(Op::Cpblk),
        (BasicOp::InitBlock, false, false) => Some(Op::Initblk),
        _ => None,
    }
}

fn branch_form(condition: BranchCondition, unsigned: bool) -> Option<Op> {
    match (condition, unsigned) {
        (BranchCondition::Always, false) => Some(Op::Br),
        (BranchCondition::True, false) => Some(Op::Brtrue),
        (BranchCondition::False, false) => Some(Op::Brfalse),
        (BranchCondition::Equal, false) => Some(Op::Beq),
        (BranchCondition::NotEqual, true) => Some(Op::BneUn),
        (BranchCondition::Greater, false) => Some(Op::Bgt),
        (BranchCondition::Greater, true) => Some(Op::BgtUn),
        (BranchCondition::GreaterOrEqual, false) => Some(Op::Bge),
        (BranchCondition::GreaterOrEqual, true) => Some(Op::BgeUn),
        (BranchCondition::Less, false) => Some(Op::Blt),
        (BranchCondition::Less, true) => Some(Op::BltUn),
        (BranchCondition::LessOrEqual, false) => Some(Op::Ble),
        (BranchCondition::LessOrEqual, true) => Some(Op::BleUn),
        _ => None,
    }
}

fn conversion_form(target: NumericTarget, flags: OpFlags) -> Option<Op> {
    match (target, flags.overflow_check, flags.unsigned_operands) {
        (NumericTarget::I1, false, false) => Some(Op::ConvI1),
        (NumericTarget::I2, false, false) => Some(Op::ConvI2),
        (NumericTarget::I4, false, false) => Some(Op::ConvI4),
        (NumericTarget::I8, false, false) => Some(Op::ConvI8),
        (NumericTarget::U1, false, false) => Some(Op::ConvU1),
        (NumericTarget::U2, false, false) => Some(Op::ConvU2),
        (NumericTarget::U4, false, false) => Some(Op::ConvU4),
        (NumericTarget::U8, false, false) => Some(Op::ConvU8),
        (NumericTarget::R4, false, false) => Some(Op::ConvR4),
        (NumericTarget::R8, false, false) => Some(Op::ConvR8),
        (NumericTarget::I, false, false) => Some(Op::ConvI),
        (NumericTarget::U, false, false) => Some(Op::ConvU),
        (NumericTarget::RUnsigned, false, false) => Some(Op::ConvRUn),
        (NumericTarget::I1, true, false) => Some(Op::ConvOvfI1),
        (NumericTarget::I2, true, false) => Some(Op::ConvOvfI2),
        (NumericTarget::I4, true, false) => Some(Op::ConvOvfI4),
        (NumericTarget::I8, true, false) => Some(Op::ConvOvfI8),
        (NumericTarget::U1, true, false) => Some(Op::ConvOvfU1),
        (NumericTarget::U2, true, false) => Some(Op::ConvOvfU2),
        (NumericTarget::U4, true, false) => Some(Op::ConvOvfU4),
        (NumericTarget::U8, true, false) => Some(Op::ConvOvfU8),
        (NumericTarget::I, true, false) => Some(Op::ConvOvfI),
        (NumericTarget::U, true, false) => Some(Op::ConvOvfU),
        (NumericTarget::I1, true, true) => Some(Op::ConvOvfI1Un),
        (NumericTarget::I2, true, true) => Some(Op::ConvOvfI2Un),
        (NumericTarget::I4, true, true) => Some(Op::ConvOvfI4Un),
        (NumericTarget::I8, true, true) => Some(Op::ConvOvfI8Un),
        (NumericTarget::U1, true, true) => Some(Op::ConvOvfU1Un),
        (NumericTarget::U2, true, true) => Some(Op::ConvOvfU2Un),
        (NumericTarget::U4, true, true) => Some(Op::ConvOvfU4Un),
        (NumericTarget::U8, true, true) => Some(Op::ConvOvfU8Un),
        (NumericTarget::I, true, true) => Some(Op::ConvOvfIUn),
        (NumericTarget::U, true, true) => Some(Op::ConvOvfUUn),
        _ => None,
    }
}

fn element_form(ty: &TypeSymbolRc) -> Option<ElementKind> {
    match &ty.flavor {
        crate::model::TypeFlavor::Platform(kind) => kind.to_element(),
        _ => None,
    }
}

fn load_indirect_form(element: ElementKind) -> Op {
    match element {
        ElementKind::I1 => Op::LdindI1,
        ElementKind::U1 => Op::LdindU1,
        ElementKind::I2 => Op::LdindI2,
        ElementKind::U2 => Op::LdindU2,
        ElementKind::I4 => Op::LdindI4,
        ElementKind::U4 => Op::LdindU4,
        ElementKind::I8 | ElementKind::U8 => Op::LdindI8,
        ElementKind::R4 => Op::LdindR4,
        ElementKind::R8 => Op::LdindR8,
        ElementKind::IntPtr | ElementKind::UIntPtr => Op::LdindI,
        _ => Op::LdindRef,
    }
}

fn store_indirect_form(element: ElementKind) -> Option<Op> {
    match element {
        ElementKind::I1 | ElementKind::U1 | ElementKind::Boolean => Some(Op::StindI1),
        ElementKind::I2 | ElementKind::U2 | ElementKind::Char => Some(Op::StindI2),
        ElementKind::I4 | ElementKind::U4 => Some(Op::StindI4),
        ElementKind::I8 | ElementKind::U8 => Some(Op::StindI8),
        ElementKind::R4 => Some(Op::StindR4),
        ElementKind::R8 => Some(Op::StindR8),
        ElementKind::IntPtr | ElementKind::UIntPtr => Some(Op::StindI),
        ElementKind::Object | ElementKind::String => Some(Op::StindRef),
        _ => None,
    }
}

fn load_element_form(element: ElementKind) -> Option<Op> {
    match element {
        ElementKind::I1 => Some(Op::LdelemI1),
        ElementKind::U1 | ElementKind::Boolean => Some(Op::LdelemU1),
        ElementKind::I2 => Some(Op::LdelemI2),
        ElementKind::U2 | ElementKind::Char => Some(Op::LdelemU2),
        ElementKind::I4 => Some(Op::LdelemI4),
        ElementKind::U4 => Some(Op::LdelemU4),
        ElementKind::I8 | ElementKind::U8 => Some(Op::LdelemI8),
        ElementKind::IntPtr | ElementKind::UIntPtr => Some(Op::LdelemI),
        ElementKind::R4 => Some(Op::LdelemR4),
        ElementKind::R8 => Some(Op::LdelemR8),
        ElementKind::Object | ElementKind::String => Some(Op::LdelemRef),
        _ => None,
    }
}

fn store_element_form(element: ElementKind) -> Option<Op> {
    match element {
        ElementKind::I1 | ElementKind::U1 | ElementKind::Boolean => Some(Op::StelemI1),
        ElementKind::I2 | ElementKind::U2 | ElementKind::Char => Some(Op::StelemI2),
        ElementKind::I4 | ElementKind::U4 => Some(Op::StelemI4),
        ElementKind::I8 | ElementKind::U8 => Some(Op::StelemI8),
        ElementKind::R4 => Some(Op::StelemR4),
        ElementKind::R8 => Some(Op::StelemR8),
        ElementKind::IntPtr | ElementKind::UIntPtr => Some(Op::StelemI),
        ElementKind::Object | ElementKind::String => Some(Op::StelemRef),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BasicOp, OpFlags};

    #[test]
    fn basic_forms_cover_flag_suffixes() {
        assert_eq!(basic_form(BasicOp::Add, OpFlags::NONE), Some(Op::Add));
        assert_eq!(basic_form(BasicOp::Add, OpFlags::OVERFLOW), Some(Op::AddOvf));
        assert_eq!(
            basic_form(BasicOp::Add, OpFlags::OVERFLOW_UNSIGNED),
            Some(Op::AddOvfUn)
        );
        // No overflow-checked division exists in the foreign set.
        assert_eq!(basic_form(BasicOp::Div, OpFlags::OVERFLOW), None);
    }

    #[test]
    fn branch_forms_cover_signedness() {
        assert_eq!(branch_form(BranchCondition::Always, false), Some(Op::Br));
        assert_eq!(branch_form(BranchCondition::Less, true), Some(Op::BltUn));
        // Equality has no unsigned long form; inequality has no signed one.
        assert_eq!(branch_form(BranchCondition::Equal, true), None);
        assert_eq!(branch_form(BranchCondition::NotEqual, false), None);
    }

    #[test]
    fn conversion_forms_cover_the_grid() {
        assert_eq!(
            conversion_form(NumericTarget::I4, OpFlags::NONE),
            Some(Op::ConvI4)
        );
        assert_eq!(
            conversion_form(NumericTarget::U8, OpFlags::OVERFLOW_UNSIGNED),
            Some(Op::ConvOvfU8Un)
        );
        assert_eq!(conversion_form(NumericTarget::R4, OpFlags::OVERFLOW), None);
    }
}
