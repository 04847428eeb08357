//! Lowering of three-address statements into canonical stack-machine instructions.
//!
//! The assembler runs two passes over the [`TacGraph`] of a body. The first visits
//! blocks in reverse postorder and propagates the operand stack depth at every block
//! entry, verifying that all edges into a block agree - disagreement is a fatal
//! [`crate::Error::StackConsistencyViolation`], never repaired. The second emits
//! canonical instructions block by block in statement order, tracking the simulated
//! depth through every transient load and store for the high-water max-stack, and
//! balancing nonzero depths with pops immediately before each return.
//!
//! Branch targets are statement indices on the way in and canonical instruction offsets
//! on the way out; the emission pass records the first instruction lowered for each
//! statement and patches every branch from that map once the body is complete.

use crate::{
    assemble::cfg::TacGraph,
    model::{
        BasicOp, BodyCode, BranchCondition, CodeInstruction, CodeOp, MethodBody, OpFlags,
        TacBody, TacRelation, TacStatement, TacUnaryOp, TacValue, VariableSlot,
    },
    Result,
};

/// Assembles the three-address form of a body back into bytecode form.
///
/// The resulting body carries the same locals, a recomputed max-stack and no
/// exception regions.
///
/// # Errors
///
/// Fails with [`crate::Error::UnsupportedConstruct`] if the body carries
/// exception-protected regions, with [`crate::Error::StackConsistencyViolation`] if two
/// control-flow edges disagree on a block entry depth, and with
/// [`crate::Error::Malformed`] on malformed statements (operand arity mismatches,
/// underflowing raw stack transfers, branches out of range).
pub fn assemble_body(body: &MethodBody) -> Result<MethodBody> {
    if body.has_regions() {
        return Err(unsupported_error!(
            "assembling a body with exception-protected regions"
        ));
    }
    match &body.code {
        BodyCode::ThreeAddressCode(tac) => assemble(tac),
        BodyCode::Bytecode(_) => Err(malformed_error!(
            "assembly input must be in three-address form"
        )),
    }
}

/// Assembles a three-address body into a canonical bytecode body.
///
/// # Errors
///
/// See [`assemble_body`].
pub fn assemble(tac: &TacBody) -> Result<MethodBody> {
    let graph = TacGraph::build(tac)?;
    if graph.blocks.is_empty() {
        let mut empty = MethodBody::bytecode(Vec::new());
        empty.locals = tac.locals.clone();
        return Ok(empty);
    }

    let entry_depths = propagate_entry_depths(tac, &graph)?;

    let mut lowerer = Lowerer::new(tac.statements.len());
    for block in &graph.blocks {
        lowerer.depth = entry_depths[block.id];
        for index in block.start..block.end {
            lowerer.lower(index, &tac.statements[index])?;
        }
    }
    let instructions = lowerer.patch()?;

    let mut assembled = MethodBody::bytecode(instructions);
    assembled.locals = tac.locals.clone();
    assembled.max_stack = u16::try_from(lowerer.max_depth).unwrap_or(u16::MAX);
    Ok(assembled)
}

/// Computes the operand stack depth at every block entry, in reverse postorder.
///
/// Only the raw stack-transfer statements have a nonzero effect at statement
/// boundaries, so the per-block walk sums [`TacStatement::boundary_stack_effect`].
/// Blocks never reached by propagation default to depth 0.
fn propagate_entry_depths(tac: &TacBody, graph: &TacGraph) -> Result<Vec<usize>> {
    let mut entries: Vec<Option<usize>> = vec![None; graph.blocks.len()];
    entries[0] = Some(0);

    for id in graph.reverse_postorder() {
        let block = &graph.blocks[id];
        let mut depth = match entries[id] {
            Some(depth) => depth,
            None => {
                entries[id] = Some(0);
                0
            }
        };

        for index in block.start..block.end {
            let effect = tac.statements[index].boundary_stack_effect();
            if effect < 0 && depth == 0 {
                return Err(malformed_error!(
                    "raw stack transfer at statement {} pops an empty stack",
                    index
                ));
            }
            depth = depth.wrapping_add_signed(effect as isize);
        }

        for &successor in &block.successors {
            match entries[successor] {
                None => entries[successor] = Some(depth),
                Some(existing) if existing != depth => {
                    #[allow(clippy::cast_possible_truncation)]
                    let offset = graph.blocks[successor].start as u32;
                    return Err(crate::Error::StackConsistencyViolation {
                        offset,
                        expected: existing,
                        actual: depth,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(entries.into_iter().map(|entry| entry.unwrap_or(0)).collect())
}

struct PendingTarget {
    /// Index of the emitted instruction carrying the operand
    emitted: usize,
    /// Target statement indices, in operand order
    statements: Vec<usize>,
}

struct Lowerer {
    instructions: Vec<CodeInstruction>,
    /// First canonical offset lowered for each statement index
    statement_offsets: Vec<Option<u32>>,
    pending: Vec<PendingTarget>,
    depth: usize,
    max_depth: usize,
}

impl Lowerer {
    fn new(statements: usize) -> Self {
        Lowerer {
            instructions: Vec::new(),
            statement_offsets: vec![None; statements],
            pending: Vec::new(),
            depth: 0,
            max_depth: 0,
        }
    }

    /// Emits one canonical instruction and applies its stack effect.
    fn emit(&mut self, op: CodeOp) -> Result<usize> {
        #[allow(clippy::cast_possible_truncation)]
        let offset = self.instructions.len() as u32;
        let instruction = CodeInstruction::new(offset, op);

        let (pops, pushes) = instruction.stack_effect();
        if pops > self.depth {
            return Err(malformed_error!(
                "lowering underflows the operand stack at canonical offset {}",
                offset
            ));
        }
        self.depth = self.depth - pops + pushes;
        self.max_depth = self.max_depth.max(self.depth);

        self.instructions.push(instruction);
        Ok(self.instructions.len() - 1)
    }

    fn load(&mut self, value: &TacValue) -> Result<()> {
        let op = match value {
            TacValue::Variable(slot) => CodeOp::LoadVariable {
                slot: *slot,
                mode: crate::model::AccessMode::Content,
            },
            TacValue::Constant(constant) => CodeOp::LoadConstant(constant.clone()),
        };
        self.emit(op)?;
        Ok(())
    }

    fn store(&mut self, dest: VariableSlot) -> Result<()> {
        self.emit(CodeOp::StoreVariable { slot: dest })?;
        Ok(())
    }

    fn basic(&mut self, op: BasicOp, flags: OpFlags) -> Result<()> {
        self.emit(CodeOp::Basic { op, flags })?;
        Ok(())
    }

    fn lower(&mut self, index: usize, statement: &TacStatement) -> Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        let first = self.instructions.len() as u32;

        match statement {
            TacStatement::Nop => {
                self.basic(BasicOp::Nop, OpFlags::NONE)?;
            }
            TacStatement::Assign { dest, value } => {
                self.load(value)?;
                self.store(*dest)?;
            }
            TacStatement::Unary { dest, op, operand } => {
                self.load(operand)?;
                let basic = match op {
                    TacUnaryOp::Neg => BasicOp::Neg,
                    TacUnaryOp::Not => BasicOp::Not,
                };
                self.basic(basic, OpFlags::NONE)?;
                self.store(*dest)?;
            }
            TacStatement::Binary {
                dest,
                op,
                flags,
                left,
                right,
            } => {
                self.load(left)?;
                self.load(right)?;
                self.basic(binary_basic(*op), *flags)?;
                self.store(*dest)?;
            }
            TacStatement::Compare {
                dest,
                relation,
                unsigned,
                left,
                right,
            } => {
                self.load(left)?;
                self.load(right)?;
                let basic = match relation {
                    TacRelation::Equal => BasicOp::CompareEqual,
                    TacRelation::Greater => BasicOp::CompareGreater,
                    TacRelation::Less => BasicOp::CompareLess,
                };
                let flags = if *unsigned {
                    OpFlags::UNSIGNED
                } else {
                    OpFlags::NONE
                };
                self.basic(basic, flags)?;
                self.store(*dest)?;
            }
            TacStatement::Convert {
                dest,
                target,
                flags,
                operand,
            } => {
                self.load(operand)?;
                self.emit(CodeOp::Convert {
                    conversion: crate::model::Conversion::Numeric {
                        target: *target,
                        flags: *flags,
                    },
                })?;
                self.store(*dest)?;
            }
            TacStatement::Branch { target } => {
                let emitted = self.emit(CodeOp::Branch {
                    condition: BranchCondition::Always,
                    unsigned: false,
                    target: u32::MAX,
                })?;
                self.pending.push(PendingTarget {
                    emitted,
                    statements: vec![*target],
                });
            }
            TacStatement::BranchIf {
                condition,
                unsigned,
                left,
                right,
                target,
            } => {
                let expected = condition.operand_count();
                let supplied = 1 + usize::from(right.is_some());
                if expected == 0 || expected != supplied {
                    return Err(malformed_error!(
                        "conditional branch at statement {} supplies {} operands where its condition tests {}",
                        index,
                        supplied,
                        expected
                    ));
                }
                self.load(left)?;
                if let Some(right) = right {
                    self.load(right)?;
                }
                // The foreign set pairs equality with signed and inequality with
                // unsigned semantics only; the other pairings evaluate the comparison
                // explicitly and branch on its truth value.
                let (condition, unsigned) = match (*condition, *unsigned) {
                    (BranchCondition::NotEqual, false) => {
                        self.basic(BasicOp::CompareEqual, OpFlags::NONE)?;
                        (BranchCondition::False, false)
                    }
                    (BranchCondition::Equal, true) => {
                        self.basic(BasicOp::CompareEqual, OpFlags::NONE)?;
                        (BranchCondition::True, false)
                    }
                    other => other,
                };
                let emitted = self.emit(CodeOp::Branch {
                    condition,
                    unsigned,
                    target: u32::MAX,
                })?;
                self.pending.push(PendingTarget {
                    emitted,
                    statements: vec![*target],
                });
            }
            TacStatement::Switch { selector, targets } => {
                self.load(selector)?;
                let emitted = self.emit(CodeOp::Switch {
                    targets: vec![u32::MAX; targets.len()],
                })?;
                self.pending.push(PendingTarget {
                    emitted,
                    statements: targets.clone(),
                });
            }
            TacStatement::Call {
                dest,
                method,
                virtual_dispatch,
                args,
            } => {
                let expected = method.signature.argument_slots();
                if args.len() != expected {
                    return Err(malformed_error!(
                        "call to {} at statement {} supplies {} arguments where the signature takes {}",
                        method.name,
                        index,
                        args.len(),
                        expected
                    ));
                }
                for arg in args {
                    self.load(arg)?;
                }
                let returns_value = method.signature.returns_value();
                self.emit(CodeOp::Call {
                    method: method.clone(),
                    virtual_dispatch: *virtual_dispatch,
                    tail: false,
                })?;
                match (returns_value, dest) {
                    (true, Some(dest)) => self.store(*dest)?,
                    (true, None) => self.basic(BasicOp::Pop, OpFlags::NONE)?,
                    (false, Some(_)) => {
                        return Err(malformed_error!(
                            "call to {} at statement {} stores the result of a void method",
                            method.name,
                            index
                        ))
                    }
                    (false, None) => {}
                }
            }
            TacStatement::CreateObject {
                dest,
                constructor,
                args,
            } => {
                if args.len() != constructor.signature.params.len() {
                    return Err(malformed_error!(
                        "constructor call at statement {} supplies {} arguments where the signature takes {}",
                        index,
                        args.len(),
                        constructor.signature.params.len()
                    ));
                }
                for arg in args {
                    self.load(arg)?;
                }
                self.emit(CodeOp::CreateObject {
                    constructor: constructor.clone(),
                })?;
                self.store(*dest)?;
            }
            TacStatement::CreateArray {
                dest,
                element,
                length,
            } => {
                self.load(length)?;
                self.emit(CodeOp::CreateArray {
                    element: element.clone(),
                    shape: crate::model::ArrayShape::with_rank(1),
                })?;
                self.store(*dest)?;
            }
            TacStatement::LoadField {
                dest,
                field,
                object,
            } => {
                if let Some(object) = object {
                    self.load(object)?;
                }
                self.emit(CodeOp::LoadField {
                    field: field.clone(),
                    is_static: object.is_none(),
                    mode: crate::model::AccessMode::Content,
                })?;
                self.store(*dest)?;
            }
            TacStatement::StoreField {
                field,
                object,
                value,
            } => {
                if let Some(object) = object {
                    self.load(object)?;
                }
                self.load(value)?;
                self.emit(CodeOp::StoreField {
                    field: field.clone(),
                    is_static: object.is_none(),
                })?;
            }
            TacStatement::LoadElement {
                dest,
                element,
                array,
                index: element_index,
            } => {
                self.load(array)?;
                self.load(element_index)?;
                self.emit(CodeOp::LoadElement {
                    element: element.clone(),
                    rank: 1,
                    mode: crate::model::AccessMode::Content,
                })?;
                self.store(*dest)?;
            }
            TacStatement::StoreElement {
                element,
                array,
                index: element_index,
                value,
            } => {
                self.load(array)?;
                self.load(element_index)?;
                self.load(value)?;
                self.emit(CodeOp::StoreElement {
                    element: element.clone(),
                    rank: 1,
                })?;
            }
            TacStatement::Push { value } => {
                self.load(value)?;
            }
            TacStatement::PopStack { dest } => match dest {
                Some(dest) => self.store(*dest)?,
                None => self.basic(BasicOp::Pop, OpFlags::NONE)?,
            },
            TacStatement::DupStack => {
                self.basic(BasicOp::Dup, OpFlags::NONE)?;
            }
            TacStatement::Return { value } => {
                // A body must return with an empty stack even if upstream left
                // temporaries on it.
                for _ in 0..self.depth {
                    self.basic(BasicOp::Pop, OpFlags::NONE)?;
                }
                if let Some(value) = value {
                    self.load(value)?;
                }
                self.basic(BasicOp::Return, OpFlags::NONE)?;
            }
        }

        self.statement_offsets[index] = Some(first);
        Ok(())
    }

    /// Rewrites every pending branch operand from statement indices to the canonical
    /// offset of the target statement's first instruction.
    fn patch(&mut self) -> Result<Vec<CodeInstruction>> {
        for pending in &self.pending {
            let resolved = pending
                .statements
                .iter()
                .map(|statement| {
                    self.statement_offsets
                        .get(*statement)
                        .copied()
                        .flatten()
                        .ok_or_else(|| {
                            lookup_miss!(
                                "branch target statement {} was never lowered",
                                statement
                            )
                        })
                })
                .collect::<Result<Vec<u32>>>()?;

            match &mut self.instructions[pending.emitted].op {
                CodeOp::Branch { target, .. } => *target = resolved[0],
                CodeOp::Switch { targets } => targets.clone_from(&resolved),
                _ => {
                    return Err(malformed_error!(
                        "pending branch fixup points at a non-branch instruction"
                    ))
                }
            }
        }
        Ok(std::mem::take(&mut self.instructions))
    }
}

fn binary_basic(op: crate::model::TacBinaryOp) -> BasicOp {
    use crate::model::TacBinaryOp;
    match op {
        TacBinaryOp::Add => BasicOp::Add,
        TacBinaryOp::Sub => BasicOp::Sub,
        TacBinaryOp::Mul => BasicOp::Mul,
        TacBinaryOp::Div => BasicOp::Div,
        TacBinaryOp::Rem => BasicOp::Rem,
        TacBinaryOp::And => BasicOp::And,
        TacBinaryOp::Or => BasicOp::Or,
        TacBinaryOp::Xor => BasicOp::Xor,
        TacBinaryOp::Shl => BasicOp::Shl,
        TacBinaryOp::Shr => BasicOp::Shr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TacBinaryOp, TacValue};

    fn ret() -> TacStatement {
        TacStatement::Return { value: None }
    }

    fn returned_instructions(body: &MethodBody) -> &[CodeInstruction] {
        body.instructions().expect("assembled body is bytecode")
    }

    #[test]
    fn add_and_return_simulates_to_peak_two() {
        // t1 = a; t2 = b; t = t1 + t2; return t
        let tac = TacBody {
            statements: vec![
                TacStatement::Assign {
                    dest: VariableSlot::local(0),
                    value: TacValue::argument(0),
                },
                TacStatement::Assign {
                    dest: VariableSlot::local(1),
                    value: TacValue::argument(1),
                },
                TacStatement::Binary {
                    dest: VariableSlot::local(2),
                    op: TacBinaryOp::Add,
                    flags: OpFlags::NONE,
                    left: TacValue::local(0),
                    right: TacValue::local(1),
                },
                TacStatement::Return {
                    value: Some(TacValue::local(2)),
                },
            ],
            locals: Vec::new(),
            params: Vec::new(),
        };

        let body = assemble(&tac).unwrap();
        assert_eq!(body.max_stack, 2);

        let instructions = returned_instructions(&body);
        // load, store, load, store, load, load, add, store, load, ret
        assert_eq!(instructions.len(), 10);
        assert!(matches!(
            instructions.last().unwrap().op,
            CodeOp::Basic {
                op: BasicOp::Return,
                ..
            }
        ));
        // No balancing pops: every statement boundary is stack-neutral.
        let pops = instructions
            .iter()
            .filter(|i| matches!(i.op, CodeOp::Basic { op: BasicOp::Pop, .. }))
            .count();
        assert_eq!(pops, 0);
    }

    #[test]
    fn branch_targets_resolve_to_first_lowered_instruction() {
        // 0: if a goto 3
        // 1: l0 = 1
        // 2: goto 4
        // 3: l0 = 2
        // 4: return
        let tac = TacBody::from_statements(vec![
            TacStatement::BranchIf {
                condition: BranchCondition::True,
                unsigned: false,
                left: TacValue::argument(0),
                right: None,
                target: 3,
            },
            TacStatement::Assign {
                dest: VariableSlot::local(0),
                value: TacValue::i4(1),
            },
            TacStatement::Branch { target: 4 },
            TacStatement::Assign {
                dest: VariableSlot::local(0),
                value: TacValue::i4(2),
            },
            ret(),
        ]);

        let body = assemble(&tac).unwrap();
        let instructions = returned_instructions(&body);

        let branch_targets: Vec<u32> = instructions
            .iter()
            .filter_map(|i| match &i.op {
                CodeOp::Branch { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(branch_targets.len(), 2);
        for target in branch_targets {
            assert!(instructions.iter().any(|i| i.offset == target));
        }
        assert_eq!(body.max_stack, 1);
    }

    #[test]
    fn merge_depth_disagreement_is_fatal() {
        // 0: if a goto 3      (entry, depth 0)
        // 1: push 1           (leaves one value live)
        // 2: goto 4
        // 3: nop              (reaches the merge at depth 0)
        // 4: return           (merge: depth 1 vs 0)
        let tac = TacBody::from_statements(vec![
            TacStatement::BranchIf {
                condition: BranchCondition::True,
                unsigned: false,
                left: TacValue::argument(0),
                right: None,
                target: 3,
            },
            TacStatement::Push {
                value: TacValue::i4(1),
            },
            TacStatement::Branch { target: 4 },
            TacStatement::Nop,
            ret(),
        ]);

        match assemble(&tac) {
            Err(crate::Error::StackConsistencyViolation {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!(offset, 4);
                assert_ne!(expected, actual);
            }
            other => panic!("expected a stack consistency violation, got {other:?}"),
        }
    }

    #[test]
    fn nonzero_exit_depth_inserts_balancing_pops() {
        let tac = TacBody::from_statements(vec![
            TacStatement::Push {
                value: TacValue::i4(1),
            },
            TacStatement::Push {
                value: TacValue::i4(2),
            },
            ret(),
        ]);

        let body = assemble(&tac).unwrap();
        let instructions = returned_instructions(&body);

        let pops = instructions
            .iter()
            .filter(|i| matches!(i.op, CodeOp::Basic { op: BasicOp::Pop, .. }))
            .count();
        assert_eq!(pops, 2);
        // Both pops sit immediately before the return.
        assert!(matches!(
            instructions[instructions.len() - 1].op,
            CodeOp::Basic {
                op: BasicOp::Return,
                ..
            }
        ));
        assert!(matches!(
            instructions[instructions.len() - 2].op,
            CodeOp::Basic { op: BasicOp::Pop, .. }
        ));
        assert_eq!(body.max_stack, 2);
    }

    #[test]
    fn underflowing_raw_transfer_is_rejected() {
        let tac = TacBody::from_statements(vec![
            TacStatement::PopStack { dest: None },
            ret(),
        ]);
        assert!(assemble(&tac).is_err());
    }

    #[test]
    fn condition_operand_arity_is_checked() {
        let tac = TacBody::from_statements(vec![
            TacStatement::BranchIf {
                condition: BranchCondition::Equal,
                unsigned: false,
                left: TacValue::i4(1),
                right: None,
                target: 1,
            },
            ret(),
        ]);
        assert!(assemble(&tac).is_err());
    }

    #[test]
    fn bodies_with_regions_are_rejected() {
        let mut body = MethodBody::three_address(TacBody::from_statements(vec![ret()]));
        body.regions.push(crate::model::ExceptionRegion {
            handler: crate::model::RegionHandler::Finally,
            try_offset: 0,
            try_length: 1,
            handler_offset: 1,
            handler_length: 1,
        });
        assert!(matches!(
            assemble_body(&body),
            Err(crate::Error::UnsupportedConstruct { .. })
        ));
    }
}
