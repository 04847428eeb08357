//! Foreign instruction decoding onto the canonical instruction set.
//!
//! The decode table collapses ~180 concrete opcode forms onto the closed [`CodeOp`]
//! union. Implicit-operand shorthand forms (`ldarg.0`, `ldc.i4.m1`, short branches)
//! normalize to one kind with an explicit operand; overflow and signedness survive as
//! flags derived from the mnemonic suffix. Embedded handles resolve through the
//! [`ResolveSession`].
//!
//! Three degradation rules apply, in order:
//! - explicitly unimplemented forms (typed references, alignment/volatility prefixes)
//!   raise a hard [`crate::Error::UnsupportedConstruct`]
//! - calls against a faux-array symbol re-route to the dedicated element-access kinds,
//!   hiding the vector/general-array distinction downstream
//! - wholly unrecognized forms decode to an offset-preserving placeholder, never
//!   dropped, because branch-target resolution indexes instructions by offset

use crate::{
    backend::{
        ElementKind, ForeignBody, ForeignInstruction, ForeignMemberSig, ForeignOperand, Op,
        TableKind, Token,
    },
    model::{
        AccessMode, ArrayShape, BasicOp, BranchCondition, CodeInstruction, CodeOp, Constant,
        Conversion, MemberToken, MethodBody, NumericTarget, OpFlags, RegionHandler,
        VariableSlot,
    },
    model::ExceptionRegion,
    resolve::ResolveSession,
    Result,
};

/// Decodes a full foreign body into a canonical [`MethodBody`] in bytecode form.
///
/// Locals and exception regions resolve alongside the instruction stream; the body
/// keeps the foreign max-stack value, which the encoder recomputes on the way back.
///
/// # Errors
///
/// Fails on explicitly unimplemented constructs, unresolvable handles and malformed
/// operand shapes.
pub fn decode_body(session: &ResolveSession<'_>, body: &ForeignBody) -> Result<MethodBody> {
    let instructions = decode_stream(session, &body.instructions)?;

    let locals = body
        .locals
        .iter()
        .map(|local| session.resolve_type_sig(local))
        .collect::<Result<Vec<_>>>()?;

    let regions = body
        .regions
        .iter()
        .map(|region| {
            let handler = match &region.kind {
                crate::backend::RegionKind::Catch(token) => {
                    RegionHandler::Catch(session.resolve_type(*token)?)
                }
                crate::backend::RegionKind::Filter(offset) => RegionHandler::Filter(*offset),
                crate::backend::RegionKind::Finally => RegionHandler::Finally,
                crate::backend::RegionKind::Fault => RegionHandler::Fault,
            };
            Ok(ExceptionRegion {
                handler,
                try_offset: region.try_offset,
                try_length: region.try_length,
                handler_offset: region.handler_offset,
                handler_length: region.handler_length,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut decoded = MethodBody::bytecode(instructions);
    decoded.locals = locals;
    decoded.init_locals = body.init_locals;
    decoded.max_stack = body.max_stack;
    decoded.regions = regions;
    Ok(decoded)
}

/// Decodes a flat foreign instruction stream into canonical instructions.
///
/// # Errors
///
/// Fails on explicitly unimplemented constructs, unresolvable handles and malformed
/// operand shapes.
pub fn decode_stream(
    session: &ResolveSession<'_>,
    stream: &[ForeignInstruction],
) -> Result<Vec<CodeInstruction>> {
    let mut decoded = Vec::with_capacity(stream.len());
    let mut pending_tail: Option<u32> = None;

    for instr in stream {
        if !instr.operand.matches(instr.op.info().operand) {
            return Err(malformed_error!(
                "operand of {} at offset {:#x} does not match its declared shape",
                instr.op.mnemonic(),
                instr.offset
            ));
        }

        match instr.op {
            // The tail prefix fuses with the following call; the pair is addressed at
            // the prefix offset, and branching between the two is not representable.
            Op::TailPrefix => {
                pending_tail = Some(instr.offset);
                continue;
            }
            _ => {}
        }

        let offset = match pending_tail.take() {
            Some(prefix_offset) => {
                if !matches!(instr.op, Op::Call | Op::Callvirt | Op::Calli) {
                    return Err(malformed_error!(
                        "tail. prefix at offset {:#x} is not followed by a call",
                        prefix_offset
                    ));
                }
                prefix_offset
            }
            None => instr.offset,
        };

        let op = decode_op(session, instr, offset)?;
        decoded.push(CodeInstruction::new(offset, op));
    }

    if let Some(prefix_offset) = pending_tail {
        return Err(malformed_error!(
            "tail. prefix at offset {:#x} ends the instruction stream",
            prefix_offset
        ));
    }

    Ok(decoded)
}

fn decode_op(
    session: &ResolveSession<'_>,
    instr: &ForeignInstruction,
    offset: u32,
) -> Result<CodeOp> {
    let tail = offset != instr.offset;
    match instr.op {
        // ── Explicitly unimplemented ───────────────────────────────────────
        Op::Mkrefany | Op::Refanyval | Op::Refanytype => Err(unsupported_error!(
            "typed-reference opcode {} at offset {:#x}",
            instr.op.mnemonic(),
            instr.offset
        )),
        Op::UnalignedPrefix | Op::VolatilePrefix | Op::ReadonlyPrefix => Err(unsupported_error!(
            "alignment/volatility prefix {} at offset {:#x}",
            instr.op.mnemonic(),
            instr.offset
        )),
        Op::TailPrefix => unreachable!("handled by the stream decoder"),

        // ── Primitives ─────────────────────────────────────────────────────
        Op::Nop => Ok(basic(BasicOp::Nop)),
        Op::Break => Ok(basic(BasicOp::Break)),
        Op::Dup => Ok(basic(BasicOp::Dup)),
        Op::Pop => Ok(basic(BasicOp::Pop)),
        Op::Ret => Ok(basic(BasicOp::Return)),
        Op::Throw => Ok(basic(BasicOp::Throw)),
        Op::Rethrow => Ok(basic(BasicOp::Rethrow)),
        Op::Ldlen => Ok(basic(BasicOp::LoadLength)),
        Op::Ckfinite => Ok(basic(BasicOp::CheckFinite)),
        Op::Localloc => Ok(basic(BasicOp::LocalAlloc)),
        Op::Arglist => Ok(basic(BasicOp::ArgumentList)),
        Op::Endfilter => Ok(basic(BasicOp::EndFilter)),
        Op::Endfinally => Ok(basic(BasicOp::EndFinally)),
        Op::Cpblk => Ok(basic(BasicOp::CopyBlock)),
        Op::Initblk => Ok(basic(BasicOp::InitBlock)),

        Op::Add => Ok(basic(BasicOp::Add)),
        Op::AddOvf => Ok(flagged(BasicOp::Add, OpFlags::OVERFLOW)),
        Op::AddOvfUn => Ok(flagged(BasicOp::Add, OpFlags::OVERFLOW_UNSIGNED)),
        Op::Sub => Ok(basic(BasicOp::Sub)),
        Op::SubOvf => Ok(flagged(BasicOp::Sub, OpFlags::OVERFLOW)),
        Op::SubOvfUn => Ok(flagged(BasicOp::Sub, OpFlags::OVERFLOW_UNSIGNED)),
        Op::Mul => Ok(basic(BasicOp::Mul)),
        Op::MulOvf => Ok(flagged(BasicOp::Mul, OpFlags::OVERFLOW)),
        Op::MulOvfUn => Ok(flagged(BasicOp::Mul, OpFlags::OVERFLOW_UNSIGNED)),
        Op::Div => Ok(basic(BasicOp::Div)),
        Op::DivUn => Ok(flagged(BasicOp::Div, OpFlags::UNSIGNED)),
        Op::Rem => Ok(basic(BasicOp::Rem)),
        Op::RemUn => Ok(flagged(BasicOp::Rem, OpFlags::UNSIGNED)),
        Op::And => Ok(basic(BasicOp::And)),
        Op::Or => Ok(basic(BasicOp::Or)),
        Op::Xor => Ok(basic(BasicOp::Xor)),
        Op::Shl => Ok(basic(BasicOp::Shl)),
        Op::Shr => Ok(basic(BasicOp::Shr)),
        Op::ShrUn => Ok(flagged(BasicOp::Shr, OpFlags::UNSIGNED)),
        Op::Neg => Ok(basic(BasicOp::Neg)),
        Op::Not => Ok(basic(BasicOp::Not)),
        Op::Ceq => Ok(basic(BasicOp::CompareEqual)),
        Op::Cgt => Ok(basic(BasicOp::CompareGreater)),
        Op::CgtUn => Ok(flagged(BasicOp::CompareGreater, OpFlags::UNSIGNED)),
        Op::Clt => Ok(basic(BasicOp::CompareLess)),
        Op::CltUn => Ok(flagged(BasicOp::CompareLess, OpFlags::UNSIGNED)),

        // ── Constants ──────────────────────────────────────────────────────
        Op::Ldnull => Ok(CodeOp::LoadConstant(Constant::Null)),
        Op::LdcI4M1 => Ok(CodeOp::LoadConstant(Constant::I4(-1))),
        Op::LdcI40 => Ok(CodeOp::LoadConstant(Constant::I4(0))),
        Op::LdcI41 => Ok(CodeOp::LoadConstant(Constant::I4(1))),
        Op::LdcI42 => Ok(CodeOp::LoadConstant(Constant::I4(2))),
        Op::LdcI43 => Ok(CodeOp::LoadConstant(Constant::I4(3))),
        Op::LdcI44 => Ok(CodeOp::LoadConstant(Constant::I4(4))),
        Op::LdcI45 => Ok(CodeOp::LoadConstant(Constant::I4(5))),
        Op::LdcI46 => Ok(CodeOp::LoadConstant(Constant::I4(6))),
        Op::LdcI47 => Ok(CodeOp::LoadConstant(Constant::I4(7))),
        Op::LdcI48 => Ok(CodeOp::LoadConstant(Constant::I4(8))),
        Op::LdcI4S => Ok(CodeOp::LoadConstant(Constant::I4(i32::from(
            expect_i8(instr)?,
        )))),
        Op::LdcI4 => Ok(CodeOp::LoadConstant(Constant::I4(expect_i32(instr)?))),
        Op::LdcI8 => Ok(CodeOp::LoadConstant(Constant::I8(expect_i64(instr)?))),
        Op::LdcR4 => Ok(CodeOp::LoadConstant(Constant::R4(expect_f32(instr)?))),
        Op::LdcR8 => Ok(CodeOp::LoadConstant(Constant::R8(expect_f64(instr)?))),
        Op::Ldstr => Ok(CodeOp::LoadConstant(Constant::String(expect_string(
            instr,
        )?))),

        // ── Variables ──────────────────────────────────────────────────────
        Op::Ldarg0 => Ok(load_slot(VariableSlot::argument(0), AccessMode::Content)),
        Op::Ldarg1 => Ok(load_slot(VariableSlot::argument(1), AccessMode::Content)),
        Op::Ldarg2 => Ok(load_slot(VariableSlot::argument(2), AccessMode::Content)),
        Op::Ldarg3 => Ok(load_slot(VariableSlot::argument(3), AccessMode::Content)),
        Op::LdargS | Op::Ldarg => Ok(load_slot(
            VariableSlot::argument(expect_index(instr)?),
            AccessMode::Content,
        )),
        Op::LdargaS | Op::Ldarga => Ok(load_slot(
            VariableSlot::argument(expect_index(instr)?),
            AccessMode::Address,
        )),
        Op::StargS | Op::Starg => Ok(CodeOp::StoreVariable {
            slot: VariableSlot::argument(expect_index(instr)?),
        }),
        Op::Ldloc0 => Ok(load_slot(VariableSlot::local(0), AccessMode::Content)),
        Op::Ldloc1 => Ok(load_slot(VariableSlot::local(1), AccessMode::Content)),
        Op::Ldloc2 => Ok(load_slot(VariableSlot::local(2), AccessMode::Content)),
        Op::Ldloc3 => Ok(load_slot(VariableSlot::local(3), AccessMode::Content)),
        Op::LdlocS | Op::Ldloc => Ok(load_slot(
            VariableSlot::local(expect_index(instr)?),
            AccessMode::Content,
        )),
        Op::LdlocaS | Op::Ldloca => Ok(load_slot(
            VariableSlot::local(expect_index(instr)?),
            AccessMode::Address,
        )),
        Op::Stloc0 => Ok(store_slot(VariableSlot::local(0))),
        Op::Stloc1 => Ok(store_slot(VariableSlot::local(1))),
        Op::Stloc2 => Ok(store_slot(VariableSlot::local(2))),
        Op::Stloc3 => Ok(store_slot(VariableSlot::local(3))),
        Op::StlocS | Op::Stloc => Ok(store_slot(VariableSlot::local(expect_index(instr)?))),

        // ── Branches ───────────────────────────────────────────────────────
        Op::Br | Op::BrS => Ok(branch(BranchCondition::Always, false, instr)?),
        Op::Brtrue | Op::BrtrueS => Ok(branch(BranchCondition::True, false, instr)?),
        Op::Brfalse | Op::BrfalseS => Ok(branch(BranchCondition::False, false, instr)?),
        Op::Beq | Op::BeqS => Ok(branch(BranchCondition::Equal, false, instr)?),
        Op::Bge | Op::BgeS => Ok(branch(BranchCondition::GreaterOrEqual, false, instr)?),
        Op::Bgt | Op::BgtS => Ok(branch(BranchCondition::Greater, false, instr)?),
        Op::Ble | Op::BleS => Ok(branch(BranchCondition::LessOrEqual, false, instr)?),
        Op::Blt | Op::BltS => Ok(branch(BranchCondition::Less, false, instr)?),
        Op::BneUn | Op::BneUnS => Ok(branch(BranchCondition::NotEqual, true, instr)?),
        Op::BgeUn | Op::BgeUnS => Ok(branch(BranchCondition::GreaterOrEqual, true, instr)?),
        Op::BgtUn | Op::BgtUnS => Ok(branch(BranchCondition::Greater, true, instr)?),
        Op::BleUn | Op::BleUnS => Ok(branch(BranchCondition::LessOrEqual, true, instr)?),
        Op::BltUn | Op::BltUnS => Ok(branch(BranchCondition::Less, true, instr)?),
        Op::Leave | Op::LeaveS => Ok(CodeOp::Leave {
            target: expect_target(instr)?,
        }),
        Op::Switch => Ok(CodeOp::Switch {
            targets: expect_switch(instr)?,
        }),

        // ── Indirect access ────────────────────────────────────────────────
        Op::LdindI1 => Ok(load_indirect(session, ElementKind::I1)),
        Op::LdindU1 => Ok(load_indirect(session, ElementKind::U1)),
        Op::LdindI2 => Ok(load_indirect(session, ElementKind::I2)),
        Op::LdindU2 => Ok(load_indirect(session, ElementKind::U2)),
        Op::LdindI4 => Ok(load_indirect(session, ElementKind::I4)),
        Op::LdindU4 => Ok(load_indirect(session, ElementKind::U4)),
        Op::LdindI8 => Ok(load_indirect(session, ElementKind::I8)),
        Op::LdindI => Ok(load_indirect(session, ElementKind::IntPtr)),
        Op::LdindR4 => Ok(load_indirect(session, ElementKind::R4)),
        Op::LdindR8 => Ok(load_indirect(session, ElementKind::R8)),
        Op::LdindRef => Ok(load_indirect(session, ElementKind::Object)),
        Op::Ldobj => {
            let ty = session.resolve_type(expect_token(instr)?)?;
            Ok(CodeOp::LoadIndirect { ty })
        }
        Op::StindI1 => Ok(store_indirect(session, ElementKind::I1)),
        Op::StindI2 => Ok(store_indirect(session, ElementKind::I2)),
        Op::StindI4 => Ok(store_indirect(session, ElementKind::I4)),
        Op::StindI8 => Ok(store_indirect(session, ElementKind::I8)),
        Op::StindR4 => Ok(store_indirect(session, ElementKind::R4)),
        Op::StindR8 => Ok(store_indirect(session, ElementKind::R8)),
        Op::StindI => Ok(store_indirect(session, ElementKind::IntPtr)),
        Op::StindRef => Ok(store_indirect(session, ElementKind::Object)),
        Op::Stobj => {
            let ty = session.resolve_type(expect_token(instr)?)?;
            Ok(CodeOp::StoreIndirect { ty })
        }

        // ── Conversions ────────────────────────────────────────────────────
        Op::ConvI1 => Ok(convert(NumericTarget::I1, OpFlags::NONE)),
        Op::ConvI2 => Ok(convert(NumericTarget::I2, OpFlags::NONE)),
        Op::ConvI4 => Ok(convert(NumericTarget::I4, OpFlags::NONE)),
        Op::ConvI8 => Ok(convert(NumericTarget::I8, OpFlags::NONE)),
        Op::ConvR4 => Ok(convert(NumericTarget::R4, OpFlags::NONE)),
        Op::ConvR8 => Ok(convert(NumericTarget::R8, OpFlags::NONE)),
        Op::ConvU1 => Ok(convert(NumericTarget::U1, OpFlags::NONE)),
        Op::ConvU2 => Ok(convert(NumericTarget::U2, OpFlags::NONE)),
        Op::ConvU4 => Ok(convert(NumericTarget::U4, OpFlags::NONE)),
        Op::ConvU8 => Ok(convert(NumericTarget::U8, OpFlags::NONE)),
        Op::ConvI => Ok(convert(NumericTarget::I, OpFlags::NONE)),
        Op::ConvU => Ok(convert(NumericTarget::U, OpFlags::NONE)),
        Op::ConvRUn => Ok(convert(NumericTarget::RUnsigned, OpFlags::NONE)),
        Op::ConvOvfI1 => Ok(convert(NumericTarget::I1, OpFlags::OVERFLOW)),
        Op::ConvOvfI2 => Ok(convert(NumericTarget::I2, OpFlags::OVERFLOW)),
        Op::ConvOvfI4 => Ok(convert(NumericTarget::I4, OpFlags::OVERFLOW)),
        Op::ConvOvfI8 => Ok(convert(NumericTarget::I8, OpFlags::OVERFLOW)),
        Op::ConvOvfU1 => Ok(convert(NumericTarget::U1, OpFlags::OVERFLOW)),
        Op::ConvOvfU2 => Ok(convert(NumericTarget::U2, OpFlags::OVERFLOW)),
        Op::ConvOvfU4 => Ok(convert(NumericTarget::U4, OpFlags::OVERFLOW)),
        Op::ConvOvfU8 => Ok(convert(NumericTarget::U8, OpFlags::OVERFLOW)),
        Op::ConvOvfI => Ok(convert(NumericTarget::I, OpFlags::OVERFLOW)),
        Op::ConvOvfU => Ok(convert(NumericTarget::U, OpFlags::OVERFLOW)),
        Op::ConvOvfI1Un => Ok(convert(NumericTarget::I1, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfI2Un => Ok(convert(NumericTarget::I2, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfI4Un => Ok(convert(NumericTarget::I4, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfI8Un => Ok(convert(NumericTarget::I8, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfU1Un => Ok(convert(NumericTarget::U1, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfU2Un => Ok(convert(NumericTarget::U2, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfU4Un => Ok(convert(NumericTarget::U4, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfU8Un => Ok(convert(NumericTarget::U8, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfIUn => Ok(convert(NumericTarget::I, OpFlags::OVERFLOW_UNSIGNED)),
        Op::ConvOvfUUn => Ok(convert(NumericTarget::U, OpFlags::OVERFLOW_UNSIGNED)),
        Op::Box => Ok(CodeOp::Convert {
            conversion: Conversion::Box(session.resolve_type(expect_token(instr)?)?),
        }),
        Op::Unbox => Ok(CodeOp::Convert {
            conversion: Conversion::Unbox(session.resolve_type(expect_token(instr)?)?),
        }),
        Op::UnboxAny => Ok(CodeOp::Convert {
            conversion: Conversion::UnboxAny(session.resolve_type(expect_token(instr)?)?),
        }),
        Op::Castclass => Ok(CodeOp::Convert {
            conversion: Conversion::Cast(session.resolve_type(expect_token(instr)?)?),
        }),
        Op::Isinst => Ok(CodeOp::Convert {
            conversion: Conversion::IsInstance(session.resolve_type(expect_token(instr)?)?),
        }),

        // ── Fields ─────────────────────────────────────────────────────────
        Op::Ldfld => Ok(CodeOp::LoadField {
            field: session.resolve_field(expect_token(instr)?)?,
            is_static: false,
            mode: AccessMode::Content,
        }),
        Op::Ldflda => Ok(CodeOp::LoadField {
            field: session.resolve_field(expect_token(instr)?)?,
            is_static: false,
            mode: AccessMode::Address,
        }),
        Op::Stfld => Ok(CodeOp::StoreField {
            field: session.resolve_field(expect_token(instr)?)?,
            is_static: false,
        }),
        Op::Ldsfld => Ok(CodeOp::LoadField {
            field: session.resolve_field(expect_token(instr)?)?,
            is_static: true,
            mode: AccessMode::Content,
        }),
        Op::Ldsflda => Ok(CodeOp::LoadField {
            field: session.resolve_field(expect_token(instr)?)?,
            is_static: true,
            mode: AccessMode::Address,
        }),
        Op::Stsfld => Ok(CodeOp::StoreField {
            field: session.resolve_field(expect_token(instr)?)?,
            is_static: true,
        }),

        // ── Vector element access ──────────────────────────────────────────
        Op::LdelemI1 => Ok(load_element(session, ElementKind::I1, AccessMode::Content)),
        Op::LdelemU1 => Ok(load_element(session, ElementKind::U1, AccessMode::Content)),
        Op::LdelemI2 => Ok(load_element(session, ElementKind::I2, AccessMode::Content)),
        Op::LdelemU2 => Ok(load_element(session, ElementKind::U2, AccessMode::Content)),
        Op::LdelemI4 => Ok(load_element(session, ElementKind::I4, AccessMode::Content)),
        Op::LdelemU4 => Ok(load_element(session, ElementKind::U4, AccessMode::Content)),
        Op::LdelemI8 => Ok(load_element(session, ElementKind::I8, AccessMode::Content)),
        Op::LdelemI => Ok(load_element(
            session,
            ElementKind::IntPtr,
            AccessMode::Content,
        )),
        Op::LdelemR4 => Ok(load_element(session, ElementKind::R4, AccessMode::Content)),
        Op::LdelemR8 => Ok(load_element(session, ElementKind::R8, AccessMode::Content)),
        Op::LdelemRef => Ok(load_element(
            session,
            ElementKind::Object,
            AccessMode::Content,
        )),
        Op::Ldelem => Ok(CodeOp::LoadElement {
            element: session.resolve_type(expect_token(instr)?)?,
            rank: 1,
            mode: AccessMode::Content,
        }),
        Op::Ldelema => Ok(CodeOp::LoadElement {
            element: session.resolve_type(expect_token(instr)?)?,
            rank: 1,
            mode: AccessMode::Address,
        }),
        Op::StelemI1 => Ok(store_element(session, ElementKind::I1)),
        Op::StelemI2 => Ok(store_element(session, ElementKind::I2)),
        Op::StelemI4 => Ok(store_element(session, ElementKind::I4)),
        Op::StelemI8 => Ok(store_element(session, ElementKind::I8)),
        Op::StelemI => Ok(store_element(session, ElementKind::IntPtr)),
        Op::StelemR4 => Ok(store_element(session, ElementKind::R4)),
        Op::StelemR8 => Ok(store_element(session, ElementKind::R8)),
        Op::StelemRef => Ok(store_element(session, ElementKind::Object)),
        Op::Stelem => Ok(CodeOp::StoreElement {
            element: session.resolve_type(expect_token(instr)?)?,
            rank: 1,
        }),
        Op::Newarr => Ok(CodeOp::CreateArray {
            element: session.resolve_type(expect_token(instr)?)?,
            shape: ArrayShape::with_rank(1),
        }),

        // ── Calls and object creation ──────────────────────────────────────
        Op::Call => decode_call(session, instr, false, tail),
        Op::Callvirt => decode_call(session, instr, true, tail),
        Op::Calli => {
            let ty = session.resolve_type(expect_token(instr)?)?;
            let signature = ty.fn_sig.clone().ok_or_else(|| {
                malformed_error!(
                    "calli at offset {:#x} does not reference a function-pointer signature",
                    instr.offset
                )
            })?;
            Ok(CodeOp::CallIndirect { signature })
        }
        Op::Newobj => {
            let constructor = session.resolve_method(expect_token(instr)?)?;
            if let Some(declaring) = constructor.declaring_type() {
                if declaring.is_general_array() {
                    // Non-vector construction surfaces as a constructor call on the
                    // faux-array symbol; route it to genuine array creation.
                    let element = declaring.element.clone().ok_or_else(|| {
                        malformed_error!("faux-array symbol without an element type")
                    })?;
                    let shape = match &declaring.flavor {
                        crate::model::TypeFlavor::Array(shape) => shape.clone(),
                        _ => ArrayShape::with_rank(1),
                    };
                    return Ok(CodeOp::CreateArray { element, shape });
                }
            }
            Ok(CodeOp::CreateObject { constructor })
        }

        // ── Member handles ─────────────────────────────────────────────────
        Op::Ldtoken => Ok(CodeOp::LoadToken {
            member: decode_member_token(session, expect_token(instr)?)?,
        }),
        Op::Ldftn => Ok(CodeOp::LoadFunction {
            method: session.resolve_method(expect_token(instr)?)?,
            virtual_dispatch: false,
        }),
        Op::Ldvirtftn => Ok(CodeOp::LoadFunction {
            method: session.resolve_method(expect_token(instr)?)?,
            virtual_dispatch: true,
        }),

        // ── Type operations ────────────────────────────────────────────────
        Op::ConstrainedPrefix => Ok(CodeOp::Constrained {
            ty: session.resolve_type(expect_token(instr)?)?,
        }),
        Op::Initobj => Ok(CodeOp::InitObject {
            ty: session.resolve_type(expect_token(instr)?)?,
        }),
        Op::Sizeof => Ok(CodeOp::Sizeof {
            ty: session.resolve_type(expect_token(instr)?)?,
        }),

        // ── Everything else degrades to the offset-preserving placeholder ──
        Op::Jmp | Op::Cpobj => Ok(CodeOp::Unrecognized {
            mnemonic: instr.op.mnemonic(),
        }),
    }
}

fn decode_call(
    session: &ResolveSession<'_>,
    instr: &ForeignInstruction,
    virtual_dispatch: bool,
    tail: bool,
) -> Result<CodeOp> {
    let method = session.resolve_method(expect_token(instr)?)?;

    // Non-vector element access arrives as ordinary calls against the faux-array
    // symbol; inspect the callee name and re-route to the kinds vectors use.
    if method.is_faux_array_member() {
        let declaring = method.declaring_type().ok_or_else(|| {
            lookup_miss!("faux-array member lost its declaring type mid-pass")
        })?;
        let element = declaring.element.clone().ok_or_else(|| {
            malformed_error!("faux-array symbol without an element type")
        })?;
        let rank = declaring.array_rank().unwrap_or(1);
        let shape = match &declaring.flavor {
            crate::model::TypeFlavor::Array(shape) => shape.clone(),
            _ => ArrayShape::with_rank(rank),
        };
        return match method.name.as_str() {
            "Get" => Ok(CodeOp::LoadElement {
                element,
                rank,
                mode: AccessMode::Content,
            }),
            "Address" => Ok(CodeOp::LoadElement {
                element,
                rank,
                mode: AccessMode::Address,
            }),
            "Set" => Ok(CodeOp::StoreElement { element, rank }),
            ".ctor" => Ok(CodeOp::CreateArray { element, shape }),
            other => Err(malformed_error!(
                "unexpected faux-array member {} at offset {:#x}",
                other,
                instr.offset
            )),
        };
    }

    Ok(CodeOp::Call {
        method,
        virtual_dispatch,
        tail,
    })
}

fn decode_member_token(session: &ResolveSession<'_>, token: Token) -> Result<MemberToken> {
    match token.table() {
        Some(TableKind::TypeDef) | Some(TableKind::TypeRef) | Some(TableKind::TypeSpec) => {
            Ok(MemberToken::Type(session.resolve_type(token)?))
        }
        Some(TableKind::MethodDef) | Some(TableKind::MethodSpec) => {
            Ok(MemberToken::Method(session.resolve_method(token)?))
        }
        Some(TableKind::FieldDef) => Ok(MemberToken::Field(session.resolve_field(token)?)),
        Some(TableKind::MemberRef) => {
            let row = session.module().member_ref(token)?;
            match row.signature {
                ForeignMemberSig::Method(_) => {
                    Ok(MemberToken::Method(session.resolve_method(token)?))
                }
                ForeignMemberSig::Field(_) => {
                    Ok(MemberToken::Field(session.resolve_field(token)?))
                }
            }
        }
        _ => Err(resolution_error!(
            "token {} cannot be loaded as a member handle",
            token
        )),
    }
}

// ── Construction helpers ───────────────────────────────────────────────────

fn basic(op: BasicOp) -> CodeOp {
    CodeOp::Basic {
        op,
        flags: OpFlags::NONE,
    }
}

fn flagged(op: BasicOp, flags: OpFlags) -> CodeOp {
    CodeOp::Basic { op, flags }
}

fn load_slot(slot: VariableSlot, mode: AccessMode) -> CodeOp {
    CodeOp::LoadVariable { slot, mode }
}

fn store_slot(slot: VariableSlot) -> CodeOp {
    CodeOp::StoreVariable { slot }
}

fn load_indirect(session: &ResolveSession<'_>, element: ElementKind) -> CodeOp {
    CodeOp::LoadIndirect {
        ty: session.platform().element(element),
    }
}

fn store_indirect(session: &ResolveSession<'_>, element: ElementKind) -> CodeOp {
    CodeOp::StoreIndirect {
        ty: session.platform().element(element),
    }
}

fn load_element(session: &ResolveSession<'_>, element: ElementKind, mode: AccessMode) -> CodeOp {
    CodeOp::LoadElement {
        element: session.platform().element(element),
        rank: 1,
        mode,
    }
}

fn store_element(session: &ResolveSession<'_>, element: ElementKind) -> CodeOp {
    CodeOp::StoreElement {
        element: session.platform().element(element),
        rank: 1,
    }
}

fn convert(target: NumericTarget, flags: OpFlags) -> CodeOp {
    CodeOp::Convert {
        conversion: Conversion::Numeric { target, flags },
    }
}

fn branch(
    condition: BranchCondition,
    unsigned: bool,
    instr: &ForeignInstruction,
) -> Result<CodeOp> {
    Ok(CodeOp::Branch {
        condition,
        unsigned,
        target: expect_target(instr)?,
    })
}

// ── Operand extraction ─────────────────────────────────────────────────────

fn operand_error(instr: &ForeignInstruction, expected: &str) -> crate::Error {
    malformed_error!(
        "{} at offset {:#x} expects a {} operand",
        instr.op.mnemonic(),
        instr.offset,
        expected
    )
}

fn expect_i8(instr: &ForeignInstruction) -> Result<i8> {
    match instr.operand {
        ForeignOperand::Int8(value) => Ok(value),
        _ => Err(operand_error(instr, "signed 8-bit")),
    }
}

fn expect_i32(instr: &ForeignInstruction) -> Result<i32> {
    match instr.operand {
        ForeignOperand::Int32(value) => Ok(value),
        _ => Err(operand_error(instr, "signed 32-bit")),
    }
}

fn expect_i64(instr: &ForeignInstruction) -> Result<i64> {
    match instr.operand {
        ForeignOperand::Int64(value) => Ok(value),
        _ => Err(operand_error(instr, "signed 64-bit")),
    }
}

fn expect_f32(instr: &ForeignInstruction) -> Result<f32> {
    match instr.operand {
        ForeignOperand::Float32(value) => Ok(value),
        _ => Err(operand_error(instr, "32-bit float")),
    }
}

fn expect_f64(instr: &ForeignInstruction) -> Result<f64> {
    match instr.operand {
        ForeignOperand::Float64(value) => Ok(value),
        _ => Err(operand_error(instr, "64-bit float")),
    }
}

fn expect_string(instr: &ForeignInstruction) -> Result<String> {
    match &instr.operand {
        ForeignOperand::String(value) => Ok(value.clone()),
        _ => Err(operand_error(instr, "string")),
    }
}

fn expect_index(instr: &ForeignInstruction) -> Result<u16> {
    match instr.operand {
        ForeignOperand::UInt8(value) => Ok(u16::from(value)),
        ForeignOperand::UInt16(value) => Ok(value),
        _ => Err(operand_error(instr, "variable index")),
    }
}

fn expect_token(instr: &ForeignInstruction) -> Result<Token> {
    match instr.operand {
        ForeignOperand::Token(token) => Ok(token),
        _ => Err(operand_error(instr, "token")),
    }
}

fn expect_target(instr: &ForeignInstruction) -> Result<u32> {
    match instr.operand {
        ForeignOperand::Target(target) => Ok(target),
        _ => Err(operand_error(instr, "branch target")),
    }
}

fn expect_switch(instr: &ForeignInstruction) -> Result<Vec<u32>> {
    match &instr.operand {
        ForeignOperand::Switch(targets) => Ok(targets.clone()),
        _ => Err(operand_error(instr, "switch table")),
    }
}
