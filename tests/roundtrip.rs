//! Integration tests for the extract → generate round trip and the resolver
//! identities it depends on.
//!
//! Bodies are built row by row against the in-memory backend, pushed through the full
//! pipeline and compared on the way out - exactly where the streams are expected to be
//! byte-identical, by referenced row where tokens legitimately renumber.

use cilbridge::backend::{
    ElementKind, ForeignBody, ForeignFieldDef, ForeignInstruction, ForeignMemberRef,
    ForeignMemberSig, ForeignMethodDef, ForeignMethodSig, ForeignModule, ForeignOperand,
    ForeignScope, ForeignTypeDef, ForeignTypeRef, ForeignTypeSig, MemoryBackend,
    MODULE_PSEUDO_TYPE,
};
use cilbridge::prelude::*;

/// Builds an instruction stream with running byte offsets.
fn stream(ops: Vec<(Op, ForeignOperand)>) -> Vec<ForeignInstruction> {
    let mut instructions = Vec::with_capacity(ops.len());
    let mut offset = 0;
    for (op, operand) in ops {
        let instruction = ForeignInstruction::new(offset, op, operand);
        offset = instruction.next_offset();
        instructions.push(instruction);
    }
    instructions
}

fn class_row(namespace: &str, name: &str) -> ForeignTypeDef {
    ForeignTypeDef {
        namespace: namespace.to_string(),
        name: name.to_string(),
        flags: cilbridge::backend::TypeAttributes::PUBLIC,
        base: None,
        interfaces: Vec::new(),
        enclosing: None,
        generic_params: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        nested: Vec::new(),
    }
}

fn static_method(
    declaring: Token,
    name: &str,
    signature: ForeignMethodSig,
    body: ForeignBody,
) -> ForeignMethodDef {
    ForeignMethodDef {
        declaring,
        name: name.to_string(),
        flags: cilbridge::backend::MethodAttributes::PUBLIC
            | cilbridge::backend::MethodAttributes::STATIC,
        signature,
        param_names: Vec::new(),
        generic_params: Vec::new(),
        body: Some(body),
    }
}

fn body_of(instructions: Vec<ForeignInstruction>, max_stack: u16) -> ForeignBody {
    ForeignBody {
        max_stack,
        init_locals: true,
        locals: vec![
            ForeignTypeSig::Element(ElementKind::I4),
            ForeignTypeSig::Element(ElementKind::I4),
        ],
        regions: Vec::new(),
        instructions,
    }
}

fn first_body(module: &ForeignModule) -> &ForeignBody {
    let (_, type_row) = module
        .type_defs()
        .find(|(_, row)| row.name != MODULE_PSEUDO_TYPE)
        .expect("module has a type");
    let method = module.method_def(type_row.methods[0]).expect("method row");
    method.body.as_ref().expect("method body")
}

/// A body built from long opcode forms with no token operands re-encodes to the
/// byte-identical stream: same forms, same offsets, same branch targets.
#[test]
fn arithmetic_branch_bodies_round_trip_exactly() {
    // l0 = 10; l1 = 3; if l0 < l1 goto ret; l0 = l0 + l1; ret
    let mut instructions = stream(vec![
        (Op::LdcI4, ForeignOperand::Int32(10)),
        (Op::Stloc, ForeignOperand::UInt16(0)),
        (Op::LdcI4, ForeignOperand::Int32(3)),
        (Op::Stloc, ForeignOperand::UInt16(1)),
        (Op::Ldloc, ForeignOperand::UInt16(0)),
        (Op::Ldloc, ForeignOperand::UInt16(1)),
        (Op::Blt, ForeignOperand::Target(0)),
        (Op::Ldloc, ForeignOperand::UInt16(0)),
        (Op::Ldloc, ForeignOperand::UInt16(1)),
        (Op::Add, ForeignOperand::None),
        (Op::Stloc, ForeignOperand::UInt16(0)),
        (Op::Ret, ForeignOperand::None),
    ]);
    let ret_offset = instructions[11].offset;
    instructions[6].operand = ForeignOperand::Target(ret_offset);

    let mut module = ForeignModule::new("probe");
    let widget = module.add_type_def(class_row("Probe", "Widget"));
    module
        .add_method_def(static_method(
            widget,
            "clamp",
            ForeignMethodSig::static_sig(ForeignTypeSig::Element(ElementKind::Void), Vec::new()),
            body_of(instructions.clone(), 2),
        ))
        .unwrap();

    let backend = MemoryBackend::new();
    let model = extract_module(&module).unwrap();
    let regenerated = generate_module(&model, &backend).unwrap();

    let body = first_body(&regenerated);
    assert_eq!(body.instructions, instructions);
    assert_eq!(body.max_stack, 2);
    assert_eq!(body.locals.len(), 2);
}

/// Token-bearing instructions renumber legitimately; the referenced rows must still
/// name the same members, and attribute masks must survive the trip.
#[test]
fn member_references_round_trip_by_row_identity() {
    let mut module = ForeignModule::new("probe");
    let widget = module.add_type_def(class_row("Probe", "Widget"));
    let count = module
        .add_field_def(ForeignFieldDef {
            declaring: widget,
            name: "count".to_string(),
            flags: cilbridge::backend::FieldAttributes::STATIC
                | cilbridge::backend::FieldAttributes::PRIVATE,
            signature: ForeignTypeSig::Element(ElementKind::I4),
        })
        .unwrap();

    let instructions = stream(vec![
        (Op::Ldsfld, ForeignOperand::Token(count)),
        (Op::LdcI4, ForeignOperand::Int32(1)),
        (Op::Add, ForeignOperand::None),
        (Op::Stsfld, ForeignOperand::Token(count)),
        (Op::Ret, ForeignOperand::None),
    ]);
    module
        .add_method_def(static_method(
            widget,
            "bump",
            ForeignMethodSig::static_sig(ForeignTypeSig::Element(ElementKind::Void), Vec::new()),
            ForeignBody {
                max_stack: 2,
                init_locals: true,
                locals: Vec::new(),
                regions: Vec::new(),
                instructions,
            },
        ))
        .unwrap();

    let backend = MemoryBackend::new();
    let model = extract_module(&module).unwrap();
    let regenerated = generate_module(&model, &backend).unwrap();

    let (_, type_row) = regenerated.type_defs().next().unwrap();
    assert_eq!(type_row.flags, cilbridge::backend::TypeAttributes::PUBLIC);

    let field = regenerated.field_def(type_row.fields[0]).unwrap();
    assert_eq!(field.name, "count");
    assert!(field
        .flags
        .contains(cilbridge::backend::FieldAttributes::STATIC));

    let body = first_body(&regenerated);
    assert_eq!(body.instructions.len(), 5);
    assert_eq!(body.instructions[0].op, Op::Ldsfld);
    assert_eq!(body.instructions[3].op, Op::Stsfld);
    for index in [0usize, 3] {
        let ForeignOperand::Token(token) = &body.instructions[index].operand else {
            panic!("field access carries a token");
        };
        assert_eq!(regenerated.field_def(*token).unwrap().name, "count");
    }
}

/// Decoding an unrecognized opcode at offset K yields a canonical instruction at
/// offset K, and a branch targeting K still resolves - through encode as well, where
/// the placeholder lowers to a no-op.
#[test]
fn unrecognized_opcodes_preserve_offsets_and_branch_targets() {
    let mut instructions = stream(vec![
        (Op::Br, ForeignOperand::Target(0)),
        (Op::Nop, ForeignOperand::None),
        (
            Op::Jmp,
            ForeignOperand::Token(Token::from_parts(TableKind::MethodDef, 1)),
        ),
        (Op::Ret, ForeignOperand::None),
    ]);
    let jmp_offset = instructions[2].offset;
    instructions[0].operand = ForeignOperand::Target(jmp_offset);

    let module = ForeignModule::new("probe");
    let session = ResolveSession::new(&module);
    let decoded = decode_stream(&session, &instructions).unwrap();

    assert_eq!(decoded[2].offset, jmp_offset);
    assert!(matches!(decoded[2].op, CodeOp::Unrecognized { .. }));
    assert_eq!(decoded[0].targets(), vec![jmp_offset]);

    let mut emitter = Emitter::new(ForeignModule::new("generated"));
    let encoded = encode_stream(&decoded, &mut emitter).unwrap();
    assert_eq!(encoded[2].op, Op::Nop);
    assert_eq!(encoded[0].targets(), vec![encoded[2].offset]);
}

/// Resolving the same handle twice within one pass returns the identical symbol: for a
/// plain external class, a nested class, a generic instantiation with matching
/// arguments and a type-generic parameter.
#[test]
fn interning_returns_identical_symbols() {
    let mut module = ForeignModule::new("probe");
    let lib = module.add_assembly_ref("External.Lib");
    let widget = module.add_type_ref(ForeignTypeRef {
        namespace: "External".to_string(),
        name: "Widget".to_string(),
        scope: ForeignScope::Assembly(lib),
    });
    let inner = module.add_type_ref(ForeignTypeRef {
        namespace: String::new(),
        name: "Inner".to_string(),
        scope: ForeignScope::Nested(widget),
    });

    let session = ResolveSession::new(&module);

    let first = session.resolve_type(widget).unwrap();
    let second = session.resolve_type(widget).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let nested_first = session.resolve_type(inner).unwrap();
    let nested_second = session.resolve_type(inner).unwrap();
    assert!(std::sync::Arc::ptr_eq(&nested_first, &nested_second));
    assert_eq!(nested_first.namespace, "External");
    assert!(std::sync::Arc::ptr_eq(
        &nested_first.containing_type().unwrap(),
        &first
    ));

    let instantiation = ForeignTypeSig::GenericInst {
        definition: widget,
        value_type: false,
        args: vec![ForeignTypeSig::Element(ElementKind::I4)],
    };
    let inst_first = session.resolve_type_sig(&instantiation).unwrap();
    let inst_second = session.resolve_type_sig(&instantiation.clone()).unwrap();
    assert!(std::sync::Arc::ptr_eq(&inst_first, &inst_second));
    assert!(std::sync::Arc::ptr_eq(
        inst_first.generic_type.as_ref().unwrap(),
        &first
    ));

    let param_first = session.resolve_generic_param(widget, 0, false).unwrap();
    let param_second = session.resolve_generic_param(widget, 0, false).unwrap();
    assert!(std::sync::Arc::ptr_eq(&param_first, &param_second));

    // Differing arguments intern separately.
    let other = ForeignTypeSig::GenericInst {
        definition: widget,
        value_type: false,
        args: vec![ForeignTypeSig::Element(ElementKind::I8)],
    };
    let inst_other = session.resolve_type_sig(&other).unwrap();
    assert!(!std::sync::Arc::ptr_eq(&inst_first, &inst_other));
}

/// Resolving a method-generic parameter before its owning method is otherwise touched
/// returns a correctly positioned symbol; a later direct resolution of the owner reuses
/// the same symbols instead of duplicating them.
#[test]
fn generic_fixed_point_reuses_parameter_symbols() {
    let mut module = ForeignModule::new("probe");
    let mut factory = class_row("Probe", "Factory");
    factory.generic_params.push(cilbridge::backend::ForeignGenericParam {
        name: "T".to_string(),
        position: 0,
    });
    let factory_token = module.add_type_def(factory);

    let method_token = Token::from_parts(TableKind::MethodDef, 1);
    module
        .add_method_def(ForeignMethodDef {
            declaring: factory_token,
            name: "make".to_string(),
            flags: cilbridge::backend::MethodAttributes::PUBLIC,
            signature: ForeignMethodSig {
                has_this: true,
                return_type: ForeignTypeSig::GenericParam {
                    owner: method_token,
                    position: 0,
                    method: true,
                },
                params: vec![ForeignTypeSig::GenericParam {
                    owner: factory_token,
                    position: 0,
                    method: false,
                }],
                generic_arity: 1,
            },
            param_names: vec!["seed".to_string()],
            generic_params: vec![cilbridge::backend::ForeignGenericParam {
                name: "U".to_string(),
                position: 0,
            }],
            body: None,
        })
        .unwrap();

    let session = ResolveSession::new(&module);
    session
        .define_type(
            factory_token,
            TypeFlavor::Class,
            cilbridge::backend::TypeAttributes::PUBLIC,
            None,
        )
        .unwrap();

    // Parameter first: the owner has not been touched yet.
    let early = session
        .resolve_generic_param(method_token, 0, true)
        .unwrap();
    assert_eq!(early.name, "U");
    assert!(matches!(
        early.flavor,
        TypeFlavor::GenericParam {
            position: 0,
            method: true
        }
    ));

    // The owner reuses the same symbol - in its parameter list and its signature.
    let method = session.resolve_method(method_token).unwrap();
    let (_, listed) = method.generic_params.iter().next().unwrap();
    assert!(std::sync::Arc::ptr_eq(listed, &early));
    assert!(std::sync::Arc::ptr_eq(&method.signature.return_type, &early));

    // The type-generic parameter in the signature is the type's own symbol.
    let factory_symbol = session.resolve_type(factory_token).unwrap();
    let (_, declared) = factory_symbol.generic_params.iter().next().unwrap();
    assert!(std::sync::Arc::ptr_eq(&method.signature.params[0], declared));
}

fn two_dimensional_get(module: &mut ForeignModule) -> Token {
    let spec = module.add_type_spec(ForeignTypeSig::Array {
        element: Box::new(ForeignTypeSig::Element(ElementKind::I4)),
        rank: 2,
        lower_bounds: Vec::new(),
        sizes: Vec::new(),
    });
    module.add_member_ref(ForeignMemberRef {
        parent: spec,
        name: "Get".to_string(),
        signature: ForeignMemberSig::Method(ForeignMethodSig::instance_sig(
            ForeignTypeSig::Element(ElementKind::I4),
            vec![
                ForeignTypeSig::Element(ElementKind::I4),
                ForeignTypeSig::Element(ElementKind::I4),
            ],
        )),
    })
}

/// Decoding a two-dimensional array's `Get(i, j)` call yields the same canonical kind
/// as a vector's dedicated element-load opcode, differing only in recorded rank.
#[test]
fn array_dispatch_unifies_vector_and_general_access() {
    let mut module = ForeignModule::new("probe");
    let get = two_dimensional_get(&mut module);

    let instructions = stream(vec![
        (Op::Call, ForeignOperand::Token(get)),
        (Op::LdelemI4, ForeignOperand::None),
        (Op::Ret, ForeignOperand::None),
    ]);

    let session = ResolveSession::new(&module);
    let decoded = decode_stream(&session, &instructions).unwrap();

    let CodeOp::LoadElement {
        rank: general_rank,
        mode: general_mode,
        ..
    } = &decoded[0].op
    else {
        panic!("faux-array Get decodes to an element load, got {:?}", decoded[0]);
    };
    let CodeOp::LoadElement {
        rank: vector_rank,
        mode: vector_mode,
        ..
    } = &decoded[1].op
    else {
        panic!("ldelem.i4 decodes to an element load, got {:?}", decoded[1]);
    };

    assert_eq!(*general_rank, 2);
    assert_eq!(*vector_rank, 1);
    assert_eq!(general_mode, vector_mode);
}

/// Encode lowers the rank-2 element load back to a `Get` call against a freshly
/// materialized faux-array member reference.
#[test]
fn two_dimensional_access_round_trips_through_encode() {
    let mut module = ForeignModule::new("probe");
    let get = two_dimensional_get(&mut module);

    let instructions = stream(vec![
        (Op::Call, ForeignOperand::Token(get)),
        (Op::Ret, ForeignOperand::None),
    ]);

    let session = ResolveSession::new(&module);
    let decoded = decode_stream(&session, &instructions).unwrap();

    let mut emitter = Emitter::new(ForeignModule::new("generated"));
    let encoded = encode_stream(&decoded, &mut emitter).unwrap();
    let generated = emitter.finish();

    assert_eq!(encoded[0].op, Op::Call);
    let ForeignOperand::Token(token) = &encoded[0].operand else {
        panic!("lowered accessor carries a token");
    };
    let row = generated.member_ref(*token).unwrap();
    assert_eq!(row.name, "Get");
    let parent = generated.type_spec(row.parent).unwrap();
    assert!(matches!(parent, ForeignTypeSig::Array { rank: 2, .. }));
}

/// Exception-region metadata flows through extraction and generation unchanged; only
/// the assembler rejects protected bodies.
#[test]
fn exception_regions_survive_the_round_trip() {
    let instructions = stream(vec![
        (Op::Nop, ForeignOperand::None),
        (Op::Leave, ForeignOperand::Target(10)),
        (Op::Endfinally, ForeignOperand::None),
        (Op::Ret, ForeignOperand::None),
    ]);
    let leave_target = instructions[3].offset;
    let mut instructions = instructions;
    instructions[1].operand = ForeignOperand::Target(leave_target);

    let region = cilbridge::backend::ForeignRegion {
        kind: cilbridge::backend::RegionKind::Finally,
        try_offset: 0,
        try_length: instructions[2].offset,
        handler_offset: instructions[2].offset,
        handler_length: instructions[3].offset - instructions[2].offset,
    };

    let mut module = ForeignModule::new("probe");
    let widget = module.add_type_def(class_row("Probe", "Widget"));
    module
        .add_method_def(static_method(
            widget,
            "guarded",
            ForeignMethodSig::static_sig(ForeignTypeSig::Element(ElementKind::Void), Vec::new()),
            ForeignBody {
                max_stack: 1,
                init_locals: true,
                locals: Vec::new(),
                regions: vec![region.clone()],
                instructions,
            },
        ))
        .unwrap();

    let backend = MemoryBackend::new();
    let model = extract_module(&module).unwrap();
    let regenerated = generate_module(&model, &backend).unwrap();

    let body = first_body(&regenerated);
    assert_eq!(body.regions.len(), 1);
    assert_eq!(body.regions[0], region);
}
