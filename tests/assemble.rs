//! Integration tests for three-address assembly through the full pipeline: extract a
//! module, swap a method body for its transformed three-address form, regenerate, and
//! verify the stack form that comes out.

use cilbridge::backend::{
    ElementKind, ForeignBody, ForeignFieldDef, ForeignInstruction, ForeignMethodDef,
    ForeignMethodSig, ForeignModule, ForeignOperand, ForeignTypeDef, ForeignTypeSig,
    MemoryBackend,
};
use cilbridge::model::{PlatformKind, TacBinaryOp};
use cilbridge::prelude::*;

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
    instructions: Vec<ForeignInstruction>,
) -> ForeignMethodDef {
    ForeignMethodDef {
        declaring,
        name: name.to_string(),
        flags: cilbridge::backend::MethodAttributes::PUBLIC
            | cilbridge::backend::MethodAttributes::STATIC,
        signature,
        param_names: Vec::new(),
        generic_params: Vec::new(),
        body: Some(ForeignBody {
            max_stack: 1,
            init_locals: true,
            locals: Vec::new(),
            regions: Vec::new(),
            instructions,
        }),
    }
}

fn method_named(model: &ModuleModel, name: &str) -> MethodSymbolRc {
    for symbol in &model.types {
        for (_, method) in symbol.methods.iter() {
            if method.name == name {
                return method.clone();
            }
        }
    }
    panic!("no method named {name}");
}

fn body_of<'m>(module: &'m ForeignModule, method_name: &str) -> &'m ForeignBody {
    for (_, type_row) in module.type_defs() {
        for method_token in &type_row.methods {
            let method = module.method_def(*method_token).unwrap();
            if method.name == method_name {
                return method.body.as_ref().expect("body attached");
            }
        }
    }
    panic!("no method named {method_name}");
}

/// `t = a + b; return t` assembles to a sequence whose simulated depth never exceeds
/// two, returns to zero exactly at the return and reports `MaxStack = 2`.
#[test]
fn transformed_bodies_regenerate_into_stack_form() {
    let mut module = ForeignModule::new("probe");
    let widget = module.add_type_def(class_row("Probe", "Widget"));
    module
        .add_method_def(static_method(
            widget,
            "sum",
            ForeignMethodSig::static_sig(
                ForeignTypeSig::Element(ElementKind::I4),
                vec![
                    ForeignTypeSig::Element(ElementKind::I4),
                    ForeignTypeSig::Element(ElementKind::I4),
                ],
            ),
            vec![
                ForeignInstruction::new(0, Op::LdcI4, ForeignOperand::Int32(0)),
                ForeignInstruction::simple(5, Op::Ret),
            ],
        ))
        .unwrap();

    let model = extract_module(&module).unwrap();
    let sum = method_named(&model, "sum");

    let int32 = model.platform().get(PlatformKind::I4);
    let tac = TacBody {
        statements: vec![
            TacStatement::Binary {
                dest: VariableSlot::local(0),
                op: TacBinaryOp::Add,
                flags: OpFlags::NONE,
                left: TacValue::argument(0),
                right: TacValue::argument(1),
            },
            TacStatement::Return {
                value: Some(TacValue::local(0)),
            },
        ],
        locals: vec![int32.clone()],
        params: vec![int32.clone(), int32],
    };
    sum.set_body(MethodBody::three_address(tac)).unwrap();

    let backend = MemoryBackend::new();
    let regenerated = generate_module(&model, &backend).unwrap();

    let body = body_of(&regenerated, "sum");
    assert_eq!(body.max_stack, 2);
    assert_eq!(body.locals, vec![ForeignTypeSig::Element(ElementKind::I4)]);

    let ops: Vec<Op> = body.instructions.iter().map(|i| i.op).collect();
    assert_eq!(
        ops,
        vec![Op::Ldarg, Op::Ldarg, Op::Add, Op::Stloc, Op::Ldloc, Op::Ret]
    );
    assert_eq!(body.instructions[0].operand, ForeignOperand::UInt16(0));
    assert_eq!(body.instructions[1].operand, ForeignOperand::UInt16(1));
}

/// Two arms that each leave one value live agree at the merge; the merge block drains
/// it and the body assembles cleanly.
#[test]
fn agreeing_merge_depths_assemble() {
    // 0: if a goto 3
    // 1: push 1
    // 2: goto 4
    // 3: push 2
    // 4: l0 = pop
    // 5: return
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
        TacStatement::Push {
            value: TacValue::i4(2),
        },
        TacStatement::PopStack {
            dest: Some(VariableSlot::local(0)),
        },
        TacStatement::Return { value: None },
    ]);

    let body = assemble(&tac).unwrap();
    assert_eq!(body.max_stack, 1);

    let instructions = body.instructions().unwrap();
    assert!(matches!(
        instructions.last().unwrap().op,
        CodeOp::Basic {
            op: BasicOp::Return,
            ..
        }
    ));
}

/// Switch statements lower to a selector load plus a multi-way transfer whose targets
/// all land on real instruction offsets.
#[test]
fn switch_statements_lower_and_encode() {
    // 0: switch l0 -> [2, 3]
    // 1: return
    // 2: return
    // 3: return
    let tac = TacBody::from_statements(vec![
        TacStatement::Switch {
            selector: TacValue::local(0),
            targets: vec![2, 3],
        },
        TacStatement::Return { value: None },
        TacStatement::Return { value: None },
        TacStatement::Return { value: None },
    ]);

    let body = assemble(&tac).unwrap();
    let instructions = body.instructions().unwrap();

    let CodeOp::Switch { targets } = &instructions[1].op else {
        panic!("selector load is followed by the switch");
    };
    assert_eq!(targets.len(), 2);
    for target in targets {
        assert!(instructions.iter().any(|i| i.offset == *target));
    }

    // The encoded switch table points at the physical returns.
    let mut emitter = Emitter::new(ForeignModule::new("generated"));
    let encoded = encode_stream(instructions, &mut emitter).unwrap();
    let ForeignOperand::Switch(offsets) = &encoded[1].operand else {
        panic!("switch carries its table");
    };
    for offset in offsets {
        assert!(encoded.iter().any(|i| i.offset == *offset));
    }
}

/// Calls and field stores in three-address form lower through the pipeline and
/// reference the regenerated rows.
#[test]
fn calls_and_field_stores_lower_through_the_pipeline() {
    let mut module = ForeignModule::new("probe");
    let widget = module.add_type_def(class_row("Probe", "Widget"));
    module
        .add_field_def(ForeignFieldDef {
            declaring: widget,
            name: "cache".to_string(),
            flags: cilbridge::backend::FieldAttributes::STATIC,
            signature: ForeignTypeSig::Element(ElementKind::I4),
        })
        .unwrap();
    module
        .add_method_def(static_method(
            widget,
            "answer",
            ForeignMethodSig::static_sig(ForeignTypeSig::Element(ElementKind::I4), Vec::new()),
            vec![
                ForeignInstruction::new(0, Op::LdcI4, ForeignOperand::Int32(42)),
                ForeignInstruction::simple(5, Op::Ret),
            ],
        ))
        .unwrap();
    module
        .add_method_def(static_method(
            widget,
            "warm",
            ForeignMethodSig::static_sig(ForeignTypeSig::Element(ElementKind::Void), Vec::new()),
            vec![ForeignInstruction::simple(0, Op::Ret)],
        ))
        .unwrap();

    let model = extract_module(&module).unwrap();
    let answer = method_named(&model, "answer");
    let warm = method_named(&model, "warm");
    let (_, cache) = model.types[0].fields.iter().next().unwrap();

    let int32 = model.platform().get(PlatformKind::I4);
    let tac = TacBody {
        statements: vec![
            TacStatement::Call {
                dest: Some(VariableSlot::local(0)),
                method: answer.clone(),
                virtual_dispatch: false,
                args: Vec::new(),
            },
            TacStatement::StoreField {
                field: cache.clone(),
                object: None,
                value: TacValue::local(0),
            },
            TacStatement::Return { value: None },
        ],
        locals: vec![int32],
        params: Vec::new(),
    };
    warm.set_body(MethodBody::three_address(tac)).unwrap();

    let backend = MemoryBackend::new();
    let regenerated = generate_module(&model, &backend).unwrap();

    let body = body_of(&regenerated, "warm");
    let ops: Vec<Op> = body.instructions.iter().map(|i| i.op).collect();
    assert_eq!(
        ops,
        vec![Op::Call, Op::Stloc, Op::Ldloc, Op::Stsfld, Op::Ret]
    );

    let ForeignOperand::Token(callee) = &body.instructions[0].operand else {
        panic!("call carries a token");
    };
    assert_eq!(regenerated.method_def(*callee).unwrap().name, "answer");

    let ForeignOperand::Token(field) = &body.instructions[3].operand else {
        panic!("field store carries a token");
    };
    assert_eq!(regenerated.field_def(*field).unwrap().name, "cache");
}
