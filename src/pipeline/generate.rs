//! Module generation: canonical object model → foreign module rows.
//!
//! Generation runs shell-first: every type and method of the module is created empty
//! before any base, interface, field or body is filled in, because bodies and
//! signatures may reference sibling declarations that would otherwise not exist yet -
//! the shell/complete split is how forward-reference cycles are broken.
//!
//! Bodies still in three-address form are run through the assembler first; canonical
//! bytecode is then encoded against the [`Emitter`], which materializes every
//! reference row the instruction stream needs. The stack requirement recorded in each
//! body header is recomputed from the canonical stream on the way out.

use std::path::Path;

use crate::{
    assemble::assemble_body,
    backend::{
        ForeignBody, ForeignFieldDef, ForeignGenericParam, ForeignMethodDef, ForeignModule,
        ForeignRegion, ForeignTypeDef, ModuleBackend, RegionKind, TableKind, Token,
    },
    codec::{compute_max_stack, encode_stream, ReferenceSink},
    model::{BodyCode, MethodBody, MethodSymbolRc, RegionHandler, TypeFlavor, TypeSymbolRc},
    pipeline::{emit::Emitter, extract::ModuleModel},
    Result,
};

/// Generates a foreign module from the object model.
///
/// # Errors
///
/// Fails on three-address bodies that violate the stack-consistency invariant, on
/// exception-protected three-address bodies, and on symbols that cannot be emitted as
/// rows of the output module.
pub fn generate_module(model: &ModuleModel, backend: &dyn ModuleBackend) -> Result<ForeignModule> {
    let mut emitter = Emitter::new(backend.create_empty_module(&model.name));

    // Phase one: empty shells for every type and method, so phase two can reference
    // any declaration regardless of order.
    let declarations = model.declarations();
    let type_tokens = create_type_shells(&mut emitter, &declarations)?;
    let method_tokens = create_method_shells(&mut emitter, &type_tokens)?;

    // Phase two: bases, interfaces and fields first, then bodies.
    for (symbol, token) in &type_tokens {
        fill_type(&mut emitter, symbol, *token)?;
    }
    for (method, token) in &method_tokens {
        if let Some(body) = method.body()? {
            let foreign = lower_body(&mut emitter, &body)?;
            emitter.module_mut().attach_body(*token, foreign)?;
        }
    }

    Ok(emitter.finish())
}

/// Generates a module and hands it to the backend for serialization.
///
/// # Errors
///
/// See [`generate_module`]; additionally fails if the backend cannot write to `path`.
pub fn write_module(
    model: &ModuleModel,
    backend: &dyn ModuleBackend,
    path: &Path,
) -> Result<()> {
    let module = generate_module(model, backend)?;
    backend.write_module(&module, path)
}

fn create_type_shells(
    emitter: &mut Emitter,
    declarations: &[TypeSymbolRc],
) -> Result<Vec<(TypeSymbolRc, Token)>> {
    let mut tokens = Vec::with_capacity(declarations.len());
    for symbol in declarations {
        let nested = symbol.containing_type().is_some();
        let row = ForeignTypeDef {
            // Nested declarations carry no namespace of their own.
            namespace: if nested {
                String::new()
            } else {
                symbol.namespace.clone()
            },
            name: symbol.name.clone(),
            flags: symbol.attributes,
            base: None,
            interfaces: Vec::new(),
            enclosing: None,
            generic_params: generic_param_rows(&symbol.generic_params),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        };
        let token = emitter.module_mut().add_type_def(row);
        emitter.register_type(symbol, token);
        tokens.push((symbol.clone(), token));
    }

    // Nesting links, now that both sides of every relationship exist.
    for (symbol, token) in &tokens {
        if let Some(enclosing) = symbol.containing_type() {
            let enclosing_token = emitter.type_token(&enclosing)?;
            emitter.module_mut().set_enclosing(*token, enclosing_token)?;
        }
    }
    Ok(tokens)
}

fn create_method_shells(
    emitter: &mut Emitter,
    type_tokens: &[(TypeSymbolRc, Token)],
) -> Result<Vec<(MethodSymbolRc, Token)>> {
    let mut tokens = Vec::new();
    for (symbol, type_token) in type_tokens {
        for (_, method) in symbol.methods.iter() {
            // The signature of a generic method mentions its own parameters, so the
            // definition token is claimed before the signature is built.
            #[allow(clippy::cast_possible_truncation)]
            let predicted = Token::from_parts(
                TableKind::MethodDef,
                emitter.module().method_def_count() as u32 + 1,
            );
            emitter.register_method(method, predicted);

            let signature = emitter.method_sig(&method.signature)?;
            let row = ForeignMethodDef {
                declaring: *type_token,
                name: method.name.clone(),
                flags: method.attributes,
                signature,
                param_names: method.param_names.clone(),
                generic_params: generic_param_rows(&method.generic_params),
                body: None,
            };
            let token = emitter.module_mut().add_method_def(row)?;
            if token != predicted {
                return Err(malformed_error!(
                    "method shell for {} landed on {} instead of the claimed {}",
                    method.name,
                    token,
                    predicted
                ));
            }
            tokens.push((method.clone(), token));
        }
    }
    Ok(tokens)
}

fn fill_type(emitter: &mut Emitter, symbol: &TypeSymbolRc, token: Token) -> Result<()> {
    if let Some(base) = symbol.base() {
        let base_token = emitter.type_token(&base)?;
        emitter.module_mut().set_base(token, base_token)?;
    }
    for (_, interface) in symbol.interfaces.iter() {
        let interface_token = emitter.type_token(interface)?;
        emitter.module_mut().add_interface_impl(token, interface_token)?;
    }
    for (_, field) in symbol.fields.iter() {
        let signature = emitter.type_sig(&field.field_type)?;
        let row = ForeignFieldDef {
            declaring: token,
            name: field.name.clone(),
            flags: field.attributes,
            signature,
        };
        let field_token = emitter.module_mut().add_field_def(row)?;
        emitter.register_field(field, field_token);
    }
    Ok(())
}

/// Lowers one body to its foreign form: assemble if still in three-address form,
/// recompute the stack requirement, encode, re-attach the exception regions.
fn lower_body(emitter: &mut Emitter, body: &MethodBody) -> Result<ForeignBody> {
    let bytecode = match &body.code {
        BodyCode::ThreeAddressCode(_) => assemble_body(body)?,
        BodyCode::Bytecode(_) => body.clone(),
    };
    let instructions = bytecode
        .instructions()
        .ok_or_else(|| malformed_error!("assembled body is not in bytecode form"))?;

    // Handler entries are not reachable from offset zero in the simulation, so the
    // recorded requirement stays the floor.
    let max_stack = compute_max_stack(instructions)?.max(bytecode.max_stack);

    let locals = bytecode
        .locals
        .iter()
        .map(|local| emitter.type_sig(local))
        .collect::<Result<Vec<_>>>()?;

    let regions = bytecode
        .regions
        .iter()
        .map(|region| {
            let kind = match &region.handler {
                RegionHandler::Catch(ty) => RegionKind::Catch(emitter.type_token(ty)?),
                RegionHandler::Filter(offset) => RegionKind::Filter(*offset),
                RegionHandler::Finally => RegionKind::Finally,
                RegionHandler::Fault => RegionKind::Fault,
            };
            Ok(ForeignRegion {
                kind,
                try_offset: region.try_offset,
                try_length: region.try_length,
                handler_offset: region.handler_offset,
                handler_length: region.handler_length,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let instructions = encode_stream(instructions, emitter)?;
    Ok(ForeignBody {
        max_stack,
        init_locals: bytecode.init_locals,
        locals,
        regions,
        instructions,
    })
}

fn generic_param_rows(params: &crate::model::TypeSymbolList) -> Vec<ForeignGenericParam> {
    params
        .iter()
        .map(|(_, param)| {
            let position = match param.flavor {
                TypeFlavor::GenericParam { position, .. } => position,
                _ => 0,
            };
            ForeignGenericParam {
                name: param.name.clone(),
                position,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        ElementKind, ForeignInstruction, ForeignMethodSig, ForeignOperand, ForeignTypeSig,
        MemoryBackend, MethodAttributes, Op, TypeAttributes,
    };
    use crate::pipeline::extract::extract_module;

    fn sample_module() -> ForeignModule {
        let mut module = ForeignModule::new("probe");
        let widget = module.add_type_def(ForeignTypeDef {
            namespace: "Probe".to_string(),
            name: "Widget".to_string(),
            flags: TypeAttributes::PUBLIC,
            base: None,
            interfaces: Vec::new(),
            enclosing: None,
            generic_params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        });
        module
            .add_method_def(ForeignMethodDef {
                declaring: widget,
                name: "answer".to_string(),
                flags: MethodAttributes::PUBLIC | MethodAttributes::STATIC,
                signature: ForeignMethodSig::static_sig(
                    ForeignTypeSig::Element(ElementKind::I4),
                    Vec::new(),
                ),
                param_names: Vec::new(),
                generic_params: Vec::new(),
                body: Some(ForeignBody {
                    max_stack: 1,
                    init_locals: true,
                    locals: Vec::new(),
                    regions: Vec::new(),
                    instructions: vec![
                        ForeignInstruction::new(0, Op::LdcI4, ForeignOperand::Int32(42)),
                        ForeignInstruction::simple(5, Op::Ret),
                    ],
                }),
            })
            .unwrap();
        module
    }

    #[test]
    fn shells_precede_bodies_and_rows_round_trip() {
        let backend = MemoryBackend::new();
        let model = extract_module(&sample_module()).unwrap();
        let generated = generate_module(&model, &backend).unwrap();

        let (type_token, type_row) = generated.type_defs().next().unwrap();
        assert_eq!(type_row.name, "Widget");
        assert_eq!(type_row.namespace, "Probe");
        assert_eq!(type_row.methods.len(), 1);
        let _ = type_token;

        let method = generated.method_def(type_row.methods[0]).unwrap();
        assert_eq!(method.name, "answer");
        let body = method.body.as_ref().expect("body attached");
        assert_eq!(body.max_stack, 1);
        assert_eq!(body.instructions.len(), 2);
        assert_eq!(body.instructions[0].op, Op::LdcI4);
        assert_eq!(body.instructions[1].op, Op::Ret);
    }

    #[test]
    fn write_module_lands_in_the_backend() {
        let backend = MemoryBackend::new();
        let model = extract_module(&sample_module()).unwrap();
        write_module(&model, &backend, Path::new("generated.dll")).unwrap();
        let loaded = backend.read_module(Path::new("generated.dll")).unwrap();
        assert_eq!(loaded.name, "probe");
    }
}
