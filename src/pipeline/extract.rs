//! Module extraction: foreign type table → canonical object model.
//!
//! Extraction traverses the type table depth-first so a nested type is visited only
//! after its enclosing type - nesting links and namespace inheritance need the
//! already-extracted enclosing symbol. The walk runs in two phases over one
//! [`ResolveSession`]: declaration shells first (so later signatures can reference any
//! definition regardless of table order), then bases, interfaces, fields, methods and
//! decoded bodies.
//!
//! Classification follows base identity before the class fallback, since a value type
//! would otherwise satisfy the class check: enum, struct and delegate are recognized by
//! their platform base markers, interfaces by their attribute flag, everything else is
//! a class. The implicit module-scope pseudo-type is skipped entirely.

use crate::{
    backend::{
        ForeignModule, ForeignTypeDef, TableKind, Token, TypeAttributes, MODULE_PSEUDO_TYPE,
    },
    codec::decode_body,
    model::{PlatformTypes, TypeFlavor, TypeSymbolRc},
    resolve::ResolveSession,
    Result,
};

/// The canonical object model of one extracted module.
///
/// Owns the platform catalogue and every symbol the extraction pass interned, so weak
/// links inside the symbol graph stay resolvable for as long as the model is alive.
#[derive(Debug)]
pub struct ModuleModel {
    /// Module name
    pub name: String,
    /// Top-level type declarations, in declaration order; nested types hang off their
    /// enclosing symbol
    pub types: Vec<TypeSymbolRc>,
    platform: PlatformTypes,
    /// Keeps externally referenced and instantiated symbols alive alongside the
    /// declarations
    retained: Vec<TypeSymbolRc>,
}

impl ModuleModel {
    /// The platform type catalogue this model was extracted against.
    #[must_use]
    pub fn platform(&self) -> &PlatformTypes {
        &self.platform
    }

    /// Every declaration of the module, enclosing types before their nested types.
    #[must_use]
    pub fn declarations(&self) -> Vec<TypeSymbolRc> {
        fn walk(symbol: &TypeSymbolRc, into: &mut Vec<TypeSymbolRc>) {
            into.push(symbol.clone());
            for (_, nested) in symbol.nested_types.iter() {
                walk(nested, into);
            }
        }

        let mut declarations = Vec::new();
        for symbol in &self.types {
            walk(symbol, &mut declarations);
        }
        declarations
    }
}

/// Extracts a foreign module into the canonical object model.
///
/// # Errors
///
/// Fails on unresolvable handles, malformed rows and explicitly unimplemented
/// instruction forms inside method bodies.
pub fn extract_module(module: &ForeignModule) -> Result<ModuleModel> {
    let session = ResolveSession::new(module);

    // Phase one: declaration shells, enclosing types strictly before their nested
    // types, so signatures resolved later can reference any definition.
    let mut top_level = Vec::new();
    for (token, row) in module.type_defs() {
        if row.enclosing.is_some() || is_module_pseudo_type(row) {
            continue;
        }
        top_level.push(define_shell(&session, module, token, row, None)?);
    }

    // Phase two: bases, interfaces, fields, methods and bodies.
    for (token, row) in module.type_defs() {
        if is_module_pseudo_type(row) {
            continue;
        }
        fill_type(&session, module, token, row)?;
    }

    let (platform, retained) = session.finish();
    Ok(ModuleModel {
        name: module.name.clone(),
        types: top_level,
        platform,
        retained,
    })
}

fn is_module_pseudo_type(row: &ForeignTypeDef) -> bool {
    row.name == MODULE_PSEUDO_TYPE
}

fn define_shell(
    session: &ResolveSession<'_>,
    module: &ForeignModule,
    token: Token,
    row: &ForeignTypeDef,
    containing: Option<&TypeSymbolRc>,
) -> Result<TypeSymbolRc> {
    let flavor = classify(module, row)?;
    let symbol = session.define_type(token, flavor, row.flags, containing)?;
    for nested in &row.nested {
        let nested_row = module.type_def(*nested)?;
        define_shell(session, module, *nested, nested_row, Some(&symbol))?;
    }
    Ok(symbol)
}

/// Classifies a type definition row.
///
/// Base identity is checked before the attribute fallback - a value type would
/// otherwise satisfy the class check. The base row is inspected by name rather than
/// resolved, since classification runs before all shells are registered.
fn classify(module: &ForeignModule, row: &ForeignTypeDef) -> Result<TypeFlavor> {
    if let Some(base) = row.base {
        if let Some((namespace, name)) = base_identity(module, base)? {
            match (namespace, name) {
                ("System", "Enum") => return Ok(TypeFlavor::Enum),
                ("System", "ValueType") => return Ok(TypeFlavor::Struct),
                ("System", "MulticastDelegate") => return Ok(TypeFlavor::Delegate),
                _ => {}
            }
        }
    }
    if row.flags.contains(TypeAttributes::INTERFACE) {
        return Ok(TypeFlavor::Interface);
    }
    Ok(TypeFlavor::Class)
}

fn base_identity(module: &ForeignModule, token: Token) -> Result<Option<(&str, &str)>> {
    match token.table() {
        Some(TableKind::TypeDef) => {
            let row = module.type_def(token)?;
            Ok(Some((row.namespace.as_str(), row.name.as_str())))
        }
        Some(TableKind::TypeRef) => {
            let row = module.type_ref(token)?;
            Ok(Some((row.namespace.as_str(), row.name.as_str())))
        }
        // A structural base (generic instantiation) is never a platform marker.
        _ => Ok(None),
    }
}

fn fill_type(
    session: &ResolveSession<'_>,
    module: &ForeignModule,
    token: Token,
    row: &ForeignTypeDef,
) -> Result<()> {
    let symbol = session.resolve_type(token)?;

    if let Some(base) = row.base {
        let base = session.resolve_type(base)?;
        symbol.set_base(&base);
    }
    for interface in &row.interfaces {
        symbol.interfaces.push(session.resolve_type(*interface)?);
    }
    for field in &row.fields {
        session.resolve_field(*field)?;
    }
    for method_token in &row.methods {
        let method = session.resolve_method(*method_token)?;
        let def = module.method_def(*method_token)?;
        if let Some(body) = &def.body {
            method.set_body(decode_body(session, body)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        ElementKind, ForeignBody, ForeignFieldDef, ForeignInstruction, ForeignMethodDef,
        ForeignMethodSig, ForeignOperand, ForeignScope, ForeignTypeRef, ForeignTypeSig,
        MethodAttributes, Op,
    };
    use crate::model::BodyCode;

    fn type_row(namespace: &str, name: &str) -> ForeignTypeDef {
        ForeignTypeDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags: TypeAttributes::PUBLIC,
            base: None,
            interfaces: Vec::new(),
            enclosing: None,
            generic_params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    fn system_ref(module: &mut ForeignModule, name: &str) -> Token {
        let scope = module.add_assembly_ref("System.Runtime");
        module.add_type_ref(ForeignTypeRef {
            namespace: "System".to_string(),
            name: name.to_string(),
            scope: ForeignScope::Assembly(scope),
        })
    }

    #[test]
    fn classification_priority_and_pseudo_type_skip() {
        let mut module = ForeignModule::new("probe");
        module.add_type_def(type_row("", MODULE_PSEUDO_TYPE));

        let enum_base = system_ref(&mut module, "Enum");
        let value_base = system_ref(&mut module, "ValueType");
        let delegate_base = system_ref(&mut module, "MulticastDelegate");

        let mut color = type_row("Probe", "Color");
        color.base = Some(enum_base);
        module.add_type_def(color);

        let mut point = type_row("Probe", "Point");
        point.base = Some(value_base);
        module.add_type_def(point);

        let mut handler = type_row("Probe", "Handler");
        handler.base = Some(delegate_base);
        module.add_type_def(handler);

        let mut contract = type_row("Probe", "IContract");
        contract.flags |= TypeAttributes::INTERFACE;
        module.add_type_def(contract);

        module.add_type_def(type_row("Probe", "Widget"));

        let model = extract_module(&module).unwrap();
        let flavors: Vec<(String, TypeFlavor)> = model
            .types
            .iter()
            .map(|t| (t.name.clone(), t.flavor.clone()))
            .collect();

        assert_eq!(flavors.len(), 5);
        assert_eq!(flavors[0], ("Color".to_string(), TypeFlavor::Enum));
        assert_eq!(flavors[1], ("Point".to_string(), TypeFlavor::Struct));
        assert_eq!(flavors[2], ("Handler".to_string(), TypeFlavor::Delegate));
        assert_eq!(flavors[3], ("IContract".to_string(), TypeFlavor::Interface));
        assert_eq!(flavors[4], ("Widget".to_string(), TypeFlavor::Class));
    }

    #[test]
    fn nested_types_inherit_namespace_and_link_containment() {
        let mut module = ForeignModule::new("probe");
        let outer = module.add_type_def(type_row("Probe.Deep", "Outer"));
        let inner = module.add_type_def(type_row("", "Inner"));
        module.set_enclosing(inner, outer).unwrap();

        let model = extract_module(&module).unwrap();
        assert_eq!(model.types.len(), 1);

        let outer_symbol = &model.types[0];
        let (_, inner_symbol) = outer_symbol.nested_types.iter().next().unwrap();
        assert_eq!(inner_symbol.namespace, "Probe.Deep");
        assert!(std::sync::Arc::ptr_eq(
            &inner_symbol.containing_type().unwrap(),
            outer_symbol
        ));

        let declarations = model.declarations();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].name, "Outer");
        assert_eq!(declarations[1].name, "Inner");
    }

    #[test]
    fn members_and_bodies_are_extracted() {
        let mut module = ForeignModule::new("probe");
        let widget = module.add_type_def(type_row("Probe", "Widget"));

        module
            .add_field_def(ForeignFieldDef {
                declaring: widget,
                name: "count".to_string(),
                flags: Default::default(),
                signature: ForeignTypeSig::Element(ElementKind::I4),
            })
            .unwrap();

        let method = module
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
                        ForeignInstruction::new(0, Op::LdcI4S, ForeignOperand::Int8(42)),
                        ForeignInstruction::simple(2, Op::Ret),
                    ],
                }),
            })
            .unwrap();
        let _ = method;

        let model = extract_module(&module).unwrap();
        let widget_symbol = &model.types[0];
        assert_eq!(widget_symbol.fields.count(), 1);
        assert_eq!(widget_symbol.methods.count(), 1);

        let (_, answer) = widget_symbol.methods.iter().next().unwrap();
        let body = answer.body().unwrap().expect("body extracted");
        match &body.code {
            BodyCode::Bytecode(instructions) => {
                assert_eq!(instructions.len(), 2);
                assert_eq!(instructions[0].offset, 0);
                assert_eq!(instructions[1].offset, 2);
            }
            BodyCode::ThreeAddressCode(_) => panic!("extraction produces bytecode form"),
        }
    }
}
