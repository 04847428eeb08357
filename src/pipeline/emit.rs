//! The generation-side reference emitter: canonical symbols in, foreign tokens out.
//!
//! The [`Emitter`] is the mirror of the [`crate::resolve::ResolveSession`]: where the
//! resolver interns foreign handles into symbols, the emitter memoizes symbols back into
//! rows of the module being generated. Declarations of the generated module are
//! registered up front by the shell phase; everything else - type references, type
//! specs, member references, method specs - materializes on demand the first time a
//! symbol is encountered and is reused afterwards.
//!
//! Generic parameter references need an owner token in the output module. Parameters of
//! registered declarations map to their owner's definition token; parameters appearing
//! only inside an external member's signature are primed against the definition's
//! reference token before the signature is built.
//!
//! Like the resolver's caches, an emitter is scoped to a single generation pass and
//! discarded with it.

use std::collections::HashMap;

use crate::{
    backend::{
        ElementKind, ForeignMemberRef, ForeignMemberSig, ForeignMethodSig, ForeignMethodSpec,
        ForeignModule, ForeignScope, ForeignTypeRef, ForeignTypeSig, TableKind, Token,
    },
    codec::{ArrayAccessor, ReferenceSink},
    model::{
        ArrayShape, FieldSymbolRc, MethodSignature, MethodSymbolRc, TypeFlavor, TypeSymbolRc,
    },
    Result,
};

use crate::model::symbol::{MemberKey, TypeKey};

/// Assembly name platform types resolve against when they must be referenced by row.
const CORE_ASSEMBLY: &str = "System.Runtime";

/// Pass-scoped symbol → token emitter over the module being generated.
pub struct Emitter {
    module: ForeignModule,
    types: HashMap<TypeKey, Token>,
    methods: HashMap<MemberKey, Token>,
    fields: HashMap<MemberKey, Token>,
    /// Output owner token for every generic parameter symbol seen this pass
    generic_owners: HashMap<TypeKey, Token>,
}

impl Emitter {
    /// Opens an emitter over an (typically empty) output module.
    #[must_use]
    pub fn new(module: ForeignModule) -> Self {
        Emitter {
            module,
            types: HashMap::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
            generic_owners: HashMap::new(),
        }
    }

    /// The module being generated.
    #[must_use]
    pub fn module(&self) -> &ForeignModule {
        &self.module
    }

    /// Mutable access for the generation phases that append rows directly.
    pub fn module_mut(&mut self) -> &mut ForeignModule {
        &mut self.module
    }

    /// Hands the finished module back; the memo maps die with the emitter.
    #[must_use]
    pub fn finish(self) -> ForeignModule {
        self.module
    }

    /// Registers a declaration of the generated module under its definition token.
    ///
    /// Also claims the declaration's generic parameters for that token, so signatures
    /// mentioning them emit correctly owned references.
    pub fn register_type(&mut self, symbol: &TypeSymbolRc, token: Token) {
        self.types.insert(symbol.key.clone(), token);
        for (_, param) in symbol.generic_params.iter() {
            self.generic_owners.insert(param.key.clone(), token);
        }
    }

    /// Registers a method definition of the generated module under its token.
    pub fn register_method(&mut self, symbol: &MethodSymbolRc, token: Token) {
        self.methods.insert(symbol.key.clone(), token);
        for (_, param) in symbol.generic_params.iter() {
            self.generic_owners.insert(param.key.clone(), token);
        }
    }

    /// Registers a field definition of the generated module under its token.
    pub fn register_field(&mut self, symbol: &FieldSymbolRc, token: Token) {
        self.fields.insert(symbol.key.clone(), token);
    }

    /// Builds the structural signature for a type symbol.
    ///
    /// Platform primitives emit as bare elements; declarations emit by token;
    /// composites recurse structurally, mirroring the resolver's signature walk in
    /// reverse.
    ///
    /// # Errors
    ///
    /// Fails on unregistered declarations of the current module and on generic
    /// parameters with no claimed owner.
    pub fn type_sig(&mut self, ty: &TypeSymbolRc) -> Result<ForeignTypeSig> {
        if let Some(definition) = &ty.generic_type {
            let args = ty
                .generic_args
                .iter()
                .map(|arg| self.type_sig(arg))
                .collect::<Result<Vec<_>>>()?;
            return Ok(ForeignTypeSig::GenericInst {
                definition: self.type_token(definition)?,
                value_type: definition.is_value_type(),
                args,
            });
        }

        match &ty.flavor {
            TypeFlavor::Platform(kind) => match kind.to_element() {
                Some(element) => Ok(ForeignTypeSig::Element(element)),
                None => Ok(ForeignTypeSig::Named {
                    token: self.type_token(ty)?,
                    value_type: false,
                }),
            },
            TypeFlavor::Vector => {
                let element = self.element_of(ty)?;
                Ok(ForeignTypeSig::Vector(Box::new(self.type_sig(&element)?)))
            }
            TypeFlavor::Array(shape) => {
                let element = self.element_of(ty)?;
                Ok(ForeignTypeSig::Array {
                    element: Box::new(self.type_sig(&element)?),
                    rank: shape.rank,
                    lower_bounds: shape.lower_bounds.clone(),
                    sizes: shape.sizes.clone(),
                })
            }
            TypeFlavor::Pointer => {
                let pointee = self.element_of(ty)?;
                Ok(ForeignTypeSig::Pointer(Box::new(self.type_sig(&pointee)?)))
            }
            TypeFlavor::ByRef => {
                let referent = self.element_of(ty)?;
                Ok(ForeignTypeSig::ByRef(Box::new(self.type_sig(&referent)?)))
            }
            TypeFlavor::FnPtr => {
                let signature = ty.fn_sig.clone().ok_or_else(|| {
                    malformed_error!("function-pointer symbol without a signature")
                })?;
                Ok(ForeignTypeSig::FnPtr(Box::new(
                    self.method_sig(&signature)?,
                )))
            }
            TypeFlavor::GenericParam { position, method } => {
                let owner = self.generic_owners.get(&ty.key).copied().ok_or_else(|| {
                    resolution_error!(
                        "generic parameter {} has no claimed owner in the output module",
                        ty.name
                    )
                })?;
                Ok(ForeignTypeSig::GenericParam {
                    owner,
                    position: *position,
                    method: *method,
                })
            }
            _ => Ok(ForeignTypeSig::Named {
                token: self.type_token(ty)?,
                value_type: ty.is_value_type(),
            }),
        }
    }

    /// Builds the foreign form of a resolved method signature.
    ///
    /// # Errors
    ///
    /// See [`Emitter::type_sig`].
    pub fn method_sig(&mut self, signature: &MethodSignature) -> Result<ForeignMethodSig> {
        Ok(ForeignMethodSig {
            has_this: signature.has_this,
            return_type: self.type_sig(&signature.return_type)?,
            params: signature
                .params
                .iter()
                .map(|param| self.type_sig(param))
                .collect::<Result<Vec<_>>>()?,
            generic_arity: signature.generic_arity,
        })
    }

    fn element_of(&self, ty: &TypeSymbolRc) -> Result<TypeSymbolRc> {
        ty.element
            .clone()
            .ok_or_else(|| malformed_error!("composite symbol {} without an element type", ty.name))
    }

    /// Claims unowned generic parameters of a signature for the given owner tokens.
    ///
    /// Walks the signature structurally; parameters already claimed (declarations of
    /// the generated module) keep their owner.
    fn prime_signature_params(
        &mut self,
        signature: &MethodSignature,
        type_owner: Option<Token>,
        method_owner: Option<Token>,
    ) {
        self.prime_type_params(&signature.return_type, type_owner, method_owner);
        for param in &signature.params {
            self.prime_type_params(param, type_owner, method_owner);
        }
    }

    fn prime_type_params(
        &mut self,
        ty: &TypeSymbolRc,
        type_owner: Option<Token>,
        method_owner: Option<Token>,
    ) {
        if let TypeFlavor::GenericParam { method, .. } = &ty.flavor {
            let owner = if *method { method_owner } else { type_owner };
            if let Some(owner) = owner {
                self.generic_owners.entry(ty.key.clone()).or_insert(owner);
            }
            return;
        }
        if let Some(element) = &ty.element {
            self.prime_type_params(element, type_owner, method_owner);
        }
        for arg in &ty.generic_args {
            self.prime_type_params(arg, type_owner, method_owner);
        }
        if let Some(signature) = &ty.fn_sig {
            self.prime_type_params(&signature.return_type, type_owner, method_owner);
            for param in &signature.params {
                self.prime_type_params(param, type_owner, method_owner);
            }
        }
    }

    /// The unbound definition of a declaring type, for member-reference parents.
    fn definition_of(declaring: &TypeSymbolRc) -> TypeSymbolRc {
        declaring
            .generic_type
            .clone()
            .unwrap_or_else(|| declaring.clone())
    }
}

impl ReferenceSink for Emitter {
    fn type_token(&mut self, ty: &TypeSymbolRc) -> Result<Token> {
        if let Some(token) = self.types.get(&ty.key) {
            return Ok(*token);
        }

        let token = if ty.generic_type.is_some() {
            let signature = self.type_sig(ty)?;
            self.module.add_type_spec(signature)
        } else {
            match &ty.flavor {
                TypeFlavor::Platform(_) => {
                    let scope = self.module.add_assembly_ref(CORE_ASSEMBLY);
                    self.module.add_type_ref(ForeignTypeRef {
                        namespace: ty.namespace.clone(),
                        name: ty.name.clone(),
                        scope: ForeignScope::Assembly(scope),
                    })
                }
                TypeFlavor::Vector
                | TypeFlavor::Array(_)
                | TypeFlavor::Pointer
                | TypeFlavor::ByRef
                | TypeFlavor::FnPtr
                | TypeFlavor::GenericParam { .. } => {
                    let signature = self.type_sig(ty)?;
                    self.module.add_type_spec(signature)
                }
                _ => match &ty.scope {
                    crate::model::SymbolScope::CurrentModule => {
                        return Err(resolution_error!(
                            "declaration {} was not registered in the output module",
                            ty.fullname()
                        ))
                    }
                    crate::model::SymbolScope::External(assembly) => {
                        let scope = match ty.containing_type() {
                            Some(enclosing) => {
                                ForeignScope::Nested(self.type_token(&enclosing)?)
                            }
                            None => {
                                ForeignScope::Assembly(self.module.add_assembly_ref(assembly))
                            }
                        };
                        self.module.add_type_ref(ForeignTypeRef {
                            // Nested references carry no namespace of their own.
                            namespace: match ty.containing_type() {
                                Some(_) => String::new(),
                                None => ty.namespace.clone(),
                            },
                            name: ty.name.clone(),
                            scope,
                        })
                    }
                    crate::model::SymbolScope::Synthetic => {
                        return Err(resolution_error!(
                            "synthetic symbol {} cannot be referenced by token",
                            ty.fullname()
                        ))
                    }
                },
            }
        };

        self.types.insert(ty.key.clone(), token);
        Ok(token)
    }

    fn method_token(&mut self, method: &MethodSymbolRc) -> Result<Token> {
        if let Some(token) = self.methods.get(&method.key) {
            return Ok(*token);
        }

        // Generic instantiations reference their unbound definition through a spec row.
        if let Some(definition) = &method.generic_method {
            let definition_token = self.method_token(definition)?;
            let args = method
                .generic_args
                .iter()
                .map(|arg| self.type_sig(arg))
                .collect::<Result<Vec<_>>>()?;
            let token = self.module.add_method_spec(ForeignMethodSpec {
                method: definition_token,
                args,
            });
            self.methods.insert(method.key.clone(), token);
            return Ok(token);
        }

        let declaring = method.declaring_type().ok_or_else(|| {
            lookup_miss!("method {} lost its declaring type mid-pass", method.name)
        })?;
        let parent = self.type_token(&declaring)?;

        // Claim signature parameters before building it: type parameters belong to the
        // declaring definition, method parameters to the row about to be created.
        let definition = Self::definition_of(&declaring);
        let type_owner = self.type_token(&definition).ok();
        let method_owner = if method.signature.generic_arity > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let predicted = Token::from_parts(
                TableKind::MemberRef,
                self.module.member_ref_count() as u32 + 1,
            );
            Some(predicted)
        } else {
            None
        };
        self.prime_signature_params(&method.signature, type_owner, method_owner);

        let signature = self.method_sig(&method.signature)?;
        let token = self.module.add_member_ref(ForeignMemberRef {
            parent,
            name: method.name.clone(),
            signature: ForeignMemberSig::Method(signature),
        });
        self.methods.insert(method.key.clone(), token);
        Ok(token)
    }

    fn field_token(&mut self, field: &FieldSymbolRc) -> Result<Token> {
        if let Some(token) = self.fields.get(&field.key) {
            return Ok(*token);
        }

        let declaring = field.declaring_type().ok_or_else(|| {
            lookup_miss!("field {} lost its declaring type mid-pass", field.name)
        })?;
        let parent = self.type_token(&declaring)?;
        let signature = self.type_sig(&field.field_type)?;
        let token = self.module.add_member_ref(ForeignMemberRef {
            parent,
            name: field.name.clone(),
            signature: ForeignMemberSig::Field(signature),
        });
        self.fields.insert(field.key.clone(), token);
        Ok(token)
    }

    fn signature_token(&mut self, signature: &MethodSignature) -> Result<Token> {
        // Indirect call sites carry their signature as a function-pointer spec, which
        // is exactly how the resolver reads them back.
        let signature = self.method_sig(signature)?;
        Ok(self
            .module
            .add_type_spec(ForeignTypeSig::FnPtr(Box::new(signature))))
    }

    fn array_accessor_token(
        &mut self,
        element: &TypeSymbolRc,
        shape: &ArrayShape,
        accessor: ArrayAccessor,
    ) -> Result<Token> {
        let element_sig = self.type_sig(element)?;
        let parent = self.module.add_type_spec(ForeignTypeSig::Array {
            element: Box::new(element_sig.clone()),
            rank: shape.rank,
            lower_bounds: shape.lower_bounds.clone(),
            sizes: shape.sizes.clone(),
        });

        let indices = vec![ForeignTypeSig::Element(ElementKind::I4); usize::from(shape.rank)];
        let (name, signature) = match accessor {
            ArrayAccessor::Get => ("Get", ForeignMethodSig::instance_sig(element_sig, indices)),
            ArrayAccessor::Address => (
                "Address",
                ForeignMethodSig::instance_sig(
                    ForeignTypeSig::ByRef(Box::new(element_sig)),
                    indices,
                ),
            ),
            ArrayAccessor::Set => {
                let mut params = indices;
                params.push(element_sig);
                (
                    "Set",
                    ForeignMethodSig::instance_sig(
                        ForeignTypeSig::Element(ElementKind::Void),
                        params,
                    ),
                )
            }
            ArrayAccessor::Constructor => (
                ".ctor",
                ForeignMethodSig::instance_sig(
                    ForeignTypeSig::Element(ElementKind::Void),
                    indices,
                ),
            ),
        };

        Ok(self.module.add_member_ref(ForeignMemberRef {
            parent,
            name: name.to_string(),
            signature: ForeignMemberSig::Method(signature),
        }))
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("module", &self.module.name)
            .field("types", &self.types.len())
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlatformKind, PlatformTypes, SymbolScope, TypeSymbol};
    use std::sync::Arc;

    fn emitter() -> Emitter {
        Emitter::new(ForeignModule::new("generated"))
    }

    #[test]
    fn platform_symbols_emit_core_assembly_references() {
        let platform = PlatformTypes::new();
        let mut emitter = emitter();

        let int32 = platform.get(PlatformKind::I4);
        let first = emitter.type_token(&int32).unwrap();
        let second = emitter.type_token(&int32).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.table(), Some(TableKind::TypeRef));

        let row = emitter.module().type_ref(first).unwrap();
        assert_eq!(row.namespace, "System");
        assert_eq!(row.name, "Int32");

        // In signature position the primitive needs no token at all.
        assert_eq!(
            emitter.type_sig(&int32).unwrap(),
            ForeignTypeSig::Element(ElementKind::I4)
        );
    }

    #[test]
    fn external_declarations_emit_type_refs_by_scope() {
        let mut emitter = emitter();
        let external = Arc::new(TypeSymbol::declaration(
            "External".to_string(),
            "Widget".to_string(),
            SymbolScope::External("External.Lib".to_string()),
            TypeFlavor::Class,
            None,
        ));

        let token = emitter.type_token(&external).unwrap();
        let row = emitter.module().type_ref(token).unwrap();
        assert_eq!(row.name, "Widget");
        assert!(matches!(row.scope, ForeignScope::Assembly(_)));
    }

    #[test]
    fn composites_emit_type_specs() {
        let platform = PlatformTypes::new();
        let mut emitter = emitter();

        let vector = Arc::new(TypeSymbol::vector(platform.get(PlatformKind::I4)));
        let token = emitter.type_token(&vector).unwrap();
        assert_eq!(token.table(), Some(TableKind::TypeSpec));
        assert_eq!(
            emitter.module().type_spec(token).unwrap(),
            &ForeignTypeSig::Vector(Box::new(ForeignTypeSig::Element(ElementKind::I4)))
        );
    }

    #[test]
    fn unregistered_current_module_declarations_are_fatal() {
        let mut emitter = emitter();
        let local = Arc::new(TypeSymbol::declaration(
            "Probe".to_string(),
            "Orphan".to_string(),
            SymbolScope::CurrentModule,
            TypeFlavor::Class,
            None,
        ));
        assert!(emitter.type_token(&local).is_err());
    }

    #[test]
    fn array_accessors_reference_the_shaped_spec() {
        let platform = PlatformTypes::new();
        let mut emitter = emitter();

        let int32 = platform.get(PlatformKind::I4);
        let shape = ArrayShape::with_rank(2);
        let token = emitter
            .array_accessor_token(&int32, &shape, ArrayAccessor::Get)
            .unwrap();

        let row = emitter.module().member_ref(token).unwrap();
        assert_eq!(row.name, "Get");
        assert_eq!(row.parent.table(), Some(TableKind::TypeSpec));
        match &row.signature {
            ForeignMemberSig::Method(signature) => {
                assert!(signature.has_this);
                assert_eq!(signature.params.len(), 2);
            }
            ForeignMemberSig::Field(_) => panic!("accessor must carry a method signature"),
        }
    }
}
