//! The pass-scoped reference resolver and interner.
//!
//! A [`ResolveSession`] is constructed at the start of one extraction pass over one
//! foreign module and discarded when the pass ends. Its caches are only valid relative
//! to that one module graph and are never reused across modules.
//!
//! # Interning
//!
//! Declarations and generic instantiations are interned by structural key: resolving
//! structurally-equal foreign handles twice returns the *same* `Arc`, so consumers
//! compare symbols by identity. Arrays, pointers, by-references and function pointers
//! are built structurally on every request and never identity-interned.
//!
//! # Generic owner fixed point
//!
//! Generic parameter references are mutually recursive with their owners: the parameter
//! needs the owner resolved, and the owner's signature mentions the parameter. The
//! session holds an `owner_params` memo table keyed by (owner token, kind). Requesting
//! parameter P of owner O reads the table; on a miss it resolves O itself - which
//! populates the table *before* touching any signature - and re-reads. Memoization
//! terminates the recursion; a position still missing after the owner resolved is a
//! fatal lookup miss.

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    backend::{
        ForeignMemberSig, ForeignMethodSig, ForeignModule, ForeignScope, ForeignTypeSig,
        TableKind, Token, TypeAttributes,
    },
    model::{
        ArrayShape, FieldSymbol, FieldSymbolRc, MethodSignature, MethodSymbol, MethodSymbolRc,
        PlatformTypes, SymbolScope, TypeFlavor, TypeSymbol, TypeSymbolRc,
    },
    Result,
};

use crate::model::symbol::{MemberKey, TypeKey};

/// Pass-scoped resolver mapping foreign handles onto canonical, de-duplicated symbols.
///
/// Never a process-wide singleton: one session serves exactly one pass over one module.
pub struct ResolveSession<'m> {
    module: &'m ForeignModule,
    platform: PlatformTypes,
    /// Current-module type definitions, token-ordered
    defined: SkipMap<Token, TypeSymbolRc>,
    /// Interned type symbols by structural key
    types: DashMap<TypeKey, TypeSymbolRc>,
    /// Interned member symbols by structural key
    methods: DashMap<MemberKey, MethodSymbolRc>,
    fields: DashMap<MemberKey, FieldSymbolRc>,
    /// Method definitions by token, for identity across def/ref resolution
    method_defs: DashMap<Token, MethodSymbolRc>,
    field_defs: DashMap<Token, FieldSymbolRc>,
    /// Generic parameter lists by (owner token, owner-is-method)
    owner_params: DashMap<(u32, bool), Vec<TypeSymbolRc>>,
}

impl<'m> ResolveSession<'m> {
    /// Opens a session over one foreign module.
    #[must_use]
    pub fn new(module: &'m ForeignModule) -> Self {
        ResolveSession {
            module,
            platform: PlatformTypes::new(),
            defined: SkipMap::new(),
            types: DashMap::new(),
            methods: DashMap::new(),
            fields: DashMap::new(),
            method_defs: DashMap::new(),
            field_defs: DashMap::new(),
            owner_params: DashMap::new(),
        }
    }

    /// The platform type catalogue owned by this pass.
    #[must_use]
    pub fn platform(&self) -> &PlatformTypes {
        &self.platform
    }

    /// The foreign module this session resolves against.
    #[must_use]
    pub fn module(&self) -> &'m ForeignModule {
        self.module
    }

    /// Registers the declaration symbol for a type definition of the current module.
    ///
    /// Called by the extraction walk, enclosing types strictly before their nested
    /// types. Populates the owner memo with the definition's generic parameters before
    /// any signature mentioning them can be requested.
    pub fn define_type(
        &self,
        token: Token,
        flavor: TypeFlavor,
        attributes: TypeAttributes,
        containing: Option<&TypeSymbolRc>,
    ) -> Result<TypeSymbolRc> {
        if let Some(entry) = self.defined.get(&token) {
            return Ok(entry.value().clone());
        }

        let row = self.module.type_def(token)?;
        // Nested types inherit the namespace of the innermost non-nested ancestor.
        let namespace = match containing {
            Some(enclosing) => enclosing.namespace.clone(),
            None => row.namespace.clone(),
        };
        let mut symbol = TypeSymbol::declaration(
            namespace,
            row.name.clone(),
            SymbolScope::CurrentModule,
            flavor,
            containing,
        );
        symbol.attributes = attributes;
        let symbol = Arc::new(symbol);

        let params: Vec<TypeSymbolRc> = row
            .generic_params
            .iter()
            .map(|param| {
                Arc::new(TypeSymbol::generic_param(
                    param.name.clone(),
                    token.value(),
                    param.position,
                    false,
                ))
            })
            .collect();
        for param in &params {
            symbol.generic_params.push(param.clone());
        }
        self.owner_params.insert((token.value(), false), params);

        self.types.insert(symbol.key.clone(), symbol.clone());
        self.defined.insert(token, symbol.clone());
        if let Some(enclosing) = containing {
            enclosing.nested_types.push(symbol.clone());
        }
        Ok(symbol)
    }

    /// Resolves a type handle to its canonical symbol.
    pub fn resolve_type(&self, token: Token) -> Result<TypeSymbolRc> {
        match token.table() {
            Some(TableKind::TypeDef) => self
                .defined
                .get(&token)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| {
                    malformed_error!("type definition {} requested before registration", token)
                }),
            Some(TableKind::TypeRef) => self.resolve_type_ref(token),
            Some(TableKind::TypeSpec) => {
                let signature = self.module.type_spec(token)?;
                self.resolve_type_sig(signature)
            }
            _ => Err(resolution_error!(
                "token {} does not address a type table",
                token
            )),
        }
    }

    fn resolve_type_ref(&self, token: Token) -> Result<TypeSymbolRc> {
        let row = self.module.type_ref(token)?;
        let (scope, containing, namespace) = match &row.scope {
            ForeignScope::CurrentModule => {
                (SymbolScope::CurrentModule, None, row.namespace.clone())
            }
            ForeignScope::Assembly(assembly_row) => {
                let name = self.module.assembly_ref(*assembly_row).map_err(|_| {
                    resolution_error!(
                        "type reference {} names assembly row {} which maps to no known scope",
                        token,
                        assembly_row
                    )
                })?;
                (
                    SymbolScope::External(name.to_string()),
                    None,
                    row.namespace.clone(),
                )
            }
            ForeignScope::Nested(enclosing_token) => {
                let enclosing = self.resolve_type(*enclosing_token)?;
                let namespace = enclosing.namespace.clone();
                (enclosing.scope.clone(), Some(enclosing), namespace)
            }
        };

        let symbol = TypeSymbol::declaration(
            namespace,
            row.name.clone(),
            scope,
            TypeFlavor::Class,
            containing.as_ref(),
        );
        Ok(self.intern_type(symbol))
    }

    /// Resolves a structural type signature to a symbol.
    ///
    /// Declarations and generic instantiations come back interned; composites are built
    /// structurally on every call.
    pub fn resolve_type_sig(&self, signature: &ForeignTypeSig) -> Result<TypeSymbolRc> {
        match signature {
            ForeignTypeSig::Element(element) => Ok(self.platform.element(*element)),
            ForeignTypeSig::Named { token, .. } => self.resolve_type(*token),
            ForeignTypeSig::GenericInst {
                definition, args, ..
            } => {
                let definition = self.resolve_type(*definition)?;
                let args = args
                    .iter()
                    .map(|arg| self.resolve_type_sig(arg))
                    .collect::<Result<Vec<_>>>()?;
                let candidate = TypeSymbol::instantiation(&definition, args);
                Ok(self.intern_type(candidate))
            }
            ForeignTypeSig::Vector(element) => {
                let element = self.resolve_type_sig(element)?;
                Ok(Arc::new(TypeSymbol::vector(element)))
            }
            ForeignTypeSig::Array {
                element,
                rank,
                lower_bounds,
                sizes,
            } => {
                let element = self.resolve_type_sig(element)?;
                let shape = ArrayShape {
                    rank: *rank,
                    lower_bounds: lower_bounds.clone(),
                    sizes: sizes.clone(),
                };
                Ok(Arc::new(TypeSymbol::array(element, shape)))
            }
            ForeignTypeSig::Pointer(pointee) => {
                let pointee = self.resolve_type_sig(pointee)?;
                Ok(Arc::new(TypeSymbol::pointer(pointee)))
            }
            ForeignTypeSig::ByRef(referent) => {
                let referent = self.resolve_type_sig(referent)?;
                Ok(Arc::new(TypeSymbol::by_ref(referent)))
            }
            ForeignTypeSig::FnPtr(signature) => {
                let signature = self.resolve_method_sig(signature)?;
                Ok(Arc::new(TypeSymbol::fn_pointer(signature)))
            }
            ForeignTypeSig::GenericParam {
                owner,
                position,
                method,
            } => self.resolve_generic_param(*owner, *position, *method),
        }
    }

    /// Resolves a method signature over foreign types.
    pub fn resolve_method_sig(&self, signature: &ForeignMethodSig) -> Result<MethodSignature> {
        Ok(MethodSignature {
            has_this: signature.has_this,
            return_type: self.resolve_type_sig(&signature.return_type)?,
            params: signature
                .params
                .iter()
                .map(|param| self.resolve_type_sig(param))
                .collect::<Result<Vec<_>>>()?,
            generic_arity: signature.generic_arity,
        })
    }

    /// Resolves a generic parameter by (owner, position, kind).
    ///
    /// The memoized fixed point: a hit returns immediately; a miss resolves the owner -
    /// whose resolution populates the memo as a side effect - and re-reads. Tolerates
    /// being requested before the owner has otherwise been touched.
    pub fn resolve_generic_param(
        &self,
        owner: Token,
        position: u16,
        method: bool,
    ) -> Result<TypeSymbolRc> {
        let memo_key = (owner.value(), method);
        let external_owner = matches!(
            owner.table(),
            Some(TableKind::TypeRef) | Some(TableKind::MemberRef)
        );

        if !self.owner_params.contains_key(&memo_key) {
            match owner.table() {
                // Definitions enumerate their parameters; resolving the owner fills
                // the memo as a side effect.
                Some(TableKind::TypeDef) => {
                    self.resolve_type(owner)?;
                }
                Some(TableKind::MethodDef) => {
                    self.resolve_method(owner)?;
                }
                // External owners do not enumerate parameters anywhere; they
                // materialize below, on demand.
                Some(TableKind::TypeRef) | Some(TableKind::MemberRef) => {
                    self.owner_params.insert(memo_key, Vec::new());
                }
                _ => {
                    return Err(resolution_error!(
                        "token {} cannot own generic parameters",
                        owner
                    ))
                }
            }
        }

        {
            let params = self.owner_params.get(&memo_key).ok_or_else(|| {
                lookup_miss!(
                    "owner {} resolved without populating its parameter list",
                    owner
                )
            })?;
            if let Some(param) = params.get(position as usize) {
                return Ok(param.clone());
            }
        }

        if external_owner {
            let mut entry = self.owner_params.get_mut(&memo_key).ok_or_else(|| {
                lookup_miss!("owner {} lost its parameter list mid-pass", owner)
            })?;
            while entry.len() <= position as usize {
                #[allow(clippy::cast_possible_truncation)]
                let index = entry.len() as u16;
                let prefix = if method { "!!" } else { "!" };
                entry.push(Arc::new(TypeSymbol::generic_param(
                    format!("{prefix}{index}"),
                    owner.value(),
                    index,
                    method,
                )));
            }
            return Ok(entry[position as usize].clone());
        }

        Err(lookup_miss!(
            "generic parameter position {} of owner {} is not populated",
            position,
            owner
        ))
    }

    /// Resolves a method handle to its canonical symbol.
    pub fn resolve_method(&self, token: Token) -> Result<MethodSymbolRc> {
        match token.table() {
            Some(TableKind::MethodDef) => self.resolve_method_def(token),
            Some(TableKind::MemberRef) => {
                let row = self.module.member_ref(token)?;
                let signature = match &row.signature {
                    ForeignMemberSig::Method(signature) => signature,
                    ForeignMemberSig::Field(_) => {
                        return Err(malformed_error!(
                            "member reference {} carries a field signature where a method was expected",
                            token
                        ))
                    }
                };
                let declaring = self.resolve_type(row.parent)?;

                // Member-generic parameters in the signature are owned by this reference.
                if signature.generic_arity > 0 {
                    self.materialize_ref_params(token, signature.generic_arity);
                }

                let resolved = self.resolve_method_sig(signature)?;
                let candidate = MethodSymbol::new(
                    &declaring,
                    row.name.clone(),
                    Default::default(),
                    resolved,
                );
                Ok(self.intern_method(candidate))
            }
            Some(TableKind::MethodSpec) => {
                let row = self.module.method_spec(token)?;
                let definition = self.resolve_method(row.method)?;
                let args = row
                    .args
                    .iter()
                    .map(|arg| self.resolve_type_sig(arg))
                    .collect::<Result<Vec<_>>>()?;
                let candidate = MethodSymbol::instantiation(&definition, args);
                Ok(self.intern_method(candidate))
            }
            _ => Err(resolution_error!(
                "token {} does not address a method table",
                token
            )),
        }
    }

    fn materialize_ref_params(&self, owner: Token, arity: u16) {
        self.owner_params
            .entry((owner.value(), true))
            .or_insert_with(|| {
                (0..arity)
                    .map(|index| {
                        Arc::new(TypeSymbol::generic_param(
                            format!("!!{index}"),
                            owner.value(),
                            index,
                            true,
                        ))
                    })
                    .collect()
            });
    }

    fn resolve_method_def(&self, token: Token) -> Result<MethodSymbolRc> {
        if let Some(existing) = self.method_defs.get(&token) {
            return Ok(existing.clone());
        }

        let row = self.module.method_def(token)?;
        let declaring = self.resolve_type(row.declaring)?;

        // Populate the owner memo before touching the signature, which may reference
        // the method's own parameters.
        if !self.owner_params.contains_key(&(token.value(), true)) {
            let params: Vec<TypeSymbolRc> = row
                .generic_params
                .iter()
                .map(|param| {
                    Arc::new(TypeSymbol::generic_param(
                        param.name.clone(),
                        token.value(),
                        param.position,
                        true,
                    ))
                })
                .collect();
            self.owner_params.insert((token.value(), true), params);
        }

        let signature = self.resolve_method_sig(&row.signature)?;
        let mut candidate = MethodSymbol::new(
            &declaring,
            row.name.clone(),
            row.flags,
            signature,
        );
        candidate.param_names = row.param_names.clone();

        if let Some(existing) = self.methods.get(&candidate.key) {
            let symbol = existing.clone();
            self.method_defs.insert(token, symbol.clone());
            return Ok(symbol);
        }

        let symbol = self.intern_method(candidate);
        if let Some(params) = self.owner_params.get(&(token.value(), true)) {
            for param in params.iter() {
                symbol.generic_params.push(param.clone());
            }
        }
        self.method_defs.insert(token, symbol.clone());
        declaring.methods.push(symbol.clone());
        Ok(symbol)
    }

    /// Resolves a field handle to its canonical symbol.
    pub fn resolve_field(&self, token: Token) -> Result<FieldSymbolRc> {
        match token.table() {
            Some(TableKind::FieldDef) => {
                if let Some(existing) = self.field_defs.get(&token) {
                    return Ok(existing.clone());
                }
                let row = self.module.field_def(token)?;
                let declaring = self.resolve_type(row.declaring)?;
                let field_type = self.resolve_type_sig(&row.signature)?;
                let candidate =
                    FieldSymbol::new(&declaring, row.name.clone(), row.flags, field_type);
                if let Some(existing) = self.fields.get(&candidate.key) {
                    let symbol = existing.clone();
                    self.field_defs.insert(token, symbol.clone());
                    return Ok(symbol);
                }
                let symbol = self.intern_field(candidate);
                self.field_defs.insert(token, symbol.clone());
                declaring.fields.push(symbol.clone());
                Ok(symbol)
            }
            Some(TableKind::MemberRef) => {
                let row = self.module.member_ref(token)?;
                let signature = match &row.signature {
                    ForeignMemberSig::Field(signature) => signature,
                    ForeignMemberSig::Method(_) => {
                        return Err(malformed_error!(
                            "member reference {} carries a method signature where a field was expected",
                            token
                        ))
                    }
                };
                let declaring = self.resolve_type(row.parent)?;
                let field_type = self.resolve_type_sig(signature)?;
                let candidate = FieldSymbol::new(
                    &declaring,
                    row.name.clone(),
                    Default::default(),
                    field_type,
                );
                Ok(self.intern_field(candidate))
            }
            _ => Err(resolution_error!(
                "token {} does not address a field table",
                token
            )),
        }
    }

    fn intern_type(&self, candidate: TypeSymbol) -> TypeSymbolRc {
        if let Some(existing) = self.types.get(&candidate.key) {
            return existing.clone();
        }
        let symbol = Arc::new(candidate);
        self.types.insert(symbol.key.clone(), symbol.clone());
        symbol
    }

    fn intern_method(&self, candidate: MethodSymbol) -> MethodSymbolRc {
        if let Some(existing) = self.methods.get(&candidate.key) {
            return existing.clone();
        }
        let symbol = Arc::new(candidate);
        self.methods.insert(symbol.key.clone(), symbol.clone());
        symbol
    }

    fn intern_field(&self, candidate: FieldSymbol) -> FieldSymbolRc {
        if let Some(existing) = self.fields.get(&candidate.key) {
            return existing.clone();
        }
        let symbol = Arc::new(candidate);
        self.fields.insert(symbol.key.clone(), symbol.clone());
        symbol
    }

    /// Hands the pass results to the owning model: the platform catalogue and every
    /// symbol the pass interned. The caches die with the session.
    #[must_use]
    pub fn finish(self) -> (PlatformTypes, Vec<TypeSymbolRc>) {
        let retained = self
            .types
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        (self.platform, retained)
    }
}

impl std::fmt::Debug for ResolveSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveSession")
            .field("module", &self.module.name)
            .field("defined", &self.defined.len())
            .field("interned_types", &self.types.len())
            .finish()
    }
}
