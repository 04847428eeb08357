//! Canonical symbols for types, methods, fields and generic parameters.
//!
//! Symbols are the identity-bearing nodes of the object model. Within one resolution
//! pass, structurally-equal foreign handles resolve to the *same* `Arc`; consumers
//! compare symbols with [`std::sync::Arc::ptr_eq`] rather than structurally. Structural
//! identity is captured by [`TypeKey`]/[`MemberKey`], which the resolver uses as intern
//! keys; declarations and generic instantiations are interned, while arrays, pointers,
//! by-references and function pointers are always built structurally.
//!
//! Links that can close cycles (base type, containing type, declaring type) are held
//! weakly through [`TypeLink`] and resolved on access; the owning model keeps every
//! declaration alive for as long as the symbols are in use.

use std::{
    fmt,
    sync::{Arc, OnceLock, RwLock, Weak},
};

use crate::{
    backend::{FieldAttributes, MethodAttributes, TypeAttributes},
    model::{body::MethodBody, platform::PlatformKind},
    Result,
};

/// Shared reference to a [`TypeSymbol`]
pub type TypeSymbolRc = Arc<TypeSymbol>;
/// Shared reference to a [`MethodSymbol`]
pub type MethodSymbolRc = Arc<MethodSymbol>;
/// Shared reference to a [`FieldSymbol`]
pub type FieldSymbolRc = Arc<FieldSymbol>;
/// A list of types that grows append-only during a pass
pub type TypeSymbolList = Arc<boxcar::Vec<TypeSymbolRc>>;
/// A list of methods that grows append-only during a pass
pub type MethodSymbolList = Arc<boxcar::Vec<MethodSymbolRc>>;
/// A list of fields that grows append-only during a pass
pub type FieldSymbolList = Arc<boxcar::Vec<FieldSymbolRc>>;

/// A weak link to a type, used wherever a strong reference would close a cycle.
#[derive(Clone, Default)]
pub struct TypeLink(Weak<TypeSymbol>);

impl TypeLink {
    /// Resolves the link, returning `None` once the owning model has been dropped.
    #[must_use]
    pub fn upgrade(&self) -> Option<TypeSymbolRc> {
        self.0.upgrade()
    }
}

impl From<&TypeSymbolRc> for TypeLink {
    fn from(symbol: &TypeSymbolRc) -> Self {
        TypeLink(Arc::downgrade(symbol))
    }
}

impl fmt::Debug for TypeLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(symbol) => write!(f, "TypeLink({})", symbol.fullname()),
            None => write!(f, "TypeLink(<dropped>)"),
        }
    }
}

/// Where a declaration lives, relative to the module being processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    /// Declared in the module being processed
    CurrentModule,
    /// Declared in an external assembly, by name
    External(String),
    /// Produced internally, never present in any module (platform types, faux arrays)
    Synthetic,
}

/// Shape of a general (non-vector) array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArrayShape {
    /// Number of dimensions
    pub rank: u8,
    /// Declared lower bounds, one per leading dimension that has one
    pub lower_bounds: Vec<i32>,
    /// Declared sizes, one per leading dimension that has one
    pub sizes: Vec<u32>,
}

impl ArrayShape {
    /// A shape with the given rank and no declared bounds.
    #[must_use]
    pub fn with_rank(rank: u8) -> Self {
        ArrayShape {
            rank,
            ..ArrayShape::default()
        }
    }
}

/// Classification of a type symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFlavor {
    /// Reference type with class semantics
    Class,
    /// Interface contract
    Interface,
    /// User-defined value type
    Struct,
    /// Enumeration
    Enum,
    /// Delegate (class deriving from the multicast-delegate marker)
    Delegate,
    /// A platform catalogue type
    Platform(PlatformKind),
    /// Single-dimensional, zero-based array
    Vector,
    /// General array with explicit shape
    Array(ArrayShape),
    /// Unmanaged pointer
    Pointer,
    /// Managed by-reference
    ByRef,
    /// Function pointer
    FnPtr,
    /// Generic parameter of a type or method
    GenericParam {
        /// Zero-based position in the owner's parameter list
        position: u16,
        /// Whether the owner is a method
        method: bool,
    },
}

/// Structural identity of a type, used as the intern key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeKey {
    Platform(PlatformKind),
    Declaration {
        scope: SymbolScope,
        namespace: String,
        name: String,
        enclosing: Option<Box<TypeKey>>,
    },
    Instantiation {
        definition: Box<TypeKey>,
        args: Vec<TypeKey>,
    },
    Vector(Box<TypeKey>),
    Array {
        element: Box<TypeKey>,
        shape: ArrayShape,
    },
    Pointer(Box<TypeKey>),
    ByRef(Box<TypeKey>),
    FnPtr {
        has_this: bool,
        return_type: Box<TypeKey>,
        params: Vec<TypeKey>,
    },
    GenericParam {
        owner: u32,
        method: bool,
        position: u16,
    },
}

/// Structural identity of a member, used as the intern key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MemberKey {
    Method {
        declaring: TypeKey,
        name: String,
        has_this: bool,
        return_type: TypeKey,
        params: Vec<TypeKey>,
        generic_arity: u16,
        args: Vec<TypeKey>,
    },
    Field {
        declaring: TypeKey,
        name: String,
    },
}

/// A method signature over resolved symbols.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// Whether the method takes an instance `this`
    pub has_this: bool,
    /// Resolved return type
    pub return_type: TypeSymbolRc,
    /// Resolved parameter types, excluding `this`
    pub params: Vec<TypeSymbolRc>,
    /// Number of generic parameters the method declares
    pub generic_arity: u16,
}

impl MethodSignature {
    /// Whether a call through this signature leaves a value on the stack.
    #[must_use]
    pub fn returns_value(&self) -> bool {
        !self.return_type.is_void()
    }

    /// Number of stack slots a call through this signature consumes.
    #[must_use]
    pub fn argument_slots(&self) -> usize {
        self.params.len() + usize::from(self.has_this)
    }
}

/// Represents a type: a declaration, a platform type, a generic parameter or a
/// structurally built composite (array, pointer, by-reference, function pointer).
///
/// Mirrors of the late-populated parts (base, members, nested types) fill in as the
/// extraction pass progresses; everything identity-relevant is fixed at construction.
pub struct TypeSymbol {
    /// Namespace; nested types inherit it from the innermost non-nested ancestor
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Where the declaration lives
    pub scope: SymbolScope,
    /// Classification
    pub flavor: TypeFlavor,
    /// Attribute mask, meaningful for declarations of the current module
    pub attributes: TypeAttributes,
    /// Enclosing type for nested declarations
    containing_type: TypeLink,
    /// Base type, set while the declaration is being filled
    base: OnceLock<TypeLink>,
    /// Implemented interfaces
    pub interfaces: TypeSymbolList,
    /// Declared fields
    pub fields: FieldSymbolList,
    /// Declared methods
    pub methods: MethodSymbolList,
    /// Types nested inside this one
    pub nested_types: TypeSymbolList,
    /// Declared generic parameters (symbols of [`TypeFlavor::GenericParam`] flavor)
    pub generic_params: TypeSymbolList,
    /// The unbound definition, for generic instantiations
    pub generic_type: Option<TypeSymbolRc>,
    /// The resolved type arguments, for generic instantiations
    pub generic_args: Vec<TypeSymbolRc>,
    /// Element type, for vectors, arrays, pointers and by-references
    pub element: Option<TypeSymbolRc>,
    /// Full signature, for function pointers
    pub fn_sig: Option<MethodSignature>,
    /// Structural identity
    pub(crate) key: TypeKey,
}

impl TypeSymbol {
    fn empty(namespace: String, name: String, scope: SymbolScope, flavor: TypeFlavor, key: TypeKey) -> Self {
        TypeSymbol {
            namespace,
            name,
            scope,
            flavor,
            attributes: TypeAttributes::default(),
            containing_type: TypeLink::default(),
            base: OnceLock::new(),
            interfaces: Arc::new(boxcar::Vec::new()),
            fields: Arc::new(boxcar::Vec::new()),
            methods: Arc::new(boxcar::Vec::new()),
            nested_types: Arc::new(boxcar::Vec::new()),
            generic_params: Arc::new(boxcar::Vec::new()),
            generic_type: None,
            generic_args: Vec::new(),
            element: None,
            fn_sig: None,
            key,
        }
    }

    /// Creates the symbol for a platform catalogue type.
    #[must_use]
    pub fn platform(kind: PlatformKind) -> Self {
        TypeSymbol::empty(
            PlatformKind::namespace().to_string(),
            kind.name().to_string(),
            SymbolScope::Synthetic,
            TypeFlavor::Platform(kind),
            TypeKey::Platform(kind),
        )
    }

    /// Creates a declaration symbol; flavor and attributes are refined by extraction.
    #[must_use]
    pub(crate) fn declaration(
        namespace: String,
        name: String,
        scope: SymbolScope,
        flavor: TypeFlavor,
        containing: Option<&TypeSymbolRc>,
    ) -> Self {
        let key = TypeKey::Declaration {
            scope: scope.clone(),
            namespace: namespace.clone(),
            name: name.clone(),
            enclosing: containing.map(|enclosing| Box::new(enclosing.key.clone())),
        };
        let mut symbol = TypeSymbol::empty(namespace, name, scope, flavor, key);
        if let Some(enclosing) = containing {
            symbol.containing_type = enclosing.into();
        }
        symbol
    }

    /// Creates a generic instantiation over a resolved definition and arguments.
    #[must_use]
    pub(crate) fn instantiation(definition: &TypeSymbolRc, args: Vec<TypeSymbolRc>) -> Self {
        let key = TypeKey::Instantiation {
            definition: Box::new(definition.key.clone()),
            args: args.iter().map(|arg| arg.key.clone()).collect(),
        };
        let mut symbol = TypeSymbol::empty(
            definition.namespace.clone(),
            definition.name.clone(),
            definition.scope.clone(),
            definition.flavor.clone(),
            key,
        );
        symbol.containing_type = definition.containing_type.clone();
        symbol.generic_type = Some(definition.clone());
        symbol.generic_args = args;
        symbol
    }

    /// Creates a vector (single-dimensional, zero-based array) over an element type.
    #[must_use]
    pub(crate) fn vector(element: TypeSymbolRc) -> Self {
        let key = TypeKey::Vector(Box::new(element.key.clone()));
        let mut symbol = TypeSymbol::empty(
            element.namespace.clone(),
            format!("{}[]", element.name),
            SymbolScope::Synthetic,
            TypeFlavor::Vector,
            key,
        );
        symbol.element = Some(element);
        symbol
    }

    /// Creates a general array over an element type and shape.
    #[must_use]
    pub(crate) fn array(element: TypeSymbolRc, shape: ArrayShape) -> Self {
        let key = TypeKey::Array {
            element: Box::new(element.key.clone()),
            shape: shape.clone(),
        };
        let commas = ",".repeat(shape.rank.saturating_sub(1) as usize);
        let mut symbol = TypeSymbol::empty(
            element.namespace.clone(),
            format!("{}[{commas}]", element.name),
            SymbolScope::Synthetic,
            TypeFlavor::Array(shape),
            key,
        );
        symbol.element = Some(element);
        symbol
    }

    /// Creates an unmanaged pointer over a pointee type.
    #[must_use]
    pub(crate) fn pointer(pointee: TypeSymbolRc) -> Self {
        let key = TypeKey::Pointer(Box::new(pointee.key.clone()));
        let mut symbol = TypeSymbol::empty(
            pointee.namespace.clone(),
            format!("{}*", pointee.name),
            SymbolScope::Synthetic,
            TypeFlavor::Pointer,
            key,
        );
        symbol.element = Some(pointee);
        symbol
    }

    /// Creates a managed by-reference over a referent type.
    #[must_use]
    pub(crate) fn by_ref(referent: TypeSymbolRc) -> Self {
        let key = TypeKey::ByRef(Box::new(referent.key.clone()));
        let mut symbol = TypeSymbol::empty(
            referent.namespace.clone(),
            format!("{}&", referent.name),
            SymbolScope::Synthetic,
            TypeFlavor::ByRef,
            key,
        );
        symbol.element = Some(referent);
        symbol
    }

    /// Creates a function pointer over a resolved signature.
    #[must_use]
    pub(crate) fn fn_pointer(signature: MethodSignature) -> Self {
        let key = TypeKey::FnPtr {
            has_this: signature.has_this,
            return_type: Box::new(signature.return_type.key.clone()),
            params: signature.params.iter().map(|param| param.key.clone()).collect(),
        };
        let mut symbol = TypeSymbol::empty(
            String::new(),
            "fnptr".to_string(),
            SymbolScope::Synthetic,
            TypeFlavor::FnPtr,
            key,
        );
        symbol.fn_sig = Some(signature);
        symbol
    }

    /// Creates a generic parameter symbol owned by the entity behind `owner_token`.
    #[must_use]
    pub(crate) fn generic_param(
        name: String,
        owner_token: u32,
        position: u16,
        method: bool,
    ) -> Self {
        TypeSymbol::empty(
            String::new(),
            name,
            SymbolScope::Synthetic,
            TypeFlavor::GenericParam { position, method },
            TypeKey::GenericParam {
                owner: owner_token,
                method,
                position,
            },
        )
    }

    /// Access the base type of this type, if already linked.
    #[must_use]
    pub fn base(&self) -> Option<TypeSymbolRc> {
        self.base.get().and_then(TypeLink::upgrade)
    }

    /// Links the base type; only the first link sticks.
    pub fn set_base(&self, base: &TypeSymbolRc) {
        self.base.set(base.into()).ok();
    }

    /// Access the enclosing type of a nested declaration.
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeSymbolRc> {
        self.containing_type.upgrade()
    }

    /// Returns the full name (Namespace.Name) of the entity.
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Whether this symbol is the platform void type.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self.flavor, TypeFlavor::Platform(PlatformKind::Void))
    }

    /// Whether values of this type have value semantics.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match &self.flavor {
            TypeFlavor::Struct | TypeFlavor::Enum => true,
            TypeFlavor::Platform(kind) => kind.is_value_type(),
            _ => false,
        }
    }

    /// Whether this symbol is a non-vector array (the faux-array case).
    #[must_use]
    pub fn is_general_array(&self) -> bool {
        matches!(self.flavor, TypeFlavor::Array(_))
    }

    /// The array rank: 1 for vectors, the declared rank for general arrays.
    #[must_use]
    pub fn array_rank(&self) -> Option<u8> {
        match &self.flavor {
            TypeFlavor::Vector => Some(1),
            TypeFlavor::Array(shape) => Some(shape.rank),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSymbol({}", self.fullname())?;
        if !self.generic_args.is_empty() {
            write!(f, "<{} args>", self.generic_args.len())?;
        }
        write!(f, ", {:?})", self.flavor)
    }
}

/// Represents a method: a definition of the current module, an external reference or a
/// generic method instantiation. Faux-array accessors are method symbols whose declaring
/// type is a general array; they exist only inside the object model.
pub struct MethodSymbol {
    /// Declaring type
    declaring_type: TypeLink,
    /// Method name
    pub name: String,
    /// Attribute mask, meaningful for definitions of the current module
    pub attributes: MethodAttributes,
    /// Resolved signature
    pub signature: MethodSignature,
    /// Declared generic parameters (symbols of [`TypeFlavor::GenericParam`] flavor)
    pub generic_params: TypeSymbolList,
    /// The unbound definition, for generic method instantiations
    pub generic_method: Option<MethodSymbolRc>,
    /// The resolved method type arguments, for instantiations
    pub generic_args: Vec<TypeSymbolRc>,
    /// Parameter names, where the module declares them
    pub param_names: Vec<String>,
    /// The body, present only for definitions of the current module
    body: RwLock<Option<MethodBody>>,
    /// Structural identity
    pub(crate) key: MemberKey,
}

impl MethodSymbol {
    /// Creates a method symbol bound to its declaring type.
    #[must_use]
    pub(crate) fn new(
        declaring: &TypeSymbolRc,
        name: String,
        attributes: MethodAttributes,
        signature: MethodSignature,
    ) -> Self {
        let key = MemberKey::Method {
            declaring: declaring.key.clone(),
            name: name.clone(),
            has_this: signature.has_this,
            return_type: signature.return_type.key.clone(),
            params: signature.params.iter().map(|param| param.key.clone()).collect(),
            generic_arity: signature.generic_arity,
            args: Vec::new(),
        };
        MethodSymbol {
            declaring_type: declaring.into(),
            name,
            attributes,
            signature,
            generic_params: Arc::new(boxcar::Vec::new()),
            generic_method: None,
            generic_args: Vec::new(),
            param_names: Vec::new(),
            body: RwLock::new(None),
            key,
        }
    }

    /// Creates a generic method instantiation over a resolved definition and arguments.
    #[must_use]
    pub(crate) fn instantiation(definition: &MethodSymbolRc, args: Vec<TypeSymbolRc>) -> Self {
        let mut key = definition.key.clone();
        if let MemberKey::Method { args: key_args, .. } = &mut key {
            *key_args = args.iter().map(|arg| arg.key.clone()).collect();
        }
        MethodSymbol {
            declaring_type: definition.declaring_type.clone(),
            name: definition.name.clone(),
            attributes: definition.attributes,
            signature: definition.signature.clone(),
            generic_params: definition.generic_params.clone(),
            generic_method: Some(definition.clone()),
            generic_args: args,
            param_names: definition.param_names.clone(),
            body: RwLock::new(None),
            key,
        }
    }

    /// Access the declaring type.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeSymbolRc> {
        self.declaring_type.upgrade()
    }

    /// Attaches or replaces the body.
    ///
    /// Extraction stores the decoded bytecode form, the external transform a
    /// three-address form, generation the re-assembled form.
    ///
    /// # Errors
    ///
    /// Fails if the body lock was poisoned by a panicking writer.
    pub fn set_body(&self, body: MethodBody) -> Result<()> {
        let mut slot = self
            .body
            .write()
            .map_err(|_| malformed_error!("method body lock poisoned for {}", self.name))?;
        *slot = Some(body);
        Ok(())
    }

    /// Clones the currently attached body, if any.
    ///
    /// # Errors
    ///
    /// Fails if the body lock was poisoned by a panicking writer.
    pub fn body(&self) -> Result<Option<MethodBody>> {
        let slot = self
            .body
            .read()
            .map_err(|_| malformed_error!("method body lock poisoned for {}", self.name))?;
        Ok(slot.clone())
    }

    /// Whether this is an accessor or constructor of a faux-array symbol.
    #[must_use]
    pub fn is_faux_array_member(&self) -> bool {
        self.declaring_type()
            .is_some_and(|declaring| declaring.is_general_array())
    }

    /// Whether a call to this method dispatches without an instance.
    #[must_use]
    pub fn is_static(&self) -> bool {
        !self.signature.has_this
    }
}

impl fmt::Debug for MethodSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declaring = self
            .declaring_type()
            .map_or_else(|| "<dropped>".to_string(), |t| t.fullname());
        write!(f, "MethodSymbol({declaring}::{}", self.name)?;
        if !self.generic_args.is_empty() {
            write!(f, "<{} args>", self.generic_args.len())?;
        }
        write!(f, ")")
    }
}

/// Represents a field of a type.
pub struct FieldSymbol {
    /// Declaring type
    declaring_type: TypeLink,
    /// Field name
    pub name: String,
    /// Attribute mask, meaningful for definitions of the current module
    pub attributes: FieldAttributes,
    /// Resolved field type
    pub field_type: TypeSymbolRc,
    /// Structural identity
    pub(crate) key: MemberKey,
}

impl FieldSymbol {
    /// Creates a field symbol bound to its declaring type.
    #[must_use]
    pub(crate) fn new(
        declaring: &TypeSymbolRc,
        name: String,
        attributes: FieldAttributes,
        field_type: TypeSymbolRc,
    ) -> Self {
        let key = MemberKey::Field {
            declaring: declaring.key.clone(),
            name: name.clone(),
        };
        FieldSymbol {
            declaring_type: declaring.into(),
            name,
            attributes,
            field_type,
            key,
        }
    }

    /// Access the declaring type.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeSymbolRc> {
        self.declaring_type.upgrade()
    }

    /// Whether the field has per-type rather than per-instance storage.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes.contains(FieldAttributes::STATIC)
    }
}

impl fmt::Debug for FieldSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declaring = self
            .declaring_type()
            .map_or_else(|| "<dropped>".to_string(), |t| t.fullname());
        write!(f, "FieldSymbol({declaring}::{})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> TypeSymbolRc {
        Arc::new(TypeSymbol::declaration(
            "Probe".to_string(),
            name.to_string(),
            SymbolScope::CurrentModule,
            TypeFlavor::Class,
            None,
        ))
    }

    #[test]
    fn declaration_keys_are_structural() {
        let first = class("Widget");
        let second = class("Widget");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.key, second.key);
        assert_ne!(first.key, class("Gadget").key);
    }

    #[test]
    fn nested_declarations_fold_the_enclosing_key() {
        let outer = class("Outer");
        let inner = TypeSymbol::declaration(
            "Probe".to_string(),
            "Inner".to_string(),
            SymbolScope::CurrentModule,
            TypeFlavor::Class,
            Some(&outer),
        );
        let orphan = TypeSymbol::declaration(
            "Probe".to_string(),
            "Inner".to_string(),
            SymbolScope::CurrentModule,
            TypeFlavor::Class,
            None,
        );
        assert_ne!(inner.key, orphan.key);
        assert!(inner.containing_type().is_some());
    }

    #[test]
    fn instantiation_keys_include_arguments() {
        let definition = class("List`1");
        let int_arg = Arc::new(TypeSymbol::platform(PlatformKind::I4));
        let string_arg = Arc::new(TypeSymbol::platform(PlatformKind::String));

        let of_int = TypeSymbol::instantiation(&definition, vec![int_arg.clone()]);
        let of_int_again = TypeSymbol::instantiation(&definition, vec![int_arg]);
        let of_string = TypeSymbol::instantiation(&definition, vec![string_arg]);

        assert_eq!(of_int.key, of_int_again.key);
        assert_ne!(of_int.key, of_string.key);
    }

    #[test]
    fn composite_names_follow_element_names() {
        let int32 = Arc::new(TypeSymbol::platform(PlatformKind::I4));
        assert_eq!(TypeSymbol::vector(int32.clone()).name, "Int32[]");
        assert_eq!(
            TypeSymbol::array(int32.clone(), ArrayShape::with_rank(2)).name,
            "Int32[,]"
        );
        assert_eq!(TypeSymbol::pointer(int32.clone()).name, "Int32*");
        assert_eq!(TypeSymbol::by_ref(int32).name, "Int32&");
    }

    #[test]
    fn base_link_sticks_once() {
        let derived = class("Derived");
        let base_a = class("BaseA");
        let base_b = class("BaseB");
        derived.set_base(&base_a);
        derived.set_base(&base_b);
        assert!(Arc::ptr_eq(&derived.base().unwrap(), &base_a));
    }

    #[test]
    fn faux_array_members_are_recognized() {
        let int32 = Arc::new(TypeSymbol::platform(PlatformKind::I4));
        let faux = Arc::new(TypeSymbol::array(int32.clone(), ArrayShape::with_rank(2)));
        let getter = MethodSymbol::new(
            &faux,
            "Get".to_string(),
            MethodAttributes::PUBLIC,
            MethodSignature {
                has_this: true,
                return_type: int32.clone(),
                params: vec![int32.clone(), int32.clone()],
                generic_arity: 0,
            },
        );
        assert!(getter.is_faux_array_member());

        let vector = Arc::new(TypeSymbol::vector(int32.clone()));
        let vector_member = MethodSymbol::new(
            &vector,
            "Get".to_string(),
            MethodAttributes::PUBLIC,
            MethodSignature {
                has_this: true,
                return_type: int32.clone(),
                params: vec![int32],
                generic_arity: 0,
            },
        );
        assert!(!vector_member.is_faux_array_member());
    }
}
