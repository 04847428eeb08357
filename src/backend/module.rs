//! Row model of a foreign binary module, as exposed by the module backend.
//!
//! The backend owns header parsing and final layout serialization; what crosses the
//! boundary is this structured row model: an ordered type table with nesting, namespace
//! and generic-parameter metadata, flat method/field tables addressed by [`Token`], the
//! reference tables (type refs, type specs, member refs, method specs) and, per method,
//! parameters, locals, exception regions and the flat instruction stream.
//!
//! Rows are addressed by one-based [`Token`]s whose table tag matches the owning table.
//! The same model is used in both directions: extraction reads it, generation builds a
//! fresh one row by row and hands it back to the backend for serialization.

use bitflags::bitflags;

use crate::{
    backend::{
        instruction::ForeignInstruction,
        token::{TableKind, Token},
    },
    Result,
};

bitflags! {
    /// Type attribute mask (visibility, semantics, layout), carried through unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeAttributes: u32 {
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested type, visible outside the assembly
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested type, visible only to the enclosing type
        const NESTED_PRIVATE = 0x0000_0003;
        /// Interface semantics
        const INTERFACE = 0x0000_0020;
        /// No direct instantiation
        const ABSTRACT = 0x0000_0080;
        /// No derivation
        const SEALED = 0x0000_0100;
        /// Name carries special meaning to tooling
        const SPECIAL_NAME = 0x0000_0400;
        /// Sequential field layout
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Explicit field layout
        const EXPLICIT_LAYOUT = 0x0000_0010;
    }
}

bitflags! {
    /// Method attribute mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodAttributes: u16 {
        /// Accessible only within the declaring type
        const PRIVATE = 0x0001;
        /// Accessible everywhere
        const PUBLIC = 0x0006;
        /// No `this` parameter
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Dispatched through the vtable
        const VIRTUAL = 0x0040;
        /// Hidden by signature, not just by name
        const HIDE_BY_SIG = 0x0080;
        /// No implementation in this type
        const ABSTRACT = 0x0400;
        /// Name carries special meaning (`.ctor`, operators)
        const SPECIAL_NAME = 0x0800;
        /// Runtime-recognized special name
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    /// Field attribute mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldAttributes: u16 {
        /// Accessible only within the declaring type
        const PRIVATE = 0x0001;
        /// Accessible everywhere
        const PUBLIC = 0x0006;
        /// Per-type rather than per-instance storage
        const STATIC = 0x0010;
        /// Writable only inside constructors
        const INIT_ONLY = 0x0020;
        /// Compile-time constant
        const LITERAL = 0x0040;
        /// Name carries special meaning
        const SPECIAL_NAME = 0x0200;
    }
}

/// Built-in element types a signature can name directly, without a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// No value
    Void,
    /// Boolean
    Boolean,
    /// UTF-16 code unit
    Char,
    /// Signed 8-bit integer
    I1,
    /// Unsigned 8-bit integer
    U1,
    /// Signed 16-bit integer
    I2,
    /// Unsigned 16-bit integer
    U2,
    /// Signed 32-bit integer
    I4,
    /// Unsigned 32-bit integer
    U4,
    /// Signed 64-bit integer
    I8,
    /// Unsigned 64-bit integer
    U8,
    /// 32-bit float
    R4,
    /// 64-bit float
    R8,
    /// Native-width signed integer
    IntPtr,
    /// Native-width unsigned integer
    UIntPtr,
    /// Root object type
    Object,
    /// Immutable string
    String,
    /// Typed reference (deliberately unsupported downstream)
    TypedReference,
}

/// A structural type signature as it appears in specs, locals, fields and parameters.
///
/// Signatures reference declarations by token and compose structurally; the resolver
/// turns them into canonical symbols.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignTypeSig {
    /// A built-in element type
    Element(ElementKind),
    /// A named declaration: TypeDef, TypeRef or TypeSpec token
    Named {
        /// The declaration token
        token: Token,
        /// Whether the named type has value semantics
        value_type: bool,
    },
    /// A generic instantiation of a named definition
    GenericInst {
        /// Token of the unbound definition
        definition: Token,
        /// Whether the definition has value semantics
        value_type: bool,
        /// The type arguments, in order
        args: Vec<ForeignTypeSig>,
    },
    /// A single-dimensional, zero-based array
    Vector(Box<ForeignTypeSig>),
    /// A general array with explicit shape
    Array {
        /// Element type
        element: Box<ForeignTypeSig>,
        /// Number of dimensions
        rank: u8,
        /// Lower bounds, one per leading dimension that declares one
        lower_bounds: Vec<i32>,
        /// Sizes, one per leading dimension that declares one
        sizes: Vec<u32>,
    },
    /// An unmanaged pointer
    Pointer(Box<ForeignTypeSig>),
    /// A managed by-reference
    ByRef(Box<ForeignTypeSig>),
    /// A function pointer carrying a full method signature
    FnPtr(Box<ForeignMethodSig>),
    /// A generic parameter reference, owner named explicitly
    GenericParam {
        /// Token of the owning type or method
        owner: Token,
        /// Zero-based position in the owner's parameter list
        position: u16,
        /// Whether the owner is a method (`true`) or a type (`false`)
        method: bool,
    },
}

/// A method signature: calling shape, return type and parameter types.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignMethodSig {
    /// Whether the method takes an instance `this`
    pub has_this: bool,
    /// Return type
    pub return_type: ForeignTypeSig,
    /// Parameter types, in order, excluding `this`
    pub params: Vec<ForeignTypeSig>,
    /// Number of generic parameters the method declares
    pub generic_arity: u16,
}

impl ForeignMethodSig {
    /// A static signature with the given return type and parameters.
    #[must_use]
    pub fn static_sig(return_type: ForeignTypeSig, params: Vec<ForeignTypeSig>) -> Self {
        ForeignMethodSig {
            has_this: false,
            return_type,
            params,
            generic_arity: 0,
        }
    }

    /// An instance signature with the given return type and parameters.
    #[must_use]
    pub fn instance_sig(return_type: ForeignTypeSig, params: Vec<ForeignTypeSig>) -> Self {
        ForeignMethodSig {
            has_this: true,
            return_type,
            params,
            generic_arity: 0,
        }
    }
}

/// Resolution scope of a type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignScope {
    /// The current module itself (a reference to a local declaration)
    CurrentModule,
    /// An external assembly, by assembly-reference row
    Assembly(u32),
    /// The enclosing type of a nested reference
    Nested(Token),
}

/// A reference to a type in some scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignTypeRef {
    /// Namespace, empty for nested references
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Where the referenced declaration lives
    pub scope: ForeignScope,
}

/// A generic parameter declaration on a type or method.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignGenericParam {
    /// Declared name (`T`, `TKey`, ...)
    pub name: String,
    /// Zero-based position
    pub position: u16,
}

/// A member (method or field) referenced through another type.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignMemberRef {
    /// TypeDef, TypeRef or TypeSpec token of the parent
    pub parent: Token,
    /// Member name
    pub name: String,
    /// The member signature
    pub signature: ForeignMemberSig,
}

/// Signature payload of a member reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignMemberSig {
    /// A method reference
    Method(ForeignMethodSig),
    /// A field reference
    Field(ForeignTypeSig),
}

/// A generic method instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignMethodSpec {
    /// MethodDef or MemberRef token of the unbound method
    pub method: Token,
    /// The method type arguments, in order
    pub args: Vec<ForeignTypeSig>,
}

/// Kind of an exception-protected region handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionKind {
    /// Catch handler filtered by exception type
    Catch(Token),
    /// Filter handler with the filter expression at the given offset
    Filter(u32),
    /// Finally handler
    Finally,
    /// Fault handler
    Fault,
}

/// One exception-protected region of a method body, as byte-offset ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignRegion {
    /// Handler classification
    pub kind: RegionKind,
    /// Start of the protected range
    pub try_offset: u32,
    /// Length of the protected range
    pub try_length: u32,
    /// Start of the handler range
    pub handler_offset: u32,
    /// Length of the handler range
    pub handler_length: u32,
}

/// A method body: locals, stack requirement, regions and the instruction stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForeignBody {
    /// Maximum operand stack depth the body requires
    pub max_stack: u16,
    /// Whether locals are zero-initialized on entry
    pub init_locals: bool,
    /// Local variable types, in slot order
    pub locals: Vec<ForeignTypeSig>,
    /// Exception-protected regions
    pub regions: Vec<ForeignRegion>,
    /// The flat instruction stream, offset-ordered
    pub instructions: Vec<ForeignInstruction>,
}

/// A method defined in the current module.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignMethodDef {
    /// Declaring type token
    pub declaring: Token,
    /// Method name
    pub name: String,
    /// Attribute mask
    pub flags: MethodAttributes,
    /// The method signature
    pub signature: ForeignMethodSig,
    /// Parameter names, parallel to the signature parameters
    pub param_names: Vec<String>,
    /// Generic parameter declarations
    pub generic_params: Vec<ForeignGenericParam>,
    /// The body, absent for abstract/external methods
    pub body: Option<ForeignBody>,
}

/// A field defined in the current module.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignFieldDef {
    /// Declaring type token
    pub declaring: Token,
    /// Field name
    pub name: String,
    /// Attribute mask
    pub flags: FieldAttributes,
    /// The field type
    pub signature: ForeignTypeSig,
}

/// A type defined in the current module.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignTypeDef {
    /// Namespace, empty for nested types
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Attribute mask
    pub flags: TypeAttributes,
    /// Base type token, `None` for interfaces and the root object
    pub base: Option<Token>,
    /// Implemented interface tokens
    pub interfaces: Vec<Token>,
    /// Enclosing type token for nested types
    pub enclosing: Option<Token>,
    /// Generic parameter declarations
    pub generic_params: Vec<ForeignGenericParam>,
    /// Field tokens, declaration order
    pub fields: Vec<Token>,
    /// Method tokens, declaration order
    pub methods: Vec<Token>,
    /// Nested type tokens, declaration order
    pub nested: Vec<Token>,
}

/// Name of the implicit module-scope pseudo-type holding global members.
pub const MODULE_PSEUDO_TYPE: &str = "<Module>";

/// The structured view of one foreign binary module.
///
/// Extraction walks this; generation builds a fresh one through the `add_*` builders,
/// which hand out the token of every created row so callers can cross-reference.
#[derive(Debug, Clone, Default)]
pub struct ForeignModule {
    /// Module name
    pub name: String,
    assembly_refs: Vec<String>,
    type_defs: Vec<ForeignTypeDef>,
    type_refs: Vec<ForeignTypeRef>,
    type_specs: Vec<ForeignTypeSig>,
    member_refs: Vec<ForeignMemberRef>,
    method_specs: Vec<ForeignMethodSpec>,
    method_defs: Vec<ForeignMethodDef>,
    field_defs: Vec<ForeignFieldDef>,
}

impl ForeignModule {
    /// Creates an empty module with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ForeignModule {
            name: name.to_string(),
            ..ForeignModule::default()
        }
    }

    fn row_index(token: Token, table: TableKind, len: usize) -> Result<usize> {
        if token.table() != Some(table) {
            return Err(malformed_error!(
                "token {} does not address the {:?} table",
                token,
                table
            ));
        }
        let index = token.row() as usize;
        if index == 0 || index > len {
            return Err(malformed_error!("token {} is out of range", token));
        }
        Ok(index - 1)
    }

    /// The ordered type table, declaration order.
    pub fn type_defs(&self) -> impl Iterator<Item = (Token, &ForeignTypeDef)> {
        self.type_defs.iter().enumerate().map(|(index, row)| {
            #[allow(clippy::cast_possible_truncation)]
            let token = Token::from_parts(TableKind::TypeDef, index as u32 + 1);
            (token, row)
        })
    }

    /// Looks up a type definition row.
    pub fn type_def(&self, token: Token) -> Result<&ForeignTypeDef> {
        let index = Self::row_index(token, TableKind::TypeDef, self.type_defs.len())?;
        Ok(&self.type_defs[index])
    }

    /// Looks up a type reference row.
    pub fn type_ref(&self, token: Token) -> Result<&ForeignTypeRef> {
        let index = Self::row_index(token, TableKind::TypeRef, self.type_refs.len())?;
        Ok(&self.type_refs[index])
    }

    /// Looks up a type specification row.
    pub fn type_spec(&self, token: Token) -> Result<&ForeignTypeSig> {
        let index = Self::row_index(token, TableKind::TypeSpec, self.type_specs.len())?;
        Ok(&self.type_specs[index])
    }

    /// Looks up a member reference row.
    pub fn member_ref(&self, token: Token) -> Result<&ForeignMemberRef> {
        let index = Self::row_index(token, TableKind::MemberRef, self.member_refs.len())?;
        Ok(&self.member_refs[index])
    }

    /// Looks up a generic method instantiation row.
    pub fn method_spec(&self, token: Token) -> Result<&ForeignMethodSpec> {
        let index = Self::row_index(token, TableKind::MethodSpec, self.method_specs.len())?;
        Ok(&self.method_specs[index])
    }

    /// Looks up a method definition row.
    pub fn method_def(&self, token: Token) -> Result<&ForeignMethodDef> {
        let index = Self::row_index(token, TableKind::MethodDef, self.method_defs.len())?;
        Ok(&self.method_defs[index])
    }

    /// Looks up a field definition row.
    pub fn field_def(&self, token: Token) -> Result<&ForeignFieldDef> {
        let index = Self::row_index(token, TableKind::FieldDef, self.field_defs.len())?;
        Ok(&self.field_defs[index])
    }

    /// Looks up an assembly-reference name by row.
    pub fn assembly_ref(&self, row: u32) -> Result<&str> {
        self.assembly_refs
            .get(row.checked_sub(1).ok_or_else(|| {
                malformed_error!("assembly reference rows are one-based")
            })? as usize)
            .map(String::as_str)
            .ok_or_else(|| malformed_error!("assembly reference row {} is out of range", row))
    }

    /// Number of method definition rows currently in the module.
    ///
    /// `add_method_def` never deduplicates, so the token of the next added row is
    /// always the count plus one; generation uses this to reference a method from
    /// within its own signature.
    #[must_use]
    pub fn method_def_count(&self) -> usize {
        self.method_defs.len()
    }

    /// Number of member reference rows currently in the module.
    #[must_use]
    pub fn member_ref_count(&self) -> usize {
        self.member_refs.len()
    }

    /// Registers an external assembly scope and returns its row.
    pub fn add_assembly_ref(&mut self, name: &str) -> u32 {
        if let Some(index) = self.assembly_refs.iter().position(|existing| existing == name) {
            #[allow(clippy::cast_possible_truncation)]
            let row = index as u32 + 1;
            return row;
        }
        self.assembly_refs.push(name.to_string());
        #[allow(clippy::cast_possible_truncation)]
        let row = self.assembly_refs.len() as u32;
        row
    }

    /// Appends a type definition row and returns its token.
    pub fn add_type_def(&mut self, row: ForeignTypeDef) -> Token {
        self.type_defs.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::TypeDef, self.type_defs.len() as u32);
        token
    }

    /// Appends a type reference row and returns its token.
    pub fn add_type_ref(&mut self, row: ForeignTypeRef) -> Token {
        if let Some(index) = self.type_refs.iter().position(|existing| *existing == row) {
            #[allow(clippy::cast_possible_truncation)]
            let token = Token::from_parts(TableKind::TypeRef, index as u32 + 1);
            return token;
        }
        self.type_refs.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::TypeRef, self.type_refs.len() as u32);
        token
    }

    /// Appends a type specification row and returns its token.
    pub fn add_type_spec(&mut self, signature: ForeignTypeSig) -> Token {
        if let Some(index) = self
            .type_specs
            .iter()
            .position(|existing| *existing == signature)
        {
            #[allow(clippy::cast_possible_truncation)]
            let token = Token::from_parts(TableKind::TypeSpec, index as u32 + 1);
            return token;
        }
        self.type_specs.push(signature);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::TypeSpec, self.type_specs.len() as u32);
        token
    }

    /// Appends a member reference row and returns its token.
    pub fn add_member_ref(&mut self, row: ForeignMemberRef) -> Token {
        if let Some(index) = self.member_refs.iter().position(|existing| *existing == row) {
            #[allow(clippy::cast_possible_truncation)]
            let token = Token::from_parts(TableKind::MemberRef, index as u32 + 1);
            return token;
        }
        self.member_refs.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::MemberRef, self.member_refs.len() as u32);
        token
    }

    /// Appends a generic method instantiation row and returns its token.
    pub fn add_method_spec(&mut self, row: ForeignMethodSpec) -> Token {
        if let Some(index) = self.method_specs.iter().position(|existing| *existing == row) {
            #[allow(clippy::cast_possible_truncation)]
            let token = Token::from_parts(TableKind::MethodSpec, index as u32 + 1);
            return token;
        }
        self.method_specs.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::MethodSpec, self.method_specs.len() as u32);
        token
    }

    /// Appends a method definition row, links it to its declaring type, returns its token.
    pub fn add_method_def(&mut self, row: ForeignMethodDef) -> Result<Token> {
        let declaring = row.declaring;
        self.method_defs.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::MethodDef, self.method_defs.len() as u32);
        let index = Self::row_index(declaring, TableKind::TypeDef, self.type_defs.len())?;
        self.type_defs[index].methods.push(token);
        Ok(token)
    }

    /// Appends a field definition row, links it to its declaring type, returns its token.
    pub fn add_field_def(&mut self, row: ForeignFieldDef) -> Result<Token> {
        let declaring = row.declaring;
        self.field_defs.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let token = Token::from_parts(TableKind::FieldDef, self.field_defs.len() as u32);
        let index = Self::row_index(declaring, TableKind::TypeDef, self.type_defs.len())?;
        self.type_defs[index].fields.push(token);
        Ok(token)
    }

    /// Sets the base type of an existing type definition.
    pub fn set_base(&mut self, type_token: Token, base: Token) -> Result<()> {
        let index = Self::row_index(type_token, TableKind::TypeDef, self.type_defs.len())?;
        self.type_defs[index].base = Some(base);
        Ok(())
    }

    /// Adds an implemented interface to an existing type definition.
    pub fn add_interface_impl(&mut self, type_token: Token, interface: Token) -> Result<()> {
        let index = Self::row_index(type_token, TableKind::TypeDef, self.type_defs.len())?;
        self.type_defs[index].interfaces.push(interface);
        Ok(())
    }

    /// Records a nesting relationship between two existing type definitions.
    pub fn set_enclosing(&mut self, nested: Token, enclosing: Token) -> Result<()> {
        let index = Self::row_index(nested, TableKind::TypeDef, self.type_defs.len())?;
        self.type_defs[index].enclosing = Some(enclosing);
        let enclosing_index =
            Self::row_index(enclosing, TableKind::TypeDef, self.type_defs.len())?;
        self.type_defs[enclosing_index].nested.push(nested);
        Ok(())
    }

    /// Attaches a body to an existing method definition.
    pub fn attach_body(&mut self, method: Token, body: ForeignBody) -> Result<()> {
        let index = Self::row_index(method, TableKind::MethodDef, self.method_defs.len())?;
        self.method_defs[index].body = Some(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_class(namespace: &str, name: &str) -> ForeignTypeDef {
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

    #[test]
    fn tokens_address_their_rows() {
        let mut module = ForeignModule::new("probe");
        let first = module.add_type_def(empty_class("A", "First"));
        let second = module.add_type_def(empty_class("A", "Second"));

        assert_eq!(module.type_def(first).unwrap().name, "First");
        assert_eq!(module.type_def(second).unwrap().name, "Second");
        assert!(module.type_def(Token::from_parts(TableKind::TypeDef, 3)).is_err());
        assert!(module.type_def(Token::from_parts(TableKind::MethodDef, 1)).is_err());
    }

    #[test]
    fn reference_rows_are_deduplicated() {
        let mut module = ForeignModule::new("probe");
        let scope = module.add_assembly_ref("External.Lib");
        let row = ForeignTypeRef {
            namespace: "External".to_string(),
            name: "Widget".to_string(),
            scope: ForeignScope::Assembly(scope),
        };
        let first = module.add_type_ref(row.clone());
        let second = module.add_type_ref(row);
        assert_eq!(first, second);

        assert_eq!(module.add_assembly_ref("External.Lib"), scope);
    }

    #[test]
    fn member_rows_link_back_to_their_type() {
        let mut module = ForeignModule::new("probe");
        let owner = module.add_type_def(empty_class("A", "Owner"));
        let method = module
            .add_method_def(ForeignMethodDef {
                declaring: owner,
                name: "Run".to_string(),
                flags: MethodAttributes::PUBLIC,
                signature: ForeignMethodSig::instance_sig(
                    ForeignTypeSig::Element(ElementKind::Void),
                    Vec::new(),
                ),
                param_names: Vec::new(),
                generic_params: Vec::new(),
                body: None,
            })
            .unwrap();

        assert_eq!(module.type_def(owner).unwrap().methods, vec![method]);
        assert_eq!(module.method_def(method).unwrap().name, "Run");
    }

    #[test]
    fn nesting_links_both_directions() {
        let mut module = ForeignModule::new("probe");
        let outer = module.add_type_def(empty_class("A", "Outer"));
        let inner = module.add_type_def(empty_class("", "Inner"));
        module.set_enclosing(inner, outer).unwrap();

        assert_eq!(module.type_def(inner).unwrap().enclosing, Some(outer));
        assert_eq!(module.type_def(outer).unwrap().nested, vec![inner]);
    }
}
