//! The fixed catalogue of platform types used as canonical operand types.
//!
//! Every primitive and runtime-marker type the canonical model can name is listed in
//! [`PlatformKind`]. The [`PlatformTypes`] table owns one interned [`TypeSymbol`] per
//! kind, created once per resolution pass; all other components obtain platform symbols
//! through it so identity comparison works for primitives exactly as it does for
//! resolved declarations.

use std::sync::Arc;

use strum::EnumIter;

use crate::{
    backend::ElementKind,
    model::symbol::{TypeSymbol, TypeSymbolRc},
};

/// The closed set of platform types.
///
/// Covers the primitive operand types plus the runtime marker types the extraction
/// pipeline classifies against (value-type, enum and multicast-delegate bases) and the
/// array root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum PlatformKind {
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
    /// Root reference type
    Object,
    /// Immutable string
    String,
    /// Typed reference (resolvable, but unsupported by the codec)
    TypedReference,
    /// Base of all value types
    ValueType,
    /// Base of all enumeration types
    Enum,
    /// Base of all delegate types
    MulticastDelegate,
    /// Root of all array types
    Array,
}

impl PlatformKind {
    /// The type name within the platform namespace.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            PlatformKind::Void => "Void",
            PlatformKind::Boolean => "Boolean",
            PlatformKind::Char => "Char",
            PlatformKind::I1 => "SByte",
            PlatformKind::U1 => "Byte",
            PlatformKind::I2 => "Int16",
            PlatformKind::U2 => "UInt16",
            PlatformKind::I4 => "Int32",
            PlatformKind::U4 => "UInt32",
            PlatformKind::I8 => "Int64",
            PlatformKind::U8 => "UInt64",
            PlatformKind::R4 => "Single",
            PlatformKind::R8 => "Double",
            PlatformKind::IntPtr => "IntPtr",
            PlatformKind::UIntPtr => "UIntPtr",
            PlatformKind::Object => "Object",
            PlatformKind::String => "String",
            PlatformKind::TypedReference => "TypedReference",
            PlatformKind::ValueType => "ValueType",
            PlatformKind::Enum => "Enum",
            PlatformKind::MulticastDelegate => "MulticastDelegate",
            PlatformKind::Array => "Array",
        }
    }

    /// The namespace all platform types share.
    #[must_use]
    pub const fn namespace() -> &'static str {
        "System"
    }

    /// Whether the type has value semantics.
    #[must_use]
    pub const fn is_value_type(&self) -> bool {
        !matches!(
            self,
            PlatformKind::Object
                | PlatformKind::String
                | PlatformKind::ValueType
                | PlatformKind::Enum
                | PlatformKind::MulticastDelegate
                | PlatformKind::Array
        )
    }

    /// Maps a backend element kind onto the catalogue.
    #[must_use]
    pub const fn from_element(element: ElementKind) -> PlatformKind {
        match element {
            ElementKind::Void => PlatformKind::Void,
            ElementKind::Boolean => PlatformKind::Boolean,
            ElementKind::Char => PlatformKind::Char,
            ElementKind::I1 => PlatformKind::I1,
            ElementKind::U1 => PlatformKind::U1,
            ElementKind::I2 => PlatformKind::I2,
            ElementKind::U2 => PlatformKind::U2,
            ElementKind::I4 => PlatformKind::I4,
            ElementKind::U4 => PlatformKind::U4,
            ElementKind::I8 => PlatformKind::I8,
            ElementKind::U8 => PlatformKind::U8,
            ElementKind::R4 => PlatformKind::R4,
            ElementKind::R8 => PlatformKind::R8,
            ElementKind::IntPtr => PlatformKind::IntPtr,
            ElementKind::UIntPtr => PlatformKind::UIntPtr,
            ElementKind::Object => PlatformKind::Object,
            ElementKind::String => PlatformKind::String,
            ElementKind::TypedReference => PlatformKind::TypedReference,
        }
    }

    /// Maps back to the backend element kind.
    #[must_use]
    pub const fn to_element(&self) -> Option<ElementKind> {
        match self {
            PlatformKind::Void => Some(ElementKind::Void),
            PlatformKind::Boolean => Some(ElementKind::Boolean),
            PlatformKind::Char => Some(ElementKind::Char),
            PlatformKind::I1 => Some(ElementKind::I1),
            PlatformKind::U1 => Some(ElementKind::U1),
            PlatformKind::I2 => Some(ElementKind::I2),
            PlatformKind::U2 => Some(ElementKind::U2),
            PlatformKind::I4 => Some(ElementKind::I4),
            PlatformKind::U4 => Some(ElementKind::U4),
            PlatformKind::I8 => Some(ElementKind::I8),
            PlatformKind::U8 => Some(ElementKind::U8),
            PlatformKind::R4 => Some(ElementKind::R4),
            PlatformKind::R8 => Some(ElementKind::R8),
            PlatformKind::IntPtr => Some(ElementKind::IntPtr),
            PlatformKind::UIntPtr => Some(ElementKind::UIntPtr),
            PlatformKind::Object => Some(ElementKind::Object),
            PlatformKind::String => Some(ElementKind::String),
            PlatformKind::TypedReference => Some(ElementKind::TypedReference),
            _ => None,
        }
    }
}

/// One interned symbol per platform kind, owned by a resolution pass.
pub struct PlatformTypes {
    symbols: Vec<(PlatformKind, TypeSymbolRc)>,
}

impl PlatformTypes {
    /// Builds the catalogue. Called once per pass; every `get` afterwards returns the
    /// same `Arc` for a given kind.
    #[must_use]
    pub fn new() -> Self {
        use strum::IntoEnumIterator;

        let symbols = PlatformKind::iter()
            .map(|kind| {
                let symbol = TypeSymbol::platform(kind);
                (kind, Arc::new(symbol))
            })
            .collect();
        PlatformTypes { symbols }
    }

    /// Returns the interned symbol for a platform kind.
    #[must_use]
    pub fn get(&self, kind: PlatformKind) -> TypeSymbolRc {
        // The catalogue is built from the same iteration order it is searched in.
        self.symbols
            .iter()
            .find(|(entry, _)| *entry == kind)
            .map(|(_, symbol)| symbol.clone())
            .expect("platform catalogue covers every kind")
    }

    /// Returns the interned symbol for a backend element kind.
    #[must_use]
    pub fn element(&self, element: ElementKind) -> TypeSymbolRc {
        self.get(PlatformKind::from_element(element))
    }

    /// Whether the given symbol is the platform symbol for `kind` from this catalogue.
    #[must_use]
    pub fn is_kind(&self, symbol: &TypeSymbolRc, kind: PlatformKind) -> bool {
        Arc::ptr_eq(symbol, &self.get(kind))
    }
}

impl Default for PlatformTypes {
    fn default() -> Self {
        PlatformTypes::new()
    }
}

impl std::fmt::Debug for PlatformTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformTypes")
            .field("count", &self.symbols.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_interns_one_symbol_per_kind() {
        let platform = PlatformTypes::new();
        let first = platform.get(PlatformKind::I4);
        let second = platform.get(PlatformKind::I4);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name, "Int32");
        assert_eq!(first.namespace, "System");
    }

    #[test]
    fn element_mapping_round_trips() {
        assert_eq!(
            PlatformKind::from_element(ElementKind::I4).to_element(),
            Some(ElementKind::I4)
        );
        assert_eq!(PlatformKind::Enum.to_element(), None);
    }

    #[test]
    fn value_semantics_classification() {
        assert!(PlatformKind::I4.is_value_type());
        assert!(PlatformKind::TypedReference.is_value_type());
        assert!(!PlatformKind::String.is_value_type());
        assert!(!PlatformKind::MulticastDelegate.is_value_type());
    }
}
