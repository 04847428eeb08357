//! The narrow interface to the foreign module backend.
//!
//! Binary parsing and final layout serialization live outside this crate; everything the
//! core consumes or produces crosses this boundary as structured rows. The boundary has
//! three parts:
//!
//! - [`Token`] - table-tagged handles addressing rows
//! - [`ForeignModule`] and its row types - the structured module view
//! - [`Op`]/[`ForeignInstruction`] - the flat per-method instruction stream
//!
//! The [`ModuleBackend`] trait is the service interface: read a module from disk, create
//! an empty one for generation, write a finished one back. [`MemoryBackend`] is the
//! in-process implementation used by tests and by callers that build modules
//! programmatically; the real binary backend lives with the embedding application.

mod instruction;
mod module;
mod opcodes;
mod token;

pub use instruction::{ForeignInstruction, ForeignOperand};
pub use module::{
    ElementKind, FieldAttributes, ForeignBody, ForeignFieldDef, ForeignGenericParam,
    ForeignMemberRef, ForeignMemberSig, ForeignMethodDef, ForeignMethodSig, ForeignMethodSpec,
    ForeignModule, ForeignRegion, ForeignScope, ForeignTypeDef, ForeignTypeRef, ForeignTypeSig,
    MethodAttributes, RegionKind, TypeAttributes, MODULE_PSEUDO_TYPE,
};
pub use opcodes::{FlowKind, Op, OpInfo, OperandKind, StackBehavior, EXTENDED_PREFIX};
pub use token::{TableKind, Token};

use std::path::Path;

use dashmap::DashMap;

use crate::Result;

/// Service interface to the external module reader/writer.
///
/// Implementations own all binary concerns; the core only ever exchanges
/// [`ForeignModule`] values through this trait.
pub trait ModuleBackend {
    /// Reads and structures the module stored at `path`.
    fn read_module(&self, path: &Path) -> Result<ForeignModule>;

    /// Creates an empty module shell with the given name.
    fn create_empty_module(&self, name: &str) -> ForeignModule;

    /// Serializes `module` to `path`.
    fn write_module(&self, module: &ForeignModule, path: &Path) -> Result<()>;
}

/// An in-process backend keeping written modules in memory, keyed by path.
///
/// Used by the test suites and by callers that assemble modules programmatically and
/// never touch disk. Reading a path that was never written is malformed input.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    modules: DashMap<String, ForeignModule>,
}

impl MemoryBackend {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Pre-loads a module under the given path, as if it had been written there.
    pub fn store(&self, path: &str, module: ForeignModule) {
        self.modules.insert(path.to_string(), module);
    }
}

impl ModuleBackend for MemoryBackend {
    fn read_module(&self, path: &Path) -> Result<ForeignModule> {
        self.modules
            .get(&path.display().to_string())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| malformed_error!("no module stored at {}", path.display()))
    }

    fn create_empty_module(&self, name: &str) -> ForeignModule {
        ForeignModule::new(name)
    }

    fn write_module(&self, module: &ForeignModule, path: &Path) -> Result<()> {
        self.modules
            .insert(path.display().to_string(), module.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_round_trips_modules() {
        let backend = MemoryBackend::new();
        let module = backend.create_empty_module("probe");
        backend
            .write_module(&module, Path::new("probe.dll"))
            .unwrap();

        let loaded = backend.read_module(Path::new("probe.dll")).unwrap();
        assert_eq!(loaded.name, "probe");
        assert!(backend.read_module(Path::new("missing.dll")).is_err());
    }
}
