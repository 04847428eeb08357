//! The module extraction and generation pipelines.
//!
//! Extraction walks a foreign module's type table into the canonical object model,
//! decoding every method body along the way; generation walks the model back out,
//! creating empty shells for every declaration before filling bases, members and
//! bodies, and finally hands the finished row model to the backend for serialization.
//!
//! Both directions own one pass-scoped cache object - the [`crate::resolve::ResolveSession`]
//! on the way in, the [`Emitter`] on the way out - constructed at pass start and
//! discarded with it.
//!
//! # Main Functions
//! - [`extract_module`] - foreign module → [`ModuleModel`]
//! - [`generate_module`] / [`write_module`] - [`ModuleModel`] → foreign module
//!
//! # Examples
//!
//! ```rust
//! use cilbridge::backend::{MemoryBackend, ModuleBackend};
//! use cilbridge::pipeline::{extract_module, generate_module};
//!
//! let backend = MemoryBackend::new();
//! let module = backend.create_empty_module("empty");
//! let model = extract_module(&module)?;
//! let regenerated = generate_module(&model, &backend)?;
//! assert_eq!(regenerated.name, "empty");
//! # Ok::<(), cilbridge::Error>(())
//! ```

mod emit;
mod extract;
mod generate;

pub use emit::Emitter;
pub use extract::{extract_module, ModuleModel};
pub use generate::{generate_module, write_module};
