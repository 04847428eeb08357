// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![deny(unsafe_code)]

//! # cilbridge
//!
//! A bidirectional transformation toolchain for CIL (Common Intermediate Language)
//! bytecode. `cilbridge` loads compiled binary modules through a narrow backend
//! interface, reconstructs a normalized object model - types, methods, fields and a
//! canonical instruction set - and can re-assemble variable-based (three-address)
//! method bodies back into stack form and into a fresh module, round-tripping
//! semantics exactly.
//!
//! ## Features
//!
//! - **Canonical instruction codec** - around 180 concrete stack-machine opcode forms
//!   collapse onto a closed union of ~30 canonical kinds, and lower back out, with
//!   overflow, signedness and branch semantics preserved exactly
//! - **Generic-aware symbol interning** - structurally equal handles resolve to the
//!   identical symbol within a pass; the generic owner/parameter recursion terminates
//!   through a memoized fixed point
//! - **Stack reconstruction** - three-address bodies are lowered onto the evaluation
//!   stack with the operand depth simulated and verified at every control-flow merge
//! - **Round-trip pipelines** - extraction and generation walk whole modules in and
//!   out of the object model through shell-first, nesting-safe traversals
//!
//! ## Quick Start
//!
//! ```rust
//! use cilbridge::backend::{MemoryBackend, ModuleBackend};
//! use cilbridge::pipeline::{extract_module, generate_module};
//!
//! let backend = MemoryBackend::new();
//! let module = backend.create_empty_module("demo");
//!
//! let model = extract_module(&module)?;
//! let regenerated = generate_module(&model, &backend)?;
//! assert_eq!(regenerated.name, "demo");
//! # Ok::<(), cilbridge::Error>(())
//! ```
//!
//! ### Assembling Three-Address Code
//!
//! ```rust
//! use cilbridge::assemble::assemble;
//! use cilbridge::model::{TacBody, TacStatement, TacValue, VariableSlot};
//!
//! let tac = TacBody::from_statements(vec![
//!     TacStatement::Assign {
//!         dest: VariableSlot::local(0),
//!         value: TacValue::i4(2),
//!     },
//!     TacStatement::Return {
//!         value: Some(TacValue::local(0)),
//!     },
//! ]);
//!
//! let body = assemble(&tac)?;
//! assert_eq!(body.max_stack, 1);
//! # Ok::<(), cilbridge::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Data flows in one direction per pass:
//!
//! ```text
//! binary module → extraction → object model (bytecode bodies)
//!              → [external disassembler] → three-address bodies
//!              → [external analyses]     → transformed bodies
//!              → assembler → bytecode bodies → generation → binary module
//! ```
//!
//! Binary parsing and layout serialization stay outside this crate, behind the
//! [`backend::ModuleBackend`] trait; the stack→variable direction and the analyses over
//! it are external collaborators as well. Everything is single-threaded and
//! call-and-return: one module's dependency closure is processed start-to-finish by one
//! pass, and all pass-scoped caches die with the pass.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilbridge::prelude::*;
///
/// let backend = MemoryBackend::new();
/// let module = backend.create_empty_module("demo");
/// let model = extract_module(&module)?;
/// # let _ = model;
/// # Ok::<(), cilbridge::Error>(())
/// ```
pub mod prelude;

/// The narrow interface to the foreign module backend.
///
/// Structured rows ([`backend::ForeignModule`]), table-tagged handles
/// ([`backend::Token`]), the foreign opcode set ([`backend::Op`]) and the
/// [`backend::ModuleBackend`] service trait. [`backend::MemoryBackend`] is the
/// in-process implementation used by tests and programmatic callers.
pub mod backend;

/// The canonical object model.
///
/// Platform types ([`model::PlatformTypes`]), interned symbols
/// ([`model::TypeSymbol`], [`model::MethodSymbol`], [`model::FieldSymbol`]), the
/// canonical instruction set ([`model::CodeInstruction`], [`model::CodeOp`]), the
/// three-address form ([`model::TacBody`]) and the body lifecycle container
/// ([`model::MethodBody`]).
pub mod model;

/// Reference resolution and interning.
///
/// One pass-scoped [`resolve::ResolveSession`] maps every foreign handle onto a
/// canonical, de-duplicated symbol and breaks the generic owner/parameter recursion
/// through a memoized fixed point.
pub mod resolve;

/// The instruction codec.
///
/// [`codec::decode_stream`]/[`codec::decode_body`] collapse foreign instructions onto
/// the canonical set; [`codec::encode_stream`] lowers them back with up-front physical
/// identity and a branch patch pass; [`codec::compute_max_stack`] verifies a canonical
/// body's operand stack.
pub mod codec;

/// The stack-reconstruction assembler.
///
/// [`assemble::assemble`] lowers a three-address body onto the evaluation stack,
/// verifying depth agreement at every merge point and balancing the stack before
/// returns.
pub mod assemble;

/// The module extraction and generation pipelines.
///
/// [`pipeline::extract_module`] walks a foreign module into a
/// [`pipeline::ModuleModel`]; [`pipeline::generate_module`] walks it back out,
/// shells first.
pub mod pipeline;

/// `cilbridge` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always
/// [`Error`]. Used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `cilbridge` Error type
///
/// The main error type for all operations in this crate. Every failure is
/// deterministic and fatal for the pass that raised it; see [`Error`] for the
/// category breakdown.
pub use error::Error;
