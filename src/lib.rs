//! Quill
//!
//! The quill compiler's code-generation backend, packaged as a facade over
//! the workspace crates:
//!
//! - [`core`](quill_core): spans, errors, the type model, and the
//!   decorated AST the semantic analyzer hands over
//! - [`codegen`](quill_codegen): the two-pass backend producing per-class
//!   instruction streams for the assembler
//!
//! ```ignore
//! use quill::codegen::generate_unit;
//!
//! let artifacts = generate_unit(&classes)?;
//! for artifact in &artifacts {
//!     writer.write_class(artifact)?;
//! }
//! ```

pub use quill_codegen as codegen;
pub use quill_core as core;

pub use quill_codegen::{ClassArtifact, FieldInfo, RoutineCode, generate_unit};
pub use quill_core::CodegenError;
