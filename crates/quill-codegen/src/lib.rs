//! Quill code generator
//!
//! The two-pass backend of the quill compiler. It consumes the decorated
//! AST from `quill-core` and produces, per class, an ordered instruction
//! stream for the stack-based virtual machine together with the metadata
//! the container writer needs.
//!
//! ## Architecture
//!
//! - **Pass 1 (addresses)**: [`address`] assigns a stack slot to every
//!   parameter and local of a routine, reusing slots across sibling
//!   scopes.
//! - **Pass 2 (selection)**: [`gen`] walks the routine body once and emits
//!   instructions, driving the [`label`] allocator and the [`conversion`]
//!   rules; [`field_init`] injects field initialization at the two points
//!   the container format requires.
//!
//! ## Modules
//!
//! - [`bytecode`]: Opcode and instruction-stream types
//! - [`label`]: Symbolic jump targets
//! - [`address`]: Slot allocation (pass 1)
//! - [`conversion`]: Numeric promotion and conversion rules
//! - [`emit`]: Instruction buffer with form-selection helpers
//! - [`context`]: Per-traversal generator context
//! - [`gen`]: Statement and expression selection (pass 2)
//! - [`field_init`]: Field-initializer emission
//! - [`routine`]: Per-class driver and the artifact handed to the assembler
//! - [`builtins`]: Catalog of built-in members the front end resolves against
//! - [`stack`]: Stack-effect computation over emitted streams

pub mod address;
pub mod builtins;
pub mod bytecode;
pub mod context;
pub mod conversion;
pub mod emit;
pub mod field_init;
pub mod r#gen;
pub mod label;
pub mod routine;
pub mod stack;

pub use address::{AddressAllocator, AddressMap};
pub use bytecode::{Constant, FieldRefData, Instruction, MethodRefData, Opcode};
pub use context::GenContext;
pub use emit::CodeBuffer;
pub use r#gen::Generator;
pub use label::{Label, LabelAllocator};
pub use routine::{ClassArtifact, FieldInfo, RoutineCode, generate_class, generate_unit};
pub use stack::{compute_max_stack, final_depth};

// Re-export the error type for convenience, as callers match on it.
pub use quill_core::CodegenError;
