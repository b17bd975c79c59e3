//! Field-initializer emission.
//!
//! Instance field initializers run at the start of every constructor body,
//! immediately after any explicit `this(...)`/`super(...)` call; static
//! field initializers run as the first step of the static initializer.
//! Within each group, fields initialize in declaration order, each value
//! converted to its field's type.

use quill_core::{ClassDecl, FieldDecl};

use crate::bytecode::{FieldRefData, Instruction, Opcode};
use crate::r#gen::{Generator, Result};

fn field_data(class: &ClassDecl, field: &FieldDecl) -> FieldRefData {
    FieldRefData {
        owner: class.name.clone(),
        name: field.name.clone(),
        descriptor: field.ty.descriptor(),
    }
}

impl<'a> Generator<'a> {
    /// Emit the instance field initializers of `class`.
    pub fn emit_instance_field_inits(&mut self, class: &ClassDecl) -> Result<()> {
        for field in &class.fields {
            if field.flags.is_static() {
                continue;
            }
            let Some(init) = &field.init else {
                continue;
            };
            self.code.load_this();
            self.gen_expr(init)?;
            self.convert(&init.ty, &field.ty);
            self.code
                .push(Instruction::Field(Opcode::PutField, field_data(class, field)));
        }
        Ok(())
    }

    /// Emit the static field initializers of `class`.
    pub fn emit_static_field_inits(&mut self, class: &ClassDecl) -> Result<()> {
        for field in &class.fields {
            if !field.flags.is_static() {
                continue;
            }
            let Some(init) = &field.init else {
                continue;
            };
            self.gen_expr(init)?;
            self.convert(&init.ty, &field.ty);
            self.code
                .push(Instruction::Field(Opcode::PutStatic, field_data(class, field)));
        }
        Ok(())
    }
}

/// Whether the class needs a static initializer routine at all: an
/// explicit block, or any static field with an initializer.
pub fn needs_static_init(class: &ClassDecl) -> bool {
    class.static_init.is_some()
        || class
            .fields
            .iter()
            .any(|f| f.flags.is_static() && f.init.is_some())
}
