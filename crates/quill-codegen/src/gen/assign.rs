//! Assignment and increment/decrement.
//!
//! Targets come in four storage kinds (local, static field, instance
//! field, array element). Compound assignment re-derives the current
//! value by duplicating the already-computed reference(s); when the
//! assignment's own value is consumed by an enclosing expression, it is
//! duplicated beneath those references before the store:
//!
//! - instance field target: duplicate under one reference
//! - element target: duplicate under the array-reference/index pair
//! - local or static field target: plain duplicate
//!
//! Wide values use the doubled duplicate forms throughout.

use quill_core::{AssignOp, Category, CodegenError, Expr, ExprKind, FieldRef, IncDecOp, Type};

use crate::bytecode::{Instruction, Opcode};
use crate::emit::binary_opcode;

use super::expr::field_data;
use super::{Generator, Result};

/// Storage kind of an assignment target, after its references (if any)
/// have been pushed.
enum Target<'t> {
    Local { slot: u16, cat: Category },
    StaticField(&'t FieldRef),
    InstanceField(&'t FieldRef),
    Element { elem: &'t Type },
}

impl<'a> Generator<'a> {
    /// Lower `target op= value`. When `value_used`, the assigned value is
    /// left on the stack for the enclosing expression; otherwise the net
    /// stack effect is zero.
    pub(crate) fn gen_assign(
        &mut self,
        e: &Expr,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        value_used: bool,
    ) -> Result<()> {
        let tgt = self.eval_target_refs(target)?;

        // Compound operators re-read the current value through the
        // references just pushed.
        if op != AssignOp::Assign {
            match &tgt {
                Target::Local { slot, cat } => self.code.load_local(*cat, *slot),
                Target::StaticField(field) => self
                    .code
                    .push(Instruction::Field(Opcode::GetStatic, field_data(field))),
                Target::InstanceField(field) => {
                    self.code.dup(1);
                    self.code
                        .push(Instruction::Field(Opcode::GetField, field_data(field)));
                }
                Target::Element { elem } => {
                    self.code.op(Opcode::Dup2);
                    self.code.array_load(elem);
                }
            }
        }

        self.gen_expr(value)?;
        // The right side is brought to the assignment's result type,
        // except that a shift amount is never promoted against the left.
        if !op.is_shift() {
            self.convert(&value.ty, &e.ty);
        }

        if let Some(bin) = op.binary() {
            let cat = self.category_of(e)?;
            let selected = binary_opcode(bin, cat).ok_or_else(|| CodegenError::TypeShape {
                message: format!("compound operator has no {cat:?} form"),
                span: e.span,
            })?;
            self.code.op(selected);
        }

        if value_used {
            let width = e.ty.width();
            match &tgt {
                Target::Local { .. } | Target::StaticField(_) => self.code.dup(width),
                Target::InstanceField(_) => self.code.dup_under_one(width),
                Target::Element { .. } => self.code.dup_under_two(width),
            }
        }

        match tgt {
            Target::Local { slot, cat } => self.code.store_local(cat, slot),
            Target::StaticField(field) => self
                .code
                .push(Instruction::Field(Opcode::PutStatic, field_data(field))),
            Target::InstanceField(field) => self
                .code
                .push(Instruction::Field(Opcode::PutField, field_data(field))),
            Target::Element { elem } => self.code.array_store(elem),
        }
        Ok(())
    }

    /// Lower `++`/`--` on a local, field, or element. When the value is
    /// discarded and the target is an int-category local, the combined
    /// in-place increment replaces the whole load/add/store sequence.
    pub(crate) fn gen_inc_dec(
        &mut self,
        e: &Expr,
        op: IncDecOp,
        target: &Expr,
        value_used: bool,
    ) -> Result<()> {
        let cat = self.category_of(e)?;
        let width = cat.width();

        if let ExprKind::Local { id, name } = &target.kind {
            let slot = self.slot(*id, name, target.span)?;
            if cat == Category::Int {
                let delta = op.delta();
                if !value_used {
                    self.code.push(Instruction::Inc { slot, delta });
                } else if op.is_pre() {
                    self.code.push(Instruction::Inc { slot, delta });
                    self.code.load_local(cat, slot);
                } else {
                    self.code.load_local(cat, slot);
                    self.code.push(Instruction::Inc { slot, delta });
                }
                return Ok(());
            }
            // Wide and floating locals take the general shape.
            self.code.load_local(cat, slot);
            if value_used && !op.is_pre() {
                self.code.dup(width);
            }
            self.apply_unit_step(e, op, cat)?;
            if value_used && op.is_pre() {
                self.code.dup(width);
            }
            self.code.store_local(cat, slot);
            return Ok(());
        }

        match &target.kind {
            ExprKind::Field { target: recv, field } if field.is_static => {
                self.gen_expr(recv)?;
                if !recv.is_class_name() {
                    self.code.pop(1);
                }
                self.code
                    .push(Instruction::Field(Opcode::GetStatic, field_data(field)));
                if value_used && !op.is_pre() {
                    self.code.dup(width);
                }
                self.apply_unit_step(e, op, cat)?;
                if value_used && op.is_pre() {
                    self.code.dup(width);
                }
                self.code
                    .push(Instruction::Field(Opcode::PutStatic, field_data(field)));
                Ok(())
            }
            ExprKind::Field { target: recv, field } => {
                self.gen_expr(recv)?;
                self.code.dup(1);
                self.code
                    .push(Instruction::Field(Opcode::GetField, field_data(field)));
                if value_used && !op.is_pre() {
                    self.code.dup_under_one(width);
                }
                self.apply_unit_step(e, op, cat)?;
                if value_used && op.is_pre() {
                    self.code.dup_under_one(width);
                }
                self.code
                    .push(Instruction::Field(Opcode::PutField, field_data(field)));
                Ok(())
            }
            ExprKind::Element { array, index } => {
                self.gen_expr(array)?;
                self.gen_expr(index)?;
                self.code.op(Opcode::Dup2);
                self.code.array_load(&e.ty);
                if value_used && !op.is_pre() {
                    self.code.dup_under_two(width);
                }
                self.apply_unit_step(e, op, cat)?;
                if value_used && op.is_pre() {
                    self.code.dup_under_two(width);
                }
                self.code.array_store(&e.ty);
                Ok(())
            }
            _ => Err(CodegenError::InvalidAssignTarget { span: target.span }),
        }
    }

    /// Push the references an assignment target needs and classify its
    /// storage kind. A static field's receiver is discarded immediately
    /// unless it was a bare class name (which emitted nothing).
    fn eval_target_refs<'t>(&mut self, target: &'t Expr) -> Result<Target<'t>> {
        match &target.kind {
            ExprKind::Local { id, name } => {
                let slot = self.slot(*id, name, target.span)?;
                let cat = self.category_of(target)?;
                Ok(Target::Local { slot, cat })
            }
            ExprKind::Field { target: recv, field } => {
                self.gen_expr(recv)?;
                if field.is_static {
                    if !recv.is_class_name() {
                        self.code.pop(1);
                    }
                    Ok(Target::StaticField(field))
                } else {
                    Ok(Target::InstanceField(field))
                }
            }
            ExprKind::Element { array, index } => {
                self.gen_expr(array)?;
                self.gen_expr(index)?;
                Ok(Target::Element { elem: &target.ty })
            }
            _ => Err(CodegenError::InvalidAssignTarget { span: target.span }),
        }
    }

    /// The unit constant of the value's category followed by add or
    /// subtract.
    fn apply_unit_step(&mut self, e: &Expr, op: IncDecOp, cat: Category) -> Result<()> {
        self.code.const_unit(cat);
        let bin = if op.delta() > 0 {
            quill_core::BinOp::Add
        } else {
            quill_core::BinOp::Sub
        };
        let selected = binary_opcode(bin, cat).ok_or_else(|| CodegenError::TypeShape {
            message: format!("increment applied to {}", e.ty),
            span: e.span,
        })?;
        self.code.op(selected);
        Ok(())
    }
}
