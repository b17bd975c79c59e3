//! Value expressions: literals, reads, unary and binary operators,
//! ternaries, casts.
//!
//! Boolean-valued operators materialize 0/1 on the stack; comparisons do
//! so through a branch over two fresh labels, short-circuit operators
//! through a duplicate-and-branch over one shared join label.

use quill_core::{BinOp, Category, CodegenError, Expr, FieldRef, Literal, PrimKind, Type, UnaryOp};

use crate::bytecode::{FieldRefData, Instruction, Opcode};
use crate::conversion::{ceiling, narrow_op};
use crate::emit::{binary_opcode, neg_opcode};

use super::{Generator, Result};

impl<'a> Generator<'a> {
    pub(crate) fn gen_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Int(v) => self.code.const_int(*v),
            Literal::Long(v) => self.code.const_long(*v),
            Literal::Float(v) => self.code.const_float(*v),
            Literal::Double(v) => self.code.const_double(*v),
            Literal::Bool(v) => self.code.const_bool(*v),
            Literal::Char(c) => self.code.const_int(*c as i32),
            Literal::Str(s) => self.code.const_str(s),
            Literal::Null => self.code.const_null(),
        }
    }

    pub(crate) fn gen_local_read(
        &mut self,
        e: &Expr,
        id: quill_core::LocalId,
        name: &str,
    ) -> Result<()> {
        let cat = self.category_of(e)?;
        let slot = self.slot(id, name, e.span)?;
        self.code.load_local(cat, slot);
        Ok(())
    }

    pub(crate) fn gen_field_read(&mut self, target: &Expr, field: &FieldRef) -> Result<()> {
        self.gen_expr(target)?;
        if field.is_static {
            // The receiver was only a qualifier; discard it unless it was
            // a bare class name, which emitted nothing.
            if !target.is_class_name() {
                self.code.pop(1);
            }
            self.code
                .push(Instruction::Field(Opcode::GetStatic, field_data(field)));
        } else {
            self.code
                .push(Instruction::Field(Opcode::GetField, field_data(field)));
        }
        Ok(())
    }

    pub(crate) fn gen_array_length(&mut self, target: &Expr) -> Result<()> {
        self.gen_expr(target)?;
        self.code.op(Opcode::ArrayLength);
        Ok(())
    }

    pub(crate) fn gen_element_read(&mut self, e: &Expr, array: &Expr, index: &Expr) -> Result<()> {
        self.gen_expr(array)?;
        self.gen_expr(index)?;
        self.code.array_load(&e.ty);
        Ok(())
    }

    pub(crate) fn gen_unary(&mut self, e: &Expr, op: UnaryOp, operand: &Expr) -> Result<()> {
        match op {
            UnaryOp::Plus => self.gen_expr(operand),
            UnaryOp::Neg => {
                self.gen_expr(operand)?;
                let cat = self.category_of(e)?;
                let neg = neg_opcode(cat).ok_or_else(|| CodegenError::TypeShape {
                    message: format!("negation applied to {}", e.ty),
                    span: e.span,
                })?;
                self.code.op(neg);
                Ok(())
            }
            UnaryOp::BitNot => {
                self.gen_expr(operand)?;
                match self.category_of(e)? {
                    Category::Int => {
                        self.code.op(Opcode::IConstM1);
                        self.code.op(Opcode::IXor);
                    }
                    Category::Long => {
                        self.code.const_long(-1);
                        self.code.op(Opcode::LXor);
                    }
                    _ => {
                        return Err(CodegenError::TypeShape {
                            message: format!("bitwise complement applied to {}", e.ty),
                            span: e.span,
                        });
                    }
                }
                Ok(())
            }
            UnaryOp::Not => {
                self.gen_expr(operand)?;
                self.code.op(Opcode::IConst1);
                self.code.op(Opcode::IXor);
                Ok(())
            }
        }
    }

    pub(crate) fn gen_binary(&mut self, e: &Expr, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<()> {
        if !op.is_boolean_result() {
            // Arithmetic and bitwise operands are brought to the
            // operator's result category, then one opcode finishes it. A
            // shift amount keeps its own category.
            let cat = self.category_of(e)?;
            self.gen_expr(lhs)?;
            self.convert(&lhs.ty, &e.ty);
            self.gen_expr(rhs)?;
            if !op.is_shift() {
                self.convert(&rhs.ty, &e.ty);
            }
            let selected = binary_opcode(op, cat).ok_or_else(|| CodegenError::TypeShape {
                message: format!("operator has no {cat:?} form"),
                span: e.span,
            })?;
            self.code.op(selected);
            return Ok(());
        }

        match op {
            BinOp::AndAnd | BinOp::OrOr => self.gen_short_circuit(op, lhs, rhs),
            _ => self.gen_comparison(e, op, lhs, rhs),
        }
    }

    /// `&&` / `||`: the left value decides whether the right side runs at
    /// all. The decisive value (false for `&&`, true for `||`) is kept as
    /// the result; otherwise it is discarded and the right value stands.
    fn gen_short_circuit(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<()> {
        let join = self.fresh_label();
        self.gen_expr(lhs)?;
        self.code.dup(1);
        let branch = if op == BinOp::AndAnd {
            Opcode::IfEq
        } else {
            Opcode::IfNe
        };
        self.code.branch(branch, join);
        self.code.pop(1);
        self.gen_expr(rhs)?;
        self.code.mark(join);
        Ok(())
    }

    /// Relational and equality operators: branch-compare, then materialize
    /// 0/1 over two fresh labels.
    fn gen_comparison(&mut self, e: &Expr, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<()> {
        let true_label = self.fresh_label();
        let end_label = self.fresh_label();

        let lhs_cat = lhs.ty.category();
        let rhs_cat = rhs.ty.category();
        let numeric = matches!((lhs_cat, rhs_cat), (Some(l), Some(r)) if l.is_numeric() && r.is_numeric());

        if numeric {
            let lcat = lhs_cat.unwrap_or(Category::Int);
            let rcat = rhs_cat.unwrap_or(Category::Int);
            let ceil = ceiling(lcat, rcat);
            self.gen_expr(lhs)?;
            self.convert_cat(lcat, ceil);
            self.gen_expr(rhs)?;
            self.convert_cat(rcat, ceil);
            match ceil {
                Category::Int => {
                    self.code.branch(int_compare_branch(op), true_label);
                }
                Category::Long => {
                    self.code.op(Opcode::LCmp);
                    self.code.branch(zero_compare_branch(op), true_label);
                }
                Category::Float => {
                    self.code.op(Opcode::FCmpG);
                    self.code.branch(zero_compare_branch(op), true_label);
                }
                Category::Double => {
                    self.code.op(Opcode::DCmpG);
                    self.code.branch(zero_compare_branch(op), true_label);
                }
                Category::Ref => unreachable!("numeric ceiling is never a reference"),
            }
        } else {
            // Reference comparison. A null-literal operand is not
            // evaluated: the null test consumes the other side alone. A
            // bare class name emits nothing either way.
            let lhs_null = lhs.is_null_literal();
            let rhs_null = rhs.is_null_literal();
            if !lhs_null {
                self.gen_expr(lhs)?;
            }
            if !rhs_null {
                self.gen_expr(rhs)?;
            }
            let branch = match (op, lhs_null || rhs_null) {
                (BinOp::Eq, true) => Opcode::IfNull,
                (BinOp::Ne, true) => Opcode::IfNonNull,
                (BinOp::Eq, false) => Opcode::IfACmpEq,
                (BinOp::Ne, false) => Opcode::IfACmpNe,
                _ => {
                    return Err(CodegenError::TypeShape {
                        message: format!("ordering comparison on {}", lhs.ty),
                        span: e.span,
                    });
                }
            };
            self.code.branch(branch, true_label);
        }

        self.code.op(Opcode::IConst0);
        self.code.goto(end_label);
        self.code.mark(true_label);
        self.code.op(Opcode::IConst1);
        self.code.mark(end_label);
        Ok(())
    }

    pub(crate) fn gen_instance_of(&mut self, value: &Expr, class: &str) -> Result<()> {
        self.gen_expr(value)?;
        self.code
            .push(Instruction::TypeRef(Opcode::InstanceOf, class.to_string()));
        Ok(())
    }

    pub(crate) fn gen_cast(&mut self, e: &Expr, inner: &Expr) -> Result<()> {
        self.gen_expr(inner)?;
        match &e.ty {
            // Narrowing to a sub-integer kind goes through the int
            // category first when the source is not already integral.
            Type::Prim(kind @ (PrimKind::Byte | PrimKind::Char | PrimKind::Short)) => {
                if let Some(from) = inner.ty.category()
                    && from != Category::Int
                {
                    self.convert_cat(from, Category::Int);
                }
                if let Some(narrow) = narrow_op(*kind) {
                    self.code.op(narrow);
                }
                Ok(())
            }
            Type::Prim(_) => {
                self.convert(&inner.ty, &e.ty);
                Ok(())
            }
            // Reference casts are compile-time assertions only.
            Type::Class(_) | Type::Array(_) | Type::Null => Ok(()),
            Type::Void => Err(CodegenError::TypeShape {
                message: "cast to void".to_string(),
                span: e.span,
            }),
        }
    }

    pub(crate) fn gen_ternary(
        &mut self,
        e: &Expr,
        cond: &Expr,
        then_val: &Expr,
        else_val: &Expr,
    ) -> Result<()> {
        let else_label = self.fresh_label();
        let end_label = self.fresh_label();
        self.gen_expr(cond)?;
        self.code.branch(Opcode::IfEq, else_label);
        self.gen_expr(then_val)?;
        self.convert(&then_val.ty, &e.ty);
        self.code.goto(end_label);
        self.code.mark(else_label);
        self.gen_expr(else_val)?;
        self.convert(&else_val.ty, &e.ty);
        self.code.mark(end_label);
        Ok(())
    }
}

pub(crate) fn field_data(field: &FieldRef) -> FieldRefData {
    FieldRefData {
        owner: field.owner.clone(),
        name: field.name.clone(),
        descriptor: field.ty.descriptor(),
    }
}

/// The fused compare-and-branch opcode for int-category operands.
fn int_compare_branch(op: BinOp) -> Opcode {
    match op {
        BinOp::Lt => Opcode::IfICmpLt,
        BinOp::Le => Opcode::IfICmpLe,
        BinOp::Gt => Opcode::IfICmpGt,
        BinOp::Ge => Opcode::IfICmpGe,
        BinOp::Eq => Opcode::IfICmpEq,
        _ => Opcode::IfICmpNe,
    }
}

/// The branch opcode applied to the -1/0/1 result of a cmp instruction.
fn zero_compare_branch(op: BinOp) -> Opcode {
    match op {
        BinOp::Lt => Opcode::IfLt,
        BinOp::Le => Opcode::IfLe,
        BinOp::Gt => Opcode::IfGt,
        BinOp::Ge => Opcode::IfGe,
        BinOp::Eq => Opcode::IfEq,
        _ => Opcode::IfNe,
    }
}
