//! Instruction selection (pass 2).
//!
//! [`Generator`] walks a routine body once and appends instructions to its
//! [`CodeBuffer`]. Dispatch is an exhaustive `match` over the closed
//! statement and expression enums, so every node kind is statically known
//! to be handled. The traversal owns a [`GenContext`] (enclosing class,
//! break/continue targets) that is saved and restored around nested
//! constructs; whether an expression's value is consumed is threaded as an
//! explicit parameter where it matters (assignment chaining,
//! increment/decrement).
//!
//! Invariant: every expression leaves exactly `width(type)` values on the
//! operand stack; every statement leaves the depth unchanged.

mod assign;
mod call;
mod expr;
mod stmt;

pub use call::INIT_NAME;

use quill_core::{Category, CodegenError, Expr, ExprKind, Span, Stmt};

use crate::address::AddressMap;
use crate::context::GenContext;
use crate::conversion::convert_op;
use crate::emit::CodeBuffer;
use crate::label::{Label, LabelAllocator};

pub(crate) type Result<T> = std::result::Result<T, CodegenError>;

/// Generates the instruction stream for one routine.
pub struct Generator<'a> {
    /// Unit-wide label allocator.
    labels: &'a LabelAllocator,
    /// Slot assignments from pass 1 for this routine.
    addrs: &'a AddressMap,
    /// The stream under construction.
    pub(crate) code: CodeBuffer,
    /// Traversal context.
    pub(crate) ctx: GenContext,
}

impl<'a> Generator<'a> {
    /// Create a generator for one routine of the named class.
    pub fn new(labels: &'a LabelAllocator, addrs: &'a AddressMap, class_name: &str) -> Self {
        Self {
            labels,
            addrs,
            code: CodeBuffer::new(),
            ctx: GenContext::new(class_name),
        }
    }

    /// Finish and return the instruction stream.
    pub fn finish(self) -> Vec<crate::bytecode::Instruction> {
        self.code.finish()
    }

    /// The instructions emitted so far.
    pub fn code(&self) -> &[crate::bytecode::Instruction] {
        self.code.code()
    }

    /// Generate one statement. Net stack effect: zero.
    pub fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.gen_stmt(s)?;
                }
                Ok(())
            }
            Stmt::LocalDecl { id, name, ty, init } => self.gen_local_decl(*id, name, ty, init),
            Stmt::Expr(e) => self.gen_expr_stat(e),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.gen_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body } => self.gen_while(cond, body),
            Stmt::DoWhile { body, cond } => self.gen_do_while(body, cond),
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => self.gen_for(init, cond.as_ref(), update, body),
            Stmt::Switch { selector, groups } => self.gen_switch(selector, groups),
            Stmt::Break { span } => self.gen_break(*span),
            Stmt::Continue { span } => self.gen_continue(*span),
            Stmt::Return { value } => self.gen_return(value.as_ref()),
        }
    }

    /// Generate one expression, leaving `width(type)` values on the stack.
    pub fn gen_expr(&mut self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Literal(lit) => {
                self.gen_literal(lit);
                Ok(())
            }
            ExprKind::Local { id, name } => self.gen_local_read(e, *id, name),
            // A bare class name only qualifies a static member; it puts
            // nothing on the stack.
            ExprKind::ClassName { .. } => Ok(()),
            ExprKind::This | ExprKind::Super => {
                self.code.load_this();
                Ok(())
            }
            ExprKind::Field { target, field } => self.gen_field_read(target, field),
            ExprKind::ArrayLength { target } => self.gen_array_length(target),
            ExprKind::Element { array, index } => self.gen_element_read(e, array, index),
            ExprKind::Unary { op, operand } => self.gen_unary(e, *op, operand),
            ExprKind::IncDec { op, target } => self.gen_inc_dec(e, *op, target, true),
            ExprKind::Binary { op, lhs, rhs } => self.gen_binary(e, *op, lhs, rhs),
            ExprKind::InstanceOf { value, class } => self.gen_instance_of(value, class),
            ExprKind::Assign { op, target, value } => {
                self.gen_assign(e, *op, target, value, true)
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.gen_call(receiver.as_deref(), method, args),
            ExprKind::New { class, ctor, args } => self.gen_new(class, ctor, args),
            ExprKind::NewArray { elem, len } => self.gen_new_array(elem, len),
            ExprKind::Cast { expr } => self.gen_cast(e, expr),
            ExprKind::Ternary {
                cond,
                then_val,
                else_val,
            } => self.gen_ternary(e, cond, then_val, else_val),
        }
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    /// Issue a fresh label.
    pub(crate) fn fresh_label(&self) -> Label {
        self.labels.fresh()
    }

    /// The slot assigned to a local.
    pub(crate) fn slot(&self, id: quill_core::LocalId, name: &str, span: Span) -> Result<u16> {
        self.addrs.slot(id, name, span)
    }

    /// The computation category of a value expression.
    pub(crate) fn category_of(&self, e: &Expr) -> Result<Category> {
        e.ty.category().ok_or_else(|| CodegenError::TypeShape {
            message: "void expression used as a value".to_string(),
            span: e.span,
        })
    }

    /// Emit the conversion from one value type to another, if their
    /// categories differ. Reference and boolean values never convert.
    pub(crate) fn convert(&mut self, from: &quill_core::Type, to: &quill_core::Type) {
        if let (Some(f), Some(t)) = (from.category(), to.category())
            && let Some(op) = convert_op(f, t)
        {
            self.code.op(op);
        }
    }

    /// Emit the conversion between two categories, if they differ.
    pub(crate) fn convert_cat(&mut self, from: Category, to: Category) {
        if let Some(op) = convert_op(from, to) {
            self.code.op(op);
        }
    }
}

// =============================================================================
// Test fixtures shared by the gen submodules
// =============================================================================
