//! Statement lowering.
//!
//! Control flow lowers to fresh label pairs/triples per construct
//! instance. Loop and switch entry installs break/continue targets on the
//! context, restoring the previous ones on exit so nesting composes at any
//! depth.

use std::collections::BTreeMap;

use quill_core::{CaseLabel, CodegenError, Expr, ExprKind, Span, Stmt, SwitchGroup, Type};

use crate::bytecode::{Instruction, Opcode};
use crate::label::Label;

use super::{Generator, Result};

impl<'a> Generator<'a> {
    pub(crate) fn gen_local_decl(
        &mut self,
        id: quill_core::LocalId,
        name: &str,
        ty: &Type,
        init: &Option<Expr>,
    ) -> Result<()> {
        // A declaration without an initializer reserves its slot and emits
        // nothing.
        let Some(init) = init else {
            return Ok(());
        };
        self.gen_expr(init)?;
        self.convert(&init.ty, ty);
        let slot = self.slot(id, name, init.span)?;
        let cat = ty.category().ok_or_else(|| CodegenError::TypeShape {
            message: format!("local '{name}' declared void"),
            span: init.span,
        })?;
        self.code.store_local(cat, slot);
        Ok(())
    }

    /// An expression in statement position: evaluate, then drop whatever
    /// value it left. Assignments and increments manage their own stack
    /// discipline; everything else pops its result width (nothing for a
    /// call with no return value).
    pub(crate) fn gen_expr_stat(&mut self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Assign { op, target, value } => {
                self.gen_assign(e, *op, target, value, false)
            }
            ExprKind::IncDec { op, target } => self.gen_inc_dec(e, *op, target, false),
            _ => {
                self.gen_expr(e)?;
                let width = e.ty.width();
                if width > 0 {
                    self.code.pop(width);
                }
                Ok(())
            }
        }
    }

    pub(crate) fn gen_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<()> {
        match else_branch {
            None => {
                let end = self.fresh_label();
                self.gen_expr(cond)?;
                self.code.branch(Opcode::IfEq, end);
                self.gen_stmt(then_branch)?;
                self.code.mark(end);
            }
            Some(els) => {
                let else_label = self.fresh_label();
                let end = self.fresh_label();
                self.gen_expr(cond)?;
                self.code.branch(Opcode::IfEq, else_label);
                self.gen_stmt(then_branch)?;
                self.code.goto(end);
                self.code.mark(else_label);
                self.gen_stmt(els)?;
                self.code.mark(end);
            }
        }
        Ok(())
    }

    pub(crate) fn gen_while(&mut self, cond: &Expr, body: &Stmt) -> Result<()> {
        let top = self.fresh_label();
        let end = self.fresh_label();
        let saved = self.ctx.enter_loop(top, end);
        self.code.mark(top);
        self.gen_expr(cond)?;
        self.code.branch(Opcode::IfEq, end);
        self.gen_stmt(body)?;
        self.code.goto(top);
        self.code.mark(end);
        self.ctx.exit_loop(saved);
        Ok(())
    }

    pub(crate) fn gen_do_while(&mut self, body: &Stmt, cond: &Expr) -> Result<()> {
        let top = self.fresh_label();
        let continue_label = self.fresh_label();
        let end = self.fresh_label();
        let saved = self.ctx.enter_loop(continue_label, end);
        self.code.mark(top);
        self.gen_stmt(body)?;
        // A continue re-tests the condition rather than re-entering the
        // body.
        self.code.mark(continue_label);
        self.gen_expr(cond)?;
        self.code.branch(Opcode::IfNe, top);
        self.code.mark(end);
        self.ctx.exit_loop(saved);
        Ok(())
    }

    pub(crate) fn gen_for(
        &mut self,
        init: &[Stmt],
        cond: Option<&Expr>,
        update: &[Stmt],
        body: &Stmt,
    ) -> Result<()> {
        for s in init {
            self.gen_stmt(s)?;
        }
        let top = self.fresh_label();
        let continue_label = self.fresh_label();
        let end = self.fresh_label();
        let saved = self.ctx.enter_loop(continue_label, end);
        self.code.mark(top);
        if let Some(cond) = cond {
            self.gen_expr(cond)?;
            self.code.branch(Opcode::IfEq, end);
        }
        self.gen_stmt(body)?;
        self.code.mark(continue_label);
        for s in update {
            self.gen_stmt(s)?;
        }
        self.code.goto(top);
        self.code.mark(end);
        self.ctx.exit_loop(saved);
        Ok(())
    }

    pub(crate) fn gen_switch(&mut self, selector: &Expr, groups: &[SwitchGroup]) -> Result<()> {
        self.gen_expr(selector)?;

        let end = self.fresh_label();
        let saved = self.ctx.enter_switch(end);

        // One shared label per group; every case constant maps to its
        // group's label in the sorted dispatch table.
        let mut cases: BTreeMap<i64, Label> = BTreeMap::new();
        let mut default_label: Option<Label> = None;
        let mut group_labels: Vec<Label> = Vec::with_capacity(groups.len());
        for group in groups {
            if group.labels.is_empty() {
                self.ctx.exit_switch(saved);
                return Err(CodegenError::EmptySwitchGroup { span: group.span });
            }
            let label = self.fresh_label();
            group_labels.push(label);
            for case in &group.labels {
                match case {
                    CaseLabel::Value(v) => {
                        cases.insert(*v, label);
                    }
                    CaseLabel::Default => default_label = Some(label),
                }
            }
        }

        // An unmatched selector falls through to the default group, or
        // straight past the switch when there is none.
        self.code.push(Instruction::Switch {
            cases,
            default: default_label.unwrap_or(end),
        });

        for (group, label) in groups.iter().zip(group_labels) {
            self.code.mark(label);
            for s in &group.body {
                self.gen_stmt(s)?;
            }
        }

        self.code.mark(end);
        self.ctx.exit_switch(saved);
        Ok(())
    }

    pub(crate) fn gen_break(&mut self, span: Span) -> Result<()> {
        let target = self
            .ctx
            .break_label
            .ok_or(CodegenError::NoBreakTarget { span })?;
        self.code.goto(target);
        Ok(())
    }

    pub(crate) fn gen_continue(&mut self, span: Span) -> Result<()> {
        let target = self
            .ctx
            .continue_label
            .ok_or(CodegenError::NoContinueTarget { span })?;
        self.code.goto(target);
        Ok(())
    }

    pub(crate) fn gen_return(&mut self, value: Option<&Expr>) -> Result<()> {
        match value {
            Some(v) => {
                self.gen_expr(v)?;
                self.code.ret(&v.ty);
            }
            None => self.code.ret(&Type::Void),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use quill_core::{
        AssignOp, BinOp, CaseLabel, Expr, ExprKind, IncDecOp, LocalId, Span, Stmt, SwitchGroup,
        Type,
    };

    use crate::bytecode::{Instruction, Opcode};
    use crate::label::Label;

    fn expr_stat(e: Expr) -> Stmt {
        Stmt::Expr(e)
    }

    fn lt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op: BinOp::Lt,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Type::boolean(),
        )
    }

    #[test]
    fn if_without_else_uses_one_label() {
        let addrs = static_locals(&[(0, Type::boolean()), (1, Type::int())]);
        let stmt = Stmt::If {
            cond: local(0, Type::boolean()),
            then_branch: Box::new(expr_stat(Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(int_local(1)),
                    value: Box::new(int_lit(1)),
                },
                Type::int(),
            ))),
            else_branch: None,
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Op(Opcode::ILoad0),
                Instruction::Branch(Opcode::IfEq, Label(0)),
                Instruction::Op(Opcode::IConst1),
                Instruction::Op(Opcode::IStore1),
                Instruction::Mark(Label(0)),
            ]
        );
    }

    #[test]
    fn if_else_jumps_over_the_else_branch() {
        let addrs = static_locals(&[(0, Type::boolean())]);
        let stmt = Stmt::If {
            cond: local(0, Type::boolean()),
            then_branch: Box::new(Stmt::Block(vec![])),
            else_branch: Some(Box::new(Stmt::Block(vec![]))),
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Op(Opcode::ILoad0),
                Instruction::Branch(Opcode::IfEq, Label(0)),
                Instruction::Branch(Opcode::Goto, Label(1)),
                Instruction::Mark(Label(0)),
                Instruction::Mark(Label(1)),
            ]
        );
    }

    #[test]
    fn while_shape_and_break_continue_targets() {
        let addrs = static_locals(&[(0, Type::boolean())]);
        let stmt = Stmt::While {
            cond: local(0, Type::boolean()),
            body: Box::new(Stmt::Block(vec![
                Stmt::Continue {
                    span: Span::default(),
                },
                Stmt::Break {
                    span: Span::default(),
                },
            ])),
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Mark(Label(0)),
                Instruction::Op(Opcode::ILoad0),
                Instruction::Branch(Opcode::IfEq, Label(1)),
                // continue targets the top, break the end
                Instruction::Branch(Opcode::Goto, Label(0)),
                Instruction::Branch(Opcode::Goto, Label(1)),
                Instruction::Branch(Opcode::Goto, Label(0)),
                Instruction::Mark(Label(1)),
            ]
        );
    }

    #[test]
    fn do_while_branches_back_on_true() {
        let addrs = static_locals(&[(0, Type::boolean())]);
        let stmt = Stmt::DoWhile {
            body: Box::new(Stmt::Block(vec![])),
            cond: local(0, Type::boolean()),
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Mark(Label(0)),
                Instruction::Mark(Label(1)),
                Instruction::Op(Opcode::ILoad0),
                Instruction::Branch(Opcode::IfNe, Label(0)),
                Instruction::Mark(Label(2)),
            ]
        );
    }

    #[test]
    fn for_loop_shape() {
        // for (i = 0; i < 3; i++) ;
        let addrs = static_locals(&[(0, Type::int())]);
        let stmt = Stmt::For {
            init: vec![expr_stat(Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(int_local(0)),
                    value: Box::new(int_lit(0)),
                },
                Type::int(),
            ))],
            cond: Some(lt(int_local(0), int_lit(3))),
            update: vec![expr_stat(Expr::new(
                ExprKind::IncDec {
                    op: IncDecOp::PostInc,
                    target: Box::new(int_local(0)),
                },
                Type::int(),
            ))],
            body: Box::new(Stmt::Block(vec![])),
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        assert_eq!(
            code,
            vec![
                // init
                Instruction::Op(Opcode::IConst0),
                Instruction::Op(Opcode::IStore0),
                // top
                Instruction::Mark(Label(0)),
                // condition: i < 3, branch to end when false
                Instruction::Op(Opcode::ILoad0),
                Instruction::Op(Opcode::IConst3),
                Instruction::Branch(Opcode::IfICmpLt, Label(3)),
                Instruction::Op(Opcode::IConst0),
                Instruction::Branch(Opcode::Goto, Label(4)),
                Instruction::Mark(Label(3)),
                Instruction::Op(Opcode::IConst1),
                Instruction::Mark(Label(4)),
                Instruction::Branch(Opcode::IfEq, Label(2)),
                // continue label, then update
                Instruction::Mark(Label(1)),
                Instruction::Inc { slot: 0, delta: 1 },
                Instruction::Branch(Opcode::Goto, Label(0)),
                Instruction::Mark(Label(2)),
            ]
        );
    }

    #[test]
    fn switch_collects_sorted_cases_and_shares_group_labels() {
        let addrs = static_locals(&[(0, Type::int())]);
        let stmt = Stmt::Switch {
            selector: int_local(0),
            groups: vec![
                SwitchGroup {
                    labels: vec![CaseLabel::Value(7), CaseLabel::Value(2)],
                    body: vec![Stmt::Break {
                        span: Span::default(),
                    }],
                    span: Span::default(),
                },
                SwitchGroup {
                    labels: vec![CaseLabel::Default],
                    body: vec![],
                    span: Span::default(),
                },
            ],
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        // Selector first, then the dispatch over the sorted mapping.
        assert_eq!(code[0], Instruction::Op(Opcode::ILoad0));
        let Instruction::Switch { cases, default } = &code[1] else {
            panic!("expected switch dispatch, got {:?}", code[1]);
        };
        let pairs: Vec<(i64, Label)> = cases.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, vec![(2, Label(1)), (7, Label(1))]);
        assert_eq!(*default, Label(2));
        assert_eq!(
            code[2..],
            [
                Instruction::Mark(Label(1)),
                // break inside the switch targets its end label
                Instruction::Branch(Opcode::Goto, Label(0)),
                Instruction::Mark(Label(2)),
                Instruction::Mark(Label(0)),
            ]
        );
    }

    #[test]
    fn switch_without_default_falls_through_to_end() {
        let addrs = static_locals(&[(0, Type::int())]);
        let stmt = Stmt::Switch {
            selector: int_local(0),
            groups: vec![SwitchGroup {
                labels: vec![CaseLabel::Value(1)],
                body: vec![],
                span: Span::default(),
            }],
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        let Instruction::Switch { default, .. } = &code[1] else {
            panic!("expected switch dispatch");
        };
        // The fallback is the break/end label, marked last.
        assert_eq!(code.last(), Some(&Instruction::Mark(*default)));
    }

    #[test]
    fn empty_switch_group_is_an_internal_fault() {
        let addrs = static_locals(&[(0, Type::int())]);
        let stmt = Stmt::Switch {
            selector: int_local(0),
            groups: vec![SwitchGroup {
                labels: vec![],
                body: vec![],
                span: Span::default(),
            }],
        };
        let labels = crate::label::LabelAllocator::new();
        let mut g = super::super::Generator::new(&labels, &addrs, "Test");
        let err = g.gen_stmt(&stmt).unwrap_err();
        assert!(matches!(
            err,
            quill_core::CodegenError::EmptySwitchGroup { .. }
        ));
    }

    #[test]
    fn break_restores_to_enclosing_loop_after_switch() {
        // while (c) { switch (x) { default: } break; }
        // The break after the switch targets the loop's end label again.
        let addrs = static_locals(&[(0, Type::boolean()), (1, Type::int())]);
        let stmt = Stmt::While {
            cond: local(0, Type::boolean()),
            body: Box::new(Stmt::Block(vec![
                Stmt::Switch {
                    selector: int_local(1),
                    groups: vec![SwitchGroup {
                        labels: vec![CaseLabel::Default],
                        body: vec![],
                        span: Span::default(),
                    }],
                },
                Stmt::Break {
                    span: Span::default(),
                },
            ])),
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        // Loop end is L1; the trailing break must target it, not the
        // switch end L2.
        assert!(code.contains(&Instruction::Branch(Opcode::Goto, Label(1))));
        let breaks: Vec<_> = code
            .iter()
            .filter(|i| matches!(i, Instruction::Branch(Opcode::Goto, Label(1))))
            .collect();
        assert_eq!(breaks.len(), 1);
    }

    #[test]
    fn break_outside_breakable_is_an_internal_fault() {
        let addrs = static_locals(&[]);
        let labels = crate::label::LabelAllocator::new();
        let mut g = super::super::Generator::new(&labels, &addrs, "Test");
        let err = g
            .gen_stmt(&Stmt::Break {
                span: Span::default(),
            })
            .unwrap_err();
        assert!(matches!(err, quill_core::CodegenError::NoBreakTarget { .. }));
    }

    #[test]
    fn return_forms() {
        let addrs = static_locals(&[(0, Type::int())]);
        let code = emit(&addrs, |g| {
            g.gen_stmt(&Stmt::Return {
                value: Some(int_local(0)),
            })
            .unwrap()
        });
        assert_eq!(
            code,
            vec![
                Instruction::Op(Opcode::ILoad0),
                Instruction::Op(Opcode::IReturn),
            ]
        );

        let code = emit(&addrs, |g| {
            g.gen_stmt(&Stmt::Return { value: None }).unwrap()
        });
        assert_eq!(code, vec![Instruction::Op(Opcode::Return)]);
    }

    #[test]
    fn local_decl_with_initializer_converts_and_stores() {
        let addrs = static_locals(&[(0, Type::Prim(quill_core::PrimKind::Long))]);
        let stmt = Stmt::LocalDecl {
            id: LocalId(0),
            name: "n".into(),
            ty: Type::Prim(quill_core::PrimKind::Long),
            init: Some(int_lit(3)),
        };
        let code = emit(&addrs, |g| g.gen_stmt(&stmt).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Op(Opcode::IConst3),
                Instruction::Op(Opcode::I2L),
                Instruction::Op(Opcode::LStore0),
            ]
        );
    }

    #[test]
    fn call_statement_pops_unused_result_by_width() {
        let addrs = static_locals(&[]);
        let mut wide = method_ref("Test", "now", vec![], Type::Prim(quill_core::PrimKind::Long));
        wide.is_static = true;
        let e = Expr::new(
            ExprKind::Call {
                receiver: None,
                method: wide,
                args: vec![],
            },
            Type::Prim(quill_core::PrimKind::Long),
        );
        let code = emit(&addrs, |g| g.gen_expr_stat(&e).unwrap());
        assert!(matches!(code[0], Instruction::Invoke(Opcode::InvokeStatic, _)));
        assert_eq!(code[1], Instruction::Op(Opcode::Pop2));
    }

    #[test]
    fn void_call_statement_needs_no_pop() {
        let addrs = static_locals(&[]);
        let mut void = method_ref("Test", "log", vec![], Type::Void);
        void.is_static = true;
        let e = Expr::new(
            ExprKind::Call {
                receiver: None,
                method: void,
                args: vec![],
            },
            Type::Void,
        );
        let code = emit(&addrs, |g| g.gen_expr_stat(&e).unwrap());
        assert_eq!(code.len(), 1);
    }
}
