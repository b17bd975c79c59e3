//! Invocation and object construction.
//!
//! The dispatch form is chosen in priority order: interface-declared
//! member, then private member or parent-qualified call (non-virtual),
//! then static, then virtual. Explicit constructor delegation always uses
//! the non-virtual form with the reserved initializer name.

use quill_core::{CtorCall, Expr, ExprKind, MethodRef, PrimKind, Type, method_descriptor};

use crate::bytecode::{Instruction, MethodRefData, Opcode};

use super::{Generator, Result};

/// The reserved name of constructors in the container format.
pub const INIT_NAME: &str = "<init>";

impl<'a> Generator<'a> {
    pub(crate) fn gen_call(
        &mut self,
        receiver: Option<&Expr>,
        method: &MethodRef,
        args: &[Expr],
    ) -> Result<()> {
        let super_qualified = matches!(receiver.map(|r| &r.kind), Some(ExprKind::Super));

        match receiver {
            Some(recv) => {
                self.gen_expr(recv)?;
                // A receiver written only to name a static target is
                // discarded; a bare class name emitted nothing.
                if method.is_static && !recv.is_class_name() {
                    self.code.pop(1);
                }
            }
            None => {
                // An unqualified call to an instance member runs on the
                // implicit receiver.
                if !method.is_static {
                    self.code.load_this();
                }
            }
        }

        for arg in args {
            self.gen_expr(arg)?;
        }

        let op = if method.on_interface {
            Opcode::InvokeInterface
        } else if method.is_private || super_qualified {
            Opcode::InvokeSpecial
        } else if method.is_static {
            Opcode::InvokeStatic
        } else {
            Opcode::InvokeVirtual
        };
        self.code.push(Instruction::Invoke(op, method_data(method)));
        Ok(())
    }

    pub(crate) fn gen_new(&mut self, class: &str, ctor: &MethodRef, args: &[Expr]) -> Result<()> {
        self.code
            .push(Instruction::TypeRef(Opcode::New, class.to_string()));
        self.code.dup(1);
        for arg in args {
            self.gen_expr(arg)?;
        }
        self.code.push(Instruction::Invoke(
            Opcode::InvokeSpecial,
            MethodRefData {
                owner: class.to_string(),
                name: INIT_NAME.to_string(),
                descriptor: method_descriptor(&ctor.params, &Type::Void),
            },
        ));
        Ok(())
    }

    pub(crate) fn gen_new_array(&mut self, elem: &Type, len: &Expr) -> Result<()> {
        self.gen_expr(len)?;
        match elem {
            Type::Prim(kind) => {
                self.code
                    .push(Instruction::WithImm(Opcode::NewArray, prim_array_code(*kind)));
            }
            Type::Class(name) => {
                self.code
                    .push(Instruction::TypeRef(Opcode::ANewArray, name.clone()));
            }
            // Nested arrays name their component by descriptor.
            other => {
                self.code
                    .push(Instruction::TypeRef(Opcode::ANewArray, other.descriptor()));
            }
        }
        Ok(())
    }

    /// Lower an explicit `this(...)`/`super(...)` constructor delegation.
    pub(crate) fn gen_ctor_delegation(&mut self, call: &CtorCall) -> Result<()> {
        self.code.load_this();
        for arg in &call.args {
            self.gen_expr(arg)?;
        }
        self.code.push(Instruction::Invoke(
            Opcode::InvokeSpecial,
            MethodRefData {
                owner: call.target.owner.clone(),
                name: INIT_NAME.to_string(),
                descriptor: method_descriptor(&call.target.params, &Type::Void),
            },
        ));
        Ok(())
    }
}

pub(crate) fn method_data(method: &MethodRef) -> MethodRefData {
    MethodRefData {
        owner: method.owner.clone(),
        name: method.name.clone(),
        descriptor: method.descriptor(),
    }
}

/// Element-type code carried by the primitive array-allocation
/// instruction.
fn prim_array_code(kind: PrimKind) -> i32 {
    match kind {
        PrimKind::Boolean => 4,
        PrimKind::Char => 5,
        PrimKind::Float => 6,
        PrimKind::Double => 7,
        PrimKind::Byte => 8,
        PrimKind::Short => 9,
        PrimKind::Int => 10,
        PrimKind::Long => 11,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use quill_core::{DelegationKind, Literal};

    fn call_expr(receiver: Option<Expr>, method: MethodRef, args: Vec<Expr>) -> Expr {
        let ty = method.ret.clone();
        Expr::new(
            ExprKind::Call {
                receiver: receiver.map(Box::new),
                method,
                args,
            },
            ty,
        )
    }

    #[test]
    fn virtual_call_with_receiver_and_args() {
        let addrs = static_locals(&[(0, Type::class("Point"))]);
        let method = method_ref("Point", "move", vec![Type::int(), Type::int()], Type::Void);
        let e = call_expr(
            Some(local(0, Type::class("Point"))),
            method,
            vec![int_lit(1), int_lit(2)],
        );
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(code[0], Instruction::Op(Opcode::ALoad0));
        assert_eq!(code[1], Instruction::Op(Opcode::IConst1));
        assert_eq!(code[2], Instruction::Op(Opcode::IConst2));
        assert_eq!(
            code[3],
            Instruction::Invoke(
                Opcode::InvokeVirtual,
                MethodRefData {
                    owner: "Point".into(),
                    name: "move".into(),
                    descriptor: "(II)V".into(),
                }
            )
        );
    }

    #[test]
    fn implicit_receiver_is_synthesized() {
        let addrs = static_locals(&[]);
        let method = method_ref("Test", "size", vec![], Type::int());
        let e = call_expr(None, method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(code[0], Instruction::Op(Opcode::ALoad0));
        assert!(matches!(
            code[1],
            Instruction::Invoke(Opcode::InvokeVirtual, _)
        ));
    }

    #[test]
    fn static_call_through_value_receiver_pops_it() {
        let addrs = static_locals(&[(0, Type::class("Counter"))]);
        let mut method = method_ref("Counter", "bump", vec![], Type::Void);
        method.is_static = true;
        let e = call_expr(Some(local(0, Type::class("Counter"))), method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Op(Opcode::ALoad0),
                Instruction::Op(Opcode::Pop),
                Instruction::Invoke(
                    Opcode::InvokeStatic,
                    MethodRefData {
                        owner: "Counter".into(),
                        name: "bump".into(),
                        descriptor: "()V".into(),
                    }
                ),
            ]
        );
    }

    #[test]
    fn static_call_through_class_name_needs_no_pop() {
        let addrs = static_locals(&[]);
        let mut method = method_ref("Counter", "bump", vec![], Type::Void);
        method.is_static = true;
        let recv = Expr::new(
            ExprKind::ClassName {
                name: "Counter".into(),
            },
            Type::class("Counter"),
        );
        let e = call_expr(Some(recv), method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(code.len(), 1);
        assert!(matches!(
            code[0],
            Instruction::Invoke(Opcode::InvokeStatic, _)
        ));
    }

    #[test]
    fn unqualified_static_call_loads_no_receiver() {
        let addrs = static_locals(&[]);
        let mut method = method_ref("Test", "helper", vec![], Type::Void);
        method.is_static = true;
        let e = call_expr(None, method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(code.len(), 1);
        assert!(matches!(
            code[0],
            Instruction::Invoke(Opcode::InvokeStatic, _)
        ));
    }

    #[test]
    fn interface_dispatch_wins_over_everything() {
        let addrs = static_locals(&[(0, Type::class("Shape"))]);
        let mut method = method_ref("Drawable", "draw", vec![], Type::Void);
        method.on_interface = true;
        let e = call_expr(Some(local(0, Type::class("Shape"))), method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert!(matches!(
            code[1],
            Instruction::Invoke(Opcode::InvokeInterface, _)
        ));
    }

    #[test]
    fn private_members_dispatch_non_virtually() {
        let addrs = static_locals(&[]);
        let mut method = method_ref("Test", "helper", vec![], Type::Void);
        method.is_private = true;
        let e = call_expr(None, method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert!(matches!(
            code[1],
            Instruction::Invoke(Opcode::InvokeSpecial, _)
        ));
    }

    #[test]
    fn super_qualified_calls_dispatch_non_virtually() {
        let addrs = static_locals(&[]);
        let method = method_ref("Base", "size", vec![], Type::int());
        let recv = Expr::new(ExprKind::Super, Type::class("Base"));
        let e = call_expr(Some(recv), method, vec![]);
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(code[0], Instruction::Op(Opcode::ALoad0));
        assert!(matches!(
            code[1],
            Instruction::Invoke(Opcode::InvokeSpecial, _)
        ));
    }

    #[test]
    fn construction_allocates_and_duplicates() {
        let addrs = static_locals(&[]);
        let ctor = MethodRef {
            owner: "Point".into(),
            name: INIT_NAME.into(),
            params: vec![Type::int(), Type::int()],
            ret: Type::Void,
            is_static: false,
            is_private: false,
            on_interface: false,
        };
        let e = Expr::new(
            ExprKind::New {
                class: "Point".into(),
                ctor,
                args: vec![int_lit(3), int_lit(4)],
            },
            Type::class("Point"),
        );
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::TypeRef(Opcode::New, "Point".into()),
                Instruction::Op(Opcode::Dup),
                Instruction::Op(Opcode::IConst3),
                Instruction::Op(Opcode::IConst4),
                Instruction::Invoke(
                    Opcode::InvokeSpecial,
                    MethodRefData {
                        owner: "Point".into(),
                        name: INIT_NAME.into(),
                        descriptor: "(II)V".into(),
                    }
                ),
            ]
        );
    }

    #[test]
    fn primitive_array_creation() {
        let addrs = static_locals(&[]);
        let e = Expr::new(
            ExprKind::NewArray {
                elem: Type::int(),
                len: Box::new(int_lit(8)),
            },
            Type::array(Type::int()),
        );
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::WithImm(Opcode::BiPush, 8),
                Instruction::WithImm(Opcode::NewArray, 10),
            ]
        );
    }

    #[test]
    fn reference_array_creation() {
        let addrs = static_locals(&[]);
        let e = Expr::new(
            ExprKind::NewArray {
                elem: Type::class("Point"),
                len: Box::new(int_lit(2)),
            },
            Type::array(Type::class("Point")),
        );
        let code = emit(&addrs, |g| g.gen_expr(&e).unwrap());
        assert_eq!(
            code[1],
            Instruction::TypeRef(Opcode::ANewArray, "Point".into())
        );
    }

    #[test]
    fn constructor_delegation_uses_the_reserved_name() {
        let addrs = static_locals(&[]);
        let call = CtorCall {
            kind: DelegationKind::Parent,
            target: MethodRef {
                owner: "Base".into(),
                name: INIT_NAME.into(),
                params: vec![Type::int()],
                ret: Type::Void,
                is_static: false,
                is_private: false,
                on_interface: false,
            },
            args: vec![Expr::new(
                ExprKind::Literal(Literal::Int(1)),
                Type::int(),
            )],
        };
        let code = emit(&addrs, |g| g.gen_ctor_delegation(&call).unwrap());
        assert_eq!(
            code,
            vec![
                Instruction::Op(Opcode::ALoad0),
                Instruction::Op(Opcode::IConst1),
                Instruction::Invoke(
                    Opcode::InvokeSpecial,
                    MethodRefData {
                        owner: "Base".into(),
                        name: INIT_NAME.into(),
                        descriptor: "(I)V".into(),
                    }
                ),
            ]
        );
    }
}
