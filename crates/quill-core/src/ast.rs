//! The decorated AST.
//!
//! This is the tree the backend consumes: the parser's surface tree after
//! name resolution and type checking have annotated it. Every expression
//! carries its resolved static [`Type`], every name carries the [`LocalId`]
//! of its declaration, and every field/method reference carries the
//! resolved member ([`FieldRef`] / [`MethodRef`]) including the information
//! the backend needs to pick a dispatch form and build descriptors.
//!
//! The tree is owned and immutable; the backend reads annotations and never
//! adds resolution of its own.

use bitflags::bitflags;

use crate::span::Span;
use crate::types::{Type, method_descriptor};

/// Identity of a parameter or local declaration within its routine.
///
/// Issued by the resolver; the address allocator maps each id to a stack
/// slot before instruction selection runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

bitflags! {
    /// Declaration modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u16 {
        const PUBLIC    = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE   = 1 << 2;
        const STATIC    = 1 << 3;
        const FINAL     = 1 << 4;
        const ABSTRACT  = 1 << 5;
    }
}

impl Modifiers {
    /// Whether the `static` modifier is set.
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }
}

// ============================================================================
// Resolved member references
// ============================================================================

/// A resolved field reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    /// Qualified name of the class declaring the field.
    pub owner: String,
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: Type,
    /// Whether the field is static.
    pub is_static: bool,
}

/// A resolved method or constructor overload target.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    /// Qualified name of the class or interface declaring the member.
    pub owner: String,
    /// Member name (`<init>` for constructors).
    pub name: String,
    /// Parameter types of the selected overload.
    pub params: Vec<Type>,
    /// Return type of the selected overload.
    pub ret: Type,
    /// Whether the member is static.
    pub is_static: bool,
    /// Whether the member is private.
    pub is_private: bool,
    /// Whether the member is declared by an interface.
    pub on_interface: bool,
}

impl MethodRef {
    /// The routine descriptor of the selected overload.
    pub fn descriptor(&self) -> String {
        method_descriptor(&self.params, &self.ret)
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
}

/// Unary operators without a storage effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Unary plus (identity).
    Plus,
    /// Bitwise complement.
    BitNot,
    /// Logical negation.
    Not,
}

/// Increment/decrement forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecOp {
    /// Whether the produced value is the updated one.
    pub fn is_pre(self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PreDec)
    }

    /// +1 or -1.
    pub fn delta(self) -> i16 {
        match self {
            IncDecOp::PreInc | IncDecOp::PostInc => 1,
            IncDecOp::PreDec | IncDecOp::PostDec => -1,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    AndAnd,
    OrOr,
}

impl BinOp {
    /// Whether this is one of the three shift operators, whose right
    /// operand keeps its own category instead of promoting to the left's.
    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr | BinOp::Ushr)
    }

    /// Whether the result of this operator is boolean.
    pub fn is_boolean_result(self) -> bool {
        matches!(
            self,
            BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
                | BinOp::Eq
                | BinOp::Ne
                | BinOp::AndAnd
                | BinOp::OrOr
        )
    }
}

/// Assignment operators (`=` and the compound forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for `=`.
    pub fn binary(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
            AssignOp::Rem => Some(BinOp::Rem),
            AssignOp::And => Some(BinOp::And),
            AssignOp::Or => Some(BinOp::Or),
            AssignOp::Xor => Some(BinOp::Xor),
            AssignOp::Shl => Some(BinOp::Shl),
            AssignOp::Shr => Some(BinOp::Shr),
            AssignOp::Ushr => Some(BinOp::Ushr),
        }
    }

    /// Whether this is one of the three shift assignments, whose right
    /// operand is not promoted against the left.
    pub fn is_shift(self) -> bool {
        matches!(self, AssignOp::Shl | AssignOp::Shr | AssignOp::Ushr)
    }
}

/// A typed expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The expression form.
    pub kind: ExprKind,
    /// Resolved static type.
    pub ty: Type,
    /// Source location.
    pub span: Span,
}

impl Expr {
    /// Build an expression with a default span (fixture helper).
    pub fn new(kind: ExprKind, ty: Type) -> Expr {
        Expr {
            kind,
            ty,
            span: Span::default(),
        }
    }

    /// Whether this expression is a bare class name (e.g. a static
    /// qualifier); such an expression emits no code of its own.
    pub fn is_class_name(&self) -> bool {
        matches!(self.kind, ExprKind::ClassName { .. })
    }

    /// Whether this expression is the `null` literal.
    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Literal::Null))
    }
}

/// Expression forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// A parameter or local read.
    Local {
        /// The resolved declaration.
        id: LocalId,
        /// Source name, for diagnostics.
        name: String,
    },
    /// A bare class name used as a qualifier; emits nothing.
    ClassName {
        /// The named class.
        name: String,
    },
    /// The implicit receiver.
    This,
    /// The receiver viewed as the parent class; calls through it dispatch
    /// non-virtually.
    Super,
    /// A field read.
    Field {
        /// Receiver expression (a bare class name for static access).
        target: Box<Expr>,
        /// Resolved field.
        field: FieldRef,
    },
    /// `array.length`.
    ArrayLength {
        /// The array expression.
        target: Box<Expr>,
    },
    /// An element read, `array[index]`.
    Element {
        /// The array expression.
        array: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
    },
    /// A value-producing unary operator.
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Increment or decrement of a local, field, or element.
    IncDec {
        op: IncDecOp,
        target: Box<Expr>,
    },
    /// A binary operator (including `&&`/`||` and comparisons).
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// An `instanceof` check against a class.
    InstanceOf {
        value: Box<Expr>,
        class: String,
    },
    /// Assignment, plain or compound. The node's type is the assignment's
    /// static result type.
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// A method invocation with a resolved overload target.
    Call {
        /// Explicit receiver, if written in source.
        receiver: Option<Box<Expr>>,
        /// The resolved overload.
        method: MethodRef,
        /// Arguments, in source order.
        args: Vec<Expr>,
    },
    /// Object construction with a resolved constructor.
    New {
        /// The instantiated class.
        class: String,
        /// The resolved constructor (`name` is `<init>`).
        ctor: MethodRef,
        /// Constructor arguments, in source order.
        args: Vec<Expr>,
    },
    /// Array creation with a length expression.
    NewArray {
        /// Element type.
        elem: Type,
        /// Length expression.
        len: Box<Expr>,
    },
    /// A cast; the target type is the node's annotated type.
    Cast {
        expr: Box<Expr>,
    },
    /// The conditional operator.
    Ternary {
        cond: Box<Expr>,
        then_val: Box<Expr>,
        else_val: Box<Expr>,
    },
}

// ============================================================================
// Statements
// ============================================================================

/// A case label inside a switch group.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    /// `case <constant>:` with the constant folded by upstream analysis.
    Value(i64),
    /// `default:`.
    Default,
}

/// One switch group: its labels and the statements they share.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchGroup {
    /// The group's case labels (at least one).
    pub labels: Vec<CaseLabel>,
    /// The group's statements, in source order.
    pub body: Vec<Stmt>,
    /// Source location of the group.
    pub span: Span,
}

/// Statement forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A braced block with its own slot scope.
    Block(Vec<Stmt>),
    /// A local declaration, optionally initialized.
    LocalDecl {
        id: LocalId,
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    /// An expression evaluated for its effect; any produced value is
    /// discarded.
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        /// Init statements (declarations or expression statements).
        init: Vec<Stmt>,
        /// Loop condition, absent for an unconditional loop.
        cond: Option<Expr>,
        /// Update statements run after each body execution.
        update: Vec<Stmt>,
        body: Box<Stmt>,
    },
    Switch {
        selector: Expr,
        groups: Vec<SwitchGroup>,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Return {
        value: Option<Expr>,
    },
}

// ============================================================================
// Declarations
// ============================================================================

/// A parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub id: LocalId,
    pub name: String,
    pub ty: Type,
}

/// A field declaration. Forwarded unchanged to the container writer's
/// field table; initializers are lowered by the field-initializer emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub flags: Modifiers,
    pub init: Option<Expr>,
}

/// A method declaration. `body` is `None` for abstract methods.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub flags: Modifiers,
    pub params: Vec<ParamDecl>,
    pub ret: Type,
    pub body: Option<Vec<Stmt>>,
}

/// Which constructor an explicit delegation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationKind {
    /// `this(...)`.
    SelfClass,
    /// `super(...)`.
    Parent,
}

/// An explicit constructor delegation at the head of a constructor body.
#[derive(Debug, Clone, PartialEq)]
pub struct CtorCall {
    pub kind: DelegationKind,
    /// The resolved target constructor.
    pub target: MethodRef,
    pub args: Vec<Expr>,
}

/// A constructor declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub flags: Modifiers,
    pub params: Vec<ParamDecl>,
    /// Explicit `this(...)`/`super(...)` call, if written.
    pub delegation: Option<CtorCall>,
    pub body: Vec<Stmt>,
}

/// A class declaration: the unit of code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    /// Parent class, if any.
    pub parent: Option<String>,
    /// Implemented interfaces.
    pub interfaces: Vec<String>,
    pub flags: Modifiers,
    pub fields: Vec<FieldDecl>,
    pub ctors: Vec<ConstructorDecl>,
    pub methods: Vec<MethodDecl>,
    /// Statements of the static initializer block, if the class has one.
    pub static_init: Option<Vec<Stmt>>,
}
