//! Type model and descriptor strings.
//!
//! The virtual machine distinguishes four numeric categories (int, long,
//! float, double) plus references; the sub-integer primitives (boolean,
//! byte, char, short) are int-category values with narrower storage forms.
//! Long and double occupy two stack slots, everything else one.
//!
//! Member references in the binary container are encoded with descriptor
//! strings (`I`, `J`, `Lname;`, `[I`, ...); [`Type::descriptor`] produces
//! them.

use std::fmt;

/// The primitive kinds of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

/// A resolved static type as annotated on decorated AST nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A primitive value.
    Prim(PrimKind),
    /// A class or interface instance, by qualified name.
    Class(String),
    /// An array with the given element type.
    Array(Box<Type>),
    /// The type of the `null` literal.
    Null,
    /// The absence of a value (routine return position only).
    Void,
}

/// Computation category of a value on the operand stack.
///
/// Sub-integer primitives are normalized to [`Category::Int`]; `null`,
/// classes, and arrays are [`Category::Ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl Category {
    /// Stack width of a value in this category: 2 for long/double, else 1.
    pub fn width(self) -> u16 {
        match self {
            Category::Long | Category::Double => 2,
            Category::Int | Category::Float | Category::Ref => 1,
        }
    }

    /// Whether values in this category occupy two stack slots.
    pub fn is_wide(self) -> bool {
        self.width() == 2
    }

    /// Whether this is one of the four numeric categories.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Category::Ref)
    }
}

impl Type {
    /// Shorthand for the int primitive.
    pub fn int() -> Type {
        Type::Prim(PrimKind::Int)
    }

    /// Shorthand for the boolean primitive.
    pub fn boolean() -> Type {
        Type::Prim(PrimKind::Boolean)
    }

    /// Shorthand for a class type.
    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into())
    }

    /// Shorthand for an array type.
    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    /// Computation category, or `None` for `void`.
    pub fn category(&self) -> Option<Category> {
        match self {
            Type::Prim(PrimKind::Long) => Some(Category::Long),
            Type::Prim(PrimKind::Float) => Some(Category::Float),
            Type::Prim(PrimKind::Double) => Some(Category::Double),
            Type::Prim(_) => Some(Category::Int),
            Type::Class(_) | Type::Array(_) | Type::Null => Some(Category::Ref),
            Type::Void => None,
        }
    }

    /// Stack width: 2 for long/double, 0 for void, else 1.
    pub fn width(&self) -> u16 {
        self.category().map(Category::width).unwrap_or(0)
    }

    /// Whether this is a reference type (class, array, or null).
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_) | Type::Null)
    }

    /// Whether this is the type of the `null` literal.
    pub fn is_null(&self) -> bool {
        matches!(self, Type::Null)
    }

    /// Whether this is `void`.
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Whether this is one of the numeric primitives (boolean excluded).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Prim(
                PrimKind::Byte
                    | PrimKind::Char
                    | PrimKind::Short
                    | PrimKind::Int
                    | PrimKind::Long
                    | PrimKind::Float
                    | PrimKind::Double
            )
        )
    }

    /// The container-format descriptor string for this type.
    pub fn descriptor(&self) -> String {
        match self {
            Type::Prim(PrimKind::Boolean) => "Z".into(),
            Type::Prim(PrimKind::Byte) => "B".into(),
            Type::Prim(PrimKind::Char) => "C".into(),
            Type::Prim(PrimKind::Short) => "S".into(),
            Type::Prim(PrimKind::Int) => "I".into(),
            Type::Prim(PrimKind::Long) => "J".into(),
            Type::Prim(PrimKind::Float) => "F".into(),
            Type::Prim(PrimKind::Double) => "D".into(),
            Type::Class(name) => format!("L{name};"),
            Type::Array(elem) => format!("[{}", elem.descriptor()),
            // Null never appears in a declared signature; it only annotates
            // the literal. Encode it as the root reference so a stray use is
            // visible in dumps rather than silently wrong.
            Type::Null => "LObject;".into(),
            Type::Void => "V".into(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(PrimKind::Boolean) => write!(f, "boolean"),
            Type::Prim(PrimKind::Byte) => write!(f, "byte"),
            Type::Prim(PrimKind::Char) => write!(f, "char"),
            Type::Prim(PrimKind::Short) => write!(f, "short"),
            Type::Prim(PrimKind::Int) => write!(f, "int"),
            Type::Prim(PrimKind::Long) => write!(f, "long"),
            Type::Prim(PrimKind::Float) => write!(f, "float"),
            Type::Prim(PrimKind::Double) => write!(f, "double"),
            Type::Class(name) => write!(f, "{name}"),
            Type::Array(elem) => write!(f, "{elem}[]"),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "void"),
        }
    }
}

/// Build a routine descriptor from parameter and return types.
pub fn method_descriptor(params: &[Type], ret: &Type) -> String {
    let mut s = String::from("(");
    for p in params {
        s.push_str(&p.descriptor());
    }
    s.push(')');
    s.push_str(&ret.descriptor());
    s
}
