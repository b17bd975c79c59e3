//! Catalog of built-in members.
//!
//! The runtime library ships a small set of types the front end resolves
//! against without user declarations; the built-in string type is the one
//! the backend encounters in member references. The catalog is the single
//! source of truth for those members' descriptors and for which of them
//! are free of side effects, so no member name is ever special-cased in
//! the selector: a call in statement position is always discarded by its
//! return width, whatever its name.

use quill_core::{MethodRef, PrimKind, Type};

/// Qualified name of the built-in string type.
pub const STRING_CLASS: &str = "String";

/// One built-in member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinMember {
    /// Owning built-in type.
    pub owner: &'static str,
    /// Member name.
    pub name: &'static str,
    /// Routine descriptor.
    pub descriptor: &'static str,
    /// Whether a call has no observable effect besides its result.
    pub side_effect_free: bool,
}

/// The built-in member catalog.
pub const BUILTIN_MEMBERS: &[BuiltinMember] = &[
    BuiltinMember {
        owner: STRING_CLASS,
        name: "length",
        descriptor: "()I",
        side_effect_free: true,
    },
    BuiltinMember {
        owner: STRING_CLASS,
        name: "charAt",
        descriptor: "(I)C",
        side_effect_free: true,
    },
];

/// Look up a built-in member.
pub fn lookup(owner: &str, name: &str) -> Option<&'static BuiltinMember> {
    BUILTIN_MEMBERS
        .iter()
        .find(|m| m.owner == owner && m.name == name)
}

/// Whether a call to `owner.name` is known to be side-effect free.
pub fn is_side_effect_free(owner: &str, name: &str) -> bool {
    lookup(owner, name).is_some_and(|m| m.side_effect_free)
}

/// The resolved overload for a built-in string member, as the front end
/// would annotate it.
pub fn string_method(name: &str) -> Option<MethodRef> {
    let member = lookup(STRING_CLASS, name)?;
    let (params, ret) = match member.name {
        "length" => (vec![], Type::int()),
        "charAt" => (vec![Type::int()], Type::Prim(PrimKind::Char)),
        _ => return None,
    };
    Some(MethodRef {
        owner: STRING_CLASS.to_string(),
        name: member.name.to_string(),
        params,
        ret,
        is_static: false,
        is_private: false,
        on_interface: false,
    })
}
