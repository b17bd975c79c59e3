//! Numeric promotion and conversion rules.
//!
//! Pure functions over [`Category`]: the promotion ceiling of two operand
//! categories, the single conversion opcode between two categories, and
//! the narrowing opcodes for the three sub-integer primitives. The
//! selector drives these when lowering binary operators, assignments,
//! casts, and ternaries.

use quill_core::{Category, PrimKind};

use crate::bytecode::Opcode;

/// Rank used for ceiling computation: int < long < float < double.
fn rank(cat: Category) -> u8 {
    match cat {
        Category::Int => 0,
        Category::Long => 1,
        Category::Float => 2,
        Category::Double => 3,
        Category::Ref => u8::MAX,
    }
}

/// The promotion ceiling of two numeric categories: the smaller is
/// converted to the larger before a comparison runs.
pub fn ceiling(a: Category, b: Category) -> Category {
    if rank(a) >= rank(b) { a } else { b }
}

/// The single conversion opcode from one numeric category to another, or
/// `None` when the categories already agree.
///
/// Reference categories never convert; the caller guarantees numeric
/// operands.
pub fn convert_op(from: Category, to: Category) -> Option<Opcode> {
    use Category::*;
    match (from, to) {
        (Int, Long) => Some(Opcode::I2L),
        (Int, Float) => Some(Opcode::I2F),
        (Int, Double) => Some(Opcode::I2D),
        (Long, Int) => Some(Opcode::L2I),
        (Long, Float) => Some(Opcode::L2F),
        (Long, Double) => Some(Opcode::L2D),
        (Float, Int) => Some(Opcode::F2I),
        (Float, Long) => Some(Opcode::F2L),
        (Float, Double) => Some(Opcode::F2D),
        (Double, Int) => Some(Opcode::D2I),
        (Double, Long) => Some(Opcode::D2L),
        (Double, Float) => Some(Opcode::D2F),
        _ => None,
    }
}

/// The narrowing opcode for a cast to one of the three sub-integer
/// primitives, applied after the value is in the int category.
pub fn narrow_op(kind: PrimKind) -> Option<Opcode> {
    match kind {
        PrimKind::Byte => Some(Opcode::I2B),
        PrimKind::Char => Some(Opcode::I2C),
        PrimKind::Short => Some(Opcode::I2S),
        _ => None,
    }
}
