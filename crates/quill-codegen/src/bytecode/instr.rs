//! The abstract instruction stream.
//!
//! Instructions are appended per routine in program order. Five operand
//! shapes occur: no operand, a single numeric operand (slot or immediate),
//! a label operand (branch or definition marker), a member-reference
//! operand, and the sorted multi-way dispatch operand of `lookupswitch`.
//! Constant loads carry the literal itself; the assembler assigns pool
//! entries when serializing.

use std::collections::BTreeMap;
use std::fmt;

use crate::label::Label;

use super::Opcode;

/// A literal carried by a constant-load instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl Constant {
    /// Stack width of the loaded value.
    pub fn width(&self) -> u16 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            Constant::Int(_) | Constant::Float(_) | Constant::Str(_) => 1,
        }
    }
}

/// A field reference operand: owning type, member name, type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRefData {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// A method reference operand: owning type, member name, routine descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRefData {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// One emitted instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// An opcode with no operand.
    Op(Opcode),
    /// An opcode addressing a local slot (explicit-address form).
    WithSlot(Opcode, u16),
    /// An opcode with an immediate numeric operand.
    WithImm(Opcode, i32),
    /// The combined in-place local increment.
    Inc { slot: u16, delta: i16 },
    /// Load a constant; the assembler assigns the pool entry.
    Ldc(Constant),
    /// A conditional or unconditional jump to a symbolic label.
    Branch(Opcode, Label),
    /// A label-definition marker; emits no code of its own.
    Mark(Label),
    /// A field access.
    Field(Opcode, FieldRefData),
    /// An invocation.
    Invoke(Opcode, MethodRefData),
    /// An opcode naming a type (new / checkcast / instanceof / anewarray).
    TypeRef(Opcode, String),
    /// Multi-way dispatch: sorted constant-to-label mapping plus fallback.
    Switch {
        cases: BTreeMap<i64, Label>,
        default: Label,
    },
}

impl Instruction {
    /// The opcode this instruction carries, if it carries exactly one.
    ///
    /// `Mark` defines a position rather than an operation; `Ldc` and
    /// `Switch` have their encodings chosen by the assembler.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Instruction::Op(op)
            | Instruction::WithSlot(op, _)
            | Instruction::WithImm(op, _)
            | Instruction::Branch(op, _)
            | Instruction::Field(op, _)
            | Instruction::Invoke(op, _)
            | Instruction::TypeRef(op, _) => Some(*op),
            Instruction::Inc { .. } => Some(Opcode::IInc),
            Instruction::Switch { .. } => Some(Opcode::LookupSwitch),
            Instruction::Mark(_) | Instruction::Ldc(_) => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "{op}"),
            Instruction::WithSlot(op, slot) => write!(f, "{op} {slot}"),
            Instruction::WithImm(op, imm) => write!(f, "{op} {imm}"),
            Instruction::Inc { slot, delta } => write!(f, "iinc {slot} {delta}"),
            Instruction::Ldc(Constant::Int(v)) => write!(f, "ldc {v}"),
            Instruction::Ldc(Constant::Long(v)) => write!(f, "ldc2_w {v}"),
            Instruction::Ldc(Constant::Float(v)) => write!(f, "ldc {v}"),
            Instruction::Ldc(Constant::Double(v)) => write!(f, "ldc2_w {v}"),
            Instruction::Ldc(Constant::Str(s)) => write!(f, "ldc {s:?}"),
            Instruction::Branch(op, label) => write!(f, "{op} {label}"),
            Instruction::Mark(label) => write!(f, "{label}:"),
            Instruction::Field(op, r) => {
                write!(f, "{op} {}/{} {}", r.owner, r.name, r.descriptor)
            }
            Instruction::Invoke(op, r) => {
                write!(f, "{op} {}/{}{}", r.owner, r.name, r.descriptor)
            }
            Instruction::TypeRef(op, name) => write!(f, "{op} {name}"),
            Instruction::Switch { cases, default } => {
                write!(f, "lookupswitch")?;
                for (value, label) in cases {
                    write!(f, " {value}:{label}")?;
                }
                write!(f, " default:{default}")
            }
        }
    }
}
