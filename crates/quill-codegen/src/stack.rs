//! Stack-effect computation over emitted instruction streams.
//!
//! A linear scan that tracks operand-stack depth through an instruction
//! stream, merging depths at labels: a label's depth is fixed by the
//! first branch or fall-through that reaches it, and any disagreement is
//! an internal fault. The scan yields the maximum depth, which the
//! assembler needs for the container's routine headers, and the test
//! suite uses to enforce the stack-depth law (statements net zero,
//! expressions net `width`).

use quill_core::CodegenError;
use rustc_hash::FxHashMap;

use crate::bytecode::{Instruction, Opcode};
use crate::label::Label;

type Result<T> = std::result::Result<T, CodegenError>;

/// Pops and pushes of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: u16,
    pub pushes: u16,
}

impl StackEffect {
    const fn new(pops: u16, pushes: u16) -> Self {
        Self { pops, pushes }
    }

    /// Net depth change.
    pub fn net(self) -> i32 {
        self.pushes as i32 - self.pops as i32
    }
}

/// Width of a single type descriptor: 2 for `J`/`D`, 0 for `V`, else 1.
fn descriptor_value_width(desc: &str) -> Result<u16> {
    match desc.as_bytes().first() {
        Some(b'J') | Some(b'D') => Ok(2),
        Some(b'V') => Ok(0),
        Some(_) => Ok(1),
        None => Err(CodegenError::internal("empty type descriptor")),
    }
}

/// Total argument width and return width of a routine descriptor.
pub fn descriptor_widths(descriptor: &str) -> Result<(u16, u16)> {
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(CodegenError::internal(format!(
            "malformed routine descriptor '{descriptor}'"
        )));
    }
    let mut args = 0u16;
    let mut i = 1;
    while i < bytes.len() && bytes[i] != b')' {
        let start = i;
        while bytes[i] == b'[' {
            i += 1;
            if i >= bytes.len() {
                return Err(CodegenError::internal(format!(
                    "malformed routine descriptor '{descriptor}'"
                )));
            }
        }
        if bytes[i] == b'L' {
            while i < bytes.len() && bytes[i] != b';' {
                i += 1;
            }
            if i >= bytes.len() {
                return Err(CodegenError::internal(format!(
                    "malformed routine descriptor '{descriptor}'"
                )));
            }
        }
        i += 1;
        // An array parameter is a reference, one slot wide regardless of
        // its element descriptor.
        let wide = start == i - 1 && matches!(bytes[start], b'J' | b'D');
        args += if wide { 2 } else { 1 };
    }
    if i >= bytes.len() {
        return Err(CodegenError::internal(format!(
            "malformed routine descriptor '{descriptor}'"
        )));
    }
    let ret = descriptor_value_width(&descriptor[i + 1..])?;
    Ok((args, ret))
}

/// The stack effect of one instruction.
pub fn instruction_effect(instr: &Instruction) -> Result<StackEffect> {
    use Opcode::*;
    let effect = match instr {
        Instruction::Mark(_) => StackEffect::new(0, 0),
        Instruction::Inc { .. } => StackEffect::new(0, 0),
        Instruction::Ldc(constant) => StackEffect::new(0, constant.width()),
        Instruction::Switch { .. } => StackEffect::new(1, 0),
        Instruction::Branch(op, _) => match op {
            IfEq | IfNe | IfLt | IfGe | IfGt | IfLe | IfNull | IfNonNull => StackEffect::new(1, 0),
            IfICmpEq | IfICmpNe | IfICmpLt | IfICmpGe | IfICmpGt | IfICmpLe | IfACmpEq
            | IfACmpNe => StackEffect::new(2, 0),
            Goto => StackEffect::new(0, 0),
            other => {
                return Err(CodegenError::internal(format!(
                    "{other} is not a branch opcode"
                )));
            }
        },
        Instruction::Field(op, field) => {
            let width = descriptor_value_width(&field.descriptor)?;
            match op {
                GetStatic => StackEffect::new(0, width),
                PutStatic => StackEffect::new(width, 0),
                GetField => StackEffect::new(1, width),
                PutField => StackEffect::new(1 + width, 0),
                other => {
                    return Err(CodegenError::internal(format!(
                        "{other} is not a field opcode"
                    )));
                }
            }
        }
        Instruction::Invoke(op, method) => {
            let (args, ret) = descriptor_widths(&method.descriptor)?;
            let receiver = if *op == InvokeStatic { 0 } else { 1 };
            StackEffect::new(args + receiver, ret)
        }
        Instruction::TypeRef(op, _) => match op {
            New => StackEffect::new(0, 1),
            CheckCast | InstanceOf | ANewArray => StackEffect::new(1, 1),
            other => {
                return Err(CodegenError::internal(format!(
                    "{other} takes no type operand"
                )));
            }
        },
        Instruction::WithImm(op, _) => match op {
            BiPush | SiPush => StackEffect::new(0, 1),
            NewArray => StackEffect::new(1, 1),
            other => {
                return Err(CodegenError::internal(format!(
                    "{other} takes no immediate operand"
                )));
            }
        },
        Instruction::WithSlot(op, _) | Instruction::Op(op) => opcode_effect(*op)?,
    };
    Ok(effect)
}

fn opcode_effect(op: Opcode) -> Result<StackEffect> {
    use Opcode::*;
    let effect = match op {
        AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
        | FConst0 | FConst1 | FConst2 | BiPush | SiPush => StackEffect::new(0, 1),
        LConst0 | LConst1 | DConst0 | DConst1 => StackEffect::new(0, 2),
        ILoad | FLoad | ALoad | ILoad0 | ILoad1 | ILoad2 | ILoad3 | FLoad0 | FLoad1 | FLoad2
        | FLoad3 | ALoad0 | ALoad1 | ALoad2 | ALoad3 => StackEffect::new(0, 1),
        LLoad | DLoad | LLoad0 | LLoad1 | LLoad2 | LLoad3 | DLoad0 | DLoad1 | DLoad2 | DLoad3 => {
            StackEffect::new(0, 2)
        }
        IStore | FStore | AStore | IStore0 | IStore1 | IStore2 | IStore3 | FStore0 | FStore1
        | FStore2 | FStore3 | AStore0 | AStore1 | AStore2 | AStore3 => StackEffect::new(1, 0),
        LStore | DStore | LStore0 | LStore1 | LStore2 | LStore3 | DStore0 | DStore1 | DStore2
        | DStore3 => StackEffect::new(2, 0),
        IInc => StackEffect::new(0, 0),
        IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => StackEffect::new(2, 1),
        LALoad | DALoad => StackEffect::new(2, 2),
        IAStore | FAStore | AAStore | BAStore | CAStore | SAStore => StackEffect::new(3, 0),
        LAStore | DAStore => StackEffect::new(4, 0),
        ArrayLength | NewArray | ANewArray => StackEffect::new(1, 1),
        Pop => StackEffect::new(1, 0),
        Pop2 => StackEffect::new(2, 0),
        Dup => StackEffect::new(1, 2),
        DupX1 => StackEffect::new(2, 3),
        DupX2 => StackEffect::new(3, 4),
        Dup2 => StackEffect::new(2, 4),
        Dup2X1 => StackEffect::new(3, 5),
        Dup2X2 => StackEffect::new(4, 6),
        Swap => StackEffect::new(2, 2),
        IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXor | IShl | IShr | IUshr => {
            StackEffect::new(2, 1)
        }
        LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXor => StackEffect::new(4, 2),
        FAdd | FSub | FMul | FDiv | FRem => StackEffect::new(2, 1),
        DAdd | DSub | DMul | DDiv | DRem => StackEffect::new(4, 2),
        LShl | LShr | LUshr => StackEffect::new(3, 2),
        INeg | FNeg => StackEffect::new(1, 1),
        LNeg | DNeg => StackEffect::new(2, 2),
        I2L | I2D => StackEffect::new(1, 2),
        I2F | I2B | I2C | I2S => StackEffect::new(1, 1),
        L2I | L2F => StackEffect::new(2, 1),
        L2D => StackEffect::new(2, 2),
        F2I => StackEffect::new(1, 1),
        F2L | F2D => StackEffect::new(1, 2),
        D2I | D2F => StackEffect::new(2, 1),
        D2L => StackEffect::new(2, 2),
        LCmp => StackEffect::new(4, 1),
        FCmpG => StackEffect::new(2, 1),
        DCmpG => StackEffect::new(4, 1),
        IReturn | FReturn | AReturn => StackEffect::new(1, 0),
        LReturn | DReturn => StackEffect::new(2, 0),
        Return => StackEffect::new(0, 0),
        CheckCast | InstanceOf => StackEffect::new(1, 1),
        New => StackEffect::new(0, 1),
        // These always travel with their operand-carrying instruction
        // shapes.
        GetStatic | PutStatic | GetField | PutField | InvokeVirtual | InvokeSpecial
        | InvokeStatic | InvokeInterface | IfEq | IfNe | IfLt | IfGe | IfGt | IfLe | IfICmpEq
        | IfICmpNe | IfICmpLt | IfICmpGe | IfICmpGt | IfICmpLe | IfACmpEq | IfACmpNe | IfNull
        | IfNonNull | Goto | LookupSwitch => {
            return Err(CodegenError::internal(format!(
                "{op} requires its operand-carrying instruction shape"
            )));
        }
    };
    Ok(effect)
}

/// Whether control never falls through past this instruction.
fn terminates(instr: &Instruction) -> bool {
    matches!(
        instr,
        Instruction::Branch(Opcode::Goto, _)
            | Instruction::Switch { .. }
            | Instruction::Op(
                Opcode::Return
                    | Opcode::IReturn
                    | Opcode::LReturn
                    | Opcode::FReturn
                    | Opcode::DReturn
                    | Opcode::AReturn
            )
    )
}

/// Compute the maximum operand-stack depth of a routine's stream,
/// checking depth consistency at every label join. The stream must start
/// and stay at non-negative depth.
pub fn compute_max_stack(code: &[Instruction]) -> Result<u16> {
    scan(code).map(|(max, _)| max)
}

/// The depth at the end of the stream, or `None` when the stream ends in
/// an instruction control never falls past.
pub fn final_depth(code: &[Instruction]) -> Result<Option<i32>> {
    scan(code).map(|(_, depth)| depth)
}

fn scan(code: &[Instruction]) -> Result<(u16, Option<i32>)> {
    let mut label_depths: FxHashMap<Label, i32> = FxHashMap::default();
    let mut depth: Option<i32> = Some(0);
    let mut max = 0i32;

    for instr in code {
        if let Instruction::Mark(label) = instr {
            let recorded = label_depths.get(label).copied();
            depth = match (depth, recorded) {
                (Some(d), Some(at_label)) if at_label != d => {
                    return Err(CodegenError::internal(format!(
                        "depth mismatch at {label}: {at_label} vs {d}"
                    )));
                }
                (Some(d), _) => {
                    label_depths.insert(*label, d);
                    Some(d)
                }
                (None, Some(at_label)) => Some(at_label),
                // A label reached by no recorded branch and no
                // fall-through opens at depth zero.
                (None, None) => Some(0),
            };
            continue;
        }

        // Unreachable straight-line code contributes nothing.
        let Some(d) = depth else { continue };

        let effect = instruction_effect(instr)?;
        let after_pops = d - effect.pops as i32;
        if after_pops < 0 {
            return Err(CodegenError::internal(format!(
                "operand stack underflow at '{instr}' (depth {d})"
            )));
        }
        let after = after_pops + effect.pushes as i32;
        max = max.max(after);

        // Record the depth every branch target is entered with.
        match instr {
            Instruction::Branch(_, target) => {
                record_target(&mut label_depths, *target, after)?;
            }
            Instruction::Switch { cases, default } => {
                for target in cases.values() {
                    record_target(&mut label_depths, *target, after)?;
                }
                record_target(&mut label_depths, *default, after)?;
            }
            _ => {}
        }

        depth = if terminates(instr) { None } else { Some(after) };
    }

    Ok((max as u16, depth))
}

fn record_target(depths: &mut FxHashMap<Label, i32>, target: Label, depth: i32) -> Result<()> {
    if let Some(existing) = depths.insert(target, depth)
        && existing != depth
    {
        return Err(CodegenError::internal(format!(
            "depth mismatch at {target}: {existing} vs {depth}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Constant, FieldRefData, MethodRefData};

    #[test]
    fn descriptor_width_parsing() {
        assert_eq!(descriptor_widths("()V").unwrap(), (0, 0));
        assert_eq!(descriptor_widths("(IJ)D").unwrap(), (3, 2));
        assert_eq!(descriptor_widths("(LPoint;I)LPoint;").unwrap(), (2, 1));
        assert_eq!(descriptor_widths("([J[I)I").unwrap(), (2, 1));
        assert_eq!(descriptor_widths("([[LPoint;)V").unwrap(), (1, 0));
        assert!(descriptor_widths("I").is_err());
        assert!(descriptor_widths("(I").is_err());
    }

    #[test]
    fn invoke_effects_include_receiver() {
        let virt = Instruction::Invoke(
            Opcode::InvokeVirtual,
            MethodRefData {
                owner: "Point".into(),
                name: "move".into(),
                descriptor: "(II)V".into(),
            },
        );
        assert_eq!(instruction_effect(&virt).unwrap(), StackEffect::new(3, 0));

        let stat = Instruction::Invoke(
            Opcode::InvokeStatic,
            MethodRefData {
                owner: "Math".into(),
                name: "max".into(),
                descriptor: "(JJ)J".into(),
            },
        );
        assert_eq!(instruction_effect(&stat).unwrap(), StackEffect::new(4, 2));
    }

    #[test]
    fn field_effects_use_descriptor_width() {
        let get = Instruction::Field(
            Opcode::GetField,
            FieldRefData {
                owner: "P".into(),
                name: "mass".into(),
                descriptor: "D".into(),
            },
        );
        assert_eq!(instruction_effect(&get).unwrap(), StackEffect::new(1, 2));

        let put = Instruction::Field(
            Opcode::PutStatic,
            FieldRefData {
                owner: "P".into(),
                name: "count".into(),
                descriptor: "I".into(),
            },
        );
        assert_eq!(instruction_effect(&put).unwrap(), StackEffect::new(1, 0));
    }

    #[test]
    fn straight_line_max_depth() {
        let code = vec![
            Instruction::Op(Opcode::IConst1),
            Instruction::Op(Opcode::IConst2),
            Instruction::Op(Opcode::IAdd),
            Instruction::Op(Opcode::Pop),
        ];
        assert_eq!(compute_max_stack(&code).unwrap(), 2);
    }

    #[test]
    fn comparison_materialization_joins_consistently() {
        // iconst_1; iconst_2; if_icmplt L0; iconst_0; goto L1; L0:
        // iconst_1; L1: pop
        let code = vec![
            Instruction::Op(Opcode::IConst1),
            Instruction::Op(Opcode::IConst2),
            Instruction::Branch(Opcode::IfICmpLt, Label(0)),
            Instruction::Op(Opcode::IConst0),
            Instruction::Branch(Opcode::Goto, Label(1)),
            Instruction::Mark(Label(0)),
            Instruction::Op(Opcode::IConst1),
            Instruction::Mark(Label(1)),
            Instruction::Op(Opcode::Pop),
        ];
        assert_eq!(compute_max_stack(&code).unwrap(), 2);
    }

    #[test]
    fn join_depth_mismatch_is_detected() {
        // One path brings a value to the join, the other does not.
        let code = vec![
            Instruction::Op(Opcode::IConst1),
            Instruction::Branch(Opcode::IfEq, Label(0)),
            Instruction::Op(Opcode::IConst2),
            Instruction::Mark(Label(0)),
        ];
        assert!(compute_max_stack(&code).is_err());
    }

    #[test]
    fn underflow_is_detected() {
        let code = vec![Instruction::Op(Opcode::Pop)];
        assert!(compute_max_stack(&code).is_err());
    }

    #[test]
    fn wide_values_count_two_slots() {
        let code = vec![
            Instruction::Ldc(Constant::Long(7)),
            Instruction::Op(Opcode::Dup2),
            Instruction::Op(Opcode::LAdd),
            Instruction::Op(Opcode::Pop2),
        ];
        assert_eq!(compute_max_stack(&code).unwrap(), 4);
    }

    #[test]
    fn backward_branch_checks_recorded_depth() {
        // L0 is marked at depth 0; the backward branch reaches it at
        // depth 0 after popping its operand.
        let code = vec![
            Instruction::Mark(Label(0)),
            Instruction::Op(Opcode::IConst1),
            Instruction::Branch(Opcode::IfNe, Label(0)),
            Instruction::Op(Opcode::Return),
        ];
        assert_eq!(compute_max_stack(&code).unwrap(), 1);
    }

    #[test]
    fn switch_records_all_targets() {
        let mut cases = std::collections::BTreeMap::new();
        cases.insert(1i64, Label(1));
        cases.insert(5i64, Label(2));
        let code = vec![
            Instruction::Op(Opcode::IConst1),
            Instruction::Switch {
                cases,
                default: Label(0),
            },
            Instruction::Mark(Label(1)),
            Instruction::Mark(Label(2)),
            Instruction::Mark(Label(0)),
        ];
        assert_eq!(compute_max_stack(&code).unwrap(), 1);
    }
}
