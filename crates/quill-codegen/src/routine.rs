//! Per-class driver and the artifact handed to the assembler.
//!
//! For every constructor, method body, and static initializer: run the
//! address pass, then the selection pass, in that order. The output is a
//! [`ClassArtifact`] per class: field declarations forwarded unchanged,
//! plus one [`RoutineCode`] per routine carrying its instruction stream
//! (with unresolved labels) and required local-slot count. The assembler
//! collaborator resolves labels to offsets and serializes the container.

use quill_core::{
    ClassDecl, ConstructorDecl, FieldDecl, MethodDecl, Modifiers, Stmt, Type, method_descriptor,
};

use crate::address::AddressAllocator;
use crate::bytecode::{Instruction, Opcode};
use crate::field_init::needs_static_init;
use crate::r#gen::{Generator, INIT_NAME};
use crate::label::LabelAllocator;

type Result<T> = std::result::Result<T, quill_core::CodegenError>;

/// The reserved name of the static initializer in the container format.
const STATIC_INIT_NAME: &str = "<clinit>";

/// A field entry, forwarded unchanged to the container's field table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    pub flags: Modifiers,
}

/// One generated routine.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineCode {
    pub name: String,
    pub descriptor: String,
    pub flags: Modifiers,
    /// The ordered instruction stream, labels unresolved.
    pub code: Vec<Instruction>,
    /// Required local-slot count, including the receiver slot.
    pub locals_used: u16,
}

/// Everything the container writer needs for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassArtifact {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub routines: Vec<RoutineCode>,
}

/// Generate every class of a compilation unit, sharing one label
/// allocator so labels stay globally unique.
pub fn generate_unit(classes: &[ClassDecl]) -> Result<Vec<ClassArtifact>> {
    let labels = LabelAllocator::new();
    classes.iter().map(|c| generate_class(c, &labels)).collect()
}

/// Generate one class.
pub fn generate_class(class: &ClassDecl, labels: &LabelAllocator) -> Result<ClassArtifact> {
    let fields = class.fields.iter().map(field_info).collect();

    let mut routines = Vec::new();
    for ctor in &class.ctors {
        routines.push(generate_ctor(class, ctor, labels)?);
    }
    for method in &class.methods {
        if let Some(body) = &method.body {
            routines.push(generate_method(class, method, body, labels)?);
        }
    }
    if needs_static_init(class) {
        routines.push(generate_static_init(class, labels)?);
    }

    Ok(ClassArtifact {
        name: class.name.clone(),
        parent: class.parent.clone(),
        interfaces: class.interfaces.clone(),
        fields,
        routines,
    })
}

fn field_info(field: &FieldDecl) -> FieldInfo {
    FieldInfo {
        name: field.name.clone(),
        descriptor: field.ty.descriptor(),
        flags: field.flags,
    }
}

fn generate_ctor(
    class: &ClassDecl,
    ctor: &ConstructorDecl,
    labels: &LabelAllocator,
) -> Result<RoutineCode> {
    let mut alloc = AddressAllocator::for_instance();
    alloc.declare_params(&ctor.params);
    alloc.walk_body(&ctor.body);
    let addrs = alloc.finish();

    let mut generator = Generator::new(labels, &addrs, &class.name);
    if let Some(delegation) = &ctor.delegation {
        generator.gen_ctor_delegation(delegation)?;
    }
    generator.emit_instance_field_inits(class)?;
    for stmt in &ctor.body {
        generator.gen_stmt(stmt)?;
    }
    let mut code = generator.finish();
    append_implicit_return(&mut code);

    let param_types: Vec<Type> = ctor.params.iter().map(|p| p.ty.clone()).collect();
    Ok(RoutineCode {
        name: INIT_NAME.to_string(),
        descriptor: method_descriptor(&param_types, &Type::Void),
        flags: ctor.flags,
        code,
        locals_used: addrs.locals_used(),
    })
}

fn generate_method(
    class: &ClassDecl,
    method: &MethodDecl,
    body: &[Stmt],
    labels: &LabelAllocator,
) -> Result<RoutineCode> {
    let mut alloc = AddressAllocator::new(method.flags.is_static());
    alloc.declare_params(&method.params);
    alloc.walk_body(body);
    let addrs = alloc.finish();

    let mut generator = Generator::new(labels, &addrs, &class.name);
    for stmt in body {
        generator.gen_stmt(stmt)?;
    }
    let mut code = generator.finish();
    // Non-void routines were verified upstream to return on every path.
    if method.ret.is_void() {
        append_implicit_return(&mut code);
    }

    let param_types: Vec<Type> = method.params.iter().map(|p| p.ty.clone()).collect();
    Ok(RoutineCode {
        name: method.name.clone(),
        descriptor: method_descriptor(&param_types, &method.ret),
        flags: method.flags,
        code,
        locals_used: addrs.locals_used(),
    })
}

fn generate_static_init(class: &ClassDecl, labels: &LabelAllocator) -> Result<RoutineCode> {
    let body = class.static_init.as_deref().unwrap_or(&[]);
    let mut alloc = AddressAllocator::for_static();
    alloc.walk_body(body);
    let addrs = alloc.finish();

    let mut generator = Generator::new(labels, &addrs, &class.name);
    generator.emit_static_field_inits(class)?;
    for stmt in body {
        generator.gen_stmt(stmt)?;
    }
    let mut code = generator.finish();
    append_implicit_return(&mut code);

    Ok(RoutineCode {
        name: STATIC_INIT_NAME.to_string(),
        descriptor: "()V".to_string(),
        flags: Modifiers::STATIC,
        code,
        locals_used: addrs.locals_used(),
    })
}

fn append_implicit_return(code: &mut Vec<Instruction>) {
    if code.last() != Some(&Instruction::Op(Opcode::Return)) {
        code.push(Instruction::Op(Opcode::Return));
    }
}
