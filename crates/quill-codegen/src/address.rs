//! Slot allocation for parameters and locals (pass 1).
//!
//! One run per routine, before instruction selection. Parameters take the
//! first slots in declaration order; locals follow depth-first in source
//! order. Wide values (long, double) advance the counter by two. Entering
//! a block checkpoints the counter and leaving restores it, so sibling
//! scopes that are never simultaneously live share slots; a loop body
//! keeps the same slots on every iteration.
//!
//! Slot 0 is reserved for the implicit receiver in instance routines and
//! absent in static ones. The resulting [`AddressMap`] is write-once here
//! and read-only during selection, which keeps the AST itself immutable.

use quill_core::{CodegenError, LocalId, ParamDecl, Span, Stmt, Type};
use rustc_hash::FxHashMap;

type Result<T> = std::result::Result<T, CodegenError>;

/// Slot assignments for one routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMap {
    slots: FxHashMap<LocalId, u16>,
    locals_used: u16,
}

impl AddressMap {
    /// The slot assigned to a declaration.
    pub fn slot(&self, id: LocalId, name: &str, span: Span) -> Result<u16> {
        self.slots
            .get(&id)
            .copied()
            .ok_or_else(|| CodegenError::UnassignedLocal {
                name: name.to_string(),
                span,
            })
    }

    /// The routine's required local-slot count: the highest address ever
    /// reached, rounded up by the width of the last allocation.
    pub fn locals_used(&self) -> u16 {
        self.locals_used
    }
}

/// Assigns slot addresses over one routine body.
#[derive(Debug)]
pub struct AddressAllocator {
    /// Next free slot.
    next: u16,
    /// High-water mark of `next`.
    high_water: u16,
    slots: FxHashMap<LocalId, u16>,
}

impl AddressAllocator {
    /// Allocator for an instance routine: slot 0 holds the receiver.
    pub fn for_instance() -> Self {
        Self {
            next: 1,
            high_water: 1,
            slots: FxHashMap::default(),
        }
    }

    /// Allocator for a static routine: slots start at 0.
    pub fn for_static() -> Self {
        Self {
            next: 0,
            high_water: 0,
            slots: FxHashMap::default(),
        }
    }

    /// Allocator for a routine with the given staticness.
    pub fn new(is_static: bool) -> Self {
        if is_static {
            Self::for_static()
        } else {
            Self::for_instance()
        }
    }

    /// Assign slots to the routine's parameters, left to right.
    pub fn declare_params(&mut self, params: &[ParamDecl]) {
        for param in params {
            self.declare(param.id, &param.ty);
        }
    }

    /// Walk the routine body, assigning slots to every local declaration.
    pub fn walk_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.walk_stmt(stmt);
        }
    }

    /// Finish the pass.
    pub fn finish(self) -> AddressMap {
        AddressMap {
            slots: self.slots,
            locals_used: self.high_water,
        }
    }

    fn declare(&mut self, id: LocalId, ty: &Type) {
        self.slots.insert(id, self.next);
        self.next += ty.width();
        self.high_water = self.high_water.max(self.next);
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                let mark = self.next;
                for s in stmts {
                    self.walk_stmt(s);
                }
                self.next = mark;
            }
            Stmt::LocalDecl { id, ty, .. } => self.declare(*id, ty),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.walk_stmt(then_branch);
                if let Some(els) = else_branch {
                    self.walk_stmt(els);
                }
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => self.walk_stmt(body),
            Stmt::For {
                init, update, body, ..
            } => {
                // Declarations in the init section live for the whole loop
                // and no longer; checkpoint around the entire statement.
                let mark = self.next;
                for s in init {
                    self.walk_stmt(s);
                }
                self.walk_stmt(body);
                for s in update {
                    self.walk_stmt(s);
                }
                self.next = mark;
            }
            Stmt::Switch { groups, .. } => {
                let mark = self.next;
                for group in groups {
                    for s in &group.body {
                        self.walk_stmt(s);
                    }
                }
                self.next = mark;
            }
            Stmt::Expr(_) | Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Return { .. } => {}
        }
    }
}
