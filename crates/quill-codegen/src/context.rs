//! Per-traversal generator context.
//!
//! One value per routine, threaded through the selection pass: the
//! enclosing class (for implicit-receiver and static-target resolution)
//! and the current break/continue targets. Nested loops and switches save
//! the previous targets on entry and restore them on exit, so nesting is
//! handled correctly at any depth and nothing leaks across routine
//! boundaries.

use crate::label::Label;

/// Mutable traversal state for one routine.
#[derive(Debug, Clone)]
pub struct GenContext {
    /// Qualified name of the enclosing class.
    pub class_name: String,
    /// Where a `break` jumps, if a breakable construct encloses us.
    pub break_label: Option<Label>,
    /// Where a `continue` jumps, if a loop encloses us.
    pub continue_label: Option<Label>,
}

impl GenContext {
    /// Context at the start of a routine body.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            break_label: None,
            continue_label: None,
        }
    }

    /// Install loop targets, returning the saved pair for restoration.
    pub fn enter_loop(
        &mut self,
        continue_target: Label,
        break_target: Label,
    ) -> (Option<Label>, Option<Label>) {
        let saved = (self.continue_label, self.break_label);
        self.continue_label = Some(continue_target);
        self.break_label = Some(break_target);
        saved
    }

    /// Install a switch break target, returning the saved one. The
    /// continue target is untouched: a `continue` inside a switch still
    /// targets the enclosing loop.
    pub fn enter_switch(&mut self, break_target: Label) -> Option<Label> {
        self.break_label.replace(break_target)
    }

    /// Restore loop targets saved by [`GenContext::enter_loop`].
    pub fn exit_loop(&mut self, saved: (Option<Label>, Option<Label>)) {
        self.continue_label = saved.0;
        self.break_label = saved.1;
    }

    /// Restore the break target saved by [`GenContext::enter_switch`].
    pub fn exit_switch(&mut self, saved: Option<Label>) {
        self.break_label = saved;
    }
}
