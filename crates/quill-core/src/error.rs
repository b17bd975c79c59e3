//! Code-generation errors.
//!
//! The backend assumes its input has already been fully resolved and type
//! checked, so every error it can raise is an internal-invariant violation:
//! an AST shape inconsistent with its annotations, a switch group with no
//! label, a jump with no enclosing target. These abort generation for the
//! whole compilation unit; they are never user-facing diagnostics.

use thiserror::Error;

use crate::span::Span;

/// Errors raised while generating code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// An expression was used as an assignment target but is not one.
    #[error("at {span}: expression is not an assignment target")]
    InvalidAssignTarget {
        /// Where the assignment occurred.
        span: Span,
    },

    /// A switch group carried no case label.
    #[error("at {span}: switch group has no case label")]
    EmptySwitchGroup {
        /// Where the group occurred.
        span: Span,
    },

    /// A `break` was lowered with no enclosing break target.
    #[error("at {span}: no enclosing target for break")]
    NoBreakTarget {
        /// Where the statement occurred.
        span: Span,
    },

    /// A `continue` was lowered with no enclosing continue target.
    #[error("at {span}: no enclosing target for continue")]
    NoContinueTarget {
        /// Where the statement occurred.
        span: Span,
    },

    /// A local reference had no assigned slot address.
    #[error("at {span}: local '{name}' has no slot address")]
    UnassignedLocal {
        /// The local's name.
        name: String,
        /// Where the reference occurred.
        span: Span,
    },

    /// An expression's annotated type does not admit the requested operation.
    #[error("at {span}: {message}")]
    TypeShape {
        /// What was inconsistent.
        message: String,
        /// Where the expression occurred.
        span: Span,
    },

    /// Any other broken invariant.
    #[error("internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl CodegenError {
    /// Build an [`CodegenError::Internal`] from anything displayable.
    pub fn internal(message: impl Into<String>) -> Self {
        CodegenError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_span() {
        let err = CodegenError::EmptySwitchGroup {
            span: Span::new(7, 5, 4),
        };
        assert_eq!(err.to_string(), "at 7:5: switch group has no case label");
    }

    #[test]
    fn internal_helper() {
        let err = CodegenError::internal("descriptor missing");
        assert_eq!(err.to_string(), "internal error: descriptor missing");
    }
}
