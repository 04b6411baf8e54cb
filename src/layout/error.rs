//! Error types for the layout engine

use thiserror::Error;

use crate::element::{ElementId, ParentContext};

use super::config::ConfigError;
use super::expression::NonlinearExpressionError;
use super::solver::SolverError;

/// Errors that can occur while declaring or resolving constraints
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Elements constrained together do not share a parent context
    #[error("cannot constrain {}: {reason}", format_elements(.elements))]
    Declaration {
        elements: Vec<ElementId>,
        reason: String,
    },

    /// Circular dependency between element properties
    #[error("circular constraint dependency: {}", format_cycle(.cycle))]
    CircularDependency { cycle: Vec<ElementId> },

    /// Product or quotient of two non-constant expressions
    #[error(transparent)]
    Nonlinear(#[from] NonlinearExpressionError),

    /// Required constraints of a context cannot all be satisfied
    #[error("infeasible constraints in context '{context}': {reason}")]
    Infeasible {
        context: ParentContext,
        reason: String,
    },

    /// Relation with no writable variable left to solve for
    #[error("constraint '{constraint}' has no writable variables")]
    DegenerateConstraint { constraint: String },

    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),

    /// Invalid layout configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LayoutError {
    /// Create a declaration error
    pub fn declaration(elements: Vec<ElementId>, reason: impl Into<String>) -> Self {
        Self::Declaration {
            elements,
            reason: reason.into(),
        }
    }

    /// Create a circular dependency error
    pub fn circular(cycle: Vec<ElementId>) -> Self {
        Self::CircularDependency { cycle }
    }

    /// Create an infeasible constraint set error
    pub fn infeasible(context: ParentContext, reason: impl Into<String>) -> Self {
        Self::Infeasible {
            context,
            reason: reason.into(),
        }
    }

    /// Elements this error is about, if any
    pub fn elements(&self) -> Option<&[ElementId]> {
        match self {
            Self::Declaration { elements, .. } => Some(elements),
            Self::CircularDependency { cycle } => Some(cycle),
            _ => None,
        }
    }
}

/// A constraint that read an element no longer managed by the layout
///
/// Stale references are soft failures: the property falls back to its
/// default derivation and the pass continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleReference {
    /// Element being resolved
    pub element: ElementId,
    /// Element the constraint depended on
    pub referenced: ElementId,
}

fn format_elements(elements: &[ElementId]) -> String {
    elements
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_cycle(cycle: &[ElementId]) -> String {
    cycle
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
