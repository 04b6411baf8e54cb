//! Constraint solver integration for the strength-based model
//!
//! Wraps the kasuari Cassowary solver, translating [`LinearConstraint`]s into
//! the solver's format and reading assigned values back as a [`Solution`].
//! Read-only variables must be folded into constants before constraints reach
//! the solver; every variable it sees is solved for.

use std::collections::HashMap;

use kasuari::{Solver as KasuariSolver, Variable as KasuariVariable, WeightedRelation::*};
use thiserror::Error;

use super::expression::{Expression, Variable};
use super::strength::{LinearConstraint, Operator, Strength};

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unsatisfiable constraints: {reason}")]
    Unsatisfiable {
        /// Required constraints already accepted when the conflict surfaced
        conflicting: Vec<String>,
        reason: String,
    },

    #[error("internal solver error: {0}")]
    Internal(String),
}

/// Wrapper around the kasuari solver
pub struct ConstraintSolver {
    solver: KasuariSolver,
    /// Maps our variables to kasuari variables
    variables: HashMap<Variable, KasuariVariable>,
    /// Required constraints accepted so far, for error reporting
    required: Vec<String>,
}

impl ConstraintSolver {
    pub fn new() -> Self {
        Self {
            solver: KasuariSolver::new(),
            variables: HashMap::new(),
            required: Vec::new(),
        }
    }

    fn get_or_create_var(&mut self, var: &Variable) -> KasuariVariable {
        if let Some(&kvar) = self.variables.get(var) {
            kvar
        } else {
            let kvar = KasuariVariable::new();
            self.variables.insert(var.clone(), kvar);
            kvar
        }
    }

    fn to_kasuari(&mut self, expr: &Expression) -> kasuari::Expression {
        let terms = expr
            .terms()
            .iter()
            .map(|term| kasuari::Term::new(self.get_or_create_var(&term.variable), term.coefficient))
            .collect();
        kasuari::Expression::new(terms, expr.constant())
    }

    fn convert_kasuari_error(&self, e: kasuari::AddConstraintError, desc: &str) -> SolverError {
        match e {
            kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
                conflicting: self.required.clone(),
                reason: format!("cannot satisfy {}: conflicts with existing constraints", desc),
            },
            kasuari::AddConstraintError::DuplicateConstraint => {
                SolverError::Internal(format!("duplicate constraint: {}", desc))
            }
            kasuari::AddConstraintError::InternalSolverError(msg) => {
                SolverError::Internal(format!("{} while adding {}", msg, desc))
            }
        }
    }

    /// Add a relation to the solver
    pub fn add_constraint(&mut self, constraint: &LinearConstraint) -> Result<(), SolverError> {
        let expr = self.to_kasuari(constraint.expression());
        let strength = constraint.strength().to_kasuari();
        let relation = match constraint.operator() {
            Operator::Eq => expr | EQ(strength) | 0.0,
            Operator::Le => expr | LE(strength) | 0.0,
            Operator::Ge => expr | GE(strength) | 0.0,
        };
        let desc = constraint.to_string();
        self.solver
            .add_constraint(relation)
            .map_err(|e| self.convert_kasuari_error(e, &desc))?;
        if constraint.strength().is_required() {
            self.required.push(desc);
        }
        Ok(())
    }

    /// Pull a variable toward `value` without overriding stronger constraints
    pub fn suggest_value(
        &mut self,
        var: &Variable,
        value: f64,
        strength: Strength,
    ) -> Result<(), SolverError> {
        // edit variables cannot be required
        let strength = if strength.is_required() {
            Strength::REQUIRED.weaker(1)
        } else {
            strength
        };
        let kvar = self.get_or_create_var(var);
        self.solver
            .add_edit_variable(kvar, strength.to_kasuari())
            .map_err(|e| SolverError::Internal(format!("failed to add edit variable {}: {}", var, e)))?;
        self.solver
            .suggest_value(kvar, value)
            .map_err(|e| SolverError::Internal(format!("failed to suggest value for {}: {}", var, e)))?;
        Ok(())
    }

    /// Read back the value of every variable the solver has seen
    pub fn solve(&mut self) -> Solution {
        // kasuari only reports variables that moved away from zero
        let mut values: HashMap<Variable, f64> =
            self.variables.keys().map(|var| (var.clone(), 0.0)).collect();
        let reverse: HashMap<KasuariVariable, &Variable> =
            self.variables.iter().map(|(var, &k)| (k, var)).collect();

        for (kvar, value) in self.solver.fetch_changes() {
            if let Some(var) = reverse.get(kvar) {
                values.insert((*var).clone(), *value);
            }
        }

        Solution { values }
    }
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Values assigned by the solver
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub values: HashMap<Variable, f64>,
}

impl Solution {
    pub fn get(&self, var: &Variable) -> Option<f64> {
        self.values.get(var).copied()
    }

    /// Value of `expr` under this solution, `None` if it mentions an unsolved variable
    pub fn evaluate(&self, expr: &Expression) -> Option<f64> {
        expr.terms()
            .iter()
            .try_fold(expr.constant(), |sum, term| {
                Some(sum + term.coefficient * self.get(&term.variable)?)
            })
    }

    /// Distance by which `constraint` misses being satisfied
    pub fn violation(&self, constraint: &LinearConstraint) -> Option<f64> {
        let value = self.evaluate(constraint.expression())?;
        Some(match constraint.operator() {
            Operator::Eq => value.abs(),
            Operator::Le => value.max(0.0),
            Operator::Ge => (-value).max(0.0),
        })
    }
}
