//! Layout resolution for elements sharing a parent context
//!
//! Two models are provided:
//!
//! - [`ConstraintLayout`]: per-property formulas resolved by a lazy graph walk
//!   with fixed fallback derivations. Fast, but every property needs an
//!   independent anchor.
//! - [`SolverLayout`]: prioritized linear relations solved simultaneously by a
//!   Cassowary solver. Supports inequalities and over-determined systems.

pub mod bounds;
pub mod bundle;
pub mod config;
pub mod constraint;
pub mod engine;
pub mod error;
pub mod expression;
pub mod solver;
pub mod solver_layout;
pub mod strength;

pub use bounds::{Bounds, ConstraintDsl, Edges, ParentBounds, Position};
pub use bundle::{Constraints, ParentConstraints};
pub use config::{ConfigError, LayoutConfig};
pub use constraint::{Constraint, Horizontal, Magnitude, Optional, Vertical};
pub use engine::{constrain, constrain_within, ConstraintLayout, LayoutPass};
pub use error::{LayoutError, StaleReference};
pub use expression::{Expression, NonlinearExpressionError, Operand, Property, Term, Variable};
pub use solver::{ConstraintSolver, Solution, SolverError};
pub use solver_layout::{BlockId, SolverLayout};
pub use strength::{LinearConstraint, Operator, Strength};
