//! Relational constraints with priorities for the strength-based model

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::expression::{Expression, DEFAULT_EPSILON};

/// Priority of a constraint; `REQUIRED` constraints are never abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "StrengthRepr")]
pub struct Strength(u32);

impl Strength {
    pub const REQUIRED: Strength = Strength(1_001_001_000);
    pub const STRONG: Strength = Strength(1_000_000);
    pub const MEDIUM: Strength = Strength(1_000);
    pub const LIGHT: Strength = Strength(100);
    pub const WEAK: Strength = Strength(1);

    /// Create a strength, clamped into `[0, REQUIRED]`
    pub fn new(value: i64) -> Self {
        Strength(value.clamp(0, Self::REQUIRED.0 as i64) as u32)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_required(&self) -> bool {
        *self == Self::REQUIRED
    }

    pub fn stronger(&self, amount: u32) -> Self {
        Self::new(self.0 as i64 + amount as i64)
    }

    pub fn weaker(&self, amount: u32) -> Self {
        Self::new(self.0 as i64 - amount as i64)
    }

    pub(crate) fn to_kasuari(self) -> kasuari::Strength {
        if self.is_required() {
            kasuari::Strength::REQUIRED
        } else {
            kasuari::Strength::new(self.0 as f64)
        }
    }

    fn name(&self) -> Option<&'static str> {
        match *self {
            Self::REQUIRED => Some("required"),
            Self::STRONG => Some("strong"),
            Self::MEDIUM => Some("medium"),
            Self::LIGHT => Some("light"),
            Self::WEAK => Some("weak"),
            _ => None,
        }
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl FromStr for Strength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "required" => Ok(Self::REQUIRED),
            "strong" => Ok(Self::STRONG),
            "medium" => Ok(Self::MEDIUM),
            "light" => Ok(Self::LIGHT),
            "weak" => Ok(Self::WEAK),
            other => other
                .parse::<i64>()
                .map(Self::new)
                .map_err(|_| format!("unknown strength '{}'", s)),
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrengthRepr {
    Named(String),
    Value(i64),
}

impl TryFrom<StrengthRepr> for Strength {
    type Error = String;

    fn try_from(repr: StrengthRepr) -> Result<Self, Self::Error> {
        match repr {
            StrengthRepr::Named(name) => name.parse(),
            StrengthRepr::Value(value) => Ok(Strength::new(value)),
        }
    }
}

/// Relation between an expression and zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Le,
    Ge,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "==",
            Operator::Le => "<=",
            Operator::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// `expression <operator> 0` at a given strength
///
/// The expression is always stored reduced, so two constraints built from the
/// same relationship in different orders compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    expression: Expression,
    operator: Operator,
    strength: Strength,
}

impl LinearConstraint {
    pub fn new(expression: Expression, operator: Operator, strength: Strength) -> Self {
        Self::with_epsilon(expression, operator, strength, DEFAULT_EPSILON)
    }

    pub(crate) fn with_epsilon(
        expression: Expression,
        operator: Operator,
        strength: Strength,
        epsilon: f64,
    ) -> Self {
        Self {
            expression: expression.reduce_with(epsilon),
            operator,
            strength,
        }
    }

    /// `lhs == rhs`, required
    pub fn eq(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::relation(lhs, Operator::Eq, rhs)
    }

    /// `lhs <= rhs`, required
    pub fn le(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::relation(lhs, Operator::Le, rhs)
    }

    /// `lhs >= rhs`, required
    pub fn ge(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::relation(lhs, Operator::Ge, rhs)
    }

    fn relation(
        lhs: impl Into<Expression>,
        operator: Operator,
        rhs: impl Into<Expression>,
    ) -> Self {
        Self::new(lhs.into().sub(rhs), operator, Strength::REQUIRED)
    }

    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }

    pub fn set_strength(&mut self, strength: Strength) -> &mut Self {
        self.strength = strength;
        self
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    /// `true` when every variable is read-only, leaving nothing to solve for
    pub fn is_degenerate(&self) -> bool {
        self.expression
            .terms()
            .iter()
            .all(|term| term.variable.is_read_only())
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 0 [{}]",
            self.expression, self.operator, self.strength
        )
    }
}
