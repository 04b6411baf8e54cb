//! Declaration surface for the strength-based model
//!
//! [`Bounds`] exposes an element's geometry as solver variables. `top`,
//! `left`, `width` and `height` are the variables themselves; every other edge
//! is an expression over them. Relations are collected by a
//! [`ConstraintDsl`], which rejects relations that leave nothing to solve.

use crate::element::{ElementId, ElementTree, ParentContext};
use crate::geometry::Insets;

use super::config::LayoutConfig;
use super::error::LayoutError;
use super::expression::{Expression, Property, Term, Variable};
use super::strength::{LinearConstraint, Operator, Strength};

/// The four edges of a rectangle as expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Edges {
    pub top: Expression,
    pub left: Expression,
    pub right: Expression,
    pub bottom: Expression,
}

impl Edges {
    /// Pull every edge inward
    pub fn inset(&self, insets: Insets) -> Edges {
        Edges {
            top: self.top.add(insets.top),
            left: self.left.add(insets.left),
            right: self.right.sub(insets.right),
            bottom: self.bottom.sub(insets.bottom),
        }
    }
}

/// A point as a pair of expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub x: Expression,
    pub y: Expression,
}

/// Writable geometry of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    element: ElementId,
}

impl Bounds {
    pub fn new(element: ElementId) -> Self {
        Self { element }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    fn term(&self, property: Property) -> Term {
        Variable::element(self.element, property).into()
    }

    pub fn top(&self) -> Term {
        self.term(Property::Top)
    }

    pub fn left(&self) -> Term {
        self.term(Property::Left)
    }

    pub fn width(&self) -> Term {
        self.term(Property::Width)
    }

    pub fn height(&self) -> Term {
        self.term(Property::Height)
    }

    pub fn right(&self) -> Expression {
        self.left().add(self.width())
    }

    pub fn bottom(&self) -> Expression {
        self.top().add(self.height())
    }

    pub fn center_x(&self) -> Expression {
        self.left().add(self.width().scale(0.5))
    }

    pub fn center_y(&self) -> Expression {
        self.top().add(self.height().scale(0.5))
    }

    pub fn edges(&self) -> Edges {
        Edges {
            top: self.top().into(),
            left: self.left().into(),
            right: self.right(),
            bottom: self.bottom(),
        }
    }

    pub fn center(&self) -> Position {
        Position {
            x: self.center_x(),
            y: self.center_y(),
        }
    }

    /// Reported minimum width; read-only
    pub fn min_width(&self) -> Term {
        self.term(Property::MinimumWidth)
    }

    pub fn min_height(&self) -> Term {
        self.term(Property::MinimumHeight)
    }

    /// Reported ideal width, or the current width when none is reported
    pub fn ideal_width(&self) -> Term {
        self.term(Property::IdealWidth)
    }

    pub fn ideal_height(&self) -> Term {
        self.term(Property::IdealHeight)
    }
}

/// Read-only geometry of the container, in its children's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentBounds {
    context: ParentContext,
}

impl ParentBounds {
    pub fn new(context: ParentContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> ParentContext {
        self.context
    }

    fn term(&self, property: Property) -> Term {
        Variable::context(self.context, property).into()
    }

    pub fn top(&self) -> Expression {
        Expression::constant_value(0.0)
    }

    pub fn left(&self) -> Expression {
        Expression::constant_value(0.0)
    }

    pub fn width(&self) -> Term {
        self.term(Property::Width)
    }

    pub fn height(&self) -> Term {
        self.term(Property::Height)
    }

    pub fn right(&self) -> Expression {
        self.width().into()
    }

    pub fn bottom(&self) -> Expression {
        self.height().into()
    }

    pub fn center_x(&self) -> Expression {
        self.width().scale(0.5).into()
    }

    pub fn center_y(&self) -> Expression {
        self.height().scale(0.5).into()
    }

    pub fn min_width(&self) -> Term {
        self.term(Property::MinimumWidth)
    }

    pub fn min_height(&self) -> Term {
        self.term(Property::MinimumHeight)
    }

    pub fn edges(&self) -> Edges {
        Edges {
            top: self.top(),
            left: self.left(),
            right: self.right(),
            bottom: self.bottom(),
        }
    }

    pub fn center(&self) -> Position {
        Position {
            x: self.center_x(),
            y: self.center_y(),
        }
    }
}

/// Collects the relations of one declaration block
pub struct ConstraintDsl<'a> {
    host: &'a dyn ElementTree,
    parent: ParentBounds,
    config: &'a LayoutConfig,
    constraints: Vec<LinearConstraint>,
}

impl<'a> ConstraintDsl<'a> {
    pub(crate) fn new(host: &'a dyn ElementTree, parent: ParentBounds, config: &'a LayoutConfig) -> Self {
        Self {
            host,
            parent,
            config,
            constraints: Vec::new(),
        }
    }

    pub(crate) fn into_constraints(self) -> Vec<LinearConstraint> {
        self.constraints
    }

    pub fn parent(&self) -> &ParentBounds {
        &self.parent
    }

    /// Current value of an expression against the host's geometry
    pub fn value(&self, expr: impl Into<Expression>) -> Option<f64> {
        expr.into().evaluate(self.host)
    }

    /// Add a prebuilt relation
    pub fn add(&mut self, constraint: LinearConstraint) -> Result<&mut LinearConstraint, LayoutError> {
        if constraint.is_degenerate() {
            return Err(LayoutError::DegenerateConstraint {
                constraint: constraint.to_string(),
            });
        }
        self.constraints.push(constraint);
        let last = self.constraints.len() - 1;
        Ok(&mut self.constraints[last])
    }

    fn relation(
        &mut self,
        lhs: impl Into<Expression>,
        operator: Operator,
        rhs: impl Into<Expression>,
    ) -> Result<&mut LinearConstraint, LayoutError> {
        let constraint = LinearConstraint::with_epsilon(
            lhs.into().sub(rhs),
            operator,
            self.config.default_strength,
            self.config.epsilon,
        );
        self.add(constraint)
    }

    /// `lhs == rhs` at the configured default strength
    pub fn eq(
        &mut self,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<&mut LinearConstraint, LayoutError> {
        self.relation(lhs, Operator::Eq, rhs)
    }

    pub fn le(
        &mut self,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<&mut LinearConstraint, LayoutError> {
        self.relation(lhs, Operator::Le, rhs)
    }

    pub fn ge(
        &mut self,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<&mut LinearConstraint, LayoutError> {
        self.relation(lhs, Operator::Ge, rhs)
    }

    /// Pin an expression to its current value
    pub fn preserve(&mut self, expr: impl Into<Expression>) -> Result<&mut LinearConstraint, LayoutError> {
        let expr = expr.into();
        let current = expr.evaluate(self.host).ok_or_else(|| {
            let elements = expr
                .terms()
                .iter()
                .flat_map(|term| term.variable.elements())
                .collect();
            LayoutError::declaration(elements, "cannot preserve geometry of an unknown element")
        })?;
        self.eq(expr, current)
    }

    /// Equate all four edges
    pub fn edges_eq(&mut self, a: &Edges, b: &Edges) -> Result<&mut [LinearConstraint], LayoutError> {
        let start = self.constraints.len();
        self.eq(a.top.clone(), b.top.clone())?;
        self.eq(a.left.clone(), b.left.clone())?;
        self.eq(a.right.clone(), b.right.clone())?;
        self.eq(a.bottom.clone(), b.bottom.clone())?;
        Ok(&mut self.constraints[start..])
    }

    /// Equate both coordinates of two points
    pub fn center_eq(&mut self, a: &Position, b: &Position) -> Result<&mut [LinearConstraint], LayoutError> {
        let start = self.constraints.len();
        self.eq(a.x.clone(), b.x.clone())?;
        self.eq(a.y.clone(), b.y.clone())?;
        Ok(&mut self.constraints[start..])
    }
}

/// Set the strength of every relation in a group
pub fn with_strength(constraints: &mut [LinearConstraint], strength: Strength) {
    for constraint in constraints {
        constraint.set_strength(strength);
    }
}

/// Match the parent's edges exactly
pub fn fill(bounds: Bounds, dsl: &mut ConstraintDsl<'_>) -> Result<(), LayoutError> {
    let parent = dsl.parent().edges();
    dsl.edges_eq(&bounds.edges(), &parent)?;
    Ok(())
}

/// Fill the parent less `insets`, at `strength`
pub fn fill_with_insets(
    insets: Insets,
    strength: Strength,
) -> impl Fn(Bounds, &mut ConstraintDsl<'_>) -> Result<(), LayoutError> {
    move |bounds: Bounds, dsl: &mut ConstraintDsl<'_>| {
        let parent = dsl.parent().edges().inset(insets);
        with_strength(dsl.edges_eq(&bounds.edges(), &parent)?, strength);
        Ok(())
    }
}

/// Center on the parent's center
pub fn center(bounds: Bounds, dsl: &mut ConstraintDsl<'_>) -> Result<(), LayoutError> {
    let parent = dsl.parent().center();
    dsl.center_eq(&bounds.center(), &parent)?;
    Ok(())
}
