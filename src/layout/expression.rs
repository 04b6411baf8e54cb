//! Linear expression algebra over element geometry
//!
//! An [`Expression`] is `Σ(coefficient × variable) + constant`. Every builder
//! returns a new value and leaves its operands untouched. Expressions must be
//! [reduced](Expression::reduce) before structural comparison, since the same
//! relationship can be assembled in different orders.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::element::{ElementId, ElementTree, ParentContext};

/// Coefficients closer to zero than this are dropped by [`Expression::reduce`]
pub const DEFAULT_EPSILON: f64 = 1.0e-8;

/// Scalar geometric quantities of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    Left,
    Top,
    Width,
    Height,
    MinimumWidth,
    MinimumHeight,
    IdealWidth,
    IdealHeight,
}

impl Property {
    /// Derived quantities reported by the element rather than assigned to it
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::MinimumWidth | Self::MinimumHeight | Self::IdealWidth | Self::IdealHeight
        )
    }

    /// Sizes that a solved layout must keep non-negative
    pub fn is_extent(&self) -> bool {
        matches!(self, Self::Width | Self::Height)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::Width => "width",
            Self::Height => "height",
            Self::MinimumWidth => "min_width",
            Self::MinimumHeight => "min_height",
            Self::IdealWidth => "ideal_width",
            Self::IdealHeight => "ideal_height",
        }
    }
}

/// Reference to one scalar quantity owned by an element or a parent context
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    Element {
        element: ElementId,
        property: Property,
    },
    /// Geometry of the container; always read-only
    Context {
        context: ParentContext,
        property: Property,
    },
    /// Piecewise `max(a, b)`; writes go to whichever side is currently larger
    Max(Box<Operand>, Box<Operand>),
    /// Piecewise `min(a, b)`; writes go to whichever side is currently smaller
    Min(Box<Operand>, Box<Operand>),
}

/// Destination for solved variable values
pub trait GeometryWriter {
    /// Current value, including writes made so far
    fn read(&self, variable: &Variable) -> Option<f64>;

    fn write_property(&mut self, element: ElementId, property: Property, value: f64);

    /// Value of `expr` against the geometry written so far
    fn evaluate(&self, expr: &Expression) -> Option<f64> {
        expr.terms()
            .iter()
            .try_fold(expr.constant(), |sum, term| {
                Some(sum + term.coefficient * self.read(&term.variable)?)
            })
    }
}

/// One side of a piecewise max or min, kept reduced
///
/// Coefficients and constants are compared by their exact bit patterns so a
/// piecewise variable can key solver maps.
#[derive(Debug, Clone)]
pub struct Operand(Expression);

impl Operand {
    pub fn new(expr: impl Into<Expression>) -> Self {
        Self(expr.into().reduce())
    }

    pub fn expression(&self) -> &Expression {
        &self.0
    }

    fn is_read_only(&self) -> bool {
        self.0.terms.iter().all(|term| term.variable.is_read_only())
    }

    /// Make this side equal `value` by moving its first writable term
    fn assign(&self, target: &mut dyn GeometryWriter, value: f64) {
        let terms = self.0.terms();
        let Some(index) = terms.iter().position(|t| !t.variable.is_read_only()) else {
            return;
        };
        let mut rest = self.0.constant;
        for (i, term) in terms.iter().enumerate() {
            if i != index {
                let Some(current) = target.read(&term.variable) else {
                    return;
                };
                rest += term.coefficient * current;
            }
        }
        let term = &terms[index];
        term.variable.write(target, (value - rest) / term.coefficient);
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Operand {}

impl PartialOrd for Operand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operand {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        a.terms
            .iter()
            .zip(&b.terms)
            .map(|(ta, tb)| {
                ta.variable
                    .cmp(&tb.variable)
                    .then(ta.coefficient.total_cmp(&tb.coefficient))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            .then(a.terms.len().cmp(&b.terms.len()))
            .then(a.constant.total_cmp(&b.constant))
    }
}

impl Hash for Operand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for term in &self.0.terms {
            term.variable.hash(state);
            term.coefficient.to_bits().hash(state);
        }
        self.0.terms.len().hash(state);
        self.0.constant.to_bits().hash(state);
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Variable {
    pub fn element(element: ElementId, property: Property) -> Self {
        Self::Element { element, property }
    }

    pub fn context(context: ParentContext, property: Property) -> Self {
        Self::Context { context, property }
    }

    pub fn max(a: impl Into<Expression>, b: impl Into<Expression>) -> Self {
        Self::Max(Box::new(Operand::new(a)), Box::new(Operand::new(b)))
    }

    pub fn min(a: impl Into<Expression>, b: impl Into<Expression>) -> Self {
        Self::Min(Box::new(Operand::new(a)), Box::new(Operand::new(b)))
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            Self::Element { property, .. } => property.is_read_only(),
            Self::Context { .. } => true,
            Self::Max(a, b) | Self::Min(a, b) => a.is_read_only() && b.is_read_only(),
        }
    }

    /// Elements this variable reads from
    pub fn elements(&self) -> Vec<ElementId> {
        match self {
            Self::Element { element, .. } => vec![*element],
            Self::Context { .. } => Vec::new(),
            Self::Max(a, b) | Self::Min(a, b) => a
                .0
                .terms
                .iter()
                .chain(&b.0.terms)
                .flat_map(|term| term.variable.elements())
                .collect(),
        }
    }

    /// Current value against the host's geometry
    ///
    /// Ideal sizes fall back to the element's current size when it reports
    /// none. Returns `None` if a referenced element is unknown to the host.
    pub fn read(&self, host: &dyn ElementTree) -> Option<f64> {
        match self {
            Self::Element { element, property } => {
                let bounds = host.bounds(*element)?;
                Some(match property {
                    Property::Left => bounds.x,
                    Property::Top => bounds.y,
                    Property::Width => bounds.width,
                    Property::Height => bounds.height,
                    Property::MinimumWidth => host.minimum_size(*element)?.width,
                    Property::MinimumHeight => host.minimum_size(*element)?.height,
                    Property::IdealWidth => host
                        .ideal_size(*element)
                        .map_or(bounds.width, |s| s.width),
                    Property::IdealHeight => host
                        .ideal_size(*element)
                        .map_or(bounds.height, |s| s.height),
                })
            }
            Self::Context { context, property } => {
                let size = host.context_size(*context)?;
                Some(match property {
                    Property::Left | Property::Top => 0.0,
                    Property::Width | Property::IdealWidth => size.width,
                    Property::Height | Property::IdealHeight => size.height,
                    Property::MinimumWidth | Property::MinimumHeight => match context {
                        ParentContext::Root => 0.0,
                        ParentContext::Element(id) => {
                            let min = host.minimum_size(*id)?;
                            if *property == Property::MinimumWidth {
                                min.width
                            } else {
                                min.height
                            }
                        }
                    },
                })
            }
            Self::Max(a, b) => Some(a.0.evaluate(host)?.max(b.0.evaluate(host)?)),
            Self::Min(a, b) => Some(a.0.evaluate(host)?.min(b.0.evaluate(host)?)),
        }
    }

    /// Push a solved value back into element geometry
    pub fn write(&self, target: &mut dyn GeometryWriter, value: f64) {
        match self {
            Self::Element { element, property } if !property.is_read_only() => {
                target.write_property(*element, *property, value);
            }
            Self::Max(a, b) => {
                if target.evaluate(&a.0) >= target.evaluate(&b.0) {
                    a.assign(target, value);
                } else {
                    b.assign(target, value);
                }
            }
            Self::Min(a, b) => {
                if target.evaluate(&a.0) <= target.evaluate(&b.0) {
                    a.assign(target, value);
                } else {
                    b.assign(target, value);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element { element, property } => write!(f, "{}.{}", element, property.name()),
            Self::Context { context, property } => {
                write!(f, "parent({}).{}", context, property.name())
            }
            Self::Max(a, b) => write!(f, "max({}, {})", a, b),
            Self::Min(a, b) => write!(f, "min({}, {})", a, b),
        }
    }
}

/// Raised when a product or quotient would make an expression nonlinear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("nonlinear expression: cannot {operation} two non-constant expressions")]
pub struct NonlinearExpressionError {
    pub operation: &'static str,
}

/// `coefficient × variable`
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub variable: Variable,
    pub coefficient: f64,
}

impl Term {
    pub fn new(variable: Variable, coefficient: f64) -> Self {
        Self {
            variable,
            coefficient,
        }
    }

    pub fn scale(&self, factor: f64) -> Term {
        Term::new(self.variable.clone(), self.coefficient * factor)
    }

    pub fn divide(&self, denominator: f64) -> Term {
        self.scale(1.0 / denominator)
    }

    pub fn negate(&self) -> Term {
        self.scale(-1.0)
    }

    pub fn add(&self, other: impl Into<Expression>) -> Expression {
        Expression::from(self.clone()).add(other)
    }

    pub fn sub(&self, other: impl Into<Expression>) -> Expression {
        Expression::from(self.clone()).sub(other)
    }

    pub fn value(&self, host: &dyn ElementTree) -> Option<f64> {
        Some(self.coefficient * self.variable.read(host)?)
    }

    /// Piecewise maximum; each side keeps its own coefficient
    pub fn max(a: &Term, b: &Term) -> Term {
        Variable::max(a, b).into()
    }

    /// Piecewise minimum; each side keeps its own coefficient
    pub fn min(a: &Term, b: &Term) -> Term {
        Variable::min(a, b).into()
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::new(variable, 1.0)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} * {}", self.coefficient, self.variable)
    }
}

/// Linear combination of terms plus a constant
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    terms: Vec<Term>,
    constant: f64,
}

impl Expression {
    pub fn new(terms: Vec<Term>, constant: f64) -> Self {
        Self { terms, constant }
    }

    pub fn constant_value(constant: f64) -> Self {
        Self::new(Vec::new(), constant)
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// `true` when no variable survives reduction
    pub fn is_constant(&self) -> bool {
        self.reduce().terms.is_empty()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, other: impl Into<Expression>) -> Expression {
        let other = other.into();
        let mut terms = self.terms.clone();
        terms.extend(other.terms);
        Expression::new(terms, self.constant + other.constant)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(&self, other: impl Into<Expression>) -> Expression {
        self.add(other.into().negate())
    }

    pub fn scale(&self, factor: f64) -> Expression {
        Expression::new(
            self.terms.iter().map(|t| t.scale(factor)).collect(),
            self.constant * factor,
        )
    }

    pub fn divide(&self, denominator: f64) -> Expression {
        self.scale(1.0 / denominator)
    }

    pub fn negate(&self) -> Expression {
        self.scale(-1.0)
    }

    /// Product of two expressions, at least one of which must be constant
    pub fn times(&self, other: &Expression) -> Result<Expression, NonlinearExpressionError> {
        if self.is_constant() {
            Ok(other.scale(self.reduce().constant))
        } else if other.is_constant() {
            Ok(self.scale(other.reduce().constant))
        } else {
            Err(NonlinearExpressionError {
                operation: "multiply",
            })
        }
    }

    /// Quotient by a constant expression
    pub fn divided_by(&self, other: &Expression) -> Result<Expression, NonlinearExpressionError> {
        if other.is_constant() {
            Ok(self.divide(other.reduce().constant))
        } else {
            Err(NonlinearExpressionError { operation: "divide" })
        }
    }

    /// Merge terms sharing a variable, ordered by variable
    pub fn reduce(&self) -> Expression {
        self.reduce_with(DEFAULT_EPSILON)
    }

    /// [`reduce`](Self::reduce) with a custom zero threshold
    pub fn reduce_with(&self, epsilon: f64) -> Expression {
        let mut merged: BTreeMap<&Variable, f64> = BTreeMap::new();
        for term in &self.terms {
            *merged.entry(&term.variable).or_insert(0.0) += term.coefficient;
        }
        let terms = merged
            .into_iter()
            .filter(|(_, coefficient)| coefficient.abs() > epsilon)
            .map(|(variable, coefficient)| Term::new(variable.clone(), coefficient))
            .collect();
        Expression::new(terms, self.constant)
    }

    /// Current value against the host's geometry; never cached
    pub fn evaluate(&self, host: &dyn ElementTree) -> Option<f64> {
        self.terms
            .iter()
            .try_fold(self.constant, |sum, term| Some(sum + term.value(host)?))
    }

    /// Piecewise maximum of two expressions
    ///
    /// Reads as the larger side. A solved value is written into the first
    /// writable term of whichever side is currently larger.
    pub fn max(a: &Expression, b: &Expression) -> Expression {
        if a.is_constant() && b.is_constant() {
            return Expression::constant_value(a.constant.max(b.constant));
        }
        Variable::max(a, b).into()
    }

    /// Piecewise minimum of two expressions
    pub fn min(a: &Expression, b: &Expression) -> Expression {
        if a.is_constant() && b.is_constant() {
            return Expression::constant_value(a.constant.min(b.constant));
        }
        Variable::min(a, b).into()
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Expression::new(vec![term], 0.0)
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Term::from(variable).into()
    }
}

impl From<f64> for Expression {
    fn from(constant: f64) -> Self {
        Expression::constant_value(constant)
    }
}

impl From<&Expression> for Expression {
    fn from(expression: &Expression) -> Self {
        expression.clone()
    }
}

impl From<&Term> for Expression {
    fn from(term: &Term) -> Self {
        term.clone().into()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "{}", self.constant);
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", term)?;
            } else if term.coefficient < 0.0 {
                write!(f, " - {}", term.negate())?;
            } else {
                write!(f, " + {}", term)?;
            }
        }
        if self.constant > 0.0 {
            write!(f, " + {}", self.constant)?;
        } else if self.constant < 0.0 {
            write!(f, " - {}", -self.constant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Scene;
    use crate::geometry::{Rectangle, Size};
    use pretty_assertions::assert_eq;

    fn left(id: u64) -> Term {
        Variable::element(ElementId::new(id), Property::Left).into()
    }

    fn width(id: u64) -> Term {
        Variable::element(ElementId::new(id), Property::Width).into()
    }

    #[test]
    fn test_reduce_merges_terms() {
        let expr = left(1).add(left(1)).add(10.0).sub(3.0);
        insta::assert_snapshot!(expr.reduce().to_string(), @"2 * e1.left + 7");
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let expr = width(2)
            .add(left(1).scale(3.0))
            .sub(width(2).scale(0.5))
            .add(4.0);
        let once = expr.reduce();
        assert_eq!(once.reduce(), once);
    }

    #[test]
    fn test_reduce_orders_terms() {
        let ab = left(1).add(width(2));
        let ba = width(2).add(left(1));
        assert_ne!(ab, ba);
        assert_eq!(ab.reduce(), ba.reduce());
    }

    #[test]
    fn test_reduce_drops_cancelled_terms() {
        let expr = left(1).sub(left(1)).add(5.0);
        assert!(expr.is_constant());
        assert_eq!(expr.reduce(), Expression::constant_value(5.0));
    }

    #[test]
    fn test_builders_do_not_mutate() {
        let base = left(1).add(2.0);
        let _ = base.scale(3.0);
        let _ = base.add(width(2));
        assert_eq!(base, left(1).add(2.0));
    }

    #[test]
    fn test_times_constant_is_linear() {
        let expr = left(1).add(2.0);
        let doubled = expr.times(&Expression::constant_value(2.0)).unwrap();
        assert_eq!(doubled.reduce(), left(1).scale(2.0).add(4.0).reduce());

        let halved = expr.divided_by(&Expression::constant_value(2.0)).unwrap();
        assert_eq!(halved.reduce(), left(1).scale(0.5).add(1.0).reduce());
    }

    #[test]
    fn test_nonlinear_product_rejected() {
        let a: Expression = left(1).into();
        let b: Expression = width(2).into();
        let err = a.times(&b).unwrap_err();
        assert_eq!(err.operation, "multiply");
        assert!(a.divided_by(&b).is_err());
    }

    #[test]
    fn test_evaluate_reads_current_geometry() {
        let mut scene = Scene::new(Size::new(100.0, 100.0));
        let id = scene.add(Rectangle::new(5.0, 0.0, 20.0, 10.0));
        let expr = Term::from(Variable::element(id, Property::Left)).add(10.0);
        let flipped = Expression::constant_value(10.0).add(Variable::element(id, Property::Left));

        assert_eq!(expr.evaluate(&scene), Some(15.0));
        assert_eq!(flipped.evaluate(&scene), Some(15.0));
        assert_eq!(expr.reduce(), flipped.reduce());

        use crate::element::ElementTree;
        scene.set_bounds(id, Rectangle::new(7.0, 0.0, 20.0, 10.0));
        assert_eq!(expr.evaluate(&scene), Some(17.0));
    }

    #[test]
    fn test_max_variable_reads_and_writes_larger_side() {
        struct Store(BTreeMap<Variable, f64>);
        impl GeometryWriter for Store {
            fn read(&self, variable: &Variable) -> Option<f64> {
                self.0.get(variable).copied()
            }
            fn write_property(&mut self, element: ElementId, property: Property, value: f64) {
                self.0.insert(Variable::element(element, property), value);
            }
        }

        let a = Variable::element(ElementId::new(1), Property::Width);
        let b = Variable::element(ElementId::new(2), Property::Width);
        let mut store = Store(BTreeMap::from([(a.clone(), 10.0), (b.clone(), 30.0)]));

        Variable::max(a.clone(), b.clone()).write(&mut store, 50.0);
        assert_eq!(store.0[&b], 50.0);
        assert_eq!(store.0[&a], 10.0);

        Variable::min(a.clone(), b.clone()).write(&mut store, 5.0);
        assert_eq!(store.0[&a], 5.0);
    }

    #[test]
    fn test_max_keeps_constant_side() {
        let mut scene = Scene::new(Size::new(100.0, 100.0));
        let id = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
        let width: Expression = Variable::element(id, Property::Width).into();

        let at_least = Expression::max(&width, &Expression::constant_value(100.0));
        assert_eq!(at_least.evaluate(&scene), Some(100.0));

        let at_most = Expression::min(&width, &Expression::constant_value(100.0));
        assert_eq!(at_most.evaluate(&scene), Some(10.0));
    }

    #[test]
    fn test_max_of_multi_term_expressions() {
        let mut scene = Scene::new(Size::new(100.0, 100.0));
        let id = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
        let left_plus_top = Term::from(Variable::element(id, Property::Left))
            .add(Variable::element(id, Property::Top));
        let width: Expression = Variable::element(id, Property::Width).into();

        assert_eq!(Expression::max(&left_plus_top, &width).evaluate(&scene), Some(10.0));
        assert_eq!(Expression::min(&left_plus_top, &width).evaluate(&scene), Some(0.0));
        insta::assert_snapshot!(
            Expression::max(&left_plus_top, &width).to_string(),
            @"1 * max(1 * e1.left + 1 * e1.top, 1 * e1.width)"
        );
    }

    #[test]
    fn test_max_keeps_coefficients_with_their_terms() {
        let mut scene = Scene::new(Size::new(100.0, 100.0));
        let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
        let b = scene.add(Rectangle::new(0.0, 0.0, 1.0, 10.0));
        let double_a = Term::new(Variable::element(a, Property::Width), 2.0);
        let triple_b = Term::new(Variable::element(b, Property::Width), 3.0);

        assert_eq!(Term::max(&double_a, &triple_b).value(&scene), Some(20.0));
        assert_eq!(Term::min(&double_a, &triple_b).value(&scene), Some(3.0));
    }

    #[test]
    fn test_max_of_constants_folds() {
        let max = Expression::max(
            &Expression::constant_value(3.0),
            &Expression::constant_value(8.0),
        );
        assert_eq!(max, Expression::constant_value(8.0));
    }

    #[test]
    fn test_piecewise_write_solves_for_first_writable_term() {
        struct Store(BTreeMap<Variable, f64>);
        impl GeometryWriter for Store {
            fn read(&self, variable: &Variable) -> Option<f64> {
                self.0.get(variable).copied()
            }
            fn write_property(&mut self, element: ElementId, property: Property, value: f64) {
                self.0.insert(Variable::element(element, property), value);
            }
        }

        let left = Variable::element(ElementId::new(1), Property::Left);
        let width = Variable::element(ElementId::new(1), Property::Width);
        let other = Variable::element(ElementId::new(2), Property::Width);
        let mut store = Store(BTreeMap::from([
            (left.clone(), 50.0),
            (width.clone(), 80.0),
            (other.clone(), 1.0),
        ]));

        // 2 * (left + width) + 4 is the larger side
        let side = Term::from(left.clone()).add(width.clone()).scale(2.0).add(4.0);
        Variable::max(side, Term::new(other.clone(), 3.0)).write(&mut store, 364.0);

        assert_eq!(store.0[&left], 100.0);
        assert_eq!(store.0[&width], 80.0);
        assert_eq!(store.0[&other], 1.0);
    }

    #[test]
    fn test_read_only_properties() {
        assert!(Variable::element(ElementId::new(1), Property::MinimumWidth).is_read_only());
        assert!(Variable::context(ParentContext::Root, Property::Width).is_read_only());
        assert!(!Variable::element(ElementId::new(1), Property::Top).is_read_only());
    }
}
