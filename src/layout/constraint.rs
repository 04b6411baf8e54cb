//! Per-property formulas for the graph resolver
//!
//! A [`Constraint`] maps the host's current geometry to one number. It also
//! records which elements must be resolved before it may be evaluated, so the
//! resolver can discover evaluation order while it walks. The direction
//! marker keeps vertical and horizontal positions from being mixed; only
//! [`Magnitude`] values (sizes, distances, constants) cross axes.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::element::{ElementId, ElementTree};
use crate::geometry::Rectangle;

/// Position along the y axis
#[derive(Debug)]
pub enum Vertical {}

/// Position along the x axis
#[derive(Debug)]
pub enum Horizontal {}

/// Axis-free quantity: a size, a distance or a constant
#[derive(Debug)]
pub enum Magnitude {}

type Block = Rc<dyn Fn(&dyn ElementTree) -> Option<f64>>;

/// Formula for one directional property
///
/// Composition never mutates: every builder returns a new constraint whose
/// dependencies are the union of its operands'.
pub struct Constraint<D> {
    target: Option<ElementId>,
    dependencies: BTreeSet<ElementId>,
    default: bool,
    block: Block,
    direction: PhantomData<fn() -> D>,
}

impl<D> Clone for Constraint<D> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            dependencies: self.dependencies.clone(),
            default: self.default,
            block: Rc::clone(&self.block),
            direction: PhantomData,
        }
    }
}

impl<D> fmt::Debug for Constraint<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("target", &self.target)
            .field("dependencies", &self.dependencies)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl<D> Constraint<D> {
    fn new(
        target: Option<ElementId>,
        dependencies: BTreeSet<ElementId>,
        default: bool,
        block: Block,
    ) -> Self {
        Self {
            target,
            dependencies,
            default,
            block,
            direction: PhantomData,
        }
    }

    /// Current value of one of `element`'s edges or sizes
    pub(crate) fn reading(element: ElementId, read: fn(&Rectangle) -> f64) -> Self {
        Self::new(
            Some(element),
            BTreeSet::from([element]),
            true,
            Rc::new(move |host| host.bounds(element).map(|b| read(&b))),
        )
    }

    /// Formula with no element dependencies
    pub(crate) fn free(block: impl Fn(&dyn ElementTree) -> Option<f64> + 'static) -> Self {
        Self::new(None, BTreeSet::new(), true, Rc::new(block))
    }

    /// A fixed value
    pub fn constant(value: f64) -> Self {
        Self::free(move |_| Some(value)).explicit()
    }

    /// A value computed each time the constraint is evaluated
    pub fn value(f: impl Fn() -> f64 + 'static) -> Self {
        Self::free(move |_| Some(f())).explicit()
    }

    /// Element this constraint resolves a property for
    pub fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// Elements that must be resolved before evaluation
    pub fn dependencies(&self) -> &BTreeSet<ElementId> {
        &self.dependencies
    }

    /// `true` for a built-in fallback, `false` once explicitly assigned
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Mark as an explicit, user-assigned formula
    pub fn explicit(mut self) -> Self {
        self.default = false;
        self
    }

    /// Evaluate against the host's current geometry
    ///
    /// Returns `None` when a referenced element is unknown to the host.
    pub fn evaluate(&self, host: &dyn ElementTree) -> Option<f64> {
        (self.block)(host)
    }

    /// Bind to the property slot of `element`
    pub(crate) fn assigned_to(&self, element: ElementId) -> Self {
        let mut dependencies = self.dependencies.clone();
        dependencies.insert(element);
        Self::new(Some(element), dependencies, false, Rc::clone(&self.block))
    }

    fn map(&self, f: impl Fn(f64) -> f64 + 'static) -> Self {
        let block = Rc::clone(&self.block);
        Self::new(
            self.target,
            self.dependencies.clone(),
            self.default,
            Rc::new(move |host| block(host).map(&f)),
        )
    }

    fn combine<E, F>(&self, other: &Constraint<F>, f: impl Fn(f64, f64) -> f64 + 'static) -> Constraint<E> {
        let a = Rc::clone(&self.block);
        let b = Rc::clone(&other.block);
        Constraint::new(
            self.target.or(other.target),
            self.dependencies.union(&other.dependencies).copied().collect(),
            self.default,
            Rc::new(move |host| Some(f(a(host)?, b(host)?))),
        )
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, value: f64) -> Self {
        self.map(move |v| v + value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(&self, value: f64) -> Self {
        self.map(move |v| v - value)
    }

    pub fn scale(&self, factor: f64) -> Self {
        self.map(move |v| v * factor)
    }

    pub fn divide(&self, denominator: f64) -> Self {
        self.map(move |v| v / denominator)
    }

    /// `value + base`, for offsets written before the property
    pub fn offset(value: f64, base: &Self) -> Self {
        base.map(move |v| value + v)
    }

    /// Add a value computed at evaluation time
    pub fn add_with(&self, f: impl Fn() -> f64 + 'static) -> Self {
        self.map(move |v| v + f())
    }

    /// Scale by a factor computed at evaluation time
    pub fn scale_with(&self, f: impl Fn() -> f64 + 'static) -> Self {
        self.map(move |v| v * f())
    }

    pub fn add_magnitude(&self, other: &Constraint<Magnitude>) -> Self {
        self.combine(other, |a, b| a + b)
    }

    pub fn sub_magnitude(&self, other: &Constraint<Magnitude>) -> Self {
        self.combine(other, |a, b| a - b)
    }

    pub fn scale_magnitude(&self, other: &Constraint<Magnitude>) -> Self {
        self.combine(other, |a, b| a * b)
    }

    pub fn divide_magnitude(&self, other: &Constraint<Magnitude>) -> Self {
        self.combine(other, |a, b| a / b)
    }

    /// Distance from `other` to `self` along the same axis
    pub fn difference(&self, other: &Self) -> Constraint<Magnitude> {
        self.combine(other, |a, b| a - b)
    }

    pub fn sum(&self, other: &Self) -> Constraint<Magnitude> {
        self.combine(other, |a, b| a + b)
    }
}

impl<D> From<f64> for Constraint<D> {
    fn from(value: f64) -> Self {
        Constraint::constant(value)
    }
}

/// Larger of two formulas, explicit
pub fn max<D>(a: &Constraint<D>, b: &Constraint<D>) -> Constraint<D> {
    a.combine(b, f64::max).explicit()
}

/// Smaller of two formulas, explicit
pub fn min<D>(a: &Constraint<D>, b: &Constraint<D>) -> Constraint<D> {
    a.combine(b, f64::min).explicit()
}

pub fn max_value<D>(a: &Constraint<D>, value: f64) -> Constraint<D> {
    a.map(move |v| v.max(value)).explicit()
}

pub fn min_value<D>(a: &Constraint<D>, value: f64) -> Constraint<D> {
    a.map(move |v| v.min(value)).explicit()
}

/// A magnitude the element may not report, such as its ideal width
#[derive(Clone)]
pub struct Optional {
    block: Block,
}

impl Optional {
    pub(crate) fn new(block: impl Fn(&dyn ElementTree) -> Option<f64> + 'static) -> Self {
        Self {
            block: Rc::new(block),
        }
    }

    /// A value that is never reported
    pub fn absent() -> Self {
        Self::new(|_| None)
    }

    /// Use `fallback` whenever the value is not reported
    pub fn or(&self, fallback: impl Into<Constraint<Magnitude>>) -> Constraint<Magnitude> {
        let fallback = fallback.into();
        let block = Rc::clone(&self.block);
        let other = Rc::clone(&fallback.block);
        Constraint::new(
            fallback.target,
            fallback.dependencies.clone(),
            fallback.default,
            Rc::new(move |host| block(host).or_else(|| other(host))),
        )
    }
}

impl fmt::Debug for Optional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optional").finish_non_exhaustive()
    }
}
