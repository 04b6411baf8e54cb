//! Graph resolver for per-property constraint formulas
//!
//! A [`ConstraintLayout`] keeps one [`Constraints`] bundle per element and
//! lays out one parent context at a time:
//!
//! 1. **Pruning**: drop bundles whose element left the host or changed container
//! 2. **Walk**: resolve every registered element of the context, recursively
//!    resolving the elements its explicit formulas depend on first
//! 3. **Derivation**: fill each axis's unset position and size from the
//!    explicit values, in a fixed precedence
//! 4. **Commit**: write one rectangle per element
//!
//! Evaluation order is discovered during the walk, so cycles are detected with
//! a stack of elements currently being resolved rather than a topological sort.
//! A cycle aborts only the elements on that stack; the rest of the context
//! still resolves.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::element::{ElementId, ElementTree, ParentContext};
use crate::geometry::Rectangle;

use super::bundle::{Constraints, ParentConstraints};
use super::constraint::Constraint;
use super::error::{LayoutError, StaleReference};

/// Outcome of one resolver pass
#[derive(Debug, Default)]
pub struct LayoutPass {
    /// Elements whose bounds were written, in commit order
    pub committed: Vec<ElementId>,
    /// Errors isolated to part of the context
    pub errors: Vec<LayoutError>,
    /// Formulas that fell back to defaults because a dependency is gone
    pub stale: Vec<StaleReference>,
}

impl LayoutPass {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error of the pass, if any
    pub fn into_result(self) -> Result<Vec<ElementId>, LayoutError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.committed),
        }
    }
}

/// Layout built from per-property formulas
///
/// Bundles are created the first time an element is constrained and survive
/// until the element is unconstrained, removed from the host, or moved to a
/// different container.
#[derive(Debug, Default)]
pub struct ConstraintLayout {
    registry: IndexMap<ElementId, Constraints>,
}

impl ConstraintLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain a fixed number of elements sharing one container
    ///
    /// Fails before touching the registry if the elements do not all share
    /// the same parent context.
    ///
    /// ```
    /// use constraint_layout::{ConstraintLayout, ParentContext, Rectangle, Scene, Size};
    ///
    /// let mut scene = Scene::new(Size::new(200.0, 100.0));
    /// let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
    /// let b = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
    ///
    /// let mut layout = ConstraintLayout::new();
    /// layout
    ///     .constrain(&scene, [a, b], |[a, b], parent| {
    ///         a.set_left(parent.left());
    ///         a.set_width(parent.width().divide(2.0));
    ///         b.set_left(a.right());
    ///         b.set_right(parent.right());
    ///     })
    ///     .unwrap();
    ///
    /// layout.layout(&mut scene, ParentContext::Root).into_result().unwrap();
    /// assert_eq!(scene.bounds(b).unwrap().x, 100.0);
    /// # use constraint_layout::ElementTree;
    /// ```
    pub fn constrain<const N: usize>(
        &mut self,
        host: &dyn ElementTree,
        elements: [ElementId; N],
        body: impl FnOnce([&mut Constraints; N], &ParentConstraints),
    ) -> Result<&mut Self, LayoutError> {
        let parent = shared_parent(host, &elements)?;
        let mut bundles = elements.map(|element| self.take_bundle(element, parent));
        body(bundles.each_mut(), &parent);
        self.restore(bundles);
        Ok(self)
    }

    /// Constrain any number of elements sharing one container
    pub fn constrain_all(
        &mut self,
        host: &dyn ElementTree,
        elements: &[ElementId],
        body: impl FnOnce(&mut [Constraints], &ParentConstraints),
    ) -> Result<&mut Self, LayoutError> {
        let parent = shared_parent(host, elements)?;
        let mut bundles: Vec<Constraints> = elements
            .iter()
            .map(|&element| self.take_bundle(element, parent))
            .collect();
        body(&mut bundles, &parent);
        self.restore(bundles);
        Ok(self)
    }

    /// Existing bundle for `element`, or a fresh one
    ///
    /// A bundle declared against a different container is discarded.
    fn take_bundle(&mut self, element: ElementId, parent: ParentConstraints) -> Constraints {
        let fresh = Constraints::new(element, parent);
        match self.registry.get_mut(&element) {
            Some(existing) if existing.context() == parent.context() => {
                std::mem::replace(existing, fresh)
            }
            Some(_) => {
                tracing::debug!("replacing constraints of {}: container changed", element);
                fresh
            }
            None => fresh,
        }
    }

    fn restore(&mut self, bundles: impl IntoIterator<Item = Constraints>) {
        for bundle in bundles {
            // re-inserting an existing key keeps its position
            self.registry.insert(bundle.element(), bundle);
        }
    }

    /// Forget the constraints of `elements`
    ///
    /// Formulas of other elements that still reference them fall back to
    /// defaults on the next pass.
    pub fn unconstrain(&mut self, elements: &[ElementId]) -> &mut Self {
        for element in elements {
            self.registry.shift_remove(element);
        }
        self
    }

    /// Notification that `element` moved to a different container
    pub fn parent_changed(&mut self, element: ElementId) {
        if self.registry.shift_remove(&element).is_some() {
            tracing::debug!("dropped constraints of {} after parent change", element);
        }
    }

    pub fn is_constrained(&self, element: ElementId) -> bool {
        self.registry.contains_key(&element)
    }

    pub fn constraints(&self, element: ElementId) -> Option<&Constraints> {
        self.registry.get(&element)
    }

    /// Resolve and commit bounds for every element registered under `context`
    pub fn layout(&mut self, host: &mut dyn ElementTree, context: ParentContext) -> LayoutPass {
        self.prune(host);

        tracing::debug!(
            "laying out {} ({} registered elements)",
            context,
            self.registry.len()
        );

        let members: Vec<ElementId> = host
            .children(context)
            .into_iter()
            .filter(|element| {
                self.registry
                    .get(element)
                    .is_some_and(|bundle| bundle.context() == Some(context))
            })
            .collect();
        let mut pass = Pass::new(&self.registry, host, Some(context));
        for element in members {
            pass.visit(element);
        }
        pass.report
    }

    /// Drop bundles whose element is gone or sits in a different container
    fn prune(&mut self, host: &dyn ElementTree) {
        self.registry.retain(|&element, bundle| {
            let current = if host.contains(element) {
                ParentContext::of(host, element)
            } else {
                None
            };
            let keep = current.is_some() && current == bundle.context();
            if !keep {
                tracing::warn!("dropping constraints of {}: no longer in its container", element);
            }
            keep
        });
    }
}

/// Create a layout and constrain `elements` in it
pub fn constrain<const N: usize>(
    host: &dyn ElementTree,
    elements: [ElementId; N],
    body: impl FnOnce([&mut Constraints; N], &ParentConstraints),
) -> Result<ConstraintLayout, LayoutError> {
    let mut layout = ConstraintLayout::new();
    layout.constrain(host, elements, body)?;
    Ok(layout)
}

/// Lay out one element immediately against a fixed rectangle
///
/// Formulas may only reference the element itself and the rectangle; any
/// other dependency is stale.
pub fn constrain_within(
    host: &mut dyn ElementTree,
    element: ElementId,
    within: Rectangle,
    body: impl FnOnce(&mut Constraints, &ParentConstraints),
) -> Result<Rectangle, LayoutError> {
    if !host.contains(element) {
        return Err(LayoutError::declaration(
            vec![element],
            "element is not part of the host",
        ));
    }
    let parent = ParentConstraints::within(within);
    let mut bundle = Constraints::new(element, parent);
    body(&mut bundle, &parent);

    let registry = IndexMap::from([(element, bundle)]);
    let mut pass = Pass::new(&registry, host, None);
    pass.visit(element);
    pass.report.into_result()?;

    host.bounds(element)
        .ok_or_else(|| LayoutError::declaration(vec![element], "element is not part of the host"))
}

/// Parent shared by every element of a declaration
fn shared_parent(
    host: &dyn ElementTree,
    elements: &[ElementId],
) -> Result<ParentConstraints, LayoutError> {
    let Some((&first, rest)) = elements.split_first() else {
        return Err(LayoutError::declaration(Vec::new(), "no elements given"));
    };

    let mut seen = HashSet::new();
    if let Some(duplicate) = elements.iter().find(|e| !seen.insert(**e)) {
        return Err(LayoutError::declaration(
            vec![*duplicate],
            "element listed more than once",
        ));
    }

    let context = ParentContext::of(host, first).ok_or_else(|| {
        LayoutError::declaration(vec![first], "element has no parent and is not displayed")
    })?;

    let strays: Vec<ElementId> = rest
        .iter()
        .copied()
        .filter(|&e| ParentContext::of(host, e) != Some(context))
        .collect();
    if !strays.is_empty() {
        let mut involved = vec![first];
        involved.extend(strays);
        return Err(LayoutError::declaration(
            involved,
            "elements must all share the same parent",
        ));
    }

    Ok(ParentConstraints::for_context(context))
}

/// Fill the unset position and size of one axis
///
/// Inputs are the explicitly evaluated `start`, `extent`, `middle` and `end`
/// values plus the element's current position and size. The first matching
/// rule wins.
pub(crate) fn derive_axis(
    start: Option<f64>,
    extent: Option<f64>,
    middle: Option<f64>,
    end: Option<f64>,
    current_start: f64,
    current_extent: f64,
) -> (f64, f64) {
    let start = start.unwrap_or_else(|| match (middle, end, extent) {
        (Some(middle), _, Some(extent)) => middle - extent / 2.0,
        (Some(middle), Some(end), None) => end - (end - middle) * 2.0,
        (None, Some(end), Some(extent)) => end - extent,
        (Some(middle), None, None) => middle - current_extent / 2.0,
        (None, Some(end), None) => end - current_extent,
        (None, None, _) => current_start,
    });

    let extent = extent.unwrap_or_else(|| match (middle, end) {
        (Some(middle), _) => (middle - start) * 2.0,
        (None, Some(end)) => end - start,
        (None, None) => current_extent,
    });

    (start, extent)
}

/// Why resolution of an element stopped
enum Abort {
    /// A fresh error, reported once
    Error(LayoutError),
    /// A dependency already failed earlier in the pass
    Dependency,
}

/// State of one resolver pass
struct Pass<'a, 'h> {
    registry: &'a IndexMap<ElementId, Constraints>,
    host: &'a mut (dyn ElementTree + 'h),
    context: Option<ParentContext>,
    /// Elements currently being resolved, innermost last
    processing: Vec<ElementId>,
    processed: HashSet<ElementId>,
    failed: HashSet<ElementId>,
    report: LayoutPass,
}

impl<'a, 'h> Pass<'a, 'h> {
    fn new(
        registry: &'a IndexMap<ElementId, Constraints>,
        host: &'a mut (dyn ElementTree + 'h),
        context: Option<ParentContext>,
    ) -> Self {
        Self {
            registry,
            host,
            context,
            processing: Vec::new(),
            processed: HashSet::new(),
            failed: HashSet::new(),
            report: LayoutPass::default(),
        }
    }

    /// Resolve `element` unless already settled; isolate any failure
    fn visit(&mut self, element: ElementId) {
        if self.processed.contains(&element) || self.failed.contains(&element) {
            return;
        }
        if let Err(abort) = self.resolve(element) {
            for failed in self.processing.drain(..) {
                self.failed.insert(failed);
            }
            self.failed.insert(element);
            if let Abort::Error(err) = abort {
                tracing::warn!("layout of {} aborted: {}", element, err);
                self.report.errors.push(err);
            }
        }
    }

    fn resolve(&mut self, element: ElementId) -> Result<(), Abort> {
        if let Some(position) = self.processing.iter().position(|&e| e == element) {
            let mut cycle = self.processing[position..].to_vec();
            cycle.push(element);
            return Err(Abort::Error(LayoutError::circular(cycle)));
        }
        let registry = self.registry;
        let Some(bundle) = registry.get(&element) else {
            return Ok(());
        };

        self.processing.push(element);

        let top = self.process(element, &bundle.top)?;
        let height = self.process(element, &bundle.height)?;
        let center_y = self.process(element, &bundle.center_y)?;
        let bottom = self.process(element, &bundle.bottom)?;

        let left = self.process(element, &bundle.left)?;
        let width = self.process(element, &bundle.width)?;
        let center_x = self.process(element, &bundle.center_x)?;
        let right = self.process(element, &bundle.right)?;

        self.processing.pop();
        self.processed.insert(element);

        // removed from the host mid-pass
        let Some(current) = self.host.bounds(element) else {
            return Ok(());
        };
        let (y, h) = derive_axis(top, height, center_y, bottom, current.y, current.height);
        let (x, w) = derive_axis(left, width, center_x, right, current.x, current.width);

        let bounds = Rectangle::new(x, y, w.max(0.0), h.max(0.0));
        tracing::debug!(
            "committing {}: x={:.1} y={:.1} w={:.1} h={:.1}",
            element,
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height
        );
        self.host.set_bounds(element, bounds);
        self.report.committed.push(element);
        Ok(())
    }

    /// Value of an explicit formula, `None` for defaults and stale references
    fn process<D>(
        &mut self,
        element: ElementId,
        constraint: &Constraint<D>,
    ) -> Result<Option<f64>, Abort> {
        if constraint.is_default() {
            return Ok(None);
        }

        for &dependency in constraint.dependencies() {
            if dependency == element || self.processed.contains(&dependency) {
                continue;
            }
            if self.failed.contains(&dependency) {
                return Err(Abort::Dependency);
            }
            let managed = self
                .registry
                .get(&dependency)
                .is_some_and(|bundle| bundle.context() == self.context);
            if !managed {
                self.stale(element, dependency);
                return Ok(None);
            }
            self.resolve(dependency)?;
        }

        let value = constraint.evaluate(&*self.host);
        tracing::trace!("{} evaluated to {:?}", element, value);
        Ok(value)
    }

    fn stale(&mut self, element: ElementId, referenced: ElementId) {
        let reference = StaleReference {
            element,
            referenced,
        };
        if !self.report.stale.contains(&reference) {
            tracing::warn!(
                "constraint on {} references {}, which is no longer managed by this layout",
                element,
                referenced
            );
            self.report.stale.push(reference);
        }
    }
}
