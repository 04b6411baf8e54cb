//! Per-element constraint bundles and the parent context they are declared against

use crate::element::{ElementId, ParentContext};
use crate::geometry::{Insets, Rectangle};

use super::constraint::{Constraint, Horizontal, Magnitude, Optional, Vertical};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParentSource {
    Context(ParentContext),
    Within(Rectangle),
}

/// Read-only geometry of the container elements are laid out in
///
/// Positions are in the children's coordinate space, so a container's `top`
/// and `left` are always zero. Parent formulas carry no element
/// dependencies: the container is resolved by whoever lays it out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentConstraints {
    source: ParentSource,
}

impl ParentConstraints {
    pub fn for_context(context: ParentContext) -> Self {
        Self {
            source: ParentSource::Context(context),
        }
    }

    /// A fixed rectangle standing in for a container
    pub fn within(rectangle: Rectangle) -> Self {
        Self {
            source: ParentSource::Within(rectangle),
        }
    }

    /// Context this parent represents, `None` for a fixed rectangle
    pub fn context(&self) -> Option<ParentContext> {
        match self.source {
            ParentSource::Context(context) => Some(context),
            ParentSource::Within(_) => None,
        }
    }

    fn read<D>(&self, read: fn(&Rectangle) -> f64) -> Constraint<D> {
        match self.source {
            ParentSource::Context(context) => Constraint::free(move |host| {
                host.context_size(context)
                    .map(|size| read(&Rectangle::from_size(size)))
            }),
            ParentSource::Within(rectangle) => Constraint::free(move |_| Some(read(&rectangle))),
        }
    }

    pub fn top(&self) -> Constraint<Vertical> {
        self.read(|r| r.y)
    }

    pub fn center_y(&self) -> Constraint<Vertical> {
        self.read(|r| r.center().y)
    }

    pub fn bottom(&self) -> Constraint<Vertical> {
        self.read(|r| r.bottom())
    }

    pub fn height(&self) -> Constraint<Magnitude> {
        self.read(|r| r.height)
    }

    pub fn left(&self) -> Constraint<Horizontal> {
        self.read(|r| r.x)
    }

    pub fn center_x(&self) -> Constraint<Horizontal> {
        self.read(|r| r.center().x)
    }

    pub fn right(&self) -> Constraint<Horizontal> {
        self.read(|r| r.right())
    }

    pub fn width(&self) -> Constraint<Magnitude> {
        self.read(|r| r.width)
    }

    pub fn center(&self) -> (Constraint<Horizontal>, Constraint<Vertical>) {
        (self.center_x(), self.center_y())
    }

    pub fn min_width(&self) -> Constraint<Magnitude> {
        match self.source {
            ParentSource::Context(ParentContext::Element(id)) => {
                Constraint::free(move |host| host.minimum_size(id).map(|s| s.width))
            }
            _ => Constraint::free(|_| Some(0.0)),
        }
    }

    pub fn min_height(&self) -> Constraint<Magnitude> {
        match self.source {
            ParentSource::Context(ParentContext::Element(id)) => {
                Constraint::free(move |host| host.minimum_size(id).map(|s| s.height))
            }
            _ => Constraint::free(|_| Some(0.0)),
        }
    }

    /// Containers never report an ideal size
    pub fn ideal_width(&self) -> Optional {
        Optional::absent()
    }

    pub fn ideal_height(&self) -> Optional {
        Optional::absent()
    }
}

/// The eight directional property slots of one element
///
/// Getters return formulas reading the element's geometry as committed so far
/// in the current pass, so referencing another element makes the resolver
/// lay that element out first. Setters mark the slot explicit.
#[derive(Debug, Clone)]
pub struct Constraints {
    element: ElementId,
    parent: ParentConstraints,
    pub(crate) top: Constraint<Vertical>,
    pub(crate) center_y: Constraint<Vertical>,
    pub(crate) bottom: Constraint<Vertical>,
    pub(crate) height: Constraint<Magnitude>,
    pub(crate) left: Constraint<Horizontal>,
    pub(crate) center_x: Constraint<Horizontal>,
    pub(crate) right: Constraint<Horizontal>,
    pub(crate) width: Constraint<Magnitude>,
}

impl Constraints {
    pub(crate) fn new(element: ElementId, parent: ParentConstraints) -> Self {
        Self {
            element,
            parent,
            top: Constraint::reading(element, |r| r.y),
            center_y: Constraint::reading(element, |r| r.center().y),
            bottom: Constraint::reading(element, |r| r.bottom()),
            height: Constraint::reading(element, |r| r.height),
            left: Constraint::reading(element, |r| r.x),
            center_x: Constraint::reading(element, |r| r.center().x),
            right: Constraint::reading(element, |r| r.right()),
            width: Constraint::reading(element, |r| r.width),
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The container this element is constrained against
    pub fn parent(&self) -> &ParentConstraints {
        &self.parent
    }

    pub(crate) fn context(&self) -> Option<ParentContext> {
        self.parent.context()
    }

    /// `true` if no slot has been assigned
    pub fn is_unconstrained(&self) -> bool {
        self.top.is_default()
            && self.center_y.is_default()
            && self.bottom.is_default()
            && self.height.is_default()
            && self.left.is_default()
            && self.center_x.is_default()
            && self.right.is_default()
            && self.width.is_default()
    }

    pub fn top(&self) -> Constraint<Vertical> {
        Constraint::reading(self.element, |r| r.y)
    }

    pub fn set_top(&mut self, value: impl Into<Constraint<Vertical>>) {
        self.top = value.into().assigned_to(self.element);
    }

    pub fn center_y(&self) -> Constraint<Vertical> {
        Constraint::reading(self.element, |r| r.center().y)
    }

    pub fn set_center_y(&mut self, value: impl Into<Constraint<Vertical>>) {
        self.center_y = value.into().assigned_to(self.element);
    }

    pub fn bottom(&self) -> Constraint<Vertical> {
        Constraint::reading(self.element, |r| r.bottom())
    }

    pub fn set_bottom(&mut self, value: impl Into<Constraint<Vertical>>) {
        self.bottom = value.into().assigned_to(self.element);
    }

    pub fn height(&self) -> Constraint<Magnitude> {
        Constraint::reading(self.element, |r| r.height)
    }

    pub fn set_height(&mut self, value: impl Into<Constraint<Magnitude>>) {
        self.height = value.into().assigned_to(self.element);
    }

    pub fn left(&self) -> Constraint<Horizontal> {
        Constraint::reading(self.element, |r| r.x)
    }

    pub fn set_left(&mut self, value: impl Into<Constraint<Horizontal>>) {
        self.left = value.into().assigned_to(self.element);
    }

    pub fn center_x(&self) -> Constraint<Horizontal> {
        Constraint::reading(self.element, |r| r.center().x)
    }

    pub fn set_center_x(&mut self, value: impl Into<Constraint<Horizontal>>) {
        self.center_x = value.into().assigned_to(self.element);
    }

    pub fn right(&self) -> Constraint<Horizontal> {
        Constraint::reading(self.element, |r| r.right())
    }

    pub fn set_right(&mut self, value: impl Into<Constraint<Horizontal>>) {
        self.right = value.into().assigned_to(self.element);
    }

    pub fn width(&self) -> Constraint<Magnitude> {
        Constraint::reading(self.element, |r| r.width)
    }

    pub fn set_width(&mut self, value: impl Into<Constraint<Magnitude>>) {
        self.width = value.into().assigned_to(self.element);
    }

    pub fn center(&self) -> (Constraint<Horizontal>, Constraint<Vertical>) {
        (self.center_x(), self.center_y())
    }

    pub fn set_center(&mut self, (x, y): (Constraint<Horizontal>, Constraint<Vertical>)) {
        self.set_center_x(x);
        self.set_center_y(y);
    }

    pub fn min_width(&self) -> Constraint<Magnitude> {
        let element = self.element;
        Constraint::free(move |host| host.minimum_size(element).map(|s| s.width))
    }

    pub fn min_height(&self) -> Constraint<Magnitude> {
        let element = self.element;
        Constraint::free(move |host| host.minimum_size(element).map(|s| s.height))
    }

    pub fn ideal_width(&self) -> Optional {
        let element = self.element;
        Optional::new(move |host| host.ideal_size(element).map(|s| s.width))
    }

    pub fn ideal_height(&self) -> Optional {
        let element = self.element;
        Optional::new(move |host| host.ideal_size(element).map(|s| s.height))
    }
}

/// Match the parent's bounds exactly
pub fn fill(constraints: &mut Constraints, parent: &ParentConstraints) {
    constraints.set_top(parent.top());
    constraints.set_left(parent.left());
    constraints.set_width(parent.width());
    constraints.set_height(parent.height());
}

/// Fill the parent, pulling each edge in by `insets`
pub fn fill_with_insets(insets: Insets) -> impl Fn(&mut Constraints, &ParentConstraints) {
    move |constraints: &mut Constraints, parent: &ParentConstraints| {
        constraints.set_top(parent.top().add(insets.top));
        constraints.set_left(parent.left().add(insets.left));
        constraints.set_right(parent.right().sub(insets.right));
        constraints.set_bottom(parent.bottom().sub(insets.bottom));
    }
}

/// Center within the parent, keeping the current size
pub fn center(constraints: &mut Constraints, parent: &ParentConstraints) {
    constraints.set_center(parent.center());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Scene;
    use crate::geometry::Size;

    #[test]
    fn test_setters_mark_slots_explicit() {
        let mut constraints = Constraints::new(
            ElementId::new(1),
            ParentConstraints::for_context(ParentContext::Root),
        );
        assert!(constraints.is_unconstrained());

        constraints.set_width(50.0);
        assert!(!constraints.width.is_default());
        assert!(constraints.height.is_default());
        assert!(!constraints.is_unconstrained());
    }

    #[test]
    fn test_parent_geometry_for_element_context() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let container = scene.add(Rectangle::new(50.0, 50.0, 200.0, 100.0));
        let parent = ParentConstraints::for_context(ParentContext::Element(container));

        assert_eq!(parent.top().evaluate(&scene), Some(0.0));
        assert_eq!(parent.right().evaluate(&scene), Some(200.0));
        assert_eq!(parent.center_y().evaluate(&scene), Some(50.0));
        assert!(parent.width().dependencies().is_empty());
    }

    #[test]
    fn test_parent_geometry_for_root_and_rectangle() {
        let scene = Scene::new(Size::new(800.0, 600.0));
        let root = ParentConstraints::for_context(ParentContext::Root);
        assert_eq!(root.width().evaluate(&scene), Some(800.0));
        assert_eq!(root.min_width().evaluate(&scene), Some(0.0));

        let within = ParentConstraints::within(Rectangle::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(within.top().evaluate(&scene), Some(20.0));
        assert_eq!(within.center_x().evaluate(&scene), Some(25.0));
        assert_eq!(within.context(), None);
    }

    #[test]
    fn test_ideal_width_falls_back_when_unreported() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let id = scene.add(Rectangle::new(0.0, 0.0, 30.0, 30.0));
        let constraints = Constraints::new(id, ParentConstraints::for_context(ParentContext::Root));

        assert_eq!(constraints.ideal_width().or(12.0).evaluate(&scene), Some(12.0));
        scene.set_ideal_size(id, Some(Size::new(64.0, 32.0)));
        assert_eq!(constraints.ideal_width().or(12.0).evaluate(&scene), Some(64.0));
    }
}
