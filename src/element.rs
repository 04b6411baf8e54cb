//! Elements being laid out and the host that owns them
//!
//! The layout engine never owns elements. It reads geometry through the
//! [`ElementTree`] capability and writes one rectangle per element per pass.
//! [`Scene`] is a small in-memory host for callers without their own view tree.

use std::fmt;

use indexmap::IndexMap;

use crate::geometry::{Rectangle, Size};

/// Identity of an element inside its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// The container shared by a group of jointly constrained elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParentContext {
    /// Top-level elements, sized against the display
    Root,
    /// Children of a containing element
    Element(ElementId),
}

impl ParentContext {
    /// Context an element currently belongs to
    ///
    /// Returns `None` for a parentless element that is not displayed, since it
    /// has no container to be measured against.
    pub fn of(host: &dyn ElementTree, element: ElementId) -> Option<ParentContext> {
        match host.parent(element) {
            Some(parent) => Some(ParentContext::Element(parent)),
            None if host.is_displayed(element) => Some(ParentContext::Root),
            None => None,
        }
    }
}

impl fmt::Display for ParentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentContext::Root => write!(f, "root"),
            ParentContext::Element(id) => write!(f, "{}", id),
        }
    }
}

/// Geometry capability the layout engine depends on
///
/// Geometry accessors return `None` when the element is unknown to the host,
/// which the engine treats as a stale reference.
pub trait ElementTree {
    /// Current bounds, relative to the element's container
    fn bounds(&self, element: ElementId) -> Option<Rectangle>;

    /// Replace an element's bounds
    fn set_bounds(&mut self, element: ElementId, bounds: Rectangle);

    fn minimum_size(&self, element: ElementId) -> Option<Size>;

    fn ideal_size(&self, element: ElementId) -> Option<Size>;

    /// Containing element, `None` for top-level elements
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Whether a parentless element is attached to the display
    fn is_displayed(&self, element: ElementId) -> bool;

    /// Size of the virtual root that top-level elements are laid out in
    fn display_size(&self) -> Size;

    /// Elements directly inside `context`
    fn children(&self, context: ParentContext) -> Vec<ElementId>;

    fn contains(&self, element: ElementId) -> bool {
        self.bounds(element).is_some()
    }

    /// Size of the area a context lays its children out in
    fn context_size(&self, context: ParentContext) -> Option<Size> {
        match context {
            ParentContext::Root => Some(self.display_size()),
            ParentContext::Element(id) => self.bounds(id).map(|b| b.size()),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Rectangle,
    minimum_size: Size,
    ideal_size: Option<Size>,
    parent: Option<ElementId>,
    displayed: bool,
}

/// In-memory element hierarchy
#[derive(Debug, Clone)]
pub struct Scene {
    display: Size,
    nodes: IndexMap<ElementId, Node>,
    next_id: u64,
}

impl Scene {
    /// Create an empty scene with a display of the given size
    pub fn new(display: Size) -> Self {
        Self {
            display,
            nodes: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Add a top-level element attached to the display
    pub fn add(&mut self, bounds: Rectangle) -> ElementId {
        self.insert(bounds, None, true)
    }

    /// Add a top-level element that is not attached to the display
    pub fn add_detached(&mut self, bounds: Rectangle) -> ElementId {
        self.insert(bounds, None, false)
    }

    /// Add an element inside `parent`
    pub fn add_child(&mut self, parent: ElementId, bounds: Rectangle) -> ElementId {
        self.insert(bounds, Some(parent), false)
    }

    fn insert(&mut self, bounds: Rectangle, parent: Option<ElementId>, displayed: bool) -> ElementId {
        let id = ElementId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                bounds,
                minimum_size: Size::zero(),
                ideal_size: None,
                parent,
                displayed,
            },
        );
        id
    }

    /// Move an element to a new container (`None` attaches it to the display)
    pub fn set_parent(&mut self, element: ElementId, parent: Option<ElementId>) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.parent = parent;
            node.displayed = parent.is_none();
        }
    }

    /// Remove an element; its children become detached
    pub fn remove(&mut self, element: ElementId) {
        self.nodes.shift_remove(&element);
        for node in self.nodes.values_mut() {
            if node.parent == Some(element) {
                node.parent = None;
                node.displayed = false;
            }
        }
    }

    pub fn set_minimum_size(&mut self, element: ElementId, size: Size) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.minimum_size = size;
        }
    }

    pub fn set_ideal_size(&mut self, element: ElementId, size: Option<Size>) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.ideal_size = size;
        }
    }

    pub fn set_display_size(&mut self, size: Size) {
        self.display = size;
    }
}

impl ElementTree for Scene {
    fn bounds(&self, element: ElementId) -> Option<Rectangle> {
        self.nodes.get(&element).map(|n| n.bounds)
    }

    fn set_bounds(&mut self, element: ElementId, bounds: Rectangle) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.bounds = bounds;
        }
    }

    fn minimum_size(&self, element: ElementId) -> Option<Size> {
        self.nodes.get(&element).map(|n| n.minimum_size)
    }

    fn ideal_size(&self, element: ElementId) -> Option<Size> {
        self.nodes.get(&element).and_then(|n| n.ideal_size)
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.nodes.get(&element).and_then(|n| n.parent)
    }

    fn is_displayed(&self, element: ElementId) -> bool {
        self.nodes
            .get(&element)
            .map(|n| n.parent.is_none() && n.displayed)
            .unwrap_or(false)
    }

    fn display_size(&self) -> Size {
        self.display
    }

    fn children(&self, context: ParentContext) -> Vec<ElementId> {
        self.nodes
            .iter()
            .filter(|(_, node)| match context {
                ParentContext::Root => node.parent.is_none() && node.displayed,
                ParentContext::Element(parent) => node.parent == Some(parent),
            })
            .map(|(id, _)| *id)
            .collect()
    }
}
