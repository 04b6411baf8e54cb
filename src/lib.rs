//! Constraint Layout - relational layout resolution for rectangular elements
//!
//! Elements live in a host that implements [`ElementTree`]. Layouts declare
//! relations between elements that share a container and, on each pass, write
//! one rectangle per element back to the host.
//!
//! # Example
//!
//! ```rust
//! use constraint_layout::{ConstraintLayout, ElementTree, ParentContext, Rectangle, Scene, Size};
//!
//! let mut scene = Scene::new(Size::new(400.0, 300.0));
//! let panel = scene.add(Rectangle::new(0.0, 0.0, 100.0, 20.0));
//!
//! let mut layout = ConstraintLayout::new();
//! layout
//!     .constrain(&scene, [panel], |[panel], parent| {
//!         panel.set_center_y(parent.center_y());
//!         panel.set_width(parent.width().sub(20.0));
//!         panel.set_left(parent.left().add(10.0));
//!     })
//!     .unwrap();
//!
//! layout.layout(&mut scene, ParentContext::Root).into_result().unwrap();
//! assert_eq!(scene.bounds(panel), Some(Rectangle::new(10.0, 140.0, 380.0, 20.0)));
//! ```

pub mod element;
pub mod geometry;
pub mod layout;

pub use element::{ElementId, ElementTree, ParentContext, Scene};
pub use geometry::{Insets, Point, Rectangle, Size};
pub use layout::{
    constrain, constrain_within, Bounds, ConstraintDsl, ConstraintLayout, Constraints, LayoutConfig,
    LayoutError, LayoutPass, LinearConstraint, ParentConstraints, SolverLayout, Strength,
};
