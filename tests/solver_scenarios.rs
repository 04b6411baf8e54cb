//! Scenario tests for the strength-based layout
//!
//! These verify that solved rectangles satisfy the declared relations, that
//! weaker relations give way to stronger ones, and that infeasible systems
//! leave the host untouched.

use constraint_layout::layout::bounds::{self, Bounds};
use constraint_layout::layout::{Expression, Term};
use constraint_layout::{
    ElementId, ElementTree, Insets, LayoutConfig, LayoutError, LinearConstraint, ParentContext,
    Rectangle, Scene, Size, SolverLayout, Strength,
};
use pretty_assertions::assert_eq;

const TOLERANCE: f64 = 0.001;

fn get_bounds(scene: &Scene, id: ElementId) -> Rectangle {
    scene
        .bounds(id)
        .unwrap_or_else(|| panic!("element '{}' not found", id))
}

fn assert_rect(actual: Rectangle, expected: Rectangle) {
    let close = |a: f64, b: f64| (a - b).abs() < TOLERANCE;
    assert!(
        close(actual.x, expected.x)
            && close(actual.y, expected.y)
            && close(actual.width, expected.width)
            && close(actual.height, expected.height),
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

/// Two equal-width views split the display with no independent anchor.
#[test]
fn test_horizontal_split() {
    let mut scene = Scene::new(Size::new(200.0, 50.0));
    let l = scene.add(Rectangle::new(0.0, 0.0, 10.0, 50.0));
    let r = scene.add(Rectangle::new(0.0, 0.0, 10.0, 50.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [l, r], |[l, r], dsl| {
            let parent = *dsl.parent();
            dsl.eq(l.left(), parent.left())?;
            dsl.eq(r.left(), l.right())?;
            dsl.eq(r.right(), parent.right())?;
            dsl.eq(l.width(), r.width())?;
            Ok(())
        })
        .unwrap();

    let committed = layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert_eq!(committed.len(), 2);
    assert_rect(get_bounds(&scene, l), Rectangle::new(0.0, 0.0, 100.0, 50.0));
    assert_rect(get_bounds(&scene, r), Rectangle::new(100.0, 0.0, 100.0, 50.0));
}

/// A weak relation gives way to a required one.
#[test]
fn test_required_beats_weak() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.width(), 50.0)?;
            dsl.eq(a.width(), 100.0)?.set_strength(Strength::WEAK);
            Ok(())
        })
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert_rect(get_bounds(&scene, a), Rectangle::new(0.0, 0.0, 50.0, 10.0));
}

/// Between two optional relations the stronger one wins.
#[test]
fn test_stronger_optional_relation_wins() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.width(), 100.0)?.set_strength(Strength::MEDIUM);
            dsl.eq(a.width(), 60.0)?.set_strength(Strength::STRONG);
            Ok(())
        })
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert!((get_bounds(&scene, a).width - 60.0).abs() < TOLERANCE);
}

/// Conflicting required relations fail the pass and write nothing.
#[test]
fn test_infeasible_leaves_bounds_unchanged() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let original = Rectangle::new(5.0, 6.0, 150.0, 20.0);
    let a = scene.add(original);
    let b = scene.add(Rectangle::zero());

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a, b], |[a, b], dsl| {
            dsl.eq(b.left(), a.right())?;
            dsl.ge(a.width(), 200.0)?;
            dsl.le(a.width(), 100.0)?;
            Ok(())
        })
        .unwrap();

    let result = layout.layout(&mut scene, ParentContext::Root);

    match result {
        Err(LayoutError::Infeasible { context, .. }) => assert_eq!(context, ParentContext::Root),
        other => panic!("Expected Infeasible, got: {:?}", other),
    }
    assert_eq!(get_bounds(&scene, a), original);
    assert_eq!(get_bounds(&scene, b), Rectangle::zero());
}

/// A reported minimum width bounds a weaker preferred width.
#[test]
fn test_minimum_width_inequality() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
    scene.set_minimum_size(a, Size::new(40.0, 0.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.ge(a.width(), a.min_width())?;
            dsl.eq(a.width(), 10.0)?.set_strength(Strength::MEDIUM);
            Ok(())
        })
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert!((get_bounds(&scene, a).width - 40.0).abs() < TOLERANCE);
}

/// A relation over the larger of two widths writes to the larger side only.
#[test]
fn test_max_writes_to_larger_side() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 50.0, 10.0));
    let b = scene.add(Rectangle::new(0.0, 20.0, 20.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a, b], |[a, b], dsl| {
            dsl.eq(Term::max(&a.width(), &b.width()), 100.0)?;
            Ok(())
        })
        .unwrap();

    let committed = layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert_eq!(committed, vec![a]);
    assert!((get_bounds(&scene, a).width - 100.0).abs() < TOLERANCE);
    assert_eq!(get_bounds(&scene, b).width, 20.0);
}

/// A constant side of a maximum survives; the element side takes the write.
#[test]
fn test_max_with_constant_side() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 120.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            let floor = Expression::max(&a.width().into(), &Expression::constant_value(100.0));
            dsl.eq(floor, 150.0)?;
            Ok(())
        })
        .unwrap();

    let committed = layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert_eq!(committed, vec![a]);
    assert!((get_bounds(&scene, a).width - 150.0).abs() < TOLERANCE);
}

/// A multi-term side is written through its first writable term.
#[test]
fn test_max_of_right_edge_moves_left() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(50.0, 0.0, 80.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            let right = a.left().add(a.width());
            dsl.eq(Expression::max(&right, &Expression::constant_value(100.0)), 180.0)?;
            Ok(())
        })
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert_rect(get_bounds(&scene, a), Rectangle::new(100.0, 0.0, 80.0, 10.0));
}

/// Scaled sides compare and solve with their own coefficients.
#[test]
fn test_max_of_scaled_terms() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
    let b = scene.add(Rectangle::new(0.0, 20.0, 1.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a, b], |[a, b], dsl| {
            dsl.eq(Term::max(&a.width().scale(2.0), &b.width().scale(3.0)), 60.0)?;
            Ok(())
        })
        .unwrap();

    let committed = layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert_eq!(committed, vec![a]);
    assert!((get_bounds(&scene, a).width - 30.0).abs() < TOLERANCE);
    assert_eq!(get_bounds(&scene, b).width, 1.0);
}

/// A minimum writes into the currently smaller side.
#[test]
fn test_min_writes_to_smaller_scaled_side() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
    let b = scene.add(Rectangle::new(0.0, 20.0, 1.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a, b], |[a, b], dsl| {
            dsl.eq(Term::min(&a.width().scale(2.0), &b.width().scale(3.0)), 12.0)?;
            Ok(())
        })
        .unwrap();

    let committed = layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert_eq!(committed, vec![b]);
    assert!((get_bounds(&scene, b).width - 4.0).abs() < TOLERANCE);
    assert_eq!(get_bounds(&scene, a).width, 10.0);
}

/// Inset fill against a child container.
#[test]
fn test_fill_with_insets_in_container() {
    let mut scene = Scene::new(Size::new(800.0, 600.0));
    let container = scene.add(Rectangle::new(30.0, 30.0, 200.0, 100.0));
    let child = scene.add_child(container, Rectangle::zero());

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [child], |[child], dsl| {
            bounds::fill_with_insets(Insets::uniform(10.0), Strength::STRONG)(child, dsl)
        })
        .unwrap();

    layout
        .layout(&mut scene, ParentContext::Element(container))
        .unwrap();
    assert_rect(get_bounds(&scene, child), Rectangle::new(10.0, 10.0, 180.0, 80.0));
}

/// Centering keeps the current size through the weak preserve suggestions.
#[test]
fn test_center_preset_keeps_size() {
    let mut scene = Scene::new(Size::new(400.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 100.0, 50.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            bounds::center(a, dsl)?;
            dsl.preserve(a.width())?;
            dsl.preserve(a.height())?;
            Ok(())
        })
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert_rect(get_bounds(&scene, a), Rectangle::new(150.0, 125.0, 100.0, 50.0));
}

/// Relations default to the configured strength.
#[test]
fn test_config_default_strength() {
    let config = LayoutConfig::from_toml_str(
        r#"
default_strength = "strong"
preserve_strength = "weak"
"#,
    )
    .unwrap();

    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));

    let mut layout = SolverLayout::with_config(config);
    layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.width(), 50.0)?;
            Ok(())
        })
        .unwrap();
    layout
        .add_constraint(&scene, LinearConstraint::eq(Bounds::new(a).width(), 80.0))
        .unwrap();

    let strengths: Vec<Strength> = layout
        .constraints(ParentContext::Root)
        .map(|c| c.strength())
        .collect();
    assert_eq!(strengths, vec![Strength::STRONG, Strength::REQUIRED]);

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert!((get_bounds(&scene, a).width - 80.0).abs() < TOLERANCE);
}

/// Removing a relation takes it out of the next pass.
#[test]
fn test_remove_constraint() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));
    let pin = LinearConstraint::eq(Bounds::new(a).width(), 80.0);

    let mut layout = SolverLayout::new();
    layout.add_constraint(&scene, pin.clone()).unwrap();
    layout
        .add_constraint(
            &scene,
            LinearConstraint::eq(Bounds::new(a).width(), 30.0).with_strength(Strength::MEDIUM),
        )
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert!((get_bounds(&scene, a).width - 80.0).abs() < TOLERANCE);

    assert!(layout.remove_constraint(&pin));
    assert!(!layout.remove_constraint(&pin));

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    assert!((get_bounds(&scene, a).width - 30.0).abs() < TOLERANCE);
}

/// Sizes stay non-negative even when a strong relation pulls them below zero.
#[test]
fn test_sizes_are_non_negative() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.left(), 50.0)?;
            dsl.eq(a.right(), 20.0)?.set_strength(Strength::STRONG);
            Ok(())
        })
        .unwrap();

    layout.layout(&mut scene, ParentContext::Root).unwrap();
    let bounds = get_bounds(&scene, a);
    assert!((bounds.x - 50.0).abs() < TOLERANCE);
    assert!(bounds.width.abs() < TOLERANCE);
}

/// A relation with nothing left to solve for is rejected with its block.
#[test]
fn test_degenerate_relation_is_rejected() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let a = scene.add(Rectangle::zero());

    let mut layout = SolverLayout::new();
    let err = layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.width(), 10.0)?;
            let parent_width = dsl.parent().width();
            dsl.eq(parent_width, 100.0)?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, LayoutError::DegenerateConstraint { .. }));
    assert_eq!(layout.constraints(ParentContext::Root).count(), 0);
}

/// Relations may not reach into another container.
#[test]
fn test_relations_outside_context_are_rejected() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let container = scene.add(Rectangle::new(0.0, 0.0, 100.0, 100.0));
    let a = scene.add(Rectangle::zero());
    let nested = scene.add_child(container, Rectangle::zero());

    let mut layout = SolverLayout::new();
    let err = layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.left(), Bounds::new(nested).right())?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, LayoutError::Declaration { .. }));
    assert_eq!(err.elements(), Some(&[nested][..]));
    assert_eq!(layout.constraints(ParentContext::Root).count(), 0);
}

/// Blocks mentioning an element that moved container are dropped.
#[test]
fn test_reparented_element_drops_block() {
    let mut scene = Scene::new(Size::new(300.0, 300.0));
    let container = scene.add(Rectangle::new(0.0, 0.0, 100.0, 100.0));
    let a = scene.add(Rectangle::new(0.0, 0.0, 10.0, 10.0));

    let mut layout = SolverLayout::new();
    layout
        .constrain(&scene, [a], |[a], dsl| {
            dsl.eq(a.width(), 70.0)?;
            Ok(())
        })
        .unwrap();

    scene.set_parent(a, Some(container));
    let committed = layout.layout(&mut scene, ParentContext::Root).unwrap();

    assert!(committed.is_empty());
    assert_eq!(get_bounds(&scene, a).width, 10.0);
}
