//! Strength-based layout
//!
//! Declarations produce `(expression, operator, strength)` relations that are
//! kept until removed. Each pass folds read-only quantities into constants,
//! hands the relations of one parent context to a fresh [`ConstraintSolver`]
//! and commits the solved rectangles. A pass either commits every element of
//! the context or none of them.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

use crate::element::{ElementId, ElementTree, ParentContext};
use crate::geometry::Rectangle;

use super::bounds::{Bounds, ConstraintDsl, ParentBounds};
use super::config::LayoutConfig;
use super::error::LayoutError;
use super::expression::{Expression, GeometryWriter, Property, Term, Variable};
use super::solver::{ConstraintSolver, SolverError};
use super::strength::LinearConstraint;

/// Violations below this are treated as satisfied
const TOLERANCE: f64 = 1.0e-6;

/// Handle to one declaration block, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Block {
    context: ParentContext,
    elements: BTreeSet<ElementId>,
    constraints: Vec<LinearConstraint>,
}

impl Block {
    fn references(&self, element: ElementId) -> bool {
        self.elements.contains(&element)
    }
}

/// Layout built from prioritized linear relations
#[derive(Debug, Default)]
pub struct SolverLayout {
    config: LayoutConfig,
    blocks: IndexMap<BlockId, Block>,
    next_block: u64,
}

impl SolverLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Declare relations between a fixed number of elements sharing one container
    ///
    /// Nothing is kept if the elements do not share a parent context or the
    /// body fails.
    pub fn constrain<const N: usize>(
        &mut self,
        host: &dyn ElementTree,
        elements: [ElementId; N],
        body: impl FnOnce([Bounds; N], &mut ConstraintDsl<'_>) -> Result<(), LayoutError>,
    ) -> Result<BlockId, LayoutError> {
        let context = shared_context(host, &elements)?;
        let mut dsl = ConstraintDsl::new(host, ParentBounds::new(context), &self.config);
        body(elements.map(Bounds::new), &mut dsl)?;
        let constraints = dsl.into_constraints();
        self.insert_block(host, context, &elements, constraints)
    }

    /// Declare relations between any number of elements sharing one container
    pub fn constrain_all(
        &mut self,
        host: &dyn ElementTree,
        elements: &[ElementId],
        body: impl FnOnce(&[Bounds], &mut ConstraintDsl<'_>) -> Result<(), LayoutError>,
    ) -> Result<BlockId, LayoutError> {
        let context = shared_context(host, elements)?;
        let mut dsl = ConstraintDsl::new(host, ParentBounds::new(context), &self.config);
        let bounds: Vec<Bounds> = elements.iter().copied().map(Bounds::new).collect();
        body(&bounds, &mut dsl)?;
        let constraints = dsl.into_constraints();
        self.insert_block(host, context, elements, constraints)
    }

    /// Keep a block once every element it mentions is known to share `context`
    fn insert_block(
        &mut self,
        host: &dyn ElementTree,
        context: ParentContext,
        elements: &[ElementId],
        constraints: Vec<LinearConstraint>,
    ) -> Result<BlockId, LayoutError> {
        let mut involved: BTreeSet<ElementId> = elements.iter().copied().collect();
        for constraint in &constraints {
            involved.extend(referenced_elements(constraint));
        }
        let strays: Vec<ElementId> = involved
            .iter()
            .copied()
            .filter(|&e| ParentContext::of(host, e) != Some(context))
            .collect();
        if !strays.is_empty() {
            return Err(LayoutError::declaration(
                strays,
                format!("relations reach outside {}", context),
            ));
        }

        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.insert(
            id,
            Block {
                context,
                elements: involved,
                constraints,
            },
        );
        Ok(id)
    }

    /// Add a single relation outside any declaration block
    pub fn add_constraint(
        &mut self,
        host: &dyn ElementTree,
        constraint: LinearConstraint,
    ) -> Result<BlockId, LayoutError> {
        if constraint.is_degenerate() {
            return Err(LayoutError::DegenerateConstraint {
                constraint: constraint.to_string(),
            });
        }
        let elements: Vec<ElementId> = referenced_elements(&constraint).into_iter().collect();
        let context = shared_context(host, &elements)?;
        self.insert_block(host, context, &elements, vec![constraint])
    }

    /// Remove the first relation equal to `constraint`
    pub fn remove_constraint(&mut self, constraint: &LinearConstraint) -> bool {
        let found = self.blocks.iter_mut().find_map(|(id, block)| {
            let index = block.constraints.iter().position(|c| c == constraint)?;
            block.constraints.remove(index);
            Some((*id, block.constraints.is_empty()))
        });
        match found {
            Some((id, emptied)) => {
                if emptied {
                    self.blocks.shift_remove(&id);
                }
                true
            }
            None => false,
        }
    }

    /// Remove every relation of one declaration block
    pub fn unconstrain_block(&mut self, block: BlockId) -> bool {
        self.blocks.shift_remove(&block).is_some()
    }

    /// Remove every block that mentions `element`
    pub fn unconstrain(&mut self, element: ElementId) -> &mut Self {
        self.blocks.retain(|_, block| !block.references(element));
        self
    }

    /// Notification that `element` moved to a different container
    pub fn parent_changed(&mut self, element: ElementId) {
        let before = self.blocks.len();
        self.unconstrain(element);
        if self.blocks.len() != before {
            tracing::debug!("dropped constraints of {} after parent change", element);
        }
    }

    /// Relations that apply to `context`
    pub fn constraints(&self, context: ParentContext) -> impl Iterator<Item = &LinearConstraint> {
        self.blocks
            .values()
            .filter(move |block| block.context == context)
            .flat_map(|block| block.constraints.iter())
    }

    /// Drop blocks mentioning an element that left the host or its container
    fn prune(&mut self, host: &dyn ElementTree) {
        self.blocks.retain(|id, block| {
            let stray = block.elements.iter().find(|&&element| {
                !host.contains(element) || ParentContext::of(host, element) != Some(block.context)
            });
            match stray {
                Some(element) => {
                    tracing::warn!(
                        "dropping {}: {} is no longer in {}",
                        id,
                        element,
                        block.context
                    );
                    false
                }
                None => true,
            }
        });
    }

    /// Solve `context` and commit every element it constrains
    ///
    /// On failure nothing is written back.
    pub fn layout(
        &mut self,
        host: &mut dyn ElementTree,
        context: ParentContext,
    ) -> Result<Vec<ElementId>, LayoutError> {
        self.prune(host);

        let mut relations = Vec::new();
        for constraint in self.constraints(context) {
            match fold_read_only(constraint.expression(), host) {
                Some(expr) => relations.push(LinearConstraint::with_epsilon(
                    expr,
                    constraint.operator(),
                    constraint.strength(),
                    self.config.epsilon,
                )),
                None => tracing::warn!("skipping {}: it reads an unknown element", constraint),
            }
        }
        tracing::debug!("solving {} with {} relations", context, relations.len());

        let mut variables: BTreeSet<Variable> = BTreeSet::new();
        for relation in &relations {
            variables.extend(relation.expression().terms().iter().map(|t| t.variable.clone()));
        }

        let mut solver = ConstraintSolver::new();
        for relation in &relations {
            solver.add_constraint(relation).map_err(|e| infeasible(context, e))?;
        }
        if self.config.non_negative_sizes {
            for variable in variables.iter().filter(|v| is_extent(v)) {
                let non_negative = LinearConstraint::ge(Term::from(variable.clone()), 0.0);
                solver
                    .add_constraint(&non_negative)
                    .map_err(|e| infeasible(context, e))?;
            }
        }
        for variable in &variables {
            if let Some(current) = variable.read(host) {
                solver.suggest_value(variable, current, self.config.preserve_strength)?;
            }
        }
        let solution = solver.solve();

        for relation in relations.iter().filter(|r| !r.strength().is_required()) {
            if let Some(miss) = solution.violation(relation).filter(|&m| m > TOLERANCE) {
                tracing::warn!("relaxed {} by {:.3}", relation, miss);
            }
        }

        let mut staging = Staging::new(host);
        // plain properties first so piecewise writes see solved sides
        let (plain, piecewise): (Vec<&Variable>, Vec<&Variable>) = variables
            .iter()
            .partition(|v| matches!(v, Variable::Element { .. }));
        for variable in plain.into_iter().chain(piecewise) {
            if let Some(value) = solution.get(variable) {
                variable.write(&mut staging, value);
            }
        }

        let staged = staging.into_bounds();
        let mut committed = Vec::with_capacity(staged.len());
        for (element, bounds) in staged {
            let bounds = Rectangle::new(
                bounds.x,
                bounds.y,
                bounds.width.max(0.0),
                bounds.height.max(0.0),
            );
            tracing::debug!(
                "committing {}: x={:.1} y={:.1} w={:.1} h={:.1}",
                element,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height
            );
            host.set_bounds(element, bounds);
            committed.push(element);
        }
        Ok(committed)
    }
}

fn infeasible(context: ParentContext, err: SolverError) -> LayoutError {
    match err {
        SolverError::Unsatisfiable { reason, .. } => LayoutError::infeasible(context, reason),
        other => LayoutError::Solver(other),
    }
}

fn is_extent(variable: &Variable) -> bool {
    matches!(variable, Variable::Element { property, .. } if property.is_extent())
}

fn referenced_elements(constraint: &LinearConstraint) -> BTreeSet<ElementId> {
    constraint
        .expression()
        .terms()
        .iter()
        .flat_map(|term| term.variable.elements())
        .collect()
}

/// Replace read-only variables by their current values
fn fold_read_only(expr: &Expression, host: &dyn ElementTree) -> Option<Expression> {
    let mut terms = Vec::new();
    let mut constant = expr.constant();
    for term in expr.terms() {
        if term.variable.is_read_only() {
            constant += term.value(host)?;
        } else {
            terms.push(term.clone());
        }
    }
    Some(Expression::new(terms, constant))
}

/// Context shared by every element of a declaration
fn shared_context(host: &dyn ElementTree, elements: &[ElementId]) -> Result<ParentContext, LayoutError> {
    let Some(&first) = elements.first() else {
        return Err(LayoutError::declaration(Vec::new(), "no elements given"));
    };
    let context = ParentContext::of(host, first).ok_or_else(|| {
        LayoutError::declaration(vec![first], "element has no parent and is not displayed")
    })?;
    let strays: Vec<ElementId> = elements
        .iter()
        .copied()
        .filter(|&e| ParentContext::of(host, e) != Some(context))
        .collect();
    if strays.is_empty() {
        Ok(context)
    } else {
        let mut involved = vec![first];
        involved.extend(strays);
        Err(LayoutError::declaration(
            involved,
            "elements must all share the same parent",
        ))
    }
}

/// Solved geometry not yet written to the host
struct Staging<'a> {
    host: &'a dyn ElementTree,
    bounds: IndexMap<ElementId, Rectangle>,
}

impl<'a> Staging<'a> {
    fn new(host: &'a dyn ElementTree) -> Self {
        Self {
            host,
            bounds: IndexMap::new(),
        }
    }

    fn current(&self, element: ElementId) -> Option<Rectangle> {
        self.bounds
            .get(&element)
            .copied()
            .or_else(|| self.host.bounds(element))
    }

    fn into_bounds(self) -> IndexMap<ElementId, Rectangle> {
        self.bounds
    }
}

impl GeometryWriter for Staging<'_> {
    fn read(&self, variable: &Variable) -> Option<f64> {
        match variable {
            Variable::Element { element, property } if !property.is_read_only() => {
                let bounds = self.current(*element)?;
                Some(match property {
                    Property::Left => bounds.x,
                    Property::Top => bounds.y,
                    Property::Width => bounds.width,
                    _ => bounds.height,
                })
            }
            Variable::Max(a, b) => Some(self.evaluate(a.expression())?.max(self.evaluate(b.expression())?)),
            Variable::Min(a, b) => Some(self.evaluate(a.expression())?.min(self.evaluate(b.expression())?)),
            other => other.read(self.host),
        }
    }

    fn write_property(&mut self, element: ElementId, property: Property, value: f64) {
        let Some(mut bounds) = self.current(element) else {
            return;
        };
        match property {
            Property::Left => bounds.x = value,
            Property::Top => bounds.y = value,
            Property::Width => bounds.width = value,
            Property::Height => bounds.height = value,
            _ => return,
        }
        self.bounds.insert(element, bounds);
    }
}
