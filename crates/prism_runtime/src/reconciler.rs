//! Reconciler
//!
//! Owns the committed tree and the cell store. `update_tree` diffs the
//! committed tree against a proposed one and applies the difference:
//! removals first (torn down deepest-first within each removed subtree),
//! then additions and updates in strict parent-before-child order, one
//! asynchronous evaluation at a time.
//!
//! Updates are not atomic across the whole tree. A failed evaluation is
//! recorded on its cell and halts only that node's descendants; siblings and
//! already-applied ancestors stay as they are.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use prism_event::EventBus;
use prism_state::{NodeRef, StateTree, TransformNode, TreeError};
use prism_transform::{EvalContext, EvalError, Object, TransformRegistry};

use crate::cancel::CancelToken;
use crate::cell::{Cell, CellStatus, CellStore};
use crate::events::{ObjectCreated, ObjectRemoved, ObjectUpdated, UpdateAction};

/// Update failures returned to the caller
///
/// Individual evaluation failures are recorded on cells and do not surface
/// here; see the crate docs for the isolation rules.
#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    /// The proposed tree or a referenced node is structurally invalid
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// The update's cancel token was triggered
    #[error("update cancelled")]
    Cancelled,
    /// Every attempted evaluation failed
    #[error("no node could be evaluated")]
    NothingEvaluated,
}

/// Options for one `update_tree` call
#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    /// Keep evaluating a failed node's descendants instead of skipping them
    pub continue_on_error: bool,
    /// Treat every surviving node as changed and recreate it
    pub recreate_all: bool,
    /// Cancellation flag, checked before each evaluation
    pub cancel: CancelToken,
}

impl UpdateOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep evaluating below failed nodes
    pub fn with_continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Force a full recreate of every node
    pub fn with_recreate_all(mut self) -> Self {
        self.recreate_all = true;
        self
    }

    /// Attach a cancel token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Counts of applied operations, returned by `update_tree`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub errored: usize,
}

enum Action {
    Create,
    Recreate,
    InPlace,
    Keep,
}

/// The reconciliation engine
///
/// Exclusive owner of the committed tree and the cell store; other
/// components read through the accessors and propose changes as new tree
/// values. Overlapping `update_tree` calls must be serialized by the caller.
pub struct Reconciler {
    registry: Arc<TransformRegistry>,
    bus: Arc<EventBus>,
    tree: StateTree,
    cells: CellStore,
}

impl Reconciler {
    /// Create a reconciler over an empty (root-only) tree
    pub fn new(registry: Arc<TransformRegistry>, bus: Arc<EventBus>) -> Self {
        let tree = StateTree::new();
        let mut cells = CellStore::new();
        cells.insert(tree.root(), Cell::with_object(Arc::new(Object::Root)));
        Self {
            registry,
            bus,
            tree,
            cells,
        }
    }

    /// The committed tree
    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    /// The cell store
    pub fn cells(&self) -> &CellStore {
        &self.cells
    }

    /// The event bus lifecycle events are published on
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The transform registry
    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    /// Reconcile the committed tree with a proposed one
    pub async fn update_tree(
        &mut self,
        proposed: StateTree,
        options: UpdateOptions,
    ) -> Result<UpdateReport, UpdateError> {
        if options.cancel.is_cancelled() {
            return Err(UpdateError::Cancelled);
        }

        let old = self.tree.clone();
        let mut report = UpdateReport::default();

        // Removals first, so teardown runs before a replacing addition can
        // observe stale cells.
        let removed: HashSet<NodeRef> = old
            .refs()
            .filter(|r| !proposed.contains(r))
            .cloned()
            .collect();
        for r in old.pre_order(&old.root())? {
            if !removed.contains(&r) || removed.contains(&old.transform(&r)?.parent) {
                continue;
            }
            // `r` is the top of a maximal removed subtree; tear it down
            // children-before-parent so nothing outlives its dependents.
            for victim in old.post_order(&r)? {
                let cell = self.cells.remove(&victim);
                report.removed += 1;
                self.bus.publish(ObjectRemoved {
                    reference: victim,
                    object: cell.and_then(|c| c.object),
                });
            }
        }

        // Commit the structure, then fill in cells top-down.
        self.tree = proposed.clone();

        let mut forced: HashSet<NodeRef> = HashSet::new();
        let mut halted: HashSet<NodeRef> = HashSet::new();
        let mut attempted = 0usize;
        let mut succeeded = 0usize;

        for r in proposed.pre_order(&proposed.root())? {
            if r.is_root() {
                continue;
            }
            let node = proposed.transform(&r)?.clone();

            if halted.contains(&node.parent) {
                halted.insert(r.clone());
                if !self.cells.contains(&r) {
                    self.cells.insert(r.clone(), Cell::pending());
                }
                continue;
            }

            let action = match old.get(&r) {
                None => Action::Create,
                Some(prev) => {
                    if prev.kind != node.kind
                        || options.recreate_all
                        || forced.contains(&node.parent)
                    {
                        Action::Recreate
                    } else if prev.params != node.params {
                        Action::InPlace
                    } else {
                        Action::Keep
                    }
                }
            };
            if matches!(action, Action::Keep) {
                continue;
            }

            // Suspension point: stop between nodes, never inside one.
            if options.cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }

            attempted += 1;
            match self.evaluate_node(&node).await {
                Ok(object) => {
                    succeeded += 1;
                    let object = Arc::new(object);
                    match action {
                        Action::Create => {
                            self.cells
                                .insert(r.clone(), Cell::with_object(object.clone()));
                            report.created += 1;
                            self.bus.publish(ObjectCreated {
                                reference: r.clone(),
                                object,
                            });
                        }
                        Action::Recreate => {
                            forced.insert(r.clone());
                            let old_object = self.replace_object(&r, object.clone());
                            report.updated += 1;
                            self.bus.publish(ObjectUpdated {
                                reference: r.clone(),
                                action: UpdateAction::Recreate,
                                old: old_object,
                                new: Some(object),
                            });
                        }
                        Action::InPlace => {
                            let old_object = self.replace_object(&r, object.clone());
                            let old_kind = old_object.as_ref().map(|o| o.kind());
                            if old_kind != Some(object.kind()) {
                                // The produced discriminant changed; dependents
                                // must be rebuilt against the new object.
                                forced.insert(r.clone());
                            }
                            report.updated += 1;
                            self.bus.publish(ObjectUpdated {
                                reference: r.clone(),
                                action: UpdateAction::InPlace,
                                old: old_object,
                                new: Some(object),
                            });
                        }
                        Action::Keep => unreachable!(),
                    }
                }
                Err(err) => {
                    report.errored += 1;
                    log::warn!("evaluation of {} failed: {}", r, err);
                    let old_object = self.record_error(&r, err.to_string());
                    if let Some(old_object) = old_object {
                        // The discarded object must unwind (behaviors
                        // unregister) even though the node stays in the tree.
                        self.bus.publish(ObjectRemoved {
                            reference: r.clone(),
                            object: Some(old_object),
                        });
                    }
                    if !options.continue_on_error {
                        halted.insert(r.clone());
                    }
                }
            }
        }

        if attempted > 0 && succeeded == 0 {
            return Err(UpdateError::NothingEvaluated);
        }
        Ok(report)
    }

    /// Remove a node, collapsing single-child ghost ancestor chains
    ///
    /// Walks upward while the immediate parent is not the root, has exactly
    /// one child and is flagged ghost, then removes the highest such
    /// ancestor instead of the original reference.
    pub async fn remove_with_ghost_cascade(
        &mut self,
        reference: &NodeRef,
        options: UpdateOptions,
    ) -> Result<UpdateReport, UpdateError> {
        let target = self.ghost_cascade_root(reference)?;
        let proposed = self.tree.delete(&target)?;
        self.update_tree(proposed, options).await
    }

    /// The node `remove_with_ghost_cascade` would actually remove
    pub fn ghost_cascade_root(&self, reference: &NodeRef) -> Result<NodeRef, TreeError> {
        let mut target = self.tree.transform(reference)?.reference.clone();
        loop {
            let parent = self.tree.transform(&target)?.parent.clone();
            if parent.is_root() || target == parent {
                break;
            }
            if self.tree.children(&parent)?.len() != 1 {
                break;
            }
            let ghost = self
                .cells
                .get(&parent)
                .map(|c| c.is_ghost)
                .unwrap_or(false);
            if !ghost {
                break;
            }
            target = parent;
        }
        Ok(target)
    }

    /// Set the hidden flag on a node and its whole subtree
    ///
    /// Single synchronous pre-order pass; applying the same flag twice is a
    /// no-op.
    pub fn set_subtree_visibility(
        &mut self,
        root: &NodeRef,
        hidden: bool,
    ) -> Result<(), TreeError> {
        for r in self.tree.pre_order(root)? {
            if let Some(cell) = self.cells.get_mut(&r) {
                cell.is_hidden = hidden;
            }
        }
        Ok(())
    }

    /// Set a cell's collapsed flag
    pub fn set_collapsed(&mut self, reference: &NodeRef, collapsed: bool) -> Result<(), TreeError> {
        self.tree.transform(reference)?;
        if let Some(cell) = self.cells.get_mut(reference) {
            cell.is_collapsed = collapsed;
        }
        Ok(())
    }

    /// Set a cell's ghost flag
    pub fn set_ghost(&mut self, reference: &NodeRef, ghost: bool) -> Result<(), TreeError> {
        self.tree.transform(reference)?;
        if let Some(cell) = self.cells.get_mut(reference) {
            cell.is_ghost = ghost;
        }
        Ok(())
    }

    /// Re-apply recorded display flags, used by snapshot restore
    pub fn apply_cell_flags(
        &mut self,
        reference: &NodeRef,
        hidden: bool,
        collapsed: bool,
        ghost: bool,
    ) -> Result<(), TreeError> {
        self.tree.transform(reference)?;
        if let Some(cell) = self.cells.get_mut(reference) {
            cell.is_hidden = hidden;
            cell.is_collapsed = collapsed;
            cell.is_ghost = ghost;
        }
        Ok(())
    }

    async fn evaluate_node(&self, node: &TransformNode) -> Result<Object, EvalError> {
        let def = self.registry.definition(&node.kind)?;
        let parent_object = self
            .cells
            .object(&node.parent)
            .ok_or_else(|| EvalError::Failed(format!("parent '{}' has no object", node.parent)))?;
        if !def.applicable_to(parent_object.kind()) {
            return Err(EvalError::IncompatibleInput {
                kind: node.kind.clone(),
                found: parent_object.kind(),
            });
        }
        let previous = self.cells.object(&node.reference);
        let ctx = EvalContext {
            node,
            parent: parent_object.as_ref(),
            previous: previous.as_deref(),
        };
        def.evaluator().evaluate(ctx).await
    }

    fn replace_object(&mut self, reference: &NodeRef, object: Arc<Object>) -> Option<Arc<Object>> {
        match self.cells.get_mut(reference) {
            Some(cell) => {
                let old = cell.object.replace(object);
                cell.status = CellStatus::Ok;
                cell.error = None;
                old
            }
            None => {
                self.cells
                    .insert(reference.clone(), Cell::with_object(object));
                None
            }
        }
    }

    fn record_error(&mut self, reference: &NodeRef, message: String) -> Option<Arc<Object>> {
        match self.cells.get_mut(reference) {
            Some(cell) => {
                let old = cell.object.take();
                cell.status = CellStatus::Error;
                cell.error = Some(message);
                old
            }
            None => {
                let mut cell = Cell::pending();
                cell.status = CellStatus::Error;
                cell.error = Some(message);
                self.cells.insert(reference.clone(), cell);
                None
            }
        }
    }
}
