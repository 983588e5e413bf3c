//! Immutable state tree
//!
//! A `StateTree` is a value: every structural operation validates its inputs
//! and returns a new tree, leaving the original untouched. Callers apply an
//! update by swapping the new value in only once the whole operation
//! succeeded.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::node::TransformNode;
use crate::reference::NodeRef;

/// Structural tree errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Operation referenced a node that is not in the tree
    #[error("invalid reference: {0}")]
    InvalidReference(NodeRef),
    /// Reparent would make a node an ancestor of itself
    #[error("reparenting {node} under {new_parent} would create a cycle")]
    CycleDetected {
        node: NodeRef,
        new_parent: NodeRef,
    },
    /// A node with this reference already exists
    #[error("duplicate reference: {0}")]
    DuplicateReference(NodeRef),
}

/// The tree of transform nodes
///
/// Exactly one root whose parent is itself; every other node's parent is
/// present in the same tree. Children are kept in insertion order for
/// deterministic traversal.
#[derive(Clone, Debug)]
pub struct StateTree {
    nodes: HashMap<NodeRef, TransformNode>,
    children: HashMap<NodeRef, Vec<NodeRef>>,
    next_serial: u64,
}

impl StateTree {
    /// Create a tree holding only the root node
    pub fn new() -> Self {
        let root = TransformNode::root();
        let mut nodes = HashMap::new();
        let mut children = HashMap::new();
        children.insert(root.reference.clone(), Vec::new());
        nodes.insert(root.reference.clone(), root);
        Self {
            nodes,
            children,
            next_serial: 1,
        }
    }

    /// The root reference
    pub fn root(&self) -> NodeRef {
        NodeRef::root()
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root remains
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Check whether a reference is present
    pub fn contains(&self, reference: &NodeRef) -> bool {
        self.nodes.contains_key(reference)
    }

    /// Look up a node
    pub fn get(&self, reference: &NodeRef) -> Option<&TransformNode> {
        self.nodes.get(reference)
    }

    /// Look up a node, failing on a missing reference
    pub fn transform(&self, reference: &NodeRef) -> Result<&TransformNode, TreeError> {
        self.nodes
            .get(reference)
            .ok_or_else(|| TreeError::InvalidReference(reference.clone()))
    }

    /// Ordered child references of a node
    pub fn children(&self, reference: &NodeRef) -> Result<&[NodeRef], TreeError> {
        self.children
            .get(reference)
            .map(Vec::as_slice)
            .ok_or_else(|| TreeError::InvalidReference(reference.clone()))
    }

    /// Iterate over all references, in no particular order
    pub fn refs(&self) -> impl Iterator<Item = &NodeRef> {
        self.nodes.keys()
    }

    /// Add a node under `parent`, returning the new tree and the generated
    /// reference
    pub fn add(
        &self,
        parent: &NodeRef,
        kind: impl Into<String>,
        params: Value,
        tags: Vec<String>,
    ) -> Result<(Self, NodeRef), TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::InvalidReference(parent.clone()));
        }

        let reference = NodeRef::new(format!("obj-{}", self.next_serial));
        let node = TransformNode::new(reference.clone(), parent.clone(), kind)
            .with_params(params)
            .with_tags(tags);

        let mut next = self.clone();
        next.next_serial += 1;
        next.attach(node);
        Ok((next, reference))
    }

    /// Insert a prebuilt node with an explicit reference (snapshot restore)
    pub fn insert_node(&self, node: TransformNode) -> Result<Self, TreeError> {
        if self.contains(&node.reference) {
            return Err(TreeError::DuplicateReference(node.reference.clone()));
        }
        if !self.contains(&node.parent) {
            return Err(TreeError::InvalidReference(node.parent.clone()));
        }

        let mut next = self.clone();
        // Keep generated references unique after restoring explicit ones.
        if let Some(serial) = node.reference.serial() {
            next.next_serial = next.next_serial.max(serial + 1);
        }
        next.attach(node);
        Ok(next)
    }

    /// Replace a node's parameters, keeping its kind and children
    pub fn update_params(&self, reference: &NodeRef, params: Value) -> Result<Self, TreeError> {
        self.transform(reference)?;
        let mut next = self.clone();
        next.nodes
            .get_mut(reference)
            .expect("node checked above")
            .params = params;
        Ok(next)
    }

    /// Replace a node's transform kind and parameters
    pub fn update_kind(
        &self,
        reference: &NodeRef,
        kind: impl Into<String>,
        params: Value,
    ) -> Result<Self, TreeError> {
        self.transform(reference)?;
        let mut next = self.clone();
        let node = next
            .nodes
            .get_mut(reference)
            .expect("node checked above");
        node.kind = kind.into();
        node.params = params;
        Ok(next)
    }

    /// Remove a node and its entire subtree
    ///
    /// Deleting the root clears the tree back to a root-only value.
    pub fn delete(&self, reference: &NodeRef) -> Result<Self, TreeError> {
        if !self.contains(reference) {
            return Err(TreeError::InvalidReference(reference.clone()));
        }

        if reference.is_root() {
            let mut cleared = Self::new();
            cleared.next_serial = self.next_serial;
            return Ok(cleared);
        }

        let doomed = self.pre_order(reference)?;
        let mut next = self.clone();
        for r in &doomed {
            next.nodes.remove(r);
            next.children.remove(r);
        }
        let parent = &self.nodes[reference].parent;
        if let Some(siblings) = next.children.get_mut(parent) {
            siblings.retain(|r| r != reference);
        }
        Ok(next)
    }

    /// Move a node (with its subtree) under a new parent
    pub fn reparent(&self, reference: &NodeRef, new_parent: &NodeRef) -> Result<Self, TreeError> {
        let node = self.transform(reference)?;
        if reference.is_root() {
            return Err(TreeError::InvalidReference(reference.clone()));
        }
        if !self.contains(new_parent) {
            return Err(TreeError::InvalidReference(new_parent.clone()));
        }
        if self.is_in_subtree(new_parent, reference) {
            return Err(TreeError::CycleDetected {
                node: reference.clone(),
                new_parent: new_parent.clone(),
            });
        }

        let old_parent = node.parent.clone();
        let mut next = self.clone();
        if let Some(siblings) = next.children.get_mut(&old_parent) {
            siblings.retain(|r| r != reference);
        }
        next.children
            .get_mut(new_parent)
            .expect("parent checked above")
            .push(reference.clone());
        next.nodes
            .get_mut(reference)
            .expect("node checked above")
            .parent = new_parent.clone();
        Ok(next)
    }

    /// Pre-order traversal of the subtree at `from`: a node before its
    /// children, children left-to-right by insertion order
    pub fn pre_order(&self, from: &NodeRef) -> Result<Vec<NodeRef>, TreeError> {
        if !self.contains(from) {
            return Err(TreeError::InvalidReference(from.clone()));
        }
        let mut out = Vec::new();
        let mut stack = vec![from.clone()];
        while let Some(r) = stack.pop() {
            if let Some(kids) = self.children.get(&r) {
                stack.extend(kids.iter().rev().cloned());
            }
            out.push(r);
        }
        Ok(out)
    }

    /// Post-order traversal of the subtree at `from`: children left-to-right,
    /// then the node itself
    pub fn post_order(&self, from: &NodeRef) -> Result<Vec<NodeRef>, TreeError> {
        if !self.contains(from) {
            return Err(TreeError::InvalidReference(from.clone()));
        }
        let mut out = Vec::new();
        let mut stack = vec![from.clone()];
        while let Some(r) = stack.pop() {
            if let Some(kids) = self.children.get(&r) {
                stack.extend(kids.iter().cloned());
            }
            out.push(r);
        }
        out.reverse();
        Ok(out)
    }

    /// True when `reference` lies in the subtree rooted at `ancestor`
    /// (including `reference == ancestor`)
    pub fn is_in_subtree(&self, reference: &NodeRef, ancestor: &NodeRef) -> bool {
        let mut current = reference.clone();
        loop {
            if &current == ancestor {
                return true;
            }
            match self.nodes.get(&current) {
                Some(node) if !node.is_root() => current = node.parent.clone(),
                _ => return false,
            }
        }
    }

    fn attach(&mut self, node: TransformNode) {
        self.children
            .entry(node.parent.clone())
            .or_default()
            .push(node.reference.clone());
        self.children.insert(node.reference.clone(), Vec::new());
        self.nodes.insert(node.reference.clone(), node);
    }
}

impl Default for StateTree {
    fn default() -> Self {
        Self::new()
    }
}

// Structural equality: the generation serial is bookkeeping, not structure.
impl PartialEq for StateTree {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.children == other.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree_with_chain() -> (StateTree, NodeRef, NodeRef) {
        let tree = StateTree::new();
        let (tree, a) = tree
            .add(&tree.root(), "load", json!({ "url": "x" }), vec![])
            .unwrap();
        let (tree, b) = tree.add(&a, "parse", Value::Null, vec![]).unwrap();
        (tree, a, b)
    }

    #[test]
    fn test_add_delete_round_trip() {
        let tree = StateTree::new();
        let (with_node, r) = tree.add(&tree.root(), "load", Value::Null, vec![]).unwrap();
        let restored = with_node.delete(&r).unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn test_delete_removes_subtree() {
        let (tree, a, b) = tree_with_chain();
        let after = tree.delete(&a).unwrap();
        assert!(!after.contains(&a));
        assert!(!after.contains(&b));
        assert!(after.is_empty());
    }

    #[test]
    fn test_delete_root_clears() {
        let (tree, _, _) = tree_with_chain();
        let cleared = tree.delete(&NodeRef::root()).unwrap();
        assert!(cleared.is_empty());
        assert!(cleared.contains(&NodeRef::root()));
    }

    #[test]
    fn test_invalid_reference() {
        let tree = StateTree::new();
        let missing = NodeRef::new("obj-99");
        assert_eq!(
            tree.add(&missing, "load", Value::Null, vec![]).unwrap_err(),
            TreeError::InvalidReference(missing.clone())
        );
        assert!(matches!(
            tree.delete(&missing),
            Err(TreeError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_reparent_cycle_detected() {
        let (tree, a, b) = tree_with_chain();
        let err = tree.reparent(&a, &b).unwrap_err();
        assert!(matches!(err, TreeError::CycleDetected { .. }));
        // a node cannot become its own parent either
        assert!(matches!(
            tree.reparent(&a, &a),
            Err(TreeError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let tree = StateTree::new();
        let (tree, a) = tree.add(&tree.root(), "load", Value::Null, vec![]).unwrap();
        let (tree, b) = tree.add(&tree.root(), "group", Value::Null, vec![]).unwrap();
        let (tree, c) = tree.add(&a, "parse", Value::Null, vec![]).unwrap();

        let moved = tree.reparent(&a, &b).unwrap();
        assert_eq!(moved.get(&a).unwrap().parent, b);
        assert_eq!(moved.children(&b).unwrap(), &[a.clone()]);
        // subtree follows its root
        assert_eq!(moved.get(&c).unwrap().parent, a);
    }

    #[test]
    fn test_traversal_orders() {
        // root -> a -> (b, c); b -> d
        let tree = StateTree::new();
        let (tree, a) = tree.add(&tree.root(), "a", Value::Null, vec![]).unwrap();
        let (tree, b) = tree.add(&a, "b", Value::Null, vec![]).unwrap();
        let (tree, c) = tree.add(&a, "c", Value::Null, vec![]).unwrap();
        let (tree, d) = tree.add(&b, "d", Value::Null, vec![]).unwrap();

        let pre = tree.pre_order(&a).unwrap();
        assert_eq!(pre, vec![a.clone(), b.clone(), d.clone(), c.clone()]);

        let post = tree.post_order(&a).unwrap();
        assert_eq!(post, vec![d, b, c, a]);
    }

    #[test]
    fn test_update_params_is_a_new_value() {
        let (tree, a, _) = tree_with_chain();
        let updated = tree.update_params(&a, json!({ "url": "y" })).unwrap();
        assert_eq!(tree.get(&a).unwrap().params["url"], "x");
        assert_eq!(updated.get(&a).unwrap().params["url"], "y");
        assert_ne!(tree, updated);
    }

    #[test]
    fn test_update_kind() {
        let (tree, a, b) = tree_with_chain();
        let updated = tree.update_kind(&a, "download", Value::Null).unwrap();
        assert_eq!(updated.get(&a).unwrap().kind, "download");
        // children are untouched
        assert_eq!(updated.children(&a).unwrap(), &[b]);
    }

    #[test]
    fn test_insert_node_validates() {
        let tree = StateTree::new();
        let node = TransformNode::new("obj-5".into(), tree.root(), "load");
        let tree = tree.insert_node(node.clone()).unwrap();
        assert!(matches!(
            tree.insert_node(node),
            Err(TreeError::DuplicateReference(_))
        ));

        let orphan = TransformNode::new("obj-6".into(), NodeRef::new("obj-99"), "load");
        assert!(matches!(
            tree.insert_node(orphan),
            Err(TreeError::InvalidReference(_))
        ));

        // generated refs skip past restored ones
        let (_, next) = tree.add(&tree.root(), "x", Value::Null, vec![]).unwrap();
        assert_eq!(next.as_str(), "obj-6");
    }
}
