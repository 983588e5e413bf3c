//! Snapshot payloads
//!
//! `get_snapshot` walks the committed tree in a stable pre-order and records
//! each node together with its cell flags. `set_snapshot` is the inverse: it
//! validates the flat node list, rebuilds a tree, runs it through the
//! reconciler as a full update and re-applies the recorded flags.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use prism_runtime::{Reconciler, UpdateOptions, UpdateReport};
use prism_state::{NodeRef, StateTree, TransformNode};

use crate::error::SnapshotError;

/// Version written into every payload; restoring a newer one fails
pub const FORMAT_VERSION: u32 = 1;

/// One serialized tree node plus its cell flags
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    #[serde(rename = "ref")]
    pub reference: NodeRef,
    pub parent: NodeRef,
    pub kind: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_collapsed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_ghost: bool,
}

/// A complete serialized capture of the committed tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    pub version: u32,
    /// Nodes in pre-order from the root
    pub nodes: Vec<SnapshotNode>,
    /// Auxiliary view state supplied by the caller (camera, playback, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<Value>,
}

/// Options for [`get_snapshot`]
#[derive(Clone, Debug, Default)]
pub struct SnapshotOptions {
    /// Include transient-flagged nodes and their subtrees
    pub include_transient: bool,
    /// Auxiliary view state to embed
    pub view: Option<Value>,
}

impl SnapshotOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep transient nodes in the capture
    pub fn with_transient(mut self) -> Self {
        self.include_transient = true;
        self
    }

    /// Embed auxiliary view state
    pub fn with_view(mut self, view: Value) -> Self {
        self.view = Some(view);
        self
    }
}

/// Capture the committed tree and cell flags
pub fn get_snapshot(reconciler: &Reconciler, options: &SnapshotOptions) -> SnapshotData {
    let tree = reconciler.tree();
    let order = tree.pre_order(&tree.root()).unwrap_or_default();

    let mut skipped: Vec<NodeRef> = Vec::new();
    let mut nodes = Vec::with_capacity(order.len());
    for r in order {
        let node = match tree.get(&r) {
            Some(node) => node,
            None => continue,
        };
        // A transient node takes its whole subtree out of the capture so the
        // serialized parent chain stays closed.
        if skipped.contains(&node.parent) || (node.transient && !options.include_transient) {
            skipped.push(r);
            continue;
        }
        let cell = reconciler.cells().get(&r);
        nodes.push(SnapshotNode {
            reference: node.reference.clone(),
            parent: node.parent.clone(),
            kind: node.kind.clone(),
            params: node.params.clone(),
            tags: node.tags.clone(),
            is_hidden: cell.map(|c| c.is_hidden).unwrap_or(false),
            is_collapsed: cell.map(|c| c.is_collapsed).unwrap_or(false),
            is_ghost: cell.map(|c| c.is_ghost).unwrap_or(false),
        });
    }

    SnapshotData {
        version: FORMAT_VERSION,
        nodes,
        view: options.view.clone(),
    }
}

/// Replace the committed tree with a captured one
///
/// The node list is validated first; a structurally invalid payload fails
/// with [`SnapshotError::MalformedSnapshot`] before anything is applied.
pub async fn set_snapshot(
    reconciler: &mut Reconciler,
    data: SnapshotData,
) -> Result<UpdateReport, SnapshotError> {
    if data.version > FORMAT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: data.version,
            supported: FORMAT_VERSION,
        });
    }

    let tree = build_tree(&data)?;
    let report = reconciler.update_tree(tree, UpdateOptions::new()).await?;

    for node in &data.nodes {
        let _ = reconciler.apply_cell_flags(
            &node.reference,
            node.is_hidden,
            node.is_collapsed,
            node.is_ghost,
        );
    }
    Ok(report)
}

/// Rebuild a tree value from the flat node list
fn build_tree(data: &SnapshotData) -> Result<StateTree, SnapshotError> {
    let roots = data
        .nodes
        .iter()
        .filter(|n| n.reference == n.parent)
        .count();
    if roots != 1 {
        return Err(SnapshotError::MalformedSnapshot(format!(
            "expected exactly one root, found {}",
            roots
        )));
    }
    if !data.nodes.iter().any(|n| n.reference.is_root()) {
        return Err(SnapshotError::MalformedSnapshot(
            "root node is missing".to_string(),
        ));
    }

    let mut tree = StateTree::new();
    let mut pending: Vec<&SnapshotNode> = data
        .nodes
        .iter()
        .filter(|n| !n.reference.is_root())
        .collect();

    // Nodes arrive in pre-order, but the rebuild tolerates any order: keep
    // inserting nodes whose parent is already present until nothing moves.
    while !pending.is_empty() {
        let mut progressed = false;
        let mut remaining = Vec::new();
        for node in pending {
            if tree.contains(&node.parent) {
                let transform =
                    TransformNode::new(node.reference.clone(), node.parent.clone(), &node.kind)
                        .with_params(node.params.clone())
                        .with_tags(node.tags.clone());
                tree = tree
                    .insert_node(transform)
                    .map_err(|e| SnapshotError::MalformedSnapshot(e.to_string()))?;
                progressed = true;
            } else {
                remaining.push(node);
            }
        }
        if !progressed {
            return Err(SnapshotError::MalformedSnapshot(format!(
                "{} node(s) have no path to the root",
                remaining.len()
            )));
        }
        pending = remaining;
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{runtime, Value};
    use prism_runtime::CellStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let mut rt = runtime();
        let root = rt.tree().root();
        let (t, a) = rt
            .tree()
            .add(&root, "data", json!({ "url": "x" }), vec!["input".to_string()])
            .unwrap();
        let (t, b) = t.add(&a, "structure", Value::Null, vec![]).unwrap();
        rt.update_tree(t, UpdateOptions::new()).await.unwrap();
        rt.set_subtree_visibility(&b, true).unwrap();
        rt.set_ghost(&a, true).unwrap();

        let data = get_snapshot(&rt, &SnapshotOptions::new().with_view(json!({ "zoom": 2 })));

        let mut restored = runtime();
        set_snapshot(&mut restored, data.clone()).await.unwrap();

        assert_eq!(restored.tree(), rt.tree());
        assert_eq!(restored.cells().get(&b).unwrap().status, CellStatus::Ok);
        assert!(restored.cells().get(&b).unwrap().is_hidden);
        assert!(restored.cells().get(&a).unwrap().is_ghost);

        // a second capture is equivalent
        let again = get_snapshot(&restored, &SnapshotOptions::new().with_view(json!({ "zoom": 2 })));
        assert_eq!(again, data);
    }

    #[tokio::test]
    async fn test_transient_nodes_are_skipped() {
        let mut rt = runtime();
        let root = rt.tree().root();
        let (t, a) = rt.tree().add(&root, "data", Value::Null, vec![]).unwrap();
        let t = t
            .insert_node(
                prism_state::TransformNode::new("obj-temp".into(), a.clone(), "data").transient(),
            )
            .unwrap();
        rt.update_tree(t, UpdateOptions::new()).await.unwrap();

        let data = get_snapshot(&rt, &SnapshotOptions::new());
        assert_eq!(data.nodes.len(), 2); // root + a

        let full = get_snapshot(&rt, &SnapshotOptions::new().with_transient());
        assert_eq!(full.nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_rejected() {
        let mut rt = runtime();
        let data = get_snapshot(&rt, &SnapshotOptions::new());

        let mut orphan = data.clone();
        orphan.nodes.push(SnapshotNode {
            reference: "obj-1".into(),
            parent: "obj-99".into(),
            kind: "data".to_string(),
            params: Value::Null,
            tags: vec![],
            is_hidden: false,
            is_collapsed: false,
            is_ghost: false,
        });
        assert!(matches!(
            set_snapshot(&mut rt, orphan).await,
            Err(SnapshotError::MalformedSnapshot(_))
        ));

        let mut rootless = data.clone();
        rootless.nodes.clear();
        assert!(matches!(
            set_snapshot(&mut rt, rootless).await,
            Err(SnapshotError::MalformedSnapshot(_))
        ));

        // the failed restores left the committed tree untouched
        assert!(rt.tree().is_empty());
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let mut rt = runtime();
        let mut data = get_snapshot(&rt, &SnapshotOptions::new());
        data.version = FORMAT_VERSION + 1;
        assert!(matches!(
            set_snapshot(&mut rt, data).await,
            Err(SnapshotError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_payload_field_names() {
        let node = SnapshotNode {
            reference: "obj-1".into(),
            parent: prism_state::NodeRef::root(),
            kind: "data".to_string(),
            params: Value::Null,
            tags: vec![],
            is_hidden: true,
            is_collapsed: false,
            is_ghost: false,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["ref"], "obj-1");
        assert_eq!(json["isHidden"], true);
        assert!(json.get("isCollapsed").is_none());
    }
}
