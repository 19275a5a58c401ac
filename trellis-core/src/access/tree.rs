//! Access Trees
//!
//! An `AccessTree` is the record of one computation pass over one state
//! scope: for every complex node the view read from, which keys it read and
//! what it saw there. Nothing else is stored. A branch the view never
//! touched has no entry, and that absence is what makes the later
//! comparison sparse.
//!
//! The tree owns a clone of every node it mentions. That keeps each node's
//! allocation alive, so an identity recorded here can never be handed to a
//! different node while the tree exists.

use std::cell::{Cell, RefCell};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::state::{Key, NodeKey, Value};

/// Which part of the view's input a tree describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// The owning model's own state.
    Own,

    /// The assembled state of the model's dependencies.
    Cross,
}

/// Reads recorded against a single complex node.
#[derive(Debug, Clone)]
pub struct AccessNode {
    /// The node itself. Held to pin its identity.
    node: Value,

    /// The node's own reference was observed, not just some of its keys.
    whole: bool,

    /// Keys read from the node and the value observed at each one.
    /// `None` records that the key was absent.
    children: SmallVec<[(Key, Option<Value>); 4]>,
}

impl AccessNode {
    fn new(node: Value) -> Self {
        Self {
            node,
            whole: false,
            children: SmallVec::new(),
        }
    }

    pub fn node(&self) -> &Value {
        &self.node
    }

    /// Whether the node was taken as a whole.
    pub fn is_whole(&self) -> bool {
        self.whole
    }

    /// The recorded `(key, observed)` pairs in read order.
    pub fn children(&self) -> &[(Key, Option<Value>)] {
        &self.children
    }
}

/// Per-pass record of state reads for one scope.
#[derive(Debug, Clone)]
pub struct AccessTree {
    scope: AccessScope,
    root: Value,
    /// A scalar root was read directly.
    root_read: bool,
    nodes: IndexMap<NodeKey, AccessNode>,
}

impl AccessTree {
    /// An empty tree for a pass that starts at `root`.
    pub fn new(scope: AccessScope, root: Value) -> Self {
        Self {
            scope,
            root,
            root_read: false,
            nodes: IndexMap::new(),
        }
    }

    pub fn scope(&self) -> AccessScope {
        self.scope
    }

    /// The root value the pass was started with.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// True when the pass read nothing at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && !self.root_read
    }

    /// Recorded reads for the node with this identity.
    pub fn node(&self, key: NodeKey) -> Option<&AccessNode> {
        self.nodes.get(&key)
    }

    /// Number of nodes that were read from.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of distinct `(node, key)` reads.
    pub fn read_count(&self) -> usize {
        self.nodes.values().map(|n| n.children.len()).sum()
    }

    /// Record that `key` was read from `parent` and `observed` came back.
    ///
    /// Scalars have no identity and are ignored as parents. Reading the
    /// same key twice keeps the latest observation.
    pub fn record(&mut self, parent: &Value, key: Key, observed: Option<Value>) {
        let Some(id) = parent.node_key() else {
            return;
        };
        let entry = self
            .nodes
            .entry(id)
            .or_insert_with(|| AccessNode::new(parent.clone()));
        match entry.children.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = observed,
            None => entry.children.push((key, observed)),
        }
    }

    /// Record that `node` itself was observed.
    ///
    /// For a scalar this only means something at the root; a scalar below
    /// the root is already covered by its parent's key read.
    pub fn record_whole(&mut self, node: &Value, is_root: bool) {
        match node.node_key() {
            Some(id) => {
                self.nodes
                    .entry(id)
                    .or_insert_with(|| AccessNode::new(node.clone()))
                    .whole = true;
            }
            None if is_root => self.root_read = true,
            None => {}
        }
    }
}

/// Collects one pass's reads into an `AccessTree`.
///
/// Recording happens only while the recorder is enabled. Each pass owns its
/// recorders, and traced handles borrow them, so reads made by a nested
/// sibling pass land in that sibling's recorder and never in ours.
#[derive(Debug)]
pub struct AccessRecorder {
    tree: RefCell<AccessTree>,
    enabled: Cell<bool>,
}

impl AccessRecorder {
    pub fn new(scope: AccessScope, root: Value) -> Self {
        Self {
            tree: RefCell::new(AccessTree::new(scope, root)),
            enabled: Cell::new(false),
        }
    }

    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub(crate) fn record(&self, parent: &Value, key: Key, observed: Option<Value>) {
        if self.is_enabled() {
            self.tree.borrow_mut().record(parent, key, observed);
        }
    }

    pub(crate) fn record_whole(&self, node: &Value, is_root: bool) {
        if self.is_enabled() {
            self.tree.borrow_mut().record_whole(node, is_root);
        }
    }

    /// Finish the pass and take the recorded tree.
    pub fn into_tree(self) -> AccessTree {
        self.tree.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_merges_reads_per_node() {
        let root = Value::from(json!({ "a": { "x": 1, "y": 2 } }));
        let a = root.get("a").unwrap().clone();
        let mut tree = AccessTree::new(AccessScope::Own, root.clone());

        tree.record(&root, "a".into(), Some(a.clone()));
        tree.record(&a, "x".into(), Some(1.into()));
        tree.record(&a, "x".into(), Some(1.into()));
        tree.record(&a, "y".into(), Some(2.into()));

        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.read_count(), 3);
        let node = tree.node(a.node_key().unwrap()).unwrap();
        assert_eq!(node.children().len(), 2);
        assert!(!node.is_whole());
    }

    #[test]
    fn scalar_parents_are_not_recorded() {
        let mut tree = AccessTree::new(AccessScope::Own, Value::from(3));
        tree.record(&Value::from(3), Key::Length, None);
        assert!(tree.is_empty());

        tree.record_whole(&Value::from(3), false);
        assert!(tree.is_empty());

        tree.record_whole(&Value::from(3), true);
        assert!(!tree.is_empty());
    }

    #[test]
    fn disabled_recorder_ignores_reads() {
        let root = Value::from(json!({ "a": 1 }));
        let recorder = AccessRecorder::new(AccessScope::Cross, root.clone());

        recorder.record(&root, "a".into(), Some(1.into()));
        recorder.enable();
        recorder.record(&root, "b".into(), None);
        recorder.disable();

        let tree = recorder.into_tree();
        assert_eq!(tree.scope(), AccessScope::Cross);
        assert_eq!(tree.read_count(), 1);
        let node = tree.node(root.node_key().unwrap()).unwrap();
        assert_eq!(node.children()[0], (Key::from("b"), None));
    }
}
