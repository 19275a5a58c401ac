//! Sparse Equality
//!
//! Decides whether a new root value still produces the same reads as the
//! ones recorded in an `AccessTree`. Only recorded paths are walked:
//!
//! - A node that is the same reference as before is equal, whatever is
//!   inside it.
//! - A node that was never read from cannot have influenced the result and
//!   is equal too.
//! - A node taken whole is equal only to itself.
//! - Otherwise each recorded key is checked: complex children recurse, an
//!   absent key must still be absent, and a scalar read counts as changed
//!   once the node holding it was replaced.
//!
//! Model state roots are the exception to the last rule. Every update builds
//! a new root, so a root is compared by the scalars read from it. For the
//! cross-model scope that covers the assembled object and each dependency's
//! state directly below it.
//!
//! Unread siblings are never visited, so replacing them never invalidates.

use super::tree::{AccessScope, AccessTree};
use crate::state::Value;

/// `true` when `new_root` yields the same reads as the recorded pass.
pub fn is_still_valid(tree: &AccessTree, new_root: &Value) -> bool {
    if tree.is_empty() {
        return true;
    }
    nodes_equal(tree.root(), Some(new_root), tree, 0)
}

fn nodes_equal(prior: &Value, current: Option<&Value>, tree: &AccessTree, depth: usize) -> bool {
    if !prior.is_complex() {
        return current.is_some_and(|current| prior.same(current));
    }
    if current.is_some_and(|current| prior.same(current)) {
        return true;
    }
    let Some(node) = prior.node_key().and_then(|key| tree.node(key)) else {
        return true;
    };
    if node.is_whole() {
        return false;
    }

    let model_root = depth == 0 || (depth == 1 && tree.scope() == AccessScope::Cross);
    node.children().iter().all(|(key, seen)| {
        let now = current.and_then(|current| current.child(key));
        match seen {
            None => now.is_none(),
            Some(seen) if seen.is_complex() => nodes_equal(seen, now.as_ref(), tree, depth + 1),
            Some(seen) => model_root && now.is_some_and(|now| seen.same(&now)),
        }
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
