//! Access Tracing
//!
//! This module records which parts of a state graph a view reads, and later
//! answers whether a new state graph would produce the same reads.
//!
//! # Concepts
//!
//! ## Traced handles
//!
//! A view never sees raw state. It receives a `Traced` handle for each
//! scope, and every field read through a handle is written to the pass's
//! `AccessRecorder` along with the value that came back.
//!
//! ## Access trees
//!
//! When the pass ends the recorder is turned into an `AccessTree`: for each
//! node that was read from, the keys read and the values observed. The tree
//! is the baseline the next call is checked against.
//!
//! ## Sparse comparison
//!
//! `is_still_valid` walks the baseline against the new state, following only
//! recorded reads and stopping at the first node whose reference is
//! unchanged.
//!
//! # Implementation Notes
//!
//! There is no global "tracing enabled" flag. Each pass creates its own
//! recorders and every handle borrows the recorder it reports to, so a
//! sibling view evaluated in the middle of a pass records into its own trees.

mod compare;
mod identity;
mod traced;
mod tree;

pub use compare::is_still_valid;
pub use identity::{IdentityCache, ProxyId};
pub use traced::Traced;
pub use tree::{AccessNode, AccessRecorder, AccessScope, AccessTree};
