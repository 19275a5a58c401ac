//! Views
//!
//! Views are derived values attached to a model. They are memoized without
//! declaring what they depend on: every evaluation records what the view
//! read, and the next call only recomputes if one of those reads would now
//! come out differently.
//!
//! # Concepts
//!
//! ## Own and dependency state
//!
//! A view reads its own model's state and, for every model it was declared
//! to depend on, that model's state under the model's name. Both arrive as
//! traced handles.
//!
//! ## Sibling views
//!
//! A view can read the other views of its model through `SelfViews`. The
//! sibling answers from its own cache, and the reading view is invalidated
//! when a sibling it read returns a different reference.
//!
//! ## What counts as a change
//!
//! A view is only re-run when something it read could have changed:
//!
//! - Branches the view never read are ignored, however deep the change.
//! - A model's state root is rebuilt on every update, so it is compared by
//!   the fields read from it. Changing an unread field directly on a model's
//!   state, your own or a dependency's, never invalidates.
//! - Below the root, an object or array the view read a scalar from counts
//!   as changed as soon as it is replaced, even with equal contents. With
//!   `a.obj.count` read, updating `a.obj.other` rebuilds `a.obj` and re-runs
//!   the view. Keep fields that change independently in separate objects if
//!   that matters.
//! - Objects and arrays the view only passed through keep being compared
//!   key by key.
//!
//! ## Extra argument
//!
//! A view may take one extra argument. It is compared by reference: calling
//! with a different argument always recomputes.

mod cache;
mod context;
mod model;
mod registry;
mod self_views;

pub use cache::{CacheState, CacheStats, MemoizedViewCache};
pub use context::{PassContext, ViewKey};
pub use model::{ModelDefinition, ViewDescriptor, ViewFn};
pub use registry::ModelViews;
pub use self_views::{SelfAccess, SelfAccessRecorder, SelfViews, SiblingViews};
