//! State Graph
//!
//! Model state is an immutable graph of `Value` nodes. Objects and arrays
//! are shared through reference counting, which gives them an identity that
//! the memoization engine compares instead of their contents.

mod key;
mod value;

pub use key::Key;
pub use value::{Map, NodeKey, Value};
