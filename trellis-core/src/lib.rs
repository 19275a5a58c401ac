//! Trellis Core
//!
//! This crate memoizes derived views over the state of several independent
//! models. It implements:
//!
//! - Traced access to nested state, recording exactly which fields were read
//! - Sparse, reference-based comparison of new state against those reads
//! - Per-view caches that also track extra arguments and sibling views
//! - A minimal store that holds model state and exposes the views
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `state`: the immutable, reference-counted state graph
//! - `access`: traced handles, access trees, and the validity check
//! - `views`: model definitions, view caches, and per-model registries
//! - `store`: the state container views are evaluated against
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{ModelDefinition, Store, Value};
//! use serde_json::json;
//!
//! let store = Store::new();
//! store.add_model(
//!     ModelDefinition::new("first", json!({ "a": { "x": 1 }, "b": { "y": 1 } }).into())
//!         .view("f", |state, _, _, n| {
//!             let x = state.at(["a", "x"]).as_i64().unwrap_or(0);
//!             Ok(Value::from(x + n.and_then(Value::as_i64).unwrap_or(0)))
//!         }),
//! )?;
//!
//! let five = Value::from(5);
//! assert_eq!(store.view("first", "f", Some(&five))?, Value::from(6));
//!
//! // Only `b` changes: the view is not evaluated again.
//! store.set_in("first", &["b".into()], json!({ "y": 1 }).into())?;
//! assert_eq!(store.view("first", "f", Some(&five))?, Value::from(6));
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod views;

pub use access::Traced;
pub use config::{FailurePolicy, StoreConfig, ViewsConfig};
pub use error::{Result, ViewError};
pub use state::{Key, Value};
pub use store::{StateSource, Store, ViewHandle};
pub use views::{ModelDefinition, SelfViews};
