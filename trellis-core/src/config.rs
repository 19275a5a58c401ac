//! Store Configuration
//!
//! Configuration is plain data and can be loaded from JSON:
//!
//! ```json
//! {
//!   "name": "app",
//!   "state": { "counter": 3 },
//!   "views": { "failure_policy": "keep_stale" }
//! }
//! ```
//!
//! Initial state given here wins over the state a model definition brings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::Value;

/// What a view cache does after its view function fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Forget the cached value. The next call always recomputes.
    #[default]
    Recompute,

    /// Keep the last successful value, but take the failed pass's reads as
    /// the new baseline. The next call with the old value's arguments
    /// returns it if those reads still match, even though the view never
    /// succeeded on them.
    KeepStale,
}

/// Settings shared by every view cache of a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub failure_policy: FailurePolicy,
}

/// Settings for a `Store`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Optional store name, used in log output.
    pub name: Option<String>,

    /// Initial state per model name.
    pub state: IndexMap<String, Value>,

    pub views: ViewsConfig,
}

impl StoreConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
