//! Traced Accessors
//!
//! `Traced` is how a view reads state. It wraps a node together with the
//! recorder of the pass that is running, and every read made through it is
//! written to that recorder before the result is handed back, itself
//! wrapped, so reads further down the graph are traced too.
//!
//! # Reads
//!
//! - `get(key)` / `try_get(key)`: one field or element. Recorded on the parent.
//! - `len()`: recorded as a `Key::Length` read.
//! - `iter()` / `entries()`: the length plus every element or field.
//! - `value()`: the node as a whole. Any change of reference invalidates.
//! - `as_i64()` and friends: plain scalar access. On a scalar root state this
//!   counts as a whole read; everywhere else the parent's read covers it.
//!
//! `untracked()` peeks at the node without recording anything. A view that
//! decides its result from an untracked peek will not be invalidated by it.

use std::fmt;

use super::identity::{IdentityCache, ProxyId};
use super::tree::AccessRecorder;
use crate::state::{Key, Value};

/// A state node seen through an access recorder.
#[derive(Clone)]
pub struct Traced<'p> {
    value: Value,
    recorder: &'p AccessRecorder,
    root: bool,
}

impl<'p> Traced<'p> {
    /// Wrap the root of a scope.
    pub fn root(value: Value, recorder: &'p AccessRecorder) -> Self {
        Self {
            value,
            recorder,
            root: true,
        }
    }

    fn child(&self, value: Value) -> Self {
        Self {
            value,
            recorder: self.recorder,
            root: false,
        }
    }

    /// Read a field or element, `None` when it does not exist.
    ///
    /// The absence is recorded as well: a later pass in which the key
    /// appears is treated as a change.
    pub fn try_get(&self, key: impl Into<Key>) -> Option<Traced<'p>> {
        let key = key.into();
        let observed = self.value.child(&key);
        if self.value.is_complex() {
            self.recorder.record(&self.value, key, observed.clone());
        }
        observed.map(|value| self.child(value))
    }

    /// Read a field or element. Missing keys read as `Null`.
    pub fn get(&self, key: impl Into<Key>) -> Traced<'p> {
        self.try_get(key)
            .unwrap_or_else(|| self.child(Value::Null))
    }

    /// Follow a path of keys.
    pub fn at<K, I>(&self, path: I) -> Traced<'p>
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        path.into_iter()
            .fold(self.clone(), |node, key| node.get(key))
    }

    /// Element count of an array or field count of an object. Zero for
    /// scalars.
    pub fn len(&self) -> usize {
        self.try_get(Key::Length)
            .and_then(|n| n.value.as_i64())
            .map_or(0, |n| n as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Traced elements of an array. Empty for anything else.
    pub fn iter(&self) -> impl Iterator<Item = Traced<'p>> + '_ {
        let len = match self.value {
            Value::Array(_) => self.len(),
            _ => 0,
        };
        (0..len).map(move |index| self.get(index))
    }

    /// Traced `(field, value)` pairs of an object. Empty for anything else.
    pub fn entries(&self) -> Vec<(String, Traced<'p>)> {
        let Some(fields) = self.value.as_object() else {
            return Vec::new();
        };
        // The length read catches fields being added.
        self.len();
        let names: Vec<String> = fields.keys().cloned().collect();
        names
            .into_iter()
            .map(|name| {
                let value = self.get(name.as_str());
                (name, value)
            })
            .collect()
    }

    /// Field names of an object, read the same way as `entries`.
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }

    /// Take the node as a whole.
    pub fn value(&self) -> Value {
        self.recorder.record_whole(&self.value, self.root);
        self.value.clone()
    }

    /// The node without recording a read.
    pub fn untracked(&self) -> &Value {
        &self.value
    }

    fn scalar(&self) -> &Value {
        if self.root {
            self.recorder.record_whole(&self.value, true);
        }
        &self.value
    }

    pub fn is_null(&self) -> bool {
        self.scalar().is_null()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.scalar().as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.scalar().as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.scalar().as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.scalar().as_str()
    }

    pub fn is_complex(&self) -> bool {
        self.value.is_complex()
    }

    /// Stable identity of the wrapped node, `None` for scalars.
    pub fn identity(&self) -> Option<ProxyId> {
        IdentityCache::global().proxy_id(&self.value)
    }
}

impl PartialEq for Traced<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.value.same(&other.value),
            _ => false,
        }
    }
}

impl fmt::Debug for Traced<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced")
            .field("value", &self.value)
            .field("root", &self.root)
            .field("tracing", &self.recorder.is_enabled())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
