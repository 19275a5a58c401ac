//! State Values
//!
//! `Value` is the node type of every model's state graph. Scalars are plain
//! data. Objects and arrays live behind an `Arc`, and that allocation is
//! their identity: two complex values are the *same* only when they share
//! the allocation, no matter what they contain.
//!
//! # Updating State
//!
//! Values are never mutated in place. The `with_*`, `set_in` and `update_in`
//! helpers build a new value that copies only the path from the root to the
//! changed node. Every branch off that path keeps its old allocation, so
//! views that read only untouched branches still see the same references
//! and stay cached.
//!
//! ```rust,ignore
//! let state = Value::object([("a", Value::object([("x", 1.into())]))]);
//! let next = state.set_in(&["b".into()], 2.into());
//! assert!(next.get("a").unwrap().same(state.get("a").unwrap()));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Key;

/// Field map of an object node.
pub type Map = IndexMap<String, Value>;

/// A node in a state graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
}

/// Identity of a complex node: the address of its shared allocation.
///
/// Only meaningful while something keeps the allocation alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    /// The raw address.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl Value {
    /// Build an object from `(field, value)` pairs, keeping their order.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build an array from its elements.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    /// Objects and arrays are complex; everything else is a scalar.
    pub fn is_complex(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Identity of a complex node, `None` for scalars.
    pub fn node_key(&self) -> Option<NodeKey> {
        match self {
            Value::Array(items) => Some(NodeKey(Arc::as_ptr(items) as *const () as usize)),
            Value::Object(fields) => Some(NodeKey(Arc::as_ptr(fields) as *const () as usize)),
            _ => None,
        }
    }

    /// Reference equality.
    ///
    /// Complex values are the same when they share an allocation. Scalars
    /// compare by value, with integers and floats on one number line.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }

    /// Read one key without tracing.
    ///
    /// `Key::Length` yields the element or field count of complex nodes.
    pub fn child(&self, key: &Key) -> Option<Value> {
        match (self, key) {
            (Value::Object(fields), Key::Field(name)) => fields.get(name).cloned(),
            (Value::Array(items), Key::Index(index)) => items.get(*index).cloned(),
            (Value::Object(fields), Key::Length) => Some(Value::Int(fields.len() as i64)),
            (Value::Array(items), Key::Length) => Some(Value::Int(items.len() as i64)),
            _ => None,
        }
    }

    /// Borrow a field or element without tracing.
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        match (self, key.into()) {
            (Value::Object(fields), Key::Field(name)) => fields.get(&name),
            (Value::Array(items), Key::Index(index)) => items.get(index),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// A copy of this object with one field replaced.
    ///
    /// Non-objects are treated as an empty object.
    pub fn with_field(&self, name: impl Into<String>, value: Value) -> Value {
        let mut fields = match self {
            Value::Object(fields) => Map::clone(fields),
            _ => Map::new(),
        };
        fields.insert(name.into(), value);
        Value::Object(Arc::new(fields))
    }

    /// A copy of this array with one element replaced.
    ///
    /// Writing past the end pads the gap with `Null`. Non-arrays are treated
    /// as an empty array.
    pub fn with_index(&self, index: usize, value: Value) -> Value {
        let mut items = match self {
            Value::Array(items) => Vec::clone(items),
            _ => Vec::new(),
        };
        if index >= items.len() {
            items.resize(index + 1, Value::Null);
        }
        items[index] = value;
        Value::Array(Arc::new(items))
    }

    /// Replace the node at `path`, copying only the nodes along the path.
    pub fn set_in(&self, path: &[Key], value: Value) -> Value {
        self.update_in(path, move |_| value)
    }

    /// Rewrite the node at `path` from its current value.
    ///
    /// Missing intermediate nodes are created as empty objects (or arrays,
    /// for index keys). A `Key::Length` step leaves the value untouched.
    pub fn update_in<F>(&self, path: &[Key], f: F) -> Value
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let Some((head, rest)) = path.split_first() else {
            return f(Some(self));
        };
        let current = match head {
            Key::Field(name) => self.as_object().and_then(|fields| fields.get(name)),
            Key::Index(index) => self.as_array().and_then(|items| items.get(*index)),
            Key::Length => return self.clone(),
        };
        let replaced = match (current, rest.is_empty()) {
            (current, true) => f(current),
            (Some(child), false) => child.update_in(rest, f),
            (None, false) => {
                let empty = match rest[0] {
                    Key::Index(_) => Value::array([]),
                    _ => Value::object::<String, _>([]),
                };
                empty.update_in(rest, f)
            }
        };
        match head {
            Key::Field(name) => self.with_field(name.clone(), replaced),
            Key::Index(index) => self.with_index(*index, replaced),
            Key::Length => self.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self.clone()))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.into()),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(fields) => {
                Value::object(fields.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::from(n),
            // Non-finite floats have no JSON form.
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => serde_json::Value::Array(
                items.iter().cloned().map(serde_json::Value::from).collect(),
            ),
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v.clone())))
                    .collect(),
            ),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
