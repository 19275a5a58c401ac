//! Read keys.
//!
//! A `Key` names one observable read on a state node: a field of an object,
//! an element of an array, or the node's length.

use std::fmt;

/// One readable position on a state node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named object field.
    Field(String),

    /// An array element.
    Index(usize),

    /// The element count of an array or the field count of an object.
    Length,
}

impl Key {
    /// The field name, if this is a field key.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Key::Field(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::Field(name.clone())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => write!(f, ".{name}"),
            Key::Index(index) => write!(f, "[{index}]"),
            Key::Length => f.write_str(".length"),
        }
    }
}
