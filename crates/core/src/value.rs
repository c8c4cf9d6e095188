// SPDX-License-Identifier: MIT

//! The tagged data tree used for job manifests and the IPC wire protocol.
//!
//! A [`Value`] is a sum type with one variant per leaf kind plus `Array`
//! and `Map`. Unlike a JSON value it can carry an owned file descriptor as
//! a leaf (`Value::Fd`); on the wire that leaf transfers ownership rather
//! than being duplicated (see `wire::encode`/`wire::decode`).
//!
//! `Value` deliberately does not implement `Clone`: an owned descriptor
//! cannot be cheaply or safely duplicated by an ordinary clone. Code that
//! needs to hand out a read-only copy of a manifest (`get-job`) uses
//! [`Value::redact_fds`], which produces a new tree with every `Fd` leaf
//! replaced by `Null` — the copy never touches descriptor ownership. Code
//! that needs to share a manifest cheaply across the registry instead
//! holds it behind an `Arc<Value>`.

use std::collections::BTreeMap;
use std::os::fd::OwnedFd;

/// One entry of a [`Mapping`]. Kept as an ordered association list (rather
/// than a `HashMap`) so that `decode(encode(tree))` preserves key order,
/// matching the round-trip property in spec.md §8.
#[derive(Debug, Default)]
pub struct Mapping(Vec<(String, Value)>);

impl Mapping {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(std::mem::replace(&mut slot.1, value))
        } else {
            self.0.push((key, value));
            None
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Mapping {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut m = Mapping::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}

#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// An owned descriptor. Transferred, not duplicated, on encode.
    Fd(OwnedFd),
    /// An opaque platform port reference (e.g. a Mach port name). Carried
    /// as a plain integer; the core never dereferences it.
    Port(i64),
    Array(Vec<Value>),
    Map(Mapping),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn map() -> Self {
        Value::Map(Mapping::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Consumes an `Fd` leaf, returning the descriptor. Returns `None` for
    /// any other variant (the descriptor stays where it was, untouched).
    pub fn into_fd(self) -> Option<OwnedFd> {
        match self {
            Value::Fd(fd) => Some(fd),
            _ => None,
        }
    }

    /// Deep-copies the tree, replacing every `Fd` leaf with `Null`. Used to
    /// answer `get-job` without giving the reply a live descriptor.
    pub fn redact_fds(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Float(*f),
            Value::Str(s) => Value::Str(s.clone()),
            Value::Bytes(b) => Value::Bytes(b.clone()),
            Value::Fd(_) => Value::Null,
            Value::Port(p) => Value::Port(*p),
            Value::Array(items) => Value::Array(items.iter().map(Value::redact_fds).collect()),
            Value::Map(m) => {
                Value::Map(m.iter().map(|(k, v)| (k.to_string(), v.redact_fds())).collect())
            }
        }
    }
}

/// A snapshot of a mapping's string-keyed fields, used when validating a
/// submitted manifest reports which required keys were missing.
pub fn missing_keys<'a>(map: &Mapping, required: &'a [&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|k| !map.contains_key(k))
        .collect()
}

/// A flattened read-only view of scalar leaves by key, useful for tests
/// that want to assert on a manifest's contents without walking `Value`.
pub fn scalar_snapshot(map: &Mapping) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| match v {
            Value::Str(s) => Some((k.to_string(), s.clone())),
            Value::Int(i) => Some((k.to_string(), i.to_string())),
            Value::Bool(b) => Some((k.to_string(), b.to_string())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
