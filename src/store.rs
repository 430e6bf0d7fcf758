use std::collections::BTreeMap;
use std::fmt::Display;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// A single typed value held in the [`Store`].
///
/// Values are tagged rather than stringly-typed so that key typos and type
/// mismatches surface at the store boundary instead of deep inside a task
/// body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Path(Utf8PathBuf),
}

impl Value {
    /// An empty string or path counts as "unset" for the requires/provides
    /// contract. Integers and booleans are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(text) => text.is_empty(),
            Value::Path(path) => path.as_str().is_empty(),
            Value::Int(_) | Value::Bool(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Utf8Path> {
        match self {
            Value::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(text) => write!(f, "{text}"),
            Value::Int(number) => write!(f, "{number}"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Path(path) => write!(f, "{path}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Utf8PathBuf> for Value {
    fn from(value: Utf8PathBuf) -> Self {
        Value::Path(value)
    }
}

impl From<&Utf8Path> for Value {
    fn from(value: &Utf8Path) -> Self {
        Value::Path(value.to_path_buf())
    }
}

/// The key-value cache shared by every task in a pipeline.
///
/// Tasks may read any key, but by convention write only the keys they are
/// declared to provide; the engine verifies the latter after each successful
/// invocation. The store persists across passes within a session and is
/// cleared or reseeded only by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    vars: BTreeMap<Box<str>, Value>,
}

impl Store {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<Box<str>>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Removes the value stored under `key`.
    pub fn unset(&mut self, key: &str) {
        self.vars.remove(key);
    }

    /// Whether `key` holds a non-empty value.
    pub fn is_set(&self, key: &str) -> bool {
        self.vars.get(key).is_some_and(|value| !value.is_empty())
    }

    /// Iterates over all keys currently present, in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(|key| key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Removes every value from the store.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Serialize the store to a JSON string, for persisting a session.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Restore a store previously serialized with [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
