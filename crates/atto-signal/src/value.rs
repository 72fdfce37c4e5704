//! The open value union carried by signals.
//!
//! Values are application-defined data plus three engine-visible cases:
//! [`Value::Contradiction`] (the recorded outcome of an equal-strength
//! conflict), [`Value::Behavior`] (a late-bound behavior name resolved
//! against the catalog), and the [`Value::Template`]/[`Value::Instance`]
//! references used by the dynamic topology manager. Template and instance
//! references are indices into manager-owned registries, never pointers, so
//! a superseded generation can be retired without dangling references.

use std::collections::BTreeMap;

/// Weak reference to a registered template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TemplateId(pub u64);

/// Weak reference to a spawned instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct InstanceId(pub u64);

/// Instance metadata announced by a spawner.
///
/// `born` is logical time (the network step counter at instantiation), not
/// wall clock - the core stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceInfo {
    pub id: InstanceId,
    pub generation: u64,
    pub born: u64,
}

/// A signal's payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "data"))]
pub enum Value {
    /// The start state of every contact; also an absent optional input.
    Nothing,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
    /// Two equal-strength, differing values delivered to one contact.
    /// `first` is the value the contact held, `second` the arrival.
    Contradiction {
        first: Box<Value>,
        second: Box<Value>,
    },
    /// Late-bound behavior reference, resolved by name in the catalog.
    Behavior(String),
    Template(TemplateId),
    Instance(InstanceInfo),
}

impl Value {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_contradiction(&self) -> bool {
        matches!(self, Value::Contradiction { .. })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<TemplateId> {
        match self {
            Value::Template(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<InstanceInfo> {
        match self {
            Value::Instance(info) => Some(*info),
            _ => None,
        }
    }

    /// Variant name for diagnostics and type-mismatch reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nothing => "nothing",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Contradiction { .. } => "contradiction",
            Value::Behavior(_) => "behavior",
            Value::Template(_) => "template",
            Value::Instance(_) => "instance",
        }
    }

    /// Wrap two conflicting values into a contradiction marker.
    pub fn contradiction(first: Value, second: Value) -> Value {
        Value::Contradiction {
            first: Box::new(first),
            second: Box::new(second),
        }
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

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
