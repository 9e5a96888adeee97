//! Closed metadata value type.
//!
//! Metadata attached to a variable is a map of label names to [`Value`].
//! The union is deliberately closed: everything a netCDF attribute can carry
//! round-trips through one of these variants, and nothing else is accepted.

use serde::{Deserialize, Serialize};

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer-valued metadata (also the target of boolean coercion).
    Int(i64),
    /// Floating point metadata; NaN marks an unset value.
    Float(f64),
    /// Text metadata.
    Str(String),
    /// Boolean metadata; coerced to an integer before hitting the file.
    Bool(bool),
    /// A short fixed array, e.g. a per-channel calibration vector.
    Array(Vec<Value>),
}

/// Discriminant of a [`Value`], used for declared-type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Str,
    Bool,
    Array,
}

impl Value {
    /// The variant discriminant.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Array(_) => ValueKind::Array,
        }
    }

    /// True only for a float NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan())
    }

    /// Numeric view, if the value is numeric (booleans count as 0/1).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Integer view, truncating floats.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attempt to cast to the given kind. Returns `None` when the value
    /// cannot represent the target (e.g. non-numeric text to a float).
    pub fn cast_to(&self, kind: ValueKind) -> Option<Value> {
        match kind {
            ValueKind::Int => self
                .as_i64()
                .or_else(|| self.as_str().and_then(|s| s.trim().parse().ok()))
                .map(Value::Int),
            ValueKind::Float => self
                .as_f64()
                .or_else(|| self.as_str().and_then(|s| s.trim().parse().ok()))
                .map(Value::Float),
            ValueKind::Str => match self {
                Value::Str(s) => Some(Value::Str(s.clone())),
                Value::Int(i) => Some(Value::Str(i.to_string())),
                Value::Float(f) => Some(Value::Str(f.to_string())),
                Value::Bool(b) => Some(Value::Str(b.to_string())),
                Value::Array(_) => None,
            },
            ValueKind::Bool | ValueKind::Array => None,
        }
    }

    /// NaN-aware consistency: two values agree when they compare equal or
    /// when either side is a float NaN. Used to decide whether redundant
    /// file labels mapped onto one internal label actually disagree.
    pub fn consistent_with(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        self.is_nan() || other.is_nan()
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
