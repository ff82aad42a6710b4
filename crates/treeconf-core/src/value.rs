//! Configuration value types
//!
//! [`Value`] is the nested generic value exchanged with format codecs and callers:
//! scalars, sequences, mappings, or an already built [`Config`] to splice in.
//! [`Scalar`] is what a tree leaf holds: never null, possibly an unresolved
//! [`Expression`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::config::Config;
use crate::interpolation::Expression;

/// A nested configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[derive(Default)]
pub enum Value {
    /// Null value, never stored in a tree
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain `${...}` expressions)
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values. Keys are parsed as paths on tree construction.
    Mapping(IndexMap<String, Value>),
    /// Already built config, spliced in as a map
    #[serde(skip_deserializing, serialize_with = "serialize_config")]
    Config(Config),
}

fn serialize_config<S: Serializer>(config: &Config, serializer: S) -> Result<S::Ok, S::Error> {
    config.to_value().serialize(serializer)
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Leaf payload for scalar values, `None` for null and containers
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Integer(i) => Some(Scalar::Integer(*i)),
            Value::Float(f) => Some(Scalar::Float(*f)),
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::Config(_) => None,
        }
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Config(_) => "config",
        }
    }
}

/// Integral floats keep a fractional part so `1.0` does not print as an integer
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 {
        write!(f, "{:.1}", n)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write_float(f, *n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Config(config) => write!(f, "{}", config),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        Value::Config(config)
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        scalar.to_value()
    }
}

/// Payload of a tree leaf
#[derive(Debug, Clone)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Template with at least one unresolved `${...}` segment
    Expression(Expression),
}

impl Scalar {
    pub fn is_expression(&self) -> bool {
        matches!(self, Scalar::Expression(_))
    }

    /// Unwrap to a plain value. Expressions unwrap to their template text.
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Integer(i) => Value::Integer(*i),
            Scalar::Float(f) => Value::Float(*f),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Expression(e) => Value::String(e.template().to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Integer(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
            Scalar::Expression(_) => "expression",
        }
    }

    /// Type and value, as used in conversion error messages
    pub(crate) fn describe(&self) -> String {
        format!("{} ({})", self.type_name(), self)
    }
}

/// Structural equality: floats compare by bit pattern, so a NaN leaf equals itself
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Integer(a), Scalar::Integer(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::String(a), Scalar::String(b)) => a == b,
            (Scalar::Expression(a), Scalar::Expression(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(n) => write_float(f, *n),
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Expression(e) => write!(f, "{}", e.template()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}
