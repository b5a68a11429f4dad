//! Literal values, semantic column types and evaluation thunks.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value bound into a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Exact numeric kept as text
    Decimal(String),
    /// String
    String(String),
    /// Timestamp without zone
    DateTime(NaiveDateTime),
    /// Calendar date
    Date(NaiveDate),
    /// UUID value
    Uuid(Uuid),
    /// Text the dialect will not format; written as-is
    Raw(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(s) => write!(f, "{}", s),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Raw(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Semantic column type, mapped to a keyword by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    String,
    Char,
    DateTime,
    Date,
    Guid,
    Binary,
}

impl SqlType {
    pub const ALL: [SqlType; 14] = [
        SqlType::Bool,
        SqlType::TinyInt,
        SqlType::SmallInt,
        SqlType::Int,
        SqlType::BigInt,
        SqlType::Real,
        SqlType::Float,
        SqlType::Decimal,
        SqlType::String,
        SqlType::Char,
        SqlType::DateTime,
        SqlType::Date,
        SqlType::Guid,
        SqlType::Binary,
    ];

    /// The semantic type a value naturally carries, if any.
    pub fn of(value: &Value) -> Option<SqlType> {
        match value {
            Value::Null | Value::Raw(_) => None,
            Value::Bool(_) => Some(SqlType::Bool),
            Value::Int(_) => Some(SqlType::BigInt),
            Value::Float(_) => Some(SqlType::Float),
            Value::Decimal(_) => Some(SqlType::Decimal),
            Value::String(_) => Some(SqlType::String),
            Value::DateTime(_) => Some(SqlType::DateTime),
            Value::Date(_) => Some(SqlType::Date),
            Value::Uuid(_) => Some(SqlType::Guid),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

struct DeferredInner {
    eval: Box<dyn Fn() -> Value + Send + Sync>,
    value: OnceCell<Value>,
}

/// A value produced on first use.
///
/// The thunk runs at most once per `Deferred` (and its clones); every later
/// read returns the cached result. Compilation reads it when the part that
/// holds it is rendered, so values captured at build time are observed at
/// compile time.
#[derive(Clone)]
pub struct Deferred(Arc<DeferredInner>);

impl Deferred {
    pub fn new(eval: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(DeferredInner {
            eval: Box::new(eval),
            value: OnceCell::new(),
        }))
    }

    /// Evaluate (once) and return the value.
    pub fn value(&self) -> &Value {
        self.0.value.get_or_init(|| (self.0.eval)())
    }

    pub fn is_evaluated(&self) -> bool {
        self.0.value.get().is_some()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value.get() {
            Some(v) => write!(f, "Deferred({:?})", v),
            None => write!(f, "Deferred(<pending>)"),
        }
    }
}

/// Converts a value read from the database into the value handed to the caller.
#[derive(Clone)]
pub struct Converter(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl Converter {
    pub fn new(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: &Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter")
    }
}
