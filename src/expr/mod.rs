//! Predicate and projection expressions.
//!
//! Statements never inspect Rust closures. Callers describe predicates with
//! an explicit tree built from the helpers below:
//!
//! ```
//! use partsmap::expr::{col, qualified};
//!
//! let on = qualified("Customer", "Id").eq(qualified("Orders", "CustomerId"));
//! let filter = col("Name").eq("Bob").and(col("Age").gt(18));
//! ```

mod translator;

pub use translator::ExpressionTranslator;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::value::{Deferred, Value};

/// Binary operator of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    And,
    Or,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// SQL keyword for operators the translator renders natively.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            BinaryOp::Equal => Some("="),
            BinaryOp::NotEqual => Some("<>"),
            BinaryOp::And => Some("AND"),
            BinaryOp::Or => Some("OR"),
            BinaryOp::Greater => Some(">"),
            BinaryOp::GreaterOrEqual => Some(">="),
            BinaryOp::Less => Some("<"),
            BinaryOp::LessOrEqual => Some("<="),
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            other => other.keyword().unwrap_or_default(),
        }
    }
}

/// A node of a predicate or projection tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column access on an entity (`Customer.Name`) or on one of its
    /// statement aliases (`m.Name`). An alias wins over the entity.
    Member {
        entity: Option<String>,
        alias: Option<String>,
        field: String,
    },
    /// Already evaluated value
    Constant(Value),
    /// Value computed on first read
    Deferred(Deferred),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Type conversion; translated as its operand
    Convert(Box<Expr>),
    /// Host computation the translator cannot see into
    Opaque {
        description: String,
        thunk: Deferred,
    },
}

/// Column of the statement's default entity.
pub fn col(field: impl Into<String>) -> Expr {
    Expr::Member {
        entity: None,
        alias: None,
        field: field.into(),
    }
}

/// Column of a named entity.
pub fn qualified(entity: impl Into<String>, field: impl Into<String>) -> Expr {
    Expr::Member {
        entity: Some(entity.into()),
        alias: None,
        field: field.into(),
    }
}

/// Column of the table bound to `alias` in this statement.
///
/// Needed when one entity appears more than once, as in a self-join:
///
/// ```
/// use partsmap::expr::{col, qualified_as};
///
/// let on = col("ManagerId").eq(qualified_as("e", "Id"));
/// ```
pub fn qualified_as(alias: impl Into<String>, field: impl Into<String>) -> Expr {
    Expr::Member {
        entity: None,
        alias: Some(alias.into()),
        field: field.into(),
    }
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

pub fn deferred(eval: impl Fn() -> Value + Send + Sync + 'static) -> Expr {
    Expr::Deferred(Deferred::new(eval))
}

pub fn convert(inner: impl Into<Expr>) -> Expr {
    Expr::Convert(Box::new(inner.into()))
}

pub fn opaque(
    description: impl Into<String>,
    eval: impl Fn() -> Value + Send + Sync + 'static,
) -> Expr {
    Expr::Opaque {
        description: description.into(),
        thunk: Deferred::new(eval),
    }
}

impl Expr {
    fn binary(self, op: BinaryOp, right: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Equal, right)
    }

    pub fn ne(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEqual, right)
    }

    pub fn gt(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Greater, right)
    }

    pub fn ge(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GreaterOrEqual, right)
    }

    pub fn lt(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Less, right)
    }

    pub fn le(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LessOrEqual, right)
    }

    pub fn and(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::And, right)
    }

    pub fn or(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Or, right)
    }

    pub fn add(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Add, right)
    }

    pub fn sub(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Subtract, right)
    }

    pub fn mul(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Multiply, right)
    }

    pub fn div(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Divide, right)
    }

    /// The member accessed by a bare or converted member expression.
    pub fn as_member(&self) -> Option<(Option<&str>, &str)> {
        match self {
            Expr::Member { entity, field, .. } => Some((entity.as_deref(), field.as_str())),
            Expr::Convert(inner) => inner.as_member(),
            _ => None,
        }
    }

    /// Evaluate without a database.
    ///
    /// Member access cannot be evaluated and yields `None`. Deferred and
    /// opaque nodes run their thunk at most once.
    pub fn evaluate(&self) -> Option<Value> {
        match self {
            Expr::Member { .. } => None,
            Expr::Constant(v) => Some(v.clone()),
            Expr::Deferred(d) => Some(d.value().clone()),
            Expr::Opaque { thunk, .. } => Some(thunk.value().clone()),
            Expr::Convert(inner) => inner.evaluate(),
            Expr::Binary { op, left, right } => {
                let left = left.evaluate()?;
                let right = right.evaluate()?;
                evaluate_binary(*op, &left, &right)
            }
        }
    }
}

fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    use Value::{Bool, Float, Int};

    let as_float = |v: &Value| match v {
        Int(n) => Some(*n as f64),
        Float(n) => Some(*n),
        _ => None,
    };

    match (op, left, right) {
        (BinaryOp::Add, Int(a), Int(b)) => a.checked_add(*b).map(Int),
        (BinaryOp::Subtract, Int(a), Int(b)) => a.checked_sub(*b).map(Int),
        (BinaryOp::Multiply, Int(a), Int(b)) => a.checked_mul(*b).map(Int),
        (BinaryOp::Divide, Int(a), Int(b)) => a.checked_div(*b).map(Int),
        (BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide, a, b) => {
            let (a, b) = (as_float(a)?, as_float(b)?);
            Some(Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                _ => a / b,
            }))
        }
        (BinaryOp::Equal, a, b) => Some(Bool(a == b)),
        (BinaryOp::NotEqual, a, b) => Some(Bool(a != b)),
        (BinaryOp::And, Bool(a), Bool(b)) => Some(Bool(*a && *b)),
        (BinaryOp::Or, Bool(a), Bool(b)) => Some(Bool(*a || *b)),
        _ => None,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Member {
                alias: Some(qualifier),
                field,
                ..
            }
            | Expr::Member {
                entity: Some(qualifier),
                field,
                ..
            } => write!(f, "{}.{}", qualifier, field),
            Expr::Member { field, .. } => write!(f, "{}", field),
            Expr::Constant(v) => write!(f, "{}", v),
            Expr::Deferred(d) => write!(f, "{}", d.value()),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Convert(inner) => write!(f, "{}", inner),
            Expr::Opaque { description, .. } => write!(f, "{}", description),
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Constant(v)
    }
}

impl From<Deferred> for Expr {
    fn from(d: Deferred) -> Self {
        Expr::Deferred(d)
    }
}

macro_rules! constant_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::Constant(v.into())
                }
            }
        )*
    };
}

constant_from!(
    bool,
    i32,
    i64,
    u32,
    f64,
    &str,
    String,
    NaiveDateTime,
    NaiveDate,
    Uuid,
);

impl<T: Into<Value>> From<Option<T>> for Expr {
    fn from(opt: Option<T>) -> Self {
        Expr::Constant(opt.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_shape_tree() {
        let expr = col("Name").eq("Bob").and(col("Age").gt(18));
        assert_eq!(expr.to_string(), "((Name = Bob) AND (Age > 18))");
    }

    #[test]
    fn test_evaluate_member_is_none() {
        assert!(col("Id").evaluate().is_none());
        assert!(col("Id").add(1).evaluate().is_none());
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(lit(2).mul(21).evaluate(), Some(Value::Int(42)));
        assert_eq!(lit(1.5).add(1).evaluate(), Some(Value::Float(2.5)));
        assert_eq!(lit(1).div(0).evaluate(), None);
    }

    #[test]
    fn test_alias_qualifier_displays_first() {
        assert_eq!(qualified_as("m", "Id").to_string(), "m.Id");
        assert_eq!(qualified("Orders", "Id").to_string(), "Orders.Id");
    }

    #[test]
    fn test_as_member_sees_through_convert() {
        let expr = convert(qualified("Orders", "Id"));
        assert_eq!(expr.as_member(), Some((Some("Orders"), "Id")));
    }
}
