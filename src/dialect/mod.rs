//! Per-RDBMS literal formatting and type mapping.

mod sqlite;
mod sqlserver;

pub use sqlite::SqliteFormatter;
pub use sqlserver::SqlServerFormatter;

use serde::{Deserialize, Serialize};

use crate::parts::FieldOperation;
use crate::value::{SqlType, Value};

/// Supported target databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    SqlServer,
}

impl Dialect {
    pub fn formatter(&self) -> Box<dyn DialectFormatter> {
        match self {
            Dialect::Sqlite => Box::new(SqliteFormatter),
            Dialect::SqlServer => Box::new(SqlServerFormatter),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// Literal and type rules of one dialect.
///
/// The translator and the table builder stay dialect-agnostic and ask the
/// formatter for every literal and column type they emit.
pub trait DialectFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render `value` as a literal. `None` means "write the raw text".
    fn format_literal(&self, value: &Value, declared: Option<SqlType>) -> Option<String>;

    /// Column type keyword for DDL.
    fn map_type(&self, ty: SqlType) -> &'static str;

    /// Column type used when the column auto-increments.
    fn auto_increment_type(&self, ty: SqlType) -> &'static str {
        self.map_type(ty)
    }

    fn auto_increment_keyword(&self) -> &'static str;

    /// Keyword introducing a new column in ALTER TABLE.
    fn add_column_keyword(&self) -> &'static str {
        "ADD COLUMN"
    }

    fn supports_column_operation(&self, op: FieldOperation) -> bool;

    /// Opening fragment of a CREATE TABLE, up to and including the bracket.
    fn create_table(&self, table: &str) -> String {
        format!("CREATE TABLE IF NOT EXISTS {} (", table)
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("ALTER TABLE {} RENAME TO {}", from, to)
    }

    fn supports_procedures(&self) -> bool {
        false
    }
}

/// Literal rules shared by all dialects; only the timestamp layout differs.
pub(crate) fn format_literal_with(
    value: &Value,
    declared: Option<SqlType>,
    datetime_format: &str,
) -> Option<String> {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => bool_literal(*b),
        Value::Int(n) if declared == Some(SqlType::Bool) => bool_literal(*n != 0),
        Value::Int(n) => n.to_string(),
        // SQL has no NaN or infinity literal
        Value::Float(n) if !n.is_finite() => "NULL".to_string(),
        Value::Float(n) => n.to_string(),
        Value::Decimal(s) => s.clone(),
        Value::String(s) => quote(s),
        Value::DateTime(d) => quote(&d.format(datetime_format).to_string()),
        Value::Date(d) => quote(&d.format("%Y-%m-%d").to_string()),
        Value::Uuid(u) => quote(&u.to_string()),
        Value::Raw(_) => return None,
    };
    Some(text)
}

fn bool_literal(b: bool) -> String {
    if b { "1".to_string() } else { "0".to_string() }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_string_literal_escapes_quotes() {
        let f = Dialect::Sqlite.formatter();
        assert_eq!(
            f.format_literal(&Value::from("O'Brien"), None).as_deref(),
            Some("'O''Brien'")
        );
    }

    #[test]
    fn test_bool_and_null_literals() {
        let f = Dialect::SqlServer.formatter();
        assert_eq!(f.format_literal(&Value::Bool(true), None).as_deref(), Some("1"));
        assert_eq!(
            f.format_literal(&Value::Int(5), Some(SqlType::Bool)).as_deref(),
            Some("1")
        );
        assert_eq!(f.format_literal(&Value::Null, None).as_deref(), Some("NULL"));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        let f = Dialect::Sqlite.formatter();
        assert_eq!(f.format_literal(&Value::Float(2.5), None).as_deref(), Some("2.5"));
        assert_eq!(f.format_literal(&Value::Float(f64::NAN), None).as_deref(), Some("NULL"));
        assert_eq!(
            f.format_literal(&Value::Float(f64::INFINITY), None).as_deref(),
            Some("NULL")
        );
        let quotient = crate::expr::lit(1.0).div(0).evaluate().unwrap();
        assert_eq!(f.format_literal(&quotient, None).as_deref(), Some("NULL"));
    }

    #[test]
    fn test_raw_has_no_literal() {
        let f = Dialect::Sqlite.formatter();
        assert_eq!(f.format_literal(&Value::Raw("GETDATE()".into()), None), None);
    }

    #[test]
    fn test_datetime_layout_per_dialect() {
        let at = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let value = Value::DateTime(at);
        assert_eq!(
            Dialect::Sqlite.formatter().format_literal(&value, None).as_deref(),
            Some("'1970-01-01 12:30:00'")
        );
        assert_eq!(
            Dialect::SqlServer.formatter().format_literal(&value, None).as_deref(),
            Some("'1970-01-01T12:30:00'")
        );
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("SQLite".parse::<Dialect>(), Ok(Dialect::Sqlite));
        assert_eq!("mssql".parse::<Dialect>(), Ok(Dialect::SqlServer));
        assert!("oracle".parse::<Dialect>().is_err());
    }
}
