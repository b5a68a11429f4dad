use super::{DialectFormatter, format_literal_with};
use crate::parts::FieldOperation;
use crate::value::{SqlType, Value};

pub struct SqliteFormatter;

impl DialectFormatter for SqliteFormatter {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn format_literal(&self, value: &Value, declared: Option<SqlType>) -> Option<String> {
        format_literal_with(value, declared, "%Y-%m-%d %H:%M:%S")
    }

    fn map_type(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Bool => "bit",
            SqlType::TinyInt => "tinyint",
            SqlType::SmallInt => "smallint",
            SqlType::Int => "int",
            SqlType::BigInt => "bigint",
            SqlType::Real => "real",
            SqlType::Float => "float",
            SqlType::Decimal => "decimal",
            SqlType::String => "varchar(1000)",
            SqlType::Char => "char(1)",
            SqlType::DateTime => "datetime",
            SqlType::Date => "date",
            SqlType::Guid => "varchar(36)",
            SqlType::Binary => "blob",
        }
    }

    // AUTOINCREMENT is only accepted on an INTEGER PRIMARY KEY column.
    fn auto_increment_type(&self, _ty: SqlType) -> &'static str {
        "integer"
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "PRIMARY KEY AUTOINCREMENT"
    }

    fn supports_column_operation(&self, op: FieldOperation) -> bool {
        matches!(op, FieldOperation::None | FieldOperation::Add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_keywords() {
        let f = SqliteFormatter;
        assert_eq!(f.map_type(SqlType::Int), "int");
        assert_eq!(f.map_type(SqlType::String), "varchar(1000)");
        assert_eq!(f.map_type(SqlType::Guid), "varchar(36)");
        assert_eq!(f.auto_increment_type(SqlType::BigInt), "integer");
    }

    #[test]
    fn test_only_add_column_supported() {
        let f = SqliteFormatter;
        assert!(f.supports_column_operation(FieldOperation::Add));
        assert!(!f.supports_column_operation(FieldOperation::Drop));
        assert!(!f.supports_column_operation(FieldOperation::Alter));
        assert!(!f.supports_procedures());
    }
}
