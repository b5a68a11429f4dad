use super::{DialectFormatter, format_literal_with};
use crate::parts::FieldOperation;
use crate::value::{SqlType, Value};

pub struct SqlServerFormatter;

impl DialectFormatter for SqlServerFormatter {
    fn name(&self) -> &'static str {
        "SQL Server"
    }

    fn format_literal(&self, value: &Value, declared: Option<SqlType>) -> Option<String> {
        format_literal_with(value, declared, "%Y-%m-%dT%H:%M:%S")
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
            SqlType::Decimal => "decimal(18,2)",
            SqlType::String => "nvarchar(max)",
            SqlType::Char => "nchar(1)",
            SqlType::DateTime => "datetime",
            SqlType::Date => "date",
            SqlType::Guid => "uniqueidentifier",
            SqlType::Binary => "varbinary(max)",
        }
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "IDENTITY(1,1) PRIMARY KEY"
    }

    // T-SQL: ALTER TABLE T ADD name type
    fn add_column_keyword(&self) -> &'static str {
        "ADD"
    }

    fn supports_column_operation(&self, _op: FieldOperation) -> bool {
        true
    }

    fn create_table(&self, table: &str) -> String {
        format!("CREATE TABLE {} (", table)
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("EXEC sp_rename '{}', '{}'", from, to)
    }

    fn supports_procedures(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_keywords() {
        let f = SqlServerFormatter;
        assert_eq!(f.map_type(SqlType::Decimal), "decimal(18,2)");
        assert_eq!(f.map_type(SqlType::Guid), "uniqueidentifier");
        assert_eq!(f.auto_increment_type(SqlType::Int), "int");
    }

    #[test]
    fn test_table_statements() {
        let f = SqlServerFormatter;
        assert_eq!(f.create_table("Orders"), "CREATE TABLE Orders (");
        assert_eq!(f.rename_table("A", "B"), "EXEC sp_rename 'A', 'B'");
    }
}
