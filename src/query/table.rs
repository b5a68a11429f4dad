//! Table definition statements (CREATE, ALTER, RENAME, DROP).

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::dialect::DialectFormatter;
use crate::error::{PartsError, PartsResult};
use crate::parts::{
    ColumnDef, FieldOperation, KeyValuePart, KeyValues, OperationType, PartKey, QueryPart,
    QueryPartsMap,
};
use crate::schema::{Entity, TableSchema};
use crate::value::SqlType;

/// Builds DDL for one table.
///
/// Column, key and ignore calls collect parts; `create`, `compile`,
/// `rename_to` and `drop` finish the statement.
pub struct TableQuery {
    map: QueryPartsMap,
    compiler: QueryCompiler,
    formatter: Box<dyn DialectFormatter>,
    schema: TableSchema,
    auto_increment: Vec<String>,
}

impl TableQuery {
    pub fn new(compiler: QueryCompiler, schema: TableSchema) -> Self {
        Self {
            map: QueryPartsMap::new(),
            formatter: compiler.dialect().formatter(),
            compiler,
            schema,
            auto_increment: Vec::new(),
        }
    }

    pub fn of<T: Entity>(compiler: QueryCompiler) -> Self {
        Self::new(compiler, TableSchema::of::<T>())
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Leave a member out of CREATE TABLE.
    pub fn ignore(mut self, member: &str) -> Self {
        self.map
            .add(QueryPart::text(OperationType::IgnoreColumn, "").with_id(member));
        self
    }

    /// Single-column primary key. An auto-increment key is declared inline
    /// on its column.
    pub fn key(mut self, member: &str, auto_increment: bool) -> Self {
        if auto_increment {
            self.auto_increment.push(member.to_string());
        } else {
            self.map.add(QueryPart::table_key(
                member,
                format!("PRIMARY KEY ({})", member),
            ));
        }
        self
    }

    /// Composite primary key.
    pub fn composite_key(mut self, members: &[&str]) -> PartsResult<Self> {
        if members.is_empty() {
            return Err(PartsError::missing("members", "a composite key needs at least one member"));
        }
        let columns = members.join(", ");
        self.map.add(QueryPart::table_key(
            columns.clone(),
            format!("PRIMARY KEY ({})", columns),
        ));
        Ok(self)
    }

    pub fn foreign_key(mut self, member: &str, table: &str, reference: &str) -> Self {
        self.map.add(QueryPart::table_key(
            member,
            format!("FOREIGN KEY({}) REFERENCES {}({})", member, table, reference),
        ));
        self
    }

    /// Define or alter one column.
    ///
    /// `FieldOperation::None` declares a column for CREATE TABLE. `Add`,
    /// `Alter` and `Drop` build an ALTER TABLE; only one alteration fits in
    /// a statement. The type defaults to the member's mapped type and is
    /// required for columns the schema does not know.
    pub fn column(
        mut self,
        name: &str,
        operation: FieldOperation,
        field_type: Option<SqlType>,
        nullable: Option<bool>,
    ) -> PartsResult<Self> {
        if !self.formatter.supports_column_operation(operation) {
            return Err(PartsError::unsupported(
                self.formatter.name(),
                operation.to_string(),
            ));
        }

        let known = self.schema.field(name);
        let field_type = field_type.or(known.map(|f| f.sql_type));
        let nullable = nullable.or(known.map(|f| f.nullable));

        match operation {
            FieldOperation::None => {
                let sql_type = field_type.ok_or_else(|| {
                    PartsError::missing("field_type", format!("no type known for column '{}'", name))
                })?;
                let part = QueryPart::column(ColumnDef {
                    name: name.to_string(),
                    sql_type,
                    nullable: nullable.unwrap_or(true),
                    auto_increment: false,
                });
                let anchor = if self.map.contains(OperationType::Column) {
                    OperationType::Column
                } else {
                    OperationType::CreateTable
                };
                self.map.add_after(part, anchor);
            }
            FieldOperation::Add | FieldOperation::Alter => {
                let sql_type = field_type.ok_or_else(|| {
                    PartsError::missing("field_type", "required when adding a column")
                })?;
                let mut values = KeyValues::new()
                    .with(KeyValuePart::MemberName, name)
                    .with(KeyValuePart::MemberType, self.formatter.map_type(sql_type));
                if let Some(nullable) = nullable {
                    values = values.with(KeyValuePart::Nullable, nullable.to_string());
                }
                let op = if operation == FieldOperation::Add {
                    OperationType::AddColumn
                } else {
                    OperationType::AlterField
                };
                self.begin_alter()?;
                self.map.add(QueryPart::values(op, values));
            }
            FieldOperation::Drop => {
                self.begin_alter()?;
                self.map
                    .add(QueryPart::text(OperationType::DropColumn, name));
            }
        }
        Ok(self)
    }

    fn begin_alter(&mut self) -> PartsResult<()> {
        if self.map.contains(OperationType::AlterTable) {
            return Err(PartsError::unsupported(
                self.formatter.name(),
                "more than one column alteration per statement",
            ));
        }
        let table = self.schema.name().to_string();
        self.map
            .add(QueryPart::text(OperationType::AlterTable, table));
        Ok(())
    }

    /// `CREATE TABLE` over every member not ignored, in member order.
    pub fn create(mut self) -> PartsResult<CompiledQuery> {
        let opening = self.formatter.create_table(self.schema.name());
        self.map.add_before(
            QueryPart::text(OperationType::CreateTable, opening),
            OperationType::None,
        );

        // Columns declared for a member are lifted out and put back at the
        // member's position. Columns for unknown names stay last.
        let declared_keys: Vec<PartKey> = self
            .map
            .parts_of(OperationType::Column)
            .filter(|p| p.id().is_some_and(|id| self.schema.field(id).is_some()))
            .map(QueryPart::key)
            .collect();
        let mut declared: Vec<QueryPart> = declared_keys
            .into_iter()
            .filter_map(|key| self.map.remove(key))
            .collect();

        // Reverse walk plus add_before keeps member order.
        for field in self.schema.fields().iter().rev() {
            let ignored = self
                .map
                .parts_of(OperationType::IgnoreColumn)
                .any(|p| p.id() == Some(field.member_name.as_str()));
            if ignored {
                continue;
            }

            let part = match declared
                .iter()
                .position(|p| p.id() == Some(field.member_name.as_str()))
            {
                Some(pos) => declared.swap_remove(pos),
                None => QueryPart::column(ColumnDef {
                    name: field.member_name.clone(),
                    sql_type: field.sql_type,
                    nullable: field.nullable,
                    auto_increment: self.auto_increment.contains(&field.member_name),
                }),
            };
            if self.map.contains(OperationType::Column) {
                self.map.add_before(part, OperationType::Column);
            } else {
                self.map.add_after(part, OperationType::CreateTable);
            }
        }
        for part in declared {
            self.map.add_after(part, OperationType::Column);
        }

        self.map.add(QueryPart::text(OperationType::None, ")"));
        self.compiler.compile(self.map)
    }

    /// Finish an ALTER TABLE built with [`TableQuery::column`].
    pub fn compile(self) -> PartsResult<CompiledQuery> {
        if !self.map.contains(OperationType::AlterTable) {
            return Err(PartsError::missing(
                "column",
                "an ALTER TABLE needs a column operation",
            ));
        }
        self.compiler.compile(self.map)
    }

    pub fn rename_to(mut self, new_name: &str) -> PartsResult<CompiledQuery> {
        if new_name.is_empty() {
            return Err(PartsError::missing("new_name", "a table needs a name"));
        }
        let values = KeyValues::new()
            .with(KeyValuePart::Key, self.schema.name())
            .with(KeyValuePart::Value, new_name);
        self.map
            .add(QueryPart::values(OperationType::RenameTable, values));
        self.compiler.compile(self.map)
    }

    pub fn drop(mut self) -> PartsResult<CompiledQuery> {
        let table = self.schema.name().to_string();
        self.map.add(QueryPart::text(OperationType::DropTable, table));
        self.compiler.compile(self.map)
    }
}
