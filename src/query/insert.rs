//! INSERT statements.

use std::marker::PhantomData;

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::PartsResult;
use crate::parts::{FieldRef, OperationType, ParameterPart, PartsBuilder, QueryPart, QueryPartsMap};
use crate::schema::{Entity, TableSchema};
use crate::value::Value;

/// `INSERT INTO T (cols) VALUES (literals)` for one entity instance.
pub struct InsertQuery<T: Entity> {
    compiler: QueryCompiler,
    schema: TableSchema,
    values: Vec<Value>,
    ignored: Vec<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> InsertQuery<T> {
    pub fn new(compiler: QueryCompiler, entity: &T) -> Self {
        Self {
            compiler,
            schema: TableSchema::of::<T>(),
            values: entity.values(),
            ignored: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Leave a member out, e.g. an auto-increment key.
    pub fn ignore(mut self, member: &str) -> Self {
        self.ignored.push(member.to_string());
        self
    }

    pub fn compile(self) -> PartsResult<CompiledQuery> {
        let builder = PartsBuilder::new();
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(
            OperationType::Insert,
            format!("INSERT INTO {}", T::entity_name()),
        ));
        builder.append_simple_part(&mut map, OperationType::InsertFields);
        builder.append_simple_part(&mut map, OperationType::Values);

        for (field, value) in self.schema.fields().iter().zip(self.values) {
            if self.ignored.contains(&field.member_name) {
                continue;
            }
            map.add_to_last(
                QueryPart::field(FieldRef::new(&field.member_name)),
                OperationType::InsertFields,
            );
            map.add_to_last(
                QueryPart::parameter(
                    OperationType::None,
                    ParameterPart::value(value).declared(field.sql_type),
                ),
                OperationType::Values,
            );
        }

        self.compiler.compile(map)
    }
}
