//! UPDATE statements.

use std::marker::PhantomData;

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::{PartsError, PartsResult};
use crate::expr::{Expr, ExpressionTranslator};
use crate::parts::{OperationType, ParameterPart, PartsBuilder, QueryPart, QueryPartsMap};
use crate::query::{key_members, key_predicate};
use crate::schema::{Entity, TableSchema};
use crate::value::Value;

/// `UPDATE T SET a=.., b=.. [WHERE ...]`
pub struct UpdateQuery<T: Entity> {
    map: QueryPartsMap,
    builder: PartsBuilder,
    compiler: QueryCompiler,
    schema: TableSchema,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> UpdateQuery<T> {
    pub fn new(compiler: QueryCompiler) -> Self {
        let builder = PartsBuilder::new();
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(
            OperationType::Update,
            format!("UPDATE {}", T::entity_name()),
        ));
        builder.append_simple_part(&mut map, OperationType::Set);
        Self {
            map,
            builder,
            compiler,
            schema: TableSchema::of::<T>(),
            _entity: PhantomData,
        }
    }

    /// Update every non-key member of `entity`, located by `key` or by the
    /// key convention.
    pub fn entity(compiler: QueryCompiler, entity: &T, key: Option<&str>) -> PartsResult<Self> {
        let predicate = key_predicate(entity, key)?;
        let keys = key_members::<T>(key);

        let mut query = Self::new(compiler);
        let values = entity.values();
        let members: Vec<String> = query
            .schema
            .fields()
            .iter()
            .map(|f| f.member_name.clone())
            .collect();
        for (member, value) in members.into_iter().zip(values) {
            if keys.contains(&member) {
                continue;
            }
            query = query.set(&member, value);
        }
        Ok(query.filter(predicate))
    }

    /// Update the members set on an example object for all rows matching
    /// `predicate`.
    pub fn from_example(
        _compiler: QueryCompiler,
        _example: &serde_json::Value,
        _predicate: Expr,
    ) -> PartsResult<Self> {
        Err(PartsError::NotImplemented("update from example object"))
    }

    /// Assign a value to a member.
    pub fn set(mut self, member: &str, value: impl Into<Value>) -> Self {
        let mut param = ParameterPart::value(value).named(member);
        if let Some(field) = self.schema.field(member) {
            param = param.declared(field.sql_type);
        }
        self.map.add_to_last(
            QueryPart::parameter(OperationType::None, param),
            OperationType::Set,
        );
        self
    }

    /// Restrict the affected rows. Repeated calls are ANDed together.
    pub fn filter(mut self, predicate: Expr) -> Self {
        let translator = ExpressionTranslator::new(Some(T::entity_name().to_string()));
        self.builder
            .append_where_part(&mut self.map, &translator, &predicate, |_| false);
        self
    }

    pub fn compile(self) -> PartsResult<CompiledQuery> {
        let assignments = self
            .map
            .parts_of(OperationType::Set)
            .filter_map(|p| p.as_group())
            .map(|g| g.parts().len())
            .sum::<usize>();
        if assignments == 0 {
            return Err(PartsError::missing(
                "set",
                format!("UPDATE {} has no assignments", T::entity_name()),
            ));
        }
        self.compiler.compile(self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::col;
    use crate::tests_cfg::Customer;
    use pretty_assertions::assert_eq;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(Dialect::Sqlite)
    }

    #[test]
    fn test_update_entity_by_key() {
        let customer = Customer {
            id: 7,
            name: "Bob's".into(),
            email: None,
        };
        let sql = UpdateQuery::entity(compiler(), &customer, None)
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(
            sql.sql(),
            "UPDATE Customer SET Name='Bob''s', Email=NULL WHERE (Customer.Id = 7)"
        );
    }

    #[test]
    fn test_update_assignments_with_filter() {
        let sql = UpdateQuery::<Customer>::new(compiler())
            .set("Email", "bob@example.com")
            .filter(col("Name").eq("Bob"))
            .compile()
            .unwrap();
        assert_eq!(
            sql.sql(),
            "UPDATE Customer SET Email='bob@example.com' WHERE (Customer.Name = 'Bob')"
        );
    }

    #[test]
    fn test_update_without_assignments_fails() {
        let err = UpdateQuery::<Customer>::new(compiler()).compile().unwrap_err();
        assert!(matches!(err, PartsError::MissingArgument { argument: "set", .. }));
    }

    #[test]
    fn test_update_from_example_not_implemented() {
        let example = serde_json::json!({ "Name": "Bob" });
        let err = UpdateQuery::<Customer>::from_example(compiler(), &example, col("Id").eq(1))
            .err()
            .unwrap();
        assert!(matches!(err, PartsError::NotImplemented(_)));
    }
}
