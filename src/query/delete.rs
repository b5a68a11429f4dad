//! DELETE statements.

use std::marker::PhantomData;

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::{PartsError, PartsResult};
use crate::expr::{Expr, ExpressionTranslator};
use crate::parts::{OperationType, PartsBuilder, QueryPartsMap};
use crate::query::key_predicate;
use crate::schema::Entity;

/// `DELETE FROM T [WHERE ...]`
pub struct DeleteQuery<T: Entity> {
    map: QueryPartsMap,
    builder: PartsBuilder,
    compiler: QueryCompiler,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DeleteQuery<T> {
    /// Delete every row of `T`.
    pub fn new(compiler: QueryCompiler) -> Self {
        let builder = PartsBuilder::new();
        let mut map = QueryPartsMap::new();
        builder.append_simple_part(&mut map, OperationType::Delete);
        builder.append_entity_part(&mut map, OperationType::From, T::entity_name(), None);
        Self {
            map,
            builder,
            compiler,
            _entity: PhantomData,
        }
    }

    /// Delete one entity, located by `key` or by the key convention.
    pub fn entity(compiler: QueryCompiler, entity: &T, key: Option<&str>) -> PartsResult<Self> {
        let predicate = key_predicate(entity, key)?;
        Ok(Self::new(compiler).filter(predicate))
    }

    /// Delete rows matching every member set on an example object.
    pub fn by_example(_compiler: QueryCompiler, _example: &serde_json::Value) -> PartsResult<Self> {
        Err(PartsError::NotImplemented("delete by example object"))
    }

    /// Restrict the affected rows. Repeated calls are ANDed together.
    pub fn filter(mut self, predicate: Expr) -> Self {
        let translator = ExpressionTranslator::new(Some(T::entity_name().to_string()));
        self.builder
            .append_where_part(&mut self.map, &translator, &predicate, |_| false);
        self
    }

    pub fn compile(self) -> PartsResult<CompiledQuery> {
        self.compiler.compile(self.map)
    }
}
