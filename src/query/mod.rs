//! Fluent statement builders.
//!
//! Each builder owns one [`QueryPartsMap`](crate::parts::QueryPartsMap) and
//! consumes itself on `compile`.

pub mod delete;
pub mod insert;
pub mod procedure;
pub mod select;
pub mod table;
pub mod update;

pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use procedure::ProcedureQuery;
pub use select::SelectQuery;
pub use table::TableQuery;
pub use update::UpdateQuery;

use crate::error::{PartsError, PartsResult};
use crate::expr::{Expr, col};
use crate::schema::{Entity, TableSchema};
use crate::value::Value;

/// Members identifying one row: `key` if given, else the conventional keys.
pub(crate) fn key_members<T: Entity>(key: Option<&str>) -> Vec<String> {
    match key {
        Some(key) => vec![key.to_string()],
        None => TableSchema::of::<T>()
            .primary_keys()
            .map(|f| f.member_name.clone())
            .collect(),
    }
}

/// `Key = value [AND ...]` for an entity instance.
pub(crate) fn key_predicate<T: Entity>(entity: &T, key: Option<&str>) -> PartsResult<Expr> {
    let schema = TableSchema::of::<T>();
    let mut predicate: Option<Expr> = None;

    for member in key_members::<T>(key) {
        let field = schema.field(&member).ok_or_else(|| {
            PartsError::missing(
                "key",
                format!("'{}' is not a member of {}", member, T::entity_name()),
            )
        })?;
        let value = field.value_of(entity).unwrap_or(Value::Null);
        let comparison = col(member).eq(value);
        predicate = Some(match predicate {
            Some(existing) => existing.and(comparison),
            None => comparison,
        });
    }

    predicate.ok_or_else(|| PartsError::NoPrimaryKey {
        entity: T::entity_name().to_string(),
    })
}
