//! Stateless service that adds parts to a map.
//!
//! Statement builders own a `PartsBuilder` value and route every mutation
//! through it, so the insertion rules live in one place.

use crate::expr::{Expr, ExpressionTranslator};
use crate::parts::{FieldRef, OperationType, PartKey, QueryPart, QueryPartsMap};

#[derive(Debug, Clone, Copy, Default)]
pub struct PartsBuilder;

impl PartsBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Add a list group (`select`, `DELETE`, `SET`, ...).
    pub fn append_simple_part(&self, map: &mut QueryPartsMap, op: OperationType) -> PartKey {
        map.add(QueryPart::list(op))
    }

    /// Add a FROM/JOIN clause for an entity and register its alias.
    pub fn append_entity_part(
        &self,
        map: &mut QueryPartsMap,
        op: OperationType,
        entity: &str,
        alias: Option<&str>,
    ) -> PartKey {
        self.insert_entity_part(map, op, entity, alias, |_| false)
    }

    /// Like [`append_entity_part`](Self::append_entity_part), placed ahead of
    /// the first top-level part matching `before`.
    pub fn insert_entity_part<F>(
        &self,
        map: &mut QueryPartsMap,
        op: OperationType,
        entity: &str,
        alias: Option<&str>,
        before: F,
    ) -> PartKey
    where
        F: Fn(&QueryPart) -> bool,
    {
        if let Some(alias) = alias {
            map.set_alias(entity, alias);
        }
        map.add_ahead_of(
            QueryPart::clause(op, Some(entity.to_string()), alias.map(str::to_string)),
            before,
        )
    }

    /// Start the WHERE clause ahead of the first part matching `before`.
    /// When the statement already has one, `expr` is ANDed onto it instead.
    pub fn append_where_part<F>(
        &self,
        map: &mut QueryPartsMap,
        translator: &ExpressionTranslator,
        expr: &Expr,
        before: F,
    ) -> PartKey
    where
        F: Fn(&QueryPart) -> bool,
    {
        if map.contains(OperationType::Where) {
            return self.append_expression_to_last(
                map,
                translator,
                expr,
                OperationType::And,
                |p| p.op() == OperationType::Where,
            );
        }
        let clause = self.expression_clause(translator, expr, OperationType::Where);
        map.add_ahead_of(clause, before)
    }

    /// Translate `expr` into a new top-level clause tagged `op`.
    pub fn append_expression_part(
        &self,
        map: &mut QueryPartsMap,
        translator: &ExpressionTranslator,
        expr: &Expr,
        op: OperationType,
    ) -> PartKey {
        let clause = self.expression_clause(translator, expr, op);
        map.add(clause)
    }

    /// Translate `expr` into a clause nested in the last group matching `anchor`.
    pub fn append_expression_to_last<F>(
        &self,
        map: &mut QueryPartsMap,
        translator: &ExpressionTranslator,
        expr: &Expr,
        op: OperationType,
        anchor: F,
    ) -> PartKey
    where
        F: Fn(&QueryPart) -> bool,
    {
        let clause = self.expression_clause(translator, expr, op);
        map.add_to_last_where(clause, anchor)
    }

    /// Add translated predicate parts directly into an existing clause (JOIN ... ON).
    pub fn append_to_clause(
        &self,
        map: &mut QueryPartsMap,
        clause: PartKey,
        translator: &ExpressionTranslator,
        expr: &Expr,
    ) {
        if let Some(group) = map.find_mut(clause).and_then(|p| p.as_group_mut()) {
            for part in translator.translate(expr) {
                group.push(part);
            }
        }
    }

    /// Add one field to the last select list. Dropped when that list is sealed.
    pub fn add_field_part(&self, map: &mut QueryPartsMap, field: FieldRef) -> PartKey {
        map.add_to_last(QueryPart::field(field), OperationType::Select)
    }

    /// Re-supply the full field set of every select list.
    ///
    /// A field already present by name or alias is kept as-is, new fields are
    /// appended, and previously mapped fields that are not part of `fields`
    /// are removed. Sealed lists are left untouched.
    pub fn add_field_parts(&self, map: &mut QueryPartsMap, fields: &[FieldRef]) {
        for select in map.parts_mut(OperationType::Select) {
            let Some(group) = select.as_group_mut() else {
                continue;
            };
            if group.is_sealed() {
                continue;
            }

            let mut unused: Vec<PartKey> = group
                .parts()
                .iter()
                .filter(|p| p.as_field().is_some())
                .map(|p| p.key())
                .collect();

            for field in fields {
                let mapped: Vec<PartKey> = group
                    .parts()
                    .iter()
                    .filter(|p| {
                        p.as_field().is_some_and(|f| {
                            f.field == field.field || f.alias.as_deref() == Some(&field.field)
                        })
                    })
                    .map(|p| p.key())
                    .collect();

                if !mapped.is_empty() {
                    unused.retain(|k| !mapped.contains(k));
                    continue;
                }

                group.push(QueryPart::field(field.clone()));
            }

            for key in unused {
                group.remove(key);
            }
        }
    }

    /// Lock the shape of every select list.
    pub fn seal_select(&self, map: &mut QueryPartsMap) {
        for select in map.parts_mut(OperationType::Select) {
            if let Some(group) = select.as_group_mut() {
                group.seal();
            }
        }
    }

    fn expression_clause(
        &self,
        translator: &ExpressionTranslator,
        expr: &Expr,
        op: OperationType,
    ) -> QueryPart {
        let mut clause = QueryPart::clause(op, None, None);
        if let Some(group) = clause.as_group_mut() {
            for part in translator.translate(expr) {
                group.push(part);
            }
        }
        clause
    }
}
