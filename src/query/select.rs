//! SELECT statements.

use std::marker::PhantomData;

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::{PartsError, PartsResult};
use crate::expr::{Expr, ExpressionTranslator};
use crate::parts::{FieldRef, OperationType, PartKey, PartsBuilder, QueryPart, QueryPartsMap};
use crate::schema::{Entity, SchemaCache, TableSchema};
use crate::value::Converter;

/// Fluent SELECT builder.
///
/// `T` is the entity that unqualified members (`col("Name")`) refer to. It
/// starts as the FROM entity and moves to each newly joined entity, together
/// with the alias that entity was given.
///
/// Clauses land in SQL order whatever the call order: joins stay with the
/// sources, WHERE ahead of GROUP BY and ORDER BY. A repeated `filter` is
/// ANDed onto the first and a repeated `order_by` becomes a THEN BY.
pub struct SelectQuery<T: Entity> {
    map: QueryPartsMap,
    builder: PartsBuilder,
    compiler: QueryCompiler,
    alias: Option<String>,
    /// WHERE or JOIN clause that `and_filter`/`or_filter` extend
    predicate_clause: Option<PartKey>,
    sources: Vec<Source>,
    ignored: Vec<String>,
    _entity: PhantomData<fn() -> T>,
}

/// A FROM or JOIN table and the alias it was bound to.
struct Source {
    schema: TableSchema,
    alias: Option<String>,
}

/// Clauses written after WHERE.
fn follows_where(part: &QueryPart) -> bool {
    matches!(part.op(), OperationType::GroupBy | OperationType::Having) || part.op().is_order()
}

/// Clauses written after the FROM and JOIN sources.
fn follows_sources(part: &QueryPart) -> bool {
    part.op() == OperationType::Where || follows_where(part)
}

impl<T: Entity> SelectQuery<T> {
    /// `select ... FROM T`
    pub fn from(compiler: QueryCompiler) -> Self {
        Self::start(compiler, None)
    }

    /// `select ... FROM T alias`
    pub fn from_as(compiler: QueryCompiler, alias: &str) -> PartsResult<Self> {
        if alias.is_empty() {
            return Err(PartsError::missing("alias", "an entity alias cannot be empty"));
        }
        Ok(Self::start(compiler, Some(alias)))
    }

    fn start(compiler: QueryCompiler, alias: Option<&str>) -> Self {
        let builder = PartsBuilder::new();
        let mut map = QueryPartsMap::new();
        builder.append_simple_part(&mut map, OperationType::Select);
        builder.append_entity_part(&mut map, OperationType::From, T::entity_name(), alias);

        let alias = alias.map(str::to_string);
        Self {
            map,
            builder,
            compiler,
            sources: vec![Source {
                schema: TableSchema::of::<T>(),
                alias: alias.clone(),
            }],
            alias,
            predicate_clause: None,
            ignored: Vec::new(),
            _entity: PhantomData,
        }
    }

    fn translator(&self) -> ExpressionTranslator {
        ExpressionTranslator::new(Some(T::entity_name().to_string()))
            .with_alias(self.alias.clone())
    }

    fn retype<U: Entity>(self, alias: Option<String>) -> SelectQuery<U> {
        SelectQuery {
            map: self.map,
            builder: self.builder,
            compiler: self.compiler,
            alias,
            predicate_clause: self.predicate_clause,
            sources: self.sources,
            ignored: self.ignored,
            _entity: PhantomData,
        }
    }

    /// The parts built so far.
    pub fn parts(&self) -> &QueryPartsMap {
        &self.map
    }

    pub fn join<J: Entity>(self, on: Expr) -> SelectQuery<J> {
        self.join_with(OperationType::Join, None, on)
    }

    pub fn join_as<J: Entity>(self, alias: &str, on: Expr) -> PartsResult<SelectQuery<J>> {
        if alias.is_empty() {
            return Err(PartsError::missing("alias", "an entity alias cannot be empty"));
        }
        Ok(self.join_with(OperationType::Join, Some(alias), on))
    }

    pub fn left_join<J: Entity>(self, on: Expr) -> SelectQuery<J> {
        self.join_with(OperationType::LeftJoin, None, on)
    }

    pub fn right_join<J: Entity>(self, on: Expr) -> SelectQuery<J> {
        self.join_with(OperationType::RightJoin, None, on)
    }

    pub fn full_join<J: Entity>(self, on: Expr) -> SelectQuery<J> {
        self.join_with(OperationType::FullJoin, None, on)
    }

    fn join_with<J: Entity>(
        mut self,
        op: OperationType,
        alias: Option<&str>,
        on: Expr,
    ) -> SelectQuery<J> {
        let key = self.builder.insert_entity_part(
            &mut self.map,
            op,
            J::entity_name(),
            alias,
            follows_sources,
        );
        let alias = alias.map(str::to_string);
        let translator =
            ExpressionTranslator::new(Some(J::entity_name().to_string())).with_alias(alias.clone());
        self.builder
            .append_to_clause(&mut self.map, key, &translator, &on);
        self.predicate_clause = Some(key);
        self.sources.push(Source {
            schema: TableSchema::of::<J>(),
            alias: alias.clone(),
        });
        self.retype(alias)
    }

    /// Start the WHERE clause, or AND onto it when there already is one.
    pub fn filter(mut self, predicate: Expr) -> Self {
        let translator = self.translator();
        self.builder
            .append_where_part(&mut self.map, &translator, &predicate, follows_where);
        self.predicate_clause = self.map.parts_of(OperationType::Where).next().map(QueryPart::key);
        self
    }

    /// `AND` onto the WHERE or JOIN clause started last.
    pub fn and_filter(self, predicate: Expr) -> Self {
        self.chain_filter(OperationType::And, predicate)
    }

    /// `OR` onto the WHERE or JOIN clause started last.
    pub fn or_filter(self, predicate: Expr) -> Self {
        self.chain_filter(OperationType::Or, predicate)
    }

    fn chain_filter(mut self, op: OperationType, predicate: Expr) -> Self {
        let translator = self.translator();
        let target = self.predicate_clause;
        self.builder.append_expression_to_last(
            &mut self.map,
            &translator,
            &predicate,
            op,
            |p| Some(p.key()) == target,
        );
        self
    }

    pub fn order_by(self, field: Expr) -> Self {
        self.order(OperationType::OrderBy, field)
    }

    pub fn order_by_desc(self, field: Expr) -> Self {
        self.order(OperationType::OrderByDesc, field)
    }

    fn order(mut self, op: OperationType, field: Expr) -> Self {
        if self.map.contains(OperationType::OrderBy)
            || self.map.contains(OperationType::OrderByDesc)
        {
            let then = match op {
                OperationType::OrderByDesc => OperationType::ThenByDesc,
                _ => OperationType::ThenBy,
            };
            return self.then(then, field);
        }
        let translator = self.translator();
        self.builder
            .append_expression_part(&mut self.map, &translator, &field, op);
        self
    }

    /// Secondary ordering after the last `order_by`.
    pub fn then_by(self, field: Expr) -> Self {
        self.then(OperationType::ThenBy, field)
    }

    pub fn then_by_desc(self, field: Expr) -> Self {
        self.then(OperationType::ThenByDesc, field)
    }

    fn then(mut self, op: OperationType, field: Expr) -> Self {
        let translator = self.translator();
        self.builder.append_expression_to_last(
            &mut self.map,
            &translator,
            &field,
            op,
            |p| matches!(p.op(), OperationType::OrderBy | OperationType::OrderByDesc),
        );
        self
    }

    /// Add a grouping column. GROUP BY is kept ahead of any ORDER BY.
    pub fn group_by(mut self, field: Expr) -> PartsResult<Self> {
        let field = self.member(&field)?;

        if !self.map.contains(OperationType::GroupBy) {
            self.map
                .add_ahead_of(QueryPart::list(OperationType::GroupBy), |p| p.op().is_order());
        }
        self.map
            .add_to_last(QueryPart::field(field), OperationType::GroupBy);
        Ok(self)
    }

    /// Select a member under its own name.
    pub fn map(mut self, source: Expr) -> PartsResult<Self> {
        let field = self.member(&source)?;
        self.builder.add_field_part(&mut self.map, field);
        Ok(self)
    }

    /// Select a member under a result alias (`source AS alias`).
    pub fn map_as(mut self, source: Expr, alias: &str) -> PartsResult<Self> {
        if alias.is_empty() {
            return Err(PartsError::missing("alias", "a field alias cannot be empty"));
        }
        let field = self.member(&source)?.alias(alias);
        self.builder.add_field_part(&mut self.map, field);
        Ok(self)
    }

    /// Select a member and convert its value when rows are read.
    pub fn map_with(
        mut self,
        source: Expr,
        alias: Option<&str>,
        converter: Converter,
    ) -> PartsResult<Self> {
        let mut field = self.member(&source)?.converter(converter);
        if let Some(alias) = alias.filter(|a| !a.is_empty()) {
            field = field.alias(alias);
        }
        self.builder.add_field_part(&mut self.map, field);
        Ok(self)
    }

    /// Leave a result member out of the select list.
    pub fn ignore(mut self, member: &str) -> Self {
        self.ignored.push(member.to_string());
        self
    }

    /// Lock the select list to the members of `P`.
    pub fn for_type<P: Entity>(mut self) -> SelectQuery<P> {
        let fields = self.projection_fields::<P>();
        self.builder.add_field_parts(&mut self.map, &fields);
        self.builder.seal_select(&mut self.map);
        self.retype(None)
    }

    pub fn compile(self) -> PartsResult<CompiledQuery> {
        self.compile_as::<T>()
    }

    /// Compile with the members of `P` as the result shape.
    pub fn compile_as<P: Entity>(mut self) -> PartsResult<CompiledQuery> {
        let fields = self.projection_fields::<P>();
        self.builder.add_field_parts(&mut self.map, &fields);
        self.compiler.compile(self.map)
    }

    fn member(&self, expr: &Expr) -> PartsResult<FieldRef> {
        self.translator()
            .field(expr)
            .ok_or_else(|| PartsError::missing("field", format!("'{}' is not a member", expr)))
    }

    /// Result fields of `P`, each owned by the first source table that has it.
    fn projection_fields<P: Entity>(&self) -> Vec<FieldRef> {
        SchemaCache::global()
            .fields::<P>()
            .iter()
            .filter(|f| !self.ignored.contains(&f.member_name))
            .map(|f| {
                match self
                    .sources
                    .iter()
                    .find(|s| s.schema.field(&f.member_name).is_some())
                {
                    Some(source) => {
                        let field = FieldRef::of(source.schema.name(), &f.member_name);
                        match &source.alias {
                            Some(alias) => field.entity_alias(alias),
                            None => field,
                        }
                    }
                    None => FieldRef::new(&f.member_name),
                }
            })
            .collect()
    }
}
