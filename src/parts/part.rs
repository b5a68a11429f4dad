//! Query parts: the smallest units that compile to a SQL fragment.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compiler::CompileContext;
use crate::error::{PartsError, PartsResult};
use crate::expr::{Expr, ExpressionTranslator};
use crate::parts::OperationType;
use crate::value::{Converter, Deferred, SqlType, Value};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of a part. Immutable and unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartKey(u64);

impl PartKey {
    fn next() -> Self {
        PartKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Text produced at compile time, after all sibling insertions are done.
#[derive(Clone)]
pub struct RenderFn(Arc<dyn Fn(&CompileContext<'_>) -> String + Send + Sync>);

impl RenderFn {
    pub fn new(f: impl Fn(&CompileContext<'_>) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn render(&self, ctx: &CompileContext<'_>) -> String {
        (self.0)(ctx)
    }
}

impl fmt::Debug for RenderFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenderFn")
    }
}

/// A reference to a column of a mapped entity.
#[derive(Debug, Clone, Default)]
pub struct FieldRef {
    pub field: String,
    /// Result alias (`field AS alias`)
    pub alias: Option<String>,
    pub entity: Option<String>,
    /// Explicit table alias; wins over the statement alias map
    pub entity_alias: Option<String>,
    pub converter: Option<Converter>,
    pub field_type: Option<SqlType>,
}

impl FieldRef {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn of(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entity: Some(entity.into()),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn entity_alias(mut self, alias: impl Into<String>) -> Self {
        self.entity_alias = Some(alias.into());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// The name this field is known by in a result set.
    pub fn result_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }

    fn render(&self, ctx: &CompileContext<'_>) -> String {
        let qualifier = if ctx.qualify_fields() {
            self.entity_alias.as_deref().or_else(|| {
                self.entity
                    .as_deref()
                    .map(|e| ctx.map().alias_for(e).unwrap_or(e))
            })
        } else {
            None
        };

        let mut sql = match qualifier {
            Some(q) => format!("{}.{}", q, self.field),
            None => self.field.clone(),
        };
        if let Some(alias) = &self.alias {
            if alias != &self.field {
                sql.push_str(" AS ");
                sql.push_str(alias);
            }
        }
        sql
    }
}

/// Where a parameter's value comes from.
#[derive(Debug, Clone)]
pub enum ParamSource {
    Value(Value),
    Deferred(Deferred),
    Expr(Expr),
}

/// A bound value, optionally named (`name=value`).
#[derive(Debug, Clone)]
pub struct ParameterPart {
    pub name: Option<String>,
    pub source: ParamSource,
    pub declared: Option<SqlType>,
}

impl ParameterPart {
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            source: ParamSource::Value(value.into()),
            declared: None,
        }
    }

    pub fn deferred(deferred: Deferred) -> Self {
        Self {
            name: None,
            source: ParamSource::Deferred(deferred),
            declared: None,
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Self {
            name: None,
            source: ParamSource::Expr(expr),
            declared: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn declared(mut self, ty: SqlType) -> Self {
        self.declared = Some(ty);
        self
    }

    fn render(&self, ctx: &CompileContext<'_>) -> PartsResult<String> {
        let value = match &self.source {
            ParamSource::Value(v) => Some(v.clone()),
            ParamSource::Deferred(d) => Some(d.value().clone()),
            ParamSource::Expr(e) => e.evaluate(),
        };

        let text = match value {
            Some(v) => ctx
                .dialect()
                .format_literal(&v, self.declared)
                .unwrap_or_else(|| v.to_string()),
            None => match &self.source {
                ParamSource::Expr(e) => {
                    let translator = ExpressionTranslator::new(None);
                    let mut sql = String::new();
                    for part in translator.translate(e) {
                        sql.push_str(&part.compile(ctx)?);
                    }
                    sql
                }
                _ => String::new(),
            },
        };

        Ok(match &self.name {
            Some(name) if !name.is_empty() => format!("{}={}", name, text),
            _ => text,
        })
    }
}

/// Keys of a key/value collection part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyValuePart {
    MemberName,
    MemberType,
    Nullable,
    Key,
    Value,
}

/// An ordered key/value collection rendered as one clause.
#[derive(Debug, Clone, Default)]
pub struct KeyValues(Vec<(KeyValuePart, Option<String>)>);

impl KeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: KeyValuePart, value: Option<String>) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: KeyValuePart, value: impl Into<String>) -> Self {
        self.add(key, Some(value.into()));
        self
    }

    pub fn get(&self, key: KeyValuePart) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Unset and anything but "false" count as nullable.
    fn is_nullable(&self) -> bool {
        !self
            .get(KeyValuePart::Nullable)
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    }

    fn render(&self, op: OperationType, ctx: &CompileContext<'_>) -> String {
        let name = self.get(KeyValuePart::MemberName).unwrap_or_default();
        let ty = self.get(KeyValuePart::MemberType).unwrap_or_default();
        let not_null = if self.is_nullable() { "" } else { " NOT NULL" };

        match op {
            OperationType::AddColumn => format!(
                "{} {} {}{}",
                ctx.dialect().add_column_keyword(),
                name,
                ty,
                not_null
            ),
            OperationType::AlterField => format!("ALTER COLUMN {} {}{}", name, ty, not_null),
            OperationType::RenameTable => ctx.dialect().rename_table(
                self.get(KeyValuePart::Key).unwrap_or_default(),
                self.get(KeyValuePart::Value).unwrap_or_default(),
            ),
            _ => self
                .0
                .iter()
                .filter_map(|(_, v)| v.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One column of a CREATE TABLE.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub auto_increment: bool,
}

/// How a group renders its children.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupShape {
    /// Comma separated list with a prologue (`select a, b `)
    List,
    /// Keyword clause over an optional entity (`JOIN Orders o ON ...`)
    Clause {
        entity: Option<String>,
        alias: Option<String>,
    },
}

/// A composite part owning ordered children.
#[derive(Debug)]
pub struct Group {
    shape: GroupShape,
    parts: Vec<QueryPart>,
    sealed: bool,
}

impl Group {
    pub fn shape(&self) -> &GroupShape {
        &self.shape
    }

    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    pub(crate) fn parts_mut(&mut self) -> &mut [QueryPart] {
        &mut self.parts
    }

    pub fn entity(&self) -> Option<&str> {
        match &self.shape {
            GroupShape::Clause { entity, .. } => entity.as_deref(),
            GroupShape::List => None,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match &self.shape {
            GroupShape::Clause { alias, .. } => alias.as_deref(),
            GroupShape::List => None,
        }
    }

    /// Append a child. A sealed group drops the part and returns `false`.
    pub fn push(&mut self, part: QueryPart) -> bool {
        if self.sealed {
            return false;
        }
        self.parts.push(part);
        true
    }

    pub fn remove(&mut self, key: PartKey) -> Option<QueryPart> {
        if let Some(pos) = self.parts.iter().position(|p| p.key == key) {
            return Some(self.parts.remove(pos));
        }
        self.parts
            .iter_mut()
            .filter_map(|p| p.as_group_mut())
            .find_map(|g| g.remove(key))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldRef> {
        self.parts.iter().filter_map(|p| p.as_field())
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut FieldRef> {
        self.parts.iter_mut().filter_map(|p| match &mut p.kind {
            PartKind::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn compile(&self, op: OperationType, ctx: &CompileContext<'_>) -> PartsResult<String> {
        match &self.shape {
            GroupShape::List => self.compile_list(op, ctx),
            GroupShape::Clause { entity, alias } => {
                self.compile_clause(op, entity.as_deref(), alias.as_deref(), ctx)
            }
        }
    }

    fn compile_list(&self, op: OperationType, ctx: &CompileContext<'_>) -> PartsResult<String> {
        let (prologue, epilogue) = match op {
            OperationType::Select => ("select ", " "),
            OperationType::Delete => ("DELETE ", " "),
            OperationType::Set => ("SET ", " "),
            OperationType::GroupBy => ("GROUP BY ", " "),
            OperationType::InsertFields => ("(", ")"),
            OperationType::Values => ("VALUES (", ")"),
            other => return Err(PartsError::UnknownGroup(other)),
        };

        let mut values = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let value = part.compile(ctx)?;
            if !value.is_empty() {
                values.push(value);
            }
        }

        let mut sql = String::from(prologue);
        if !values.is_empty() {
            sql.push_str(&values.join(", "));
            sql.push_str(epilogue);
        } else if epilogue != " " {
            sql.push_str(epilogue);
        }
        Ok(remove_line_breaks(&sql))
    }

    fn compile_clause(
        &self,
        op: OperationType,
        entity: Option<&str>,
        alias: Option<&str>,
        ctx: &CompileContext<'_>,
    ) -> PartsResult<String> {
        let source = match (entity, alias) {
            (Some(e), Some(a)) => format!("{} {}", e, a),
            (Some(e), None) => e.to_string(),
            _ => String::new(),
        };

        // Atoms form this clause's own body; nested clauses (AND, THEN BY)
        // follow the keyword-formatted body.
        let mut body = String::new();
        let mut nested = String::new();
        for part in &self.parts {
            let value = part.compile(ctx)?;
            if value.is_empty() {
                continue;
            }
            if part.as_group().is_some() {
                if !value.starts_with(',') {
                    nested.push(' ');
                }
                nested.push_str(&value);
            } else {
                body.push_str(&value);
            }
        }

        let mut sql = match op {
            OperationType::From => format!("FROM {}", source),
            OperationType::Join => format!("JOIN {} ON {}", source, body),
            OperationType::LeftJoin => format!("LEFT JOIN {} ON {}", source, body),
            OperationType::RightJoin => format!("RIGHT JOIN {} ON {}", source, body),
            OperationType::FullJoin => format!("FULL JOIN {} ON {}", source, body),
            OperationType::Where => format!("WHERE {}", body),
            OperationType::And => format!("AND {}", body),
            OperationType::Or => format!("OR {}", body),
            OperationType::Having => format!("HAVING {}", body),
            OperationType::OrderBy => format!("ORDER BY {} ASC", body),
            OperationType::OrderByDesc => format!("ORDER BY {} DESC", body),
            OperationType::ThenBy => format!(", {} ASC", body),
            OperationType::ThenByDesc => format!(", {} DESC", body),
            _ => body,
        };
        sql.push_str(&nested);
        Ok(remove_line_breaks(&sql))
    }
}

/// Payload of a query part.
#[derive(Debug)]
pub enum PartKind {
    Text(String),
    Deferred(RenderFn),
    Field(FieldRef),
    Parameter(ParameterPart),
    Values(KeyValues),
    Column(ColumnDef),
    TableKey(String),
    Group(Group),
}

/// The smallest compilable unit of a statement.
#[derive(Debug)]
pub struct QueryPart {
    key: PartKey,
    op: OperationType,
    id: Option<String>,
    kind: PartKind,
}

impl QueryPart {
    pub fn new(op: OperationType, kind: PartKind) -> Self {
        Self {
            key: PartKey::next(),
            op,
            id: None,
            kind,
        }
    }

    pub fn text(op: OperationType, text: impl Into<String>) -> Self {
        Self::new(op, PartKind::Text(text.into()))
    }

    pub fn deferred(
        op: OperationType,
        f: impl Fn(&CompileContext<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::new(op, PartKind::Deferred(RenderFn::new(f)))
    }

    pub fn field(field: FieldRef) -> Self {
        let id = field.result_name().to_string();
        Self::new(OperationType::Include, PartKind::Field(field)).with_id(id)
    }

    pub fn parameter(op: OperationType, param: ParameterPart) -> Self {
        let id = param.name.clone();
        let mut part = Self::new(op, PartKind::Parameter(param));
        part.id = id;
        part
    }

    pub fn values(op: OperationType, values: KeyValues) -> Self {
        Self::new(op, PartKind::Values(values))
    }

    pub fn column(column: ColumnDef) -> Self {
        let id = column.name.clone();
        Self::new(OperationType::Column, PartKind::Column(column)).with_id(id)
    }

    pub fn table_key(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(OperationType::TableKeys, PartKind::TableKey(text.into())).with_id(id)
    }

    pub fn list(op: OperationType) -> Self {
        Self::new(
            op,
            PartKind::Group(Group {
                shape: GroupShape::List,
                parts: Vec::new(),
                sealed: false,
            }),
        )
    }

    pub fn clause(op: OperationType, entity: Option<String>, alias: Option<String>) -> Self {
        let id = entity.clone();
        let mut part = Self::new(
            op,
            PartKind::Group(Group {
                shape: GroupShape::Clause { entity, alias },
                parts: Vec::new(),
                sealed: false,
            }),
        );
        part.id = id;
        part
    }

    /// Set the identity name used for lookups (column name, field name).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn key(&self) -> PartKey {
        self.key
    }

    pub fn op(&self) -> OperationType {
        self.op
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> &PartKind {
        &self.kind
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            PartKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            PartKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldRef> {
        match &self.kind {
            PartKind::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, PartKind::Parameter(_))
    }

    /// Render this part to SQL text.
    pub fn compile(&self, ctx: &CompileContext<'_>) -> PartsResult<String> {
        match &self.kind {
            PartKind::Text(text) => Ok(render_single(self.op, text)),
            PartKind::Deferred(f) => Ok(render_single(self.op, &f.render(ctx))),
            PartKind::Field(f) => Ok(f.render(ctx)),
            PartKind::Parameter(p) => p.render(ctx),
            PartKind::Values(v) => Ok(v.render(self.op, ctx)),
            PartKind::Column(c) => {
                let dialect = ctx.dialect();
                let (ty, identity) = if c.auto_increment {
                    (
                        dialect.auto_increment_type(c.sql_type),
                        format!(" {}", dialect.auto_increment_keyword()),
                    )
                } else {
                    (dialect.map_type(c.sql_type), String::new())
                };
                Ok(format!(
                    "{} {}{}{}{}",
                    c.name,
                    ty,
                    if c.nullable { "" } else { " NOT NULL" },
                    identity,
                    self.table_member_separator(ctx)
                ))
            }
            PartKind::TableKey(text) => {
                Ok(format!("{}{}", text, self.table_member_separator(ctx)))
            }
            PartKind::Group(g) => g.compile(self.op, ctx),
        }
    }

    /// `", "` unless this is the last Column/TableKeys part of the whole map.
    fn table_member_separator(&self, ctx: &CompileContext<'_>) -> &'static str {
        let last = ctx.map().flatten().filter(|p| p.op.is_table_member()).last();
        match last {
            Some(last) if last.key == self.key => "",
            _ => ", ",
        }
    }
}

/// Single-fragment DDL parts carry only the object name.
fn render_single(op: OperationType, text: &str) -> String {
    match op {
        OperationType::AlterTable => format!("ALTER TABLE {} ", text),
        OperationType::DropTable => format!("DROP TABLE {}", text),
        OperationType::DropColumn => format!("DROP COLUMN {}", text),
        _ => text.to_string(),
    }
}

pub(crate) fn remove_line_breaks(text: &str) -> String {
    if !text.contains(['\r', '\n']) {
        return text.to_string();
    }
    text.replace(['\r', '\n'], "")
}
