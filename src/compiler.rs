//! Single-pass compilation of a parts map into SQL text.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dialect::{Dialect, DialectFormatter};
use crate::error::{PartsError, PartsResult};
use crate::parts::{OperationType, QueryPartsMap, StatementShape, remove_line_breaks};

/// Everything a part may look at while rendering.
pub struct CompileContext<'a> {
    map: &'a QueryPartsMap,
    dialect: Dialect,
    formatter: Box<dyn DialectFormatter>,
    qualify_fields: bool,
}

impl<'a> CompileContext<'a> {
    pub fn new(map: &'a QueryPartsMap, dialect: Dialect, qualify_fields: bool) -> Self {
        Self {
            map,
            dialect,
            formatter: dialect.formatter(),
            qualify_fields,
        }
    }

    /// The whole map being compiled, for separator and alias lookups.
    pub fn map(&self) -> &QueryPartsMap {
        self.map
    }

    pub fn dialect(&self) -> &dyn DialectFormatter {
        self.formatter.as_ref()
    }

    pub fn dialect_kind(&self) -> Dialect {
        self.dialect
    }

    /// Prefix fields with their table name or alias.
    pub fn qualify_fields(&self) -> bool {
        self.qualify_fields
    }
}

/// Final SQL text plus the map it was compiled from.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    sql: String,
    parts: Arc<QueryPartsMap>,
}

impl CompiledQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parts(&self) -> &QueryPartsMap {
        &self.parts
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Turns a finished [`QueryPartsMap`] into a [`CompiledQuery`].
///
/// Compilation consumes the map; a compiled statement cannot be mutated
/// again. It performs no I/O.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler {
    dialect: Dialect,
    qualify_fields: bool,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

impl QueryCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            qualify_fields: true,
        }
    }

    pub fn qualify_fields(mut self, qualify: bool) -> Self {
        self.qualify_fields = qualify;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn compile(&self, map: QueryPartsMap) -> PartsResult<CompiledQuery> {
        let sql = match map.shape() {
            StatementShape::Statement => self.compile_statement(&map)?,
            StatementShape::Procedure(name) => self.compile_procedure(&map, name)?,
        };
        debug!(dialect = ?self.dialect, sql = %sql, "Compiled query");
        Ok(CompiledQuery {
            sql,
            parts: Arc::new(map),
        })
    }

    fn compile_statement(&self, map: &QueryPartsMap) -> PartsResult<String> {
        let ctx = CompileContext::new(map, self.dialect, self.qualify_fields);
        let mut sql = String::new();
        for part in map.parts() {
            let fragment = part.compile(&ctx)?;
            join_fragment(&mut sql, &remove_line_breaks(&fragment));
        }
        Ok(sql)
    }

    fn compile_procedure(&self, map: &QueryPartsMap, name: &str) -> PartsResult<String> {
        let ctx = CompileContext::new(map, self.dialect, false);
        if !ctx.dialect().supports_procedures() {
            return Err(PartsError::unsupported(
                ctx.dialect().name(),
                "stored procedures",
            ));
        }

        let mut sql = String::new();
        for part in map.parts_of(OperationType::OutParameterPrefix) {
            let line = part.compile(&ctx)?;
            if !line.is_empty() {
                sql.push_str(&line);
                sql.push('\n');
            }
        }

        let mut params = Vec::new();
        for part in map.parts_of(OperationType::Parameter) {
            params.push(part.compile(&ctx)?);
        }
        sql.push_str(&format!("EXEC {} {}", name, params.join(", ")));

        let mut outputs = Vec::new();
        for part in map.parts_of(OperationType::OutParameterSuffix) {
            let value = part.compile(&ctx)?;
            if !value.is_empty() {
                outputs.push(value);
            }
        }
        if !outputs.is_empty() {
            sql.push_str("\nSELECT ");
            sql.push_str(&outputs.join(", "));
        }
        Ok(sql)
    }
}

/// Append a top-level fragment, inserting one space where two words would touch.
fn join_fragment(sql: &mut String, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    let needs_space = match sql.chars().last() {
        None => false,
        Some(c) => !c.is_whitespace() && c != '(' && !fragment.starts_with(')'),
    };
    if needs_space {
        sql.push(' ');
    }
    sql.push_str(fragment);
}
