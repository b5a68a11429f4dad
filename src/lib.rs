//! # partsmap
//!
//! Build SQL statements as an ordered tree of query parts, then compile the
//! tree once into dialect-specific SQL text.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use partsmap::prelude::*;
//!
//! let compiler = QueryCompiler::new(Dialect::Sqlite);
//! let sql = SelectQuery::<Customer>::from(compiler)
//!     .filter(col("Name").eq("Bob"))
//!     .order_by(col("Id"))
//!     .compile()?;
//! // => "select Customer.Id, Customer.Name FROM Customer WHERE (Customer.Name = 'Bob') ORDER BY Customer.Id ASC"
//! ```
//!
//! ## Layers
//!
//! | Module     | Role                                             |
//! |------------|--------------------------------------------------|
//! | `parts`    | Query parts, decorators and the parts map        |
//! | `expr`     | Predicate AST and its translation into parts     |
//! | `dialect`  | Literal formatting and type mapping per RDBMS    |
//! | `compiler` | Single pass from parts map to SQL text           |
//! | `schema`   | Entity metadata and the process-wide cache       |
//! | `query`    | Fluent statement builders                        |
//! | `engine`   | Execution over sqlx and the unit of work         |

pub mod compiler;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod expr;
pub mod parts;
pub mod query;
pub mod schema;
pub mod value;

#[cfg(test)]
mod tests_cfg;

pub mod prelude {
    pub use crate::compiler::{CompiledQuery, QueryCompiler};
    pub use crate::config::Settings;
    pub use crate::dialect::{Dialect, DialectFormatter};
    pub use crate::engine::{
        ConnectionProvider, DatabaseContext, Row, RowReader, SqlxConnectionProvider,
    };
    pub use crate::error::*;
    pub use crate::expr::{Expr, col, deferred, lit, qualified, qualified_as};
    pub use crate::parts::{FieldOperation, OperationType, QueryPartsMap};
    pub use crate::query::{
        DeleteQuery, InsertQuery, ProcedureQuery, SelectQuery, TableQuery, UpdateQuery,
    };
    pub use crate::schema::{Entity, Member, SchemaCache, TableSchema};
    pub use crate::value::{Converter, SqlType, Value};
}

pub use compiler::{CompiledQuery, QueryCompiler};
pub use dialect::Dialect;
pub use error::{PartsError, PartsResult};
