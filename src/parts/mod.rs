//! Query parts intermediate representation.
//!
//! A statement is built as a [`QueryPartsMap`]: an ordered tree of
//! [`QueryPart`]s, each tagged with an [`OperationType`]. Groups own ordered
//! children. Nothing is rendered until the compiler walks the map.

pub mod builder;
pub mod map;
pub mod operation;
pub mod part;

pub use builder::PartsBuilder;
pub use map::{Flatten, QueryPartsMap, StatementShape};
pub use operation::{FieldOperation, OperationType};
pub use part::{
    ColumnDef, FieldRef, Group, GroupShape, KeyValuePart, KeyValues, ParamSource, ParameterPart,
    PartKey, PartKind, QueryPart, RenderFn,
};

pub(crate) use part::remove_line_breaks;
