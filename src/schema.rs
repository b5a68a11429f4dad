//! Schema metadata of mapped entity types.
//!
//! Field definitions are derived once per Rust type and shared for the rest
//! of the process. The cache never hands out a half-built entry: a definition
//! list is built completely and only then inserted if absent.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::parts::QueryPartsMap;
use crate::value::{Converter, SqlType, Value};

/// A type mapped onto a database table.
///
/// `values` must yield one value per entry of `members`, in the same order.
pub trait Entity: 'static {
    fn entity_name() -> &'static str;

    fn members() -> Vec<Member>;

    fn values(&self) -> Vec<Value>;
}

/// Declaration of one mapped member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: SqlType,
    pub nullable: bool,
}

impl Member {
    /// A required (NOT NULL) member.
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
        }
    }

    /// Optional values and text are nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Cached metadata for one column of a mapped type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Name of the member on the entity
    pub member_name: String,
    /// Name of the column in a result set (member name or alias)
    pub field_name: String,
    pub entity_name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub converter: Option<Converter>,
    ordinal: usize,
}

impl FieldDefinition {
    fn from_member(entity: &str, ordinal: usize, member: Member) -> Self {
        Self {
            is_primary_key: is_key_member(entity, &member.name),
            field_name: member.name.clone(),
            member_name: member.name,
            entity_name: entity.to_string(),
            sql_type: member.ty,
            nullable: member.nullable,
            converter: None,
            ordinal,
        }
    }

    /// Position of the member on its entity.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Read this member's value from an entity instance.
    pub fn value_of<E: Entity>(&self, entity: &E) -> Option<Value> {
        entity.values().into_iter().nth(self.ordinal)
    }
}

/// Primary key convention: `Id` or `{Entity}Id`, case-insensitive.
pub fn is_key_member(entity: &str, member: &str) -> bool {
    member.eq_ignore_ascii_case("id") || member.eq_ignore_ascii_case(&format!("{}id", entity))
}

/// A table described by name and field definitions.
///
/// Entities produce one through [`TableSchema::of`]. Tables known only at
/// runtime (e.g. read from a TOML file) use [`TableSchema::new`].
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    fields: Arc<[FieldDefinition]>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, members: Vec<Member>) -> Self {
        let name = name.into();
        let fields = build_fields(&name, members);
        Self { name, fields }
    }

    pub fn of<E: Entity>() -> Self {
        Self {
            name: E::entity_name().to_string(),
            fields: SchemaCache::global().fields::<E>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, member: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.member_name == member)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_primary_key)
    }
}

fn build_fields(entity: &str, members: Vec<Member>) -> Arc<[FieldDefinition]> {
    members
        .into_iter()
        .enumerate()
        .map(|(ordinal, member)| FieldDefinition::from_member(entity, ordinal, member))
        .collect()
}

static GLOBAL: Lazy<SchemaCache> = Lazy::new(SchemaCache::new);

/// Process-wide cache of field definitions keyed by Rust type.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<TypeId, Arc<[FieldDefinition]>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static SchemaCache {
        &GLOBAL
    }

    /// Field definitions of `E`, built on first access.
    ///
    /// Racing first accesses may each build a list; the first insert wins and
    /// every caller receives that same `Arc`.
    pub fn fields<E: Entity>(&self) -> Arc<[FieldDefinition]> {
        let key = TypeId::of::<E>();
        if let Some(fields) = self.entries.get(&key) {
            return fields.clone();
        }

        let built = build_fields(E::entity_name(), E::members());
        let entry = self.entries.entry(key).or_insert_with(|| {
            debug!(entity = E::entity_name(), fields = built.len(), "Cached schema metadata");
            built
        });
        entry.value().clone()
    }

    /// Fields of projection `P`, with key and nullability taken from entity `E`.
    pub fn projected<E: Entity, P: Entity>(&self) -> Vec<FieldDefinition> {
        let defined = self.fields::<E>();
        self.fields::<P>()
            .iter()
            .map(|field| {
                let mut field = field.clone();
                if let Some(source) = defined.iter().find(|d| d.member_name == field.member_name) {
                    field.nullable = source.nullable;
                    field.is_primary_key = source.is_primary_key;
                    field.entity_name = source.entity_name.clone();
                }
                field
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy converters and field-type overrides of a map's field parts onto
/// field definitions. The cached definitions are left untouched.
pub fn match_field_information(
    fields: &[FieldDefinition],
    map: &QueryPartsMap,
) -> Vec<FieldDefinition> {
    let mut fields = fields.to_vec();
    for part in map.flatten() {
        let Some(field_ref) = part.as_field() else {
            continue;
        };
        let Some(id) = part.id() else {
            continue;
        };

        let Some(field) = fields
            .iter_mut()
            .find(|f| f.field_name == id || f.member_name == field_ref.field)
        else {
            continue;
        };

        if let Some(ty) = field_ref.field_type {
            field.sql_type = ty;
        }
        if let Some(converter) = &field_ref.converter {
            field.converter = Some(converter.clone());
        }
        if field.field_name != id {
            field.field_name = id.to_string();
        }
    }
    fields
}
