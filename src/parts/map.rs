//! The ordered parts tree of one statement.

use std::collections::HashMap;

use crate::parts::{OperationType, PartKey, QueryPart};

/// Statement shape, deciding which compile pass runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatementShape {
    #[default]
    Statement,
    Procedure(String),
}

/// Ordered intermediate representation of one SQL statement under construction.
///
/// Order is never re-sorted after insertion. Anchored insertions that name
/// an operation with no match degrade to the start (`add_before`) or the end
/// (`add_after`, `add_to_last`) instead of failing.
#[derive(Debug, Default)]
pub struct QueryPartsMap {
    parts: Vec<QueryPart>,
    aliases: HashMap<String, String>,
    shape: StatementShape,
}

impl QueryPartsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            shape: StatementShape::Procedure(name.into()),
            ..Default::default()
        }
    }

    pub fn shape(&self) -> &StatementShape {
        &self.shape
    }

    /// Append at the end.
    pub fn add(&mut self, part: QueryPart) -> PartKey {
        let key = part.key();
        self.parts.push(part);
        key
    }

    /// Insert before the first part tagged `op`, or at the start.
    pub fn add_before(&mut self, part: QueryPart, op: OperationType) -> PartKey {
        let key = part.key();
        let pos = self.parts.iter().position(|p| p.op() == op).unwrap_or(0);
        self.parts.insert(pos, part);
        key
    }

    /// Insert before the first top-level part matching `predicate`, or at
    /// the end.
    pub fn add_ahead_of<F>(&mut self, part: QueryPart, predicate: F) -> PartKey
    where
        F: Fn(&QueryPart) -> bool,
    {
        let key = part.key();
        match self.parts.iter().position(predicate) {
            Some(pos) => self.parts.insert(pos, part),
            None => self.parts.push(part),
        }
        key
    }

    /// Insert after the last part tagged `op`, or at the end.
    pub fn add_after(&mut self, part: QueryPart, op: OperationType) -> PartKey {
        let key = part.key();
        match self.parts.iter().rposition(|p| p.op() == op) {
            Some(pos) => self.parts.insert(pos + 1, part),
            None => self.parts.push(part),
        }
        key
    }

    /// Add as a child of the most recent group tagged `op`.
    pub fn add_to_last(&mut self, part: QueryPart, op: OperationType) -> PartKey {
        self.add_to_last_where(part, |p| p.op() == op)
    }

    /// Add as a child of the most recent group matching `predicate`.
    ///
    /// Nested groups count: the last match in depth-first order wins. With no
    /// match, or when that group is sealed, the part is appended at top level
    /// or dropped respectively.
    pub fn add_to_last_where<F>(&mut self, part: QueryPart, predicate: F) -> PartKey
    where
        F: Fn(&QueryPart) -> bool,
    {
        let key = part.key();
        let target = self
            .flatten()
            .filter(|p| p.as_group().is_some() && predicate(p))
            .last()
            .map(|p| p.key());

        match target.and_then(|k| self.find_mut(k)) {
            Some(group_part) => {
                if let Some(group) = group_part.as_group_mut() {
                    group.push(part);
                }
            }
            None => self.parts.push(part),
        }
        key
    }

    /// Remove a part by identity, wherever it lives in the tree.
    pub fn remove(&mut self, key: PartKey) -> Option<QueryPart> {
        if let Some(pos) = self.parts.iter().position(|p| p.key() == key) {
            return Some(self.parts.remove(pos));
        }
        self.parts
            .iter_mut()
            .filter_map(|p| p.as_group_mut())
            .find_map(|g| g.remove(key))
    }

    /// Top-level parts in statement order.
    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    /// Every part, depth-first, in statement order.
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            stack: vec![self.parts.iter()],
        }
    }

    pub fn find(&self, key: PartKey) -> Option<&QueryPart> {
        self.flatten().find(|p| p.key() == key)
    }

    pub fn find_mut(&mut self, key: PartKey) -> Option<&mut QueryPart> {
        fn walk(parts: &mut [QueryPart], key: PartKey) -> Option<&mut QueryPart> {
            for part in parts.iter_mut() {
                if part.key() == key {
                    return Some(part);
                }
                if let Some(group) = part.as_group_mut() {
                    if let Some(found) = walk(group.parts_mut(), key) {
                        return Some(found);
                    }
                }
            }
            None
        }
        walk(&mut self.parts, key)
    }

    /// Mutable access to top-level parts tagged `op`.
    pub fn parts_mut(&mut self, op: OperationType) -> impl Iterator<Item = &mut QueryPart> {
        self.parts.iter_mut().filter(move |p| p.op() == op)
    }

    /// Top-level parts tagged `op`, in order.
    pub fn parts_of(&self, op: OperationType) -> impl Iterator<Item = &QueryPart> {
        self.parts.iter().filter(move |p| p.op() == op)
    }

    pub fn contains(&self, op: OperationType) -> bool {
        self.parts.iter().any(|p| p.op() == op)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Register the SQL alias of an entity for this statement.
    ///
    /// Fields qualified only by entity name resolve to the first alias the
    /// entity was given. Later aliases of the same entity (self-joins) are
    /// reached through `FieldRef::entity_alias`.
    pub fn set_alias(&mut self, entity: impl Into<String>, alias: impl Into<String>) {
        self.aliases.entry(entity.into()).or_insert_with(|| alias.into());
    }

    pub fn alias_for(&self, entity: &str) -> Option<&str> {
        self.aliases.get(entity).map(String::as_str)
    }
}

/// Depth-first iterator over a parts tree.
pub struct Flatten<'a> {
    stack: Vec<std::slice::Iter<'a, QueryPart>>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a QueryPart;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let iter = self.stack.last_mut()?;
            match iter.next() {
                Some(part) => {
                    if let Some(group) = part.as_group() {
                        self.stack.push(group.parts().iter());
                    }
                    return Some(part);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(map: &QueryPartsMap) -> Vec<OperationType> {
        map.parts().iter().map(|p| p.op()).collect()
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(OperationType::Select, "a"));
        map.add(QueryPart::text(OperationType::From, "b"));
        assert_eq!(ops(&map), vec![OperationType::Select, OperationType::From]);
    }

    #[test]
    fn test_add_before_first_match() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(OperationType::Column, "a"));
        map.add(QueryPart::text(OperationType::Column, "b"));
        let key = map.add_before(QueryPart::text(OperationType::CreateTable, "c"), OperationType::Column);
        assert_eq!(map.parts()[0].key(), key);
    }

    #[test]
    fn test_add_before_missing_anchor_goes_to_start() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(OperationType::Where, "a"));
        let key = map.add_before(QueryPart::text(OperationType::Select, "s"), OperationType::GroupBy);
        assert_eq!(map.parts()[0].key(), key);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_add_ahead_of_first_match_or_end() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(OperationType::From, "f"));
        map.add(QueryPart::text(OperationType::GroupBy, "g"));
        map.add(QueryPart::text(OperationType::OrderBy, "o"));
        map.add_ahead_of(QueryPart::text(OperationType::Where, "w"), |p| {
            p.op() == OperationType::GroupBy || p.op().is_order()
        });
        assert_eq!(
            ops(&map),
            vec![
                OperationType::From,
                OperationType::Where,
                OperationType::GroupBy,
                OperationType::OrderBy
            ]
        );

        let key = map.add_ahead_of(QueryPart::text(OperationType::Having, "h"), |p| {
            p.op() == OperationType::Values
        });
        assert_eq!(map.parts()[4].key(), key);
    }

    #[test]
    fn test_first_alias_of_entity_is_kept() {
        let mut map = QueryPartsMap::new();
        map.set_alias("Employee", "e");
        map.set_alias("Employee", "m");
        assert_eq!(map.alias_for("Employee"), Some("e"));
        assert_eq!(map.alias_for("Territory"), None);
    }

    #[test]
    fn test_add_after_last_match() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(OperationType::Column, "a"));
        map.add(QueryPart::text(OperationType::Column, "b"));
        map.add(QueryPart::text(OperationType::None, ")"));
        let key = map.add_after(QueryPart::text(OperationType::Column, "c"), OperationType::Column);
        assert_eq!(map.parts()[2].key(), key);
    }

    #[test]
    fn test_add_after_missing_anchor_goes_to_end() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::text(OperationType::Where, "a"));
        let key = map.add_after(QueryPart::text(OperationType::None, "x"), OperationType::OrderBy);
        assert_eq!(map.parts()[1].key(), key);
    }

    #[test]
    fn test_add_to_last_nests_into_latest_group() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::clause(OperationType::Where, None, None));
        let second = map.add(QueryPart::clause(OperationType::Where, None, None));
        let child = map.add_to_last(QueryPart::text(OperationType::And, "x"), OperationType::Where);

        assert_eq!(map.len(), 2);
        let group = map.find(second).and_then(|p| p.as_group()).unwrap();
        assert_eq!(group.parts()[0].key(), child);
    }

    #[test]
    fn test_add_to_last_reaches_nested_groups() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::clause(OperationType::Where, None, None));
        let and = map.add_to_last(QueryPart::clause(OperationType::And, None, None), OperationType::Where);
        map.add_to_last(QueryPart::text(OperationType::None, "x"), OperationType::And);

        let group = map.find(and).and_then(|p| p.as_group()).unwrap();
        assert_eq!(group.parts().len(), 1);
    }

    #[test]
    fn test_add_to_last_without_group_appends() {
        let mut map = QueryPartsMap::new();
        map.add_to_last(QueryPart::text(OperationType::And, "x"), OperationType::Where);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_nested_by_identity() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::list(OperationType::Select));
        let field = map.add_to_last(
            QueryPart::field(crate::parts::FieldRef::new("Name")),
            OperationType::Select,
        );
        assert!(map.remove(field).is_some());
        assert!(map.find(field).is_none());
        assert_eq!(map.flatten().count(), 1);
    }

    #[test]
    fn test_flatten_is_depth_first() {
        let mut map = QueryPartsMap::new();
        map.add(QueryPart::list(OperationType::Select));
        map.add_to_last(QueryPart::text(OperationType::Include, "a"), OperationType::Select);
        map.add(QueryPart::text(OperationType::From, "b"));

        let flat: Vec<_> = map.flatten().map(|p| p.op()).collect();
        assert_eq!(
            flat,
            vec![OperationType::Select, OperationType::Include, OperationType::From]
        );
    }
}
