mod common;

use std::sync::Arc;
use std::thread;

use common::{Employee, EmployeeTerritory, Territory};
use partsmap::prelude::*;
use partsmap::schema::is_key_member;
use pretty_assertions::assert_eq;

#[test]
fn test_primary_key_inference() {
    let keys: Vec<String> = TableSchema::of::<Employee>()
        .primary_keys()
        .map(|f| f.member_name.clone())
        .collect();
    assert_eq!(keys, vec!["EmployeeID".to_string()]);

    let keys: Vec<String> = TableSchema::of::<Territory>()
        .primary_keys()
        .map(|f| f.member_name.clone())
        .collect();
    assert_eq!(keys, vec!["Id".to_string()]);

    assert_eq!(TableSchema::of::<EmployeeTerritory>().primary_keys().count(), 0);
}

#[test]
fn test_key_convention_is_exact() {
    assert!(is_key_member("Region", "regionid"));
    assert!(!is_key_member("Region", "RegionIdentifier"));
    assert!(!is_key_member("Region", "TerritoryId"));
}

#[test]
fn test_field_definitions_follow_member_order() {
    let schema = TableSchema::of::<Employee>();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.member_name.as_str()).collect();
    assert_eq!(names, vec!["EmployeeID", "LastName", "FirstName", "HireDate"]);
    let ordinals: Vec<usize> = schema.fields().iter().map(|f| f.ordinal()).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3]);
    assert!(schema.field("HireDate").unwrap().nullable);
}

#[test]
fn test_cache_is_idempotent_across_threads() {
    let cache = Arc::new(SchemaCache::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.fields::<Territory>())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.len(), 1);
    let cached = cache.fields::<Territory>();
    for fields in &results {
        assert_eq!(fields.len(), 3);
        assert!(Arc::ptr_eq(fields, &cached));
    }
}

#[test]
fn test_projection_fields() {
    let cache = SchemaCache::new();
    let projected = cache.projected::<Employee, EmployeeTerritory>();
    let names: Vec<&str> = projected.iter().map(|f| f.member_name.as_str()).collect();
    assert_eq!(names, vec!["LastName", "Description"]);
}
