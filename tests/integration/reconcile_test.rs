//! Diff and reconcile over directory-shaped attribute sets

use std::collections::BTreeSet;

use adcs_templates::attributes::{AttributeMap, AttributeValue};
use adcs_templates::classify::{MULTI_OID_ATTRIBUTES, SCALAR_INT_ATTRIBUTES};
use adcs_templates::{diff, reconcile};
use serde_json::json;

use super::load_fixture;

fn desired(document: serde_json::Value) -> AttributeMap {
    AttributeMap::from_json(&document).unwrap()
}

#[test]
fn test_flag_change_with_padded_display_name() {
    let current = AttributeMap::new()
        .with("flags", 131_648)
        .with("displayName", "Old");
    let desired = desired(json!({ "flags": "131649", "displayName": "Old " }));

    let changes = diff(&current, &desired).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes.get("flags"), Some(&AttributeValue::Int(131_649)));

    let plan = reconcile(&changes);
    assert_eq!(plan.replace.get("flags"), Some(&AttributeValue::Int(131_649)));
    assert_eq!(plan.replace.len(), 1);
    assert!(plan.clear.is_empty());
}

#[test]
fn test_omitted_eku_is_cleared() {
    let current = AttributeMap::new().with("pKIExtendedKeyUsage", vec!["1.3.6.1.5.5.7.3.1"]);
    let desired = AttributeMap::new();

    let changes = diff(&current, &desired).unwrap();
    assert_eq!(
        changes.get("pKIExtendedKeyUsage"),
        Some(&AttributeValue::StringList(Vec::new()))
    );

    let plan = reconcile(&changes);
    assert!(plan.replace.is_empty());
    assert_eq!(plan.clear, BTreeSet::from(["pKIExtendedKeyUsage".to_string()]));
}

#[test]
fn test_fixture_against_itself_is_unchanged() {
    let current = load_fixture("WebServer2");
    let changes = diff(&current, &current.clone()).unwrap();
    assert!(changes.is_empty());
    assert!(reconcile(&changes).is_empty());
}

#[test]
fn test_scalar_int_records_desired_integer() {
    for name in SCALAR_INT_ATTRIBUTES {
        let current = AttributeMap::new().with(*name, 5);

        let same = AttributeMap::new().with(*name, "5");
        assert!(diff(&current, &same).unwrap().is_empty(), "{name}");

        let changed = AttributeMap::new().with(*name, " 7 ");
        let changes = diff(&current, &changed).unwrap();
        assert_eq!(changes.get(name), Some(&AttributeValue::Int(7)), "{name}");
    }
}

#[test]
fn test_multi_oid_reordering_is_not_a_change() {
    for name in MULTI_OID_ATTRIBUTES {
        let current = AttributeMap::new().with(*name, vec!["1.2.3", "1.2.4", "1.2.5"]);

        let reordered = AttributeMap::new().with(*name, vec!["1.2.5", "1.2.3", "1.2.4"]);
        assert!(diff(&current, &reordered).unwrap().is_empty(), "{name}");

        let changed = AttributeMap::new().with(*name, vec!["1.2.9", "1.2.3"]);
        let changes = diff(&current, &changed).unwrap();
        assert_eq!(
            changes.get(name),
            Some(&AttributeValue::StringList(vec![
                "1.2.9".to_string(),
                "1.2.3".to_string()
            ])),
            "{name}"
        );
    }
}

#[test]
fn test_reconcile_partitions_every_change() {
    let current = load_fixture("WebServer2");
    let desired = desired(json!({
        "displayName": "",
        "flags": 131680,
        "revision": "100",
        "pKIExtendedKeyUsage": ["1.3.6.1.5.5.7.3.1", "1.3.6.1.5.5.7.3.2"],
        "pKICriticalExtensions": [],
        "pKIExpirationPeriod": [0, 128, 114, 14, 93, 194, 253, 255],
        "pKIKeyUsage": [160, 0],
        "msPKI-Enrollment-Flag": 0
    }));

    let changes = diff(&current, &desired).unwrap();
    let plan = reconcile(&changes);

    let replaced: BTreeSet<&str> = plan.replace.names().collect();
    let cleared: BTreeSet<&str> = plan.clear.iter().map(String::as_str).collect();
    let changed: BTreeSet<&str> = changes.names().collect();

    assert!(replaced.is_disjoint(&cleared));
    assert_eq!(&replaced | &cleared, changed);

    assert!(cleared.contains("displayName"));
    assert!(cleared.contains("pKICriticalExtensions"));
    assert!(cleared.contains("pKIDefaultCSPs"));
    assert!(replaced.contains("flags"));
    assert!(replaced.contains("pKIExtendedKeyUsage"));
    assert!(replaced.contains("pKIExpirationPeriod"));
    assert!(!changed.contains("revision"));
    assert!(!changed.contains("pKIKeyUsage"));
    // Byte attributes absent on one side are left alone.
    assert!(!changed.contains("pKIOverlapPeriod"));
}

#[test]
fn test_non_numeric_flag_is_rejected() {
    let current = AttributeMap::new().with("flags", 1);
    let desired = desired(json!({ "flags": "enabled" }));

    let err = diff(&current, &desired).unwrap_err();
    assert_eq!(err.kind(), "TypeCoercionError");
    assert_eq!(err.attribute(), Some("flags"));
}

#[test]
fn test_boolean_desired_value_is_rejected() {
    let err = AttributeMap::from_json(&json!({ "flags": true })).unwrap_err();
    assert_eq!(err.kind(), "TypeCoercionError");
}

#[test]
fn test_unsigned_rendering_of_stored_flags_is_unchanged() {
    let current = load_fixture("KeyArchiveUser");
    let stored = current.get_int("msPKI-Certificate-Name-Flag").unwrap().unwrap();
    assert!(stored < 0);

    let unsigned = i64::from(stored as i32 as u32);
    let desired = desired(json!({ "msPKI-Certificate-Name-Flag": unsigned }));
    let mut merged = current.clone();
    for (name, value) in desired.iter() {
        merged.insert(name, value.clone());
    }

    assert!(diff(&current, &merged).unwrap().is_empty());
}

#[test]
fn test_flag_wider_than_32_bits_is_not_replaced() {
    let current = AttributeMap::new().with("flags", 1);
    let desired = desired(json!({ "flags": 99_999_999_999i64 }));

    let err = diff(&current, &desired).unwrap_err();
    assert_eq!(err.kind(), "TypeCoercionError");
    assert_eq!(err.attribute(), Some("flags"));
}
