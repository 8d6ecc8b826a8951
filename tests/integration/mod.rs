//! Integration test utilities and helpers
//!
//! Fixtures live in `tests/fixtures/templates` as JSON objects shaped like a
//! directory read of a certificate template.

use std::path::PathBuf;

use adcs_templates::attributes::AttributeMap;

mod cli_test;
mod policy_test;
mod reconcile_test;
mod sync_test;

/// Path of a template fixture.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("templates")
        .join(format!("{name}.json"))
}

/// Load a template fixture as an attribute map.
pub fn load_fixture(name: &str) -> AttributeMap {
    let content = std::fs::read_to_string(fixture_path(name)).expect("fixture readable");
    let document: serde_json::Value = serde_json::from_str(&content).expect("fixture is JSON");
    AttributeMap::from_json(&document).expect("fixture decodes")
}
