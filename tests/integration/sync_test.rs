//! Synchronizing fixtures held in an in-memory directory

use adcs_templates::attributes::{AttributeMap, AttributeValue};
use adcs_templates::config::SyncConfig;
use adcs_templates::directory::{DirectoryWrite, InMemoryDirectory, TemplateDirectory};
use adcs_templates::sync::TemplateSynchronizer;

use super::load_fixture;

fn directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory.insert_template("WebServer2", load_fixture("WebServer2"));
    directory
}

fn desired() -> AttributeMap {
    let mut desired = load_fixture("WebServer2");
    desired.insert("flags", "131680");
    desired.insert("pKIExtendedKeyUsage", vec!["1.3.6.1.5.5.7.3.1", "1.3.6.1.5.5.7.3.2"]);
    desired.remove("pKICriticalExtensions");
    desired
}

#[test]
fn test_sync_then_resync_is_noop() {
    let sync = TemplateSynchronizer::new(directory());

    let first = sync.sync("WebServer2", &desired()).unwrap();
    assert!(first.applied);
    assert_eq!(first.reconciliation.replace.len(), 2);
    assert!(first.reconciliation.clear.contains("pKICriticalExtensions"));

    let second = sync.sync("WebServer2", &desired()).unwrap();
    assert!(second.is_unchanged());
    assert!(!second.applied);
    assert_eq!(sync.directory().writes().len(), 2);

    let stored = sync.directory().read_template("WebServer2").unwrap();
    assert_eq!(stored.get("flags"), Some(&AttributeValue::Int(131_680)));
    assert!(!stored.contains("pKICriticalExtensions"));
}

#[test]
fn test_writes_are_replace_then_clear() {
    let sync = TemplateSynchronizer::new(directory());
    sync.sync("WebServer2", &desired()).unwrap();

    let writes = sync.directory().writes();
    match (&writes[0], &writes[1]) {
        (
            DirectoryWrite::Replace { template, attributes },
            DirectoryWrite::Clear { attributes: cleared, .. },
        ) => {
            assert_eq!(template, "WebServer2");
            assert_eq!(attributes.names().collect::<Vec<_>>(), vec!["flags", "pKIExtendedKeyUsage"]);
            assert_eq!(cleared.len(), 1);
        }
        other => panic!("unexpected writes: {other:?}"),
    }
}

#[test]
fn test_configured_dry_run_and_protection() {
    let config = SyncConfig::from_toml(
        r#"
[sync]
dry_run = true
protected_attributes = ["pKIExtendedKeyUsage"]
"#,
    )
    .unwrap();

    let sync = TemplateSynchronizer::from_settings(directory(), &config.sync);
    let outcome = sync.sync("WebServer2", &desired()).unwrap();

    assert!(!outcome.applied);
    assert!(outcome.changes.get("pKIExtendedKeyUsage").is_none());
    assert!(outcome.changes.get("flags").is_some());
    assert!(sync.directory().writes().is_empty());
}
