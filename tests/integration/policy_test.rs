//! Enrollment policy documents built from template fixtures

use adcs_templates::oid::OidRegistry;
use adcs_templates::template::PolicyTemplate;
use adcs_templates::xcep::{self, ATTRIBUTE_ORDER, Element, POLICY_NAMESPACE};

use super::load_fixture;

fn templates() -> Vec<PolicyTemplate> {
    ["WebServer2", "KeyArchiveUser"]
        .into_iter()
        .map(|name| PolicyTemplate::from_attributes(&load_fixture(name)).unwrap())
        .collect()
}

fn text<'a>(element: &'a Element, path: &[&str]) -> Option<&'a str> {
    let mut current = element;
    for name in path {
        current = current.find(name)?;
    }
    current.text_content()
}

#[test]
fn test_document_structure() {
    let document = xcep::serialize(&templates()).unwrap();
    let root = document.root();

    assert_eq!(root.name(), "GetPoliciesResponse");
    assert_eq!(root.attribute("xmlns"), Some(POLICY_NAMESPACE));
    assert_eq!(text(root, &["response", "nextUpdateHours"]), Some("8"));
    assert!(root.find("response").unwrap().find("policiesNotChanged").unwrap().is_nil());
    assert_eq!(document.policies().len(), 2);

    for policy in document.policies() {
        let attributes = policy.find("attributes").unwrap();
        assert_eq!(attributes.child_names(), ATTRIBUTE_ORDER.to_vec());
        assert_eq!(text(policy, &["cAs", "cAReference"]), Some("0"));
    }
}

#[test]
fn test_oid_table_order_and_reuse() {
    let mut registry = OidRegistry::new();
    let document = xcep::serialize_policies(&templates(), &mut registry).unwrap();

    let values: Vec<&str> = registry.entries().iter().map(|e| e.value.as_str()).collect();
    assert_eq!(
        values,
        vec![
            "1.3.6.1.4.1.311.21.8.7638725.1.2",
            "1.3.6.1.4.1.311.21.7",
            "2.5.29.37",
            "2.5.29.15",
            "1.3.6.1.4.1.311.21.8.7638725.1.9",
            "1.3.132.0.34",
            "2.16.840.1.101.3.4.2.2",
            "1.3.6.1.4.1.311.20.2.1",
            "2.5.29.32.0",
            "2.16.840.1.101.3.4.1.42",
            "1.3.6.1.4.1.311.21.10",
        ]
    );

    let table = document.oid_table();
    assert_eq!(table.len(), values.len());
    assert_eq!(text(&table[0], &["group"]), Some("9"));
    assert_eq!(text(&table[0], &["defaultName"]), Some("Web Server 2"));
    assert_eq!(text(&table[2], &["defaultName"]), Some("Enhanced Key Usage"));
    assert_eq!(text(&table[5], &["group"]), Some("3"));
    assert_eq!(text(&table[10], &["oIDReferenceID"]), Some("11"));

    // The second template reuses the extension references of the first.
    let second = &document.policies()[1];
    let refs: Vec<&str> = second
        .find("attributes")
        .and_then(|a| a.find("extensions"))
        .unwrap()
        .children()
        .iter()
        .map(|ext| text(ext, &["oIDReference"]).unwrap())
        .collect();
    assert_eq!(refs, vec!["2", "3", "11", "4"]);
}

#[test]
fn test_defaults_are_nil() {
    let document = xcep::serialize(&templates()).unwrap();
    let attributes = document.policies()[0].find("attributes").unwrap();
    let key = attributes.find("privateKeyAttributes").unwrap();

    assert!(key.find("algorithmOIDReference").unwrap().is_nil());
    assert!(key.find("keyUsageProperty").unwrap().is_nil());
    assert!(attributes.find("hashAlgorithmOIDReference").unwrap().is_nil());
    assert!(attributes.find("rARequirements").unwrap().is_nil());
    assert!(attributes.find("keyArchivalAttributes").unwrap().is_nil());
    assert!(attributes.find("supersededPolicies").unwrap().is_nil());
    assert_eq!(
        key.find("cryptoProviders").unwrap().children()[0].text_content(),
        Some("Microsoft RSA SChannel Cryptographic Provider")
    );
}

#[test]
fn test_cng_template_fields() {
    let document = xcep::serialize(&templates()).unwrap();
    let attributes = document.policies()[1].find("attributes").unwrap();

    assert_eq!(text(attributes, &["commonName"]), Some("KeyArchiveUser"));
    assert_eq!(text(attributes, &["policySchema"]), Some("4"));
    assert_eq!(
        text(attributes, &["certificateValidity", "validityPeriodSeconds"]),
        Some("31536000")
    );
    assert_eq!(text(attributes, &["subjectNameFlags"]), Some("2785017856"));
    assert_eq!(text(attributes, &["privateKeyFlags"]), Some("16842769"));
    assert_eq!(
        text(attributes, &["privateKeyAttributes", "permissions"]),
        Some("D:P(A;;FA;;;SY)(A;;FA;;;BA)")
    );
    assert_eq!(
        text(attributes, &["privateKeyAttributes", "keyUsageProperty"]),
        Some("16777215")
    );
    assert_eq!(text(attributes, &["supersededPolicies", "commonName"]), Some("User"));
    assert_eq!(text(attributes, &["rARequirements", "rASignatures"]), Some("1"));
    assert_eq!(
        text(attributes, &["keyArchivalAttributes", "symmetricAlgorithmKeyLength"]),
        Some("256")
    );
}

#[test]
fn test_fresh_registries_give_identical_output() {
    let first = xcep::serialize(&templates()).unwrap().to_xml().unwrap();
    let second = xcep::serialize(&templates()).unwrap().to_xml().unwrap();
    assert_eq!(first, second);

    let pretty = xcep::serialize(&templates()).unwrap().to_pretty_xml().unwrap();
    assert!(pretty.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(pretty.contains("\n  <response>"));
}

#[test]
fn test_malformed_template_aborts_document() {
    let mut broken = templates();
    broken[1].renewal_period = "6 fortnights".to_string();
    let err = xcep::serialize(&broken).unwrap_err();
    assert_eq!(err.kind(), "FormatError");
}

#[test]
fn test_no_templates() {
    let err = xcep::serialize(&[]).unwrap_err();
    assert_eq!(err.kind(), "MissingInputError");
}
