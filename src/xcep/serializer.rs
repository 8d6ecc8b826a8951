// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Enrollment-policy serializer.
//!
//! Templates are processed strictly in input order: the OID references in
//! the document depend on the order identifiers are first encountered, so
//! this walk must stay sequential for the output to be deterministic.

use base64::prelude::*;
use tracing::debug;

use crate::duration::parse_duration;
use crate::error::{Result, TemplateError};
use crate::oid::{OidGroup, OidRegistry, RSA, SHA1};
use crate::template::PolicyTemplate;

use super::document::Element;

/// Namespace of the `GetPoliciesResponse` document.
pub const POLICY_NAMESPACE: &str = "http://schemas.microsoft.com/windows/pki/2009/01/enrollmentpolicy";

/// XML Schema instance namespace, for `xsi:nil`.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Hours until a client should refresh the policy.
pub const NEXT_UPDATE_HOURS: u32 = 8;

/// Child order of every `policy/attributes` element.
pub const ATTRIBUTE_ORDER: [&str; 15] = [
    "commonName",
    "policySchema",
    "certificateValidity",
    "permission",
    "privateKeyAttributes",
    "revision",
    "supersededPolicies",
    "privateKeyFlags",
    "subjectNameFlags",
    "enrollmentFlags",
    "generalFlags",
    "hashAlgorithmOIDReference",
    "rARequirements",
    "keyArchivalAttributes",
    "extensions",
];

/// A serialized enrollment-policy response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    root: Element,
}

impl PolicyDocument {
    /// Root `GetPoliciesResponse` element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// `policy` elements in template order.
    pub fn policies(&self) -> &[Element] {
        self.root
            .find("response")
            .and_then(|r| r.find("policies"))
            .map(Element::children)
            .unwrap_or_default()
    }

    /// `oID` elements in reference order.
    pub fn oid_table(&self) -> &[Element] {
        self.root
            .find("oIDs")
            .map(Element::children)
            .unwrap_or_default()
    }

    /// Compact XML.
    pub fn to_xml(&self) -> Result<String> {
        self.root.to_xml(false)
    }

    /// Indented XML.
    pub fn to_pretty_xml(&self) -> Result<String> {
        self.root.to_xml(true)
    }
}

/// Serialize templates with a fresh OID registry.
///
/// # Errors
///
/// See [`serialize_policies`].
pub fn serialize(templates: &[PolicyTemplate]) -> Result<PolicyDocument> {
    let mut registry = OidRegistry::new();
    serialize_policies(templates, &mut registry)
}

/// Serialize templates into a policy document, interning OIDs into `registry`.
///
/// The registry is owned by the caller and should be fresh for each
/// document; its entries become the document's `oIDs` table.
///
/// # Errors
///
/// - [`TemplateError::MissingInput`] when `templates` is empty.
/// - [`TemplateError::Format`] / [`TemplateError::Range`] for a malformed
///   period or OID. No partial document is returned.
pub fn serialize_policies(
    templates: &[PolicyTemplate],
    registry: &mut OidRegistry,
) -> Result<PolicyDocument> {
    if templates.is_empty() {
        return Err(TemplateError::missing_input("no templates to serialize"));
    }

    let mut policies = Vec::with_capacity(templates.len());
    for template in templates {
        let policy = policy_element(template, registry).map_err(|e| {
            debug!(template = %template.common_name, error = %e, "template serialization failed");
            e
        })?;
        policies.push(policy);
    }

    let response = Element::new("response")
        .child(Element::new("policyID"))
        .child(Element::new("policyFriendlyName"))
        .child(Element::with_text("nextUpdateHours", NEXT_UPDATE_HOURS))
        .child(Element::nil("policiesNotChanged"))
        .child(Element::new("policies").children_from(policies));

    let root = Element::new("GetPoliciesResponse")
        .attr("xmlns", POLICY_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .child(response)
        .child(Element::nil("cAs"))
        .child(oid_table(registry));

    Ok(PolicyDocument { root })
}

/// Reinterpret the signed name flags as the unsigned 32-bit word with the same
/// big-endian bytes.
pub fn pack_subject_name_flags(flags: i32) -> u32 {
    u32::from_be_bytes(flags.to_be_bytes())
}

fn policy_element(template: &PolicyTemplate, registry: &mut OidRegistry) -> Result<Element> {
    let policy_ref = registry.intern(&template.oid, OidGroup::Enrollment, &template.display_name)?;
    let validity = parse_duration(&template.validity_period)?;
    let renewal = parse_duration(&template.renewal_period)?;

    let private_key = private_key_attributes(template, registry)?;

    let superseded = if template.superseded_templates.is_empty() {
        Element::nil("supersededPolicies")
    } else {
        Element::new("supersededPolicies").children_from(
            template
                .superseded_templates
                .iter()
                .map(|name| Element::with_text("commonName", name)),
        )
    };

    let hash = if template.hash_algorithm == SHA1.to_string() {
        Element::nil("hashAlgorithmOIDReference")
    } else {
        let id = registry.intern_well_known(&template.hash_algorithm, OidGroup::Hash)?;
        Element::with_text("hashAlgorithmOIDReference", id)
    };

    let ra = ra_requirements(template, registry)?;

    let archival = match &template.key_archival {
        None => Element::nil("keyArchivalAttributes"),
        Some(archival) => {
            let id = registry.intern_well_known(&archival.symmetric_algorithm, OidGroup::Encryption)?;
            Element::new("keyArchivalAttributes")
                .child(Element::with_text("symmetricAlgorithmOIDReference", id))
                .child(Element::with_text("symmetricAlgorithmKeyLength", archival.key_length))
        }
    };

    let mut extensions = Element::new("extensions");
    for ext in &template.extensions {
        let id = registry.intern_well_known(&ext.oid, OidGroup::Extension)?;
        extensions = extensions.child(
            Element::new("extension")
                .child(Element::with_text("oIDReference", id))
                .child(Element::with_text("critical", ext.critical))
                .child(Element::with_text("value", BASE64_STANDARD.encode(&ext.value))),
        );
    }

    let attributes = Element::new("attributes")
        .child(Element::with_text("commonName", &template.common_name))
        .child(Element::with_text("policySchema", template.schema_version))
        .child(
            Element::new("certificateValidity")
                .child(Element::with_text("validityPeriodSeconds", validity))
                .child(Element::with_text("renewalPeriodSeconds", renewal)),
        )
        .child(
            Element::new("permission")
                .child(Element::with_text("enroll", template.permission.enroll))
                .child(Element::with_text("autoEnroll", template.permission.auto_enroll)),
        )
        .child(private_key)
        .child(
            Element::new("revision")
                .child(Element::with_text("majorRevision", template.major_revision))
                .child(Element::with_text("minorRevision", template.minor_revision)),
        )
        .child(superseded)
        .child(Element::with_text("privateKeyFlags", template.private_key_flags))
        .child(Element::with_text(
            "subjectNameFlags",
            pack_subject_name_flags(template.subject_name_flags),
        ))
        .child(Element::with_text("enrollmentFlags", template.enrollment_flags))
        .child(Element::with_text("generalFlags", template.general_flags))
        .child(hash)
        .child(ra)
        .child(archival)
        .child(extensions);

    Ok(Element::new("policy")
        .child(Element::with_text("policyOIDReference", policy_ref))
        .child(Element::new("cAs").child(Element::with_text("cAReference", 0)))
        .child(attributes))
}

fn private_key_attributes(template: &PolicyTemplate, registry: &mut OidRegistry) -> Result<Element> {
    let key_usage = if template.key_usage_property == 0 {
        Element::nil("keyUsageProperty")
    } else {
        Element::with_text("keyUsageProperty", template.key_usage_property)
    };

    let permissions = if template.key_permissions.trim().is_empty() {
        Element::nil("permissions")
    } else {
        Element::with_text("permissions", &template.key_permissions)
    };

    let algorithm = if template.key_algorithm == RSA.to_string() {
        Element::nil("algorithmOIDReference")
    } else {
        let id = registry.intern_well_known(&template.key_algorithm, OidGroup::PublicKey)?;
        Element::with_text("algorithmOIDReference", id)
    };

    let providers = if template.crypto_providers.is_empty() {
        Element::nil("cryptoProviders")
    } else {
        Element::new("cryptoProviders").children_from(
            template
                .crypto_providers
                .iter()
                .map(|p| Element::with_text("provider", p)),
        )
    };

    Ok(Element::new("privateKeyAttributes")
        .child(Element::with_text("minimalKeyLength", template.minimal_key_length))
        .child(Element::with_text("keySpec", template.key_spec))
        .child(key_usage)
        .child(permissions)
        .child(algorithm)
        .child(providers))
}

fn ra_requirements(template: &PolicyTemplate, registry: &mut OidRegistry) -> Result<Element> {
    if template.ra_signatures == 0 {
        return Ok(Element::nil("rARequirements"));
    }

    let ekus = match &template.ra_application_policy {
        None => Element::nil("rAEKUs"),
        Some(policy) => {
            let id = registry.intern_well_known(policy, OidGroup::Eku)?;
            Element::new("rAEKUs").child(Element::with_text("oIDReference", id))
        }
    };

    let policies = if template.ra_certificate_policies.is_empty() {
        Element::nil("rAPolicies")
    } else {
        let mut policies = Element::new("rAPolicies");
        for policy in &template.ra_certificate_policies {
            let id = registry.intern_well_known(policy, OidGroup::CertificatePolicy)?;
            policies = policies.child(Element::with_text("oIDReference", id));
        }
        policies
    };

    Ok(Element::new("rARequirements")
        .child(Element::with_text("rASignatures", template.ra_signatures))
        .child(ekus)
        .child(policies))
}

fn oid_table(registry: &OidRegistry) -> Element {
    Element::new("oIDs").children_from(registry.entries().iter().map(|entry| {
        Element::new("oID")
            .child(Element::with_text("value", &entry.value))
            .child(Element::with_text("group", entry.group.id()))
            .child(Element::with_text("oIDReferenceID", entry.reference_id))
            .child(Element::with_text("defaultName", &entry.name))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::TemplateExtension;
    use crate::template::KeyArchival;

    fn template(name: &str, oid: &str) -> PolicyTemplate {
        PolicyTemplate {
            common_name: name.to_string(),
            display_name: format!("{name} display"),
            oid: oid.to_string(),
            schema_version: 2,
            validity_period: "2 years".to_string(),
            renewal_period: "6 weeks".to_string(),
            extensions: vec![
                TemplateExtension::new("2.5.29.37", false, vec![0x30, 0x00]),
                TemplateExtension::new("2.5.29.15", true, vec![0x03, 0x02, 0x05, 0xa0]),
            ],
            ..PolicyTemplate::default()
        }
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = serialize(&[]).unwrap_err();
        assert_eq!(err.kind(), "MissingInputError");
    }

    #[test]
    fn test_attribute_order() {
        let doc = serialize(&[template("WebServer2", "1.2.3.1")]).unwrap();
        let attributes = doc.policies()[0].find("attributes").unwrap();
        assert_eq!(attributes.child_names(), ATTRIBUTE_ORDER.to_vec());
    }

    #[test]
    fn test_defaults_emit_nil_markers() {
        let doc = serialize(&[template("WebServer2", "1.2.3.1")]).unwrap();
        let attributes = doc.policies()[0].find("attributes").unwrap();
        let key = attributes.find("privateKeyAttributes").unwrap();

        for name in ["keyUsageProperty", "permissions", "algorithmOIDReference", "cryptoProviders"] {
            assert!(key.find(name).unwrap().is_nil(), "{name}");
        }
        for name in [
            "supersededPolicies",
            "hashAlgorithmOIDReference",
            "rARequirements",
            "keyArchivalAttributes",
        ] {
            assert!(attributes.find(name).unwrap().is_nil(), "{name}");
        }
    }

    #[test]
    fn test_populated_fields() {
        let mut t = template("Agent", "1.2.3.9");
        t.key_usage_property = 16_777_215;
        t.key_permissions = "D:P(A;;FA;;;SY)".to_string();
        t.key_algorithm = "1.3.132.0.34".to_string();
        t.crypto_providers = vec!["Microsoft Software Key Storage Provider".to_string()];
        t.superseded_templates = vec!["WebServer".to_string()];
        t.hash_algorithm = "2.16.840.1.101.3.4.2.2".to_string();
        t.ra_signatures = 1;
        t.ra_application_policy = Some("1.3.6.1.4.1.311.20.2.1".to_string());
        t.ra_certificate_policies = vec!["2.5.29.32.0".to_string()];
        t.key_archival = Some(KeyArchival {
            symmetric_algorithm: "2.16.840.1.101.3.4.1.42".to_string(),
            key_length: 256,
        });

        let mut registry = OidRegistry::new();
        let doc = serialize_policies(&[t], &mut registry).unwrap();
        let attributes = doc.policies()[0].find("attributes").unwrap();
        let key = attributes.find("privateKeyAttributes").unwrap();

        assert_eq!(key.find("keyUsageProperty").unwrap().text_content(), Some("16777215"));
        assert_eq!(key.find("algorithmOIDReference").unwrap().text_content(), Some("2"));
        assert_eq!(key.find("cryptoProviders").unwrap().child_names(), vec!["provider"]);
        assert_eq!(attributes.find("hashAlgorithmOIDReference").unwrap().text_content(), Some("3"));

        let ra = attributes.find("rARequirements").unwrap();
        assert_eq!(ra.find("rASignatures").unwrap().text_content(), Some("1"));
        assert_eq!(ra.find("rAEKUs").unwrap().children()[0].text_content(), Some("4"));
        assert_eq!(ra.find("rAPolicies").unwrap().children()[0].text_content(), Some("5"));

        let archival = attributes.find("keyArchivalAttributes").unwrap();
        assert_eq!(
            archival.find("symmetricAlgorithmOIDReference").unwrap().text_content(),
            Some("6")
        );

        let values: Vec<&str> = registry.entries().iter().map(|e| e.value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "1.2.3.9",
                "1.3.132.0.34",
                "2.16.840.1.101.3.4.2.2",
                "1.3.6.1.4.1.311.20.2.1",
                "2.5.29.32.0",
                "2.16.840.1.101.3.4.1.42",
                "2.5.29.37",
                "2.5.29.15",
            ]
        );
        assert_eq!(doc.oid_table().len(), 8);
    }

    #[test]
    fn test_shared_extension_oids_are_interned_once() {
        let doc = serialize(&[template("A", "1.2.3.1"), template("B", "1.2.3.2")]).unwrap();

        let refs: Vec<&str> = doc
            .oid_table()
            .iter()
            .map(|oid| oid.find("value").and_then(Element::text_content).unwrap())
            .collect();
        assert_eq!(refs, vec!["1.2.3.1", "2.5.29.37", "2.5.29.15", "1.2.3.2"]);

        let second = doc.policies()[1].find("attributes").unwrap();
        let ext_refs: Vec<&str> = second
            .find("extensions")
            .unwrap()
            .children()
            .iter()
            .map(|e| e.find("oIDReference").and_then(Element::text_content).unwrap())
            .collect();
        assert_eq!(ext_refs, vec!["2", "3"]);
        assert_eq!(
            doc.policies()[1].find("policyOIDReference").unwrap().text_content(),
            Some("4")
        );
    }

    #[test]
    fn test_extension_entry() {
        let doc = serialize(&[template("A", "1.2.3.1")]).unwrap();
        let attributes = doc.policies()[0].find("attributes").unwrap();
        let ext = &attributes.find("extensions").unwrap().children()[1];
        assert_eq!(ext.child_names(), vec!["oIDReference", "critical", "value"]);
        assert_eq!(ext.find("critical").unwrap().text_content(), Some("true"));
        assert_eq!(ext.find("value").unwrap().text_content(), Some("AwIFoA=="));
    }

    #[test]
    fn test_certificate_validity_seconds() {
        let doc = serialize(&[template("A", "1.2.3.1")]).unwrap();
        let validity = doc.policies()[0]
            .find("attributes")
            .and_then(|a| a.find("certificateValidity"))
            .unwrap();
        assert_eq!(
            validity.find("validityPeriodSeconds").unwrap().text_content(),
            Some("63072000")
        );
        assert_eq!(
            validity.find("renewalPeriodSeconds").unwrap().text_content(),
            Some("3628800")
        );
    }

    #[test]
    fn test_bad_period_aborts_document() {
        let mut bad = template("B", "1.2.3.2");
        bad.validity_period = "forever".to_string();
        let err = serialize(&[template("A", "1.2.3.1"), bad]).unwrap_err();
        assert_eq!(err.kind(), "FormatError");
    }

    #[test]
    fn test_bad_oid_aborts_document() {
        let mut bad = template("B", "1.2.3.2");
        bad.extensions.push(TemplateExtension::new("not.an.oid", false, vec![]));
        assert_eq!(serialize(&[bad]).unwrap_err().kind(), "FormatError");
    }

    #[test]
    fn test_pack_subject_name_flags() {
        assert_eq!(pack_subject_name_flags(1), 1);
        assert_eq!(pack_subject_name_flags(-2_113_929_216), 0x8200_0000);
        assert_eq!(pack_subject_name_flags(-1), u32::MAX);
    }

    #[test]
    fn test_document_header() {
        let doc = serialize(&[template("A", "1.2.3.1")]).unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "GetPoliciesResponse");
        assert_eq!(root.attribute("xmlns"), Some(POLICY_NAMESPACE));
        assert_eq!(root.child_names(), vec!["response", "cAs", "oIDs"]);

        let response = root.find("response").unwrap();
        assert_eq!(
            response.find("nextUpdateHours").unwrap().text_content(),
            Some("8")
        );
        let policy = &doc.policies()[0];
        assert_eq!(
            policy.child_names(),
            vec!["policyOIDReference", "cAs", "attributes"]
        );
        assert_eq!(
            policy.find("cAs").and_then(|c| c.find("cAReference")).and_then(Element::text_content),
            Some("0")
        );
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let templates = vec![template("A", "1.2.3.1"), template("B", "1.2.3.2")];
        let first = serialize(&templates).unwrap().to_xml().unwrap();
        let second = serialize(&templates).unwrap().to_xml().unwrap();
        assert_eq!(first, second);
    }
}
