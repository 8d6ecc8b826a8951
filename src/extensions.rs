// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! DER-encoded certificate extensions carried by a template.
//!
//! The directory does not store encoded extensions; a certificate authority
//! derives them from the template attributes. This module builds the same
//! payloads so they can be published in a policy document.

use const_oid::ObjectIdentifier;
use der::Encode;
use der::Sequence;
use der::asn1::BitString;
use x509_cert::ext::pkix::ExtendedKeyUsage;
use x509_cert::ext::pkix::certpolicy::{CertificatePolicies, PolicyInformation};

use crate::error::{Result, TemplateError};
use crate::oid::{
    EXT_APPLICATION_POLICIES, EXT_CERTIFICATE_POLICIES, EXT_EXTENDED_KEY_USAGE, EXT_KEY_USAGE,
    EXT_TEMPLATE_INFO,
};

/// A single extension: identifier, criticality and DER payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExtension {
    /// Extension OID (dotted decimal).
    pub oid: String,
    /// Whether the extension is marked critical.
    pub critical: bool,
    /// DER-encoded `extnValue` contents.
    pub value: Vec<u8>,
}

impl TemplateExtension {
    /// Create an extension from an already encoded payload.
    pub fn new(oid: impl Into<String>, critical: bool, value: Vec<u8>) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value,
        }
    }
}

/// Certificate Template Information (v2).
///
/// ```asn1
/// CertificateTemplate ::= SEQUENCE {
///     templateID              EncodedObjectID,
///     templateMajorVersion    TemplateVersion,
///     templateMinorVersion    TemplateVersion OPTIONAL
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct TemplateInfo {
    template_id: ObjectIdentifier,
    major_version: u32,
    minor_version: u32,
}

/// Encode the template information extension.
pub fn template_info(template_oid: &str, major: u32, minor: u32, critical: bool) -> Result<TemplateExtension> {
    let info = TemplateInfo {
        template_id: parse_oid(template_oid)?,
        major_version: major,
        minor_version: minor,
    };
    Ok(TemplateExtension::new(
        EXT_TEMPLATE_INFO.to_string(),
        critical,
        info.to_der()?,
    ))
}

/// Encode an Extended Key Usage extension.
pub fn extended_key_usage(purposes: &[String], critical: bool) -> Result<TemplateExtension> {
    let purposes = purposes
        .iter()
        .map(|p| parse_oid(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(TemplateExtension::new(
        EXT_EXTENDED_KEY_USAGE.to_string(),
        critical,
        ExtendedKeyUsage(purposes).to_der()?,
    ))
}

/// Encode an Application Policies extension (same syntax as certificate policies).
pub fn application_policies(policies: &[String], critical: bool) -> Result<TemplateExtension> {
    Ok(TemplateExtension::new(
        EXT_APPLICATION_POLICIES.to_string(),
        critical,
        encode_policies(policies)?,
    ))
}

/// Encode a Certificate Policies extension without qualifiers.
pub fn certificate_policies(policies: &[String], critical: bool) -> Result<TemplateExtension> {
    Ok(TemplateExtension::new(
        EXT_CERTIFICATE_POLICIES.to_string(),
        critical,
        encode_policies(policies)?,
    ))
}

/// Encode a Key Usage extension from the `pKIKeyUsage` bit string bytes.
///
/// Returns `None` when no bit is set.
pub fn key_usage(bits: &[u8], critical: bool) -> Result<Option<TemplateExtension>> {
    let Some(last) = bits.iter().rposition(|b| *b != 0) else {
        return Ok(None);
    };

    let bytes = &bits[..=last];
    let unused_bits = bytes[last].trailing_zeros() as u8;
    let bit_string = BitString::new(unused_bits, bytes.to_vec())?;

    Ok(Some(TemplateExtension::new(
        EXT_KEY_USAGE.to_string(),
        critical,
        bit_string.to_der()?,
    )))
}

fn encode_policies(policies: &[String]) -> Result<Vec<u8>> {
    let policies = policies
        .iter()
        .map(|p| -> Result<PolicyInformation> {
            Ok(PolicyInformation {
                policy_identifier: parse_oid(p)?,
                policy_qualifiers: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CertificatePolicies(policies).to_der()?)
}

fn parse_oid(value: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(value.trim())
        .map_err(|e| TemplateError::format(format!("Malformed OID '{value}': {e}")))
}
