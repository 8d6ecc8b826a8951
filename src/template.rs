// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Certificate template object graph.
//!
//! [`PolicyTemplate`] is the structured view of a template used by the
//! policy serializer. It is normally built from a directory attribute bag
//! with [`PolicyTemplate::from_attributes`].

use std::collections::BTreeSet;

use tracing::warn;

use crate::attributes::{AttributeMap, coerce_word};
use crate::cng::{self, CngSettings};
use crate::duration::{format_duration, period_from_bytes};
use crate::error::{Result, TemplateError};
use crate::extensions::{self, TemplateExtension};
use crate::oid::{DES_EDE3_CBC, RSA, SHA1};

/// `msPKI-Private-Key-Flag` bit requiring key archival.
pub const CT_FLAG_REQUIRE_PRIVATE_KEY_ARCHIVAL: u32 = 0x0000_0001;

const DEFAULT_ARCHIVAL_KEY_LENGTH: u32 = 168;

/// Enrollment permissions advertised for a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permission {
    /// Caller may enroll.
    pub enroll: bool,
    /// Caller may auto-enroll.
    pub auto_enroll: bool,
}

/// Key archival settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyArchival {
    /// Symmetric algorithm OID used to encrypt the archived key.
    pub symmetric_algorithm: String,
    /// Symmetric key length in bits.
    pub key_length: u32,
}

/// Cryptographic and enrollment settings of one certificate template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTemplate {
    /// Template common name (`cn`).
    pub common_name: String,
    /// Display name, also the friendly name of the template OID.
    pub display_name: String,
    /// Template OID (`msPKI-Cert-Template-OID`).
    pub oid: String,
    /// Template schema version.
    pub schema_version: u32,
    /// Validity period text, e.g. `"1 years"`.
    pub validity_period: String,
    /// Renewal (overlap) period text, e.g. `"6 weeks"`.
    pub renewal_period: String,
    /// Enrollment permissions.
    pub permission: Permission,
    /// Minimal key length in bits.
    pub minimal_key_length: u32,
    /// Legacy key spec (1 = exchange, 2 = signature).
    pub key_spec: u32,
    /// CNG key usage property; 0 when unset.
    pub key_usage_property: u32,
    /// SDDL applied to the private key; empty when unset.
    pub key_permissions: String,
    /// Public key algorithm OID.
    pub key_algorithm: String,
    /// Cryptographic providers in priority order.
    pub crypto_providers: Vec<String>,
    /// Major revision (`revision`).
    pub major_revision: u32,
    /// Minor revision.
    pub minor_revision: u32,
    /// Common names of superseded templates.
    pub superseded_templates: Vec<String>,
    /// `msPKI-Private-Key-Flag`.
    pub private_key_flags: u32,
    /// `msPKI-Certificate-Name-Flag`, signed as stored in the directory.
    pub subject_name_flags: i32,
    /// `msPKI-Enrollment-Flag`.
    pub enrollment_flags: u32,
    /// `flags`.
    pub general_flags: u32,
    /// Hash algorithm OID.
    pub hash_algorithm: String,
    /// Number of RA signatures required.
    pub ra_signatures: u32,
    /// Application policy the RA signing certificate must carry.
    pub ra_application_policy: Option<String>,
    /// Issuance policies the RA signing certificate must carry.
    pub ra_certificate_policies: Vec<String>,
    /// Key archival settings, when archival is required.
    pub key_archival: Option<KeyArchival>,
    /// Extensions placed in issued certificates.
    pub extensions: Vec<TemplateExtension>,
}

impl Default for PolicyTemplate {
    fn default() -> Self {
        Self {
            common_name: String::new(),
            display_name: String::new(),
            oid: String::new(),
            schema_version: 1,
            validity_period: "1 years".to_string(),
            renewal_period: "6 weeks".to_string(),
            permission: Permission::default(),
            minimal_key_length: 2048,
            key_spec: 1,
            key_usage_property: 0,
            key_permissions: String::new(),
            key_algorithm: RSA.to_string(),
            crypto_providers: Vec::new(),
            major_revision: 100,
            minor_revision: 0,
            superseded_templates: Vec::new(),
            private_key_flags: 0,
            subject_name_flags: 0,
            enrollment_flags: 0,
            general_flags: 0,
            hash_algorithm: SHA1.to_string(),
            ra_signatures: 0,
            ra_application_policy: None,
            ra_certificate_policies: Vec::new(),
            key_archival: None,
            extensions: Vec::new(),
        }
    }
}

impl PolicyTemplate {
    /// Build a template from its directory attributes.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::MissingInput`] when `cn`/`name` or
    ///   `msPKI-Cert-Template-OID` is absent.
    /// - [`TemplateError::TypeCoercion`] when a numeric attribute is not numeric.
    /// - [`TemplateError::Format`] for malformed periods, CNG settings or OIDs.
    /// - [`TemplateError::Range`] for a period that is not a whole number of hours.
    pub fn from_attributes(attrs: &AttributeMap) -> Result<Self> {
        let defaults = Self::default();

        let common_name = attrs
            .get_str("cn")
            .or_else(|| attrs.get_str("name"))
            .ok_or_else(|| TemplateError::missing_input("template attribute 'cn'"))?
            .to_string();
        let oid = attrs
            .get_str("msPKI-Cert-Template-OID")
            .ok_or_else(|| {
                TemplateError::missing_input(format!(
                    "msPKI-Cert-Template-OID for template '{common_name}'"
                ))
            })?
            .to_string();
        let display_name = attrs
            .get_str("displayName")
            .unwrap_or(&common_name)
            .to_string();

        let cng = attrs
            .get_strings("msPKI-RA-Application-Policies")
            .iter()
            .map(|v| CngSettings::parse(v))
            .try_fold(CngSettings::default(), |acc, parsed| {
                parsed.map(|p| merge_cng(acc, p))
            })?;

        let private_key_flags = flag_bits(attrs, "msPKI-Private-Key-Flag")?;
        let major_revision = unsigned(attrs, "revision")?.unwrap_or(defaults.major_revision);
        let minor_revision = unsigned(attrs, "msPKI-Template-Minor-Revision")?.unwrap_or(0);

        let key_archival = if private_key_flags & CT_FLAG_REQUIRE_PRIVATE_KEY_ARCHIVAL != 0 {
            Some(KeyArchival {
                symmetric_algorithm: match &cng.symmetric_algorithm {
                    Some(name) => cng::symmetric_algorithm_oid(name)?,
                    None => DES_EDE3_CBC.to_string(),
                },
                key_length: cng.symmetric_key_length.unwrap_or(DEFAULT_ARCHIVAL_KEY_LENGTH),
            })
        } else {
            None
        };

        let extensions = build_extensions(attrs, &oid, major_revision, minor_revision)?;

        Ok(Self {
            schema_version: unsigned(attrs, "msPKI-Template-Schema-Version")?
                .unwrap_or(defaults.schema_version),
            validity_period: period_text(attrs, "pKIExpirationPeriod")?
                .unwrap_or(defaults.validity_period),
            renewal_period: period_text(attrs, "pKIOverlapPeriod")?
                .unwrap_or(defaults.renewal_period),
            permission: Permission::default(),
            minimal_key_length: unsigned(attrs, "msPKI-Minimal-Key-Size")?
                .unwrap_or(defaults.minimal_key_length),
            key_spec: unsigned(attrs, "pKIDefaultKeySpec")?.unwrap_or(defaults.key_spec),
            key_usage_property: cng.key_usage.unwrap_or(0),
            key_permissions: cng.key_security_descriptor.clone().unwrap_or_default(),
            key_algorithm: match &cng.asymmetric_algorithm {
                Some(name) => cng::asymmetric_algorithm_oid(name)?,
                None => defaults.key_algorithm,
            },
            crypto_providers: crypto_providers(&attrs.get_strings("pKIDefaultCSPs")),
            major_revision,
            minor_revision,
            superseded_templates: attrs.get_strings("msPKI-Supersede-Templates"),
            private_key_flags,
            subject_name_flags: flag_bits(attrs, "msPKI-Certificate-Name-Flag")? as i32,
            enrollment_flags: flag_bits(attrs, "msPKI-Enrollment-Flag")?,
            general_flags: flag_bits(attrs, "flags")?,
            hash_algorithm: match &cng.hash_algorithm {
                Some(name) => cng::hash_algorithm_oid(name)?,
                None => defaults.hash_algorithm,
            },
            ra_signatures: unsigned(attrs, "msPKI-RA-Signature")?.unwrap_or(0),
            ra_application_policy: cng.ra_application_policy.clone(),
            ra_certificate_policies: attrs.get_strings("msPKI-RA-Policies"),
            key_archival,
            extensions,
            common_name,
            display_name,
            oid,
        })
    }
}

fn merge_cng(mut acc: CngSettings, next: CngSettings) -> CngSettings {
    acc.asymmetric_algorithm = next.asymmetric_algorithm.or(acc.asymmetric_algorithm);
    acc.hash_algorithm = next.hash_algorithm.or(acc.hash_algorithm);
    acc.key_security_descriptor = next.key_security_descriptor.or(acc.key_security_descriptor);
    acc.ra_application_policy = next.ra_application_policy.or(acc.ra_application_policy);
    acc.key_usage = next.key_usage.or(acc.key_usage);
    acc.symmetric_algorithm = next.symmetric_algorithm.or(acc.symmetric_algorithm);
    acc.symmetric_key_length = next.symmetric_key_length.or(acc.symmetric_key_length);
    acc
}

fn unsigned(attrs: &AttributeMap, name: &str) -> Result<Option<u32>> {
    attrs
        .get_int(name)?
        .map(|v| {
            u32::try_from(v).map_err(|_| {
                TemplateError::type_coercion(name, "unsigned 32-bit integer", v.to_string())
            })
        })
        .transpose()
}

/// Flag words are 32-bit and may be stored signed or unsigned.
fn flag_bits(attrs: &AttributeMap, name: &str) -> Result<u32> {
    attrs
        .get(name)
        .map(|value| coerce_word(name, value))
        .transpose()
        .map(|word| word.unwrap_or(0) as u32)
}

fn period_text(attrs: &AttributeMap, name: &str) -> Result<Option<String>> {
    attrs
        .get_bytes(name)
        .map(|bytes| period_from_bytes(bytes).and_then(format_duration))
        .transpose()
}

/// Order `"<priority>,<provider>"` entries by priority and strip the prefix.
fn crypto_providers(entries: &[String]) -> Vec<String> {
    let mut ranked: Vec<(u32, String)> = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.split_once(',') {
            Some((priority, provider)) => match priority.trim().parse() {
                Ok(priority) => ranked.push((priority, provider.trim().to_string())),
                Err(_) => warn!(entry = %entry, "ignoring CSP entry with invalid priority"),
            },
            None => ranked.push((u32::MAX, entry.trim().to_string())),
        }
    }
    ranked.sort_by_key(|(priority, _)| *priority);
    ranked.into_iter().map(|(_, provider)| provider).collect()
}

fn build_extensions(
    attrs: &AttributeMap,
    template_oid: &str,
    major: u32,
    minor: u32,
) -> Result<Vec<TemplateExtension>> {
    let critical: BTreeSet<String> = attrs.get_strings("pKICriticalExtensions").into_iter().collect();
    let is_critical = |oid: &str| critical.contains(oid);
    let mut out = Vec::new();

    out.push(extensions::template_info(
        template_oid,
        major,
        minor,
        is_critical("1.3.6.1.4.1.311.21.7"),
    )?);

    let eku = attrs.get_strings("pKIExtendedKeyUsage");
    if !eku.is_empty() {
        out.push(extensions::extended_key_usage(&eku, is_critical("2.5.29.37"))?);
    }

    let app_policies = attrs.get_strings("msPKI-Certificate-Application-Policy");
    if !app_policies.is_empty() {
        out.push(extensions::application_policies(
            &app_policies,
            is_critical("1.3.6.1.4.1.311.21.10"),
        )?);
    }

    if let Some(bits) = attrs.get_bytes("pKIKeyUsage") {
        if let Some(ext) = extensions::key_usage(bits, is_critical("2.5.29.15"))? {
            out.push(ext);
        }
    }

    let policies = attrs.get_strings("msPKI-Certificate-Policy");
    if !policies.is_empty() {
        out.push(extensions::certificate_policies(&policies, is_critical("2.5.29.32"))?);
    }

    Ok(out)
}
