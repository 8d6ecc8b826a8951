// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Per-attribute comparison policy.
//!
//! Every template attribute name resolves to exactly one [`ComparePolicy`].
//! The table is static configuration; names not listed fall into
//! [`ComparePolicy::Default`].

use std::fmt;

/// How two values of an attribute are compared and what a difference records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparePolicy {
    /// Compared as integers after coercion.
    ScalarInt,
    /// Compared as an unordered set of strings.
    MultiOid,
    /// Compared as raw bytes; skipped unless both sides are present.
    ByteSeq,
    /// Trimmed, case-sensitive string comparison; equality otherwise.
    Default,
}

/// Integer-valued template attributes.
pub const SCALAR_INT_ATTRIBUTES: &[&str] = &[
    "flags",
    "msPKI-Certificate-Name-Flag",
    "msPKI-Enrollment-Flag",
    "msPKI-Minimal-Key-Size",
    "msPKI-Private-Key-Flag",
    "msPKI-Template-Minor-Revision",
    "msPKI-Template-Schema-Version",
    "msPKI-RA-Signature",
    "pKIMaxIssuingDepth",
    "pKIDefaultKeySpec",
    "revision",
];

/// Multi-valued string/OID attributes.
pub const MULTI_OID_ATTRIBUTES: &[&str] = &[
    "msPKI-Certificate-Application-Policy",
    "pKICriticalExtensions",
    "pKIDefaultCSPs",
    "pKIExtendedKeyUsage",
    "msPKI-Certificate-Policy",
];

/// Octet-string attributes.
pub const BYTE_SEQ_ATTRIBUTES: &[&str] = &["pKIExpirationPeriod", "pKIKeyUsage", "pKIOverlapPeriod"];

/// Attributes always included in the directory projection.
const PROJECTED_BASE_ATTRIBUTES: &[&str] = &["name", "displayName", "objectClass", "flags", "revision"];

impl ComparePolicy {
    /// Resolve the policy for an attribute name.
    ///
    /// Classes are checked in priority order: integer, multi-valued OID,
    /// byte sequence, then default.
    pub fn for_attribute(name: &str) -> Self {
        if SCALAR_INT_ATTRIBUTES.contains(&name) {
            Self::ScalarInt
        } else if MULTI_OID_ATTRIBUTES.contains(&name) {
            Self::MultiOid
        } else if BYTE_SEQ_ATTRIBUTES.contains(&name) {
            Self::ByteSeq
        } else {
            Self::Default
        }
    }

    /// Human-readable name of the comparison type.
    pub fn expected_type(&self) -> &'static str {
        match self {
            Self::ScalarInt => "integer",
            Self::MultiOid => "string list",
            Self::ByteSeq => "byte sequence",
            Self::Default => "value",
        }
    }
}

impl fmt::Display for ComparePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScalarInt => write!(f, "scalar-int"),
            Self::MultiOid => write!(f, "multi-oid"),
            Self::ByteSeq => write!(f, "byte-seq"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Whether an attribute belongs to the template projection read from the directory.
///
/// The projection is the base attribute set plus every PKI-related attribute,
/// excluding OID-related ones (`msPKI-Cert-Template-OID` is never written back).
pub fn is_projected(name: &str) -> bool {
    if PROJECTED_BASE_ATTRIBUTES.contains(&name) {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    lower.contains("pki") && !lower.contains("oid")
}
