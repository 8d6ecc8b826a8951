// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! OID interning registry for policy documents.
//!
//! A policy document refers to every object identifier through a small
//! integer, and lists each identifier once in its `oIDs` table. The
//! [`OidRegistry`] hands out those references in first-seen order.
//!
//! A registry belongs to one serialization pass. Create a fresh one for each
//! document; two documents built from the same templates with fresh
//! registries are identical.
//!
//! # Groups
//!
//! | Group | ID |
//! |-------|----|
//! | Hash | 1 |
//! | Encryption | 2 |
//! | PublicKey | 3 |
//! | Signing | 4 |
//! | RDN | 5 |
//! | Extension | 6 |
//! | EKU | 7 |
//! | CertificatePolicy | 8 |
//! | Enrollment | 9 |

use std::collections::HashMap;
use std::fmt;

use const_oid::ObjectIdentifier;

use crate::error::{Result, TemplateError};

/// RSA public key algorithm; the default key algorithm of a template.
pub const RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// SHA-1; the default hash algorithm of a template.
pub const SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");

/// Triple DES; the default key archival algorithm.
pub const DES_EDE3_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.7");

/// Key Usage extension.
pub const EXT_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");

/// Certificate Policies extension.
pub const EXT_CERTIFICATE_POLICIES: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32");

/// Extended Key Usage extension.
pub const EXT_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");

/// Certificate Template Information (v2) extension.
pub const EXT_TEMPLATE_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.21.7");

/// Application Policies extension.
pub const EXT_APPLICATION_POLICIES: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.21.10");

/// Semantic role of an OID in the policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OidGroup {
    /// Hash algorithm.
    Hash,
    /// Symmetric encryption algorithm.
    Encryption,
    /// Public key algorithm.
    PublicKey,
    /// Signature algorithm.
    Signing,
    /// Relative distinguished name attribute.
    Rdn,
    /// Certificate extension.
    Extension,
    /// Extended key usage.
    Eku,
    /// Certificate (issuance) policy.
    CertificatePolicy,
    /// Certificate template.
    Enrollment,
}

impl OidGroup {
    /// Numeric group identifier used in the policy document.
    pub fn id(&self) -> u32 {
        match self {
            Self::Hash => 1,
            Self::Encryption => 2,
            Self::PublicKey => 3,
            Self::Signing => 4,
            Self::Rdn => 5,
            Self::Extension => 6,
            Self::Eku => 7,
            Self::CertificatePolicy => 8,
            Self::Enrollment => 9,
        }
    }
}

impl fmt::Display for OidGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "Hash"),
            Self::Encryption => write!(f, "Encryption"),
            Self::PublicKey => write!(f, "PublicKey"),
            Self::Signing => write!(f, "Signing"),
            Self::Rdn => write!(f, "RDN"),
            Self::Extension => write!(f, "Extension"),
            Self::Eku => write!(f, "EKU"),
            Self::CertificatePolicy => write!(f, "CertificatePolicy"),
            Self::Enrollment => write!(f, "Enrollment"),
        }
    }
}

/// One interned identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidEntry {
    /// Dotted-decimal value.
    pub value: String,
    /// Group from the first registration.
    pub group: OidGroup,
    /// Friendly name from the first registration.
    pub name: String,
    /// 1-based reference.
    pub reference_id: u32,
}

/// Deduplicating OID table scoped to one serialization pass.
#[derive(Debug, Clone, Default)]
pub struct OidRegistry {
    entries: Vec<OidEntry>,
    index: HashMap<String, u32>,
}

impl OidRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the reference for `value`, registering it on first sight.
    ///
    /// Only the value is used for lookup; the group and name of later calls
    /// with an already interned value are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Format`] when `value` is not a valid
    /// dotted-decimal OID.
    pub fn intern(&mut self, value: &str, group: OidGroup, name: &str) -> Result<u32> {
        if let Some(&reference_id) = self.index.get(value) {
            return Ok(reference_id);
        }

        ObjectIdentifier::new(value)
            .map_err(|e| TemplateError::format(format!("Malformed OID '{value}': {e}")))?;

        let reference_id = self.next_reference()?;
        self.entries.push(OidEntry {
            value: value.to_string(),
            group,
            name: name.to_string(),
            reference_id,
        });
        self.index.insert(value.to_string(), reference_id);

        Ok(reference_id)
    }

    /// Intern using the well-known friendly name, falling back to the value.
    pub fn intern_well_known(&mut self, value: &str, group: OidGroup) -> Result<u32> {
        let name = well_known_name(value).unwrap_or(value);
        self.intern(value, group, name)
    }

    /// Reference for an already interned value.
    pub fn reference(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Entry for an already interned value.
    pub fn get(&self, value: &str) -> Option<&OidEntry> {
        self.reference(value)
            .and_then(|id| self.entries.get(id as usize - 1))
    }

    /// All entries in reference order.
    pub fn entries(&self) -> &[OidEntry] {
        &self.entries
    }

    /// Number of interned values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_reference(&self) -> Result<u32> {
        u32::try_from(self.entries.len() + 1)
            .map_err(|_| TemplateError::range("OID registry is full"))
    }
}

/// Friendly name of a well-known OID.
pub fn well_known_name(value: &str) -> Option<&'static str> {
    let name = match value {
        // Public key algorithms
        "1.2.840.113549.1.1.1" => "RSA",
        "1.2.840.10045.2.1" => "ECC",
        "1.2.840.10045.3.1.7" => "ECDSA_P256",
        "1.3.132.0.34" => "ECDSA_P384",
        "1.3.132.0.35" => "ECDSA_P521",
        // Hash algorithms
        "1.2.840.113549.2.5" => "md5",
        "1.3.14.3.2.26" => "sha1",
        "2.16.840.1.101.3.4.2.1" => "sha256",
        "2.16.840.1.101.3.4.2.2" => "sha384",
        "2.16.840.1.101.3.4.2.3" => "sha512",
        // Symmetric algorithms
        "1.2.840.113549.3.7" => "3des",
        "2.16.840.1.101.3.4.1.2" => "aes128",
        "2.16.840.1.101.3.4.1.22" => "aes192",
        "2.16.840.1.101.3.4.1.42" => "aes256",
        // Extensions
        "2.5.29.15" => "Key Usage",
        "2.5.29.32" => "Certificate Policies",
        "2.5.29.37" => "Enhanced Key Usage",
        "1.3.6.1.4.1.311.20.2" => "Certificate Template Name",
        "1.3.6.1.4.1.311.21.7" => "Certificate Template Information",
        "1.3.6.1.4.1.311.21.10" => "Application Policies",
        // Key purposes and policies
        "1.3.6.1.5.5.7.3.1" => "Server Authentication",
        "1.3.6.1.5.5.7.3.2" => "Client Authentication",
        "1.3.6.1.5.5.7.3.3" => "Code Signing",
        "1.3.6.1.5.5.7.3.4" => "Secure Email",
        "1.3.6.1.4.1.311.10.3.4" => "Encrypting File System",
        "1.3.6.1.4.1.311.20.2.1" => "Certificate Request Agent",
        "1.3.6.1.4.1.311.20.2.2" => "Smart Card Logon",
        "2.5.29.32.0" => "All Issuance Policies",
        _ => return None,
    };
    Some(name)
}
