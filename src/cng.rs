// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! CNG template settings.
//!
//! Schema version 3 and later templates pack their key-provider settings into
//! `msPKI-RA-Application-Policies` as backtick-separated
//! `name`TYPE`value` triples:
//!
//! ```text
//! msPKI-Asymmetric-Algorithm`PZPWSTR`RSA`msPKI-Hash-Algorithm`PZPWSTR`SHA256`msPKI-Key-Usage`DWORD`16777215`
//! ```
//!
//! Older templates store a plain OID in the same attribute, which is the
//! RA application policy.

use tracing::warn;

use crate::error::{Result, TemplateError};

/// Settings decoded from a CNG composite value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CngSettings {
    /// Asymmetric algorithm name (`RSA`, `ECDSA_P256`, ...).
    pub asymmetric_algorithm: Option<String>,
    /// Hash algorithm name (`SHA256`, ...).
    pub hash_algorithm: Option<String>,
    /// SDDL applied to the private key.
    pub key_security_descriptor: Option<String>,
    /// RA application policy OID.
    pub ra_application_policy: Option<String>,
    /// CNG key usage property.
    pub key_usage: Option<u32>,
    /// Key archival symmetric algorithm name.
    pub symmetric_algorithm: Option<String>,
    /// Key archival symmetric key length in bits.
    pub symmetric_key_length: Option<u32>,
}

impl CngSettings {
    /// Parse an `msPKI-RA-Application-Policies` value.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Format`] when the composite is truncated or a
    /// `DWORD` value is not a number.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::default());
        }

        if !value.contains('`') {
            return Ok(Self {
                ra_application_policy: Some(value.to_string()),
                ..Self::default()
            });
        }

        let tokens: Vec<&str> = value.trim_end_matches('`').split('`').collect();
        if tokens.len() % 3 != 0 {
            return Err(TemplateError::format(format!(
                "Truncated CNG settings: {} fields is not a multiple of 3",
                tokens.len()
            )));
        }

        let mut settings = Self::default();
        for triple in tokens.chunks_exact(3) {
            let (name, kind, raw) = (triple[0], triple[1], triple[2]);

            match name {
                "msPKI-Asymmetric-Algorithm" => {
                    settings.asymmetric_algorithm = Some(raw.to_string());
                }
                "msPKI-Hash-Algorithm" => settings.hash_algorithm = Some(raw.to_string()),
                "msPKI-Key-Security-Descriptor" => {
                    settings.key_security_descriptor = Some(raw.to_string());
                }
                "msPKI-RA-Application-Policies" => {
                    settings.ra_application_policy = Some(raw.to_string());
                }
                "msPKI-Key-Usage" => settings.key_usage = Some(parse_dword(name, kind, raw)?),
                "msPKI-Symmetric-Algorithm" => {
                    settings.symmetric_algorithm = Some(raw.to_string());
                }
                "msPKI-Symmetric-Key-Length" => {
                    settings.symmetric_key_length = Some(parse_dword(name, kind, raw)?);
                }
                other => warn!(setting = other, "ignoring unknown CNG template setting"),
            }
        }

        Ok(settings)
    }
}

fn parse_dword(name: &str, kind: &str, raw: &str) -> Result<u32> {
    if kind != "DWORD" {
        return Err(TemplateError::format(format!(
            "CNG setting {name} has type {kind}, expected DWORD"
        )));
    }
    raw.parse()
        .map_err(|_| TemplateError::format(format!("CNG setting {name} is not a DWORD: '{raw}'")))
}

/// OID of an asymmetric algorithm name. Dotted OIDs pass through.
pub fn asymmetric_algorithm_oid(name: &str) -> Result<String> {
    let oid = match name.to_ascii_uppercase().as_str() {
        "RSA" => "1.2.840.113549.1.1.1",
        "ECDSA_P256" | "ECDH_P256" => "1.2.840.10045.3.1.7",
        "ECDSA_P384" | "ECDH_P384" => "1.3.132.0.34",
        "ECDSA_P521" | "ECDH_P521" => "1.3.132.0.35",
        "ECC" | "ECDSA" | "ECDH" => "1.2.840.10045.2.1",
        _ => return passthrough(name, "asymmetric"),
    };
    Ok(oid.to_string())
}

/// OID of a hash algorithm name. Dotted OIDs pass through.
pub fn hash_algorithm_oid(name: &str) -> Result<String> {
    let oid = match name.to_ascii_uppercase().as_str() {
        "MD5" => "1.2.840.113549.2.5",
        "SHA1" => "1.3.14.3.2.26",
        "SHA256" => "2.16.840.1.101.3.4.2.1",
        "SHA384" => "2.16.840.1.101.3.4.2.2",
        "SHA512" => "2.16.840.1.101.3.4.2.3",
        _ => return passthrough(name, "hash"),
    };
    Ok(oid.to_string())
}

/// OID of a symmetric algorithm name. Dotted OIDs pass through.
pub fn symmetric_algorithm_oid(name: &str) -> Result<String> {
    let oid = match name.to_ascii_uppercase().as_str() {
        "3DES" => "1.2.840.113549.3.7",
        "AES128" | "AES" => "2.16.840.1.101.3.4.1.2",
        "AES192" => "2.16.840.1.101.3.4.1.22",
        "AES256" => "2.16.840.1.101.3.4.1.42",
        _ => return passthrough(name, "symmetric"),
    };
    Ok(oid.to_string())
}

fn passthrough(name: &str, family: &str) -> Result<String> {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        Ok(name.to_string())
    } else {
        Err(TemplateError::format(format!(
            "Unknown {family} algorithm '{name}'"
        )))
    }
}
