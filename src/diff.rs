// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Attribute differ.
//!
//! [`diff`] walks the union of attribute names from the current and desired
//! templates and records, for every attribute that differs semantically, the
//! value that should be written. An attribute that should be removed is
//! recorded with the empty value of its type; the reconciler later routes
//! those entries to a clear operation.
//!
//! Comparison follows the attribute's [`ComparePolicy`]:
//!
//! - **ScalarInt**: integers after coercion; missing is `0`.
//! - **MultiOid**: unordered string sets; the desired list is recorded verbatim.
//! - **ByteSeq**: raw bytes, compared only when both sides are present.
//! - **Default**: strings after trimming whitespace, case-sensitively;
//!   other values by equality.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::attributes::{AttributeMap, AttributeValue, coerce_word};
use crate::classify::ComparePolicy;
use crate::error::{Result, TemplateError};

/// Attributes whose current and desired values differ, with the value to write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<String, AttributeValue>,
}

impl ChangeSet {
    /// Create an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change.
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.changes.insert(name.into(), value);
    }

    /// Recorded value for an attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.changes.get(name)
    }

    /// Changed attribute names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of changed attributes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// Compute the minimal change-set that moves `current` to `desired`.
///
/// # Errors
///
/// Returns [`TemplateError::TypeCoercion`] when a value cannot be coerced to
/// the comparison type of its attribute class. Missing attributes never fail.
///
/// # Examples
///
/// ```
/// use adcs_templates::attributes::{AttributeMap, AttributeValue};
/// use adcs_templates::diff::diff;
///
/// let current = AttributeMap::new().with("flags", 131648).with("displayName", "Old");
/// let desired = AttributeMap::new().with("flags", "131649").with("displayName", "Old ");
///
/// let changes = diff(&current, &desired).unwrap();
/// assert_eq!(changes.len(), 1);
/// assert_eq!(changes.get("flags"), Some(&AttributeValue::Int(131649)));
/// ```
pub fn diff(current: &AttributeMap, desired: &AttributeMap) -> Result<ChangeSet> {
    let names: BTreeSet<&str> = current.names().chain(desired.names()).collect();
    let mut changes = ChangeSet::new();

    for name in names {
        let policy = ComparePolicy::for_attribute(name);
        let recorded = compare(policy, name, current.get(name), desired.get(name))?;

        if let Some(value) = recorded {
            debug!(attribute = name, policy = %policy, value = %value, "attribute differs");
            changes.insert(name, value);
        }
    }

    Ok(changes)
}

/// Compare one attribute; returns the value to record when it differs.
fn compare(
    policy: ComparePolicy,
    name: &str,
    current: Option<&AttributeValue>,
    desired: Option<&AttributeValue>,
) -> Result<Option<AttributeValue>> {
    match policy {
        ComparePolicy::ScalarInt => {
            let current = current.map(|v| coerce_word(name, v)).transpose()?.unwrap_or(0);
            let desired = desired.map(|v| coerce_word(name, v)).transpose()?.unwrap_or(0);
            Ok((current != desired).then_some(AttributeValue::Int(i64::from(desired))))
        }
        ComparePolicy::MultiOid => {
            let current_set = string_set(name, current)?;
            let desired_set = string_set(name, desired)?;
            if current_set == desired_set {
                return Ok(None);
            }
            Ok(Some(
                desired
                    .cloned()
                    .unwrap_or_else(|| AttributeValue::StringList(Vec::new())),
            ))
        }
        ComparePolicy::ByteSeq => {
            let (Some(current), Some(desired)) = (current, desired) else {
                return Ok(None);
            };
            let current = bytes(name, current)?;
            let desired = bytes(name, desired)?;
            Ok((current != desired).then(|| AttributeValue::Bytes(desired.to_vec())))
        }
        ComparePolicy::Default => {
            let (current, desired) = match (current, desired) {
                (None, None) => return Ok(None),
                (Some(c), Some(d)) => (c.clone(), d.clone()),
                (Some(c), None) => (c.clone(), c.zero_like()),
                (None, Some(d)) => (d.zero_like(), d.clone()),
            };
            Ok((!default_equal(&current, &desired)).then_some(desired))
        }
    }
}

fn default_equal(a: &AttributeValue, b: &AttributeValue) -> bool {
    match (a, b) {
        // Case differences are real changes; only padding is ignored.
        (AttributeValue::String(a), AttributeValue::String(b)) => a.trim() == b.trim(),
        _ => a == b,
    }
}

fn string_set(name: &str, value: Option<&AttributeValue>) -> Result<BTreeSet<String>> {
    match value {
        None => Ok(BTreeSet::new()),
        Some(AttributeValue::StringList(items)) => Ok(items.iter().cloned().collect()),
        Some(AttributeValue::String(s)) if s.is_empty() => Ok(BTreeSet::new()),
        Some(AttributeValue::String(s)) => Ok(BTreeSet::from([s.clone()])),
        Some(AttributeValue::Int(i)) => Ok(BTreeSet::from([i.to_string()])),
        Some(AttributeValue::Bytes(_)) => Err(TemplateError::type_coercion(
            name,
            "string list",
            "byte sequence",
        )),
    }
}

fn bytes<'a>(name: &str, value: &'a AttributeValue) -> Result<&'a [u8]> {
    match value {
        AttributeValue::Bytes(b) => Ok(b),
        other => Err(TemplateError::type_coercion(
            name,
            "byte sequence",
            other.type_name(),
        )),
    }
}
