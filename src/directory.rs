// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Template directory abstraction.
//!
//! Binding to a domain controller and locating the certificate template
//! container happen outside this crate. Callers plug their directory client
//! in through [`TemplateDirectory`]; [`InMemoryDirectory`] is a map-backed
//! implementation that records every write, for tests and dry runs.
//!
//! # Example
//!
//! ```
//! use adcs_templates::attributes::AttributeMap;
//! use adcs_templates::directory::{InMemoryDirectory, TemplateDirectory, apply};
//! use adcs_templates::reconcile::Reconciliation;
//!
//! let directory = InMemoryDirectory::new();
//! directory.insert_template("WebServer2", AttributeMap::new().with("flags", 131_648));
//!
//! let mut plan = Reconciliation::default();
//! plan.replace.insert("flags", 131_649);
//! apply(&directory, "WebServer2", &plan).unwrap();
//!
//! let stored = directory.read_template("WebServer2").unwrap();
//! assert_eq!(stored.get_int("flags").unwrap(), Some(131_649));
//! assert_eq!(directory.writes().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::attributes::AttributeMap;
use crate::error::{Result, TemplateError};
use crate::reconcile::Reconciliation;

/// Read and write access to certificate template objects.
///
/// Calls are synchronous; retries and timeouts belong to the implementation.
pub trait TemplateDirectory: Send + Sync {
    /// Read the projected attribute set of a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] when no template has that name.
    fn read_template(&self, name: &str) -> Result<AttributeMap>;

    /// Overwrite the given attributes with new values.
    fn replace_attributes(&self, name: &str, attributes: &AttributeMap) -> Result<()>;

    /// Remove all values of the given attributes.
    fn clear_attributes(&self, name: &str, attributes: &BTreeSet<String>) -> Result<()>;
}

/// Apply a reconciliation to one template.
///
/// The replace call is issued only when there is something to replace, and
/// the clear call only when there is something to clear, so an empty
/// reconciliation touches nothing.
pub fn apply(
    directory: &dyn TemplateDirectory,
    name: &str,
    reconciliation: &Reconciliation,
) -> Result<()> {
    if !reconciliation.replace.is_empty() {
        directory.replace_attributes(name, &reconciliation.replace)?;
        info!(
            template = name,
            count = reconciliation.replace.len(),
            "Replaced template attributes"
        );
    }

    if !reconciliation.clear.is_empty() {
        directory.clear_attributes(name, &reconciliation.clear)?;
        info!(
            template = name,
            count = reconciliation.clear.len(),
            "Cleared template attributes"
        );
    }

    Ok(())
}

/// A write issued against an [`InMemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryWrite {
    /// `replace_attributes` call.
    Replace {
        /// Template name.
        template: String,
        /// Attributes written.
        attributes: AttributeMap,
    },
    /// `clear_attributes` call.
    Clear {
        /// Template name.
        template: String,
        /// Attributes cleared.
        attributes: BTreeSet<String>,
    },
}

/// Map-backed [`TemplateDirectory`].
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    templates: Arc<RwLock<BTreeMap<String, AttributeMap>>>,
    writes: Arc<RwLock<Vec<DirectoryWrite>>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a template, replacing any previous one with the same name.
    pub fn insert_template(&self, name: impl Into<String>, attributes: AttributeMap) {
        write_lock(&self.templates).insert(name.into(), attributes);
    }

    /// Names of the stored templates.
    pub fn template_names(&self) -> Vec<String> {
        read_lock(&self.templates).keys().cloned().collect()
    }

    /// Every write issued so far, oldest first.
    pub fn writes(&self) -> Vec<DirectoryWrite> {
        read_lock(&self.writes).clone()
    }
}

impl TemplateDirectory for InMemoryDirectory {
    fn read_template(&self, name: &str) -> Result<AttributeMap> {
        read_lock(&self.templates)
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::not_found(name))
    }

    fn replace_attributes(&self, name: &str, attributes: &AttributeMap) -> Result<()> {
        {
            let mut templates = write_lock(&self.templates);
            let stored = templates
                .get_mut(name)
                .ok_or_else(|| TemplateError::not_found(name))?;
            for (attribute, value) in attributes.iter() {
                stored.insert(attribute, value.clone());
            }
        }

        write_lock(&self.writes).push(DirectoryWrite::Replace {
            template: name.to_string(),
            attributes: attributes.clone(),
        });
        Ok(())
    }

    fn clear_attributes(&self, name: &str, attributes: &BTreeSet<String>) -> Result<()> {
        {
            let mut templates = write_lock(&self.templates);
            let stored = templates
                .get_mut(name)
                .ok_or_else(|| TemplateError::not_found(name))?;
            for attribute in attributes {
                stored.remove(attribute);
            }
        }

        write_lock(&self.writes).push(DirectoryWrite::Clear {
            template: name.to_string(),
            attributes: attributes.clone(),
        });
        Ok(())
    }
}

// A panicked writer leaves the maps in a consistent state, so poisoning is ignored.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.insert_template(
            "WebServer2",
            AttributeMap::new()
                .with("flags", 131_648)
                .with("pKIExtendedKeyUsage", vec!["1.3.6.1.5.5.7.3.1"]),
        );
        directory
    }

    #[test]
    fn test_read_missing_template() {
        let err = directory().read_template("Nope").unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[test]
    fn test_empty_reconciliation_issues_no_calls() {
        let directory = directory();
        apply(&directory, "WebServer2", &Reconciliation::default()).unwrap();
        assert!(directory.writes().is_empty());
    }

    #[test]
    fn test_apply_replace_only() {
        let directory = directory();
        let mut plan = Reconciliation::default();
        plan.replace.insert("flags", 131_649);

        apply(&directory, "WebServer2", &plan).unwrap();

        let writes = directory.writes();
        assert_eq!(writes.len(), 1);
        assert!(matches!(&writes[0], DirectoryWrite::Replace { template, .. } if template == "WebServer2"));
        let stored = directory.read_template("WebServer2").unwrap();
        assert_eq!(stored.get_int("flags").unwrap(), Some(131_649));
    }

    #[test]
    fn test_apply_replace_then_clear() {
        let directory = directory();
        let mut plan = Reconciliation::default();
        plan.replace.insert("flags", 0);
        plan.clear.insert("pKIExtendedKeyUsage".to_string());

        apply(&directory, "WebServer2", &plan).unwrap();

        let writes = directory.writes();
        assert_eq!(writes.len(), 2);
        assert!(matches!(writes[0], DirectoryWrite::Replace { .. }));
        assert!(matches!(writes[1], DirectoryWrite::Clear { .. }));
        assert!(!directory.read_template("WebServer2").unwrap().contains("pKIExtendedKeyUsage"));
    }

    #[test]
    fn test_write_to_missing_template() {
        let directory = directory();
        let mut plan = Reconciliation::default();
        plan.clear.insert("flags".to_string());

        let err = apply(&directory, "Missing", &plan).unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
        assert!(directory.writes().is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let directory = directory();
        let other = directory.clone();
        other.insert_template("User", AttributeMap::new());
        assert_eq!(directory.template_names(), vec!["User", "WebServer2"]);
    }
}
