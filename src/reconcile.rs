// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Split a change-set into replace and clear operations.
//!
//! The directory write primitive has separate "set value" and "remove value"
//! operations that cannot be combined into one request, so every change is
//! routed to exactly one of the two.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::attributes::AttributeMap;
use crate::diff::ChangeSet;

/// Directory writes needed to apply a change-set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Attributes to overwrite with a new value.
    pub replace: AttributeMap,
    /// Attributes to remove.
    pub clear: BTreeSet<String>,
}

impl Reconciliation {
    /// Returns true if there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty() && self.clear.is_empty()
    }

    /// Total number of attributes touched.
    pub fn len(&self) -> usize {
        self.replace.len() + self.clear.len()
    }
}

/// Partition a change-set.
///
/// Entries whose recorded value is empty (blank string, empty list, empty
/// bytes) are cleared; everything else is replaced. This never fails.
pub fn reconcile(changes: &ChangeSet) -> Reconciliation {
    let mut reconciliation = Reconciliation::default();

    for (name, value) in changes.iter() {
        if value.is_empty() {
            reconciliation.clear.insert(name.to_string());
        } else {
            reconciliation.replace.insert(name, value.clone());
        }
    }

    reconciliation
}
