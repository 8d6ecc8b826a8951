// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Bring a directory template to a desired state.
//!
//! One synchronization reads the live template, restricts both sides to the
//! directory projection, drops protected attributes, diffs, partitions the
//! differences into replace and clear operations and writes them.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::attributes::AttributeMap;
use crate::config::SyncSettings;
use crate::diff::{ChangeSet, diff};
use crate::directory::{TemplateDirectory, apply};
use crate::error::Result;
use crate::reconcile::{Reconciliation, reconcile};

/// Result of synchronizing one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Template name.
    pub template: String,
    /// Attributes that differ, with their desired values.
    pub changes: ChangeSet,
    /// Directory writes derived from `changes`.
    pub reconciliation: Reconciliation,
    /// Whether the writes were issued.
    pub applied: bool,
}

impl SyncOutcome {
    /// Returns true if the template already matched.
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Synchronizes templates in a [`TemplateDirectory`].
#[derive(Debug)]
pub struct TemplateSynchronizer<D> {
    directory: D,
    dry_run: bool,
    protected: BTreeSet<String>,
}

impl<D: TemplateDirectory> TemplateSynchronizer<D> {
    /// Create a synchronizer that writes changes.
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            dry_run: false,
            protected: BTreeSet::new(),
        }
    }

    /// Create a synchronizer from the `[sync]` configuration section.
    pub fn from_settings(directory: D, settings: &SyncSettings) -> Self {
        Self::new(directory)
            .with_dry_run(settings.dry_run)
            .with_protected(settings.protected_attributes.iter().cloned())
    }

    /// Compute changes without writing them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Attributes never written.
    pub fn with_protected(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.protected.extend(names);
        self
    }

    /// The underlying directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Compute the changes for `name` without writing, regardless of dry-run.
    pub fn plan(&self, name: &str, desired: &AttributeMap) -> Result<SyncOutcome> {
        let current = self.directory.read_template(name)?;
        let changes = diff(&self.restrict(&current), &self.restrict(desired))?;
        let reconciliation = reconcile(&changes);

        debug!(
            template = name,
            changes = changes.len(),
            replace = reconciliation.replace.len(),
            clear = reconciliation.clear.len(),
            "Planned template synchronization"
        );

        Ok(SyncOutcome {
            template: name.to_string(),
            changes,
            reconciliation,
            applied: false,
        })
    }

    /// Bring `name` to the desired state.
    ///
    /// # Errors
    ///
    /// - [`crate::TemplateError::NotFound`] when the template does not exist.
    /// - [`crate::TemplateError::TypeCoercion`] when a desired value cannot be
    ///   compared.
    /// - Any error from the directory writes.
    pub fn sync(&self, name: &str, desired: &AttributeMap) -> Result<SyncOutcome> {
        let mut outcome = self.plan(name, desired)?;

        if outcome.reconciliation.is_empty() {
            info!(template = name, "Template is up to date");
            return Ok(outcome);
        }

        if self.dry_run {
            info!(
                template = name,
                changes = outcome.changes.len(),
                "Dry run, not writing template changes"
            );
            return Ok(outcome);
        }

        apply(&self.directory, name, &outcome.reconciliation)?;
        outcome.applied = true;
        info!(
            template = name,
            replaced = outcome.reconciliation.replace.len(),
            cleared = outcome.reconciliation.clear.len(),
            "Synchronized template"
        );

        Ok(outcome)
    }

    fn restrict(&self, attributes: &AttributeMap) -> AttributeMap {
        let mut projected = attributes.projected();
        for name in &self.protected {
            projected.remove(name);
        }
        projected
    }
}
