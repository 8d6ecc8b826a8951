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

//! # adcs-templates
//!
//! Reconciliation and publication of Active Directory Certificate Services
//! certificate templates.
//!
//! ## Features
//!
//! - **Type-aware diffing** of template attributes: flag words, OID lists,
//!   period byte arrays and SDDL strings each compare by their own rules
//! - **Replace/clear planning** that maps a change-set onto the two
//!   directory write primitives
//! - **Enrollment policy documents** (`GetPoliciesResponse`) with a
//!   deduplicated OID table
//! - **Duration codec** for `"<count> <unit>"` periods and the directory's
//!   100-nanosecond interval encoding
//!
//! ## Reconciling a template
//!
//! ```
//! use adcs_templates::attributes::{AttributeMap, AttributeValue};
//! use adcs_templates::{diff, reconcile};
//!
//! let current = AttributeMap::new()
//!     .with("flags", 131648)
//!     .with("displayName", "Old")
//!     .with("pKIExtendedKeyUsage", vec!["1.3.6.1.5.5.7.3.1"]);
//! let desired = AttributeMap::new()
//!     .with("flags", "131649")
//!     .with("displayName", "Old ");
//!
//! let changes = diff(&current, &desired)?;
//! let plan = reconcile(&changes);
//!
//! assert_eq!(plan.replace.get("flags"), Some(&AttributeValue::Int(131649)));
//! assert!(plan.clear.contains("pKIExtendedKeyUsage"));
//! # Ok::<(), adcs_templates::TemplateError>(())
//! ```
//!
//! ## Publishing a policy
//!
//! ```
//! use adcs_templates::attributes::AttributeMap;
//! use adcs_templates::template::PolicyTemplate;
//! use adcs_templates::xcep;
//!
//! let attrs = AttributeMap::new()
//!     .with("cn", "WebServer2")
//!     .with("msPKI-Cert-Template-OID", "1.3.6.1.4.1.311.21.8.1.2")
//!     .with("pKIExtendedKeyUsage", vec!["1.3.6.1.5.5.7.3.1"]);
//!
//! let template = PolicyTemplate::from_attributes(&attrs)?;
//! let xml = xcep::serialize(&[template])?.to_xml()?;
//! assert!(xml.contains("<nextUpdateHours>8</nextUpdateHours>"));
//! # Ok::<(), adcs_templates::TemplateError>(())
//! ```
//!
//! ## Directory access
//!
//! Binding to a domain controller is left to the caller: implement
//! [`directory::TemplateDirectory`] and hand it to a
//! [`sync::TemplateSynchronizer`].

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attributes;
pub mod classify;
pub mod cng;
pub mod config;
pub mod diff;
pub mod directory;
pub mod duration;
pub mod error;
pub mod extensions;
pub mod logging;
pub mod oid;
pub mod reconcile;
pub mod sync;
pub mod template;
pub mod xcep;

// Re-exports for convenience
pub use attributes::{AttributeMap, AttributeValue};
pub use classify::{ComparePolicy, is_projected};
pub use config::{ConfigLoader, SyncConfig};
pub use diff::{ChangeSet, diff};
pub use directory::{InMemoryDirectory, TemplateDirectory};
pub use duration::{format_duration, parse_duration};
pub use error::{Result, TemplateError};
pub use oid::{OidEntry, OidGroup, OidRegistry};
pub use reconcile::{Reconciliation, reconcile};
pub use sync::{SyncOutcome, TemplateSynchronizer};
pub use template::PolicyTemplate;
pub use xcep::PolicyDocument;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
