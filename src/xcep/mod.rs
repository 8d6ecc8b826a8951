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

//! Certificate enrollment policy (XCEP) documents.
//!
//! Builds the `GetPoliciesResponse` body an enrollment policy endpoint
//! returns for a set of certificate templates.
//!
//! # Example
//!
//! ```
//! use adcs_templates::template::PolicyTemplate;
//! use adcs_templates::xcep;
//!
//! let template = PolicyTemplate {
//!     common_name: "WebServer2".to_string(),
//!     display_name: "Web Server 2".to_string(),
//!     oid: "1.3.6.1.4.1.311.21.8.1.2".to_string(),
//!     ..PolicyTemplate::default()
//! };
//!
//! let document = xcep::serialize(&[template]).unwrap();
//! assert_eq!(document.policies().len(), 1);
//! assert!(document.to_xml().unwrap().contains("<commonName>WebServer2</commonName>"));
//! ```

mod document;
mod serializer;

pub use document::{Element, XSI_NIL};
pub use serializer::{
    ATTRIBUTE_ORDER, NEXT_UPDATE_HOURS, POLICY_NAMESPACE, PolicyDocument, XSI_NAMESPACE,
    pack_subject_name_flags, serialize, serialize_policies,
};
