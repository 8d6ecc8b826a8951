// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Typed template attribute bag.
//!
//! Directory reads and desired-state documents are both decoded into an
//! [`AttributeMap`] before any comparison happens, so the differ only ever
//! sees the four value shapes of [`AttributeValue`].

use std::collections::BTreeMap;
use std::fmt;

use base64::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::classify::{ComparePolicy, is_projected};
use crate::error::{Result, TemplateError};

/// A single attribute value with its directory typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Integer syntax (32-bit in the directory, widened for comparison).
    Int(i64),
    /// Single string, including SDDL and DN strings.
    String(String),
    /// Multi-valued string attribute.
    StringList(Vec<String>),
    /// Octet string.
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// Whether the value is the empty value of its type.
    ///
    /// Empty strings and empty collections are empty; integers never are.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Int(_) => false,
            Self::String(s) => s.trim().is_empty(),
            Self::StringList(v) => v.is_empty(),
            Self::Bytes(b) => b.is_empty(),
        }
    }

    /// The zero value of the same type.
    pub fn zero_like(&self) -> Self {
        match self {
            Self::Int(_) => Self::Int(0),
            Self::String(_) => Self::String(String::new()),
            Self::StringList(_) => Self::StringList(Vec::new()),
            Self::Bytes(_) => Self::Bytes(Vec::new()),
        }
    }

    /// Short description used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::String(_) => "string",
            Self::StringList(_) => "string list",
            Self::Bytes(_) => "byte sequence",
        }
    }

    /// Returns the string if this is a single string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::StringList(v) => write!(f, "{v:?}"),
            Self::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::StringList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Attribute name to value, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap {
    entries: BTreeMap<String, AttributeValue>,
}

impl AttributeMap {
    /// Create an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace an attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.entries.remove(name)
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }

    /// Whether the attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Attribute names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restrict to the attributes a template directory read returns.
    pub fn projected(&self) -> Self {
        self.entries
            .iter()
            .filter(|(name, _)| is_projected(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Integer value of an attribute, coercing numeric strings.
    ///
    /// Returns `Ok(None)` when the attribute is absent.
    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        self.get(name).map(|v| coerce_int(name, v)).transpose()
    }

    /// String value of an attribute. A one-element list is accepted.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            AttributeValue::StringList(v) if v.len() == 1 => Some(&v[0]),
            other => other.as_str(),
        }
    }

    /// String list value of an attribute; a single string is a one-element list.
    pub fn get_strings(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(AttributeValue::StringList(v)) => v.clone(),
            Some(AttributeValue::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(AttributeValue::Int(i)) => vec![i.to_string()],
            _ => Vec::new(),
        }
    }

    /// Byte value of an attribute.
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            AttributeValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Decode a desired-state JSON object.
    ///
    /// Numbers become integers, strings stay strings, `null` is treated as
    /// absent and arrays become string lists, except for byte-sequence
    /// attributes where arrays of octets (or a base64 string) become bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::TypeCoercion`] for values that have no
    /// attribute representation (booleans, objects, fractional numbers,
    /// out-of-range octets).
    pub fn from_json(document: &Value) -> Result<Self> {
        let Value::Object(object) = document else {
            return Err(TemplateError::format(
                "Desired-state document must be a JSON object",
            ));
        };

        let mut map = Self::new();
        for (name, value) in object {
            if let Some(decoded) = decode_json_value(name, value)? {
                map.insert(name.clone(), decoded);
            }
        }
        Ok(map)
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, AttributeValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Coerce a value to an integer for attribute `name`.
pub(crate) fn coerce_int(name: &str, value: &AttributeValue) -> Result<i64> {
    match value {
        AttributeValue::Int(i) => Ok(*i),
        AttributeValue::String(s) if s.trim().is_empty() => Ok(0),
        AttributeValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| TemplateError::type_coercion(name, "integer", format!("string {s:?}"))),
        other => Err(TemplateError::type_coercion(
            name,
            "integer",
            other.type_name(),
        )),
    }
}

/// Coerce a value to the 32-bit word a directory Integer attribute holds.
///
/// The directory stores these signed, but tooling often renders the same
/// word unsigned, so anything in `i32::MIN..=u32::MAX` is accepted and both
/// renderings yield the same `i32`.
pub(crate) fn coerce_word(name: &str, value: &AttributeValue) -> Result<i32> {
    let wide = coerce_int(name, value)?;
    i32::try_from(wide)
        .or_else(|_| u32::try_from(wide).map(|word| word as i32))
        .map_err(|_| TemplateError::type_coercion(name, "32-bit integer", wide.to_string()))
}

fn decode_json_value(name: &str, value: &Value) -> Result<Option<AttributeValue>> {
    let policy = ComparePolicy::for_attribute(name);

    let decoded = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => AttributeValue::Int(n.as_i64().ok_or_else(|| {
            TemplateError::type_coercion(name, "integer", format!("number {n}"))
        })?),
        Value::String(s) if policy == ComparePolicy::ByteSeq => {
            AttributeValue::Bytes(BASE64_STANDARD.decode(s.trim()).map_err(|e| {
                TemplateError::type_coercion(name, "byte sequence", format!("string ({e})"))
            })?)
        }
        Value::String(s) => AttributeValue::String(s.clone()),
        Value::Array(items) if policy == ComparePolicy::ByteSeq => {
            AttributeValue::Bytes(items.iter().map(|item| json_octet(name, item)).collect::<Result<_>>()?)
        }
        Value::Array(items) => AttributeValue::StringList(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(TemplateError::type_coercion(
                        name,
                        "string list",
                        format!("element {other}"),
                    )),
                })
                .collect::<Result<_>>()?,
        ),
        Value::Bool(b) => {
            return Err(TemplateError::type_coercion(
                name,
                policy.expected_type(),
                format!("boolean {b}"),
            ));
        }
        Value::Object(_) => {
            return Err(TemplateError::type_coercion(
                name,
                policy.expected_type(),
                "object",
            ));
        }
    };

    Ok(Some(decoded))
}

fn json_octet(name: &str, item: &Value) -> Result<u8> {
    item.as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| TemplateError::type_coercion(name, "byte sequence", format!("element {item}")))
}
