//! Typed relationships between knowledge nodes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Relationship type applied at import time when a relationship carries none
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "关联";

/// A directed, typed edge between two knowledge nodes
///
/// Endpoints reference node ids. Referential integrity is not validated
/// here: a relationship may point at an id the graph does not contain, and
/// reads tolerate that. Multiple relationships between the same pair are
/// permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Relationship-type label
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    /// Optional property mapping
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Relationship {
    /// Create a new untyped relationship
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: None,
            properties: BTreeMap::new(),
        }
    }

    /// Set the relationship-type label
    pub fn with_type(mut self, rel_type: impl Into<String>) -> Self {
        self.rel_type = Some(rel_type.into());
        self
    }

    /// Add a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Relationship type with the import-time default applied
    pub fn type_or_default(&self) -> &str {
        self.rel_type.as_deref().unwrap_or(DEFAULT_RELATIONSHIP_TYPE)
    }
}
