//! Knowledge node types for the graph store
//!
//! Nodes are the concepts learners browse. Each carries a category from a
//! closed set (used for color-coding and aggregation), a hierarchy level
//! (smaller = more central), and free-text properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A concept node in the knowledge graph
///
/// Immutable after load within a session; owned by the `GraphStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    /// Unique identifier within the dataset
    pub id: String,
    /// Display label shown to learners
    pub label: String,
    /// Category used for color-coding and aggregation
    pub category: NodeCategory,
    /// Hierarchy level; smaller is more central
    pub level: u32,
    /// Free-form type tag
    #[serde(rename = "type")]
    pub node_type: String,
    /// Ordered property-name to free-text value mapping
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl KnowledgeNode {
    /// Create a new node at level 1 with no properties
    pub fn new(id: impl Into<String>, label: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category,
            level: 1,
            node_type: String::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Set the hierarchy level
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set the type tag
    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    /// Add a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Visual size hint for graph rendering, derived from the hierarchy level
    ///
    /// Sizes shrink by 3 per level below the most central one and stay
    /// within [10, 22].
    pub fn display_size(&self) -> u32 {
        let level = i64::from(self.level.max(1));
        (28 - (level - 1) * 3).clamp(10, 22) as u32
    }
}

/// Categories a knowledge node can belong to
///
/// A closed set: the graph file and the remote store both use the Chinese
/// wire labels, and an unknown label is a load-time error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// 事故现象 - observed phenomena of the incident
    #[serde(rename = "事故现象")]
    Phenomenon,
    /// 成因分析 - causal analysis
    #[serde(rename = "成因分析")]
    Cause,
    /// 知识原理 - underlying principles
    #[serde(rename = "知识原理")]
    Principle,
    /// 防治措施 - prevention and control measures
    #[serde(rename = "防治措施")]
    Prevention,
    /// 历史意义 - historical significance
    #[serde(rename = "历史意义")]
    Legacy,
}

impl NodeCategory {
    /// Get the wire label (as stored in the graph file and remote backend)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phenomenon => "事故现象",
            Self::Cause => "成因分析",
            Self::Principle => "知识原理",
            Self::Prevention => "防治措施",
            Self::Legacy => "历史意义",
        }
    }

    /// Parse from a wire label or English name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "事故现象" => Some(Self::Phenomenon),
            "成因分析" => Some(Self::Cause),
            "知识原理" => Some(Self::Principle),
            "防治措施" => Some(Self::Prevention),
            "历史意义" => Some(Self::Legacy),
            other => match other.to_ascii_lowercase().as_str() {
                "phenomenon" => Some(Self::Phenomenon),
                "cause" => Some(Self::Cause),
                "principle" => Some(Self::Principle),
                "prevention" => Some(Self::Prevention),
                "legacy" => Some(Self::Legacy),
                _ => None,
            },
        }
    }

    /// Display color used for this category in graph rendering and legends
    pub fn color(&self) -> &'static str {
        match self {
            Self::Phenomenon => "#FF6B6B",
            Self::Cause => "#4ECDC4",
            Self::Principle => "#45B7D1",
            Self::Prevention => "#96CEB4",
            Self::Legacy => "#FFEAA7",
        }
    }

    /// Get all categories in display order
    pub fn all() -> &'static [NodeCategory] {
        &[
            Self::Phenomenon,
            Self::Cause,
            Self::Principle,
            Self::Prevention,
            Self::Legacy,
        ]
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = KnowledgeNode::new("n1", "陷落柱", NodeCategory::Cause)
            .with_level(2)
            .with_node_type("geology")
            .with_property("定义", "岩溶塌陷形成的柱状构造");

        assert_eq!(node.id, "n1");
        assert_eq!(node.category, NodeCategory::Cause);
        assert_eq!(node.level, 2);
        assert_eq!(node.properties.len(), 1);
    }

    #[test]
    fn test_category_wire_labels() {
        let json = serde_json::to_string(&NodeCategory::Phenomenon).unwrap();
        assert_eq!(json, "\"事故现象\"");

        let parsed: NodeCategory = serde_json::from_str("\"防治措施\"").unwrap();
        assert_eq!(parsed, NodeCategory::Prevention);

        assert!(serde_json::from_str::<NodeCategory>("\"不存在\"").is_err());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(NodeCategory::parse("成因分析"), Some(NodeCategory::Cause));
        assert_eq!(NodeCategory::parse("CAUSE"), Some(NodeCategory::Cause));
        assert_eq!(NodeCategory::parse("legacy"), Some(NodeCategory::Legacy));
        assert_eq!(NodeCategory::parse("unknown"), None);
    }

    #[test]
    fn test_category_colors_are_distinct() {
        let mut colors: Vec<_> = NodeCategory::all().iter().map(|c| c.color()).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), NodeCategory::all().len());
    }

    #[test]
    fn test_display_size_clamps() {
        let sized = |level| {
            KnowledgeNode::new("n", "n", NodeCategory::Principle)
                .with_level(level)
                .display_size()
        };

        assert_eq!(sized(1), 22);
        assert_eq!(sized(4), 19);
        assert_eq!(sized(6), 13);
        assert_eq!(sized(10), 10);
        // Level 0 is out of contract but must not underflow
        assert_eq!(sized(0), 22);
    }
}
