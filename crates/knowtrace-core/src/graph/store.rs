//! In-memory graph store with id-indexed lookups

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;

use super::document::{GraphDocument, GraphMetadata};
use super::node::{KnowledgeNode, NodeCategory};
use super::relationship::Relationship;

/// Direction of a relationship relative to the queried node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationDirection {
    /// The queried node is the source
    Outgoing,
    /// The queried node is the target
    Incoming,
}

/// A node connected to the queried one, with the relationship between them
#[derive(Debug, Clone)]
pub struct RelatedNode<'a> {
    pub node: &'a KnowledgeNode,
    /// Relationship-type label, default applied
    pub relation: &'a str,
    pub direction: RelationDirection,
}

/// In-memory, read-mostly representation of the knowledge graph
///
/// Loaded once at startup and cached for the process lifetime. The store
/// owns its nodes and relationships; nothing mutates them after load.
pub struct GraphStore {
    document: GraphDocument,
    by_id: HashMap<String, usize>,
}

impl GraphStore {
    /// Load the graph from disk and index it
    pub fn load(path: &Path) -> Result<Self> {
        let document = GraphDocument::load(path)?;
        debug!(
            nodes = document.nodes.len(),
            relationships = document.relationships.len(),
            "loaded graph document"
        );
        Ok(Self::from_document(document))
    }

    /// Build a store from an in-memory document
    pub fn from_document(document: GraphDocument) -> Self {
        let mut by_id = HashMap::with_capacity(document.nodes.len());
        for (idx, node) in document.nodes.iter().enumerate() {
            if by_id.insert(node.id.clone(), idx).is_some() {
                warn!(node_id = %node.id, "duplicate node id in graph document, keeping the last occurrence");
            }
        }
        Self { document, by_id }
    }

    /// Dataset metadata
    pub fn metadata(&self) -> &GraphMetadata {
        &self.document.metadata
    }

    /// The underlying document, e.g. for bulk import
    pub fn document(&self) -> &GraphDocument {
        &self.document
    }

    /// All nodes in document order
    pub fn nodes(&self) -> &[KnowledgeNode] {
        &self.document.nodes
    }

    /// All relationships in document order
    pub fn relationships(&self) -> &[Relationship] {
        &self.document.relationships
    }

    pub fn node_count(&self) -> usize {
        self.document.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.document.relationships.len()
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&KnowledgeNode> {
        self.by_id.get(id).map(|&idx| &self.document.nodes[idx])
    }

    /// Category of a node, `None` when the id is unknown to the store
    pub fn category_of(&self, id: &str) -> Option<NodeCategory> {
        self.node(id).map(|n| n.category)
    }

    /// Nodes connected to `id` in either direction, with relationship types
    ///
    /// Relationships whose far endpoint is missing from the store are
    /// skipped, matching the tolerance for dangling references elsewhere.
    pub fn related_nodes(&self, id: &str) -> Vec<RelatedNode<'_>> {
        let mut related = Vec::new();
        for rel in &self.document.relationships {
            if rel.source == id {
                if let Some(node) = self.node(&rel.target) {
                    related.push(RelatedNode {
                        node,
                        relation: rel.type_or_default(),
                        direction: RelationDirection::Outgoing,
                    });
                }
            } else if rel.target == id {
                if let Some(node) = self.node(&rel.source) {
                    related.push(RelatedNode {
                        node,
                        relation: rel.type_or_default(),
                        direction: RelationDirection::Incoming,
                    });
                }
            }
        }
        related
    }

    /// Node counts per category, in category declaration order
    pub fn nodes_per_category(&self) -> BTreeMap<NodeCategory, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.document.nodes {
            *counts.entry(node.category).or_insert(0) += 1;
        }
        counts
    }
}
