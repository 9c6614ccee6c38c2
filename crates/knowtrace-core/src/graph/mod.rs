//! Knowledge graph domain module
//!
//! Holds the static knowledge graph a learner browses: categorized concept
//! nodes and the typed relationships between them.
//!
//! The graph lives in a single JSON document on disk and is loaded once at
//! startup into a [`GraphStore`], which indexes it for id lookups, category
//! joins during analytics, and related-node queries for detail views. The
//! store is read-only for the process lifetime; the only paths that change
//! graph data are the dataset scaffolding (`GraphDocument::new_empty` +
//! `save`) and the remote bulk import in the lifecycle module.
//!
//! A missing or malformed graph file is fatal. Telemetry has a degraded
//! mode; the graph does not.

mod document;
mod node;
mod relationship;
mod store;

pub use document::{GraphDocument, GraphMetadata};
pub use node::{KnowledgeNode, NodeCategory};
pub use relationship::{DEFAULT_RELATIONSHIP_TYPE, Relationship};
pub use store::{GraphStore, RelatedNode, RelationDirection};
