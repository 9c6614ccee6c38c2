//! Remote graph database backend
//!
//! This module defines the trait for remote persistence of the knowledge
//! graph and its interaction telemetry, plus the HTTP Cypher implementation.
//! Remote unavailability is a normal state: connecting never fails, and an
//! offline backend answers every operation deterministically instead of
//! erroring.

mod cypher;

#[cfg(test)]
pub(crate) mod testing;

pub use cypher::{CypherBackend, CypherBackendBuilder, QueryRow};

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::GraphDocument;
use crate::telemetry::InteractionEvent;

/// Remote storage operations for graph data and interaction telemetry
///
/// Liveness is a single boolean: callers check [`is_live`](Self::is_live)
/// and treat the answer as authoritative for the whole call.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Whether a verified live connection exists
    fn is_live(&self) -> bool;

    // ========== Interaction Operations ==========

    /// Insert one interaction event under its unique id
    async fn insert_interaction(&self, event_id: &str, event: &InteractionEvent) -> Result<()>;

    /// List every interaction event, newest first
    async fn list_interactions(&self) -> Result<Vec<InteractionEvent>>;

    /// List one learner's interaction events, newest first
    async fn list_interactions_for_student(&self, student_id: &str)
        -> Result<Vec<InteractionEvent>>;

    /// Delete every interaction event in this dataset
    async fn clear_interactions(&self) -> Result<()>;

    // ========== Graph Operations ==========

    /// Create the uniqueness constraint on interaction ids
    async fn ensure_constraints(&self) -> Result<()>;

    /// Replace this dataset's remote graph with the given document
    async fn import_graph(&self, document: &GraphDocument) -> Result<()>;

    /// Delete every graph node and relationship in this dataset
    async fn clear_graph(&self) -> Result<()>;

    // ========== Lifecycle ==========

    /// Release the connection; safe to call when never connected
    async fn close(&self);
}
