//! Bulk data lifecycle operations
//!
//! Import and clear are deliberate operator actions, so unlike the
//! telemetry path they report their outcome explicitly instead of
//! swallowing failures.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::GraphBackend;
use crate::error::{Error, Result};
use crate::graph::GraphDocument;
use crate::telemetry::InteractionLog;

/// Outcome of a bulk graph import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub nodes: usize,
    pub relationships: usize,
}

/// The only component allowed to remove telemetry, and only wholesale
pub struct LifecycleManager<B: GraphBackend> {
    backend: Arc<B>,
    log: InteractionLog,
}

impl<B: GraphBackend> LifecycleManager<B> {
    pub fn new(backend: Arc<B>, log: InteractionLog) -> Self {
        Self { backend, log }
    }

    /// Replace the remote graph with the given document
    ///
    /// Declares the interaction id uniqueness constraint first, then
    /// recreates every node and relationship. Requires a live backend;
    /// without one there is nothing to import into.
    pub async fn bulk_import(&self, document: &GraphDocument) -> Result<ImportReport> {
        if !self.backend.is_live() {
            return Err(Error::BackendOffline);
        }

        self.backend.ensure_constraints().await?;
        self.backend.import_graph(document).await?;

        let report = ImportReport {
            nodes: document.nodes.len(),
            relationships: document.relationships.len(),
        };
        info!(
            nodes = report.nodes,
            relationships = report.relationships,
            "graph import complete"
        );
        Ok(report)
    }

    /// Delete every interaction event from both stores
    ///
    /// Each side is attempted independently; returns true when at least
    /// one side was cleared. Irreversible.
    pub async fn clear_interactions(&self) -> bool {
        let mut remote_cleared = false;
        if self.backend.is_live() {
            match self.backend.clear_interactions().await {
                Ok(()) => remote_cleared = true,
                Err(e) => warn!(error = %e, "remote interaction clear failed"),
            }
        }

        let local_cleared = match self.log.clear() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "local interaction clear failed");
                false
            }
        };

        if remote_cleared || local_cleared {
            info!(remote_cleared, local_cleared, "interaction data cleared");
        }
        remote_cleared || local_cleared
    }

    /// Delete all interaction events and the remote graph
    pub async fn clear_all(&self) -> bool {
        let interactions_cleared = self.clear_interactions().await;

        let mut graph_cleared = false;
        if self.backend.is_live() {
            match self.backend.clear_graph().await {
                Ok(()) => graph_cleared = true,
                Err(e) => warn!(error = %e, "remote graph clear failed"),
            }
        }

        interactions_cleared || graph_cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StubBackend;
    use crate::graph::{KnowledgeNode, NodeCategory, Relationship};
    use crate::telemetry::InteractionEvent;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn document() -> GraphDocument {
        let mut doc = GraphDocument::new_empty("煤矿水害知识图谱", "测试");
        doc.nodes.push(KnowledgeNode::new("n1", "突水", NodeCategory::Phenomenon));
        doc.nodes.push(KnowledgeNode::new("n2", "断层", NodeCategory::Cause));
        doc.relationships.push(Relationship::new("n2", "n1").with_type("导致"));
        doc
    }

    fn seeded_log(dir: &TempDir) -> InteractionLog {
        let log = InteractionLog::new(dir.path().join("interactions.json"));
        let event = InteractionEvent::new(
            "s1",
            "n1",
            "label",
            "view",
            5,
            NaiveDateTime::parse_from_str("2025-08-25 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
        );
        log.append(&event).unwrap();
        log
    }

    #[tokio::test]
    async fn test_bulk_import_requires_live_backend() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::offline());
        let manager = LifecycleManager::new(backend, seeded_log(&dir));

        let err = manager.bulk_import(&document()).await.unwrap_err();
        assert!(matches!(err, Error::BackendOffline));
    }

    #[tokio::test]
    async fn test_bulk_import_ensures_constraint_and_reports_counts() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::live());
        let manager = LifecycleManager::new(backend.clone(), seeded_log(&dir));

        let report = manager.bulk_import(&document()).await.unwrap();

        assert_eq!(report, ImportReport { nodes: 2, relationships: 1 });
        assert_eq!(backend.constraint_calls(), 1);
        assert_eq!(backend.imports(), vec![(2, 1)]);
    }

    #[tokio::test]
    async fn test_clear_interactions_hits_both_stores() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::live());
        let log = seeded_log(&dir);
        let manager = LifecycleManager::new(backend.clone(), log.clone());

        assert!(manager.clear_interactions().await);
        assert_eq!(backend.interaction_clears(), 1);
        assert_eq!(log.read_all().unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn test_clear_interactions_succeeds_on_local_alone() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::failing());
        let log = seeded_log(&dir);
        let manager = LifecycleManager::new(backend, log.clone());

        // Remote clear errors, local clear still lands
        assert!(manager.clear_interactions().await);
        assert_eq!(log.read_all().unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn test_clear_interactions_fails_when_both_sides_fail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("interactions.json");
        // A directory at the log path makes the local clear fail
        std::fs::create_dir(&path).unwrap();

        let backend = Arc::new(StubBackend::failing());
        let manager = LifecycleManager::new(backend, InteractionLog::new(&path));

        assert!(!manager.clear_interactions().await);
    }

    #[tokio::test]
    async fn test_clear_all_also_drops_the_graph() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::live());
        let manager = LifecycleManager::new(backend.clone(), seeded_log(&dir));

        assert!(manager.clear_all().await);
        assert_eq!(backend.interaction_clears(), 1);
        assert_eq!(backend.graph_clears(), 1);
    }
}
