//! Dual-write interaction recorder

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::GraphBackend;
use crate::graph::KnowledgeNode;
use crate::telemetry::event::{ACTION_VIEW, EventClock, InteractionEvent};
use crate::telemetry::log::InteractionLog;
use crate::telemetry::session::Session;

/// Sole writer of interaction events
///
/// Each recorded action is written to the remote store (when live) and to
/// the local log, independently and without transactional coupling. Either
/// write may fail without affecting the other; failures are logged and
/// swallowed because telemetry loss must never interrupt the learner
/// session. The two stores may therefore diverge.
pub struct InteractionRecorder<B: GraphBackend> {
    backend: Arc<B>,
    log: InteractionLog,
    clock: EventClock,
}

impl<B: GraphBackend> InteractionRecorder<B> {
    pub fn new(backend: Arc<B>, log: InteractionLog) -> Self {
        Self {
            backend,
            log,
            clock: EventClock::new(),
        }
    }

    /// Record one learner action
    ///
    /// Infallible by contract; returns the event that was (best-effort)
    /// persisted so callers can echo it back.
    pub async fn record(
        &self,
        student_id: &str,
        node_id: &str,
        node_label: &str,
        action_type: &str,
        duration_secs: u32,
    ) -> InteractionEvent {
        let event = InteractionEvent::new(
            student_id,
            node_id,
            node_label,
            action_type,
            duration_secs,
            self.clock.tick(),
        );

        if self.backend.is_live() {
            match self.backend.insert_interaction(&event.derived_id(), &event).await {
                Ok(()) => debug!(node_id, "interaction written to remote store"),
                Err(e) => warn!(error = %e, node_id, "remote interaction write failed"),
            }
        }

        if let Err(e) = self.log.append(&event) {
            warn!(error = %e, node_id, "local interaction write failed");
        }

        event
    }

    /// Record a node view for the given session
    pub async fn record_view(
        &self,
        session: &Session,
        node: &KnowledgeNode,
        duration_secs: u32,
    ) -> InteractionEvent {
        self.record(&session.student_id, &node.id, &node.label, ACTION_VIEW, duration_secs)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StubBackend;
    use crate::graph::NodeCategory;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_writes_both_stores_when_live() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::live());
        let log = InteractionLog::new(dir.path().join("interactions.json"));
        let recorder = InteractionRecorder::new(backend.clone(), log.clone());

        let event = recorder.record("s1", "n1", "陷落柱", "view", 12).await;

        assert_eq!(event.duration, 12);
        let remote = backend.stored_events();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].node_label, "陷落柱");
        assert_eq!(log.read_all().unwrap(), remote);
    }

    #[tokio::test]
    async fn test_record_appends_locally_when_offline() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::offline());
        let log = InteractionLog::new(dir.path().join("interactions.json"));
        let recorder = InteractionRecorder::new(backend.clone(), log.clone());

        recorder.record("s1", "n1", "label", "view", 0).await;

        assert!(backend.stored_events().is_empty());
        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_block_local_write() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::failing());
        let log = InteractionLog::new(dir.path().join("interactions.json"));
        let recorder = InteractionRecorder::new(backend, log.clone());

        recorder.record("s1", "n1", "label", "view", 3).await;

        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_failure_does_not_block_remote_write() {
        let dir = TempDir::new().unwrap();
        // A directory at the log path makes every local write fail
        let path = dir.path().join("interactions.json");
        std::fs::create_dir(&path).unwrap();

        let backend = Arc::new(StubBackend::live());
        let recorder = InteractionRecorder::new(backend.clone(), InteractionLog::new(&path));

        let event = recorder.record("s1", "n1", "label", "view", 3).await;

        assert_eq!(backend.stored_events(), vec![event]);
    }

    #[tokio::test]
    async fn test_rapid_views_get_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::live());
        let log = InteractionLog::new(dir.path().join("interactions.json"));
        let recorder = InteractionRecorder::new(backend.clone(), log);

        recorder.record("s1", "n1", "l", "view", 0).await;
        recorder.record("s1", "n1", "l", "view", 0).await;
        recorder.record("s1", "n1", "l", "view", 0).await;

        let ids = backend.stored_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
    }

    #[tokio::test]
    async fn test_record_view_uses_session_and_node() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(StubBackend::live());
        let log = InteractionLog::new(dir.path().join("interactions.json"));
        let recorder = InteractionRecorder::new(backend.clone(), log);

        let session = Session::new("2023001");
        let node = KnowledgeNode::new("n7", "导水裂隙带", NodeCategory::Principle);
        let event = recorder.record_view(&session, &node, 45).await;

        assert_eq!(event.student_id, "2023001");
        assert_eq!(event.node_id, "n7");
        assert_eq!(event.node_label, "导水裂隙带");
        assert_eq!(event.action_type, ACTION_VIEW);
    }
}
