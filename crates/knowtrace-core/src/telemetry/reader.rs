//! Fallback-chain interaction reader

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::GraphBackend;
use crate::error::Result;
use crate::telemetry::event::InteractionEvent;
use crate::telemetry::log::InteractionLog;

/// Read side of the telemetry store
///
/// The remote store is authoritative whenever it is live and returns a
/// non-empty result; otherwise the local log is read instead. The two
/// sources are never merged, so a caller always sees one coherent view
/// even when the stores have diverged.
pub struct InteractionReader<B: GraphBackend> {
    backend: Arc<B>,
    log: InteractionLog,
}

impl<B: GraphBackend> InteractionReader<B> {
    pub fn new(backend: Arc<B>, log: InteractionLog) -> Self {
        Self { backend, log }
    }

    /// Every recorded event, newest first
    pub async fn get_all(&self) -> Result<Vec<InteractionEvent>> {
        if self.backend.is_live() {
            match self.backend.list_interactions().await {
                Ok(events) if !events.is_empty() => return Ok(events),
                Ok(_) => debug!("remote store empty, reading local log"),
                Err(e) => warn!(error = %e, "remote read failed, reading local log"),
            }
        }
        let mut events = self.log.read_all()?;
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    /// Events for one learner, newest first
    ///
    /// Remote-only: returns empty when no live backend exists, rather than
    /// scanning the local log. Callers that want offline parity can filter
    /// [`get_all`](Self::get_all) instead.
    pub async fn get_for_student(&self, student_id: &str) -> Result<Vec<InteractionEvent>> {
        if !self.backend.is_live() {
            return Ok(Vec::new());
        }
        match self.backend.list_interactions_for_student(student_id).await {
            Ok(events) => Ok(events),
            Err(e) => {
                warn!(error = %e, student_id, "remote per-student read failed");
                Ok(Vec::new())
            }
        }
    }
}
