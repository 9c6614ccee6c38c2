//! In-memory backend double for exercising dual-write and fallback paths

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::graph::GraphDocument;
use crate::telemetry::InteractionEvent;

use super::GraphBackend;

/// Scriptable [`GraphBackend`] holding events in memory
///
/// Honors the real backend's ordering contract: listings come back newest
/// first, full and per-student alike.
pub(crate) struct StubBackend {
    live: bool,
    fail_all: bool,
    events: Mutex<Vec<(String, InteractionEvent)>>,
    imports: Mutex<Vec<(usize, usize)>>,
    constraint_calls: AtomicUsize,
    interaction_clears: AtomicUsize,
    graph_clears: AtomicUsize,
}

impl StubBackend {
    fn new(live: bool, fail_all: bool) -> Self {
        Self {
            live,
            fail_all,
            events: Mutex::new(Vec::new()),
            imports: Mutex::new(Vec::new()),
            constraint_calls: AtomicUsize::new(0),
            interaction_clears: AtomicUsize::new(0),
            graph_clears: AtomicUsize::new(0),
        }
    }

    /// Live backend with no stored events
    pub(crate) fn live() -> Self {
        Self::new(true, false)
    }

    /// Backend that never connected
    pub(crate) fn offline() -> Self {
        Self::new(false, false)
    }

    /// Live backend whose every operation errors
    pub(crate) fn failing() -> Self {
        Self::new(true, true)
    }

    /// Live backend pre-seeded with remote events
    pub(crate) fn with_events(events: Vec<InteractionEvent>) -> Self {
        let stub = Self::live();
        {
            let mut stored = stub.events.lock().unwrap();
            for (i, event) in events.into_iter().enumerate() {
                stored.push((format!("seeded_{}", i), event));
            }
        }
        stub
    }

    pub(crate) fn stored_events(&self) -> Vec<InteractionEvent> {
        self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn stored_ids(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn imports(&self) -> Vec<(usize, usize)> {
        self.imports.lock().unwrap().clone()
    }

    pub(crate) fn constraint_calls(&self) -> usize {
        self.constraint_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn interaction_clears(&self) -> usize {
        self.interaction_clears.load(Ordering::SeqCst)
    }

    pub(crate) fn graph_clears(&self) -> usize {
        self.graph_clears.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail_all {
            return Err(Error::Backend("stub backend failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphBackend for StubBackend {
    fn is_live(&self) -> bool {
        self.live
    }

    async fn insert_interaction(&self, event_id: &str, event: &InteractionEvent) -> Result<()> {
        self.check()?;
        self.events
            .lock()
            .unwrap()
            .push((event_id.to_string(), event.clone()));
        Ok(())
    }

    async fn list_interactions(&self) -> Result<Vec<InteractionEvent>> {
        self.check()?;
        let mut events = self.stored_events();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn list_interactions_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<InteractionEvent>> {
        self.check()?;
        let mut events: Vec<_> = self
            .stored_events()
            .into_iter()
            .filter(|e| e.student_id == student_id)
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn clear_interactions(&self) -> Result<()> {
        self.check()?;
        self.events.lock().unwrap().clear();
        self.interaction_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_constraints(&self) -> Result<()> {
        self.check()?;
        self.constraint_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn import_graph(&self, document: &GraphDocument) -> Result<()> {
        self.check()?;
        self.imports
            .lock()
            .unwrap()
            .push((document.nodes.len(), document.relationships.len()));
        Ok(())
    }

    async fn clear_graph(&self) -> Result<()> {
        self.check()?;
        self.graph_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {}
}
