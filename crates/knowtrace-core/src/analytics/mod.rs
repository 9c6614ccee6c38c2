//! Analytics over interaction telemetry
//!
//! Pure aggregation over an in-memory event sequence; no I/O happens here.
//! Callers fetch events through the reader and pass them in, so every
//! report works identically against remote-sourced and local-sourced data.

mod export;

pub use export::{events_csv, node_heat_csv, student_summary_csv};

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::graph::{GraphStore, NodeCategory};
use crate::telemetry::InteractionEvent;

/// Maximum number of hops shown in a learner's path before truncation
pub const PATH_DISPLAY_LIMIT: usize = 20;

/// Corpus-wide usage totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageTotals {
    /// Total recorded events
    pub total_events: usize,
    /// Distinct learner ids seen
    pub distinct_students: usize,
    /// Distinct node ids seen
    pub distinct_nodes: usize,
    /// Mean duration over events with duration > 0; `None` when no event
    /// carries a measured duration
    pub mean_duration_secs: Option<f64>,
}

/// Visit count for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHeat {
    pub node_id: String,
    pub node_label: String,
    pub visits: usize,
}

/// Event count for one learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentActivity {
    pub student_id: String,
    pub events: usize,
}

/// Event count for one node category
///
/// `category` is `None` for events whose node id no longer exists in the
/// graph; those still count rather than disappearing from the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySlice {
    pub category: Option<NodeCategory>,
    pub events: usize,
}

/// Per-learner rollup for tabular export, ordered by learner id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub distinct_nodes: usize,
    pub total_events: usize,
    pub total_duration_secs: u64,
}

/// One learner's full activity, including the visited-node path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentDetail {
    pub student_id: String,
    pub distinct_nodes: usize,
    pub total_events: usize,
    pub total_duration_secs: u64,
    /// Node labels in visit order, oldest first
    pub path: Vec<String>,
}

impl StudentDetail {
    /// The visit path joined for display, truncated after
    /// [`PATH_DISPLAY_LIMIT`] hops
    pub fn display_path(&self) -> String {
        let joined = self
            .path
            .iter()
            .take(PATH_DISPLAY_LIMIT)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" → ");
        if self.path.len() > PATH_DISPLAY_LIMIT {
            format!("{} → ...", joined)
        } else {
            joined
        }
    }
}

/// Compute corpus-wide totals
pub fn totals(events: &[InteractionEvent]) -> UsageTotals {
    let distinct_students = events
        .iter()
        .map(|e| e.student_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let distinct_nodes = events
        .iter()
        .map(|e| e.node_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let measured: Vec<u32> = events
        .iter()
        .filter(|e| e.duration > 0)
        .map(|e| e.duration)
        .collect();
    let mean_duration_secs = if measured.is_empty() {
        None
    } else {
        Some(measured.iter().map(|&d| f64::from(d)).sum::<f64>() / measured.len() as f64)
    };

    UsageTotals {
        total_events: events.len(),
        distinct_students,
        distinct_nodes,
        mean_duration_secs,
    }
}

/// Rank nodes by visit count, most visited first
///
/// Grouped by (id, label) pair; ties break by node id ascending.
pub fn node_heat(events: &[InteractionEvent]) -> Vec<NodeHeat> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for event in events {
        *counts
            .entry((event.node_id.as_str(), event.node_label.as_str()))
            .or_insert(0) += 1;
    }

    let mut heat: Vec<NodeHeat> = counts
        .into_iter()
        .map(|((node_id, node_label), visits)| NodeHeat {
            node_id: node_id.to_string(),
            node_label: node_label.to_string(),
            visits,
        })
        .collect();
    heat.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.node_id.cmp(&b.node_id)));
    heat
}

/// Rank learners by event count, most active first
///
/// Ties break by learner id ascending.
pub fn student_activity(events: &[InteractionEvent]) -> Vec<StudentActivity> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for event in events {
        *counts.entry(event.student_id.as_str()).or_insert(0) += 1;
    }

    let mut activity: Vec<StudentActivity> = counts
        .into_iter()
        .map(|(student_id, events)| StudentActivity {
            student_id: student_id.to_string(),
            events,
        })
        .collect();
    activity.sort_by(|a, b| b.events.cmp(&a.events).then_with(|| a.student_id.cmp(&b.student_id)));
    activity
}

/// Count events per node category, largest slice first
///
/// Each event's node id is looked up in the current graph; events whose
/// node has since disappeared land in the `None` slice. Ties break by
/// category declaration order, with `None` last.
pub fn category_distribution(
    events: &[InteractionEvent],
    graph: &GraphStore,
) -> Vec<CategorySlice> {
    let mut counts: HashMap<Option<NodeCategory>, usize> = HashMap::new();
    for event in events {
        *counts.entry(graph.category_of(&event.node_id)).or_insert(0) += 1;
    }

    let mut slices: Vec<CategorySlice> = counts
        .into_iter()
        .map(|(category, events)| CategorySlice { category, events })
        .collect();
    slices.sort_by(|a, b| {
        b.events
            .cmp(&a.events)
            .then_with(|| category_rank(a.category).cmp(&category_rank(b.category)))
    });
    slices
}

fn category_rank(category: Option<NodeCategory>) -> u8 {
    match category {
        Some(c) => c as u8,
        None => u8::MAX,
    }
}

/// Roll up every learner's activity, ordered by learner id
pub fn student_summaries(events: &[InteractionEvent]) -> Vec<StudentSummary> {
    let mut grouped: BTreeMap<&str, (HashSet<&str>, usize, u64)> = BTreeMap::new();
    for event in events {
        let entry = grouped.entry(event.student_id.as_str()).or_default();
        entry.0.insert(event.node_id.as_str());
        entry.1 += 1;
        entry.2 += u64::from(event.duration);
    }

    grouped
        .into_iter()
        .map(
            |(student_id, (nodes, total_events, total_duration_secs))| StudentSummary {
                student_id: student_id.to_string(),
                distinct_nodes: nodes.len(),
                total_events,
                total_duration_secs,
            },
        )
        .collect()
}

/// One learner's activity with their chronological visit path
///
/// Returns `None` when the learner has no recorded events.
pub fn student_detail(events: &[InteractionEvent], student_id: &str) -> Option<StudentDetail> {
    let mut own: Vec<&InteractionEvent> = events
        .iter()
        .filter(|e| e.student_id == student_id)
        .collect();
    if own.is_empty() {
        return None;
    }
    // Stable sort: events sharing a second keep their stored order
    own.sort_by_key(|e| e.timestamp);

    let distinct_nodes = own
        .iter()
        .map(|e| e.node_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_duration_secs = own.iter().map(|e| u64::from(e.duration)).sum();
    let path = own.iter().map(|e| e.node_label.clone()).collect();

    Some(StudentDetail {
        student_id: student_id.to_string(),
        distinct_nodes,
        total_events: own.len(),
        total_duration_secs,
        path,
    })
}
