//! CSV rendering for telemetry exports
//!
//! Every file leads with a UTF-8 BOM so spreadsheet tools that sniff
//! encodings keep the Chinese headers intact.

use crate::analytics::{NodeHeat, StudentSummary};
use crate::telemetry::{InteractionEvent, TIMESTAMP_FORMAT};

const BOM: &str = "\u{feff}";

/// Render raw events, one row per event
pub fn events_csv(events: &[InteractionEvent]) -> String {
    let mut csv = String::from(BOM);
    csv.push_str("学号,节点ID,节点名称,操作类型,浏览时长(秒),时间\n");
    for event in events {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            escape_csv(&event.student_id),
            escape_csv(&event.node_id),
            escape_csv(&event.node_label),
            escape_csv(&event.action_type),
            event.duration,
            event.timestamp.format(TIMESTAMP_FORMAT),
        ));
    }
    csv
}

/// Render per-learner rollups
pub fn student_summary_csv(summaries: &[StudentSummary]) -> String {
    let mut csv = String::from(BOM);
    csv.push_str("学号,访问节点数,总访问次数,总学习时长(秒)\n");
    for summary in summaries {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            escape_csv(&summary.student_id),
            summary.distinct_nodes,
            summary.total_events,
            summary.total_duration_secs,
        ));
    }
    csv
}

/// Render the node heat ranking
pub fn node_heat_csv(heat: &[NodeHeat]) -> String {
    let mut csv = String::from(BOM);
    csv.push_str("节点ID,节点名称,访问次数\n");
    for entry in heat {
        csv.push_str(&format!(
            "{},{},{}\n",
            escape_csv(&entry.node_id),
            escape_csv(&entry.node_label),
            entry.visits,
        ));
    }
    csv
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
