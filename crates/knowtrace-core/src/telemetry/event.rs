//! Interaction events and their write-time identifiers

use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Action type produced by node views
pub const ACTION_VIEW: &str = "view";

/// Wire format for event timestamps, shared by the local log and the
/// remote store
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An immutable fact recording one learner action against one node
///
/// Created exactly once per action, never mutated, never deleted except by
/// bulk clear. `node_label` is a denormalized copy taken at action time, so
/// historical reports stay valid even if the graph's label for that id
/// later changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Learner identifier as entered at login; not validated against a roster
    pub student_id: String,
    /// Target node id
    pub node_id: String,
    /// Node label at the time of the action
    pub node_label: String,
    /// Action tag; currently only "view" is produced
    pub action_type: String,
    /// Duration in whole seconds, 0 when not measured
    pub duration: u32,
    /// Creation timestamp, second precision on the wire
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl InteractionEvent {
    /// Create a new event
    pub fn new(
        student_id: impl Into<String>,
        node_id: impl Into<String>,
        node_label: impl Into<String>,
        action_type: impl Into<String>,
        duration: u32,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            node_id: node_id.into(),
            node_label: node_label.into(),
            action_type: action_type.into(),
            duration,
            timestamp,
        }
    }

    /// Derive the write-time unique identifier for this event
    ///
    /// Format: `{student_id}_{node_id}_{YYYYMMDDHHMMSS}{microseconds}`.
    /// The microsecond component comes from the [`EventClock`], which
    /// guarantees strictly increasing ticks, so the id is unique within a
    /// process even for rapid repeat views of one node. The id is keyed
    /// into the remote store's uniqueness constraint; it is not part of
    /// the read model and never written to the local log.
    pub fn derived_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.student_id,
            self.node_id,
            self.timestamp.format("%Y%m%d%H%M%S%6f")
        )
    }
}

/// Serde adapter for the `YYYY-MM-DD HH:MM:SS` wire format
pub(crate) mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Accept the ISO form too, for logs written by a backend that
        // stored native datetimes
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(serde::de::Error::custom)
    }
}

/// Monotonic event timestamp source
///
/// Hands out the current local time, nudged forward by one microsecond
/// whenever the wall clock has not advanced past the previous tick. Two
/// ticks are therefore never equal, which is what makes derived event ids
/// unique under rapid repeated views.
#[derive(Debug)]
pub struct EventClock {
    last: Mutex<NaiveDateTime>,
}

impl EventClock {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(NaiveDateTime::MIN),
        }
    }

    /// Next event timestamp, strictly later than every previous tick
    pub fn tick(&self) -> NaiveDateTime {
        self.tick_at(Local::now().naive_local())
    }

    /// Clock step with an externally supplied "now"
    pub(crate) fn tick_at(&self, now: NaiveDateTime) -> NaiveDateTime {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            // A poisoned clock still has a valid last tick; uniqueness
            // must hold regardless
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = next;
        next
    }
}

impl Default for EventClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_event_serialization_field_set() {
        let event = InteractionEvent::new(
            "s1",
            "n1",
            "陷落柱",
            ACTION_VIEW,
            12,
            ts("2025-08-25 10:30:00"),
        );

        let json = serde_json::to_value(&event).unwrap();
        let object = json.as_object().unwrap();
        let keys: Vec<_> = object.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["student_id", "node_id", "node_label", "action_type", "duration", "timestamp"]
        );
        assert_eq!(object["timestamp"], "2025-08-25 10:30:00");
    }

    #[test]
    fn test_event_roundtrip() {
        let event = InteractionEvent::new("s1", "n1", "label", "view", 0, ts("2025-01-02 03:04:05"));
        let json = serde_json::to_string(&event).unwrap();
        let back: InteractionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_timestamp_accepts_iso_form() {
        let json = r#"{"student_id":"s","node_id":"n","node_label":"l","action_type":"view","duration":3,"timestamp":"2025-08-25T10:30:00.123000000"}"#;
        let event: InteractionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.timestamp.format(TIMESTAMP_FORMAT).to_string(), "2025-08-25 10:30:00");
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        let json = r#"{"student_id":"s","node_id":"n","node_label":"l","action_type":"view","duration":3,"timestamp":"yesterday"}"#;
        assert!(serde_json::from_str::<InteractionEvent>(json).is_err());
    }

    #[test]
    fn test_derived_id_format() {
        let event = InteractionEvent::new(
            "s1",
            "n1",
            "label",
            "view",
            0,
            ts("2025-08-25 10:30:00.123456"),
        );
        assert_eq!(event.derived_id(), "s1_n1_20250825103000123456");
    }

    #[test]
    fn test_clock_ticks_strictly_increase_under_frozen_time() {
        let clock = EventClock::new();
        let frozen = ts("2025-08-25 10:30:00.000001");

        let first = clock.tick_at(frozen);
        let second = clock.tick_at(frozen);
        let third = clock.tick_at(frozen);

        assert!(first < second);
        assert!(second < third);
        assert_eq!(second, first + Duration::microseconds(1));
    }

    #[test]
    fn test_clock_follows_advancing_wall_time() {
        let clock = EventClock::new();
        let earlier = ts("2025-08-25 10:30:00");
        let later = ts("2025-08-25 10:30:05");

        assert_eq!(clock.tick_at(earlier), earlier);
        assert_eq!(clock.tick_at(later), later);
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let clock = EventClock::new();
        let late = ts("2025-08-25 10:30:05");
        let early = ts("2025-08-25 10:30:00");

        clock.tick_at(late);
        let next = clock.tick_at(early);
        assert_eq!(next, late + Duration::microseconds(1));
    }

    #[test]
    fn test_ids_unique_for_same_student_node_and_tick() {
        let clock = EventClock::new();
        let frozen = ts("2025-08-25 10:30:00");

        let a = InteractionEvent::new("s1", "n1", "l", "view", 0, clock.tick_at(frozen));
        let b = InteractionEvent::new("s1", "n1", "l", "view", 0, clock.tick_at(frozen));

        assert_ne!(a.derived_id(), b.derived_id());
    }
}
