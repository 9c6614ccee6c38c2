//! Learner session context

use chrono::{Local, NaiveDateTime};

/// Identity under which interactions are recorded
///
/// Passed explicitly to the recorder rather than held as process-global
/// state, so concurrent callers can act for different learners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub student_id: String,
    pub started_at: NaiveDateTime,
}

impl Session {
    /// Open a session for the given learner id
    ///
    /// The id is taken as entered; there is no roster to validate against.
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            started_at: Local::now().naive_local(),
        }
    }
}
