//! Interaction telemetry
//!
//! Records which learner viewed which node, for how long, and when. Writes
//! go to the remote store and the local log independently and best-effort;
//! reads prefer the remote store and fall back to the local log without
//! ever merging the two.

mod event;
mod log;
mod reader;
mod recorder;
mod session;

pub use event::{ACTION_VIEW, EventClock, InteractionEvent, TIMESTAMP_FORMAT};
pub use log::InteractionLog;
pub use reader::InteractionReader;
pub use recorder::InteractionRecorder;
pub use session::Session;
