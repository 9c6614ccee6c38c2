//! Knowtrace Core Library
//!
//! This crate provides the core functionality for Knowtrace, including:
//! - Graph store (knowledge nodes, typed relationships, category metadata)
//! - Backend connector (remote graph database over HTTP, degrades to no-op)
//! - Interaction telemetry (dual-write recorder, fallback reader, local log)
//! - Analytics (visit heat, learner activity, category distribution, paths)
//! - Data lifecycle (bulk import, constraints, destructive clears)
//! - Configuration (TOML file + environment-resolved credentials)

pub mod graph;
pub mod backend;
pub mod telemetry;
pub mod analytics;
pub mod lifecycle;
pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::config::Config;
    pub use crate::graph::{GraphStore, KnowledgeNode, NodeCategory};
    pub use crate::telemetry::InteractionEvent;
}
