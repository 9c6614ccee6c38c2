//! On-disk representation of a knowledge graph dataset

use std::fs;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::node::KnowledgeNode;
use super::relationship::Relationship;

/// Dataset metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub version: String,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            created_time: String::new(),
            version: "1.0".to_string(),
        }
    }
}

/// The knowledge graph document as stored on disk
///
/// UTF-8 JSON with a metadata block and two ordered lists. A missing or
/// malformed file is fatal at load: there is no degraded mode for the graph
/// itself, unlike the telemetry backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub metadata: GraphMetadata,
    #[serde(default)]
    pub nodes: Vec<KnowledgeNode>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphDocument {
    /// Create an empty dataset scaffold with a fresh metadata block
    pub fn new_empty(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            metadata: GraphMetadata {
                title: title.into(),
                description: description.into(),
                created_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                version: "1.0".to_string(),
            },
            nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Load a graph document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::GraphLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| Error::GraphLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save the document to disk, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Other(format!("Failed to serialize graph document: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}
