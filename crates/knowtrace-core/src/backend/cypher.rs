//! Neo4j HTTP backend
//!
//! Talks to the transactional Cypher endpoint (`{uri}/db/{database}/tx/commit`)
//! over plain HTTP with basic auth. Connecting never fails: any network,
//! auth, or protocol problem during verification produces an offline backend
//! whose reads return empty and whose writes succeed as no-ops.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, valid_dataset_label};
use crate::error::{Error, Result};
use crate::graph::GraphDocument;
use crate::telemetry::{InteractionEvent, TIMESTAMP_FORMAT};

use super::GraphBackend;

const DEFAULT_DATASET_LABEL: &str = "knowtrace";

/// One result row, keyed by column name
pub type QueryRow = Map<String, Value>;

/// Backend handle over the transactional Cypher endpoint
///
/// Holds either a verified live connection or nothing. Every operation
/// checks which, so callers can use one handle for the whole process
/// lifetime regardless of backend availability.
pub struct CypherBackend {
    live: Option<LiveConnection>,
    dataset_label: String,
}

impl std::fmt::Debug for CypherBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CypherBackend")
            .field("live", &self.live.is_some())
            .field("dataset_label", &self.dataset_label)
            .finish()
    }
}

/// Builder for connecting a [`CypherBackend`]
pub struct CypherBackendBuilder {
    config: BackendConfig,
    password: Option<String>,
    dataset_label: Option<String>,
}

impl Default for CypherBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CypherBackendBuilder {
    /// Create a new builder with default connection settings
    pub fn new() -> Self {
        Self {
            config: BackendConfig {
                password: None,
                uri: "http://localhost:7474".to_string(),
                database: "neo4j".to_string(),
                username: "neo4j".to_string(),
                timeout_secs: 10,
            },
            password: None,
            dataset_label: None,
        }
    }

    /// Set the connection settings
    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the password used for basic auth
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the dataset label under which nodes and interactions are stored
    pub fn dataset_label(mut self, label: impl Into<String>) -> Self {
        self.dataset_label = Some(label.into());
        self
    }

    /// Attempt to connect and verify the backend
    ///
    /// Never fails. Verification runs a trivial query; if anything goes
    /// wrong the returned backend is offline and every later operation
    /// short-circuits.
    pub async fn connect(self) -> CypherBackend {
        let dataset_label = self
            .dataset_label
            .unwrap_or_else(|| DEFAULT_DATASET_LABEL.to_string());

        if !valid_dataset_label(&dataset_label) {
            warn!(
                dataset_label,
                "invalid dataset label, backend stays offline"
            );
            return CypherBackend::offline(DEFAULT_DATASET_LABEL);
        }

        let http = match HttpClient::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "failed to build HTTP client, backend stays offline");
                return CypherBackend::offline(dataset_label);
            }
        };

        let connection = LiveConnection {
            http,
            commit_url: format!(
                "{}/db/{}/tx/commit",
                self.config.uri.trim_end_matches('/'),
                self.config.database
            ),
            username: self.config.username,
            password: self.password.unwrap_or_default(),
        };

        match connection.run("RETURN 1", json!({})).await {
            Ok(_) => {
                info!(uri = %self.config.uri, dataset_label, "connected to graph backend");
                CypherBackend {
                    live: Some(connection),
                    dataset_label,
                }
            }
            Err(e) => {
                warn!(uri = %self.config.uri, error = %e, "graph backend unreachable, continuing offline");
                CypherBackend::offline(dataset_label)
            }
        }
    }
}

impl CypherBackend {
    /// Create a new builder
    pub fn builder() -> CypherBackendBuilder {
        CypherBackendBuilder::new()
    }

    /// A backend with no remote connection
    pub fn offline(dataset_label: impl Into<String>) -> Self {
        Self {
            live: None,
            dataset_label: dataset_label.into(),
        }
    }

    /// The dataset label this backend reads and writes under
    pub fn dataset_label(&self) -> &str {
        &self.dataset_label
    }

    fn interaction_label(&self) -> String {
        format!("Interaction_{}", self.dataset_label)
    }

    /// Run a read statement; offline backends return no rows
    pub async fn execute_read(&self, statement: &str, parameters: Value) -> Result<Vec<QueryRow>> {
        match &self.live {
            Some(connection) => connection.run(statement, parameters).await,
            None => Ok(Vec::new()),
        }
    }

    /// Run a write statement; offline backends succeed without effect
    pub async fn execute_write(&self, statement: &str, parameters: Value) -> Result<Vec<QueryRow>> {
        match &self.live {
            Some(connection) => connection.run(statement, parameters).await,
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Clone)]
struct LiveConnection {
    http: HttpClient,
    commit_url: String,
    username: String,
    password: String,
}

impl LiveConnection {
    async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<QueryRow>> {
        debug!(statement, "running cypher statement");

        let body = json!({
            "statements": [{
                "statement": statement,
                "parameters": parameters,
            }]
        });

        let response = self
            .http
            .post(&self.commit_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!("HTTP {}: {}", status, text)));
        }

        let tx: TxResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("malformed backend response: {}", e)))?;

        tx_to_rows(tx)
    }
}

/// Transactional endpoint response envelope
#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxDatum>,
}

#[derive(Debug, Deserialize)]
struct TxDatum {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    message: String,
}

/// Flatten a transaction response into rows keyed by column name
///
/// The endpoint reports Cypher failures inside a 2xx response, so success
/// requires an empty errors array, not just the status code.
fn tx_to_rows(tx: TxResponse) -> Result<Vec<QueryRow>> {
    if let Some(error) = tx.errors.first() {
        return Err(Error::Backend(format!("{}: {}", error.code, error.message)));
    }

    let mut rows = Vec::new();
    // One statement per request, so at most one result
    if let Some(result) = tx.results.into_iter().next() {
        for datum in result.data {
            let mut row = QueryRow::new();
            for (column, value) in result.columns.iter().zip(datum.row) {
                row.insert(column.clone(), value);
            }
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Deserialize result rows into events
///
/// Queries alias their columns to the event's field names, so each row is
/// an event object already.
fn rows_to_events(rows: Vec<QueryRow>) -> Result<Vec<InteractionEvent>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|e| Error::Backend(format!("malformed interaction row: {}", e)))
        })
        .collect()
}

const EVENT_COLUMNS: &str = "i.student_id AS student_id, i.node_id AS node_id, \
     i.node_label AS node_label, i.action_type AS action_type, \
     i.duration AS duration, i.timestamp AS timestamp";

#[async_trait]
impl GraphBackend for CypherBackend {
    fn is_live(&self) -> bool {
        self.live.is_some()
    }

    async fn insert_interaction(&self, event_id: &str, event: &InteractionEvent) -> Result<()> {
        let statement = format!(
            "CREATE (i:{} {{interaction_id: $interaction_id, student_id: $student_id, \
             node_id: $node_id, node_label: $node_label, action_type: $action_type, \
             duration: $duration, timestamp: $timestamp}})",
            self.interaction_label()
        );
        self.execute_write(
            &statement,
            json!({
                "interaction_id": event_id,
                "student_id": event.student_id,
                "node_id": event.node_id,
                "node_label": event.node_label,
                "action_type": event.action_type,
                "duration": event.duration,
                // Stored as the formatted wire string; lexicographic order
                // matches chronological order, so ORDER BY stays correct
                "timestamp": event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn list_interactions(&self) -> Result<Vec<InteractionEvent>> {
        let statement = format!(
            "MATCH (i:{}) RETURN {} ORDER BY i.timestamp DESC",
            self.interaction_label(),
            EVENT_COLUMNS
        );
        let rows = self.execute_read(&statement, json!({})).await?;
        rows_to_events(rows)
    }

    async fn list_interactions_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<InteractionEvent>> {
        let statement = format!(
            "MATCH (i:{} {{student_id: $student_id}}) RETURN {} ORDER BY i.timestamp DESC",
            self.interaction_label(),
            EVENT_COLUMNS
        );
        let rows = self
            .execute_read(&statement, json!({ "student_id": student_id }))
            .await?;
        rows_to_events(rows)
    }

    async fn clear_interactions(&self) -> Result<()> {
        let statement = format!("MATCH (i:{}) DELETE i", self.interaction_label());
        self.execute_write(&statement, json!({})).await?;
        Ok(())
    }

    async fn ensure_constraints(&self) -> Result<()> {
        let statement = format!(
            "CREATE CONSTRAINT IF NOT EXISTS FOR (i:{}) REQUIRE i.interaction_id IS UNIQUE",
            self.interaction_label()
        );
        self.execute_write(&statement, json!({})).await?;
        Ok(())
    }

    async fn import_graph(&self, document: &GraphDocument) -> Result<()> {
        // Wholesale replacement: this dataset's nodes go first
        self.clear_graph().await?;

        for node in &document.nodes {
            // Nodes carry the shared KnowledgeNode tag alongside the dataset
            // label; deletes and lookups go through the dataset label alone
            let statement = format!(
                "CREATE (n:{}:KnowledgeNode {{node_id: $node_id, label: $label, \
                 category: $category, level: $level, type: $type, properties: $properties}})",
                self.dataset_label
            );
            let properties = serde_json::to_string(&node.properties)
                .map_err(|e| Error::Other(format!("failed to serialize node properties: {}", e)))?;
            self.execute_write(
                &statement,
                json!({
                    "node_id": node.id,
                    "label": node.label,
                    "category": node.category.as_str(),
                    "level": node.level,
                    "type": node.node_type,
                    "properties": properties,
                }),
            )
            .await?;
        }

        for relationship in &document.relationships {
            let statement = format!(
                "MATCH (a:{label} {{node_id: $source}}), (b:{label} {{node_id: $target}}) \
                 CREATE (a)-[r:RELATES {{type: $type, properties: $properties}}]->(b)",
                label = self.dataset_label
            );
            let properties = serde_json::to_string(&relationship.properties).map_err(|e| {
                Error::Other(format!("failed to serialize relationship properties: {}", e))
            })?;
            self.execute_write(
                &statement,
                json!({
                    "source": relationship.source,
                    "target": relationship.target,
                    "type": relationship.type_or_default(),
                    "properties": properties,
                }),
            )
            .await?;
        }

        Ok(())
    }

    async fn clear_graph(&self) -> Result<()> {
        let statement = format!("MATCH (n:{}) DETACH DELETE n", self.dataset_label);
        self.execute_write(&statement, json!({})).await?;
        Ok(())
    }

    async fn close(&self) {
        // The pooled HTTP client holds no server-side session; dropping it
        // releases everything
        if self.live.is_some() {
            debug!("closing graph backend connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_offline_backend_reports_not_live() {
        let backend = CypherBackend::offline("knowtrace");
        assert!(!backend.is_live());
        assert_eq!(backend.dataset_label(), "knowtrace");
    }

    #[tokio::test]
    async fn test_offline_reads_and_writes_short_circuit() {
        let backend = CypherBackend::offline("knowtrace");

        let rows = backend.execute_read("MATCH (n) RETURN n", json!({})).await.unwrap();
        assert!(rows.is_empty());

        let rows = backend.execute_write("CREATE (n)", json!({})).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_offline_trait_operations_are_deterministic_noops() {
        let backend = CypherBackend::offline("knowtrace");
        let event = InteractionEvent::new(
            "s1",
            "n1",
            "label",
            "view",
            0,
            NaiveDateTime::parse_from_str("2025-08-25 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
        );

        backend.insert_interaction("id1", &event).await.unwrap();
        assert!(backend.list_interactions().await.unwrap().is_empty());
        assert!(backend.list_interactions_for_student("s1").await.unwrap().is_empty());
        backend.clear_interactions().await.unwrap();
        backend.close().await;
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_degrades_to_offline() {
        let config = BackendConfig {
            password: None,
            // Reserved port, nothing listens here
            uri: "http://127.0.0.1:1".to_string(),
            database: "neo4j".to_string(),
            username: "neo4j".to_string(),
            timeout_secs: 1,
        };

        let backend = CypherBackend::builder()
            .config(config)
            .password("irrelevant")
            .dataset_label("geology")
            .connect()
            .await;

        assert!(!backend.is_live());
        assert_eq!(backend.dataset_label(), "geology");
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_dataset_label() {
        let backend = CypherBackend::builder()
            .dataset_label("bad label!")
            .connect()
            .await;

        assert!(!backend.is_live());
        assert_eq!(backend.dataset_label(), DEFAULT_DATASET_LABEL);
    }

    #[test]
    fn test_interaction_label_is_namespaced() {
        let backend = CypherBackend::offline("Danmu_xujiying");
        assert_eq!(backend.interaction_label(), "Interaction_Danmu_xujiying");
    }

    #[test]
    fn test_tx_response_rows_zip_columns() {
        let body = json!({
            "results": [{
                "columns": ["student_id", "duration"],
                "data": [
                    {"row": ["s1", 12]},
                    {"row": ["s2", 0]}
                ]
            }],
            "errors": []
        });
        let tx: TxResponse = serde_json::from_value(body).unwrap();

        let rows = tx_to_rows(tx).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["student_id"], "s1");
        assert_eq!(rows[0]["duration"], 12);
        assert_eq!(rows[1]["student_id"], "s2");
    }

    #[test]
    fn test_tx_response_errors_fail_even_with_2xx_shape() {
        let body = json!({
            "results": [],
            "errors": [{
                "code": "Neo.ClientError.Statement.SyntaxError",
                "message": "Invalid input"
            }]
        });
        let tx: TxResponse = serde_json::from_value(body).unwrap();

        let err = tx_to_rows(tx).unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_rows_to_events_parses_aliased_columns() {
        let body = json!({
            "results": [{
                "columns": ["student_id", "node_id", "node_label", "action_type", "duration", "timestamp"],
                "data": [
                    {"row": ["s1", "n1", "陷落柱", "view", 12, "2025-08-25 10:30:00"]}
                ]
            }],
            "errors": []
        });
        let tx: TxResponse = serde_json::from_value(body).unwrap();
        let rows = tx_to_rows(tx).unwrap();

        let events = rows_to_events(rows).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].student_id, "s1");
        assert_eq!(events[0].node_label, "陷落柱");
        assert_eq!(events[0].duration, 12);
    }

    #[test]
    fn test_rows_to_events_rejects_incomplete_rows() {
        let mut row = QueryRow::new();
        row.insert("student_id".to_string(), json!("s1"));

        let err = rows_to_events(vec![row]).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}
