//! Pinecone vector store provider
//!
//! Talks to the Pinecone REST API directly: the control plane for describing
//! and creating serverless indexes, and each index's own data-plane host for
//! upserts and queries. Index hosts are resolved once and cached.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::vector_store::{IndexRecord, VectorMatch, VectorStoreProvider};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pinecone serverless index client
#[derive(Debug)]
pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    api_version: String,
    control_plane_url: String,
    cloud: String,
    region: String,
    batch_size: usize,
    create_index_if_missing: bool,
    index_ready_timeout: Duration,
    /// Index name to data-plane base URL
    hosts: RwLock<HashMap<String, String>>,
}

impl PineconeStore {
    /// Create a new store client; fails without an API key
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config("PINECONE_API_KEY is not set"))?;

        if config.batch_size == 0 {
            return Err(Error::config("vector_db.batch_size must be greater than 0"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            api_version: config.api_version.clone(),
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            batch_size: config.batch_size,
            create_index_if_missing: config.create_index_if_missing,
            index_ready_timeout: Duration::from_secs(config.index_ready_timeout_secs),
            hosts: RwLock::new(HashMap::new()),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    /// Describe an index; `None` when it does not exist
    async fn describe_index(&self, index: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_plane_url, index);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| Error::VectorDb(format!("Pinecone describe failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorDb(format!(
                "Pinecone describe failed ({}): {}",
                status, body
            )));
        }

        let description = response
            .json()
            .await
            .map_err(|e| Error::VectorDb(format!("Failed to parse Pinecone response: {}", e)))?;

        Ok(Some(description))
    }

    async fn create_index(&self, index: &str, dimension: usize) -> Result<()> {
        let url = format!("{}/indexes", self.control_plane_url);
        let body = json!({
            "name": index,
            "dimension": dimension,
            "metric": "cosine",
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::VectorDb(format!("Pinecone create index failed: {}", e)))?;

        // 409: created concurrently by another ingester
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorDb(format!(
                "Pinecone create index failed ({}): {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Poll the control plane until the index reports ready
    async fn wait_until_ready(&self, index: &str) -> Result<IndexDescription> {
        let deadline = tokio::time::Instant::now() + self.index_ready_timeout;

        loop {
            if let Some(description) = self.describe_index(index).await? {
                if description.status.ready {
                    return Ok(description);
                }
                tracing::debug!(
                    "Index '{}' not ready yet (state: {})",
                    index,
                    description.status.state
                );
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::VectorDb(format!(
                    "Index '{}' was not ready after {}s",
                    index,
                    self.index_ready_timeout.as_secs()
                )));
            }

            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    fn cache_host(&self, index: &str, host: &str) {
        self.hosts
            .write()
            .insert(index.to_string(), normalize_host(host));
    }

    /// Data-plane base URL for an index
    async fn host_for(&self, index: &str) -> Result<String> {
        let cached = self.hosts.read().get(index).cloned();
        if let Some(host) = cached {
            return Ok(host);
        }

        let description = self
            .describe_index(index)
            .await?
            .ok_or_else(|| Error::VectorDb(format!("Index '{}' does not exist", index)))?;

        self.cache_host(index, &description.host);
        Ok(normalize_host(&description.host))
    }
}

/// Hosts come back without a scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Debug, serde::Deserialize)]
struct IndexDescription {
    dimension: usize,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, serde::Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[derive(serde::Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexRecord],
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn ensure_index(&self, index: &str, dimension: usize) -> Result<()> {
        if let Some(description) = self.describe_index(index).await? {
            if description.dimension != dimension {
                return Err(Error::DimensionMismatch {
                    expected: description.dimension,
                    actual: dimension,
                });
            }
            self.cache_host(index, &description.host);
            return Ok(());
        }

        if !self.create_index_if_missing {
            return Err(Error::VectorDb(format!(
                "Index '{}' does not exist and automatic creation is disabled",
                index
            )));
        }

        tracing::info!(
            "Creating Pinecone index '{}' (dimension {}, {}/{})",
            index,
            dimension,
            self.cloud,
            self.region
        );
        self.create_index(index, dimension).await?;

        let description = self.wait_until_ready(index).await?;
        if description.dimension != dimension {
            return Err(Error::DimensionMismatch {
                expected: description.dimension,
                actual: dimension,
            });
        }
        self.cache_host(index, &description.host);

        Ok(())
    }

    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };

        let expected = first.values.len();
        if let Some(bad) = records.iter().find(|r| r.values.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.values.len(),
            });
        }

        let url = format!("{}/vectors/upsert", self.host_for(index).await?);

        for (batch_number, batch) in records.chunks(self.batch_size).enumerate() {
            let response = self
                .request(reqwest::Method::POST, &url)
                .json(&UpsertRequest { vectors: batch })
                .send()
                .await
                .map_err(|e| Error::VectorDb(format!("Pinecone upsert failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::VectorDb(format!(
                    "Pinecone upsert failed ({}): {}",
                    status, body
                )));
            }

            tracing::debug!(
                "Upserted batch {} ({} vectors) into '{}'",
                batch_number + 1,
                batch.len(),
                index
            );
        }

        Ok(records.len())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>> {
        let url = format!("{}/query", self.host_for(index).await?);
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
        };

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::VectorDb(format!("Pinecone query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorDb(format!(
                "Pinecone query failed ({}): {}",
                status, body
            )));
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorDb(format!("Failed to parse Pinecone response: {}", e)))?;

        Ok(query_response.matches)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> VectorDbConfig {
        VectorDbConfig {
            api_key: Some("pc-test".to_string()),
            control_plane_url: server.uri(),
            index_ready_timeout_secs: 5,
            ..Default::default()
        }
    }

    fn description(server: &MockServer, dimension: usize, ready: bool) -> Value {
        json!({
            "name": "notes",
            "dimension": dimension,
            "metric": "cosine",
            "host": server.uri(),
            "status": {"ready": ready, "state": if ready { "Ready" } else { "Initializing" }}
        })
    }

    fn record(id: usize, values: Vec<f32>) -> IndexRecord {
        let mut metadata = Map::new();
        metadata.insert("text".to_string(), json!(format!("chunk {}", id)));
        IndexRecord {
            id: format!("id-{}", id),
            values,
            metadata,
        }
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = PineconeStore::new(&VectorDbConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("idx.svc.pinecone.io"), "https://idx.svc.pinecone.io");
        assert_eq!(normalize_host("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_ensure_index_existing_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .and(header("Api-Key", "pc-test"))
            .and(header("X-Pinecone-API-Version", "2024-07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 3, true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        store.ensure_index("notes", 3).await.unwrap();
        store.ensure_index("notes", 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_index_dimension_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 768, true)))
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        let err = store.ensure_index("notes", 384).await.unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 768,
                actual: 384
            }
        ));
    }

    #[tokio::test]
    async fn test_ensure_index_creates_serverless_cosine_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_partial_json(json!({
                "name": "notes",
                "dimension": 3,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(description(&server, 3, false)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 3, true)))
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        store.ensure_index("notes", 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_index_absent_without_creation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.create_index_if_missing = false;
        let store = PineconeStore::new(&cfg).unwrap();
        let err = store.ensure_index("notes", 3).await.unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));
    }

    #[tokio::test]
    async fn test_upsert_in_batches_of_one_hundred() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 2, true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 100})))
            .expect(3)
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        let records: Vec<IndexRecord> = (0..250).map(|i| record(i, vec![0.1, 0.2])).collect();
        assert_eq!(store.upsert("notes", &records).await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_upsert_rejects_mixed_lengths_before_network() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        let records = vec![record(0, vec![0.1, 0.2]), record(1, vec![0.1, 0.2, 0.3])];
        let err = store.upsert("notes", &records).await.unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_upsert_failure_stops_remaining_batches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 2, true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        let records: Vec<IndexRecord> = (0..150).map(|i| record(i, vec![0.1, 0.2])).collect();
        let err = store.upsert("notes", &records).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_query_returns_matches_in_service_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, 2, true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({
                "topK": 2,
                "includeMetadata": true,
                "includeValues": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "a", "score": 0.91, "metadata": {"text": "first", "source": "a.txt"}},
                    {"id": "b", "score": 0.42}
                ],
                "namespace": ""
            })))
            .mount(&server)
            .await;

        let store = PineconeStore::new(&config(&server)).unwrap();
        let matches = store.query("notes", &[0.1, 0.2], 2, true).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert_eq!(
            matches[0].metadata.as_ref().and_then(|m| m.get("text")),
            Some(&json!("first"))
        );
        assert!(matches[1].metadata.is_none());
    }
}
