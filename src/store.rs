use crate::http::build_client;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Thin client over the MongoDB Atlas Data API. The store is read-only from
/// this service's perspective: the only operation is an unfiltered scan of
/// one collection.
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    api_key: String,
    data_source: String,
    database: String,
    http: Client,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    documents: Vec<Value>,
}

impl StoreClient {
    /// `None` when the store is not configured; callers treat that as the
    /// not-connected failure path.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("MONGODB_DATA_API_URL").ok()?;
        let api_key = std::env::var("MONGODB_DATA_API_KEY").ok()?;
        let data_source =
            std::env::var("MONGODB_DATA_SOURCE").unwrap_or_else(|_| "Cluster0".into());
        let database = std::env::var("MONGODB_DATABASE").unwrap_or_else(|_| "Sr_web_2".into());
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            data_source,
            database,
            http: build_client(),
        })
    }

    /// Full scan, no filter, no pagination. Collections here hold at most a
    /// few hundred small documents.
    pub async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/action/find", self.base_url);
        let body = json!({
            "dataSource": self.data_source,
            "database": self.database,
            "collection": collection,
            "filter": {},
        });

        let response = self
            .http
            .post(url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let payload: FindResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Deserialize(err.to_string()))?;
        Ok(payload.documents)
    }
}
