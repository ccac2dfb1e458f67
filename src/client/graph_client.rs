// GraphQL-over-HTTP client shared by the subgraph adapters
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::trace;

use crate::error::{ReimburseError, Result};

/// Sends one GraphQL request and returns the raw response body.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    async fn execute(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value>;
}

pub struct GraphClient {
    url: String,
    client: Client,
}

#[derive(Deserialize)]
struct GraphResponse {
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
}

impl GraphClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReimburseError::Query(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GraphTransport for GraphClient {
    async fn execute(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value> {
        let request = json!({
            "query": query,
            "variables": variables,
        });
        trace!(url = %self.url, %request, "GraphQL request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReimburseError::Query(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(ReimburseError::Query(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ReimburseError::Deserialization(format!("Failed to parse response: {}", e)))
    }
}

/// Posts `query` with `variables` and decodes the `data` member into `T`.
pub async fn fetch<T, C>(client: &C, query: &str, variables: serde_json::Value) -> Result<T>
where
    T: DeserializeOwned,
    C: GraphTransport + ?Sized,
{
    decode_response(client.execute(query, variables).await?)
}

/// Unwraps a GraphQL response body, failing on any reported error.
pub fn decode_response<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    let response: GraphResponse = serde_json::from_value(body)
        .map_err(|e| ReimburseError::Deserialization(format!("Malformed GraphQL response: {}", e)))?;

    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(ReimburseError::Query(messages.join("; ")));
    }

    let data = response
        .data
        .ok_or_else(|| ReimburseError::Query("Response carried no data".to_string()))?;
    serde_json::from_value(data).map_err(|e| ReimburseError::Deserialization(e.to_string()))
}
