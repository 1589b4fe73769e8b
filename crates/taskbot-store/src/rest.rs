use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;

use crate::backend::Backend;
use crate::error::StoreError;
use crate::query::Query;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgREST backend (Supabase `/rest/v1`).
///
/// The service key is sent both as the `apikey` header and as a bearer token.
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::Network)?;

        tracing::info!("REST store client initialized for {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build URL for a collection
    fn url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the credential headers every request carries
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Writes ask for the affected rows back
    fn returning(&self, request: RequestBuilder) -> RequestBuilder {
        self.authed(request).header("Prefer", "return=representation")
    }

    /// Handle store response. Any non-2xx is a failure; an empty body is no rows.
    async fn handle_response(
        &self,
        method: &str,
        table: &str,
        response: Response,
    ) -> Result<Vec<Value>, StoreError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("{} {} failed with HTTP {}: {}", method, table, status, body);
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row => Ok(vec![row]),
        }
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let table = query.table_name();
        let response = self
            .authed(self.client.get(self.url(table)))
            .query(&query.to_params())
            .send()
            .await?;

        self.handle_response("GET", table, response).await
    }

    async fn insert(&self, table: &'static str, row: Value) -> Result<Vec<Value>, StoreError> {
        let response = self
            .returning(self.client.post(self.url(table)))
            .json(&row)
            .send()
            .await?;

        self.handle_response("POST", table, response).await
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError> {
        let table = query.table_name();
        let response = self
            .returning(self.client.patch(self.url(table)))
            .query(&query.to_params())
            .json(&patch)
            .send()
            .await?;

        self.handle_response("PATCH", table, response).await
    }
}
