//! Scoped HTTP session for the weather API
//!
//! An [`IngestionSession`] owns the HTTP client between `connect` and `close`.
//! Fetching outside that window fails with [`IngestError::NotConnected`], and
//! dropping a session releases the client on every exit path.

use crate::api::endpoints;
use crate::api::pagination::PaginatedFetcher;
use crate::api::types::ApiEnvelope;
use crate::config::ApiConfig;
use crate::error::{IngestError, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

pub struct IngestionSession {
    client: Option<Client>,
    config: ApiConfig,
}

impl IngestionSession {
    /// Create a session without opening it
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: None,
            config,
        }
    }

    /// Create and open a session
    pub fn open(config: ApiConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.connect()?;
        Ok(session)
    }

    /// Build the HTTP client. Opening an open session is a no-op.
    pub fn connect(&mut self) -> Result<()> {
        if self.client.is_some() {
            return Ok(());
        }

        let client = Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| IngestError::transport(&self.config.base_url, e))?;

        debug!(base_url = %self.config.base_url, "Ingestion session opened");
        self.client = Some(client);
        Ok(())
    }

    /// Release the HTTP client. Closing a closed session is a no-op.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!(base_url = %self.config.base_url, "Ingestion session closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(IngestError::NotConnected)
    }

    /// Pagination-aware fetcher bound to this session
    pub fn fetcher(&self) -> PaginatedFetcher<'_> {
        PaginatedFetcher::new(self)
    }

    /// Issue one GET and unwrap the envelope's `data` object
    pub async fn get_data(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Map<String, Value>> {
        let client = self.client()?;
        let url = endpoints::endpoint_url(&self.config.base_url, path);

        let response = client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| IngestError::transport(&url, e))?
            .error_for_status()
            .map_err(|e| IngestError::transport(&url, e))?;

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| IngestError::transport(&url, e))?;

        if !envelope.is_success() {
            return Err(IngestError::Api {
                url,
                code: envelope.code,
                message: envelope.error_message(),
            });
        }

        match envelope.data {
            Value::Object(data) => Ok(data),
            other => Err(IngestError::InconsistentPage {
                url,
                reason: format!("expected a data object, got {}", json_kind(&other)),
            }),
        }
    }
}

impl Drop for IngestionSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run `f` inside an opened session and close it afterwards, whatever `f` returns
pub async fn with_session<T, F>(config: ApiConfig, f: F) -> Result<T>
where
    F: for<'s> FnOnce(&'s IngestionSession) -> BoxFuture<'s, Result<T>>,
{
    let mut session = IngestionSession::open(config)?;
    let result = f(&session).await;
    session.close();
    result
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
