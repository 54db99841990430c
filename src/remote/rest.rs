//! PostgREST client (the row API Supabase serves under `/rest/v1`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::{RemoteError, RemoteStore, Row};
use crate::config::RemoteConfig;
use crate::error::KitchenError;

#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    api_key: String,
    id_field: String,
}

impl RestClient {
    /// Build a client for `base_url`, authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        id_field: &str,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kitchen-queue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            id_field: id_field.to_string(),
        })
    }

    /// Build a client from the `remote` section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error if the URL or key is missing.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, KitchenError> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            KitchenError::Config(
                "remote.base_url is not set (config.yaml or KITCHEN_QUEUE_URL)".to_string(),
            )
        })?;
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            KitchenError::Config(
                "remote.api_key is not set (config.yaml or KITCHEN_QUEUE_API_KEY)".to_string(),
            )
        })?;

        Ok(Self::new(
            base_url,
            api_key,
            Duration::from_secs(config.timeout_secs),
            &config.id_field,
        )?)
    }

    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(), RemoteError> {
        let res = self.authorized(builder).send().await?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        Err(RemoteError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

/// Render an identifier as the operand of a PostgREST `eq.` filter.
#[must_use]
pub fn eq_filter(id: &Value) -> String {
    match id {
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    }
}

#[async_trait]
impl RemoteStore for RestClient {
    async fn insert(&self, table: &str, row: &Row) -> Result<(), RemoteError> {
        debug!(table, "POST row");
        self.send(self.http.post(self.table_url(table)).json(row))
            .await
    }

    async fn update(&self, table: &str, patch: &Row, id: &Value) -> Result<(), RemoteError> {
        debug!(table, %id, "PATCH row");
        let builder = self
            .http
            .patch(self.table_url(table))
            .query(&[(self.id_field.as_str(), eq_filter(id))])
            .json(patch);
        self.send(builder).await
    }

    async fn delete(&self, table: &str, id: &Value) -> Result<(), RemoteError> {
        debug!(table, %id, "DELETE row");
        let builder = self
            .http
            .delete(self.table_url(table))
            .query(&[(self.id_field.as_str(), eq_filter(id))]);
        self.send(builder).await
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        // Any HTTP answer, even 401, means the network path is up
        self.authorized(self.http.get(format!("{}/rest/v1/", self.base_url)))
            .send()
            .await?;
        Ok(())
    }
}
