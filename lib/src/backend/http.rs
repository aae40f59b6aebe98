// lib/src/backend/http.rs

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method};
use serde_json::Value;

use models::TransportError;

use crate::backend::{check_envelope, CareBackend};
use crate::config::BackendConfig;

/// `CareBackend` over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build reqwest client")?;
        Ok(HttpBackend {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, method: Method, label: &'static str, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        debug!("{} {}", label, path);
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::new(label, path, e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::new(label, path, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            warn!("{} {} returned {}", label, path, status);
            return Err(TransportError::new(label, path, Some(status.as_u16()), text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        // Undecodable bodies are handed on as text; the normalizer treats
        // them as an unknown shape.
        let decoded = serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("{} {} returned a non-JSON body: {}", label, path, e);
            Value::String(text)
        });
        check_envelope(label, path, decoded)
    }
}

#[async_trait]
impl CareBackend for HttpBackend {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.send(Method::GET, "GET", path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.send(Method::POST, "POST", path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.send(Method::PUT, "PUT", path, Some(body)).await
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
        self.send(Method::DELETE, "DELETE", path, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_url_without_double_slash() {
        let config = BackendConfig {
            base_url: "http://care.local:8080/api/".to_string(),
            ..BackendConfig::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://care.local:8080/api");
        assert_eq!(backend.url("/ElderlyRecord/3"), "http://care.local:8080/api/ElderlyRecord/3");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: Some(2),
            ..BackendConfig::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        let err = backend.get("/ElderlyRecord/1").await.unwrap_err();
        assert_eq!(err.method, "GET");
        assert_eq!(err.endpoint, "/ElderlyRecord/1");
    }
}
