//! Token endpoint dispatcher and validator
//!
//! Sends one [`PreparedRequest`] over a shared HTTP client and classifies the
//! outcome. Transport failures become [`SyncError::EndpointUnreachable`], any
//! status of 300 or above becomes [`SyncError::BadTokenEndpoint`], everything
//! else is a [`TokenPayload`]. No retries happen here.

use super::request::{PreparedRequest, CONTENT_TYPE};
use super::template::{PlaceholderMode, TemplateResolver};
use super::types::{HttpMethod, TokenPayload, TokenRequestSpec};
use crate::config::{Config, HttpClientConfig};
use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stateless checker of a token endpoint; cheap to clone and share
#[derive(Debug, Clone)]
pub struct TokenEndpointValidator {
    http_client: Client,
    placeholder_mode: PlaceholderMode,
}

impl TokenEndpointValidator {
    /// Build the shared client from the HTTP client configuration
    pub fn new(config: &HttpClientConfig, placeholder_mode: PlaceholderMode) -> Result<Self> {
        if config.insecure_tls {
            warn!(
                "TLS verification of token endpoints is disabled; token responses can be \
                 tampered with by a man-in-the-middle"
            );
        }

        let http_client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .use_rustls_tls()
            .tls_built_in_root_certs(true)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|e| SyncError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            placeholder_mode,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.http_client, config.template.placeholder_mode)
    }

    /// Resolve `spec` against `now`, send it, and classify the response
    pub async fn validate(&self, spec: &TokenRequestSpec, now: DateTime<Utc>) -> Result<TokenPayload> {
        let resolver = TemplateResolver::new(now, self.placeholder_mode);
        let request = PreparedRequest::build(spec, &resolver);
        self.dispatch(&request).await
    }

    /// Send an already prepared request
    pub async fn dispatch(&self, request: &PreparedRequest) -> Result<TokenPayload> {
        let start_time = Instant::now();
        debug!("Probing token endpoint: {} {}", request.method, request.url);

        let mut builder = match request.method {
            HttpMethod::Get => self.http_client.get(&request.url),
            HttpMethod::Post => self.http_client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body.encode() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Token endpoint {} unreachable: {}", request.url, e);
            SyncError::endpoint_unreachable(e.to_string())
        })?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Token endpoint {} returned error status {}: {}",
                request.url, status, body
            );
            return Err(SyncError::bad_token_endpoint());
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|content_type| content_type.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);

        let body = response.text().await.map_err(|e| {
            warn!("Failed to read token endpoint response from {}: {}", request.url, e);
            SyncError::endpoint_unreachable(e.to_string())
        })?;

        info!(
            "Token endpoint {} answered {} in {:?}",
            request.url,
            status,
            start_time.elapsed()
        );

        if is_json {
            match serde_json::from_str(&body) {
                Ok(raw) => return Ok(TokenPayload::Json(raw)),
                Err(e) => debug!("Response declared JSON but did not parse, keeping raw text: {}", e),
            }
        }
        Ok(TokenPayload::Text(body))
    }
}
