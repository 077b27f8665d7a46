//! REST API client for the scraping service HTTP endpoints.
//!
//! Wraps job submission, status polling, result and download retrieval,
//! and the health endpoint using [`reqwest`]. Non-2xx bodies are
//! normalized into a [`RemoteError`] at this boundary, so nothing
//! downstream ever sees the service's ad-hoc error shapes.

use serde::{Deserialize, Serialize};

use scrapedeck_core::health::HealthSample;
use scrapedeck_core::remote_error::RemoteError;

use crate::config::ClientConfig;

/// HTTP client for one scraping service.
pub struct ScrapeApi {
    client: reqwest::Client,
    api_url: String,
    auth_token: Option<String>,
}

/// Request body for job submission (`POST /crawl`).
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    /// Page to crawl.
    pub url: String,
    /// Crawl depth, when the caller wants to override the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Named spider to run, when the caller wants a specific one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spider: Option<String>,
}

/// Response returned by `POST /crawl` after a job is queued.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned job identifier.
    pub job_id: String,
}

/// Response returned by `GET /status/{job_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Echo of the job identifier.
    pub job_id: String,
    /// Raw wire status value; interpreted by `JobStatus::from_wire`.
    pub status: String,
    /// Human-readable progress message. The service may omit it.
    #[serde(default)]
    pub message: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("service error ({status}): {error}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Normalized error payload.
        error: RemoteError,
    },
}

impl ScrapeApi {
    /// Create an API client from the client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client construction only fails on invalid TLS config");
        Self {
            client,
            api_url: config.api_url.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across several services).
    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url,
            auth_token,
        }
    }

    /// Base HTTP URL of the service.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a crawl job.
    ///
    /// Sends `POST /crawl` with the URL (and optional depth/spider) and
    /// returns the server-assigned job identifier. A failure here means
    /// the job was never created; callers surface it immediately rather
    /// than retrying.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        let response = self
            .authorized(self.client.post(format!("{}/crawl", self.api_url)))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current status of a job (`GET /status/{job_id}`).
    pub async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/status/{}", self.api_url, job_id)),
            )
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the result records of a finished job (`GET /result/{job_id}`).
    pub async fn result(&self, job_id: &str) -> Result<Vec<serde_json::Value>, ApiError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/result/{}", self.api_url, job_id)),
            )
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download the full result file (`GET /api/download/{job_id}`).
    pub async fn download(&self, job_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/api/download/{}", self.api_url, job_id)),
            )
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch the current health sample (`GET /health`).
    pub async fn health(&self) -> Result<HealthSample, ApiError> {
        let response = self
            .authorized(self.client.get(format!("{}/health", self.api_url)))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Attach the bearer token when one is configured.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Ensure the response has a success status code. On failure the
    /// body is normalized into a [`RemoteError`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                error: RemoteError::from_body(status.as_u16(), &body),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_omits_unset_optionals() {
        let request = SubmitRequest {
            url: "https://example.com".to_string(),
            depth: None,
            spider: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"url":"https://example.com"}"#);
    }

    #[test]
    fn submit_request_serializes_optionals_when_set() {
        let request = SubmitRequest {
            url: "https://example.com".to_string(),
            depth: Some(2),
            spider: Some("news".to_string()),
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(json["depth"], 2);
        assert_eq!(json["spider"], "news");
    }

    #[test]
    fn status_response_message_defaults_to_empty() {
        let response: StatusResponse =
            serde_json::from_str(r#"{"job_id": "abc123", "status": "running"}"#).unwrap();
        assert_eq!(response.status, "running");
        assert!(response.message.is_empty());
    }
}
