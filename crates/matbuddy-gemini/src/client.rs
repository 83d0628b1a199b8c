// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! The client makes exactly one request per call. Retry and fallback
//! decisions belong to the caller, which classifies the error text.

use std::time::Duration;

use matbuddy_core::MatbuddyError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse};

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, MatbuddyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                MatbuddyError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MatbuddyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Runs one `generateContent` call against `model`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, MatbuddyError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| MatbuddyError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model, "generateContent response received");

        let body = response.text().await.map_err(|e| MatbuddyError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "Gemini API error {} ({}): {}",
                    status.as_u16(),
                    api_err.error.status,
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(MatbuddyError::provider(message));
        }

        serde_json::from_str(&body).map_err(|e| MatbuddyError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiPart, Content};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new("test-api-key", base_url, Duration::from_secs(5)).unwrap()
    }

    fn test_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(vec![ApiPart::text("oss")])],
            system_instruction: None,
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn generate_content_success() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "oss! what did you drill?"}]},
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-2.5-flash-lite"
        });

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-lite:generateContent"))
            .and(header("x-goog-api-key", "test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let resp = test_client(&server.uri())
            .generate_content("gemini-2.5-flash-lite", &test_request())
            .await
            .unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.model_version.as_deref(), Some("gemini-2.5-flash-lite"));
    }

    #[tokio::test]
    async fn rate_limit_error_keeps_code_and_status() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        });

        // No retry inside the client.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .generate_content("m", &test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(
            err.contains("Gemini API error 429 (RESOURCE_EXHAUSTED): Quota exceeded"),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn non_json_error_body_is_reported_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .generate_content("gone", &test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("404"), "got: {err}");
        assert!(err.contains("model not found"), "got: {err}");
    }
}
