//! OpenAI-compatible chat completions gateway with bounded retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::LlmConfig;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Attempts per `complete` call, including the first one.
pub const MAX_ATTEMPTS: u32 = 5;

/// Pause before retrying a rate-limited request.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

const PROVIDER: &str = "openai";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
}

impl ApiError {
    fn describe(&self) -> String {
        format!("API error, type: {}: {}", self.kind, self.message)
    }
}

/// What to do after one HTTP exchange.
#[derive(Debug)]
enum Outcome {
    Answer(String),
    Retry { detail: String, pause: bool },
    Fail(LlmError),
}

/// Gateway to a chat completions endpoint.
///
/// Rate limits and server-reported errors are retried up to [`MAX_ATTEMPTS`]
/// times; unreachable endpoints and deterministic client errors (bad
/// request, auth) fail on the spot.
pub struct OpenAiGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    model: String,
    max_attempts: u32,
    retry_pause: Duration,
}

impl OpenAiGateway {
    /// Build the gateway and its HTTP client (proxy and timeout included).
    ///
    /// Only `proxy_url` is honoured; proxy environment variables are not.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);

        builder = match config.proxy_url.as_deref() {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(normalize_proxy_url(proxy_url)).map_err(|e| {
                    LlmError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: format!("Invalid proxy URL: {e}"),
                    }
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let client = builder.build().map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_attempts: MAX_ATTEMPTS,
            retry_pause: DEFAULT_RETRY_PAUSE,
        })
    }

    /// Override the rate-limit pause (tests use a few milliseconds).
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiGateway {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
        };
        let body = serde_json::to_vec(&request)?;
        let mut last_failure = String::new();

        for attempt in 1..=self.max_attempts {
            let resp = self
                .client
                .post(&self.api_url)
                .bearer_auth(self.api_key.expose_secret())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await
                .map_err(|e| LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                })?;

            let status = resp.status();
            let outcome = match resp.text().await {
                Ok(text) => classify_response(status, &text),
                Err(e) => {
                    warn!(attempt, %status, error = %e, "Failed to read completion response body");
                    Outcome::Retry {
                        detail: "unable to read response body".to_string(),
                        pause: true,
                    }
                }
            };

            match outcome {
                Outcome::Answer(content) => {
                    debug!(attempt, model = %self.model, "Completion received");
                    return Ok(content);
                }
                Outcome::Fail(err) => return Err(err),
                Outcome::Retry { detail, pause } => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        %status,
                        detail = %detail,
                        "Completion request failed, retrying"
                    );
                    last_failure = detail;
                    if pause {
                        tokio::time::sleep(self.retry_pause).await;
                    }
                }
            }
        }

        Err(LlmError::RetriesExceeded { last: last_failure })
    }
}

/// Decide the fate of one response.
fn classify_response(status: StatusCode, body: &str) -> Outcome {
    if status.is_success() {
        let parsed: CompletionResponse = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Outcome::Fail(LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Outcome::Fail(LlmError::NoChoices);
        };
        return match choice.message.content.filter(|c| !c.trim().is_empty()) {
            Some(content) => Outcome::Answer(content),
            None => Outcome::Fail(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "empty message content".to_string(),
            }),
        };
    }

    let api_error = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|r| r.error);
    let described = api_error
        .as_ref()
        .filter(|e| !e.message.is_empty())
        .map(ApiError::describe);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Outcome::Retry {
            detail: described.unwrap_or_else(|| body.to_string()),
            pause: true,
        };
    }

    if !is_deterministic_client_error(status) {
        if let Some(detail) = described {
            return Outcome::Retry {
                detail,
                pause: false,
            };
        }
    }

    let api_error = api_error.unwrap_or_default();
    Outcome::Fail(LlmError::Api {
        status,
        kind: api_error.kind,
        message: if api_error.message.is_empty() {
            body.to_string()
        } else {
            api_error.message
        },
    })
}

/// 4xx statuses that fail the same way on every attempt.
fn is_deterministic_client_error(status: StatusCode) -> bool {
    status.is_client_error()
        && !matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS
        )
}

/// A bare `host:port` proxy is SOCKS5.
fn normalize_proxy_url(proxy_url: &str) -> String {
    if proxy_url.contains("://") {
        proxy_url.to_string()
    } else {
        format!("socks5://{proxy_url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Your number is 7"}}]}"#;

    #[test]
    fn success_returns_first_choice() {
        let body = r#"{"choices":[
            {"message":{"role":"assistant","content":"first"}},
            {"message":{"role":"assistant","content":"second"}}
        ]}"#;
        assert!(matches!(
            classify_response(StatusCode::OK, body),
            Outcome::Answer(ref c) if c == "first"
        ));
        assert!(matches!(
            classify_response(StatusCode::OK, SUCCESS),
            Outcome::Answer(ref c) if c == "Your number is 7"
        ));
    }

    #[test]
    fn success_without_choices_fails() {
        assert!(matches!(
            classify_response(StatusCode::OK, r#"{"choices":[]}"#),
            Outcome::Fail(LlmError::NoChoices)
        ));
    }

    #[test]
    fn success_with_empty_content_fails() {
        for body in [
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#,
        ] {
            assert!(
                matches!(
                    classify_response(StatusCode::OK, body),
                    Outcome::Fail(LlmError::InvalidResponse { ref reason, .. })
                        if reason == "empty message content"
                ),
                "{body}"
            );
        }
    }

    #[test]
    fn success_with_garbage_fails() {
        assert!(matches!(
            classify_response(StatusCode::OK, "<html>"),
            Outcome::Fail(LlmError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn rate_limit_keeps_raw_body_and_pauses() {
        match classify_response(StatusCode::TOO_MANY_REQUESTS, "slow down") {
            Outcome::Retry { detail, pause } => {
                assert_eq!(detail, "slow down");
                assert!(pause);
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn server_error_with_api_body_is_retried() {
        let body = r#"{"error":{"message":"The server had an error","type":"server_error"}}"#;
        match classify_response(StatusCode::INTERNAL_SERVER_ERROR, body) {
            Outcome::Retry { detail, pause } => {
                assert_eq!(detail, "API error, type: server_error: The server had an error");
                assert!(!pause);
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn server_error_without_api_body_fails() {
        match classify_response(StatusCode::BAD_GATEWAY, "upstream down") {
            Outcome::Fail(LlmError::Api { status, message, .. }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn auth_failure_is_not_retried_even_with_api_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        match classify_response(StatusCode::UNAUTHORIZED, body) {
            Outcome::Fail(LlmError::Api { status, kind, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(kind, "invalid_request_error");
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn deterministic_client_errors() {
        assert!(is_deterministic_client_error(StatusCode::BAD_REQUEST));
        assert!(is_deterministic_client_error(StatusCode::UNAUTHORIZED));
        assert!(is_deterministic_client_error(StatusCode::FORBIDDEN));
        assert!(!is_deterministic_client_error(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_deterministic_client_error(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_deterministic_client_error(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn bare_proxy_address_is_socks5() {
        assert_eq!(normalize_proxy_url("10.0.0.1:1080"), "socks5://10.0.0.1:1080");
        assert_eq!(normalize_proxy_url("http://proxy:3128"), "http://proxy:3128");
    }
}
