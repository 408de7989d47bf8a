//! Completion service integration.
//!
//! The bot talks to an OpenAI-compatible chat completions endpoint through
//! [`OpenAiGateway`]. Everything else depends on the [`LlmProvider`] trait
//! so tests can substitute a stub.

pub mod openai;
pub mod provider;

pub use openai::OpenAiGateway;
pub use provider::*;

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Default chat completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for creating the completion gateway.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub api_url: String,
    pub model: String,
    /// `socks5://`, `http://` or a bare `host:port` (SOCKS5).
    pub proxy_url: Option<String>,
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: secrecy::SecretString::from(api_key.into()),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            proxy_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Create the completion provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let gateway = OpenAiGateway::new(config)?;
    tracing::info!(
        model = %config.model,
        proxied = config.proxy_url.is_some(),
        "Using OpenAI-compatible completion gateway"
    );
    Ok(Arc::new(gateway))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_with_defaults() {
        let provider = create_provider(&LlmConfig::new("sk-test")).unwrap();
        assert_eq!(provider.model_name(), DEFAULT_MODEL);
    }

    #[test]
    fn create_provider_with_socks_proxy() {
        let config = LlmConfig {
            proxy_url: Some("127.0.0.1:1080".to_string()),
            model: "gpt-4o".to_string(),
            ..LlmConfig::new("sk-test")
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = LlmConfig::new("sk-very-secret");
        assert!(!format!("{config:?}").contains("sk-very-secret"));
    }
}
