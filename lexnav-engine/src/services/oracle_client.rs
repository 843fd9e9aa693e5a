//! Relevance oracle client
//!
//! The oracle is an abstract capability: a prompt plus a JSON response
//! schema in, a JSON value conforming to the schema out. The engine only
//! ever talks to the [`Oracle`] trait; the HTTP implementation targets an
//! OpenAI-compatible chat completions endpoint, and tests substitute
//! deterministic scripted implementations.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "LexNav/0.1.0 (https://github.com/lexnav/lexnav)";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Failure classification recorded in the decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleFailureKind {
    RateLimit,
    Timeout,
    TokenOverflow,
    Schema,
    Other,
}

impl OracleFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::TokenOverflow => "token_overflow",
            Self::Schema => "schema",
            Self::Other => "other",
        }
    }
}

/// Oracle client errors
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle rate limit exceeded")]
    RateLimited,

    #[error("Oracle request timed out")]
    Timeout,

    #[error("Prompt exceeds oracle token budget: {0}")]
    TokenOverflow(String),

    #[error("Oracle response violates schema: {0}")]
    Schema(String),

    #[error("Oracle API error {0}: {1}")]
    Api(u16, String),

    #[error("Network error: {0}")]
    Network(String),
}

impl OracleError {
    pub fn kind(&self) -> OracleFailureKind {
        match self {
            Self::RateLimited => OracleFailureKind::RateLimit,
            Self::Timeout => OracleFailureKind::Timeout,
            Self::TokenOverflow(_) => OracleFailureKind::TokenOverflow,
            Self::Schema(_) => OracleFailureKind::Schema,
            Self::Api(_, _) | Self::Network(_) => OracleFailureKind::Other,
        }
    }
}

/// Abstract relevance oracle.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Submit a prompt with a JSON response schema; the returned value
    /// conforms to the schema (a violation is an [`OracleError::Schema`]).
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Value, OracleError>;
}

/// Connection settings for the HTTP oracle.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// HTTP oracle against an OpenAI-compatible chat completions endpoint with
/// structured-output response constraints.
pub struct HttpOracle {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpOracle {
    pub fn new(settings: &OracleSettings) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Value, OracleError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "strict": true,
                    "schema": schema,
                }
            }
        });

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, model = %self.model, prompt_len = prompt.len(), "Querying oracle");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            return Err(OracleError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status == 400
                && (error_text.contains("context_length")
                    || error_text.contains("maximum context")
                    || error_text.contains("too many tokens"))
            {
                return Err(OracleError::TokenOverflow(error_text));
            }
            return Err(OracleError::Api(status.as_u16(), error_text));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| OracleError::Schema(format!("response envelope: {e}")))?;

        let content = envelope
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OracleError::Schema("response envelope missing message content".to_string())
            })?;

        serde_json::from_str(content)
            .map_err(|e| OracleError::Schema(format!("message content is not valid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_classification() {
        assert_eq!(OracleError::RateLimited.kind(), OracleFailureKind::RateLimit);
        assert_eq!(OracleError::Timeout.kind(), OracleFailureKind::Timeout);
        assert_eq!(
            OracleError::TokenOverflow("ctx".into()).kind(),
            OracleFailureKind::TokenOverflow
        );
        assert_eq!(
            OracleError::Schema("bad".into()).kind(),
            OracleFailureKind::Schema
        );
        assert_eq!(
            OracleError::Api(503, "unavailable".into()).kind(),
            OracleFailureKind::Other
        );
        assert_eq!(
            OracleError::Network("refused".into()).kind(),
            OracleFailureKind::Other
        );
    }

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(OracleFailureKind::RateLimit.as_str(), "rate_limit");
        assert_eq!(OracleFailureKind::TokenOverflow.as_str(), "token_overflow");
    }

    #[test]
    fn test_client_creation_trims_trailing_slash() {
        let oracle = HttpOracle::new(&OracleSettings {
            base_url: "https://oracle.example.com/v1/".to_string(),
            api_key: "test-key".to_string(),
            model: "relevance-v2".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
        .unwrap();
        assert_eq!(oracle.base_url, "https://oracle.example.com/v1");
    }
}
