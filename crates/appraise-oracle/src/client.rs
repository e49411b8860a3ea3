//! HTTP transport for the oracle and the reply decode step.

use std::env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{OracleError, Result};

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// A decoded oracle reply: either one structured record or an ordered
/// sequence of them. How the records are interpreted is the caller's
/// business; this crate only gets them out of the transport intact.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Single(Value),
    Blocks(Vec<Value>),
}

/// Strip the wrapping models put around JSON output: leading/trailing
/// backticks, newlines and spaces, plus a `json` fence marker in any case.
pub fn scrub_reply(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| c == '`' || c == '\n' || c == ' ');
    let rest = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("json") => &trimmed[4..],
        _ => trimmed,
    };
    rest.trim().to_string()
}

/// Scrub and JSON-decode reply text. A top-level array becomes
/// [`Reply::Blocks`], anything else [`Reply::Single`].
pub fn decode_text(text: &str) -> Result<Reply> {
    let cleaned = scrub_reply(text);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        let snippet: String = cleaned.chars().take(80).collect();
        OracleError::MalformedReply(format!("{e} in {snippet:?}"))
    })?;
    match value {
        Value::Array(items) => Ok(Reply::Blocks(items)),
        other => Ok(Reply::Single(other)),
    }
}

// ---------------------------------------------------------------------------
// Oracle trait
// ---------------------------------------------------------------------------

/// The language-model seam. Production uses [`HttpOracle`]; tests inject
/// scripted implementations.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Raw reply text, for free-form asks such as summaries.
    async fn query_text(&self, prompt: &str, context: &str) -> Result<String>;

    /// Structured records for decision asks. Defaults to decoding the text
    /// reply.
    async fn query(&self, prompt: &str, context: &str) -> Result<Reply> {
        let text = self.query_text(prompt, context).await?;
        decode_text(&text)
    }
}

// ---------------------------------------------------------------------------
// HttpOracle
// ---------------------------------------------------------------------------

/// Configuration for the HTTP oracle transport.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Bearer token for the completions API.
    pub api_key: String,
    pub model: String,
    /// API root, without the `/chat/completions` suffix.
    pub base_url: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("ORACLE_API_KEY").unwrap_or_default(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Chat-completions client speaking the OpenAI wire shape.
pub struct HttpOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(OracleError::MissingApiKey);
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    pub fn with_default() -> Result<Self> {
        Self::new(OracleConfig::default())
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn query_text(&self, prompt: &str, context: &str) -> Result<String> {
        debug!(model = %self.config.model, "querying oracle");

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: context.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(format!("status {status}: {body}")));
        }

        let decoded: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Api(format!("response decode failed: {e}")))?;

        decoded
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::to_string)
            .ok_or(OracleError::EmptyReply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
