//! Minimal chat-platform Web API client.
//!
//! Covers the two calls the engine needs: posting a message to a channel
//! and reading the replies of a thread. Auth is a bearer token read from
//! the environment; the platform reports application-level failures
//! in-band via an `ok` flag plus an error code.

use serde::Deserialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Chat transport failures. `ok: false` envelopes map to [`ChatError::Api`].
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat API token not set: export {TOKEN_ENV}")]
    MissingToken,

    #[error("chat API error: {0}")]
    Api(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "CHAT_API_TOKEN";

#[derive(Debug, Clone)]
pub struct ChatApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl ChatApi {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ChatError::MissingToken);
        }
        Ok(Self {
            base_url: base_url.into(),
            token,
            client: reqwest::Client::new(),
        })
    }

    /// Builds a client with the token from `CHAT_API_TOKEN`.
    pub fn from_env(base_url: impl Into<String>) -> Result<Self, ChatError> {
        let token = std::env::var(TOKEN_ENV).unwrap_or_default();
        Self::new(base_url, token)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.trim_end_matches('/'))
    }

    /// Posts `text` to `channel`.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChatError> {
        debug!(channel, "posting chat message");

        let response = self
            .client
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "channel": channel, "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Api(format!("status {}", response.status())));
        }

        let envelope: ApiEnvelope = response.json().await?;
        envelope.into_result()
    }

    /// Fetches the text of every message in the thread rooted at `ts`,
    /// root included, in thread order.
    pub async fn thread_replies(&self, channel: &str, ts: &str) -> Result<Vec<String>, ChatError> {
        debug!(channel, ts, "fetching thread replies");

        let response = self
            .client
            .get(self.endpoint("conversations.replies"))
            .bearer_auth(&self.token)
            .query(&[("channel", channel), ("ts", ts)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Api(format!("status {}", response.status())));
        }

        let decoded: RepliesEnvelope = response.json().await?;
        if !decoded.ok {
            return Err(ChatError::Api(
                decoded.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(decoded.messages.into_iter().map(|m| m.text).collect())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl ApiEnvelope {
    fn into_result(self) -> Result<(), ChatError> {
        if self.ok {
            Ok(())
        } else {
            Err(ChatError::Api(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepliesEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    #[serde(default)]
    text: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn post_message_sends_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let api = ChatApi::new(server.url(), "test-token").unwrap();
        api.post_message("C123", "hello").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_message_surfaces_platform_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": false, "error": "channel_not_found"}"#)
            .create_async()
            .await;

        let api = ChatApi::new(server.url(), "test-token").unwrap();
        let err = api.post_message("C999", "hello").await.unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn thread_replies_collects_message_texts() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/conversations.replies")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("channel".into(), "C123".into()),
                Matcher::UrlEncoded("ts".into(), "1700000000.123456".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ok": true, "messages": [{"text": "first"}, {"text": "second"}, {}]}"#,
            )
            .create_async()
            .await;

        let api = ChatApi::new(server.url(), "test-token").unwrap();
        let texts = api
            .thread_replies("C123", "1700000000.123456")
            .await
            .unwrap();
        assert_eq!(texts, vec!["first", "second", ""]);
    }

    #[tokio::test]
    async fn thread_replies_surfaces_platform_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/conversations.replies")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": false, "error": "thread_not_found"}"#)
            .create_async()
            .await;

        let api = ChatApi::new(server.url(), "test-token").unwrap();
        let err = api.thread_replies("C123", "1.2").await.unwrap_err();
        assert!(matches!(err, ChatError::Api(ref code) if code == "thread_not_found"));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            ChatApi::new("https://chat.example.com/api", ""),
            Err(ChatError::MissingToken)
        ));
    }
}
