//! Resource content retrieval.
//!
//! Each kind of linked resource has a [`ContentSource`] that knows how to
//! recognize its URLs and pull their current text. Sources live in a
//! [`SourceRegistry`]; the first source whose predicate matches wins, and a
//! URL nothing recognizes is inert rather than an error. Two kinds ship
//! here: document-service exports and chat threads.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::chat::{ChatApi, ChatError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A recognized resource that could not be read. Callers skip the resource
/// and move on; nothing at this layer retries.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch of {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("unparseable thread url: {0}")]
    ThreadUrl(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// ContentSource
// ---------------------------------------------------------------------------

/// One kind of fetchable resource.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Whether this source recognizes `url`.
    fn matches(&self, url: &str) -> bool;

    /// Current text of the resource behind `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

// ---------------------------------------------------------------------------
// SourceRegistry
// ---------------------------------------------------------------------------

/// Ordered table of content sources. Dispatch is first-match; registration
/// order is precedence order.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Box<dyn ContentSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with both built-in kinds: document exports and chat
    /// threads.
    pub fn with_defaults(chat: Arc<ChatApi>) -> Self {
        let mut registry = Self::new();
        registry.register(DocumentSource::new());
        registry.register(ThreadSource::new(chat));
        registry
    }

    pub fn register(&mut self, source: impl ContentSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Fetches `url` through the first matching source. `None` means no
    /// source recognizes the URL; callers treat that as inert.
    pub async fn fetch(&self, url: &str) -> Option<Result<String, FetchError>> {
        let source = self.sources.iter().find(|s| s.matches(url))?;
        Some(source.fetch(url).await)
    }
}

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

const DOCUMENT_PREFIXES: [&str; 2] = [
    "https://docs.google.com/document",
    "docs.google.com/document",
];

/// Document-service documents, read through their plain-text export
/// endpoint.
pub struct DocumentSource {
    client: reqwest::Client,
}

impl DocumentSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Maps a share/edit URL onto its text-export endpoint.
    fn export_url(url: &str) -> String {
        let base = url.split("/edit").next().unwrap_or(url);
        let base = base.trim_end_matches('/');
        if base.starts_with("http") {
            format!("{base}/export?format=txt")
        } else {
            format!("https://{base}/export?format=txt")
        }
    }
}

impl Default for DocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentSource for DocumentSource {
    fn matches(&self, url: &str) -> bool {
        DOCUMENT_PREFIXES.iter().any(|p| url.starts_with(p))
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let export = Self::export_url(url);
        debug!(url = %export, "fetching document export");

        let response = self.client.get(&export).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: export,
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

// ---------------------------------------------------------------------------
// ThreadSource
// ---------------------------------------------------------------------------

/// Chat threads, addressed by archive permalink and read through the chat
/// API. All message texts in the thread are joined into one blob.
pub struct ThreadSource {
    chat: Arc<ChatApi>,
}

impl ThreadSource {
    pub fn new(chat: Arc<ChatApi>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl ContentSource for ThreadSource {
    fn matches(&self, url: &str) -> bool {
        url.contains("slack.com/archives")
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let (channel, ts) = parse_thread_url(url)?;
        debug!(channel = %channel, ts = %ts, "fetching thread content");

        let texts = self.chat.thread_replies(&channel, &ts).await?;
        Ok(texts.join(" "))
    }
}

/// Splits an archive permalink into (channel, thread timestamp). The
/// permalink's last path segment is `p` followed by seconds and six
/// microsecond digits; the API wants `seconds.microseconds`.
fn parse_thread_url(url: &str) -> Result<(String, String), FetchError> {
    let path = url.split('?').next().unwrap_or(url);
    let mut segments = path.trim_end_matches('/').rsplit('/');

    let raw_ts = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FetchError::ThreadUrl(url.to_string()))?;
    let channel = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FetchError::ThreadUrl(url.to_string()))?;

    let digits = raw_ts.trim_start_matches('p');
    if digits.len() <= 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FetchError::ThreadUrl(url.to_string()));
    }
    let (seconds, micros) = digits.split_at(digits.len() - 6);

    Ok((channel.to_string(), format!("{seconds}.{micros}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
