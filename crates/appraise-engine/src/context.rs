//! Bounded context assembly for oracle asks.
//!
//! Three tiers: the raw flattened field map; if that exceeds the configured
//! limit, each non-excluded field is replaced by an oracle-written summary
//! and the map is reflattened; if even the summaries run long, the result
//! is hard-truncated. Structural fields are never summarized and field
//! identity survives every tier.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use appraise_core::context::{flatten_fields, is_excluded, truncate_chars};
use appraise_oracle::Oracle;

// ---------------------------------------------------------------------------
// ContextBuilder
// ---------------------------------------------------------------------------

pub struct ContextBuilder {
    oracle: Arc<dyn Oracle>,
    summary_prompt: String,
    context_limit: usize,
}

impl ContextBuilder {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        summary_prompt: impl Into<String>,
        context_limit: usize,
    ) -> Self {
        Self {
            oracle,
            summary_prompt: summary_prompt.into(),
            context_limit,
        }
    }

    /// Flattens `fields` into a blob no longer than the configured limit.
    /// Under the limit the raw flatten comes back untouched; over it the
    /// summarize and truncate tiers kick in.
    pub async fn build(&self, fields: &BTreeMap<String, String>) -> String {
        let raw = flatten_fields(fields);
        if raw.chars().count() <= self.context_limit {
            return raw;
        }

        debug!(
            chars = raw.chars().count(),
            limit = self.context_limit,
            "context over limit, summarizing fields"
        );
        let rebuilt = flatten_fields(&self.summarize_fields(fields).await);
        if rebuilt.chars().count() <= self.context_limit {
            return rebuilt;
        }

        warn!(
            chars = rebuilt.chars().count(),
            limit = self.context_limit,
            "summarized context still over limit, truncating"
        );
        truncate_chars(&rebuilt, self.context_limit)
    }

    /// Summarizes every non-excluded field independently. Excluded fields
    /// pass through as-is, and a failed summary keeps the original value so
    /// one flaky call never drops a field.
    async fn summarize_fields(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut summarized = BTreeMap::new();
        for (field, value) in fields {
            if is_excluded(field) {
                summarized.insert(field.clone(), value.clone());
                continue;
            }

            let input = truncate_chars(value, self.context_limit);
            match self.oracle.query_text(&self.summary_prompt, &input).await {
                Ok(summary) => {
                    summarized.insert(field.clone(), summary.trim().to_string());
                }
                Err(e) => {
                    warn!(field = %field, error = %e, "summary failed, keeping original value");
                    summarized.insert(field.clone(), value.clone());
                }
            }
        }
        summarized
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use appraise_oracle::OracleError;

    struct SummaryOracle {
        replies: Mutex<Vec<appraise_oracle::Result<String>>>,
        calls: AtomicUsize,
    }

    impl SummaryOracle {
        fn scripted(replies: Vec<appraise_oracle::Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Oracle for SummaryOracle {
        async fn query_text(
            &self,
            _prompt: &str,
            _context: &str,
        ) -> appraise_oracle::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok("summary".to_string())
            } else {
                replies.remove(0)
            }
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn under_limit_passes_through_raw() {
        let oracle = Arc::new(SummaryOracle::scripted(vec![]));
        let builder = ContextBuilder::new(oracle.clone(), "Summarize.", 1000);

        let input = fields(&[("project_description", "a small service"), ("notes", "none")]);
        let context = builder.build(&input).await;

        assert_eq!(context, flatten_fields(&input));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn over_limit_substitutes_summaries() {
        let oracle = Arc::new(SummaryOracle::scripted(vec![Ok("short".to_string())]));
        let builder = ContextBuilder::new(oracle.clone(), "Summarize.", 20);

        let input = fields(&[
            ("project_description", "a very long description that blows past the limit"),
            ("project_name", "Foo"),
        ]);
        let context = builder.build(&input).await;

        assert_eq!(context, "short");
        // the excluded field is never sent for summarization
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn oversized_summaries_are_truncated() {
        let oracle = Arc::new(SummaryOracle::scripted(vec![Ok(
            "a summary that is itself far too long for the limit".to_string(),
        )]));
        let builder = ContextBuilder::new(oracle, "Summarize.", 10);

        let input = fields(&[("project_description", "long long long long long text")]);
        let context = builder.build(&input).await;

        assert_eq!(context.chars().count(), 10);
        assert_eq!(context, "a summary ");
    }

    #[tokio::test]
    async fn failed_summary_keeps_original_value() {
        let oracle = Arc::new(SummaryOracle::scripted(vec![
            Err(OracleError::EmptyReply),
            Ok("tiny".to_string()),
        ]));
        let builder = ContextBuilder::new(oracle, "Summarize.", 50);

        let input = fields(&[
            ("alpha", "first field kept verbatim on failure"),
            ("beta", "second field summarized fine"),
        ]);
        let context = builder.build(&input).await;

        assert!(context.contains("first field kept verbatim on failure"));
        assert!(context.contains("tiny"));
    }
}
