//! The reconciliation loop.
//!
//! A single perpetual worker that wakes on a fixed interval, walks every
//! assessment, re-fetches its resources, and re-runs the decision pipeline
//! when content has drifted. Shutdown is cooperative: the cancellation
//! token is observed between cycles and between assessments, never between
//! a resource's content write and its digest write.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use appraise_core::digest;
use appraise_core::model::Assessment;
use appraise_core::store::Store;
use appraise_oracle::Oracle;

use crate::config::{Config, Prompts};
use crate::context::ContextBuilder;
use crate::error::Result;
use crate::fetch::SourceRegistry;
use crate::notify::{update_message, NotificationSink};
use crate::pipeline::{apply_outcomes, DecisionPipeline};

// ---------------------------------------------------------------------------
// ScanSummary
// ---------------------------------------------------------------------------

/// What one scan cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Assessments fully processed this cycle.
    pub scanned: usize,
    /// Assessments whose resources had drifted.
    pub updated: usize,
    /// Assessments whose processing failed and was contained.
    pub failed: usize,
    /// True when a shutdown request cut the cycle short.
    pub aborted: bool,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler {
    store: Arc<Store>,
    sources: Arc<SourceRegistry>,
    builder: ContextBuilder,
    pipeline: DecisionPipeline,
    sink: Arc<dyn NotificationSink>,
    prompts: Prompts,
    channel: String,
    interval: Duration,
    token: CancellationToken,
}

impl Reconciler {
    pub fn new(
        store: Arc<Store>,
        sources: Arc<SourceRegistry>,
        oracle: Arc<dyn Oracle>,
        sink: Arc<dyn NotificationSink>,
        config: &Config,
        token: CancellationToken,
    ) -> Self {
        Self {
            builder: ContextBuilder::new(
                oracle.clone(),
                config.prompts.summary.clone(),
                config.context_limit,
            ),
            pipeline: DecisionPipeline::new(oracle),
            prompts: config.prompts.clone(),
            channel: config.notify.channel.clone(),
            interval: config.scan.interval(),
            store,
            sources,
            sink,
            token,
        }
    }

    /// Runs scan cycles until the cancellation token fires. A failed cycle
    /// is logged and the next tick proceeds as scheduled.
    pub async fn run(self) {
        info!(interval = ?self.interval, "reconciliation loop started");
        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    info!("reconciliation loop stopping");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.scan().await {
                        error!(error = %e, "scan cycle failed");
                    }
                }
            }
        }
    }

    /// One full pass over all assessments. A single assessment's failure is
    /// contained and counted; a shutdown request aborts between assessments.
    pub async fn scan(&self) -> Result<ScanSummary> {
        let assessments = self.store.list_assessments()?;
        let mut summary = ScanSummary::default();

        for assessment in &assessments {
            if self.token.is_cancelled() {
                info!("shutdown requested, aborting scan");
                summary.aborted = true;
                break;
            }

            debug!(project = %assessment.project_name, "checking for resource drift");
            match self.reconcile_assessment(assessment).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        project = %assessment.project_name,
                        error = %e,
                        "reconciliation failed, continuing with next assessment"
                    );
                    summary.failed += 1;
                }
            }
            summary.scanned += 1;
        }
        Ok(summary)
    }

    /// Re-fetches one assessment's resources and re-decides on drift.
    /// Returns whether anything had drifted.
    async fn reconcile_assessment(&self, assessment: &Assessment) -> Result<bool> {
        let resources = self.store.resources_for(assessment.id)?;
        if resources.is_empty() {
            return Ok(false);
        }

        let mut drifted: Vec<(i64, String, String)> = Vec::new();
        for resource in &resources {
            let content = match self.sources.fetch(&resource.url).await {
                None => continue,
                Some(Err(e)) => {
                    warn!(url = %resource.url, error = %e, "resource fetch failed, skipping");
                    continue;
                }
                Some(Ok(content)) => content,
            };
            if digest::has_changed(&resource.content_hash, &content) {
                debug!(url = %resource.url, "resource drift detected");
                drifted.push((resource.id, resource.url.clone(), content));
            }
        }
        if drifted.is_empty() {
            return Ok(false);
        }

        let questions = self.store.questions_for(assessment.id)?;
        let old_fields = assessment.field_map(&resources, &questions);
        let mut new_fields = old_fields.clone();
        for (_, url, content) in &drifted {
            new_fields.insert(url.clone(), content.clone());
        }

        let envelope = json!({
            "previous_context": self.builder.build(&old_fields).await,
            "previous_decision": {
                "risk": assessment.risk,
                "confidence": assessment.confidence,
                "justification": assessment.justification,
            },
            "new_context": self.builder.build(&new_fields).await,
        });
        let payload = serde_json::to_string_pretty(&envelope)?;

        let prompt = format!("{} {}", self.prompts.base, self.prompts.update);
        let outcomes = self.pipeline.decide(&prompt, &payload).await?;

        // content and digest land together before outcomes are applied
        for (resource_id, _, content) in &drifted {
            self.store
                .update_resource_content(*resource_id, content, &digest::digest(content))?;
        }

        let applied = apply_outcomes(&self.store, assessment.id, &outcomes)?;
        if let Some(decision) = &applied.decision {
            let message = update_message(&assessment.project_name, decision);
            if let Err(e) = self.sink.notify(&self.channel, &message).await {
                warn!(error = %e, "decision notification failed");
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
