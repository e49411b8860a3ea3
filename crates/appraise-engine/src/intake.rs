//! Assessment intake.
//!
//! The interaction surface lands here twice: once when the submission form
//! creates an assessment, and once when follow-up answers come back. Both
//! paths assemble context, run the decision pipeline, apply outcomes, and
//! hand the surface a report of what to show.

use std::sync::Arc;

use tracing::{debug, warn};

use appraise_core::digest;
use appraise_core::links::extract_urls;
use appraise_core::model::{Assessment, NewAssessment, Question, Resource};
use appraise_core::outcome::{Decision, Outcome};
use appraise_core::store::Store;
use appraise_core::AppraiseError;
use appraise_oracle::Oracle;

use crate::config::{Config, Prompts};
use crate::context::ContextBuilder;
use crate::error::{EngineError, Result};
use crate::fetch::SourceRegistry;
use crate::notify::decision_message;
use crate::pipeline::{apply_outcomes, DecisionPipeline};

// ---------------------------------------------------------------------------
// IntakeReport
// ---------------------------------------------------------------------------

/// What one intake operation produced, for the surface to render.
#[derive(Debug)]
pub struct IntakeReport {
    pub assessment: Assessment,
    pub decision: Option<Decision>,
    /// Follow-up questions created by this operation, in reply order.
    pub questions: Vec<Question>,
    /// Rendered decision text, present only when a decision was applied.
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// IntakeService
// ---------------------------------------------------------------------------

pub struct IntakeService {
    store: Arc<Store>,
    sources: Arc<SourceRegistry>,
    builder: ContextBuilder,
    pipeline: DecisionPipeline,
    prompts: Prompts,
}

impl IntakeService {
    pub fn new(
        store: Arc<Store>,
        sources: Arc<SourceRegistry>,
        oracle: Arc<dyn Oracle>,
        config: &Config,
    ) -> Self {
        Self {
            builder: ContextBuilder::new(
                oracle.clone(),
                config.prompts.summary.clone(),
                config.context_limit,
            ),
            pipeline: DecisionPipeline::new(oracle),
            prompts: config.prompts.clone(),
            store,
            sources,
        }
    }

    /// Creates an assessment from a submitted form and runs the initial
    /// decision pass.
    ///
    /// Linked resources are pulled from URLs found in the description and
    /// link list; URLs no source recognizes are inert and failed fetches
    /// are skipped, neither blocks creation.
    pub async fn create_assessment(&self, request: NewAssessment) -> Result<IntakeReport> {
        validate_required(&request)?;

        let assessment = self.store.create_assessment(&request).map_err(|e| match e {
            AppraiseError::DuplicateProjectName(_) => {
                EngineError::validation("project_name", "must be unique")
            }
            other => EngineError::Core(other),
        })?;
        debug!(id = assessment.id, project = %assessment.project_name, "assessment created");

        let resources = self.collect_resources(&assessment).await?;
        let fields = assessment.field_map(&resources, &[]);
        let context = self.builder.build(&fields).await;

        let prompt = format!("{} {}", self.prompts.base, self.prompts.initial);
        let outcomes = self.pipeline.decide(&prompt, &context).await?;
        let applied = apply_outcomes(&self.store, assessment.id, &outcomes)?;

        let assessment = self.store.assessment(assessment.id)?;
        let message = applied.decision.as_ref().map(decision_message);
        Ok(IntakeReport {
            assessment,
            decision: applied.decision,
            questions: applied.questions,
            message,
        })
    }

    /// Records follow-up answers and re-runs the decision pass over the
    /// enriched context. Only decision outcomes are applied here; an answer
    /// submission never spawns another follow-up round.
    pub async fn submit_answers(
        &self,
        assessment_id: i64,
        answers: &[(i64, String)],
    ) -> Result<IntakeReport> {
        let assessment = self.store.assessment(assessment_id)?;

        for (question_id, answer) in answers {
            self.store.answer_question(*question_id, answer)?;
        }

        let resources = self.store.resources_for(assessment.id)?;
        let questions = self.store.questions_for(assessment.id)?;
        let fields = assessment.field_map(&resources, &questions);
        let context = self.builder.build(&fields).await;

        let outcomes = self.pipeline.decide(&self.prompts.base, &context).await?;
        let decisions: Vec<Outcome> = outcomes
            .into_iter()
            .filter(|o| matches!(o, Outcome::Decision(_)))
            .collect();
        let applied = apply_outcomes(&self.store, assessment.id, &decisions)?;

        let assessment = self.store.assessment(assessment.id)?;
        let message = applied.decision.as_ref().map(decision_message);
        Ok(IntakeReport {
            assessment,
            decision: applied.decision,
            questions: Vec::new(),
            message,
        })
    }

    async fn collect_resources(&self, assessment: &Assessment) -> Result<Vec<Resource>> {
        let mut text = assessment.project_description.clone();
        if let Some(links) = &assessment.links {
            text.push('\n');
            text.push_str(links);
        }

        let mut resources = Vec::new();
        for url in extract_urls(&text) {
            match self.sources.fetch(&url).await {
                None => debug!(url = %url, "no source recognizes url, skipping"),
                Some(Err(e)) => {
                    warn!(url = %url, error = %e, "resource fetch failed, skipping");
                }
                Some(Ok(content)) => {
                    let content_hash = digest::digest(&content);
                    resources.push(self.store.insert_resource(
                        assessment.id,
                        &url,
                        &content,
                        &content_hash,
                    )?);
                }
            }
        }
        Ok(resources)
    }
}

fn validate_required(request: &NewAssessment) -> Result<()> {
    let required = [
        ("project_name", &request.project_name),
        ("project_description", &request.project_description),
        ("point_of_contact", &request.point_of_contact),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(EngineError::validation(field, "is required"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
