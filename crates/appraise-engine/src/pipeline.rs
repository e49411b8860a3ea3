//! The decision pipeline.
//!
//! One `decide` call sends an instruction prompt plus a context blob to the
//! oracle, normalizes the reply into [`Outcome`] records, and absorbs
//! malformed replies inside a bounded retry. Outcomes are applied to the
//! store separately so callers can filter what a given surface is allowed
//! to apply.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use appraise_core::outcome::{Decision, Outcome};
use appraise_core::store::Store;
use appraise_core::model::Question;
use appraise_core::AppraiseError;
use appraise_oracle::{with_retry, Oracle, Reply};

use crate::error::{EngineError, Result};

/// Retries absorb one-off malformed replies, nothing else.
const MAX_RETRIES: usize = 1;

// ---------------------------------------------------------------------------
// DecisionPipeline
// ---------------------------------------------------------------------------

pub struct DecisionPipeline {
    oracle: Arc<dyn Oracle>,
}

impl DecisionPipeline {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Asks the oracle and returns the normalized outcome records.
    ///
    /// A reply that stays malformed after the retry budget yields an empty
    /// list, which callers treat as "nothing to apply". Replies that break
    /// the protocol shape itself (non-record elements, unknown tags) fail
    /// loudly instead.
    pub async fn decide(&self, prompt: &str, context: &str) -> Result<Vec<Outcome>> {
        let prompt = prompt.trim().replace('\n', " ");

        let attempt = with_retry(MAX_RETRIES, is_retryable, || async {
            let reply = self.oracle.query(&prompt, context).await?;
            normalize(reply)
        })
        .await;

        match attempt {
            Ok(outcomes) => Ok(outcomes),
            Err(e) if is_retryable(&e) => {
                warn!(error = %e, "oracle reply stayed malformed, applying no outcomes");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn is_retryable(error: &EngineError) -> bool {
    match error {
        EngineError::Oracle(e) => e.is_retryable(),
        EngineError::Core(AppraiseError::MalformedOutcome(_)) => true,
        _ => false,
    }
}

/// Maps a reply onto outcome records: a single record becomes a one-element
/// list, a block sequence maps one-to-one. Anything else is contract drift
/// between this system and the oracle.
fn normalize(reply: Reply) -> Result<Vec<Outcome>> {
    let records = match reply {
        Reply::Single(record @ Value::Object(_)) => vec![record],
        Reply::Single(other) => {
            return Err(EngineError::OracleProtocol(format!(
                "reply must be a record or a sequence of records, got: {other}"
            )));
        }
        Reply::Blocks(records) => records,
    };

    let mut outcomes = Vec::with_capacity(records.len());
    for record in &records {
        if !record.is_object() {
            return Err(EngineError::OracleProtocol(format!(
                "sequence element is not a record: {record}"
            )));
        }
        match Outcome::from_record(record) {
            Ok(outcome) => outcomes.push(outcome),
            Err(AppraiseError::UnknownOutcome(tag)) => {
                return Err(EngineError::OracleProtocol(format!(
                    "unknown outcome tag: {tag}"
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(outcomes)
}

// ---------------------------------------------------------------------------
// Outcome application
// ---------------------------------------------------------------------------

/// What one `apply_outcomes` pass wrote.
#[derive(Debug, Default)]
pub struct Applied {
    pub decision: Option<Decision>,
    pub questions: Vec<Question>,
}

/// Applies outcome records to an assessment. Decisions overwrite the stored
/// verdict (idempotent), follow-ups append question rows, `unchanged` is a
/// no-op.
pub fn apply_outcomes(store: &Store, assessment_id: i64, outcomes: &[Outcome]) -> Result<Applied> {
    let mut applied = Applied::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Decision(decision) => {
                store.set_decision(assessment_id, decision)?;
                info!(
                    assessment_id,
                    risk = decision.risk,
                    confidence = decision.confidence,
                    "decision recorded"
                );
                applied.decision = Some(decision.clone());
            }
            Outcome::Followup { questions } => {
                let created = store.insert_questions(assessment_id, questions)?;
                info!(assessment_id, count = created.len(), "follow-up questions recorded");
                applied.questions.extend(created);
            }
            Outcome::Unchanged => {
                debug!(assessment_id, "verdict unchanged");
            }
        }
    }
    Ok(applied)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
