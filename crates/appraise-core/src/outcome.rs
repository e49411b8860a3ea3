//! Normalized decision-pipeline outcomes.
//!
//! The oracle replies with JSON records tagged by `outcome`. Decoding
//! validates each record into exactly one of the three variants below; an
//! unrecognized tag is contract drift and surfaces loudly, while a known tag
//! with missing or mistyped fields counts as malformed model output (the
//! retryable kind).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppraiseError, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A written verdict: scores from 1 to 10 on both axes plus free-text grounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub risk: i64,
    pub confidence: i64,
    #[serde(default)]
    pub justification: String,
}

/// One normalized unit of oracle judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Overwrite the assessment's decision fields.
    Decision(Decision),
    /// The oracle needs answers before deciding.
    Followup { questions: Vec<String> },
    /// Re-evaluated during reconciliation; verdict stands.
    Unchanged,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Wire shape of one reply record, before cleanup.
///
/// Some models nest the scores under a `decision` object instead of placing
/// them at the top level; when the nested object is present it wins.
#[derive(Debug, Deserialize)]
struct RawRecord {
    outcome: String,
    #[serde(default)]
    risk: Option<i64>,
    #[serde(default)]
    confidence: Option<i64>,
    #[serde(default)]
    justification: Option<String>,
    #[serde(default)]
    questions: Option<Vec<String>>,
    #[serde(default)]
    decision: Option<NestedDecision>,
}

#[derive(Debug, Deserialize)]
struct NestedDecision {
    #[serde(default)]
    risk: Option<i64>,
    #[serde(default)]
    confidence: Option<i64>,
}

impl Outcome {
    /// Validating decode of one JSON record into an [`Outcome`].
    ///
    /// Errors: [`AppraiseError::UnknownOutcome`] for a tag outside the three
    /// known variants; [`AppraiseError::MalformedOutcome`] for anything else
    /// wrong with the record.
    pub fn from_record(value: &Value) -> Result<Outcome> {
        let raw: RawRecord = serde_json::from_value(value.clone())
            .map_err(|e| AppraiseError::MalformedOutcome(e.to_string()))?;

        let (risk, confidence) = match raw.decision {
            Some(nested) => (nested.risk, nested.confidence),
            None => (raw.risk, raw.confidence),
        };

        match raw.outcome.as_str() {
            "decision" => {
                let risk = risk.ok_or_else(|| {
                    AppraiseError::MalformedOutcome("decision record missing risk".into())
                })?;
                let confidence = confidence.ok_or_else(|| {
                    AppraiseError::MalformedOutcome("decision record missing confidence".into())
                })?;
                Ok(Outcome::Decision(Decision {
                    risk,
                    confidence,
                    justification: raw.justification.unwrap_or_default(),
                }))
            }
            "followup" => {
                let questions = raw.questions.ok_or_else(|| {
                    AppraiseError::MalformedOutcome("followup record missing questions".into())
                })?;
                Ok(Outcome::Followup { questions })
            }
            "unchanged" => Ok(Outcome::Unchanged),
            other => Err(AppraiseError::UnknownOutcome(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
