//! Domain records: assessments, their linked resources, and follow-up
//! questions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::Decision;

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// A tracked project under risk/confidence evaluation.
///
/// `risk`, `confidence` and `justification` stay unset until the decision
/// pipeline writes a verdict; `risk` and `confidence` are always set or
/// cleared together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,
    pub project_name: String,
    pub project_description: String,
    pub point_of_contact: String,
    pub estimated_go_live_date: Option<String>,
    /// Raw link list as pasted at submission time.
    pub links: Option<String>,
    pub user_id: String,
    pub risk: Option<i64>,
    pub confidence: Option<i64>,
    pub justification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn has_decision(&self) -> bool {
        self.risk.is_some() && self.confidence.is_some()
    }

    /// The current verdict, when both scores are present.
    pub fn decision(&self) -> Option<Decision> {
        match (self.risk, self.confidence) {
            (Some(risk), Some(confidence)) => Some(Decision {
                risk,
                confidence,
                justification: self.justification.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Assemble the field map the context builder works over.
    ///
    /// Keys are field names for the intrinsic fields, resource URLs for
    /// fetched contents, and question texts for answered follow-ups.
    /// Unanswered questions contribute nothing. Structural fields are
    /// included here and filtered later by the exclusion set, so the
    /// summarization tier can still see and preserve them.
    pub fn field_map(
        &self,
        resources: &[Resource],
        questions: &[Question],
    ) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("project_name".to_string(), self.project_name.clone());
        fields.insert(
            "project_description".to_string(),
            self.project_description.clone(),
        );
        fields.insert("point_of_contact".to_string(), self.point_of_contact.clone());
        if let Some(date) = &self.estimated_go_live_date {
            fields.insert("estimated_go_live_date".to_string(), date.clone());
        }
        if let Some(links) = &self.links {
            fields.insert("links".to_string(), links.clone());
        }
        for resource in resources {
            fields.insert(resource.url.clone(), resource.content.clone());
        }
        for question in questions {
            if let Some(answer) = &question.answer {
                fields.insert(question.question.clone(), answer.clone());
            }
        }
        fields
    }
}

/// Fields supplied when creating an assessment.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub project_name: String,
    pub project_description: String,
    pub point_of_contact: String,
    pub estimated_go_live_date: Option<String>,
    pub links: Option<String>,
    pub user_id: String,
}

impl NewAssessment {
    pub fn new(
        project_name: impl Into<String>,
        project_description: impl Into<String>,
        point_of_contact: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            project_description: project_description.into(),
            point_of_contact: point_of_contact.into(),
            estimated_go_live_date: None,
            links: None,
            user_id: user_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// An external document or thread linked from an assessment.
///
/// `content_hash` is always the digest of `content` as stored; the pair is
/// written in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub assessment_id: i64,
    pub url: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Question
// ---------------------------------------------------------------------------

/// A follow-up question raised by the oracle, answered at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub assessment_id: i64,
    pub question: String,
    pub answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assessment() -> Assessment {
        Assessment {
            id: 1,
            project_name: "atlas".into(),
            project_description: "Migrate billing to the new ledger".into(),
            point_of_contact: "Dana".into(),
            estimated_go_live_date: Some("2026-10-01".into()),
            links: None,
            user_id: "U100".into(),
            risk: None,
            confidence: None,
            justification: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn decision_requires_both_scores() {
        let mut a = sample_assessment();
        assert!(a.decision().is_none());
        assert!(!a.has_decision());

        a.risk = Some(3);
        assert!(a.decision().is_none());

        a.confidence = Some(8);
        a.justification = Some("small blast radius".into());
        let d = a.decision().unwrap();
        assert_eq!(d.risk, 3);
        assert_eq!(d.confidence, 8);
        assert_eq!(d.justification, "small blast radius");
    }

    #[test]
    fn decision_justification_defaults_empty() {
        let mut a = sample_assessment();
        a.risk = Some(5);
        a.confidence = Some(5);
        assert_eq!(a.decision().unwrap().justification, "");
    }

    #[test]
    fn field_map_keys_resources_by_url() {
        let a = sample_assessment();
        let resource = Resource {
            id: 1,
            assessment_id: 1,
            url: "https://docs.google.com/document/d/abc".into(),
            content: "design doc body".into(),
            content_hash: "deadbeef".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let fields = a.field_map(&[resource], &[]);
        assert_eq!(
            fields.get("https://docs.google.com/document/d/abc").map(String::as_str),
            Some("design doc body")
        );
        assert_eq!(
            fields.get("project_description").map(String::as_str),
            Some("Migrate billing to the new ledger")
        );
        assert_eq!(fields.get("project_name").map(String::as_str), Some("atlas"));
    }

    #[test]
    fn field_map_skips_unanswered_questions() {
        let a = sample_assessment();
        let answered = Question {
            id: 1,
            assessment_id: 1,
            question: "Who owns rollback?".into(),
            answer: Some("The payments on-call".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let pending = Question {
            id: 2,
            assessment_id: 1,
            question: "Is there a feature flag?".into(),
            answer: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let fields = a.field_map(&[], &[answered, pending]);
        assert_eq!(
            fields.get("Who owns rollback?").map(String::as_str),
            Some("The payments on-call")
        );
        assert!(!fields.contains_key("Is there a feature flag?"));
    }

    #[test]
    fn field_map_omits_absent_optionals() {
        let mut a = sample_assessment();
        a.estimated_go_live_date = None;
        a.links = None;
        let fields = a.field_map(&[], &[]);
        assert!(!fields.contains_key("estimated_go_live_date"));
        assert!(!fields.contains_key("links"));
    }
}
