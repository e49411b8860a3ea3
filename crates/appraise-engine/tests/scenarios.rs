//! End-to-end engine scenarios: intake through decision, reconciliation
//! over drifting resources, and cooperative shutdown.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use appraise_core::digest::digest;
use appraise_core::model::NewAssessment;
use appraise_core::store::Store;
use appraise_engine::chat::ChatError;
use appraise_engine::fetch::{ContentSource, FetchError};
use appraise_engine::{Config, IntakeService, NotificationSink, Reconciler, SourceRegistry};
use appraise_oracle::{Oracle, OracleError, Reply};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct ScriptedOracle {
    replies: Mutex<VecDeque<appraise_oracle::Result<Reply>>>,
    contexts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<appraise_oracle::Result<Reply>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            contexts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    fn context(&self, index: usize) -> String {
        self.contexts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn query_text(&self, _prompt: &str, _context: &str) -> appraise_oracle::Result<String> {
        Ok("summary".to_string())
    }

    async fn query(&self, _prompt: &str, context: &str) -> appraise_oracle::Result<Reply> {
        self.contexts.lock().unwrap().push(context.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OracleError::EmptyReply))
    }
}

/// Serves scripted content per URL; content can be swapped between scans.
struct SharedSource {
    contents: Mutex<HashMap<String, String>>,
}

impl SharedSource {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            contents: Mutex::new(
                pairs
                    .iter()
                    .map(|(url, content)| (url.to_string(), content.to_string()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ContentSource for SharedSource {
    fn matches(&self, url: &str) -> bool {
        self.contents.lock().unwrap().contains_key(url)
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.contents.lock().unwrap()[url].clone())
    }
}

/// Like [`SharedSource`], but raises a shutdown request when a chosen URL
/// is fetched, emulating a stop signal landing mid-scan.
struct CancellingSource {
    contents: HashMap<String, String>,
    cancel_on: String,
    token: CancellationToken,
}

#[async_trait]
impl ContentSource for CancellingSource {
    fn matches(&self, url: &str) -> bool {
        self.contents.contains_key(url)
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if url == self.cancel_on {
            self.token.cancel();
        }
        Ok(self.contents[url].clone())
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), ChatError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.notify.channel = "C-notify".to_string();
    config.scan.interval_seconds = 1;
    config
}

fn decision_reply(risk: i64, confidence: i64, justification: &str) -> appraise_oracle::Result<Reply> {
    Ok(Reply::Single(json!({
        "outcome": "decision",
        "risk": risk,
        "confidence": confidence,
        "justification": justification
    })))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initial_submission_yields_low_risk_decision() {
    let oracle = ScriptedOracle::new(vec![decision_reply(3, 8, "small blast radius")]);
    let store = Arc::new(Store::open_in_memory().unwrap());
    let intake = IntakeService::new(
        store.clone(),
        Arc::new(SourceRegistry::new()),
        oracle.clone(),
        &config(),
    );

    let report = intake
        .create_assessment(NewAssessment::new("Foo", "a small service", "U2", "U1"))
        .await
        .unwrap();

    let stored = store.assessment(report.assessment.id).unwrap();
    assert_eq!(stored.risk, Some(3));
    assert_eq!(stored.confidence, Some(8));

    let message = report.message.unwrap();
    assert!(message.contains("*low risk(3)*"));
    assert!(message.contains("*high confidence(8)*"));
}

#[tokio::test]
async fn unchanged_content_never_wakes_the_oracle() {
    let url = "https://wiki.example.com/runbook";
    let oracle = ScriptedOracle::new(vec![]);
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(Store::open_in_memory().unwrap());

    let assessment = store
        .create_assessment(&NewAssessment::new("Steady", "internal service", "U2", "U1"))
        .unwrap();
    store
        .insert_resource(assessment.id, url, "stable content", &digest("stable content"))
        .unwrap();

    let mut registry = SourceRegistry::new();
    registry.register(SharedSource::new(&[(url, "stable content")]));

    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(registry),
        oracle.clone(),
        sink.clone(),
        &config(),
        CancellationToken::new(),
    );
    let summary = reconciler.scan().await.unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(oracle.calls(), 0);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn drifted_content_with_unchanged_verdict_updates_resource_only() {
    let url = "https://wiki.example.com/design";
    let oracle = ScriptedOracle::new(vec![Ok(Reply::Single(json!({"outcome": "unchanged"})))]);
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(Store::open_in_memory().unwrap());

    let assessment = store
        .create_assessment(&NewAssessment::new("Stable", "internal service", "U2", "U1"))
        .unwrap();
    store
        .set_decision(
            assessment.id,
            &appraise_core::outcome::Decision {
                risk: 5,
                confidence: 5,
                justification: "prior verdict".to_string(),
            },
        )
        .unwrap();
    store
        .insert_resource(assessment.id, url, "version one", &digest("version one"))
        .unwrap();

    let mut registry = SourceRegistry::new();
    registry.register(SharedSource::new(&[(url, "version two")]));

    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(registry),
        oracle.clone(),
        sink.clone(),
        &config(),
        CancellationToken::new(),
    );
    let summary = reconciler.scan().await.unwrap();
    assert_eq!(summary.updated, 1);

    // old and new content plus the prior verdict all reach the oracle
    let context = oracle.context(0);
    assert!(context.contains("version one"));
    assert!(context.contains("version two"));
    assert!(context.contains("previous_decision"));
    assert!(context.contains("prior verdict"));

    // verdict untouched, resource pair rewritten, nobody notified
    let stored = store.assessment(assessment.id).unwrap();
    assert_eq!(stored.risk, Some(5));
    assert_eq!(stored.justification.as_deref(), Some("prior verdict"));

    let resources = store.resources_for(assessment.id).unwrap();
    assert_eq!(resources[0].content, "version two");
    assert_eq!(resources[0].content_hash, digest("version two"));
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn malformed_reply_recovers_within_retry_budget() {
    let url = "https://wiki.example.com/spec";
    let oracle = ScriptedOracle::new(vec![
        Err(OracleError::MalformedReply("fenced garbage".to_string())),
        decision_reply(9, 9, "load-bearing dependency changed"),
    ]);
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(Store::open_in_memory().unwrap());

    let assessment = store
        .create_assessment(&NewAssessment::new("Drift", "internal service", "U2", "U1"))
        .unwrap();
    store
        .insert_resource(assessment.id, url, "version one", &digest("version one"))
        .unwrap();

    let mut registry = SourceRegistry::new();
    registry.register(SharedSource::new(&[(url, "version two")]));

    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(registry),
        oracle.clone(),
        sink.clone(),
        &config(),
        CancellationToken::new(),
    );
    reconciler.scan().await.unwrap();

    assert_eq!(oracle.calls(), 2);

    let stored = store.assessment(assessment.id).unwrap();
    assert_eq!(stored.risk, Some(9));

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "C-notify");
    assert!(messages[0].1.starts_with("Project Drift has been updated"));
    assert!(messages[0].1.contains("*high risk(9)*"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_scan_stops_cleanly_between_assessments() {
    let oracle = ScriptedOracle::new(vec![decision_reply(6, 6, "dependency drift")]);
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(Store::open_in_memory().unwrap());
    let token = CancellationToken::new();

    let urls = [
        "https://wiki.example.com/a",
        "https://wiki.example.com/b",
        "https://wiki.example.com/c",
    ];
    let mut ids = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        let assessment = store
            .create_assessment(&NewAssessment::new(
                format!("Project-{i}"),
                "internal service",
                "U2",
                "U1",
            ))
            .unwrap();
        store
            .insert_resource(assessment.id, url, "version one", &digest("version one"))
            .unwrap();
        ids.push(assessment.id);
    }

    // every resource has drifted; fetching the first raises the stop signal
    let mut registry = SourceRegistry::new();
    registry.register(CancellingSource {
        contents: urls
            .iter()
            .map(|url| (url.to_string(), "version two".to_string()))
            .collect(),
        cancel_on: urls[0].to_string(),
        token: token.clone(),
    });

    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(registry),
        oracle.clone(),
        sink.clone(),
        &config(),
        token.clone(),
    );
    let worker = tokio::spawn(reconciler.run());

    let finished = tokio::time::timeout(Duration::from_secs(30), worker).await;
    assert!(finished.is_ok(), "loop must exit once cancelled");

    // the in-flight assessment was finished, the rest were never touched
    let first = store.assessment(ids[0]).unwrap();
    assert_eq!(first.risk, Some(6));
    for id in &ids[1..] {
        let untouched = store.assessment(*id).unwrap();
        assert_eq!(untouched.risk, None);
        let resources = store.resources_for(*id).unwrap();
        assert_eq!(resources[0].content, "version one");
    }
    assert_eq!(sink.messages().len(), 1);
    assert_eq!(oracle.calls(), 1);
}
