//! YAML configuration for the daemon.
//!
//! Everything has a usable default so a bare `appraised` run comes up, with
//! `validate()` flagging the values that deserve a second look. Secrets
//! (oracle API key, chat token) come from the environment, never this file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use appraise_core::AppraiseError;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("appraise.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSection {
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,
}

fn default_oracle_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_oracle_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            model: default_oracle_model(),
            base_url: default_oracle_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    360
}

fn default_shutdown_timeout_seconds() -> u64 {
    10
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
        }
    }
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    /// Channel that receives reconciliation decision updates.
    #[serde(default)]
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
}

fn default_chat_base_url() -> String {
    "https://slack.com/api".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompts {
    /// Shared preamble stating the JSON reply contract. Sent on every call.
    #[serde(default = "default_base_prompt")]
    pub base: String,
    #[serde(default = "default_initial_prompt")]
    pub initial: String,
    #[serde(default = "default_update_prompt")]
    pub update: String,
    #[serde(default = "default_summary_prompt")]
    pub summary: String,
}

fn default_base_prompt() -> String {
    "You assess software delivery projects for risk. Reply with JSON only: \
     a single record or an array of records. Each record has an \"outcome\" \
     field that is \"decision\" (with integer \"risk\" 1-10, integer \
     \"confidence\" 1-10 and a \"justification\" string), \"followup\" \
     (with a \"questions\" array of strings), or \"unchanged\"."
        .to_string()
}

fn default_initial_prompt() -> String {
    "Assess the project described in the context. Decide now if the \
     information suffices; otherwise ask follow-up questions."
        .to_string()
}

fn default_update_prompt() -> String {
    "A linked resource for this project changed. The context carries the \
     previous context, the previous decision and the new context. Re-evaluate \
     the decision; reply with outcome \"unchanged\" if the verdict stands."
        .to_string()
}

fn default_summary_prompt() -> String {
    "Summarize the following text in a few sentences, keeping every fact \
     relevant to delivery risk. Reply with plain text."
        .to_string()
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            base: default_base_prompt(),
            initial: default_initial_prompt(),
            update: default_update_prompt(),
            summary: default_summary_prompt(),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// User-facing texts posted by the interaction surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "default_reviewing_message")]
    pub reviewing: String,
    #[serde(default = "default_recoverable_message")]
    pub recoverable_error: String,
    #[serde(default = "default_irrecoverable_message")]
    pub irrecoverable_error: String,
}

fn default_reviewing_message() -> String {
    "Thanks for your submission! We're reviewing the project now and will \
     follow up here shortly."
        .to_string()
}

fn default_recoverable_message() -> String {
    "Something went wrong while reviewing your submission. Please try again \
     in a few minutes."
        .to_string()
}

fn default_irrecoverable_message() -> String {
    "We couldn't process your submission. Please reach out to the \
     assessments team directly."
        .to_string()
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            reviewing: default_reviewing_message(),
            recoverable_error: default_recoverable_message(),
            irrecoverable_error: default_irrecoverable_message(),
        }
    }
}

impl Messages {
    /// Pick the canned text for a failed submission.
    ///
    /// Validation problems echo the offending field. Lookup misses and
    /// fetch failures are worth a retry; the rest needs a human.
    pub fn for_error(&self, err: &EngineError) -> String {
        match err {
            EngineError::Validation { field, reason } => format!("{field}: {reason}"),
            EngineError::Core(
                AppraiseError::AssessmentNotFound(_)
                | AppraiseError::QuestionNotFound(_)
                | AppraiseError::ResourceNotFound(_),
            )
            | EngineError::Fetch(_) => self.recoverable_error.clone(),
            _ => self.irrecoverable_error.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub oracle: OracleSection,
    /// Maximum context characters before summarization and truncation.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub prompts: Prompts,
    #[serde(default)]
    pub messages: Messages,
}

fn default_context_limit() -> usize {
    6000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            oracle: OracleSection::default(),
            context_limit: default_context_limit(),
            scan: ScanConfig::default(),
            notify: NotifyConfig::default(),
            chat: ChatConfig::default(),
            prompts: Prompts::default(),
            messages: Messages::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.scan.interval_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "scan.interval_seconds is 0; the loop would spin without pause"
                    .to_string(),
            });
        }

        if self.scan.shutdown_timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "scan.shutdown_timeout_seconds is 0; shutdown will never wait for \
                          in-flight work"
                    .to_string(),
            });
        }

        if self.context_limit < 500 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "context_limit={} is very small; most assessments will be truncated",
                    self.context_limit
                ),
            });
        }

        if self.notify.channel.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "notify.channel is empty; decision updates will not be delivered"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
