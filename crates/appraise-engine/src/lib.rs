//! The assessment reconciliation engine and its daemon binary.
//!
//! Ties the workspace together. Intake creates assessments and runs the
//! initial decision pass; the reconciliation loop keeps verdicts fresh as
//! linked resources drift. Both paths share the context builder, the
//! decision pipeline and the content sources.
//!
//! # Architecture
//!
//! ```text
//! IntakeService             Reconciler
//!      │                        │  interval tick, cancellation token
//!      ▼                        ▼
//! SourceRegistry ────▶ fetched resource content
//!      │                        │  digest drift?
//!      ▼                        ▼
//! ContextBuilder ────▶ DecisionPipeline ────▶ Store
//!                               │
//!                               ▼
//!                       NotificationSink
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use appraise_engine::{ChatApi, ChatNotifier, Config, Reconciler, SourceRegistry};
//! use appraise_core::store::Store;
//! use appraise_oracle::HttpOracle;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::load_or_default("appraise.yaml".as_ref())?;
//! let store = Arc::new(Store::open(&config.store.path)?);
//! let oracle = Arc::new(HttpOracle::with_default()?);
//! let chat = Arc::new(ChatApi::from_env(config.chat.base_url.clone())?);
//! let sources = Arc::new(SourceRegistry::with_defaults(chat.clone()));
//! let sink = Arc::new(ChatNotifier::new(chat));
//!
//! let token = CancellationToken::new();
//! let reconciler = Reconciler::new(store, sources, oracle, sink, &config, token.clone());
//! tokio::spawn(reconciler.run());
//! // ... token.cancel() on shutdown
//! ```

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod intake;
pub mod notify;
pub mod pipeline;
pub mod reconcile;

pub use chat::ChatApi;
pub use config::Config;
pub use error::{EngineError, Result};
pub use fetch::{ContentSource, SourceRegistry};
pub use intake::{IntakeReport, IntakeService};
pub use notify::{ChatNotifier, NotificationSink};
pub use pipeline::DecisionPipeline;
pub use reconcile::{Reconciler, ScanSummary};
