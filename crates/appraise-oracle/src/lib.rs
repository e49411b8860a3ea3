//! Language-model client for the appraise workspace.
//!
//! The engine hands the oracle an instruction prompt and a context blob and
//! gets back structured JSON records ([`Oracle::query`]) or free-form text
//! ([`Oracle::query_text`], used for summaries). This crate owns the
//! transport, the reply scrubbing and decoding, and the bounded retry
//! policy; what the records mean is the engine's business.
//!
//! # Architecture
//!
//! ```text
//! Oracle trait          ← the seam; tests script it
//!     │
//!     ▼
//! HttpOracle            ← chat-completions over reqwest, bearer auth
//!     │
//!     ▼
//! scrub + decode_text   ← fence stripping, JSON decode into Reply
//!     │
//!     ▼
//! Reply                 ← Single(record) | Blocks([record, ...])
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use appraise_oracle::{HttpOracle, Oracle, OracleConfig, Reply};
//!
//! let oracle = HttpOracle::new(OracleConfig::default())?;
//! match oracle.query("Assess this project.", "fields...").await? {
//!     Reply::Single(record) => println!("{record}"),
//!     Reply::Blocks(records) => println!("{} records", records.len()),
//! }
//! ```

pub mod client;
pub mod error;
pub mod retry;

pub use client::{decode_text, scrub_reply, HttpOracle, Oracle, OracleConfig, Reply};
pub use error::{OracleError, Result};
pub use retry::with_retry;
