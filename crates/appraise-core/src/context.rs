//! Field-map flattening for oracle context.
//!
//! An assessment is presented to the oracle as a flat text blob built from a
//! field map: model columns, fetched resource contents keyed by URL, and
//! answered follow-up questions keyed by question text. Structural fields
//! (identity, name, raw link list, contact, target date) are excluded: they
//! identify the project but carry no decision-relevant prose.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Field names never flattened into context.
pub const EXCLUDED_FIELDS: [&str; 5] = [
    "id",
    "project_name",
    "links",
    "point_of_contact",
    "estimated_go_live_date",
];

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

pub fn is_excluded(field: &str) -> bool {
    EXCLUDED_FIELDS.contains(&field)
}

/// Join all non-excluded field values with newlines, collapse whitespace
/// runs to single spaces, and trim.
///
/// Iteration order follows the map's key order, so output is deterministic
/// for a given field map.
pub fn flatten_fields(fields: &BTreeMap<String, String>) -> String {
    let joined = fields
        .iter()
        .filter(|(k, _)| !is_excluded(k))
        .map(|(_, v)| v.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    whitespace_re().replace_all(&joined, " ").trim().to_string()
}

/// First `limit` characters of `text`.
///
/// Measured in characters, not bytes, so a multi-byte character is never
/// split.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
