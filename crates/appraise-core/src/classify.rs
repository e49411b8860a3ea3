//! Band classification for risk and confidence scores.
//!
//! Decisions carry integer scores from 1 to 10 on both axes. User-facing
//! messages render them as descriptive bands. Anything outside 1 to 10
//! renders as "unknown" rather than failing the message path.

// ---------------------------------------------------------------------------
// Band
// ---------------------------------------------------------------------------

/// One of the six contiguous score bands, or `Unknown` for out-of-range input.
///
/// The band boundaries are shared by both axes; only the top band's wording
/// differs ("critical risk" vs. "extreme confidence").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    ExtremelyLow,
    Low,
    Medium,
    MediumHigh,
    High,
    Extreme,
    Unknown,
}

impl Band {
    pub fn of(value: i64) -> Band {
        match value {
            1..=2 => Band::ExtremelyLow,
            3 => Band::Low,
            4..=5 => Band::Medium,
            6..=7 => Band::MediumHigh,
            8..=9 => Band::High,
            10 => Band::Extreme,
            _ => Band::Unknown,
        }
    }
}

/// Descriptive label for a risk score, e.g. `3` → `"low risk"`.
pub fn risk_label(value: i64) -> &'static str {
    match Band::of(value) {
        Band::ExtremelyLow => "extremely low risk",
        Band::Low => "low risk",
        Band::Medium => "medium risk",
        Band::MediumHigh => "medium-high risk",
        Band::High => "high risk",
        Band::Extreme => "critical risk",
        Band::Unknown => "unknown",
    }
}

/// Descriptive label for a confidence score, e.g. `8` → `"high confidence"`.
pub fn confidence_label(value: i64) -> &'static str {
    match Band::of(value) {
        Band::ExtremelyLow => "extremely low confidence",
        Band::Low => "low confidence",
        Band::Medium => "medium confidence",
        Band::MediumHigh => "medium-high confidence",
        Band::High => "high confidence",
        Band::Extreme => "extreme confidence",
        Band::Unknown => "unknown",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
