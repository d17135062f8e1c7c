//! Tone classification for relationship updates
//!
//! Maps a produced response to a coarse tone by keyword presence:
//! - `cooperative`: agreement, offers of help (+1 toward every listener)
//! - `confrontational`: refusal, hostility (-1)
//! - `trust_building`: understanding, respect (no change)
//! - `neutral`: nothing matched (no change)

use serde::{Deserialize, Serialize};

/// Tone of a produced response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Cooperative,
    Confrontational,
    TrustBuilding,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Cooperative => "cooperative",
            Tone::Confrontational => "confrontational",
            Tone::TrustBuilding => "trust_building",
            Tone::Neutral => "neutral",
        }
    }

    /// Relationship change the speaker applies toward every other participant
    pub fn relationship_delta(&self) -> i32 {
        match self {
            Tone::Cooperative => 1,
            Tone::Confrontational => -1,
            Tone::TrustBuilding | Tone::Neutral => 0,
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const COOPERATIVE_KEYWORDS: &[&str] = &["agree", "support", "trust", "together", "help"];

const CONFRONTATIONAL_KEYWORDS: &[&str] = &["no", "wrong", "dangerous", "stupid", "against"];

const TRUST_BUILDING_KEYWORDS: &[&str] = &["believe", "understand", "appreciate", "respect"];

/// Checked in order; the first set with any hit wins
const PRIORITY: &[(Tone, &[&str])] = &[
    (Tone::Cooperative, COOPERATIVE_KEYWORDS),
    (Tone::Confrontational, CONFRONTATIONAL_KEYWORDS),
    (Tone::TrustBuilding, TRUST_BUILDING_KEYWORDS),
];

/// Classify text by plain substring membership (no stemming, no negation)
pub fn classify(text: &str) -> Tone {
    let text_lower = text.to_lowercase();

    PRIORITY
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text_lower.contains(kw)))
        .map(|(tone, _)| *tone)
        .unwrap_or(Tone::Neutral)
}
