//! Multi-character conversation rounds
//!
//! A round broadcasts one situation to every character in insertion order.
//! After each character speaks, the tone of its own response shifts that
//! speaker's view of every other participant (not the reverse).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::character::{ResponseContext, SharedCharacter};
use crate::tone;

/// One completed round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    pub situation: String,
    pub responses: IndexMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

pub struct Conversation {
    characters: IndexMap<String, SharedCharacter>,
    scenario: String,
    history: Vec<RoundRecord>,
}

impl Conversation {
    /// Characters are keyed by role; iteration order is insertion order
    pub fn new(characters: IndexMap<String, SharedCharacter>, scenario: impl Into<String>) -> Self {
        Self {
            characters,
            scenario: scenario.into(),
            history: Vec::new(),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn characters(&self) -> &IndexMap<String, SharedCharacter> {
        &self.characters
    }

    pub fn character(&self, key: &str) -> Option<&SharedCharacter> {
        self.characters.get(key)
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    /// Context handed to the character under `key` for the upcoming round
    pub fn context_for(&self, key: &str) -> ResponseContext {
        ResponseContext {
            other_characters: self.characters.keys().filter(|k| k.as_str() != key).cloned().collect(),
            scenario: Some(self.scenario.clone()),
            round_number: Some(self.history.len() + 1),
            ..Default::default()
        }
    }

    /// Run one round and return each character's response keyed by role
    pub fn run_round(&mut self, situation: &str) -> IndexMap<String, String> {
        let round = self.history.len() + 1;
        log::info!("Round {}: {}", round, situation);

        let mut responses = IndexMap::new();

        for (key, character) in &self.characters {
            let context = self.context_for(key);
            let mut speaker = character.borrow_mut();

            let response = speaker.respond(situation, Some(&context));

            let tone = tone::classify(&response);
            let delta = tone.relationship_delta();
            log::debug!("{} spoke with {} tone (delta {})", key, tone, delta);

            if delta != 0 {
                for other in &context.other_characters {
                    speaker.update_relationship(other, delta);
                }
            }

            responses.insert(key.clone(), response);
        }

        self.history.push(RoundRecord {
            round,
            situation: situation.to_string(),
            responses: responses.clone(),
            timestamp: Utc::now(),
        });

        responses
    }

    pub fn summary(&self) -> String {
        format!(
            "Conversation with {} characters over {} rounds",
            self.characters.len(),
            self.history.len()
        )
    }
}
