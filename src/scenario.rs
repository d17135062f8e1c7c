//! Scenario file parsing (scenario.yaml)

use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::character::{Character, CharacterSpec};
use crate::config::Config;
use crate::conversation::Conversation;

/// A playable session: cast, setting and the situations to broadcast
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioFile {
    /// Setting description included in every round's context
    pub scenario: String,

    /// Cast keyed by role (order preserved; it is the speaking order)
    pub characters: IndexMap<String, CharacterSpec>,

    /// One situation per round
    #[serde(default)]
    pub situations: Vec<String>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read scenario file {}", path.display()))?;
        Self::parse(&content).context(format!("Invalid scenario file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content).context("Failed to parse scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.characters.is_empty() {
            eyre::bail!("Scenario must define at least one character");
        }
        if self.situations.is_empty() {
            eyre::bail!("Scenario must define at least one situation");
        }
        for (key, spec) in &self.characters {
            if spec.name.trim().is_empty() {
                eyre::bail!("Character '{}' has an empty name", key);
            }
        }
        Ok(())
    }

    /// Build the conversation, one fresh character per role
    pub fn to_conversation(&self, config: &Config) -> Conversation {
        let characters = self
            .characters
            .iter()
            .map(|(key, spec)| (key.clone(), Character::from_spec(spec.clone(), config).shared()))
            .collect();
        Conversation::new(characters, self.scenario.clone())
    }
}
