//! Characters: persistent, personality-consistent dialogue agents
//!
//! A character owns its relationship scores and response history and
//! answers situations through a generative backend. `respond` never fails:
//! backend errors and unusable output are retried, then replaced by a
//! scripted line that fits the character's speaking style.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

pub mod prompt;

pub use prompt::PromptBuilder;

use crate::backend::{Backend, BackendError, GenerationOptions, OllamaClient, generation_seed};
use crate::config::{BackendConfig, Config, RetryConfig};
use crate::sanitize::Sanitizer;

/// Score assumed for a counterpart the character has no opinion of yet
pub const NEUTRAL_RELATIONSHIP: i32 = 5;
pub const MIN_RELATIONSHIP: i32 = 1;
pub const MAX_RELATIONSHIP: i32 = 10;

/// History entries returned when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const FALLBACK_DIRECT: &str = "We need to focus on practical solutions.";
const FALLBACK_COMPASSIONATE: &str = "There must be a peaceful way through this.";
const FALLBACK_CALCULATING: &str = "I'm assessing our options carefully.";

/// Character personality: structured trait intensities or a free-text sketch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Personality {
    Traits(IndexMap<String, serde_json::Value>),
    FreeText(String),
}

impl Personality {
    /// Build structured traits, keeping the given order
    pub fn traits<I, K, V>(traits: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Personality::Traits(traits.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Text embedded in the prompt
    pub fn render(&self) -> String {
        match self {
            Personality::Traits(traits) => prompt::to_prompt_json(traits).unwrap_or_default(),
            Personality::FreeText(text) => text.clone(),
        }
    }
}

impl From<&str> for Personality {
    fn from(text: &str) -> Self {
        Personality::FreeText(text.to_string())
    }
}

impl From<String> for Personality {
    fn from(text: String) -> Self {
        Personality::FreeText(text)
    }
}

/// Situational context passed to `respond`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContext {
    /// Other participants; their current scores go into the prompt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_characters: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<usize>,

    /// Arbitrary caller payload, rendered verbatim
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl ResponseContext {
    pub fn is_empty(&self) -> bool {
        self.other_characters.is_empty() && self.scenario.is_none() && self.round_number.is_none() && self.extra.is_empty()
    }
}

/// One accepted response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub situation: String,
    pub response: String,
}

/// Construction parameters, as found in scenario files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub personality: Personality,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub speaking_style: String,
    #[serde(default)]
    pub relationships: IndexMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_endpoint: Option<String>,
}

/// A character shared between conversations
pub type SharedCharacter = Rc<RefCell<Character>>;

/// Outcome of a single backend attempt
enum Attempt {
    Accepted(String),
    TooShort(usize),
    Failed(BackendError),
}

impl Attempt {
    /// Pause before the next attempt: short output and backend failures use separate tiers
    fn backoff(&self, retry: &RetryConfig) -> Duration {
        match self {
            Attempt::Accepted(_) => Duration::ZERO,
            Attempt::TooShort(_) => retry.validation_backoff(),
            Attempt::Failed(_) => retry.failure_backoff(),
        }
    }
}

pub struct Character {
    pub name: String,
    pub personality: Personality,
    pub goals: Vec<String>,
    pub speaking_style: String,
    relationships: IndexMap<String, i32>,
    history: Vec<HistoryEntry>,
    backend: Rc<dyn Backend>,
    sampling: BackendConfig,
    retry: RetryConfig,
    sanitizer: Sanitizer,
    min_words: usize,
}

impl fmt::Debug for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Character")
            .field("name", &self.name)
            .field("speaking_style", &self.speaking_style)
            .field("relationships", &self.relationships)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Character {
    /// Create a character talking to the default local backend
    pub fn new(
        name: impl Into<String>,
        personality: impl Into<Personality>,
        goals: Vec<String>,
        speaking_style: impl Into<String>,
    ) -> Self {
        Self::with_config(name, personality, goals, speaking_style, &Config::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        personality: impl Into<Personality>,
        goals: Vec<String>,
        speaking_style: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            name: name.into(),
            personality: personality.into(),
            goals,
            speaking_style: speaking_style.into(),
            relationships: IndexMap::new(),
            history: Vec::new(),
            backend: Rc::new(OllamaClient::from_config(&config.backend)),
            sampling: config.backend.clone(),
            retry: config.retry.clone(),
            sanitizer: Sanitizer::new(config.sanitizer.clone()),
            min_words: config.min_words,
        }
    }

    /// Build from a spec; `backend_endpoint` overrides the configured one
    pub fn from_spec(spec: CharacterSpec, config: &Config) -> Self {
        let mut character = Self::with_config(spec.name, spec.personality, spec.goals, spec.speaking_style, config)
            .with_relationships(spec.relationships);

        if let Some(endpoint) = spec.backend_endpoint {
            character.backend = Rc::new(OllamaClient::from_config(&config.backend).with_endpoint(endpoint));
        }
        character
    }

    /// Replace the generative backend
    pub fn with_backend(mut self, backend: Rc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Seed relationship scores; values are clamped into range
    pub fn with_relationships(mut self, relationships: IndexMap<String, i32>) -> Self {
        self.relationships = relationships
            .into_iter()
            .map(|(other, score)| (other, score.clamp(MIN_RELATIONSHIP, MAX_RELATIONSHIP)))
            .collect();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn shared(self) -> SharedCharacter {
        Rc::new(RefCell::new(self))
    }

    pub fn relationships(&self) -> &IndexMap<String, i32> {
        &self.relationships
    }

    /// Current score toward `other`; unknown counterparts read as neutral
    pub fn relationship(&self, other: &str) -> i32 {
        self.relationships.get(other).copied().unwrap_or(NEUTRAL_RELATIONSHIP)
    }

    /// Shift the score toward `other` by `delta`, clamped to 1..=10
    pub fn update_relationship(&mut self, other: &str, delta: i32) {
        let updated = self
            .relationship(other)
            .saturating_add(delta)
            .clamp(MIN_RELATIONSHIP, MAX_RELATIONSHIP);
        self.relationships.insert(other.to_string(), updated);
    }

    /// Most recent accepted responses, oldest first
    pub fn conversation_history(&self, limit: Option<usize>) -> &[HistoryEntry] {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn render_prompt(&self, situation: &str, context: Option<&ResponseContext>) -> String {
        PromptBuilder {
            name: &self.name,
            speaking_style: &self.speaking_style,
            goals: &self.goals,
            personality: &self.personality,
            relationships: &self.relationships,
        }
        .render(situation, context)
    }

    /// Scripted line used once every attempt has failed
    pub fn fallback_response(&self) -> &'static str {
        let style = self.speaking_style.to_lowercase();
        if style.contains("compassion") {
            FALLBACK_COMPASSIONATE
        } else if style.contains("calculating") {
            FALLBACK_CALCULATING
        } else {
            FALLBACK_DIRECT
        }
    }

    fn generation_options(&self, situation: &str) -> GenerationOptions {
        GenerationOptions {
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            num_predict: self.sampling.num_predict,
            seed: generation_seed(&self.name, situation),
        }
    }

    fn attempt(&self, prompt: &str, options: &GenerationOptions) -> Attempt {
        match self.backend.invoke(prompt, options) {
            Ok(raw) => {
                let cleaned = self.sanitizer.clean(&raw, &self.name);
                let words = cleaned.split_whitespace().count();
                if words >= self.min_words {
                    Attempt::Accepted(cleaned)
                } else {
                    Attempt::TooShort(words)
                }
            }
            Err(e) => Attempt::Failed(e),
        }
    }

    /// Answer a situation in character.
    ///
    /// Accepted responses are appended to the history; fallback lines are not.
    pub fn respond(&mut self, situation: &str, context: Option<&ResponseContext>) -> String {
        let prompt = self.render_prompt(situation, context);
        let options = self.generation_options(situation);
        log::debug!("Prompt for {} ({} chars, seed={})", self.name, prompt.len(), options.seed);

        let max_attempts = self.retry.max_attempts;
        for attempt in 1..=max_attempts {
            let outcome = self.attempt(&prompt, &options);
            let backoff = outcome.backoff(&self.retry);

            match outcome {
                Attempt::Accepted(response) => {
                    log::info!("{} responded on attempt {}/{}", self.name, attempt, max_attempts);
                    self.history.push(HistoryEntry {
                        timestamp: Utc::now(),
                        situation: situation.to_string(),
                        response: response.clone(),
                    });
                    return response;
                }
                Attempt::TooShort(words) => {
                    log::debug!(
                        "{} gave {} words on attempt {}/{} (need {})",
                        self.name,
                        words,
                        attempt,
                        max_attempts,
                        self.min_words
                    );
                }
                Attempt::Failed(BackendError::Timeout) => {
                    log::warn!("Timeout for {}, attempt {}/{}", self.name, attempt, max_attempts);
                }
                Attempt::Failed(e) => {
                    log::warn!("Backend error for {} on attempt {}/{}: {}", self.name, attempt, max_attempts, e);
                }
            }

            if attempt < max_attempts && !backoff.is_zero() {
                std::thread::sleep(backoff);
            }
        }

        let fallback = self.fallback_response();
        log::warn!("{} falling back to scripted response after {} attempts", self.name, max_attempts);
        fallback.to_string()
    }
}
