//! troupe: personality-consistent AI characters
//!
//! Characters answer situations through a generative backend, with
//! sanitization of the generated text, bounded retries and scripted
//! fallbacks. Conversations broadcast situations to a cast in rounds and
//! evolve relationship scores from the tone of each response.

pub mod backend;
pub mod character;
pub mod config;
pub mod conversation;
pub mod sanitize;
pub mod scenario;
pub mod tone;

pub use backend::{Backend, BackendError, GenerationOptions, OllamaClient};
pub use character::{Character, CharacterSpec, HistoryEntry, Personality, ResponseContext, SharedCharacter};
pub use config::Config;
pub use conversation::{Conversation, RoundRecord};
pub use sanitize::Sanitizer;
pub use scenario::ScenarioFile;
pub use tone::Tone;
