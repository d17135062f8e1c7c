//! Generative backend access
//!
//! A backend turns a rendered prompt plus sampling options into raw text.
//! Every failure is retryable from the caller's point of view; the variants
//! only exist so logs can tell a slow backend from a broken one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod ollama;

pub use ollama::OllamaClient;

/// Sampling options sent with every generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
    pub seed: u64,
}

/// Backend failure, absorbed by the retry loop
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// A generative text backend
pub trait Backend {
    /// Generate raw text for `prompt`; one blocking call, no retries
    fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<String, BackendError>;
}

/// Reproducible seed for a speaker and situation (FNV-1a, reduced mod 10000)
pub fn generation_seed(name: &str, situation: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = name
        .bytes()
        .chain(situation.bytes())
        .fold(OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(PRIME));
    hash % 10_000
}
