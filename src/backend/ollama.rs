//! Blocking client for an Ollama-style `/api/generate` endpoint

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ureq::Agent;

use super::{Backend, BackendError, GenerationOptions};
use crate::config::BackendConfig;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Stateless transport adapter; each call opens and closes its own request
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.endpoint, &config.model, config.timeout())
    }

    /// Same model and timeout, different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, prompt: &str, options: &GenerationOptions) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };
        serde_json::to_string(&request).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl Backend for OllamaClient {
    fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<String, BackendError> {
        let body = self.request_body(prompt, options)?;

        let agent = Agent::new_with_config(Agent::config_builder().timeout_global(Some(self.timeout)).build());

        log::debug!("POST {} (seed={}, {} prompt bytes)", self.endpoint, options.seed, prompt.len());

        let mut response = agent
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(transport_error)?;

        // ureq only rejects 4xx/5xx; anything but 200 is a failure here
        let status = response.status().as_u16();
        if status != 200 {
            return Err(BackendError::Status(status));
        }

        let response_body = response.body_mut().read_to_string().map_err(transport_error)?;

        let parsed: GenerateResponse =
            serde_json::from_str(&response_body).map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(parsed.response.trim().to_string())
    }
}

fn transport_error(e: ureq::Error) -> BackendError {
    match e {
        ureq::Error::Timeout(_) => BackendError::Timeout,
        ureq::Error::StatusCode(code) => BackendError::Status(code),
        other => BackendError::Transport(other.to_string()),
    }
}
