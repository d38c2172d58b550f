//! Word sources: where themed word lists come from.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::words::parse_word_list;

/// Produces words for a topic. Called off the event loop; may block.
pub trait WordSource: Send + Sync {
    fn generate(&self, topic: &str) -> Result<Vec<String>, GenerationError>;
}

/// Fixed answer, for offline use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticWordSource {
    words: Vec<String>,
}

impl StaticWordSource {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl WordSource for StaticWordSource {
    fn generate(&self, _topic: &str) -> Result<Vec<String>, GenerationError> {
        if self.words.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(self.words.clone())
    }
}

const SYSTEM_PROMPT: &str = "You generate word lists for a typing trainer. \
Answer with a JSON array of single lowercase words and nothing else. \
No numbers, no duplicates, no phrases.";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint. The default
/// configuration points at a local Ollama server, which needs no key.
#[derive(Debug, Clone)]
pub struct ChatWordSource {
    config: GeneratorConfig,
    client: reqwest::blocking::Client,
}

impl ChatWordSource {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> Result<Option<String>, GenerationError> {
        let Some(var) = self.config.api_key_env.as_deref() else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(key) if !key.is_empty() => Ok(Some(key)),
            _ => Err(GenerationError::MissingApiKey {
                var: var.to_string(),
            }),
        }
    }

    fn user_prompt(&self, topic: &str) -> String {
        format!(
            "Give me {} common words related to the theme \"{}\".",
            self.config.word_count, topic
        )
    }
}

impl WordSource for ChatWordSource {
    #[instrument(skip(self), fields(model = %self.config.model))]
    fn generate(&self, topic: &str) -> Result<Vec<String>, GenerationError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": 0.9,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": self.user_prompt(topic) }
            ]
        });

        let mut request = self.client.post(self.url()).json(&body);
        if let Some(key) = self.api_key()? {
            request = request.bearer_auth(key);
        }

        debug!(url = %self.url(), "requesting words");
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "word generator returned an error status");
            return Err(GenerationError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .map_err(|e| GenerationError::Malformed {
                    reason: e.to_string(),
                })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::Malformed {
                reason: "response has no choices".to_string(),
            })?;

        let words = parse_word_list(&content);
        if words.is_empty() {
            return Err(GenerationError::Empty);
        }
        info!(count = words.len(), "generated words");
        Ok(words)
    }
}
