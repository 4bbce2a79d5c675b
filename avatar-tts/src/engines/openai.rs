//! OpenAI speech engine
//!
//! Direct HTTP implementation of the `/audio/speech` endpoint, which answers
//! with raw audio bytes.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;

use super::http;
use crate::cache::{AudioCache, CacheKey};
use crate::config::OpenAiConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::Result;

/// Engine for the OpenAI text-to-speech API
pub struct OpenAiEngine {
    model: String,
    voice: String,
    format: String,
    speed: Option<f32>,
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiEngine {
    /// Create a new OpenAI engine
    pub fn new(config: &OpenAiConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            voice: config.voice.clone(),
            format: config.format.clone(),
            speed: config.speed,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        })
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        let speed = self.speed.map(|s| s.to_string()).unwrap_or_default();
        CacheKey::new(
            self.name(),
            text,
            &[
                self.model.clone(),
                self.voice.clone(),
                speed,
                self.format.clone(),
            ],
        )
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

#[async_trait]
impl TtsEngine for OpenAiEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        let key = self.cache_key(text);
        if let Some(hit) = cache.lookup(&key, &self.format).await {
            return Ok(hit);
        }

        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: &self.format,
            speed: self.speed,
        };

        let url = format!("{}/audio/speech", self.base_url);
        debug!("OpenAI synthesis: {} chars, voice {}", text.len(), self.voice);

        let response = http::send(
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body),
        )
        .await?;
        let audio = http::read_bytes(response).await?;

        cache.store(&key, &self.format, &audio).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
