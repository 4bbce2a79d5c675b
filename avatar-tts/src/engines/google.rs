//! Google Cloud Text-to-Speech engine
//!
//! The `text:synthesize` endpoint returns a JSON envelope with the audio as
//! base64 under `audioContent`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::http;
use crate::cache::{AudioCache, CacheKey};
use crate::config::GoogleConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::Result;

const FORMAT: &str = "mp3";

pub struct GoogleEngine {
    language_code: String,
    voice: String,
    speaking_rate: f32,
    pitch: f32,
    endpoint: String,
    api_key: String,
    client: Client,
}

impl GoogleEngine {
    pub fn new(config: &GoogleConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            language_code: config.language_code.clone(),
            voice: config.voice.clone(),
            speaking_rate: config.speaking_rate,
            pitch: config.pitch,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        })
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(
            self.name(),
            text,
            &[
                self.language_code.clone(),
                self.voice.clone(),
                self.speaking_rate.to_string(),
                self.pitch.to_string(),
            ],
        )
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    input: Input<'a>,
    voice: Voice<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct Input<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Voice<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
    pitch: f32,
}

#[async_trait]
impl TtsEngine for GoogleEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        let key = self.cache_key(text);
        if let Some(hit) = cache.lookup(&key, FORMAT).await {
            return Ok(hit);
        }

        let body = SynthesizeRequest {
            input: Input { text },
            voice: Voice {
                language_code: &self.language_code,
                name: &self.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.speaking_rate,
                pitch: self.pitch,
            },
        };

        let url = format!("{}/v1/text:synthesize", self.endpoint);
        let response = http::send(
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body),
        )
        .await?;

        let json = http::read_json(response).await?;
        let audio = http::extract_audio(&json, "audioContent")?;

        cache.store(&key, FORMAT, &audio).await
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
