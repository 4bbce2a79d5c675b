//! VOICEVOX engine
//!
//! Talks to a local VOICEVOX server in two steps: `audio_query` describes the
//! utterance (accent phrases, scales), the configured speed/pitch/intonation/
//! volume are written into that description, and `synthesis` turns it into a
//! WAV file. A server that is down or misbehaving yields a text-timed result
//! instead of an error.

use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde_json::Value;

use super::http;
use super::process::COMMAND_TIMEOUT;
use crate::cache::{AudioCache, CacheKey};
use crate::config::VoicevoxConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::{Result, TtsError};

const FORMAT: &str = "wav";

pub struct VoicevoxEngine {
    url: String,
    speaker: u32,
    speed: f32,
    pitch: f32,
    intonation: f32,
    volume: f32,
    client: Client,
}

impl VoicevoxEngine {
    pub fn new(config: &VoicevoxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(COMMAND_TIMEOUT)
            .build()
            .map_err(|e| TtsError::EngineUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.trim_end_matches('/').to_string(),
            speaker: config.speaker,
            speed: config.speed,
            pitch: config.pitch,
            intonation: config.intonation,
            volume: config.volume,
            client,
        })
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(
            self.name(),
            text,
            &[
                self.speaker.to_string(),
                self.speed.to_string(),
                self.pitch.to_string(),
                self.intonation.to_string(),
                self.volume.to_string(),
            ],
        )
    }

    /// Overwrite the query's default scales with the configured ones
    fn apply_voice(&self, query: &mut Value) -> Result<()> {
        let fields = query.as_object_mut().ok_or_else(|| {
            TtsError::InvalidResponse("audio_query did not return an object".into())
        })?;
        fields.insert("speedScale".into(), Value::from(self.speed));
        fields.insert("pitchScale".into(), Value::from(self.pitch));
        fields.insert("intonationScale".into(), Value::from(self.intonation));
        fields.insert("volumeScale".into(), Value::from(self.volume));
        Ok(())
    }

    async fn request_audio(&self, text: &str) -> Result<Vec<u8>> {
        let speaker = self.speaker.to_string();

        let response = http::send(
            self.client
                .post(format!("{}/audio_query", self.url))
                .query(&[("text", text), ("speaker", speaker.as_str())]),
        )
        .await?;
        let mut query = http::read_json(response).await?;
        self.apply_voice(&mut query)?;

        let response = http::send(
            self.client
                .post(format!("{}/synthesis", self.url))
                .query(&[("speaker", speaker.as_str())])
                .json(&query),
        )
        .await?;
        http::read_bytes(response).await
    }
}

#[async_trait]
impl TtsEngine for VoicevoxEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        let key = self.cache_key(text);
        if let Some(hit) = cache.lookup(&key, FORMAT).await {
            return Ok(hit);
        }

        let stored = match self.request_audio(text).await {
            Ok(audio) => cache.store(&key, FORMAT, &audio).await,
            Err(e) => Err(e),
        };

        match stored {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("VOICEVOX synthesis failed: {}", e);
                Ok(SpeechResult::estimated(text))
            }
        }
    }

    fn name(&self) -> &'static str {
        "voicevox"
    }
}
