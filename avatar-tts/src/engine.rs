use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::AudioCache;
use crate::duration;
use crate::error::Result;

/// Outcome of a synthesis, identical in shape for every engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResult {
    /// Public URL of the audio file, `None` when no audio was produced
    pub audio_url: Option<String>,
    /// Speaking window for lip-sync, always at least 500ms
    pub duration_ms: u64,
}

impl SpeechResult {
    /// A result with audio
    pub fn with_audio(audio_url: String, duration_ms: u64) -> Self {
        Self {
            audio_url: Some(audio_url),
            duration_ms,
        }
    }

    /// A result without audio, timed from the text alone
    pub fn estimated(text: &str) -> Self {
        Self {
            audio_url: None,
            duration_ms: duration::estimate(text),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_url.is_some()
    }
}

/// Trait for speech synthesis engines
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesize `text` into the cache, reusing an existing entry when present
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult>;

    /// Get the engine name for diagnostics
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let result = SpeechResult::with_audio("/audio/abc.mp3".to_string(), 1200);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["audioUrl"], "/audio/abc.mp3");
        assert_eq!(json["durationMs"], 1200);
    }

    #[test]
    fn test_estimated_has_null_audio() {
        let result = SpeechResult::estimated("hello");
        assert!(!result.has_audio());
        assert_eq!(result.duration_ms, 500);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["audioUrl"].is_null());
    }
}
