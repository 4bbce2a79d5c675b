//! Call site for synthesis
//!
//! Voice is best-effort: the avatar keeps talking with a text-timed mouth
//! when an engine fails, so [`speak`] never returns an error.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::AudioCache;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::{Result, TtsError};

/// Incoming speech request from the HTTP layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub text: String,
    /// Facial expression to show while speaking, not used for synthesis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Engine-specific voice parameters, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_params: Option<Value>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expression: None,
            voice_params: None,
        }
    }

    /// Reject requests without anything to say
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }
        Ok(())
    }
}

/// Synthesize `text`, substituting a text-timed result for any engine failure
pub async fn speak(engine: &dyn TtsEngine, text: &str, cache: &AudioCache) -> SpeechResult {
    match engine.synthesize(text, cache).await {
        Ok(result) => result,
        Err(e) => {
            warn!(
                "TTS engine '{}' failed, continuing without audio: {}",
                engine.name(),
                e
            );
            SpeechResult::estimated(text)
        }
    }
}
