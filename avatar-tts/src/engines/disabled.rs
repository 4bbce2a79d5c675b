//! No-op engine

use async_trait::async_trait;

use crate::cache::AudioCache;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::Result;

/// Engine that never produces audio, only a speaking window estimate.
///
/// Used when speech is turned off and as the fallback for engines that
/// cannot be constructed. Touches neither the filesystem nor the network.
#[derive(Debug, Default)]
pub struct DisabledEngine;

impl DisabledEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TtsEngine for DisabledEngine {
    async fn synthesize(&self, text: &str, _cache: &AudioCache) -> Result<SpeechResult> {
        Ok(SpeechResult::estimated(text))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
