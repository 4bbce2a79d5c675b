use std::sync::{Arc, RwLock};

use log::info;

use crate::cache::AudioCache;
use crate::config::TtsConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::engines::create_engine;
use crate::speech;

/// Shared, swappable reference to the active engine.
///
/// Clones share the same slot. `reload` replaces the engine wholesale;
/// synthesis already running keeps the engine it started with.
#[derive(Clone)]
pub struct EngineHandle {
    active: Arc<RwLock<Arc<dyn TtsEngine>>>,
}

impl EngineHandle {
    /// Build the engine selected by `config`
    pub fn new(config: &TtsConfig) -> Self {
        Self::from_engine(create_engine(config))
    }

    /// Wrap an already constructed engine
    pub fn from_engine(engine: Arc<dyn TtsEngine>) -> Self {
        Self {
            active: Arc::new(RwLock::new(engine)),
        }
    }

    /// The engine in use right now
    pub fn current(&self) -> Arc<dyn TtsEngine> {
        let guard = self
            .active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn engine_name(&self) -> &'static str {
        self.current().name()
    }

    /// Replace the active engine with one built from `config`
    pub fn reload(&self, config: &TtsConfig) {
        let engine = create_engine(config);
        info!(
            "TTS engine reloaded: {} -> {}",
            self.engine_name(),
            engine.name()
        );
        self.replace(engine);
    }

    /// Replace the active engine with `engine`
    pub fn replace(&self, engine: Arc<dyn TtsEngine>) {
        let mut guard = self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = engine;
    }

    /// Synthesize with the active engine, never failing
    pub async fn speak(&self, text: &str, cache: &AudioCache) -> SpeechResult {
        let engine = self.current();
        speech::speak(engine.as_ref(), text, cache).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::MockEngine;
    use crate::error::TtsError;

    #[test]
    fn test_reload_replaces_engine() {
        let handle = EngineHandle::new(&TtsConfig::default());
        assert_eq!(handle.engine_name(), "none");

        let mut config = TtsConfig::default().with_engine("openai");
        config.openai.api_key = Some("sk-test".to_string());
        handle.reload(&config);
        assert_eq!(handle.engine_name(), "openai");

        // Clones observe the same slot
        let clone = handle.clone();
        clone.reload(&TtsConfig::default().with_engine("festival"));
        assert_eq!(handle.engine_name(), "none");
    }

    #[tokio::test]
    async fn test_speak_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(tmp.path(), "/audio").unwrap();
        let handle = EngineHandle::from_engine(Arc::new(MockEngine::always_fails(
            TtsError::ApiError {
                message: "unavailable".to_string(),
                status_code: Some(503),
            },
        )));

        let result = handle.speak("hello", &cache).await;
        assert_eq!(result, SpeechResult::estimated("hello"));
    }

    #[tokio::test]
    async fn test_in_flight_engine_survives_replace() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(tmp.path(), "/audio").unwrap();
        let mock = Arc::new(MockEngine::always_succeeds(b"RIFF").with_name("first"));
        let handle = EngineHandle::from_engine(mock.clone());

        let held = handle.current();
        handle.replace(Arc::new(MockEngine::always_succeeds(b"RIFF").with_name("second")));

        assert_eq!(held.name(), "first");
        assert_eq!(handle.engine_name(), "second");
        held.synthesize("still works", &cache).await.unwrap();
        assert_eq!(mock.call_count(), 1);
    }
}
