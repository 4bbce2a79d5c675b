//! Mock TTS engine for testing
//!
//! Provides a configurable engine that can simulate failures and successes
//! while counting calls, so callers can verify fallback behavior.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::{AudioCache, CacheKey};
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::{Result, TtsError};

/// A mock engine for testing caching and fallback behavior
pub struct MockEngine {
    /// Number of times to fail before succeeding (0 = always succeed)
    fail_count: AtomicUsize,
    /// Current call count
    call_count: AtomicUsize,
    /// Error to return on failure (None = always succeed)
    fail_with: Mutex<Option<TtsError>>,
    /// Bytes written to the cache on success
    audio: Vec<u8>,
    /// Engine name for display
    name: &'static str,
}

impl MockEngine {
    /// Create an engine that fails `n` times with the given error, then succeeds
    pub fn fails_then_succeeds(n: usize, error: TtsError, audio: &[u8]) -> Self {
        Self {
            fail_count: AtomicUsize::new(n),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(Some(error)),
            audio: audio.to_vec(),
            name: "mock",
        }
    }

    /// Create an engine that always fails with the given error
    pub fn always_fails(error: TtsError) -> Self {
        Self {
            fail_count: AtomicUsize::new(usize::MAX),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(Some(error)),
            audio: Vec::new(),
            name: "mock",
        }
    }

    /// Create an engine that always succeeds, storing `audio`
    pub fn always_succeeds(audio: &[u8]) -> Self {
        Self {
            fail_count: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
            audio: audio.to_vec(),
            name: "mock",
        }
    }

    /// Get the number of times synthesize() reached the backend
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Set a custom engine name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl TtsEngine for MockEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let key = CacheKey::new(self.name, text, &[]);
        if let Some(hit) = cache.lookup(&key, "wav").await {
            return Ok(hit);
        }

        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        let fail_count = self.fail_count.load(Ordering::SeqCst);

        if call_num < fail_count {
            let error = self
                .fail_with
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(err) = error.as_ref() {
                return Err(clone_error(err));
            }
        }

        cache.store(&key, "wav", &self.audio).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Clone a TtsError (needed because TtsError doesn't implement Clone)
fn clone_error(err: &TtsError) -> TtsError {
    match err {
        TtsError::MissingApiKey { engine, env_var } => TtsError::MissingApiKey {
            engine: engine.clone(),
            env_var: env_var.clone(),
        },
        TtsError::ApiError {
            message,
            status_code,
        } => TtsError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        TtsError::EngineUnavailable(s) => TtsError::EngineUnavailable(s.clone()),
        TtsError::ConfigError(s) => TtsError::ConfigError(s.clone()),
        TtsError::InvalidResponse(s) => TtsError::InvalidResponse(s.clone()),
        TtsError::CommandFailed(s) => TtsError::CommandFailed(s.clone()),
        TtsError::Timeout { secs } => TtsError::Timeout { secs: *secs },
        TtsError::EmptyText => TtsError::EmptyText,
        // Wrapped library errors can't be cloned; keep their message
        other => TtsError::EngineUnavailable(format!("{} (mock)", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(tmp.path(), "/audio").unwrap();
        let engine = MockEngine::always_succeeds(b"RIFF");

        let result = engine.synthesize("test", &cache).await.unwrap();
        assert!(result.has_audio());
        assert_eq!(engine.call_count(), 1);

        // Cached: the backend is not reached again
        engine.synthesize("test", &cache).await.unwrap();
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn test_always_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(tmp.path(), "/audio").unwrap();
        let engine = MockEngine::always_fails(TtsError::ApiError {
            message: "overloaded".to_string(),
            status_code: Some(503),
        });

        for _ in 0..3 {
            assert!(engine.synthesize("test", &cache).await.is_err());
        }
        assert_eq!(engine.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fails_then_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(tmp.path(), "/audio").unwrap();
        let engine = MockEngine::fails_then_succeeds(
            2,
            TtsError::Timeout { secs: 30 },
            b"RIFF",
        );

        assert!(engine.synthesize("test", &cache).await.is_err());
        assert!(engine.synthesize("test", &cache).await.is_err());

        let result = engine.synthesize("test", &cache).await;
        assert!(result.is_ok());
        assert_eq!(engine.call_count(), 3);
    }
}
