//! Piper engine
//!
//! Runs the local `piper` executable with the text on stdin and the output
//! WAV written to a staged file. The executable is resolved once at
//! construction; when it is missing, or a run fails, synthesis answers with a
//! text-timed result rather than an error. Cached clips are served either way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use tokio::process::Command;

use super::process::{self, COMMAND_TIMEOUT};
use crate::cache::{AudioCache, CacheKey};
use crate::config::PiperConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::Result;

const FORMAT: &str = "wav";

pub struct PiperEngine {
    /// Resolved executable, `None` when piper is unusable
    binary: Option<PathBuf>,
    model: Option<PathBuf>,
    speaker: Option<u32>,
    timeout: Duration,
}

impl PiperEngine {
    pub fn new(config: &PiperConfig) -> Self {
        let binary = match which::which(&config.command) {
            Ok(path) => Some(path),
            Err(_) => {
                warn!(
                    "piper executable '{}' not found; speech will be text-timed only",
                    config.command
                );
                None
            }
        };

        if binary.is_some() && config.model.is_none() {
            warn!("piper has no voice model configured; synthesis will fail");
        }

        Self {
            binary,
            model: config.model.clone(),
            speaker: config.speaker,
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the per-run ceiling
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(
            self.name(),
            text,
            &[
                self.model
                    .as_ref()
                    .map(|m| m.display().to_string())
                    .unwrap_or_default(),
                self.speaker.map(|s| s.to_string()).unwrap_or_default(),
            ],
        )
    }

    async fn run(&self, binary: &Path, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let key = self.cache_key(text);
        let staged = cache.stage(FORMAT)?;

        let mut command = Command::new(binary);
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }
        if let Some(speaker) = self.speaker {
            command.arg("--speaker").arg(speaker.to_string());
        }
        command.arg("--output_file").arg(staged.path());

        process::run(command, Some(text.as_bytes()), self.timeout).await?;
        cache.commit(staged, &key, FORMAT).await
    }
}

#[async_trait]
impl TtsEngine for PiperEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        if let Some(hit) = cache.lookup(&self.cache_key(text), FORMAT).await {
            return Ok(hit);
        }

        let Some(binary) = &self.binary else {
            return Ok(SpeechResult::estimated(text));
        };

        match self.run(binary, text, cache).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("piper synthesis failed: {}", e);
                Ok(SpeechResult::estimated(text))
            }
        }
    }

    fn name(&self) -> &'static str {
        "piper"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable fake piper that records each invocation
    fn fake_piper(dir: &Path, body: &str) -> PathBuf {
        let script = dir.join("piper");
        let counter = dir.join("calls");
        let content = format!(
            "#!/bin/sh\necho run >> '{}'\nout=''\nwhile [ $# -gt 0 ]; do\n  case \"$1\" in\n    --output_file) out=\"$2\"; shift 2 ;;\n    *) shift ;;\n  esac\ndone\n{}\n",
            counter.display(),
            body
        );
        std::fs::write(&script, content).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn calls(dir: &Path) -> usize {
        std::fs::read_to_string(dir.join("calls"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn config(command: &Path) -> PiperConfig {
        PiperConfig {
            command: command.display().to_string(),
            model: Some(PathBuf::from("/models/en_US-lessac-medium.onnx")),
            speaker: None,
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_writes_stdin_text_to_output() {
        let bin = tempfile::tempdir().unwrap();
        let script = fake_piper(bin.path(), "cat > \"$out\"");
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();

        let engine = PiperEngine::new(&config(&script));
        assert!(engine.is_available());

        let first = engine.synthesize("Hello from piper", &cache).await.unwrap();
        let second = engine.synthesize("Hello from piper", &cache).await.unwrap();

        assert_eq!(calls(bin.path()), 1);
        assert_eq!(first, second);

        let key = engine.cache_key("Hello from piper");
        assert_eq!(first.audio_url, Some(cache.url_for(&key, "wav")));
        assert_eq!(
            std::fs::read_to_string(cache.path_for(&key, "wav")).unwrap(),
            "Hello from piper\n"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_run_degrades_and_leaves_nothing() {
        let bin = tempfile::tempdir().unwrap();
        let script = fake_piper(bin.path(), "printf partial > \"$out\"; exit 1");
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();

        let engine = PiperEngine::new(&config(&script));
        let result = engine.synthesize("Hello", &cache).await.unwrap();

        assert_eq!(result, SpeechResult::estimated("Hello"));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_timeout_degrades() {
        let bin = tempfile::tempdir().unwrap();
        let script = fake_piper(bin.path(), "sleep 5");
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();

        let engine =
            PiperEngine::new(&config(&script)).with_timeout(Duration::from_millis(200));
        let result = engine.synthesize("Hello", &cache).await.unwrap();
        assert_eq!(result.audio_url, None);
    }

    #[tokio::test]
    #[serial]
    async fn test_timeout_holds_for_unread_long_text() {
        let bin = tempfile::tempdir().unwrap();
        let script = fake_piper(bin.path(), "sleep 10");
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();

        let engine =
            PiperEngine::new(&config(&script)).with_timeout(Duration::from_millis(300));
        let text = "a".repeat(1_000_000);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            engine.synthesize(&text, &cache),
        )
        .await
        .expect("synthesis outlived its timeout")
        .unwrap();
        assert_eq!(result, SpeechResult::estimated(&text));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_executable_degrades() {
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();

        let engine = PiperEngine::new(&PiperConfig {
            command: "/nonexistent/bin/piper".to_string(),
            ..PiperConfig::default()
        });
        assert!(!engine.is_available());

        let text = "b".repeat(36);
        let result = engine.synthesize(&text, &cache).await.unwrap();
        assert_eq!(result.audio_url, None);
        assert_eq!(result.duration_ms, 3000);
    }

    #[tokio::test]
    async fn test_cached_audio_served_without_executable() {
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();

        let engine = PiperEngine::new(&PiperConfig {
            command: "/nonexistent/bin/piper".to_string(),
            model: Some(PathBuf::from("/models/en_US-lessac-medium.onnx")),
            speaker: None,
        });
        assert!(!engine.is_available());

        // Synthesized earlier, before piper went away
        let key = engine.cache_key("Welcome back");
        let stored = cache.store(&key, "wav", &[0u8; 16_000]).await.unwrap();

        let result = engine.synthesize("Welcome back", &cache).await.unwrap();
        assert_eq!(result, stored);
        assert_eq!(result.duration_ms, 1000);
    }
}
