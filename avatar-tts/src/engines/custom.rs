//! User-defined command engine
//!
//! Runs a shell command template such as
//! `espeak-ng -w {output} {text}` through `sh -c`. `{text}` is substituted
//! as a single quoted shell word and `{output}` as the staged file path the
//! command must write. Unlike the other local engines, failures are returned
//! to the caller.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::process::{self, COMMAND_TIMEOUT};
use crate::cache::{AudioCache, CacheKey};
use crate::config::CustomConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::{Result, TtsError};

pub struct CustomCommandEngine {
    template: String,
    format: String,
    timeout: Duration,
}

impl CustomCommandEngine {
    pub fn new(config: &CustomConfig) -> Result<Self> {
        let template = config
            .command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| TtsError::ConfigError("custom engine needs a command".into()))?;

        if !template.contains("{output}") {
            return Err(TtsError::ConfigError(
                "custom command must contain an {output} placeholder".into(),
            ));
        }

        Ok(Self {
            template,
            format: config.format.clone(),
            timeout: COMMAND_TIMEOUT,
        })
    }

    /// Override the per-run ceiling
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(
            self.name(),
            text,
            &[self.template.clone(), self.format.clone()],
        )
    }

    fn render(&self, text: &str, output: &str) -> String {
        self.template
            .replace("{text}", &process::shell_quote(text))
            .replace("{output}", &process::shell_quote(output))
    }
}

#[async_trait]
impl TtsEngine for CustomCommandEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        let key = self.cache_key(text);
        if let Some(hit) = cache.lookup(&key, &self.format).await {
            return Ok(hit);
        }

        let staged = cache.stage(&self.format)?;
        let script = self.render(text, &staged.path().display().to_string());

        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        process::run(command, None, self.timeout).await?;

        cache.commit(staged, &key, &self.format).await
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;

    fn engine(command: &str) -> CustomCommandEngine {
        CustomCommandEngine::new(&CustomConfig {
            command: Some(command.to_string()),
            format: "txt".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_requires_command_with_output() {
        assert!(CustomCommandEngine::new(&CustomConfig::default()).is_err());
        assert!(
            CustomCommandEngine::new(&CustomConfig {
                command: Some("say {text}".to_string()),
                format: "wav".to_string(),
            })
            .is_err()
        );
    }

    #[test]
    fn test_render_quotes_placeholders() {
        let script = engine("tts --out {output} {text}").render("it's $HOME", "/tmp/a b.wav");
        assert_eq!(script, r"tts --out '/tmp/a b.wav' 'it'\''s $HOME'");
    }

    #[tokio::test]
    #[serial]
    async fn test_text_reaches_command_verbatim() {
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();
        let engine = engine("printf %s {text} > {output}");

        let text = "it's `whoami`; echo $PATH & done";
        let result = engine.synthesize(text, &cache).await.unwrap();

        let key = engine.cache_key(text);
        assert_eq!(result.audio_url, Some(cache.url_for(&key, "txt")));
        assert_eq!(
            std::fs::read_to_string(cache.path_for(&key, "txt")).unwrap(),
            text
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_cache_hit_skips_command() {
        let out = tempfile::tempdir().unwrap();
        let counter = out.path().join("calls");
        let cache = AudioCache::open(out.path().join("audio"), "/audio").unwrap();
        let engine = engine(&format!(
            "echo run >> '{}'; printf %s {{text}} > {{output}}",
            counter.display()
        ));

        let first = engine.synthesize("again", &cache).await.unwrap();
        let second = engine.synthesize("again", &cache).await.unwrap();

        assert_eq!(first, second);
        let calls = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(calls.lines().count(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_failure_is_propagated() {
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();
        let engine = engine("echo nope >&2; exit 2; true {output}");

        let err = engine.synthesize("hello", &cache).await.unwrap_err();
        assert!(matches!(err, TtsError::CommandFailed(_)));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_output_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();
        let engine = engine("true {output}");

        let err = engine.synthesize("hello", &cache).await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidResponse(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_timeout_is_propagated() {
        let out = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(out.path(), "/audio").unwrap();
        let engine = engine("sleep 5; true {output}").with_timeout(Duration::from_millis(200));

        let err = engine.synthesize("hello", &cache).await.unwrap_err();
        assert!(matches!(err, TtsError::Timeout { .. }));
    }
}
