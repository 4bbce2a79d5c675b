//! End-to-end behavior through the factory and the call site

use avatar_tts::{AudioCache, Config, EngineHandle, SpeechResult, TtsConfig, create_engine, speak};
use mockito::Matcher;
use serde_json::json;

fn open_cache() -> (tempfile::TempDir, AudioCache) {
    let tmp = tempfile::tempdir().unwrap();
    let cache = AudioCache::open(tmp.path().join("audio"), "/audio").unwrap();
    (tmp, cache)
}

#[tokio::test]
async fn disabled_engine_short_text() {
    let (_tmp, cache) = open_cache();
    let engine = create_engine(&TtsConfig::default());

    let result = speak(engine.as_ref(), "hello", &cache).await;
    assert_eq!(
        result,
        SpeechResult {
            audio_url: None,
            duration_ms: 500
        }
    );
}

#[tokio::test]
async fn disabled_engine_long_text() {
    let (_tmp, cache) = open_cache();
    let engine = create_engine(&TtsConfig::default().with_engine("none"));

    let text = "The quick brown fox jumps over the lazy dog. ".repeat(2);
    let text = format!("{}{}", text, "x".repeat(120 - text.chars().count()));
    assert_eq!(text.chars().count(), 120);

    let result = speak(engine.as_ref(), &text, &cache).await;
    assert_eq!(result.audio_url, None);
    assert_eq!(result.duration_ms, 10_000);
}

#[tokio::test]
async fn hosted_failure_degrades_at_call_site() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/audio/speech")
        .with_status(500)
        .with_body(r#"{"error": {"message": "internal error"}}"#)
        .expect(2)
        .create_async()
        .await;

    let (_tmp, cache) = open_cache();
    let mut config = TtsConfig::default().with_engine("openai");
    config.openai.api_key = Some("sk-test".to_string());
    config.openai.base_url = server.url();
    let engine = create_engine(&config);
    assert_eq!(engine.name(), "openai");

    // The adapter itself rejects
    assert!(engine.synthesize("Are you there?", &cache).await.is_err());

    // The call site never does
    let result = speak(engine.as_ref(), "Are you there?", &cache).await;
    assert_eq!(result, SpeechResult::estimated("Are you there?"));
    assert_eq!(result.duration_ms, 1167);

    mock.assert_async().await;
}

#[tokio::test]
async fn cache_survives_engine_reload() {
    let mut server = mockito::Server::new_async().await;
    let audio = vec![9u8; 32_000];
    let mock = server
        .mock("POST", "/synthesize")
        .match_body(Matcher::PartialJson(json!({"input": "Welcome back"})))
        .with_status(200)
        .with_body(&audio)
        .expect(1)
        .create_async()
        .await;

    let toml_str = format!(
        r#"
[tts]
engine = "api"

[tts.api]
url = "{}/synthesize"
body_template = '{{"input": "{{text}}"}}'
format = "ogg"
"#,
        server.url()
    );
    let config: Config = toml::from_str(&toml_str).unwrap();

    let (_tmp, cache) = open_cache();
    let handle = EngineHandle::new(&config.tts);
    assert_eq!(handle.engine_name(), "api");

    let first = handle.speak("Welcome back", &cache).await;

    // A fresh engine built from the same settings hits the same entry
    handle.reload(&config.tts);
    let second = handle.speak("Welcome back", &cache).await;

    mock.assert_async().await;
    assert_eq!(first, second);
    assert_eq!(first.duration_ms, 2000);
    assert!(first.audio_url.unwrap().ends_with(".ogg"));
}

#[tokio::test]
async fn switching_engines_changes_behavior() {
    let (_tmp, cache) = open_cache();
    let handle = EngineHandle::new(&TtsConfig::default().with_engine("custom"));
    // No command configured: disabled
    assert_eq!(handle.engine_name(), "none");

    let mut config = TtsConfig::default().with_engine("custom");
    config.custom.command = Some("printf %s {text} > {output}".to_string());
    config.custom.format = "txt".to_string();
    handle.reload(&config);
    assert_eq!(handle.engine_name(), "custom");

    let result = handle.speak("switch", &cache).await;
    if cfg!(unix) {
        assert!(result.audio_url.is_some());
    }
}
