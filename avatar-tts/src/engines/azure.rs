//! Azure Speech engine
//!
//! Posts SSML to the regional `cognitiveservices/v1` endpoint and receives
//! raw audio in the format named by `X-Microsoft-OutputFormat`.

use async_trait::async_trait;
use reqwest::Client;

use super::http;
use crate::cache::{AudioCache, CacheKey};
use crate::config::AzureConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::{Result, TtsError};

pub struct AzureEngine {
    url: String,
    region: String,
    language: String,
    voice: String,
    output_format: String,
    format: &'static str,
    api_key: String,
    client: Client,
}

impl AzureEngine {
    /// Create a new Azure engine.
    ///
    /// Needs either a region or an explicit endpoint.
    pub fn new(config: &AzureConfig, api_key: String, region: Option<String>) -> Result<Self> {
        let region = region.filter(|r| !r.trim().is_empty());
        let url = match (&config.endpoint, &region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                region
            ),
            (None, None) => {
                return Err(TtsError::ConfigError(
                    "Azure region not set. Set AZURE_SPEECH_REGION or add region to config."
                        .into(),
                ));
            }
        };

        Ok(Self {
            url,
            region: region.unwrap_or_default(),
            language: config.language.clone(),
            voice: config.voice.clone(),
            output_format: config.output_format.clone(),
            format: file_format(&config.output_format),
            api_key,
            client: Client::new(),
        })
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(
            self.name(),
            text,
            &[
                self.region.clone(),
                self.language.clone(),
                self.voice.clone(),
                self.output_format.clone(),
            ],
        )
    }

    fn ssml(&self, text: &str) -> String {
        format!(
            "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{text}</voice></speak>",
            lang = escape_xml(&self.language),
            voice = escape_xml(&self.voice),
            text = escape_xml(text),
        )
    }
}

#[async_trait]
impl TtsEngine for AzureEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        let key = self.cache_key(text);
        if let Some(hit) = cache.lookup(&key, self.format).await {
            return Ok(hit);
        }

        let response = http::send(
            self.client
                .post(&self.url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .header("Content-Type", "application/ssml+xml")
                .header("X-Microsoft-OutputFormat", &self.output_format)
                .header("User-Agent", "avatar-voice")
                .body(self.ssml(text)),
        )
        .await?;
        let audio = http::read_bytes(response).await?;

        cache.store(&key, self.format, &audio).await
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}

/// File extension for an Azure output format name
fn file_format(output_format: &str) -> &'static str {
    let lower = output_format.to_lowercase();
    if lower.ends_with("mp3") {
        "mp3"
    } else if lower.contains("opus") {
        "ogg"
    } else if lower.starts_with("riff") {
        "wav"
    } else if lower.starts_with("webm") {
        "webm"
    } else {
        "raw"
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
