//! Generic HTTP engine
//!
//! Everything about the request comes from configuration: method, headers,
//! a body template with `{text}` and `{api_key}` placeholders, and where to
//! find the audio in the response. Without `audio_path` the response body is
//! the audio itself; with it, the body is JSON and the path points at a
//! base64 string.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Method};

use super::http;
use crate::cache::{AudioCache, CacheKey};
use crate::config::ApiConfig;
use crate::engine::{SpeechResult, TtsEngine};
use crate::error::{Result, TtsError};

const TEXT_PLACEHOLDER: &str = "{text}";
const KEY_PLACEHOLDER: &str = "{api_key}";

pub struct ApiEngine {
    url: String,
    method: Method,
    headers: HashMap<String, String>,
    body_template: String,
    audio_path: Option<String>,
    format: String,
    /// Request settings hashed into the cache key, credentials excluded
    fingerprint: Vec<String>,
    client: Client,
}

impl ApiEngine {
    /// Create a new generic engine.
    ///
    /// `{api_key}` placeholders are resolved here, once.
    pub fn new(config: &ApiConfig, api_key: Option<String>) -> Result<Self> {
        let url = config
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| TtsError::ConfigError("api engine needs a url".into()))?;

        let method = Method::from_bytes(config.method.trim().to_uppercase().as_bytes())
            .map_err(|_| {
                TtsError::ConfigError(format!("Invalid HTTP method: {}", config.method))
            })?;

        let needs_key = config.body_template.contains(KEY_PLACEHOLDER)
            || config.headers.values().any(|v| v.contains(KEY_PLACEHOLDER));
        let api_key = match (needs_key, api_key) {
            (true, None) => {
                return Err(TtsError::MissingApiKey {
                    engine: "api".to_string(),
                    env_var: "TTS_API_KEY".to_string(),
                });
            }
            (_, key) => key.unwrap_or_default(),
        };

        let headers = config
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.replace(KEY_PLACEHOLDER, &api_key)))
            .collect();
        let body_template = config
            .body_template
            .replace(KEY_PLACEHOLDER, &json_escape(&api_key));
        let audio_path = config.audio_path.clone().filter(|p| !p.trim().is_empty());

        // Unresolved template and no headers: credentials stay out of the key
        let fingerprint = vec![
            url.clone(),
            method.to_string(),
            config.body_template.clone(),
            audio_path.clone().unwrap_or_default(),
            config.format.clone(),
        ];

        Ok(Self {
            url,
            method,
            headers,
            body_template,
            audio_path,
            format: config.format.clone(),
            fingerprint,
            client: Client::new(),
        })
    }

    /// Key on the text plus every request setting that changes the audio
    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(self.name(), text, &self.fingerprint)
    }

    fn render_body(&self, text: &str) -> String {
        self.body_template.replace(TEXT_PLACEHOLDER, &json_escape(text))
    }
}

#[async_trait]
impl TtsEngine for ApiEngine {
    async fn synthesize(&self, text: &str, cache: &AudioCache) -> Result<SpeechResult> {
        let text = text.trim();
        let key = self.cache_key(text);
        if let Some(hit) = cache.lookup(&key, &self.format).await {
            return Ok(hit);
        }

        let mut request = self.client.request(self.method.clone(), &self.url);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if self.method != Method::GET {
            request = request.body(self.render_body(text));
        }

        let response = http::send(request).await?;
        let audio = match &self.audio_path {
            Some(path) => {
                let json = http::read_json(response).await?;
                http::extract_audio(&json, path)?
            }
            None => http::read_bytes(response).await?,
        };

        cache.store(&key, &self.format, &audio).await
    }

    fn name(&self) -> &'static str {
        "api"
    }
}

/// Escape `value` for use inside a JSON string literal
fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
