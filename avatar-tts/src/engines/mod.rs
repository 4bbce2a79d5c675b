//! TTS engine implementations

mod api;
mod azure;
mod custom;
mod disabled;
mod google;
mod http;
pub mod mock;
mod openai;
mod piper;
mod process;
mod voicevox;

pub use api::ApiEngine;
pub use azure::AzureEngine;
pub use custom::CustomCommandEngine;
pub use disabled::DisabledEngine;
pub use google::GoogleEngine;
pub use mock::MockEngine;
pub use openai::OpenAiEngine;
pub use piper::PiperEngine;
pub use voicevox::VoicevoxEngine;

use std::sync::Arc;

use log::{info, warn};

use crate::config::TtsConfig;
use crate::engine::TtsEngine;
use crate::error::{Result, TtsError};

/// Supported engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    OpenAi,
    Google,
    Azure,
    Api,
    Piper,
    Voicevox,
    Custom,
    None,
}

impl EngineKind {
    /// Every engine, in the order they are listed to users
    pub const ALL: [EngineKind; 8] = [
        Self::OpenAi,
        Self::Google,
        Self::Azure,
        Self::Api,
        Self::Piper,
        Self::Voicevox,
        Self::Custom,
        Self::None,
    ];

    /// Parse engine kind from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "google" => Ok(Self::Google),
            "azure" => Ok(Self::Azure),
            "api" | "generic" => Ok(Self::Api),
            "piper" => Ok(Self::Piper),
            "voicevox" => Ok(Self::Voicevox),
            "custom" | "command" => Ok(Self::Custom),
            "none" | "disabled" => Ok(Self::None),
            _ => Err(TtsError::ConfigError(format!("Unknown TTS engine: {}", s))),
        }
    }

    /// Configuration tag of this engine
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::Azure => "azure",
            Self::Api => "api",
            Self::Piper => "piper",
            Self::Voicevox => "voicevox",
            Self::Custom => "custom",
            Self::None => "none",
        }
    }

    /// Get the environment variable name for this engine's API key
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Google => Some("GOOGLE_API_KEY"),
            Self::Azure => Some("AZURE_SPEECH_KEY"),
            Self::Api => Some("TTS_API_KEY"),
            Self::Piper | Self::Voicevox | Self::Custom | Self::None => None,
        }
    }
}

/// Create the engine selected by `config`.
///
/// Never fails: an unknown tag or an engine missing its prerequisites is
/// logged and replaced by [`DisabledEngine`].
pub fn create_engine(config: &TtsConfig) -> Arc<dyn TtsEngine> {
    if config.engine.trim().is_empty() {
        warn!("No TTS engine configured; speech is disabled");
        return Arc::new(DisabledEngine::new());
    }

    let kind = match EngineKind::from_str(&config.engine) {
        Ok(kind) => kind,
        Err(e) => {
            warn!("{}; speech is disabled", e);
            return Arc::new(DisabledEngine::new());
        }
    };

    match build(kind, config) {
        Ok(engine) => {
            info!("TTS engine: {}", engine.name());
            engine
        }
        Err(e) => {
            warn!(
                "TTS engine '{}' unavailable ({}); speech is disabled",
                kind.as_str(),
                e
            );
            Arc::new(DisabledEngine::new())
        }
    }
}

fn build(kind: EngineKind, config: &TtsConfig) -> Result<Arc<dyn TtsEngine>> {
    let engine: Arc<dyn TtsEngine> = match kind {
        EngineKind::OpenAi => {
            let api_key = get_api_key(config.openai.api_key.as_deref(), kind)?;
            Arc::new(OpenAiEngine::new(&config.openai, api_key)?)
        }
        EngineKind::Google => {
            let api_key = get_api_key(config.google.api_key.as_deref(), kind)?;
            Arc::new(GoogleEngine::new(&config.google, api_key)?)
        }
        EngineKind::Azure => {
            let api_key = get_api_key(config.azure.api_key.as_deref(), kind)?;
            let region = config
                .azure
                .region
                .clone()
                .or_else(|| std::env::var("AZURE_SPEECH_REGION").ok());
            Arc::new(AzureEngine::new(&config.azure, api_key, region)?)
        }
        EngineKind::Api => {
            // The key is optional here: only templates mentioning {api_key} need it
            let api_key = get_api_key(config.api.api_key.as_deref(), kind).ok();
            Arc::new(ApiEngine::new(&config.api, api_key)?)
        }
        EngineKind::Piper => Arc::new(PiperEngine::new(&config.piper)),
        EngineKind::Voicevox => Arc::new(VoicevoxEngine::new(&config.voicevox)?),
        EngineKind::Custom => Arc::new(CustomCommandEngine::new(&config.custom)?),
        EngineKind::None => Arc::new(DisabledEngine::new()),
    };
    Ok(engine)
}

/// Get API key from config or environment variable
fn get_api_key(configured: Option<&str>, kind: EngineKind) -> Result<String> {
    // Check config first
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    let env_var = kind.env_var().unwrap_or_default();

    // Fall back to environment variable
    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| TtsError::MissingApiKey {
            engine: kind.as_str().to_string(),
            env_var: env_var.to_string(),
        })
}
