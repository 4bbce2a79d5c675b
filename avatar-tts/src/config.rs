use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, TtsError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where synthesized audio is written and served from
    #[serde(default)]
    pub audio: AudioConfig,

    /// Engine selection and per-engine settings
    #[serde(default)]
    pub tts: TtsConfig,
}

/// Output directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Directory holding cached audio files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Public URL path the HTTP layer serves `output_dir` under
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/audio")
}

fn default_url_prefix() -> String {
    "/audio".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            url_prefix: default_url_prefix(),
        }
    }
}

/// Engine selection: `engine` names the active table, the rest are ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Engine identifier (openai, google, azure, api, piper, voicevox, custom, none)
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub azure: AzureConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub piper: PiperConfig,

    #[serde(default)]
    pub voicevox: VoicevoxConfig,

    #[serde(default)]
    pub custom: CustomConfig,
}

fn default_engine() -> String {
    "none".to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            openai: OpenAiConfig::default(),
            google: GoogleConfig::default(),
            azure: AzureConfig::default(),
            api: ApiConfig::default(),
            piper: PiperConfig::default(),
            voicevox: VoicevoxConfig::default(),
            custom: CustomConfig::default(),
        }
    }
}

impl TtsConfig {
    /// Same settings with a different active engine
    pub fn with_engine(mut self, engine: &str) -> Self {
        self.engine = engine.to_string();
        self
    }
}

/// OpenAI speech endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (optional, OPENAI_API_KEY is used otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    /// Response format, also the file extension
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            format: "mp3".to_string(),
            speed: None,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Google Cloud Text-to-Speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// API key (optional, GOOGLE_API_KEY is used otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub language_code: String,
    pub voice: String,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub endpoint: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language_code: "en-US".to_string(),
            voice: "en-US-Neural2-F".to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
            endpoint: "https://texttospeech.googleapis.com".to_string(),
        }
    }
}

/// Azure Speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// Subscription key (optional, AZURE_SPEECH_KEY is used otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Service region (optional, AZURE_SPEECH_REGION is used otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub language: String,
    pub voice: String,
    /// Value of the X-Microsoft-OutputFormat header
    pub output_format: String,
    /// Full synthesis URL, overrides the region-derived one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            region: None,
            language: "en-US".to_string(),
            voice: "en-US-JennyNeural".to_string(),
            output_format: "audio-16khz-128kbitrate-mono-mp3".to_string(),
            endpoint: None,
        }
    }
}

/// Fully configurable HTTP engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub method: String,
    /// Substituted for `{api_key}` in headers and body (TTS_API_KEY otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request body with a `{text}` placeholder
    pub body_template: String,
    /// Dotted path to base64 audio in a JSON response; raw bytes when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    pub format: String,
    pub headers: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            url: None,
            method: "POST".to_string(),
            api_key: None,
            body_template: r#"{"text": "{text}"}"#.to_string(),
            audio_path: None,
            format: "mp3".to_string(),
            headers,
        }
    }
}

/// Local piper executable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PiperConfig {
    /// Executable name or path
    pub command: String,
    /// Path to the .onnx voice model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    /// Speaker id for multi-speaker models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
}

impl Default for PiperConfig {
    fn default() -> Self {
        Self {
            command: "piper".to_string(),
            model: None,
            speaker: None,
        }
    }
}

/// Local VOICEVOX engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicevoxConfig {
    pub url: String,
    pub speaker: u32,
    /// speedScale
    pub speed: f32,
    /// pitchScale
    pub pitch: f32,
    /// intonationScale
    pub intonation: f32,
    /// volumeScale
    pub volume: f32,
}

impl Default for VoicevoxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:50021".to_string(),
            speaker: 1,
            speed: 1.0,
            pitch: 0.0,
            intonation: 1.0,
            volume: 1.0,
        }
    }
}

/// User-defined shell command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomConfig {
    /// Shell command with `{text}` and `{output}` placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub format: String,
}

impl Default for CustomConfig {
    fn default() -> Self {
        Self {
            command: None,
            format: "wav".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, returning defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home =
            std::env::var("HOME").map_err(|_| TtsError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/avatar-voice/config.toml"))
    }
}
