use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error(
        "API key not found for {engine}. Set {env_var} environment variable or add to config."
    )]
    MissingApiKey { engine: String, env_var: String },

    #[error("Engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("API error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Synthesis timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Text must not be empty")]
    EmptyText,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl TtsError {
    /// Build an `ApiError` for a transport failure that never produced a status.
    pub(crate) fn request_failed(err: reqwest::Error) -> Self {
        TtsError::ApiError {
            message: format!("Request failed: {}", err),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
