//! Text-to-speech for the avatar control plane
//!
//! Provides one synthesis contract over several engines:
//! - Hosted APIs (OpenAI, Google, Azure, and a configurable generic one)
//! - Local engines (piper executable, VOICEVOX server)
//! - A user-defined shell command
//! - A disabled engine that only estimates speaking time
//!
//! Audio is cached by content hash under one output directory, and every
//! result carries a duration the browser uses for lip-sync.

pub mod cache;
pub mod config;
pub mod duration;
pub mod engine;
pub mod engines;
pub mod error;
pub mod handle;
pub mod speech;

pub use cache::{AudioCache, CacheKey};
pub use config::{AudioConfig, Config, TtsConfig};
pub use engine::{SpeechResult, TtsEngine};
pub use engines::{EngineKind, MockEngine, create_engine};
pub use error::{Result, TtsError};
pub use handle::EngineHandle;
pub use speech::{SpeechRequest, speak};
