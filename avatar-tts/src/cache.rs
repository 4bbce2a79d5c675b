//! Content-addressed audio store
//!
//! Every synthesized clip lives at `{dir}/{key}.{format}` and is served at
//! `{url_prefix}/{key}.{format}`. Keys are pure functions of the input, so a
//! present file is always a valid answer and nothing is ever evicted here.
//!
//! Two concurrent requests for the same uncached text both synthesize and
//! both rename into the same path. The bytes are the same, the last rename
//! wins, and neither caller can observe a partial file because writes always
//! go through a staged temporary file in the same directory.

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::duration;
use crate::engine::SpeechResult;
use crate::error::{Result, TtsError};

/// Length of the hex identifier used as the file stem.
pub const KEY_LEN: usize = 32;

/// Deterministic identifier of one synthesis input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash the engine name, the trimmed text and every setting that changes
    /// the produced audio.
    pub fn new(engine: &str, text: &str, fingerprint: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(engine.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.trim().as_bytes());
        for part in fingerprint {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }

        let hash = hasher.finalize();
        Self(format!("{:x}", hash)[..KEY_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared output directory for synthesized audio
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    url_prefix: String,
}

impl AudioCache {
    /// Describe a store without touching the filesystem
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Create the output directory if needed and return the store
    pub fn open(dir: impl Into<PathBuf>, url_prefix: &str) -> Result<Self> {
        let cache = Self::new(dir, url_prefix);
        std::fs::create_dir_all(&cache.dir)?;
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey, format: &str) -> PathBuf {
        self.dir.join(file_name(key, format))
    }

    pub fn url_for(&self, key: &CacheKey, format: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name(key, format))
    }

    /// Check whether a populated entry exists
    pub async fn has(&self, key: &CacheKey, format: &str) -> bool {
        self.lookup(key, format).await.is_some()
    }

    /// Return the stored entry as a result, timed from its file size
    pub async fn lookup(&self, key: &CacheKey, format: &str) -> Option<SpeechResult> {
        let path = self.path_for(key, format);
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() || meta.len() == 0 {
            return None;
        }

        debug!("Cache hit: {}", path.display());
        Some(SpeechResult::with_audio(
            self.url_for(key, format),
            duration::from_audio_size(meta.len()),
        ))
    }

    /// Persist `bytes` as the entry for `key`
    pub async fn store(&self, key: &CacheKey, format: &str, bytes: &[u8]) -> Result<SpeechResult> {
        let staged = self.stage(format)?;
        tokio::fs::write(staged.path(), bytes).await?;
        self.commit(staged, key, format).await
    }

    /// Reserve a temporary file next to the canonical entries.
    ///
    /// The file is removed if the returned handle is dropped without commit.
    pub fn stage(&self, format: &str) -> Result<StagedFile> {
        let file = tempfile::Builder::new()
            .prefix(".staging-")
            .suffix(&format!(".{}", extension(format)))
            .tempfile_in(&self.dir)?;
        Ok(StagedFile { file })
    }

    /// Move a fully written staged file to the canonical path for `key`
    pub async fn commit(
        &self,
        staged: StagedFile,
        key: &CacheKey,
        format: &str,
    ) -> Result<SpeechResult> {
        let len = tokio::fs::metadata(staged.path())
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if len == 0 {
            return Err(TtsError::InvalidResponse(
                "engine produced no audio".to_string(),
            ));
        }

        let target = self.path_for(key, format);
        staged.file.persist(&target).map_err(|e| TtsError::Io(e.error))?;
        debug!("Cached {} bytes at {}", len, target.display());

        Ok(SpeechResult::with_audio(
            self.url_for(key, format),
            duration::from_audio_size(len),
        ))
    }
}

/// Temporary output location handed to an engine before commit
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

fn extension(format: &str) -> &str {
    format.trim().trim_start_matches('.')
}

fn file_name(key: &CacheKey, format: &str) -> String {
    format!("{}.{}", key, extension(format))
}
