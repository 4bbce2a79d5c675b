//! Speech duration estimation
//!
//! Lip-sync on the client only needs a plausible speaking window, so neither
//! function decodes audio. Both share the same floor so a degraded result and
//! a real one are never shorter than the minimum mouth animation.

/// Shortest duration ever reported, in milliseconds.
pub const MIN_DURATION_MS: u64 = 500;

/// Assumed speaking rate in characters per second.
pub const CHARS_PER_SECOND: u64 = 12;

/// Assumed constant bitrate of produced audio files (~16 KB/s).
pub const BYTES_PER_SECOND: u64 = 16_000;

/// Estimate how long `text` takes to speak.
///
/// `max(500, round(1000 * chars / 12))`, counting Unicode scalar values.
pub fn estimate(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    rounded_ms(chars, CHARS_PER_SECOND)
}

/// Estimate the playback length of an audio file from its size in bytes.
pub fn from_audio_size(bytes: u64) -> u64 {
    rounded_ms(bytes, BYTES_PER_SECOND)
}

fn rounded_ms(units: u64, units_per_second: u64) -> u64 {
    // Integer round-half-up of units * 1000 / rate
    let ms = (units.saturating_mul(1000) + units_per_second / 2) / units_per_second;
    ms.max(MIN_DURATION_MS)
}
