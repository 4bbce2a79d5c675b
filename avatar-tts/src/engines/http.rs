//! Shared request/response handling for HTTP engines

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use crate::error::{Result, TtsError};

/// Send a request and turn any non-2xx status into an `ApiError`
pub(crate) async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(TtsError::request_failed)?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(TtsError::ApiError {
            message: error_message(&error_text),
            status_code: Some(status.as_u16()),
        });
    }

    Ok(response)
}

/// Read the full body of a successful response as audio bytes
pub(crate) async fn read_bytes(response: Response) -> Result<Vec<u8>> {
    let bytes = response.bytes().await.map_err(TtsError::request_failed)?;
    Ok(bytes.to_vec())
}

/// Parse a successful response as JSON
pub(crate) async fn read_json(response: Response) -> Result<Value> {
    let text = response.text().await.map_err(TtsError::request_failed)?;
    serde_json::from_str(&text)
        .map_err(|e| TtsError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// Pull base64 audio out of `json` at a dotted `path`.
///
/// Numeric segments index into arrays, so `results.0.audio` works.
pub(crate) fn extract_audio(json: &Value, path: &str) -> Result<Vec<u8>> {
    let mut current = json;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => current.get(segment),
        };
        current = next.ok_or_else(|| {
            TtsError::InvalidResponse(format!("No field '{}' in response", path))
        })?;
    }

    let encoded = current.as_str().ok_or_else(|| {
        TtsError::InvalidResponse(format!("Field '{}' is not a string", path))
    })?;
    decode_base64(encoded)
}

pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    // Tolerate data URLs such as "data:audio/mp3;base64,...."
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| TtsError::InvalidResponse(format!("Invalid base64 audio: {}", e)))
}

/// Best-effort error message from a provider's error body
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    // {"error": {"message": ...}} (OpenAI, Google) or {"error": "..."} or {"message": ...}
    json.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .or_else(|| json.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
