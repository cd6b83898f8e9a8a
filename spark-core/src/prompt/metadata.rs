//! Canonical/legacy key resolution for element metadata.
//!
//! Older rows stored attachment locations under `public_url` and names under
//! `file_name`. The canonical key always wins when it holds a non-empty
//! string; the legacy key is only consulted when it does not. Values from
//! both keys are never combined.

use serde_json::{Map, Value};

/// Fallback label for attachments that never recorded a name.
pub const DEFAULT_FILENAME: &str = "File";

/// Non-empty string stored under `key`, trimmed.
pub fn string_field(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn canonical_or_legacy(metadata: &Map<String, Value>, canonical: &str, legacy: &str) -> Option<String> {
    string_field(metadata, canonical).or_else(|| string_field(metadata, legacy))
}

/// `url`, else `public_url`, else absent.
pub fn resolve_url(metadata: &Map<String, Value>) -> Option<String> {
    canonical_or_legacy(metadata, "url", "public_url")
}

/// `filename`, else `file_name`, else absent.
pub fn filename_field(metadata: &Map<String, Value>) -> Option<String> {
    canonical_or_legacy(metadata, "filename", "file_name")
}

/// `filename`, else `file_name`, else [`DEFAULT_FILENAME`].
pub fn resolve_filename(metadata: &Map<String, Value>) -> String {
    filename_field(metadata).unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
