//! Noise-tolerant JSON parsing for extractor stdout (SPEC_FULL.md §4.2).
//!
//! yt-dlp-like tools sometimes interleave warnings or progress noise
//! around the JSON record even when `--no-warnings`/`--quiet` is passed
//! (plugin output, deprecation notices on stderr bleeding into stdout
//! under some shells). This module implements the three-step fallback
//! the spec names: whole-stdout decode, then first-balanced-object
//! extraction, then failure.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::errors::AppError;

/// Fragments that mark a failure as network-shaped rather than a genuine
/// extractor/parse error. Deliberately not shrunk (SPEC_FULL.md §9).
pub const NETWORK_FAILURE_FRAGMENTS: &[&str] = &[
    "timed out",
    "temporarily unavailable",
    "temporary failure",
    "connection refused",
    "network is unreachable",
    "cannot assign requested address",
    "failed to resolve",
    "tlsv1 alert",
    "proxy error",
    "transporterror",
];

pub fn looks_like_network_error(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    NETWORK_FAILURE_FRAGMENTS.iter().any(|f| lower.contains(f))
}

fn balanced_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("valid regex"))
}

/// Parse yt-dlp-shaped stdout into a JSON value, tolerating surrounding
/// noise. Returns a `BadGateway` error (with a terse stderr tail) when no
/// JSON object/array can be recovered.
pub fn parse_stdout(stdout: &str, stderr: &str) -> Result<Value, AppError> {
    let trimmed = stdout.trim();

    if trimmed.is_empty() || trimmed == "null" {
        let detail = if looks_like_network_error(stderr) {
            "network error contacting extractor".to_string()
        } else {
            "extractor produced no output".to_string()
        };
        return Err(AppError::bad_gateway(format!(
            "{detail}: {}",
            AppError::tail(stderr, 220)
        )));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if !value.is_null() {
            return Ok(value);
        }
    }

    if let Some(m) = balanced_json_regex().find(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
            if !value.is_null() {
                return Ok(value);
            }
        }
    }

    Err(AppError::bad_gateway(format!(
        "failed to parse extractor output: {}",
        AppError::tail(stderr, 220)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_object() {
        let v = parse_stdout(r#"{"id":"abc"}"#, "").unwrap();
        assert_eq!(v["id"], "abc");
    }

    #[test]
    fn rejects_bare_null() {
        let err = parse_stdout("null", "some warning").unwrap_err();
        assert!(matches!(err, AppError::BadGateway { .. }));
    }

    #[test]
    fn rejects_empty_stdout() {
        let err = parse_stdout("", "").unwrap_err();
        assert!(matches!(err, AppError::BadGateway { .. }));
    }

    #[test]
    fn extracts_balanced_object_around_noise() {
        let stdout = "WARNING: deprecated flag\n{\"id\":\"xyz\",\"formats\":[]}\ndone.";
        let v = parse_stdout(stdout, "").unwrap();
        assert_eq!(v["id"], "xyz");
    }

    #[test]
    fn detects_network_failure_fragments() {
        assert!(looks_like_network_error("Connection refused by host"));
        assert!(looks_like_network_error("ERROR: [youtube] failed to resolve host"));
        assert!(!looks_like_network_error("ERROR: video unavailable"));
    }
}
