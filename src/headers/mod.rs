//! Header Builder: composes the header map the Proxy sends to the media
//! origin (SPEC_FULL.md §4.4). Pure function of a [`Probe`] and the
//! client's inbound request headers — no I/O.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, IF_RANGE, RANGE, USER_AGENT};

use crate::extractor::Probe;

const DESKTOP_CHROME_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Build the outgoing header map for a request to the media origin.
///
/// Order: suggested headers from the probe, then defaults for anything
/// still missing, then Range/If-Range passthrough from the client. If the
/// client sent no `Range`, one is forced (`bytes=0-`) so the origin
/// answers `206 Partial Content` and reports a usable `Content-Range`.
pub fn build(probe: &Probe, client_headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();

    for (key, value) in &probe.suggested_headers {
        if let (Ok(name), Ok(val)) = (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            out.insert(name, val);
        }
    }

    out.entry(USER_AGENT).or_insert_with(|| HeaderValue::from_static(DESKTOP_CHROME_UA));
    out.entry(ACCEPT).or_insert_with(|| HeaderValue::from_static("*/*"));
    out.entry(ACCEPT_LANGUAGE)
        .or_insert_with(|| HeaderValue::from_static("en-US,en;q=0.9"));
    out.entry(CONNECTION).or_insert_with(|| HeaderValue::from_static("keep-alive"));

    if let Some(range) = client_headers.get(RANGE) {
        out.insert(RANGE, range.clone());
    }
    if let Some(if_range) = client_headers.get(IF_RANGE) {
        out.insert(IF_RANGE, if_range.clone());
    }

    out
}

/// Force a `Range: bytes=0-` header toward the origin when the client
/// (or [`build`]) left it unset, so a proxied GET always receives a
/// `206`/`Content-Range` pair to report length from.
pub fn with_forced_range(mut headers: HeaderMap) -> HeaderMap {
    headers
        .entry(RANGE)
        .or_insert_with(|| HeaderValue::from_static("bytes=0-"));
    headers
}

/// Flatten a header map into the `-headers "k: v\r\n"` pairs the remux
/// tool expects, one pair of args per header.
pub fn headers_kv(headers: &HeaderMap) -> Vec<String> {
    let mut out = Vec::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        out.push("-headers".to_string());
        out.push(format!("{}: {value}\r\n", name.as_str()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_applied_when_probe_supplies_nothing() {
        let probe = Probe::default();
        let client = HeaderMap::new();
        let built = build(&probe, &client);
        assert_eq!(built.get(USER_AGENT).unwrap(), DESKTOP_CHROME_UA);
        assert_eq!(built.get(ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn suggested_headers_take_precedence_over_defaults() {
        let mut suggested = HashMap::new();
        suggested.insert("User-Agent".to_string(), "custom-ua".to_string());
        let probe = Probe {
            suggested_headers: suggested,
            ..Default::default()
        };
        let built = build(&probe, &HeaderMap::new());
        assert_eq!(built.get(USER_AGENT).unwrap(), "custom-ua");
    }

    #[test]
    fn client_range_is_passed_through() {
        let probe = Probe::default();
        let mut client = HeaderMap::new();
        client.insert(RANGE, HeaderValue::from_static("bytes=100-"));
        let built = build(&probe, &client);
        assert_eq!(built.get(RANGE).unwrap(), "bytes=100-");
    }

    #[test]
    fn missing_range_is_forced_to_zero_dash() {
        let built = with_forced_range(HeaderMap::new());
        assert_eq!(built.get(RANGE).unwrap(), "bytes=0-");
    }

    #[test]
    fn existing_range_is_not_overwritten_by_force() {
        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=500-"));
        let built = with_forced_range(headers);
        assert_eq!(built.get(RANGE).unwrap(), "bytes=500-");
    }

    #[test]
    fn headers_kv_flattens_to_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("ua-value"));
        let kv = headers_kv(&headers);
        assert_eq!(kv[0], "-headers");
        assert!(kv[1].starts_with("user-agent: ua-value"));
        assert!(kv[1].ends_with("\r\n"));
    }
}
