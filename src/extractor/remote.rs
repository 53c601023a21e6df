//! Remote (HTTP) extractor invocation, used when `YTDLP_MODE=remote`.
//!
//! Delegates the actual extraction to a sidecar reachable over HTTP
//! (`YTDLP_REMOTE_URL`) instead of spawning a local binary — useful when
//! the extractor runs in its own sandboxed container. The sidecar is
//! expected to answer with the same JSON shape yt-dlp's `--dump-json`
//! produces.

use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

const REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RemoteRunOutput {
    pub body: String,
}

pub async fn run_once(
    client: &Client,
    cfg: &Config,
    url: &str,
    force_family: Option<&str>,
) -> AppResult<RemoteRunOutput> {
    let endpoint = cfg.ytdlp_remote_url.trim();
    if endpoint.is_empty() {
        return Err(AppError::internal(
            "YTDLP_MODE=remote requires YTDLP_REMOTE_URL to be set",
        ));
    }

    let mut query = vec![("url", url.to_string())];
    if !cfg.ytdlp_cookies.trim().is_empty() {
        query.push(("cookies", cfg.ytdlp_cookies.clone()));
    }
    if cfg.sponsorblock {
        query.push(("sponsorblock", "all".to_string()));
    }
    if let Some(flag) = force_family {
        query.push(("force_family", flag.trim_start_matches("--force-").to_string()));
    }

    let response = client
        .get(endpoint)
        .query(&query)
        .timeout(REMOTE_TIMEOUT)
        .send()
        .await
        .map_err(|e| {
            let detail = e.to_string();
            AppError::bad_gateway(format!("remote extractor request failed: {detail}"))
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::bad_gateway(format!("remote extractor body read failed: {e}")))?;

    if !status.is_success() {
        return Err(AppError::bad_gateway(format!(
            "remote extractor returned {status}: {}",
            AppError::tail(&body, 220)
        )));
    }

    Ok(RemoteRunOutput { body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_remote_url_is_rejected_before_any_request() {
        let cfg = Config::default();
        let client = Client::new();
        let err = run_once(&client, &cfg, "https://example.invalid", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InternalError { .. }));
    }
}
