//! Extractor orchestration: cache lookup, local/remote invocation, and the
//! IPv4/IPv6/auto network-family fallback retry (SPEC_FULL.md §4.2).

pub mod json;
pub mod local;
pub mod remote;
pub mod types;

use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

pub use types::{Chapter, Format, Probe, SubtitleTrack, Thumbnail};

use crate::cache::{self, Cache};
use crate::config::{Config, NetMode, YtdlpMode};
use crate::errors::{AppError, AppResult};

fn cache_key(id: &str) -> String {
    format!("ytdlp:video:{id}")
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// The retry sequence for a given configured [`NetMode`], expressed as the
/// `--force-ipv4`/`--force-ipv6` flag to pass on each attempt (`None` means
/// "let the extractor pick"). `ipv4` never retries. `ipv6` and `auto` retry
/// exactly once, with the opposite family, after a network-shaped failure.
fn attempt_plan(mode: NetMode, already_forced: bool) -> Vec<Option<&'static str>> {
    if already_forced {
        // caller already pinned a family via YTDLP_ARGS; don't add a second.
        return vec![None];
    }
    match mode {
        NetMode::Ipv4 => vec![Some("--force-ipv4")],
        NetMode::Ipv6 => vec![Some("--force-ipv6"), Some("--force-ipv4")],
        NetMode::Auto => vec![None, Some("--force-ipv6")],
    }
}

/// Resolve a video id to its extractor metadata.
///
/// 1. A cached, non-empty [`Probe`] is returned as-is.
/// 2. Otherwise the configured extractor (local subprocess or remote HTTP)
///    is invoked, retrying under the configured network-family policy when
///    a failure looks network-shaped.
/// 3. A successful probe is cached before returning.
/// 4. A null/empty result always fails as [`AppError::BadGateway`], never
///    returned to the caller as an empty `Probe`.
pub async fn probe(cfg: &Config, client: &Client, cache: &dyn Cache, id: &str) -> AppResult<Probe> {
    let key = cache_key(id);

    if let Some(cached) = cache::get_json::<Probe>(cache, &key).await {
        if cached.is_non_empty() {
            return Ok(cached);
        }
    }

    let url = watch_url(id);
    let plan = attempt_plan(*cfg.ytdlp_net, cfg.has_force_family_flag());

    let mut last_err: Option<AppError> = None;
    for (idx, force_family) in plan.iter().enumerate() {
        let outcome = match *cfg.ytdlp_mode {
            YtdlpMode::Local => run_local(cfg, &url, *force_family).await,
            YtdlpMode::Remote => run_remote(cfg, client, &url, *force_family).await,
        };

        match outcome {
            Ok(probe) => {
                cache::put_json(cache, &key, &probe, cfg.redis_ttl_duration()).await;
                return Ok(probe);
            }
            Err(err) => {
                let retryable = idx + 1 < plan.len() && json::looks_like_network_error(&err.to_string());
                if retryable {
                    warn!(attempt = idx, %id, "extractor network failure, retrying with next address family");
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::bad_gateway("extractor exhausted all retry attempts")))
}

async fn run_local(cfg: &Config, url: &str, force_family: Option<&str>) -> AppResult<Probe> {
    let output = local::run_once(cfg, url, force_family).await?;
    decode(&output.stdout, &output.stderr)
}

async fn run_remote(
    cfg: &Config,
    client: &Client,
    url: &str,
    force_family: Option<&str>,
) -> AppResult<Probe> {
    let output = remote::run_once(client, cfg, url, force_family).await?;
    decode(&output.body, "")
}

fn decode(stdout: &str, stderr: &str) -> AppResult<Probe> {
    let value = json::parse_stdout(stdout, stderr)?;
    let probe: Probe = serde_json::from_value(value)
        .map_err(|e| AppError::bad_gateway(format!("extractor output did not match expected shape: {e}")))?;

    if !probe.is_non_empty() {
        return Err(AppError::bad_gateway("extractor returned an empty result"));
    }

    info!(id = probe.id.as_deref().unwrap_or(""), formats = probe.formats.len(), "probe resolved");
    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_retries_once_with_opposite_family() {
        let plan = attempt_plan(NetMode::Auto, false);
        assert_eq!(plan, vec![None, Some("--force-ipv6")]);
    }

    #[test]
    fn ipv6_mode_retries_once_with_ipv4() {
        assert_eq!(
            attempt_plan(NetMode::Ipv6, false),
            vec![Some("--force-ipv6"), Some("--force-ipv4")]
        );
    }

    #[test]
    fn ipv4_default_mode_has_no_retry() {
        assert_eq!(attempt_plan(NetMode::Ipv4, false), vec![Some("--force-ipv4")]);
    }

    #[test]
    fn already_forced_via_extra_args_skips_auto_plan() {
        assert_eq!(attempt_plan(NetMode::Auto, true), vec![None]);
    }

    #[test]
    fn decode_rejects_empty_probe() {
        let err = decode("{}", "").unwrap_err();
        assert!(matches!(err, AppError::BadGateway { .. }));
    }

    #[test]
    fn decode_accepts_minimal_probe() {
        let probe = decode(r#"{"id":"abc123","formats":[]}"#, "").unwrap();
        assert_eq!(probe.id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn cached_non_empty_probe_short_circuits_extractor() {
        let cfg = Config::default();
        let client = Client::new();
        let cache = crate::cache::MemoryCache::new();
        let key = cache_key("abc123");
        cache::put_json(
            &cache,
            &key,
            &Probe {
                id: Some("abc123".to_string()),
                ..Default::default()
            },
            Duration::from_secs(60),
        )
        .await;

        let probe = probe(&cfg, &client, &cache, "abc123").await.unwrap();
        assert_eq!(probe.id.as_deref(), Some("abc123"));
    }
}
