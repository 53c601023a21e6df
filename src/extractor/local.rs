//! Local (subprocess) extractor invocation.
//!
//! Command safety flags are fixed by this adapter, not configurable,
//! mirroring the original service's `_build_local_cmd`: suppress
//! warnings/progress on stdout, request JSON output, and ignore ambient
//! user configuration so a developer's `~/.config/yt-dlp/config` can't
//! silently change behaviour in production.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

pub struct LocalRunOutput {
    pub stdout: String,
    pub stderr: String,
}

fn build_args(cfg: &Config, url: &str, force_family: Option<&str>) -> Vec<String> {
    let mut args = vec![
        url.to_string(),
        "--dump-json".to_string(),
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
        "--no-config".to_string(),
    ];

    args.extend(cfg.extra_ytdlp_args());

    if !cfg.ytdlp_cookies.trim().is_empty() {
        args.push("--cookies".to_string());
        args.push(cfg.ytdlp_cookies.clone());
    }
    if cfg.sponsorblock {
        args.push("--sponsorblock-mark".to_string());
        args.push("all".to_string());
    }
    if let Some(flag) = force_family {
        args.push(flag.to_string());
    }

    args
}

/// Spawn the configured extractor binary once and capture stdout/stderr
/// separately. The exit code is observed but never used to short-circuit
/// parsing: yt-dlp-like tools sometimes emit valid JSON alongside a
/// non-zero exit (e.g. a post-processing warning after a successful
/// dump).
pub async fn run_once(
    cfg: &Config,
    url: &str,
    force_family: Option<&str>,
) -> AppResult<LocalRunOutput> {
    let args = build_args(cfg, url, force_family);

    let output = Command::new(&cfg.ytdlp_cmd)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            AppError::internal(format!(
                "extractor binary '{}' not found or failed to spawn: {e}",
                cfg.ytdlp_cmd
            ))
        })?;

    Ok(LocalRunOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_flags_always_present() {
        let cfg = Config::default();
        let args = build_args(&cfg, "https://example.invalid", None);
        assert!(args.contains(&"--dump-json".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(args.contains(&"--no-config".to_string()));
        assert!(!args.iter().any(|a| a == "--cookies"));
    }

    #[test]
    fn cookies_and_sponsorblock_appended_when_configured() {
        let mut cfg = Config::default();
        cfg.ytdlp_cookies = "/priv/cookies.txt".to_string();
        cfg.sponsorblock = true;
        let args = build_args(&cfg, "u", None);
        assert!(args.windows(2).any(|w| w == ["--cookies", "/priv/cookies.txt"]));
        assert!(args.windows(2).any(|w| w == ["--sponsorblock-mark", "all"]));
    }

    #[test]
    fn force_family_flag_appended_last() {
        let cfg = Config::default();
        let args = build_args(&cfg, "u", Some("--force-ipv6"));
        assert_eq!(args.last().unwrap(), "--force-ipv6");
    }
}
