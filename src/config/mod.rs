//! Application configuration.
//!
//! Configuration is environment-driven (see SPEC_FULL.md §6.5), layered
//! with [`figment`] over a set of built-in defaults the same way the
//! teacher crate layers `figment::providers::{Env, Toml}` over
//! `config/defaults.rs` constants — except this service has no config
//! file, only environment variables, so only the `Env` provider is used.

pub mod defaults;

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Extractor invocation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YtdlpMode {
    Local,
    Remote,
}

/// Network family the extractor should prefer, and whether it may retry
/// with the opposite family after a network-shaped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetMode {
    Ipv4,
    Ipv6,
    Auto,
}

/// Whether `/play` and `/hls` answer with a redirect or proxy the bytes,
/// absent a per-request `force_redirect` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    Proxy,
    Redirect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    #[serde(default = "defaults::default_host")]
    pub host: String,
    #[serde(default = "defaults::default_port")]
    pub port: u16,

    /// Upstream metadata provider used by the (non-core) search/channel
    /// endpoints. Parsed here so a future adapter can read it, but no
    /// route in this crate consumes it; see SPEC_FULL.md §1.
    #[serde(default = "defaults::default_backend_provider")]
    pub backend_provider: String,
    #[serde(default = "defaults::default_backend_base")]
    pub backend_base: String,

    #[serde(default = "defaults::default_sponsorblock")]
    pub sponsorblock: bool,

    #[serde(default)]
    pub ytdlp_mode: YtdlpModeEnv,
    #[serde(default = "defaults::default_ytdlp_cmd")]
    pub ytdlp_cmd: String,
    #[serde(default)]
    pub ytdlp_remote_url: String,
    #[serde(default)]
    pub ytdlp_cookies: String,
    #[serde(default)]
    pub ytdlp_args: String,
    #[serde(default)]
    pub ytdlp_net: NetModeEnv,

    #[serde(default = "defaults::default_ffmpeg_cmd")]
    pub ffmpeg_cmd: String,

    #[serde(default)]
    pub stream_mode: StreamModeEnv,

    #[serde(default)]
    pub redis_url: String,
    #[serde(default = "defaults::default_redis_ttl")]
    pub redis_ttl: u64,

    #[serde(rename = "RUST_LOG", default = "defaults::default_log_filter")]
    pub log_filter: String,
}

/// Thin newtype wrappers so the env values (arbitrary-case strings) parse
/// into the strict enums above while still giving `Config` a sane
/// `#[serde(default)]` (string "local"/"ipv4"/"proxy" rather than an enum
/// literal, matching how the original service read loosely-cased env
/// strings with `.strip().lower()`).
macro_rules! env_enum_wrapper {
    ($wrapper:ident, $inner:ty, $default:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $wrapper(pub $inner);

        impl Default for $wrapper {
            fn default() -> Self {
                $wrapper($default)
            }
        }

        impl std::ops::Deref for $wrapper {
            type Target = $inner;
            fn deref(&self) -> &$inner {
                &self.0
            }
        }

        impl Serialize for $wrapper {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Ok($wrapper(parse_loosely(&raw).unwrap_or($default)))
            }
        }
    };
}

env_enum_wrapper!(YtdlpModeEnv, YtdlpMode, YtdlpMode::Local);
env_enum_wrapper!(NetModeEnv, NetMode, NetMode::Ipv4);
env_enum_wrapper!(StreamModeEnv, StreamMode, StreamMode::Proxy);

trait LooseEnum: Sized {
    fn parse_loose(s: &str) -> Option<Self>;
}

impl LooseEnum for YtdlpMode {
    fn parse_loose(s: &str) -> Option<Self> {
        match s {
            "local" => Some(YtdlpMode::Local),
            "remote" => Some(YtdlpMode::Remote),
            _ => None,
        }
    }
}

impl LooseEnum for NetMode {
    fn parse_loose(s: &str) -> Option<Self> {
        match s {
            "ipv4" => Some(NetMode::Ipv4),
            "ipv6" => Some(NetMode::Ipv6),
            "auto" => Some(NetMode::Auto),
            _ => None,
        }
    }
}

impl LooseEnum for StreamMode {
    fn parse_loose(s: &str) -> Option<Self> {
        match s {
            "proxy" => Some(StreamMode::Proxy),
            "redirect" => Some(StreamMode::Redirect),
            _ => None,
        }
    }
}

fn parse_loosely<T: LooseEnum>(raw: &str) -> Option<T> {
    T::parse_loose(raw.trim().to_ascii_lowercase().as_str())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: defaults::default_host(),
            port: defaults::default_port(),
            backend_provider: defaults::default_backend_provider(),
            backend_base: defaults::default_backend_base(),
            sponsorblock: defaults::default_sponsorblock(),
            ytdlp_mode: YtdlpModeEnv::default(),
            ytdlp_cmd: defaults::default_ytdlp_cmd(),
            ytdlp_remote_url: String::new(),
            ytdlp_cookies: String::new(),
            ytdlp_args: String::new(),
            ytdlp_net: NetModeEnv::default(),
            ffmpeg_cmd: defaults::default_ffmpeg_cmd(),
            stream_mode: StreamModeEnv::default(),
            redis_url: String::new(),
            redis_ttl: defaults::default_redis_ttl(),
            log_filter: defaults::default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, layered over the
    /// defaults above. Never fails on missing variables; only a
    /// malformed `PORT`/`REDIS_TTL` integer would be rejected.
    pub fn load() -> AppResult<Self> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::raw())
            .extract()
            .map_err(|e| AppError::internal(format!("invalid configuration: {e}")))
    }

    pub fn redis_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.redis_ttl)
    }

    pub fn extra_ytdlp_args(&self) -> Vec<String> {
        self.ytdlp_args
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn has_force_family_flag(&self) -> bool {
        self.extra_ytdlp_args()
            .iter()
            .any(|a| a == "--force-ipv4" || a == "--force-ipv6")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_field_without_env() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(*cfg.ytdlp_mode, YtdlpMode::Local);
        assert_eq!(*cfg.ytdlp_net, NetMode::Ipv4);
        assert_eq!(*cfg.stream_mode, StreamMode::Proxy);
        assert_eq!(cfg.redis_ttl, 43_200);
    }

    #[test]
    fn extra_args_split_on_whitespace() {
        let mut cfg = Config::default();
        cfg.ytdlp_args = "--no-check-certificate  --force-ipv6".to_string();
        assert_eq!(
            cfg.extra_ytdlp_args(),
            vec!["--no-check-certificate", "--force-ipv6"]
        );
        assert!(cfg.has_force_family_flag());
    }
}
