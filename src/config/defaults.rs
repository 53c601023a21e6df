//! Configuration default values.
//!
//! Centralizing these as functions (rather than inline `#[serde(default)]`
//! literals) keeps every default in one place, shared between
//! `#[serde(default = "...")]` attributes and `Config`'s manual
//! `Default` impl.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_BACKEND_PROVIDER: &str = "invidious";
pub const DEFAULT_BACKEND_BASE: &str = "https://yewtu.be";

pub const DEFAULT_SPONSORBLOCK: bool = true;

pub const DEFAULT_YTDLP_CMD: &str = "yt-dlp";
pub const DEFAULT_FFMPEG_CMD: &str = "ffmpeg";

pub const DEFAULT_REDIS_TTL_SECONDS: u64 = 43_200;

pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

pub fn default_port() -> u16 {
    DEFAULT_PORT
}

pub fn default_backend_provider() -> String {
    DEFAULT_BACKEND_PROVIDER.to_string()
}

pub fn default_backend_base() -> String {
    DEFAULT_BACKEND_BASE.to_string()
}

pub fn default_sponsorblock() -> bool {
    DEFAULT_SPONSORBLOCK
}

pub fn default_ytdlp_cmd() -> String {
    DEFAULT_YTDLP_CMD.to_string()
}

pub fn default_ffmpeg_cmd() -> String {
    DEFAULT_FFMPEG_CMD.to_string()
}

pub fn default_redis_ttl() -> u64 {
    DEFAULT_REDIS_TTL_SECONDS
}

pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
