//! `Probe` and `Format`: the structured record the extractor adapter
//! produces, and the predicates the format selector reasons about.
//!
//! These are intentionally loosely typed (most fields `Option`) because
//! the upstream extractor's JSON shape varies by video and by extractor
//! version; missing/null is "absent", never silently defaulted, except
//! for the boolean presence predicates below (SPEC_FULL.md §9).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn is_present(codec: &Option<String>) -> bool {
    match codec.as_deref() {
        None => false,
        Some(c) => {
            let c = c.trim();
            !c.is_empty() && !c.eq_ignore_ascii_case("none")
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_time: f64,
    #[serde(default)]
    pub end_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub url: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One candidate delivery of a probe's media (SPEC_FULL.md §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Format {
    /// `format_id` in upstream JSON; always normalized into `itag`.
    #[serde(default, alias = "format_id")]
    pub itag: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub asr: Option<f64>,
    #[serde(default)]
    pub audio_channels: Option<u32>,
    #[serde(default)]
    pub quality_label: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Format {
    pub fn itag_str(&self) -> &str {
        self.itag.as_deref().unwrap_or("")
    }

    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    pub fn has_url(&self) -> bool {
        !self.url_str().trim().is_empty()
    }

    fn vcodec_lower(&self) -> Option<String> {
        self.vcodec.as_deref().map(|s| s.to_ascii_lowercase())
    }

    fn acodec_lower(&self) -> Option<String> {
        self.acodec.as_deref().map(|s| s.to_ascii_lowercase())
    }

    fn ext_lower(&self) -> String {
        self.container
            .as_deref()
            .or(self.ext.as_deref())
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    /// vcodec present and not "none", else inferred from height/fps.
    pub fn has_video(&self) -> bool {
        if is_present(&self.vcodec_lower()) {
            return true;
        }
        if self.vcodec.is_some() {
            // vcodec was explicitly present but empty/"none" — no video.
            return false;
        }
        self.height.is_some() || self.fps.is_some()
    }

    /// acodec present and not "none", else inferred from abr/audio ext.
    pub fn has_audio(&self) -> bool {
        if is_present(&self.acodec_lower()) {
            return true;
        }
        if self.acodec.is_some() {
            return false;
        }
        let audio_ext = matches!(self.ext_lower().as_str(), "m4a" | "webm" | "mp3" | "opus");
        self.abr.is_some() || self.asr.is_some() || self.audio_channels.is_some() || audio_ext
    }

    pub fn is_muxed(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    pub fn is_hls(&self) -> bool {
        let url = self.url_str().to_ascii_lowercase();
        url.ends_with(".m3u8") || url.contains("manifest/hls_playlist")
    }

    pub fn is_storyboard(&self) -> bool {
        let itag = self.itag_str();
        if itag.starts_with("sb") {
            return true;
        }
        let protocol = self.protocol.as_deref().unwrap_or("").to_ascii_lowercase();
        let ext = self.ext_lower();
        if protocol == "mhtml" || ext == "mhtml" {
            return true;
        }
        let note = self.format_note.as_deref().unwrap_or("").to_ascii_lowercase();
        note.contains("storyboard") || note.contains("preview")
    }

    pub fn is_mp4_audio(&self) -> bool {
        let a = self.acodec.as_deref().unwrap_or("").to_ascii_lowercase();
        a.contains("mp4a") || a.contains("aac") || self.ext_lower() == "m4a"
    }

    pub fn is_avc_video(&self) -> bool {
        self.vcodec.as_deref().unwrap_or("").to_ascii_lowercase().contains("avc")
    }
}

/// Structured metadata returned by the extractor for one video
/// (SPEC_FULL.md §3). Immutable once produced; cached by `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Probe {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "duration")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub subtitles: HashMap<String, Vec<SubtitleTrack>>,
    #[serde(default)]
    pub formats: Vec<Format>,
    #[serde(default, alias = "http_headers")]
    pub suggested_headers: HashMap<String, String>,
    #[serde(default, alias = "extractor")]
    pub extractor_name: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl Probe {
    /// Non-null-object check used by the extractor's cache-hit path and
    /// by the JSON parsing policy's `Reject null` rule.
    pub fn is_non_empty(&self) -> bool {
        self.id.is_some() || !self.formats.is_empty() || self.title.is_some()
    }

    /// Formats with storyboards excluded, per SPEC_FULL.md §3.
    pub fn playable_formats(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter().filter(|f| !f.is_storyboard() && f.has_url())
    }
}
