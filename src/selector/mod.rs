//! Format selector: a pure function from a [`Probe`] and a selection
//! request to a [`Selection`] (SPEC_FULL.md §4.3). No I/O, no caching —
//! every call starts from the formats already on hand.

use crate::extractor::{Format, Probe};

/// Preferred HLS itags, checked in order before falling back to a scan.
const HLS_ITAG_PREFERENCE: &[&str] = &["94", "95", "96"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Muxed {
        url: String,
        container: String,
        codecs: String,
        itag: Option<String>,
    },
    Split {
        video_url: String,
        audio_url: String,
        container: String,
    },
    Hls {
        url: String,
        itag: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    H264Mp4,
    Best,
}

/// What the caller asked for: an explicit itag takes precedence over a
/// policy, mirroring the query-parameter precedence in SPEC_FULL.md §4.5.
#[derive(Debug, Clone)]
pub enum SelectionRequest {
    Itag(String),
    Policy(Policy),
}

fn tbr_or_zero(f: &Format) -> f64 {
    f.tbr.unwrap_or(0.0)
}

fn container_of(f: &Format) -> String {
    f.container
        .clone()
        .or_else(|| f.ext.clone())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "mp4".to_string())
}

fn codecs_of(f: &Format) -> String {
    let v = f.vcodec.as_deref().unwrap_or("").trim();
    let a = f.acodec.as_deref().unwrap_or("").trim();
    match (v.is_empty(), a.is_empty()) {
        (true, true) => String::new(),
        (false, true) => v.to_string(),
        (true, false) => a.to_string(),
        (false, false) => format!("{v}+{a}"),
    }
}

fn is_mp4_family_audio(f: &Format) -> bool {
    f.is_mp4_audio()
}

/// Highest-`abr` MP4-family audio-only track, falling back to any
/// audio-only track, then to the best muxed track treated as an audio
/// source, per SPEC_FULL.md §4.3.
fn best_audio<'a>(probe: &'a Probe) -> Option<&'a Format> {
    let audio_only: Vec<&Format> = probe.playable_formats().filter(|f| f.is_audio_only()).collect();
    if !audio_only.is_empty() {
        return pick_best_audio_among(&audio_only);
    }
    let muxed: Vec<&Format> = probe.playable_formats().filter(|f| f.is_muxed()).collect();
    pick_best_audio_among(&muxed)
}

fn pick_best_audio_among<'a>(candidates: &[&'a Format]) -> Option<&'a Format> {
    candidates
        .iter()
        .copied()
        .max_by(|a, b| {
            let mp4_a = is_mp4_family_audio(a);
            let mp4_b = is_mp4_family_audio(b);
            mp4_a
                .cmp(&mp4_b)
                .then(
                    a.abr
                        .unwrap_or(0.0)
                        .partial_cmp(&b.abr.unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(
                    tbr_or_zero(a)
                        .partial_cmp(&tbr_or_zero(b))
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        })
}

/// Highest-`height` video-only track, tie-broken by `tbr`, then AVC/MP4
/// preference, per SPEC_FULL.md §4.3.
fn best_video<'a>(probe: &'a Probe) -> Option<&'a Format> {
    probe
        .playable_formats()
        .filter(|f| f.is_video_only())
        .max_by(|a, b| {
            a.height
                .unwrap_or(0)
                .cmp(&b.height.unwrap_or(0))
                .then(
                    tbr_or_zero(a)
                        .partial_cmp(&tbr_or_zero(b))
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.is_avc_video().cmp(&b.is_avc_video()))
                .then((container_of(a) == "mp4").cmp(&(container_of(b) == "mp4")))
        })
}

fn muxed_with_max_tbr<'a, I: Iterator<Item = &'a Format>>(iter: I) -> Option<&'a Format> {
    iter.max_by(|a, b| {
        tbr_or_zero(a)
            .partial_cmp(&tbr_or_zero(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn to_muxed_selection(f: &Format) -> Selection {
    Selection::Muxed {
        url: f.url_str().to_string(),
        container: container_of(f),
        codecs: codecs_of(f),
        itag: f.itag.clone(),
    }
}

fn split_video_then_audio(probe: &Probe) -> Option<Selection> {
    let video = best_video(probe)?;
    let audio = best_audio(probe)?;
    Some(Selection::Split {
        video_url: video.url_str().to_string(),
        audio_url: audio.url_str().to_string(),
        container: "mp4".to_string(),
    })
}

/// HLS discovery: preferred itags first, then a scan for any HLS-shaped
/// URL among the remaining playable formats (SPEC_FULL.md §4.3.1).
pub fn discover_hls(probe: &Probe) -> Option<Selection> {
    for itag in HLS_ITAG_PREFERENCE {
        if let Some(f) = probe.playable_formats().find(|f| f.itag_str() == *itag && f.is_hls()) {
            return Some(Selection::Hls {
                url: f.url_str().to_string(),
                itag: f.itag.clone(),
            });
        }
    }
    probe.playable_formats().find(|f| f.is_hls()).map(|f| Selection::Hls {
        url: f.url_str().to_string(),
        itag: f.itag.clone(),
    })
}

fn pick_by_itag(probe: &Probe, itag: &str) -> Option<Selection> {
    let format = probe.playable_formats().find(|f| f.itag_str() == itag)?;

    if format.is_muxed() {
        return Some(to_muxed_selection(format));
    }
    if format.is_video_only() {
        let audio = best_audio(probe)?;
        return Some(Selection::Split {
            video_url: format.url_str().to_string(),
            audio_url: audio.url_str().to_string(),
            container: "mp4".to_string(),
        });
    }
    if format.is_audio_only() {
        let video = best_video(probe)?;
        return Some(Selection::Split {
            video_url: video.url_str().to_string(),
            audio_url: format.url_str().to_string(),
            container: "mp4".to_string(),
        });
    }
    None
}

fn pick_by_policy(probe: &Probe, policy: &Policy) -> Option<Selection> {
    if *policy == Policy::H264Mp4 {
        let mp4_muxed = muxed_with_max_tbr(
            probe
                .playable_formats()
                .filter(|f| f.is_muxed() && container_of(f) == "mp4"),
        );
        if let Some(f) = mp4_muxed {
            return Some(to_muxed_selection(f));
        }
    }

    if let Some(f) = muxed_with_max_tbr(probe.playable_formats().filter(|f| f.is_muxed())) {
        return Some(to_muxed_selection(f));
    }

    if let Some(sel) = split_video_then_audio(probe) {
        return Some(sel);
    }

    discover_hls(probe)
}

/// Entry point combining itag and policy resolution, per SPEC_FULL.md
/// §4.3: an explicit itag is tried first; a policy request falls
/// through the muxed/split/HLS chain.
pub fn pick(probe: &Probe, request: &SelectionRequest) -> Option<Selection> {
    match request {
        SelectionRequest::Itag(itag) => pick_by_itag(probe, itag),
        SelectionRequest::Policy(policy) => pick_by_policy(probe, policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(itag: &str, vcodec: Option<&str>, acodec: Option<&str>, url: &str) -> Format {
        Format {
            itag: Some(itag.to_string()),
            vcodec: vcodec.map(str::to_string),
            acodec: acodec.map(str::to_string),
            url: Some(url.to_string()),
            container: Some("mp4".to_string()),
            ..Default::default()
        }
    }

    fn probe_with(formats: Vec<Format>) -> Probe {
        Probe {
            id: Some("x".to_string()),
            formats,
            ..Default::default()
        }
    }

    #[test]
    fn picks_muxed_by_itag() {
        let probe = probe_with(vec![fmt("18", Some("avc1"), Some("mp4a"), "https://u/18")]);
        let sel = pick(&probe, &SelectionRequest::Itag("18".to_string())).unwrap();
        assert!(matches!(sel, Selection::Muxed { .. }));
    }

    #[test]
    fn splits_video_only_itag_with_best_audio() {
        let probe = probe_with(vec![
            fmt("137", Some("avc1"), None, "https://u/137"),
            fmt("140", None, Some("mp4a"), "https://u/140"),
        ]);
        let sel = pick(&probe, &SelectionRequest::Itag("137".to_string())).unwrap();
        match sel {
            Selection::Split { video_url, audio_url, container } => {
                assert_eq!(video_url, "https://u/137");
                assert_eq!(audio_url, "https://u/140");
                assert_eq!(container, "mp4");
            }
            _ => panic!("expected split"),
        }
    }

    #[test]
    fn unknown_itag_returns_none() {
        let probe = probe_with(vec![fmt("18", Some("avc1"), Some("mp4a"), "https://u/18")]);
        assert!(pick(&probe, &SelectionRequest::Itag("999".to_string())).is_none());
    }

    #[test]
    fn policy_prefers_mp4_muxed_by_tbr() {
        let mut low = fmt("18", Some("avc1"), Some("mp4a"), "https://u/18");
        low.tbr = Some(500.0);
        let mut high = fmt("22", Some("avc1"), Some("mp4a"), "https://u/22");
        high.tbr = Some(1500.0);
        let probe = probe_with(vec![low, high]);
        let sel = pick(&probe, &SelectionRequest::Policy(Policy::H264Mp4)).unwrap();
        match sel {
            Selection::Muxed { url, .. } => assert_eq!(url, "https://u/22"),
            _ => panic!("expected muxed"),
        }
    }

    #[test]
    fn policy_falls_back_to_split_when_no_muxed() {
        let probe = probe_with(vec![
            fmt("137", Some("avc1"), None, "https://u/137"),
            fmt("140", None, Some("mp4a"), "https://u/140"),
        ]);
        let sel = pick(&probe, &SelectionRequest::Policy(Policy::Best)).unwrap();
        assert!(matches!(sel, Selection::Split { .. }));
    }

    #[test]
    fn policy_falls_back_to_hls_when_nothing_progressive() {
        let mut hls = fmt("96", None, None, "https://u/manifest.m3u8");
        hls.protocol = Some("m3u8".to_string());
        let probe = probe_with(vec![hls]);
        let sel = pick(&probe, &SelectionRequest::Policy(Policy::Best)).unwrap();
        assert!(matches!(sel, Selection::Hls { .. }));
    }

    #[test]
    fn hls_discovery_prefers_itag_94_over_scan_order() {
        let first = fmt("18", None, None, "https://u/a.m3u8");
        let mut ninety_four = fmt("94", None, None, "https://u/94.m3u8");
        ninety_four.container = None;
        let probe = probe_with(vec![first, ninety_four]);
        let sel = discover_hls(&probe).unwrap();
        match sel {
            Selection::Hls { itag, .. } => assert_eq!(itag.as_deref(), Some("94")),
            _ => panic!("expected hls"),
        }
    }

    #[test]
    fn storyboards_excluded_from_selection() {
        let sb = fmt("sb0", None, None, "https://u/sb.mhtml");
        let probe = probe_with(vec![sb]);
        assert!(pick(&probe, &SelectionRequest::Policy(Policy::Best)).is_none());
    }
}
