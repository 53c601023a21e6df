//! Streaming Proxy: turns a [`Selection`] into the actual HTTP response —
//! a redirect, a byte stream from the media origin, an HLS manifest body,
//! or a remuxed stream from the [`remux`] pipeline (SPEC_FULL.md §4.5).

pub mod remux;

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, RANGE};
use tracing::warn;

use crate::cache::Cache;
use crate::config::{Config, StreamMode};
use crate::errors::{AppError, AppResult};
use crate::extractor::{self, Probe};
use crate::headers;
use crate::selector::{self, Selection, SelectionRequest};

const ORIGIN_HEAD_TIMEOUT: Duration = Duration::from_secs(30);
const ORIGIN_GET_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const HLS_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Response headers mirrored verbatim from the origin onto the consumer.
const MIRRORED_HEADERS: &[&str] = &[
    "content-type",
    "content-length",
    "accept-ranges",
    "content-range",
    "last-modified",
    "etag",
    "cache-control",
];

pub struct PlayRequest {
    pub id: String,
    pub policy: Option<String>,
    pub itag: Option<String>,
    pub force_redirect: Option<bool>,
    pub debug: bool,
    /// The consumer's own request headers, so `Range`/`If-Range` can be
    /// passed through to the media origin (SPEC_FULL.md §4.4 step 3).
    pub client_headers: HeaderMap,
}

pub struct HlsRequest {
    pub id: String,
    pub itag: Option<String>,
    pub force_redirect: Option<bool>,
    pub debug: bool,
}

fn effective_redirect(cfg: &Config, force_redirect: Option<bool>) -> bool {
    force_redirect.unwrap_or(*cfg.stream_mode == StreamMode::Redirect)
}

fn selection_request(req: &PlayRequest) -> SelectionRequest {
    match &req.itag {
        Some(itag) if !itag.trim().is_empty() => SelectionRequest::Itag(itag.clone()),
        _ => SelectionRequest::Policy(match req.policy.as_deref() {
            Some("best") => selector::Policy::Best,
            _ => selector::Policy::H264Mp4,
        }),
    }
}

fn kind_label(sel: &Selection) -> &'static str {
    match sel {
        Selection::Muxed { .. } => "muxed",
        Selection::Split { .. } => "split",
        Selection::Hls { .. } => "hls",
    }
}

fn debug_headers(resp: &mut Response, mode: &str, redirect: bool, policy: &str, itag: &str, kind: &str) {
    let headers = resp.headers_mut();
    let insert = |headers: &mut HeaderMap, name: &str, value: &str| {
        if let Ok(v) = axum::http::HeaderValue::from_str(value) {
            headers.insert(axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(), v);
        }
    };
    insert(headers, "x-ytbridge-mode", mode);
    insert(headers, "x-ytbridge-want-redirect", if redirect { "true" } else { "false" });
    insert(headers, "x-ytbridge-policy", policy);
    insert(headers, "x-ytbridge-itag", itag);
    insert(headers, "x-ytbridge-kind", kind);
}

/// GET or HEAD /play/{id}. `is_head` selects the HEAD-specific probing
/// behaviour described in SPEC_FULL.md §4.5.
pub async fn play(
    cfg: &Config,
    client: &Client,
    cache: &dyn Cache,
    req: PlayRequest,
    method: Method,
) -> AppResult<Response> {
    let probe = extractor::probe(cfg, client, cache, &req.id).await?;
    let sel_req = selection_request(&req);
    let redirect = effective_redirect(cfg, req.force_redirect);
    let policy_label = req.policy.clone().unwrap_or_else(|| "h264_mp4".to_string());
    let itag_label = req.itag.clone().unwrap_or_default();

    let selection = match selector::pick(&probe, &sel_req) {
        Some(sel) => sel,
        None => match selector::discover_hls(&probe) {
            Some(hls) => hls,
            None => return Err(AppError::bad_gateway("no playable format found for this video")),
        },
    };

    let is_head = method == Method::HEAD;
    let kind = kind_label(&selection);

    let mut response = match selection {
        Selection::Hls { url, .. } => serve_hls(client, &url, redirect).await?,
        Selection::Muxed { url, .. } => {
            serve_muxed(cfg, client, cache, &req, &probe, &url, redirect, is_head).await?
        }
        Selection::Split { video_url, audio_url, .. } => {
            if is_head {
                head_placeholder("video/mp4")
            } else {
                remux::stream(cfg, &probe, &video_url, &audio_url).await?
            }
        }
    };

    if req.debug {
        let mode = if redirect {
            "redirect"
        } else if is_head {
            "head-proxy"
        } else {
            match kind {
                "split" => "remux",
                _ => "proxy",
            }
        };
        debug_headers(&mut response, mode, redirect, &policy_label, &itag_label, kind);
    }

    Ok(response)
}

/// GET /hls/{id}: explicit HLS endpoint, itag query defaulting to "94".
pub async fn hls(cfg: &Config, client: &Client, cache: &dyn Cache, req: HlsRequest) -> AppResult<Response> {
    let probe = extractor::probe(cfg, client, cache, &req.id).await?;
    let requested = req.itag.clone().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "94".to_string());

    let (url, itag_label) = match selector::pick(&probe, &SelectionRequest::Itag(requested)) {
        Some(Selection::Hls { url, itag }) => (url, itag),
        _ => match selector::discover_hls(&probe) {
            Some(Selection::Hls { url, itag }) => (url, itag),
            _ => return Err(AppError::not_found("no HLS manifest available for this video")),
        },
    };

    let redirect = effective_redirect(cfg, req.force_redirect);
    let mut response = serve_hls(client, &url, redirect).await?;

    if req.debug {
        let mode = if redirect { "redirect" } else { "proxy" };
        debug_headers(&mut response, mode, redirect, "", itag_label.as_deref().unwrap_or(""), "hls");
    }

    Ok(response)
}

async fn serve_hls(client: &Client, url: &str, redirect: bool) -> AppResult<Response> {
    if redirect {
        return Ok(Redirect::temporary(url).into_response());
    }

    let response = client
        .get(url)
        .timeout(HLS_FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| AppError::bad_gateway(format!("HLS manifest fetch failed: {e}")))?;

    if response.status().as_u16() >= 400 {
        return Err(AppError::bad_gateway(format!(
            "HLS manifest fetch returned {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AppError::bad_gateway(format!("HLS manifest read failed: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/vnd.apple.mpegurl"),
            (CACHE_CONTROL, "private, max-age=30"),
        ],
        body,
    )
        .into_response())
}

fn head_placeholder(content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header("accept-ranges", "none")
        .body(Body::empty())
        .unwrap()
}

async fn serve_muxed(
    cfg: &Config,
    client: &Client,
    cache: &dyn Cache,
    req: &PlayRequest,
    probe: &Probe,
    url: &str,
    redirect: bool,
    is_head: bool,
) -> AppResult<Response> {
    if redirect {
        return Ok(Redirect::temporary(url).into_response());
    }

    let attempt = fetch_muxed_once(client, probe, url, is_head, &req.client_headers).await?;

    match attempt {
        MuxedAttempt::Ok(response) => Ok(mirror_response(response, is_head).await?),
        MuxedAttempt::Expired => {
            // one refresh cycle: re-probe, re-select, rebuild, reopen.
            let fresh_probe = extractor::probe(cfg, client, cache, &req.id).await?;
            let sel_req = selection_request(req);
            match selector::pick(&fresh_probe, &sel_req) {
                Some(Selection::Muxed { url: fresh_url, .. }) => {
                    match fetch_muxed_once(client, &fresh_probe, &fresh_url, is_head, &req.client_headers).await? {
                        MuxedAttempt::Ok(response) => Ok(mirror_response(response, is_head).await?),
                        _ => fall_back_to_hls(&fresh_probe),
                    }
                }
                _ => fall_back_to_hls(&fresh_probe),
            }
        }
    }
}

fn fall_back_to_hls(probe: &Probe) -> AppResult<Response> {
    match selector::discover_hls(probe) {
        Some(Selection::Hls { url, .. }) => Ok(Redirect::temporary(&url).into_response()),
        _ => Err(AppError::bad_gateway("origin signed URL expired and no HLS fallback is available")),
    }
}

enum MuxedAttempt {
    Ok(reqwest::Response),
    Expired,
}

async fn fetch_muxed_once(
    client: &Client,
    probe: &Probe,
    url: &str,
    is_head: bool,
    client_headers: &HeaderMap,
) -> AppResult<MuxedAttempt> {
    let mut outbound = headers::build(probe, client_headers);
    if !is_head {
        outbound = headers::with_forced_range(outbound);
    } else {
        outbound.insert(RANGE, "bytes=0-0".parse().unwrap());
    }

    let timeout = if is_head { ORIGIN_HEAD_TIMEOUT } else { ORIGIN_GET_CONNECT_TIMEOUT };

    let response = client
        .get(url)
        .headers(outbound)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AppError::bad_gateway(format!("origin request failed: {e}")))?;

    let status = response.status().as_u16();
    if status == 403 || status == 410 {
        return Ok(MuxedAttempt::Expired);
    }
    if status != 200 && status != 206 {
        warn!(status, url, "origin returned unexpected status");
        return Ok(MuxedAttempt::Expired);
    }

    Ok(MuxedAttempt::Ok(response))
}

async fn mirror_response(upstream: reqwest::Response, is_head: bool) -> AppResult<Response> {
    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();

    let mut builder = Response::builder().status(status);
    for name in MIRRORED_HEADERS {
        if let Some(value) = upstream_headers.get(*name) {
            builder = builder.header(*name, value.clone());
        }
    }
    if upstream_headers.get("accept-ranges").is_none() {
        builder = builder.header("accept-ranges", "bytes");
    }
    if upstream_headers.get(CONTENT_TYPE).is_none() {
        builder = builder.header(CONTENT_TYPE, "video/mp4");
    }
    if upstream_headers.get(CACHE_CONTROL).is_none() {
        builder = builder.header(CACHE_CONTROL, "no-store");
    }

    let body = if is_head {
        drop(upstream);
        Body::empty()
    } else {
        Body::from_stream(upstream.bytes_stream().map(|c| c.map_err(std::io::Error::other)))
    };

    builder
        .body(body)
        .map_err(|e| AppError::internal(format!("failed to build response: {e}")))
}
