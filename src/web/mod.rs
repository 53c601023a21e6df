//! HTTP surface: routing and handlers (SPEC_FULL.md §6.1).

pub mod responses;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::Cache;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::extractor::{self, Format};
use crate::proxy;
use crate::selector::{self, Policy, Selection, SelectionRequest};

pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
    pub cache: Box<dyn Cache>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/play/{id}", get(play).head(play))
        .route("/hls/{id}", get(hls))
        .route("/formats/{id}", get(formats))
        .route("/resolve", get(resolve))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize, Default)]
pub struct PlayQuery {
    pub policy: Option<String>,
    pub itag: Option<String>,
    pub force_redirect: Option<bool>,
    #[serde(default)]
    pub debug: Option<String>,
}

fn wants_debug(debug: &Option<String>) -> bool {
    matches!(debug.as_deref(), Some("1") | Some("true"))
}

async fn play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PlayQuery>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let req = proxy::PlayRequest {
        id,
        policy: query.policy,
        itag: query.itag,
        force_redirect: query.force_redirect,
        debug: wants_debug(&query.debug),
        client_headers: headers,
    };
    match proxy::play(&state.config, &state.client, state.cache.as_ref(), req, method).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct HlsQuery {
    pub itag: Option<String>,
    pub force_redirect: Option<bool>,
    #[serde(default)]
    pub debug: Option<String>,
}

async fn hls(State(state): State<Arc<AppState>>, Path(id): Path<String>, Query(query): Query<HlsQuery>) -> Response {
    let req = proxy::HlsRequest {
        id,
        itag: query.itag,
        force_redirect: query.force_redirect,
        debug: wants_debug(&query.debug),
    };
    match proxy::hls(&state.config, &state.client, state.cache.as_ref(), req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Serialize)]
struct FormatSummary {
    itag: String,
    container: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    fps: Option<f64>,
    tbr: Option<f64>,
    abr: Option<f64>,
    kind: &'static str,
}

fn summarize(f: &Format) -> FormatSummary {
    let kind = if f.is_muxed() {
        "muxed"
    } else if f.is_video_only() {
        "video_only"
    } else if f.is_audio_only() {
        "audio_only"
    } else if f.is_hls() {
        "hls"
    } else {
        "other"
    };
    FormatSummary {
        itag: f.itag_str().to_string(),
        container: f.container.clone().or_else(|| f.ext.clone()).unwrap_or_default(),
        vcodec: f.vcodec.clone(),
        acodec: f.acodec.clone(),
        height: f.height,
        fps: f.fps,
        tbr: f.tbr,
        abr: f.abr,
        kind,
    }
}

/// Progressive (muxed) first, then height descending, then tbr descending.
fn sort_formats(mut formats: Vec<FormatSummary>) -> Vec<FormatSummary> {
    formats.sort_by(|a, b| {
        let progressive = (b.kind == "muxed").cmp(&(a.kind == "muxed"));
        progressive
            .then(b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)))
            .then(
                b.tbr
                    .unwrap_or(0.0)
                    .partial_cmp(&a.tbr.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    formats
}

#[derive(Debug, Deserialize, Default)]
pub struct FormatsQuery {
    #[allow(dead_code)]
    pub debug: Option<String>,
}

async fn formats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(_query): Query<FormatsQuery>,
) -> AppResult<Json<Vec<FormatSummary>>> {
    let probe = extractor::probe(&state.config, &state.client, state.cache.as_ref(), &id).await?;
    let summaries: Vec<FormatSummary> = probe.playable_formats().map(summarize).collect();
    Ok(Json(sort_formats(summaries)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub video_id: String,
    pub policy: Option<String>,
    pub itag: Option<String>,
}

async fn resolve(State(state): State<Arc<AppState>>, Query(query): Query<ResolveQuery>) -> AppResult<Json<serde_json::Value>> {
    let probe = extractor::probe(&state.config, &state.client, state.cache.as_ref(), &query.video_id).await?;

    let sel_req = match &query.itag {
        Some(itag) if !itag.trim().is_empty() => SelectionRequest::Itag(itag.clone()),
        _ => SelectionRequest::Policy(match query.policy.as_deref() {
            Some("best") => Policy::Best,
            _ => Policy::H264Mp4,
        }),
    };

    let selection = selector::pick(&probe, &sel_req).or_else(|| selector::discover_hls(&probe));

    let selection_json = match &selection {
        Some(Selection::Muxed { url, container, codecs, itag }) => json!({
            "kind": "muxed", "url": url, "container": container, "codecs": codecs, "itag": itag,
        }),
        Some(Selection::Split { video_url, audio_url, container }) => json!({
            "kind": "split", "video_url": video_url, "audio_url": audio_url, "container": container,
        }),
        Some(Selection::Hls { url, itag }) => json!({
            "kind": "hls", "url": url, "itag": itag,
        }),
        None => json!({ "kind": "none" }),
    };

    if selection.is_none() {
        return Err(AppError::bad_gateway("no playable format found for this video"));
    }

    Ok(Json(json!({
        "id": probe.id,
        "title": probe.title,
        "duration_seconds": probe.duration_seconds,
        "webpage_url": probe.webpage_url,
        "selection": selection_json,
    })))
}
