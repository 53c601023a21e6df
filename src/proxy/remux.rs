//! Remux Pipeline: mux a video-only and an audio-only URL into
//! fragmented MP4 on stdout via an external media tool, relaying the
//! bytes to the consumer (SPEC_FULL.md §4.6).

use std::process::Stdio;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::extractor::Probe;
use crate::headers;

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_CAPACITY: usize = 8;

fn build_args(video_headers: &[String], video_url: &str, audio_headers: &[String], audio_url: &str) -> Vec<String> {
    let mut args = vec![
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-hide_banner".to_string(),
        "-reconnect".to_string(),
        "1".to_string(),
        "-reconnect_streamed".to_string(),
        "1".to_string(),
        "-reconnect_delay_max".to_string(),
        "5".to_string(),
        "-rw_timeout".to_string(),
        "15000000".to_string(),
    ];
    args.extend_from_slice(video_headers);
    args.push("-i".to_string());
    args.push(video_url.to_string());
    args.extend_from_slice(audio_headers);
    args.push("-i".to_string());
    args.push(audio_url.to_string());
    args.extend([
        "-c".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+frag_keyframe+empty_moov".to_string(),
        "-f".to_string(),
        "mp4".to_string(),
        "pipe:1".to_string(),
    ]);
    args
}

/// Spawn the configured media tool and stream its stdout as the response
/// body, killing the process on any termination path (success, error, or
/// the consumer disconnecting and dropping the body stream).
pub async fn stream(cfg: &Config, probe: &Probe, video_url: &str, audio_url: &str) -> AppResult<Response> {
    let outbound = headers::build(probe, &HeaderMap::new());
    let kv = headers::headers_kv(&outbound);
    let args = build_args(&kv, video_url, &kv, audio_url);

    let mut child = Command::new(&cfg.ffmpeg_cmd)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::internal(format!("media tool '{}' not found or failed to spawn: {e}", cfg.ffmpeg_cmd)))?;

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut client_gone = false;
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                        // consumer dropped the response body (disconnect or
                        // cancellation); stop relaying and kill the process
                        // below instead of waiting for it to exit on its own.
                        client_gone = true;
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }

        if client_gone {
            let _ = child.kill().await;
        }

        match child.wait().await {
            Ok(status) if !status.success() => {
                let mut stderr_buf = String::new();
                let _ = stderr.read_to_string(&mut stderr_buf).await;
                warn!(
                    status = %status,
                    stderr = %AppError::tail(&stderr_buf, 220),
                    "remux process exited non-zero"
                );
            }
            Err(e) => error!("failed to wait on remux process: {e}"),
            _ => {}
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));

    Ok((
        StatusCode::OK,
        [
            ("content-type", "video/mp4"),
            ("accept-ranges", "none"),
            ("cache-control", "no-store"),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_interleave_headers_with_each_input() {
        let kv = vec!["-headers".to_string(), "User-Agent: ua\r\n".to_string()];
        let args = build_args(&kv, "https://v", &kv, "https://a");
        let i_positions: Vec<usize> = args.iter().enumerate().filter(|(_, a)| *a == "-i").map(|(i, _)| i).collect();
        assert_eq!(i_positions.len(), 2);
        assert_eq!(args[i_positions[0] - 2], "-headers");
        assert_eq!(args[i_positions[0] + 1], "https://v");
        assert_eq!(args[i_positions[1] + 1], "https://a");
    }

    #[test]
    fn fixed_flags_present() {
        let args = build_args(&[], "v", &[], "a");
        assert!(args.windows(2).any(|w| w == ["-f", "mp4"]));
        assert!(args.contains(&"pipe:1".to_string()));
        assert!(args.contains(&"+frag_keyframe+empty_moov".to_string()));
    }
}
