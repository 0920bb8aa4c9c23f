//! HTTP client for the Slipway operation API.
//!
//! `submit_operation` starts work; `subscribe_operation` observes it. The
//! two are deliberately decoupled so a caller may submit now and attach a
//! viewer later, or never. Subscriptions read the response body as a
//! newline-delimited frame feed and hand typed transport events to the
//! caller over a channel; framing below that (HTTP chunking, TLS) belongs
//! to the transport stack.

use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::SlipwayClientError;
use crate::types::{
    OperationDescriptor, OperationHandle, StreamFrame, SubmitOperationResponse, TransportEvent,
};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone)]
pub struct SlipwayClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub frame_log: Option<FrameLog>,
}

impl SlipwayClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            frame_log: None,
        }
    }
}

/// Append-only NDJSON log of inbound stream frames.
///
/// Entries recorded before a path is attached are buffered and flushed once
/// `set_path` opens the file, so early frames from a fast stream are not
/// lost while the host application decides where logs live.
#[derive(Clone)]
pub struct FrameLog {
    tx: mpsc::UnboundedSender<FrameLogCommand>,
}

enum FrameLogCommand {
    SetPath(PathBuf),
    Entry { raw: String },
}

impl FrameLog {
    #[must_use]
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut file: Option<tokio::fs::File> = None;
            let mut buffer: Vec<String> = Vec::new();

            while let Some(cmd) = rx.recv().await {
                match cmd {
                    FrameLogCommand::SetPath(path) => {
                        if let Some(parent) = path.parent() {
                            let _ = tokio::fs::create_dir_all(parent).await;
                        }
                        match tokio::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(&path)
                            .await
                        {
                            Ok(mut opened) => {
                                for line in buffer.drain(..) {
                                    let _ = opened.write_all(line.as_bytes()).await;
                                    let _ = opened.write_all(b"\n").await;
                                }
                                file = Some(opened);
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, path = %path.display(), "Failed to open frame log");
                            }
                        }
                    }
                    FrameLogCommand::Entry { raw } => {
                        let entry = serde_json::json!({
                            "timestamp_ms": current_timestamp_ms(),
                            "raw": raw,
                        });
                        let line =
                            serde_json::to_string(&entry).unwrap_or_else(|_| "{}".to_string());
                        if let Some(file) = file.as_mut() {
                            let _ = file.write_all(line.as_bytes()).await;
                            let _ = file.write_all(b"\n").await;
                        } else {
                            buffer.push(line);
                        }
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn set_path(&self, path: PathBuf) {
        let _ = self.tx.send(FrameLogCommand::SetPath(path));
    }

    fn record(&self, raw: &str) {
        let _ = self.tx.send(FrameLogCommand::Entry {
            raw: raw.to_string(),
        });
    }
}

impl Default for FrameLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct SlipwayClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    frame_log: Option<FrameLog>,
}

impl SlipwayClient {
    pub fn new(config: SlipwayClientConfig) -> Result<Self, SlipwayClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            http: reqwest::Client::new(),
            frame_log: config.frame_log,
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn operations_path() -> &'static str {
        "/api/v1/operations"
    }

    #[must_use]
    pub fn operation_events_path(operation_id: &str) -> String {
        format!("/api/v1/operations/{}/events", operation_id.trim())
    }

    /// Submit one operation and return its handle.
    ///
    /// A single attempt: transport failures reject to the caller, and retry
    /// policy stays a caller concern. No stream is opened here.
    pub async fn submit_operation(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle, SlipwayClientError> {
        descriptor.validate()?;
        let url = self
            .endpoint(Self::operations_path())
            .ok_or(SlipwayClientError::InvalidPath)?;

        let response = self
            .http
            .post(url)
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .json(descriptor)
            .send()
            .await
            .map_err(|error| SlipwayClientError::Request {
                message: error.to_string(),
            })?;

        let submitted: SubmitOperationResponse = decode_json_response(response).await?;
        Ok(submitted.operation)
    }

    /// Open the server-streamed event feed for a submitted operation.
    ///
    /// The returned channel yields transport events in server emission
    /// order and closes after the first terminal signal. Dropping the
    /// receiver tears the feed down.
    #[must_use]
    pub fn subscribe_operation(&self, handle: &OperationHandle) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(256);
        let http = self.http.clone();
        let frame_log = self.frame_log.clone();
        let url = self.endpoint(&Self::operation_events_path(&handle.id));

        tokio::spawn(async move {
            let Some(url) = url else {
                let _ = tx.send(TransportEvent::Error(SlipwayClientError::InvalidPath)).await;
                return;
            };

            let response = match http
                .get(url)
                .header("x-request-id", request_id())
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    let _ = tx
                        .send(TransportEvent::Error(SlipwayClientError::Request {
                            message: error.to_string(),
                        }))
                        .await;
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.bytes().await.unwrap_or_default();
                let _ = tx
                    .send(TransportEvent::Error(format_http_error(status, &body)))
                    .await;
                return;
            }

            let mut body = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        let _ = tx
                            .send(TransportEvent::Error(SlipwayClientError::Request {
                                message: error.to_string(),
                            }))
                            .await;
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);
                for line in drain_complete_lines(&mut buffer) {
                    if let Some(log) = &frame_log {
                        log.record(&line);
                    }
                    let frame: StreamFrame = match serde_json::from_str(&line) {
                        Ok(frame) => frame,
                        Err(error) => {
                            // Fail loud: a dropped frame would desynchronize
                            // a line-numbered terminal.
                            tracing::warn!(error = %error, line = %line, "Operation frame parse failed");
                            let _ = tx
                                .send(TransportEvent::Error(SlipwayClientError::Decode {
                                    message: error.to_string(),
                                }))
                                .await;
                            return;
                        }
                    };

                    let terminal = matches!(frame, StreamFrame::Error { .. } | StreamFrame::End);
                    if tx.send(frame.into()).await.is_err() {
                        return;
                    }
                    if terminal {
                        return;
                    }
                }
            }

            // Graceful body end without an explicit end frame doubles as the
            // transport's end signal.
            let _ = tx.send(TransportEvent::End).await;
        });

        rx
    }
}

/// Split every complete newline-terminated line out of `buffer`, leaving
/// any trailing partial line in place. Blank lines are skipped.
fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(position) = buffer.iter().position(|byte| *byte == b'\n') {
        let mut line: Vec<u8> = buffer.drain(..=position).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let line = String::from_utf8_lossy(&line);
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    lines
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> SlipwayClientError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    SlipwayClientError::Http { status, body }
}

fn normalize_base_url(base_url: &str) -> Result<String, SlipwayClientError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(SlipwayClientError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, SlipwayClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| SlipwayClientError::Request {
            message: error.to_string(),
        })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| SlipwayClientError::Decode {
        message: error.to_string(),
    })
}

fn request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
