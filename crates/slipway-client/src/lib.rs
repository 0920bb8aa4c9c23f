//! Client library for the Slipway operation streaming API.
//!
//! Submits long-running operations (builds, deploys, health-check re-runs)
//! to the Slipway platform, subscribes to their server-streamed event feeds,
//! and fans decoded events into output sinks. A generic poll scheduler keeps
//! read views fresh for callers that have no active stream.

use reqwest::StatusCode;
use thiserror::Error;

pub mod client;
pub mod decode;
pub mod poll;
pub mod session;
pub mod sink;
pub mod types;

pub use client::{
    DEFAULT_TIMEOUT_MS, FrameLog, SlipwayClient, SlipwayClientConfig, format_http_error,
};
pub use decode::{LOGS_UNAVAILABLE_DETAILS, decode};
pub use poll::{DEFAULT_POLL_INTERVAL_MS, PollScheduler};
pub use session::{SessionState, StreamSession};
pub use sink::{OutputSink, RefreshSink, RenderSurface, TerminalSink};
pub use types::{
    DEFAULT_WORKSPACE, OperationDescriptor, OperationHandle, OperationKind, OperationMessage,
    STATE_SUCCEEDED, StreamEvent, StreamFrame, SubmitOperationResponse, TerminalMessage,
    TerminalStep, TransportEvent,
};

#[derive(Debug, Clone, Error)]
pub enum SlipwayClientError {
    #[error("ops_base_url_missing")]
    BaseUrlMissing,
    #[error("ops_invalid_path")]
    InvalidPath,
    #[error("ops_invalid_descriptor:{message}")]
    Descriptor { message: String },
    #[error("ops_request_failed:{message}")]
    Request { message: String },
    #[error("ops_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("ops_json_decode_failed:{message}")]
    Decode { message: String },
    #[error("ops_stream_failed:{message}")]
    Stream { message: String },
}
