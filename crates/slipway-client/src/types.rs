//! Slipway operation descriptors, wire frames, and stream events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SlipwayClientError;

/// Workspace applied to a descriptor when the caller does not pick one.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Wire numeral the platform reports when an operation (or a status report
/// it expedited) has completed successfully. This is the only state numeral
/// the refresh path special-cases.
pub const STATE_SUCCEEDED: i32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Up,
    Down,
    Init,
    ExpediteStatusReport,
}

impl OperationKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Init => "init",
            Self::ExpediteStatusReport => "expediteStatusReport",
        }
    }

    /// `Init` runs against a project-scoped runner; every other kind runs
    /// against an application.
    #[must_use]
    pub const fn targets_application(self) -> bool {
        !matches!(self, Self::Init)
    }
}

/// Description of one operation to submit. Immutable once submitted.
///
/// Target refs are `<project>/<name>` paths. Exactly one of `application`
/// or `runner` is meaningful per kind; `validate` enforces the pairing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    pub workspace: String,
}

impl OperationDescriptor {
    #[must_use]
    pub fn up(application: impl Into<String>) -> Self {
        Self::for_application(OperationKind::Up, application)
    }

    #[must_use]
    pub fn down(application: impl Into<String>) -> Self {
        Self::for_application(OperationKind::Down, application)
    }

    #[must_use]
    pub fn expedite_status_report(application: impl Into<String>) -> Self {
        Self::for_application(OperationKind::ExpediteStatusReport, application)
    }

    #[must_use]
    pub fn init(runner: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Init,
            application: None,
            runner: Some(runner.into()),
            workspace: DEFAULT_WORKSPACE.to_string(),
        }
    }

    fn for_application(kind: OperationKind, application: impl Into<String>) -> Self {
        Self {
            kind,
            application: Some(application.into()),
            runner: None,
            workspace: DEFAULT_WORKSPACE.to_string(),
        }
    }

    /// Override the workspace the operation runs in.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn validate(&self) -> Result<(), SlipwayClientError> {
        let label = self.kind.label();
        if self.kind.targets_application() {
            if self.application.as_deref().is_none_or(|app| app.trim().is_empty()) {
                return Err(descriptor_error(format!(
                    "{label} operation requires an application target"
                )));
            }
            if self.runner.is_some() {
                return Err(descriptor_error(format!(
                    "{label} operation does not take a runner target"
                )));
            }
        } else {
            if self.runner.as_deref().is_none_or(|runner| runner.trim().is_empty()) {
                return Err(descriptor_error(format!(
                    "{label} operation requires a runner target"
                )));
            }
            if self.application.is_some() {
                return Err(descriptor_error(format!(
                    "{label} operation does not take an application target"
                )));
            }
        }
        if self.workspace.trim().is_empty() {
            return Err(descriptor_error(format!(
                "{label} operation requires a workspace"
            )));
        }
        Ok(())
    }
}

fn descriptor_error(message: String) -> SlipwayClientError {
    SlipwayClientError::Descriptor { message }
}

/// Opaque identifier the platform assigns to a submitted operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OperationHandle {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOperationResponse {
    pub operation: OperationHandle,
}

/// One deframed protocol message from an operation's event feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<TerminalStep>,
}

/// Step-scoped terminal output. `output` carries the raw bytes, base64 on
/// the wire, so partial lines and ANSI cursor control survive intact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, with = "base64_bytes")]
    pub output: Vec<u8>,
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// One frame of the subscription feed as the transport delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamFrame {
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    Metadata {
        #[serde(default)]
        raw: Value,
    },
    Data {
        message: OperationMessage,
    },
    Error {
        message: String,
    },
    End,
}

/// Transport-level signal driving a stream session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Status { details: Option<String> },
    Metadata { raw: Value },
    Data(OperationMessage),
    Error(SlipwayClientError),
    End,
}

impl From<StreamFrame> for TransportEvent {
    fn from(frame: StreamFrame) -> Self {
        match frame {
            StreamFrame::Status { details } => Self::Status { details },
            StreamFrame::Metadata { raw } => Self::Metadata { raw },
            StreamFrame::Data { message } => Self::Data(message),
            StreamFrame::Error { message } => {
                Self::Error(SlipwayClientError::Stream { message })
            }
            StreamFrame::End => Self::End,
        }
    }
}

/// Decoded stream event, consumed exactly once by the session's sink.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    StatusUpdate { details: Option<String> },
    Metadata { raw: Value },
    TerminalLine { text: String },
    TerminalStepOutput { bytes: Vec<u8> },
    StateTransition { state: i32 },
    StreamError { cause: SlipwayClientError },
    StreamEnd,
}

impl StreamEvent {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::StatusUpdate { .. } => "statusUpdate",
            Self::Metadata { .. } => "metadata",
            Self::TerminalLine { .. } => "terminalLine",
            Self::TerminalStepOutput { .. } => "terminalStepOutput",
            Self::StateTransition { .. } => "stateTransition",
            Self::StreamError { .. } => "streamError",
            Self::StreamEnd => "streamEnd",
        }
    }
}
