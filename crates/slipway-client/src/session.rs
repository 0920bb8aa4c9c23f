//! Stream session state machine.
//!
//! A session owns the lifecycle of one operation's event feed: it decodes
//! incoming frames, dispatches the resulting events to its sink in arrival
//! order, and signals completion when the transport ends or fails. Terminal
//! states are absorbing; a fresh session must be created to retry.

use tokio::sync::mpsc;

use crate::SlipwayClientError;
use crate::decode::decode;
use crate::sink::OutputSink;
use crate::types::{OperationHandle, StreamEvent, TransportEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open,
    Closed,
    Failed,
}

impl SessionState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

pub struct StreamSession<S> {
    handle: OperationHandle,
    state: SessionState,
    sink: S,
}

impl<S: OutputSink> StreamSession<S> {
    #[must_use]
    pub fn new(handle: OperationHandle, sink: S) -> Self {
        Self {
            handle,
            state: SessionState::Idle,
            sink,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Feed one transport signal through the state machine.
    ///
    /// Returns `Some` exactly once, when the signal moves the session into a
    /// terminal state. Signals delivered after that are ignored; the sink is
    /// never invoked again once the session has closed or failed.
    pub fn handle_signal(
        &mut self,
        signal: TransportEvent,
    ) -> Option<Result<(), SlipwayClientError>> {
        if self.state.is_terminal() {
            return None;
        }
        match signal {
            TransportEvent::Status { details } => {
                self.open();
                self.sink.write(StreamEvent::StatusUpdate { details });
                None
            }
            TransportEvent::Metadata { raw } => {
                self.open();
                self.sink.write(StreamEvent::Metadata { raw });
                None
            }
            TransportEvent::Data(message) => {
                self.open();
                self.sink.write(decode(message));
                None
            }
            TransportEvent::End => {
                self.sink.write(StreamEvent::StreamEnd);
                self.transition(SessionState::Closed);
                Some(Ok(()))
            }
            TransportEvent::Error(cause) => {
                self.sink.write(StreamEvent::StreamError {
                    cause: cause.clone(),
                });
                self.transition(SessionState::Failed);
                Some(Err(cause))
            }
        }
    }

    /// Drive the session from a transport feed until it ends.
    ///
    /// The returned future is the session's completion signal: it resolves
    /// `Ok(())` when the stream ends and `Err` when the transport or the
    /// protocol fails. A feed that closes without an end signal counts as a
    /// failure (the connection dropped mid-stream).
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
    ) -> Result<(), SlipwayClientError> {
        while let Some(signal) = events.recv().await {
            if let Some(outcome) = self.handle_signal(signal) {
                return outcome;
            }
        }
        let cause = SlipwayClientError::Stream {
            message: "operation stream closed without an end signal".to_string(),
        };
        self.sink.write(StreamEvent::StreamError {
            cause: cause.clone(),
        });
        self.transition(SessionState::Failed);
        Err(cause)
    }

    fn open(&mut self) {
        if self.state == SessionState::Idle {
            self.transition(SessionState::Open);
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(
            operation = %self.handle.id,
            from = self.state.label(),
            to = next.label(),
            "Stream session state changed"
        );
        self.state = next;
    }
}
