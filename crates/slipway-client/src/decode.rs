//! Maps one protocol message to exactly one stream event.

use crate::types::{OperationMessage, StreamEvent};

/// Fallback detail for frames with no recognized discriminant, including a
/// terminal message with neither a line nor a step populated.
pub const LOGS_UNAVAILABLE_DETAILS: &str = "Logs are no longer available for this operation.";

/// Decode one deframed protocol message.
///
/// Total over every frame shape the platform can produce: line output, raw
/// step output, a state change, or nothing recognizable. Malformed JSON is
/// caught earlier, in the transport reader, and surfaced as a stream error.
#[must_use]
pub fn decode(message: OperationMessage) -> StreamEvent {
    if let Some(terminal) = message.terminal {
        if let Some(text) = terminal.line {
            return StreamEvent::TerminalLine { text };
        }
        if let Some(step) = terminal.step {
            if !step.output.is_empty() {
                return StreamEvent::TerminalStepOutput { bytes: step.output };
            }
        }
    }
    if let Some(state) = message.state {
        return StreamEvent::StateTransition { state };
    }
    StreamEvent::StatusUpdate {
        details: Some(LOGS_UNAVAILABLE_DETAILS.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{TerminalMessage, TerminalStep};

    use super::*;

    #[test]
    fn line_frame_decodes_to_terminal_line() {
        let message = OperationMessage {
            terminal: Some(TerminalMessage {
                line: Some("Building...".to_string()),
                step: None,
            }),
            state: None,
        };
        assert!(matches!(
            decode(message),
            StreamEvent::TerminalLine { ref text } if text == "Building..."
        ));
    }

    #[test]
    fn step_frame_with_bytes_decodes_to_raw_output() {
        let message = OperationMessage {
            terminal: Some(TerminalMessage {
                line: None,
                step: Some(TerminalStep {
                    name: Some("push".to_string()),
                    output: b"\x1b[1A\x1b[2K".to_vec(),
                }),
            }),
            state: None,
        };
        assert!(matches!(
            decode(message),
            StreamEvent::TerminalStepOutput { ref bytes } if bytes == b"\x1b[1A\x1b[2K"
        ));
    }

    #[test]
    fn state_frame_decodes_to_state_transition() {
        let message = OperationMessage {
            terminal: None,
            state: Some(5),
        };
        assert!(matches!(
            decode(message),
            StreamEvent::StateTransition { state: 5 }
        ));
    }

    #[test]
    fn unrecognized_frames_fall_back_to_a_status_update() {
        let empty = OperationMessage::default();
        assert!(matches!(
            decode(empty),
            StreamEvent::StatusUpdate { details: Some(ref d) } if d == LOGS_UNAVAILABLE_DETAILS
        ));

        // Terminal message with neither line nor step, and an empty step.
        let hollow = OperationMessage {
            terminal: Some(TerminalMessage::default()),
            state: None,
        };
        assert!(matches!(decode(hollow), StreamEvent::StatusUpdate { .. }));

        let empty_step = OperationMessage {
            terminal: Some(TerminalMessage {
                line: None,
                step: Some(TerminalStep::default()),
            }),
            state: None,
        };
        assert!(matches!(decode(empty_step), StreamEvent::StatusUpdate { .. }));
    }

    #[test]
    fn line_wins_when_a_frame_also_carries_state() {
        let message = OperationMessage {
            terminal: Some(TerminalMessage {
                line: Some("done".to_string()),
                step: None,
            }),
            state: Some(5),
        };
        assert!(matches!(decode(message), StreamEvent::TerminalLine { .. }));
    }
}
