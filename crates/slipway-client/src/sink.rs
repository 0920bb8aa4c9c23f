//! Output sinks for decoded stream events.
//!
//! Interpreting the stream is the session's job; what happens to the events
//! is the sink's. `TerminalSink` renders them onto a line-buffered surface,
//! `RefreshSink` turns a terminal state transition into a "re-fetch your
//! data" callback. The split is what lets one session type serve both log
//! viewing and spinner-flipping use cases.

use crate::types::{STATE_SUCCEEDED, StreamEvent};

/// Consumer of decoded stream events. `write` must not fail or panic; a
/// sink that cannot render an event drops it silently on its own terms.
pub trait OutputSink {
    fn write(&mut self, event: StreamEvent);
}

/// Rendering surface contract for a terminal widget.
///
/// The surface is exclusively owned by its sink for the sink's lifetime.
/// `dispose` releases whatever listeners or observers the surface holds and
/// is called when the sink is dropped.
pub trait RenderSurface {
    fn writeln(&mut self, text: &str);
    fn write_raw(&mut self, bytes: &[u8]);
    fn is_at_bottom(&self) -> bool;
    fn scroll_to_bottom(&mut self);
    fn dispose(&mut self);
}

/// Sink that renders stream events onto a terminal surface.
///
/// Line events append line-buffered text; step output is written as raw
/// bytes so partial lines and ANSI cursor control survive. Follow-tail: a
/// write auto-scrolls only when the viewer was already at the bottom, so a
/// user who scrolled up stays put until they scroll back down.
pub struct TerminalSink<S: RenderSurface> {
    surface: S,
}

impl<S: RenderSurface> TerminalSink<S> {
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    fn write_line(&mut self, text: &str) {
        let follow = self.surface.is_at_bottom();
        self.surface.writeln(text);
        if follow {
            self.surface.scroll_to_bottom();
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) {
        let follow = self.surface.is_at_bottom();
        self.surface.write_raw(bytes);
        if follow {
            self.surface.scroll_to_bottom();
        }
    }
}

impl<S: RenderSurface> OutputSink for TerminalSink<S> {
    fn write(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TerminalLine { text } => self.write_line(&text),
            StreamEvent::TerminalStepOutput { bytes } => self.write_raw(&bytes),
            StreamEvent::StatusUpdate { details } => {
                if let Some(details) = details {
                    if !details.is_empty() {
                        self.write_line(&details);
                    }
                }
            }
            StreamEvent::StreamError { cause } => {
                self.write_line(&format!("Error: {cause}"));
            }
            StreamEvent::Metadata { .. }
            | StreamEvent::StateTransition { .. }
            | StreamEvent::StreamEnd => {}
        }
    }
}

impl<S: RenderSurface> Drop for TerminalSink<S> {
    fn drop(&mut self) {
        self.surface.dispose();
    }
}

/// Sink that fires a caller-supplied callback once when the operation's
/// state reaches the completed sentinel, then disarms itself.
///
/// Never touches a rendering surface; every event other than a state
/// transition is ignored, as is every transition after the first success.
pub struct RefreshSink<F: FnMut()> {
    on_change: F,
    armed: bool,
}

impl<F: FnMut()> RefreshSink<F> {
    #[must_use]
    pub fn new(on_change: F) -> Self {
        Self {
            on_change,
            armed: true,
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl<F: FnMut()> OutputSink for RefreshSink<F> {
    fn write(&mut self, event: StreamEvent) {
        if let StreamEvent::StateTransition { state } = event {
            if self.armed && state == STATE_SUCCEEDED {
                self.armed = false;
                (self.on_change)();
            }
        }
    }
}
