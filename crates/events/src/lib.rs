#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in rgem
//!
//! Library crates never print. Progress notices, warnings, the post-install
//! message and failures travel as [`AppEvent`]s over an unbounded channel, and
//! every emission is also recorded through `tracing` at the event's level.

pub mod meta;
pub use meta::{EventLevel, EventSource};

pub mod events;
pub use events::{
    AppEvent, BuildEvent, FailureContext, GeneralEvent, InstallEvent, InstallPhase,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

fn trace_event(event: &AppEvent) {
    let source = event.event_source();
    let source = source.as_str();
    match event.level() {
        EventLevel::Trace => tracing::trace!(target: "rgem::events", source, event = ?event),
        EventLevel::Debug => tracing::debug!(target: "rgem::events", source, event = ?event),
        EventLevel::Info => tracing::info!(target: "rgem::events", source, event = ?event),
        EventLevel::Warn => tracing::warn!(target: "rgem::events", source, event = ?event),
        EventLevel::Error => tracing::error!(target: "rgem::events", source, event = ?event),
    }
}

/// The unified trait for emitting events throughout rgem
///
/// Implemented by the raw [`EventSender`] and by any context that carries an
/// optional sender.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        trace_event(&event);
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a user-facing notice
    fn emit_notice(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::notice(message)));
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit an install phase transition
    fn emit_phase(&self, package: impl Into<String>, phase: InstallPhase) {
        self.emit(AppEvent::Install(InstallEvent::PhaseStarted {
            package: package.into(),
            phase,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgem_errors::{BuildError, Error};

    #[tokio::test]
    async fn sender_delivers_events_in_order() {
        let (tx, mut rx) = channel();
        tx.emit_notice("Building native extensions.  This could take a while...");
        tx.emit_warning("careful");

        match rx.recv().await {
            Some(AppEvent::General(GeneralEvent::Notice { message })) => {
                assert_eq!(message, "Building native extensions.  This could take a while...");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        let next = rx.recv().await.unwrap();
        assert_eq!(next.level(), EventLevel::Warn);
        assert_eq!(next.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn phase_events_log_at_debug() {
        let event = AppEvent::Install(InstallEvent::PhaseStarted {
            package: "a-2".to_string(),
            phase: InstallPhase::Building,
        });
        assert_eq!(event.level(), EventLevel::Debug);
        assert_eq!(event.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn missing_sender_is_silent() {
        let none: Option<EventSender> = None;
        none.emit_warning("nobody is listening");
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit_error("lost");
    }

    #[test]
    fn failure_context_from_error() {
        let err: Error = BuildError::UnsupportedExtension {
            name: String::new(),
        }
        .into();
        let ctx = FailureContext::from_error(&err);
        assert_eq!(ctx.code.as_deref(), Some("build.unsupported_extension"));
        assert_eq!(ctx.message, "No builder for extension ''");
        assert!(!ctx.retryable);
    }
}
