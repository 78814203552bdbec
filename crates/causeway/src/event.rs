//! Cause-carrying events and the stack-neutral emit operation.
//!
//! An [`Event`] wraps a payload together with the [`Cause`] snapshot that was
//! current when it was raised. Sinks may inspect the cause, replace the
//! payload, or cancel the event. [`Emit`] is the one way the facade raises
//! events, and it leaves the cause stack exactly as it found it.

use causeway_stack::prelude::{Cause, CauseEntry, CauseStack, StackNeutralOperation};
use tracing::trace;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A payload plus the cause it was raised under.
#[derive(Debug, Clone)]
pub struct Event<P> {
    payload: P,
    cause: Cause,
    cancelled: bool,
}

impl<P> Event<P> {
    pub fn new(payload: P, cause: Cause) -> Self {
        Self {
            payload,
            cause,
            cancelled: false,
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Replace the payload, returning the old one.
    pub fn set_payload(&mut self, payload: P) -> P {
        std::mem::replace(&mut self.payload, payload)
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Receiver for events of payload type `P`.
pub trait EventSink<P> {
    fn post(&mut self, event: &mut Event<P>);
}

impl<P, F> EventSink<P> for F
where
    F: FnMut(&mut Event<P>),
{
    fn post(&mut self, event: &mut Event<P>) {
        self(event)
    }
}

/// A sink that keeps a copy of every event it receives.
#[derive(Debug)]
pub struct RecordingSink<P> {
    events: Vec<Event<P>>,
}

impl<P> RecordingSink<P> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn events(&self) -> &[Event<P>] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<Event<P>> {
        std::mem::take(&mut self.events)
    }
}

impl<P> Default for RecordingSink<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone> EventSink<P> for RecordingSink<P> {
    fn post(&mut self, event: &mut Event<P>) {
        self.events.push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Emit
// ---------------------------------------------------------------------------

/// Raise an event under the current cause.
///
/// Returns the payload as left by the sink, or `None` if the sink cancelled
/// the event. When firing is disabled the sink is skipped and the payload is
/// returned untouched.
pub struct Emit<'s, P, S: ?Sized> {
    sink: &'s mut S,
    payload: P,
    extra_cause: Option<CauseEntry>,
    should_fire: bool,
}

impl<'s, P, S: EventSink<P> + ?Sized> Emit<'s, P, S> {
    pub fn new(sink: &'s mut S, payload: P) -> Self {
        Self {
            sink,
            payload,
            extra_cause: None,
            should_fire: true,
        }
    }

    /// Attribute the event to `cause` on top of the current stack, for this
    /// event only.
    pub fn with_cause<T: std::any::Any + Send + Sync>(mut self, cause: T) -> Self {
        self.extra_cause = Some(CauseEntry::new(cause));
        self
    }

    /// Skip the sink entirely when `fire` is false.
    pub fn should_fire(mut self, fire: bool) -> Self {
        self.should_fire = fire;
        self
    }
}

impl<P, S: EventSink<P> + ?Sized> StackNeutralOperation for Emit<'_, P, S> {
    type Output = Option<P>;

    fn name(&self) -> &'static str {
        "emit"
    }

    fn apply(self, stack: &mut CauseStack) -> Option<P> {
        if !self.should_fire {
            return Some(self.payload);
        }

        let cause = match self.extra_cause {
            Some(entry) => {
                let mut frame = stack.frame();
                frame.push_entry(entry);
                frame.current_cause()
            }
            None => stack.current_cause(),
        };

        let mut event = Event::new(self.payload, cause);
        self.sink.post(&mut event);
        if event.is_cancelled() {
            trace!(depth = event.cause().len(), "event cancelled by sink");
            return None;
        }
        Some(event.into_payload())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
