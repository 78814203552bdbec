//! Causeway -- cause attribution and property matching for hosts.
//!
//! This crate ties the two core crates together for an application:
//!
//! - [`causeway_stack`]: the per-context cause stack with scoped context.
//! - [`causeway_property`]: typed property descriptors and total matching.
//!
//! On top of them it adds a [`Session`](session::Session) per execution
//! context, configuration loading, `tracing` setup, an injectable
//! [`Registry`](registry::Registry), and cause-carrying events raised through
//! the stack-neutral [`Emit`](event::Emit) operation.
//!
//! # Quick Start
//!
//! ```
//! use causeway::prelude::*;
//!
//! let registry = Registry::<EntityType>::new("entity_type").into_shared();
//! let mut session = Session::new(SessionConfig::default(), registry);
//! let mut sink = RecordingSink::new();
//!
//! {
//!     let mut frame = session.stack_mut().frame();
//!     frame.push_cause("creeper");
//!     let out = frame.run(Emit::new(&mut sink, "explosion")).unwrap();
//!     assert_eq!(out, Some("explosion"));
//! }
//!
//! let event = &sink.events()[0];
//! assert_eq!(event.cause().first::<&str>(), Some(&"creeper"));
//! session.end().unwrap();
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod event;
pub mod registry;
pub mod session;
pub mod statistic;

pub use causeway_property as property;
pub use causeway_stack as stack;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No entry is registered under the id.
    #[error("unknown {registry} id '{id}'")]
    UnknownId { registry: &'static str, id: String },

    /// The id is already taken.
    #[error("{registry} id '{id}' is already registered")]
    DuplicateId { registry: &'static str, id: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use causeway_property::prelude::*;
    pub use causeway_stack::prelude::*;

    pub use crate::config::{init_tracing, SessionConfig};
    pub use crate::event::{Emit, Event, EventSink, RecordingSink};
    pub use crate::registry::Registry;
    pub use crate::session::Session;
    pub use crate::statistic::{EntityStatistic, EntityType};
    pub use crate::RegistryError;
}
