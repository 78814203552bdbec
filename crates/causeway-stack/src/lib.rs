//! Causeway Stack -- call-scoped cause attribution with scoped context.
//!
//! This crate provides the [`CauseStack`](stack::CauseStack): an ordered stack
//! of "cause" objects plus a table of typed context values. Code that triggers
//! an externally observable action pushes whatever is responsible for it, and
//! whoever emits the resulting event reads [`Cause`](cause::Cause) snapshots
//! back off the stack, regardless of how many unrelated layers sit in between.
//!
//! Mutations are bounded by frames. A frame records the stack depth and the
//! context keys it touched; closing it restores both, in strict LIFO order.
//!
//! # Quick Start
//!
//! ```
//! use causeway_stack::prelude::*;
//!
//! const SOURCE: ContextKey<String> = ContextKey::new("source");
//!
//! let mut stack = CauseStack::with_root("server", StackConfig::default());
//! stack.push_cause("player");
//!
//! {
//!     let mut frame = stack.frame();
//!     frame.push_cause("tnt");
//!     frame.add_context(&SOURCE, "fuse".to_owned()).unwrap();
//!
//!     let cause = frame.current_cause();
//!     assert_eq!(cause.first::<&str>(), Some(&"tnt"));
//!     assert_eq!(cause.context().get(&SOURCE).unwrap().as_deref(), Some("fuse"));
//! }
//!
//! // The frame closed on drop: "tnt" and the context entry are gone.
//! assert_eq!(stack.depth(), 2);
//! assert_eq!(stack.get_context(&SOURCE).unwrap(), None);
//! ```

#![deny(unsafe_code)]

pub mod cause;
pub mod config;
pub mod context;
pub mod guard;
pub mod operation;
pub mod stack;

use std::fmt;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a frame could not be closed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMismatchKind {
    /// The frame is open but is not the most recently opened one.
    OutOfOrder {
        /// The frame that has to be closed first.
        expected: u64,
    },
    /// The cause stack was popped below the depth the frame was opened at.
    DepthBelowCheckpoint {
        /// Lowest depth reached while the frame was open.
        depth: usize,
        /// Depth recorded when the frame was opened.
        checkpoint: usize,
    },
    /// No open frame carries this id (already closed, or from another stack).
    NoOpenFrame,
}

impl fmt::Display for FrameMismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder { expected } => {
                write!(f, "frame {expected} must be closed first")
            }
            Self::DepthBelowCheckpoint { depth, checkpoint } => write!(
                f,
                "stack depth {depth} is below the frame checkpoint {checkpoint}"
            ),
            Self::NoOpenFrame => write!(f, "frame is not open"),
        }
    }
}

/// Stack-discipline violations raised by [`CauseStack`](stack::CauseStack).
///
/// Every variant indicates a bug in the caller, not bad user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// `pop_cause` was called on a stack with no entries.
    #[error("cannot pop a cause from an empty stack")]
    EmptyStack,

    /// The pop would remove the protected root cause.
    #[error("the root cause cannot be popped")]
    RootCauseProtected,

    /// A frame was closed out of LIFO order or after the stack was corrupted.
    #[error("cannot close frame {frame}: {kind}")]
    FrameMismatch {
        frame: u64,
        kind: FrameMismatchKind,
    },

    /// A context key was stored under one type and read back as another.
    #[error("context key '{key}' holds a {found}, not a {expected}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A required context key was absent.
    #[error("context key '{key}' is not set")]
    MissingContext {
        key: &'static str,
    },

    /// A stack-neutral operation returned with a different stack shape.
    #[error(
        "operation '{operation}' is not stack neutral: depth {entry_depth} -> {exit_depth}, \
         frames {entry_frames} -> {exit_frames}, added keys {added_keys:?}, removed keys {removed_keys:?}"
    )]
    DepthDrift {
        operation: &'static str,
        entry_depth: usize,
        exit_depth: usize,
        entry_frames: usize,
        exit_frames: usize,
        added_keys: Vec<&'static str>,
        removed_keys: Vec<&'static str>,
    },

    /// Frames were still open at a leak checkpoint.
    #[error("{} frame(s) left open: {open:?}", open.len())]
    LeakedFrames {
        open: Vec<u64>,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::cause::{Cause, CauseEntry};
    pub use crate::config::{StackConfig, ViolationPolicy};
    pub use crate::context::{ContextKey, EventContext};
    pub use crate::guard::FrameGuard;
    pub use crate::operation::{
        manual, neutral, Manual, ManualCleanupOperation, Neutral, StackNeutralOperation,
    };
    pub use crate::stack::{CauseStack, FrameHandle};
    pub use crate::{FrameMismatchKind, StackError};
}
