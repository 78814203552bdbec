//! The cause stack manager.
//!
//! [`CauseStack`] owns three pieces of state:
//!
//! - the **cause stack**: objects in push order, optionally with a protected
//!   root at the bottom;
//! - the **context table**: typed values keyed by [`ContextKey`];
//! - the **frame stack**: checkpoints opened with
//!   [`push_cause_frame`](CauseStack::push_cause_frame) and closed in LIFO
//!   order with [`pop_cause_frame`](CauseStack::pop_cause_frame).
//!
//! # Frames
//!
//! Opening a frame records the current depth. Every context key touched while
//! the frame is the innermost one has its pre-frame value recorded the first
//! time it is touched. Closing the frame truncates the cause stack back to the
//! recorded depth and puts each touched key back the way it was, so the
//! cost of a close is proportional to what happened inside the frame, not to
//! the size of the table.
//!
//! # Neutrality
//!
//! Operations run through [`CauseStack::run`] are expected to leave the stack
//! exactly as they found it. With
//! [`StackConfig::verify_neutrality`](crate::config::StackConfig::verify_neutrality)
//! set, the shape of the stack is compared before and after, and any drift is
//! reported as [`StackError::DepthDrift`].
//!
//! # Threads
//!
//! A stack describes one logical thread of execution. It is mutated through
//! `&mut self` only; hand work to another thread by sending a
//! [`Cause`] snapshot, never the stack itself.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, trace, warn};

use crate::cause::{Cause, CauseEntry};
use crate::config::{StackConfig, ViolationPolicy};
use crate::context::{ContextKey, ContextValue, EventContext};
use crate::guard::FrameGuard;
use crate::operation::{ManualCleanupOperation, StackNeutralOperation};
use crate::{FrameMismatchKind, StackError};

// ---------------------------------------------------------------------------
// FrameHandle
// ---------------------------------------------------------------------------

/// Checkpoint returned by [`CauseStack::push_cause_frame`].
///
/// Pass it back to [`CauseStack::pop_cause_frame`] to close the frame. Prefer
/// [`CauseStack::frame`], which closes the frame on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "an open frame must be closed with `pop_cause_frame`"]
pub struct FrameHandle {
    stack: u64,
    id: u64,
    depth: usize,
}

impl FrameHandle {
    /// Unique id of the frame within its stack.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cause stack depth when the frame was opened.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ---------------------------------------------------------------------------
// FrameRecord
// ---------------------------------------------------------------------------

/// Bookkeeping for one open frame.
#[derive(Debug, Clone)]
struct FrameRecord {
    id: u64,
    depth: usize,
    /// Lowest depth reached below `depth` while the frame was open.
    breached: Option<usize>,
    /// Value of each touched key before its first touch inside this frame.
    /// `None` means the key was absent.
    saved: HashMap<&'static str, Option<ContextValue>>,
}

/// Full copy of the stack state taken before a verified operation.
struct Checkpoint {
    causes: Vec<CauseEntry>,
    context: EventContext,
    frames: Vec<FrameRecord>,
}

// ---------------------------------------------------------------------------
// CauseStack
// ---------------------------------------------------------------------------

/// Call-scoped stack of causes with scoped, typed context.
///
/// # Example
///
/// ```
/// use causeway_stack::prelude::*;
///
/// let mut stack = CauseStack::with_root("server", StackConfig::default());
/// stack.push_cause("a");
/// stack.push_cause("b");
///
/// let frame = stack.push_cause_frame();
/// stack.push_cause("c");
/// assert_eq!(stack.depth(), 4);
///
/// stack.pop_cause_frame(frame).unwrap();
/// assert_eq!(stack.depth(), 3);
/// assert_eq!(stack.pop_cause().unwrap().downcast_ref::<&str>(), Some(&"b"));
/// ```
#[derive(Debug)]
pub struct CauseStack {
    /// Process-unique id; handles from other stacks are rejected.
    id: u64,
    /// Causes in push order (oldest first).
    causes: Vec<CauseEntry>,
    /// Whether `causes[0]` is a protected root.
    rooted: bool,
    context: EventContext,
    frames: Vec<FrameRecord>,
    next_frame_id: u64,
    config: StackConfig,
}

impl CauseStack {
    /// Create an empty stack without a root cause.
    pub fn new(config: StackConfig) -> Self {
        static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(0);
        Self {
            id: NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed),
            causes: Vec::new(),
            rooted: false,
            context: EventContext::new(),
            frames: Vec::new(),
            next_frame_id: 0,
            config,
        }
    }

    /// Create a stack whose bottom entry is `root`. The root can never be popped.
    pub fn with_root<T: Any + Send + Sync>(root: T, config: StackConfig) -> Self {
        let mut stack = Self::new(config);
        stack.causes.push(CauseEntry::new(root));
        stack.rooted = true;
        stack
    }

    /// The configuration this stack was created with.
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Number of causes on the stack, root included.
    pub fn depth(&self) -> usize {
        self.causes.len()
    }

    /// Number of frames currently open.
    pub fn open_frames(&self) -> usize {
        self.frames.len()
    }

    /// Whether the bottom entry is a protected root.
    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    // -- causes -------------------------------------------------------------

    /// Push a cause.
    pub fn push_cause<T: Any + Send + Sync>(&mut self, cause: T) {
        self.push_entry(CauseEntry::new(cause));
    }

    /// Push an existing entry, e.g. one taken from a [`Cause`] snapshot.
    pub fn push_entry(&mut self, entry: CauseEntry) {
        self.causes.push(entry);
    }

    /// Remove and return the most recently pushed cause.
    ///
    /// Fails with [`StackError::RootCauseProtected`] when only the root is
    /// left and with [`StackError::EmptyStack`] when nothing is left.
    pub fn pop_cause(&mut self) -> Result<CauseEntry, StackError> {
        if self.rooted && self.causes.len() == 1 {
            return Err(StackError::RootCauseProtected);
        }
        self.warn_if_below_frame(1);
        self.causes.pop().ok_or(StackError::EmptyStack)
    }

    /// Remove the `count` most recent causes, returned most-recent-first.
    ///
    /// Nothing is removed if the pop would reach the root or underflow.
    pub fn pop_causes(&mut self, count: usize) -> Result<Vec<CauseEntry>, StackError> {
        let depth = self.causes.len();
        if self.rooted && count >= depth {
            return Err(StackError::RootCauseProtected);
        }
        if count > depth {
            return Err(StackError::EmptyStack);
        }
        self.warn_if_below_frame(count);
        let mut popped = self.causes.split_off(depth - count);
        popped.reverse();
        Ok(popped)
    }

    /// The most recently pushed cause.
    pub fn peek_cause(&self) -> Option<&CauseEntry> {
        self.causes.last()
    }

    /// Snapshot of the current causes and context, most-recent-first.
    pub fn current_cause(&self) -> Cause {
        Cause::from_stack(&self.causes, self.context.clone())
    }

    // -- context ------------------------------------------------------------

    /// Store `value` under `key`, returning the previous value.
    ///
    /// Fails with [`StackError::TypeMismatch`] if the key currently holds a
    /// value of another type; the table is left unchanged in that case.
    pub fn add_context<T>(&mut self, key: &ContextKey<T>, value: T) -> Result<Option<T>, StackError>
    where
        T: Any + Clone + Send + Sync,
    {
        let previous = match self.context.raw(key.id()) {
            Some(existing) => Some(existing.read::<T>(key.id())?),
            None => None,
        };
        self.record_touch(key.id());
        self.context.insert_raw(key.id(), ContextValue::new(value));
        Ok(previous)
    }

    /// The value stored under `key`, if any.
    pub fn get_context<T>(&self, key: &ContextKey<T>) -> Result<Option<T>, StackError>
    where
        T: Any + Clone + Send + Sync,
    {
        self.context.get(key)
    }

    /// The value stored under `key`, or [`StackError::MissingContext`].
    pub fn require_context<T>(&self, key: &ContextKey<T>) -> Result<T, StackError>
    where
        T: Any + Clone + Send + Sync,
    {
        self.context.require(key)
    }

    /// Remove and return the value stored under `key`.
    pub fn remove_context<T>(&mut self, key: &ContextKey<T>) -> Result<Option<T>, StackError>
    where
        T: Any + Clone + Send + Sync,
    {
        let Some(existing) = self.context.raw(key.id()) else {
            return Ok(None);
        };
        let value = existing.read::<T>(key.id())?;
        self.record_touch(key.id());
        self.context.remove_raw(key.id());
        Ok(Some(value))
    }

    /// The live context table.
    pub fn current_context(&self) -> &EventContext {
        &self.context
    }

    // -- frames -------------------------------------------------------------

    /// Open a frame and return its checkpoint.
    pub fn push_cause_frame(&mut self) -> FrameHandle {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        let depth = self.causes.len();
        self.frames.push(FrameRecord {
            id,
            depth,
            breached: None,
            saved: HashMap::new(),
        });
        trace!(frame = id, depth, "cause frame opened");
        FrameHandle {
            stack: self.id,
            id,
            depth,
        }
    }

    /// Close the frame identified by `handle`, restoring the cause depth and
    /// context it captured.
    ///
    /// Fails with [`StackError::FrameMismatch`] when `handle` is not the
    /// innermost open frame of this stack (the stack is left untouched), or
    /// when the stack was popped below the frame's checkpoint at any point
    /// while the frame was open (the frame is still closed and its context
    /// restored).
    ///
    /// Under [`ViolationPolicy::Recover`] an out-of-order close also closes
    /// every frame opened after `handle`, and all mismatches are logged
    /// instead of returned.
    pub fn pop_cause_frame(&mut self, handle: FrameHandle) -> Result<(), StackError> {
        let position = (handle.stack == self.id)
            .then(|| {
                self.frames
                    .iter()
                    .rposition(|f| f.id == handle.id && f.depth == handle.depth)
            })
            .flatten();
        let Some(position) = position else {
            return self.violation(StackError::FrameMismatch {
                frame: handle.id,
                kind: FrameMismatchKind::NoOpenFrame,
            });
        };

        let innermost = self.frames.len() - 1;
        if position != innermost {
            let err = StackError::FrameMismatch {
                frame: handle.id,
                kind: FrameMismatchKind::OutOfOrder {
                    expected: self.frames[innermost].id,
                },
            };
            match self.config.policy {
                ViolationPolicy::Strict => return Err(err),
                ViolationPolicy::Recover => {
                    error!(
                        error = %err,
                        closing = innermost - position,
                        "stack violation: closing inner frames first"
                    );
                    while self.frames.len() > position + 1 {
                        if let Some(inner) = self.frames.pop() {
                            self.restore(inner);
                        }
                    }
                }
            }
        }

        let depth = self.causes.len();
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        let checkpoint = frame.depth;
        let lowest = frame.breached.map_or(depth, |low| low.min(depth));
        self.restore(frame);

        if lowest < checkpoint {
            return self.violation(StackError::FrameMismatch {
                frame: handle.id,
                kind: FrameMismatchKind::DepthBelowCheckpoint {
                    depth: lowest,
                    checkpoint,
                },
            });
        }
        trace!(frame = handle.id, depth = checkpoint, "cause frame closed");
        Ok(())
    }

    /// Open a frame that closes when the returned guard is dropped.
    pub fn frame(&mut self) -> FrameGuard<'_> {
        FrameGuard::open(self)
    }

    /// Run `f` inside a fresh frame, closing it afterwards.
    ///
    /// The frame is closed even if `f` panics.
    pub fn with_frame<R>(&mut self, f: impl FnOnce(&mut CauseStack) -> R) -> Result<R, StackError> {
        let mut guard = self.frame();
        let output = f(&mut *guard);
        guard.close()?;
        Ok(output)
    }

    /// Report frames that are still open.
    pub fn check_leaks(&self) -> Result<(), StackError> {
        if self.frames.is_empty() {
            return Ok(());
        }
        Err(StackError::LeakedFrames {
            open: self.frames.iter().map(|f| f.id).collect(),
        })
    }

    /// Close every open frame, innermost first. Returns how many were closed.
    pub fn unwind_frames(&mut self) -> usize {
        let count = self.frames.len();
        while let Some(frame) = self.frames.pop() {
            warn!(frame = frame.id, depth = frame.depth, "force-closing leaked cause frame");
            self.restore(frame);
        }
        count
    }

    // -- operations ---------------------------------------------------------

    /// Run a stack-neutral operation.
    ///
    /// With neutrality verification on, the stack shape after `op` returns is
    /// compared with the shape before it ran. A difference is a
    /// [`StackError::DepthDrift`]: returned under `Strict`, and under
    /// `Recover` logged and undone by restoring the pre-operation state.
    pub fn run<Op: StackNeutralOperation>(&mut self, op: Op) -> Result<Op::Output, StackError> {
        if !self.config.verify_neutrality {
            return Ok(op.apply(self));
        }

        let operation = op.name();
        let checkpoint = self.checkpoint();
        let output = op.apply(self);

        let Some(err) = self.drift_since(&checkpoint, operation) else {
            return Ok(output);
        };
        match self.config.policy {
            ViolationPolicy::Strict => Err(err),
            ViolationPolicy::Recover => {
                error!(error = %err, "stack violation: restoring pre-operation state");
                self.rollback(checkpoint);
                Ok(output)
            }
        }
    }

    /// Run an operation that leaves residue, inside its own frame.
    pub fn run_in_frame<Op: ManualCleanupOperation>(
        &mut self,
        op: Op,
    ) -> Result<Op::Output, StackError> {
        let mut guard = self.frame();
        let output = guard.run_manual(op);
        guard.close()?;
        Ok(output)
    }

    // -- internal helpers ---------------------------------------------------

    /// Remember the pre-frame value of `id` the first time the innermost
    /// frame touches it.
    fn record_touch(&mut self, id: &'static str) {
        if let Some(frame) = self.frames.last_mut() {
            let context = &self.context;
            frame
                .saved
                .entry(id)
                .or_insert_with(|| context.raw(id).cloned());
        }
    }

    /// Undo everything `frame` recorded.
    fn restore(&mut self, frame: FrameRecord) {
        if self.causes.len() > frame.depth {
            debug!(
                frame = frame.id,
                residue = self.causes.len() - frame.depth,
                "discarding causes pushed inside frame"
            );
            self.causes.truncate(frame.depth);
        }
        for (id, original) in frame.saved {
            match original {
                Some(value) => {
                    self.context.insert_raw(id, value);
                }
                None => {
                    self.context.remove_raw(id);
                }
            }
        }
    }

    fn violation(&self, err: StackError) -> Result<(), StackError> {
        match self.config.policy {
            ViolationPolicy::Strict => Err(err),
            ViolationPolicy::Recover => {
                error!(error = %err, "stack violation recovered");
                Ok(())
            }
        }
    }

    /// Flag every open frame whose checkpoint a pop of `count` would cross.
    fn warn_if_below_frame(&mut self, count: usize) {
        let after = self.causes.len().saturating_sub(count);
        for frame in self.frames.iter_mut().filter(|f| after < f.depth) {
            frame.breached = Some(frame.breached.map_or(after, |low| low.min(after)));
        }
        if let Some(frame) = self.frames.last() {
            let depth = self.causes.len();
            if after < frame.depth {
                warn!(
                    frame = frame.id,
                    checkpoint = frame.depth,
                    depth,
                    count,
                    "popping causes pushed before the current frame was opened"
                );
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            causes: self.causes.clone(),
            context: self.context.clone(),
            frames: self.frames.clone(),
        }
    }

    fn drift_since(&self, checkpoint: &Checkpoint, operation: &'static str) -> Option<StackError> {
        let before = checkpoint.context.keys();
        let after = self.context.keys();
        let added_keys: Vec<_> = after.iter().filter(|k| !before.contains(k)).copied().collect();
        let removed_keys: Vec<_> = before.iter().filter(|k| !after.contains(k)).copied().collect();

        let unchanged = checkpoint.causes.len() == self.causes.len()
            && checkpoint.frames.len() == self.frames.len()
            && added_keys.is_empty()
            && removed_keys.is_empty();
        if unchanged {
            return None;
        }
        Some(StackError::DepthDrift {
            operation,
            entry_depth: checkpoint.causes.len(),
            exit_depth: self.causes.len(),
            entry_frames: checkpoint.frames.len(),
            exit_frames: self.frames.len(),
            added_keys,
            removed_keys,
        })
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.causes = checkpoint.causes;
        self.context = checkpoint.context;
        self.frames = checkpoint.frames;
    }
}

impl Default for CauseStack {
    fn default() -> Self {
        Self::new(StackConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
