//! Scoped frames.
//!
//! [`FrameGuard`] opens a frame on creation and closes it when dropped, so the
//! frame is released on every exit path: early return, `?`, or a panic
//! unwinding through the scope. It dereferences to the [`CauseStack`] it
//! guards, so code inside the scope uses the stack as usual.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::operation::ManualCleanupOperation;
use crate::stack::{CauseStack, FrameHandle};
use crate::StackError;

/// A frame that closes itself on drop.
///
/// ```
/// use causeway_stack::prelude::*;
///
/// let mut stack = CauseStack::with_root("server", StackConfig::default());
/// {
///     let mut frame = stack.frame();
///     frame.push_cause("inside");
///     assert_eq!(frame.depth(), 2);
/// }
/// assert_eq!(stack.depth(), 1);
/// ```
#[must_use = "dropping the guard closes the frame immediately"]
pub struct FrameGuard<'s> {
    stack: &'s mut CauseStack,
    handle: Option<FrameHandle>,
}

impl<'s> FrameGuard<'s> {
    pub(crate) fn open(stack: &'s mut CauseStack) -> Self {
        let handle = stack.push_cause_frame();
        Self {
            stack,
            handle: Some(handle),
        }
    }

    /// The checkpoint of the guarded frame.
    pub fn handle(&self) -> Option<FrameHandle> {
        self.handle
    }

    /// Run an operation that leaves residue on the stack. The residue is
    /// cleared when this guard closes.
    pub fn run_manual<Op: ManualCleanupOperation>(&mut self, op: Op) -> Op::Output {
        op.apply(&mut *self.stack)
    }

    /// Close the frame now and report any mismatch, instead of logging it on
    /// drop.
    pub fn close(mut self) -> Result<(), StackError> {
        match self.handle.take() {
            Some(handle) => self.stack.pop_cause_frame(handle),
            None => Ok(()),
        }
    }
}

impl Deref for FrameGuard<'_> {
    type Target = CauseStack;

    fn deref(&self) -> &CauseStack {
        &*self.stack
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut CauseStack {
        &mut *self.stack
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.stack.pop_cause_frame(handle) {
                warn!(frame = handle.id(), error = %e, "cause frame closed with an error on drop");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::context::ContextKey;
    use crate::operation::manual;

    const TAG: ContextKey<&'static str> = ContextKey::new("tag");

    fn stack() -> CauseStack {
        CauseStack::with_root("server", StackConfig::strict())
    }

    #[test]
    fn guard_closes_on_drop() {
        let mut stack = stack();
        {
            let mut frame = stack.frame();
            frame.push_cause("a");
            frame.add_context(&TAG, "x").unwrap();
        }
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.open_frames(), 0);
        assert_eq!(stack.get_context(&TAG).unwrap(), None);
    }

    #[test]
    fn guards_nest() {
        let mut stack = stack();
        let mut outer = stack.frame();
        outer.push_cause("a");
        {
            let mut inner = outer.frame();
            inner.push_cause("b");
            assert_eq!(inner.open_frames(), 2);
        }
        assert_eq!(outer.depth(), 2);
        outer.close().unwrap();
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn guard_closes_during_unwinding() {
        let mut stack = stack();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut frame = stack.frame();
            frame.push_cause("doomed");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.open_frames(), 0);
    }

    #[test]
    fn manual_operation_residue_is_cleared() {
        let mut stack = stack();
        {
            let mut frame = stack.frame();
            frame.run_manual(manual("prime", |s: &mut CauseStack| {
                s.push_cause("primer");
                s.add_context(&TAG, "primed").unwrap();
            }));
            assert_eq!(frame.get_context(&TAG).unwrap(), Some("primed"));
        }
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.get_context(&TAG).unwrap(), None);
    }

    #[test]
    fn close_reports_mismatch() {
        let mut stack = stack();
        let mut frame = stack.frame();
        // A frame opened behind the guard's back.
        let leaked = frame.push_cause_frame();
        let err = {
            let handle = frame.handle().unwrap();
            frame.pop_cause_frame(handle).unwrap_err()
        };
        assert!(matches!(err, StackError::FrameMismatch { .. }));
        frame.pop_cause_frame(leaked).unwrap();
        frame.close().unwrap();
        assert_eq!(stack.open_frames(), 0);
    }
}
