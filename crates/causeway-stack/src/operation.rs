//! Stack-neutral and manual-cleanup operations.
//!
//! Code that touches the cause stack falls into two groups:
//!
//! - [`StackNeutralOperation`]: leaves the stack exactly as it found it. Run
//!   these with [`CauseStack::run`], which can verify the claim.
//! - [`ManualCleanupOperation`]: deliberately leaves causes or context behind
//!   for the caller to consume. These can only be run inside a frame, through
//!   [`FrameGuard::run_manual`](crate::guard::FrameGuard::run_manual) or
//!   [`CauseStack::run_in_frame`], so the residue is always cleaned up by the
//!   frame rather than by hand.
//!
//! Closures are adapted with [`neutral`] and [`manual`].

use std::marker::PhantomData;

use crate::stack::CauseStack;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// An operation that restores the stack before returning.
pub trait StackNeutralOperation {
    /// The operation's result.
    type Output;

    /// Name used in drift reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Run the operation.
    fn apply(self, stack: &mut CauseStack) -> Self::Output;
}

/// An operation that leaves residue on the stack for its caller.
pub trait ManualCleanupOperation {
    /// The operation's result.
    type Output;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Run the operation.
    fn apply(self, stack: &mut CauseStack) -> Self::Output;
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// A closure declared stack neutral. Built with [`neutral`].
pub struct Neutral<F, R> {
    name: &'static str,
    f: F,
    _output: PhantomData<fn() -> R>,
}

/// Declare a closure stack neutral.
pub fn neutral<F, R>(name: &'static str, f: F) -> Neutral<F, R>
where
    F: FnOnce(&mut CauseStack) -> R,
{
    Neutral {
        name,
        f,
        _output: PhantomData,
    }
}

impl<F, R> StackNeutralOperation for Neutral<F, R>
where
    F: FnOnce(&mut CauseStack) -> R,
{
    type Output = R;

    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(self, stack: &mut CauseStack) -> R {
        (self.f)(stack)
    }
}

/// A closure that leaves residue. Built with [`manual`].
pub struct Manual<F, R> {
    name: &'static str,
    f: F,
    _output: PhantomData<fn() -> R>,
}

/// Declare a closure as leaving residue for its caller.
pub fn manual<F, R>(name: &'static str, f: F) -> Manual<F, R>
where
    F: FnOnce(&mut CauseStack) -> R,
{
    Manual {
        name,
        f,
        _output: PhantomData,
    }
}

impl<F, R> ManualCleanupOperation for Manual<F, R>
where
    F: FnOnce(&mut CauseStack) -> R,
{
    type Output = R;

    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(self, stack: &mut CauseStack) -> R {
        (self.f)(stack)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
