//! Cause stack configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ViolationPolicy
// ---------------------------------------------------------------------------

/// What the stack does when it detects a frame mismatch or neutrality drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Return the error to the caller and leave the stack as found.
    Strict,
    /// Log the error, force the stack back to the last good checkpoint and
    /// carry on.
    Recover,
}

impl Default for ViolationPolicy {
    /// `Strict` in debug builds, `Recover` in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Recover
        }
    }
}

// ---------------------------------------------------------------------------
// StackConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`CauseStack`](crate::stack::CauseStack).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Check the stack shape around every
    /// [`run`](crate::stack::CauseStack::run) call.
    pub verify_neutrality: bool,
    /// How violations are handled.
    pub policy: ViolationPolicy,
    /// Report frames that are still open at a leak checkpoint.
    pub leak_check: bool,
}

impl Default for StackConfig {
    /// Verification and leak checks follow `debug_assertions`.
    fn default() -> Self {
        Self {
            verify_neutrality: cfg!(debug_assertions),
            policy: ViolationPolicy::default(),
            leak_check: cfg!(debug_assertions),
        }
    }
}

impl StackConfig {
    /// A config that verifies everything and returns every violation.
    pub fn strict() -> Self {
        Self {
            verify_neutrality: true,
            policy: ViolationPolicy::Strict,
            leak_check: true,
        }
    }

    /// A config that verifies everything but recovers from violations.
    pub fn recovering() -> Self {
        Self {
            verify_neutrality: true,
            policy: ViolationPolicy::Recover,
            leak_check: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
