//! Causeway Property -- typed property descriptors over loosely typed input.
//!
//! A [`PropertyDescriptor`](descriptor::PropertyDescriptor) pairs a strongly
//! typed [`PropertyValue`](value::PropertyValue) with an
//! [`Operator`](operator::Operator). Raw input, a [`serde_json::Value`], is
//! converted by per-type coercion rules held in a
//! [`CoercionTable`](coerce::CoercionTable), both when the descriptor is
//! built and when candidates are matched against it.
//!
//! Building reports bad input through [`PropertyError`]. Matching never
//! fails: a candidate that cannot be coerced simply does not match, so a scan
//! over a heterogeneous collection is never aborted by one odd item.
//!
//! # Quick Start
//!
//! ```
//! use causeway_property::prelude::*;
//! use serde_json::json;
//!
//! let facing_north = PropertyDescriptor::builder(ValueType::SlotSide)
//!     .value("north")
//!     .operator(Operator::Equal)
//!     .build()
//!     .unwrap();
//!
//! assert!(facing_north.matches(&json!("NORTH")));
//! assert!(!facing_north.matches(&json!("banana")));
//! ```

#![deny(unsafe_code)]

pub mod coerce;
pub mod descriptor;
pub mod operator;
pub mod value;

use value::ValueType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while building or comparing descriptors.
///
/// None of these escape [`matches`](descriptor::PropertyDescriptor::matches).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The raw value could not be coerced to the descriptor's type.
    #[error("invalid {value_type} value: {reason}")]
    InvalidValue {
        value_type: ValueType,
        reason: String,
    },

    /// `build` was called before an operator was set.
    #[error("no operator set for {value_type} descriptor")]
    MissingOperator { value_type: ValueType },

    /// The values have no common order.
    #[error("cannot compare {left} with {right}: {reason}")]
    NotComparable {
        left: ValueType,
        right: ValueType,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::coerce::{CoercionRule, CoercionTable};
    pub use crate::descriptor::{matches_all, PropertyBuilder, PropertyDescriptor};
    pub use crate::operator::Operator;
    pub use crate::value::{Direction, PropertyValue, ValueType, Vector2i};
    pub use crate::PropertyError;
}
