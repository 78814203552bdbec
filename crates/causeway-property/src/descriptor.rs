//! Property descriptors and their builder.
//!
//! A [`PropertyDescriptor`] is an immutable `(value, operator)` pair. It is
//! built from loosely typed input through a [`PropertyBuilder`] and then used
//! as a predicate over more loosely typed input:
//!
//! ```
//! use causeway_property::prelude::*;
//!
//! let at_least = PropertyDescriptor::builder(ValueType::SlotPos)
//!     .value(Vector2i::new(2, 3))
//!     .operator(Operator::GreaterOrEqual)
//!     .build()
//!     .unwrap();
//!
//! assert!(at_least.matches(&serde_json::json!([3, 0])));
//! assert!(!at_least.matches(&serde_json::json!("not a vector")));
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::coerce::{CoercionRule, CoercionTable};
use crate::operator::Operator;
use crate::value::{PropertyValue, ValueType};
use crate::PropertyError;

// ---------------------------------------------------------------------------
// PropertyDescriptor
// ---------------------------------------------------------------------------

/// An immutable typed value plus the operator used to test candidates
/// against it.
#[derive(Clone)]
pub struct PropertyDescriptor {
    key: String,
    value: PropertyValue,
    operator: Operator,
    coercion: CoercionRule,
}

impl PropertyDescriptor {
    /// Start building a descriptor of `value_type` with the standard coercion
    /// rules.
    pub fn builder(value_type: ValueType) -> PropertyBuilder {
        PropertyBuilder::new(value_type, CoercionTable::standard().rule(value_type))
    }

    /// Start building a descriptor of `value_type` with the rule `table` has
    /// for it.
    pub fn builder_with(table: &CoercionTable, value_type: ValueType) -> PropertyBuilder {
        PropertyBuilder::new(value_type, table.rule(value_type))
    }

    /// Name of the property. Defaults to the value type's name.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Compare this descriptor's value with `other`'s.
    ///
    /// An absent `other` orders below any descriptor. Descriptors of different
    /// value types, or of a type without a natural order, are not comparable.
    pub fn compare_to(&self, other: Option<&PropertyDescriptor>) -> Result<Ordering, PropertyError> {
        let Some(other) = other else {
            return Ok(Ordering::Greater);
        };
        let (left, right) = (self.value_type(), other.value_type());
        if left != right {
            return Err(PropertyError::NotComparable {
                left,
                right,
                reason: "value types differ".to_owned(),
            });
        }
        self.value
            .natural_cmp(&other.value)
            .ok_or_else(|| PropertyError::NotComparable {
                left,
                right,
                reason: format!("{left} values support equality only"),
            })
    }

    /// Whether `candidate`, coerced by this descriptor's rule, satisfies
    /// `candidate <operator> value`.
    ///
    /// Never fails: input the rule cannot represent does not match.
    pub fn matches(&self, candidate: &Value) -> bool {
        match (*self.coercion)(candidate) {
            Some(value) => self.matches_value(&value),
            None => {
                trace!(
                    key = %self.key,
                    value_type = %self.value_type(),
                    candidate = %candidate,
                    "candidate not coercible; no match"
                );
                false
            }
        }
    }

    /// Like [`matches`](Self::matches) for an already typed value. A value
    /// of a different type does not match.
    pub fn matches_value(&self, candidate: &PropertyValue) -> bool {
        if candidate.value_type() != self.value_type() {
            return false;
        }
        if !self.operator.is_ordering() {
            let ordering = if *candidate == self.value {
                Ordering::Equal
            } else {
                Ordering::Less
            };
            return self.operator.evaluate(ordering);
        }
        candidate
            .natural_cmp(&self.value)
            .is_some_and(|ordering| self.operator.evaluate(ordering))
    }

    /// Apply this descriptor's operator to another descriptor's value.
    ///
    /// An absent candidate orders below this descriptor's value, so it
    /// satisfies `NOT_EQUAL`, `LESS` and `LESS_OR_EQUAL` only.
    pub fn matches_descriptor(&self, candidate: Option<&PropertyDescriptor>) -> bool {
        match candidate {
            Some(other) => self.matches_value(&other.value),
            None => self.operator.evaluate(Ordering::Less),
        }
    }

    /// Items whose projection matches.
    pub fn filter<'a, T, I, F>(&'a self, items: I, project: F) -> impl Iterator<Item = T> + 'a
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
        T: 'a,
        F: Fn(&T) -> Value + 'a,
    {
        items
            .into_iter()
            .filter(move |item| self.matches(&project(item)))
    }

    /// The first item whose projection matches.
    pub fn find_first<T, I, F>(&self, items: I, project: F) -> Option<T>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> Value,
    {
        items.into_iter().find(|item| self.matches(&project(item)))
    }
}

/// Whether `candidate` satisfies every descriptor. True for an empty set.
pub fn matches_all<'a, I>(descriptors: I, candidate: &Value) -> bool
where
    I: IntoIterator<Item = &'a PropertyDescriptor>,
{
    descriptors.into_iter().all(|d| d.matches(candidate))
}

impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value && self.operator == other.operator
    }
}

impl Eq for PropertyDescriptor {}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.operator.symbol(), self.value)
    }
}

// ---------------------------------------------------------------------------
// PropertyBuilder
// ---------------------------------------------------------------------------

/// Mutable scratch state for a [`PropertyDescriptor`].
///
/// Setters take `&mut self` so one builder can be configured, built, tweaked
/// and built again. Each [`build`](Self::build) produces an independent
/// descriptor.
#[derive(Clone)]
pub struct PropertyBuilder {
    value_type: ValueType,
    rule: Option<CoercionRule>,
    key: Option<String>,
    raw: Option<Value>,
    operator: Option<Operator>,
}

impl PropertyBuilder {
    fn new(value_type: ValueType, rule: Option<CoercionRule>) -> Self {
        Self {
            value_type,
            rule,
            key: None,
            raw: None,
            operator: None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Set the raw value. Coercion happens at build time.
    pub fn value(&mut self, raw: impl Into<Value>) -> &mut Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn operator(&mut self, operator: Operator) -> &mut Self {
        self.operator = Some(operator);
        self
    }

    pub fn key(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = Some(key.into());
        self
    }

    /// Copy value, operator and key from an existing descriptor.
    ///
    /// The value goes back through this builder's coercion rule on build, so
    /// copying across value types reports the mismatch then.
    pub fn copy_from(&mut self, descriptor: &PropertyDescriptor) -> &mut Self {
        self.raw = Some(descriptor.value.to_raw());
        self.operator = Some(descriptor.operator);
        self.key = Some(descriptor.key.clone());
        self
    }

    /// Back to the empty state. The value type and rule are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.raw = None;
        self.operator = None;
        self.key = None;
        self
    }

    /// Produce a descriptor from the current state.
    pub fn build(&self) -> Result<PropertyDescriptor, PropertyError> {
        let value_type = self.value_type;
        let invalid = |reason: String| PropertyError::InvalidValue { value_type, reason };

        let rule = self
            .rule
            .clone()
            .ok_or_else(|| invalid("no coercion rule registered".to_owned()))?;
        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| invalid("no value set".to_owned()))?;
        let value = (*rule)(raw).ok_or_else(|| invalid(format!("cannot coerce {raw}")))?;

        let operator = self
            .operator
            .ok_or(PropertyError::MissingOperator { value_type })?;
        if operator.is_ordering() && !value_type.is_ordered() {
            return Err(PropertyError::NotComparable {
                left: value_type,
                right: value_type,
                reason: format!("operator {operator} needs an ordering"),
            });
        }

        Ok(PropertyDescriptor {
            key: self
                .key
                .clone()
                .unwrap_or_else(|| value_type.to_string()),
            value,
            operator,
            coercion: rule,
        })
    }
}

impl fmt::Debug for PropertyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBuilder")
            .field("value_type", &self.value_type)
            .field("key", &self.key)
            .field("raw", &self.raw)
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Direction, Vector2i};
    use serde_json::json;

    fn slot_pos(op: Operator) -> PropertyDescriptor {
        PropertyDescriptor::builder(ValueType::SlotPos)
            .value(Vector2i::new(2, 3))
            .operator(op)
            .build()
            .unwrap()
    }

    // -- builder ---------------------------------------------------------

    #[test]
    fn build_without_operator_fails() {
        let err = PropertyDescriptor::builder(ValueType::Text)
            .value("x")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::MissingOperator {
                value_type: ValueType::Text
            }
        );
    }

    #[test]
    fn build_without_value_fails() {
        let err = PropertyDescriptor::builder(ValueType::Integer)
            .operator(Operator::Equal)
            .build()
            .unwrap_err();
        assert!(matches!(err, PropertyError::InvalidValue { value_type: ValueType::Integer, .. }));
    }

    #[test]
    fn build_with_uncoercible_value_fails() {
        let err = PropertyDescriptor::builder(ValueType::SlotPos)
            .value("left")
            .operator(Operator::Equal)
            .build()
            .unwrap_err();
        assert!(matches!(err, PropertyError::InvalidValue { .. }));
    }

    #[test]
    fn ordering_on_identifiers_is_rejected_at_build() {
        let err = PropertyDescriptor::builder(ValueType::Identifier)
            .value("chest")
            .operator(Operator::Less)
            .build()
            .unwrap_err();
        assert!(matches!(err, PropertyError::NotComparable { .. }));
    }

    #[test]
    fn build_is_repeatable_and_independent() {
        let mut builder = PropertyDescriptor::builder(ValueType::Integer);
        builder.value(5).operator(Operator::Equal);
        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first, second);

        builder.value(6);
        let third = builder.build().unwrap();
        assert_eq!(first.value(), &PropertyValue::Integer(5));
        assert_eq!(third.value(), &PropertyValue::Integer(6));
    }

    #[test]
    fn reset_clears_state() {
        let mut builder = PropertyDescriptor::builder(ValueType::Text);
        builder.value("a").operator(Operator::Equal).key("name");
        builder.reset();
        assert!(builder.build().is_err());
        assert_eq!(builder.value_type(), ValueType::Text);
    }

    #[test]
    fn copy_from_duplicates_descriptor() {
        let original = PropertyDescriptor::builder(ValueType::SlotSide)
            .value("up")
            .operator(Operator::NotEqual)
            .key("side")
            .build()
            .unwrap();
        let copy = PropertyDescriptor::builder(ValueType::SlotSide)
            .copy_from(&original)
            .build()
            .unwrap();
        assert_eq!(copy, original);
    }

    #[test]
    fn key_defaults_to_type_name() {
        assert_eq!(slot_pos(Operator::Equal).key(), "slot_pos");
    }

    #[test]
    fn missing_rule_is_invalid_value() {
        let err = PropertyDescriptor::builder_with(&CoercionTable::empty(), ValueType::Text)
            .value("a")
            .operator(Operator::Equal)
            .build()
            .unwrap_err();
        assert!(matches!(err, PropertyError::InvalidValue { .. }));
    }

    // -- compare_to ------------------------------------------------------

    #[test]
    fn compare_to_absent_is_greater() {
        assert_eq!(slot_pos(Operator::Equal).compare_to(None), Ok(Ordering::Greater));
    }

    #[test]
    fn compare_to_uses_natural_order() {
        let small = PropertyDescriptor::builder(ValueType::SlotPos)
            .value(Vector2i::new(1, 9))
            .operator(Operator::Equal)
            .build()
            .unwrap();
        let big = slot_pos(Operator::Equal);
        assert_eq!(small.compare_to(Some(&big)), Ok(Ordering::Less));
        assert_eq!(big.compare_to(Some(&small)), Ok(Ordering::Greater));
    }

    #[test]
    fn compare_to_rejects_other_types_and_unordered() {
        let text = PropertyDescriptor::builder(ValueType::Text)
            .value("a")
            .operator(Operator::Equal)
            .build()
            .unwrap();
        assert!(matches!(
            slot_pos(Operator::Equal).compare_to(Some(&text)),
            Err(PropertyError::NotComparable { .. })
        ));

        let id = PropertyDescriptor::builder(ValueType::Identifier)
            .value("a")
            .operator(Operator::Equal)
            .build()
            .unwrap();
        assert!(matches!(
            id.compare_to(Some(&id)),
            Err(PropertyError::NotComparable { .. })
        ));
    }

    // -- matches ---------------------------------------------------------

    #[test]
    fn slot_pos_greater_or_equal() {
        let d = slot_pos(Operator::GreaterOrEqual);
        assert!(d.matches(&json!([2, 3])));
        assert!(!d.matches(&json!([1, 9])));
        assert!(d.matches(&json!({"x": 3, "y": 0})));
    }

    #[test]
    fn direction_with_fallback() {
        let d = PropertyDescriptor::builder(ValueType::SlotSide)
            .value("north")
            .operator(Operator::Equal)
            .build()
            .unwrap();
        assert_eq!(d.value(), &PropertyValue::SlotSide(Direction::North));
        assert!(d.matches(&json!("NORTH")));
        assert!(!d.matches(&json!("banana")));
    }

    #[test]
    fn uncoercible_candidates_do_not_match() {
        let d = PropertyDescriptor::builder(ValueType::Integer)
            .value(3)
            .operator(Operator::NotEqual)
            .build()
            .unwrap();
        assert!(!d.matches(&json!(null)));
        assert!(!d.matches(&json!({"a": 1})));
        assert!(d.matches(&json!("4")));
    }

    #[test]
    fn equal_max_integer_rejects_larger_unsigned() {
        let d = PropertyDescriptor::builder(ValueType::Integer)
            .value(i64::MAX)
            .operator(Operator::Equal)
            .build()
            .unwrap();
        assert!(d.matches(&json!(i64::MAX)));
        assert!(!d.matches(&json!(9_223_372_036_854_775_808u64)));
        assert!(!d.matches(&json!(u64::MAX)));
    }

    #[test]
    fn identifiers_match_on_equality() {
        let d = PropertyDescriptor::builder(ValueType::Identifier)
            .value("minecraft:chest")
            .operator(Operator::Equal)
            .build()
            .unwrap();
        assert!(d.matches(&json!("minecraft:chest")));
        assert!(!d.matches(&json!("minecraft:barrel")));
    }

    #[test]
    fn matches_value_rejects_other_types() {
        let d = slot_pos(Operator::NotEqual);
        assert!(!d.matches_value(&PropertyValue::Integer(1)));
    }

    #[test]
    fn descriptor_against_descriptor() {
        let at_least = slot_pos(Operator::GreaterOrEqual);
        let other = PropertyDescriptor::builder(ValueType::SlotPos)
            .value(Vector2i::new(5, 5))
            .operator(Operator::Equal)
            .build()
            .unwrap();
        assert!(at_least.matches_descriptor(Some(&other)));
        assert!(!at_least.matches_descriptor(None));
        assert!(slot_pos(Operator::Less).matches_descriptor(None));
    }

    // -- collections -----------------------------------------------------

    #[test]
    fn filter_and_find_first() {
        let items = vec![("a", 1), ("b", 5), ("c", 9)];
        let d = PropertyDescriptor::builder(ValueType::Integer)
            .value(5)
            .operator(Operator::GreaterOrEqual)
            .build()
            .unwrap();

        let names: Vec<_> = d.filter(items.iter(), |(_, n)| json!(n)).map(|(s, _)| *s).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(d.find_first(items.iter(), |(_, n)| json!(n)), Some(&("b", 5)));
    }

    #[test]
    fn matches_all_requires_every_descriptor() {
        let low = PropertyDescriptor::builder(ValueType::Integer)
            .value(1)
            .operator(Operator::Greater)
            .build()
            .unwrap();
        let high = PropertyDescriptor::builder(ValueType::Integer)
            .value(10)
            .operator(Operator::Less)
            .build()
            .unwrap();
        assert!(matches_all([&low, &high], &json!(5)));
        assert!(!matches_all([&low, &high], &json!(10)));
        assert!(matches_all(Vec::<&PropertyDescriptor>::new(), &json!("anything")));
    }
}
