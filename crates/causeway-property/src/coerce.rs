//! Coercion of loosely typed input into [`PropertyValue`]s.
//!
//! Callers hand properties whatever they have: a string from a command, a
//! number from a config file, a JSON object from a script. Input is a
//! [`serde_json::Value`]; a coercion rule either produces a value of its
//! target type or reports the input as unrepresentable with `None`.
//!
//! Rules are looked up per [`ValueType`] in a [`CoercionTable`]. The table is
//! a plain value: build one, adjust it, and pass it to
//! [`PropertyDescriptor::builder_with`](crate::descriptor::PropertyDescriptor::builder_with).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use strum::IntoEnumIterator;

use crate::value::{Direction, PropertyValue, ValueType, Vector2i};

/// A coercion rule for one value type.
pub type CoercionRule = Arc<dyn Fn(&Value) -> Option<PropertyValue> + Send + Sync>;

// ---------------------------------------------------------------------------
// Scalar coercions
// ---------------------------------------------------------------------------

/// Strings as-is; numbers and booleans in their canonical text form.
pub fn to_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Integers, integral floats, and strings holding an integer.
pub fn to_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            let integral = f.is_finite() && f.fract() == 0.0;
            // `i64::MAX as f64` rounds up to 2^63, which is out of range.
            let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
            (integral && in_range).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_i32(raw: &Value) -> Option<i32> {
    to_integer(raw).and_then(|n| i32::try_from(n).ok())
}

/// Vectors from `{"x": .., "y": ..}`, `[x, y]`, or text such as `"2,3"`,
/// `"(2, 3)"` and `"[2, 3]"`.
pub fn to_vector2i(raw: &Value) -> Option<Vector2i> {
    match raw {
        Value::Object(map) => {
            if map.len() != 2 {
                return None;
            }
            Some(Vector2i::new(to_i32(map.get("x")?)?, to_i32(map.get("y")?)?))
        }
        Value::Array(items) => match items.as_slice() {
            [x, y] => Some(Vector2i::new(to_i32(x)?, to_i32(y)?)),
            _ => None,
        },
        Value::String(s) => parse_vector2i(s),
        _ => None,
    }
}

fn parse_vector2i(text: &str) -> Option<Vector2i> {
    let text = text.trim();
    let inner = [('(', ')'), ('[', ']'), ('{', '}')]
        .iter()
        .find_map(|&(open, close)| text.strip_prefix(open)?.strip_suffix(close))
        .unwrap_or(text);
    let (x, y) = inner.split_once(',')?;
    Some(Vector2i::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Enum values by case-insensitive name or by ordinal; anything else,
/// including unknown names and out-of-range ordinals, becomes `fallback`.
pub fn to_enum<E>(raw: &Value, fallback: E) -> E
where
    E: FromStr + IntoEnumIterator,
{
    match raw {
        Value::String(s) => s.trim().parse().unwrap_or(fallback),
        Value::Number(n) => n
            .as_u64()
            .and_then(|ordinal| usize::try_from(ordinal).ok())
            .and_then(|ordinal| E::iter().nth(ordinal))
            .unwrap_or(fallback),
        _ => fallback,
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Rule for [`ValueType::Text`].
pub fn text_rule() -> CoercionRule {
    Arc::new(|raw| to_text(raw).map(PropertyValue::Text))
}

/// Rule for [`ValueType::Integer`].
pub fn integer_rule() -> CoercionRule {
    Arc::new(|raw| to_integer(raw).map(PropertyValue::Integer))
}

/// Rule for [`ValueType::SlotPos`].
pub fn slot_pos_rule() -> CoercionRule {
    Arc::new(|raw| to_vector2i(raw).map(PropertyValue::SlotPos))
}

/// Rule for [`ValueType::SlotSide`]. Total: unrecognised input becomes
/// `fallback`.
pub fn slot_side_rule(fallback: Direction) -> CoercionRule {
    Arc::new(move |raw| Some(PropertyValue::SlotSide(to_enum(raw, fallback))))
}

/// Rule for [`ValueType::Identifier`]: non-empty strings, or integers in
/// decimal form.
pub fn identifier_rule() -> CoercionRule {
    Arc::new(|raw| match raw {
        Value::String(s) if !s.is_empty() => Some(PropertyValue::Identifier(s.clone())),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            Some(PropertyValue::Identifier(n.to_string()))
        }
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// CoercionTable
// ---------------------------------------------------------------------------

/// Coercion rules keyed by target [`ValueType`].
#[derive(Clone)]
pub struct CoercionTable {
    rules: HashMap<ValueType, CoercionRule>,
}

impl CoercionTable {
    /// A table with no rules.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The built-in rules. Slot sides fall back to [`Direction::None`].
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(ValueType::Text, text_rule())
            .with_rule(ValueType::Integer, integer_rule())
            .with_rule(ValueType::SlotPos, slot_pos_rule())
            .with_rule(ValueType::SlotSide, slot_side_rule(Direction::None))
            .with_rule(ValueType::Identifier, identifier_rule())
    }

    /// Replace the rule for `value_type`.
    pub fn with_rule(mut self, value_type: ValueType, rule: CoercionRule) -> Self {
        self.set_rule(value_type, rule);
        self
    }

    /// Replace the rule for `value_type` in place.
    pub fn set_rule(&mut self, value_type: ValueType, rule: CoercionRule) {
        self.rules.insert(value_type, rule);
    }

    /// Use `fallback` for unrecognised slot sides.
    pub fn with_direction_fallback(self, fallback: Direction) -> Self {
        self.with_rule(ValueType::SlotSide, slot_side_rule(fallback))
    }

    /// The rule registered for `value_type`.
    ///
    /// The returned rule only yields values of `value_type`; anything else a
    /// misbehaving plugged-in rule produces is treated as unrepresentable.
    pub fn rule(&self, value_type: ValueType) -> Option<CoercionRule> {
        let inner = Arc::clone(self.rules.get(&value_type)?);
        Some(Arc::new(move |raw: &Value| {
            (*inner)(raw).filter(|v| v.value_type() == value_type)
        }))
    }

    /// Coerce `raw` to `value_type`.
    pub fn coerce(&self, value_type: ValueType, raw: &Value) -> Option<PropertyValue> {
        let rule = self.rules.get(&value_type)?;
        (**rule)(raw).filter(|v| v.value_type() == value_type)
    }

    /// Whether a rule is registered for `value_type`.
    pub fn supports(&self, value_type: ValueType) -> bool {
        self.rules.contains_key(&value_type)
    }
}

impl Default for CoercionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CoercionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.rules.keys().map(|t| t.as_ref()).collect();
        types.sort_unstable();
        f.debug_struct("CoercionTable").field("rules", &types).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
