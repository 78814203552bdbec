//! Typed property values.
//!
//! [`PropertyValue`] is the closed set of value types a property descriptor can
//! hold. Each variant has a [`ValueType`] tag used to pick its coercion rule
//! and to decide whether ordering operators make sense for it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vector2i
// ---------------------------------------------------------------------------

/// A 2D integer vector, e.g. a slot position in a grid.
///
/// Ordering is lexicographic: `x` first, then `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Vector2i {
    pub x: i32,
    pub y: i32,
}

impl Vector2i {
    pub const ZERO: Vector2i = Vector2i { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Vector2i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Vector2i {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Vector2i> for serde_json::Value {
    fn from(v: Vector2i) -> Self {
        serde_json::json!({ "x": v.x, "y": v.y })
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Compass and vertical directions, plus `None` for "no side".
///
/// Parsing is case-insensitive on the SCREAMING_SNAKE_CASE names, and the
/// declaration order is the ordinal order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Direction {
    North,
    NorthNortheast,
    Northeast,
    EastNortheast,
    East,
    EastSoutheast,
    Southeast,
    SouthSoutheast,
    South,
    SouthSouthwest,
    Southwest,
    WestSouthwest,
    West,
    WestNorthwest,
    Northwest,
    NorthNorthwest,
    Up,
    Down,
    None,
}

impl From<Direction> for serde_json::Value {
    fn from(d: Direction) -> Self {
        serde_json::Value::String(d.to_string())
    }
}

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// Tag naming the type of a [`PropertyValue`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValueType {
    /// Free text, ordered lexicographically.
    Text,
    /// Signed integer.
    Integer,
    /// Grid position ([`Vector2i`]).
    SlotPos,
    /// Side of a container ([`Direction`]).
    SlotSide,
    /// Opaque identifier. Only equality is meaningful.
    Identifier,
}

impl ValueType {
    /// Whether values of this type have a natural order.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ValueType::Identifier)
    }
}

// ---------------------------------------------------------------------------
// PropertyValue
// ---------------------------------------------------------------------------

/// A coerced, strongly typed property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    SlotPos(Vector2i),
    SlotSide(Direction),
    Identifier(String),
}

impl PropertyValue {
    /// The tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Text(_) => ValueType::Text,
            PropertyValue::Integer(_) => ValueType::Integer,
            PropertyValue::SlotPos(_) => ValueType::SlotPos,
            PropertyValue::SlotSide(_) => ValueType::SlotSide,
            PropertyValue::Identifier(_) => ValueType::Identifier,
        }
    }

    /// Natural order between two values of the same ordered type.
    ///
    /// `None` when the types differ or the type has no order.
    pub fn natural_cmp(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Text(a), PropertyValue::Text(b)) => Some(a.cmp(b)),
            (PropertyValue::Integer(a), PropertyValue::Integer(b)) => Some(a.cmp(b)),
            (PropertyValue::SlotPos(a), PropertyValue::SlotPos(b)) => Some(a.cmp(b)),
            (PropertyValue::SlotSide(a), PropertyValue::SlotSide(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// The loosely typed form accepted back by the coercion rules.
    pub fn to_raw(&self) -> serde_json::Value {
        match self {
            PropertyValue::Text(s) | PropertyValue::Identifier(s) => {
                serde_json::Value::String(s.clone())
            }
            PropertyValue::Integer(n) => serde_json::Value::from(*n),
            PropertyValue::SlotPos(v) => (*v).into(),
            PropertyValue::SlotSide(d) => (*d).into(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => write!(f, "{s:?}"),
            PropertyValue::Integer(n) => write!(f, "{n}"),
            PropertyValue::SlotPos(v) => write!(f, "{v}"),
            PropertyValue::SlotSide(d) => write!(f, "{d}"),
            PropertyValue::Identifier(s) => write!(f, "#{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_order_lexicographically() {
        let base = Vector2i::new(2, 3);
        assert!(Vector2i::new(1, 9) < base);
        assert!(Vector2i::new(3, 0) > base);
        assert!(Vector2i::new(2, 4) > base);
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("north".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("NORTH".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!(
            "south_southwest".parse::<Direction>().unwrap(),
            Direction::SouthSouthwest
        );
        assert!("banana".parse::<Direction>().is_err());
        assert_eq!(Direction::NorthNortheast.to_string(), "NORTH_NORTHEAST");
    }

    #[test]
    fn identifiers_have_no_order() {
        let a = PropertyValue::Identifier("a".to_owned());
        let b = PropertyValue::Identifier("b".to_owned());
        assert_eq!(a.natural_cmp(&b), None);
        assert!(!ValueType::Identifier.is_ordered());
    }

    #[test]
    fn mixed_types_have_no_order() {
        let text = PropertyValue::Text("1".to_owned());
        let int = PropertyValue::Integer(1);
        assert_eq!(text.natural_cmp(&int), None);
    }

    #[test]
    fn value_type_names() {
        assert_eq!(ValueType::SlotPos.to_string(), "slot_pos");
        assert_eq!(PropertyValue::Integer(4).value_type(), ValueType::Integer);
    }

    #[test]
    fn tagged_json_form() {
        let json = serde_json::to_value(PropertyValue::SlotSide(Direction::Up)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "slot_side", "value": "UP"}));
    }
}
