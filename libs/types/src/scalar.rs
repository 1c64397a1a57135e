//! Wire scalars for prices, amounts, counts and identifiers
//!
//! The venue sends these fields either as JSON numbers or as decimal
//! strings, and the mirror hands them back exactly as received. `Scalar`
//! keeps the original form for equality and serialization while offering
//! decimal ordering and sign checks through `rust_decimal`.
//!
//! Equality is strict: a number never equals a string, even when both spell
//! the same value.
//!
//! Numbers outside the `Decimal` range (e.g. `1e-30`) are kept as the JSON
//! number they arrived as and compared through `f64`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// A numeric or textual field exactly as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// A JSON number.
    Num(Decimal),
    /// A JSON number outside the decimal range, kept as received.
    Wide(Number),
    /// A JSON string (decimal text such as `"-1.0"` or an opaque identifier).
    Text(String),
}

impl Scalar {
    /// Read a scalar from a JSON value. Returns `None` for null, booleans,
    /// arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                parse_decimal(&n.to_string())
                    .map(Scalar::Num)
                    .unwrap_or_else(|| Scalar::Wide(n.clone())),
            ),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    /// Convert back into the JSON form it was read from.
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Num(d) => decimal_to_value(d),
            Scalar::Wide(n) => Value::Number(n.clone()),
        }
    }

    /// Numeric value; text is parsed, unparseable text and numbers outside
    /// the decimal range yield `None`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Num(d) => Some(*d),
            Scalar::Wide(_) => None,
            Scalar::Text(s) => parse_decimal(s.trim()),
        }
    }

    /// Approximate numeric value, covering numbers outside the decimal range.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Num(d) => d.to_f64(),
            Scalar::Wide(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }

    /// The text form, when the wire sent a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Num(_) | Scalar::Wide(_) => None,
        }
    }

    /// True only for the JSON number zero. The text `"0"` is not a zero
    /// marker on the wire.
    pub fn is_zero_number(&self) -> bool {
        match self {
            Scalar::Num(d) => d.is_zero(),
            Scalar::Wide(n) => n.as_f64() == Some(0.0),
            Scalar::Text(_) => false,
        }
    }

    /// True when the rendered value starts with a minus sign.
    pub fn has_negative_sign(&self) -> bool {
        match self {
            Scalar::Num(d) => *d < Decimal::ZERO,
            Scalar::Wide(n) => n.to_string().starts_with('-'),
            Scalar::Text(s) => s.starts_with('-'),
        }
    }

    /// Strictly greater than zero numerically.
    pub fn is_positive(&self) -> bool {
        match self.as_decimal() {
            Some(d) => d > Decimal::ZERO,
            None => self.wide_f64().is_some_and(|f| f > 0.0),
        }
    }

    /// Strictly less than zero numerically.
    pub fn is_negative(&self) -> bool {
        match self.as_decimal() {
            Some(d) => d < Decimal::ZERO,
            None => self.wide_f64().is_some_and(|f| f < 0.0),
        }
    }

    /// Numeric comparison, exact between decimals and through `f64` when
    /// either side is outside the decimal range. Values that cannot be read
    /// as numbers compare as equal so a stable sort keeps their arrival
    /// order.
    pub fn numeric_cmp(&self, other: &Scalar) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_decimal(), other.as_decimal()) {
            return a.cmp(&b);
        }

        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        }
    }

    fn wide_f64(&self) -> Option<f64> {
        match self {
            Scalar::Wide(n) => n.as_f64(),
            _ => None,
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn decimal_to_value(d: &Decimal) -> Value {
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Value::from(i);
        }
        if let Some(u) = d.to_u64() {
            return Value::from(u);
        }
    }

    d.to_string()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Num(d) => write!(f, "{}", d),
            Scalar::Wide(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Num(Decimal::from(n))
    }
}

impl From<Decimal> for Scalar {
    fn from(d: Decimal) -> Self {
        Scalar::Num(d)
    }
}
