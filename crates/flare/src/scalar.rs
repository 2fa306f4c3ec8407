//! Scalar literals and relative time deltas
//!
//! Leaf values of a condition are tagged with their wire type when lowered:
//! `{"type": "double", "val": 3.5}`. Deltas serialize to the subset of
//! calendar/clock units that were actually set.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::{FlareError, Result};

/// How numeric literals are tagged in the AST.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberTagging {
    /// Every number is tagged `double`.
    #[default]
    Double,
    /// Integral numbers (including `3.0`) are tagged `int`, the rest `double`.
    IntegralAsInt,
}

/// A literal operand of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Double(f64),
    Bool(bool),
    String(String),
}

impl Scalar {
    /// Wire type tag under the given numeric policy.
    pub fn type_tag(&self, numbers: NumberTagging) -> &'static str {
        match (self, numbers) {
            (Scalar::Int(_), NumberTagging::Double) => "double",
            (Scalar::Int(_), NumberTagging::IntegralAsInt) => "int",
            (Scalar::Double(_), NumberTagging::Double) => "double",
            (Scalar::Double(f), NumberTagging::IntegralAsInt) => {
                if as_integral(*f).is_some() {
                    "int"
                } else {
                    "double"
                }
            }
            (Scalar::Bool(_), _) => "bool",
            (Scalar::String(_), _) => "string",
        }
    }

    /// Encode as `{type, val}`.
    pub fn encode(&self, numbers: NumberTagging) -> Result<Value> {
        let val = match self {
            Scalar::Int(n) => json!(n),
            Scalar::Double(f) => {
                if !f.is_finite() {
                    return Err(FlareError::InvalidScalarType(format!(
                        "non-finite number {f}"
                    )));
                }
                match (numbers, as_integral(*f)) {
                    (NumberTagging::IntegralAsInt, Some(n)) => json!(n),
                    _ => json!(f),
                }
            }
            Scalar::Bool(b) => json!(b),
            Scalar::String(s) => json!(s),
        };

        let mut arg = Map::new();
        arg.insert("type".into(), json!(self.type_tag(numbers)));
        arg.insert("val".into(), val);
        Ok(Value::Object(arg))
    }
}

fn as_integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

macro_rules! scalar_from {
    ($variant:ident: $($ty:ty),+) => {
        $(impl From<$ty> for Scalar {
            fn from(v: $ty) -> Self {
                Scalar::$variant(v.into())
            }
        })+
    };
}

scalar_from!(Int: i8, i16, i32, i64, u8, u16, u32);

// Out-of-range values fall back to the nearest double.
macro_rules! scalar_from_wide {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Scalar {
            fn from(v: $ty) -> Self {
                match i64::try_from(v) {
                    Ok(n) => Scalar::Int(n),
                    Err(_) => Scalar::Double(v as f64),
                }
            }
        })+
    };
}

scalar_from_wide!(u64, usize, isize, i128, u128);
scalar_from!(Double: f32, f64);
scalar_from!(Bool: bool);
scalar_from!(String: String, &str);

impl TryFrom<Value> for Scalar {
    type Error = FlareError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            Value::String(s) => Ok(Scalar::String(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Scalar::Double(f))
                } else {
                    Err(FlareError::InvalidScalarType(format!("number {n}")))
                }
            }
            Value::Null => Err(FlareError::InvalidScalarType("null".into())),
            Value::Array(_) => Err(FlareError::InvalidScalarType("array".into())),
            Value::Object(_) => Err(FlareError::InvalidScalarType("object".into())),
        }
    }
}

/// A relative duration expressed as a sum of calendar/clock units.
///
/// Unset units are omitted from the AST; there are no zero defaults. Units
/// may be fractional (`hours(1.5)`); whole amounts render without a fraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub years: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub months: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub weeks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "amount")]
    pub seconds: Option<f64>,
}

fn amount<S: Serializer>(value: &Option<f64>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match *value {
        None => s.serialize_none(),
        Some(v) if !v.is_finite() => Err(S::Error::custom(format!("non-finite delta unit {v}"))),
        Some(v) => match as_integral(v) {
            Some(n) => s.serialize_i64(n),
            None => s.serialize_f64(v),
        },
    }
}

impl Delta {
    pub fn years(mut self, n: impl Into<f64>) -> Self {
        self.years = Some(n.into());
        self
    }

    pub fn months(mut self, n: impl Into<f64>) -> Self {
        self.months = Some(n.into());
        self
    }

    pub fn weeks(mut self, n: impl Into<f64>) -> Self {
        self.weeks = Some(n.into());
        self
    }

    pub fn days(mut self, n: impl Into<f64>) -> Self {
        self.days = Some(n.into());
        self
    }

    pub fn hours(mut self, n: impl Into<f64>) -> Self {
        self.hours = Some(n.into());
        self
    }

    pub fn minutes(mut self, n: impl Into<f64>) -> Self {
        self.minutes = Some(n.into());
        self
    }

    pub fn seconds(mut self, n: impl Into<f64>) -> Self {
        self.seconds = Some(n.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Delta::default()
    }

    pub(crate) fn lower(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
