//! Condition shapes and their lowering into condition trees
//!
//! A shape is a nested, insertion-ordered mapping from field-path segment to a
//! constraint. Lowering walks it depth-first, anchoring every path under
//! `event`, and combines sibling constraints with a right-folded `&&`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::cmp::{Cmp, Op};
use crate::node::{Cond, Node, fold_and, fold_or};
use crate::scalar::Scalar;
use crate::stream::Stream;
use crate::{FlareError, Result};

/// Leading path segment of every event field.
pub const EVENT_ROOT: &str = "event";

/// A constraint on a single field path.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeValue {
    /// Implicit equality: `{"x": true}`
    Scalar(Scalar),
    /// Explicit comparison: `{"x": lt(0)}`
    Cmp(Cmp),
    /// Any alternative holds (`||` on the same path)
    AnyOf(Vec<ShapeValue>),
    /// Every constraint holds (`&&` on the same path)
    AllOf(Vec<ShapeValue>),
    /// Descend one path segment
    Nested(Shape),
}

macro_rules! shape_value_from_scalar {
    ($($ty:ty),+) => {
        $(impl From<$ty> for ShapeValue {
            fn from(v: $ty) -> Self {
                ShapeValue::Scalar(v.into())
            }
        })+
    };
}

shape_value_from_scalar!(
    i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, i128, u128, f32, f64, bool, String, &str
);

impl From<Scalar> for ShapeValue {
    fn from(v: Scalar) -> Self {
        ShapeValue::Scalar(v)
    }
}

impl From<Cmp> for ShapeValue {
    fn from(v: Cmp) -> Self {
        ShapeValue::Cmp(v)
    }
}

impl From<Shape> for ShapeValue {
    fn from(v: Shape) -> Self {
        ShapeValue::Nested(v)
    }
}

impl TryFrom<Value> for ShapeValue {
    type Error = FlareError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => Ok(ShapeValue::Nested(Shape::try_from(value)?)),
            other => Ok(ShapeValue::Scalar(Scalar::try_from(other)?)),
        }
    }
}

/// Mapping from path segment to constraint, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape(IndexMap<String, ShapeValue>);

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field constraint (builder form).
    pub fn field(mut self, key: impl Into<String>, value: impl Into<ShapeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ShapeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShapeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Shape
where
    K: Into<String>,
    V: Into<ShapeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Shape(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// JSON objects are shapes; nested objects descend, everything else is a
/// scalar leaf compared with `==`.
impl TryFrom<Value> for Shape {
    type Error = FlareError;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(FlareError::InvalidShape(format!(
                "expected a JSON object, got {value}"
            )));
        };
        let mut shape = Shape::new();
        for (key, val) in map {
            shape.insert(key, ShapeValue::try_from(val)?);
        }
        Ok(shape)
    }
}

/// Build a [`Shape`] from `key => value` pairs.
///
/// ```ignore
/// let s = shape! { "temp" => gt(50), "state" => any_of([false, true]) };
/// let nested = shape! { "registers" => shape! { "temp1" => 1 } };
/// ```
#[macro_export]
macro_rules! shape {
    () => {
        $crate::Shape::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Shape::new()$(.field($key, $value))+
    };
}

/// Lower a shape into a condition tree rooted at `path`.
///
/// `stream` is `None` for stream filters, whose conditions carry no stream
/// back-reference.
pub(crate) fn lower(stream: Option<&Arc<Stream>>, shape: &Shape, path: &[String]) -> Result<Node> {
    let mut ands = Vec::with_capacity(shape.len());
    for (key, value) in shape.iter() {
        let mut p = path.to_vec();
        p.push(key.to_string());
        ands.push(lower_value(stream, value, p)?);
    }

    log::trace!(
        "lowered shape at {:?} into {} condition(s)",
        path,
        ands.len()
    );

    match ands.len() {
        0 => Err(FlareError::UnsupportedWildcard),
        1 => Ok(ands.remove(0)),
        _ => fold_and(ands),
    }
}

fn lower_value(stream: Option<&Arc<Stream>>, value: &ShapeValue, path: Vec<String>) -> Result<Node> {
    match value {
        ShapeValue::Scalar(val) => Ok(cond(stream, path, Op::Eq, val.clone())),
        ShapeValue::Cmp(cmp) => Ok(cond(stream, path, cmp.op, cmp.val.clone())),
        ShapeValue::Nested(inner) => lower(stream, inner, &path),
        ShapeValue::AnyOf(alts) => {
            let nodes = lower_alternatives(stream, alts, &path, "any_of")?;
            fold_or(nodes)
        }
        ShapeValue::AllOf(alts) => {
            let nodes = lower_alternatives(stream, alts, &path, "all_of")?;
            fold_and(nodes)
        }
    }
}

fn lower_alternatives(
    stream: Option<&Arc<Stream>>,
    alts: &[ShapeValue],
    path: &[String],
    combinator: &'static str,
) -> Result<Vec<Node>> {
    if alts.is_empty() {
        return Err(FlareError::EmptyCombinator(combinator));
    }
    alts.iter()
        .map(|alt| lower_value(stream, alt, path.to_vec()))
        .collect()
}

fn cond(stream: Option<&Arc<Stream>>, path: Vec<String>, op: Op, arg: Scalar) -> Node {
    Node::Span(Cond {
        path,
        op,
        arg,
        stream: stream.cloned(),
    })
}

/// The `["event"]` path prefix every binding starts from.
pub(crate) fn event_root() -> Vec<String> {
    vec![EVENT_ROOT.to_string()]
}
