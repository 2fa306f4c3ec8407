//! Comparison wrappers used as shape values
//!
//! A `Cmp` is an operator and operand that is not yet attached to a field
//! path or stream; shape lowering binds it.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;
use crate::shape::ShapeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Op {
    pub fn token(self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cmp {
    pub op: Op,
    pub val: Scalar,
}

impl Cmp {
    pub fn new(op: Op, val: impl Into<Scalar>) -> Self {
        Self {
            op,
            val: val.into(),
        }
    }
}

pub fn eq(val: impl Into<Scalar>) -> Cmp {
    Cmp::new(Op::Eq, val)
}

pub fn ne(val: impl Into<Scalar>) -> Cmp {
    Cmp::new(Op::Ne, val)
}

pub fn lt(val: impl Into<Scalar>) -> Cmp {
    Cmp::new(Op::Lt, val)
}

pub fn lte(val: impl Into<Scalar>) -> Cmp {
    Cmp::new(Op::Le, val)
}

pub fn gt(val: impl Into<Scalar>) -> Cmp {
    Cmp::new(Op::Gt, val)
}

pub fn gte(val: impl Into<Scalar>) -> Cmp {
    Cmp::new(Op::Ge, val)
}

/// Field matches any of the alternatives: `{"state": any_of([false, true])}`.
///
/// Lowers to an `||` of conditions on the same path.
pub fn any_of<I, V>(alternatives: I) -> ShapeValue
where
    I: IntoIterator<Item = V>,
    V: Into<ShapeValue>,
{
    ShapeValue::AnyOf(alternatives.into_iter().map(Into::into).collect())
}

/// Field matches all of the constraints: `{"x": all_of([gt(0), lt(10)])}`.
pub fn all_of<I, V>(constraints: I) -> ShapeValue
where
    I: IntoIterator<Item = V>,
    V: Into<ShapeValue>,
{
    ShapeValue::AllOf(constraints.into_iter().map(Into::into).collect())
}
