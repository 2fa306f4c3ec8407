//! Flare - temporal pattern queries over event streams
//!
//! A builder DSL that describes patterns over named event streams and lowers
//! them to the JSON query AST accepted by the query service.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flare::{ast, gt, lt, select, shape, stream, Delta};
//!
//! let s = stream("weather");
//!
//! let cold_then_warm = s
//!     .when(shape! { "temp" => lt(0) })?
//!     .then(s.when(shape! { "temp" => gt(10) })?.within(Delta::default().days(2)));
//!
//! let query = select().of([cold_then_warm])?;
//! println!("{}", ast(&query, 2)?);
//! ```
//!
//! ## Building blocks
//!
//! - `stream(name).when(shape)` → condition spans on `event.<path>`
//! - `and`, `or` → binary boolean nodes (n-ary input right-folds)
//! - `any`, `all`, `during` → parallel pattern matches
//! - `.then(node)` → serial sequence
//! - `.after(d)`, `.within(d)` → spacing; `.min(d)`, `.max(d)` → width
//! - `event(shape).then(shape)` bound with `stream.when(switch)` → state switch
//! - `select().start(t).end(t).of(nodes)` → query envelope

mod ast;
mod cmp;
mod node;
mod scalar;
mod select;
mod shape;
mod stream;

use thiserror::Error;

// ============ Primary Public API ============

pub use ast::{AstOptions, ToAst, ast, ast_with};
pub use cmp::{Cmp, Op, all_of, any_of, eq, gt, gte, lt, lte, ne};
pub use node::{Cond, Node, ParKind, all, and, any, during, or};
pub use scalar::{Delta, NumberTagging, Scalar};
pub use select::{Bound, Select, Selector, select, utc};
pub use shape::{EVENT_ROOT, Shape, ShapeValue};
pub use stream::{Moment, Stream, Switch, event, filter, stream};

// ============ Errors ============

#[derive(Error, Debug)]
pub enum FlareError {
    #[error("{0}() cannot have zero arguments")]
    EmptyCombinator(&'static str),

    #[error("`*` not supported yet: condition shape has no fields")]
    UnsupportedWildcard,

    #[error("select * not supported yet")]
    WildcardSelectUnsupported,

    #[error("must bind a switch to a stream before producing an AST")]
    UnboundSwitch,

    #[error("stream `{stream}` binds a single shape or switch, got {got}")]
    TooManyArguments { stream: String, got: usize },

    #[error("can't bind stream `{0}` to nothing")]
    NothingToBind(String),

    #[error("Invalid scalar type: {0}")]
    InvalidScalarType(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlareError>;
