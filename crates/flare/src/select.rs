//! Query envelope: `select` with optional time bounds

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::ast::{Lowering, ToAst};
use crate::node::{Node, fold_and};
use crate::{AstOptions, FlareError, Result};

/// A time bound on a query, rendered verbatim (RFC 3339 for chrono values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bound(String);

impl Bound {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Bound {
    fn from(s: &str) -> Self {
        Bound(s.to_string())
    }
}

impl From<String> for Bound {
    fn from(s: String) -> Self {
        Bound(s)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Bound
where
    Tz::Offset: std::fmt::Display,
{
    fn from(t: DateTime<Tz>) -> Self {
        Bound(t.to_rfc3339())
    }
}

/// UTC timestamp from calendar components.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| {
            FlareError::InvalidTimestamp(format!(
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"
            ))
        })
}

/// Builder returned by [`select`]; collects bounds, then wraps conditions.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    start: Option<Bound>,
    end: Option<Bound>,
}

pub fn select() -> Selector {
    Selector::default()
}

impl Selector {
    pub fn start(mut self, start: impl Into<Bound>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<Bound>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn between(self, start: impl Into<Bound>, end: impl Into<Bound>) -> Self {
        self.start(start).end(end)
    }

    /// Wrap top-level conditions. Several conditions are implicitly `&&`-ed.
    pub fn of<I: IntoIterator<Item = Node>>(&self, nodes: I) -> Result<Select> {
        let nodes: Vec<Node> = nodes.into_iter().collect();
        if nodes.is_empty() {
            return Err(FlareError::WildcardSelectUnsupported);
        }
        if nodes.len() > 1 {
            log::debug!("select over {} conditions, combining with &&", nodes.len());
        }
        let root = fold_and(nodes)?;
        Ok(Select {
            root,
            start: self.start.clone(),
            end: self.end.clone(),
        })
    }
}

/// Root of a query AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub root: Node,
    pub start: Option<Bound>,
    pub end: Option<Bound>,
}

impl ToAst for Select {
    fn ast_with(&self, opts: &AstOptions) -> Result<Value> {
        let mut q = Map::new();
        q.insert(
            "select".into(),
            Value::Object(self.root.lower(&Lowering::new(opts))?),
        );
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                q.insert("between".into(), json!([start, end]));
            }
            (Some(start), None) => {
                q.insert("after".into(), json!(start));
            }
            (None, Some(end)) => {
                q.insert("before".into(), json!(end));
            }
            (None, None) => {}
        }
        Ok(Value::Object(q))
    }
}
