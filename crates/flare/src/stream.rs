//! Streams, stream filters and switches
//!
//! Binding a shape to a stream produces condition spans whose paths start at
//! `event`. Binding a [`Switch`] produces a state-sequence match within that
//! one stream.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::ast::{Lowering, ToAst};
use crate::node::Node;
use crate::shape::{self, Shape};
use crate::{AstOptions, FlareError, Result};

/// A named event source, optionally pre-filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    name: String,
    filter: Option<Node>,
}

pub fn stream(name: impl Into<String>) -> Stream {
    Stream::new(name)
}

/// Filter conditions for a stream. Unlike [`Stream::when`], the resulting
/// conditions carry no stream reference; they can be combined with
/// [`crate::and`]/[`crate::or`] before being attached.
pub fn filter(shape: impl Into<Shape>) -> Result<Node> {
    shape::lower(None, &shape.into(), &shape::event_root())
}

/// Start a switch with its first state.
pub fn event(state: impl Into<Shape>) -> Switch {
    Switch {
        states: vec![state.into()],
    }
}

/// What a stream can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Moment {
    Shape(Shape),
    Switch(Switch),
}

impl From<Shape> for Moment {
    fn from(shape: Shape) -> Self {
        Moment::Shape(shape)
    }
}

impl From<Switch> for Moment {
    fn from(switch: Switch) -> Self {
        Moment::Switch(switch)
    }
}

impl Stream {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
        }
    }

    /// Attach a filter expression, e.g. `or([filter(a)?, filter(b)?])?`.
    pub fn with_filter(mut self, filter: Node) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Attach a filter lowered from a shape.
    pub fn filtered(self, shape: impl Into<Shape>) -> Result<Self> {
        Ok(self.with_filter(filter(shape)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> Option<&Node> {
        self.filter.as_ref()
    }

    /// Bind a shape (condition spans) or a switch (state sequence).
    pub fn when(&self, moment: impl Into<Moment>) -> Result<Node> {
        let stream = Arc::new(self.clone());
        match moment.into() {
            Moment::Shape(shape) => shape::lower(Some(&stream), &shape, &shape::event_root()),
            Moment::Switch(switch) => {
                let conds = switch
                    .states
                    .iter()
                    .map(|state| shape::lower(Some(&stream), state, &shape::event_root()))
                    .collect::<Result<Vec<_>>>()?;
                log::debug!(
                    "bound switch with {} state(s) to stream `{}`",
                    conds.len(),
                    self.name
                );
                Ok(Node::Switch { stream, conds })
            }
        }
    }

    /// Variadic binding; exactly one moment is supported.
    pub fn bind<I>(&self, moments: I) -> Result<Node>
    where
        I: IntoIterator,
        I::Item: Into<Moment>,
    {
        let mut moments: Vec<Moment> = moments.into_iter().map(Into::into).collect();
        match moments.len() {
            0 => Err(FlareError::NothingToBind(self.name.clone())),
            1 => self.when(moments.remove(0)),
            got => Err(FlareError::TooManyArguments {
                stream: self.name.clone(),
                got,
            }),
        }
    }

    pub(crate) fn lower(&self, cx: &Lowering) -> Result<Map<String, Value>> {
        let mut s = Map::new();
        s.insert("name".into(), json!(self.name));
        if let Some(filter) = &self.filter {
            s.insert("filter".into(), Value::Object(filter.lower(&cx.unhoisted())?));
        }
        Ok(s)
    }
}

impl ToAst for Stream {
    fn ast_with(&self, opts: &AstOptions) -> Result<Value> {
        Ok(Value::Object(self.lower(&Lowering::new(opts))?))
    }
}

/// Ordered states an event stream passes through.
///
/// Has no AST of its own until bound with [`Stream::when`].
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    states: Vec<Shape>,
}

impl Switch {
    pub fn new<I>(states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Shape>,
    {
        Self {
            states: states.into_iter().map(Into::into).collect(),
        }
    }

    /// A new switch with `state` appended.
    pub fn then(&self, state: impl Into<Shape>) -> Switch {
        let mut states = self.states.clone();
        states.push(state.into());
        Switch { states }
    }

    pub fn states(&self) -> &[Shape] {
        &self.states
    }
}

impl ToAst for Switch {
    fn ast_with(&self, _opts: &AstOptions) -> Result<Value> {
        Err(FlareError::UnboundSwitch)
    }
}
