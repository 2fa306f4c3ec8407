//! Pattern nodes and the temporal combinators shared by every variant
//!
//! Every node supports the same operator set:
//! - `.after(d)` / `.within(d)` → spacing relative to the previous span
//! - `.min(d)` / `.max(d)` → minimum/maximum span width
//! - `.then(node)` → serial sequence
//!
//! `&&` and `||` are binary on the wire. Given n operands they fold to the
//! right: `and([a, b, c])` is `a && (b && c)`.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::ast::{Lowering, ToAst};
use crate::cmp::Op;
use crate::scalar::{Delta, Scalar};
use crate::stream::Stream;
use crate::{AstOptions, FlareError, Result};

/// A predicate on one event field, optionally bound to a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Cond {
    pub path: Vec<String>,
    pub op: Op,
    pub arg: Scalar,
    pub stream: Option<Arc<Stream>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParKind {
    Any,
    All,
    During,
}

impl ParKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParKind::Any => "any",
            ParKind::All => "all",
            ParKind::During => "during",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Leaf condition span
    Span(Cond),

    /// `lhs && rhs`
    And(Box<Node>, Box<Node>),

    /// `lhs || rhs`
    Or(Box<Node>, Box<Node>),

    /// Each span follows the previous one
    Serial(Vec<Node>),

    /// Parallel pattern match: any/all/during
    Par(ParKind, Vec<Node>),

    /// Temporal offset/window relative to the preceding span
    Spacing {
        cond: Box<Node>,
        after: Option<Delta>,
        within: Option<Delta>,
    },

    /// Minimum/maximum duration of the span
    Width {
        cond: Box<Node>,
        min: Option<Delta>,
        max: Option<Delta>,
    },

    /// State transitions within one stream (a switch bound via `Stream::when`)
    Switch {
        stream: Arc<Stream>,
        conds: Vec<Node>,
    },
}

impl From<Cond> for Node {
    fn from(cond: Cond) -> Self {
        Node::Span(cond)
    }
}

impl Node {
    pub fn after(self, delta: Delta) -> Node {
        Node::Spacing {
            cond: Box::new(self),
            after: Some(delta),
            within: None,
        }
    }

    pub fn within(self, delta: Delta) -> Node {
        Node::Spacing {
            cond: Box::new(self),
            after: None,
            within: Some(delta),
        }
    }

    pub fn min(self, delta: Delta) -> Node {
        Node::Width {
            cond: Box::new(self),
            min: Some(delta),
            max: None,
        }
    }

    pub fn max(self, delta: Delta) -> Node {
        Node::Width {
            cond: Box::new(self),
            min: None,
            max: Some(delta),
        }
    }

    /// Width bounded on both sides: `for: {at-least, at-most}`.
    pub fn lasting(self, min: Delta, max: Delta) -> Node {
        Node::Width {
            cond: Box::new(self),
            min: Some(min),
            max: Some(max),
        }
    }

    /// Sequence `next` after this node.
    ///
    /// A serial receiver appends to its own sequence and is returned;
    /// anything else starts a new two-element serial.
    pub fn then(self, next: Node) -> Node {
        match self {
            Node::Serial(mut seq) => {
                seq.push(next);
                Node::Serial(seq)
            }
            other => Node::Serial(vec![other, next]),
        }
    }

    pub(crate) fn lower(&self, cx: &Lowering) -> Result<Map<String, Value>> {
        match self {
            Node::Span(cond) => cond.lower(cx),
            Node::And(lhs, rhs) => lower_expr("&&", lhs, rhs, cx),
            Node::Or(lhs, rhs) => lower_expr("||", lhs, rhs, cx),
            Node::Serial(seq) => lower_conds("serial", seq, cx),
            Node::Par(kind, conds) => lower_conds(kind.as_str(), conds, cx),
            Node::Spacing {
                cond,
                after,
                within,
            } => {
                let mut c = cond.lower(cx)?;
                if let Some(d) = after {
                    c.insert("after".into(), d.lower()?);
                }
                if let Some(d) = within {
                    c.insert("within".into(), d.lower()?);
                }
                Ok(c)
            }
            Node::Width { cond, min, max } => {
                let mut c = cond.lower(cx)?;
                let mut width = Map::new();
                if let Some(d) = min {
                    width.insert("at-least".into(), d.lower()?);
                }
                if let Some(d) = max {
                    width.insert("at-most".into(), d.lower()?);
                }
                if !width.is_empty() {
                    c.insert("for".into(), Value::Object(width));
                }
                Ok(c)
            }
            Node::Switch { stream, conds } => {
                let hoisted = cx.hoisted();
                let conds = conds
                    .iter()
                    .map(|c| c.lower(&hoisted).map(Value::Object))
                    .collect::<Result<Vec<_>>>()?;

                let mut c = Map::new();
                c.insert("type".into(), json!("switch"));
                c.insert("stream".into(), json!({ "name": stream.name() }));
                c.insert("conds".into(), Value::Array(conds));
                Ok(c)
            }
        }
    }
}

impl Cond {
    pub(crate) fn lower(&self, cx: &Lowering) -> Result<Map<String, Value>> {
        let mut c = Map::new();
        c.insert("path".into(), json!(self.path));
        c.insert("op".into(), json!(self.op.token()));
        c.insert("arg".into(), self.arg.encode(cx.numbers)?);
        if let Some(stream) = &self.stream {
            if !cx.hoist_stream {
                c.insert("stream".into(), Value::Object(stream.lower(cx)?));
            }
            c.insert("type".into(), json!("span"));
        }
        Ok(c)
    }
}

fn lower_expr(expr: &str, lhs: &Node, rhs: &Node, cx: &Lowering) -> Result<Map<String, Value>> {
    let mut c = Map::new();
    c.insert("expr".into(), json!(expr));
    c.insert(
        "args".into(),
        json!([Value::Object(lhs.lower(cx)?), Value::Object(rhs.lower(cx)?)]),
    );
    Ok(c)
}

fn lower_conds(ty: &str, conds: &[Node], cx: &Lowering) -> Result<Map<String, Value>> {
    let conds = conds
        .iter()
        .map(|n| n.lower(cx).map(Value::Object))
        .collect::<Result<Vec<_>>>()?;
    let mut c = Map::new();
    c.insert("type".into(), json!(ty));
    c.insert("conds".into(), Value::Array(conds));
    Ok(c)
}

impl ToAst for Node {
    fn ast_with(&self, opts: &AstOptions) -> Result<Value> {
        Ok(Value::Object(self.lower(&Lowering::new(opts))?))
    }
}

impl ToAst for Cond {
    fn ast_with(&self, opts: &AstOptions) -> Result<Value> {
        Ok(Value::Object(self.lower(&Lowering::new(opts))?))
    }
}

// ============ Combinators ============

type Binary = fn(Box<Node>, Box<Node>) -> Node;

fn fold(nodes: Vec<Node>, name: &'static str, ctor: Binary) -> Result<Node> {
    let count = nodes.len();
    let mut rev = nodes.into_iter().rev();
    let last = rev.next().ok_or(FlareError::EmptyCombinator(name))?;
    let folded = rev.fold(last, |acc, node| ctor(Box::new(node), Box::new(acc)));
    if count > 1 {
        log::trace!("folded {count} operands of {name}() into binary nodes");
    }
    Ok(folded)
}

pub(crate) fn fold_and(nodes: Vec<Node>) -> Result<Node> {
    fold(nodes, "and", Node::And)
}

pub(crate) fn fold_or(nodes: Vec<Node>) -> Result<Node> {
    fold(nodes, "or", Node::Or)
}

/// Conjunction. A single operand is returned unchanged.
pub fn and<I: IntoIterator<Item = Node>>(nodes: I) -> Result<Node> {
    fold_and(nodes.into_iter().collect())
}

/// Disjunction. A single operand is returned unchanged.
pub fn or<I: IntoIterator<Item = Node>>(nodes: I) -> Result<Node> {
    fold_or(nodes.into_iter().collect())
}

pub fn any<I: IntoIterator<Item = Node>>(nodes: I) -> Node {
    Node::Par(ParKind::Any, nodes.into_iter().collect())
}

pub fn all<I: IntoIterator<Item = Node>>(nodes: I) -> Node {
    Node::Par(ParKind::All, nodes.into_iter().collect())
}

pub fn during<I: IntoIterator<Item = Node>>(nodes: I) -> Node {
    Node::Par(ParKind::During, nodes.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> Node {
        Node::Span(Cond {
            path: vec!["event".into(), name.into()],
            op: Op::Eq,
            arg: Scalar::Bool(true),
            stream: None,
        })
    }

    #[test]
    fn and_of_one_is_identity() {
        assert_eq!(and([leaf("a")]).unwrap(), leaf("a"));
        assert_eq!(or([leaf("a")]).unwrap(), leaf("a"));
    }

    #[test]
    fn empty_combinators_fail() {
        assert!(matches!(
            and(Vec::new()),
            Err(FlareError::EmptyCombinator("and"))
        ));
        assert!(matches!(
            or(Vec::new()),
            Err(FlareError::EmptyCombinator("or"))
        ));
    }

    #[test]
    fn and_folds_to_the_right() {
        let folded = and([leaf("a"), leaf("b"), leaf("c")]).unwrap();
        let expected = Node::And(
            Box::new(leaf("a")),
            Box::new(Node::And(Box::new(leaf("b")), Box::new(leaf("c")))),
        );
        assert_eq!(folded, expected);
    }

    #[test]
    fn two_operands_stay_flat() {
        let folded = or([leaf("a"), leaf("b")]).unwrap();
        assert_eq!(folded, Node::Or(Box::new(leaf("a")), Box::new(leaf("b"))));
    }

    #[test]
    fn par_is_flat() {
        let node = any([leaf("a"), leaf("b"), leaf("c")]);
        assert!(matches!(node, Node::Par(ParKind::Any, ref conds) if conds.len() == 3));
    }

    #[test]
    fn serial_then_appends() {
        let node = leaf("a").then(leaf("b")).then(leaf("c"));
        match node {
            Node::Serial(seq) => assert_eq!(seq, vec![leaf("a"), leaf("b"), leaf("c")]),
            other => panic!("Expected Serial, got {:?}", other),
        }
    }

    #[test]
    fn then_on_non_serial_wraps() {
        let node = all([leaf("a")]).then(leaf("b"));
        match node {
            Node::Serial(seq) => {
                assert_eq!(seq.len(), 2);
                assert!(matches!(seq[0], Node::Par(ParKind::All, _)));
            }
            other => panic!("Expected Serial, got {:?}", other),
        }
    }

    #[test]
    fn spacing_sets_only_the_called_option() {
        let d = Delta::default().seconds(1);
        match leaf("a").within(d.clone()) {
            Node::Spacing { after, within, .. } => {
                assert!(after.is_none());
                assert_eq!(within, Some(d));
            }
            other => panic!("Expected Spacing, got {:?}", other),
        }
    }

    #[test]
    fn width_renders_at_least_and_at_most() {
        let min = Delta::default().days(1);
        let max = Delta::default().days(3);
        let ast = leaf("a").lasting(min, max).ast().unwrap();
        assert_eq!(
            ast["for"],
            json!({"at-least": {"days": 1}, "at-most": {"days": 3}})
        );

        let ast = leaf("a").min(Delta::default().days(1)).ast().unwrap();
        assert_eq!(ast["for"], json!({"at-least": {"days": 1}}));
    }

    #[test]
    fn unbound_condition_has_no_type_or_stream() {
        let ast = leaf("x").ast().unwrap();
        assert_eq!(
            ast,
            json!({"path": ["event", "x"], "op": "==", "arg": {"type": "bool", "val": true}})
        );
    }
}
