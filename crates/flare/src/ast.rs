//! Rendering built values to the JSON query AST

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::Result;
use crate::scalar::NumberTagging;

/// Options that affect how values are lowered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AstOptions {
    pub numbers: NumberTagging,
}

/// Anything that lowers to a JSON AST fragment.
pub trait ToAst {
    fn ast_with(&self, opts: &AstOptions) -> Result<Value>;

    fn ast(&self) -> Result<Value> {
        self.ast_with(&AstOptions::default())
    }
}

/// Render `value` as a JSON string. `indent == 0` is compact, anything else
/// pretty-prints with that many spaces per level.
pub fn ast<T: ToAst + ?Sized>(value: &T, indent: usize) -> Result<String> {
    ast_with(value, indent, &AstOptions::default())
}

pub fn ast_with<T: ToAst + ?Sized>(value: &T, indent: usize, opts: &AstOptions) -> Result<String> {
    let tree = value.ast_with(opts)?;
    if indent == 0 {
        return Ok(serde_json::to_string(&tree)?);
    }

    let indent = vec![b' '; indent];
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
    tree.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Per-call lowering state threaded through the node tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lowering {
    pub numbers: NumberTagging,
    /// Inside a bound switch the stream is hoisted to the switch itself.
    pub hoist_stream: bool,
}

impl Lowering {
    pub fn new(opts: &AstOptions) -> Self {
        Self {
            numbers: opts.numbers,
            hoist_stream: false,
        }
    }

    pub fn hoisted(&self) -> Self {
        Self {
            hoist_stream: true,
            ..*self
        }
    }

    pub fn unhoisted(&self) -> Self {
        Self {
            hoist_stream: false,
            ..*self
        }
    }
}
