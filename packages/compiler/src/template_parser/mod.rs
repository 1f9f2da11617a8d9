//! Template source parsing: lexer, AST, parser and the template registry.
//!
//! The autoescaping engine consumes this module's output but never its
//! internals: it only needs a tree of identity-bearing nodes and a registry
//! that can resolve call targets deterministically.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod registry;

pub use ast::{ContentKind, Node, NodeId};
pub use registry::TemplateRegistry;

use thiserror::Error;

/// A template syntax error. Reported lines are 1-based.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (line {line})")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
}

impl SyntaxError {
    /// `line0` is the 0-based line the lexer/parser tracked.
    pub fn new(message: impl Into<String>, line0: usize) -> Self {
        SyntaxError { message: message.into(), line: line0 + 1 }
    }
}

/// Node id allocator. One generator per compilation unit keeps node
/// identity unique across all files in a registry.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}
