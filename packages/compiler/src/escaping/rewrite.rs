//! Commit pass: apply an [`Inference`] record to the tree.
//!
//! Runs only after every template analyzed cleanly, so a compilation unit
//! either comes out fully escaped or completely untouched. Each recorded
//! edit must land on exactly one node; anything left over (or any node id
//! the tree no longer has) is an internal error.

use indexmap::IndexMap;

use crate::error::{CompileError, ErrorKind, Result};
use crate::template_parser::ast::{BlockValue, Node, PrintDirective};
use crate::template_parser::{NodeId, TemplateRegistry};

use super::inference::Inference;

pub fn commit(registry: &mut TemplateRegistry, inference: Inference) -> Result<()> {
    let Inference {
        mut print_directives,
        mut call_escapes,
        mut text_rewrites,
        end_contexts: _,
    } = inference;

    for (_, template) in registry.iter_mut() {
        apply_nodes(
            &mut template.body,
            &mut print_directives,
            &mut call_escapes,
            &mut text_rewrites,
        );
    }

    let leftover = print_directives.len() + call_escapes.len() + text_rewrites.len();
    if leftover != 0 {
        return Err(CompileError::new(
            ErrorKind::Internal,
            format!("{} inference records matched no tree node", leftover),
        ));
    }
    Ok(())
}

fn apply_nodes(
    nodes: &mut [Node],
    prints: &mut IndexMap<NodeId, Vec<PrintDirective>>,
    calls: &mut IndexMap<NodeId, Vec<String>>,
    texts: &mut IndexMap<NodeId, String>,
) {
    for node in nodes {
        match node {
            Node::RawText(n) => {
                if let Some(text) = texts.swap_remove(&n.id) {
                    n.value = text;
                }
            }
            Node::Print(n) => {
                if let Some(directives) = prints.swap_remove(&n.id) {
                    n.directives = directives;
                }
            }
            Node::If(n) => {
                for branch in &mut n.branches {
                    apply_nodes(&mut branch.children, prints, calls, texts);
                }
                if let Some(children) = &mut n.else_children {
                    apply_nodes(children, prints, calls, texts);
                }
            }
            Node::Switch(n) => {
                for case in &mut n.cases {
                    apply_nodes(&mut case.children, prints, calls, texts);
                }
                if let Some(children) = &mut n.default_children {
                    apply_nodes(children, prints, calls, texts);
                }
            }
            Node::Loop(n) => {
                apply_nodes(&mut n.children, prints, calls, texts);
                if let Some(children) = &mut n.if_empty {
                    apply_nodes(children, prints, calls, texts);
                }
            }
            Node::Call(n) => {
                if let Some(escapes) = calls.swap_remove(&n.id) {
                    n.escapes = escapes;
                }
                for param in &mut n.params {
                    if let BlockValue::Block { children, .. } = &mut param.value {
                        apply_nodes(children, prints, calls, texts);
                    }
                }
            }
            Node::Let(n) => {
                if let BlockValue::Block { children, .. } = &mut n.value {
                    apply_nodes(children, prints, calls, texts);
                }
            }
        }
    }
}
