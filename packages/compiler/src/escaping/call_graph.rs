//! Static call graph over a template registry.
//!
//! Built once per compilation unit to pick analysis roots: templates that
//! no checked template calls. Root order follows registry order, so
//! analysis is deterministic for a fixed input set.

use indexmap::IndexSet;

use crate::template_parser::ast::{AutoescapeMode, BlockValue, Node};
use crate::template_parser::TemplateRegistry;

#[derive(Debug)]
pub struct CallGraph {
    /// Callee full names with at least one checked caller.
    called: IndexSet<String>,
}

impl CallGraph {
    pub fn build(registry: &TemplateRegistry) -> Self {
        let mut called: IndexSet<String> = IndexSet::new();
        for (name, template) in registry.iter() {
            if template.autoescape == AutoescapeMode::Off {
                // Unchecked templates are never analyzed, so their calls
                // do not make a callee reachable from analysis.
                continue;
            }
            let mut targets = Vec::new();
            collect_calls(&template.body, &template.namespace, &mut targets);
            for target in targets {
                if target != *name {
                    // Self-recursion does not demote a template from root.
                    called.insert(target);
                }
            }
        }
        CallGraph { called }
    }

    pub fn has_checked_caller(&self, callee: &str) -> bool {
        self.called.contains(callee)
    }

    /// Templates to analyze first: every checked template that no other
    /// checked template calls, in registry order. Cycle-only components
    /// have no root here; the engine sweeps them up afterwards.
    pub fn analysis_roots(&self, registry: &TemplateRegistry) -> Vec<String> {
        registry
            .iter()
            .filter(|(name, template)| {
                template.autoescape != AutoescapeMode::Off
                    && !self.has_checked_caller(name.as_str())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn collect_calls(nodes: &[Node], namespace: &str, out: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::RawText(_) | Node::Print(_) => {}
            Node::If(n) => {
                for branch in &n.branches {
                    collect_calls(&branch.children, namespace, out);
                }
                if let Some(children) = &n.else_children {
                    collect_calls(children, namespace, out);
                }
            }
            Node::Switch(n) => {
                for case in &n.cases {
                    collect_calls(&case.children, namespace, out);
                }
                if let Some(children) = &n.default_children {
                    collect_calls(children, namespace, out);
                }
            }
            Node::Loop(n) => {
                collect_calls(&n.children, namespace, out);
                if let Some(children) = &n.if_empty {
                    collect_calls(children, namespace, out);
                }
            }
            Node::Call(n) => {
                out.push(TemplateRegistry::resolve_target(namespace, &n.target));
                for param in &n.params {
                    if let BlockValue::Block { children, .. } = &param.value {
                        collect_calls(children, namespace, out);
                    }
                }
            }
            Node::Let(n) => {
                if let BlockValue::Block { children, .. } = &n.value {
                    collect_calls(children, namespace, out);
                }
            }
        }
    }
}
