//! Contextual autoescaping over a template registry.
//!
//! [`escape_templates`] is the entry point: it builds the call graph,
//! infers a lexical context for every dynamic site reachable from the
//! analysis roots, and then commits the inferred escaping into the tree.
//! Analysis is all-or-nothing; the first error aborts the unit with the
//! registry unchanged.

pub mod attr_schema;
pub mod call_graph;
pub mod context;
pub mod directives;
pub mod inference;
pub mod modes;
pub mod raw_text;
pub mod rewrite;

pub use context::Context;
pub use directives::{DirectiveRegistry, DirectiveSpec};
pub use modes::EscapingMode;

use crate::error::{CompileError, ErrorKind, Result};
use crate::template_parser::ast::AutoescapeMode;
use crate::template_parser::TemplateRegistry;

use call_graph::CallGraph;
use context::State;
use inference::Inferencer;

/// An analysis error not yet attached to a template and line. The walk
/// adds the location of the node being processed when it surfaces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ContextError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        ContextError { kind: ErrorKind::AmbiguousContext, message: message.into() }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ContextError { kind: ErrorKind::Internal, message: message.into() }
    }
}

/// Knobs for the escaping pass.
#[derive(Debug, Clone, Default)]
pub struct EscapeOptions {
    /// Fail with [`ErrorKind::UnresolvableCall`] when a call targets a
    /// template outside the registry, instead of treating its output as an
    /// opaque value.
    pub require_call_resolution: bool,
}

/// Infer and apply contextual escaping for every checked template in the
/// registry.
pub fn escape_templates(
    registry: &mut TemplateRegistry,
    directives: &DirectiveRegistry,
    options: &EscapeOptions,
) -> Result<()> {
    let inference = {
        let registry = &*registry;
        let graph = CallGraph::build(registry);
        let mut inferencer = Inferencer::new(registry, directives, options);
        for root in graph.analysis_roots(registry) {
            analyze_entry(&mut inferencer, registry, &root)?;
        }
        // Templates only reachable through cycles have no root; analyze
        // them as entry points too, in registry order.
        let leftovers: Vec<String> = registry
            .iter()
            .filter(|(name, template)| {
                template.autoescape != AutoescapeMode::Off && !inferencer.was_analyzed(name.as_str())
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in leftovers {
            analyze_entry(&mut inferencer, registry, &name)?;
        }
        inferencer.into_inference()
    };
    rewrite::commit(registry, inference)
}

fn analyze_entry(
    inferencer: &mut Inferencer<'_>,
    registry: &TemplateRegistry,
    name: &str,
) -> Result<()> {
    let template = registry.get(name).ok_or_else(|| {
        CompileError::new(
            ErrorKind::Internal,
            format!("analysis root '{}' is not in the registry", name),
        )
    })?;
    match template.kind {
        Some(kind) => {
            inferencer.analyze_template(name, Context::start_for_kind(kind))?;
        }
        None => {
            // A kindless entry point produces a full HTML document.
            let end = inferencer.analyze_template(name, Context::default())?;
            if end.state != State::Text {
                let mut message = format!("template ends inside markup: {}", end);
                if let Some(hint) = end.end_hint() {
                    message.push_str(" (");
                    message.push_str(hint);
                    message.push(')');
                }
                return Err(CompileError::new(ErrorKind::KindMismatch, message)
                    .at(name, template.span.line_1based()));
            }
        }
    }
    Ok(())
}
