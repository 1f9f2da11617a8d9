//! Contextual inference: a depth-first walk over template bodies that
//! threads a `Context` through every node and records, per node id, the
//! escaping each dynamic site needs.
//!
//! The walk never mutates the tree. Everything it learns lands in an
//! [`Inference`] record that the commit pass applies afterwards, so a
//! failure anywhere leaves the registry untouched.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{CompileError, ErrorKind, Result};
use crate::parse_util::ParseSourceSpan;
use crate::template_parser::ast::{
    AutoescapeMode, BlockValue, CallNode, IfNode, LoopKind, LoopNode, Node, PrintDirective,
    PrintNode, SwitchNode, TemplateNode,
};
use crate::template_parser::{ContentKind, NodeId, TemplateRegistry};

use super::context::{Context, JsCtx, State, UrlPart};
use super::directives::DirectiveRegistry;
use super::modes::{escaping_modes_for, ModeList};
use super::raw_text::escape_raw_text;
use super::{ContextError, EscapeOptions};

/// Everything inference learned, keyed by node identity.
#[derive(Debug, Default)]
pub struct Inference {
    /// Final directive list for each print node (written directives plus
    /// appended escaping).
    pub print_directives: IndexMap<NodeId, Vec<PrintDirective>>,
    /// Escaping injected around a call whose output is used as a value.
    pub call_escapes: IndexMap<NodeId, Vec<String>>,
    /// Raw-text content as committed, recorded for every scanned raw-text
    /// node; differs from the source only where `&lt;` rewriting applied.
    pub text_rewrites: IndexMap<NodeId, String>,
    /// End context per (template, start context) pair.
    pub end_contexts: IndexMap<(String, Context), Context>,
}

/// The walker. Borrows the registry immutably for the whole analysis.
pub struct Inferencer<'a> {
    registry: &'a TemplateRegistry,
    directives: &'a DirectiveRegistry,
    options: &'a EscapeOptions,
    inference: Inference,
    in_progress: HashSet<(String, Context)>,
    reentered: HashSet<(String, Context)>,
    analyzed: HashSet<String>,
}

impl<'a> Inferencer<'a> {
    pub fn new(
        registry: &'a TemplateRegistry,
        directives: &'a DirectiveRegistry,
        options: &'a EscapeOptions,
    ) -> Self {
        Inferencer {
            registry,
            directives,
            options,
            inference: Inference::default(),
            in_progress: HashSet::new(),
            reentered: HashSet::new(),
            analyzed: HashSet::new(),
        }
    }

    pub fn into_inference(self) -> Inference {
        self.inference
    }

    pub fn was_analyzed(&self, name: &str) -> bool {
        self.analyzed.contains(name)
    }

    /// Analyze `name` starting in `start`, memoized per (template, start)
    /// pair. Re-entering a pair already on the walk stack returns `start`
    /// provisionally; the outer frame then insists the fixed point holds.
    pub fn analyze_template(&mut self, name: &str, start: Context) -> Result<Context> {
        let key = (name.to_string(), start);
        if let Some(end) = self.inference.end_contexts.get(&key) {
            return Ok(*end);
        }
        if self.in_progress.contains(&key) {
            self.reentered.insert(key);
            return Ok(start);
        }

        let template = self.registry.get(name).ok_or_else(|| {
            CompileError::new(
                ErrorKind::Internal,
                format!("analysis requested for unknown template '{}'", name),
            )
        })?;
        if template.autoescape == AutoescapeMode::Off {
            return Err(CompileError::new(
                ErrorKind::Internal,
                format!("analysis requested for unchecked template '{}'", name),
            ));
        }
        let line = template.span.line_1based();

        // Text-kind output has no lexical structure to track.
        if template.kind == Some(ContentKind::Text) {
            self.analyzed.insert(name.to_string());
            self.inference.end_contexts.insert(key, start);
            return Ok(start);
        }

        self.in_progress.insert(key.clone());
        let walked = self.infer_nodes(&template.body, start, template);
        self.in_progress.remove(&key);
        let end = walked?;

        if self.reentered.contains(&key) && end != start {
            return Err(CompileError::new(
                ErrorKind::AmbiguousContext,
                format!(
                    "cannot compute the output context of recursive template '{}': \
                     a pass through it moves the context from {} to {}",
                    name, start, end
                ),
            )
            .at(name, line));
        }
        if let Some(kind) = template.kind {
            if !end.is_valid_end_for_kind(kind) {
                return Err(kind_mismatch(
                    format!("template of kind \"{}\" ends in {}", kind.as_str(), end),
                    end,
                )
                .at(name, line));
            }
        }

        self.analyzed.insert(name.to_string());
        self.inference.end_contexts.insert(key, end);
        Ok(end)
    }

    fn infer_nodes(
        &mut self,
        nodes: &[Node],
        mut ctx: Context,
        template: &TemplateNode,
    ) -> Result<Context> {
        for node in nodes {
            ctx = self.infer_node(node, ctx, template)?;
        }
        Ok(ctx)
    }

    fn infer_node(&mut self, node: &Node, ctx: Context, template: &TemplateNode) -> Result<Context> {
        match node {
            Node::RawText(n) => {
                let (end, rewritten) = escape_raw_text(ctx, &n.value)
                    .map_err(|e| at(e, template, &n.span))?;
                let committed = rewritten.unwrap_or_else(|| n.value.clone());
                record(&mut self.inference.text_rewrites, n.id, committed, "this text")
                    .map_err(|e| at(e, template, &n.span))?;
                Ok(end)
            }
            Node::Print(n) => self.infer_print(n, ctx, template),
            Node::If(n) => self.infer_if(n, ctx, template),
            Node::Switch(n) => self.infer_switch(n, ctx, template),
            Node::Loop(n) => self.infer_loop(n, ctx, template),
            Node::Call(n) => self.infer_call(n, ctx, template),
            Node::Let(n) => self.infer_block_value(&n.value, ctx, template, &n.span),
        }
    }

    fn infer_print(&mut self, n: &PrintNode, ctx: Context, template: &TemplateNode) -> Result<Context> {
        if let Some(d) = n
            .directives
            .iter()
            .find(|d| self.directives.cancels_autoescape(&d.name))
        {
            return Err(CompileError::new(
                ErrorKind::DirectiveIncompatibility,
                format!(
                    "directive '|{}' turns off escaping and is only allowed in text content",
                    d.name
                ),
            )
            .at(&template.full_name(), n.span.line_1based()));
        }

        let ctx = ctx.nudge();
        let inferred = escaping_modes_for(ctx).map_err(|e| at(e, template, &n.span))?;
        let merged = self
            .merge_directives(&n.directives, &inferred)
            .map_err(|e| at(e, template, &n.span))?;
        record(&mut self.inference.print_directives, n.id, merged, "this print")
            .map_err(|e| at(e, template, &n.span))?;
        Ok(context_after_dynamic(ctx))
    }

    /// Combine the directives written on a print with the inferred
    /// escaping. Written escaping directives must form a prefix of the
    /// inferred list; the remainder is appended, which is what makes a
    /// second compile of already-escaped output a no-op.
    fn merge_directives(
        &self,
        written: &[PrintDirective],
        inferred: &ModeList,
    ) -> std::result::Result<Vec<PrintDirective>, ContextError> {
        let escaping: Vec<&str> = written
            .iter()
            .filter(|d| self.directives.is_escaping(&d.name))
            .map(|d| d.name.as_str())
            .collect();
        for (i, name) in escaping.iter().enumerate() {
            let expected = inferred.get(i).map(|m| m.directive_name());
            if expected != Some(*name) {
                return Err(ContextError {
                    kind: ErrorKind::DirectiveIncompatibility,
                    message: format!(
                        "explicit escaping '|{}' does not match the escaping [{}] this \
                         context requires",
                        name,
                        join_modes(inferred)
                    ),
                });
            }
        }
        let mut merged = written.to_vec();
        for mode in inferred.iter().skip(escaping.len()) {
            merged.push(PrintDirective::bare(mode.directive_name()));
        }
        Ok(merged)
    }

    fn infer_if(&mut self, n: &IfNode, ctx: Context, template: &TemplateNode) -> Result<Context> {
        let mut ends: Vec<(&'static str, Context)> = Vec::new();
        for (i, branch) in n.branches.iter().enumerate() {
            let label = if i == 0 { "{if} branch" } else { "{elseif} branch" };
            let end = self.infer_nodes(&branch.children, ctx, template)?;
            ends.push((label, end));
        }
        match &n.else_children {
            Some(children) => {
                let end = self.infer_nodes(children, ctx, template)?;
                ends.push(("{else} branch", end));
            }
            // Without {else} the construct can also emit nothing.
            None => ends.push(("implicit empty branch", ctx)),
        }
        join_branches(ends).map_err(|e| at(e, template, &n.span))
    }

    fn infer_switch(&mut self, n: &SwitchNode, ctx: Context, template: &TemplateNode) -> Result<Context> {
        let mut ends: Vec<(&'static str, Context)> = Vec::new();
        for case in &n.cases {
            let end = self.infer_nodes(&case.children, ctx, template)?;
            ends.push(("{case} branch", end));
        }
        match &n.default_children {
            Some(children) => {
                let end = self.infer_nodes(children, ctx, template)?;
                ends.push(("{default} branch", end));
            }
            None => ends.push(("implicit empty branch", ctx)),
        }
        join_branches(ends).map_err(|e| at(e, template, &n.span))
    }

    fn infer_loop(&mut self, n: &LoopNode, ctx: Context, template: &TemplateNode) -> Result<Context> {
        let command = match n.kind {
            LoopKind::Range => "{for}",
            LoopKind::Collection => "{foreach}",
        };
        let body_end = self.infer_nodes(&n.children, ctx, template)?;
        if body_end != ctx {
            return Err(CompileError::new(
                ErrorKind::BranchDivergence,
                format!(
                    "{} body changes context: an iteration starts in {} but ends in {}",
                    command, ctx, body_end
                ),
            )
            .at(&template.full_name(), n.span.line_1based()));
        }
        if let Some(children) = &n.if_empty {
            let end = self.infer_nodes(children, ctx, template)?;
            if end != ctx {
                return Err(CompileError::new(
                    ErrorKind::BranchDivergence,
                    format!(
                        "{{ifempty}} branch ends in {} but the loop requires {}",
                        end, ctx
                    ),
                )
                .at(&template.full_name(), n.span.line_1based()));
            }
        }
        Ok(ctx)
    }

    fn infer_call(&mut self, n: &CallNode, ctx: Context, template: &TemplateNode) -> Result<Context> {
        for param in &n.params {
            // Param content is consumed by the callee, not emitted here,
            // so its end does not move the call-site context.
            self.infer_block_value(&param.value, ctx, template, &param.span)?;
        }

        let target = TemplateRegistry::resolve_target(&template.namespace, &n.target);
        let callee = self.registry.get(&target);

        let callee = match callee {
            Some(t) if t.autoescape != AutoescapeMode::Off => t,
            Some(_) => return self.infer_opaque_call(n, ctx, template),
            None => {
                if self.options.require_call_resolution {
                    return Err(CompileError::new(
                        ErrorKind::UnresolvableCall,
                        format!("call target '{}' is not defined", target),
                    )
                    .at(&template.full_name(), n.span.line_1based()));
                }
                return self.infer_opaque_call(n, ctx, template);
            }
        };

        match callee.kind {
            // A text-kind callee produces a plain value; escape like a print.
            Some(ContentKind::Text) => {
                self.analyze_template(&target, Context::default())?;
                let nudged = ctx.nudge();
                let modes = escaping_modes_for(nudged).map_err(|e| at(e, template, &n.span))?;
                self.record_call_escapes(n.id, &modes)
                    .map_err(|e| at(e, template, &n.span))?;
                Ok(context_after_dynamic(nudged))
            }
            Some(kind) => {
                // Kind-declared callees always analyze from their kind's
                // canonical start, independent of any call site.
                self.analyze_template(&target, Context::start_for_kind(kind))?;
                if ctx.expected_kind() == Some(kind) {
                    Ok(context_after_dynamic(ctx))
                } else {
                    let nudged = ctx.nudge();
                    let modes =
                        escaping_modes_for(nudged).map_err(|e| at(e, template, &n.span))?;
                    self.record_call_escapes(n.id, &modes)
                        .map_err(|e| at(e, template, &n.span))?;
                    Ok(context_after_dynamic(nudged))
                }
            }
            // Kindless callee: inlined into the caller's context.
            None => self
                .analyze_template(&target, ctx)
                .map_err(|e| e.at(&template.full_name(), n.span.line_1based())),
        }
    }

    /// Call whose output cannot be analyzed (unknown target or unchecked
    /// callee): treat it as printing an opaque value.
    fn infer_opaque_call(
        &mut self,
        n: &CallNode,
        ctx: Context,
        template: &TemplateNode,
    ) -> Result<Context> {
        let nudged = ctx.nudge();
        let modes = escaping_modes_for(nudged).map_err(|e| at(e, template, &n.span))?;
        self.record_call_escapes(n.id, &modes)
            .map_err(|e| at(e, template, &n.span))?;
        let mut after = context_after_dynamic(nudged);
        if nudged.state == State::Js {
            // Opaque content may end mid-expression; a following '/' would
            // be unescapable, and the scanner reports it as such.
            after.js_ctx = JsCtx::Unknown;
        }
        Ok(after)
    }

    fn record_call_escapes(
        &mut self,
        id: NodeId,
        modes: &ModeList,
    ) -> std::result::Result<(), ContextError> {
        record(
            &mut self.inference.call_escapes,
            id,
            modes.iter().map(|m| m.directive_name().to_string()).collect(),
            "this call",
        )
    }

    /// `{let}`/`{param}` values. Typed blocks get an isolated sub-walk from
    /// their kind's start context and leave the enclosing context alone; an
    /// untyped block is walked in the enclosing context and its end becomes
    /// the context after the binding, the same as ordinary body content.
    fn infer_block_value(
        &mut self,
        value: &BlockValue,
        ctx: Context,
        template: &TemplateNode,
        span: &ParseSourceSpan,
    ) -> Result<Context> {
        match value {
            BlockValue::Expr(_) => Ok(ctx),
            BlockValue::Block { kind: Some(ContentKind::Text), .. } => {
                // Text content: no lexical analysis, no escaping inside.
                Ok(ctx)
            }
            BlockValue::Block { kind: Some(kind), children } => {
                let start = Context::start_for_kind(*kind);
                let end = self.infer_nodes(children, start, template)?;
                if !end.is_valid_end_for_kind(*kind) {
                    return Err(kind_mismatch(
                        format!("block of kind \"{}\" ends in {}", kind.as_str(), end),
                        end,
                    )
                    .at(&template.full_name(), span.line_1based()));
                }
                Ok(ctx)
            }
            BlockValue::Block { kind: None, children } => {
                self.infer_nodes(children, ctx, template)
            }
        }
    }
}

/// Record a per-node decision. A template reached from several distinct
/// start contexts is re-walked once per context, so the same node can be
/// recorded more than once; identical re-derivations are fine, conflicting
/// ones have no single safe answer.
fn record<V: PartialEq>(
    map: &mut IndexMap<NodeId, V>,
    id: NodeId,
    value: V,
    what: &str,
) -> std::result::Result<(), ContextError> {
    match map.get(&id) {
        Some(prev) if *prev != value => Err(ContextError::new(format!(
            "{} needs different escaping in each context its template is called from; \
             declare a kind on the template",
            what
        ))),
        Some(_) => Ok(()),
        None => {
            map.insert(id, value);
            Ok(())
        }
    }
}

/// Context after a dynamic value (print or call output) lands in `ctx`.
fn context_after_dynamic(ctx: Context) -> Context {
    let mut after = ctx;
    match ctx.state {
        // The value may have contained '?', so the part boundary is lost.
        State::Url | State::CssUrl | State::CssDqUrl | State::CssSqUrl => {
            if matches!(ctx.url_part, UrlPart::None | UrlPart::PreQuery) {
                after.url_part = UrlPart::Unknown;
            }
        }
        // An expression value just ended.
        State::Js => after.js_ctx = JsCtx::DivOp,
        // A dynamic tag name completes the name.
        State::TagName => {
            after.state = State::Tag;
            after.close_tag = false;
        }
        _ => {}
    }
    after
}

fn join_branches(ends: Vec<(&'static str, Context)>) -> std::result::Result<Context, ContextError> {
    let (first_label, first) = ends[0];
    for (label, end) in &ends[1..] {
        if *end != first {
            return Err(ContextError {
                kind: ErrorKind::BranchDivergence,
                message: format!(
                    "branch contexts diverge: {} ends in {}, but {} ends in {}",
                    first_label, first, label, end
                ),
            });
        }
    }
    Ok(first)
}

fn kind_mismatch(mut message: String, end: Context) -> CompileError {
    if let Some(hint) = end.end_hint() {
        message.push_str(" (");
        message.push_str(hint);
        message.push(')');
    }
    CompileError::new(ErrorKind::KindMismatch, message)
}

fn join_modes(modes: &ModeList) -> String {
    modes
        .iter()
        .map(|m| m.directive_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn at(e: ContextError, template: &TemplateNode, span: &ParseSourceSpan) -> CompileError {
    CompileError::new(e.kind, e.message).at(&template.full_name(), span.line_1based())
}
