//! Template AST node definitions.
//!
//! The node set is a closed tagged union: the inference engine and the
//! rewrite pass both dispatch with exhaustive `match`es, so adding a node
//! kind is a compile-time-visible event everywhere it matters.

use crate::parse_util::ParseSourceSpan;

/// Stable node identity, unique within one parse session. The inference
/// record is keyed by this, never by content: the same textual print can
/// occur in two different contexts and need different escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Declared content type of a template or typed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Html,
    Css,
    Uri,
    Attributes,
    Js,
}

impl ContentKind {
    pub fn parse(s: &str) -> Option<ContentKind> {
        match s {
            "text" => Some(ContentKind::Text),
            "html" => Some(ContentKind::Html),
            "css" => Some(ContentKind::Css),
            "uri" => Some(ContentKind::Uri),
            "attributes" => Some(ContentKind::Attributes),
            "js" => Some(ContentKind::Js),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Html => "html",
            ContentKind::Css => "css",
            ContentKind::Uri => "uri",
            ContentKind::Attributes => "attributes",
            ContentKind::Js => "js",
        }
    }
}

/// Autoescape mode declared on a namespace or template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoescapeMode {
    /// Contextual inference (the default).
    Contextual,
    /// Contextual inference with a declared kind; kind defaults to html.
    Strict,
    /// Template is excluded from analysis; calls to it are treated as
    /// opaque dynamic values by checked callers.
    Off,
}

impl AutoescapeMode {
    pub fn parse(s: &str) -> Option<AutoescapeMode> {
        match s {
            "contextual" => Some(AutoescapeMode::Contextual),
            "strict" => Some(AutoescapeMode::Strict),
            "false" => Some(AutoescapeMode::Off),
            _ => None,
        }
    }
}

/// Node type union
#[derive(Debug, Clone)]
pub enum Node {
    RawText(RawTextNode),
    Print(PrintNode),
    If(IfNode),
    Switch(SwitchNode),
    Loop(LoopNode),
    Call(CallNode),
    Let(LetNode),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::RawText(n) => n.id,
            Node::Print(n) => n.id,
            Node::If(n) => n.id,
            Node::Switch(n) => n.id,
            Node::Loop(n) => n.id,
            Node::Call(n) => n.id,
            Node::Let(n) => n.id,
        }
    }

    pub fn span(&self) -> &ParseSourceSpan {
        match self {
            Node::RawText(n) => &n.span,
            Node::Print(n) => &n.span,
            Node::If(n) => &n.span,
            Node::Switch(n) => &n.span,
            Node::Loop(n) => &n.span,
            Node::Call(n) => &n.span,
            Node::Let(n) => &n.span,
        }
    }
}

/// Literal template text between commands.
#[derive(Debug, Clone)]
pub struct RawTextNode {
    pub id: NodeId,
    pub value: String,
    pub span: ParseSourceSpan,
}

/// A `|name:arg,arg` directive on a print command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintDirective {
    pub name: String,
    pub args: Vec<String>,
}

impl PrintDirective {
    pub fn bare(name: impl Into<String>) -> Self {
        PrintDirective { name: name.into(), args: Vec::new() }
    }
}

/// Dynamic print site: `{$expr|directive}` or `{print $expr}`.
///
/// The expression is kept opaque; evaluation belongs to the renderer.
#[derive(Debug, Clone)]
pub struct PrintNode {
    pub id: NodeId,
    pub expr: String,
    pub directives: Vec<PrintDirective>,
    pub span: ParseSourceSpan,
}

/// One `{if}`/`{elseif}` arm.
#[derive(Debug, Clone)]
pub struct IfBranch {
    pub cond: String,
    pub children: Vec<Node>,
    pub span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct IfNode {
    pub id: NodeId,
    pub branches: Vec<IfBranch>,
    pub else_children: Option<Vec<Node>>,
    pub span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub exprs: Vec<String>,
    pub children: Vec<Node>,
    pub span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchNode {
    pub id: NodeId,
    pub expr: String,
    pub cases: Vec<SwitchCase>,
    pub default_children: Option<Vec<Node>>,
    pub span: ParseSourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// `{for $i in range(...)}`
    Range,
    /// `{foreach $x in $xs}`
    Collection,
}

#[derive(Debug, Clone)]
pub struct LoopNode {
    pub id: NodeId,
    pub kind: LoopKind,
    pub var_name: String,
    pub expr: String,
    pub children: Vec<Node>,
    /// `{ifempty}` alternative of a `{foreach}`.
    pub if_empty: Option<Vec<Node>>,
    pub span: ParseSourceSpan,
}

/// Value of a `{let}` or `{param}`: either an inline expression or a
/// content block, optionally with a declared kind.
#[derive(Debug, Clone)]
pub enum BlockValue {
    Expr(String),
    Block {
        kind: Option<ContentKind>,
        children: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct CallParam {
    pub id: NodeId,
    pub name: String,
    pub value: BlockValue,
    pub span: ParseSourceSpan,
}

/// Sub-template call. `escapes` starts empty and is filled by the commit
/// pass when the call site itself needs escaping (strict kind crossing or
/// opaque callee).
#[derive(Debug, Clone)]
pub struct CallNode {
    pub id: NodeId,
    /// Target as written: `.local` or `fully.qualified.name`.
    pub target: String,
    pub data_all: bool,
    pub data_expr: Option<String>,
    pub params: Vec<CallParam>,
    pub escapes: Vec<String>,
    pub span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct LetNode {
    pub id: NodeId,
    pub var_name: String,
    pub value: BlockValue,
    pub span: ParseSourceSpan,
}

/// A parsed `{template}` declaration.
#[derive(Debug, Clone)]
pub struct TemplateNode {
    /// Local name without the leading dot.
    pub name: String,
    pub namespace: String,
    pub kind: Option<ContentKind>,
    pub autoescape: AutoescapeMode,
    pub body: Vec<Node>,
    pub span: ParseSourceSpan,
}

impl TemplateNode {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// A parsed source file: namespace header plus its templates.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub namespace: String,
    pub default_autoescape: AutoescapeMode,
    pub templates: Vec<TemplateNode>,
}
