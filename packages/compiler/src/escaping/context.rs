//! The lexical context model: a total, comparable snapshot of "where in
//! the output grammar we currently are".
//!
//! Contexts are plain values, threaded immutably through the inference
//! walk. Two branches are compatible iff their end contexts are
//! structurally equal; there is no widening or subtyping, because safely
//! continuing output after a merge requires knowing exactly how to keep
//! escaping.

use crate::template_parser::ContentKind;

/// Parser state within the output grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Plain HTML body text (PCDATA).
    Text,
    /// Inside `<title>` or `<textarea>`.
    Rcdata,
    /// Immediately after `<` or `</`, before any name character.
    TagName,
    /// Inside a tag, before/between attributes.
    Tag,
    /// Inside an attribute name.
    AttrName,
    /// After an attribute name, before a possible `=`.
    AfterName,
    /// After `=`, before the value.
    BeforeValue,
    HtmlComment,
    /// Plain (non-URL, non-JS, non-CSS) attribute value.
    Attr,
    /// URL-valued position (URL attribute value, or inside `url()`).
    Url,
    /// JS statement/expression position.
    Js,
    JsDqStr,
    JsSqStr,
    JsRegexp,
    JsBlockComment,
    JsLineComment,
    /// CSS value position (style element or attribute).
    Css,
    CssDqStr,
    CssSqStr,
    CssDqUrl,
    CssSqUrl,
    CssUrl,
    CssBlockComment,
    CssLineComment,
    /// Terminal: analysis proved this output cannot be escaped safely.
    Error,
}

impl State {
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            State::HtmlComment
                | State::JsBlockComment
                | State::JsLineComment
                | State::CssBlockComment
                | State::CssLineComment
        )
    }

    /// States whose literal content is scanned by the CSS string/URL
    /// scanner family.
    pub fn is_css_url(self) -> bool {
        matches!(self, State::CssUrl | State::CssDqUrl | State::CssSqUrl)
    }
}

/// Quote/terminator class enclosing the current attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delim {
    None,
    DoubleQuote,
    SingleQuote,
    /// Unquoted attribute value: ends at whitespace or `>`.
    SpaceOrTagEnd,
}

/// Position within a URL value. Escaping differs before vs. after `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlPart {
    /// Nothing emitted yet; a dynamic value here is a whole URL.
    None,
    /// In the scheme/authority/path, before any `?` or `#`.
    PreQuery,
    /// After a literal `?` or `#`.
    QueryOrFrag,
    /// Dynamic content was emitted before any literal `?`; the boundary
    /// cannot be known. Printing here is a hard error.
    Unknown,
}

/// Whether a following `/` in JS starts a regex literal or is division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsCtx {
    /// A `/` starts a regex literal.
    Regexp,
    /// A `/` is a division operator.
    DivOp,
    /// Undetermined (after an opaque call); a `/` is a hard error.
    Unknown,
}

/// Category of the attribute whose value is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    None,
    Url,
    Js,
    Css,
}

/// The open element, when its identity changes how content is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    None,
    Script,
    Style,
    Textarea,
    Title,
}

impl Element {
    /// State of this element's body content once its start tag closes.
    pub fn content_state(self) -> State {
        match self {
            Element::None => State::Text,
            Element::Script => State::Js,
            Element::Style => State::Css,
            Element::Textarea | Element::Title => State::Rcdata,
        }
    }
}

/// Lexical context snapshot. `Copy` and hashable so it can key the
/// (template, start-context) memo map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context {
    pub state: State,
    pub delim: Delim,
    pub url_part: UrlPart,
    pub js_ctx: JsCtx,
    pub attr: AttrType,
    pub element: Element,
    /// In the name position of a close tag (after `</`). Only meaningful
    /// while `state` is [`State::TagName`].
    pub close_tag: bool,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            state: State::Text,
            delim: Delim::None,
            url_part: UrlPart::None,
            js_ctx: JsCtx::Regexp,
            attr: AttrType::None,
            element: Element::None,
            close_tag: false,
        }
    }
}

impl Context {
    /// Canonical start context for a declared content kind.
    pub fn start_for_kind(kind: ContentKind) -> Context {
        let mut ctx = Context::default();
        match kind {
            ContentKind::Html | ContentKind::Text => {}
            ContentKind::Css => ctx.state = State::Css,
            ContentKind::Js => ctx.state = State::Js,
            ContentKind::Uri => ctx.state = State::Url,
            ContentKind::Attributes => ctx.state = State::Tag,
        }
        ctx
    }

    /// Whether this context is an acceptable end for the declared kind.
    pub fn is_valid_end_for_kind(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Text => true,
            ContentKind::Html => self.state == State::Text,
            ContentKind::Css => self.state == State::Css,
            ContentKind::Js => self.state == State::Js,
            // At least one character must have been emitted: an empty URI
            // block has no part classification to escape against.
            ContentKind::Uri => self.state == State::Url && self.url_part != UrlPart::None,
            ContentKind::Attributes => {
                matches!(self.state, State::Tag | State::AttrName | State::AfterName)
            }
        }
    }

    /// The content kind a value printed here is expected to be, when the
    /// position corresponds exactly to a kind's canonical start. Used to
    /// decide that a strict call needs no escaping at the call site.
    pub fn expected_kind(&self) -> Option<ContentKind> {
        if self.delim != Delim::None {
            return None;
        }
        match self.state {
            State::Text | State::Rcdata => Some(ContentKind::Html),
            State::Css => Some(ContentKind::Css),
            State::Js => Some(ContentKind::Js),
            State::Url if self.url_part == UrlPart::None => Some(ContentKind::Uri),
            State::Tag => Some(ContentKind::Attributes),
            _ => None,
        }
    }

    /// Follow empty-string transitions to the context a dynamic value
    /// actually lands in. `<a href=` parses to BeforeValue, but a dynamic
    /// value there starts an unquoted URL attribute value.
    pub fn nudge(&self) -> Context {
        let mut ctx = *self;
        match ctx.state {
            // `<foo {$x}`: the value emits an attribute (name or pair).
            State::Tag | State::AfterName => {
                ctx.state = State::AttrName;
                ctx.attr = AttrType::None;
            }
            State::BeforeValue => {
                ctx.state = ctx.attr.value_state();
                ctx.delim = Delim::SpaceOrTagEnd;
            }
            _ => {}
        }
        ctx
    }

    /// Advisory guess at what an invalid end context means, appended to
    /// kind-mismatch diagnostics.
    pub fn end_hint(&self) -> Option<&'static str> {
        match self.state {
            State::Js
            | State::JsDqStr
            | State::JsSqStr
            | State::JsRegexp
            | State::JsBlockComment
            | State::JsLineComment
                if self.element == Element::Script =>
            {
                Some("unclosed script block")
            }
            State::Css
            | State::CssDqStr
            | State::CssSqStr
            | State::CssDqUrl
            | State::CssSqUrl
            | State::CssUrl
            | State::CssBlockComment
            | State::CssLineComment
                if self.element == Element::Style =>
            {
                Some("unclosed style block")
            }
            _ if self.delim != Delim::None => Some("unterminated attribute value"),
            State::Rcdata => Some("unclosed title or textarea element"),
            State::HtmlComment => Some("unterminated HTML comment"),
            State::JsBlockComment | State::CssBlockComment => Some("unterminated comment"),
            State::TagName | State::Tag | State::AttrName | State::AfterName
            | State::BeforeValue => Some("unclosed tag"),
            _ => None,
        }
    }
}

impl AttrType {
    /// Value state entered when this attribute's value begins.
    pub fn value_state(self) -> State {
        match self {
            AttrType::None => State::Attr,
            AttrType::Url => State::Url,
            AttrType::Js => State::Js,
            AttrType::Css => State::Css,
        }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.state)?;
        if self.delim != Delim::None {
            write!(f, " delim={:?}", self.delim)?;
        }
        if self.url_part != UrlPart::None {
            write!(f, " urlPart={:?}", self.url_part)?;
        }
        if matches!(
            self.state,
            State::Js | State::JsBlockComment | State::JsLineComment
        ) {
            write!(f, " jsCtx={:?}", self.js_ctx)?;
        }
        if self.attr != AttrType::None {
            write!(f, " attr={:?}", self.attr)?;
        }
        if self.element != Element::None {
            write!(f, " element={:?}", self.element)?;
        }
        if self.close_tag {
            write!(f, " closeTag")?;
        }
        Ok(())
    }
}
