//! Literal-text context transitions: what a chunk of raw template text
//! does to the lexical context.
//!
//! One hand-rolled scanner per top-level state (HTML, CSS, JS, URL), each
//! with the repeated-call contract `scan(ctx, chunk) -> (new ctx, bytes
//! consumed)`. The driver `escape_raw_text` feeds chunks until exhaustion
//! and enforces progress: a zero-consumption step that also leaves the
//! context unchanged is an internal error, never a hang.
//!
//! Scanning Text/RCDATA has one content side effect: a literal `<` that
//! does not open a tag, comment or markup declaration is rewritten to
//! `&lt;` so the renderer never emits a stray angle bracket.

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::chars;

use super::attr_schema::{attr_type, element_type};
use super::context::{AttrType, Context, Delim, Element, JsCtx, State, UrlPart};
use super::ContextError;

/// Result of one scanner step over a chunk.
#[derive(Debug, Clone)]
pub struct Scan {
    pub ctx: Context,
    pub consumed: usize,
    /// Byte offsets (relative to the scanned chunk) of literal `<`
    /// characters that must be rewritten to `&lt;`.
    pub lt_rewrites: SmallVec<[usize; 4]>,
}

impl Scan {
    fn new(ctx: Context, consumed: usize) -> Self {
        Scan { ctx, consumed, lt_rewrites: SmallVec::new() }
    }
}

/// Process an entire raw-text node. Returns the resulting context and, when
/// `<`-rewriting changed the text, the rewritten copy.
pub fn escape_raw_text(ctx: Context, text: &str) -> Result<(Context, Option<String>), ContextError> {
    let mut c = ctx;
    let mut i = 0;
    let mut out: Option<String> = None;
    while i < text.len() {
        let scan = advance(c, &text[i..])?;
        if scan.consumed == 0 && scan.ctx == c {
            return Err(ContextError::internal(format!(
                "raw-text scanner made no progress in context {}",
                c
            )));
        }
        if scan.lt_rewrites.is_empty() {
            if let Some(out) = out.as_mut() {
                out.push_str(&text[i..i + scan.consumed]);
            }
        } else {
            let out = out.get_or_insert_with(|| text[..i].to_string());
            let region = &text[i..i + scan.consumed];
            let mut last = 0;
            for &p in &scan.lt_rewrites {
                out.push_str(&region[last..p]);
                out.push_str("&lt;");
                last = p + 1;
            }
            out.push_str(&region[last..]);
        }
        c = scan.ctx;
        i += scan.consumed;
    }
    Ok((c, out))
}

/// One scanner step: consume some prefix of `s` and return the context
/// after it. Exposed for tests; `escape_raw_text` is the normal entry.
pub fn advance(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    if s.is_empty() {
        return Ok(Scan::new(ctx, 0));
    }
    if ctx.state == State::Error {
        return Err(ContextError::internal("cannot scan text in error context"));
    }
    if ctx.delim == Delim::None {
        advance_free(ctx, s)
    } else {
        advance_in_attr(ctx, s)
    }
}

/// Step outside any attribute value. Special element bodies (script, style,
/// title, textarea) are ended by their close tag no matter which sub-state
/// the body language is in, so that marker is searched first.
fn advance_free(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    if ctx.element != Element::None && is_element_content_state(ctx.state) {
        if let Some(i) = find_special_end(s, ctx.element) {
            if i == 0 {
                // The close tag itself is re-scanned in Text state.
                return Ok(Scan::new(Context::default(), 0));
            }
            return dispatch(ctx, &s[..i]);
        }
    }
    dispatch(ctx, s)
}

/// Step inside an attribute value. The value end (closing quote, or
/// whitespace/`>` for unquoted values) is found first; the value language
/// scanners only ever see text inside the value.
fn advance_in_attr(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let value_end = match ctx.delim {
        Delim::DoubleQuote => s.find(chars::DQ),
        Delim::SingleQuote => s.find(chars::SQ),
        Delim::SpaceOrTagEnd => s.find(|c: char| chars::is_whitespace(c) || c == chars::GT),
        Delim::None => return Err(ContextError::internal("advance_in_attr without delimiter")),
    };
    let value_end = value_end.unwrap_or(s.len());

    if ctx.delim == Delim::SpaceOrTagEnd {
        if let Some(i) = s[..value_end].find(|c| c == chars::DQ || c == chars::SQ || c == chars::BT)
        {
            return Err(ContextError::new(format!(
                "{:?} in unquoted attribute value",
                &s[i..i + 1]
            )));
        }
    }

    let mut c = ctx;
    let mut k = 0;
    while k < value_end {
        let scan = dispatch(c, &s[k..value_end])?;
        if scan.consumed == 0 && scan.ctx == c {
            return Err(ContextError::internal(format!(
                "attribute-value scanner made no progress in context {}",
                c
            )));
        }
        c = scan.ctx;
        k += scan.consumed;
    }

    if value_end == s.len() {
        // Still inside the value.
        return Ok(Scan::new(c, s.len()));
    }

    // Exiting the attribute discards all value state except the element.
    let consumed = if ctx.delim == Delim::SpaceOrTagEnd {
        value_end
    } else {
        value_end + 1
    };
    let exit = Context {
        state: State::Tag,
        element: ctx.element,
        ..Context::default()
    };
    Ok(Scan::new(exit, consumed))
}

fn dispatch(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    match ctx.state {
        State::Text => scan_text(ctx, s),
        State::Rcdata => Ok(scan_rcdata(ctx, s)),
        State::TagName => scan_tag_name(ctx, s),
        State::Tag => scan_tag(ctx, s),
        State::AttrName => scan_attr_name(ctx, s),
        State::AfterName => Ok(scan_after_name(ctx, s)),
        State::BeforeValue => Ok(scan_before_value(ctx, s)),
        State::HtmlComment => Ok(scan_html_comment(ctx, s)),
        State::Attr => Ok(Scan::new(ctx, s.len())),
        State::Url => Ok(scan_url(ctx, s)),
        State::Js => scan_js(ctx, s),
        State::JsDqStr | State::JsSqStr | State::JsRegexp => scan_js_delimited(ctx, s),
        State::JsBlockComment => Ok(scan_block_comment(ctx, s, State::Js)),
        State::JsLineComment => Ok(scan_line_comment(ctx, s, State::Js)),
        State::Css => scan_css(ctx, s),
        State::CssDqStr | State::CssSqStr | State::CssDqUrl | State::CssSqUrl => {
            scan_css_str(ctx, s)
        }
        State::CssUrl => scan_css_url(ctx, s),
        State::CssBlockComment => Ok(scan_block_comment(ctx, s, State::Css)),
        State::CssLineComment => Ok(scan_line_comment(ctx, s, State::Css)),
        State::Error => Err(ContextError::internal("cannot scan text in error context")),
    }
}

fn is_element_content_state(state: State) -> bool {
    matches!(
        state,
        State::Rcdata
            | State::Js
            | State::JsDqStr
            | State::JsSqStr
            | State::JsRegexp
            | State::JsBlockComment
            | State::JsLineComment
            | State::Css
            | State::CssDqStr
            | State::CssSqStr
            | State::CssDqUrl
            | State::CssSqUrl
            | State::CssUrl
            | State::CssBlockComment
            | State::CssLineComment
    )
}

static SCRIPT_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</script[\t\n\x0C\r />]").unwrap());
static STYLE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</style[\t\n\x0C\r />]").unwrap());
static TEXTAREA_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</textarea[\t\n\x0C\r />]").unwrap());
static TITLE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</title[\t\n\x0C\r />]").unwrap());

/// Byte offset of the `<` of this element's close tag, if present.
fn find_special_end(s: &str, element: Element) -> Option<usize> {
    let re: &Regex = match element {
        Element::Script => &SCRIPT_END,
        Element::Style => &STYLE_END,
        Element::Textarea => &TEXTAREA_END,
        Element::Title => &TITLE_END,
        Element::None => return None,
    };
    re.find(s).map(|m| m.start())
}

// ---------------------------------------------------------------------------
// HTML scanners

fn scan_text(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let mut lt_rewrites = SmallVec::new();
    let mut k = 0;
    loop {
        let i = match s[k..].find(chars::LT) {
            Some(rel) => k + rel,
            None => {
                return Ok(Scan { ctx, consumed: s.len(), lt_rewrites });
            }
        };
        let after = &s[i + 1..];
        if after.starts_with("!--") {
            let next = Context { state: State::HtmlComment, ..Context::default() };
            return Ok(Scan { ctx: next, consumed: i + 4, lt_rewrites });
        }
        if after.starts_with(chars::BANG) || after.starts_with(chars::QUESTION) {
            // Markup declaration or processing instruction: skip to '>'.
            match s[i..].find(chars::GT) {
                Some(rel) => {
                    k = i + rel + 1;
                    continue;
                }
                None => return Ok(Scan { ctx, consumed: s.len(), lt_rewrites }),
            }
        }
        let mut t = i + 1;
        let closing = after.starts_with(chars::SLASH);
        if closing {
            t += 1;
        }
        if t == s.len() {
            // `<` or `</` at the end of the chunk: a dynamic tag name may
            // follow in the next node.
            let next = Context {
                state: State::TagName,
                close_tag: closing,
                ..Context::default()
            };
            return Ok(Scan { ctx: next, consumed: s.len(), lt_rewrites });
        }
        let j = eat_tag_name(s, t);
        if j > t {
            let element = if closing { Element::None } else { element_type(&s[t..j]) };
            let next = Context { state: State::Tag, element, ..Context::default() };
            return Ok(Scan { ctx: next, consumed: j, lt_rewrites });
        }
        // Literal '<': rewrite and keep scanning.
        lt_rewrites.push(i);
        k = t;
    }
}

/// Inside `<title>`/`<textarea>`. The close tag was intercepted before this
/// scanner runs, so every remaining `<` is literal text.
fn scan_rcdata(ctx: Context, s: &str) -> Scan {
    let mut lt_rewrites = SmallVec::new();
    let mut k = 0;
    while let Some(rel) = s[k..].find(chars::LT) {
        lt_rewrites.push(k + rel);
        k += rel + 1;
    }
    Scan { ctx, consumed: s.len(), lt_rewrites }
}

fn scan_tag_name(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    if !ctx.close_tag && s.starts_with(chars::SLASH) {
        // `</` split across chunks: the slash arrives at the head of the
        // next one.
        let next = Context { close_tag: true, ..ctx };
        return Ok(Scan::new(next, 1));
    }
    if !s.starts_with(chars::is_tag_name_start) {
        return Err(ContextError::new(format!(
            "expected tag name, found {:?}",
            &s[..s.len().min(10)]
        )));
    }
    let j = eat_tag_name(s, 0);
    let element = if ctx.close_tag { Element::None } else { element_type(&s[..j]) };
    let next = Context {
        state: State::Tag,
        element,
        close_tag: false,
        ..ctx
    };
    Ok(Scan::new(next, j))
}

fn scan_tag(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let i = eat_whitespace(s, 0);
    if i == s.len() {
        return Ok(Scan::new(ctx, s.len()));
    }
    if s[i..].starts_with(chars::GT) {
        // Tag closed: switch to the element's content language.
        let next = Context {
            state: ctx.element.content_state(),
            element: ctx.element,
            ..Context::default()
        };
        return Ok(Scan::new(next, i + 1));
    }
    let j = eat_attr_name(s, i)?;
    if j == i {
        return Err(ContextError::new(format!(
            "expected space, attribute name, or end of tag, found {:?}",
            &s[i..s.len().min(i + 10)]
        )));
    }
    let attr = attr_type(&s[i..j]);
    let state = if j == s.len() { State::AttrName } else { State::AfterName };
    let next = Context { state, attr, ..ctx };
    Ok(Scan::new(next, j))
}

fn scan_attr_name(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let j = eat_attr_name(s, 0)?;
    let mut next = ctx;
    if j != s.len() {
        next.state = State::AfterName;
    }
    Ok(Scan::new(next, j))
}

fn scan_after_name(ctx: Context, s: &str) -> Scan {
    let i = eat_whitespace(s, 0);
    if i == s.len() {
        return Scan::new(ctx, s.len());
    }
    if s[i..].starts_with(chars::EQ) {
        let next = Context { state: State::BeforeValue, ..ctx };
        return Scan::new(next, i + 1);
    }
    // Attribute without a value.
    let next = Context { state: State::Tag, attr: AttrType::None, ..ctx };
    Scan::new(next, i)
}

fn scan_before_value(ctx: Context, s: &str) -> Scan {
    let i = eat_whitespace(s, 0);
    if i == s.len() {
        return Scan::new(ctx, s.len());
    }
    let (delim, consumed) = match s[i..].chars().next() {
        Some(chars::DQ) => (Delim::DoubleQuote, i + 1),
        Some(chars::SQ) => (Delim::SingleQuote, i + 1),
        _ => (Delim::SpaceOrTagEnd, i),
    };
    let next = Context {
        state: ctx.attr.value_state(),
        delim,
        url_part: UrlPart::None,
        js_ctx: JsCtx::Regexp,
        ..ctx
    };
    Scan::new(next, consumed)
}

fn scan_html_comment(ctx: Context, s: &str) -> Scan {
    match s.find("-->") {
        Some(i) => Scan::new(Context::default(), i + 3),
        None => Scan::new(ctx, s.len()),
    }
}

// ---------------------------------------------------------------------------
// URL scanner

fn scan_url(mut ctx: Context, s: &str) -> Scan {
    url_update(&mut ctx, s);
    Scan::new(ctx, s.len())
}

fn url_update(ctx: &mut Context, s: &str) {
    if s.find(|c| c == chars::QUESTION || c == chars::HASH).is_some() {
        ctx.url_part = UrlPart::QueryOrFrag;
    } else if ctx.url_part == UrlPart::None && s.chars().any(|c| !chars::is_whitespace(c)) {
        ctx.url_part = UrlPart::PreQuery;
    }
}

// ---------------------------------------------------------------------------
// JS scanners

fn scan_js(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let mut c = ctx;
    let i = match s.find(|ch| ch == chars::DQ || ch == chars::SQ || ch == chars::SLASH) {
        None => {
            c.js_ctx = next_js_ctx(s, c.js_ctx);
            return Ok(Scan::new(c, s.len()));
        }
        Some(i) => i,
    };
    c.js_ctx = next_js_ctx(&s[..i], c.js_ctx);
    let rest = &s[i + 1..];
    let consumed = match s[i..].chars().next() {
        Some(chars::DQ) => {
            c.state = State::JsDqStr;
            c.js_ctx = JsCtx::Regexp;
            i + 1
        }
        Some(chars::SQ) => {
            c.state = State::JsSqStr;
            c.js_ctx = JsCtx::Regexp;
            i + 1
        }
        _ => {
            if rest.starts_with(chars::SLASH) {
                c.state = State::JsLineComment;
                i + 2
            } else if rest.starts_with(chars::STAR) {
                c.state = State::JsBlockComment;
                i + 2
            } else {
                match c.js_ctx {
                    JsCtx::Regexp => {
                        c.state = State::JsRegexp;
                        i + 1
                    }
                    JsCtx::DivOp => {
                        // Division; the next token is an operand.
                        c.js_ctx = JsCtx::Regexp;
                        i + 1
                    }
                    JsCtx::Unknown => {
                        return Err(ContextError::new(
                            "'/' could start a division or a regexp; cannot tell without \
                             knowing what precedes it",
                        ));
                    }
                }
            }
        }
    };
    Ok(Scan::new(c, consumed))
}

fn scan_js_delimited(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let is_special: fn(char) -> bool = match ctx.state {
        State::JsDqStr => |c| c == chars::DQ || c == chars::BACKSLASH,
        State::JsSqStr => |c| c == chars::SQ || c == chars::BACKSLASH,
        _ => |c| {
            c == chars::SLASH || c == chars::BACKSLASH || c == chars::LBRACKET || c == chars::RBRACKET
        },
    };
    let mut in_charset = false;
    let mut k = 0;
    while let Some(rel) = s[k..].find(is_special) {
        let i = k + rel;
        match s[i..].chars().next() {
            Some(chars::BACKSLASH) => {
                let mut esc = s[i + 1..].chars();
                match esc.next() {
                    None => {
                        return Err(ContextError::new(
                            "unfinished escape sequence in JS string or regexp",
                        ));
                    }
                    Some(ch) => k = i + 1 + ch.len_utf8(),
                }
            }
            Some(chars::LBRACKET) => {
                in_charset = true;
                k = i + 1;
            }
            Some(chars::RBRACKET) => {
                in_charset = false;
                k = i + 1;
            }
            _ => {
                if in_charset {
                    // A '/' inside a regexp charset does not end the regexp.
                    k = i + 1;
                } else {
                    let next = Context { state: State::Js, js_ctx: JsCtx::DivOp, ..ctx };
                    return Ok(Scan::new(next, i + 1));
                }
            }
        }
    }
    if in_charset {
        return Err(ContextError::new("unfinished JS regexp charset"));
    }
    Ok(Scan::new(ctx, s.len()))
}

/// The famous JS slash ambiguity: decide whether a `/` after this text
/// would start a regexp or be a division operator, from the last token.
fn next_js_ctx(s: &str, preceding: JsCtx) -> JsCtx {
    let s = s.trim_end_matches(|c| chars::is_whitespace(c) || c == '\u{2028}' || c == '\u{2029}');
    let last = match s.chars().last() {
        None => return preceding,
        Some(c) => c,
    };
    match last {
        chars::PLUS | chars::MINUS => {
            // `++`/`--` end an expression; a lone `+`/`-` is a binary or
            // unary operator. An odd-length run means the trailing sign is
            // an operator (`---` reads as `-- -`).
            let run = s.chars().rev().take_while(|&c| c == last).count();
            if run % 2 == 1 {
                JsCtx::Regexp
            } else {
                JsCtx::DivOp
            }
        }
        chars::PERIOD => {
            // `42.` is a number; a bare `.` is a property accessor.
            let before = s[..s.len() - 1].chars().last();
            match before {
                Some(c) if chars::is_digit(c) => JsCtx::DivOp,
                _ => JsCtx::Regexp,
            }
        }
        chars::RPAREN | chars::RBRACKET => JsCtx::DivOp,
        c if chars::is_js_ident_part(c) => {
            let word: String = s
                .chars()
                .rev()
                .take_while(|&c| chars::is_js_ident_part(c))
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if is_regexp_preceder_keyword(&word) {
                JsCtx::Regexp
            } else {
                JsCtx::DivOp
            }
        }
        _ => JsCtx::Regexp,
    }
}

fn is_regexp_preceder_keyword(word: &str) -> bool {
    matches!(
        word,
        "break"
            | "case"
            | "continue"
            | "delete"
            | "do"
            | "else"
            | "finally"
            | "in"
            | "instanceof"
            | "return"
            | "throw"
            | "try"
            | "typeof"
            | "void"
    )
}

fn scan_block_comment(ctx: Context, s: &str, exit: State) -> Scan {
    match s.find("*/") {
        Some(i) => {
            let next = Context { state: exit, ..ctx };
            Scan::new(next, i + 2)
        }
        None => Scan::new(ctx, s.len()),
    }
}

fn scan_line_comment(ctx: Context, s: &str, exit: State) -> Scan {
    match s.find(|c| c == chars::LF || c == chars::CR) {
        Some(i) => {
            // The newline itself is ordinary content for the outer state.
            let next = Context { state: exit, ..ctx };
            Scan::new(next, i)
        }
        None => Scan::new(ctx, s.len()),
    }
}

// ---------------------------------------------------------------------------
// CSS scanners

fn scan_css(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let mut k = 0;
    loop {
        let rel = match s[k..]
            .find(|c| c == chars::LPAREN || c == chars::DQ || c == chars::SQ || c == chars::SLASH)
        {
            Some(rel) => rel,
            None => return Ok(Scan::new(ctx, s.len())),
        };
        let i = k + rel;
        match s[i..].chars().next() {
            Some(chars::LPAREN) => {
                if ends_with_css_keyword(&s[..i], "url") {
                    // `url(` opens a URL context, optionally quoted.
                    let j = i + 1 + eat_whitespace(&s[i + 1..], 0);
                    let (state, consumed) = match s[j..].chars().next() {
                        Some(chars::DQ) => (State::CssDqUrl, j + 1),
                        Some(chars::SQ) => (State::CssSqUrl, j + 1),
                        _ => (State::CssUrl, j),
                    };
                    let next = Context { state, url_part: UrlPart::None, ..ctx };
                    return Ok(Scan::new(next, consumed));
                }
                k = i + 1;
            }
            Some(chars::DQ) => {
                let next = Context { state: State::CssDqStr, ..ctx };
                return Ok(Scan::new(next, i + 1));
            }
            Some(chars::SQ) => {
                let next = Context { state: State::CssSqStr, ..ctx };
                return Ok(Scan::new(next, i + 1));
            }
            _ => {
                let rest = &s[i + 1..];
                if rest.starts_with(chars::STAR) {
                    let next = Context { state: State::CssBlockComment, ..ctx };
                    return Ok(Scan::new(next, i + 2));
                }
                if rest.starts_with(chars::SLASH) {
                    let next = Context { state: State::CssLineComment, ..ctx };
                    return Ok(Scan::new(next, i + 2));
                }
                k = i + 1;
            }
        }
    }
}

/// Quoted CSS strings and quoted `url("...")` bodies.
fn scan_css_str(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let end = match ctx.state {
        State::CssDqStr | State::CssDqUrl => chars::DQ,
        _ => chars::SQ,
    };
    let track_url = ctx.state.is_css_url();
    let mut c = ctx;
    let mut k = 0;
    while let Some(rel) = s[k..].find(|ch| ch == end || ch == chars::BACKSLASH) {
        let i = k + rel;
        if s[i..].starts_with(chars::BACKSLASH) {
            let mut esc = s[i + 1..].chars();
            match esc.next() {
                None => return Err(ContextError::new("unfinished escape sequence in CSS string")),
                Some(ch) => k = i + 1 + ch.len_utf8(),
            }
        } else {
            if track_url {
                url_update(&mut c, &s[..i]);
            }
            let next = Context { state: State::Css, url_part: UrlPart::None, ..c };
            return Ok(Scan::new(next, i + 1));
        }
    }
    if track_url {
        url_update(&mut c, s);
    }
    Ok(Scan::new(c, s.len()))
}

/// Unquoted `url(...)` body: ends at whitespace or `)`.
fn scan_css_url(ctx: Context, s: &str) -> Result<Scan, ContextError> {
    let mut c = ctx;
    let mut k = 0;
    while let Some(rel) = s[k..].find(|ch: char| {
        chars::is_whitespace(ch) || ch == chars::RPAREN || ch == chars::BACKSLASH
    }) {
        let i = k + rel;
        if s[i..].starts_with(chars::BACKSLASH) {
            let mut esc = s[i + 1..].chars();
            match esc.next() {
                None => return Err(ContextError::new("unfinished escape sequence in CSS URL")),
                Some(ch) => k = i + 1 + ch.len_utf8(),
            }
        } else {
            url_update(&mut c, &s[..i]);
            let next = Context { state: State::Css, url_part: UrlPart::None, ..c };
            return Ok(Scan::new(next, i + 1));
        }
    }
    url_update(&mut c, s);
    Ok(Scan::new(c, s.len()))
}

fn ends_with_css_keyword(s: &str, keyword: &str) -> bool {
    let t = s.trim_end_matches(|c| chars::is_whitespace(c));
    if t.len() < keyword.len() {
        return false;
    }
    let split = t.len() - keyword.len();
    if !t.is_char_boundary(split) || !t[split..].eq_ignore_ascii_case(keyword) {
        return false;
    }
    // The keyword must not be an identifier suffix (`xurl(` is not `url(`).
    match t[..split].chars().last() {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || c == chars::MINUS || c == chars::UNDERSCORE),
    }
}

// ---------------------------------------------------------------------------
// Shared low-level eaters

/// Byte index of the first non-whitespace character at or after `from`.
fn eat_whitespace(s: &str, from: usize) -> usize {
    match s[from..].find(|c| !chars::is_whitespace(c)) {
        Some(rel) => from + rel,
        None => s.len(),
    }
}

/// Consume a tag name starting at `from`. Returns `from` when no name
/// starts there.
fn eat_tag_name(s: &str, from: usize) -> usize {
    if !s[from..].starts_with(chars::is_tag_name_start) {
        return from;
    }
    match s[from..].find(|c| !chars::is_tag_name_part(c)) {
        Some(rel) => from + rel,
        None => s.len(),
    }
}

/// Consume an attribute name starting at `from`. Quote characters and `<`
/// never belong in attribute names; seeing one is malformed markup.
fn eat_attr_name(s: &str, from: usize) -> Result<usize, ContextError> {
    for (rel, ch) in s[from..].char_indices() {
        match ch {
            c if chars::is_whitespace(c) => return Ok(from + rel),
            chars::EQ | chars::GT => return Ok(from + rel),
            chars::DQ | chars::SQ | chars::LT | chars::BT => {
                return Err(ContextError::new(format!("{:?} in attribute name", ch)));
            }
            _ => {}
        }
    }
    Ok(s.len())
}
