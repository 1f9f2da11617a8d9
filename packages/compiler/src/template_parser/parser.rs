//! Recursive-descent parser from command tokens to the template tree.

use crate::chars;
use crate::parse_util::ParseSourceSpan;

use super::ast::*;
use super::lexer::{lex, Token, TokenKind};
use super::{NodeIdGen, SyntaxError};

/// Parse one source file into its namespace header and templates.
///
/// The id generator is shared across files registered into one
/// `TemplateRegistry`, so node identity is unique per compilation unit.
pub fn parse_file(
    source: &str,
    url: &str,
    ids: &mut NodeIdGen,
) -> Result<TemplateFile, SyntaxError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        url: url.to_string(),
        ids,
    };
    parser.parse_file()
}

/// What ended a `parse_nodes_until` scan.
enum Stop {
    /// `{/name}`
    End(String),
    /// An intermediate command such as `{elseif ...}` or `{case ...}`.
    Mid { name: String, rest: String },
    Eof,
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    url: String,
    ids: &'a mut NodeIdGen,
}

impl<'a> Parser<'a> {
    fn parse_file(&mut self) -> Result<TemplateFile, SyntaxError> {
        self.skip_whitespace_text();
        let (namespace, default_autoescape) = self.parse_namespace()?;

        let mut templates = Vec::new();
        loop {
            self.skip_whitespace_text();
            match self.next_token() {
                None => break,
                Some(Token { kind: TokenKind::Command { name, rest, self_closing }, span }) => {
                    if name != "template" || self_closing {
                        return Err(self.err("expected {template ...}", &span));
                    }
                    templates.push(self.parse_template(&rest, &namespace, default_autoescape, span)?);
                }
                Some(token) => {
                    let span = token.span.clone();
                    return Err(self.err("expected {template ...}", &span));
                }
            }
        }

        Ok(TemplateFile { namespace, default_autoescape, templates })
    }

    fn parse_namespace(&mut self) -> Result<(String, AutoescapeMode), SyntaxError> {
        match self.next_token() {
            Some(Token { kind: TokenKind::Command { name, rest, .. }, span }) if name == "namespace" => {
                let (ns, attrs) = split_head(&rest);
                if ns.is_empty() {
                    return Err(self.err("missing namespace name", &span));
                }
                let mut mode = AutoescapeMode::Contextual;
                for (key, value) in parse_attributes(&attrs, &span, &self.url)? {
                    match key.as_str() {
                        "autoescape" => {
                            mode = AutoescapeMode::parse(&value).ok_or_else(|| {
                                self.err(&format!("unknown autoescape mode '{}'", value), &span)
                            })?;
                        }
                        _ => return Err(self.err(&format!("unknown namespace attribute '{}'", key), &span)),
                    }
                }
                Ok((ns, mode))
            }
            Some(token) => {
                let span = token.span.clone();
                Err(self.err("file must start with {namespace ...}", &span))
            }
            None => Err(SyntaxError::new("empty template file", 0)),
        }
    }

    fn parse_template(
        &mut self,
        rest: &str,
        namespace: &str,
        default_autoescape: AutoescapeMode,
        span: ParseSourceSpan,
    ) -> Result<TemplateNode, SyntaxError> {
        let (name, attrs) = split_head(rest);
        let local = name.strip_prefix(chars::PERIOD).ok_or_else(|| {
            self.err("template name must start with '.'", &span)
        })?;
        if local.is_empty() {
            return Err(self.err("missing template name", &span));
        }

        let mut kind = None;
        let mut autoescape = default_autoescape;
        for (key, value) in parse_attributes(&attrs, &span, &self.url)? {
            match key.as_str() {
                "kind" => {
                    kind = Some(ContentKind::parse(&value).ok_or_else(|| {
                        self.err(&format!("unknown content kind '{}'", value), &span)
                    })?);
                }
                "autoescape" => {
                    autoescape = AutoescapeMode::parse(&value).ok_or_else(|| {
                        self.err(&format!("unknown autoescape mode '{}'", value), &span)
                    })?;
                }
                _ => return Err(self.err(&format!("unknown template attribute '{}'", key), &span)),
            }
        }
        // Strict templates always have a concrete kind.
        if autoescape == AutoescapeMode::Strict && kind.is_none() {
            kind = Some(ContentKind::Html);
        }

        let (body, stop) = self.parse_nodes_until(&["template"], &[])?;
        match stop {
            Stop::End(_) => {}
            _ => return Err(self.err("missing {/template}", &span)),
        }

        Ok(TemplateNode {
            name: local.to_string(),
            namespace: namespace.to_string(),
            kind,
            autoescape,
            body,
            span,
        })
    }

    /// Parse body nodes until `{/end}` for a name in `ends`, or an
    /// intermediate command named in `mids`, or end of input.
    fn parse_nodes_until(
        &mut self,
        ends: &[&str],
        mids: &[&str],
    ) -> Result<(Vec<Node>, Stop), SyntaxError> {
        let mut nodes = Vec::new();
        loop {
            let token = match self.next_token() {
                Some(token) => token,
                None => return Ok((nodes, Stop::Eof)),
            };
            let span = token.span.clone();
            match token.kind {
                TokenKind::RawText(value) => {
                    nodes.push(Node::RawText(RawTextNode { id: self.ids.next(), value, span }));
                }
                TokenKind::CommandEnd(name) => {
                    if ends.contains(&name.as_str()) {
                        return Ok((nodes, Stop::End(name)));
                    }
                    return Err(self.err(&format!("unexpected {{/{}}}", name), &span));
                }
                TokenKind::Command { name, rest, self_closing } => {
                    if mids.contains(&name.as_str()) {
                        return Ok((nodes, Stop::Mid { name, rest }));
                    }
                    nodes.push(self.parse_command(&name, &rest, self_closing, span)?);
                }
            }
        }
    }

    fn parse_command(
        &mut self,
        name: &str,
        rest: &str,
        self_closing: bool,
        span: ParseSourceSpan,
    ) -> Result<Node, SyntaxError> {
        match name {
            "print" => self.parse_print(rest, span),
            "if" => self.parse_if(rest, span),
            "switch" => self.parse_switch(rest, span),
            "for" => self.parse_loop(LoopKind::Range, rest, span),
            "foreach" => self.parse_loop(LoopKind::Collection, rest, span),
            "call" => self.parse_call(rest, self_closing, span),
            "let" => self.parse_let(rest, self_closing, span),
            _ => Err(self.err(&format!("unknown command '{{{}}}'", name), &span)),
        }
    }

    fn parse_print(&mut self, rest: &str, span: ParseSourceSpan) -> Result<Node, SyntaxError> {
        let segments = split_outside_quotes(rest, chars::BAR);
        let expr = segments[0].trim().to_string();
        if expr.is_empty() {
            return Err(self.err("missing print expression", &span));
        }
        let mut directives = Vec::new();
        for segment in &segments[1..] {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(self.err("empty print directive", &span));
            }
            let (name, args) = match segment.find(chars::COLON) {
                Some(i) => {
                    let args = split_outside_quotes(&segment[i + 1..], ',')
                        .into_iter()
                        .map(|a| a.trim().to_string())
                        .collect();
                    (segment[..i].trim().to_string(), args)
                }
                None => (segment.to_string(), Vec::new()),
            };
            directives.push(PrintDirective { name, args });
        }
        Ok(Node::Print(PrintNode { id: self.ids.next(), expr, directives, span }))
    }

    fn parse_if(&mut self, rest: &str, span: ParseSourceSpan) -> Result<Node, SyntaxError> {
        let mut branches = Vec::new();
        let mut else_children = None;
        let mut cond = rest.trim().to_string();
        if cond.is_empty() {
            return Err(self.err("missing {if} condition", &span));
        }
        loop {
            let (children, stop) = self.parse_nodes_until(&["if"], &["elseif", "else"])?;
            match stop {
                Stop::Mid { name, rest } if name == "elseif" => {
                    branches.push(IfBranch { cond, children, span: span.clone() });
                    cond = rest.trim().to_string();
                    if cond.is_empty() {
                        return Err(self.err("missing {elseif} condition", &span));
                    }
                }
                Stop::Mid { name, .. } if name == "else" => {
                    branches.push(IfBranch { cond, children, span: span.clone() });
                    let (children, stop) = self.parse_nodes_until(&["if"], &[])?;
                    match stop {
                        Stop::End(_) => {}
                        _ => return Err(self.err("missing {/if}", &span)),
                    }
                    else_children = Some(children);
                    break;
                }
                Stop::End(_) => {
                    branches.push(IfBranch { cond, children, span: span.clone() });
                    break;
                }
                _ => return Err(self.err("missing {/if}", &span)),
            }
        }
        Ok(Node::If(IfNode { id: self.ids.next(), branches, else_children, span }))
    }

    fn parse_switch(&mut self, rest: &str, span: ParseSourceSpan) -> Result<Node, SyntaxError> {
        let expr = rest.trim().to_string();
        if expr.is_empty() {
            return Err(self.err("missing {switch} expression", &span));
        }

        // Only whitespace may precede the first {case}.
        let (leading, mut stop) = self.parse_nodes_until(&["switch"], &["case", "default"])?;
        if !nodes_are_whitespace(&leading) {
            return Err(self.err("only whitespace allowed before first {case}", &span));
        }

        let mut cases = Vec::new();
        let mut default_children = None;
        loop {
            match stop {
                Stop::Mid { name, rest } if name == "case" => {
                    let exprs: Vec<String> = split_outside_quotes(&rest, ',')
                        .into_iter()
                        .map(|e| e.trim().to_string())
                        .collect();
                    if exprs.iter().any(|e| e.is_empty()) {
                        return Err(self.err("missing {case} expression", &span));
                    }
                    let (children, next) =
                        self.parse_nodes_until(&["switch"], &["case", "default"])?;
                    cases.push(SwitchCase { exprs, children, span: span.clone() });
                    stop = next;
                }
                Stop::Mid { name, .. } if name == "default" => {
                    let (children, next) = self.parse_nodes_until(&["switch"], &[])?;
                    default_children = Some(children);
                    match next {
                        Stop::End(_) => break,
                        _ => return Err(self.err("missing {/switch}", &span)),
                    }
                }
                Stop::End(_) => break,
                _ => return Err(self.err("missing {/switch}", &span)),
            }
        }
        Ok(Node::Switch(SwitchNode { id: self.ids.next(), expr, cases, default_children, span }))
    }

    fn parse_loop(
        &mut self,
        kind: LoopKind,
        rest: &str,
        span: ParseSourceSpan,
    ) -> Result<Node, SyntaxError> {
        let (var_name, expr) = parse_loop_header(rest)
            .ok_or_else(|| self.err("expected '$var in <expression>'", &span))?;
        let end = match kind {
            LoopKind::Range => "for",
            LoopKind::Collection => "foreach",
        };
        let mids: &[&str] = match kind {
            LoopKind::Range => &[],
            LoopKind::Collection => &["ifempty"],
        };
        let (children, stop) = self.parse_nodes_until(&[end], mids)?;
        let mut if_empty = None;
        match stop {
            Stop::End(_) => {}
            Stop::Mid { name, .. } if name == "ifempty" => {
                let (alt, stop) = self.parse_nodes_until(&[end], &[])?;
                match stop {
                    Stop::End(_) => {}
                    _ => return Err(self.err(&format!("missing {{/{}}}", end), &span)),
                }
                if_empty = Some(alt);
            }
            _ => return Err(self.err(&format!("missing {{/{}}}", end), &span)),
        }
        Ok(Node::Loop(LoopNode {
            id: self.ids.next(),
            kind,
            var_name,
            expr,
            children,
            if_empty,
            span,
        }))
    }

    fn parse_call(
        &mut self,
        rest: &str,
        self_closing: bool,
        span: ParseSourceSpan,
    ) -> Result<Node, SyntaxError> {
        let (target, attrs) = split_head(rest);
        if target.is_empty() {
            return Err(self.err("missing {call} target", &span));
        }
        let mut data_all = false;
        let mut data_expr = None;
        for (key, value) in parse_attributes(&attrs, &span, &self.url)? {
            match key.as_str() {
                "data" => {
                    if value == "all" {
                        data_all = true;
                    } else {
                        data_expr = Some(value);
                    }
                }
                _ => return Err(self.err(&format!("unknown call attribute '{}'", key), &span)),
            }
        }

        let mut params = Vec::new();
        if !self_closing {
            loop {
                let (leading, stop) = self.parse_nodes_until(&["call"], &["param"])?;
                if !nodes_are_whitespace(&leading) {
                    return Err(self.err("only {param} allowed inside {call}", &span));
                }
                match stop {
                    Stop::End(_) => break,
                    Stop::Mid { name, rest } if name == "param" => {
                        params.push(self.parse_param(&rest, &span)?);
                    }
                    _ => return Err(self.err("missing {/call}", &span)),
                }
            }
        }

        Ok(Node::Call(CallNode {
            id: self.ids.next(),
            target: target.to_string(),
            data_all,
            data_expr,
            params,
            escapes: Vec::new(),
            span,
        }))
    }

    /// Parses a `{param ...}` whose opening command has already been
    /// consumed. The lexer marks value params self-closing, but that flag
    /// is swallowed by `parse_nodes_until`, so the form is re-derived from
    /// the rest string: a `name: expr` rest is a value param, otherwise a
    /// block param runs until `{/param}`.
    fn parse_param(&mut self, rest: &str, span: &ParseSourceSpan) -> Result<CallParam, SyntaxError> {
        if let Some(i) = find_outside_quotes(rest, chars::COLON) {
            let name = rest[..i].trim().to_string();
            let expr = rest[i + 1..].trim().to_string();
            if name.is_empty() || expr.is_empty() {
                return Err(self.err("malformed {param}", span));
            }
            return Ok(CallParam {
                id: self.ids.next(),
                name,
                value: BlockValue::Expr(expr),
                span: span.clone(),
            });
        }

        let (name, attrs) = split_head(rest);
        if name.is_empty() {
            return Err(self.err("missing {param} name", span));
        }
        let kind = self.parse_kind_attr(&attrs, span)?;
        let (children, stop) = self.parse_nodes_until(&["param"], &[])?;
        match stop {
            Stop::End(_) => {}
            _ => return Err(self.err("missing {/param}", span)),
        }
        Ok(CallParam {
            id: self.ids.next(),
            name: name.to_string(),
            value: BlockValue::Block { kind, children },
            span: span.clone(),
        })
    }

    fn parse_let(
        &mut self,
        rest: &str,
        self_closing: bool,
        span: ParseSourceSpan,
    ) -> Result<Node, SyntaxError> {
        let rest = rest.trim();
        let var = rest.strip_prefix(chars::DOLLAR).ok_or_else(|| {
            self.err("let variable must start with '$'", &span)
        })?;

        if let Some(i) = find_outside_quotes(var, chars::COLON) {
            // `{let $x: expr /}` — value form, must be self-closing.
            if !self_closing {
                return Err(self.err("value {let} must be self-closing", &span));
            }
            let var_name = var[..i].trim().to_string();
            let expr = var[i + 1..].trim().to_string();
            if var_name.is_empty() || expr.is_empty() {
                return Err(self.err("malformed {let}", &span));
            }
            return Ok(Node::Let(LetNode {
                id: self.ids.next(),
                var_name,
                value: BlockValue::Expr(expr),
                span,
            }));
        }

        if self_closing {
            return Err(self.err("block {let} cannot be self-closing", &span));
        }
        let (var_name, attrs) = split_head(var);
        if var_name.is_empty() {
            return Err(self.err("missing {let} variable", &span));
        }
        let kind = self.parse_kind_attr(&attrs, &span)?;
        let (children, stop) = self.parse_nodes_until(&["let"], &[])?;
        match stop {
            Stop::End(_) => {}
            _ => return Err(self.err("missing {/let}", &span)),
        }
        Ok(Node::Let(LetNode {
            id: self.ids.next(),
            var_name: var_name.to_string(),
            value: BlockValue::Block { kind, children },
            span,
        }))
    }

    fn parse_kind_attr(
        &self,
        attrs: &str,
        span: &ParseSourceSpan,
    ) -> Result<Option<ContentKind>, SyntaxError> {
        let mut kind = None;
        for (key, value) in parse_attributes(attrs, span, &self.url)? {
            match key.as_str() {
                "kind" => {
                    kind = Some(ContentKind::parse(&value).ok_or_else(|| {
                        self.err(&format!("unknown content kind '{}'", value), span)
                    })?);
                }
                _ => return Err(self.err(&format!("unknown attribute '{}'", key), span)),
            }
        }
        Ok(kind)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_whitespace_text(&mut self) {
        while let Some(Token { kind: TokenKind::RawText(text), .. }) = self.tokens.get(self.pos) {
            if text.chars().all(chars::is_whitespace) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn err(&self, message: &str, span: &ParseSourceSpan) -> SyntaxError {
        SyntaxError::new(format!("{}: {}", self.url, message), span.start.line)
    }
}

fn nodes_are_whitespace(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::RawText(text) => text.value.chars().all(chars::is_whitespace),
        _ => false,
    })
}

/// Split `"head rest"` at the first whitespace.
fn split_head(s: &str) -> (String, String) {
    let s = s.trim();
    match s.find(|c: char| chars::is_whitespace(c)) {
        Some(i) => (s[..i].to_string(), s[i..].trim_start().to_string()),
        None => (s.to_string(), String::new()),
    }
}

/// Parse `key="value"` pairs.
fn parse_attributes(
    s: &str,
    span: &ParseSourceSpan,
    url: &str,
) -> Result<Vec<(String, String)>, SyntaxError> {
    let mut out = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        let eq = rest.find(chars::EQ).ok_or_else(|| {
            SyntaxError::new(format!("{}: malformed attribute '{}'", url, rest), span.start.line)
        })?;
        let key = rest[..eq].trim().to_string();
        let after = rest[eq + 1..].trim_start();
        let quote = after.chars().next().filter(|&c| c == chars::DQ || c == chars::SQ);
        let quote = quote.ok_or_else(|| {
            SyntaxError::new(format!("{}: attribute '{}' must be quoted", url, key), span.start.line)
        })?;
        let value_end = after[1..].find(quote).ok_or_else(|| {
            SyntaxError::new(format!("{}: unterminated attribute '{}'", url, key), span.start.line)
        })?;
        out.push((key, after[1..1 + value_end].to_string()));
        rest = after[value_end + 2..].trim_start();
    }
    Ok(out)
}

fn parse_loop_header(rest: &str) -> Option<(String, String)> {
    let rest = rest.trim();
    let var = rest.strip_prefix(chars::DOLLAR)?;
    let i = var.find(|c: char| chars::is_whitespace(c))?;
    let (name, tail) = var.split_at(i);
    let expr = tail.trim_start().strip_prefix("in ")?;
    if name.is_empty() || expr.trim().is_empty() {
        return None;
    }
    Some((name.to_string(), expr.trim().to_string()))
}

/// Split on `sep`, ignoring separators inside single/double quotes.
fn split_outside_quotes(s: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in s.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None => {
                if ch == chars::DQ || ch == chars::SQ {
                    quote = Some(ch);
                    current.push(ch);
                } else if ch == sep {
                    out.push(std::mem::take(&mut current));
                } else {
                    current.push(ch);
                }
            }
        }
    }
    out.push(current);
    out
}

fn find_outside_quotes(s: &str, needle: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == chars::DQ || ch == chars::SQ {
                    quote = Some(ch);
                } else if ch == needle {
                    return Some(i);
                }
            }
        }
    }
    None
}
