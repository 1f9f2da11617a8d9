//! Template command lexer.
//!
//! Splits template source into raw-text runs and `{command}` tokens. The
//! contents of a command are kept as an uninterpreted string; the parser
//! gives them structure. Special character commands (`{sp}`, `{nil}`,
//! `{lb}`, `{rb}`, `{\n}`) lex directly to raw text.

use crate::chars;
use crate::parse_util::{ParseLocation, ParseSourceSpan};
use once_cell::sync::Lazy;
use regex::Regex;

use super::SyntaxError;

static CR_OR_CRLF_REGEXP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal output text.
    RawText(String),
    /// `{name rest}`; `self_closing` for `{... /}` forms.
    Command {
        name: String,
        rest: String,
        self_closing: bool,
    },
    /// `{/name}`.
    CommandEnd(String),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ParseSourceSpan,
}

/// Tokenize a template source file. Line endings are normalized to LF
/// before scanning, so spans count normalized characters.
pub fn lex(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let normalized = CR_OR_CRLF_REGEXP.replace_all(source, "\n");
    let mut lexer = Lexer::new(&normalized);
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> char {
        self.input.get(self.pos).copied().unwrap_or(chars::EOF)
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        if ch != chars::EOF {
            self.pos += 1;
            if ch == chars::LF {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn location(&self) -> ParseLocation {
        ParseLocation::new(self.pos, self.line, self.col)
    }

    fn run(&mut self) -> Result<(), SyntaxError> {
        while self.pos < self.input.len() {
            if self.peek() == chars::LBRACE {
                self.consume_command()?;
            } else {
                self.consume_raw_text();
            }
        }
        Ok(())
    }

    fn consume_raw_text(&mut self) {
        let start = self.location();
        let mut value = String::new();
        while self.pos < self.input.len() && self.peek() != chars::LBRACE {
            value.push(self.advance());
        }
        self.emit_raw_text(value, start);
    }

    fn emit_raw_text(&mut self, value: String, start: ParseLocation) {
        let end = self.location();
        // Merge with a preceding raw-text token so special character
        // commands don't fragment literal runs.
        if let Some(Token { kind: TokenKind::RawText(prev), span }) = self.tokens.last_mut() {
            prev.push_str(&value);
            span.end = end;
            return;
        }
        let span = ParseSourceSpan::new(start, end);
        self.tokens.push(Token { kind: TokenKind::RawText(value), span });
    }

    fn consume_command(&mut self) -> Result<(), SyntaxError> {
        let start = self.location();
        self.advance(); // '{'

        let mut body = String::new();
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        loop {
            let ch = self.peek();
            if ch == chars::EOF {
                return Err(SyntaxError::new("unterminated {command}", start.line));
            }
            match quote {
                Some(q) => {
                    if ch == q {
                        quote = None;
                    }
                }
                None => match ch {
                    chars::DQ | chars::SQ => quote = Some(ch),
                    chars::LBRACE => depth += 1,
                    chars::RBRACE => {
                        depth -= 1;
                        if depth == 0 {
                            self.advance(); // '}'
                            break;
                        }
                    }
                    _ => {}
                },
            }
            body.push(self.advance());
        }

        let span = ParseSourceSpan::new(start.clone(), self.location());

        // Special character commands become raw text.
        if let Some(text) = special_char_command(&body) {
            self.emit_raw_text(text.to_string(), start);
            return Ok(());
        }

        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(SyntaxError::new("empty {command}", start.line));
        }

        if let Some(name) = trimmed.strip_prefix(chars::SLASH) {
            let name = name.trim();
            if name.is_empty() {
                return Err(SyntaxError::new("missing name in {/command}", start.line));
            }
            self.tokens.push(Token {
                kind: TokenKind::CommandEnd(name.to_string()),
                span,
            });
            return Ok(());
        }

        let (body, self_closing) = match trimmed.strip_suffix(chars::SLASH) {
            Some(stripped) => (stripped.trim_end(), true),
            None => (trimmed, false),
        };

        // `{$expr}` is shorthand for `{print $expr}`.
        let (name, rest) = if body.starts_with(chars::DOLLAR) {
            ("print".to_string(), body.to_string())
        } else {
            match body.find(|c: char| chars::is_whitespace(c)) {
                Some(i) => (body[..i].to_string(), body[i..].trim_start().to_string()),
                None => (body.to_string(), String::new()),
            }
        };

        self.tokens.push(Token {
            kind: TokenKind::Command { name, rest, self_closing },
            span,
        });
        Ok(())
    }
}

fn special_char_command(body: &str) -> Option<&'static str> {
    match body.trim() {
        "sp" => Some(" "),
        "nil" => Some(""),
        "lb" => Some("{"),
        "rb" => Some("}"),
        "\\n" => Some("\n"),
        _ => None,
    }
}
