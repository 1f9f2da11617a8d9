//! Character constants and predicates shared by the template command lexer
//! and the raw-text context scanners.

pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const FF: char = '\x0C';
pub const CR: char = '\r';
pub const SPACE: char = ' ';

pub const BANG: char = '!';
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const QUESTION: char = '?';
pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const UNDERSCORE: char = '_';
pub const BT: char = '`';
pub const LBRACE: char = '{';
pub const BAR: char = '|';
pub const RBRACE: char = '}';

/// Check if character is HTML whitespace (space characters per the HTML spec).
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == LF || ch == CR || ch == FF
}

/// Check if character is a decimal digit
pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

/// Check if character is ASCII letter
pub fn is_ascii_letter(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_uppercase()
}

/// Check if character can start an HTML tag name
pub fn is_tag_name_start(ch: char) -> bool {
    is_ascii_letter(ch)
}

/// Check if character can be part of an HTML tag name
pub fn is_tag_name_part(ch: char) -> bool {
    is_ascii_letter(ch) || is_digit(ch) || ch == MINUS || ch == COLON
}

/// Check if character can be part of a JS identifier (ASCII subset; enough
/// for keyword detection in slash disambiguation).
pub fn is_js_ident_part(ch: char) -> bool {
    is_ascii_letter(ch) || is_digit(ch) || ch == UNDERSCORE || ch == DOLLAR
}
