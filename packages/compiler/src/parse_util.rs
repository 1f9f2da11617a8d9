//! Source location and span types carried by every parsed node.
//!
//! Offsets, lines and columns are 0-based internally; diagnostics convert
//! to 1-based lines at the reporting boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseLocation {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(offset: usize, line: usize, col: usize) -> Self {
        ParseLocation { offset, line, col }
    }
}

impl std::fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseSourceSpan {
    pub start: ParseLocation,
    pub end: ParseLocation,
}

impl ParseSourceSpan {
    pub fn new(start: ParseLocation, end: ParseLocation) -> Self {
        ParseSourceSpan { start, end }
    }

    /// 1-based line of the span start, the form diagnostics report.
    pub fn line_1based(&self) -> usize {
        self.start.line + 1
    }
}
