//! The escaping-mode table: which render-time escaping directives a
//! dynamic value needs in a given lexical context.
//!
//! Mode lists are ordered; the renderer applies them left to right. The
//! table is total over printable contexts and errors out for contexts
//! where no escaping regime can make a dynamic value safe (comments,
//! ambiguous URL positions).

use smallvec::SmallVec;

use crate::error::ErrorKind;

use super::context::{Context, Delim, State, UrlPart};
use super::ContextError;

/// An escaping or filtering directive understood by the renderer, named by
/// its stable render-time directive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapingMode {
    EscapeHtml,
    EscapeHtmlRcdata,
    EscapeHtmlAttribute,
    EscapeHtmlAttributeNospace,
    FilterHtmlElementName,
    FilterHtmlAttributes,
    EscapeJsValue,
    EscapeJsString,
    EscapeJsRegex,
    EscapeCssString,
    FilterCssValue,
    EscapeUri,
    NormalizeUri,
    FilterNormalizeUri,
    /// Cancels autoescaping for one print. Only legal in text-kind content.
    NoAutoescape,
}

/// Mode lists are almost always one or two entries.
pub type ModeList = SmallVec<[EscapingMode; 2]>;

impl EscapingMode {
    pub fn directive_name(self) -> &'static str {
        match self {
            EscapingMode::EscapeHtml => "escapeHtml",
            EscapingMode::EscapeHtmlRcdata => "escapeHtmlRcdata",
            EscapingMode::EscapeHtmlAttribute => "escapeHtmlAttribute",
            EscapingMode::EscapeHtmlAttributeNospace => "escapeHtmlAttributeNospace",
            EscapingMode::FilterHtmlElementName => "filterHtmlElementName",
            EscapingMode::FilterHtmlAttributes => "filterHtmlAttributes",
            EscapingMode::EscapeJsValue => "escapeJsValue",
            EscapingMode::EscapeJsString => "escapeJsString",
            EscapingMode::EscapeJsRegex => "escapeJsRegex",
            EscapingMode::EscapeCssString => "escapeCssString",
            EscapingMode::FilterCssValue => "filterCssValue",
            EscapingMode::EscapeUri => "escapeUri",
            EscapingMode::NormalizeUri => "normalizeUri",
            EscapingMode::FilterNormalizeUri => "filterNormalizeUri",
            EscapingMode::NoAutoescape => "noAutoescape",
        }
    }

    pub fn from_directive_name(name: &str) -> Option<EscapingMode> {
        Some(match name {
            "escapeHtml" => EscapingMode::EscapeHtml,
            "escapeHtmlRcdata" => EscapingMode::EscapeHtmlRcdata,
            "escapeHtmlAttribute" => EscapingMode::EscapeHtmlAttribute,
            "escapeHtmlAttributeNospace" => EscapingMode::EscapeHtmlAttributeNospace,
            "filterHtmlElementName" => EscapingMode::FilterHtmlElementName,
            "filterHtmlAttributes" => EscapingMode::FilterHtmlAttributes,
            "escapeJsValue" => EscapingMode::EscapeJsValue,
            "escapeJsString" => EscapingMode::EscapeJsString,
            "escapeJsRegex" => EscapingMode::EscapeJsRegex,
            "escapeCssString" => EscapingMode::EscapeCssString,
            "filterCssValue" => EscapingMode::FilterCssValue,
            "escapeUri" => EscapingMode::EscapeUri,
            "normalizeUri" => EscapingMode::NormalizeUri,
            "filterNormalizeUri" => EscapingMode::FilterNormalizeUri,
            "noAutoescape" => EscapingMode::NoAutoescape,
            _ => return None,
        })
    }

    /// Whether this mode's output can sit in an HTML attribute value
    /// without further attribute escaping.
    pub fn is_html_embeddable(self) -> bool {
        matches!(
            self,
            EscapingMode::EscapeHtml
                | EscapingMode::EscapeHtmlRcdata
                | EscapingMode::EscapeHtmlAttribute
                | EscapingMode::EscapeHtmlAttributeNospace
                | EscapingMode::EscapeUri
                | EscapingMode::EscapeCssString
        )
    }
}

/// The escaping modes a dynamic value printed in `ctx` needs. The context
/// must already be nudged (no BeforeValue).
pub fn escaping_modes_for(ctx: Context) -> Result<ModeList, ContextError> {
    if ctx.state.is_comment() {
        return Err(ContextError {
            kind: ErrorKind::ContentInComment,
            message: "dynamic content is not allowed inside a comment".to_string(),
        });
    }

    let mut modes: ModeList = SmallVec::new();
    match ctx.state {
        State::Text => modes.push(EscapingMode::EscapeHtml),
        State::Rcdata => modes.push(EscapingMode::EscapeHtmlRcdata),
        State::TagName => modes.push(EscapingMode::FilterHtmlElementName),
        State::Tag | State::AttrName | State::AfterName => {
            modes.push(EscapingMode::FilterHtmlAttributes)
        }
        // Plain attribute value: only the delimiter-driven escape below.
        State::Attr => {}
        State::Url | State::CssDqUrl | State::CssSqUrl | State::CssUrl => {
            match ctx.url_part {
                UrlPart::None => modes.push(EscapingMode::FilterNormalizeUri),
                UrlPart::PreQuery => modes.push(EscapingMode::NormalizeUri),
                UrlPart::QueryOrFrag => modes.push(EscapingMode::EscapeUri),
                UrlPart::Unknown => {
                    return Err(ContextError {
                        kind: ErrorKind::AmbiguousContext,
                        message: "cannot tell whether the URL position is in the path or \
                                  the query; move the dynamic value after a literal '?'"
                            .to_string(),
                    });
                }
            }
        }
        State::Js => modes.push(EscapingMode::EscapeJsValue),
        State::JsDqStr | State::JsSqStr => modes.push(EscapingMode::EscapeJsString),
        State::JsRegexp => modes.push(EscapingMode::EscapeJsRegex),
        State::Css => modes.push(EscapingMode::FilterCssValue),
        State::CssDqStr | State::CssSqStr => modes.push(EscapingMode::EscapeCssString),
        State::BeforeValue => {
            return Err(ContextError::internal(
                "mode lookup on an un-nudged value position",
            ));
        }
        State::HtmlComment
        | State::JsBlockComment
        | State::JsLineComment
        | State::CssBlockComment
        | State::CssLineComment => unreachable!("comment states handled above"),
        State::Error => {
            return Err(ContextError::internal("mode lookup in error context"));
        }
    }

    // A value inside an attribute must not be able to break out of it.
    if ctx.delim != Delim::None && !modes.last().is_some_and(|m| m.is_html_embeddable()) {
        modes.push(match ctx.delim {
            Delim::SpaceOrTagEnd => EscapingMode::EscapeHtmlAttributeNospace,
            _ => EscapingMode::EscapeHtmlAttribute,
        });
    }
    Ok(modes)
}
