//! Print-directive metadata.
//!
//! The inference pass needs to know, for each directive name appearing on
//! a print node, whether it is an escaping directive (participates in the
//! inferred-prefix check) and whether it cancels autoescaping entirely.
//! Directives the registry does not know are treated as pure formatting:
//! inference appends its own escaping after them.

use indexmap::IndexMap;

use super::modes::EscapingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSpec {
    /// Output is escaped/filtered for some context; participates in the
    /// redundant-escaping prefix check.
    pub is_escaping: bool,
    /// Disables autoescaping for the print it annotates.
    pub cancels_autoescape: bool,
}

/// Known print directives, queried by render-time name.
#[derive(Debug, Clone)]
pub struct DirectiveRegistry {
    directives: IndexMap<String, DirectiveSpec>,
}

impl DirectiveRegistry {
    /// Registry pre-populated with the built-in escaping directives.
    pub fn builtin() -> Self {
        let mut registry = DirectiveRegistry { directives: IndexMap::new() };
        for mode in [
            EscapingMode::EscapeHtml,
            EscapingMode::EscapeHtmlRcdata,
            EscapingMode::EscapeHtmlAttribute,
            EscapingMode::EscapeHtmlAttributeNospace,
            EscapingMode::FilterHtmlElementName,
            EscapingMode::FilterHtmlAttributes,
            EscapingMode::EscapeJsValue,
            EscapingMode::EscapeJsString,
            EscapingMode::EscapeJsRegex,
            EscapingMode::EscapeCssString,
            EscapingMode::FilterCssValue,
            EscapingMode::EscapeUri,
            EscapingMode::NormalizeUri,
            EscapingMode::FilterNormalizeUri,
        ] {
            registry.register(
                mode.directive_name(),
                DirectiveSpec { is_escaping: true, cancels_autoescape: false },
            );
        }
        registry.register(
            EscapingMode::NoAutoescape.directive_name(),
            DirectiveSpec { is_escaping: false, cancels_autoescape: true },
        );
        registry
    }

    /// Add or replace a directive. Rendering integrations register their
    /// formatting directives here so typos in escaping names still surface.
    pub fn register(&mut self, name: impl Into<String>, spec: DirectiveSpec) {
        self.directives.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<DirectiveSpec> {
        self.directives.get(name).copied()
    }

    pub fn is_escaping(&self, name: &str) -> bool {
        self.get(name).map(|s| s.is_escaping).unwrap_or(false)
    }

    pub fn cancels_autoescape(&self, name: &str) -> bool {
        self.get(name).map(|s| s.cancels_autoescape).unwrap_or(false)
    }
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        DirectiveRegistry::builtin()
    }
}
