//! Attribute and element classification schema.
//!
//! Maps attribute names to the content language of their values (URL, JS,
//! CSS or plain) and element names to their body treatment. Case is
//! insignificant; all names are lower-cased for lookup.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::context::{AttrType, Element};

/// Attributes whose values are URLs. Applies to any element; per-element
/// distinctions (e.g. resource vs. plain URLs) are a renderer concern, not
/// a context concern.
static URL_ATTRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set = HashSet::new();
    for name in [
        "action",
        "archive",
        "background",
        "cite",
        "classid",
        "codebase",
        "data",
        "dynsrc",
        "formaction",
        "href",
        "icon",
        "longdesc",
        "manifest",
        "poster",
        "profile",
        "src",
        "srcset",
        "usemap",
        "xmlns",
    ] {
        set.insert(name);
    }
    set
});

/// Classify an attribute by the language of its value.
///
/// `data-` custom attributes are classified by their suffix, and namespace
/// prefixes (`xlink:href`) are stripped, mirroring how browsers treat them.
pub fn attr_type(name: &str) -> AttrType {
    let name = name.to_lowercase();
    let mut name = name.as_str();
    if let Some(suffix) = name.strip_prefix("data-") {
        name = suffix;
    }
    if let Some(i) = name.find(':') {
        name = &name[i + 1..];
    }

    if name.starts_with("on") {
        return AttrType::Js;
    }
    if name == "style" {
        return AttrType::Css;
    }
    if URL_ATTRS.contains(name) {
        return AttrType::Url;
    }
    AttrType::None
}

/// Classify an element by how its body content is scanned.
pub fn element_type(name: &str) -> Element {
    match name.to_lowercase().as_str() {
        "script" => Element::Script,
        "style" => Element::Style,
        "textarea" => Element::Textarea,
        "title" => Element::Title,
        _ => Element::None,
    }
}
