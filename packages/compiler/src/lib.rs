//! Contextual autoescaping compiler for the Sable template language.
//!
//! Parses `.sable` sources into a registry, infers the lexical HTML/CSS/
//! JS/URL context of every dynamic site, and rewrites the tree so each
//! print and call carries exactly the escaping its position requires.
//!
//! ```
//! use sable_compiler::{escape_templates, DirectiveRegistry, EscapeOptions, TemplateRegistry};
//!
//! let mut registry = TemplateRegistry::new();
//! registry
//!     .add_file(
//!         "{namespace demo}\n{template .page}<p>{$name}</p>{/template}",
//!         "page.sable",
//!     )
//!     .unwrap();
//! escape_templates(&mut registry, &DirectiveRegistry::builtin(), &EscapeOptions::default())
//!     .unwrap();
//! ```

pub mod chars;
pub mod error;
pub mod escaping;
pub mod parse_util;
pub mod template_parser;

pub use error::{CompileError, ErrorKind};
pub use escaping::{escape_templates, Context, DirectiveRegistry, DirectiveSpec, EscapeOptions};
pub use template_parser::{ContentKind, Node, NodeId, SyntaxError, TemplateRegistry};
