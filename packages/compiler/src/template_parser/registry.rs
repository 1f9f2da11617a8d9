//! Template registry: lookup by fully-qualified name with deterministic
//! enumeration order (registration order), shared node-id allocation, and
//! call-target resolution.

use indexmap::IndexMap;

use super::ast::TemplateNode;
use super::parser::parse_file;
use super::{NodeIdGen, SyntaxError};

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: IndexMap<String, TemplateNode>,
    ids: NodeIdGen,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        TemplateRegistry::default()
    }

    /// Parse `source` and register every template it declares.
    pub fn add_file(&mut self, source: &str, url: &str) -> Result<(), SyntaxError> {
        let file = parse_file(source, url, &mut self.ids)?;
        for template in file.templates {
            let name = template.full_name();
            if self.templates.contains_key(&name) {
                return Err(SyntaxError::new(
                    format!("{}: duplicate template '{}'", url, name),
                    template.span.start.line,
                ));
            }
            self.templates.insert(name, template);
        }
        Ok(())
    }

    pub fn get(&self, full_name: &str) -> Option<&TemplateNode> {
        self.templates.get(full_name)
    }

    pub fn get_mut(&mut self, full_name: &str) -> Option<&mut TemplateNode> {
        self.templates.get_mut(full_name)
    }

    /// Templates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TemplateNode)> {
        self.templates.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut TemplateNode)> {
        self.templates.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.templates.keys()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve a call target as written (`.local` or absolute) against the
    /// calling template's namespace. Resolution is purely syntactic; the
    /// result may name a template outside the known set.
    pub fn resolve_target(caller_namespace: &str, target: &str) -> String {
        if let Some(local) = target.strip_prefix('.') {
            format!("{}.{}", caller_namespace, local)
        } else {
            target.to_string()
        }
    }
}
