//! Prompt templates rendered with Tera.
//!
//! Templates are registered once at startup and rendered per request with a
//! serializable context. HTML autoescaping is disabled: prompts are plain text
//! and may legitimately contain markup.

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{Error, Result};

/// Named set of prompt templates.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    tera: Tera,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptTemplates {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        Self { tera }
    }

    /// Register (or replace) a template. Syntax errors surface here.
    pub fn register(&mut self, name: &str, source: &str) -> Result<()> {
        self.tera
            .add_raw_template(name, source)
            .map_err(|e| Error::Template(format!("invalid template '{}': {}", name, e)))
    }

    /// Builder-style `register` used when assembling the prompt set.
    pub fn with(mut self, name: &str, source: &str) -> Result<Self> {
        self.register(name, source)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render `name` with any serializable context (struct or map).
    pub fn render<T: Serialize>(&self, name: &str, vars: &T) -> Result<String> {
        let context = Context::from_serialize(vars)
            .map_err(|e| Error::Template(format!("bad context for '{}': {}", name, e)))?;
        self.tera
            .render(name, &context)
            .map_err(|e| Error::Template(format!("failed to render '{}': {}", name, e)))
    }
}
