//! Template pre-rendering for sources registered with `render = true`

use crate::error::{PressError, PressResult};
use std::collections::BTreeMap;

/// Renders a source before it is minified and aggregated
pub trait TemplateRenderer: Send + Sync {
    /// Render `source`, read from `path`
    fn render(&self, path: &str, source: &str) -> PressResult<String>;
}

/// Substitutes `{{ name }}` placeholders from a fixed variable table
#[derive(Debug, Clone, Default)]
pub struct VariableRenderer {
    vars: BTreeMap<String, String>,
}

impl VariableRenderer {
    /// Create a renderer over `vars`
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

impl TemplateRenderer for VariableRenderer {
    fn render(&self, path: &str, source: &str) -> PressResult<String> {
        let mut out = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| PressError::Render {
                path: path.to_string(),
                reason: "unclosed '{{'".to_string(),
            })?;

            let name = after[..end].trim();
            let value = self.vars.get(name).ok_or_else(|| PressError::Render {
                path: path.to_string(),
                reason: format!("unknown variable '{}'", name),
            })?;
            out.push_str(value);
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}
