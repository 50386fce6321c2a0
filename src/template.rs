//! Template interpolation for probe URLs
//!
//! Handles `{{ variable }}` interpolation in the configured URL template.
//! The only variable defined is the probe `{{ id }}`; anything else is
//! rejected when the template is parsed.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: Value,
}

impl TemplateContext {
    /// Context carrying the identifier being probed
    pub fn for_probe(id: u64) -> Self {
        Self {
            vars: json!({ "id": id }),
        }
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.vars;
        for part in path.split('.') {
            match current {
                Value::Object(map) => current = map.get(part)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        match ctx.get(var_path) {
            Some(value) => value_to_string(value),
            None => {
                missing.push(var_path.to_string());
                cap[0].to_string()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// A validated probe URL template
///
/// The template must reference `{{ id }}` and render to an absolute
/// http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Parse and validate a template
    pub fn parse(template: impl Into<String>) -> Result<Self> {
        let template = template.into();

        if !extract_variables(&template).iter().any(|v| v == "id") {
            return Err(Error::invalid_value(
                "source.url_template",
                format!("'{template}' does not contain {{{{ id }}}}"),
            ));
        }

        let parsed = url::Url::parse(&render(&template, &TemplateContext::for_probe(0))?)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "source.url_template",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        Ok(Self { template })
    }

    /// Render the URL for one identifier
    pub fn url_for(&self, id: u64) -> Result<String> {
        render(&self.template, &TemplateContext::for_probe(id))
    }

    /// The raw template text
    pub fn as_str(&self) -> &str {
        &self.template
    }
}
