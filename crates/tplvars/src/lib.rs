//! Free-variable extraction for Jinja2/Nunjucks-style templates.
//!
//! A template's free variables are the names it reads that nothing inside it
//! defines: the data a caller has to supply when rendering it.
//!
//! ```
//! let extraction = tplvars::extract_template_variables(
//!     "{% for item in items %}{{ item.name }} {{ currency }}{% endfor %}",
//! );
//! assert_eq!(extraction.variables.as_slice(), ["items", "currency"]);
//! assert!(extraction.error.is_none());
//! ```
//!
//! A template that fails to parse yields no variables and an error message:
//!
//! ```
//! let extraction = tplvars::extract_template_variables("{% if unclosed");
//! assert!(extraction.variables.is_empty());
//! assert!(extraction.error.is_some());
//! ```

use serde::Serialize;
use tplvars_conf::Settings;
use tplvars_semantic::Globals;
pub use tplvars_semantic::FreeVariables;
pub use tplvars_templates::Node;
pub use tplvars_templates::ParseError;

/// Outcome of extracting variables from one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Free variables in order of first reference; empty when parsing failed.
    pub variables: FreeVariables,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Extraction {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<FreeVariables, ParseError>> for Extraction {
    fn from(result: Result<FreeVariables, ParseError>) -> Self {
        match result {
            Ok(variables) => Self {
                variables,
                error: None,
            },
            Err(err) => Self {
                variables: FreeVariables::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Reusable extractor carrying the configured global names.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    globals: Globals,
}

impl Extractor {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            globals: Globals::with_names(settings.globals.iter().cloned()),
        }
    }

    /// Parse `source` without analysing it, keeping the error's span.
    pub fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError> {
        tplvars_templates::parse_template(source)
    }

    #[must_use]
    pub fn collect(&self, nodes: &[Node]) -> FreeVariables {
        tplvars_semantic::collect_with_globals(nodes, &self.globals)
    }

    pub fn try_extract(&self, source: &str) -> Result<FreeVariables, ParseError> {
        let nodes = self.parse(source)?;
        Ok(self.collect(&nodes))
    }

    #[must_use]
    pub fn extract(&self, source: &str) -> Extraction {
        Extraction::from(self.try_extract(source))
    }
}

/// Extract the free variables of `template` using only the built-in globals.
#[must_use]
pub fn extract_template_variables(template: &str) -> Extraction {
    Extractor::default().extract(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_error_key_on_success() {
        let extraction = extract_template_variables("Hello {{ name }}!");
        insta::assert_snapshot!(
            serde_json::to_string(&extraction).unwrap(),
            @r#"{"variables":["name"]}"#
        );
    }

    #[test]
    fn serializes_error_on_failure() {
        let extraction = extract_template_variables("{% if x %}");
        insta::assert_snapshot!(
            serde_json::to_string(&extraction).unwrap(),
            @r#"{"variables":[],"error":"Unclosed tag 'if': expected '{% endif %}' before end of template"}"#
        );
    }

    #[test]
    fn configured_globals_are_not_free() {
        let settings = Settings {
            globals: vec!["site".to_string()],
            ..Settings::default()
        };
        let extraction = Extractor::new(&settings).extract("{{ site.title }} {{ page }}");
        assert_eq!(extraction.variables.as_slice(), ["page"]);
    }

    #[test]
    fn parse_keeps_the_error_span() {
        let err = Extractor::default().parse("ok {% endfor %}").unwrap_err();
        assert_eq!(err.diagnostic_code(), "T002");
        assert_eq!(err.span().start(), 3);
    }
}
