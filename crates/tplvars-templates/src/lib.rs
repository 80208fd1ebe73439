//! Jinja2/Nunjucks-style template parsing.
//!
//! The pipeline has two stages:
//!
//! 1. **Lexing**: [`Lexer`] splits the source into text runs, tags, comments
//!    and raw blocks. Tag interiors are tokenized on the spot, so a closing
//!    `}}` inside a string or a dict literal never ends the tag.
//! 2. **Parsing**: [`Parser`] turns the tokens into a tree of [`Node`]s,
//!    matching every block opener with its closer and parsing each
//!    expression with a Pratt parser.
//!
//! Parsing stops at the first problem and reports it as a [`ParseError`];
//! no partial tree is ever returned.
//!
//! ## Example
//!
//! ```
//! use tplvars_templates::parse_template;
//! use tplvars_templates::Node;
//!
//! let nodes = parse_template("Hello {{ name }}!").unwrap();
//! assert!(matches!(nodes[1], Node::Expression { .. }));
//! ```
//!
//! [`Visitor`] walks the tree for analyses such as free-variable collection.

mod error;
pub mod expression;
mod expression_parser;
mod lexer;
pub mod nodelist;
mod parser;
mod scanner;
pub mod tokens;
mod visitor;

pub use error::ParseError;
pub use expression::Expr;
pub use expression::ExprKind;
pub use lexer::Lexer;
pub use nodelist::Node;
pub use parser::Parser;
pub use visitor::walk_arguments;
pub use visitor::walk_expr;
pub use visitor::walk_node;
pub use visitor::walk_nodelist;
pub use visitor::Visitor;

/// Parse a template source into its node tree.
///
/// Empty and whitespace-only sources produce an empty tree.
pub fn parse_template(source: &str) -> Result<Vec<Node>, ParseError> {
    if source.trim().is_empty() {
        tracing::trace!(len = source.len(), "blank template");
        return Ok(Vec::new());
    }

    let tokens = Lexer::new(source).tokenize().inspect_err(|err| {
        tracing::debug!(code = err.diagnostic_code(), %err, "lexing failed");
    })?;
    tracing::trace!(tokens = tokens.len(), "lexed template");

    let nodes = Parser::new(tokens).parse().inspect_err(|err| {
        tracing::debug!(code = err.diagnostic_code(), %err, "parsing failed");
    })?;
    tracing::debug!(len = source.len(), nodes = nodes.len(), "parsed template");

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sources_parse_to_nothing() {
        assert!(parse_template("").unwrap().is_empty());
        assert!(parse_template("  \n\t ").unwrap().is_empty());
    }

    #[test]
    fn plain_text_is_a_single_node() {
        let nodes = parse_template("just words").unwrap();
        assert!(matches!(nodes.as_slice(), [Node::Text { content, .. }] if content == "just words"));
    }

    #[test]
    fn errors_surface_from_either_stage() {
        assert_eq!(parse_template("{{ x").unwrap_err().diagnostic_code(), "T008");
        assert_eq!(
            parse_template("{% if x %}").unwrap_err().diagnostic_code(),
            "T001"
        );
    }
}
