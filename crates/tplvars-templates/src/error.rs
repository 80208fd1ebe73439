use thiserror::Error;
use tplvars_source::Span;

/// A template that could not be parsed.
///
/// Parsing stops at the first error; no partial tree is ever produced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unclosed tag '{tag}': expected '{{% {expected} %}}' before end of template")]
    UnclosedTag {
        tag: String,
        expected: String,
        span: Span,
    },
    #[error("Unexpected '{tag}' with no open tag")]
    UnexpectedTag { tag: String, span: Span },
    #[error("Mismatched '{tag}': expected '{{% {expected} %}}' to close '{opener}'")]
    MismatchedTag {
        tag: String,
        expected: String,
        opener: String,
        opener_span: Span,
        span: Span,
    },
    #[error("Unknown tag '{tag}'")]
    UnknownTag { tag: String, span: Span },
    #[error("Empty block tag")]
    EmptyTag { span: Span },
    #[error("Empty expression tag")]
    EmptyExpression { span: Span },
    #[error("{message}")]
    InvalidSyntax { message: String, span: Span },
    #[error("Unclosed {kind}: missing '{closer}'")]
    UnclosedDelimiter {
        kind: &'static str,
        closer: &'static str,
        span: Span,
    },
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidSyntax {
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnclosedTag { span, .. }
            | ParseError::UnexpectedTag { span, .. }
            | ParseError::MismatchedTag { span, .. }
            | ParseError::UnknownTag { span, .. }
            | ParseError::EmptyTag { span }
            | ParseError::EmptyExpression { span }
            | ParseError::InvalidSyntax { span, .. }
            | ParseError::UnclosedDelimiter { span, .. } => *span,
        }
    }

    /// Secondary location worth pointing at, such as the opener a closer fails to match.
    #[must_use]
    pub fn related_span(&self) -> Option<Span> {
        match self {
            ParseError::MismatchedTag { opener_span, .. } => Some(*opener_span),
            _ => None,
        }
    }

    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            ParseError::UnclosedTag { .. } => "T001",
            ParseError::UnexpectedTag { .. } => "T002",
            ParseError::MismatchedTag { .. } => "T003",
            ParseError::UnknownTag { .. } => "T004",
            ParseError::EmptyTag { .. } => "T005",
            ParseError::EmptyExpression { .. } => "T006",
            ParseError::InvalidSyntax { .. } => "T007",
            ParseError::UnclosedDelimiter { .. } => "T008",
        }
    }

    /// Short label for the primary annotation when rendering this error.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ParseError::UnclosedTag { .. } => "this tag is never closed",
            ParseError::UnexpectedTag { .. } => "nothing to close here",
            ParseError::MismatchedTag { .. } => "does not match the innermost open tag",
            ParseError::UnknownTag { .. } => "unknown tag",
            ParseError::EmptyTag { .. } | ParseError::EmptyExpression { .. } => "nothing inside",
            ParseError::InvalidSyntax { .. } => "invalid syntax",
            ParseError::UnclosedDelimiter { .. } => "opened here",
        }
    }

    /// A hint on how to fix the template, where one applies.
    #[must_use]
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ParseError::MismatchedTag { .. } => {
                Some("block tags must be closed in the reverse order they were opened")
            }
            ParseError::UnknownTag { .. } => Some(
                "known tags: if, for, set, macro, call, with, filter, block, extends, include, import, from, do, raw, break, continue",
            ),
            ParseError::EmptyExpression { .. } => Some("write an expression between '{{' and '}}'"),
            ParseError::UnclosedDelimiter { closer, .. } if *closer == "%}" => {
                Some("block tags are written as '{% name args %}'")
            }
            _ => None,
        }
    }
}
