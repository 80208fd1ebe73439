use tplvars_source::Span;

use crate::error::ParseError;
use crate::scanner::Scanner;
use crate::tokens::TagDelimiter;
use crate::tokens::TagToken;
use crate::tokens::Token;
use crate::tokens::TokenKind;
use crate::tokens::WhitespaceControl;

const RAW_TAG: &str = "raw";
const ENDRAW_TAG: &str = "endraw";

/// Splits a template source into text runs, tags, comments and raw blocks.
///
/// Raw blocks are cut out here, before any of their content reaches the
/// expression scanner.
pub struct Lexer<'a> {
    source: &'a str,
    current: usize,
    trim_next_text: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            current: 0,
            trim_next_text: false,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            match TagDelimiter::from_input(&self.source[self.current..]) {
                Some(TagDelimiter::Comment) => self.lex_comment(&mut tokens)?,
                Some(delimiter) => self.lex_tag(delimiter, &mut tokens)?,
                None => self.lex_text(&mut tokens),
            }
        }

        tokens.push(Token::Eof {
            offset: u32::try_from(self.source.len()).unwrap_or(u32::MAX),
        });

        Ok(tokens)
    }

    fn lex_text(&mut self, tokens: &mut Vec<Token>) {
        let start = self.current;
        let first_len = self.source[start..].chars().next().map_or(1, char::len_utf8);
        let end = self.find_next_delimiter(start + first_len);
        self.current = end;

        let mut content = &self.source[start..end];
        if std::mem::take(&mut self.trim_next_text) {
            content = content.trim_start();
        }

        if !content.is_empty() {
            let content_start = end - content.len();
            tokens.push(Token::Text {
                content: content.to_string(),
                span: Span::from_bounds(content_start, end),
            });
        }
    }

    fn find_next_delimiter(&self, from: usize) -> usize {
        let mut offset = from;

        while let Some(idx) = self.source.get(offset..).and_then(|rest| rest.find('{')) {
            let candidate = offset + idx;
            if TagDelimiter::from_input(&self.source[candidate..]).is_some() {
                return candidate;
            }
            offset = candidate + 1;
        }

        self.source.len()
    }

    fn lex_comment(&mut self, tokens: &mut Vec<Token>) -> Result<(), ParseError> {
        let start = self.current;
        let interior = start + TagDelimiter::LENGTH;
        let closer = TagDelimiter::Comment.closer();

        let Some(idx) = self.source[interior..].find(closer) else {
            return Err(ParseError::UnclosedDelimiter {
                kind: TagDelimiter::Comment.describe(),
                closer,
                span: Span::from_parts(start, TagDelimiter::LENGTH),
            });
        };

        let content = &self.source[interior..interior + idx];
        let end = interior + idx + TagDelimiter::LENGTH;

        if content.starts_with('-') {
            trim_preceding_text(tokens);
        }
        self.trim_next_text = content.ends_with('-');
        self.current = end;

        tokens.push(Token::Comment {
            span: Span::from_bounds(start, end),
        });
        Ok(())
    }

    fn lex_tag(
        &mut self,
        delimiter: TagDelimiter,
        tokens: &mut Vec<Token>,
    ) -> Result<(), ParseError> {
        let start = self.current;
        let after_opener = start + TagDelimiter::LENGTH;
        let left = WhitespaceControl::from_marker(self.source[after_opener..].chars().next());
        let content_start = after_opener + left.marker_len();

        let scanned = Scanner::new(self.source, content_start, start, delimiter).scan()?;

        if left == WhitespaceControl::Trim {
            trim_preceding_text(tokens);
        }
        self.current = scanned.end;
        self.trim_next_text = scanned.right == WhitespaceControl::Trim;

        let content_start = scanned
            .tokens
            .first()
            .map_or(content_start, |token| token.span.start_usize());
        let tag = TagToken {
            tokens: scanned.tokens,
            span: Span::from_bounds(start, scanned.end),
            content_span: Span::from_bounds(content_start, scanned.content_end),
            left,
            right: scanned.right,
        };

        let token = match delimiter {
            TagDelimiter::Block if is_raw_opener(&tag) => self.lex_raw(tag)?,
            TagDelimiter::Block => Token::Block(tag),
            _ => Token::Variable(tag),
        };
        tokens.push(token);
        Ok(())
    }

    fn lex_raw(&mut self, opener: TagToken) -> Result<Token, ParseError> {
        let body_start = self.current;

        let Some(closer) = find_endraw(self.source, body_start) else {
            return Err(ParseError::UnclosedTag {
                tag: RAW_TAG.to_string(),
                expected: ENDRAW_TAG.to_string(),
                span: opener.span,
            });
        };

        let mut content = &self.source[body_start..closer.start];
        if opener.right == WhitespaceControl::Trim {
            content = content.trim_start();
        }
        if closer.left == WhitespaceControl::Trim {
            content = content.trim_end();
        }

        self.current = closer.end;
        self.trim_next_text = closer.right == WhitespaceControl::Trim;

        Ok(Token::Raw {
            content: content.to_string(),
            span: Span::from_bounds(opener.span.start_usize(), closer.end),
        })
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_raw_opener(tag: &TagToken) -> bool {
    matches!(tag.tokens.as_slice(), [token] if token.kind == TokenKind::Name(RAW_TAG.to_string()))
}

fn trim_preceding_text(tokens: &mut Vec<Token>) {
    if let Some(Token::Text { content, span }) = tokens.last_mut() {
        let trimmed_len = content.trim_end().len();
        content.truncate(trimmed_len);
        *span = Span::from_parts(span.start_usize(), trimmed_len);
        if content.is_empty() {
            tokens.pop();
        }
    }
}

struct RawCloser {
    start: usize,
    end: usize,
    left: WhitespaceControl,
    right: WhitespaceControl,
}

/// Locate the next `{% endraw %}` (whitespace-control markers allowed) at or after `from`.
fn find_endraw(source: &str, from: usize) -> Option<RawCloser> {
    let opener = TagDelimiter::Block.opener();
    let closer = TagDelimiter::Block.closer();
    let mut offset = from;

    while let Some(idx) = source[offset..].find(opener) {
        let start = offset + idx;
        offset = start + TagDelimiter::LENGTH;

        let mut rest = &source[offset..];
        let left = WhitespaceControl::from_marker(rest.chars().next());
        rest = rest[left.marker_len()..].trim_start();

        let Some(after_name) = rest.strip_prefix(ENDRAW_TAG) else {
            continue;
        };
        let after_name = after_name.trim_start();
        let right = WhitespaceControl::from_marker(after_name.chars().next());
        if !after_name[right.marker_len()..].starts_with(closer) {
            continue;
        }

        let end = source.len() - after_name.len() + right.marker_len() + closer.len();
        return Some(RawCloser {
            start,
            end,
            left,
            right,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tokenize_plain_text() {
        let tokens = tokenize("Hello, world!");
        assert_eq!(tokens.len(), 2);
        assert_eq!(texts(&tokens), vec!["Hello, world!"]);
        assert!(matches!(tokens[1], Token::Eof { offset: 13 }));
    }

    #[test]
    fn test_tokenize_variable() {
        let tokens = tokenize("Hello {{ name }}!");
        assert_eq!(tokens.len(), 4);
        let Token::Variable(tag) = &tokens[1] else {
            panic!("expected variable token, got {:?}", tokens[1]);
        };
        assert_eq!(tag.span, Span::new(6, 10));
        assert_eq!(tag.content_span, Span::new(9, 4));
        assert_eq!(tag.tokens.len(), 1);
        assert_eq!(texts(&tokens), vec!["Hello ", "!"]);
    }

    #[test]
    fn test_tokenize_lone_brace_is_text() {
        let tokens = tokenize("{ not a tag } {{ x }}");
        assert_eq!(texts(&tokens), vec!["{ not a tag } "]);
    }

    #[test]
    fn test_tokenize_block() {
        let tokens = tokenize("{% if user.is_staff %}Admin{% endif %}");
        let Token::Block(tag) = &tokens[0] else {
            panic!("expected block token");
        };
        assert_eq!(tag.name(), Some("if"));
        let Token::Block(end) = &tokens[2] else {
            panic!("expected block token");
        };
        assert_eq!(end.name(), Some("endif"));
    }

    #[test]
    fn test_tokenize_comment_contents_not_scanned() {
        let tokens = tokenize("{# {{ broken {% #}after");
        assert!(matches!(tokens[0], Token::Comment { .. }));
        assert_eq!(texts(&tokens), vec!["after"]);
    }

    #[test]
    fn test_tokenize_unclosed_comment() {
        let err = Lexer::new("text {# never closed").tokenize().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Unclosed comment: missing '#}'");
        assert_eq!(err.span(), Span::new(5, 2));
    }

    #[test]
    fn test_tokenize_raw_block() {
        let tokens = tokenize("a{% raw %}{{ not_parsed }}{% if %}{% endraw %}b");
        assert_eq!(tokens.len(), 4);
        let Token::Raw { content, span } = &tokens[1] else {
            panic!("expected raw token, got {:?}", tokens[1]);
        };
        assert_eq!(content, "{{ not_parsed }}{% if %}");
        assert_eq!(*span, Span::new(1, 45));
        assert_eq!(texts(&tokens), vec!["a", "b"]);
    }

    #[test]
    fn test_tokenize_raw_with_whitespace_control() {
        let tokens = tokenize("{%- raw -%}\n  {{ x }}  \n{%- endraw -%}\n tail");
        let Token::Raw { content, .. } = &tokens[0] else {
            panic!("expected raw token");
        };
        assert_eq!(content, "{{ x }}");
        assert_eq!(texts(&tokens), vec!["tail"]);
    }

    #[test]
    fn test_tokenize_unclosed_raw() {
        let err = Lexer::new("{% raw %}{{ x }}").tokenize().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Unclosed tag 'raw': expected '{% endraw %}' before end of template");
    }

    #[test]
    fn test_tokenize_whitespace_control_trims_text() {
        let tokens = tokenize("a  \n{%- if x -%}\n  b  {{- y }}");
        assert_eq!(texts(&tokens), vec!["a", "b"]);
        let Token::Block(tag) = &tokens[1] else {
            panic!("expected block token");
        };
        assert_eq!(tag.left, WhitespaceControl::Trim);
        assert_eq!(tag.right, WhitespaceControl::Trim);
    }

    #[test]
    fn test_tokenize_unclosed_variable() {
        let err = Lexer::new("Hello {{ name").tokenize().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Unclosed expression tag: missing '}}'");
        assert_eq!(err.span(), Span::new(6, 2));
    }
}
